//! Artifact Exporter
//!
//! Promotes each item's composite from the temporary render directory to
//! `<output>/<images_folder>/<item_id>.png`. Every item is resolved before
//! the first copy, so a failure publishes nothing.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::contribution::ItemId;
use crate::fsutil::{ensure_dir, is_non_empty_file};
use crate::hashing::{compute_manifest_hash, file_sha256};
use crate::renders::Render;
use crate::source::RenderSource;

pub const DEFAULT_IMAGES_FOLDER: &str = "images";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Could not find any supported image for item {item_id}")]
    MissingImage { item_id: ItemId },

    #[error("Could not find any supported attributes for item {item_id}")]
    MissingAttributes { item_id: ItemId },

    #[error("Composite for item {item_id} is missing or empty: {}", path.display())]
    InvalidImage { item_id: ItemId, path: PathBuf },

    #[error("Failed to create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to publish item {item_id} to {}: {source}", to.display())]
    Copy {
        item_id: ItemId,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to hash export report: {0}")]
    Hash(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedImage {
    pub item_id: ItemId,
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    pub images_path: PathBuf,
    pub images: Vec<ExportedImage>,
    /// Hash over item ids and image digests only
    pub collection_hash: String,
}

pub struct ImagesExporter {
    source: Arc<dyn RenderSource>,
    output_path: PathBuf,
    images_folder: String,
}

struct PlannedCopy {
    item_id: ItemId,
    from: PathBuf,
    to: PathBuf,
}

impl ImagesExporter {
    pub fn new(source: Arc<dyn RenderSource>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            output_path: output_path.into(),
            images_folder: DEFAULT_IMAGES_FOLDER.to_string(),
        }
    }

    pub fn with_images_folder(mut self, images_folder: impl Into<String>) -> Self {
        self.images_folder = images_folder.into();
        self
    }

    pub fn images_path(&self) -> PathBuf {
        self.output_path.join(&self.images_folder)
    }

    pub fn export(&self) -> Result<ExportReport, ExportError> {
        let images_path = self.images_path();
        for dir in [self.output_path.as_path(), images_path.as_path()] {
            ensure_dir(dir).map_err(|source| ExportError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let plan = self.plan(&images_path)?;

        let mut images = Vec::with_capacity(plan.len());
        for copy in plan {
            let bytes = fs::copy(&copy.from, &copy.to).map_err(|source| ExportError::Copy {
                item_id: copy.item_id.clone(),
                to: copy.to.clone(),
                source,
            })?;
            let sha256 = file_sha256(&copy.to).map_err(|source| ExportError::Copy {
                item_id: copy.item_id.clone(),
                to: copy.to.clone(),
                source,
            })?;
            debug!(item_id = %copy.item_id, bytes, "image published");
            images.push(ExportedImage {
                item_id: copy.item_id,
                path: copy.to,
                sha256,
                bytes,
            });
        }

        let digests: Vec<(&str, &str)> = images
            .iter()
            .map(|image| (image.item_id.as_str(), image.sha256.as_str()))
            .collect();
        let collection_hash = compute_manifest_hash(&digests)?;

        info!(images = images.len(), path = %images_path.display(), "images exported");
        Ok(ExportReport {
            images_path,
            images,
            collection_hash,
        })
    }

    fn plan(&self, images_path: &Path) -> Result<Vec<PlannedCopy>, ExportError> {
        let mut plan = Vec::new();

        for (item_id, renders) in self.source.renders() {
            let image = renders
                .iter()
                .find_map(Render::as_composite)
                .ok_or_else(|| ExportError::MissingImage {
                    item_id: item_id.clone(),
                })?;

            if !renders.iter().any(|render| render.as_attributes().is_some()) {
                error!(item_id = %item_id, renders = renders.len(), "attributes not found");
                return Err(ExportError::MissingAttributes { item_id });
            }

            match is_non_empty_file(&image.path) {
                Ok(true) => {}
                _ => {
                    return Err(ExportError::InvalidImage {
                        item_id,
                        path: image.path.clone(),
                    })
                }
            }

            plan.push(PlannedCopy {
                to: images_path.join(format!("{item_id}.png")),
                from: image.path.clone(),
                item_id,
            });
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renders::{AggregatedAttributes, CompositeRenderResult, ItemsRenders};

    fn composite(path: &Path) -> Render {
        Render::CompositeImage(CompositeRenderResult {
            path: path.to_path_buf(),
        })
    }

    fn attributes() -> Render {
        Render::Attributes(AggregatedAttributes::default())
    }

    #[test]
    fn test_custom_images_folder() {
        let root = tempfile::tempdir().unwrap();
        let rendered = root.path().join("1.png");
        fs::write(&rendered, b"png").unwrap();
        let renders = ItemsRenders::from([("1".to_string(), vec![attributes(), composite(&rendered)])]);

        let report = ImagesExporter::new(Arc::new(renders), root.path().join("out"))
            .with_images_folder("art")
            .export()
            .unwrap();

        assert_eq!(report.images_path, root.path().join("out").join("art"));
        assert_eq!(fs::read(root.path().join("out/art/1.png")).unwrap(), b"png");
        assert_eq!(report.images[0].bytes, 3);
    }

    #[test]
    fn test_missing_attributes_publishes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let rendered = root.path().join("1.png");
        fs::write(&rendered, b"png").unwrap();
        let renders = ItemsRenders::from([
            ("1".to_string(), vec![attributes(), composite(&rendered)]),
            ("2".to_string(), vec![composite(&rendered)]),
        ]);
        let out = root.path().join("out");

        let err = ImagesExporter::new(Arc::new(renders), &out).export().unwrap_err();

        assert!(matches!(err, ExportError::MissingAttributes { ref item_id } if item_id == "2"));
        assert!(!out.join("images/1.png").exists());
    }

    #[test]
    fn test_empty_composite_is_not_promoted() {
        let root = tempfile::tempdir().unwrap();
        let truncated = root.path().join("5.png");
        fs::write(&truncated, b"").unwrap();
        let renders = ItemsRenders::from([("5".to_string(), vec![attributes(), composite(&truncated)])]);

        let err = ImagesExporter::new(Arc::new(renders), root.path().join("out"))
            .export()
            .unwrap_err();
        assert!(matches!(err, ExportError::InvalidImage { .. }));
    }

    #[test]
    fn test_empty_registry_exports_nothing() {
        let root = tempfile::tempdir().unwrap();
        let report = ImagesExporter::new(Arc::new(ItemsRenders::new()), root.path())
            .export()
            .unwrap();
        assert!(report.images.is_empty());
        assert!(root.path().join(DEFAULT_IMAGES_FOLDER).is_dir());
    }
}
