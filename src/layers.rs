//! Layer Compositor
//!
//! Merges every layer contribution of an item into one paint-ordered asset
//! list and hands it to the image processor. Items render in parallel on a
//! bounded worker pool; each writes only `<temp_render_dir>/<item_id>.png`.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};

use crate::contribution::{AssetRef, Contribution, ItemId};
use crate::fsutil::{ensure_dir, is_non_empty_file};
use crate::kinds::PayloadKind;
use crate::perf::PerformanceTracker;
use crate::processor::{ImageProcessor, LayeredImageRequest, RasterImageProcessor};
use crate::renders::{CompositeRenderResult, ItemsRenders, Render, RenderError};
use crate::source::ContributionSource;

pub const RENDER_TASK_NAME: &str = "Image render";

pub struct LayersRenderer {
    source: Arc<dyn ContributionSource>,
    processor: Arc<dyn ImageProcessor>,
    temp_render_dir: PathBuf,
    width: u32,
    height: u32,
    exclude_parts: BTreeSet<String>,
    concurrency: usize,
    tracker: Option<Arc<PerformanceTracker>>,
}

impl LayersRenderer {
    pub fn new(
        source: Arc<dyn ContributionSource>,
        width: u32,
        height: u32,
        temp_render_dir: impl Into<PathBuf>,
    ) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidCanvas { width, height });
        }
        Ok(Self {
            source,
            processor: Arc::new(RasterImageProcessor),
            temp_render_dir: temp_render_dir.into(),
            width,
            height,
            exclude_parts: BTreeSet::new(),
            concurrency: 0,
            tracker: None,
        })
    }

    pub fn with_processor(mut self, processor: Arc<dyn ImageProcessor>) -> Self {
        self.processor = processor;
        self
    }

    pub fn with_exclude_parts<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_parts = parts.into_iter().map(Into::into).collect();
        self
    }

    /// Worker count for rasterization; 0 uses rayon's default
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_tracker(mut self, tracker: Arc<PerformanceTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn temp_render_dir(&self) -> &Path {
        &self.temp_render_dir
    }

    pub fn render(&self) -> Result<ItemsRenders, RenderError> {
        let items = self.source.contributions();

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|i| format!("forgeart-render-{i}"))
            .build()
            .map_err(|e| RenderError::WorkerPool(e.to_string()))?;

        let rendered: Vec<(ItemId, CompositeRenderResult)> = pool.install(|| {
            items
                .par_iter()
                .map(|(item_id, contributions)| {
                    self.render_item(item_id, contributions)
                        .map(|composite| (item_id.clone(), composite))
                })
                .collect::<Result<Vec<_>, _>>()
        })?;

        info!(items = rendered.len(), dir = %self.temp_render_dir.display(), "composites rendered");

        Ok(rendered
            .into_iter()
            .map(|(item_id, composite)| (item_id, vec![Render::CompositeImage(composite)]))
            .collect())
    }

    pub fn render_item(
        &self,
        item_id: &str,
        contributions: &[Contribution],
    ) -> Result<CompositeRenderResult, RenderError> {
        let task = self
            .tracker
            .as_ref()
            .map(|tracker| tracker.track_task(RENDER_TASK_NAME, format!("Item {item_id}")));

        let assets = composite_order(collect_assets(item_id, contributions)?, &self.exclude_parts);

        ensure_dir(&self.temp_render_dir).map_err(|source| RenderError::Io {
            item_id: ItemId::from(item_id),
            path: self.temp_render_dir.clone(),
            source,
        })?;

        let output_path = self.temp_render_dir.join(format!("{item_id}.png"));
        remove_if_present(&output_path).map_err(|source| RenderError::Io {
            item_id: ItemId::from(item_id),
            path: output_path.clone(),
            source,
        })?;

        debug!(item_id, layers = assets.len(), "rasterizing");
        let request = LayeredImageRequest {
            width: self.width,
            height: self.height,
            output_path: &output_path,
            assets: &assets,
        };
        if let Err(source) = self.processor.create_image_with_layers(&request) {
            if let Err(e) = remove_if_present(&output_path) {
                warn!(item_id, error = %e, "could not remove partial composite");
            }
            return Err(RenderError::RasterizationFailure {
                item_id: ItemId::from(item_id),
                source,
            });
        }

        let written = is_non_empty_file(&output_path).map_err(|source| RenderError::Io {
            item_id: ItemId::from(item_id),
            path: output_path.clone(),
            source,
        })?;
        if !written {
            return Err(RenderError::EmptyComposite {
                item_id: ItemId::from(item_id),
                path: output_path,
            });
        }

        if let Some(task) = task {
            task.end();
        }
        Ok(CompositeRenderResult { path: output_path })
    }
}

/// Concatenate the assets of every layer contribution, in contribution order
pub fn collect_assets(item_id: &str, contributions: &[Contribution]) -> Result<Vec<AssetRef>, RenderError> {
    let layers: Vec<_> = contributions.iter().filter_map(Contribution::as_layers).collect();

    if layers.is_empty() {
        return Err(RenderError::NoSupportedContribution {
            item_id: ItemId::from(item_id),
            kind: PayloadKind::ImageLayersGenerator,
        });
    }

    Ok(layers
        .into_iter()
        .flat_map(|layer| layer.assets.iter().cloned())
        .collect())
}

/// Drop excluded categories, then stable-sort by ascending z offset
pub fn composite_order(assets: Vec<AssetRef>, exclude_parts: &BTreeSet<String>) -> Vec<AssetRef> {
    let mut kept: Vec<AssetRef> = assets
        .into_iter()
        .filter(|asset| !exclude_parts.contains(asset.category()))
        .collect();
    kept.sort_by_key(|asset| asset.z_offset);
    kept
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}
