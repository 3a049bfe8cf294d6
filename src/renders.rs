//! Render Outputs - What Renderers Produce Per Item

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contribution::{ItemId, TaggedPayload};
use crate::kinds::PayloadKind;
use crate::processor::ProcessorError;

/// Category to merged values, in fold order
pub type AttributeMap = BTreeMap<String, Vec<String>>;

/// Render outputs per item, ordered by item id
pub type ItemsRenders = BTreeMap<ItemId, Vec<Render>>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No supported {kind} contribution for item {item_id}")]
    NoSupportedContribution { item_id: ItemId, kind: PayloadKind },

    #[error("Rasterization failed for item {item_id}: {source}")]
    RasterizationFailure {
        item_id: ItemId,
        #[source]
        source: ProcessorError,
    },

    #[error("Composite for item {item_id} is empty: {}", path.display())]
    EmptyComposite { item_id: ItemId, path: PathBuf },

    #[error("Invalid canvas {width}x{height}: dimensions must be positive")]
    InvalidCanvas { width: u32, height: u32 },

    #[error("I/O error for item {item_id} at {}: {source}", path.display())]
    Io {
        item_id: ItemId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedAttributes {
    pub dna: Vec<String>,
    pub name: String,
    pub description: String,
    pub attributes: AttributeMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRenderResult {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TaggedPayload", into = "TaggedPayload")]
pub enum Render {
    Attributes(AggregatedAttributes),
    CompositeImage(CompositeRenderResult),
    /// Output of some other upstream renderer
    Unrecognized(TaggedPayload),
}

impl Render {
    pub fn kind(&self) -> Option<PayloadKind> {
        match self {
            Render::Attributes(_) => Some(PayloadKind::ItemAttributesRenderer),
            Render::CompositeImage(_) => Some(PayloadKind::StaticLayeredImagesRenderer),
            Render::Unrecognized(_) => None,
        }
    }

    pub fn as_attributes(&self) -> Option<&AggregatedAttributes> {
        match self {
            Render::Attributes(attributes) => Some(attributes),
            _ => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeRenderResult> {
        match self {
            Render::CompositeImage(composite) => Some(composite),
            _ => None,
        }
    }
}

impl TryFrom<TaggedPayload> for Render {
    type Error = serde_json::Error;

    fn try_from(payload: TaggedPayload) -> Result<Self, Self::Error> {
        match PayloadKind::resolve(&payload.kind) {
            Some(PayloadKind::ItemAttributesRenderer) => {
                serde_json::from_value(payload.data).map(Render::Attributes)
            }
            Some(PayloadKind::StaticLayeredImagesRenderer) => {
                serde_json::from_value(payload.data).map(Render::CompositeImage)
            }
            _ => Ok(Render::Unrecognized(payload)),
        }
    }
}

impl From<Render> for TaggedPayload {
    fn from(render: Render) -> Self {
        match render {
            Render::Attributes(attributes) => TaggedPayload {
                kind: PayloadKind::ItemAttributesRenderer.tag().to_string(),
                data: serde_json::to_value(attributes).unwrap_or_default(),
            },
            Render::CompositeImage(composite) => TaggedPayload {
                kind: PayloadKind::StaticLayeredImagesRenderer.tag().to_string(),
                data: serde_json::to_value(composite).unwrap_or_default(),
            },
            Render::Unrecognized(payload) => payload,
        }
    }
}

/// Append one renderer's output to the registry
pub fn merge_renders(registry: &mut ItemsRenders, renders: ItemsRenders) {
    for (item_id, outputs) in renders {
        registry.entry(item_id).or_default().extend(outputs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_render_kind() {
        let value = json!({
            "kind": "StaticLayeredImagesRendererInterface@v1",
            "data": {"path": "/tmp/1.png"}
        });
        let render: Render = serde_json::from_value(value).unwrap();
        assert_eq!(render.as_composite().unwrap().path, PathBuf::from("/tmp/1.png"));
    }

    #[test]
    fn test_merge_preserves_order() {
        let mut registry = ItemsRenders::new();
        let first = ItemsRenders::from([(
            "1".to_string(),
            vec![Render::Attributes(AggregatedAttributes::default())],
        )]);
        let second = ItemsRenders::from([(
            "1".to_string(),
            vec![Render::CompositeImage(CompositeRenderResult { path: "a.png".into() })],
        )]);

        merge_renders(&mut registry, first);
        merge_renders(&mut registry, second);

        let outputs = &registry["1"];
        assert_eq!(outputs.len(), 2);
        assert!(outputs[0].as_attributes().is_some());
        assert!(outputs[1].as_composite().is_some());
    }

    #[test]
    fn test_error_names_item() {
        let err = RenderError::NoSupportedContribution {
            item_id: "42".to_string(),
            kind: PayloadKind::ImageLayersGenerator,
        };
        assert!(err.to_string().contains("42"));
    }
}
