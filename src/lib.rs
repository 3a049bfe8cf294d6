//! ForgeArt Core - Layered Collection Renderer
//!
//! # Guarantees
//! 1. Contribution order is fold order
//! 2. Excluded categories never reach an output
//! 3. Paint order is a stable sort on z offset
//! 4. One composite per item, or an error naming the item
//! 5. Export publishes the whole collection or nothing

pub mod kinds;
pub mod contribution;
pub mod renders;
pub mod source;
pub mod attributes;
pub mod processor;
pub mod layers;
pub mod export;
pub mod hashing;
pub mod perf;
pub mod config;
pub mod pipeline;
mod fsutil;

pub use kinds::{PayloadKind, KIND_ALIASES};
pub use contribution::{AssetRef, Contribution, ItemId, ItemsContributions, LayerContribution, TraitContribution};
pub use renders::{AggregatedAttributes, AttributeMap, CompositeRenderResult, ItemsRenders, Render, RenderError};
pub use source::{load_contributions, ContributionSource, RenderSource};
pub use attributes::AttributesRenderer;
pub use processor::{ImageProcessor, LayeredImageRequest, ProcessorError, RasterImageProcessor};
pub use layers::LayersRenderer;
pub use export::{ExportError, ExportReport, ImagesExporter};
pub use perf::PerformanceTracker;
pub use config::{EngineConfig, TextTemplate};
pub use pipeline::{CollectionPipeline, PipelineError, RunManifest};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
