//! Run Pipeline - Aggregate, Composite, Export
//!
//! Thin wiring over the three components for hosts that do not bring their
//! own orchestrator. Any failure aborts the run.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::attributes::AttributesRenderer;
use crate::config::{ConfigError, EngineConfig, TextTemplate};
use crate::contribution::{ItemId, ItemsContributions};
use crate::export::{ExportError, ExportReport, ImagesExporter};
use crate::layers::LayersRenderer;
use crate::perf::{PerformanceTracker, TaskSummary};
use crate::processor::{ImageProcessor, RasterImageProcessor};
use crate::renders::{merge_renders, AggregatedAttributes, ItemsRenders, RenderError};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub item_count: usize,
    pub attributes: BTreeMap<ItemId, AggregatedAttributes>,
    pub export: ExportReport,
    pub performance: Vec<TaskSummary>,
    /// Stable across runs with identical inputs
    pub collection_hash: String,
}

pub struct CollectionPipeline {
    config: EngineConfig,
    processor: Arc<dyn ImageProcessor>,
    tracker: Arc<PerformanceTracker>,
}

impl CollectionPipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            processor: Arc::new(RasterImageProcessor),
            tracker: Arc::new(PerformanceTracker::new()),
        }
    }

    pub fn with_processor(mut self, processor: Arc<dyn ImageProcessor>) -> Self {
        self.processor = processor;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tracker(&self) -> &PerformanceTracker {
        &self.tracker
    }

    /// Aggregator only, no files touched
    pub fn attributes_renderer(
        &self,
        source: Arc<ItemsContributions>,
    ) -> Result<AttributesRenderer, PipelineError> {
        let settings = &self.config.attributes;
        let mut renderer = AttributesRenderer::new(source)
            .with_exclude_parts(settings.exclude_parts.iter().cloned());

        if let Some(template) = &settings.name_template {
            let template = TextTemplate::parse(template)?;
            renderer = renderer.with_name(move |item_id| template.render_name(item_id));
        }
        if let Some(template) = &settings.description_template {
            let template = TextTemplate::parse(template)?;
            renderer = renderer.with_description(move |attributes| template.render_description(attributes));
        }
        Ok(renderer)
    }

    pub fn run(&self, contributions: ItemsContributions) -> Result<RunManifest, PipelineError> {
        self.config.validate()?;

        let item_count = contributions.len();
        let source = Arc::new(contributions);
        info!(items = item_count, "run started");

        let mut registry = ItemsRenders::new();

        let attribute_renders = self.attributes_renderer(source.clone())?.render()?;
        merge_renders(&mut registry, attribute_renders);

        let layers = &self.config.layers;
        let layer_renders = LayersRenderer::new(
            source,
            layers.width,
            layers.height,
            self.config.temp_render_dir(),
        )?
        .with_processor(self.processor.clone())
        .with_exclude_parts(layers.exclude_parts.iter().cloned())
        .with_concurrency(layers.concurrency)
        .with_tracker(self.tracker.clone())
        .render()?;
        merge_renders(&mut registry, layer_renders);

        let attributes: BTreeMap<ItemId, AggregatedAttributes> = registry
            .iter()
            .filter_map(|(item_id, renders)| {
                renders
                    .iter()
                    .find_map(|render| render.as_attributes())
                    .map(|attributes| (item_id.clone(), attributes.clone()))
            })
            .collect();

        let export_task = self.tracker.track_task("Export", "images");
        let export = ImagesExporter::new(Arc::new(registry), &self.config.output_path)
            .with_images_folder(self.config.exporter.images_folder.clone())
            .export()?;
        export_task.end();

        let collection_hash = export.collection_hash.clone();
        info!(items = item_count, hash = %collection_hash, "run finished");

        Ok(RunManifest {
            run_id: Uuid::new_v4().to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            item_count,
            attributes,
            export,
            performance: self.tracker.summary(),
            collection_hash,
        })
    }
}
