//! Engine Configuration
//!
//! One JSON file drives a run. Names and descriptions are text templates
//! since closures cannot live in a config file.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::export::DEFAULT_IMAGES_FOLDER;
use crate::renders::AttributeMap;
use crate::ENGINE_VERSION;

/// Subdirectory of the cache path holding working composites
pub const RENDERERS_TEMP_CACHE_DIR: &str = "renderers-temp";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid canvas {width}x{height}: dimensions must be positive")]
    InvalidCanvas { width: u32, height: u32 },

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Config requires engine >= {required}, current is {current}")]
    EngineVersionMismatch { required: String, current: String },

    #[error("Unterminated placeholder in template: {0}")]
    UnterminatedPlaceholder(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub cache_path: PathBuf,
    pub output_path: PathBuf,
    #[serde(default = "default_engine_min_version")]
    pub engine_min_version: String,
    #[serde(default)]
    pub attributes: AttributesConfig,
    pub layers: LayersConfig,
    #[serde(default)]
    pub exporter: ExporterConfig,
}

fn default_engine_min_version() -> String {
    "1.0.0".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributesConfig {
    #[serde(default)]
    pub name_template: Option<String>,
    #[serde(default)]
    pub description_template: Option<String>,
    #[serde(default)]
    pub exclude_parts: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayersConfig {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub exclude_parts: BTreeSet<String>,
    /// Rasterization workers; 0 means one per core
    #[serde(default)]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExporterConfig {
    #[serde(default = "default_images_folder")]
    pub images_folder: String,
}

fn default_images_folder() -> String {
    DEFAULT_IMAGES_FOLDER.to_string()
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            images_folder: default_images_folder(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.layers.width == 0 || self.layers.height == 0 {
            return Err(ConfigError::InvalidCanvas {
                width: self.layers.width,
                height: self.layers.height,
            });
        }

        let engine_ver = semver::Version::parse(ENGINE_VERSION)
            .map_err(|_| ConfigError::InvalidVersion(ENGINE_VERSION.to_string()))?;
        let min_ver = semver::Version::parse(&self.engine_min_version)
            .map_err(|_| ConfigError::InvalidVersion(self.engine_min_version.clone()))?;
        if engine_ver < min_ver {
            return Err(ConfigError::EngineVersionMismatch {
                required: self.engine_min_version.clone(),
                current: ENGINE_VERSION.to_string(),
            });
        }

        for template in [&self.attributes.name_template, &self.attributes.description_template]
            .into_iter()
            .flatten()
        {
            TextTemplate::parse(template)?;
        }

        Ok(())
    }

    pub fn temp_render_dir(&self) -> PathBuf {
        self.cache_path.join(RENDERERS_TEMP_CACHE_DIR)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// `{id}` is the item id; `{Category}` is that category's first value.
/// `{{` and `}}` are literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTemplate {
    segments: Vec<Segment>,
}

impl TextTemplate {
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => {
                                return Err(ConfigError::UnterminatedPlaceholder(source.to_string()))
                            }
                        }
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    pub fn render_name(&self, item_id: &str) -> String {
        self.expand(|name| (name == "id").then(|| item_id.to_string()))
    }

    pub fn render_description(&self, attributes: &AttributeMap) -> String {
        self.expand(|name| attributes.get(name).and_then(|values| values.first()).cloned())
    }

    fn expand(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Placeholder(name) => lookup(name).unwrap_or_default(),
            })
            .collect()
    }
}
