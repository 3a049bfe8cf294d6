//! Contributions - Tagged Upstream Payloads
//!
//! One item receives any number of contributions from independent generators.
//! The `kind` discriminator is resolved through the alias table in
//! [`crate::kinds`]; kinds this crate does not consume are preserved verbatim.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kinds::PayloadKind;

pub type ItemId = String;

/// Contributions per item, ordered by item id
pub type ItemsContributions = BTreeMap<ItemId, Vec<Contribution>>;

/// Wire form shared by contributions and renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedPayload {
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitContribution {
    pub dna: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerContribution {
    pub dna: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub assets: Vec<AssetRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
    pub path: String,
    #[serde(default)]
    pub x_offset: i32,
    #[serde(default)]
    pub y_offset: i32,
    #[serde(default)]
    pub z_offset: i32,
}

impl AssetRef {
    pub fn new(path: impl Into<String>, z_offset: i32) -> Self {
        Self {
            path: path.into(),
            x_offset: 0,
            y_offset: 0,
            z_offset,
        }
    }

    /// Category from the `<category>__<variant>` file name convention.
    ///
    /// A file name without `__` has the empty category.
    pub fn category(&self) -> &str {
        let file_name = self.path.rsplit('/').next().unwrap_or("");
        file_name
            .split_once("__")
            .map(|(category, _)| category)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TaggedPayload", into = "TaggedPayload")]
pub enum Contribution {
    Traits(TraitContribution),
    Layers(LayerContribution),
    /// Any kind not consumed by this crate, including render kinds
    Unrecognized(TaggedPayload),
}

impl Contribution {
    pub fn kind(&self) -> Option<PayloadKind> {
        match self {
            Contribution::Traits(_) => Some(PayloadKind::ItemAttributesGenerator),
            Contribution::Layers(_) => Some(PayloadKind::ImageLayersGenerator),
            Contribution::Unrecognized(_) => None,
        }
    }

    pub fn as_traits(&self) -> Option<&TraitContribution> {
        match self {
            Contribution::Traits(traits) => Some(traits),
            _ => None,
        }
    }

    pub fn as_layers(&self) -> Option<&LayerContribution> {
        match self {
            Contribution::Layers(layers) => Some(layers),
            _ => None,
        }
    }
}

impl TryFrom<TaggedPayload> for Contribution {
    type Error = serde_json::Error;

    fn try_from(payload: TaggedPayload) -> Result<Self, Self::Error> {
        match PayloadKind::resolve(&payload.kind) {
            Some(PayloadKind::ItemAttributesGenerator) => {
                serde_json::from_value(payload.data).map(Contribution::Traits)
            }
            Some(PayloadKind::ImageLayersGenerator) => {
                serde_json::from_value(payload.data).map(Contribution::Layers)
            }
            _ => Ok(Contribution::Unrecognized(payload)),
        }
    }
}

impl From<Contribution> for TaggedPayload {
    fn from(contribution: Contribution) -> Self {
        match contribution {
            Contribution::Traits(traits) => TaggedPayload {
                kind: PayloadKind::ItemAttributesGenerator.tag().to_string(),
                data: serde_json::to_value(traits).unwrap_or_default(),
            },
            Contribution::Layers(layers) => TaggedPayload {
                kind: PayloadKind::ImageLayersGenerator.tag().to_string(),
                data: serde_json::to_value(layers).unwrap_or_default(),
            },
            Contribution::Unrecognized(payload) => payload,
        }
    }
}
