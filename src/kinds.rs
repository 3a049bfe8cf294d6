//! Payload Kinds - Closed Set With Legacy Aliases
//!
//! Upstream producers tag every payload with a `kind` string. Older producers
//! emit the `<Name>Interface@v1` form, newer ones the bare name. Both resolve
//! to the same variant here; anything else is unrecognized.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PayloadKind {
    /// Trait key/value pairs for one item
    ItemAttributesGenerator,
    /// Layer assets (plus traits) for one item
    ImageLayersGenerator,
    /// Merged attribute record
    ItemAttributesRenderer,
    /// Rasterized composite image
    StaticLayeredImagesRenderer,
}

/// Every accepted kind string. The first entry per kind is canonical.
pub const KIND_ALIASES: &[(&str, PayloadKind)] = &[
    ("ItemAttributesGenerator", PayloadKind::ItemAttributesGenerator),
    ("ItemAttributesGeneratorInterface@v1", PayloadKind::ItemAttributesGenerator),
    ("ImageLayersGenerator", PayloadKind::ImageLayersGenerator),
    ("ImageLayersGeneratorInterface@v1", PayloadKind::ImageLayersGenerator),
    ("ItemAttributesRenderer", PayloadKind::ItemAttributesRenderer),
    ("ItemAttributesRendererInterface@v1", PayloadKind::ItemAttributesRenderer),
    ("StaticLayeredImagesRenderer", PayloadKind::StaticLayeredImagesRenderer),
    ("StaticLayeredImagesRendererInterface@v1", PayloadKind::StaticLayeredImagesRenderer),
];

impl PayloadKind {
    pub const ALL: [PayloadKind; 4] = [
        PayloadKind::ItemAttributesGenerator,
        PayloadKind::ImageLayersGenerator,
        PayloadKind::ItemAttributesRenderer,
        PayloadKind::StaticLayeredImagesRenderer,
    ];

    /// Resolve a wire `kind` string, exact match only
    pub fn resolve(kind: &str) -> Option<Self> {
        KIND_ALIASES
            .iter()
            .find(|(alias, _)| *alias == kind)
            .map(|(_, resolved)| *resolved)
    }

    /// Canonical tag written on serialization
    pub fn tag(self) -> &'static str {
        match self {
            PayloadKind::ItemAttributesGenerator => "ItemAttributesGenerator",
            PayloadKind::ImageLayersGenerator => "ImageLayersGenerator",
            PayloadKind::ItemAttributesRenderer => "ItemAttributesRenderer",
            PayloadKind::StaticLayeredImagesRenderer => "StaticLayeredImagesRenderer",
        }
    }

    pub fn aliases(self) -> impl Iterator<Item = &'static str> {
        KIND_ALIASES
            .iter()
            .filter(move |(_, kind)| *kind == self)
            .map(|(alias, _)| *alias)
    }

    pub fn matches(self, kind: &str) -> bool {
        Self::resolve(kind) == Some(self)
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_alias_resolves_to_same_kind() {
        assert_eq!(
            PayloadKind::resolve("ImageLayersGeneratorInterface@v1"),
            Some(PayloadKind::ImageLayersGenerator)
        );
        assert_eq!(
            PayloadKind::resolve("ImageLayersGenerator"),
            Some(PayloadKind::ImageLayersGenerator)
        );
    }

    #[test]
    fn test_unknown_kind_is_none() {
        assert_eq!(PayloadKind::resolve("imagelayersgenerator"), None);
        assert_eq!(PayloadKind::resolve(""), None);
    }

    #[test]
    fn test_canonical_tag_is_first_alias() {
        for kind in PayloadKind::ALL {
            assert_eq!(kind.aliases().next(), Some(kind.tag()));
            assert_eq!(PayloadKind::resolve(kind.tag()), Some(kind));
        }
    }
}
