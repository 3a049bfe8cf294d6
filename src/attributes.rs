//! Attribute Aggregator
//!
//! Folds every trait contribution of an item into one attribute record.
//! Each fold step builds a fresh record from the previous one.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::contribution::{Contribution, ItemId, TraitContribution};
use crate::kinds::PayloadKind;
use crate::renders::{AggregatedAttributes, AttributeMap, ItemsRenders, Render, RenderError};
use crate::source::ContributionSource;

pub type NameFn = Arc<dyn Fn(&str) -> String + Send + Sync>;
pub type DescriptionFn = Arc<dyn Fn(&AttributeMap) -> String + Send + Sync>;

pub struct AttributesRenderer {
    source: Arc<dyn ContributionSource>,
    name: NameFn,
    description: DescriptionFn,
    exclude_parts: BTreeSet<String>,
}

impl AttributesRenderer {
    pub fn new(source: Arc<dyn ContributionSource>) -> Self {
        Self {
            source,
            name: Arc::new(|_| String::new()),
            description: Arc::new(|_| String::new()),
            exclude_parts: BTreeSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.name = Arc::new(name);
        self
    }

    pub fn with_description(
        mut self,
        description: impl Fn(&AttributeMap) -> String + Send + Sync + 'static,
    ) -> Self {
        self.description = Arc::new(description);
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

    /// Aggregate every item the source knows about
    pub fn render(&self) -> Result<ItemsRenders, RenderError> {
        let items = self.source.contributions();
        let mut renders = ItemsRenders::new();

        for (item_id, contributions) in &items {
            let aggregated = self.aggregate(item_id, contributions)?;
            renders.insert(item_id.clone(), vec![Render::Attributes(aggregated)]);
        }

        info!(items = renders.len(), "attributes aggregated");
        Ok(renders)
    }

    pub fn aggregate(
        &self,
        item_id: &str,
        contributions: &[Contribution],
    ) -> Result<AggregatedAttributes, RenderError> {
        let supported: Vec<&TraitContribution> =
            contributions.iter().filter_map(Contribution::as_traits).collect();

        if supported.is_empty() {
            return Err(RenderError::NoSupportedContribution {
                item_id: ItemId::from(item_id),
                kind: PayloadKind::ItemAttributesGenerator,
            });
        }

        let aggregated = supported
            .into_iter()
            .fold(AggregatedAttributes::default(), |merged, traits| {
                self.fold_step(item_id, merged, traits)
            });

        debug!(item_id, categories = aggregated.attributes.len(), "attributes merged");
        Ok(aggregated)
    }

    fn fold_step(
        &self,
        item_id: &str,
        merged: AggregatedAttributes,
        traits: &TraitContribution,
    ) -> AggregatedAttributes {
        let mut dna = merged.dna;
        dna.push(traits.dna.clone());

        let mut attributes = merged.attributes;
        for (category, value) in &traits.attributes {
            if self.exclude_parts.contains(category) {
                continue;
            }
            attributes
                .entry(category.clone())
                .or_default()
                .push(value.clone());
        }

        AggregatedAttributes {
            dna,
            name: (self.name)(item_id),
            description: (self.description)(&attributes),
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contribution::{ItemsContributions, TaggedPayload};
    use std::collections::BTreeMap;

    fn traits(dna: &str, pairs: &[(&str, &str)]) -> Contribution {
        Contribution::Traits(TraitContribution {
            dna: dna.to_string(),
            attributes: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        })
    }

    fn renderer(items: ItemsContributions) -> AttributesRenderer {
        AttributesRenderer::new(Arc::new(items))
    }

    #[test]
    fn test_values_accumulate_in_fold_order() {
        let contributions = vec![
            traits("a", &[("Body", "red"), ("Eyes", "blue")]),
            traits("b", &[("Body", "gold")]),
        ];
        let merged = renderer(ItemsContributions::new())
            .aggregate("1", &contributions)
            .unwrap();

        assert_eq!(merged.dna, vec!["a", "b"]);
        assert_eq!(merged.attributes["Body"], vec!["red", "gold"]);
        assert_eq!(merged.attributes["Eyes"], vec!["blue"]);
    }

    #[test]
    fn test_excluded_category_never_appears() {
        let contributions = vec![
            traits("a", &[("Aura", "fire"), ("Body", "red")]),
            traits("b", &[("Aura", "ice")]),
        ];
        let merged = renderer(ItemsContributions::new())
            .with_exclude_parts(["Aura"])
            .aggregate("1", &contributions)
            .unwrap();

        assert!(!merged.attributes.contains_key("Aura"));
        assert_eq!(merged.dna.len(), 2);
    }

    #[test]
    fn test_name_and_description_reflect_final_state() {
        let contributions = vec![
            traits("a", &[("Body", "red")]),
            traits("b", &[("Eyes", "green")]),
        ];
        let merged = renderer(ItemsContributions::new())
            .with_name(|id| format!("Ape {id}"))
            .with_description(|attrs| format!("{} categories", attrs.len()))
            .aggregate("7", &contributions)
            .unwrap();

        assert_eq!(merged.name, "Ape 7");
        assert_eq!(merged.description, "2 categories");
    }

    #[test]
    fn test_layer_and_unknown_kinds_are_ignored() {
        let contributions = vec![
            Contribution::Unrecognized(TaggedPayload {
                kind: "Other".to_string(),
                data: serde_json::Value::Null,
            }),
            traits("a", &[("Body", "red")]),
        ];
        let merged = renderer(ItemsContributions::new())
            .aggregate("1", &contributions)
            .unwrap();
        assert_eq!(merged.dna, vec!["a"]);
    }

    #[test]
    fn test_no_trait_contribution_is_fatal() {
        let items = ItemsContributions::from([
            ("1".to_string(), vec![traits("a", &[])]),
            ("2".to_string(), vec![]),
        ]);
        let err = renderer(items).render().unwrap_err();
        match err {
            RenderError::NoSupportedContribution { item_id, kind } => {
                assert_eq!(item_id, "2");
                assert_eq!(kind, PayloadKind::ItemAttributesGenerator);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_render_emits_one_record_per_item() {
        let items = ItemsContributions::from([
            ("1".to_string(), vec![traits("a", &[("Body", "red")])]),
            ("2".to_string(), vec![traits("b", &[("Body", "blue")])]),
        ]);
        let renders = renderer(items).render().unwrap();
        assert_eq!(renders.len(), 2);
        for outputs in renders.values() {
            assert_eq!(outputs.len(), 1);
            assert!(outputs[0].as_attributes().is_some());
        }
    }
}
