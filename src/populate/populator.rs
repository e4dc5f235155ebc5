//! Document population
//!
//! Walks a schema tree and builds one document instance. Each schema child
//! decides its own repeat count from the stream of its path under the
//! parent instance, so every draw is keyed by the names and repeat indices
//! of all its ancestors.

use super::generator::GeneratorFactory;
use super::overrides::{apply_overrides, Override};
use super::synthesizer::{ValueRule, ValueSynthesizer};
use super::value_path::ValuePath;
use super::RepeatablePopulateMode;
use crate::documents::{Document, Element};
use crate::error::Result;
use crate::limits::Limits;
use crate::schema::SchemaNode;
use tracing::debug;

/// Upper bound used for repeat draws when the schema allows more
const REPEAT_DRAW_CAP: u64 = 3;

/// Builds documents from a schema tree and a seed
#[derive(Debug, Clone)]
pub struct DocumentPopulator {
    seed: u64,
    mode: RepeatablePopulateMode,
    factory: GeneratorFactory,
    synthesizer: ValueSynthesizer,
    limits: Limits,
}

impl DocumentPopulator {
    /// Populator with the default value rules and limits
    pub fn new(seed: u64, mode: RepeatablePopulateMode) -> Self {
        let factory = GeneratorFactory::new(seed);
        Self {
            seed,
            mode,
            factory,
            synthesizer: ValueSynthesizer::new(factory),
            limits: Limits::default(),
        }
    }

    /// Replace the resource limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Replace the value rule table
    pub fn with_rules(mut self, rules: Vec<ValueRule>) -> Self {
        self.synthesizer = ValueSynthesizer::with_rules(self.factory, rules);
        self
    }

    /// The root seed
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The repeat policy
    pub fn mode(&self) -> RepeatablePopulateMode {
        self.mode
    }

    /// Build a document for `schema`
    pub fn populate(&self, schema: &SchemaNode) -> Result<Document> {
        schema.check_structure()?;
        debug!(seed = self.seed, mode = %self.mode, root = %schema.name, "populating document");

        let mut elements = 0usize;
        let root_path = ValuePath::root(schema.name.local_name.as_str());
        let root = self.build_instance(schema, &root_path, 0, 1, &mut elements)?;

        debug!(elements, "document populated");
        Ok(Document::new(root))
    }

    /// Build a document for `schema`, then apply `overrides` in order
    pub fn populate_with_overrides(
        &self,
        schema: &SchemaNode,
        overrides: &[Override],
    ) -> Result<Document> {
        let doc = self.populate(schema)?;
        apply_overrides(doc, overrides)
    }

    /// Repeat count for a schema position at `path`
    pub fn repeat_count(&self, schema: &SchemaNode, path: &ValuePath) -> u64 {
        let mut stream = self.factory.for_path(path);
        let cardinality = schema.cardinality;
        let cap = cardinality.max.unwrap_or(REPEAT_DRAW_CAP).min(REPEAT_DRAW_CAP);

        let (lo, hi) = match self.mode {
            RepeatablePopulateMode::Random => {
                let extra = stream.next_long(0, to_i64(cap));
                (cardinality.min, clamp_add(extra, cardinality.min.max(1)))
            }
            RepeatablePopulateMode::MinimumOne => {
                let extra = stream.next_long(0, to_i64(cap));
                (cardinality.min.max(1), clamp_add(extra, cardinality.min.max(2)))
            }
            RepeatablePopulateMode::ExactlyOne => (1, 2),
        };

        let count = stream.next_long(to_i64(lo), to_i64(hi));
        u64::try_from(count).unwrap_or(lo)
    }

    fn populate_position(
        &self,
        parent: &mut Element,
        schema: &SchemaNode,
        parent_instance: &ValuePath,
        depth: usize,
        elements: &mut usize,
    ) -> Result<()> {
        let current = parent_instance.append_name(schema.name.local_name.as_str());
        let count = self.repeat_count(schema, &current);

        for repeat_index in 0..count {
            let instance = current.append_index(repeat_index);
            let element = self.build_instance(schema, &instance, repeat_index, depth, elements)?;
            parent.add_child(element);
        }
        Ok(())
    }

    fn build_instance(
        &self,
        schema: &SchemaNode,
        instance: &ValuePath,
        repeat_index: u64,
        depth: usize,
        elements: &mut usize,
    ) -> Result<Element> {
        self.limits.check_document_depth(depth)?;
        *elements += 1;
        self.limits.check_document_nodes(*elements)?;

        let ty = &schema.schema_type;
        let mut element = Element::new(schema.name.clone());

        for attribute in ty.attributes.iter().filter(|a| a.schema_type.is_scalar) {
            let path = instance.append_attribute(&attribute.name.local_name);
            let value = self
                .synthesizer
                .synthesize(&path, 0, &attribute.name, &attribute.schema_type)?;
            element.set_attribute(attribute.name.clone(), value);
        }

        for child in &schema.children {
            self.populate_position(&mut element, child, instance, depth + 1, elements)?;
        }

        if ty.is_scalar {
            let text = self
                .synthesizer
                .synthesize(instance, repeat_index, &schema.name, ty)?;
            element.set_text(text);
        }

        Ok(element)
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn clamp_add(extra: i64, base: u64) -> u64 {
    u64::try_from(extra).unwrap_or(0).saturating_add(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::namespaces::QName;
    use crate::schema::loader::builtin_type;
    use crate::schema::{Cardinality, SchemaAttribute, SchemaType};

    fn leaf(name: &str, ty: &str, cardinality: Cardinality) -> SchemaNode {
        SchemaNode::new(QName::namespaced("urn:t", name), builtin_type(ty).unwrap())
            .with_cardinality(cardinality)
    }

    fn schema() -> SchemaNode {
        let item = SchemaNode::new(
            QName::namespaced("urn:t", "item"),
            SchemaType::complex(QName::local("Item")),
        )
        .with_cardinality(Cardinality::unbounded())
        .with_child(leaf("sequenceNumber", "integer", Cardinality::required()))
        .with_child(leaf("note", "string", Cardinality::optional()));

        let root_type = SchemaType::complex(QName::local("Root")).with_attribute(SchemaAttribute::new(
            QName::local("version"),
            builtin_type("token").unwrap(),
        ));

        SchemaNode::new(QName::namespaced("urn:t", "root"), root_type)
            .with_child(leaf("flag", "boolean", Cardinality::optional()))
            .with_child(item)
    }

    #[test]
    fn test_exactly_one() {
        let doc = DocumentPopulator::new(7, RepeatablePopulateMode::ExactlyOne)
            .populate(&schema())
            .unwrap();

        let names: Vec<_> = doc.root.child_elements().map(|e| e.local_name()).collect();
        assert_eq!(names, vec!["flag", "item"]);
        let item = doc.root.find_children("item")[0];
        assert_eq!(item.find_children("sequenceNumber")[0].text().as_deref(), Some("0"));
        assert_eq!(item.find_children("note").len(), 1);
        assert_eq!(doc.root.get_attribute("version").map(str::len), Some(4));
    }

    #[test]
    fn test_minimum_one_bounds() {
        for seed in 0..50 {
            let doc = DocumentPopulator::new(seed, RepeatablePopulateMode::MinimumOne)
                .populate(&schema())
                .unwrap();
            assert_eq!(doc.root.find_children("flag").len(), 1);

            let items = doc.root.find_children("item");
            assert!((1..=3).contains(&items.len()), "seed {}: {}", seed, items.len());
            // Each item holds one sequenceNumber, so every one is repeat 0.
            for item in items {
                assert_eq!(
                    item.find_children("sequenceNumber")[0].text(),
                    Some("0".to_string())
                );
            }
        }
    }

    #[test]
    fn test_sequence_number_follows_its_own_repeat_index() {
        let schema = SchemaNode::new(
            QName::namespaced("urn:t", "root"),
            SchemaType::complex(QName::local("Root")),
        )
        .with_child(leaf("sequenceNumber", "integer", Cardinality::unbounded()));

        let mut repeated = false;
        for seed in 0..50 {
            let doc = DocumentPopulator::new(seed, RepeatablePopulateMode::MinimumOne)
                .populate(&schema)
                .unwrap();
            let values: Vec<_> = doc
                .root
                .find_children("sequenceNumber")
                .iter()
                .map(|e| e.text())
                .collect();
            let expected: Vec<_> = (0..values.len()).map(|i| Some(i.to_string())).collect();
            assert_eq!(values, expected, "seed {}", seed);
            repeated |= values.len() > 1;
        }
        assert!(repeated);
    }

    #[test]
    fn test_random_skips_single_optionals() {
        for seed in 0..20 {
            let doc = DocumentPopulator::new(seed, RepeatablePopulateMode::Random)
                .populate(&schema())
                .unwrap();
            assert!(doc.root.find_children("flag").is_empty());
            assert!(doc.root.find_children("item").len() < 3);
        }
    }

    #[test]
    fn test_same_seed_same_document() {
        let populator = DocumentPopulator::new(42, RepeatablePopulateMode::MinimumOne);
        assert_eq!(
            populator.populate(&schema()).unwrap(),
            populator.populate(&schema()).unwrap()
        );
    }

    #[test]
    fn test_repeat_count_is_path_scoped() {
        let populator = DocumentPopulator::new(42, RepeatablePopulateMode::MinimumOne);
        let item = &schema().children[1];
        let path = ValuePath::root("root").append_name("item");
        assert_eq!(populator.repeat_count(item, &path), populator.repeat_count(item, &path));
    }

    #[test]
    fn test_node_limit() {
        let limits = Limits {
            max_document_nodes: 2,
            ..Limits::default()
        };
        let result = DocumentPopulator::new(1, RepeatablePopulateMode::ExactlyOne)
            .with_limits(limits)
            .populate(&schema());
        assert!(matches!(result, Err(Error::LimitExceeded(_))));
    }

    #[test]
    fn test_structural_errors_rejected() {
        let broken = SchemaNode::new(QName::local("root"), SchemaType::complex(QName::local("Root")));
        let result = DocumentPopulator::new(1, RepeatablePopulateMode::ExactlyOne).populate(&broken);
        assert!(matches!(result, Err(Error::Schema(_))));
    }
}
