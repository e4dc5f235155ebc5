//! Conversion and subset filtering on populated consignments

use std::collections::BTreeSet;
use xmlpopulate::documents::Element;
use xmlpopulate::pruning::{common_to_identifiers, filter_common_subsets, filter_subsets};
use xmlpopulate::schema::{validate, BundledSchema, SchemaNode};
use xmlpopulate::{Document, DocumentPopulator, Error, RepeatablePopulateMode, SubsetId};

fn subsets(values: &[&str]) -> BTreeSet<SubsetId> {
    values.iter().map(|v| SubsetId::new(*v).unwrap()).collect()
}

fn common(seed: u64) -> Document {
    let schema = BundledSchema::ConsignmentCommon.load().unwrap();
    DocumentPopulator::new(seed, RepeatablePopulateMode::MinimumOne)
        .populate(&schema)
        .unwrap()
}

/// Every element left in `element` is tagged with one of `keep`
fn assert_only_subsets(element: &Element, schema: &SchemaNode, keep: &BTreeSet<SubsetId>) {
    for child in element.child_elements() {
        let child_schema = schema.find_child(child.local_name()).unwrap();
        assert!(child_schema.in_any_subset(keep), "'{}' survived", child.local_name());
        assert_only_subsets(child, child_schema, keep);
    }
}

#[test]
fn test_identifier_documents_from_common_validate() {
    let identifier = BundledSchema::ConsignmentIdentifier.load().unwrap();
    for seed in 1..=25 {
        let converted = common_to_identifiers(&common(seed)).unwrap();
        assert_eq!(validate(&converted, &identifier), None, "seed {}", seed);
    }
}

#[test]
fn test_conversion_leaves_input_untouched() {
    let doc = common(8);
    let before = doc.clone();
    common_to_identifiers(&doc).unwrap();
    assert_eq!(doc, before);
}

#[test]
fn test_filtered_documents_keep_only_tagged_elements() {
    let schema = BundledSchema::ConsignmentCommon.load().unwrap();
    let doc = common(31);

    let cases: [&[&str]; 3] = [&["FI01"], &["EE02"], &["BE03a", "SI03"]];
    for keep in cases {
        let keep = subsets(keep);
        let filtered = filter_common_subsets(&doc, &keep).unwrap();
        assert_only_subsets(&filtered.root, &schema, &keep);
        assert!(filtered.element_count() <= doc.element_count());
    }
}

#[test]
fn test_filtering_keeps_values() {
    let doc = common(12);
    let filtered = filter_common_subsets(&doc, &subsets(&["FI01"])).unwrap();

    let modes = |doc: &Document| -> Vec<Option<String>> {
        doc.root
            .find_children("mainCarriageTransportMovement")
            .iter()
            .map(|m| m.find_children("modeCode")[0].text())
            .collect()
    };
    assert_eq!(modes(&filtered), modes(&doc));
}

#[test]
fn test_unknown_subset_drops_everything_below_root() {
    let filtered = filter_common_subsets(&common(5), &subsets(&["XX99"])).unwrap();
    assert_eq!(filtered.root.child_elements().count(), 0);
}

#[test]
fn test_invalid_input_is_rejected() {
    let schema = BundledSchema::ConsignmentCommon.load().unwrap();
    let doc = Document::parse("<consignment><unexpected/></consignment>", true).unwrap();
    let result = filter_subsets(&doc, &subsets(&["FI01"]), &schema);
    assert!(matches!(result, Err(Error::Config(message)) if message.starts_with("Input document is not valid")));
}
