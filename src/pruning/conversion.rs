//! Conversion to a structurally narrower grammar

use super::drop_nodes_recursively;
use crate::documents::{Document, Element, Node};
use crate::error::{Error, Result};
use crate::schema::{BundledSchema, SchemaNode};
use tracing::debug;

/// Derive a document for `target` from `doc`
///
/// Elements without a counterpart in `target` are dropped, matching by local
/// name. Every element in the source document's namespace is then moved to
/// the target namespace, and the result is normalized through one
/// serialize and parse round trip.
pub fn convert(doc: &Document, target: &SchemaNode) -> Result<Document> {
    if doc.root.local_name() != target.name.local_name {
        return Err(Error::Schema(format!(
            "cannot convert '{}' to a '{}' document",
            doc.root.qname, target.name
        )));
    }

    let mut converted = doc.clone();
    let dropped =
        drop_nodes_recursively(target, &mut converted.root, false, &mut |_, matched| {
            Ok(matched.is_none())
        })?;

    let source_namespace = doc.root.namespace();
    let target_namespace = target.name.namespace.as_deref();
    rename_namespace(&mut converted.root, source_namespace, target_namespace);
    debug!(dropped, target = %target.name, "converted document");

    Document::parse(&converted.serialize(false)?, true)
}

/// Convert a consignment common document to an identifier document
pub fn common_to_identifiers(doc: &Document) -> Result<Document> {
    let target = BundledSchema::ConsignmentIdentifier.load()?;
    convert(doc, &target)
}

fn rename_namespace(element: &mut Element, from: Option<&str>, to: Option<&str>) {
    if element.namespace() == from {
        element.qname = element.qname.with_namespace(to);
    }
    for child in element.children.iter_mut() {
        if let Node::Element(e) = child {
            rename_namespace(e, from, to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populate::{DocumentPopulator, RepeatablePopulateMode};
    use crate::schema::validate;

    #[test]
    fn test_common_to_identifiers() {
        let common_schema = BundledSchema::ConsignmentCommon.load().unwrap();
        let identifier_schema = BundledSchema::ConsignmentIdentifier.load().unwrap();
        let common = DocumentPopulator::new(1234, RepeatablePopulateMode::MinimumOne)
            .populate(&common_schema)
            .unwrap();

        let identifiers = common_to_identifiers(&common).unwrap();

        assert_eq!(validate(&identifiers, &identifier_schema), None);
        assert_eq!(
            identifiers.root.namespace(),
            Some(BundledSchema::ConsignmentIdentifier.namespace())
        );
        assert!(identifiers.root.find_children("includedConsignmentItem").is_empty());
        assert_eq!(
            identifiers.root.find_children("mainCarriageTransportMovement").len(),
            common.root.find_children("mainCarriageTransportMovement").len()
        );
        assert!(identifiers.element_count() < common.element_count());
    }

    #[test]
    fn test_values_carried_over() {
        let common_schema = BundledSchema::ConsignmentCommon.load().unwrap();
        let common = DocumentPopulator::new(5, RepeatablePopulateMode::ExactlyOne)
            .populate(&common_schema)
            .unwrap();
        let identifiers = common_to_identifiers(&common).unwrap();

        let mode = |doc: &Document| {
            doc.root.find_children("mainCarriageTransportMovement")[0]
                .find_children("modeCode")[0]
                .text()
        };
        assert_eq!(mode(&identifiers), mode(&common));
    }

    #[test]
    fn test_root_mismatch_rejected() {
        let doc = Document::parse("<other/>", true).unwrap();
        let target = BundledSchema::ConsignmentIdentifier.load().unwrap();
        assert!(matches!(convert(&doc, &target), Err(Error::Schema(_))));
    }
}
