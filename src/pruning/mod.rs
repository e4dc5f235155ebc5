//! Tree pruning
//!
//! [`drop_nodes_recursively`] walks a document alongside its schema tree and
//! removes the element children a predicate rejects. Removals are collected
//! per parent before the child list is rebuilt, and only surviving children
//! are descended into. Text and comment nodes are never candidates.
//!
//! Two predicates are built on it: conversion to a narrower grammar
//! ([`conversion`]) and subset filtering ([`subsets`]).

pub mod conversion;
pub mod subsets;

pub use conversion::{common_to_identifiers, convert};
pub use subsets::{
    drop_nodes_not_in_subsets, filter_common_subsets, filter_identifier_subsets, filter_subsets,
};

use crate::documents::{Element, Node};
use crate::error::{Error, Result};
use crate::schema::SchemaNode;
use std::collections::BTreeSet;

/// Remove children of `element` for which `should_drop` returns true, recursively
///
/// Children are matched to `schema.children` by local name, and also by
/// namespace when `namespace_aware` is set. Only this first level honours
/// the flag; deeper levels match by local name alone. A surviving child with
/// no schema counterpart is an [`Error::Schema`].
///
/// Returns the number of removed elements.
pub fn drop_nodes_recursively<F>(
    schema: &SchemaNode,
    element: &mut Element,
    namespace_aware: bool,
    should_drop: &mut F,
) -> Result<usize>
where
    F: FnMut(&Element, Option<&SchemaNode>) -> Result<bool>,
{
    let mut doomed = BTreeSet::new();
    for (index, node) in element.children.iter().enumerate() {
        let Node::Element(child) = node else {
            continue;
        };
        let matched = schema.children.iter().find(|candidate| {
            candidate.name.local_name == child.local_name()
                && (!namespace_aware || candidate.name.namespace.as_deref() == child.namespace())
        });
        if should_drop(child, matched)? {
            doomed.insert(index);
        }
    }

    let mut dropped = doomed.len();
    element.remove_children(&doomed);

    for child in element.child_elements_mut() {
        let child_schema = schema.find_child(child.local_name()).ok_or_else(|| {
            Error::Schema(format!(
                "no schema element for '{}' under '{}'",
                child.local_name(),
                schema.name
            ))
        })?;
        dropped += drop_nodes_recursively(child_schema, child, false, should_drop)?;
    }

    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::Document;
    use crate::namespaces::QName;
    use crate::schema::loader::builtin_type;
    use crate::schema::SchemaType;

    fn schema() -> SchemaNode {
        let leaf = |name: &str| {
            SchemaNode::new(QName::namespaced("urn:t", name), builtin_type("string").unwrap())
        };
        SchemaNode::new(
            QName::namespaced("urn:t", "root"),
            SchemaType::complex(QName::local("Root")),
        )
        .with_child(
            SchemaNode::new(
                QName::namespaced("urn:t", "group"),
                SchemaType::complex(QName::local("Group")),
            )
            .with_child(leaf("keep"))
            .with_child(leaf("drop")),
        )
        .with_child(leaf("other"))
    }

    fn parse(xml: &str) -> Document {
        Document::parse(xml, true).unwrap()
    }

    #[test]
    fn test_drops_by_predicate_and_keeps_text_and_comments() {
        let mut doc = parse(
            r#"<root xmlns="urn:t"><!--note--><group><keep>k</keep><drop>d</drop></group><other>o</other></root>"#,
        );
        let dropped = drop_nodes_recursively(&schema(), &mut doc.root, true, &mut |e, _| {
            Ok(e.local_name() == "drop" || e.local_name() == "other")
        })
        .unwrap();

        assert_eq!(dropped, 2);
        assert_eq!(
            doc,
            parse(r#"<root xmlns="urn:t"><!--note--><group><keep>k</keep></group></root>"#)
        );
    }

    #[test]
    fn test_namespace_checked_only_at_first_level() {
        let mut doc = parse(
            r#"<root xmlns="urn:t"><group xmlns="urn:other"><keep/></group><other/></root>"#,
        );
        let mut unmatched = Vec::new();
        drop_nodes_recursively(&schema(), &mut doc.root, true, &mut |e, m| {
            if m.is_none() {
                unmatched.push(e.local_name().to_string());
            }
            Ok(false)
        })
        .unwrap();

        // The foreign group is unmatched, its child is matched by local name alone.
        assert_eq!(unmatched, vec!["group"]);
    }

    #[test]
    fn test_surviving_unknown_child_is_an_error() {
        let mut doc = parse(r#"<root xmlns="urn:t"><unknown/></root>"#);
        let result = drop_nodes_recursively(&schema(), &mut doc.root, true, &mut |_, _| Ok(false));
        assert!(matches!(result, Err(Error::Schema(_))));
    }

    #[test]
    fn test_predicate_errors_propagate() {
        let mut doc = parse(r#"<root xmlns="urn:t"><other/></root>"#);
        let result = drop_nodes_recursively(&schema(), &mut doc.root, true, &mut |_, _| {
            Err(Error::Config("stop".to_string()))
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
