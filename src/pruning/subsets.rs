//! Subset filtering

use super::drop_nodes_recursively;
use crate::documents::{Document, Element};
use crate::error::{Error, Result};
use crate::schema::{validate, BundledSchema, SchemaNode, SubsetId};
use std::collections::BTreeSet;
use tracing::debug;

/// Drop every element whose schema position is tagged with none of `subsets`
///
/// `element` must already conform to `schema`; an element with no schema
/// counterpart is an [`Error::Schema`]. An empty `subsets` is rejected.
pub fn drop_nodes_not_in_subsets(
    subsets: &BTreeSet<SubsetId>,
    schema: &SchemaNode,
    element: &mut Element,
) -> Result<usize> {
    if subsets.is_empty() {
        return Err(Error::Config("subsets must be non-empty".to_string()));
    }

    drop_nodes_recursively(schema, element, true, &mut |candidate, matched| {
        let matched = matched.ok_or_else(|| {
            Error::Schema(format!(
                "schema element for '{}' must not be missing",
                candidate.qname
            ))
        })?;
        Ok(!matched.in_any_subset(subsets))
    })
}

/// Copy of `doc` restricted to `subsets`
///
/// The input is validated against `schema` first; an invalid input is an
/// [`Error::Config`] carrying the validation message. Subset ids are not
/// checked against the schema.
pub fn filter_subsets(
    doc: &Document,
    subsets: &BTreeSet<SubsetId>,
    schema: &SchemaNode,
) -> Result<Document> {
    if let Some(error) = validate(doc, schema) {
        return Err(Error::Config(format!("Input document is not valid: {}", error)));
    }

    let mut filtered = doc.clone();
    let dropped = drop_nodes_not_in_subsets(subsets, schema, &mut filtered.root)?;
    debug!(dropped, subsets = ?subsets, "filtered document to subsets");

    if let Some(error) = validate(&filtered, schema) {
        debug!(%error, "filtered document no longer validates");
    }
    Ok(filtered)
}

/// [`filter_subsets`] against the consignment common grammar
pub fn filter_common_subsets(doc: &Document, subsets: &BTreeSet<SubsetId>) -> Result<Document> {
    let schema = BundledSchema::ConsignmentCommon.load()?;
    filter_subsets(doc, subsets, &schema)
}

/// [`filter_subsets`] against the consignment identifier grammar
pub fn filter_identifier_subsets(
    doc: &Document,
    subsets: &BTreeSet<SubsetId>,
) -> Result<Document> {
    let schema = BundledSchema::ConsignmentIdentifier.load()?;
    filter_subsets(doc, subsets, &schema)
}
