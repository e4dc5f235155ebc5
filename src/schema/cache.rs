//! Process-wide schema cache and bundled grammars
//!
//! Compiled schema trees are built lazily, once per key, and handed out as
//! shared read-only `Arc`s. Entries are never replaced or mutated.

use super::loader::SchemaDefinition;
use super::{SchemaNode, SubsetId};
use crate::error::Result;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Namespace of the consignment common grammar
pub const CONSIGNMENT_COMMON_NAMESPACE: &str = "http://efti.eu/v1/consignment/common";

/// Namespace of the consignment identifier grammar
pub const CONSIGNMENT_IDENTIFIER_NAMESPACE: &str = "http://efti.eu/v1/consignment/identifier";

const CONSIGNMENT_COMMON_DEFINITION: &str =
    include_str!("../../schemas/consignment-common.json");

const CONSIGNMENT_IDENTIFIER_DEFINITION: &str =
    include_str!("../../schemas/consignment-identifier.json");

static GLOBAL_CACHE: Lazy<SchemaCache> = Lazy::new(SchemaCache::new);

/// Lazily populated map of compiled schemas
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: Mutex<HashMap<String, Arc<SchemaNode>>>,
}

impl SchemaCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache
    pub fn global() -> &'static SchemaCache {
        &GLOBAL_CACHE
    }

    /// Cached schema for `key`, building it with `build` on first use
    ///
    /// A failed build is not cached; the next call tries again.
    pub fn get_or_try_insert<F>(&self, key: &str, build: F) -> Result<Arc<SchemaNode>>
    where
        F: FnOnce() -> Result<SchemaNode>,
    {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(schema) = entries.get(key) {
            debug!(key, "schema cache hit");
            return Ok(Arc::clone(schema));
        }

        debug!(key, "schema cache miss, compiling");
        let schema = Arc::new(build()?);
        entries.insert(key.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Number of cached schemas
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Grammars shipped with the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BundledSchema {
    /// Full consignment document
    ConsignmentCommon,
    /// Identifier-only consignment document, a structural subset of the common one
    ConsignmentIdentifier,
}

impl BundledSchema {
    /// Cache key
    pub fn key(&self) -> &'static str {
        match self {
            BundledSchema::ConsignmentCommon => "consignment-common",
            BundledSchema::ConsignmentIdentifier => "consignment-identifier",
        }
    }

    /// Target namespace of the grammar
    pub fn namespace(&self) -> &'static str {
        match self {
            BundledSchema::ConsignmentCommon => CONSIGNMENT_COMMON_NAMESPACE,
            BundledSchema::ConsignmentIdentifier => CONSIGNMENT_IDENTIFIER_NAMESPACE,
        }
    }

    /// Raw JSON definition
    pub fn definition(&self) -> &'static str {
        match self {
            BundledSchema::ConsignmentCommon => CONSIGNMENT_COMMON_DEFINITION,
            BundledSchema::ConsignmentIdentifier => CONSIGNMENT_IDENTIFIER_DEFINITION,
        }
    }

    /// Compiled schema from the global cache
    pub fn load(&self) -> Result<Arc<SchemaNode>> {
        SchemaCache::global().get_or_try_insert(self.key(), || {
            SchemaDefinition::from_json(self.definition())?.compile()
        })
    }

    /// Whether the grammar tags any position with `subset`
    pub fn has_subset(&self, subset: &SubsetId) -> Result<bool> {
        let schema = self.load()?;
        Ok(schema_has_subset(&schema, subset))
    }
}

/// Whether any position in `schema` is tagged with `subset`
pub fn schema_has_subset(schema: &SchemaNode, subset: &SubsetId) -> bool {
    schema.subsets.contains(subset)
        || schema
            .children
            .iter()
            .any(|child| schema_has_subset(child, subset))
}
