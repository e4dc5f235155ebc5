//! # xmlpopulate
//!
//! Deterministic, schema-conformant XML sample documents.
//!
//! A document is populated from a schema tree and a single seed. Every
//! generated value is drawn from a random stream keyed by its position in
//! the document, so two runs with the same seed produce the same bytes and
//! changing one part of a document leaves unrelated values untouched.
//! Populated documents can then be edited with path-addressed overrides and
//! pruned down to a narrower grammar or to a set of subsets.
//!
//! ## Features
//!
//! - Three repeat policies for repeatable elements
//! - Set-text and delete overrides addressed by a small path language
//! - Namespace-transparent override matching
//! - Subset filtering and conversion to a structurally narrower grammar
//! - Bundled consignment grammars, loaded once per process
//!
//! ## Example
//!
//! ```rust,ignore
//! use xmlpopulate::populate::{DocumentPopulator, Override, RepeatablePopulateMode};
//! use xmlpopulate::schema::BundledSchema;
//!
//! let schema = BundledSchema::ConsignmentCommon.load()?;
//! let doc = DocumentPopulator::new(42, RepeatablePopulateMode::MinimumOne)
//!     .populate_with_overrides(&schema, &["consignment/deliveryEvent/actualOccurrenceDateTime := 202401010000+0000".parse()?])?;
//! println!("{}", doc.serialize(true)?);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Names and documents
pub mod namespaces;
pub mod names;
pub mod documents;

// Grammar
pub mod schema;

// Path expressions
pub mod xpath;

// Generation and mutation
pub mod populate;
pub mod pruning;

// Re-exports for convenience
pub use documents::{Document, Element, Node};
pub use error::{Error, Result};
pub use populate::{DocumentPopulator, Override, RepeatablePopulateMode};
pub use schema::{SchemaNode, SchemaType, SubsetId};

/// Version of the xmlpopulate library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD namespace, used for built-in type names
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
