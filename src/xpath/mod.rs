//! Restricted XPath for document overrides
//!
//! Overrides address nodes with a small structural subset of XPath:
//!
//! - element name steps separated by `/`, optionally anchored with a leading `/`
//! - `[N]` positional predicates (1-based) and `[@attr='value']` equality predicates
//! - a trailing `@attr` to select an attribute, or `text()` to select text nodes
//!
//! Names are matched by local name; prefixes written in an expression are
//! ignored. Descendant, parent and other axes are not supported.

mod parsers;
mod selectors;

pub use parsers::{NodeTest, PathExpression, Predicate, Step, Target, XPathParseError};
pub use selectors::NodeRef;
