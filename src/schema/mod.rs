//! Schema Model
//!
//! The in-memory grammar the populator walks: a tree of [`SchemaNode`]s, one
//! per content-model position. Sequence, choice and all groups are flattened
//! into each node's ordered `children`. Trees are read-only once built and can
//! be shared across threads (see [`cache`]).

pub mod cache;
pub mod loader;
pub mod validation;

pub use cache::{schema_has_subset, BundledSchema, SchemaCache};
pub use loader::{AttributeDefinition, ElementDefinition, SchemaDefinition, TypeDefinition};
pub use validation::{check, validate};

use crate::error::{Error, Result};
use crate::namespaces::QName;
use std::collections::BTreeSet;
use std::fmt;

/// Opaque subset tag carried by schema nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubsetId(String);

impl SubsetId {
    /// Create a subset id; blank ids are rejected
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::Config("subset id must not be blank".to_string()));
        }
        Ok(Self(id))
    }

    /// The raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubsetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Occurrence bounds of a content-model position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinality {
    /// Minimum occurrences
    pub min: u64,
    /// Maximum occurrences (None means unbounded)
    pub max: Option<u64>,
}

impl Cardinality {
    /// Create bounds
    pub fn new(min: u64, max: Option<u64>) -> Self {
        Self { min, max }
    }

    /// Exactly one occurrence
    pub fn required() -> Self {
        Self::new(1, Some(1))
    }

    /// Zero or one occurrence
    pub fn optional() -> Self {
        Self::new(0, Some(1))
    }

    /// Zero or more occurrences
    pub fn unbounded() -> Self {
        Self::new(0, None)
    }

    /// Whether `count` occurrences are permitted
    pub fn allows(&self, count: u64) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::required()
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..unbounded", self.min),
        }
    }
}

/// Attribute declared on a type
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaAttribute {
    /// Attribute name
    pub name: QName,
    /// Attribute value type
    pub schema_type: SchemaType,
}

impl SchemaAttribute {
    /// Create an attribute declaration
    pub fn new(name: QName, schema_type: SchemaType) -> Self {
        Self { name, schema_type }
    }
}

/// Content description of a schema node
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaType {
    /// Type name
    pub name: QName,
    /// Allowed literals; non-empty means a closed choice
    pub enumeration_values: Vec<String>,
    /// Attributes declared directly on this type
    pub attributes: Vec<SchemaAttribute>,
    /// Ancestor types, most specific first, without `anyType`
    pub base_types: Vec<SchemaType>,
    /// Whether the type carries direct text content
    pub is_scalar: bool,
}

impl SchemaType {
    /// Scalar (simple content) type
    pub fn scalar(name: QName) -> Self {
        Self {
            name,
            enumeration_values: Vec::new(),
            attributes: Vec::new(),
            base_types: Vec::new(),
            is_scalar: true,
        }
    }

    /// Element-only content type
    pub fn complex(name: QName) -> Self {
        Self {
            is_scalar: false,
            ..Self::scalar(name)
        }
    }

    /// Restrict to a closed set of literals
    pub fn with_enumeration<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enumeration_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Declare an attribute
    pub fn with_attribute(mut self, attribute: SchemaAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Set the ancestor chain
    pub fn with_base_types(mut self, base_types: Vec<SchemaType>) -> Self {
        self.base_types = base_types;
        self
    }

    /// This type followed by its ancestors
    pub fn type_chain(&self) -> impl Iterator<Item = &SchemaType> {
        std::iter::once(self).chain(self.base_types.iter())
    }
}

/// One position of the content model
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// Element name
    pub name: QName,
    /// Element content type
    pub schema_type: SchemaType,
    /// Permitted repetitions
    pub cardinality: Cardinality,
    /// Child positions in content-model order
    pub children: Vec<SchemaNode>,
    /// Subsets this position belongs to
    pub subsets: BTreeSet<SubsetId>,
}

impl SchemaNode {
    /// Create a node with default cardinality and no children
    pub fn new(name: QName, schema_type: SchemaType) -> Self {
        Self {
            name,
            schema_type,
            cardinality: Cardinality::default(),
            children: Vec::new(),
            subsets: BTreeSet::new(),
        }
    }

    /// Set the cardinality
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Append a child position
    pub fn with_child(mut self, child: SchemaNode) -> Self {
        self.children.push(child);
        self
    }

    /// Set the subset tags
    pub fn with_subsets(mut self, subsets: impl IntoIterator<Item = SubsetId>) -> Self {
        self.subsets = subsets.into_iter().collect();
        self
    }

    /// Child position by local name
    pub fn find_child(&self, local_name: &str) -> Option<&SchemaNode> {
        self.children
            .iter()
            .find(|child| child.name.local_name == local_name)
    }

    /// Whether this position is tagged with any of `subsets`
    pub fn in_any_subset(&self, subsets: &BTreeSet<SubsetId>) -> bool {
        self.subsets.iter().any(|subset| subsets.contains(subset))
    }

    /// Check the structural invariants of this subtree
    ///
    /// Element-only types must have children, and enumerations are only
    /// allowed on scalar types.
    pub fn check_structure(&self) -> Result<()> {
        let ty = &self.schema_type;
        if !ty.is_scalar && self.children.is_empty() {
            return Err(Error::Schema(format!(
                "element '{}' has element-only type '{}' but no children",
                self.name, ty.name
            )));
        }
        if !ty.enumeration_values.is_empty() && !ty.is_scalar {
            return Err(Error::Schema(format!(
                "type '{}' has enumeration values but no text content",
                ty.name
            )));
        }
        if let Some(max) = self.cardinality.max {
            if self.cardinality.min > max {
                return Err(Error::Schema(format!(
                    "element '{}' has minOccurs {} greater than maxOccurs {}",
                    self.name, self.cardinality.min, max
                )));
            }
        }
        self.children.iter().try_for_each(SchemaNode::check_structure)
    }
}
