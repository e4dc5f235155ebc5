//! Schema definition loading
//!
//! Grammars are described in a small JSON format: a target namespace, a table
//! of named types and the element tree. Type names not found in the table
//! resolve to XSD built-in types with their built-in derivation chains.

use super::{Cardinality, SchemaAttribute, SchemaNode, SchemaType, SubsetId};
use crate::error::{Error, ParseError, Result};
use crate::namespaces::QName;
use crate::XSD_NAMESPACE;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Complete grammar definition
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinition {
    /// Target namespace of all elements and named types
    #[serde(default)]
    pub namespace: Option<String>,
    /// Named type table
    #[serde(default)]
    pub types: Vec<TypeDefinition>,
    /// Document element
    pub root: ElementDefinition,
}

/// Named type
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinition {
    /// Type name
    pub name: String,
    /// Base type name
    #[serde(default)]
    pub base: Option<String>,
    /// Allowed literals
    #[serde(default)]
    pub enumeration: Vec<String>,
    /// Declared attributes
    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
    /// Element-only content
    #[serde(default)]
    pub complex: bool,
}

/// Attribute declaration
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeDefinition {
    /// Attribute name
    pub name: String,
    /// Value type name
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Element declaration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    /// Element name
    pub name: String,
    /// Type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Minimum occurrences
    #[serde(default = "default_min_occurs")]
    pub min_occurs: u64,
    /// Maximum occurrences; `null` means unbounded
    #[serde(default = "default_max_occurs")]
    pub max_occurs: Option<u64>,
    /// Subset tags
    #[serde(default)]
    pub subsets: Vec<String>,
    /// Child elements in content-model order
    #[serde(default)]
    pub children: Vec<ElementDefinition>,
}

fn default_min_occurs() -> u64 {
    1
}

fn default_max_occurs() -> Option<u64> {
    Some(1)
}

impl SchemaDefinition {
    /// Parse a definition from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a definition from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Build the schema tree
    pub fn compile(&self) -> Result<SchemaNode> {
        let mut resolver = TypeResolver::new(self);
        let root = compile_element(&self.root, &mut resolver, "")?;
        root.check_structure()?;
        Ok(root)
    }
}

fn compile_element(
    definition: &ElementDefinition,
    resolver: &mut TypeResolver<'_>,
    parent_path: &str,
) -> Result<SchemaNode> {
    let path = format!("{}/{}", parent_path, definition.name);
    let schema_type = resolver
        .resolve(&definition.type_name)
        .map_err(|e| locate(e, &path))?;

    let subsets = definition
        .subsets
        .iter()
        .map(SubsetId::new)
        .collect::<Result<Vec<_>>>()?;

    let children = definition
        .children
        .iter()
        .map(|child| compile_element(child, resolver, &path))
        .collect::<Result<Vec<_>>>()?;

    let mut node = SchemaNode::new(
        QName::new(resolver.namespace.clone(), definition.name.as_str()),
        schema_type,
    )
    .with_cardinality(Cardinality::new(definition.min_occurs, definition.max_occurs))
    .with_subsets(subsets);
    node.children = children;
    Ok(node)
}

fn locate(err: Error, path: &str) -> Error {
    match err {
        Error::Parse(e) if e.location.is_none() => Error::Parse(e.with_location(path)),
        other => other,
    }
}

struct TypeResolver<'a> {
    namespace: Option<String>,
    definitions: HashMap<&'a str, &'a TypeDefinition>,
    resolved: HashMap<String, SchemaType>,
    in_progress: HashSet<String>,
}

impl<'a> TypeResolver<'a> {
    fn new(schema: &'a SchemaDefinition) -> Self {
        Self {
            namespace: schema.namespace.clone(),
            definitions: schema.types.iter().map(|t| (t.name.as_str(), t)).collect(),
            resolved: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    fn resolve(&mut self, name: &str) -> Result<SchemaType> {
        if let Some(resolved) = self.resolved.get(name) {
            return Ok(resolved.clone());
        }

        let resolved = match self.definitions.get(name).copied() {
            Some(definition) => self.resolve_definition(definition)?,
            None => builtin_type(name.strip_prefix("xs:").unwrap_or(name)).ok_or_else(|| {
                Error::Parse(ParseError::new(format!("Unknown type '{}'", name)))
            })?,
        };

        self.resolved.insert(name.to_string(), resolved.clone());
        Ok(resolved)
    }

    fn resolve_definition(&mut self, definition: &TypeDefinition) -> Result<SchemaType> {
        if !self.in_progress.insert(definition.name.clone()) {
            return Err(Error::Parse(ParseError::new(format!(
                "Circular base type chain through '{}'",
                definition.name
            ))));
        }

        let base = definition
            .base
            .as_deref()
            .map(|base| self.resolve(base))
            .transpose()?;

        let mut attributes = base
            .as_ref()
            .map(|b| b.attributes.clone())
            .unwrap_or_default();
        for attribute in &definition.attributes {
            let attribute_type = self.resolve(&attribute.type_name)?;
            attributes.retain(|a: &SchemaAttribute| a.name.local_name != attribute.name);
            attributes.push(SchemaAttribute::new(
                QName::local(attribute.name.as_str()),
                attribute_type,
            ));
        }

        let enumeration_values = if definition.enumeration.is_empty() {
            base.as_ref()
                .map(|b| b.enumeration_values.clone())
                .unwrap_or_default()
        } else {
            definition.enumeration.clone()
        };

        let base_types = match base {
            Some(base) => {
                let mut chain = vec![base.clone()];
                chain.extend(base.base_types);
                chain
            }
            None => Vec::new(),
        };

        self.in_progress.remove(&definition.name);

        Ok(SchemaType {
            name: QName::new(self.namespace.clone(), definition.name.as_str()),
            enumeration_values,
            attributes,
            base_types,
            is_scalar: !definition.complex,
        })
    }
}

/// Parent of an XSD built-in simple type, `None` for primitives
fn builtin_base(name: &str) -> Option<Option<&'static str>> {
    let base = match name {
        "string" | "decimal" | "boolean" | "float" | "double" | "base64Binary" | "hexBinary"
        | "dateTime" | "date" | "time" | "duration" | "anyURI" | "QName" => None,
        "normalizedString" => Some("string"),
        "token" => Some("normalizedString"),
        "language" | "NMTOKEN" | "Name" => Some("token"),
        "NCName" => Some("Name"),
        "ID" | "IDREF" => Some("NCName"),
        "integer" => Some("decimal"),
        "long" | "nonNegativeInteger" | "nonPositiveInteger" => Some("integer"),
        "int" => Some("long"),
        "short" => Some("int"),
        "positiveInteger" => Some("nonNegativeInteger"),
        _ => return None,
    };
    Some(base)
}

/// XSD built-in type with its derivation chain
pub fn builtin_type(name: &str) -> Option<SchemaType> {
    let mut current = builtin_base(name)?;
    let mut chain = Vec::new();
    while let Some(base) = current {
        chain.push(base);
        current = builtin_base(base).flatten();
    }

    // Each ancestor carries its own chain, so build them from the top down.
    let mut base_types: Vec<SchemaType> = Vec::new();
    for ancestor in chain.iter().rev() {
        let ty = SchemaType::scalar(QName::namespaced(XSD_NAMESPACE, *ancestor))
            .with_base_types(base_types.clone());
        base_types.insert(0, ty);
    }

    Some(SchemaType::scalar(QName::namespaced(XSD_NAMESPACE, name)).with_base_types(base_types))
}
