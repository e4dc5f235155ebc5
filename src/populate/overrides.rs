//! Path-addressed document overrides
//!
//! Overrides run strictly in order, each against the result of the previous
//! ones. Expressions name elements without prefixes, so a document whose
//! root carries a namespace is edited on a namespace-free copy and the
//! namespace is put back afterwards.

use crate::documents::{Document, Element, Node, NodePath};
use crate::error::{Error, Result};
use crate::namespaces::{NamespaceContext, QName};
use crate::names::split_qname;
use crate::xpath::{NodeRef, PathExpression};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Separator between expression and value in the textual override form
pub const OVERRIDE_SEPARATOR: &str = ":=";

/// One ordered edit of a populated document
#[derive(Debug, Clone, PartialEq)]
pub enum Override {
    /// Replace the text of every matched element, attribute or text node
    SetText {
        /// Compiled target expression
        expression: PathExpression,
        /// Replacement text
        value: String,
    },
    /// Remove every matched node with its subtree
    DeleteNode {
        /// Compiled target expression
        expression: PathExpression,
    },
}

impl Override {
    /// Set-text override; the expression is compiled immediately
    pub fn set_text(expression: &str, value: impl Into<String>) -> Result<Self> {
        Ok(Override::SetText {
            expression: PathExpression::compile(expression)?,
            value: value.into(),
        })
    }

    /// Delete override; the expression is compiled immediately
    pub fn delete_node(expression: &str) -> Result<Self> {
        Ok(Override::DeleteNode {
            expression: PathExpression::compile(expression)?,
        })
    }

    /// The target expression
    pub fn expression(&self) -> &PathExpression {
        match self {
            Override::SetText { expression, .. } | Override::DeleteNode { expression } => {
                expression
            }
        }
    }

    /// Apply to `doc` in place, returning the number of matched nodes
    pub fn apply(&self, doc: &mut Document) -> Result<usize> {
        let matches = self.expression().select(doc);
        let count = matches.len();

        match self {
            Override::SetText { value, .. } => {
                for target in matches {
                    set_text(&mut doc.root, target, value);
                }
            }
            Override::DeleteNode { expression } => {
                if matches.iter().any(|m| matches!(m, NodeRef::Element(p) if p.is_empty())) {
                    return Err(Error::Config(format!(
                        "'{}' selects the document element, which cannot be deleted",
                        expression
                    )));
                }
                delete(&mut doc.root, matches);
            }
        }

        Ok(count)
    }
}

impl fmt::Display for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Override::SetText { expression, value } => {
                write!(f, "{} {} {}", expression, OVERRIDE_SEPARATOR, value)
            }
            Override::DeleteNode { expression } => write!(f, "delete {}", expression),
        }
    }
}

impl FromStr for Override {
    type Err = Error;

    /// Parse `<expression>:=<value>` into a set-text override
    fn from_str(s: &str) -> Result<Self> {
        let (expression, value) = s.split_once(OVERRIDE_SEPARATOR).ok_or_else(|| {
            Error::Config(format!(
                "override '{}' must have the form <expression>{}<value>",
                s, OVERRIDE_SEPARATOR
            ))
        })?;

        let expression = expression.trim();
        if expression.is_empty() {
            return Err(Error::Config(format!("override '{}' has no expression", s)));
        }
        Override::set_text(expression, value.trim())
    }
}

fn set_text(root: &mut Element, target: NodeRef, value: &str) {
    match target {
        NodeRef::Element(path) => {
            if let Some(element) = root.element_at_mut(&path) {
                element.set_text(value);
            }
        }
        NodeRef::Attribute(path, name) => {
            if let Some(element) = root.element_at_mut(&path) {
                element.attributes.insert(name, value.to_string());
            }
        }
        NodeRef::Text(path) => {
            if let Some(node) = root.node_at_mut(&path) {
                *node = Node::Text(value.to_string());
            }
        }
    }
}

/// Remove matched nodes, grouping child indices by parent first
fn delete(root: &mut Element, matches: Vec<NodeRef>) {
    let mut children: BTreeMap<NodePath, BTreeSet<usize>> = BTreeMap::new();

    for target in matches {
        match target {
            NodeRef::Attribute(path, name) => {
                if let Some(element) = root.element_at_mut(&path) {
                    element.attributes.shift_remove(&name);
                }
            }
            NodeRef::Element(mut path) | NodeRef::Text(mut path) => {
                if let Some(index) = path.pop() {
                    children.entry(path).or_default().insert(index);
                }
            }
        }
    }

    // Deepest parents first, so shallower removals never shift pending paths.
    for (parent, indices) in children.into_iter().rev() {
        if let Some(element) = root.element_at_mut(&parent) {
            element.remove_children(&indices);
        }
    }
}

/// Apply `overrides` in order
pub fn apply_overrides(doc: Document, overrides: &[Override]) -> Result<Document> {
    if overrides.is_empty() {
        return Ok(doc);
    }

    let namespace = doc.root.namespace().map(str::to_string);
    let mut working = match namespace {
        Some(_) => Document::parse(&doc.serialize(false)?, false)?,
        None => doc,
    };

    for item in overrides {
        let matched = item.apply(&mut working)?;
        debug!(%item, matched, "applied override");
    }

    match namespace {
        Some(namespace) => Ok(Document::new(restore_namespace(
            &working.root,
            &namespace,
            &NamespaceContext::new(),
        ))),
        None => Ok(working),
    }
}

/// Recreate an unresolved tree with every element in `namespace`
///
/// Namespace declarations are dropped; prefixed attributes are resolved
/// against the declarations that were in scope.
fn restore_namespace(element: &Element, namespace: &str, scope: &NamespaceContext) -> Element {
    let mut ctx = scope.clone();
    for (name, value) in &element.attributes {
        if let Some(prefix) = name.local_name.strip_prefix("xmlns:") {
            ctx.add_prefix(prefix, value.as_str());
        }
    }

    let mut restored = Element::new(QName::namespaced(namespace, element.local_name()));
    for (name, value) in &element.attributes {
        let raw = name.local_name.as_str();
        if raw == "xmlns" || raw.starts_with("xmlns:") {
            continue;
        }
        let qname = match split_qname(raw) {
            (Some(prefix), local) => match ctx.get_namespace(prefix) {
                Some(uri) => QName::namespaced(uri, local),
                None => name.clone(),
            },
            (None, _) => name.clone(),
        };
        restored.attributes.insert(qname, value.clone());
    }

    for child in &element.children {
        match child {
            Node::Element(e) => restored.add_child(restore_namespace(e, namespace, &ctx)),
            other => restored.children.push(other.clone()),
        }
    }
    restored
}
