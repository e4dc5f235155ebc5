//! XML namespace handling
//!
//! This module provides qualified names (QNames) and the prefix scopes used
//! while parsing and serializing documents.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Same local name under another namespace
    pub fn with_namespace(&self, namespace: Option<&str>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local_name: self.local_name.clone(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// Namespace context for resolving prefixes
///
/// One context is kept per open element; a child scope starts as a clone of
/// its parent and then applies the element's own declarations.
#[derive(Debug, Clone, Default)]
pub struct NamespaceContext {
    /// Mapping from prefix to namespace URI
    prefixes: HashMap<Prefix, NamespaceUri>,
    /// Default namespace (no prefix)
    default_namespace: Option<NamespaceUri>,
}

impl NamespaceContext {
    /// Create a new empty namespace context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Set the default namespace; an empty URI undeclares it
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        self.default_namespace = if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        };
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(crate::XML_NAMESPACE);
        }
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Find a prefix already bound to `namespace`
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        if namespace == crate::XML_NAMESPACE {
            return Some("xml");
        }
        self.prefixes
            .iter()
            .filter(|(_, ns)| ns.as_str() == namespace)
            .map(|(prefix, _)| prefix.as_str())
            .min()
    }

    /// Number of bound prefixes
    pub fn prefix_count(&self) -> usize {
        self.prefixes.len()
    }

    /// Resolve a prefixed element name to a QName
    pub fn resolve(&self, prefixed_name: &str) -> Result<QName> {
        if let Some((prefix, local)) = prefixed_name.split_once(':') {
            let namespace = self
                .get_namespace(prefix)
                .ok_or_else(|| Error::Xml(format!("Unknown namespace prefix: {}", prefix)))?;
            Ok(QName::namespaced(namespace, local))
        } else {
            Ok(QName::new(self.default_namespace.clone(), prefixed_name))
        }
    }

    /// Resolve a prefixed attribute name; unprefixed attributes have no namespace
    pub fn resolve_attribute(&self, prefixed_name: &str) -> Result<QName> {
        if prefixed_name.contains(':') {
            self.resolve(prefixed_name)
        } else {
            Ok(QName::local(prefixed_name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_creation() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.namespace, Some("http://example.com".to_string()));
        assert_eq!(qname.local_name, "element");
    }

    #[test]
    fn test_qname_to_string() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.to_string(), "{http://example.com}element");

        let qname_local = QName::local("element");
        assert_eq!(qname_local.to_string(), "element");
    }

    #[test]
    fn test_with_namespace() {
        let qname = QName::namespaced("urn:a", "item");
        assert_eq!(qname.with_namespace(Some("urn:b")), QName::namespaced("urn:b", "item"));
        assert_eq!(qname.with_namespace(None), QName::local("item"));
    }

    #[test]
    fn test_resolve_names() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("p", "urn:p");
        ctx.set_default_namespace("urn:default");

        assert_eq!(ctx.resolve("p:a").unwrap(), QName::namespaced("urn:p", "a"));
        assert_eq!(ctx.resolve("a").unwrap(), QName::namespaced("urn:default", "a"));
        assert_eq!(ctx.resolve_attribute("a").unwrap(), QName::local("a"));
        assert!(ctx.resolve("q:a").is_err());
    }

    #[test]
    fn test_undeclare_default_namespace() {
        let mut ctx = NamespaceContext::new();
        ctx.set_default_namespace("urn:default");
        ctx.set_default_namespace("");
        assert_eq!(ctx.get_default_namespace(), None);
    }

    #[test]
    fn test_prefix_for() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("ns1", "urn:x");
        assert_eq!(ctx.prefix_for("urn:x"), Some("ns1"));
        assert_eq!(ctx.prefix_for(crate::XML_NAMESPACE), Some("xml"));
        assert_eq!(ctx.prefix_for("urn:y"), None);
    }
}
