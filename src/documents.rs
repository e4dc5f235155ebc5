//! XML document tree, parsing and serialization
//!
//! Populated documents are plain owned trees: an [`Element`] owns its
//! attributes and an ordered list of child [`Node`]s. Nodes are addressed by
//! index paths from the root, which lets the override engine and the pruner
//! collect their targets first and rebuild child lists afterwards.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::names::split_qname;
use crate::namespaces::{NamespaceContext, QName};
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeSet;

/// Index path of a node, relative to the document root element
pub type NodePath = Vec<usize>;

/// A child node of an element
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Nested element
    Element(Element),
    /// Character data
    Text(String),
    /// Comment
    Comment(String),
}

impl Node {
    /// Borrow as element
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Borrow as mutable element
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }
}

/// XML Element in the document tree
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Element qualified name
    pub qname: QName,
    /// Raw prefix, only kept by non-namespace-aware parsing
    pub prefix: Option<String>,
    /// Element attributes in document order
    pub attributes: IndexMap<QName, String>,
    /// Child nodes in document order
    pub children: Vec<Node>,
}

impl Element {
    /// Create a new element
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            prefix: None,
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> Option<&str> {
        self.qname.namespace.as_deref()
    }

    /// Name as written in markup (`prefix:local` or `local`)
    pub fn tag_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.qname.local_name),
            None => self.qname.local_name.clone(),
        }
    }

    /// Get an attribute value by local name
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(qname, _)| split_qname(&qname.local_name).1 == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute value, keeping its position if it already exists
    pub fn set_attribute(&mut self, qname: QName, value: impl Into<String>) {
        self.attributes.insert(qname, value.into());
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Append a text node
    pub fn append_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// Append a comment node
    pub fn append_comment(&mut self, comment: impl Into<String>) {
        self.children.push(Node::Comment(comment.into()));
    }

    /// Concatenated direct text content, if the element has any text nodes
    pub fn text(&self) -> Option<String> {
        let mut text: Option<String> = None;
        for child in &self.children {
            if let Node::Text(t) = child {
                text.get_or_insert_with(String::new).push_str(t);
            }
        }
        text
    }

    /// Replace all children with a single text node
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.children.clear();
        if !text.is_empty() {
            self.children.push(Node::Text(text));
        }
    }

    /// Iterate child elements
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Iterate child elements mutably
    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(Node::as_element_mut)
    }

    /// Find child elements by local name
    pub fn find_children(&self, local_name: &str) -> Vec<&Element> {
        self.child_elements()
            .filter(|e| e.local_name() == local_name)
            .collect()
    }

    /// Number of elements in this subtree, including this one
    pub fn element_count(&self) -> usize {
        1 + self.child_elements().map(Element::element_count).sum::<usize>()
    }

    /// Node at `path`, relative to this element
    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (last, parents) = path.split_last()?;
        let parent = self.element_at_mut(parents)?;
        parent.children.get_mut(*last)
    }

    /// Element at `path`; the empty path is this element
    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let mut current = self;
        for index in path {
            current = current.children.get(*index)?.as_element()?;
        }
        Some(current)
    }

    /// Mutable element at `path`; the empty path is this element
    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for index in path {
            current = current.children.get_mut(*index)?.as_element_mut()?;
        }
        Some(current)
    }

    /// Rebuild the child list without the given indices
    pub fn remove_children(&mut self, indices: &BTreeSet<usize>) {
        if indices.is_empty() {
            return;
        }
        let children = std::mem::take(&mut self.children);
        self.children = children
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !indices.contains(index))
            .map(|(_, node)| node)
            .collect();
    }
}

/// XML Document representation
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Root element of the document
    pub root: Element,
}

impl Document {
    /// Create a document around a root element
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Parse an XML document from a string
    pub fn parse(xml: &str, namespace_aware: bool) -> Result<Self> {
        Self::parse_with_limits(xml, namespace_aware, &Limits::default())
    }

    /// Parse an XML document, enforcing size and depth limits
    ///
    /// With `namespace_aware` set, prefixes are resolved to namespace URIs and
    /// `xmlns` declarations are consumed. Otherwise names keep their raw
    /// prefixes and declarations stay ordinary attributes.
    pub fn parse_with_limits(xml: &str, namespace_aware: bool, limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;

        let mut reader = Reader::from_str(xml);

        let mut root: Option<Element> = None;
        let mut stack: Vec<(Element, NamespaceContext)> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let parent = stack.last().map(|(_, ctx)| ctx.clone()).unwrap_or_default();
                    let opened = open_element(&e, parent, namespace_aware)?;
                    stack.push(opened);
                    limits.check_document_depth(stack.len())?;
                }
                Ok(Event::End(_)) => {
                    if let Some((current, _)) = stack.pop() {
                        attach(&mut stack, &mut root, current)?;
                    }
                }
                Ok(Event::Empty(e)) => {
                    let parent = stack.last().map(|(_, ctx)| ctx.clone()).unwrap_or_default();
                    let (element, _) = open_element(&e, parent, namespace_aware)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(e)) => {
                    if let Some((current, _)) = stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?;
                        if !text.trim().is_empty() {
                            current.append_text(text.into_owned());
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some((current, _)) = stack.last_mut() {
                        let text = String::from_utf8(e.into_inner().into_owned())
                            .map_err(|e| Error::Xml(format!("Invalid CDATA section: {}", e)))?;
                        current.append_text(text);
                    }
                }
                Ok(Event::Comment(e)) => {
                    if let Some((current, _)) = stack.last_mut() {
                        current.append_comment(String::from_utf8_lossy(&e).into_owned());
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "Error parsing XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {} // Declarations, processing instructions, doctypes
            }
            buf.clear();
        }

        if let Some((open, _)) = stack.last() {
            return Err(Error::Xml(format!("Unclosed element '{}'", open.tag_name())));
        }

        let root = root.ok_or_else(|| Error::Xml("Document has no root element".to_string()))?;
        limits.check_document_nodes(root.element_count())?;
        Ok(Self { root })
    }

    /// Serialize the document, with an XML declaration
    pub fn serialize(&self, pretty_print: bool) -> Result<String> {
        let mut writer = if pretty_print {
            Writer::new_with_indent(Vec::new(), b' ', 4)
        } else {
            Writer::new(Vec::new())
        };

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_element(&mut writer, &self.root, &NamespaceContext::new())?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| Error::Xml(format!("Serialized document is not UTF-8: {}", e)))
    }

    /// Number of elements in the document
    pub fn element_count(&self) -> usize {
        self.root.element_count()
    }
}

fn attach(
    stack: &mut [(Element, NamespaceContext)],
    root: &mut Option<Element>,
    element: Element,
) -> Result<()> {
    if let Some((parent, _)) = stack.last_mut() {
        parent.add_child(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        return Err(Error::Xml(format!(
            "Unexpected second root element '{}'",
            element.tag_name()
        )));
    }
    Ok(())
}

fn open_element(
    start: &BytesStart,
    mut ctx: NamespaceContext,
    namespace_aware: bool,
) -> Result<(Element, NamespaceContext)> {
    let raw_name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?
        .to_string();

    let mut raw_attributes = Vec::new();
    for attr_result in start.attributes() {
        let attr =
            attr_result.map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;

        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?
            .to_string();

        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
            .into_owned();

        if namespace_aware {
            if key == "xmlns" {
                ctx.set_default_namespace(value);
                continue;
            }
            if let Some(prefix) = key.strip_prefix("xmlns:") {
                ctx.add_prefix(prefix, value);
                continue;
            }
        }
        raw_attributes.push((key, value));
    }

    let mut element = if namespace_aware {
        Element::new(ctx.resolve(&raw_name)?)
    } else {
        let (prefix, local) = split_qname(&raw_name);
        let mut element = Element::new(QName::local(local));
        element.prefix = prefix.map(str::to_string);
        element
    };

    for (key, value) in raw_attributes {
        let qname = if namespace_aware {
            ctx.resolve_attribute(&key)?
        } else {
            QName::local(key)
        };
        element.attributes.insert(qname, value);
    }

    Ok((element, ctx))
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    element: &Element,
    scope: &NamespaceContext,
) -> Result<()> {
    let mut ctx = scope.clone();
    let name = element.tag_name();
    let mut start = BytesStart::new(name.clone());

    if element.prefix.is_none() && element.namespace() != ctx.get_default_namespace() {
        let namespace = element.namespace().unwrap_or("");
        start.push_attribute(("xmlns", namespace));
        ctx.set_default_namespace(namespace);
    }

    for (qname, value) in &element.attributes {
        let key = match &qname.namespace {
            None => qname.local_name.clone(),
            Some(namespace) => {
                let prefix = match ctx.prefix_for(namespace) {
                    Some(prefix) => prefix.to_string(),
                    None => {
                        let mut n = ctx.prefix_count() + 1;
                        while ctx.get_namespace(&format!("ns{}", n)).is_some() {
                            n += 1;
                        }
                        let prefix = format!("ns{}", n);
                        start.push_attribute((format!("xmlns:{}", prefix).as_str(), namespace.as_str()));
                        ctx.add_prefix(prefix.as_str(), namespace.as_str());
                        prefix
                    }
                };
                format!("{}:{}", prefix, qname.local_name)
            }
        };
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e, &ctx)?,
            Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            Node::Comment(comment) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;

    Ok(())
}
