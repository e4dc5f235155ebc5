//! Path expression evaluation
//!
//! Evaluation starts at the document node, so the first step is tested
//! against the document element. Each later step walks the child elements of
//! every context element; positional predicates count matches per parent.
//! Results are index paths, so callers can mutate the tree afterwards.

use crate::documents::{Document, Element, Node, NodePath};
use crate::namespaces::QName;

use super::parsers::{PathExpression, Predicate, Step, Target};

/// A node selected by a path expression
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeRef {
    /// Element at the path
    Element(NodePath),
    /// Attribute of the element at the path
    Attribute(NodePath, QName),
    /// Text node at the path
    Text(NodePath),
}

impl NodeRef {
    /// Path of the selected element, or of the element owning the attribute
    pub fn path(&self) -> &NodePath {
        match self {
            NodeRef::Element(path) | NodeRef::Attribute(path, _) | NodeRef::Text(path) => path,
        }
    }
}

impl PathExpression {
    /// Select matching nodes in document order
    pub fn select(&self, doc: &Document) -> Vec<NodeRef> {
        let root = &doc.root;
        let mut contexts: Vec<NodePath> = Vec::new();

        for (index, step) in self.steps.iter().enumerate() {
            contexts = if index == 0 {
                let candidates = if step.test.matches(root.local_name()) {
                    vec![NodePath::new()]
                } else {
                    Vec::new()
                };
                filter(root, step, candidates)
            } else {
                contexts
                    .iter()
                    .flat_map(|context| filter(root, step, child_matches(root, context, step)))
                    .collect()
            };
            if contexts.is_empty() {
                return Vec::new();
            }
        }

        match &self.target {
            Target::Element => contexts.into_iter().map(NodeRef::Element).collect(),
            Target::Text => contexts
                .into_iter()
                .flat_map(|path| text_nodes(root, path))
                .collect(),
            Target::Attribute(test) => contexts
                .into_iter()
                .flat_map(|path| {
                    let names: Vec<QName> = root
                        .element_at(&path)
                        .map(|element| {
                            element
                                .attributes
                                .keys()
                                .filter(|name| test.matches(&name.local_name))
                                .cloned()
                                .collect()
                        })
                        .unwrap_or_default();
                    names
                        .into_iter()
                        .map(move |name| NodeRef::Attribute(path.clone(), name))
                })
                .collect(),
        }
    }

    /// Whether anything in `doc` matches
    pub fn matches_any(&self, doc: &Document) -> bool {
        !self.select(doc).is_empty()
    }
}

fn child_matches(root: &Element, context: &NodePath, step: &Step) -> Vec<NodePath> {
    let Some(parent) = root.element_at(context) else {
        return Vec::new();
    };
    parent
        .children
        .iter()
        .enumerate()
        .filter_map(|(index, node)| {
            node.as_element()
                .filter(|child| step.test.matches(child.local_name()))
                .map(|_| {
                    let mut path = context.clone();
                    path.push(index);
                    path
                })
        })
        .collect()
}

fn filter(root: &Element, step: &Step, mut candidates: Vec<NodePath>) -> Vec<NodePath> {
    for predicate in &step.predicates {
        candidates = match predicate {
            Predicate::Position(position) => candidates
                .into_iter()
                .nth(position - 1)
                .into_iter()
                .collect(),
            Predicate::AttributeEquals { name, value } => candidates
                .into_iter()
                .filter(|path| {
                    root.element_at(path)
                        .and_then(|element| element.get_attribute(name))
                        .is_some_and(|actual| actual == value)
                })
                .collect(),
        };
    }
    candidates
}

fn text_nodes(root: &Element, path: NodePath) -> Vec<NodeRef> {
    let Some(element) = root.element_at(&path) else {
        return Vec::new();
    };
    element
        .children
        .iter()
        .enumerate()
        .filter(|(_, node)| matches!(node, Node::Text(_)))
        .map(|(index, _)| {
            let mut text_path = path.clone();
            text_path.push(index);
            NodeRef::Text(text_path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::parse(
            r#"<root><child attr="10">1</child><child attr="11" attr2="x">2<grandchild/></child><other/></root>"#,
            true,
        )
        .unwrap()
    }

    fn select(expression: &str) -> Vec<NodeRef> {
        PathExpression::compile(expression).unwrap().select(&doc())
    }

    #[test]
    fn test_first_step_matches_document_element() {
        assert_eq!(select("root"), vec![NodeRef::Element(vec![])]);
        assert_eq!(select("/root"), vec![NodeRef::Element(vec![])]);
        assert!(select("child").is_empty());
    }

    #[test]
    fn test_child_steps() {
        assert_eq!(
            select("root/child"),
            vec![NodeRef::Element(vec![0]), NodeRef::Element(vec![1])]
        );
        assert_eq!(select("root/child/grandchild"), vec![NodeRef::Element(vec![1, 1])]);
        assert_eq!(select("root/*").len(), 3);
    }

    #[test]
    fn test_positional_predicate() {
        assert_eq!(select("root/child[2]"), vec![NodeRef::Element(vec![1])]);
        assert!(select("root/child[3]").is_empty());
        assert_eq!(select("root[1]/child[1]"), vec![NodeRef::Element(vec![0])]);
    }

    #[test]
    fn test_attribute_predicate_and_target() {
        assert_eq!(select("root/child[@attr='11']"), vec![NodeRef::Element(vec![1])]);
        assert_eq!(
            select("root/child[@attr='11']/@attr"),
            vec![NodeRef::Attribute(vec![1], QName::local("attr"))]
        );
        assert_eq!(
            select("root/child/@attr2"),
            vec![NodeRef::Attribute(vec![1], QName::local("attr2"))]
        );
        assert_eq!(select("root/child/@*").len(), 3);
    }

    #[test]
    fn test_text_target() {
        assert_eq!(
            select("root/child/text()"),
            vec![NodeRef::Text(vec![0, 0]), NodeRef::Text(vec![1, 0])]
        );
        assert!(select("root/other/text()").is_empty());
    }

    #[test]
    fn test_prefixed_names_match_by_local_name() {
        let doc = Document::parse(r#"<p:root xmlns:p="urn:p"><p:child/></p:root>"#, false).unwrap();
        let expr = PathExpression::compile("root/q:child").unwrap();
        assert_eq!(expr.select(&doc), vec![NodeRef::Element(vec![0])]);
    }
}
