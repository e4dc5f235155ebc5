//! Addresses of value-generation sites

use std::fmt;

/// Separator placed between segments when a path is hashed or displayed
pub const SEGMENT_SEPARATOR: char = '.';

/// Root-to-site sequence of element names, repeat indices and attribute names
///
/// Attribute segments carry a leading `@` so an attribute never shares a
/// stream with a child element of the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ValuePath {
    segments: Vec<String>,
}

impl ValuePath {
    /// Empty path
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of a document element
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// This path extended with an element name
    pub fn append_name(&self, name: impl Into<String>) -> Self {
        self.append(name.into())
    }

    /// This path extended with a 0-based repeat index
    pub fn append_index(&self, index: u64) -> Self {
        self.append(index.to_string())
    }

    /// This path extended with an attribute name
    pub fn append_attribute(&self, name: &str) -> Self {
        self.append(format!("@{}", name))
    }

    fn append(&self, segment: String) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self { segments }
    }

    /// The segments, root first
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether `prefix` is a leading part of this path
    pub fn starts_with(&self, prefix: &ValuePath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the path has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEGMENT_SEPARATOR)?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_and_display() {
        let path = ValuePath::root("consignment")
            .append_name("deliveryEvent")
            .append_index(0)
            .append_attribute("formatId");
        assert_eq!(path.segments(), ["consignment", "deliveryEvent", "0", "@formatId"]);
        assert_eq!(path.to_string(), "consignment.deliveryEvent.0.@formatId");
    }

    #[test]
    fn test_append_does_not_mutate() {
        let parent = ValuePath::root("a");
        let child = parent.append_name("b");
        assert_eq!(parent.len(), 1);
        assert!(child.starts_with(&parent));
        assert!(!parent.starts_with(&child));
    }
}
