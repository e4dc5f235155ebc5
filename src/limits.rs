//! Limits and constraints for document processing
//!
//! Populated documents are bounded in size; these limits turn a runaway
//! schema (deep recursion, huge repeat counts) into an error instead of an
//! out-of-memory condition, and guard the parser against oversized input.

use crate::error::{Error, Result};

/// Global limits configuration
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum element nesting depth
    pub max_document_depth: usize,

    /// Maximum number of elements in one document
    pub max_document_nodes: usize,

    /// Maximum XML text size in bytes accepted by the parser
    pub max_xml_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_document_depth: 256,
            max_document_nodes: 100_000,
            max_xml_size: 100 * 1024 * 1024, // 100 MB
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_document_depth: 32,
            max_document_nodes: 10_000,
            max_xml_size: 10 * 1024 * 1024, // 10 MB
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_document_depth: 4096,
            max_document_nodes: 10_000_000,
            max_xml_size: 1024 * 1024 * 1024, // 1 GB
        }
    }

    /// Check if element depth is within limits
    pub fn check_document_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_document_depth {
            Err(Error::LimitExceeded(format!(
                "document depth {} exceeds maximum {}",
                depth, self.max_document_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if element count is within limits
    pub fn check_document_nodes(&self, count: usize) -> Result<()> {
        if count > self.max_document_nodes {
            Err(Error::LimitExceeded(format!(
                "document node count {} exceeds maximum {}",
                count, self.max_document_nodes
            )))
        } else {
            Ok(())
        }
    }

    /// Check if XML size is within limits
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        if size > self.max_xml_size {
            Err(Error::LimitExceeded(format!(
                "XML size {} bytes exceeds maximum {} bytes",
                size, self.max_xml_size
            )))
        } else {
            Ok(())
        }
    }
}
