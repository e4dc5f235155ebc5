//! Error types for xmlpopulate
//!
//! This module defines all error types used throughout the library.
//! Configuration errors, synthesis gaps and collaborator failures each get
//! their own variant so callers can tell them apart.

use crate::xpath::XPathParseError;
use std::fmt;
use thiserror::Error;

/// Result type alias using xmlpopulate Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xmlpopulate operations
#[derive(Error, Debug)]
pub enum Error {
    /// Document does not conform to its grammar
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Schema definition could not be loaded
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Override path expression failed to compile
    #[error("invalid path expression: {0}")]
    Expression(#[from] XPathParseError),

    /// Invalid caller-supplied configuration (empty subset set, malformed override, ...)
    #[error("configuration error: {0}")]
    Config(String),

    /// Schema and document do not line up structurally
    #[error("schema error: {0}")]
    Schema(String),

    /// No value-generation rule matches a scalar type chain
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing or writing error
    #[error("XML error: {0}")]
    Xml(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

/// Document validation error with context
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error message
    pub message: String,
    /// Path to the element that failed validation
    pub path: Option<String>,
    /// Original reason
    pub reason: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            reason: None,
        }
    }

    /// Set the path where validation failed
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref reason) = self.reason {
            write!(f, "\n\nReason: {}", reason)?;
        }

        if let Some(ref path) = self.path {
            write!(f, "\n\nPath: {}", path)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Schema definition parsing error
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Location in the schema definition
    pub location: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref loc) = self.location {
            write!(f, "\n\nLocation: {}", loc)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}
