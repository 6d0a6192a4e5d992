//! Error types for tql.
//!
//! A [`FieldError`] is what a resolver raises. A [`Failure`] is any failure
//! the engine can observe, classified by origin. A [`GraphError`] is the
//! structured error object placed in a response; it is built from a failure
//! by [`format_error`](crate::format_error).

use crate::path::ExecutionPath;
use crate::pos::SourceLocation;
use crate::{Map, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A failure raised by a resolver.
///
/// Whether the failure carries extensions is decided when it is raised.
/// Nothing else about the originating error survives into the response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// A failure with only a message.
    #[error("{0}")]
    Plain(String),

    /// A failure with a message and an extensions map surfaced verbatim.
    #[error("{message}")]
    WithExtensions {
        /// The error message.
        message: String,
        /// Extensions copied into the response error.
        extensions: Map,
    },
}

impl FieldError {
    /// Creates a failure with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Plain(message.into())
    }

    /// Creates a failure from any displayable error, keeping only its message.
    pub fn from_error(error: &(impl fmt::Display + ?Sized)) -> Self {
        Self::Plain(error.to_string())
    }

    /// Attaches an extensions map.
    #[must_use]
    pub fn with_extensions(self, extensions: Map) -> Self {
        Self::WithExtensions {
            message: self.into_message(),
            extensions,
        }
    }

    /// Adds a single extension entry.
    #[must_use]
    pub fn with_extension(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let (message, mut extensions) = match self {
            Self::Plain(message) => (message, Map::new()),
            Self::WithExtensions {
                message,
                extensions,
            } => (message, extensions),
        };
        extensions.insert(key.into(), value.into());
        Self::WithExtensions {
            message,
            extensions,
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        match self {
            Self::Plain(message) | Self::WithExtensions { message, .. } => message,
        }
    }

    /// Returns the extensions, if the failure was raised with any.
    pub fn extensions(&self) -> Option<&Map> {
        match self {
            Self::Plain(_) => None,
            Self::WithExtensions { extensions, .. } => Some(extensions),
        }
    }

    fn into_message(self) -> String {
        match self {
            Self::Plain(message) | Self::WithExtensions { message, .. } => message,
        }
    }
}

impl From<String> for FieldError {
    fn from(message: String) -> Self {
        Self::Plain(message)
    }
}

impl From<&str> for FieldError {
    fn from(message: &str) -> Self {
        Self::Plain(message.to_string())
    }
}

/// A value could not be represented by a leaf or input type.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct CoercionError {
    /// The full, user-facing message.
    pub message: String,
    /// The rejected value.
    pub value: Value,
}

impl CoercionError {
    /// Creates a new coercion error.
    pub fn new(message: impl Into<String>, value: Value) -> Self {
        Self {
            message: message.into(),
            value,
        }
    }
}

/// Any failure observed while validating or executing a document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Failure {
    /// The document does not type-check against the schema.
    #[error("{0}")]
    Validation(String),

    /// A variable is missing or has a value of the wrong type.
    #[error("{0}")]
    Variable(String),

    /// A resolved value cannot be represented by its declared leaf type.
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    /// A resolver raised a failure.
    #[error(transparent)]
    Resolver(#[from] FieldError),

    /// A field declared non-null resolved to null.
    #[error("Cannot return null for non-nullable field {field}.")]
    NullViolation {
        /// The `Parent.field` coordinate.
        field: String,
    },

    /// An abstract type did not resolve to one of its possible types.
    #[error("{0}")]
    AbstractResolution(String),

    /// A field did not resolve before its deadline.
    #[error("Field \"{field}\" was cancelled after exceeding the {timeout_ms}ms deadline.")]
    Cancelled {
        /// The `Parent.field` coordinate.
        field: String,
        /// The deadline that was exceeded.
        timeout_ms: u64,
    },

    /// A resolver panicked instead of returning.
    #[error("{0}")]
    Panicked(String),
}

/// A structured error in a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphError {
    /// The error message.
    pub message: String,
    /// Source locations of the originating syntax nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<SourceLocation>,
    /// The response path of the failing field. Absent for request errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<ExecutionPath>,
    /// Extensions supplied by the raised failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map>,
}

impl GraphError {
    /// Creates an error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: None,
        }
    }

    /// Adds a source location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<SourceLocation>) -> Self {
        self.locations.push(location.into());
        self
    }

    /// Sets the response path.
    #[must_use]
    pub fn with_path(mut self, path: ExecutionPath) -> Self {
        self.path = Some(path);
        self
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(location) = self.locations.first() {
            write!(f, " ({location})")?;
        }
        Ok(())
    }
}
