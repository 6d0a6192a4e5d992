//! Core types for tql.
//!
//! This crate provides the types shared by validation and execution:
//! - `pos`: Source locations in query documents
//! - `path`: Response paths used for error attribution
//! - `error`: Raised failures and structured response errors
//! - `format`: Turning failures into response errors
//! - `inspect`: Literal-like rendering of values for messages

pub mod error;
pub mod format;
pub mod inspect;
pub mod path;
pub mod pos;

pub use error::{Failure, FieldError, GraphError};
pub use format::format_error;
pub use inspect::inspect;
pub use path::{ExecutionPath, PathSegment};
pub use pos::SourceLocation;

/// The JSON value type used for resolver results, arguments and responses.
pub type Value = serde_json::Value;

/// An ordered JSON object.
pub type Map = serde_json::Map<String, Value>;
