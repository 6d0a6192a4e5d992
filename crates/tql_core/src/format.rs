//! Error formatting.

use crate::error::{Failure, FieldError, GraphError};
use crate::path::ExecutionPath;
use crate::pos::SourceLocation;

/// Builds the response error for a failure.
///
/// The message is the failure's message. Extensions are copied only from a
/// [`FieldError::WithExtensions`]; no other failure contributes any. An empty
/// `locations` means the failure has no syntactic origin.
pub fn format_error(
    failure: Failure,
    locations: impl IntoIterator<Item = SourceLocation>,
    path: Option<ExecutionPath>,
) -> GraphError {
    let message = failure.to_string();
    let extensions = match failure {
        Failure::Resolver(FieldError::WithExtensions { extensions, .. }) => Some(extensions),
        _ => None,
    };

    GraphError {
        message,
        locations: locations.into_iter().collect(),
        path,
        extensions,
    }
}
