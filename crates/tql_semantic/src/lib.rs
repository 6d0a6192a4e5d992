//! Document validation for tql.
//!
//! This crate provides:
//! - `validator`: Checks a query document against a schema
//! - `operation`: Operation selection
//! - `variables`: Variable value coercion
//! - `diagnostics`: Error collection

pub mod diagnostics;
pub mod operation;
pub mod validator;
pub mod variables;

pub use diagnostics::DiagnosticBag;
pub use operation::{select_operation, Operation, OperationKind};
pub use validator::{ValidationResult, Validator};
pub use variables::{check_required_variables, coerce_variable_values};

use graphql_parser::query::Document;
use tql_core::{GraphError, Map};
use tql_schema::Schema;

/// Validates a document with a single operation.
pub fn validate(
    schema: &Schema,
    document: &Document<'_, String>,
    variables: &Map,
) -> Vec<GraphError> {
    validate_operation(schema, document, None, variables)
}

/// Validates a document and the variables of the named operation.
///
/// An empty result means the operation can be executed.
pub fn validate_operation(
    schema: &Schema,
    document: &Document<'_, String>,
    operation_name: Option<&str>,
    variables: &Map,
) -> Vec<GraphError> {
    Validator::new(schema, document)
        .validate(operation_name, variables)
        .into_errors()
}
