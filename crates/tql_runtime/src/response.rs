//! Requests and responses.

use graphql_parser::query::{parse_query, Document, ParseError};
use serde::Serialize;
use tql_core::{GraphError, Map, Value};

/// A parsed query document that owns its text.
pub type QueryDocument = Document<'static, String>;

/// A request to execute one operation of a document.
#[derive(Debug, Clone)]
pub struct Request {
    /// The parsed document.
    pub document: QueryDocument,
    /// The operation to run. Required when the document has several.
    pub operation_name: Option<String>,
    /// Raw variable values, coerced before execution.
    pub variables: Map,
    /// The parent value of the root fields.
    pub root_value: Value,
}

impl Request {
    /// Creates a request for a parsed document.
    pub fn new(document: QueryDocument) -> Self {
        Self {
            document,
            operation_name: None,
            variables: Map::new(),
            root_value: Value::Object(Map::new()),
        }
    }

    /// Parses a query and creates a request for it.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        Ok(Self::new(parse_query::<String>(source)?.into_static()))
    }

    /// Sets the operation name.
    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Replaces the variables.
    #[must_use]
    pub fn with_variables(mut self, variables: Map) -> Self {
        self.variables = variables;
        self
    }

    /// Sets a single variable.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Sets the root value.
    #[must_use]
    pub fn with_root_value(mut self, root_value: Value) -> Self {
        self.root_value = root_value;
        self
    }
}

/// A response.
///
/// `data` is absent when the request failed before execution started, and
/// `Some(Value::Null)` when a null propagated to the root.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    /// The data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// The errors, in depth-first order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphError>,
}

impl Response {
    /// Creates a successful response with data.
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// Creates a response for a request that could not be executed.
    pub fn errors(errors: Vec<GraphError>) -> Self {
        Self { data: None, errors }
    }

    /// Returns true if the response has errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns true if the response has data.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Serializes the response to a JSON value.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tql_core::{ExecutionPath, SourceLocation};

    #[test]
    fn test_request_builder() {
        let request = Request::parse("query Q($id: ID) { user(id: $id) { name } }")
            .unwrap()
            .with_operation_name("Q")
            .with_variable("id", "1")
            .with_root_value(json!({"version": 2}));

        assert_eq!(request.operation_name.as_deref(), Some("Q"));
        assert_eq!(request.variables["id"], json!("1"));
        assert_eq!(request.root_value, json!({"version": 2}));
        assert_eq!(request.document.definitions.len(), 1);
    }

    #[test]
    fn test_request_parse_error() {
        assert!(Request::parse("{ user(").is_err());
    }

    #[test]
    fn test_response_json_shape() {
        let response = Response::data(json!({"a": 1}));
        assert!(!response.has_errors());
        assert_eq!(response.to_json(), json!({"data": {"a": 1}}));

        let response = Response::errors(vec![GraphError::new("Boom")
            .with_location(SourceLocation::new(1, 3))]);
        assert!(!response.has_data());
        assert_eq!(
            response.to_json(),
            json!({"errors": [{"message": "Boom", "locations": [{"line": 1, "column": 3}]}]})
        );

        let response = Response {
            data: Some(Value::Null),
            errors: vec![GraphError::new("Boom").with_path(ExecutionPath::root().key("a"))],
        };
        assert_eq!(
            response.to_json(),
            json!({"data": null, "errors": [{"message": "Boom", "path": ["a"]}]})
        );
    }
}
