//! Validation error collection.

use graphql_parser::Pos;
use tql_core::{format_error, Failure, GraphError, SourceLocation};

/// A collection of validation errors, kept in the order they were found.
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    errors: Vec<GraphError>,
}

impl DiagnosticBag {
    /// Creates a new empty diagnostic bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error.
    pub fn add(&mut self, error: GraphError) {
        self.errors.push(error);
    }

    /// Adds a validation error pointing at the given positions.
    pub fn error(&mut self, message: impl Into<String>, positions: impl IntoIterator<Item = Pos>) {
        self.add(format_error(
            Failure::Validation(message.into()),
            positions.into_iter().map(SourceLocation::from),
            None,
        ));
    }

    /// Adds every error from an iterator.
    pub fn extend(&mut self, errors: impl IntoIterator<Item = GraphError>) {
        self.errors.extend(errors);
    }

    /// Returns true if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns an iterator over all errors.
    pub fn iter(&self) -> impl Iterator<Item = &GraphError> {
        self.errors.iter()
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if there are no errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Consumes the bag, returning the errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<GraphError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_has_locations_and_no_path() {
        let mut bag = DiagnosticBag::new();
        assert!(bag.is_empty());

        bag.error("Unknown fragment \"F\".", [Pos { line: 2, column: 5 }]);

        assert!(bag.has_errors());
        assert_eq!(bag.len(), 1);
        let error = bag.iter().next().unwrap();
        assert_eq!(error.message, "Unknown fragment \"F\".");
        assert_eq!(error.locations, vec![SourceLocation::new(2, 5)]);
        assert!(error.path.is_none());
    }
}
