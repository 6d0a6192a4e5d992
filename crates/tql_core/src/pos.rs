//! Source location representation.

use graphql_parser::Pos;
use serde::{Deserialize, Serialize};

/// A position in a query document, as reported in response errors.
///
/// Both `line` and `column` are 1-based, matching the parser's positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number (1-based).
    pub line: usize,
    /// Column number (1-based).
    pub column: usize,
}

impl SourceLocation {
    /// Creates a new source location.
    #[must_use]
    #[inline]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl From<Pos> for SourceLocation {
    fn from(pos: Pos) -> Self {
        Self::new(pos.line, pos.column)
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parser_pos() {
        let loc = SourceLocation::from(Pos { line: 3, column: 7 });
        assert_eq!(loc, SourceLocation::new(3, 7));
        assert_eq!(loc.to_string(), "3:7");
    }

    #[test]
    fn test_serialize() {
        let loc = SourceLocation::new(1, 9);
        assert_eq!(
            serde_json::to_value(loc).unwrap(),
            serde_json::json!({"line": 1, "column": 9})
        );
    }
}
