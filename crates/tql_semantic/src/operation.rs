//! Operation selection.

use graphql_parser::query::{
    Definition, Directive, Document, OperationDefinition, SelectionSet, VariableDefinition,
};
use graphql_parser::Pos;
use std::fmt;
use tql_core::Failure;

/// The kind of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => f.write_str("query"),
            Self::Mutation => f.write_str("mutation"),
            Self::Subscription => f.write_str("subscription"),
        }
    }
}

/// A uniform view over the parser's operation variants.
///
/// The shorthand `{ ... }` form is a query without a name or variables.
#[derive(Debug, Clone, Copy)]
pub struct Operation<'v, 'a> {
    pub kind: OperationKind,
    pub name: Option<&'v str>,
    pub position: Pos,
    pub variable_definitions: &'v [VariableDefinition<'a, String>],
    pub directives: &'v [Directive<'a, String>],
    pub selection_set: &'v SelectionSet<'a, String>,
}

impl<'v, 'a> From<&'v OperationDefinition<'a, String>> for Operation<'v, 'a> {
    fn from(definition: &'v OperationDefinition<'a, String>) -> Self {
        match definition {
            OperationDefinition::SelectionSet(selection_set) => Self {
                kind: OperationKind::Query,
                name: None,
                position: selection_set.span.0,
                variable_definitions: &[],
                directives: &[],
                selection_set,
            },
            OperationDefinition::Query(query) => Self {
                kind: OperationKind::Query,
                name: query.name.as_deref(),
                position: query.position,
                variable_definitions: &query.variable_definitions,
                directives: &query.directives,
                selection_set: &query.selection_set,
            },
            OperationDefinition::Mutation(mutation) => Self {
                kind: OperationKind::Mutation,
                name: mutation.name.as_deref(),
                position: mutation.position,
                variable_definitions: &mutation.variable_definitions,
                directives: &mutation.directives,
                selection_set: &mutation.selection_set,
            },
            OperationDefinition::Subscription(subscription) => Self {
                kind: OperationKind::Subscription,
                name: subscription.name.as_deref(),
                position: subscription.position,
                variable_definitions: &subscription.variable_definitions,
                directives: &subscription.directives,
                selection_set: &subscription.selection_set,
            },
        }
    }
}

/// Returns the operations of a document in document order.
pub fn operations<'v, 'a>(
    document: &'v Document<'a, String>,
) -> impl Iterator<Item = Operation<'v, 'a>> {
    document.definitions.iter().filter_map(|definition| match definition {
        Definition::Operation(operation) => Some(Operation::from(operation)),
        Definition::Fragment(_) => None,
    })
}

/// Picks the operation to execute.
///
/// Without a name, the document must contain exactly one operation.
pub fn select_operation<'v, 'a>(
    document: &'v Document<'a, String>,
    operation_name: Option<&str>,
) -> Result<Operation<'v, 'a>, Failure> {
    let mut candidates = operations(document);
    match operation_name {
        Some(name) => candidates
            .find(|operation| operation.name == Some(name))
            .ok_or_else(|| Failure::Validation(format!("Unknown operation named \"{name}\"."))),
        None => {
            let first = candidates
                .next()
                .ok_or_else(|| Failure::Validation("Must provide an operation.".to_string()))?;
            if candidates.next().is_some() {
                return Err(Failure::Validation(
                    "Must provide operation name if query contains multiple operations."
                        .to_string(),
                ));
            }
            Ok(first)
        }
    }
}
