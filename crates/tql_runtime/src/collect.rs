//! Field collection.

use crate::executor::ExecutionContext;
use graphql_parser::query::{Directive, Field, Selection, SelectionSet, TypeCondition};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use tql_core::{Map, Value};
use tql_schema::coercion::value_from_ast;
use tql_schema::Schema;

pub(crate) type FieldNode = Field<'static, String>;

/// Field nodes grouped by response key, in selection order.
pub(crate) type GroupedFields<'e> = IndexMap<String, Vec<&'e FieldNode>>;

impl<'e> ExecutionContext<'e> {
    /// Collects the fields selected on a concrete object type.
    ///
    /// Fields sharing a response key form one group, so their sub-selections
    /// are merged when the group is completed.
    pub(crate) fn collect_fields(
        &self,
        object_type: &str,
        selection_sets: impl IntoIterator<Item = &'e SelectionSet<'static, String>>,
    ) -> GroupedFields<'e> {
        let mut fields = GroupedFields::new();
        let mut visited = FxHashSet::default();
        for selection_set in selection_sets {
            self.collect_into(object_type, selection_set, &mut visited, &mut fields);
        }
        fields
    }

    fn collect_into(
        &self,
        object_type: &str,
        selection_set: &'e SelectionSet<'static, String>,
        visited: &mut FxHashSet<&'e str>,
        fields: &mut GroupedFields<'e>,
    ) {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    if should_include(&field.directives, &self.variables) {
                        let key = field.alias.as_ref().unwrap_or(&field.name);
                        fields.entry(key.clone()).or_default().push(field);
                    }
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.fragment_name.as_str();
                    // A fragment is expanded at most once per selection set.
                    if !should_include(&spread.directives, &self.variables) || !visited.insert(name)
                    {
                        continue;
                    }
                    let Some(fragment) = self.fragments.get(name).copied() else {
                        continue;
                    };
                    let TypeCondition::On(condition) = &fragment.type_condition;
                    if does_fragment_type_apply(self.schema, object_type, condition) {
                        self.collect_into(object_type, &fragment.selection_set, visited, fields);
                    }
                }
                Selection::InlineFragment(inline) => {
                    if !should_include(&inline.directives, &self.variables) {
                        continue;
                    }
                    if let Some(TypeCondition::On(condition)) = &inline.type_condition {
                        if !does_fragment_type_apply(self.schema, object_type, condition) {
                            continue;
                        }
                    }
                    self.collect_into(object_type, &inline.selection_set, visited, fields);
                }
            }
        }
    }
}

/// Evaluates `@skip(if:)` and `@include(if:)`.
fn should_include(directives: &[Directive<'static, String>], variables: &Map) -> bool {
    let condition = |directive: &Directive<'static, String>| {
        directive
            .arguments
            .iter()
            .find(|(name, _)| name == "if")
            .map(|(_, value)| value_from_ast(value, variables))
    };

    directives.iter().all(|directive| match directive.name.as_str() {
        "skip" => condition(directive) != Some(Value::Bool(true)),
        "include" => condition(directive) == Some(Value::Bool(true)),
        _ => true,
    })
}

/// A fragment applies to an object type it names, or to a member of the
/// abstract type it names.
fn does_fragment_type_apply(schema: &Schema, object_type: &str, condition: &str) -> bool {
    condition == object_type || schema.is_possible_type(condition, object_type)
}
