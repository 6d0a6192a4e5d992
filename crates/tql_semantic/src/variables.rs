//! Variable value coercion.

use graphql_parser::query::VariableDefinition;
use tql_core::{format_error, inspect, Failure, GraphError, Map, SourceLocation, Value};
use tql_schema::coercion::{coerce_input_value, value_from_ast};
use tql_schema::{Schema, TypeRef};

/// Coerces the provided variable values against an operation's definitions.
///
/// Absent variables take their default value, if any. Every invalid
/// variable is reported; the coerced values are returned only when all of
/// them are valid.
pub fn coerce_variable_values(
    schema: &Schema,
    definitions: &[VariableDefinition<'_, String>],
    inputs: &Map,
) -> Result<Map, Vec<GraphError>> {
    let mut coerced = Map::new();
    let mut errors = Vec::new();

    for definition in definitions {
        let name = &definition.name;
        let ty = TypeRef::from(&definition.var_type);
        let location = SourceLocation::from(definition.position);
        let mut fail = |message: String| {
            errors.push(format_error(Failure::Variable(message), [location], None));
        };

        if !schema.is_input_type(&ty) {
            fail(format!(
                "Variable \"${name}\" expected value of type \"{ty}\" which cannot be used as an input type."
            ));
            continue;
        }

        if let Some(message) = required_violation(definition, &ty, inputs) {
            fail(message);
            continue;
        }

        match inputs.get(name.as_str()) {
            None => {
                if let Some(default) = &definition.default_value {
                    coerced.insert(name.clone(), value_from_ast(default, &Map::new()));
                }
            }
            Some(value) => match coerce_input_value(schema, &ty, value) {
                Ok(value) => {
                    coerced.insert(name.clone(), value);
                }
                Err(err) => fail(format!(
                    "Variable \"${name}\" got invalid value {}; {}",
                    inspect(value),
                    err.message
                )),
            },
        }
    }

    if errors.is_empty() {
        Ok(coerced)
    } else {
        Err(errors)
    }
}

/// Reports required variables that are absent or null.
///
/// Unlike [`coerce_variable_values`], no provided value is coerced, so this
/// is safe to run on a document that failed validation.
pub fn check_required_variables(
    schema: &Schema,
    definitions: &[VariableDefinition<'_, String>],
    inputs: &Map,
) -> Vec<GraphError> {
    definitions
        .iter()
        .filter_map(|definition| {
            let ty = TypeRef::from(&definition.var_type);
            if !schema.is_input_type(&ty) {
                return None;
            }
            let message = required_violation(definition, &ty, inputs)?;
            let location = SourceLocation::from(definition.position);
            Some(format_error(Failure::Variable(message), [location], None))
        })
        .collect()
}

fn required_violation(
    definition: &VariableDefinition<'_, String>,
    ty: &TypeRef,
    inputs: &Map,
) -> Option<String> {
    if !ty.is_non_null() {
        return None;
    }
    let name = &definition.name;
    match inputs.get(name.as_str()) {
        None if definition.default_value.is_none() => Some(format!(
            "Variable \"${name}\" of required type \"{ty}\" was not provided."
        )),
        Some(Value::Null) => Some(format!(
            "Variable \"${name}\" of non-null type \"{ty}\" must not be null."
        )),
        _ => None,
    }
}
