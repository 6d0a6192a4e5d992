//! Value coercion.
//!
//! Output coercion turns resolver results into leaf values. Input coercion
//! checks variable values and argument values against their declared types.

use crate::schema::{FieldDef, Schema, TypeDef, TypeRef};
use graphql_parser::query::Value as AstValue;
use tql_core::error::CoercionError;
use tql_core::{inspect, Map, Value};

/// Coerces a resolved value into the representation of a leaf type.
///
/// `raw` must not be null; nulls are handled before coercion.
pub fn coerce_leaf(schema: &Schema, type_name: &str, raw: &Value) -> Result<Value, CoercionError> {
    match schema.get_type(type_name) {
        Some(TypeDef::Scalar(scalar)) => scalar.serialize(raw),
        Some(TypeDef::Enum(def)) => match raw {
            Value::String(name) if def.has_value(name) => Ok(raw.clone()),
            _ => Err(CoercionError::new(
                format!("Enum \"{}\" cannot represent value: {}", def.name, inspect(raw)),
                raw.clone(),
            )),
        },
        _ => Err(CoercionError::new(
            format!("Type \"{type_name}\" is not a leaf type."),
            raw.clone(),
        )),
    }
}

/// Coerces an input value to an input type.
///
/// A non-list value supplied for a list type is treated as a list of one.
pub fn coerce_input_value(
    schema: &Schema,
    ty: &TypeRef,
    value: &Value,
) -> Result<Value, CoercionError> {
    match ty {
        TypeRef::NonNull(inner) => {
            if value.is_null() {
                return Err(CoercionError::new(
                    format!("Expected non-nullable type \"{ty}\" not to be null."),
                    value.clone(),
                ));
            }
            coerce_input_value(schema, inner, value)
        }
        _ if value.is_null() => Ok(Value::Null),
        TypeRef::List(inner) => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| coerce_input_value(schema, inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            single => Ok(Value::Array(vec![coerce_input_value(schema, inner, single)?])),
        },
        TypeRef::Named(name) => match schema.get_type(name) {
            Some(TypeDef::Scalar(scalar)) => scalar.parse_value(value),
            Some(TypeDef::Enum(def)) => match value {
                Value::String(s) if def.has_value(s) => Ok(value.clone()),
                Value::String(s) => Err(CoercionError::new(
                    format!("Value \"{s}\" does not exist in \"{}\" enum.", def.name),
                    value.clone(),
                )),
                _ => Err(CoercionError::new(
                    format!(
                        "Enum \"{}\" cannot represent non-enum value: {}.",
                        def.name,
                        inspect(value)
                    ),
                    value.clone(),
                )),
            },
            _ => Err(CoercionError::new(
                format!("Type \"{name}\" is not an input type."),
                value.clone(),
            )),
        },
    }
}

/// Converts a literal from a document into a JSON value.
///
/// Variables are replaced by their value, or null when absent. Enum literals
/// become strings.
pub fn value_from_ast(value: &AstValue<'_, String>, variables: &Map) -> Value {
    match value {
        AstValue::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
        AstValue::Int(n) => n.as_i64().map_or(Value::Null, Value::from),
        AstValue::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        AstValue::String(s) => Value::String(s.clone()),
        AstValue::Boolean(b) => Value::Bool(*b),
        AstValue::Null => Value::Null,
        AstValue::Enum(name) => Value::String(name.clone()),
        AstValue::List(items) => {
            Value::Array(items.iter().map(|item| value_from_ast(item, variables)).collect())
        }
        AstValue::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, item)| (key.clone(), value_from_ast(item, variables)))
                .collect(),
        ),
    }
}

/// Returns true if the literal references a variable anywhere inside it.
pub fn contains_variable(value: &AstValue<'_, String>) -> bool {
    match value {
        AstValue::Variable(_) => true,
        AstValue::List(items) => items.iter().any(contains_variable),
        AstValue::Object(fields) => fields.values().any(contains_variable),
        _ => false,
    }
}

/// Computes the argument map passed to a field's resolver.
///
/// Arguments that are absent, or bound to a variable that was not provided,
/// take their default value; without one they are left out of the map.
pub fn coerce_argument_values(
    schema: &Schema,
    field: &FieldDef,
    arguments: &[(String, AstValue<'_, String>)],
    variables: &Map,
) -> Result<Map, CoercionError> {
    let mut coerced = Map::new();

    for (name, def) in &field.arguments {
        let provided = arguments
            .iter()
            .find(|(arg_name, _)| arg_name == name)
            .map(|(_, value)| value)
            .filter(|value| match value {
                AstValue::Variable(var) => variables.contains_key(var),
                _ => true,
            });

        let Some(ast_value) = provided else {
            if let Some(default) = &def.default_value {
                coerced.insert(name.clone(), default.clone());
            } else if def.ty.is_non_null() {
                return Err(CoercionError::new(
                    format!(
                        "Argument \"{name}\" of required type \"{}\" was not provided.",
                        def.ty
                    ),
                    Value::Null,
                ));
            }
            continue;
        };

        let value = value_from_ast(ast_value, variables);
        if value.is_null() && def.ty.is_non_null() {
            return Err(CoercionError::new(
                format!(
                    "Argument \"{name}\" of non-null type \"{}\" must not be null.",
                    def.ty
                ),
                value,
            ));
        }

        let value = coerce_input_value(schema, &def.ty, &value).map_err(|err| {
            CoercionError::new(
                format!("Argument \"{name}\" has invalid value {ast_value}."),
                err.value,
            )
        })?;
        coerced.insert(name.clone(), value);
    }

    Ok(coerced)
}
