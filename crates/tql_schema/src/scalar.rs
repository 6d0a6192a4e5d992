//! Built-in scalar types.

use crate::schema::ScalarDef;
use tql_core::error::CoercionError;
use tql_core::{inspect, Value};

/// Names of the scalars every schema starts with.
pub const BUILT_IN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Returns true if `name` is a built-in scalar.
pub fn is_built_in(name: &str) -> bool {
    BUILT_IN_SCALARS.contains(&name)
}

/// Creates the built-in scalar definitions.
pub fn built_in_scalars() -> Vec<ScalarDef> {
    vec![int(), float(), string(), boolean(), id()]
}

/// The `Int` scalar: a signed 32-bit integer.
pub fn int() -> ScalarDef {
    ScalarDef::new("Int")
        .description("Built-in Int scalar")
        .with_serialize(serialize_int)
        .with_parse_value(parse_int)
}

/// The `Float` scalar: a double-precision number.
pub fn float() -> ScalarDef {
    ScalarDef::new("Float")
        .description("Built-in Float scalar")
        .with_serialize(serialize_float)
        .with_parse_value(parse_float)
}

/// The `String` scalar: UTF-8 text.
pub fn string() -> ScalarDef {
    ScalarDef::new("String")
        .description("Built-in String scalar")
        .with_serialize(serialize_string)
        .with_parse_value(parse_string)
}

/// The `Boolean` scalar.
pub fn boolean() -> ScalarDef {
    ScalarDef::new("Boolean")
        .description("Built-in Boolean scalar")
        .with_serialize(serialize_boolean)
        .with_parse_value(parse_boolean)
}

/// The `ID` scalar: serialized as a string, accepts strings and integers.
pub fn id() -> ScalarDef {
    ScalarDef::new("ID")
        .description("Built-in ID scalar")
        .with_serialize(serialize_id)
        .with_parse_value(parse_id)
}

fn numeric_string(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[allow(clippy::cast_possible_truncation)]
fn int_from_f64(n: f64, original: &Value) -> Result<Value, CoercionError> {
    if n.fract() != 0.0 || !n.is_finite() {
        return Err(CoercionError::new(
            format!("Int cannot represent non-integer value: {}", inspect(original)),
            original.clone(),
        ));
    }
    if n < f64::from(i32::MIN) || n > f64::from(i32::MAX) {
        return Err(CoercionError::new(
            format!(
                "Int cannot represent non 32-bit signed integer value: {}",
                inspect(original)
            ),
            original.clone(),
        ));
    }
    Ok(Value::from(n as i32))
}

fn serialize_int(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Bool(b) => Ok(Value::from(i32::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i32::try_from(i).map(Value::from).map_err(|_| {
                CoercionError::new(
                    format!(
                        "Int cannot represent non 32-bit signed integer value: {}",
                        inspect(value)
                    ),
                    value.clone(),
                )
            }),
            None => int_from_f64(n.as_f64().unwrap_or(f64::NAN), value),
        },
        Value::String(s) => match numeric_string(s) {
            Some(n) => int_from_f64(n, value),
            None => Err(non_integer(value)),
        },
        _ => Err(non_integer(value)),
    }
}

fn non_integer(value: &Value) -> CoercionError {
    CoercionError::new(
        format!("Int cannot represent non-integer value: {}", inspect(value)),
        value.clone(),
    )
}

fn parse_int(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(_) => serialize_int(value),
            None => int_from_f64(n.as_f64().unwrap_or(f64::NAN), value),
        },
        _ => Err(non_integer(value)),
    }
}

fn serialize_float(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Bool(b) => Ok(Value::from(i32::from(*b))),
        Value::Number(_) => Ok(value.clone()),
        Value::String(s) => numeric_string(s)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| non_numeric(value)),
        _ => Err(non_numeric(value)),
    }
}

fn non_numeric(value: &Value) -> CoercionError {
    CoercionError::new(
        format!("Float cannot represent non numeric value: {}", inspect(value)),
        value.clone(),
    )
}

fn parse_float(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        _ => Err(non_numeric(value)),
    }
}

fn serialize_string(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        _ => Err(CoercionError::new(
            format!("String cannot represent value: {}", inspect(value)),
            value.clone(),
        )),
    }
}

fn parse_string(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::String(_) => Ok(value.clone()),
        _ => Err(CoercionError::new(
            format!("String cannot represent a non string value: {}", inspect(value)),
            value.clone(),
        )),
    }
}

fn serialize_boolean(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::Bool(n.as_f64().is_some_and(|n| n != 0.0))),
        _ => Err(non_boolean(value)),
    }
}

fn non_boolean(value: &Value) -> CoercionError {
    CoercionError::new(
        format!("Boolean cannot represent a non boolean value: {}", inspect(value)),
        value.clone(),
    )
}

fn parse_boolean(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        _ => Err(non_boolean(value)),
    }
}

fn serialize_id(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::String(n.to_string())),
        _ => Err(CoercionError::new(
            format!("ID cannot represent value: {}", inspect(value)),
            value.clone(),
        )),
    }
}

fn parse_id(value: &Value) -> Result<Value, CoercionError> {
    serialize_id(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_serialize() {
        let scalar = string();
        assert_eq!(scalar.serialize(&json!("ok")).unwrap(), json!("ok"));
        assert_eq!(scalar.serialize(&json!(true)).unwrap(), json!("true"));
        assert_eq!(scalar.serialize(&json!(-1)).unwrap(), json!("-1"));

        let err = scalar
            .serialize(&json!({"hey": "wrong non String value"}))
            .unwrap_err();
        insta::assert_snapshot!(
            err.message,
            @r#"String cannot represent value: { hey: "wrong non String value" }"#
        );
        assert_eq!(err.value, json!({"hey": "wrong non String value"}));

        assert!(scalar.serialize(&json!(["a"])).is_err());
    }

    #[test]
    fn test_int_serialize() {
        let scalar = int();
        assert_eq!(scalar.serialize(&json!(7)).unwrap(), json!(7));
        assert_eq!(scalar.serialize(&json!(3.0)).unwrap(), json!(3));
        assert_eq!(scalar.serialize(&json!("12")).unwrap(), json!(12));
        assert_eq!(scalar.serialize(&json!(false)).unwrap(), json!(0));

        assert_eq!(
            scalar.serialize(&json!(1.5)).unwrap_err().message,
            "Int cannot represent non-integer value: 1.5"
        );
        assert_eq!(
            scalar.serialize(&json!(2_147_483_648_i64)).unwrap_err().message,
            "Int cannot represent non 32-bit signed integer value: 2147483648"
        );
        assert_eq!(
            scalar.serialize(&json!("abc")).unwrap_err().message,
            "Int cannot represent non-integer value: \"abc\""
        );
    }

    #[test]
    fn test_float_boolean_id_serialize() {
        assert_eq!(float().serialize(&json!(1.25)).unwrap(), json!(1.25));
        assert_eq!(
            float().serialize(&json!([])).unwrap_err().message,
            "Float cannot represent non numeric value: []"
        );

        assert_eq!(boolean().serialize(&json!(0)).unwrap(), json!(false));
        assert_eq!(
            boolean().serialize(&json!("yes")).unwrap_err().message,
            "Boolean cannot represent a non boolean value: \"yes\""
        );

        assert_eq!(id().serialize(&json!(42)).unwrap(), json!("42"));
        assert_eq!(
            id().serialize(&json!(true)).unwrap_err().message,
            "ID cannot represent value: true"
        );
    }

    #[test]
    fn test_parse_values_are_strict() {
        assert_eq!(
            string().parse_value(&json!(1)).unwrap_err().message,
            "String cannot represent a non string value: 1"
        );
        assert_eq!(int().parse_value(&json!(5)).unwrap(), json!(5));
        assert!(int().parse_value(&json!("5")).is_err());
        assert!(boolean().parse_value(&json!(1)).is_err());
        assert_eq!(id().parse_value(&json!(9)).unwrap(), json!("9"));
        assert!(float().parse_value(&json!("1.0")).is_err());
    }

    #[test]
    fn test_is_built_in() {
        assert!(is_built_in("ID"));
        assert!(!is_built_in("DateTime"));
    }
}
