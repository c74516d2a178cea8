//! Utility functions for GraphQL execution

use crate::core::error::ValidationError;
use graphql_parser::query::{Directive, Field, Value as GqlValue};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use uuid::Uuid;
use validator::Validate;

/// Key under which a field appears in the response (its alias, if any)
pub fn response_key<'f>(field: &'f Field<'_, String>) -> &'f str {
    field.alias.as_deref().unwrap_or(field.name.as_str())
}

/// Get an argument as JSON, with variables substituted
pub fn get_arg(field: &Field<String>, arg_name: &str, variables: &Map<String, Value>) -> Option<Value> {
    field
        .arguments
        .iter()
        .find(|(name, _)| name.as_str() == arg_name)
        .map(|(_, value)| gql_value_to_json(value, variables))
}

/// Get an argument that must be present and non-null
pub fn required_arg(
    field: &Field<String>,
    arg_name: &str,
    variables: &Map<String, Value>,
) -> Result<Value, ValidationError> {
    match get_arg(field, arg_name, variables) {
        Some(Value::Null) | None => Err(ValidationError::MissingArgument {
            argument: arg_name.to_string(),
        }),
        Some(value) => Ok(value),
    }
}

/// Get a required string argument
pub fn string_arg(
    field: &Field<String>,
    arg_name: &str,
    variables: &Map<String, Value>,
) -> Result<String, ValidationError> {
    match required_arg(field, arg_name, variables)? {
        Value::String(s) => Ok(s),
        other => Err(ValidationError::InvalidInput {
            argument: arg_name.to_string(),
            message: format!("expected a string, got {}", other),
        }),
    }
}

/// Get a required UUID argument, normalised to its hyphenated form
pub fn uuid_arg(
    field: &Field<String>,
    arg_name: &str,
    variables: &Map<String, Value>,
) -> Result<String, ValidationError> {
    let raw = string_arg(field, arg_name, variables)?;
    Uuid::parse_str(&raw)
        .map(|id| id.to_string())
        .map_err(|_| ValidationError::InvalidUuid { value: raw })
}

/// Deserialize an input object argument and run its validation rules
pub fn input_arg<T>(
    field: &Field<String>,
    arg_name: &str,
    variables: &Map<String, Value>,
) -> Result<T, ValidationError>
where
    T: DeserializeOwned + Validate,
{
    let value = required_arg(field, arg_name, variables)?;
    let input: T = serde_json::from_value(value).map_err(|e| ValidationError::InvalidInput {
        argument: arg_name.to_string(),
        message: e.to_string(),
    })?;
    input.validate()?;
    Ok(input)
}

/// Convert GraphQL value to JSON
pub fn gql_value_to_json(value: &GqlValue<String>, variables: &Map<String, Value>) -> Value {
    match value {
        GqlValue::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
        GqlValue::Null => Value::Null,
        GqlValue::Int(i) => i.as_i64().map(|n| json!(n)).unwrap_or(Value::Null),
        GqlValue::Float(f) => json!(f),
        GqlValue::String(s) => json!(s),
        GqlValue::Boolean(b) => json!(b),
        GqlValue::Enum(e) => json!(e),
        GqlValue::List(list) => Value::Array(
            list.iter()
                .map(|item| gql_value_to_json(item, variables))
                .collect(),
        ),
        GqlValue::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), gql_value_to_json(v, variables)))
                .collect(),
        ),
    }
}

/// Evaluate `@skip(if:)` and `@include(if:)`
pub fn is_included(directives: &[Directive<String>], variables: &Map<String, Value>) -> bool {
    directives.iter().all(|directive| {
        let condition = directive
            .arguments
            .iter()
            .find(|(name, _)| name.as_str() == "if")
            .map(|(_, value)| gql_value_to_json(value, variables))
            .and_then(|v| v.as_bool());
        match (directive.name.as_str(), condition) {
            ("skip", Some(true)) => false,
            ("include", Some(false)) => false,
            _ => true,
        }
    })
}

/// Convert camelCase to snake_case
pub fn camel_to_snake(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(ch.to_ascii_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
