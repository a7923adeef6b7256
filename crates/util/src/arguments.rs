//! # Argument Resolution
//!
//! Recursive evaluation of action argument trees against workflow data.
//! String leaves using the `${ … }` template syntax are replaced by the
//! first result of their expression; every other leaf passes through as a
//! structural copy. Arrays preserve order, objects preserve keys, and the
//! first failing leaf short-circuits the walk.

use serde_json::{Map as JsonMap, Value};
use thiserror::Error;

use crate::expression::{Expression, ExpressionError, extract_template, is_template};

/// Failure while resolving a named argument.
///
/// The key names the top-level argument whose subtree failed, which is the
/// granularity workflow authors reason at.
#[derive(Debug, Error)]
#[error("failed to evaluate argument '{key}'")]
pub struct ArgumentError {
    pub key: String,
    #[source]
    pub source: ExpressionError,
}

/// Evaluate a single argument leaf.
///
/// Template strings are parsed and executed against `data`, taking the
/// first result of the produced sequence. Non-template strings and all
/// other values are returned unchanged.
pub fn evaluate_argument(value: &Value, data: &Value) -> Result<Value, ExpressionError> {
    if let Value::String(text) = value
        && is_template(text)
    {
        let body = extract_template(text).unwrap_or_default();
        let expression = Expression::parse(body)?;
        return expression.evaluate_first(data);
    }
    Ok(value.clone())
}

/// Recursively evaluate a value tree, expanding template leaves.
pub fn evaluate_value(value: &Value, data: &Value) -> Result<Value, ExpressionError> {
    match value {
        Value::String(_) => evaluate_argument(value, data),
        Value::Array(items) => items
            .iter()
            .map(|item| evaluate_value(item, data))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(entries) => {
            let mut evaluated = JsonMap::new();
            for (key, entry) in entries {
                evaluated.insert(key.clone(), evaluate_value(entry, data)?);
            }
            Ok(Value::Object(evaluated))
        }
        _ => Ok(value.clone()),
    }
}

/// Evaluate every entry of an argument map, reporting the failing key.
pub fn evaluate_argument_map(
    arguments: &JsonMap<String, Value>,
    data: &Value,
) -> Result<JsonMap<String, Value>, ArgumentError> {
    let mut resolved = JsonMap::new();
    for (key, value) in arguments {
        let evaluated = evaluate_value(value, data).map_err(|source| ArgumentError {
            key: key.clone(),
            source,
        })?;
        resolved.insert(key.clone(), evaluated);
    }
    Ok(resolved)
}
