//! Typed decoding of activity argument maps.
//!
//! Built-in activities declare their argument schema as a serde struct:
//! field renames bind JSON keys, non-`Option` fields are required, and
//! `#[serde(default)]` supplies literal defaults. Decoding failures are
//! reported as `INVALID_ARGUMENTS` with the serde error as the cause so
//! authors see exactly which key was missing or mistyped.

use serde::de::DeserializeOwned;
use serde_json::{Map as JsonMap, Value};

use crate::errors::{ActivityError, ActivityErrorCode};

/// Decode an argument map into the activity's typed argument struct.
pub fn decode_args<T: DeserializeOwned>(
    activity_name: &str,
    arguments: &JsonMap<String, Value>,
) -> Result<T, ActivityError> {
    serde_json::from_value(Value::Object(arguments.clone())).map_err(|source| {
        ActivityError::new(
            ActivityErrorCode::InvalidArguments,
            format!("invalid arguments: {source}"),
            activity_name,
        )
        .with_arguments(arguments.clone())
    })
}

/// Enforce a `oneof` constraint on a decoded string field.
pub fn require_one_of(
    activity_name: &str,
    field: &str,
    value: &str,
    allowed: &[&str],
) -> Result<(), ActivityError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(ActivityError::new(
        ActivityErrorCode::InvalidArguments,
        format!("'{field}' must be one of {}, got '{value}'", allowed.join(", ")),
        activity_name,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct SampleArgs {
        url: String,
        #[serde(default = "default_timeout")]
        timeout_sec: u64,
        #[serde(default)]
        fail_on_error: bool,
    }

    fn default_timeout() -> u64 {
        30
    }

    fn map(value: Value) -> JsonMap<String, Value> {
        value.as_object().expect("object fixture").clone()
    }

    #[test]
    fn decodes_present_fields_and_applies_defaults() {
        let args: SampleArgs =
            decode_args("Sample", &map(json!({"url": "https://example.test"}))).expect("decode");
        assert_eq!(args.url, "https://example.test");
        assert_eq!(args.timeout_sec, 30);
        assert!(!args.fail_on_error);
    }

    #[test]
    fn missing_required_field_is_invalid_arguments() {
        let error = decode_args::<SampleArgs>("Sample", &map(json!({"timeoutSec": 5})))
            .expect_err("should require url");
        assert_eq!(error.code, ActivityErrorCode::InvalidArguments);
        assert!(error.to_string().contains("url"), "unexpected error: {error}");
        assert!(error.arguments.is_some());
    }

    #[test]
    fn mistyped_field_is_invalid_arguments() {
        let error = decode_args::<SampleArgs>(
            "Sample",
            &map(json!({"url": "https://example.test", "timeoutSec": "soon"})),
        )
        .expect_err("should reject string timeout");
        assert_eq!(error.code, ActivityErrorCode::InvalidArguments);
    }

    #[test]
    fn one_of_accepts_and_rejects() {
        assert!(require_one_of("Sample", "method", "GET", &["GET", "POST"]).is_ok());
        let error = require_one_of("Sample", "method", "FETCH", &["GET", "POST"])
            .expect_err("should reject unknown method");
        assert!(
            error.to_string().contains("'method' must be one of"),
            "unexpected error: {error}"
        );
    }
}
