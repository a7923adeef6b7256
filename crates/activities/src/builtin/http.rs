//! HTTP request activity.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{Map as JsonMap, Value, json};
use tracing::debug;

use crate::args::{decode_args, require_one_of};
use crate::context::ActivityContext;
use crate::errors::{ActivityError, ActivityErrorCode};
use crate::Activity;

const ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

/// Arguments accepted by [`HttpRequestActivity`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestArgs {
    url: String,
    method: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default = "default_timeout_sec")]
    timeout_sec: u64,
    #[serde(default)]
    fail_on_error: bool,
}

fn default_timeout_sec() -> u64 {
    30
}

/// Performs an HTTP request and returns `{statusCode, headers, body}`.
///
/// JSON response bodies are parsed when the response content type says
/// so; anything else comes back as a string. With `failOnError` set, a
/// non-2xx status turns into an `HTTP_STATUS_ERROR` carrying the full
/// response so error handlers can still route on it.
pub struct HttpRequestActivity {
    client: Client,
}

impl HttpRequestActivity {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

impl Default for HttpRequestActivity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Activity for HttpRequestActivity {
    async fn execute(
        &self,
        context: &ActivityContext,
        arguments: &JsonMap<String, Value>,
    ) -> Result<Value, anyhow::Error> {
        let activity_name = context.info().activity_name;
        let args: RequestArgs = decode_args(&activity_name, arguments)?;

        let method_name = args.method.to_ascii_uppercase();
        require_one_of(&activity_name, "method", &method_name, ALLOWED_METHODS)?;
        let method = Method::from_str(&method_name).map_err(|error| {
            ActivityError::invalid_arguments(&activity_name, format!("invalid HTTP method '{}'", args.method))
                .with_cause(anyhow::Error::new(error))
        })?;

        let mut headers = HeaderMap::new();
        for (key, value) in &args.headers {
            let header_name = HeaderName::from_str(key).map_err(|error| {
                ActivityError::invalid_arguments(&activity_name, format!("invalid header name '{key}'"))
                    .with_cause(anyhow::Error::new(error))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|error| {
                ActivityError::invalid_arguments(&activity_name, format!("invalid value for header '{key}'"))
                    .with_cause(anyhow::Error::new(error))
            })?;
            headers.insert(header_name, header_value);
        }

        debug!(url = %args.url, method = %method_name, "sending HTTP request");

        let mut request = self
            .client
            .request(method, args.url.as_str())
            .timeout(Duration::from_secs(args.timeout_sec))
            .headers(headers);
        if let Some(body) = &args.body {
            // json() also sets the content type unless the caller provided one
            request = request.json(body);
        }

        let response = tokio::select! {
            _ = context.cancellation().cancelled() => {
                return Err(ActivityError::new(
                    ActivityErrorCode::HttpRequestFailed,
                    "request cancelled",
                    &activity_name,
                )
                .into());
            }
            result = request.send() => result.map_err(|error| {
                ActivityError::new(ActivityErrorCode::HttpRequestFailed, "HTTP request failed", &activity_name)
                    .with_cause(anyhow::Error::new(error))
            })?,
        };

        let status_code = response.status().as_u16();
        let mut response_headers = JsonMap::new();
        for (name, value) in response.headers() {
            if let Ok(text) = value.to_str() {
                response_headers.insert(name.to_string(), Value::String(text.to_string()));
            }
        }
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|content_type| content_type.contains("application/json"))
            .unwrap_or(false);

        let text = response.text().await.map_err(|error| {
            ActivityError::new(
                ActivityErrorCode::HttpResponseFailed,
                "failed to read response body",
                &activity_name,
            )
            .with_cause(anyhow::Error::new(error))
        })?;

        let body = if is_json {
            // fall back to the raw text when the body is not actually JSON
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        } else {
            Value::String(text)
        };

        debug!(status_code, "HTTP request completed");

        let result = json!({
            "statusCode": status_code,
            "headers": Value::Object(response_headers),
            "body": body,
        });

        if args.fail_on_error && !(200..300).contains(&status_code) {
            let mut error_arguments = JsonMap::new();
            error_arguments.insert("statusCode".into(), json!(status_code));
            error_arguments.insert("response".into(), result);
            return Err(ActivityError::new(
                ActivityErrorCode::HttpStatusError,
                format!("request failed with status code {status_code}"),
                &activity_name,
            )
            .with_arguments(error_arguments)
            .into());
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arguments(value: Value) -> JsonMap<String, Value> {
        value.as_object().expect("object fixture").clone()
    }

    fn activity_error(error: anyhow::Error) -> ActivityError {
        error.downcast::<ActivityError>().expect("activity error")
    }

    #[tokio::test]
    async fn rejects_missing_url() {
        let activity = HttpRequestActivity::new();
        let error = activity
            .execute(&ActivityContext::default(), &arguments(json!({"method": "GET"})))
            .await
            .expect_err("should require url");
        assert_eq!(activity_error(error).code, ActivityErrorCode::InvalidArguments);
    }

    #[tokio::test]
    async fn rejects_unknown_method() {
        let activity = HttpRequestActivity::new();
        let error = activity
            .execute(
                &ActivityContext::default(),
                &arguments(json!({"url": "http://localhost/", "method": "FETCH"})),
            )
            .await
            .expect_err("should reject method");
        let error = activity_error(error);
        assert_eq!(error.code, ActivityErrorCode::InvalidArguments);
        assert!(error.to_string().contains("'method'"), "unexpected error: {error}");
    }

    #[tokio::test]
    async fn rejects_invalid_header_name() {
        let activity = HttpRequestActivity::new();
        let error = activity
            .execute(
                &ActivityContext::default(),
                &arguments(json!({
                    "url": "http://localhost/",
                    "method": "GET",
                    "headers": {"bad header\n": "x"}
                })),
            )
            .await
            .expect_err("should reject header");
        assert_eq!(activity_error(error).code, ActivityErrorCode::InvalidArguments);
    }

    #[tokio::test]
    async fn unreachable_host_maps_to_request_failed() {
        let activity = HttpRequestActivity::new();
        // reserved TLD guarantees resolution failure without network access
        let error = activity
            .execute(
                &ActivityContext::default(),
                &arguments(json!({
                    "url": "http://waypoint-test.invalid/",
                    "method": "GET",
                    "timeoutSec": 1
                })),
            )
            .await
            .expect_err("should fail to connect");
        assert_eq!(activity_error(error).code, ActivityErrorCode::HttpRequestFailed);
    }
}
