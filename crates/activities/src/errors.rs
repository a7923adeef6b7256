//! Structured errors produced by activities.
//!
//! Every activity failure carries a stable code plus the activity name.
//! The rendered form (`[CODE] message (Activity: name)`) is part of the
//! user-facing protocol: declarative error handlers match their
//! `errorRef` as a substring of this rendering.

use serde_json::{Map as JsonMap, Value};
use std::error::Error as StdError;
use std::fmt;

/// Closed set of activity error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityErrorCode {
    InvalidArguments,
    ExecutionFailed,
    Panic,
    HttpRequestFailed,
    HttpResponseFailed,
    HttpStatusError,
    JqParseError,
    JqExecuteError,
    JweEncryptError,
}

impl ActivityErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityErrorCode::InvalidArguments => "INVALID_ARGUMENTS",
            ActivityErrorCode::ExecutionFailed => "EXECUTION_FAILED",
            ActivityErrorCode::Panic => "PANIC",
            ActivityErrorCode::HttpRequestFailed => "HTTP_REQUEST_FAILED",
            ActivityErrorCode::HttpResponseFailed => "HTTP_RESPONSE_FAILED",
            ActivityErrorCode::HttpStatusError => "HTTP_STATUS_ERROR",
            ActivityErrorCode::JqParseError => "JQ_PARSE_ERROR",
            ActivityErrorCode::JqExecuteError => "JQ_EXECUTE_ERROR",
            ActivityErrorCode::JweEncryptError => "JWE_ENCRYPT_ERROR",
        }
    }
}

impl fmt::Display for ActivityErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A structured error returned by an activity execution.
#[derive(Debug)]
pub struct ActivityError {
    pub code: ActivityErrorCode,
    pub message: String,
    pub activity_name: String,
    /// Arguments that led to the failure, when they add context.
    pub arguments: Option<JsonMap<String, Value>>,
    /// Underlying error, chained into the rendered form.
    pub cause: Option<anyhow::Error>,
}

impl ActivityError {
    pub fn new(
        code: ActivityErrorCode,
        message: impl Into<String>,
        activity_name: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            activity_name: activity_name.into(),
            arguments: None,
            cause: None,
        }
    }

    /// Shorthand for the common argument-decoding failure.
    pub fn invalid_arguments(activity_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ActivityErrorCode::InvalidArguments, message, activity_name)
    }

    pub fn with_cause(mut self, cause: impl Into<anyhow::Error>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn with_arguments(mut self, arguments: JsonMap<String, Value>) -> Self {
        self.arguments = Some(arguments);
        self
    }
}

impl fmt::Display for ActivityError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "[{}] {} (Activity: {})",
            self.code, self.message, self.activity_name
        )?;
        if let Some(cause) = &self.cause {
            write!(formatter, " - caused by: {cause}")?;
        }
        Ok(())
    }
}

impl StdError for ActivityError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| &**cause as &(dyn StdError + 'static))
    }
}
