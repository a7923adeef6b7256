//! Structured errors raised by the workflow engine.
//!
//! Engine failures carry a stable code from a closed set plus whatever
//! context was available where the failure occurred (workflow id, state
//! name, activity name, expression, arguments). Causes chain into the
//! rendered form, so an error bubbling out of `Execute` reads like
//! `[STATE_EXECUTION_FAILED] … - caused by: [ACTIVITY_NOT_FOUND] …`.
//!
//! Activity failures keep their own type ([`ActivityError`]); only those
//! are eligible for declarative `onErrors` routing. Everything engine-made
//! propagates immediately and terminates the workflow.

use serde_json::{Map as JsonMap, Value};
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

use waypoint_activities::ActivityError;

/// Closed set of engine error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorCode {
    WorkflowInvalid,
    StateNotFound,
    StateInvalid,
    StateExecutionFailed,
    StateTransitionFailed,
    ActivityNotFound,
    ActivityArgsInvalid,
    ActivityExecutionFailed,
    DataTransformFailed,
    DataValidationFailed,
    DataTypeConversionFailed,
    ExpressionInvalid,
    ExpressionEvalFailed,
    /// Raised when the caller's cancellation token fires between states.
    ExecutionCancelled,
}

impl EngineErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineErrorCode::WorkflowInvalid => "WORKFLOW_INVALID",
            EngineErrorCode::StateNotFound => "STATE_NOT_FOUND",
            EngineErrorCode::StateInvalid => "STATE_INVALID",
            EngineErrorCode::StateExecutionFailed => "STATE_EXECUTION_FAILED",
            EngineErrorCode::StateTransitionFailed => "STATE_TRANSITION_FAILED",
            EngineErrorCode::ActivityNotFound => "ACTIVITY_NOT_FOUND",
            EngineErrorCode::ActivityArgsInvalid => "ACTIVITY_ARGS_INVALID",
            EngineErrorCode::ActivityExecutionFailed => "ACTIVITY_EXECUTION_FAILED",
            EngineErrorCode::DataTransformFailed => "DATA_TRANSFORM_FAILED",
            EngineErrorCode::DataValidationFailed => "DATA_VALIDATION_FAILED",
            EngineErrorCode::DataTypeConversionFailed => "DATA_TYPE_CONVERSION_FAILED",
            EngineErrorCode::ExpressionInvalid => "EXPRESSION_INVALID",
            EngineErrorCode::ExpressionEvalFailed => "EXPRESSION_EVAL_FAILED",
            EngineErrorCode::ExecutionCancelled => "EXECUTION_CANCELLED",
        }
    }
}

impl fmt::Display for EngineErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Context describing where and why an engine error occurred.
#[derive(Debug, Default)]
pub struct ErrorContext {
    pub workflow_id: Option<String>,
    pub state_name: Option<String>,
    pub activity_name: Option<String>,
    pub expression: Option<String>,
    pub arguments: Option<JsonMap<String, Value>>,
    pub additional_info: Option<JsonMap<String, Value>>,
}

/// A structured error in the workflow engine.
#[derive(Debug)]
pub struct WorkflowError {
    pub code: EngineErrorCode,
    pub message: String,
    pub context: ErrorContext,
    pub cause: Option<anyhow::Error>,
}

impl WorkflowError {
    pub fn new(code: EngineErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            cause: None,
        }
    }

    pub fn with_workflow(mut self, workflow_id: impl Into<String>) -> Self {
        self.context.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_state(mut self, state_name: impl Into<String>) -> Self {
        self.context.state_name = Some(state_name.into());
        self
    }

    pub fn with_activity(mut self, activity_name: impl Into<String>) -> Self {
        self.context.activity_name = Some(activity_name.into());
        self
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.context.expression = Some(expression.into());
        self
    }

    pub fn with_arguments(mut self, arguments: JsonMap<String, Value>) -> Self {
        self.context.arguments = Some(arguments);
        self
    }

    /// Attach a free-form key to the error's additional info.
    pub fn with_info(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context
            .additional_info
            .get_or_insert_with(JsonMap::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_cause(mut self, cause: impl Into<anyhow::Error>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Walk the cause chain for an [`ActivityError`], if one is present.
    ///
    /// Only such errors are eligible for `onErrors` handler matching.
    pub fn activity_error(&self) -> Option<&ActivityError> {
        self.cause
            .as_ref()
            .and_then(|cause| cause.chain().find_map(|entry| entry.downcast_ref::<ActivityError>()))
    }
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[{}] {}", self.code, self.message)?;
        if let Some(workflow_id) = &self.context.workflow_id {
            write!(formatter, " (Workflow: {workflow_id})")?;
        }
        if let Some(state_name) = &self.context.state_name {
            write!(formatter, " (State: {state_name})")?;
        }
        if let Some(activity_name) = &self.context.activity_name {
            write!(formatter, " (Activity: {activity_name})")?;
        }
        if let Some(cause) = &self.cause {
            write!(formatter, " - caused by: {cause}")?;
        }
        Ok(())
    }
}

impl StdError for WorkflowError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| &**cause as &(dyn StdError + 'static))
    }
}

/// Error produced while interpreting a single state.
///
/// Activity failures keep their own variant so the operation handler can
/// run `onErrors` matching before anything gets wrapped; everything else
/// is already a [`WorkflowError`].
#[derive(Debug, Error)]
pub(crate) enum StateError {
    #[error(transparent)]
    Activity(#[from] ActivityError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl StateError {
    /// Unwrap into the concrete error so cause chains stay downcastable.
    pub(crate) fn into_cause(self) -> anyhow::Error {
        match self {
            StateError::Activity(activity_error) => anyhow::Error::new(activity_error),
            StateError::Workflow(workflow_error) => anyhow::Error::new(workflow_error),
        }
    }
}

/// Best-effort rendering of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
