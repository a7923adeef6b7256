//! Debug trace records captured when the engine runs in debug mode.
//!
//! The trace is an ordered list of per-state execution records, each with
//! timings, the state's input and output, and the per-action results of
//! operation states. Capture is per-execution; concurrent executions on
//! the same engine never share a trace.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Ordered trace of every state executed by one workflow run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDebug {
    pub states: Vec<StateExecution>,
}

/// Record of a single state execution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateExecution {
    pub name: String,
    #[serde(rename = "type")]
    pub state_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionResult>,
    /// Name of the matching data condition, for switch states.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_condition: Option<String>,
    /// Parsed sleep duration, for sleep states.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_duration: Option<String>,
}

impl StateExecution {
    pub(crate) fn started(name: &str, state_type: impl ToString, input: Value) -> Self {
        Self {
            name: name.to_string(),
            state_type: state_type.to_string(),
            start_time: Utc::now(),
            end_time: None,
            input: Some(input),
            output: None,
            error: None,
            actions: Vec::new(),
            matched_condition: None,
            sleep_duration: None,
        }
    }
}

/// Record of a single action inside an operation state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub activity_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub(crate) fn started(activity_name: &str) -> Self {
        Self {
            activity_name: activity_name.to_string(),
            arguments: None,
            start_time: Utc::now(),
            end_time: None,
            output: None,
            error: None,
        }
    }
}
