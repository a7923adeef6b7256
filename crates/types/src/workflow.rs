//! # Workflow Document Model
//!
//! Data structures describing a declarative JSON workflow: an identified
//! document with a start pointer and an ordered list of states. Each state
//! is one of `operation` (runs activities), `switch` (chooses a transition
//! by condition), or `sleep` (delays a transition).
//!
//! The structures deserialize from the camelCase JSON produced by workflow
//! authors and are deliberately free of behavior beyond small accessors;
//! interpretation belongs to the engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use std::fmt;

pub mod validation;

/// Sentinel error reference that marks a catch-all error handler.
pub const DEFAULT_ERROR_REF: &str = "DefaultErrorRef";

/// A complete workflow definition.
///
/// Workflows are immutable inputs to the engine: the document is parsed and
/// validated once, then interpreted any number of times against different
/// input data.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Unique identifier of the workflow, attached to logs and spans.
    pub id: String,

    /// Optional human-friendly display name.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Document version as authored, e.g. `"1.0"`.
    #[serde(default)]
    pub version: Option<String>,

    /// Serverless Workflow schema version the document targets.
    #[serde(default)]
    pub spec_version: Option<String>,

    /// Entry point of the state graph.
    ///
    /// A workflow without a start pointer is rejected by the engine before
    /// any state runs.
    #[serde(default)]
    pub start: Option<Start>,

    /// Declarative retry strategies.
    ///
    /// Carried through parsing so documents round-trip, but the engine does
    /// not act on them yet.
    #[serde(default)]
    pub retries: Vec<RetryDefinition>,

    /// Ordered list of states making up the graph.
    #[serde(default)]
    pub states: Vec<State>,
}

/// Start pointer naming the first state to execute.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Start {
    pub state_name: String,
}

/// A single node in the workflow graph, dispatched on its `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum State {
    Operation(OperationState),
    Switch(SwitchState),
    Sleep(SleepState),
}

impl State {
    /// Name of the state, unique within a workflow.
    pub fn name(&self) -> &str {
        match self {
            State::Operation(state) => &state.name,
            State::Switch(state) => &state.name,
            State::Sleep(state) => &state.name,
        }
    }

    /// Kind discriminant for logging and dispatch.
    pub fn state_type(&self) -> StateType {
        match self {
            State::Operation(_) => StateType::Operation,
            State::Switch(_) => StateType::Switch,
            State::Sleep(_) => StateType::Sleep,
        }
    }
}

/// State kind discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateType {
    Operation,
    Switch,
    Sleep,
}

impl StateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateType::Operation => "operation",
            StateType::Switch => "switch",
            StateType::Sleep => "sleep",
        }
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A state that executes an ordered list of actions.
///
/// Actions run sequentially; the output of the last action becomes the
/// state's output. Failures may be routed to other states via `on_errors`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OperationState {
    pub name: String,

    #[serde(default)]
    pub actions: Vec<Action>,

    /// Next state after all actions succeed. Absent (or an empty
    /// `next_state`) marks a terminal state.
    #[serde(default)]
    pub transition: Option<Transition>,

    /// Ordered error handlers consulted when an action fails with an
    /// activity error. See [`DEFAULT_ERROR_REF`] for the catch-all entry.
    #[serde(default)]
    pub on_errors: Vec<ErrorHandler>,
}

/// A state that picks its transition by evaluating conditions in order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SwitchState {
    pub name: String,

    /// Data-driven conditions, evaluated against the full workflow data
    /// tree in declared order; the first condition yielding `true` wins.
    #[serde(default)]
    pub data_conditions: Vec<DataCondition>,

    /// Event-driven conditions. Declared for schema compatibility; the
    /// engine rejects workflows that reach them at execution time.
    #[serde(default)]
    pub event_conditions: Vec<EventCondition>,

    /// Transition taken when no condition matches.
    pub default_condition: DefaultCondition,
}

/// A state that pauses execution for an ISO-8601 duration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SleepState {
    pub name: String,

    /// ISO-8601 duration string, e.g. `"PT5S"` or `"P2W"`.
    pub duration: String,

    pub transition: Transition,
}

/// A single activity invocation within an operation state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Reference into the workflow's retry strategies. Carried but not yet
    /// acted on by the engine.
    #[serde(default)]
    pub retry_ref: Option<String>,

    pub function_ref: FunctionRef,
}

/// Reference to a registered activity plus its argument tree.
///
/// Argument leaves may be literals or `${ … }` path-query templates that
/// the engine expands against workflow data right before invocation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRef {
    pub ref_name: String,

    #[serde(default)]
    pub arguments: JsonMap<String, Value>,
}

/// Edge to another state in the graph.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub next_state: String,
}

/// Declarative error route attached to an operation state.
///
/// `error_ref` is matched as a substring of the rendered activity error,
/// so handlers can key on error codes or activity names. The literal
/// [`DEFAULT_ERROR_REF`] marks the catch-all handler.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ErrorHandler {
    pub error_ref: String,
    pub transition: Transition,
}

/// A named boolean condition over workflow data.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DataCondition {
    #[serde(default)]
    pub name: String,

    /// Path-query expression that must evaluate to a boolean.
    pub condition: String,

    pub transition: Transition,
}

/// An event-driven switch condition. Parsed but not executable.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventCondition {
    pub event_ref: String,
    pub transition: Transition,
}

/// Fallback transition of a switch state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DefaultCondition {
    pub transition: Transition,
}

/// A declarative retry strategy.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RetryDefinition {
    pub name: String,

    #[serde(default)]
    pub delay: Option<String>,

    #[serde(default)]
    pub multiplier: Option<f64>,

    #[serde(default)]
    pub max_attempts: Option<u32>,
}
