//! Shared workflow document types.
//!
//! The object model mirrors the Serverless Workflow 0.8 subset the engine
//! interprets: a workflow is an ordered list of named states (operation,
//! switch, sleep) plus a start pointer. These types are pure data; all
//! execution semantics live in `waypoint-engine`.

pub mod workflow;

pub use workflow::validation::validate_workflow;
pub use workflow::{
    Action, DEFAULT_ERROR_REF, DataCondition, DefaultCondition, ErrorHandler, EventCondition,
    FunctionRef, OperationState, RetryDefinition, SleepState, Start, State, StateType, SwitchState,
    Transition, Workflow,
};
