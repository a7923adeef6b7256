//! Operation states: the sequential action loop and its three phases.
//!
//! Each action resolves its activity, evaluates its arguments against the
//! current workflow data, then invokes the activity behind a panic trap.
//! `data.current` advances only after an action succeeds, so on failure
//! the data at hand is the last successful action's output.

use chrono::Utc;
use futures::FutureExt;
use opentelemetry::Context as OtelContext;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use waypoint_activities::{ActivityContext, ActivityError, ActivityErrorCode};
use waypoint_types::{Action, OperationState};
use waypoint_util::arguments::evaluate_argument_map;

use crate::data::WorkflowData;
use crate::debug::{ActionResult, StateExecution};
use crate::engine::Engine;
use crate::errors::{EngineErrorCode, StateError, WorkflowError, panic_message};
use crate::state::StateResult;

impl Engine {
    pub(crate) async fn execute_operation_state(
        &self,
        parent_cx: &OtelContext,
        cancellation: &CancellationToken,
        state: &OperationState,
        data: &mut WorkflowData,
        record: &mut Option<StateExecution>,
    ) -> Result<StateResult, StateError> {
        match self.execute_actions(parent_cx, cancellation, state, data, record).await {
            Ok(result_data) => {
                let next_state = state
                    .transition
                    .as_ref()
                    .map(|transition| transition.next_state.clone())
                    .unwrap_or_default();
                Ok(StateResult {
                    data: result_data,
                    next_state,
                    error: None,
                })
            }
            Err(StateError::Activity(activity_error)) if !state.on_errors.is_empty() => {
                match self.handle_state_error(parent_cx, &state.name, &activity_error, &state.on_errors) {
                    Some(next_state) => Ok(StateResult {
                        // the handler absorbs the failure; data at hand stays at
                        // the last successful action's output
                        data: data.current.clone(),
                        next_state,
                        error: Some(activity_error),
                    }),
                    None => Err(StateError::Activity(activity_error)),
                }
            }
            Err(other) => Err(other),
        }
    }

    /// Run the state's actions in declared order, threading `data.current`.
    async fn execute_actions(
        &self,
        parent_cx: &OtelContext,
        cancellation: &CancellationToken,
        state: &OperationState,
        data: &mut WorkflowData,
        record: &mut Option<StateExecution>,
    ) -> Result<Value, StateError> {
        let group_span = if state.actions.is_empty() {
            crate::telemetry::SpanScope::noop(parent_cx)
        } else {
            self.span(parent_cx, |telemetry, cx| {
                telemetry.start_action_group_span(cx, &state.name, state.actions.len())
            })
        };

        let mut current_result = data.current.clone();
        let mut failure: Option<StateError> = None;

        for action in &state.actions {
            match self
                .execute_action(group_span.context(), cancellation, action, data, record)
                .await
            {
                Ok(value) => {
                    data.current = value.clone();
                    current_result = value;
                }
                Err(state_error) => {
                    failure = Some(state_error);
                    break;
                }
            }
        }

        let rendered = failure.as_ref().map(|state_error| state_error.to_string());
        group_span.finish(rendered.as_deref());

        match failure {
            Some(state_error) => Err(state_error),
            None => Ok(current_result),
        }
    }

    /// Execute a single action: lookup, argument resolution, invocation.
    async fn execute_action(
        &self,
        parent_cx: &OtelContext,
        cancellation: &CancellationToken,
        action: &Action,
        data: &WorkflowData,
        state_record: &mut Option<StateExecution>,
    ) -> Result<Value, StateError> {
        let activity_name = action.function_ref.ref_name.as_str();
        info!(activity_name, "executing activity");

        let started_at = Instant::now();
        let activity_span = self.span(parent_cx, |telemetry, cx| telemetry.start_activity_span(cx, activity_name));
        let mut action_record = state_record.as_ref().map(|_| ActionResult::started(activity_name));

        let outcome = self
            .run_action_phases(activity_span.context(), cancellation, action, data, &mut action_record)
            .await;

        if let Some(telemetry) = &self.telemetry {
            telemetry.record_activity_duration(started_at.elapsed().as_secs_f64(), activity_name);
            telemetry.record_activity(activity_name);
            if let Some(StateError::Activity(activity_error)) = outcome.as_ref().err() {
                telemetry.record_activity_error(activity_name, activity_error.code.as_str());
            }
        }

        if let (Some(state_record), Some(mut record)) = (state_record.as_mut(), action_record.take()) {
            record.end_time = Some(Utc::now());
            match &outcome {
                Ok(value) => record.output = Some(value.clone()),
                Err(state_error) => record.error = Some(state_error.to_string()),
            }
            state_record.actions.push(record);
        }

        let rendered = outcome.as_ref().err().map(|state_error| state_error.to_string());
        activity_span.finish(rendered.as_deref());
        outcome
    }

    async fn run_action_phases(
        &self,
        parent_cx: &OtelContext,
        cancellation: &CancellationToken,
        action: &Action,
        data: &WorkflowData,
        action_record: &mut Option<ActionResult>,
    ) -> Result<Value, StateError> {
        let activity_name = action.function_ref.ref_name.as_str();

        // Phase 1: activity lookup
        let lookup_span = self.span(parent_cx, |telemetry, cx| {
            telemetry.start_activity_lookup_span(cx, activity_name)
        });
        let Some(activity) = self.registry().get(activity_name) else {
            let workflow_error = WorkflowError::new(EngineErrorCode::ActivityNotFound, "activity not found")
                .with_activity(activity_name);
            lookup_span.finish(Some(&workflow_error.to_string()));
            error!(activity_name, "activity not found");
            return Err(workflow_error.into());
        };
        lookup_span.finish(None);

        // Phase 2: argument resolution
        let args_span = self.span(parent_cx, |telemetry, cx| {
            telemetry.start_activity_args_span(cx, activity_name)
        });
        debug!(activity_name, "evaluating activity arguments");
        let arguments = match evaluate_argument_map(&action.function_ref.arguments, &data.to_value()) {
            Ok(arguments) => {
                args_span.finish(None);
                arguments
            }
            Err(argument_error) => {
                // engine error, not an activity error: argument failures are
                // not subject to onErrors routing
                let workflow_error =
                    WorkflowError::new(EngineErrorCode::ExpressionEvalFailed, "failed to evaluate arguments")
                        .with_activity(activity_name)
                        .with_cause(argument_error);
                args_span.finish(Some(&workflow_error.to_string()));
                error!(activity_name, error = %workflow_error, "failed to evaluate arguments");
                return Err(workflow_error.into());
            }
        };
        if let Some(record) = action_record {
            record.arguments = Some(Value::Object(arguments.clone()));
        }

        // Phase 3: activity execution behind a panic trap
        let execution_span = self.span(parent_cx, |telemetry, cx| {
            telemetry.start_activity_execution_span(cx, activity_name)
        });
        let context = ActivityContext::new(cancellation.clone());
        let invocation = AssertUnwindSafe(activity.execute(&context, &arguments)).catch_unwind();

        let result = match invocation.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(failure)) => Err(into_activity_error(failure, activity_name)),
            Err(panic) => Err(ActivityError::new(
                ActivityErrorCode::Panic,
                format!("panic in activity execution: {}", panic_message(panic.as_ref())),
                activity_name,
            )),
        };

        match &result {
            Ok(_) => {
                execution_span.finish(None);
                debug!(activity_name, "activity executed successfully");
            }
            Err(activity_error) => {
                execution_span.finish(Some(&activity_error.to_string()));
                error!(activity_name, error = %activity_error, "activity execution failed");
            }
        }

        result.map_err(StateError::from)
    }
}

/// Keep activity errors intact; wrap anything else as `EXECUTION_FAILED`.
fn into_activity_error(failure: anyhow::Error, activity_name: &str) -> ActivityError {
    match failure.downcast::<ActivityError>() {
        Ok(activity_error) => activity_error,
        Err(other) => ActivityError::new(ActivityErrorCode::ExecutionFailed, "activity execution failed", activity_name)
            .with_cause(other),
    }
}
