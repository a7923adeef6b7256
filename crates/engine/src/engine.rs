//! The execution orchestrator.
//!
//! `Engine::execute` initializes the workflow data, resolves the start
//! state, then drives the state transition loop until a state yields no
//! next state or a failure propagates. The engine itself is stateless
//! across executions: every run owns its data, trace, and timings, so
//! concurrent executions on one instance never interfere.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use indexmap::IndexMap;
use opentelemetry::Context as OtelContext;
use serde_json::{Map as JsonMap, Value};
use std::panic::AssertUnwindSafe;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use waypoint_activities::ActivityRegistry;
use waypoint_types::{State, Workflow};

use crate::data::WorkflowData;
use crate::debug::ExecutionDebug;
use crate::errors::{EngineErrorCode, WorkflowError, panic_message};
use crate::telemetry::{SpanScope, Telemetry};

/// Outcome of a successful workflow execution.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Output of the final state.
    pub data: Value,
    /// Wall-clock time spent inside `execute`.
    pub duration: Duration,
    /// Ordered trace of state executions, in debug mode.
    pub debug: Option<ExecutionDebug>,
}

/// Outcome of a failed workflow execution.
///
/// Duration and the debug trace are still reported so callers can see how
/// far the run progressed before the error.
#[derive(Debug)]
pub struct ExecutionFailure {
    pub error: WorkflowError,
    pub duration: Duration,
    pub debug: Option<ExecutionDebug>,
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(formatter)
    }
}

impl StdError for ExecutionFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.error)
    }
}

/// Interprets workflow definitions against registered activities.
pub struct Engine {
    registry: Arc<ActivityRegistry>,
    debug_enabled: bool,
    pub(crate) telemetry: Option<Telemetry>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("debug_enabled", &self.debug_enabled)
            .field("telemetry_enabled", &self.telemetry.is_some())
            .finish()
    }
}

impl Engine {
    pub fn new(registry: Arc<ActivityRegistry>, debug_enabled: bool, telemetry: Option<Telemetry>) -> Self {
        Self {
            registry,
            debug_enabled,
            telemetry,
        }
    }

    /// The activity registry this engine resolves actions against.
    pub fn registry(&self) -> &Arc<ActivityRegistry> {
        &self.registry
    }

    pub(crate) fn span<F>(&self, parent: &OtelContext, start: F) -> SpanScope
    where
        F: FnOnce(&Telemetry, &OtelContext) -> OtelContext,
    {
        match &self.telemetry {
            Some(telemetry) => SpanScope::owned(start(telemetry, parent)),
            None => SpanScope::noop(parent),
        }
    }

    /// Run a workflow with the given input.
    ///
    /// `globals` seeds the `globals` slot of the workflow data; the engine
    /// never writes to it. The cancellation token is checked before every
    /// state dispatch and passed to each activity and sleep timer.
    pub async fn execute(
        &self,
        cancellation: &CancellationToken,
        workflow: &Workflow,
        input: Value,
        globals: Option<JsonMap<String, Value>>,
    ) -> Result<ExecutionResult, ExecutionFailure> {
        let started_at = Instant::now();
        info!(workflow_id = %workflow.id, "starting workflow execution");

        let workflow_span = self.span(&OtelContext::current(), |telemetry, cx| {
            telemetry.start_workflow_span(cx, &workflow.id)
        });

        let mut trace = self.debug_enabled.then(ExecutionDebug::default);
        if trace.is_some() {
            debug!(workflow_id = %workflow.id, "debug mode enabled");
        }

        let run = self.run_to_completion(workflow_span.context(), cancellation, workflow, input, globals, &mut trace);
        let outcome = match AssertUnwindSafe(run).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => Err(WorkflowError::new(
                EngineErrorCode::StateExecutionFailed,
                format!("panic: {}", panic_message(panic.as_ref())),
            )
            .with_workflow(&workflow.id)),
        };

        let duration = started_at.elapsed();
        info!(workflow_id = %workflow.id, ?duration, "workflow execution completed");

        if let Some(telemetry) = &self.telemetry {
            telemetry.record_workflow_duration(duration.as_secs_f64(), &workflow.id);
            if let Err(error) = &outcome {
                telemetry.record_workflow_error(&workflow.id, error.code.as_str());
            }
        }

        match outcome {
            Ok(data) => {
                workflow_span.finish(None);
                Ok(ExecutionResult {
                    data,
                    duration,
                    debug: trace,
                })
            }
            Err(error) => {
                workflow_span.finish(Some(&error.to_string()));
                Err(ExecutionFailure {
                    error,
                    duration,
                    debug: trace,
                })
            }
        }
    }

    async fn run_to_completion(
        &self,
        cx: &OtelContext,
        cancellation: &CancellationToken,
        workflow: &Workflow,
        input: Value,
        globals: Option<JsonMap<String, Value>>,
        trace: &mut Option<ExecutionDebug>,
    ) -> Result<Value, WorkflowError> {
        let Some(start) = &workflow.start else {
            return Err(WorkflowError::new(EngineErrorCode::WorkflowInvalid, "workflow must declare a start state")
                .with_workflow(&workflow.id));
        };

        let mut data = WorkflowData::new(input, globals);
        debug!(workflow_id = %workflow.id, "initialized workflow data");

        // name → state index, built once per execution
        let states: IndexMap<&str, &State> = workflow.states.iter().map(|state| (state.name(), state)).collect();

        let mut state = *states.get(start.state_name.as_str()).ok_or_else(|| {
            WorkflowError::new(
                EngineErrorCode::StateNotFound,
                format!("start state '{}' not found", start.state_name),
            )
            .with_workflow(&workflow.id)
        })?;

        loop {
            if cancellation.is_cancelled() {
                return Err(
                    WorkflowError::new(EngineErrorCode::ExecutionCancelled, "workflow execution cancelled")
                        .with_workflow(&workflow.id)
                        .with_state(state.name()),
                );
            }

            info!(
                workflow_id = %workflow.id,
                state_name = state.name(),
                state_type = state.state_type().as_str(),
                "executing state"
            );

            let result = self
                .execute_state(cx, cancellation, state, &mut data, trace)
                .await
                .map_err(|state_error| {
                    let message = format!("error executing state {}: {}", state.name(), state_error);
                    WorkflowError::new(EngineErrorCode::StateExecutionFailed, message)
                        .with_workflow(&workflow.id)
                        .with_state(state.name())
                        .with_cause(state_error.into_cause())
                })?;

            data.states.insert(state.name().to_string(), result.data.clone());
            data.current = result.data;

            if result.next_state.is_empty() {
                info!(workflow_id = %workflow.id, "workflow reached an end state");
                break;
            }

            debug!(
                workflow_id = %workflow.id,
                from = state.name(),
                to = %result.next_state,
                "transitioning"
            );
            state = *states.get(result.next_state.as_str()).ok_or_else(|| {
                WorkflowError::new(
                    EngineErrorCode::StateTransitionFailed,
                    format!("transition state '{}' not found", result.next_state),
                )
                .with_workflow(&workflow.id)
            })?;
        }

        Ok(data.current)
    }
}
