//! State dispatch and the per-state execution record.

use opentelemetry::Context as OtelContext;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use waypoint_activities::ActivityError;
use waypoint_types::State;

use crate::data::WorkflowData;
use crate::debug::{ExecutionDebug, StateExecution};
use crate::engine::Engine;
use crate::errors::StateError;

/// Result of executing a single state.
#[derive(Debug)]
pub struct StateResult {
    /// Value the state produced; becomes `current` and `states[name]`.
    pub data: Value,
    /// Next state to execute. Empty means the workflow is complete.
    pub next_state: String,
    /// The activity error a matched `onErrors` handler absorbed, when the
    /// state completed by error routing rather than success.
    pub error: Option<ActivityError>,
}

impl Engine {
    /// Execute one state and produce its result and transition.
    pub(crate) async fn execute_state(
        &self,
        parent_cx: &OtelContext,
        cancellation: &CancellationToken,
        state: &State,
        data: &mut WorkflowData,
        trace: &mut Option<ExecutionDebug>,
    ) -> Result<StateResult, StateError> {
        let state_name = state.name();
        let state_type = state.state_type();
        debug!(state_name, state_type = state_type.as_str(), "starting state execution");

        if let Some(telemetry) = &self.telemetry {
            telemetry.record_state(state_name, state_type.as_str());
        }
        let state_span = self.span(parent_cx, |telemetry, cx| {
            telemetry.start_state_span(cx, state_name, state_type.as_str())
        });

        let mut record = trace
            .as_ref()
            .map(|_| StateExecution::started(state_name, state_type, data.current.clone()));

        let outcome = match state {
            State::Operation(operation) => {
                self.execute_operation_state(state_span.context(), cancellation, operation, data, &mut record)
                    .await
            }
            State::Switch(switch) => self.execute_switch_state(state_span.context(), switch, data, &mut record),
            State::Sleep(sleep) => {
                self.execute_sleep_state(state_span.context(), cancellation, sleep, data, &mut record)
                    .await
            }
        };

        match outcome {
            Ok(result) => {
                if let Some(record) = &mut record {
                    record.output = Some(result.data.clone());
                }
                finish_record(trace, record);
                state_span.finish(None);
                info!(state_name, "state completed");
                Ok(result)
            }
            Err(state_error) => {
                let rendered = state_error.to_string();
                if let Some(record) = &mut record {
                    record.error = Some(rendered.clone());
                }
                finish_record(trace, record);
                state_span.finish(Some(&rendered));
                error!(state_name, error = %rendered, "state execution failed");
                Err(state_error)
            }
        }
    }
}

fn finish_record(trace: &mut Option<ExecutionDebug>, record: Option<StateExecution>) {
    if let (Some(trace), Some(mut record)) = (trace.as_mut(), record) {
        record.end_time = Some(chrono::Utc::now());
        trace.states.push(record);
    }
}
