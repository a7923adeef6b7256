//! Sleep states: timed delays racing the cancellation token.

use opentelemetry::Context as OtelContext;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use waypoint_types::SleepState;
use waypoint_util::duration::parse_iso8601_duration;

use crate::data::WorkflowData;
use crate::debug::StateExecution;
use crate::engine::Engine;
use crate::errors::{EngineErrorCode, StateError, WorkflowError};
use crate::state::StateResult;

impl Engine {
    /// Arm a timer for the state's duration and wait for the timer or the
    /// caller's cancellation, whichever fires first. Cancellation here does
    /// not fail the state; the loop surfaces it before the next dispatch.
    pub(crate) async fn execute_sleep_state(
        &self,
        parent_cx: &OtelContext,
        cancellation: &CancellationToken,
        state: &SleepState,
        data: &WorkflowData,
        record: &mut Option<StateExecution>,
    ) -> Result<StateResult, StateError> {
        let span = self.span(parent_cx, |telemetry, cx| {
            telemetry.start_sleep_span(cx, &state.name, &state.duration)
        });

        let duration = match parse_iso8601_duration(&state.duration) {
            Ok(duration) => duration,
            Err(duration_error) => {
                let workflow_error = WorkflowError::new(EngineErrorCode::ExpressionInvalid, "invalid sleep duration")
                    .with_state(&state.name)
                    .with_cause(duration_error);
                span.finish(Some(&workflow_error.to_string()));
                return Err(workflow_error.into());
            }
        };

        if let Some(record) = record {
            record.sleep_duration = Some(format!("{duration:?}"));
        }

        debug!(state_name = %state.name, ?duration, "sleeping");
        tokio::select! {
            _ = cancellation.cancelled() => {
                debug!(state_name = %state.name, "sleep interrupted by cancellation");
            }
            _ = tokio::time::sleep(duration) => {}
        }

        span.finish(None);
        Ok(StateResult {
            data: data.current.clone(),
            next_state: state.transition.next_state.clone(),
            error: None,
        })
    }
}
