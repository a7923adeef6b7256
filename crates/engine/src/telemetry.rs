//! Span and metric emission for workflow execution.
//!
//! The engine holds an optional [`Telemetry`] handle; when absent, every
//! call site is a no-op and execution behaves identically modulo the
//! missing spans and samples. Span parentage follows the
//! [`opentelemetry::Context`] values threaded through the interpreter,
//! mirroring how the state loop itself nests.

use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry::trace::{Status, TraceContextExt, Tracer};
use opentelemetry::{Context as OtelContext, KeyValue, global};

const INSTRUMENTATION_NAME: &str = "waypoint";

/// Tracer and metric instruments used across one engine instance.
pub struct Telemetry {
    tracer: global::BoxedTracer,
    workflow_duration: Histogram<f64>,
    activity_duration: Histogram<f64>,
    workflow_errors: Counter<u64>,
    activity_errors: Counter<u64>,
    workflow_states: Counter<u64>,
    workflow_activities: Counter<u64>,
}

impl Telemetry {
    /// Build instruments against the globally installed providers.
    pub fn new() -> Self {
        let meter = global::meter(INSTRUMENTATION_NAME);
        Self {
            tracer: global::tracer(INSTRUMENTATION_NAME),
            workflow_duration: meter
                .f64_histogram("workflow.duration")
                .with_description("Duration of workflow executions")
                .with_unit("s")
                .build(),
            activity_duration: meter
                .f64_histogram("activity.duration")
                .with_description("Duration of activity executions")
                .with_unit("s")
                .build(),
            workflow_errors: meter
                .u64_counter("workflow.errors")
                .with_description("Number of workflow errors")
                .build(),
            activity_errors: meter
                .u64_counter("activity.errors")
                .with_description("Number of activity errors")
                .build(),
            workflow_states: meter
                .u64_counter("workflow.states")
                .with_description("Number of workflow states executed")
                .build(),
            workflow_activities: meter
                .u64_counter("workflow.activities")
                .with_description("Number of workflow activities executed")
                .build(),
        }
    }

    fn start_span(&self, parent: &OtelContext, name: &'static str, attributes: Vec<KeyValue>) -> OtelContext {
        let span = self
            .tracer
            .span_builder(name)
            .with_attributes(attributes)
            .start_with_context(&self.tracer, parent);
        parent.with_span(span)
    }

    pub fn start_workflow_span(&self, parent: &OtelContext, workflow_id: &str) -> OtelContext {
        self.start_span(
            parent,
            "workflow.execute",
            vec![KeyValue::new("workflow.id", workflow_id.to_string())],
        )
    }

    pub fn start_state_span(&self, parent: &OtelContext, state_name: &str, state_type: &str) -> OtelContext {
        self.start_span(
            parent,
            "workflow.state",
            vec![
                KeyValue::new("state.name", state_name.to_string()),
                KeyValue::new("state.type", state_type.to_string()),
            ],
        )
    }

    pub fn start_action_group_span(&self, parent: &OtelContext, state_name: &str, action_count: usize) -> OtelContext {
        self.start_span(
            parent,
            "workflow.operation.actions",
            vec![
                KeyValue::new("state.name", state_name.to_string()),
                KeyValue::new("action.count", action_count as i64),
            ],
        )
    }

    pub fn start_activity_span(&self, parent: &OtelContext, activity_name: &str) -> OtelContext {
        self.start_span(
            parent,
            "workflow.activity",
            vec![KeyValue::new("activity.name", activity_name.to_string())],
        )
    }

    pub fn start_activity_lookup_span(&self, parent: &OtelContext, activity_name: &str) -> OtelContext {
        self.start_span(
            parent,
            "workflow.activity.lookup",
            vec![KeyValue::new("activity.name", activity_name.to_string())],
        )
    }

    pub fn start_activity_args_span(&self, parent: &OtelContext, activity_name: &str) -> OtelContext {
        self.start_span(
            parent,
            "workflow.activity.args",
            vec![KeyValue::new("activity.name", activity_name.to_string())],
        )
    }

    pub fn start_activity_execution_span(&self, parent: &OtelContext, activity_name: &str) -> OtelContext {
        self.start_span(
            parent,
            "workflow.activity.execution",
            vec![KeyValue::new("activity.name", activity_name.to_string())],
        )
    }

    pub fn start_switch_condition_span(
        &self,
        parent: &OtelContext,
        state_name: &str,
        condition_name: &str,
        expression: &str,
    ) -> OtelContext {
        self.start_span(
            parent,
            "workflow.switch.condition",
            vec![
                KeyValue::new("state.name", state_name.to_string()),
                KeyValue::new("condition.name", condition_name.to_string()),
                KeyValue::new("condition.expression", expression.to_string()),
            ],
        )
    }

    pub fn start_switch_default_span(&self, parent: &OtelContext, state_name: &str) -> OtelContext {
        self.start_span(
            parent,
            "workflow.switch.default",
            vec![KeyValue::new("state.name", state_name.to_string())],
        )
    }

    pub fn start_sleep_span(&self, parent: &OtelContext, state_name: &str, duration: &str) -> OtelContext {
        self.start_span(
            parent,
            "workflow.sleep",
            vec![
                KeyValue::new("state.name", state_name.to_string()),
                KeyValue::new("sleep.duration", duration.to_string()),
            ],
        )
    }

    pub fn start_error_handling_span(
        &self,
        parent: &OtelContext,
        state_name: &str,
        error_type: &str,
        error_message: &str,
        handler_action: &str,
    ) -> OtelContext {
        self.start_span(
            parent,
            "workflow.error.handling",
            vec![
                KeyValue::new("state.name", state_name.to_string()),
                KeyValue::new("error.type", error_type.to_string()),
                KeyValue::new("error.string", error_message.to_string()),
                KeyValue::new("handler.action", handler_action.to_string()),
            ],
        )
    }

    pub fn record_workflow_duration(&self, seconds: f64, workflow_id: &str) {
        self.workflow_duration
            .record(seconds, &[KeyValue::new("workflow.id", workflow_id.to_string())]);
    }

    pub fn record_activity_duration(&self, seconds: f64, activity_name: &str) {
        self.activity_duration
            .record(seconds, &[KeyValue::new("activity.name", activity_name.to_string())]);
    }

    pub fn record_workflow_error(&self, workflow_id: &str, error_code: &str) {
        self.workflow_errors.add(
            1,
            &[
                KeyValue::new("workflow.id", workflow_id.to_string()),
                KeyValue::new("error.code", error_code.to_string()),
            ],
        );
    }

    pub fn record_activity_error(&self, activity_name: &str, error_code: &str) {
        self.activity_errors.add(
            1,
            &[
                KeyValue::new("activity.name", activity_name.to_string()),
                KeyValue::new("error.code", error_code.to_string()),
            ],
        );
    }

    pub fn record_state(&self, state_name: &str, state_type: &str) {
        self.workflow_states.add(
            1,
            &[
                KeyValue::new("state.name", state_name.to_string()),
                KeyValue::new("state.type", state_type.to_string()),
            ],
        );
    }

    pub fn record_activity(&self, activity_name: &str) {
        self.workflow_activities
            .add(1, &[KeyValue::new("activity.name", activity_name.to_string())]);
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

/// A span opened at one of the engine's emission points.
///
/// When telemetry is disabled the scope is a pass-through over the parent
/// context: children still nest correctly and `finish` never touches a
/// span the engine does not own.
pub(crate) struct SpanScope {
    context: OtelContext,
    owned: bool,
}

impl SpanScope {
    pub(crate) fn noop(parent: &OtelContext) -> Self {
        Self {
            context: parent.clone(),
            owned: false,
        }
    }

    pub(crate) fn owned(context: OtelContext) -> Self {
        Self { context, owned: true }
    }

    /// Context to parent child spans under.
    pub(crate) fn context(&self) -> &OtelContext {
        &self.context
    }

    /// Record the outcome and close the span, if one was opened.
    pub(crate) fn finish(&self, error: Option<&str>) {
        if !self.owned {
            return;
        }
        let span = self.context.span();
        match error {
            Some(message) => span.set_status(Status::error(message.to_string())),
            None => span.set_status(Status::Ok),
        }
        span.end();
    }
}
