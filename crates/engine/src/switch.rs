//! Switch states: data-driven condition evaluation.

use opentelemetry::Context as OtelContext;
use serde_json::Value;
use tracing::{debug, error};

use waypoint_types::{DataCondition, SwitchState};
use waypoint_util::expression::{Expression, extract_template, is_template};

use crate::data::WorkflowData;
use crate::debug::StateExecution;
use crate::engine::Engine;
use crate::errors::{EngineErrorCode, StateError, WorkflowError};
use crate::state::StateResult;

impl Engine {
    pub(crate) fn execute_switch_state(
        &self,
        parent_cx: &OtelContext,
        state: &SwitchState,
        data: &WorkflowData,
        record: &mut Option<StateExecution>,
    ) -> Result<StateResult, StateError> {
        if !state.data_conditions.is_empty() {
            return self.execute_data_switch(parent_cx, state, data, record);
        }

        if !state.event_conditions.is_empty() {
            return Err(WorkflowError::new(
                EngineErrorCode::StateInvalid,
                "event-based switch conditions are not implemented",
            )
            .with_state(&state.name)
            .into());
        }

        Err(WorkflowError::new(
            EngineErrorCode::StateInvalid,
            "switch state must declare either data conditions or event conditions",
        )
        .with_state(&state.name)
        .into())
    }

    /// Evaluate conditions in declared order against the full data tree;
    /// the first one yielding `true` decides the transition.
    fn execute_data_switch(
        &self,
        parent_cx: &OtelContext,
        state: &SwitchState,
        data: &WorkflowData,
        record: &mut Option<StateExecution>,
    ) -> Result<StateResult, StateError> {
        // conditions see every slot of the workflow data, not just `current`
        let tree = data.to_value();

        for condition in &state.data_conditions {
            let span = self.span(parent_cx, |telemetry, cx| {
                telemetry.start_switch_condition_span(cx, &state.name, &condition.name, &condition.condition)
            });

            match evaluate_condition(&state.name, condition, &tree) {
                Ok(true) => {
                    span.finish(None);
                    debug!(
                        state_name = %state.name,
                        condition = %condition.name,
                        next_state = %condition.transition.next_state,
                        "condition matched"
                    );
                    if let Some(record) = record {
                        record.matched_condition = Some(condition.name.clone());
                    }
                    return Ok(StateResult {
                        data: data.current.clone(),
                        next_state: condition.transition.next_state.clone(),
                        error: None,
                    });
                }
                Ok(false) => span.finish(None),
                Err(workflow_error) => {
                    span.finish(Some(&workflow_error.to_string()));
                    error!(
                        state_name = %state.name,
                        condition = %condition.condition,
                        error = %workflow_error,
                        "condition evaluation failed"
                    );
                    return Err(workflow_error.into());
                }
            }
        }

        let default_span = self.span(parent_cx, |telemetry, cx| {
            telemetry.start_switch_default_span(cx, &state.name)
        });
        default_span.finish(None);
        debug!(state_name = %state.name, "no condition matched, taking default transition");
        if let Some(record) = record {
            record.matched_condition = Some("default".to_string());
        }
        Ok(StateResult {
            data: data.current.clone(),
            next_state: state.default_condition.transition.next_state.clone(),
            error: None,
        })
    }
}

fn evaluate_condition(state_name: &str, condition: &DataCondition, tree: &Value) -> Result<bool, WorkflowError> {
    // conditions may be authored bare or wrapped in the template syntax
    let source = if is_template(condition.condition.trim()) {
        extract_template(condition.condition.trim()).unwrap_or_default()
    } else {
        condition.condition.trim()
    };

    let expression = Expression::parse(source).map_err(|parse_error| {
        WorkflowError::new(
            EngineErrorCode::ExpressionInvalid,
            format!("failed to parse condition '{}'", condition.condition),
        )
        .with_state(state_name)
        .with_expression(&condition.condition)
        .with_cause(parse_error)
    })?;

    let results = expression.evaluate(tree).map_err(|eval_error| {
        WorkflowError::new(
            EngineErrorCode::ExpressionEvalFailed,
            format!("failed to evaluate condition '{}'", condition.condition),
        )
        .with_state(state_name)
        .with_expression(&condition.condition)
        .with_cause(eval_error)
    })?;

    let Some(first) = results.into_iter().next() else {
        return Err(WorkflowError::new(
            EngineErrorCode::ExpressionEvalFailed,
            format!("no result from condition '{}'", condition.condition),
        )
        .with_state(state_name)
        .with_expression(&condition.condition));
    };

    match first {
        Value::Bool(matched) => Ok(matched),
        other => Err(WorkflowError::new(
            EngineErrorCode::ExpressionEvalFailed,
            format!(
                "condition '{}' did not evaluate to a boolean, got {}",
                condition.condition,
                value_kind(&other)
            ),
        )
        .with_state(state_name)
        .with_expression(&condition.condition)),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use waypoint_types::Transition;

    fn condition(name: &str, expression: &str, next_state: &str) -> DataCondition {
        DataCondition {
            name: name.into(),
            condition: expression.into(),
            transition: Transition {
                next_state: next_state.into(),
            },
        }
    }

    #[test]
    fn bare_and_wrapped_conditions_both_evaluate() {
        let tree = json!({"initial": {"x": 1}, "current": {"x": 1}, "states": {}, "globals": {}});
        let bare = condition("bare", ".current.x == 1", "Next");
        let wrapped = condition("wrapped", "${ .current.x == 1 }", "Next");

        assert!(evaluate_condition("S", &bare, &tree).expect("evaluate bare"));
        assert!(evaluate_condition("S", &wrapped, &tree).expect("evaluate wrapped"));
    }

    #[test]
    fn non_boolean_result_is_an_eval_failure() {
        let tree = json!({"current": {"x": 1}});
        let bad = condition("bad", ".current.x", "Next");

        let error = evaluate_condition("S", &bad, &tree).expect_err("should require boolean");
        assert_eq!(error.code, EngineErrorCode::ExpressionEvalFailed);
        assert!(
            error.to_string().contains("did not evaluate to a boolean"),
            "unexpected error: {error}"
        );
    }

    #[test]
    fn unparsable_condition_is_invalid() {
        let tree = json!({});
        let bad = condition("bad", ".x ==", "Next");

        let error = evaluate_condition("S", &bad, &tree).expect_err("should fail to parse");
        assert_eq!(error.code, EngineErrorCode::ExpressionInvalid);
    }
}
