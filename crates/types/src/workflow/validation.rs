//! Structural validation for parsed workflow documents.
//!
//! These checks run once at load time so the engine can assume a
//! well-formed graph: unique state names, a resolvable start pointer,
//! and transitions that only name states defined in the document.
//! Activity references are validated separately by the document loader,
//! which has access to the registry.

use anyhow::{Result, bail};
use indexmap::IndexMap;

use super::{State, Workflow};

/// Validate the structure of a workflow document.
///
/// Returns the first violation found; the engine refuses to execute a
/// document that has not passed this check when loaded through the
/// document loader.
pub fn validate_workflow(workflow: &Workflow) -> Result<()> {
    if workflow.id.trim().is_empty() {
        bail!("workflow is missing the required 'id' field");
    }

    let Some(start) = &workflow.start else {
        bail!("workflow '{}' must declare a start state", workflow.id);
    };

    if workflow.states.is_empty() {
        bail!("workflow '{}' must declare at least one state", workflow.id);
    }

    let mut states: IndexMap<&str, &State> = IndexMap::new();
    for state in &workflow.states {
        if state.name().trim().is_empty() {
            bail!("workflow '{}' contains a state with an empty name", workflow.id);
        }
        if states.insert(state.name(), state).is_some() {
            bail!("duplicate state name detected: '{}'", state.name());
        }
    }

    if !states.contains_key(start.state_name.as_str()) {
        bail!("start state '{}' is not defined", start.state_name);
    }

    for state in &workflow.states {
        validate_state(state, &states)?;
    }

    Ok(())
}

fn validate_state(state: &State, states: &IndexMap<&str, &State>) -> Result<()> {
    match state {
        State::Operation(operation) => {
            for (index, action) in operation.actions.iter().enumerate() {
                if action.function_ref.ref_name.trim().is_empty() {
                    bail!(
                        "state '{}' action #{} is missing a function reference name",
                        operation.name,
                        index + 1
                    );
                }
            }
            if let Some(transition) = &operation.transition {
                validate_transition_target(&operation.name, &transition.next_state, states)?;
            }
            for handler in &operation.on_errors {
                if handler.error_ref.trim().is_empty() {
                    bail!("state '{}' has an error handler with an empty error reference", operation.name);
                }
                validate_transition_target(&operation.name, &handler.transition.next_state, states)?;
            }
        }
        State::Switch(switch) => {
            if switch.data_conditions.is_empty() && switch.event_conditions.is_empty() {
                bail!(
                    "switch state '{}' must declare either data conditions or event conditions",
                    switch.name
                );
            }
            for condition in &switch.data_conditions {
                if condition.condition.trim().is_empty() {
                    bail!("switch state '{}' has a condition with an empty expression", switch.name);
                }
                validate_transition_target(&switch.name, &condition.transition.next_state, states)?;
            }
            for condition in &switch.event_conditions {
                validate_transition_target(&switch.name, &condition.transition.next_state, states)?;
            }
            validate_transition_target(&switch.name, &switch.default_condition.transition.next_state, states)?;
        }
        State::Sleep(sleep) => {
            if sleep.duration.trim().is_empty() {
                bail!("sleep state '{}' is missing a duration", sleep.name);
            }
            validate_transition_target(&sleep.name, &sleep.transition.next_state, states)?;
        }
    }

    Ok(())
}

/// An empty target marks a terminal state; anything else must resolve.
fn validate_transition_target(state_name: &str, target: &str, states: &IndexMap<&str, &State>) -> Result<()> {
    if !target.is_empty() && !states.contains_key(target) {
        bail!("state '{}' transitions to unknown state '{}'", state_name, target);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{
        DataCondition, DefaultCondition, OperationState, SleepState, Start, SwitchState, Transition,
    };

    fn operation(name: &str, next_state: &str) -> State {
        State::Operation(OperationState {
            name: name.into(),
            actions: Vec::new(),
            transition: Some(Transition {
                next_state: next_state.into(),
            }),
            on_errors: Vec::new(),
        })
    }

    fn workflow_with_states(states: Vec<State>) -> Workflow {
        Workflow {
            id: "demo".into(),
            start: Some(Start {
                state_name: states.first().map(|state| state.name().to_string()).unwrap_or_default(),
            }),
            states,
            ..Workflow::default()
        }
    }

    #[test]
    fn accepts_linear_workflow() {
        let workflow = workflow_with_states(vec![operation("first", "second"), operation("second", "")]);
        assert!(validate_workflow(&workflow).is_ok());
    }

    #[test]
    fn rejects_missing_start() {
        let mut workflow = workflow_with_states(vec![operation("only", "")]);
        workflow.start = None;

        let error = validate_workflow(&workflow).expect_err("should require a start state");
        assert!(error.to_string().contains("start state"), "unexpected error: {error}");
    }

    #[test]
    fn rejects_duplicate_state_names() {
        let workflow = workflow_with_states(vec![operation("twice", ""), operation("twice", "")]);

        let error = validate_workflow(&workflow).expect_err("should detect duplicate");
        assert!(error.to_string().contains("duplicate state name"), "unexpected error: {error}");
    }

    #[test]
    fn rejects_dangling_transition() {
        let workflow = workflow_with_states(vec![operation("first", "missing")]);

        let error = validate_workflow(&workflow).expect_err("should detect dangling transition");
        assert!(
            error.to_string().contains("unknown state 'missing'"),
            "unexpected error: {error}"
        );
    }

    #[test]
    fn rejects_switch_without_conditions() {
        let workflow = workflow_with_states(vec![State::Switch(SwitchState {
            name: "gate".into(),
            data_conditions: Vec::new(),
            event_conditions: Vec::new(),
            default_condition: DefaultCondition {
                transition: Transition { next_state: "".into() },
            },
        })]);

        let error = validate_workflow(&workflow).expect_err("should require conditions");
        assert!(
            error.to_string().contains("data conditions or event conditions"),
            "unexpected error: {error}"
        );
    }

    #[test]
    fn rejects_condition_with_empty_expression() {
        let workflow = workflow_with_states(vec![State::Switch(SwitchState {
            name: "gate".into(),
            data_conditions: vec![DataCondition {
                name: "blank".into(),
                condition: "  ".into(),
                transition: Transition { next_state: "".into() },
            }],
            event_conditions: Vec::new(),
            default_condition: DefaultCondition {
                transition: Transition { next_state: "".into() },
            },
        })]);

        let error = validate_workflow(&workflow).expect_err("should reject blank expression");
        assert!(error.to_string().contains("empty expression"), "unexpected error: {error}");
    }

    #[test]
    fn rejects_sleep_without_duration() {
        let workflow = workflow_with_states(vec![State::Sleep(SleepState {
            name: "pause".into(),
            duration: "".into(),
            transition: Transition { next_state: "".into() },
        })]);

        let error = validate_workflow(&workflow).expect_err("should require a duration");
        assert!(error.to_string().contains("missing a duration"), "unexpected error: {error}");
    }
}
