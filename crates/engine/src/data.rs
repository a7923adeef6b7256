//! Mutable data state threaded through a workflow execution.

use serde_json::{Map as JsonMap, Value, json};

/// The evolving value tree a single execution operates on.
///
/// One instance is created per `execute` call and threaded through every
/// state. The slots have fixed meaning:
///
/// - `initial` — the original input, set once and never mutated
/// - `current` — the value produced by the most recent completed action
///   or state; the default "data at hand" for expressions
/// - `states` — output of each completed state, keyed by state name
/// - `globals` — caller-supplied values the engine never mutates
#[derive(Debug, Clone)]
pub struct WorkflowData {
    pub initial: Value,
    pub current: Value,
    pub states: JsonMap<String, Value>,
    pub globals: JsonMap<String, Value>,
}

impl WorkflowData {
    pub fn new(input: Value, globals: Option<JsonMap<String, Value>>) -> Self {
        Self {
            initial: input.clone(),
            current: input,
            states: JsonMap::new(),
            globals: globals.unwrap_or_default(),
        }
    }

    /// The full data tree expressions evaluate against.
    pub fn to_value(&self) -> Value {
        json!({
            "initial": self.initial,
            "current": self.current,
            "states": self.states,
            "globals": self.globals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_initial_and_current_to_the_input() {
        let data = WorkflowData::new(json!({"message": "hi"}), None);
        assert_eq!(data.initial, json!({"message": "hi"}));
        assert_eq!(data.current, data.initial);
        assert!(data.states.is_empty());
        assert!(data.globals.is_empty());
    }

    #[test]
    fn to_value_exposes_all_four_slots() {
        let mut data = WorkflowData::new(json!(1), None);
        data.current = json!(2);
        data.states.insert("S1".into(), json!(2));

        let tree = data.to_value();
        assert_eq!(tree["initial"], json!(1));
        assert_eq!(tree["current"], json!(2));
        assert_eq!(tree["states"]["S1"], json!(2));
        assert_eq!(tree["globals"], json!({}));
    }
}
