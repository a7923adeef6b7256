//! Workflow document loading and reference validation.
//!
//! The loader parses a JSON document into the shared object model, runs
//! the structural checks, then verifies every activity the workflow
//! references is actually registered. Catching dangling references at
//! load time keeps `ACTIVITY_NOT_FOUND` out of production runs.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use waypoint_activities::ActivityRegistry;
use waypoint_types::{State, Workflow, validate_workflow};

/// Parses and validates workflow documents against a registry.
pub struct DocumentLoader {
    registry: Arc<ActivityRegistry>,
}

impl DocumentLoader {
    pub fn new(registry: Arc<ActivityRegistry>) -> Self {
        Self { registry }
    }

    /// Load a workflow from a JSON file on disk.
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> Result<Workflow> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("read workflow file {}", path.display()))?;
        self.load_from_bytes(&bytes)
    }

    /// Load a workflow from raw JSON bytes.
    pub fn load_from_bytes(&self, bytes: &[u8]) -> Result<Workflow> {
        let workflow: Workflow = serde_json::from_slice(bytes).context("parse workflow document")?;
        validate_workflow(&workflow)?;
        self.validate_activity_references(&workflow)?;
        Ok(workflow)
    }

    fn validate_activity_references(&self, workflow: &Workflow) -> Result<()> {
        let mut referenced: BTreeSet<&str> = BTreeSet::new();
        for state in &workflow.states {
            if let State::Operation(operation) = state {
                for action in &operation.actions {
                    referenced.insert(action.function_ref.ref_name.as_str());
                }
            }
        }

        for activity_name in referenced {
            if !self.registry.is_registered(activity_name) {
                bail!("activity '{activity_name}' is referenced in workflow but not registered");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn loader_with(names: &[&str]) -> DocumentLoader {
        use async_trait::async_trait;
        use serde_json::{Map as JsonMap, Value};
        use waypoint_activities::{Activity, ActivityContext};

        struct Noop;

        #[async_trait]
        impl Activity for Noop {
            async fn execute(
                &self,
                _context: &ActivityContext,
                _arguments: &JsonMap<String, Value>,
            ) -> Result<Value, anyhow::Error> {
                Ok(Value::Null)
            }
        }

        let registry = Arc::new(ActivityRegistry::new());
        for name in names {
            registry.register(*name, Arc::new(Noop)).expect("register");
        }
        DocumentLoader::new(registry)
    }

    fn document(activity: &str) -> Vec<u8> {
        json!({
            "id": "doc-test",
            "start": { "stateName": "Only" },
            "states": [
                {
                    "type": "operation",
                    "name": "Only",
                    "actions": [
                        { "functionRef": { "refName": activity, "arguments": {} } }
                    ]
                }
            ]
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn loads_a_document_with_registered_activities() {
        let loader = loader_with(&["Echo"]);
        let workflow = loader.load_from_bytes(&document("Echo")).expect("load document");
        assert_eq!(workflow.id, "doc-test");
        assert_eq!(workflow.states.len(), 1);
    }

    #[test]
    fn rejects_unregistered_activity_references() {
        let loader = loader_with(&["Echo"]);
        let error = loader
            .load_from_bytes(&document("Missing"))
            .expect_err("should reject unknown activity");
        assert!(
            error.to_string().contains("activity 'Missing' is referenced"),
            "unexpected error: {error}"
        );
    }

    #[test]
    fn rejects_structurally_invalid_documents() {
        let loader = loader_with(&["Echo"]);
        let bytes = json!({"id": "bad", "states": []}).to_string().into_bytes();
        let error = loader.load_from_bytes(&bytes).expect_err("should reject missing start");
        assert!(error.to_string().contains("start state"), "unexpected error: {error}");
    }

    #[test]
    fn rejects_malformed_json() {
        let loader = loader_with(&[]);
        let error = loader.load_from_bytes(b"{not json").expect_err("should reject bad json");
        assert!(
            error.to_string().contains("parse workflow document"),
            "unexpected error: {error}"
        );
    }
}
