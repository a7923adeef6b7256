//! # Activity Registry
//!
//! Thread-safe name → activity table. Registration wraps each activity so
//! that every invocation attaches an [`ActivityInfo`] record to the
//! context before dispatch; execution then only ever sees the wrapper.
//!
//! The registry is populated once at engine construction and is
//! effectively read-only afterwards, but all mutations hold the table
//! lock so concurrent registration stays consistent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Map as JsonMap, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::bundle::ActivityBundle;
use crate::context::{ActivityContext, ActivityInfo};
use crate::Activity;

/// Failure while registering activities.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("activity '{0}' is already registered")]
    Duplicate(String),

    #[error("activity name '{0}' is invalid: {1}")]
    InvalidName(String, &'static str),

    #[error("bundle '{0}' produced no registrable activities")]
    EmptyBundle(String),
}

/// An activity bound to its registered name.
///
/// Produced by registration; dispatching through it injects the
/// invocation metadata so the activity body can read its own name via
/// [`ActivityContext::info`].
pub struct RegisteredActivity {
    name: String,
    activity: Arc<dyn Activity>,
}

impl RegisteredActivity {
    /// Name the activity was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute the activity with invocation metadata attached.
    pub async fn execute(
        &self,
        context: &ActivityContext,
        arguments: &JsonMap<String, Value>,
    ) -> Result<Value, anyhow::Error> {
        let context = context.with_info(ActivityInfo {
            activity_name: self.name.clone(),
        });
        self.activity.execute(&context, arguments).await
    }
}

/// Thread-safe mapping of activity names to their implementations.
#[derive(Default)]
pub struct ActivityRegistry {
    activities: Mutex<HashMap<String, Arc<RegisteredActivity>>>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single activity under a unique name.
    ///
    /// Fails when the name violates the naming rules or is already bound;
    /// the first registration stays observable in either case.
    pub fn register(
        &self,
        name: impl Into<String>,
        activity: Arc<dyn Activity>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        validate_activity_name(&name)?;

        let mut activities = self.activities.lock().expect("registry lock");
        if activities.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        debug!(activity_name = %name, "activity registered");
        activities.insert(
            name.clone(),
            Arc::new(RegisteredActivity { name, activity }),
        );
        Ok(())
    }

    /// Register every method of a bundle.
    ///
    /// Methods with invalid names, or names already bound in the registry,
    /// are skipped with a warning; the rest register as usual. A bundle
    /// that contributes nothing is an error.
    pub fn register_bundle(&self, bundle: ActivityBundle) -> Result<usize, RegistryError> {
        let bundle_name = bundle.name().to_string();
        let mut registered = 0usize;

        for (method_name, activity) in bundle.into_methods() {
            if let Err(error) = validate_activity_name(&method_name) {
                warn!(bundle = %bundle_name, method = %method_name, %error, "skipping bundle method");
                continue;
            }
            match self.register(method_name.clone(), activity) {
                Ok(()) => registered += 1,
                Err(error) => {
                    warn!(bundle = %bundle_name, method = %method_name, %error, "skipping bundle method");
                }
            }
        }

        if registered == 0 {
            return Err(RegistryError::EmptyBundle(bundle_name));
        }

        debug!(bundle = %bundle_name, registered, "bundle registered");
        Ok(registered)
    }

    /// Look up an activity by name.
    pub fn get(&self, name: &str) -> Option<Arc<RegisteredActivity>> {
        self.activities.lock().expect("registry lock").get(name).cloned()
    }

    /// Whether a name is currently bound.
    pub fn is_registered(&self, name: &str) -> bool {
        self.activities.lock().expect("registry lock").contains_key(name)
    }

    /// Number of registered activities.
    pub fn len(&self) -> usize {
        self.activities.lock().expect("registry lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered names, for diagnostics and document validation errors.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .activities
            .lock()
            .expect("registry lock")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// Naming rules shared by single and bundle registration.
///
/// Names must be non-empty and free of whitespace so they can appear
/// verbatim in workflow documents, log fields, and span attributes.
fn validate_activity_name(name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::InvalidName(name.to_string(), "name cannot be empty"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(RegistryError::InvalidName(
            name.to_string(),
            "name cannot contain whitespace",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ActivityError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    struct EchoActivity;

    #[async_trait]
    impl Activity for EchoActivity {
        async fn execute(
            &self,
            _context: &ActivityContext,
            arguments: &JsonMap<String, Value>,
        ) -> Result<Value, anyhow::Error> {
            Ok(arguments.get("message").cloned().unwrap_or(Value::Null))
        }
    }

    /// Captures the invocation info it observed, for metadata assertions.
    struct ProbeActivity {
        seen: StdMutex<Option<ActivityInfo>>,
    }

    #[async_trait]
    impl Activity for ProbeActivity {
        async fn execute(
            &self,
            context: &ActivityContext,
            _arguments: &JsonMap<String, Value>,
        ) -> Result<Value, anyhow::Error> {
            *self.seen.lock().expect("probe lock") = Some(context.info());
            Ok(json!("probed"))
        }
    }

    struct FailingActivity;

    #[async_trait]
    impl Activity for FailingActivity {
        async fn execute(
            &self,
            context: &ActivityContext,
            _arguments: &JsonMap<String, Value>,
        ) -> Result<Value, anyhow::Error> {
            Err(ActivityError::new(
                crate::ActivityErrorCode::ExecutionFailed,
                "always fails",
                context.info().activity_name,
            )
            .into())
        }
    }

    #[tokio::test]
    async fn registered_activity_is_resolvable_and_executes() {
        let registry = ActivityRegistry::new();
        registry.register("Echo", Arc::new(EchoActivity)).expect("register");

        let activity = registry.get("Echo").expect("lookup");
        assert_eq!(activity.name(), "Echo");

        let mut arguments = JsonMap::new();
        arguments.insert("message".into(), json!("hi"));
        let result = activity
            .execute(&ActivityContext::default(), &arguments)
            .await
            .expect("execute");
        assert_eq!(result, json!("hi"));
    }

    #[test]
    fn duplicate_registration_fails_and_first_wins() {
        let registry = ActivityRegistry::new();
        registry.register("Echo", Arc::new(EchoActivity)).expect("first registration");

        let error = registry
            .register("Echo", Arc::new(FailingActivity))
            .expect_err("second registration should fail");
        assert!(matches!(error, RegistryError::Duplicate(name) if name == "Echo"));
        assert!(registry.is_registered("Echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn rejects_invalid_names() {
        let registry = ActivityRegistry::new();
        assert!(matches!(
            registry.register("", Arc::new(EchoActivity)),
            Err(RegistryError::InvalidName(_, _))
        ));
        assert!(matches!(
            registry.register("has space", Arc::new(EchoActivity)),
            Err(RegistryError::InvalidName(_, _))
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn dispatch_injects_activity_info() {
        let registry = ActivityRegistry::new();
        let probe = Arc::new(ProbeActivity {
            seen: StdMutex::new(None),
        });
        registry.register("Probe", probe.clone()).expect("register");

        registry
            .get("Probe")
            .expect("lookup")
            .execute(&ActivityContext::default(), &JsonMap::new())
            .await
            .expect("execute");

        let seen = probe.seen.lock().expect("probe lock").clone();
        assert_eq!(
            seen,
            Some(ActivityInfo {
                activity_name: "Probe".into()
            })
        );
    }

    #[test]
    fn bundle_registers_valid_methods_and_skips_invalid_ones() {
        let registry = ActivityRegistry::new();
        let bundle = ActivityBundle::new("Probes")
            .method("First", EchoActivity)
            .method("bad name", EchoActivity)
            .method("Second", EchoActivity);

        let registered = registry.register_bundle(bundle).expect("register bundle");
        assert_eq!(registered, 2);
        assert!(registry.is_registered("First"));
        assert!(registry.is_registered("Second"));
        assert!(!registry.is_registered("bad name"));
    }

    #[test]
    fn bundle_with_no_valid_methods_fails() {
        let registry = ActivityRegistry::new();
        let empty = ActivityBundle::new("Empty");
        assert!(matches!(
            registry.register_bundle(empty),
            Err(RegistryError::EmptyBundle(name)) if name == "Empty"
        ));

        let all_invalid = ActivityBundle::new("Invalid").method(" ", EchoActivity);
        assert!(matches!(
            registry.register_bundle(all_invalid),
            Err(RegistryError::EmptyBundle(_))
        ));
    }

    #[test]
    fn bundle_method_clashing_with_existing_registration_is_skipped() {
        let registry = ActivityRegistry::new();
        registry.register("Echo", Arc::new(EchoActivity)).expect("register");

        let bundle = ActivityBundle::new("Clashing")
            .method("Echo", FailingActivity)
            .method("Other", EchoActivity);
        let registered = registry.register_bundle(bundle).expect("register bundle");

        assert_eq!(registered, 1);
        assert_eq!(registry.names(), vec!["Echo".to_string(), "Other".to_string()]);
    }
}
