//! Grouped activity registration.
//!
//! Rust has no runtime reflection, so the reflective struct registration
//! of other workflow runtimes becomes an explicit builder: callers name
//! each method they want exposed and hand over the implementation. The
//! registry applies the same naming rules to bundle methods as to single
//! registrations, skipping offenders with a warning.

use std::sync::Arc;

use crate::Activity;

/// A named group of activities registered in one call.
///
/// ```
/// # use waypoint_activities::{ActivityBundle, Activity, ActivityContext};
/// # use async_trait::async_trait;
/// # use serde_json::{Map, Value};
/// # struct Reverse;
/// # #[async_trait]
/// # impl Activity for Reverse {
/// #     async fn execute(&self, _: &ActivityContext, _: &Map<String, Value>) -> Result<Value, anyhow::Error> {
/// #         Ok(Value::Null)
/// #     }
/// # }
/// let bundle = ActivityBundle::new("Strings").method("Reverse", Reverse);
/// assert_eq!(bundle.len(), 1);
/// ```
pub struct ActivityBundle {
    name: String,
    methods: Vec<(String, Arc<dyn Activity>)>,
}

impl ActivityBundle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Add a method to the bundle under the given activity name.
    pub fn method(mut self, name: impl Into<String>, activity: impl Activity + 'static) -> Self {
        self.methods.push((name.into(), Arc::new(activity)));
        self
    }

    /// Bundle name used in registration diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub(crate) fn into_methods(self) -> Vec<(String, Arc<dyn Activity>)> {
        self.methods
    }
}
