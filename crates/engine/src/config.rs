//! Engine construction.
//!
//! The builder registers the built-in activities, then any custom ones,
//! and produces an [`Engine`]. Configuration is pure: building twice
//! yields two independent engines with their own registries.

use std::sync::Arc;

use waypoint_activities::builtin::{
    HtmlUnescapeActivity, HttpRequestActivity, JqTransformActivity, JweEncryptActivity, names,
};
use waypoint_activities::{Activity, ActivityRegistry, RegistryError};

use crate::engine::Engine;
use crate::telemetry::Telemetry;

/// Builder for a workflow [`Engine`].
///
/// ```
/// use waypoint_engine::EngineBuilder;
///
/// let engine = EngineBuilder::new().with_debug(true).build().expect("build engine");
/// assert!(engine.registry().is_registered("HttpRequest"));
/// ```
#[derive(Default)]
pub struct EngineBuilder {
    debug_enabled: bool,
    telemetry_enabled: bool,
    custom_activities: Vec<(String, Arc<dyn Activity>)>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a per-execution debug trace of states and actions.
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_enabled = enabled;
        self
    }

    /// Emit spans and metrics through the globally installed
    /// OpenTelemetry providers.
    pub fn with_telemetry(mut self, enabled: bool) -> Self {
        self.telemetry_enabled = enabled;
        self
    }

    /// Register a custom activity alongside the built-ins.
    pub fn with_activity(mut self, name: impl Into<String>, activity: Arc<dyn Activity>) -> Self {
        self.custom_activities.push((name.into(), activity));
        self
    }

    /// Build the engine, registering built-in and custom activities.
    pub fn build(self) -> Result<Engine, RegistryError> {
        let registry = Arc::new(ActivityRegistry::new());

        registry.register(names::HTTP_REQUEST, Arc::new(HttpRequestActivity::new()))?;
        registry.register(names::JQ_TRANSFORM, Arc::new(JqTransformActivity::new()))?;
        registry.register(names::HTML_UNESCAPE, Arc::new(HtmlUnescapeActivity::new()))?;
        registry.register(names::JWE_ENCRYPT, Arc::new(JweEncryptActivity::new()))?;

        for (name, activity) in self.custom_activities {
            registry.register(name, activity)?;
        }

        let telemetry = self.telemetry_enabled.then(Telemetry::new);
        Ok(Engine::new(registry, self.debug_enabled, telemetry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_registers_builtin_activities() {
        let engine = EngineBuilder::new().build().expect("build engine");
        let registry = engine.registry();
        for name in [
            names::HTTP_REQUEST,
            names::JQ_TRANSFORM,
            names::HTML_UNESCAPE,
            names::JWE_ENCRYPT,
        ] {
            assert!(registry.is_registered(name), "missing builtin '{name}'");
        }
    }

    #[test]
    fn custom_activity_clashing_with_builtin_fails() {
        let error = EngineBuilder::new()
            .with_activity(names::HTTP_REQUEST, Arc::new(HttpRequestActivity::new()))
            .build()
            .expect_err("should reject duplicate name");
        assert!(matches!(error, RegistryError::Duplicate(_)));
    }
}
