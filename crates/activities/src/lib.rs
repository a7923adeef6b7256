//! Activity capability set and registry.
//!
//! An activity is a named, pluggable unit of work: it receives a
//! string-keyed argument map and returns an arbitrary JSON value or an
//! [`ActivityError`]. Activities are registered once at engine
//! construction and looked up by name for every action the state
//! interpreter executes.
//!
//! - `registry` owns the name → activity table and the per-invocation
//!   metadata injection
//! - `bundle` groups several activities for one-shot registration
//! - `builtin` ships the stock HTTP / transform / HTML / JWE activities

pub mod args;
pub mod builtin;
pub mod bundle;
pub mod context;
pub mod errors;
pub mod registry;

use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value};

pub use bundle::ActivityBundle;
pub use context::{ActivityContext, ActivityInfo};
pub use errors::{ActivityError, ActivityErrorCode};
pub use registry::{ActivityRegistry, RegisteredActivity, RegistryError};

/// A pluggable unit of work executed by operation states.
///
/// Implementations receive the invocation context (cancellation token plus
/// the metadata the registry attaches) and the fully resolved argument
/// map. Returning an [`ActivityError`] preserves the error code for
/// declarative `onErrors` routing; any other error is wrapped by the
/// engine as `EXECUTION_FAILED`.
///
/// Activities are contractually required to observe the context's
/// cancellation token across long-running work such as network calls.
#[async_trait]
pub trait Activity: Send + Sync {
    async fn execute(
        &self,
        context: &ActivityContext,
        arguments: &JsonMap<String, Value>,
    ) -> Result<Value, anyhow::Error>;
}
