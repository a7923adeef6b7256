//! # Waypoint Engine
//!
//! Core execution engine for declarative JSON workflows. A workflow is a
//! directed graph of named states — operations, switches, and sleeps —
//! that transforms an input document through a sequence of registered
//! activities.
//!
//! ```no_run
//! use serde_json::json;
//! use tokio_util::sync::CancellationToken;
//! use waypoint_engine::{DocumentLoader, EngineBuilder};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let engine = EngineBuilder::new().with_debug(true).build()?;
//! let loader = DocumentLoader::new(engine.registry().clone());
//! let workflow = loader.load_from_file("workflow.json")?;
//!
//! let result = engine
//!     .execute(&CancellationToken::new(), &workflow, json!({"message": "hi"}), None)
//!     .await?;
//! println!("{}", result.data);
//! # Ok(())
//! # }
//! ```

mod action;
pub mod config;
pub mod data;
pub mod debug;
pub mod document;
mod engine;
pub mod errors;
mod onerrors;
mod sleep;
mod state;
mod switch;
pub mod telemetry;

pub use config::EngineBuilder;
pub use data::WorkflowData;
pub use debug::{ActionResult, ExecutionDebug, StateExecution};
pub use document::DocumentLoader;
pub use engine::{Engine, ExecutionFailure, ExecutionResult};
pub use errors::{EngineErrorCode, ErrorContext, WorkflowError};
pub use state::StateResult;
pub use telemetry::Telemetry;
