//! Invocation-scoped context handed to every activity execution.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Metadata about the currently executing activity.
///
/// The registry attaches this record to the context right before
/// dispatch, so an activity body can read its own registered name
/// without a back-reference to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityInfo {
    /// Name the activity was registered under.
    pub activity_name: String,
}

/// Context threaded through a single activity invocation.
///
/// Carries the caller's cancellation token and, once the registry wrapper
/// has run, the [`ActivityInfo`] for the invocation.
#[derive(Debug, Clone, Default)]
pub struct ActivityContext {
    cancellation: CancellationToken,
    info: Option<Arc<ActivityInfo>>,
}

impl ActivityContext {
    pub fn new(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            info: None,
        }
    }

    /// Cancellation token activities must observe during blocking work.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Metadata for the current invocation.
    ///
    /// Outside a registry dispatch the record is absent and a placeholder
    /// with the name `"unknown"` is returned instead.
    pub fn info(&self) -> ActivityInfo {
        self.info
            .as_deref()
            .cloned()
            .unwrap_or_else(|| ActivityInfo {
                activity_name: "unknown".to_string(),
            })
    }

    /// Whether the registry has attached invocation metadata.
    pub fn has_info(&self) -> bool {
        self.info.is_some()
    }

    pub(crate) fn with_info(&self, info: ActivityInfo) -> Self {
        Self {
            cancellation: self.cancellation.clone(),
            info: Some(Arc::new(info)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_defaults_to_unknown_outside_dispatch() {
        let context = ActivityContext::default();
        assert!(!context.has_info());
        assert_eq!(context.info().activity_name, "unknown");
    }

    #[test]
    fn with_info_attaches_metadata() {
        let context = ActivityContext::default().with_info(ActivityInfo {
            activity_name: "Echo".into(),
        });
        assert!(context.has_info());
        assert_eq!(context.info().activity_name, "Echo");
    }
}
