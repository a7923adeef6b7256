//! Declarative error routing for operation states.

use opentelemetry::Context as OtelContext;
use tracing::debug;
use waypoint_activities::ActivityError;
use waypoint_types::{DEFAULT_ERROR_REF, ErrorHandler};

use crate::engine::Engine;

impl Engine {
    /// Match an activity error against a state's ordered handler list.
    ///
    /// First pass matches each non-default `errorRef` as a substring of
    /// the rendered error, which includes the code, message, and activity
    /// name; the second pass falls back to the first `DefaultErrorRef`
    /// handler. Returns the matched handler's transition target, or
    /// `None` when the error should propagate.
    pub(crate) fn handle_state_error(
        &self,
        parent_cx: &OtelContext,
        state_name: &str,
        error: &ActivityError,
        handlers: &[ErrorHandler],
    ) -> Option<String> {
        let rendered = error.to_string();
        let span = self.span(parent_cx, |telemetry, cx| {
            telemetry.start_error_handling_span(cx, state_name, error.code.as_str(), &rendered, "evaluate_handlers")
        });

        let mut matched: Option<String> = None;

        for handler in handlers {
            if handler.error_ref != DEFAULT_ERROR_REF && rendered.contains(&handler.error_ref) {
                debug!(
                    state_name,
                    error_ref = %handler.error_ref,
                    next_state = %handler.transition.next_state,
                    "matched error handler"
                );
                matched = Some(handler.transition.next_state.clone());
                break;
            }
        }

        if matched.is_none() {
            for handler in handlers {
                if handler.error_ref == DEFAULT_ERROR_REF {
                    debug!(
                        state_name,
                        next_state = %handler.transition.next_state,
                        "using default error handler"
                    );
                    matched = Some(handler.transition.next_state.clone());
                    break;
                }
            }
        }

        if matched.is_none() {
            debug!(state_name, "no error handler matched");
        }
        span.finish(None);
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineBuilder;
    use waypoint_activities::ActivityErrorCode;
    use waypoint_types::Transition;

    fn handler(error_ref: &str, next_state: &str) -> ErrorHandler {
        ErrorHandler {
            error_ref: error_ref.into(),
            transition: Transition {
                next_state: next_state.into(),
            },
        }
    }

    fn engine() -> Engine {
        EngineBuilder::new().build().expect("build engine")
    }

    #[test]
    fn specific_reference_wins_over_default() {
        let engine = engine();
        let error = ActivityError::new(ActivityErrorCode::HttpStatusError, "status 502", "HttpRequest");
        let handlers = vec![handler("HTTP_STATUS_ERROR", "Recover"), handler(DEFAULT_ERROR_REF, "Fallback")];

        let matched = engine.handle_state_error(&OtelContext::current(), "S1", &error, &handlers);
        assert_eq!(matched.as_deref(), Some("Recover"));
    }

    #[test]
    fn default_catches_unmatched_codes() {
        let engine = engine();
        let error = ActivityError::new(ActivityErrorCode::HttpRequestFailed, "connection refused", "HttpRequest");
        let handlers = vec![handler("HTTP_STATUS_ERROR", "Recover"), handler(DEFAULT_ERROR_REF, "Fallback")];

        let matched = engine.handle_state_error(&OtelContext::current(), "S1", &error, &handlers);
        assert_eq!(matched.as_deref(), Some("Fallback"));
    }

    #[test]
    fn no_match_without_default_propagates() {
        let engine = engine();
        let error = ActivityError::new(ActivityErrorCode::HttpRequestFailed, "connection refused", "HttpRequest");
        let handlers = vec![handler("HTTP_STATUS_ERROR", "Recover")];

        let matched = engine.handle_state_error(&OtelContext::current(), "S1", &error, &handlers);
        assert!(matched.is_none());
    }

    #[test]
    fn handlers_can_match_on_activity_name() {
        let engine = engine();
        let error = ActivityError::new(ActivityErrorCode::ExecutionFailed, "boom", "Billing");
        let handlers = vec![handler("Billing", "BillingRecovery")];

        let matched = engine.handle_state_error(&OtelContext::current(), "S1", &error, &handlers);
        assert_eq!(matched.as_deref(), Some("BillingRecovery"));
    }

    #[test]
    fn first_matching_handler_in_order_wins() {
        let engine = engine();
        let error = ActivityError::new(ActivityErrorCode::HttpStatusError, "status 502", "HttpRequest");
        let handlers = vec![
            handler("HTTP_STATUS_ERROR", "First"),
            handler("HTTP_STATUS_ERROR", "Second"),
        ];

        let matched = engine.handle_state_error(&OtelContext::current(), "S1", &error, &handlers);
        assert_eq!(matched.as_deref(), Some("First"));
    }
}
