//! Data transform activity built on the path-query evaluator.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map as JsonMap, Value};
use tracing::debug;

use waypoint_util::expression::Expression;

use crate::args::decode_args;
use crate::context::ActivityContext;
use crate::errors::{ActivityError, ActivityErrorCode};
use crate::Activity;

/// Arguments accepted by [`JqTransformActivity`].
#[derive(Debug, Deserialize)]
struct TransformArgs {
    query: String,
    data: Value,
}

/// Runs a path-query expression over caller-provided data.
///
/// Unlike argument templates, the query here is taken verbatim (no
/// `${ … }` wrapper) and executes against the `data` argument rather
/// than the workflow data tree.
#[derive(Default)]
pub struct JqTransformActivity;

impl JqTransformActivity {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Activity for JqTransformActivity {
    async fn execute(
        &self,
        context: &ActivityContext,
        arguments: &JsonMap<String, Value>,
    ) -> Result<Value, anyhow::Error> {
        let activity_name = context.info().activity_name;
        let args: TransformArgs = decode_args(&activity_name, arguments)?;

        debug!(query = %args.query, "running transform query");

        let expression = Expression::parse(&args.query).map_err(|error| {
            let mut error_arguments = JsonMap::new();
            error_arguments.insert("query".into(), Value::String(args.query.clone()));
            ActivityError::new(ActivityErrorCode::JqParseError, "failed to parse query", &activity_name)
                .with_arguments(error_arguments)
                .with_cause(error)
        })?;

        let results = expression.evaluate(&args.data).map_err(|error| {
            let mut error_arguments = JsonMap::new();
            error_arguments.insert("query".into(), Value::String(args.query.clone()));
            error_arguments.insert("data".into(), args.data.clone());
            ActivityError::new(
                ActivityErrorCode::JqExecuteError,
                "query execution failed",
                &activity_name,
            )
            .with_arguments(error_arguments)
            .with_cause(error)
        })?;

        results.into_iter().next().ok_or_else(|| {
            let mut error_arguments = JsonMap::new();
            error_arguments.insert("query".into(), Value::String(args.query.clone()));
            error_arguments.insert("data".into(), args.data.clone());
            ActivityError::new(
                ActivityErrorCode::JqExecuteError,
                "query returned no results",
                &activity_name,
            )
            .with_arguments(error_arguments)
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn arguments(value: Value) -> JsonMap<String, Value> {
        value.as_object().expect("object fixture").clone()
    }

    fn activity_error(error: anyhow::Error) -> ActivityError {
        error.downcast::<ActivityError>().expect("activity error")
    }

    #[tokio::test]
    async fn transforms_data_with_query() {
        let activity = JqTransformActivity::new();
        let result = activity
            .execute(
                &ActivityContext::default(),
                &arguments(json!({
                    "query": ".user.name",
                    "data": {"user": {"name": "Ada"}}
                })),
            )
            .await
            .expect("execute transform");
        assert_eq!(result, json!("Ada"));
    }

    #[tokio::test]
    async fn invalid_query_maps_to_parse_error() {
        let activity = JqTransformActivity::new();
        let error = activity
            .execute(
                &ActivityContext::default(),
                &arguments(json!({"query": ".a !", "data": {}})),
            )
            .await
            .expect_err("should fail to parse");
        assert_eq!(activity_error(error).code, ActivityErrorCode::JqParseError);
    }

    #[tokio::test]
    async fn evaluation_failure_maps_to_execute_error() {
        let activity = JqTransformActivity::new();
        let error = activity
            .execute(
                &ActivityContext::default(),
                &arguments(json!({"query": ".a.b", "data": {"a": 3}})),
            )
            .await
            .expect_err("should fail to index a number");
        assert_eq!(activity_error(error).code, ActivityErrorCode::JqExecuteError);
    }

    #[tokio::test]
    async fn missing_data_argument_is_invalid() {
        let activity = JqTransformActivity::new();
        let error = activity
            .execute(&ActivityContext::default(), &arguments(json!({"query": "."})))
            .await
            .expect_err("should require data");
        assert_eq!(activity_error(error).code, ActivityErrorCode::InvalidArguments);
    }
}
