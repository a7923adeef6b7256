//! HTML entity unescape activity.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map as JsonMap, Value};

use crate::args::decode_args;
use crate::context::ActivityContext;
use crate::Activity;

#[derive(Debug, Deserialize)]
struct UnescapeArgs {
    /// HTML-escaped text to unescape.
    text: String,
}

/// Decodes HTML entities in a string, e.g. `&lt;` back to `<`.
#[derive(Default)]
pub struct HtmlUnescapeActivity;

impl HtmlUnescapeActivity {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Activity for HtmlUnescapeActivity {
    async fn execute(
        &self,
        context: &ActivityContext,
        arguments: &JsonMap<String, Value>,
    ) -> Result<Value, anyhow::Error> {
        let activity_name = context.info().activity_name;
        let args: UnescapeArgs = decode_args(&activity_name, arguments)?;
        let unescaped = html_escape::decode_html_entities(&args.text).into_owned();
        Ok(Value::String(unescaped))
    }
}
