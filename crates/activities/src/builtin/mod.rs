//! Built-in activities shipped with the engine.
//!
//! Each is a thin wrapper over a library with a fixed argument and
//! result contract. The engine builder registers them under the names in
//! [`names`] before any custom activities.

pub mod html;
pub mod http;
pub mod jq;
pub mod jwe;

pub use html::HtmlUnescapeActivity;
pub use http::HttpRequestActivity;
pub use jq::JqTransformActivity;
pub use jwe::JweEncryptActivity;

/// Registration names of the built-in activities.
pub mod names {
    pub const HTTP_REQUEST: &str = "HttpRequest";
    pub const JQ_TRANSFORM: &str = "JqTransform";
    pub const HTML_UNESCAPE: &str = "HtmlUnescape";
    pub const JWE_ENCRYPT: &str = "JweEncrypt";
}
