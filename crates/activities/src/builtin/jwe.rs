//! JWE encryption activity.

use async_trait::async_trait;
use josekit::jwe::{JweHeader, RSA_OAEP, RSA_OAEP_256};
use serde::Deserialize;
use serde_json::{Map as JsonMap, Value};
use tracing::debug;

use crate::args::{decode_args, require_one_of};
use crate::context::ActivityContext;
use crate::errors::{ActivityError, ActivityErrorCode};
use crate::Activity;

const CONTENT_ENCRYPTION_ALGORITHMS: &[&str] = &["A128GCM", "A256GCM"];
const KEY_MANAGEMENT_ALGORITHMS: &[&str] = &["RSA-OAEP", "RSA-OAEP-256"];

/// Arguments accepted by [`JweEncryptActivity`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncryptArgs {
    payload: String,
    /// PEM-encoded RSA public key (SPKI `PUBLIC KEY` block).
    public_key: String,
    content_encryption_algorithm: String,
    key_management_algorithm: String,
}

/// Encrypts a payload into a compact JWE serialization.
#[derive(Default)]
pub struct JweEncryptActivity;

impl JweEncryptActivity {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Activity for JweEncryptActivity {
    async fn execute(
        &self,
        context: &ActivityContext,
        arguments: &JsonMap<String, Value>,
    ) -> Result<Value, anyhow::Error> {
        let activity_name = context.info().activity_name;
        let args: EncryptArgs = decode_args(&activity_name, arguments)?;

        require_one_of(
            &activity_name,
            "contentEncryptionAlgorithm",
            &args.content_encryption_algorithm,
            CONTENT_ENCRYPTION_ALGORITHMS,
        )?;
        require_one_of(
            &activity_name,
            "keyManagementAlgorithm",
            &args.key_management_algorithm,
            KEY_MANAGEMENT_ALGORITHMS,
        )?;

        debug!(
            content_encryption = %args.content_encryption_algorithm,
            key_management = %args.key_management_algorithm,
            "encrypting payload"
        );

        let mut header = JweHeader::new();
        header.set_content_encryption(&args.content_encryption_algorithm);

        let encrypter = match args.key_management_algorithm.as_str() {
            "RSA-OAEP" => RSA_OAEP.encrypter_from_pem(&args.public_key),
            _ => RSA_OAEP_256.encrypter_from_pem(&args.public_key),
        }
        .map_err(|error| {
            // the key itself never goes into the error context
            ActivityError::new(
                ActivityErrorCode::JweEncryptError,
                "failed to parse public key",
                &activity_name,
            )
            .with_cause(anyhow::Error::new(error))
        })?;

        let serialized = josekit::jwe::serialize_compact(args.payload.as_bytes(), &header, &encrypter)
            .map_err(|error| {
                ActivityError::new(
                    ActivityErrorCode::JweEncryptError,
                    "failed to encrypt payload",
                    &activity_name,
                )
                .with_cause(anyhow::Error::new(error))
            })?;

        Ok(Value::String(serialized))
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
    async fn rejects_unknown_content_encryption_algorithm() {
        let activity = JweEncryptActivity::new();
        let error = activity
            .execute(
                &ActivityContext::default(),
                &arguments(json!({
                    "payload": "secret",
                    "publicKey": "irrelevant",
                    "contentEncryptionAlgorithm": "A512GCM",
                    "keyManagementAlgorithm": "RSA-OAEP"
                })),
            )
            .await
            .expect_err("should reject algorithm");
        assert_eq!(activity_error(error).code, ActivityErrorCode::InvalidArguments);
    }

    #[tokio::test]
    async fn rejects_unknown_key_management_algorithm() {
        let activity = JweEncryptActivity::new();
        let error = activity
            .execute(
                &ActivityContext::default(),
                &arguments(json!({
                    "payload": "secret",
                    "publicKey": "irrelevant",
                    "contentEncryptionAlgorithm": "A256GCM",
                    "keyManagementAlgorithm": "ECDH-ES"
                })),
            )
            .await
            .expect_err("should reject algorithm");
        assert_eq!(activity_error(error).code, ActivityErrorCode::InvalidArguments);
    }

    #[tokio::test]
    async fn malformed_public_key_maps_to_encrypt_error() {
        let activity = JweEncryptActivity::new();
        let error = activity
            .execute(
                &ActivityContext::default(),
                &arguments(json!({
                    "payload": "secret",
                    "publicKey": "not a pem block",
                    "contentEncryptionAlgorithm": "A256GCM",
                    "keyManagementAlgorithm": "RSA-OAEP"
                })),
            )
            .await
            .expect_err("should reject key");
        let error = activity_error(error);
        assert_eq!(error.code, ActivityErrorCode::JweEncryptError);
        assert!(error.arguments.is_none(), "key material must stay out of error context");
    }

    #[tokio::test]
    async fn missing_payload_is_invalid() {
        let activity = JweEncryptActivity::new();
        let error = activity
            .execute(
                &ActivityContext::default(),
                &arguments(json!({
                    "publicKey": "irrelevant",
                    "contentEncryptionAlgorithm": "A256GCM",
                    "keyManagementAlgorithm": "RSA-OAEP"
                })),
            )
            .await
            .expect_err("should require payload");
        assert_eq!(activity_error(error).code, ActivityErrorCode::InvalidArguments);
    }
}
