//! Provider network bootstrap.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::CloudError;

/// Creates or attaches the provider's VPCs and subnets.
#[async_trait]
pub trait NetworkManager: Send + Sync {
    /// Bootstraps networking for a provider.
    ///
    /// `payload` is the JSON rendering of the bootstrap request. The result
    /// may carry a non-null `error` field signalling failure even when the
    /// call itself returns `Ok`; see [`bootstrap_error`].
    async fn bootstrap(
        &self,
        host_vpc_id: Option<&str>,
        provider_id: Uuid,
        payload: &str,
    ) -> Result<Value, CloudError>;
}

/// Extracts the error indicator from a network bootstrap result.
///
/// # Examples
///
/// ```
/// use commissioner::cloud::bootstrap_error;
/// use serde_json::json;
///
/// assert_eq!(bootstrap_error(&json!({"error": "Something failed"})).as_deref(), Some("Something failed"));
/// assert_eq!(bootstrap_error(&json!({"error": null})), None);
/// assert_eq!(bootstrap_error(&json!({})), None);
/// ```
pub fn bootstrap_error(result: &Value) -> Option<String> {
    match result.get("error")? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}
