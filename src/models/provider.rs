//! Cloud providers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_KEY_CODE_PREFIX, DEFAULT_KEY_CODE_SUFFIX};

/// The cloud a provider targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudType {
    /// Amazon Web Services.
    Aws,
    /// Google Cloud Platform.
    Gcp,
    /// Microsoft Azure.
    Azu,
    /// Kubernetes.
    Kubernetes,
    /// Customer-managed machines.
    Onprem,
}

impl fmt::Display for CloudType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Aws => "aws",
            Self::Gcp => "gcp",
            Self::Azu => "azu",
            Self::Kubernetes => "kubernetes",
            Self::Onprem => "onprem",
        };
        f.write_str(tag)
    }
}

/// A configured cloud account scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    /// Provider identity.
    pub id: Uuid,
    /// Owning customer, passed to the cloud initializer.
    pub customer_id: Uuid,
    /// Display name.
    pub name: String,
    /// Cloud type tag.
    pub cloud_type: CloudType,
}

impl Provider {
    /// Creates a provider with a fresh identity.
    pub fn new(customer_id: Uuid, name: impl Into<String>, cloud_type: CloudType) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            name: name.into(),
            cloud_type,
        }
    }

    /// The key code used when a bootstrap request names no key pair.
    ///
    /// The provider name is lowercased and every run of characters outside
    /// `[a-z0-9]` becomes a single `-`.
    ///
    /// # Examples
    ///
    /// ```
    /// use commissioner::models::{CloudType, Provider};
    /// use uuid::Uuid;
    ///
    /// let provider = Provider::new(Uuid::nil(), "My AWS  Provider", CloudType::Aws);
    /// assert_eq!(provider.default_key_code(), "yb-my-aws-provider-key");
    /// ```
    pub fn default_key_code(&self) -> String {
        let mut sanitized = String::with_capacity(self.name.len());
        for c in self.name.chars().flat_map(char::to_lowercase) {
            if c.is_ascii_alphanumeric() {
                sanitized.push(c);
            } else if !sanitized.is_empty() && !sanitized.ends_with('-') {
                sanitized.push('-');
            }
        }
        let sanitized = sanitized.trim_end_matches('-');
        format!("{DEFAULT_KEY_CODE_PREFIX}{sanitized}{DEFAULT_KEY_CODE_SUFFIX}")
    }
}
