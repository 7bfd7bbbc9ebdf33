//! SSH access key provisioning.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CloudError;
use crate::models::{AccessKey, KeyType};

/// Connection settings applied to every key a bootstrap provisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyOptions {
    pub ssh_user: Option<String>,
    pub ssh_port: u16,
    pub air_gap_install: bool,
    pub skip_key_validate: bool,
    pub set_up_chrony: bool,
    pub ntp_servers: Vec<String>,
    pub show_set_up_chrony: bool,
}

/// Request to provision (or attach) a platform-generated key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddKeyRequest {
    pub region_id: Uuid,
    pub provider_id: Uuid,
    pub key_code: String,
    pub options: KeyOptions,
}

/// Request to import caller-supplied key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportKeyRequest {
    pub region_id: Uuid,
    pub provider_id: Uuid,
    pub private_key_content: String,
    pub key_name: String,
    pub key_type: KeyType,
    pub options: KeyOptions,
    /// Replace existing key material with the same name.
    pub overwrite: bool,
}

/// Creates and imports SSH key pairs.
///
/// Implementations return the key row they describe; the task persists it
/// and owns its rollback.
#[async_trait]
pub trait AccessKeyManager: Send + Sync {
    /// Provisions a platform-generated key for a region.
    async fn add_key(&self, request: &AddKeyRequest) -> Result<AccessKey, CloudError>;

    /// Stores caller-supplied key material and registers it for a region.
    async fn save_and_add_key(&self, request: &ImportKeyRequest) -> Result<AccessKey, CloudError>;
}
