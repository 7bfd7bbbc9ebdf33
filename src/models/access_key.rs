//! SSH access keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of key material handed to the access key manager on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    Private,
    Public,
}

/// Where the key material came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyProvenance {
    /// Supplied by the caller and imported.
    Imported,
    /// Generated by the platform.
    Generated,
}

/// An access key registered for a provider, optionally tied to one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKey {
    pub id: Uuid,
    pub provider_id: Uuid,
    /// `None` for a provider-wide key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<Uuid>,
    pub key_code: String,
    /// Opaque reference to where the key material is kept.
    pub key_material_ref: String,
    pub provenance: KeyProvenance,
    pub ssh_user: Option<String>,
    pub ssh_port: u16,
    pub created_at: DateTime<Utc>,
}
