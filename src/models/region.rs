//! Regions and availability zones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A provider's region. `code` is unique within the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub code: String,
    pub name: String,
    /// Machine image, custom or the cloud's default for the region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Image architecture. Only recorded for AWS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

impl Region {
    /// Creates a region row with a fresh identity and no optional settings.
    pub fn new(provider_id: Uuid, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider_id,
            code: code.into(),
            name: name.into(),
            image: None,
            arch: None,
            security_group_id: None,
            vpc_id: None,
            latitude: 0.0,
            longitude: 0.0,
            created_at: Utc::now(),
        }
    }
}

/// An availability zone within a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityZone {
    pub id: Uuid,
    pub region_id: Uuid,
    pub code: String,
    pub name: String,
    /// Primary subnet.
    pub subnet: String,
    /// Set only when the request supplied one for this zone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_subnet: Option<String>,
}

impl AvailabilityZone {
    /// Creates a zone row named after its code.
    pub fn new(
        region_id: Uuid,
        code: impl Into<String>,
        subnet: impl Into<String>,
        secondary_subnet: Option<String>,
    ) -> Self {
        let code = code.into();
        Self {
            id: Uuid::new_v4(),
            region_id,
            name: code.clone(),
            code,
            subnet: subnet.into(),
            secondary_subnet,
        }
    }
}
