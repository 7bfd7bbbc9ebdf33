//! Cloud metadata lookups.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CloudError;
use crate::models::{CloudType, Region};

/// Catalog entry for a region code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMetadata {
    /// Display name.
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl RegionMetadata {
    /// Creates a catalog entry.
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

/// Region catalog, zone discovery and machine image lookup.
#[async_trait]
pub trait CloudMetadata: Send + Sync {
    /// Region codes known for a cloud, with their catalog metadata.
    ///
    /// A requested region code that is absent from this catalog fails
    /// validation.
    async fn region_catalog(
        &self,
        cloud_type: CloudType,
    ) -> Result<BTreeMap<String, RegionMetadata>, CloudError>;

    /// Discovers a region's zones, returning zone code to subnet id.
    /// Discovery is VPC-scoped when `vpc_id` is given.
    async fn get_zones(
        &self,
        provider_id: Uuid,
        region_code: &str,
        vpc_id: Option<&str>,
    ) -> Result<BTreeMap<String, String>, CloudError>;

    /// Default machine image for a region.
    async fn get_default_image(&self, region: &Region) -> Result<String, CloudError>;

    /// Architecture of the region's chosen image.
    async fn get_image_architecture(&self, region: &Region) -> Result<String, CloudError>;
}
