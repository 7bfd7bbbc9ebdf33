//! In-memory [`InfraStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{InfraError, InfraStore};
use crate::models::{AccessKey, AvailabilityZone, Provider, Region};

#[derive(Debug, Default)]
struct Tables {
    providers: HashMap<Uuid, Provider>,
    regions: HashMap<Uuid, Region>,
    zones: HashMap<Uuid, AvailabilityZone>,
    access_keys: HashMap<Uuid, AccessKey>,
}

/// Thread-safe in-memory infrastructure store.
///
/// Enforces region code uniqueness per provider. Listings are sorted by
/// code so callers see a stable order.
///
/// # Examples
///
/// ```
/// # tokio_test_block_on(async {
/// use commissioner::infra::{InMemoryInfraStore, InfraStore};
/// use commissioner::models::{CloudType, Provider, Region};
/// use uuid::Uuid;
///
/// let store = InMemoryInfraStore::new();
/// let provider = Provider::new(Uuid::new_v4(), "aws-dev", CloudType::Aws);
/// store.upsert_provider(provider.clone()).await.unwrap();
///
/// store.insert_region(Region::new(provider.id, "us-west-1", "US West")).await.unwrap();
/// assert!(store.insert_region(Region::new(provider.id, "us-west-1", "dup")).await.is_err());
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryInfraStore {
    tables: RwLock<Tables>,
}

impl InMemoryInfraStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of region rows across all providers.
    pub fn region_count(&self) -> usize {
        self.tables.read().regions.len()
    }

    /// Total number of zone rows.
    pub fn zone_count(&self) -> usize {
        self.tables.read().zones.len()
    }

    /// Total number of access key rows.
    pub fn access_key_count(&self) -> usize {
        self.tables.read().access_keys.len()
    }
}

fn not_found(entity: &'static str, id: Uuid) -> InfraError {
    InfraError::NotFound {
        entity,
        id: id.to_string(),
    }
}

#[async_trait]
impl InfraStore for InMemoryInfraStore {
    async fn get_provider(&self, provider_id: Uuid) -> Result<Option<Provider>, InfraError> {
        Ok(self.tables.read().providers.get(&provider_id).cloned())
    }

    async fn upsert_provider(&self, provider: Provider) -> Result<(), InfraError> {
        self.tables.write().providers.insert(provider.id, provider);
        Ok(())
    }

    async fn list_regions(&self, provider_id: Uuid) -> Result<Vec<Region>, InfraError> {
        let mut regions: Vec<Region> = self
            .tables
            .read()
            .regions
            .values()
            .filter(|r| r.provider_id == provider_id)
            .cloned()
            .collect();
        regions.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(regions)
    }

    async fn get_region_by_code(
        &self,
        provider_id: Uuid,
        code: &str,
    ) -> Result<Option<Region>, InfraError> {
        Ok(self
            .tables
            .read()
            .regions
            .values()
            .find(|r| r.provider_id == provider_id && r.code == code)
            .cloned())
    }

    async fn insert_region(&self, region: Region) -> Result<(), InfraError> {
        let mut tables = self.tables.write();
        let duplicate = tables
            .regions
            .values()
            .any(|r| r.provider_id == region.provider_id && r.code == region.code);
        if duplicate {
            return Err(InfraError::Conflict {
                entity: "region",
                key: format!("{}/{}", region.provider_id, region.code),
            });
        }
        tables.regions.insert(region.id, region);
        Ok(())
    }

    async fn delete_region(&self, region_id: Uuid) -> Result<(), InfraError> {
        self.tables
            .write()
            .regions
            .remove(&region_id)
            .map(|_| ())
            .ok_or_else(|| not_found("region", region_id))
    }

    async fn list_zones(&self, region_id: Uuid) -> Result<Vec<AvailabilityZone>, InfraError> {
        let mut zones: Vec<AvailabilityZone> = self
            .tables
            .read()
            .zones
            .values()
            .filter(|z| z.region_id == region_id)
            .cloned()
            .collect();
        zones.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(zones)
    }

    async fn insert_zone(&self, zone: AvailabilityZone) -> Result<(), InfraError> {
        let mut tables = self.tables.write();
        if !tables.regions.contains_key(&zone.region_id) {
            return Err(not_found("region", zone.region_id));
        }
        tables.zones.insert(zone.id, zone);
        Ok(())
    }

    async fn delete_zone(&self, zone_id: Uuid) -> Result<(), InfraError> {
        self.tables
            .write()
            .zones
            .remove(&zone_id)
            .map(|_| ())
            .ok_or_else(|| not_found("availability zone", zone_id))
    }

    async fn find_access_key(
        &self,
        provider_id: Uuid,
        key_code: &str,
    ) -> Result<Option<AccessKey>, InfraError> {
        Ok(self
            .tables
            .read()
            .access_keys
            .values()
            .filter(|k| k.provider_id == provider_id && k.key_code == key_code)
            .min_by_key(|k| k.created_at)
            .cloned())
    }

    async fn insert_access_key(&self, key: AccessKey) -> Result<(), InfraError> {
        self.tables.write().access_keys.insert(key.id, key);
        Ok(())
    }

    async fn delete_access_key(&self, key_id: Uuid) -> Result<(), InfraError> {
        self.tables
            .write()
            .access_keys
            .remove(&key_id)
            .map(|_| ())
            .ok_or_else(|| not_found("access key", key_id))
    }
}
