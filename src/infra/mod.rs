//! Persistence collaborator for provider, region, zone and access key rows.
//!
//! [`InfraStore`] is the seam the task bodies write through. Each call is a
//! single-row operation; grouping writes into one invocation's all-or-nothing
//! unit is the job of the [`RollbackLedger`](crate::task::RollbackLedger), not
//! of the store.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use memory::InMemoryInfraStore;

use crate::error::TaskError;
use crate::models::{AccessKey, AvailabilityZone, Provider, Region};

/// Errors from the infrastructure store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InfraError {
    /// The addressed row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Row kind (e.g. `"region"`).
        entity: &'static str,
        /// Identity or code that was looked up.
        id: String,
    },

    /// A uniqueness constraint rejected the write.
    #[error("{entity} already exists: {key}")]
    Conflict {
        /// Row kind.
        entity: &'static str,
        /// The duplicated key.
        key: String,
    },

    /// Any other storage failure.
    #[error("infrastructure store failure: {0}")]
    Backend(String),
}

impl From<InfraError> for TaskError {
    fn from(err: InfraError) -> Self {
        TaskError::persistence(err.to_string())
    }
}

/// Row-level access to providers and the entities tasks create under them.
#[async_trait]
pub trait InfraStore: Send + Sync {
    /// Looks up a provider, `None` if it does not exist.
    async fn get_provider(&self, provider_id: Uuid) -> Result<Option<Provider>, InfraError>;

    /// Inserts or replaces a provider.
    async fn upsert_provider(&self, provider: Provider) -> Result<(), InfraError>;

    /// All regions of a provider.
    async fn list_regions(&self, provider_id: Uuid) -> Result<Vec<Region>, InfraError>;

    /// Looks up a provider's region by code.
    async fn get_region_by_code(
        &self,
        provider_id: Uuid,
        code: &str,
    ) -> Result<Option<Region>, InfraError>;

    /// Inserts a region.
    ///
    /// # Errors
    ///
    /// - [`InfraError::Conflict`] if the provider already has a region with
    ///   the same code.
    async fn insert_region(&self, region: Region) -> Result<(), InfraError>;

    /// Deletes a region.
    async fn delete_region(&self, region_id: Uuid) -> Result<(), InfraError>;

    /// All zones of a region.
    async fn list_zones(&self, region_id: Uuid) -> Result<Vec<AvailabilityZone>, InfraError>;

    /// Inserts a zone.
    async fn insert_zone(&self, zone: AvailabilityZone) -> Result<(), InfraError>;

    /// Deletes a zone.
    async fn delete_zone(&self, zone_id: Uuid) -> Result<(), InfraError>;

    /// Looks up a provider's access key by key code.
    async fn find_access_key(
        &self,
        provider_id: Uuid,
        key_code: &str,
    ) -> Result<Option<AccessKey>, InfraError>;

    /// Inserts an access key.
    async fn insert_access_key(&self, key: AccessKey) -> Result<(), InfraError>;

    /// Deletes an access key.
    async fn delete_access_key(&self, key_id: Uuid) -> Result<(), InfraError>;
}
