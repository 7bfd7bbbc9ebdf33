//! Per-invocation record of created rows.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::infra::{InfraError, InfraStore};

/// A row created by the current task invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CreatedEntity {
    Region(Uuid),
    AvailabilityZone(Uuid),
    AccessKey(Uuid),
}

impl CreatedEntity {
    async fn delete(&self, infra: &dyn InfraStore) -> Result<(), InfraError> {
        match self {
            Self::Region(id) => infra.delete_region(*id).await,
            Self::AvailabilityZone(id) => infra.delete_zone(*id).await,
            Self::AccessKey(id) => infra.delete_access_key(*id).await,
        }
    }
}

/// Ordered list of rows created by one task invocation.
///
/// Commit steps record every row right after writing it. On failure
/// [`rollback`](Self::rollback) deletes them in reverse creation order, so
/// children go before their parents and rows from earlier invocations are
/// never touched.
///
/// # Examples
///
/// ```
/// use commissioner::task::{CreatedEntity, RollbackLedger};
/// use uuid::Uuid;
///
/// let region = Uuid::new_v4();
/// let zone = Uuid::new_v4();
///
/// let mut ledger = RollbackLedger::new();
/// ledger.record(CreatedEntity::Region(region));
/// ledger.record(CreatedEntity::AvailabilityZone(zone));
/// assert_eq!(ledger.len(), 2);
/// assert_eq!(ledger.entries()[0], CreatedEntity::Region(region));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackLedger {
    entries: Vec<CreatedEntity>,
}

/// Outcome of a rollback pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    /// Rows deleted, in deletion order.
    pub deleted: Vec<CreatedEntity>,
    /// Rows that could not be deleted, with the store's error.
    pub failed: Vec<(CreatedEntity, String)>,
}

impl RollbackReport {
    /// `true` if every recorded row was deleted.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl RollbackLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a created row.
    pub fn record(&mut self, entity: CreatedEntity) {
        self.entries.push(entity);
    }

    /// Appends every entry of `other`, keeping its order.
    pub fn extend(&mut self, other: RollbackLedger) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[CreatedEntity] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deletes every recorded row, newest first.
    ///
    /// Best effort: a failed delete is logged and reported, and the pass
    /// continues with the remaining rows.
    pub async fn rollback(self, infra: &dyn InfraStore) -> RollbackReport {
        let mut report = RollbackReport::default();
        for entity in self.entries.into_iter().rev() {
            match entity.delete(infra).await {
                Ok(()) => {
                    tracing::debug!(entity = ?entity, "rolled back");
                    report.deleted.push(entity);
                },
                Err(e) => {
                    tracing::error!(entity = ?entity, error = %e, "rollback delete failed");
                    report.failed.push((entity, e.to_string()));
                },
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryInfraStore;
    use crate::models::{AvailabilityZone, Region};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn rollback_deletes_in_reverse_and_spares_other_rows() {
        let infra = InMemoryInfraStore::new();
        let provider_id = Uuid::new_v4();

        let prior = Region::new(provider_id, "us-west1", "prior");
        infra.insert_region(prior.clone()).await.unwrap();

        let region = Region::new(provider_id, "us-east1", "new");
        let zone = AvailabilityZone::new(region.id, "us-east1-a", "subnet-1", None);
        infra.insert_region(region.clone()).await.unwrap();
        infra.insert_zone(zone.clone()).await.unwrap();

        let mut ledger = RollbackLedger::new();
        ledger.record(CreatedEntity::Region(region.id));
        ledger.record(CreatedEntity::AvailabilityZone(zone.id));

        let report = ledger.rollback(&infra).await;
        assert_eq!(
            report.deleted,
            vec![
                CreatedEntity::AvailabilityZone(zone.id),
                CreatedEntity::Region(region.id),
            ]
        );
        assert!(report.is_clean());
        assert_eq!(infra.region_count(), 1);
        assert_eq!(infra.zone_count(), 0);
        assert!(infra
            .get_region_by_code(provider_id, "us-west1")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn rollback_continues_past_failures() {
        let infra = InMemoryInfraStore::new();
        let region = Region::new(Uuid::new_v4(), "us-east1", "new");
        infra.insert_region(region.clone()).await.unwrap();

        let missing = Uuid::new_v4();
        let mut ledger = RollbackLedger::new();
        ledger.record(CreatedEntity::Region(region.id));
        ledger.record(CreatedEntity::AccessKey(missing));

        let report = ledger.rollback(&infra).await;
        assert!(!report.is_clean());
        assert_eq!(report.failed[0].0, CreatedEntity::AccessKey(missing));
        assert_eq!(report.deleted, vec![CreatedEntity::Region(region.id)]);
        assert_eq!(infra.region_count(), 0);
    }

    #[test]
    fn extend_preserves_order() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let mut a = RollbackLedger::new();
        a.record(CreatedEntity::Region(ids[0]));
        a.record(CreatedEntity::AvailabilityZone(ids[1]));
        let mut b = RollbackLedger::new();
        b.record(CreatedEntity::Region(ids[2]));
        b.record(CreatedEntity::AccessKey(ids[3]));
        a.extend(b);
        assert_eq!(
            a.entries(),
            &[
                CreatedEntity::Region(ids[0]),
                CreatedEntity::AvailabilityZone(ids[1]),
                CreatedEntity::Region(ids[2]),
                CreatedEntity::AccessKey(ids[3]),
            ]
        );
    }
}
