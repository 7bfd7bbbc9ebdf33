//! Provider-scoped mutual exclusion.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per provider, created on first use.
///
/// A worker holds its provider's guard from validation through commit, so
/// two tasks for the same provider never interleave their read of the
/// region set with each other's writes. The guard is released on every exit
/// path when it is dropped.
#[derive(Debug, Default)]
pub(crate) struct ProviderLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ProviderLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `provider_id`.
    pub(crate) async fn acquire(&self, provider_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.locks.entry(provider_id).or_default().value());
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_provider_is_exclusive() {
        let locks = ProviderLocks::new();
        let provider = Uuid::new_v4();
        let guard = locks.acquire(provider).await;

        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.acquire(provider)).await;
        assert!(blocked.is_err());

        drop(guard);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(200), locks.acquire(provider)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn different_providers_do_not_block() {
        let locks = ProviderLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let b = tokio::time::timeout(Duration::from_millis(200), locks.acquire(Uuid::new_v4())).await;
        assert!(b.is_ok());
    }
}
