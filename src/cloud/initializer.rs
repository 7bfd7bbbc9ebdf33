//! Per-cloud metadata seeding.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::CloudError;
use crate::models::CloudType;

/// Seeds pricing and instance type metadata for a provider.
#[async_trait]
pub trait CloudInitializer: Send + Sync {
    async fn initialize(&self, customer_id: Uuid, provider_id: Uuid) -> Result<(), CloudError>;
}

/// Initializers keyed by the cloud type they serve.
///
/// # Examples
///
/// ```
/// use commissioner::cloud::InitializerSet;
/// use commissioner::models::CloudType;
///
/// let set = InitializerSet::new();
/// assert!(set.for_cloud(CloudType::Aws).is_none());
/// ```
#[derive(Clone, Default)]
pub struct InitializerSet {
    by_cloud: HashMap<CloudType, Arc<dyn CloudInitializer>>,
}

impl InitializerSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `initializer` for `cloud_type`, replacing any previous one.
    pub fn with(mut self, cloud_type: CloudType, initializer: Arc<dyn CloudInitializer>) -> Self {
        self.by_cloud.insert(cloud_type, initializer);
        self
    }

    /// The initializer for `cloud_type`, if one is registered.
    pub fn for_cloud(&self, cloud_type: CloudType) -> Option<Arc<dyn CloudInitializer>> {
        self.by_cloud.get(&cloud_type).cloned()
    }
}

impl std::fmt::Debug for InitializerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.by_cloud.keys()).finish()
    }
}
