//! Collaborator fakes and a test harness shared by the integration tests.
//!
//! Every fake records its calls so tests can assert how often (and with
//! what) the task body reached out. The network manager can be gated to
//! hold a task mid-commit.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{Notify, Semaphore};
use uuid::Uuid;

use commissioner::cloud::{
    AccessKeyManager, AddKeyRequest, CloudError, CloudInitializer, CloudMetadata, Collaborators,
    ImportKeyRequest, InitializerSet, NetworkManager, RegionMetadata,
};
use commissioner::infra::{InMemoryInfraStore, InfraStore};
use commissioner::models::{AccessKey, CloudType, KeyProvenance, Provider, Region};
use commissioner::{Commissioner, CommissionerConfig, TaskRecord};

pub const DEFAULT_IMAGE: &str = "test_image_id";
pub const IMAGE_ARCH: &str = "x86_64";
pub const WAIT: Duration = Duration::from_secs(10);

// ─── Cloud metadata ─────────────────────────────────────────────────────────

pub struct FakeCloudMetadata {
    catalogs: HashMap<CloudType, BTreeMap<String, RegionMetadata>>,
    zones: Mutex<HashMap<String, BTreeMap<String, String>>>,
    zones_error: Mutex<Option<String>>,
    zones_delay: Mutex<Option<Duration>>,
    pub zone_calls: Mutex<Vec<(Uuid, String, Option<String>)>>,
    pub image_calls: AtomicUsize,
    pub arch_calls: AtomicUsize,
}

impl FakeCloudMetadata {
    pub fn new() -> Self {
        let mut catalogs = HashMap::new();
        catalogs.insert(
            CloudType::Aws,
            BTreeMap::from([
                ("us-west-1".to_string(), RegionMetadata::new("US West (N. California)", 37.35, -121.96)),
                ("us-west-2".to_string(), RegionMetadata::new("US West (Oregon)", 44.52, -122.99)),
                ("us-east-1".to_string(), RegionMetadata::new("US East (N. Virginia)", 38.13, -78.45)),
            ]),
        );
        catalogs.insert(
            CloudType::Gcp,
            BTreeMap::from([
                ("us-west1".to_string(), RegionMetadata::new("Oregon", 43.8, -120.55)),
                ("us-east1".to_string(), RegionMetadata::new("South Carolina", 33.19, -80.01)),
            ]),
        );
        Self {
            catalogs,
            zones: Mutex::new(HashMap::new()),
            zones_error: Mutex::new(None),
            zones_delay: Mutex::new(None),
            zone_calls: Mutex::new(Vec::new()),
            image_calls: AtomicUsize::new(0),
            arch_calls: AtomicUsize::new(0),
        }
    }

    /// Zones returned for `region_code`. Unset regions return
    /// `{zone-1: subnet-1}`.
    pub fn set_zones(&self, region_code: &str, zones: &[(&str, &str)]) {
        self.zones.lock().insert(
            region_code.to_string(),
            zones
                .iter()
                .map(|(z, s)| (z.to_string(), s.to_string()))
                .collect(),
        );
    }

    pub fn fail_zones(&self, message: &str) {
        *self.zones_error.lock() = Some(message.to_string());
    }

    pub fn delay_zones(&self, delay: Duration) {
        *self.zones_delay.lock() = Some(delay);
    }

    pub fn zone_call_count(&self) -> usize {
        self.zone_calls.lock().len()
    }
}

#[async_trait]
impl CloudMetadata for FakeCloudMetadata {
    async fn region_catalog(
        &self,
        cloud_type: CloudType,
    ) -> Result<BTreeMap<String, RegionMetadata>, CloudError> {
        Ok(self.catalogs.get(&cloud_type).cloned().unwrap_or_default())
    }

    async fn get_zones(
        &self,
        provider_id: Uuid,
        region_code: &str,
        vpc_id: Option<&str>,
    ) -> Result<BTreeMap<String, String>, CloudError> {
        self.zone_calls.lock().push((
            provider_id,
            region_code.to_string(),
            vpc_id.map(String::from),
        ));
        let delay = *self.zones_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.zones_error.lock().clone() {
            return Err(CloudError::new(message));
        }
        Ok(self
            .zones
            .lock()
            .get(region_code)
            .cloned()
            .unwrap_or_else(|| BTreeMap::from([("zone-1".to_string(), "subnet-1".to_string())])))
    }

    async fn get_default_image(&self, _region: &Region) -> Result<String, CloudError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        Ok(DEFAULT_IMAGE.to_string())
    }

    async fn get_image_architecture(&self, _region: &Region) -> Result<String, CloudError> {
        self.arch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(IMAGE_ARCH.to_string())
    }
}

// ─── Network manager ────────────────────────────────────────────────────────

pub struct FakeNetworkManager {
    response: Mutex<Value>,
    pub calls: Mutex<Vec<(Option<String>, Uuid, String)>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    /// Signalled every time `bootstrap` is entered.
    pub entered: Arc<Notify>,
}

impl FakeNetworkManager {
    pub fn new() -> Self {
        Self {
            response: Mutex::new(json!({})),
            calls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
            entered: Arc::new(Notify::new()),
        }
    }

    pub fn respond_with(&self, response: Value) {
        *self.response.lock() = response;
    }

    /// Makes every bootstrap call block until [`release`](Self::release).
    pub fn hold(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

/// Lets `n` held bootstrap calls through.
pub fn release(gate: &Semaphore, n: usize) {
    gate.add_permits(n);
}

#[async_trait]
impl NetworkManager for FakeNetworkManager {
    async fn bootstrap(
        &self,
        host_vpc_id: Option<&str>,
        provider_id: Uuid,
        payload: &str,
    ) -> Result<Value, CloudError> {
        self.calls.lock().push((
            host_vpc_id.map(String::from),
            provider_id,
            payload.to_string(),
        ));
        self.entered.notify_one();
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| CloudError::new(e.to_string()))?;
            permit.forget();
        }
        Ok(self.response.lock().clone())
    }
}

// ─── Access key manager ─────────────────────────────────────────────────────

pub struct FakeAccessKeyManager {
    pub added: Mutex<Vec<AddKeyRequest>>,
    pub imported: Mutex<Vec<ImportKeyRequest>>,
}

impl FakeAccessKeyManager {
    pub fn new() -> Self {
        Self {
            added: Mutex::new(Vec::new()),
            imported: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AccessKeyManager for FakeAccessKeyManager {
    async fn add_key(&self, request: &AddKeyRequest) -> Result<AccessKey, CloudError> {
        self.added.lock().push(request.clone());
        Ok(AccessKey {
            id: Uuid::new_v4(),
            provider_id: request.provider_id,
            region_id: Some(request.region_id),
            key_code: request.key_code.clone(),
            key_material_ref: format!("/opt/keys/{}.pem", request.key_code),
            provenance: KeyProvenance::Generated,
            ssh_user: request.options.ssh_user.clone(),
            ssh_port: request.options.ssh_port,
            created_at: Utc::now(),
        })
    }

    async fn save_and_add_key(&self, request: &ImportKeyRequest) -> Result<AccessKey, CloudError> {
        self.imported.lock().push(request.clone());
        Ok(AccessKey {
            id: Uuid::new_v4(),
            provider_id: request.provider_id,
            region_id: Some(request.region_id),
            key_code: request.key_name.clone(),
            key_material_ref: format!("/opt/keys/{}.pem", request.key_name),
            provenance: KeyProvenance::Imported,
            ssh_user: request.options.ssh_user.clone(),
            ssh_port: request.options.ssh_port,
            created_at: Utc::now(),
        })
    }
}

// ─── Cloud initializer ──────────────────────────────────────────────────────

pub struct FakeInitializer {
    pub calls: Mutex<Vec<(Uuid, Uuid)>>,
    error: Mutex<Option<String>>,
}

impl FakeInitializer {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            error: Mutex::new(None),
        }
    }

    pub fn fail_with(&self, message: Option<&str>) {
        *self.error.lock() = message.map(String::from);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl CloudInitializer for FakeInitializer {
    async fn initialize(&self, customer_id: Uuid, provider_id: Uuid) -> Result<(), CloudError> {
        self.calls.lock().push((customer_id, provider_id));
        match self.error.lock().clone() {
            Some(message) => Err(CloudError::new(message)),
            None => Ok(()),
        }
    }
}

// ─── Harness ────────────────────────────────────────────────────────────────

pub struct TestEnv {
    pub customer_id: Uuid,
    pub aws: Provider,
    pub gcp: Provider,
    pub infra: Arc<InMemoryInfraStore>,
    pub metadata: Arc<FakeCloudMetadata>,
    pub network: Arc<FakeNetworkManager>,
    pub access_keys: Arc<FakeAccessKeyManager>,
    pub aws_initializer: Arc<FakeInitializer>,
    pub gcp_initializer: Arc<FakeInitializer>,
}

impl TestEnv {
    pub async fn new() -> Self {
        let customer_id = Uuid::new_v4();
        let aws = Provider::new(customer_id, "AWS Dev", CloudType::Aws);
        let gcp = Provider::new(customer_id, "GCP Dev", CloudType::Gcp);
        let infra = Arc::new(InMemoryInfraStore::new());
        infra.upsert_provider(aws.clone()).await.unwrap();
        infra.upsert_provider(gcp.clone()).await.unwrap();
        Self {
            customer_id,
            aws,
            gcp,
            infra,
            metadata: Arc::new(FakeCloudMetadata::new()),
            network: Arc::new(FakeNetworkManager::new()),
            access_keys: Arc::new(FakeAccessKeyManager::new()),
            aws_initializer: Arc::new(FakeInitializer::new()),
            gcp_initializer: Arc::new(FakeInitializer::new()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            infra: self.infra.clone(),
            metadata: self.metadata.clone(),
            network: self.network.clone(),
            access_keys: self.access_keys.clone(),
            initializers: InitializerSet::new()
                .with(CloudType::Aws, self.aws_initializer.clone())
                .with(CloudType::Gcp, self.gcp_initializer.clone()),
        }
    }

    pub fn config() -> CommissionerConfig {
        CommissionerConfig::default().with_poll_interval(Duration::from_millis(5))
    }

    pub fn commissioner(&self) -> Commissioner {
        self.commissioner_with(Self::config())
    }

    pub fn commissioner_with(&self, config: CommissionerConfig) -> Commissioner {
        Commissioner::builder(self.collaborators())
            .config(config)
            .build()
            .unwrap()
    }

    pub async fn region(&self, provider: &Provider, code: &str) -> Option<Region> {
        self.infra.get_region_by_code(provider.id, code).await.unwrap()
    }
}

/// Submits typed parameters and waits for the task to finish.
pub async fn run_to_end<P: commissioner::task::TaskParams>(
    commissioner: &Commissioner,
    params: &P,
) -> TaskRecord {
    let task_id = commissioner.submit_params(params).await.unwrap();
    commissioner.wait_for_completion(task_id, WAIT).await.unwrap()
}
