//! Region bootstrap and add-region reconciliation.
//!
//! # Steps
//!
//! Validation (no writes):
//!
//! 1. The provider exists.
//! 2. Every requested region code is in the cloud's region catalog.
//! 3. Unless `regionAddOnly` is set, no requested code exists for the
//!    provider yet. With `regionAddOnly`, codes that already exist are
//!    skipped.
//!
//! Commit, each group recorded on the task record:
//!
//! - `CreateRegions`: per region, concurrently, insert the region row and its
//!   zones (explicit mapping, or discovery with an optional region-wide
//!   subnet).
//! - `BootstrapNetwork`: once, unless `regionAddOnly`.
//! - `ProvisionAccessKeys`: per created region, import the caller's key or
//!   attach the provider's default key, creating it only if missing.
//! - `InitializeCloud`: once, on every successful run.

pub mod params;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

pub use params::{CloudBootstrapParams, CustomKey, PerRegionMetadata};

use self::params::non_empty;
use crate::cloud::{bootstrap_error, AddKeyRequest, ImportKeyRequest, RegionMetadata};
use crate::constants::groups;
use crate::error::TaskError;
use crate::models::{AvailabilityZone, CloudType, KeyType, Provider, Region};
use crate::task::{CreatedEntity, RollbackLedger, Task, TaskContext};
use crate::types::TaskType;

#[derive(Debug, Clone)]
struct PlannedRegion {
    code: String,
    catalog: RegionMetadata,
    metadata: PerRegionMetadata,
}

/// Validated inputs, handed from `validate` to `run`.
#[derive(Debug, Clone)]
struct BootstrapPlan {
    provider: Provider,
    regions: Vec<PlannedRegion>,
}

/// A zone row to create: code, subnet, secondary subnet.
type ZoneSpec = (String, String, Option<String>);

/// The `CloudBootstrap` task body.
#[derive(Debug)]
pub struct CloudBootstrap {
    params: CloudBootstrapParams,
    plan: Mutex<Option<BootstrapPlan>>,
}

impl CloudBootstrap {
    pub fn new(params: CloudBootstrapParams) -> Self {
        Self {
            params,
            plan: Mutex::new(None),
        }
    }

    pub fn params(&self) -> &CloudBootstrapParams {
        &self.params
    }

    /// [`TaskFactory`](crate::task::TaskFactory) for the registry.
    pub fn factory(params: &Value) -> Result<Arc<dyn Task>, String> {
        let params: CloudBootstrapParams =
            serde_json::from_value(params.clone()).map_err(|e| e.to_string())?;
        Ok(Arc::new(Self::new(params)))
    }

    async fn create_regions(
        &self,
        ctx: &TaskContext,
        plan: &BootstrapPlan,
        ledger: &mut RollbackLedger,
    ) -> Result<Vec<Region>, TaskError> {
        let outcomes = join_all(
            plan.regions
                .iter()
                .map(|planned| self.create_region(ctx, &plan.provider, planned)),
        )
        .await;

        // Merge every region's ledger, failed ones included, so rollback
        // sees all rows written before the failure.
        let mut created = Vec::with_capacity(outcomes.len());
        let mut first_error = None;
        for (region_ledger, outcome) in outcomes {
            ledger.extend(region_ledger);
            match outcome {
                Ok(region) => created.push(region),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                },
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(created),
        }
    }

    async fn create_region(
        &self,
        ctx: &TaskContext,
        provider: &Provider,
        planned: &PlannedRegion,
    ) -> (RollbackLedger, Result<Region, TaskError>) {
        let mut ledger = RollbackLedger::new();
        let outcome = self
            .create_region_rows(ctx, provider, planned, &mut ledger)
            .await;
        (ledger, outcome)
    }

    async fn create_region_rows(
        &self,
        ctx: &TaskContext,
        provider: &Provider,
        planned: &PlannedRegion,
        ledger: &mut RollbackLedger,
    ) -> Result<Region, TaskError> {
        ctx.ensure_active()?;
        let metadata = &ctx.collaborators().metadata;
        let requested = &planned.metadata;

        let mut region = Region::new(provider.id, &planned.code, &planned.catalog.name);
        region.latitude = planned.catalog.latitude;
        region.longitude = planned.catalog.longitude;
        region.vpc_id = non_empty(&requested.vpc_id).map(String::from);
        region.security_group_id = non_empty(&requested.custom_security_group_id).map(String::from);
        region.image = Some(match non_empty(&requested.custom_image_id) {
            Some(image) => image.to_string(),
            None => {
                ctx.call("default image lookup", metadata.get_default_image(&region))
                    .await?
            },
        });
        if provider.cloud_type == CloudType::Aws {
            region.arch = Some(
                ctx.call(
                    "image architecture lookup",
                    metadata.get_image_architecture(&region),
                )
                .await?,
            );
        }

        ctx.infra().insert_region(region.clone()).await?;
        ledger.record(CreatedEntity::Region(region.id));

        for (code, subnet, secondary) in self.resolve_zones(ctx, provider, &region, requested).await? {
            let zone = AvailabilityZone::new(region.id, code, subnet, secondary);
            let zone_id = zone.id;
            ctx.infra().insert_zone(zone).await?;
            ledger.record(CreatedEntity::AvailabilityZone(zone_id));
        }

        tracing::debug!(
            task_id = %ctx.task_id(),
            region = %region.code,
            image = ?region.image,
            "region created"
        );
        Ok(region)
    }

    async fn resolve_zones(
        &self,
        ctx: &TaskContext,
        provider: &Provider,
        region: &Region,
        requested: &PerRegionMetadata,
    ) -> Result<Vec<ZoneSpec>, TaskError> {
        if !requested.az_to_subnet_ids.is_empty() {
            return Ok(requested
                .az_to_subnet_ids
                .iter()
                .map(|(zone, subnet)| {
                    let secondary = requested
                        .az_to_secondary_subnet_ids
                        .get(zone)
                        .filter(|s| !s.trim().is_empty())
                        .cloned();
                    (zone.clone(), subnet.clone(), secondary)
                })
                .collect());
        }

        let discovered = ctx
            .call(
                "zone discovery",
                ctx.collaborators().metadata.get_zones(
                    provider.id,
                    &region.code,
                    non_empty(&requested.vpc_id),
                ),
            )
            .await?;
        if discovered.is_empty() {
            return Err(TaskError::external(
                "zone discovery",
                format!("no zones found for region {}", region.code),
            ));
        }

        let region_subnet = non_empty(&requested.subnet_id);
        let region_secondary = non_empty(&requested.secondary_subnet_id);
        Ok(discovered
            .into_iter()
            .map(|(zone, subnet)| {
                let subnet = region_subnet.map_or(subnet, String::from);
                (zone, subnet, region_secondary.map(String::from))
            })
            .collect())
    }

    async fn bootstrap_network(&self, ctx: &TaskContext, provider: &Provider) -> Result<(), TaskError> {
        let payload = self.params.to_payload()?;
        let result = ctx
            .call(
                "network bootstrap",
                ctx.collaborators().network.bootstrap(
                    non_empty(&self.params.host_vpc_id),
                    provider.id,
                    &payload,
                ),
            )
            .await?;
        match bootstrap_error(&result) {
            Some(message) => Err(TaskError::external("network bootstrap", message)),
            None => Ok(()),
        }
    }

    async fn provision_access_key(
        &self,
        ctx: &TaskContext,
        provider: &Provider,
        region: &Region,
        ledger: &mut RollbackLedger,
    ) -> Result<(), TaskError> {
        let access_keys = &ctx.collaborators().access_keys;

        let key = if let Some(custom) = self.params.custom_key() {
            let request = ImportKeyRequest {
                region_id: region.id,
                provider_id: provider.id,
                private_key_content: custom.private_key_content.to_string(),
                key_name: custom.key_name.to_string(),
                key_type: KeyType::Private,
                options: self.params.key_options(),
                overwrite: false,
            };
            ctx.call("access key import", access_keys.save_and_add_key(&request))
                .await?
        } else {
            let key_code = non_empty(&self.params.key_pair_name)
                .map_or_else(|| provider.default_key_code(), String::from);
            let request = AddKeyRequest {
                region_id: region.id,
                provider_id: provider.id,
                key_code,
                options: self.params.key_options(),
            };
            let key = ctx
                .call("access key provisioning", access_keys.add_key(&request))
                .await?;

            // One row per provider and key code; later regions only attach.
            if let Some(existing) = ctx
                .infra()
                .find_access_key(provider.id, &request.key_code)
                .await?
            {
                tracing::debug!(
                    task_id = %ctx.task_id(),
                    region = %region.code,
                    key_code = %existing.key_code,
                    "attached existing access key"
                );
                return Ok(());
            }
            key
        };

        let key_id = key.id;
        ctx.infra().insert_access_key(key).await?;
        ledger.record(CreatedEntity::AccessKey(key_id));
        Ok(())
    }

    async fn initialize_cloud(&self, ctx: &TaskContext, provider: &Provider) -> Result<(), TaskError> {
        match ctx.collaborators().initializers.for_cloud(provider.cloud_type) {
            Some(initializer) => {
                ctx.call(
                    "cloud initializer",
                    initializer.initialize(provider.customer_id, provider.id),
                )
                .await
            },
            None => {
                tracing::debug!(
                    task_id = %ctx.task_id(),
                    cloud_type = %provider.cloud_type,
                    "no initializer registered, skipping"
                );
                Ok(())
            },
        }
    }
}

#[async_trait]
impl Task for CloudBootstrap {
    fn task_type(&self) -> TaskType {
        TaskType::CloudBootstrap
    }

    fn lock_scope(&self) -> Option<Uuid> {
        Some(self.params.provider_id)
    }

    async fn validate(&self, ctx: &TaskContext) -> Result<(), TaskError> {
        let provider_id = self.params.provider_id;
        let provider = ctx
            .infra()
            .get_provider(provider_id)
            .await?
            .ok_or_else(|| TaskError::validation(format!("provider {provider_id} does not exist")))?;

        if self.params.per_region_metadata.is_empty() {
            return Err(TaskError::validation("no regions requested"));
        }

        let catalog = ctx
            .call(
                "region catalog lookup",
                ctx.collaborators().metadata.region_catalog(provider.cloud_type),
            )
            .await?;
        let unknown: Vec<&str> = self
            .params
            .per_region_metadata
            .keys()
            .filter(|code| !catalog.contains_key(code.as_str()))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(TaskError::validation(format!(
                "unknown region code for {}: {}",
                provider.cloud_type,
                unknown.join(", ")
            )));
        }

        let mut regions = Vec::with_capacity(self.params.per_region_metadata.len());
        for (code, metadata) in &self.params.per_region_metadata {
            if ctx.infra().get_region_by_code(provider_id, code).await?.is_some() {
                if !self.params.region_add_only {
                    return Err(TaskError::validation(format!(
                        "region {code} already exists for provider {}",
                        provider.name
                    )));
                }
                tracing::info!(task_id = %ctx.task_id(), region = %code, "region already exists, skipping");
                continue;
            }
            if let Some(entry) = catalog.get(code) {
                regions.push(PlannedRegion {
                    code: code.clone(),
                    catalog: entry.clone(),
                    metadata: metadata.clone(),
                });
            }
        }

        *self.plan.lock() = Some(BootstrapPlan { provider, regions });
        Ok(())
    }

    async fn run(&self, ctx: &TaskContext, ledger: &mut RollbackLedger) -> Result<(), TaskError> {
        let plan = self
            .plan
            .lock()
            .take()
            .ok_or_else(|| TaskError::validation("bootstrap ran without a validated plan"))?;
        let provider = &plan.provider;

        let created = ctx
            .run_group(groups::CREATE_REGIONS, self.create_regions(ctx, &plan, ledger))
            .await?;

        if !self.params.region_add_only {
            ctx.ensure_active()?;
            ctx.run_group(groups::BOOTSTRAP_NETWORK, self.bootstrap_network(ctx, provider))
                .await?;
        }

        ctx.ensure_active()?;
        ctx.run_group(groups::PROVISION_ACCESS_KEYS, async {
            for region in &created {
                ctx.ensure_active()?;
                self.provision_access_key(ctx, provider, region, ledger).await?;
            }
            Ok::<(), TaskError>(())
        })
        .await?;

        ctx.ensure_active()?;
        ctx.run_group(groups::INITIALIZE_CLOUD, self.initialize_cloud(ctx, provider))
            .await?;

        tracing::info!(
            task_id = %ctx.task_id(),
            provider_id = %provider.id,
            regions = created.len(),
            "bootstrap committed"
        );
        Ok(())
    }
}
