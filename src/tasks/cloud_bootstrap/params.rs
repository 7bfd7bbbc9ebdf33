//! Request parameters for [`CloudBootstrap`](super::CloudBootstrap).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cloud::KeyOptions;
use crate::error::TaskError;
use crate::task::TaskParams;
use crate::types::TaskType;

fn default_ssh_port() -> u16 {
    22
}

/// Returns the value if it is set and not blank.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Bootstrap or add-region request.
///
/// Maps are ordered so the network bootstrap payload is the same for the
/// same request.
///
/// # Examples
///
/// ```
/// use commissioner::tasks::cloud_bootstrap::CloudBootstrapParams;
/// use serde_json::json;
/// use uuid::Uuid;
///
/// let provider_id = Uuid::new_v4();
/// let params: CloudBootstrapParams = serde_json::from_value(json!({
///     "providerId": provider_id,
///     "regionAddOnly": true,
///     "perRegionMetadata": { "us-east1": { "subnetId": "subnet-1" } }
/// }))
/// .unwrap();
/// assert_eq!(params.ssh_port, 22);
/// assert!(params.region_add_only);
/// assert!(params.custom_key().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudBootstrapParams {
    /// Target provider. Required.
    pub provider_id: Uuid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_vpc_region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_vpc_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_vpc_id: Option<String>,

    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    #[serde(default)]
    pub air_gap_install: bool,

    #[serde(default)]
    pub skip_key_pair_validate: bool,

    /// Key code to use, or the name of the imported key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pair_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_private_key_content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_user: Option<String>,

    #[serde(default)]
    pub set_up_chrony: bool,

    #[serde(default)]
    pub ntp_servers: Vec<String>,

    #[serde(default)]
    pub show_set_up_chrony: bool,

    /// Extend an already bootstrapped provider; skips network bootstrap.
    #[serde(default)]
    pub region_add_only: bool,

    /// Requested regions by code.
    #[serde(default)]
    pub per_region_metadata: BTreeMap<String, PerRegionMetadata>,
}

/// Per-region settings of a bootstrap request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerRegionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,

    /// Explicit zone code to subnet mapping. Empty means discover zones.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub az_to_subnet_ids: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub az_to_secondary_subnet_ids: BTreeMap<String, String>,

    /// Subnet applied to every discovered zone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,

    /// Secondary subnet applied to every discovered zone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_subnet_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_security_group_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_image_id: Option<String>,
}

/// Caller-supplied key material, present only when complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomKey<'a> {
    pub private_key_content: &'a str,
    pub key_name: &'a str,
    pub ssh_user: &'a str,
}

impl CloudBootstrapParams {
    /// Parameters for a bootstrap of `provider_id` with no regions and
    /// default connection settings.
    pub fn new(provider_id: Uuid) -> Self {
        Self {
            provider_id,
            host_vpc_region: None,
            host_vpc_id: None,
            dest_vpc_id: None,
            ssh_port: default_ssh_port(),
            air_gap_install: false,
            skip_key_pair_validate: false,
            key_pair_name: None,
            ssh_private_key_content: None,
            ssh_user: None,
            set_up_chrony: false,
            ntp_servers: Vec::new(),
            show_set_up_chrony: false,
            region_add_only: false,
            per_region_metadata: BTreeMap::new(),
        }
    }

    /// Adds a requested region.
    pub fn with_region(mut self, code: impl Into<String>, metadata: PerRegionMetadata) -> Self {
        self.per_region_metadata.insert(code.into(), metadata);
        self
    }

    /// The imported key, if key content, key name and ssh user are all set.
    /// A partial set is ignored and the default key path is used.
    pub fn custom_key(&self) -> Option<CustomKey<'_>> {
        Some(CustomKey {
            private_key_content: non_empty(&self.ssh_private_key_content)?,
            key_name: non_empty(&self.key_pair_name)?,
            ssh_user: non_empty(&self.ssh_user)?,
        })
    }

    /// Connection settings for key provisioning.
    pub fn key_options(&self) -> KeyOptions {
        KeyOptions {
            ssh_user: self.ssh_user.clone(),
            ssh_port: self.ssh_port,
            air_gap_install: self.air_gap_install,
            skip_key_validate: self.skip_key_pair_validate,
            set_up_chrony: self.set_up_chrony,
            ntp_servers: self.ntp_servers.clone(),
            show_set_up_chrony: self.show_set_up_chrony,
        }
    }

    /// The JSON payload sent to the network manager.
    pub fn to_payload(&self) -> Result<String, TaskError> {
        serde_json::to_string(self)
            .map_err(|e| TaskError::external("network bootstrap", format!("payload encoding: {e}")))
    }
}

impl TaskParams for CloudBootstrapParams {
    const TASK_TYPE: TaskType = TaskType::CloudBootstrap;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn base() -> CloudBootstrapParams {
        CloudBootstrapParams::new(Uuid::new_v4())
    }

    #[test]
    fn custom_key_requires_all_parts() {
        let mut params = base();
        params.ssh_private_key_content = Some("PRIVATE".to_string());
        params.key_pair_name = Some("my-key".to_string());
        assert!(params.custom_key().is_none());

        params.ssh_user = Some("  ".to_string());
        assert!(params.custom_key().is_none());

        params.ssh_user = Some("centos".to_string());
        assert_eq!(
            params.custom_key(),
            Some(CustomKey {
                private_key_content: "PRIVATE",
                key_name: "my-key",
                ssh_user: "centos",
            })
        );
    }

    #[test]
    fn payload_is_deterministic_and_camel_case() {
        let a = base()
            .with_region("us-west1", PerRegionMetadata::default())
            .with_region("asia-south1", PerRegionMetadata::default());
        let mut b = CloudBootstrapParams::new(a.provider_id);
        b = b
            .with_region("asia-south1", PerRegionMetadata::default())
            .with_region("us-west1", PerRegionMetadata::default());
        assert_eq!(a.to_payload().unwrap(), b.to_payload().unwrap());

        let value: serde_json::Value = serde_json::from_str(&a.to_payload().unwrap()).unwrap();
        assert_eq!(value["sshPort"], json!(22));
        assert_eq!(value["regionAddOnly"], json!(false));
        assert!(value.get("keyPairName").is_none());
    }

    #[test]
    fn region_metadata_parses_zone_maps() {
        let metadata: PerRegionMetadata = serde_json::from_value(json!({
            "azToSubnetIds": {"us-west-1a": "subnet-1", "us-west-1b": "subnet-2"},
            "azToSecondarySubnetIds": {"us-west-1a": "subnet-3"},
            "customImageId": "us-west-image"
        }))
        .unwrap();
        assert_eq!(metadata.az_to_subnet_ids.len(), 2);
        assert_eq!(
            metadata.az_to_secondary_subnet_ids.get("us-west-1a").map(String::as_str),
            Some("subnet-3")
        );
        assert_eq!(metadata.custom_image_id.as_deref(), Some("us-west-image"));
        assert!(metadata.vpc_id.is_none());
    }

    #[test]
    fn key_options_carry_connection_settings() {
        let mut params = base();
        params.ssh_port = 2222;
        params.air_gap_install = true;
        params.ntp_servers = vec!["ntp.example.com".to_string()];
        let options = params.key_options();
        assert_eq!(options.ssh_port, 2222);
        assert!(options.air_gap_install);
        assert_eq!(options.ntp_servers, vec!["ntp.example.com".to_string()]);
    }
}
