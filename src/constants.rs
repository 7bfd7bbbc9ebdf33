//! Names and defaults shared across the crate.

/// Prefix of a provider's default access key code.
pub const DEFAULT_KEY_CODE_PREFIX: &str = "yb-";

/// Suffix of a provider's default access key code.
pub const DEFAULT_KEY_CODE_SUFFIX: &str = "-key";

/// Subtask group names recorded on a task record.
pub mod groups {
    /// Input validation against current provider state.
    pub const VALIDATE_PARAMS: &str = "ValidateParams";
    /// Per-region creation of region and zone rows.
    pub const CREATE_REGIONS: &str = "CreateRegions";
    /// Provider-wide network bootstrap.
    pub const BOOTSTRAP_NETWORK: &str = "BootstrapNetwork";
    /// Access key import or provisioning.
    pub const PROVISION_ACCESS_KEYS: &str = "ProvisionAccessKeys";
    /// Provider-cloud-specific metadata seeding.
    pub const INITIALIZE_CLOUD: &str = "InitializeCloud";
    /// Deletion of rows created by a failed invocation.
    pub const ROLLBACK: &str = "Rollback";
}

/// Environment variables read by
/// [`CommissionerConfig::from_env`](crate::config::CommissionerConfig::from_env).
pub mod env {
    /// Worker pool size.
    pub const MAX_WORKERS: &str = "COMMISSIONER_MAX_WORKERS";
    /// Per-call timeout for collaborator calls, in milliseconds.
    pub const EXTERNAL_CALL_TIMEOUT_MS: &str = "COMMISSIONER_EXTERNAL_CALL_TIMEOUT_MS";
    /// Poll interval used while waiting on a task, in milliseconds.
    pub const POLL_INTERVAL_MS: &str = "COMMISSIONER_POLL_INTERVAL_MS";
}

/// Message attached to records found non-terminal by restart recovery.
pub const INTERRUPTED_MESSAGE: &str = "task was interrupted by a restart; resubmit to retry";
