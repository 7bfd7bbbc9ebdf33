//! External collaborators consumed by task bodies.
//!
//! Every trait here is a synchronous-looking call into a service outside the
//! crate (cloud APIs, key management, pricing seeders). Task bodies never call
//! them directly; they go through
//! [`TaskContext::call`](crate::task::TaskContext::call), which bounds each call
//! with the configured timeout and maps [`CloudError`] into
//! [`TaskError::ExternalCall`](crate::TaskError::ExternalCall).

pub mod access;
pub mod initializer;
pub mod metadata;
pub mod network;

use std::sync::Arc;

use thiserror::Error;

pub use access::{AccessKeyManager, AddKeyRequest, ImportKeyRequest, KeyOptions};
pub use initializer::{CloudInitializer, InitializerSet};
pub use metadata::{CloudMetadata, RegionMetadata};
pub use network::{bootstrap_error, NetworkManager};

use crate::infra::InfraStore;

/// Error reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CloudError {
    /// Collaborator-supplied description.
    pub message: String,
}

impl CloudError {
    /// Creates an error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The set of collaborators a commissioner hands to every task.
#[derive(Clone)]
pub struct Collaborators {
    /// Row persistence.
    pub infra: Arc<dyn InfraStore>,
    /// Region catalog, zone discovery and image lookup.
    pub metadata: Arc<dyn CloudMetadata>,
    /// Provider network bootstrap.
    pub network: Arc<dyn NetworkManager>,
    /// SSH key provisioning and import.
    pub access_keys: Arc<dyn AccessKeyManager>,
    /// Per-cloud metadata seeders.
    pub initializers: InitializerSet,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("initializers", &self.initializers)
            .finish_non_exhaustive()
    }
}
