//! Task record storage.
//!
//! # Architecture
//!
//! The storage system has three layers:
//!
//! 1. **[`TaskStore`]** -- The object-safe interface the commissioner and
//!    [`TaskContext`](crate::task::TaskContext) hold as `Arc<dyn TaskStore>`.
//!
//! 2. **[`GenericTaskStore<B>`](generic::GenericTaskStore)** -- All domain
//!    logic (record state machine, phase state machine, subtask group log,
//!    CAS-based mutations with retry, JSON serialization). Has a blanket
//!    `TaskStore` impl.
//!
//! 3. **[`StorageBackend`]** -- Dumb KV trait that backends implement.
//!
//! [`InMemoryTaskStore`](memory::InMemoryTaskStore) is the in-process
//! default.

pub mod backend;
pub mod generic;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

pub use backend::{StorageBackend, StorageError, VersionedRecord};
pub use generic::GenericTaskStore;
pub use memory::{InMemoryBackend, InMemoryTaskStore};

use crate::domain::{TaskFailure, TaskRecord};
use crate::error::CommissionerError;
use crate::types::{TaskPhase, TaskState, TaskType};

/// Store tuning.
///
/// # Examples
///
/// ```
/// use commissioner::store::StoreConfig;
///
/// let config = StoreConfig::default();
/// assert_eq!(config.max_cas_retries, 5);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How many times a mutation is re-read and re-applied after a version
    /// conflict before [`CommissionerError::ConcurrentModification`] is
    /// returned.
    pub max_cas_retries: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_cas_retries: 5 }
    }
}

/// Object-safe interface for task record storage.
///
/// Every mutation is validated against the record's current contents, so
/// concurrent writers (a worker finishing a task and a caller aborting it)
/// cannot move a record backwards or out of a terminal state.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Creates a record in the `created` state.
    async fn create(
        &self,
        task_type: TaskType,
        params: Value,
        provider_id: Option<Uuid>,
    ) -> Result<TaskRecord, CommissionerError>;

    /// Returns the current snapshot of a record.
    ///
    /// # Errors
    ///
    /// - [`CommissionerError::NotFound`] for unknown identifiers.
    async fn get(&self, task_id: Uuid) -> Result<TaskRecord, CommissionerError>;

    /// Moves a record from exactly `from` to `to`, attaching `failure` if
    /// given. Terminal transitions also stamp `completed_at`.
    ///
    /// # Errors
    ///
    /// - [`CommissionerError::NotFound`] for unknown identifiers.
    /// - [`CommissionerError::InvalidTransition`] if the record is not in
    ///   `from` or the state machine rejects the move.
    async fn transition_from(
        &self,
        task_id: Uuid,
        from: TaskState,
        to: TaskState,
        failure: Option<TaskFailure>,
    ) -> Result<TaskRecord, CommissionerError>;

    /// Records the task body's phase. Only allowed while `running`.
    ///
    /// # Errors
    ///
    /// - [`CommissionerError::InvalidPhaseTransition`] if the phase machine
    ///   rejects it or the record is not running.
    async fn set_phase(
        &self,
        task_id: Uuid,
        phase: TaskPhase,
    ) -> Result<TaskRecord, CommissionerError>;

    /// Appends a `running` subtask group and returns its index in the log.
    async fn begin_group(&self, task_id: Uuid, name: &str) -> Result<usize, CommissionerError>;

    /// Finishes the subtask group at `index`; `error` decides its outcome.
    async fn finish_group(
        &self,
        task_id: Uuid,
        index: usize,
        error: Option<String>,
    ) -> Result<TaskRecord, CommissionerError>;

    /// Lists all records, newest first.
    async fn list(&self) -> Result<Vec<TaskRecord>, CommissionerError>;
}

#[async_trait]
impl<B: StorageBackend + 'static> TaskStore for GenericTaskStore<B> {
    async fn create(
        &self,
        task_type: TaskType,
        params: Value,
        provider_id: Option<Uuid>,
    ) -> Result<TaskRecord, CommissionerError> {
        self.create(task_type, params, provider_id).await
    }

    async fn get(&self, task_id: Uuid) -> Result<TaskRecord, CommissionerError> {
        self.get(task_id).await
    }

    async fn transition_from(
        &self,
        task_id: Uuid,
        from: TaskState,
        to: TaskState,
        failure: Option<TaskFailure>,
    ) -> Result<TaskRecord, CommissionerError> {
        self.transition_from(task_id, from, to, failure).await
    }

    async fn set_phase(
        &self,
        task_id: Uuid,
        phase: TaskPhase,
    ) -> Result<TaskRecord, CommissionerError> {
        self.set_phase(task_id, phase).await
    }

    async fn begin_group(&self, task_id: Uuid, name: &str) -> Result<usize, CommissionerError> {
        self.begin_group(task_id, name).await
    }

    async fn finish_group(
        &self,
        task_id: Uuid,
        index: usize,
        error: Option<String>,
    ) -> Result<TaskRecord, CommissionerError> {
        self.finish_group(task_id, index, error).await
    }

    async fn list(&self) -> Result<Vec<TaskRecord>, CommissionerError> {
        self.list().await
    }
}
