//! Generic task store with all domain logic delegating to a [`StorageBackend`].
//!
//! [`GenericTaskStore`] implements every record operation (lifecycle
//! transitions, body phase updates, subtask group log, JSON serialization)
//! on top of any [`StorageBackend`].
//!
//! # CAS Semantics
//!
//! All mutations go through a read-modify-write loop that writes with
//! [`StorageBackend::put_if_version`]. On a version conflict the record is
//! re-read and the mutation re-validated against the fresh contents, up to
//! [`StoreConfig::max_cas_retries`] times. A mutation that is no longer
//! valid after the re-read (for example a worker finishing a task that was
//! aborted in the meantime) fails with the state machine error rather than
//! overwriting.

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{SubTaskGroupRecord, TaskFailure, TaskRecord};
use crate::error::CommissionerError;
use crate::store::backend::{make_key, StorageBackend, StorageError, TASK_KEY_PREFIX};
use crate::store::StoreConfig;
use crate::types::{SubTaskGroupState, TaskPhase, TaskState, TaskType};

/// Task store that delegates raw storage to a [`StorageBackend`].
///
/// # Type Parameters
///
/// * `B` - A [`StorageBackend`] implementation.
#[derive(Debug)]
pub struct GenericTaskStore<B: StorageBackend> {
    backend: B,
    config: StoreConfig,
}

impl<B: StorageBackend + Default> Default for GenericTaskStore<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}

impl<B: StorageBackend> GenericTaskStore<B> {
    /// Creates a store over `backend` with [`StoreConfig::default`].
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: StoreConfig::default(),
        }
    }

    /// Sets the store configuration.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ---- Serialization helpers (private) ----

    fn serialize_record(record: &TaskRecord) -> Result<Vec<u8>, CommissionerError> {
        serde_json::to_vec(record).map_err(|e| {
            CommissionerError::Store(format!("failed to serialize TaskRecord: {e}"))
        })
    }

    fn deserialize_record(data: &[u8]) -> Result<TaskRecord, CommissionerError> {
        serde_json::from_slice(data).map_err(|e| {
            CommissionerError::Store(format!("failed to deserialize TaskRecord: {e}"))
        })
    }

    fn map_storage_error(err: StorageError, task_id: Uuid) -> CommissionerError {
        match err {
            StorageError::NotFound { .. } => CommissionerError::NotFound { task_id },
            StorageError::VersionConflict {
                expected, actual, ..
            } => CommissionerError::ConcurrentModification {
                task_id,
                expected,
                actual,
            },
            StorageError::Backend { message, .. } => CommissionerError::Store(message),
        }
    }

    async fn load(&self, task_id: Uuid) -> Result<TaskRecord, CommissionerError> {
        let versioned = self
            .backend
            .get(&make_key(task_id))
            .await
            .map_err(|e| Self::map_storage_error(e, task_id))?;
        let mut record = Self::deserialize_record(&versioned.data)?;
        record.version = versioned.version;
        Ok(record)
    }

    /// Read-modify-write with CAS and bounded retry.
    async fn mutate<F>(&self, task_id: Uuid, mut apply: F) -> Result<TaskRecord, CommissionerError>
    where
        F: FnMut(&mut TaskRecord) -> Result<(), CommissionerError> + Send,
    {
        let key = make_key(task_id);
        let mut attempt = 0;
        loop {
            let mut record = self.load(task_id).await?;
            let expected = record.version;
            apply(&mut record)?;
            record.updated_at = Utc::now();

            let bytes = Self::serialize_record(&record)?;
            match self.backend.put_if_version(&key, &bytes, expected).await {
                Ok(version) => {
                    record.version = version;
                    return Ok(record);
                },
                Err(StorageError::VersionConflict {
                    expected, actual, ..
                }) if attempt < self.config.max_cas_retries => {
                    attempt += 1;
                    tracing::debug!(
                        task_id = %task_id,
                        expected,
                        actual,
                        attempt,
                        "version conflict on task record, retrying"
                    );
                },
                Err(e) => return Err(Self::map_storage_error(e, task_id)),
            }
        }
    }

    // ---- Domain operations (public) ----

    /// Creates a record in the `created` state.
    pub async fn create(
        &self,
        task_type: TaskType,
        params: Value,
        provider_id: Option<Uuid>,
    ) -> Result<TaskRecord, CommissionerError> {
        let mut record = TaskRecord::new(task_type, params, provider_id);
        let bytes = Self::serialize_record(&record)?;
        record.version = self
            .backend
            .put(&make_key(record.task_id), &bytes)
            .await
            .map_err(|e| Self::map_storage_error(e, record.task_id))?;
        Ok(record)
    }

    /// Returns the current snapshot of a record.
    pub async fn get(&self, task_id: Uuid) -> Result<TaskRecord, CommissionerError> {
        self.load(task_id).await
    }

    /// Moves a record from `from` to `to`, validating against the lifecycle
    /// state machine. Fails if the record is no longer in `from`.
    pub async fn transition_from(
        &self,
        task_id: Uuid,
        from: TaskState,
        to: TaskState,
        failure: Option<TaskFailure>,
    ) -> Result<TaskRecord, CommissionerError> {
        self.mutate(task_id, |record| {
            if record.state != from {
                return Err(CommissionerError::InvalidTransition {
                    task_id,
                    from: record.state,
                    to,
                });
            }
            record.state.validate_transition(task_id, &to)?;
            record.state = to;
            if failure.is_some() {
                record.failure = failure.clone();
            }
            if to.is_terminal() {
                record.completed_at = Some(Utc::now());
            }
            Ok(())
        })
        .await
    }

    /// Records the body phase of a running task.
    pub async fn set_phase(
        &self,
        task_id: Uuid,
        phase: TaskPhase,
    ) -> Result<TaskRecord, CommissionerError> {
        self.mutate(task_id, |record| {
            let allowed = record.state == TaskState::Running
                && match record.phase {
                    None => phase == TaskPhase::Validating,
                    Some(current) => current.can_transition_to(&phase),
                };
            if !allowed {
                return Err(CommissionerError::InvalidPhaseTransition {
                    task_id,
                    from: record.phase,
                    to: phase,
                });
            }
            record.phase = Some(phase);
            Ok(())
        })
        .await
    }

    /// Appends a running subtask group and returns its index.
    pub async fn begin_group(&self, task_id: Uuid, name: &str) -> Result<usize, CommissionerError> {
        let record = self
            .mutate(task_id, |record| {
                if record.is_terminal() {
                    return Err(CommissionerError::Store(format!(
                        "cannot start group {name} on {} task {task_id}",
                        record.state
                    )));
                }
                record.subtask_groups.push(SubTaskGroupRecord {
                    name: name.to_string(),
                    state: SubTaskGroupState::Running,
                    started_at: Utc::now(),
                    finished_at: None,
                    error: None,
                });
                Ok(())
            })
            .await?;
        Ok(record.subtask_groups.len() - 1)
    }

    /// Finishes the subtask group at `index`.
    pub async fn finish_group(
        &self,
        task_id: Uuid,
        index: usize,
        error: Option<String>,
    ) -> Result<TaskRecord, CommissionerError> {
        self.mutate(task_id, |record| {
            let group = record.subtask_groups.get_mut(index).ok_or_else(|| {
                CommissionerError::Store(format!(
                    "task {task_id} has no subtask group at index {index}"
                ))
            })?;
            group.state = if error.is_some() {
                SubTaskGroupState::Failure
            } else {
                SubTaskGroupState::Success
            };
            group.finished_at = Some(Utc::now());
            group.error = error.clone();
            Ok(())
        })
        .await
    }

    /// Lists all records, newest first. Unreadable entries are skipped.
    pub async fn list(&self) -> Result<Vec<TaskRecord>, CommissionerError> {
        let entries = self
            .backend
            .list_by_prefix(TASK_KEY_PREFIX)
            .await
            .map_err(|e| CommissionerError::Store(e.to_string()))?;

        let mut records: Vec<TaskRecord> = entries
            .into_iter()
            .filter_map(|(key, versioned)| match Self::deserialize_record(&versioned.data) {
                Ok(mut record) => {
                    record.version = versioned.version;
                    Some(record)
                },
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "skipping unreadable task record");
                    None
                },
            })
            .collect();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
