//! Execution context handed to a running task body.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cloud::{CloudError, Collaborators};
use crate::error::TaskError;
use crate::infra::InfraStore;
use crate::store::TaskStore;
use crate::types::TaskPhase;

/// Everything a task body needs while it runs: its record, its
/// collaborators, its cancellation signal and the call timeout.
///
/// Cloning is cheap; all fields are shared handles.
#[derive(Clone)]
pub struct TaskContext {
    task_id: Uuid,
    store: Arc<dyn TaskStore>,
    collaborators: Collaborators,
    cancel: CancellationToken,
    call_timeout: Duration,
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("task_id", &self.task_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl TaskContext {
    pub fn new(
        task_id: Uuid,
        store: Arc<dyn TaskStore>,
        collaborators: Collaborators,
        cancel: CancellationToken,
        call_timeout: Duration,
    ) -> Self {
        Self {
            task_id,
            store,
            collaborators,
            cancel,
            call_timeout,
        }
    }

    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Shorthand for the row store.
    pub fn infra(&self) -> &dyn InfraStore {
        self.collaborators.infra.as_ref()
    }

    /// `true` once an abort has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancellation point. Task bodies call this between steps.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Cancelled`] if an abort has been requested.
    pub fn ensure_active(&self) -> Result<(), TaskError> {
        if self.cancel.is_cancelled() {
            tracing::warn!(task_id = %self.task_id, "abort observed");
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Runs one collaborator call under the configured timeout.
    ///
    /// An in-flight call is not interrupted by an abort; the abort is
    /// observed at the next [`ensure_active`](Self::ensure_active).
    ///
    /// # Errors
    ///
    /// - [`TaskError::Timeout`] if the call does not finish in time.
    /// - [`TaskError::ExternalCall`] if the collaborator reports an error.
    pub async fn call<T, F>(&self, operation: &str, call: F) -> Result<T, TaskError>
    where
        F: Future<Output = Result<T, CloudError>>,
    {
        tracing::debug!(task_id = %self.task_id, operation, "calling collaborator");
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(TaskError::external(operation, e.message)),
            Err(_) => Err(TaskError::Timeout {
                operation: operation.to_string(),
                timeout_ms: u64::try_from(self.call_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    /// Records the body's phase on the task record.
    pub async fn set_phase(&self, phase: TaskPhase) -> Result<(), TaskError> {
        self.store
            .set_phase(self.task_id, phase)
            .await
            .map_err(|e| TaskError::persistence(e.to_string()))?;
        tracing::debug!(task_id = %self.task_id, phase = %phase, "phase changed");
        Ok(())
    }

    /// Runs `body` as a named subtask group, logging its start and outcome
    /// on the task record.
    pub async fn run_group<T, F>(&self, name: &str, body: F) -> Result<T, TaskError>
    where
        F: Future<Output = Result<T, TaskError>>,
    {
        let index = self
            .store
            .begin_group(self.task_id, name)
            .await
            .map_err(|e| TaskError::persistence(e.to_string()))?;
        tracing::debug!(task_id = %self.task_id, group = name, "subtask group started");

        let result = body.await;

        let error = result.as_ref().err().map(ToString::to_string);
        if let Err(e) = self.store.finish_group(self.task_id, index, error).await {
            tracing::error!(task_id = %self.task_id, group = name, error = %e, "failed to record group outcome");
            if result.is_ok() {
                return Err(TaskError::persistence(e.to_string()));
            }
        }
        match &result {
            Ok(_) => tracing::debug!(task_id = %self.task_id, group = name, "subtask group succeeded"),
            Err(e) => tracing::warn!(task_id = %self.task_id, group = name, error = %e, "subtask group failed"),
        }
        result
    }
}
