//! Worker body: runs one submitted task from `created` to a terminal state.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::Inner;
use crate::domain::TaskFailure;
use crate::error::TaskError;
use crate::task::{self, panic_error, Task, TaskContext};
use crate::types::TaskState;

impl Inner {
    /// Drives one task. Runs inside the task's tracing span.
    pub(super) async fn run_worker(
        self: Arc<Self>,
        task_id: Uuid,
        task: Arc<dyn Task>,
        cancel: CancellationToken,
    ) {
        // Provider lock before the worker permit, so tasks queued behind a
        // busy provider do not occupy pool slots.
        let _provider_guard = match task.lock_scope() {
            Some(provider_id) => Some(self.provider_locks.acquire(provider_id).await),
            None => None,
        };
        let _permit = match Arc::clone(&self.workers).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                tracing::error!("worker pool closed before the task could start");
                self.abort_unstarted(task_id).await;
                return;
            },
        };

        if cancel.is_cancelled() {
            tracing::info!("task aborted before start");
            self.abort_unstarted(task_id).await;
            return;
        }

        if let Err(e) = self
            .store
            .transition_from(task_id, TaskState::Created, TaskState::Running, None)
            .await
        {
            tracing::info!(error = %e, "task no longer runnable");
            self.cancellations.remove(&task_id);
            return;
        }
        tracing::info!("task running");

        let ctx = TaskContext::new(
            task_id,
            Arc::clone(&self.store),
            self.collaborators.clone(),
            cancel,
            self.config.external_call_timeout(),
        );
        let outcome = AssertUnwindSafe(task::execute(task.as_ref(), &ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panic_error(payload)));

        let (state, failure) = match outcome {
            Ok(()) => (TaskState::Success, None),
            Err(TaskError::Cancelled) => (
                TaskState::Aborted,
                Some(TaskFailure::from(&TaskError::Cancelled)),
            ),
            Err(e) => (TaskState::Failure, Some(TaskFailure::from(&e))),
        };
        self.finish(task_id, TaskState::Running, state, failure).await;
    }

    async fn abort_unstarted(&self, task_id: Uuid) {
        let failure = TaskFailure::from(&TaskError::Cancelled);
        self.finish(task_id, TaskState::Created, TaskState::Aborted, Some(failure))
            .await;
    }

    /// Writes the terminal state and forgets the task's cancellation token.
    async fn finish(
        &self,
        task_id: Uuid,
        from: TaskState,
        to: TaskState,
        failure: Option<TaskFailure>,
    ) {
        let message = failure.as_ref().map(|f| f.message.clone());
        match self.store.transition_from(task_id, from, to, failure).await {
            Ok(_) => match to {
                TaskState::Success => tracing::info!("task succeeded"),
                TaskState::Aborted => tracing::warn!(error = ?message, "task aborted"),
                _ => tracing::warn!(state = %to, error = ?message, "task failed"),
            },
            // An unstarted task may already have been aborted by the caller.
            Err(e) if from == TaskState::Created => {
                tracing::debug!(state = %to, error = %e, "terminal state already recorded")
            },
            Err(e) => tracing::error!(state = %to, error = %e, "failed to record terminal state"),
        }
        self.cancellations.remove(&task_id);
    }
}
