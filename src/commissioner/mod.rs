//! Task submission, scheduling and status queries.
//!
//! A [`Commissioner`] owns the task store, the task registry and a bounded
//! worker pool. [`submit`](Commissioner::submit) creates a `created` record,
//! spawns a worker and returns the task id without waiting. The worker:
//!
//! 1. takes the provider lock for the task's scope (if any),
//! 2. takes a worker pool permit,
//! 3. moves the record `created -> running`,
//! 4. runs the task body through validation, commit and, on failure, rollback,
//! 5. moves the record to `success`, `failure` or `aborted`.
//!
//! Errors inside a task never surface from `submit`; they are attached to the
//! record. Callers poll [`get_status`](Commissioner::get_status) or use
//! [`wait_for_completion`](Commissioner::wait_for_completion).
//!
//! # Cancellation
//!
//! [`abort`](Commissioner::abort) is cooperative. A task that has not started
//! is marked `aborted` immediately and never runs. A running task observes the
//! request at its next cancellation point, rolls back its writes and ends
//! `aborted`. A collaborator call already in flight is not interrupted.

mod locks;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;
use uuid::Uuid;

use self::locks::ProviderLocks;
use crate::cloud::Collaborators;
use crate::config::CommissionerConfig;
use crate::constants::INTERRUPTED_MESSAGE;
use crate::domain::{TaskFailure, TaskRecord};
use crate::error::{CommissionerError, ErrorKind, TaskError};
use crate::store::{InMemoryTaskStore, TaskStore};
use crate::task::{TaskParams, TaskRegistry};
use crate::types::{TaskState, TaskType};

/// Builder for a [`Commissioner`].
///
/// Defaults: [`CommissionerConfig::default`], [`TaskRegistry::with_defaults`]
/// and an [`InMemoryTaskStore`].
pub struct CommissionerBuilder {
    collaborators: Collaborators,
    config: CommissionerConfig,
    registry: TaskRegistry,
    store: Option<Arc<dyn TaskStore>>,
}

impl std::fmt::Debug for CommissionerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommissionerBuilder")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("custom_store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

impl CommissionerBuilder {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            config: CommissionerConfig::default(),
            registry: TaskRegistry::with_defaults(),
            store: None,
        }
    }

    pub fn config(mut self, config: CommissionerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(mut self, registry: TaskRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Uses `store` for task records instead of a fresh in-memory store.
    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Validates the configuration and builds the commissioner.
    ///
    /// # Errors
    ///
    /// Returns [`CommissionerError::Config`] for an invalid configuration.
    pub fn build(self) -> Result<Commissioner, CommissionerError> {
        self.config.validate()?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryTaskStore::default()));
        tracing::debug!(
            max_workers = self.config.max_workers,
            registry = ?self.registry,
            "commissioner built"
        );
        Ok(Commissioner {
            inner: Arc::new(Inner {
                workers: Arc::new(Semaphore::new(self.config.max_workers)),
                config: self.config,
                registry: self.registry,
                store,
                collaborators: self.collaborators,
                tracker: TaskTracker::new(),
                shutdown: CancellationToken::new(),
                cancellations: DashMap::new(),
                admission: RwLock::new(()),
                provider_locks: ProviderLocks::new(),
            }),
        })
    }
}

pub(crate) struct Inner {
    config: CommissionerConfig,
    registry: TaskRegistry,
    store: Arc<dyn TaskStore>,
    collaborators: Collaborators,
    workers: Arc<Semaphore>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    /// Abort signals of tasks that have a live worker.
    cancellations: DashMap<Uuid, CancellationToken>,
    /// Held shared while a submission creates its record and registers its
    /// token, and exclusively by recovery.
    admission: RwLock<()>,
    provider_locks: ProviderLocks,
}

/// Accepts tasks, runs them on a bounded worker pool and answers status
/// queries. Cloning yields another handle to the same commissioner.
#[derive(Clone)]
pub struct Commissioner {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Commissioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commissioner")
            .field("config", &self.inner.config)
            .field("live_tasks", &self.inner.cancellations.len())
            .finish_non_exhaustive()
    }
}

impl Commissioner {
    /// Starts building a commissioner around `collaborators`.
    pub fn builder(collaborators: Collaborators) -> CommissionerBuilder {
        CommissionerBuilder::new(collaborators)
    }

    pub fn config(&self) -> &CommissionerConfig {
        &self.inner.config
    }

    /// Accepts a task and schedules it. Returns as soon as the record exists.
    ///
    /// # Errors
    ///
    /// - [`CommissionerError::ShuttingDown`] after [`shutdown`](Self::shutdown).
    /// - [`CommissionerError::UnknownTaskType`] if the type is not registered.
    /// - [`CommissionerError::InvalidParams`] if the parameters do not decode.
    /// - [`CommissionerError::Store`] if the record cannot be created.
    pub async fn submit(&self, task_type: TaskType, params: Value) -> Result<Uuid, CommissionerError> {
        let inner = &self.inner;
        if inner.shutdown.is_cancelled() {
            return Err(CommissionerError::ShuttingDown);
        }
        let task = inner.registry.build(task_type, &params)?;

        let admitted = inner.admission.read().await;
        let record = inner.store.create(task_type, params, task.lock_scope()).await?;
        let task_id = record.task_id;
        let cancel = CancellationToken::new();
        inner.cancellations.insert(task_id, cancel.clone());
        drop(admitted);

        let span = tracing::info_span!(
            "task",
            task_id = %task_id,
            task_type = %task_type,
            provider_id = ?record.provider_id
        );
        span.in_scope(|| tracing::info!("task submitted"));
        inner
            .tracker
            .spawn(Arc::clone(inner).run_worker(task_id, task, cancel).instrument(span));
        Ok(task_id)
    }

    /// Like [`submit`](Self::submit), with the type given by its tag.
    pub async fn submit_by_name(&self, task_type: &str, params: Value) -> Result<Uuid, CommissionerError> {
        self.submit(task_type.parse()?, params).await
    }

    /// Like [`submit`](Self::submit), with strongly typed parameters.
    pub async fn submit_params<P: TaskParams>(&self, params: &P) -> Result<Uuid, CommissionerError> {
        let value = serde_json::to_value(params).map_err(|e| CommissionerError::InvalidParams {
            task_type: P::TASK_TYPE.to_string(),
            message: e.to_string(),
        })?;
        self.submit(P::TASK_TYPE, value).await
    }

    /// Current snapshot of a task record.
    ///
    /// # Errors
    ///
    /// Returns [`CommissionerError::NotFound`] for unknown ids.
    pub async fn get_status(&self, task_id: Uuid) -> Result<TaskRecord, CommissionerError> {
        self.inner.store.get(task_id).await
    }

    /// All task records, newest first.
    pub async fn list_tasks(&self) -> Result<Vec<TaskRecord>, CommissionerError> {
        self.inner.store.list().await
    }

    /// Requests cancellation of a task.
    ///
    /// # Errors
    ///
    /// - [`CommissionerError::NotFound`] for unknown ids.
    /// - [`CommissionerError::InvalidTransition`] if the task already finished.
    pub async fn abort(&self, task_id: Uuid) -> Result<(), CommissionerError> {
        let record = self.inner.store.get(task_id).await?;
        if record.is_terminal() {
            return Err(CommissionerError::InvalidTransition {
                task_id,
                from: record.state,
                to: TaskState::Aborted,
            });
        }

        if let Some(token) = self.inner.cancellations.get(&task_id) {
            token.cancel();
        }

        if record.state == TaskState::Created {
            let failure = TaskFailure::from(&TaskError::Cancelled);
            match self
                .inner
                .store
                .transition_from(task_id, TaskState::Created, TaskState::Aborted, Some(failure))
                .await
            {
                Ok(_) => tracing::info!(task_id = %task_id, "task aborted before start"),
                // The worker started it first; it will observe the token.
                Err(CommissionerError::InvalidTransition { .. }) => {},
                Err(e) => return Err(e),
            }
        } else {
            tracing::info!(task_id = %task_id, "abort requested");
        }
        Ok(())
    }

    /// Polls a task until it reaches a terminal state.
    ///
    /// # Errors
    ///
    /// - [`CommissionerError::WaitTimeout`] if `timeout` elapses first.
    /// - [`CommissionerError::NotFound`] for unknown ids.
    pub async fn wait_for_completion(
        &self,
        task_id: Uuid,
        timeout: Duration,
    ) -> Result<TaskRecord, CommissionerError> {
        let poll_interval = self.inner.config.poll_interval();
        let poll = async {
            loop {
                match self.get_status(task_id).await {
                    Ok(record) if record.is_terminal() => return Ok(record),
                    Ok(_) => {},
                    Err(e) => return Err(e),
                }
                tokio::time::sleep(poll_interval).await;
            }
        };
        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(CommissionerError::WaitTimeout { task_id }),
        }
    }

    /// Marks every non-terminal record without a live worker as `aborted`.
    ///
    /// Call once at startup when the task store outlives the process: a task
    /// interrupted mid-run is not resumed and has to be resubmitted. Returns
    /// the ids that were closed out.
    ///
    /// Submissions made while recovery runs wait for it to finish, so a
    /// freshly submitted task is never mistaken for an interrupted one.
    pub async fn recover_interrupted(&self) -> Result<Vec<Uuid>, CommissionerError> {
        let _exclusive = self.inner.admission.write().await;
        let mut recovered = Vec::new();
        for record in self.inner.store.list().await? {
            if record.is_terminal() || self.inner.cancellations.contains_key(&record.task_id) {
                continue;
            }
            let failure = TaskFailure {
                kind: ErrorKind::Cancelled,
                message: INTERRUPTED_MESSAGE.to_string(),
            };
            match self
                .inner
                .store
                .transition_from(record.task_id, record.state, TaskState::Aborted, Some(failure))
                .await
            {
                Ok(_) => {
                    tracing::warn!(task_id = %record.task_id, from = %record.state, "interrupted task aborted");
                    recovered.push(record.task_id);
                },
                Err(CommissionerError::InvalidTransition { .. }) => {},
                Err(e) => return Err(e),
            }
        }
        Ok(recovered)
    }

    /// Stops accepting submissions and waits for every spawned worker to
    /// finish. Running tasks are not aborted.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.tracker.close();
        tracing::info!(in_flight = self.inner.tracker.len(), "commissioner shutting down");
        self.inner.tracker.wait().await;
        tracing::info!("commissioner stopped");
    }
}
