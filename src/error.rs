//! Error types for the commissioner and for task bodies.
//!
//! Two error families exist:
//!
//! - [`CommissionerError`] is returned synchronously by the engine surface
//!   (submission, status queries, abort). Submission only fails for enqueue
//!   problems such as an unregistered task type.
//! - [`TaskError`] is produced inside a running task. It is never thrown back
//!   to the submitter; the worker converts it into a
//!   [`TaskFailure`](crate::domain::TaskFailure) attached to the record.
//!
//! Callers branch on [`ErrorKind`], not on the variant text.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{TaskPhase, TaskState};

/// Coarse classification of a task failure.
///
/// # Examples
///
/// ```
/// use commissioner::{ErrorKind, TaskError};
///
/// let err = TaskError::validation("unknown region code: fake-region");
/// assert_eq!(err.kind(), ErrorKind::Validation);
///
/// let err = TaskError::Timeout {
///     operation: "zone discovery".to_string(),
///     timeout_ms: 1_000,
/// };
/// assert_eq!(err.kind(), ErrorKind::ExternalCall);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input or a precondition on current state did not hold.
    /// Raised before any write.
    Validation,
    /// A collaborator call failed, returned an error payload, or timed out.
    ExternalCall,
    /// Reading or writing a persisted row failed.
    Persistence,
    /// The task was aborted, or interrupted by a restart.
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::ExternalCall => write!(f, "external_call"),
            Self::Persistence => write!(f, "persistence"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Errors raised by a task body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Input validation failed. No side effects have happened.
    #[error("validation failed: {message}")]
    Validation {
        /// What was wrong with the request.
        message: String,
    },

    /// A collaborator call failed or returned an error indicator.
    #[error("{operation} failed: {message}")]
    ExternalCall {
        /// Human-readable name of the call (e.g. `"network bootstrap"`).
        operation: String,
        /// Error reported by the collaborator.
        message: String,
    },

    /// A collaborator call did not complete within the configured timeout.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Human-readable name of the call.
        operation: String,
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// A row could not be written, read or deleted.
    #[error("persistence error: {message}")]
    Persistence {
        /// Description of the failure.
        message: String,
    },

    /// The task observed an abort request at a cancellation point.
    #[error("task was aborted")]
    Cancelled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`TaskError::ExternalCall`].
    pub fn external(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalCall {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Shorthand for [`TaskError::Persistence`].
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::ExternalCall { .. } | Self::Timeout { .. } => ErrorKind::ExternalCall,
            Self::Persistence { .. } => ErrorKind::Persistence,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Errors returned by the commissioner's synchronous surface.
///
/// # Examples
///
/// ```
/// use commissioner::CommissionerError;
/// use uuid::Uuid;
///
/// let id = Uuid::nil();
/// let err = CommissionerError::NotFound { task_id: id };
/// assert!(err.to_string().contains("task not found"));
/// ```
#[derive(Debug, Error)]
pub enum CommissionerError {
    /// The task type tag is not registered with this commissioner.
    #[error("task type is not registered: {task_type}")]
    UnknownTaskType {
        /// The tag that was submitted.
        task_type: String,
    },

    /// The submitted parameters could not be decoded for the task type.
    #[error("invalid parameters for {task_type}: {message}")]
    InvalidParams {
        /// The task type the parameters were submitted for.
        task_type: String,
        /// Decoder error.
        message: String,
    },

    /// No task record exists with this identifier.
    #[error("task not found: {task_id}")]
    NotFound {
        /// The unknown identifier.
        task_id: Uuid,
    },

    /// A state transition was rejected by the record state machine.
    #[error("invalid transition from {from} to {to} for task {task_id}")]
    InvalidTransition {
        /// The task being transitioned.
        task_id: Uuid,
        /// Current state.
        from: TaskState,
        /// Rejected target state.
        to: TaskState,
    },

    /// A body phase change was rejected by the phase state machine.
    #[error("invalid phase transition from {from:?} to {to} for task {task_id}")]
    InvalidPhaseTransition {
        /// The task being updated.
        task_id: Uuid,
        /// Current phase, `None` before the body started.
        from: Option<TaskPhase>,
        /// Rejected target phase.
        to: TaskPhase,
    },

    /// Optimistic concurrency check failed after all retries.
    #[error("concurrent modification of task {task_id}: expected version {expected}, found {actual}")]
    ConcurrentModification {
        /// The contended task.
        task_id: Uuid,
        /// Version the writer read.
        expected: u64,
        /// Version found in storage.
        actual: u64,
    },

    /// Backend storage failure.
    #[error("store error: {0}")]
    Store(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The commissioner no longer accepts submissions.
    #[error("commissioner is shutting down")]
    ShuttingDown,

    /// A task did not reach a terminal state within the wait timeout.
    #[error("timed out waiting for task {task_id}")]
    WaitTimeout {
        /// The task that was being awaited.
        task_id: Uuid,
    },
}
