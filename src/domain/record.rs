//! Task record -- the store's representation of one submitted task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ErrorKind, TaskError};
use crate::types::{SubTaskGroupState, TaskPhase, TaskState, TaskType};

/// Failure detail retained on a record for inspection.
///
/// # Examples
///
/// ```
/// use commissioner::{ErrorKind, TaskError, TaskFailure};
///
/// let failure = TaskFailure::from(&TaskError::external("network bootstrap", "boom"));
/// assert_eq!(failure.kind, ErrorKind::ExternalCall);
/// assert_eq!(failure.message, "network bootstrap failed: boom");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFailure {
    /// Classification used by callers to branch.
    pub kind: ErrorKind,
    /// Rendered error message.
    pub message: String,
}

impl From<&TaskError> for TaskFailure {
    fn from(err: &TaskError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// One entry in a record's subtask group log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTaskGroupRecord {
    /// Group name (see [`constants::groups`](crate::constants::groups)).
    pub name: String,
    /// Current outcome of the group.
    pub state: SubTaskGroupState,
    /// When the group started.
    pub started_at: DateTime<Utc>,
    /// When the group finished, if it has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Error message if the group failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Persisted representation of a task.
///
/// Records are owned by the commissioner. Only the worker executing the task
/// mutates it (plus an abort request moving a `created` record to
/// `aborted`); once terminal a record is never written again.
///
/// # Construction
///
/// ```
/// use commissioner::{TaskRecord, TaskState, TaskType};
/// use serde_json::json;
///
/// let record = TaskRecord::new(TaskType::CloudBootstrap, json!({"regionAddOnly": false}), None);
/// assert_eq!(record.state, TaskState::Created);
/// assert!(record.phase.is_none());
/// assert!(record.subtask_groups.is_empty());
/// assert!(record.failure.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Stable identifier returned by `submit`.
    pub task_id: Uuid,

    /// Which task body this record runs.
    pub task_type: TaskType,

    /// Submitted parameters, serialized as received.
    pub params: Value,

    /// The provider whose region set this task reads and extends, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<Uuid>,

    /// Lifecycle state.
    pub state: TaskState,

    /// Body phase, set once a worker starts the task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<TaskPhase>,

    /// Ordered log of subtask groups.
    #[serde(default)]
    pub subtask_groups: Vec<SubTaskGroupRecord>,

    /// Error detail for `failure` and `aborted` records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<TaskFailure>,

    /// Submission time.
    pub created_at: DateTime<Utc>,

    /// Last mutation time.
    pub updated_at: DateTime<Utc>,

    /// Time the record reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Storage version used for compare-and-swap writes. Not serialized;
    /// the store fills it in on every read.
    #[serde(skip)]
    pub version: u64,
}

impl TaskRecord {
    /// Creates a new record in the `created` state with a fresh `UUIDv4`.
    pub fn new(task_type: TaskType, params: Value, provider_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            task_id: Uuid::new_v4(),
            task_type,
            params,
            provider_id,
            state: TaskState::Created,
            phase: None,
            subtask_groups: Vec::new(),
            failure: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            version: 0,
        }
    }

    /// Returns `true` once the record can no longer change.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Looks up the most recent subtask group with the given name.
    pub fn group(&self, name: &str) -> Option<&SubTaskGroupRecord> {
        self.subtask_groups.iter().rev().find(|g| g.name == name)
    }
}
