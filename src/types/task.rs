//! Task type tags and the task record lifecycle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CommissionerError;

/// Tag identifying which task body a submission runs.
///
/// Tags are resolved against a [`TaskRegistry`](crate::task::TaskRegistry)
/// once per submission; there is no reflective lookup.
///
/// # Examples
///
/// ```
/// use commissioner::TaskType;
///
/// let parsed: TaskType = "CloudBootstrap".parse().unwrap();
/// assert_eq!(parsed, TaskType::CloudBootstrap);
/// assert_eq!(parsed.to_string(), "CloudBootstrap");
/// assert!("RebootUniverse".parse::<TaskType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    /// Bootstrap a provider's regions, or add regions to it.
    CloudBootstrap,
}

impl TaskType {
    /// All known task types.
    pub const ALL: &'static [TaskType] = &[TaskType::CloudBootstrap];

    /// The stable string tag for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CloudBootstrap => "CloudBootstrap",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = CommissionerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CommissionerError::UnknownTaskType {
                task_type: s.to_string(),
            })
    }
}

/// Lifecycle state of a task record.
///
/// # State Machine
///
/// ```text
/// Created -> Running, Aborted
/// Running -> Success, Failure, Aborted
/// Success -> (terminal)
/// Failure -> (terminal)
/// Aborted -> (terminal)
/// ```
///
/// Self-transitions are rejected.
///
/// # Examples
///
/// ```
/// use commissioner::TaskState;
///
/// assert!(TaskState::Created.can_transition_to(&TaskState::Running));
/// assert!(!TaskState::Created.can_transition_to(&TaskState::Success));
/// assert!(!TaskState::Failure.can_transition_to(&TaskState::Running));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Accepted and waiting for a worker.
    Created,
    /// A worker is executing the task body.
    Running,
    /// The task body completed (terminal).
    Success,
    /// The task body failed and its writes were rolled back (terminal).
    Failure,
    /// The task was aborted before or during execution (terminal).
    Aborted,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

impl TaskState {
    /// Returns `true` for `Success`, `Failure` and `Aborted`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Aborted)
    }

    /// Returns `true` if moving from this state to `next` is allowed.
    pub fn can_transition_to(&self, next: &Self) -> bool {
        match self {
            Self::Created => matches!(next, Self::Running | Self::Aborted),
            Self::Running => matches!(next, Self::Success | Self::Failure | Self::Aborted),
            Self::Success | Self::Failure | Self::Aborted => false,
        }
    }

    /// Validates a transition, returning
    /// [`CommissionerError::InvalidTransition`] when it is not allowed.
    pub fn validate_transition(&self, task_id: Uuid, next: &Self) -> Result<(), CommissionerError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(CommissionerError::InvalidTransition {
                task_id,
                from: *self,
                to: *next,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!TaskState::Created.is_terminal());
        assert!(!TaskState::Running.is_terminal());
        assert!(TaskState::Success.is_terminal());
        assert!(TaskState::Failure.is_terminal());
        assert!(TaskState::Aborted.is_terminal());
    }

    #[test]
    fn created_cannot_skip_running() {
        assert!(!TaskState::Created.can_transition_to(&TaskState::Success));
        assert!(!TaskState::Created.can_transition_to(&TaskState::Failure));
        assert!(TaskState::Created.can_transition_to(&TaskState::Aborted));
    }

    #[test]
    fn self_transitions_rejected() {
        for state in [TaskState::Created, TaskState::Running, TaskState::Success] {
            assert!(!state.can_transition_to(&state));
        }
    }

    #[test]
    fn validate_transition_reports_states() {
        let err = TaskState::Success
            .validate_transition(Uuid::nil(), &TaskState::Running)
            .unwrap_err();
        match err {
            CommissionerError::InvalidTransition { from, to, .. } => {
                assert_eq!(from, TaskState::Success);
                assert_eq!(to, TaskState::Running);
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn state_serializes_snake_case() {
        let json = serde_json::to_value(TaskState::Aborted).unwrap();
        assert_eq!(json, "aborted");
    }

    #[test]
    fn unknown_task_type_tag() {
        let err = "Nope".parse::<TaskType>().unwrap_err();
        assert!(matches!(err, CommissionerError::UnknownTaskType { .. }));
    }
}
