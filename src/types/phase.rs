//! Progress of a task body while its record is `running`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase of a task body.
///
/// ```text
/// Validating  -> Committing, Failed
/// Committing  -> Succeeded, RollingBack
/// RollingBack -> Failed
/// Succeeded, Failed -> (terminal)
/// ```
///
/// A validation failure goes straight to `Failed` because nothing has been
/// written yet. There is no partial-success phase.
///
/// # Examples
///
/// ```
/// use commissioner::TaskPhase;
///
/// assert!(TaskPhase::Validating.can_transition_to(&TaskPhase::Committing));
/// assert!(TaskPhase::Committing.can_transition_to(&TaskPhase::RollingBack));
/// assert!(!TaskPhase::RollingBack.can_transition_to(&TaskPhase::Succeeded));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    /// Checking inputs against current state. No writes.
    Validating,
    /// Creating rows and calling collaborators.
    Committing,
    /// Undoing this invocation's writes after a failure.
    RollingBack,
    /// Every step completed.
    Succeeded,
    /// The body failed; any writes were rolled back.
    Failed,
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validating => write!(f, "validating"),
            Self::Committing => write!(f, "committing"),
            Self::RollingBack => write!(f, "rolling_back"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl TaskPhase {
    /// Returns `true` for `Succeeded` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns `true` if moving from this phase to `next` is allowed.
    pub fn can_transition_to(&self, next: &Self) -> bool {
        match self {
            Self::Validating => matches!(next, Self::Committing | Self::Failed),
            Self::Committing => matches!(next, Self::Succeeded | Self::RollingBack),
            Self::RollingBack => matches!(next, Self::Failed),
            Self::Succeeded | Self::Failed => false,
        }
    }
}

/// Outcome of one subtask group in the record's log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTaskGroupState {
    /// The group has started and not finished.
    Running,
    /// The group finished without error.
    Success,
    /// The group returned an error.
    Failure,
}
