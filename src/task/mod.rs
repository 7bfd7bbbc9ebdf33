//! The task contract and its execution driver.
//!
//! A [`Task`] is one unit of orchestration work. It validates against current
//! state with no side effects, then commits, recording every row it creates in
//! a [`RollbackLedger`]. [`execute`] drives a task through the body phase
//! machine:
//!
//! ```text
//! Validating -> Committing -> Succeeded
//!     |              |
//!     v              v
//!   Failed <---- RollingBack
//! ```
//!
//! A commit failure (including an observed abort) rolls back exactly the
//! rows in that invocation's ledger.

pub mod context;
pub mod ledger;
pub mod registry;

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use uuid::Uuid;

pub use context::TaskContext;
pub use ledger::{CreatedEntity, RollbackLedger, RollbackReport};
pub use registry::{TaskFactory, TaskRegistry};

use crate::constants::groups;
use crate::error::TaskError;
use crate::types::{TaskPhase, TaskType};

/// A unit of orchestration work.
#[async_trait]
pub trait Task: Send + Sync {
    /// The tag this body is registered under.
    fn task_type(&self) -> TaskType;

    /// The provider whose state this task reads and extends. Tasks sharing a
    /// scope never run at the same time.
    fn lock_scope(&self) -> Option<Uuid>;

    /// Checks the request against current state. Must not write anything.
    async fn validate(&self, ctx: &TaskContext) -> Result<(), TaskError>;

    /// Performs the writes. Every created row goes into `ledger` before the
    /// next step starts.
    async fn run(&self, ctx: &TaskContext, ledger: &mut RollbackLedger) -> Result<(), TaskError>;
}

/// Strongly typed parameters for a registered task type.
pub trait TaskParams: Serialize {
    /// The task type these parameters belong to.
    const TASK_TYPE: TaskType;
}

/// Converts a caught panic payload into a task error.
pub(crate) fn panic_error(payload: Box<dyn Any + Send>) -> TaskError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    TaskError::external("task body", format!("panicked: {message}"))
}

/// Runs `task` through validation and commit, rolling back on a commit
/// failure. Returns the error that ended the body, never a rollback error.
pub async fn execute(task: &dyn Task, ctx: &TaskContext) -> Result<(), TaskError> {
    ctx.set_phase(TaskPhase::Validating).await?;

    let validated = ctx
        .run_group(groups::VALIDATE_PARAMS, async {
            ctx.ensure_active()?;
            task.validate(ctx).await
        })
        .await;
    if let Err(e) = validated {
        tracing::info!(task_id = %ctx.task_id(), error = %e, "validation failed, nothing to undo");
        if let Err(phase_error) = ctx.set_phase(TaskPhase::Failed).await {
            tracing::error!(task_id = %ctx.task_id(), error = %phase_error, "failed to record failed phase");
        }
        return Err(e);
    }

    ctx.set_phase(TaskPhase::Committing).await?;
    let mut ledger = RollbackLedger::new();
    let committed = AssertUnwindSafe(task.run(ctx, &mut ledger))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(panic_error(payload)));

    // A commit is only done once its success is on the record.
    let error = match committed {
        Ok(()) => match ctx.set_phase(TaskPhase::Succeeded).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        },
        Err(e) => e,
    };

    tracing::warn!(
        task_id = %ctx.task_id(),
        error = %error,
        entries = ledger.len(),
        "commit failed, rolling back"
    );
    if let Err(e) = ctx.set_phase(TaskPhase::RollingBack).await {
        tracing::error!(task_id = %ctx.task_id(), error = %e, "failed to record rollback phase");
    }

    let rolled_back = ctx
        .run_group(groups::ROLLBACK, async move {
            let report = ledger.rollback(ctx.infra()).await;
            if report.is_clean() {
                Ok(())
            } else {
                Err(TaskError::persistence(format!(
                    "{} of {} rows could not be deleted",
                    report.failed.len(),
                    report.failed.len() + report.deleted.len()
                )))
            }
        })
        .await;
    if let Err(e) = rolled_back {
        tracing::error!(task_id = %ctx.task_id(), error = %e, "rollback incomplete");
    }

    if let Err(e) = ctx.set_phase(TaskPhase::Failed).await {
        tracing::error!(task_id = %ctx.task_id(), error = %e, "failed to record final phase");
    }
    Err(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_rendered() {
        let err = panic_error(Box::new("boom"));
        assert_eq!(err.to_string(), "task body failed: panicked: boom");
        let err = panic_error(Box::new(String::from("bang")));
        assert!(err.to_string().ends_with("panicked: bang"));
        let err = panic_error(Box::new(7_u8));
        assert!(err.to_string().ends_with("unknown panic"));
    }
}
