//! Domain types for the persisted task record.
//!
//! [`TaskRecord`] is what the commissioner stores and what status queries
//! return. It carries the submitted parameters verbatim, the lifecycle
//! [`TaskState`](crate::types::TaskState), the body's current
//! [`TaskPhase`](crate::types::TaskPhase), an ordered log of subtask groups,
//! and the failure detail once the task ends badly.

pub mod record;

pub use record::*;
