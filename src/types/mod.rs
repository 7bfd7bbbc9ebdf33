//! Task type tags and the two state machines.
//!
//! - [`TaskState`] is the lifecycle of a persisted task record.
//! - [`TaskPhase`] is the progress of a task body inside the `running` state.

pub mod phase;
pub mod task;

pub use phase::{SubTaskGroupState, TaskPhase};
pub use task::{TaskState, TaskType};
