//! Task orchestration engine for a multi-cloud database control plane.
//!
//! The [`Commissioner`] accepts long-running infrastructure operations,
//! schedules them on a bounded worker pool, tracks their progress in a
//! [`TaskRecord`], and answers status queries. The concrete operation shipped
//! with this crate is [`CloudBootstrap`](tasks::cloud_bootstrap::CloudBootstrap),
//! which reconciles a provider's regions, availability zones and access keys
//! against cloud metadata and rolls back everything it created when a later
//! step fails.
//!
//! # Overview
//!
//! A task record moves through a small state machine
//! (`created` -> `running` -> `success`/`failure`/`aborted`). Inside a
//! running task the body reports its own phase
//! (`validating` -> `committing` -> `succeeded`, or `rolling_back` ->
//! `failed`). Every row created by one task invocation is tracked in a
//! [`RollbackLedger`](task::RollbackLedger) so that a failure undoes exactly
//! that invocation's writes.
//!
//! # Module Organization
//!
//! - [`commissioner`] - Submission, worker pool, provider locks, status queries
//! - [`task`] - The [`Task`](task::Task) contract, context, ledger and registry
//! - [`tasks`] - Concrete task bodies
//! - [`store`] - Task record persistence with state machine enforcement
//! - [`infra`] / [`models`] - Provider, region, zone and access key rows
//! - [`cloud`] - External collaborator interfaces
//! - [`config`] / [`error`] / [`types`] / [`domain`] - Supporting types

pub mod cloud;
pub mod commissioner;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod infra;
#[cfg(feature = "logging")]
pub mod logging;
pub mod models;
pub mod store;
pub mod task;
pub mod tasks;
pub mod types;

pub use commissioner::{Commissioner, CommissionerBuilder};
pub use config::CommissionerConfig;
pub use domain::{SubTaskGroupRecord, TaskFailure, TaskRecord};
pub use error::{CommissionerError, ErrorKind, TaskError};
pub use types::{SubTaskGroupState, TaskPhase, TaskState, TaskType};
