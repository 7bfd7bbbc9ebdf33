//! Static mapping from task type tags to task factories.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::Task;
use crate::error::CommissionerError;
use crate::tasks::cloud_bootstrap::CloudBootstrap;
use crate::types::TaskType;

/// Builds a task body from submitted parameters. Returns the decoder error
/// message on bad input.
pub type TaskFactory = fn(&Value) -> Result<Arc<dyn Task>, String>;

/// Task types a commissioner accepts, resolved once at construction.
///
/// # Examples
///
/// ```
/// use commissioner::task::TaskRegistry;
/// use commissioner::TaskType;
///
/// assert!(TaskRegistry::with_defaults().is_registered(TaskType::CloudBootstrap));
/// assert!(!TaskRegistry::new().is_registered(TaskType::CloudBootstrap));
/// ```
#[derive(Clone, Default)]
pub struct TaskRegistry {
    factories: HashMap<TaskType, TaskFactory>,
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl TaskRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every task body this crate ships.
    pub fn with_defaults() -> Self {
        Self::new().register(TaskType::CloudBootstrap, CloudBootstrap::factory)
    }

    /// Registers `factory` for `task_type`, replacing any previous one.
    pub fn register(mut self, task_type: TaskType, factory: TaskFactory) -> Self {
        self.factories.insert(task_type, factory);
        self
    }

    pub fn is_registered(&self, task_type: TaskType) -> bool {
        self.factories.contains_key(&task_type)
    }

    /// Builds the task body for a submission.
    ///
    /// # Errors
    ///
    /// - [`CommissionerError::UnknownTaskType`] if nothing is registered.
    /// - [`CommissionerError::InvalidParams`] if the factory rejects `params`.
    pub fn build(&self, task_type: TaskType, params: &Value) -> Result<Arc<dyn Task>, CommissionerError> {
        let factory = self
            .factories
            .get(&task_type)
            .ok_or_else(|| CommissionerError::UnknownTaskType {
                task_type: task_type.to_string(),
            })?;
        factory(params).map_err(|message| CommissionerError::InvalidParams {
            task_type: task_type.to_string(),
            message,
        })
    }
}
