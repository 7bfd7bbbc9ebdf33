//! Low-level key-value storage backend trait and supporting types.
//!
//! The [`StorageBackend`] trait is the contract storage engines implement:
//! [`get`](StorageBackend::get), [`put`](StorageBackend::put),
//! [`put_if_version`](StorageBackend::put_if_version) and
//! [`list_by_prefix`](StorageBackend::list_by_prefix). Task records are
//! never deleted.
//!
//! Backends are dumb KV stores. State machine validation and serialization
//! live in [`GenericTaskStore`](crate::store::generic::GenericTaskStore).
//!
//! # Key Structure
//!
//! Keys are `task:{task_id}`. All task records share the `task:` prefix so a
//! backend can hold other data next to them.
//!
//! # Versioning
//!
//! Each stored record carries a monotonic `u64` version starting at 1,
//! incremented on every successful write. [`put_if_version`](StorageBackend::put_if_version)
//! provides compare-and-swap semantics for optimistic concurrency.

use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

/// Prefix shared by all task record keys.
pub const TASK_KEY_PREFIX: &str = "task:";

/// Builds the storage key for a task record.
///
/// # Examples
///
/// ```
/// use commissioner::store::backend::make_key;
/// use uuid::Uuid;
///
/// assert_eq!(make_key(Uuid::nil()), "task:00000000-0000-0000-0000-000000000000");
/// ```
pub fn make_key(task_id: Uuid) -> String {
    format!("{TASK_KEY_PREFIX}{task_id}")
}

/// A stored record paired with its version number.
#[derive(Debug, Clone)]
pub struct VersionedRecord {
    /// Serialized record bytes (JSON produced by `GenericTaskStore`).
    pub data: Vec<u8>,

    /// Monotonic version. Starts at 1 and increments on each write.
    pub version: u64,
}

/// Errors from raw storage operations.
///
/// `GenericTaskStore` maps these to
/// [`CommissionerError`](crate::error::CommissionerError) before they reach
/// callers.
///
/// # Examples
///
/// ```
/// use commissioner::store::backend::StorageError;
///
/// let err = StorageError::VersionConflict {
///     key: "task:1".to_string(),
///     expected: 2,
///     actual: 3,
/// };
/// assert!(err.to_string().contains("expected 2"));
/// ```
#[derive(Debug)]
pub enum StorageError {
    /// The requested key was not found.
    NotFound {
        /// The missing key.
        key: String,
    },

    /// A [`put_if_version`](StorageBackend::put_if_version) call found a
    /// different version than expected.
    VersionConflict {
        /// The contended key.
        key: String,
        /// The version the caller expected.
        expected: u64,
        /// The version actually stored.
        actual: u64,
    },

    /// An I/O or backend-specific error.
    Backend {
        /// Description of the failure.
        message: String,
        /// The underlying error, if available.
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { key } => write!(f, "key not found: {key}"),
            Self::VersionConflict {
                key,
                expected,
                actual,
            } => write!(
                f,
                "version conflict on key {key}: expected {expected}, found {actual}"
            ),
            Self::Backend { message, .. } => write!(f, "backend error: {message}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend {
                source: Some(src), ..
            } => Some(src.as_ref()),
            _ => None,
        }
    }
}

/// Key-value storage backend for task records.
///
/// Implementations must be `Send + Sync`; workers and status readers access
/// the backend concurrently.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Retrieves a record by key.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if no record exists for the key.
    /// - [`StorageError::Backend`] on backend failures.
    async fn get(&self, key: &str) -> Result<VersionedRecord, StorageError>;

    /// Stores a record unconditionally and returns the assigned version.
    async fn put(&self, key: &str, data: &[u8]) -> Result<u64, StorageError>;

    /// Stores a record only if the current version equals `expected_version`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if no record exists for the key.
    /// - [`StorageError::VersionConflict`] on version mismatch.
    async fn put_if_version(
        &self,
        key: &str,
        data: &[u8],
        expected_version: u64,
    ) -> Result<u64, StorageError>;

    /// Lists all records whose key starts with `prefix`.
    async fn list_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, VersionedRecord)>, StorageError>;
}
