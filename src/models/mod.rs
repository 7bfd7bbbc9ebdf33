//! Infrastructure rows read and written by task bodies.
//!
//! Providers are pre-existing. Regions, availability zones and access keys
//! are created by a task's commit step and deleted only by that same task's
//! rollback.

pub mod access_key;
pub mod provider;
pub mod region;

pub use access_key::{AccessKey, KeyProvenance, KeyType};
pub use provider::{CloudType, Provider};
pub use region::{AvailabilityZone, Region};
