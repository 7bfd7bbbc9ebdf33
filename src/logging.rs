//! Tracing subscriber setup for binaries embedding the commissioner.
//!
//! The library itself only emits `tracing` events. Worker spans carry
//! `task_id`, `task_type` and `provider_id`; task bodies add `region` and
//! `phase` fields to their events.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs a global `fmt` subscriber filtered by `RUST_LOG`, or by
/// `default_filter` when `RUST_LOG` is unset or invalid.
///
/// Returns `false` if a global subscriber was already installed, so tests
/// and hosts that set up their own subscriber can call this freely.
///
/// # Examples
///
/// ```
/// commissioner::logging::init_tracing("commissioner=debug");
/// assert!(!commissioner::logging::init_tracing("info"));
/// ```
pub fn init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
