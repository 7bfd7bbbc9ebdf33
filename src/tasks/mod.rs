//! Concrete task bodies.

pub mod cloud_bootstrap;
