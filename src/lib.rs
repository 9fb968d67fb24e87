//! pgpulse - PostgreSQL runtime-state metrics collector library.
//!
//! This library provides the core functionality for `pgpulsed`, a daemon
//! that periodically samples PostgreSQL statistics views and flattens the
//! results into one named-metric snapshot per cycle.

pub mod collector;
pub mod config;
