//! Alerting System
//!
//! Provides alert deduplication and throttling keyed by subject and alert kind.
//! All times are simulation seconds supplied by the caller, so replayed traces
//! and live loops share the same behaviour.

mod manager;

pub use manager::{AlertConfig, AlertKey, AlertManager, AlertState};
