//! Signal bus error types

use thiserror::Error;

/// Errors raised by the signal bus and the loops driving it
#[derive(Debug, Error)]
pub enum BusError {
    /// Path not registered with the broker
    #[error("Unknown signal: {0}")]
    UnknownSignal(String),

    /// Value the broker refuses to store
    #[error("Invalid value for {path}: {value}")]
    InvalidValue { path: String, value: f64 },

    /// Broker side of a subscription went away
    #[error("Signal {0} closed")]
    Closed(String),

    #[error("Trace error: {0}")]
    Trace(#[from] trace_io::TraceError),

    #[error("ADAS error: {0}")]
    Adas(#[from] adas::AdasError),
}
