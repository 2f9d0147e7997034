//! Signal broker seam

use std::collections::HashMap;
use std::future::Future;
use tokio::sync::watch;

use crate::error::BusError;
use crate::signal::Datapoint;

/// Current values keyed by signal path; `None` when never written
pub type Snapshot = HashMap<String, Option<Datapoint>>;

/// A vehicle signal broker
///
/// Implemented by the in-process [`crate::MemoryBroker`]; a networked
/// databroker client plugs in behind the same three calls.
pub trait SignalBus: Send + Sync {
    /// Read the current value of each path
    fn get_current_values(
        &self,
        paths: &[&str],
    ) -> impl Future<Output = Result<Snapshot, BusError>> + Send;

    /// Write several values; either all paths are known and all are written,
    /// or nothing is
    fn set_current_values(
        &self,
        values: &[(&str, f64)],
    ) -> impl Future<Output = Result<(), BusError>> + Send;

    /// Follow updates of one path
    fn subscribe(&self, path: &str)
        -> impl Future<Output = Result<Subscription, BusError>> + Send;

    /// Current value of a single path
    fn current_value(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<Option<f64>, BusError>> + Send {
        async move {
            let mut values = self.get_current_values(&[path]).await?;
            Ok(values.remove(path).flatten().map(|dp| dp.value))
        }
    }
}

/// Stream of updates for one signal
#[derive(Debug)]
pub struct Subscription {
    path: String,
    rx: watch::Receiver<Option<Datapoint>>,
}

impl Subscription {
    pub fn new(path: &str, rx: watch::Receiver<Option<Datapoint>>) -> Self {
        Self {
            path: path.to_string(),
            rx,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Latest value without waiting
    pub fn latest(&self) -> Option<Datapoint> {
        *self.rx.borrow()
    }

    /// Wait for the next write. Only the newest value is kept, so a slow
    /// reader skips intermediate writes.
    pub async fn next(&mut self) -> Result<Datapoint, BusError> {
        loop {
            self.rx
                .changed()
                .await
                .map_err(|_| BusError::Closed(self.path.clone()))?;
            if let Some(dp) = *self.rx.borrow_and_update() {
                return Ok(dp);
            }
        }
    }
}
