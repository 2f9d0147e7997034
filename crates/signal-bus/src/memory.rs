//! In-process signal broker

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::bus::{SignalBus, Snapshot, Subscription};
use crate::error::BusError;
use crate::signal::{Datapoint, STANDARD_SIGNALS};

/// Broker holding the latest value of each registered signal.
///
/// Cloning is cheap and every clone sees the same signals.
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    signals: Arc<HashMap<String, watch::Sender<Option<Datapoint>>>>,
}

impl MemoryBroker {
    /// Broker with the standard vehicle signals
    pub fn new() -> Self {
        Self::with_signals(&STANDARD_SIGNALS)
    }

    /// Broker with an explicit signal set
    pub fn with_signals(paths: &[&str]) -> Self {
        info!("Creating in-memory broker with {} signals", paths.len());
        let signals = paths
            .iter()
            .map(|p| (p.to_string(), watch::channel(None).0))
            .collect();
        Self {
            signals: Arc::new(signals),
        }
    }

    fn sender(&self, path: &str) -> Result<&watch::Sender<Option<Datapoint>>, BusError> {
        self.signals
            .get(path)
            .ok_or_else(|| BusError::UnknownSignal(path.to_string()))
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalBus for MemoryBroker {
    async fn get_current_values(&self, paths: &[&str]) -> Result<Snapshot, BusError> {
        let mut out = HashMap::with_capacity(paths.len());
        for path in paths {
            let value = *self.sender(path)?.borrow();
            out.insert(path.to_string(), value);
        }
        Ok(out)
    }

    async fn set_current_values(&self, values: &[(&str, f64)]) -> Result<(), BusError> {
        for (path, value) in values {
            self.sender(path)?;
            if !value.is_finite() {
                return Err(BusError::InvalidValue {
                    path: path.to_string(),
                    value: *value,
                });
            }
        }
        for (path, value) in values {
            debug!("set {} = {:.2}", path, value);
            self.sender(path)?.send_replace(Some(Datapoint::new(*value)));
        }
        Ok(())
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription, BusError> {
        Ok(Subscription::new(path, self.sender(path)?.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{FRONT_DISTANCE, SPEED, TARGET_SPEED};

    #[tokio::test]
    async fn test_unset_values_are_none() {
        let broker = MemoryBroker::new();
        let values = broker.get_current_values(&[SPEED, TARGET_SPEED]).await.unwrap();
        assert_eq!(values.len(), 2);
        assert!(values[SPEED].is_none());
        assert_eq!(broker.current_value(SPEED).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let broker = MemoryBroker::new();
        broker
            .set_current_values(&[(SPEED, 88.0), (FRONT_DISTANCE, 12.5)])
            .await
            .unwrap();
        assert_eq!(broker.current_value(SPEED).await.unwrap(), Some(88.0));

        // Clones share state
        let other = broker.clone();
        assert_eq!(other.current_value(FRONT_DISTANCE).await.unwrap(), Some(12.5));
    }

    #[tokio::test]
    async fn test_unknown_signal() {
        let broker = MemoryBroker::new();
        let err = broker.get_current_values(&["Vehicle.Nope"]).await;
        assert!(matches!(err, Err(BusError::UnknownSignal(p)) if p == "Vehicle.Nope"));
        assert!(broker.subscribe("Vehicle.Nope").await.is_err());
    }

    #[tokio::test]
    async fn test_write_is_all_or_nothing() {
        let broker = MemoryBroker::new();
        let err = broker
            .set_current_values(&[(SPEED, 50.0), ("Vehicle.Nope", 1.0)])
            .await;
        assert!(err.is_err());
        assert_eq!(broker.current_value(SPEED).await.unwrap(), None);

        let err = broker.set_current_values(&[(SPEED, f64::NAN)]).await;
        assert!(matches!(err, Err(BusError::InvalidValue { .. })));
    }

    #[tokio::test]
    async fn test_subscription() {
        let broker = MemoryBroker::new();
        let mut sub = broker.subscribe(SPEED).await.unwrap();
        assert_eq!(sub.latest(), None);

        broker.set_current_values(&[(SPEED, 30.0)]).await.unwrap();
        assert_eq!(sub.next().await.unwrap().value, 30.0);

        // Only the newest value is delivered
        broker.set_current_values(&[(SPEED, 31.0)]).await.unwrap();
        broker.set_current_values(&[(SPEED, 32.0)]).await.unwrap();
        assert_eq!(sub.next().await.unwrap().value, 32.0);
    }

    #[tokio::test]
    async fn test_subscription_closes_with_broker() {
        let broker = MemoryBroker::with_signals(&[SPEED]);
        let mut sub = broker.subscribe(SPEED).await.unwrap();
        drop(broker);
        assert!(matches!(sub.next().await, Err(BusError::Closed(_))));
    }
}
