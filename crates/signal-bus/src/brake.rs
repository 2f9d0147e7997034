//! Automatic brake actuator

use adas::{brake_ramp, BrakeConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::bus::SignalBus;
use crate::error::BusError;
use crate::signal::SPEED;

/// Result of an engage request
#[derive(Debug, Clone, PartialEq)]
pub enum BrakeOutcome {
    /// Ramp written down to `final_speed`
    Completed { steps: usize, final_speed: f64 },
    /// Speed already at or below the brake target
    NotNeeded,
    /// Another engagement is still running
    Refused,
}

/// Clears the active flag when the engagement ends, including on error
struct ActiveGuard<'a>(&'a AtomicBool);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Slows the vehicle by writing a stepwise ramp to `Vehicle.Speed`
#[derive(Debug, Clone)]
pub struct AutoBrake<B> {
    bus: B,
    config: BrakeConfig,
    step_interval: Duration,
    active: Arc<AtomicBool>,
}

impl<B: SignalBus> AutoBrake<B> {
    pub fn new(bus: B, config: BrakeConfig, step_interval: Duration) -> Self {
        Self {
            bus,
            config,
            step_interval,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a ramp is being written right now
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Ramp from `current_speed` down to the configured target
    pub async fn engage(&self, current_speed: f64) -> Result<BrakeOutcome, BusError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Brake already engaged, ignoring request at {:.2} km/h", current_speed);
            return Ok(BrakeOutcome::Refused);
        }
        let _guard = ActiveGuard(&self.active);

        let ramp = brake_ramp(
            current_speed,
            self.config.target_speed_kmh,
            self.config.reduction_rate_kmh,
        );
        if ramp.is_empty() {
            return Ok(BrakeOutcome::NotNeeded);
        }

        warn!("Overspeed detected: {:.2} km/h, braking", current_speed);
        for speed in &ramp {
            self.bus.set_current_values(&[(SPEED, *speed)]).await?;
            info!("Applying brakes... speed = {:.2}", speed);
            tokio::time::sleep(self.step_interval).await;
        }

        let final_speed = ramp.last().copied().unwrap_or(current_speed);
        info!("Vehicle speed normalized at {:.2} km/h", final_speed);
        Ok(BrakeOutcome::Completed {
            steps: ramp.len(),
            final_speed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBroker;

    fn brake(broker: &MemoryBroker) -> AutoBrake<MemoryBroker> {
        AutoBrake::new(broker.clone(), BrakeConfig::default(), Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ramp_written_to_bus() {
        let broker = MemoryBroker::new();
        let mut sub = broker.subscribe(SPEED).await.unwrap();
        let brake = brake(&broker);

        let (outcome, seen) = tokio::join!(brake.engage(130.0), async {
            let mut seen = Vec::new();
            for _ in 0..3 {
                seen.push(sub.next().await.unwrap().value);
            }
            seen
        });

        assert_eq!(
            outcome.unwrap(),
            BrakeOutcome::Completed {
                steps: 3,
                final_speed: 100.0
            }
        );
        assert_eq!(seen, vec![120.0, 110.0, 100.0]);
        assert!(!brake.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_engage_refused() {
        let broker = MemoryBroker::new();
        let brake = brake(&broker);
        let (first, second) = tokio::join!(brake.engage(150.0), async {
            tokio::task::yield_now().await;
            assert!(brake.is_active());
            brake.engage(150.0).await
        });
        assert!(matches!(first.unwrap(), BrakeOutcome::Completed { steps: 5, .. }));
        assert_eq!(second.unwrap(), BrakeOutcome::Refused);

        // Free again once the first ramp finished
        assert_eq!(brake.engage(100.0).await.unwrap(), BrakeOutcome::NotNeeded);
    }

    #[tokio::test]
    async fn test_bus_error_releases_brake() {
        let broker = MemoryBroker::with_signals(&[]);
        let brake = brake(&broker);
        assert!(brake.engage(130.0).await.is_err());
        assert!(!brake.is_active());
    }
}
