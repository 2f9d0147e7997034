//! Overspeed monitor loop over `Vehicle.Speed`

use adas::{AdasConfig, Alert, OverspeedDebouncer, SpeedMonitor};
use alerting::AlertManager;
use chrono::Local;
use data_validator::Validator;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use trace_io::AlertSink;

use crate::brake::{AutoBrake, BrakeOutcome};
use crate::bus::SignalBus;
use crate::config::MonitorConfig;
use crate::error::BusError;
use crate::signal::SPEED;
use crate::wait_or_shutdown;

/// Counters for one monitor run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorReport {
    /// Polls performed
    pub cycles: u64,
    /// Valid speed values processed
    pub samples: u64,
    /// Polls with no value or an invalid value
    pub skipped: u64,
    /// Polls that failed at the broker
    pub errors: u64,
    /// Alerts written to the sink
    pub alerts: u64,
    pub brake_engagements: u64,
}

/// Polls the speed signal, raises overspeed alerts and engages the
/// auto-brake once overspeed has persisted past the hold time.
pub struct SpeedMonitorLoop<B> {
    bus: B,
    config: MonitorConfig,
    instant: SpeedMonitor,
    debouncer: OverspeedDebouncer,
    alerts: AlertManager,
    validator: Validator,
    brake: Option<AutoBrake<B>>,
    /// Raise a SPEEDING alert on every over-limit sample, subject to cooldown
    instant_alerts: bool,
}

impl<B: SignalBus + Clone> SpeedMonitorLoop<B> {
    pub fn new(bus: B, adas: &AdasConfig, config: MonitorConfig) -> Self {
        let brake = config
            .auto_brake
            .then(|| AutoBrake::new(bus.clone(), adas.brake.clone(), config.brake_step()));
        Self {
            instant: SpeedMonitor::new(adas.overspeed.clone()),
            debouncer: OverspeedDebouncer::new(adas.overspeed.clone()),
            alerts: AlertManager::new(adas.alerts.clone()),
            validator: Validator::new(adas.validation.clone()),
            brake,
            instant_alerts: true,
            bus,
            config,
        }
    }

    /// Only raise the debounced OVERSPEED alert
    pub fn without_instant_alerts(mut self) -> Self {
        self.instant_alerts = false;
        self
    }

    pub fn brake(&self) -> Option<&AutoBrake<B>> {
        self.brake.as_ref()
    }

    /// Run until `max_cycles` polls are done or `shutdown` turns true.
    ///
    /// Sample times are seconds since the loop started.
    pub async fn run<S: AlertSink>(
        &mut self,
        sink: &mut S,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<MonitorReport, BusError> {
        let start = Instant::now();
        let mut report = MonitorReport::default();
        info!("Polling {} at {} Hz", SPEED, self.config.hz);

        loop {
            if self.config.max_cycles.is_some_and(|max| report.cycles >= max) {
                break;
            }
            if *shutdown.borrow() {
                break;
            }
            report.cycles += 1;

            let elapsed = start.elapsed().as_secs_f64();
            let pause = match self.bus.current_value(SPEED).await {
                Ok(Some(speed)) => self.on_speed(elapsed, speed, sink, &mut report).await,
                Ok(None) => {
                    report.skipped += 1;
                    info!("No {} data available yet", SPEED);
                    self.config.period()
                }
                Err(e) => {
                    report.errors += 1;
                    warn!("Broker error: {}", e);
                    self.config.error_backoff()
                }
            };

            if wait_or_shutdown(pause, &mut shutdown).await {
                break;
            }
        }

        sink.flush()?;
        info!(
            "Monitor stopped after {} cycles ({} alerts)",
            report.cycles, report.alerts
        );
        Ok(report)
    }

    /// Handle one speed reading and return the pause before the next poll
    async fn on_speed<S: AlertSink>(
        &mut self,
        time_s: f64,
        speed: f64,
        sink: &mut S,
        report: &mut MonitorReport,
    ) -> Duration {
        if let Err(e) = self.validator.validate_speed(speed) {
            report.skipped += 1;
            warn!("Discarding {} value {:.2}: {}", SPEED, speed, e);
            return self.config.period();
        }
        report.samples += 1;
        info!("[{}] {} = {:.2}", Local::now().format("%H:%M:%S%.3f"), SPEED, speed);

        let subject = self.config.subject.as_str();
        let mut candidates: Vec<Alert> = if self.instant_alerts {
            self.instant.on_speed(subject, time_s, speed)
        } else {
            Vec::new()
        };
        let persisted = self.debouncer.update(subject, time_s, speed);
        let engage = persisted.is_some();
        candidates.extend(persisted);

        for alert in candidates {
            if self
                .alerts
                .try_fire(&alert.subject, alert.kind.as_str(), alert.time_s)
            {
                match sink.write(&alert) {
                    Ok(()) => report.alerts += 1,
                    Err(e) => {
                        report.errors += 1;
                        warn!("Failed to record {} alert: {}", alert.kind, e);
                    }
                }
            } else {
                debug!("{} for {} in cooldown", alert.kind, alert.subject);
            }
        }

        if engage {
            if let Some(brake) = &self.brake {
                warn!("Overspeed persisted, activating auto brake");
                match brake.engage(speed).await {
                    Ok(BrakeOutcome::Completed { .. }) => report.brake_engagements += 1,
                    Ok(_) => {}
                    Err(e) => {
                        report.errors += 1;
                        warn!("Auto brake failed: {}", e);
                        return self.config.error_backoff();
                    }
                }
            }
        }
        self.config.period()
    }
}
