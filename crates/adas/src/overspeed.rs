//! Overspeed detection: per-sample and hold-time debounced

use tracing::{debug, warn};

use crate::analysis::{Alert, AlertKind};
use crate::config::OverspeedConfig;

/// Raises a `SPEEDING` alert for every sample above the limit
#[derive(Debug, Clone, Default)]
pub struct SpeedMonitor {
    config: OverspeedConfig,
}

impl SpeedMonitor {
    pub fn new(config: OverspeedConfig) -> Self {
        Self { config }
    }

    /// Check one speed sample. Equal to the limit is not overspeed.
    pub fn on_speed(&self, subject: &str, time_s: f64, value: f64) -> Vec<Alert> {
        let limit = self.config.limit();
        let mut alerts = Vec::new();

        if value > limit {
            alerts.push(Alert::new(
                AlertKind::Speeding,
                subject,
                time_s,
                value,
                format!("Speed {:.2} exceeds max {:.2}", value, limit),
            ));
        }

        alerts
    }
}

/// Fires one `OVERSPEED` alert once speed has stayed above the limit for
/// longer than the hold time. Dropping to or below the limit re-arms it.
#[derive(Debug, Clone, Default)]
pub struct OverspeedDebouncer {
    config: OverspeedConfig,
    /// Time the current overspeed episode started
    started_at: Option<f64>,
    /// Alert already raised for the current episode
    latched: bool,
}

impl OverspeedDebouncer {
    pub fn new(config: OverspeedConfig) -> Self {
        Self {
            config,
            started_at: None,
            latched: false,
        }
    }

    pub fn update(&mut self, subject: &str, time_s: f64, speed: f64) -> Option<Alert> {
        let limit = self.config.limit();

        if speed <= limit {
            if self.started_at.is_some() {
                debug!("{} back under {:.2} at t={:.2}", subject, limit, time_s);
            }
            self.reset();
            return None;
        }

        let start = match self.started_at {
            Some(start) if time_s >= start => start,
            _ => {
                // First overspeed sample, or the clock went backwards.
                self.started_at = Some(time_s);
                self.latched = false;
                return None;
            }
        };

        let held = time_s - start;
        if !self.latched && held > self.config.hold_s {
            self.latched = true;
            warn!(
                "{} overspeed persisted {:.2}s: {:.2} > {:.2}",
                subject, held, speed, limit
            );
            return Some(Alert::new(
                AlertKind::Overspeed,
                subject,
                time_s,
                speed,
                format!(
                    "speed={:.1}km/h > limit={:.1}km/h for {:.1}s",
                    speed, limit, held
                ),
            ));
        }

        None
    }

    /// Whether the alert for the current episode has fired
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Start time of the current overspeed episode
    pub fn overspeed_since(&self) -> Option<f64> {
        self.started_at
    }

    pub fn reset(&mut self) {
        self.started_at = None;
        self.latched = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: f64, hold: f64) -> OverspeedConfig {
        OverspeedConfig {
            max_speed_kmh: max,
            tolerance_kmh: 0.0,
            hold_s: hold,
        }
    }

    fn run(monitor: &SpeedMonitor, speeds: &[f64]) -> Vec<Alert> {
        speeds
            .iter()
            .enumerate()
            .flat_map(|(i, v)| monitor.on_speed("ego", i as f64, *v))
            .collect()
    }

    #[test]
    fn test_no_alert_below_threshold() {
        let monitor = SpeedMonitor::new(config(80.0, 0.0));
        assert!(monitor.on_speed("ego", 0.0, 79.9).is_empty());
    }

    #[test]
    fn test_alert_above_threshold() {
        let monitor = SpeedMonitor::new(config(80.0, 0.0));
        let alerts = monitor.on_speed("ego", 0.0, 81.0);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Speeding);
        assert!(alerts[0].reason.contains("exceeds max"));
    }

    #[test]
    fn test_multiple_events() {
        let monitor = SpeedMonitor::new(config(10.0, 0.0));
        let alerts = run(&monitor, &[5.0, 11.0, 12.0, 7.0, 13.0]);
        let speeds: Vec<f64> = alerts.iter().map(|a| a.speed).collect();
        assert_eq!(speeds, vec![11.0, 12.0, 13.0]);
    }

    #[test]
    fn test_boundary_equals_threshold() {
        let monitor = SpeedMonitor::new(config(10.0, 0.0));
        assert!(run(&monitor, &[10.0, 10.0]).is_empty());
    }

    #[test]
    fn test_high_frequency_stream() {
        let monitor = SpeedMonitor::new(config(10.0, 0.0));
        let stream: Vec<f64> = (0..1000)
            .map(|i| if i % 50 == 0 { 15.0 } else { (i % 10) as f64 + 0.1 })
            .collect();
        assert_eq!(run(&monitor, &stream).len(), 20);
    }

    #[test]
    fn test_debounce_fires_after_hold() {
        let mut debouncer = OverspeedDebouncer::new(config(120.0, 2.0));

        assert!(debouncer.update("ego", 0.0, 130.0).is_none());
        let alert = debouncer.update("ego", 3.0, 130.0).expect("alert after hold");
        assert_eq!(alert.kind, AlertKind::Overspeed);
        assert!(debouncer.is_latched());

        // Once per episode
        assert!(debouncer.update("ego", 6.0, 130.0).is_none());
    }

    #[test]
    fn test_hold_is_strict() {
        let mut debouncer = OverspeedDebouncer::new(config(120.0, 2.0));
        assert!(debouncer.update("ego", 0.0, 125.0).is_none());
        assert!(debouncer.update("ego", 2.0, 125.0).is_none());
        assert!(debouncer.update("ego", 2.1, 125.0).is_some());
    }

    #[test]
    fn test_fluctuating_speed_does_not_fire() {
        let mut debouncer = OverspeedDebouncer::new(config(120.0, 2.0));
        let trace = [(0.0, 80.0), (1.0, 130.0), (1.5, 90.0), (2.0, 70.0), (3.0, 130.0), (4.5, 125.0)];
        for (t, v) in trace {
            assert!(debouncer.update("ego", t, v).is_none());
        }
        assert_eq!(debouncer.overspeed_since(), Some(3.0));
    }

    #[test]
    fn test_rearms_after_drop() {
        let mut debouncer = OverspeedDebouncer::new(config(120.0, 1.0));
        debouncer.update("ego", 0.0, 130.0);
        assert!(debouncer.update("ego", 1.5, 130.0).is_some());

        // Equal to the limit resets
        assert!(debouncer.update("ego", 2.0, 120.0).is_none());
        assert!(!debouncer.is_latched());

        debouncer.update("ego", 3.0, 131.0);
        assert!(debouncer.update("ego", 4.5, 131.0).is_some());
    }

    #[test]
    fn test_clock_going_backwards_restarts_episode() {
        let mut debouncer = OverspeedDebouncer::new(config(120.0, 1.0));
        debouncer.update("ego", 10.0, 130.0);
        assert!(debouncer.update("ego", 0.0, 130.0).is_none());
        assert_eq!(debouncer.overspeed_since(), Some(0.0));
        assert!(debouncer.update("ego", 1.5, 130.0).is_some());
    }

    #[test]
    fn test_tolerance() {
        let mut cfg = config(60.0, 0.0);
        cfg.tolerance_kmh = 5.0;
        let monitor = SpeedMonitor::new(cfg);
        assert!(monitor.on_speed("ego", 0.0, 64.0).is_empty());
        assert_eq!(monitor.on_speed("ego", 0.0, 66.0).len(), 1);
    }
}
