//! Alert Manager Implementation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Cooldown between duplicate alerts for the same subject and kind (seconds)
    pub cooldown_s: f64,
    /// Maximum alerts per window before throttling
    pub max_alerts_per_window: usize,
    /// Throttle window length (seconds)
    pub window_s: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_s: 2.0,
            max_alerts_per_window: 100,
            window_s: 3600.0,
        }
    }
}

/// Deduplication key: which vehicle raised which kind of alert
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub subject: String,
    pub kind: String,
}

impl AlertKey {
    pub fn new(subject: &str, kind: &str) -> Self {
        Self {
            subject: subject.to_string(),
            kind: kind.to_string(),
        }
    }
}

/// State of an alert
#[derive(Debug, Clone)]
pub struct AlertState {
    /// Simulation time this alert last fired
    pub last_fired_s: f64,
    /// Number of times fired
    pub fire_count: usize,
    /// Whether alert is acknowledged
    pub acknowledged: bool,
}

/// Alert manager for deduplication and throttling
pub struct AlertManager {
    /// Configuration
    config: AlertConfig,
    /// Alert states by key
    states: HashMap<AlertKey, AlertState>,
    /// Alerts fired in current window
    window_count: usize,
    /// Window start time
    window_start_s: Option<f64>,
}

impl AlertManager {
    /// Create a new alert manager
    pub fn new(config: AlertConfig) -> Self {
        info!("Creating alert manager with config: {:?}", config);
        Self {
            config,
            states: HashMap::new(),
            window_count: 0,
            window_start_s: None,
        }
    }

    /// Check if an alert should fire at simulation time `t`
    pub fn should_fire(&mut self, subject: &str, kind: &str, t: f64) -> bool {
        self.roll_window(t);

        if self.window_count >= self.config.max_alerts_per_window {
            warn!("Alert throttled: {} alerts already fired in window", self.window_count);
            return false;
        }

        let key = AlertKey::new(subject, kind);
        if let Some(state) = self.states.get(&key) {
            let elapsed = t - state.last_fired_s;
            // A clock that went backwards means a new run; let it through.
            if elapsed >= 0.0 && elapsed < self.config.cooldown_s {
                debug!("Alert {}/{} suppressed: in cooldown ({:.2}s)", subject, kind, elapsed);
                return false;
            }
        }

        true
    }

    /// Record that an alert fired at simulation time `t`
    pub fn record_fire(&mut self, subject: &str, kind: &str, t: f64) {
        self.roll_window(t);
        self.window_count += 1;

        let state = self
            .states
            .entry(AlertKey::new(subject, kind))
            .or_insert(AlertState {
                last_fired_s: t,
                fire_count: 0,
                acknowledged: false,
            });

        state.last_fired_s = t;
        state.fire_count += 1;
        state.acknowledged = false;

        debug!("Alert recorded: {}/{} (count: {})", subject, kind, state.fire_count);
    }

    /// Check and record in one step. Returns whether the alert fired.
    pub fn try_fire(&mut self, subject: &str, kind: &str, t: f64) -> bool {
        if self.should_fire(subject, kind, t) {
            self.record_fire(subject, kind, t);
            true
        } else {
            false
        }
    }

    /// Acknowledge an alert
    pub fn acknowledge(&mut self, subject: &str, kind: &str) -> bool {
        if let Some(state) = self.states.get_mut(&AlertKey::new(subject, kind)) {
            state.acknowledged = true;
            info!("Alert acknowledged: {}/{}", subject, kind);
            true
        } else {
            false
        }
    }

    /// Get pending (unacknowledged) alerts
    pub fn pending(&self) -> Vec<(&AlertKey, &AlertState)> {
        self.states
            .iter()
            .filter(|(_, state)| !state.acknowledged)
            .collect()
    }

    /// Number of times an alert has fired
    pub fn fire_count(&self, subject: &str, kind: &str) -> usize {
        self.states
            .get(&AlertKey::new(subject, kind))
            .map_or(0, |s| s.fire_count)
    }

    /// Alerts fired in the current window
    pub fn window_count(&self) -> usize {
        self.window_count
    }

    /// Clear all alert states
    pub fn clear(&mut self) {
        self.states.clear();
        self.window_count = 0;
        self.window_start_s = None;
    }

    fn roll_window(&mut self, t: f64) {
        match self.window_start_s {
            Some(start) if t >= start && t - start <= self.config.window_s => {}
            _ => {
                self.window_start_s = Some(t);
                self.window_count = 0;
            }
        }
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_alert_fires() {
        let mut manager = AlertManager::default();
        assert!(manager.try_fire("ego", "OVERSPEED", 0.0));
        assert_eq!(manager.fire_count("ego", "OVERSPEED"), 1);
    }

    #[test]
    fn test_cooldown() {
        let mut manager = AlertManager::default();

        assert!(manager.try_fire("ego", "DISTANCE_CLOSE", 10.0));
        // Inside the 2s cooldown
        assert!(!manager.try_fire("ego", "DISTANCE_CLOSE", 11.0));
        assert!(!manager.try_fire("ego", "DISTANCE_CLOSE", 11.99));
        // Boundary is inclusive
        assert!(manager.try_fire("ego", "DISTANCE_CLOSE", 12.0));
        assert_eq!(manager.fire_count("ego", "DISTANCE_CLOSE"), 2);
    }

    #[test]
    fn test_keys_are_independent() {
        let mut manager = AlertManager::default();

        assert!(manager.try_fire("ego", "DISTANCE_CLOSE", 1.0));
        assert!(manager.try_fire("ego", "OVERSPEED", 1.0));
        assert!(manager.try_fire("lead", "DISTANCE_CLOSE", 1.0));
    }

    #[test]
    fn test_clock_going_backwards() {
        let mut manager = AlertManager::default();

        assert!(manager.try_fire("ego", "OVERSPEED", 50.0));
        assert!(manager.try_fire("ego", "OVERSPEED", 0.5));
    }

    #[test]
    fn test_window_throttle() {
        let config = AlertConfig {
            cooldown_s: 0.0,
            max_alerts_per_window: 3,
            window_s: 10.0,
        };
        let mut manager = AlertManager::new(config);

        assert!(manager.try_fire("ego", "BRAKE", 0.0));
        assert!(manager.try_fire("ego", "BRAKE", 1.0));
        assert!(manager.try_fire("ego", "BRAKE", 2.0));
        assert!(!manager.try_fire("ego", "BRAKE", 3.0));
        assert_eq!(manager.window_count(), 3);

        // New window
        assert!(manager.try_fire("ego", "BRAKE", 20.0));
        assert_eq!(manager.window_count(), 1);
    }

    #[test]
    fn test_acknowledgement() {
        let mut manager = AlertManager::default();
        manager.record_fire("ego", "OVERSPEED", 0.0);

        assert_eq!(manager.pending().len(), 1);
        assert!(manager.acknowledge("ego", "OVERSPEED"));
        assert!(manager.pending().is_empty());
        assert!(!manager.acknowledge("ego", "BRAKE"));
    }

    #[test]
    fn test_clear() {
        let mut manager = AlertManager::default();
        manager.record_fire("ego", "OVERSPEED", 0.0);
        manager.clear();

        assert_eq!(manager.fire_count("ego", "OVERSPEED"), 0);
        assert!(manager.should_fire("ego", "OVERSPEED", 0.1));
    }

    proptest! {
        #[test]
        fn fired_alerts_respect_cooldown(steps in proptest::collection::vec(0.0f64..1.0, 1..200)) {
            let mut manager = AlertManager::default();
            let mut t = 0.0;
            let mut fired = Vec::new();
            for dt in steps {
                t += dt;
                if manager.try_fire("ego", "DISTANCE_CLOSE", t) {
                    fired.push(t);
                }
            }
            for pair in fired.windows(2) {
                prop_assert!(pair[1] - pair[0] >= 2.0);
            }
        }
    }
}
