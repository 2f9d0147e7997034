//! Loop timing configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use trace_io::SpeedUnit;

/// Seconds as a `Duration`; negative and NaN read as zero, values too large
/// to represent saturate to `Duration::MAX`
pub(crate) fn secs(s: f64) -> Duration {
    Duration::try_from_secs_f64(s.max(0.0)).unwrap_or(Duration::MAX)
}

/// Overspeed monitor loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Polling rate of `Vehicle.Speed` (Hz)
    pub hz: f64,
    /// Stop after this many polls; run until shutdown when unset
    pub max_cycles: Option<u64>,
    /// Vehicle the alerts are reported for
    pub subject: String,
    /// Pause between auto-brake steps (s)
    pub brake_step_s: f64,
    /// Pause after a broker error before polling again (s)
    pub error_backoff_s: f64,
    /// Engage the auto-brake on a debounced overspeed
    pub auto_brake: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            hz: 1.0,
            max_cycles: None,
            subject: adas::DEFAULT_SUBJECT.to_string(),
            brake_step_s: 1.0,
            error_backoff_s: 2.0,
            auto_brake: true,
        }
    }
}

impl MonitorConfig {
    /// Poll period; rates at or below zero are clamped to one poll per 10^6 s
    pub fn period(&self) -> Duration {
        secs(1.0 / self.hz.max(1e-6))
    }

    pub fn brake_step(&self) -> Duration {
        secs(self.brake_step_s)
    }

    pub fn error_backoff(&self) -> Duration {
        secs(self.error_backoff_s)
    }
}

/// Gap replay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Pause between rows (s)
    pub step_s: f64,
    /// Write speed, distance and target to the bus
    pub publish: bool,
    /// Unit of the speed columns in the gap table
    pub speed_unit: SpeedUnit,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            step_s: 0.1,
            publish: false,
            speed_unit: SpeedUnit::Mps,
        }
    }
}

impl ReplayConfig {
    pub fn step(&self) -> Duration {
        secs(self.step_s)
    }
}

/// Cruise controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Pause between control steps (s)
    pub interval_s: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self { interval_s: 0.2 }
    }
}

impl ControllerConfig {
    pub fn interval(&self) -> Duration {
        secs(self.interval_s)
    }
}
