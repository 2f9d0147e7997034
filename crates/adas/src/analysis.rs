//! ADAS alerts

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// ADAS alert types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    /// Single sample above the speed limit
    Speeding,
    /// Speed above the limit for longer than the hold time
    Overspeed,
    /// Headway or time-to-collision too short
    Brake,
    /// Gap fell below the minimum
    DistanceClose,
    /// Gap recovered past the hysteresis band
    DistanceClear,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Speeding => "SPEEDING",
            AlertKind::Overspeed => "OVERSPEED",
            AlertKind::Brake => "BRAKE",
            AlertKind::DistanceClose => "DISTANCE_CLOSE",
            AlertKind::DistanceClear => "DISTANCE_CLEAR",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AlertKind::Speeding => Severity::Medium,
            AlertKind::Overspeed => Severity::High,
            AlertKind::Brake => Severity::Critical,
            AlertKind::DistanceClose => Severity::High,
            AlertKind::DistanceClear => Severity::Low,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alert raised by one of the rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Sample time (s)
    pub time_s: f64,
    /// Vehicle the alert is about
    pub subject: String,
    pub kind: AlertKind,
    /// Vehicle speed at the time of the alert (km/h)
    pub speed: f64,
    /// Gap to the lead vehicle, when known (m)
    pub distance: Option<f64>,
    pub reason: String,
}

impl Alert {
    pub fn new(kind: AlertKind, subject: &str, time_s: f64, speed: f64, reason: String) -> Self {
        Self {
            time_s,
            subject: subject.to_string(),
            kind,
            speed,
            distance: None,
            reason,
        }
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(AlertKind::DistanceClose.to_string(), "DISTANCE_CLOSE");
        assert_eq!(AlertKind::Speeding.as_str(), "SPEEDING");
    }

    #[test]
    fn test_severity_order() {
        assert!(AlertKind::Brake.severity() > AlertKind::Speeding.severity());
        assert!(AlertKind::DistanceClear.severity() < AlertKind::DistanceClose.severity());
    }
}
