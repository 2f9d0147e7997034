//! Trace quality gate
//!
//! Checks two consecutive readings of a replayed signal: both must be
//! non-negative, below a realistic maximum, and the signal must be moving.

use crate::error::ValidationError;
use tracing::warn;

/// Outcome of a quality gate check
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    pub first: f64,
    pub second: f64,
    pub failures: Vec<ValidationError>,
}

impl QualityReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Quality gate for replayed speed traces
#[derive(Debug, Clone)]
pub struct QualityGate {
    /// Realistic maximum speed (km/h)
    pub max_speed: f64,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self { max_speed: 300.0 }
    }
}

impl QualityGate {
    pub fn new(max_speed: f64) -> Self {
        Self { max_speed }
    }

    /// Check two consecutive readings
    pub fn check(&self, first: f64, second: f64) -> QualityReport {
        let mut failures = Vec::new();

        for value in [first, second] {
            if value < 0.0 || value > self.max_speed || !value.is_finite() {
                failures.push(ValidationError::OutOfRange {
                    field: "speed",
                    value,
                    min: 0.0,
                    max: self.max_speed,
                });
            }
        }

        if first == second {
            failures.push(ValidationError::StaticSignal(first));
        }

        if !failures.is_empty() {
            warn!("Quality gate failed for readings {} -> {}: {:?}", first, second, failures);
        }

        QualityReport {
            first,
            second,
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_signal_passes() {
        let report = QualityGate::default().check(42.0, 44.5);
        assert!(report.passed());
    }

    #[test]
    fn test_static_signal_fails() {
        let report = QualityGate::default().check(50.0, 50.0);
        assert_eq!(report.failures, vec![ValidationError::StaticSignal(50.0)]);
    }

    #[test]
    fn test_unrealistic_speed_fails() {
        let report = QualityGate::default().check(290.0, 310.0);
        assert!(!report.passed());
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn test_negative_speed_fails() {
        let report = QualityGate::new(200.0).check(-3.0, 10.0);
        assert!(matches!(
            report.failures[0],
            ValidationError::OutOfRange { value, .. } if value == -3.0
        ));
    }
}
