//! Data Validator for Range Checking

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Speed valid range (km/h)
    pub speed_range: (f64, f64),
    /// Gap to lead vehicle valid range (m)
    pub distance_range: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            speed_range: (0.0, 300.0),
            distance_range: (0.0, 10_000.0),
        }
    }
}

/// Result of validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether all values are valid
    pub valid: bool,
    /// List of validation errors
    pub errors: Vec<ValidationError>,
    /// Number of fields validated
    pub fields_checked: usize,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid(fields_checked: usize) -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            fields_checked,
        }
    }

    /// Create an invalid result with errors
    pub fn invalid(errors: Vec<ValidationError>, fields_checked: usize) -> Self {
        Self {
            valid: false,
            errors,
            fields_checked,
        }
    }

    /// First error, if any
    pub fn first_error(&self) -> Option<&ValidationError> {
        self.errors.first()
    }
}

/// Data validator for speed/gap samples
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite { field });
        }
        if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    /// Validate speed
    pub fn validate_speed(&self, speed: f64) -> Result<(), ValidationError> {
        self.validate_range("speed", speed, self.config.speed_range)
    }

    /// Validate gap to lead vehicle
    pub fn validate_distance(&self, distance: f64) -> Result<(), ValidationError> {
        self.validate_range("distance", distance, self.config.distance_range)
    }

    /// Validate a sample timestamp
    pub fn validate_time(&self, time_s: f64) -> Result<(), ValidationError> {
        if time_s.is_finite() {
            Ok(())
        } else {
            Err(ValidationError::NotFinite { field: "time" })
        }
    }

    /// Validate a full `(time, speed, distance)` sample
    pub fn validate_sample(
        &self,
        time_s: f64,
        speed: f64,
        distance: Option<f64>,
    ) -> ValidationResult {
        let mut errors = Vec::new();
        let mut checked = 2;

        if let Err(e) = self.validate_time(time_s) {
            errors.push(e);
        }
        if let Err(e) = self.validate_speed(speed) {
            errors.push(e);
        }
        if let Some(d) = distance {
            checked += 1;
            if let Err(e) = self.validate_distance(d) {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            ValidationResult::valid(checked)
        } else {
            debug!("Sample at t={} rejected: {:?}", time_s, errors);
            ValidationResult::invalid(errors, checked)
        }
    }

    /// Parse a raw speed reading coming from a broker or a loosely typed table.
    ///
    /// Numeric strings such as `"12"` are accepted; missing, unparseable and
    /// negative readings are rejected.
    pub fn parse_speed(&self, raw: Option<&str>) -> Result<f64, ValidationError> {
        let raw = raw.ok_or(ValidationError::MissingField("speed"))?;
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidFormat(format!("speed {:?}", raw)))?;
        self.validate_speed(value)?;
        Ok(value)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_speed() {
        let validator = Validator::default();
        assert!(validator.validate_speed(0.0).is_ok());
        assert!(validator.validate_speed(120.0).is_ok());
        assert!(validator.validate_speed(300.0).is_ok());
    }

    #[test]
    fn test_invalid_speed() {
        let validator = Validator::default();
        assert!(validator.validate_speed(-1.0).is_err());
        assert!(validator.validate_speed(300.1).is_err());
        assert_eq!(
            validator.validate_speed(f64::NAN),
            Err(ValidationError::NotFinite { field: "speed" })
        );
    }

    #[test]
    fn test_distance_range() {
        let validator = Validator::default();
        assert!(validator.validate_distance(0.0).is_ok());
        assert!(validator.validate_distance(42.5).is_ok());
        assert!(validator.validate_distance(-0.5).is_err());
        assert!(validator.validate_distance(f64::INFINITY).is_err());
    }

    #[test]
    fn test_dirty_inputs() {
        // None, "12", -1, 20 -> only "12" and 20 survive
        let validator = Validator::default();
        let stream: [Option<&str>; 5] = [None, Some("12"), Some("-1"), Some("20"), Some("fast")];

        let accepted: Vec<f64> = stream
            .iter()
            .filter_map(|raw| validator.parse_speed(*raw).ok())
            .collect();
        assert_eq!(accepted, vec![12.0, 20.0]);

        assert_eq!(
            validator.parse_speed(None),
            Err(ValidationError::MissingField("speed"))
        );
        assert!(matches!(
            validator.parse_speed(Some("fast")),
            Err(ValidationError::InvalidFormat(_))
        ));
        assert!(matches!(
            validator.parse_speed(Some("-1")),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_sample_validation() {
        let validator = Validator::default();

        let ok = validator.validate_sample(1.0, 50.0, Some(12.0));
        assert!(ok.valid);
        assert_eq!(ok.fields_checked, 3);

        let no_lead = validator.validate_sample(1.0, 50.0, None);
        assert!(no_lead.valid);
        assert_eq!(no_lead.fields_checked, 2);

        let bad = validator.validate_sample(f64::NAN, -5.0, Some(-1.0));
        assert!(!bad.valid);
        assert_eq!(bad.errors.len(), 3);
        assert_eq!(
            bad.first_error(),
            Some(&ValidationError::NotFinite { field: "time" })
        );
    }

    proptest! {
        #[test]
        fn in_range_speeds_pass(speed in 0.0f64..=300.0) {
            prop_assert!(Validator::default().validate_speed(speed).is_ok());
        }

        #[test]
        fn negative_speeds_fail(speed in -1.0e6f64..-1.0e-9) {
            prop_assert!(Validator::default().validate_speed(speed).is_err());
        }
    }
}
