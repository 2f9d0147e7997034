//! ADAS configuration

use alerting::AlertConfig;
use data_validator::ValidationConfig;
use serde::{Deserialize, Serialize};

use crate::AdasError;

/// Which decision policy drives target speeds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Hard/soft brake tiers with fixed deltas
    #[default]
    Tiered,
    /// Emergency stop, step braking and capped acceleration
    Cruise,
}

/// Gap tiers for the tiered policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GapThresholds {
    /// Below this gap the vehicle brakes hard (m)
    pub critical_distance_m: f64,
    /// Below this gap the vehicle brakes softly (m)
    pub safe_distance_m: f64,
    pub hard_brake_delta: f64,
    pub soft_brake_delta: f64,
    pub accelerate_delta: f64,
}

impl Default for GapThresholds {
    fn default() -> Self {
        Self {
            critical_distance_m: 5.0,
            safe_distance_m: 10.0,
            hard_brake_delta: 10.0,
            soft_brake_delta: 5.0,
            accelerate_delta: 1.0,
        }
    }
}

/// Settings for the cruise policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CruiseConfig {
    pub safe_distance_m: f64,
    /// At or below this gap the target drops to zero (m)
    pub emergency_distance_m: f64,
    pub max_speed_kmh: f64,
    pub brake_step_kmh: f64,
    pub accel_step_kmh: f64,
    /// Accelerate only once the gap exceeds `safe_distance_m * accel_gap_factor`
    pub accel_gap_factor: f64,
}

impl Default for CruiseConfig {
    fn default() -> Self {
        Self {
            safe_distance_m: 10.0,
            emergency_distance_m: 3.0,
            max_speed_kmh: 100.0,
            brake_step_kmh: 15.0,
            accel_step_kmh: 5.0,
            accel_gap_factor: 1.5,
        }
    }
}

/// Overspeed detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverspeedConfig {
    pub max_speed_kmh: f64,
    /// Extra allowance above `max_speed_kmh` before a sample counts as overspeed
    pub tolerance_kmh: f64,
    /// How long overspeed must persist before the debounced alert fires (s)
    pub hold_s: f64,
}

impl Default for OverspeedConfig {
    fn default() -> Self {
        Self {
            max_speed_kmh: 120.0,
            tolerance_kmh: 0.0,
            hold_s: 2.0,
        }
    }
}

impl OverspeedConfig {
    /// Speed above which a sample is overspeed
    pub fn limit(&self) -> f64 {
        self.max_speed_kmh + self.tolerance_kmh
    }
}

/// Gap monitor with a release hysteresis band
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GapMonitorConfig {
    pub min_gap_m: f64,
    /// Braking is released once the gap exceeds `min_gap_m + hysteresis_m`
    pub hysteresis_m: f64,
    /// Close-gap target is the leader speed minus this margin (m/s)
    pub leader_speed_margin_mps: f64,
}

impl Default for GapMonitorConfig {
    fn default() -> Self {
        Self {
            min_gap_m: 10.0,
            hysteresis_m: 2.0,
            leader_speed_margin_mps: 1.0,
        }
    }
}

/// Time headway and time-to-collision assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadwayConfig {
    /// Static minimum gap (m)
    pub min_gap_m: f64,
    pub time_headway_s: f64,
    pub ttc_thresh_s: f64,
    /// Ego length subtracted from the centre-to-centre distance (m)
    pub ego_len_m: f64,
}

impl Default for HeadwayConfig {
    fn default() -> Self {
        Self {
            min_gap_m: 2.0,
            time_headway_s: 1.5,
            ttc_thresh_s: 2.0,
            ego_len_m: 5.0,
        }
    }
}

/// Auto-brake actuator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrakeConfig {
    /// Speed the actuator brakes down to (km/h)
    pub target_speed_kmh: f64,
    /// Speed removed per brake step (km/h)
    pub reduction_rate_kmh: f64,
}

impl Default for BrakeConfig {
    fn default() -> Self {
        Self {
            target_speed_kmh: 100.0,
            reduction_rate_kmh: 10.0,
        }
    }
}

/// ADAS configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdasConfig {
    pub policy: PolicyKind,
    pub gap: GapThresholds,
    pub cruise: CruiseConfig,
    pub overspeed: OverspeedConfig,
    pub gap_monitor: GapMonitorConfig,
    pub headway: HeadwayConfig,
    pub brake: BrakeConfig,
    pub alerts: AlertConfig,
    pub validation: ValidationConfig,
}

impl AdasConfig {
    /// Reject threshold combinations the rules cannot honour
    pub fn validate(&self) -> Result<(), AdasError> {
        let fail = |msg: String| Err(AdasError::InvalidConfig(msg));

        if self.gap.critical_distance_m >= self.gap.safe_distance_m {
            return fail(format!(
                "critical distance {} must be below safe distance {}",
                self.gap.critical_distance_m, self.gap.safe_distance_m
            ));
        }
        if self.cruise.emergency_distance_m >= self.cruise.safe_distance_m {
            return fail(format!(
                "emergency distance {} must be below safe distance {}",
                self.cruise.emergency_distance_m, self.cruise.safe_distance_m
            ));
        }
        if self.overspeed.hold_s < 0.0 {
            return fail(format!("hold time {} is negative", self.overspeed.hold_s));
        }
        if self.gap_monitor.hysteresis_m < 0.0 {
            return fail(format!(
                "hysteresis {} is negative",
                self.gap_monitor.hysteresis_m
            ));
        }
        if self.brake.reduction_rate_kmh <= 0.0 {
            return fail(format!(
                "brake reduction rate {} must be positive",
                self.brake.reduction_rate_kmh
            ));
        }
        if self.alerts.cooldown_s < 0.0 {
            return fail(format!("cooldown {} is negative", self.alerts.cooldown_s));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AdasConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_tiers_rejected() {
        let mut config = AdasConfig::default();
        config.gap.critical_distance_m = 12.0;
        assert!(matches!(config.validate(), Err(AdasError::InvalidConfig(_))));
    }

    #[test]
    fn test_emergency_at_safe_distance_rejected() {
        let mut config = AdasConfig::default();
        config.cruise.emergency_distance_m = config.cruise.safe_distance_m;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("emergency distance"));
    }

    #[test]
    fn test_negative_hysteresis_rejected() {
        let mut config = AdasConfig::default();
        config.gap_monitor.hysteresis_m = -0.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("hysteresis"));

        config.gap_monitor.hysteresis_m = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_brake_rate_rejected() {
        let mut config = AdasConfig::default();
        config.brake.reduction_rate_kmh = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overspeed_limit_includes_tolerance() {
        let config = OverspeedConfig {
            max_speed_kmh: 60.0,
            tolerance_kmh: 5.0,
            hold_s: 0.0,
        };
        assert_eq!(config.limit(), 65.0);
    }
}
