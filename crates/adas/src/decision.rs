//! Target-speed decisions from the gap to the lead vehicle

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{CruiseConfig, GapThresholds};

/// What the controller asks the vehicle to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    HardBrake,
    SoftBrake,
    Accelerate,
    EmergencyBrake,
    Hold,
    NoLead,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::HardBrake => "HARD_BRAKE",
            Action::SoftBrake => "SOFT_BRAKE",
            Action::Accelerate => "ACCELERATE",
            Action::EmergencyBrake => "EMERGENCY_BRAKE",
            Action::Hold => "HOLD",
            Action::NoLead => "NO_LEAD",
        }
    }

    /// Whether the action lowers the target speed
    pub fn is_braking(&self) -> bool {
        matches!(
            self,
            Action::HardBrake | Action::SoftBrake | Action::EmergencyBrake
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A target speed with the action and reason behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub target_speed: f64,
    pub reason: String,
}

/// Maps the current speed and gap to a target speed.
///
/// Speeds and distances are expected to be validated and finite. `None`
/// distance means no lead vehicle.
pub trait DecisionPolicy {
    fn decide(&self, speed: f64, distance: Option<f64>) -> Decision;
}

fn no_lead(speed: f64) -> Decision {
    Decision {
        action: Action::NoLead,
        target_speed: speed,
        reason: "no lead vehicle, keeping speed".to_string(),
    }
}

/// Hard brake, soft brake or accelerate by fixed deltas
#[derive(Debug, Clone, Default)]
pub struct TieredPolicy {
    thresholds: GapThresholds,
}

impl TieredPolicy {
    pub fn new(thresholds: GapThresholds) -> Self {
        Self { thresholds }
    }
}

impl DecisionPolicy for TieredPolicy {
    fn decide(&self, speed: f64, distance: Option<f64>) -> Decision {
        let Some(distance) = distance else {
            return no_lead(speed);
        };
        let th = &self.thresholds;

        if distance < th.critical_distance_m {
            Decision {
                action: Action::HardBrake,
                target_speed: (speed - th.hard_brake_delta).max(0.0),
                reason: format!(
                    "gap {:.2} m below critical {:.2} m",
                    distance, th.critical_distance_m
                ),
            }
        } else if distance < th.safe_distance_m {
            Decision {
                action: Action::SoftBrake,
                target_speed: (speed - th.soft_brake_delta).max(0.0),
                reason: format!(
                    "gap {:.2} m below safe {:.2} m",
                    distance, th.safe_distance_m
                ),
            }
        } else {
            Decision {
                action: Action::Accelerate,
                target_speed: speed + th.accelerate_delta,
                reason: format!("gap {:.2} m is safe", distance),
            }
        }
    }
}

/// Tiered decision with the default thresholds
pub fn decide_target(speed: f64, distance: Option<f64>) -> Decision {
    TieredPolicy::default().decide(speed, distance)
}

/// Emergency stop, step braking, and acceleration capped at a maximum speed
#[derive(Debug, Clone, Default)]
pub struct CruisePolicy {
    config: CruiseConfig,
}

impl CruisePolicy {
    pub fn new(config: CruiseConfig) -> Self {
        Self { config }
    }
}

impl DecisionPolicy for CruisePolicy {
    fn decide(&self, speed: f64, distance: Option<f64>) -> Decision {
        let Some(distance) = distance else {
            return no_lead(speed);
        };
        let c = &self.config;
        let accel_gap = c.safe_distance_m * c.accel_gap_factor;

        if distance <= c.emergency_distance_m {
            Decision {
                action: Action::EmergencyBrake,
                target_speed: 0.0,
                reason: format!(
                    "gap {:.2} m at or below emergency {:.2} m",
                    distance, c.emergency_distance_m
                ),
            }
        } else if distance < c.safe_distance_m {
            Decision {
                action: Action::SoftBrake,
                target_speed: (speed - c.brake_step_kmh).max(0.0),
                reason: format!("too close: gap {:.2} m", distance),
            }
        } else if distance > accel_gap && speed < c.max_speed_kmh {
            Decision {
                action: Action::Accelerate,
                target_speed: (speed + c.accel_step_kmh).min(c.max_speed_kmh),
                reason: format!("gap {:.2} m above {:.2} m", distance, accel_gap),
            }
        } else {
            Decision {
                action: Action::Hold,
                target_speed: speed,
                reason: format!("gap {:.2} m, holding speed", distance),
            }
        }
    }
}
