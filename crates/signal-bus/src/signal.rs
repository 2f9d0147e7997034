//! Vehicle signal paths and datapoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current vehicle speed (km/h)
pub const SPEED: &str = "Vehicle.Speed";
/// Distance to the vehicle ahead (m)
pub const FRONT_DISTANCE: &str = "Vehicle.FrontDistance";
/// Speed requested by the controller (km/h)
pub const TARGET_SPEED: &str = "Vehicle.TargetSpeed";

/// Signals every broker knows about
pub const STANDARD_SIGNALS: [&str; 3] = [SPEED, FRONT_DISTANCE, TARGET_SPEED];

/// A value as stored by the broker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl Datapoint {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            timestamp: Utc::now(),
        }
    }
}
