//! Advanced Driver Assistance System (ADAS) rules
//!
//! Threshold rules over a followed vehicle's speed and gap trace:
//! - Target-speed decisions from the gap to the lead vehicle
//! - Overspeed detection with hold-time debounce
//! - Minimum-gap braking with release hysteresis
//! - Time-headway and time-to-collision assessment
//! - Stepwise brake ramps

pub mod analysis;
pub mod brake;
pub mod config;
pub mod decision;
pub mod engine;
pub mod gap;
pub mod headway;
pub mod overspeed;
pub mod units;

pub use analysis::{Alert, AlertKind, Severity};
pub use brake::{brake_ramp, decelerate};
pub use config::{
    AdasConfig, BrakeConfig, CruiseConfig, GapMonitorConfig, GapThresholds, HeadwayConfig,
    OverspeedConfig, PolicyKind,
};
pub use decision::{decide_target, Action, CruisePolicy, Decision, DecisionPolicy, TieredPolicy};
pub use engine::{AdasEngine, Evaluation, Sample, DEFAULT_SUBJECT};
pub use gap::{GapEvent, GapMonitor, LeaderObservation};
pub use headway::{assess, BrakeReason, EdgeTrigger, FollowingAssessment};
pub use overspeed::{OverspeedDebouncer, SpeedMonitor};

use data_validator::ValidationError;
use thiserror::Error;

/// ADAS error types
#[derive(Error, Debug)]
pub enum AdasError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid sample: {0}")]
    InvalidSample(#[from] ValidationError),
}
