//! Minimum-gap monitor with release hysteresis

use std::collections::HashMap;
use tracing::{debug, info};

use crate::analysis::{Alert, AlertKind};
use crate::config::GapMonitorConfig;
use crate::units::mps_to_kmh;

/// The leader as seen from one vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaderObservation {
    /// Bumper-to-bumper gap (m)
    pub gap_m: f64,
    /// Leader speed (m/s)
    pub leader_speed_mps: f64,
}

/// Gap monitor output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GapEvent {
    /// Gap below the minimum: slow down to just under the leader
    Close {
        gap_m: f64,
        min_gap_m: f64,
        target_speed_mps: f64,
    },
    /// Gap back above the release distance
    Clear { gap_m: f64, release_m: f64 },
}

impl GapEvent {
    /// Convert to an alert for `subject` travelling at `speed_kmh`
    pub fn into_alert(self, subject: &str, time_s: f64, speed_kmh: f64) -> Alert {
        match self {
            GapEvent::Close {
                gap_m,
                min_gap_m,
                target_speed_mps,
            } => Alert::new(
                AlertKind::DistanceClose,
                subject,
                time_s,
                speed_kmh,
                format!(
                    "gap={:.2}m < {:.2}m; target={:.1}km/h",
                    gap_m,
                    min_gap_m,
                    mps_to_kmh(target_speed_mps)
                ),
            )
            .with_distance(gap_m),
            GapEvent::Clear { gap_m, release_m } => Alert::new(
                AlertKind::DistanceClear,
                subject,
                time_s,
                speed_kmh,
                format!("gap={:.2}m > {:.2}m", gap_m, release_m),
            )
            .with_distance(gap_m),
        }
    }
}

/// Tracks which vehicles are braking for a short gap
#[derive(Debug, Clone, Default)]
pub struct GapMonitor {
    config: GapMonitorConfig,
    brake_active: HashMap<String, bool>,
}

impl GapMonitor {
    pub fn new(config: GapMonitorConfig) -> Self {
        Self {
            config,
            brake_active: HashMap::new(),
        }
    }

    /// Distance the gap must exceed before braking is released
    pub fn release_distance(&self) -> f64 {
        self.config.min_gap_m + self.config.hysteresis_m
    }

    /// Feed one observation for `subject`; `None` means no leader in range
    pub fn update(&mut self, subject: &str, leader: Option<LeaderObservation>) -> Option<GapEvent> {
        let Some(leader) = leader else {
            self.brake_active.insert(subject.to_string(), false);
            return None;
        };

        let active = self.brake_active.get(subject).copied().unwrap_or(false);

        if leader.gap_m < self.config.min_gap_m {
            let target =
                (leader.leader_speed_mps - self.config.leader_speed_margin_mps).max(0.0);
            if !active {
                info!(
                    "{} gap {:.2}m below {:.2}m, braking",
                    subject, leader.gap_m, self.config.min_gap_m
                );
            }
            self.brake_active.insert(subject.to_string(), true);
            return Some(GapEvent::Close {
                gap_m: leader.gap_m,
                min_gap_m: self.config.min_gap_m,
                target_speed_mps: target,
            });
        }

        let release = self.release_distance();
        if active && leader.gap_m > release {
            info!("{} gap {:.2}m safe again, releasing brake", subject, leader.gap_m);
            self.brake_active.insert(subject.to_string(), false);
            return Some(GapEvent::Clear {
                gap_m: leader.gap_m,
                release_m: release,
            });
        }

        if active {
            debug!("{} gap {:.2}m inside hysteresis band", subject, leader.gap_m);
        }
        None
    }

    pub fn is_braking(&self, subject: &str) -> bool {
        self.brake_active.get(subject).copied().unwrap_or(false)
    }

    pub fn reset(&mut self) {
        self.brake_active.clear();
    }
}
