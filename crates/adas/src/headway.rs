//! Time-headway and time-to-collision assessment for an ego/lead pair

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::{Alert, AlertKind};
use crate::config::HeadwayConfig;
use crate::units::kmh_to_mps;

/// Relative speeds at or below this are treated as not closing (m/s)
const CLOSING_EPSILON_MPS: f64 = 1e-6;

/// Why braking is needed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrakeReason {
    #[default]
    None,
    Gap,
    Ttc,
    GapAndTtc,
}

impl BrakeReason {
    fn from_flags(gap: bool, ttc: bool) -> Self {
        match (gap, ttc) {
            (true, true) => BrakeReason::GapAndTtc,
            (true, false) => BrakeReason::Gap,
            (false, true) => BrakeReason::Ttc,
            (false, false) => BrakeReason::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BrakeReason::None => "",
            BrakeReason::Gap => "GAP/HEADWAY",
            BrakeReason::Ttc => "TTC",
            BrakeReason::GapAndTtc => "GAP/HEADWAY + TTC",
        }
    }
}

impl fmt::Display for BrakeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-sample assessment of the following situation
#[derive(Debug, Clone, PartialEq)]
pub struct FollowingAssessment {
    pub rel_speed_kmh: f64,
    pub rel_speed_mps: f64,
    /// Time to collision; infinite when not closing (s)
    pub ttc_s: f64,
    /// Gap needed at the current speed (m)
    pub headway_need_m: f64,
    pub need_brake: bool,
    pub brake_reason: BrakeReason,
    pub overspeed: bool,
    pub target_speed_kmh: f64,
}

/// Gap between the ego front bumper and the lead vehicle along x
pub fn lead_distance(ego_x: f64, lead_x: f64, ego_len_m: f64) -> f64 {
    (lead_x - ego_x - ego_len_m).max(0.0)
}

/// Time to collision for a gap closing at `rel_speed_mps`
pub fn time_to_collision(lead_dist_m: f64, rel_speed_mps: f64) -> f64 {
    if rel_speed_mps > CLOSING_EPSILON_MPS {
        if lead_dist_m > 0.0 {
            lead_dist_m / rel_speed_mps
        } else {
            0.0
        }
    } else {
        f64::INFINITY
    }
}

/// Assess one ego/lead sample. `speed_limit_kmh` is the limit of the zone the
/// ego is in, when known.
pub fn assess(
    config: &HeadwayConfig,
    v_self_kmh: f64,
    v_lead_kmh: f64,
    lead_dist_m: f64,
    speed_limit_kmh: Option<f64>,
) -> FollowingAssessment {
    let rel_speed_kmh = v_self_kmh - v_lead_kmh;
    let rel_speed_mps = kmh_to_mps(rel_speed_kmh);
    let ttc_s = time_to_collision(lead_dist_m, rel_speed_mps);

    let headway_need_m = config.min_gap_m + kmh_to_mps(v_self_kmh) * config.time_headway_s;
    let cond_gap = lead_dist_m < headway_need_m;
    let cond_ttc = ttc_s < config.ttc_thresh_s;

    let (overspeed, target_speed_kmh) = match speed_limit_kmh {
        Some(limit) => (v_self_kmh > limit, v_lead_kmh.min(limit)),
        None => (false, v_lead_kmh),
    };

    FollowingAssessment {
        rel_speed_kmh,
        rel_speed_mps,
        ttc_s,
        headway_need_m,
        need_brake: cond_gap || cond_ttc,
        brake_reason: BrakeReason::from_flags(cond_gap, cond_ttc),
        overspeed,
        target_speed_kmh,
    }
}

/// Emits BRAKE and SPEEDING alerts on rising edges only
#[derive(Debug, Clone, Default)]
pub struct EdgeTrigger {
    prev_brake: bool,
    prev_speeding: bool,
}

impl EdgeTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(
        &mut self,
        subject: &str,
        time_s: f64,
        v_self_kmh: f64,
        lead_dist_m: f64,
        assessment: &FollowingAssessment,
        speed_limit_kmh: Option<f64>,
    ) -> Vec<Alert> {
        let brake = assessment
            .need_brake
            .then(|| brake_alert_reason(assessment.brake_reason, assessment.target_speed_kmh));
        let speeding = assessment
            .overspeed
            .then(|| speed_limit_kmh.unwrap_or(f64::NAN));
        self.update_edges(subject, time_s, v_self_kmh, lead_dist_m, brake, speeding)
    }

    /// Edge detection over precomputed flags: `brake` carries the BRAKE
    /// reason while braking is needed, `speeding` the exceeded limit.
    pub fn update_edges(
        &mut self,
        subject: &str,
        time_s: f64,
        v_self_kmh: f64,
        lead_dist_m: f64,
        brake: Option<String>,
        speeding: Option<f64>,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if let Some(reason) = &brake {
            if !self.prev_brake {
                alerts.push(
                    Alert::new(AlertKind::Brake, subject, time_s, v_self_kmh, reason.clone())
                        .with_distance(lead_dist_m),
                );
            }
        }
        self.prev_brake = brake.is_some();

        if let Some(limit) = speeding {
            if !self.prev_speeding {
                alerts.push(
                    Alert::new(
                        AlertKind::Speeding,
                        subject,
                        time_s,
                        v_self_kmh,
                        format!("Speed {:.2} exceeds limit {:.2}", v_self_kmh, limit),
                    )
                    .with_distance(lead_dist_m),
                );
            }
        }
        self.prev_speeding = speeding.is_some();

        alerts
    }
}

/// Reason text of a BRAKE alert
pub fn brake_alert_reason(reason: impl fmt::Display, target_speed_kmh: f64) -> String {
    format!("{} (target≈{:.1} km/h)", reason, target_speed_kmh)
}
