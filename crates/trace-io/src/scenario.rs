//! Annotated headway scenario built from an FCD trace
//!
//! Each ego/lead timestep is converted to km/h, assigned a speed-limit zone
//! and assessed for headway and time-to-collision. The first half of the
//! trace (by median time) is a normal road, the second half a school zone.

use adas::headway::{assess, brake_alert_reason, lead_distance, EdgeTrigger};
use adas::units::mps_to_kmh;
use adas::{Alert, HeadwayConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use crate::fcd::{Timestep, VehicleState};

/// Speed-limit zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Zone {
    Normal,
    School,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Normal => f.write_str("NORMAL"),
            Zone::School => f.write_str("SCHOOL"),
        }
    }
}

/// Limits applied to each zone (km/h)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub normal_limit_kmh: f64,
    pub school_limit_kmh: f64,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            normal_limit_kmh: 80.0,
            school_limit_kmh: 50.0,
        }
    }
}

impl ZoneConfig {
    pub fn limit(&self, zone: Zone) -> f64 {
        match zone {
            Zone::Normal => self.normal_limit_kmh,
            Zone::School => self.school_limit_kmh,
        }
    }
}

/// One row of the scenario table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRow {
    pub t_s: f64,
    pub v_self_kmh: f64,
    pub v_lead_kmh: f64,
    pub lead_dist_m: f64,
    pub rel_speed_kmh: f64,
    pub rel_speed_mps: f64,
    pub ttc_s: f64,
    pub speed_limit_kmh: f64,
    pub zone: Zone,
    pub need_brake: bool,
    pub brake_reason: String,
    pub overspeed: bool,
    pub target_speed_kmh: f64,
}

/// One row of the all-vehicles table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllVehicleRow {
    pub time_s: f64,
    pub id: String,
    pub x_m: f64,
    pub y_m: f64,
    pub speed_kmh: f64,
}

fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}

/// Build the ego/lead scenario. Timesteps missing either vehicle are
/// skipped; missing positions and speeds read as zero. Rows are sorted by
/// time.
pub fn build_scenario(
    timesteps: &[Timestep],
    ego: &str,
    lead: &str,
    headway: &HeadwayConfig,
    zones: &ZoneConfig,
) -> Vec<ScenarioRow> {
    let mut pairs: Vec<(f64, &VehicleState, &VehicleState)> = timesteps
        .iter()
        .filter_map(|ts| {
            let by_id: HashMap<&str, &VehicleState> =
                ts.vehicles.iter().map(|v| (v.id.as_str(), v)).collect();
            Some((ts.time_s, *by_id.get(ego)?, *by_id.get(lead)?))
        })
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let times: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let Some(split) = median(&times) else {
        info!("No timestep contains both {} and {}", ego, lead);
        return Vec::new();
    };
    debug!("Zone split at t={:.2}", split);

    pairs
        .into_iter()
        .map(|(t, e, l)| {
            let v_self = mps_to_kmh(e.speed.unwrap_or(0.0));
            let v_lead = mps_to_kmh(l.speed.unwrap_or(0.0));
            let dist = lead_distance(
                e.x.unwrap_or(0.0),
                l.x.unwrap_or(0.0),
                headway.ego_len_m,
            );
            let zone = if t < split { Zone::Normal } else { Zone::School };
            let limit = zones.limit(zone);
            let a = assess(headway, v_self, v_lead, dist, Some(limit));

            ScenarioRow {
                t_s: t,
                v_self_kmh: v_self,
                v_lead_kmh: v_lead,
                lead_dist_m: dist,
                rel_speed_kmh: a.rel_speed_kmh,
                rel_speed_mps: a.rel_speed_mps,
                ttc_s: a.ttc_s,
                speed_limit_kmh: limit,
                zone,
                need_brake: a.need_brake,
                brake_reason: a.brake_reason.to_string(),
                overspeed: a.overspeed,
                target_speed_kmh: a.target_speed_kmh,
            }
        })
        .collect()
}

/// Rising-edge BRAKE and SPEEDING alerts over a scenario table, taken from
/// the flags stored in each row
pub fn scenario_alerts(rows: &[ScenarioRow], subject: &str) -> Vec<Alert> {
    let mut trigger = EdgeTrigger::new();
    let mut alerts = Vec::new();
    for row in rows {
        let brake = row
            .need_brake
            .then(|| brake_alert_reason(&row.brake_reason, row.target_speed_kmh));
        let speeding = row.overspeed.then_some(row.speed_limit_kmh);
        alerts.extend(trigger.update_edges(
            subject,
            row.t_s,
            row.v_self_kmh,
            row.lead_dist_m,
            brake,
            speeding,
        ));
    }
    info!("{} scenario alerts for {}", alerts.len(), subject);
    alerts
}

/// Every vehicle of every timestep in km/h; missing values read as zero
pub fn build_all_vehicles(timesteps: &[Timestep]) -> Vec<AllVehicleRow> {
    timesteps
        .iter()
        .flat_map(|ts| {
            ts.vehicles.iter().map(move |v| AllVehicleRow {
                time_s: ts.time_s,
                id: v.id.clone(),
                x_m: v.x.unwrap_or(0.0),
                y_m: v.y.unwrap_or(0.0),
                speed_kmh: mps_to_kmh(v.speed.unwrap_or(0.0)),
            })
        })
        .collect()
}
