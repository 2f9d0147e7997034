//! Ego/lead gap table

use adas::units::mps_to_kmh;
use adas::Sample;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use tracing::debug;

use crate::fcd::FcdRow;
use crate::{write_rows, TraceError};

/// Unit of the speed columns in a trace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    /// Metres per second, as SUMO writes
    #[default]
    Mps,
    Kmh,
}

impl SpeedUnit {
    pub fn to_kmh(self, value: f64) -> f64 {
        match self {
            SpeedUnit::Mps => mps_to_kmh(value),
            SpeedUnit::Kmh => value,
        }
    }
}

/// One timestep of the ego/lead pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapRow {
    pub time_s: f64,
    pub ego_id: String,
    pub lead_id: String,
    pub ego_speed: Option<f64>,
    /// Empty when the lead vehicle is absent
    pub lead_speed: Option<f64>,
    /// Longitudinal gap, empty when the lead vehicle is absent (m)
    pub distance_m: Option<f64>,
}

impl GapRow {
    /// Convert to an engine sample; a missing ego speed reads as standstill
    pub fn to_sample(&self, unit: SpeedUnit) -> Sample {
        let mut sample = Sample::new(
            self.time_s,
            unit.to_kmh(self.ego_speed.unwrap_or(0.0)),
            self.distance_m,
        )
        .with_subject(&self.ego_id);
        if let Some(lead) = self.lead_speed {
            sample = sample.with_lead_speed(unit.to_kmh(lead));
        }
        sample
    }
}

/// Build the gap table for `ego` following `lead`.
///
/// Rows are grouped by time in ascending order and filtered to the inclusive
/// `[start, end]` window. A later row for the same vehicle at the same time
/// replaces the earlier one.
pub fn compute_gap(
    rows: &[FcdRow],
    ego: &str,
    lead: &str,
    start: Option<f64>,
    end: Option<f64>,
) -> Vec<GapRow> {
    let mut sorted: Vec<&FcdRow> = rows
        .iter()
        .filter(|r| start.map_or(true, |s| r.time_s >= s))
        .filter(|r| end.map_or(true, |e| r.time_s <= e))
        .collect();
    // Stable: document order is kept within a timestep
    sorted.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));

    let mut out = Vec::new();
    for group in sorted.chunk_by(|a, b| a.time_s == b.time_s) {
        let by_id: HashMap<&str, &FcdRow> =
            group.iter().map(|r| (r.veh_id.as_str(), *r)).collect();

        let Some(ego_row) = by_id.get(ego) else {
            continue;
        };
        let lead_row = by_id.get(lead);

        let distance_m = lead_row.and_then(|l| match (ego_row.x, l.x) {
            (Some(ex), Some(lx)) => Some((lx - ex).max(0.0)),
            _ => None,
        });

        out.push(GapRow {
            time_s: ego_row.time_s,
            ego_id: ego.to_string(),
            lead_id: lead.to_string(),
            ego_speed: ego_row.speed,
            lead_speed: lead_row.and_then(|l| l.speed),
            distance_m,
        });
    }

    debug!("Computed {} gap rows for {} -> {}", out.len(), ego, lead);
    out
}

/// Write gap rows as `time_s,ego_id,lead_id,ego_speed,lead_speed,distance_m`
pub fn write_gap_csv<W: Write>(writer: W, rows: &[GapRow]) -> Result<usize, TraceError> {
    write_rows(writer, rows)
}

/// Read rows written by [`write_gap_csv`]
pub fn read_gap_csv<R: Read>(reader: R) -> Result<Vec<GapRow>, TraceError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
