//! Trace I/O
//!
//! Reads SUMO floating-car-data (FCD) traces and writes the tables the ADAS
//! rules run over: per-vehicle FCD rows, ego/lead gap rows, and the annotated
//! headway scenario. Also provides the alert sinks.

pub mod fcd;
pub mod gap;
pub mod scenario;
pub mod sink;

pub use fcd::{
    flatten, parse_fcd, parse_fcd_file, read_fcd_csv, write_fcd_csv, FcdRow, Timestep, VehicleState,
};
pub use gap::{compute_gap, read_gap_csv, write_gap_csv, GapRow, SpeedUnit};
pub use scenario::{
    build_all_vehicles, build_scenario, scenario_alerts, AllVehicleRow, ScenarioRow, Zone,
    ZoneConfig,
};
pub use sink::{AlertRecord, AlertSink, CsvAlertSink, TracingSink, VecSink};

use serde::Serialize;
use std::io::Write;
use thiserror::Error;

/// Trace I/O errors
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Missing attribute '{attr}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attr: &'static str,
    },

    #[error("Invalid number for {field}: {value:?}")]
    InvalidNumber { field: String, value: String },
}

/// Write serializable rows as CSV with a header taken from the field names
pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<usize, TraceError> {
    let mut out = csv::Writer::from_writer(writer);
    for row in rows {
        out.serialize(row)?;
    }
    out.flush()?;
    Ok(rows.len())
}
