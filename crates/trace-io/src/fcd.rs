//! SUMO floating-car-data (FCD) traces

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::{write_rows, TraceError};

/// One vehicle inside a timestep
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub id: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Speed as written by SUMO (m/s)
    pub speed: Option<f64>,
}

/// All vehicles reported at one simulation time
#[derive(Debug, Clone, PartialEq)]
pub struct Timestep {
    pub time_s: f64,
    pub vehicles: Vec<VehicleState>,
}

impl Timestep {
    pub fn vehicle(&self, id: &str) -> Option<&VehicleState> {
        self.vehicles.iter().find(|v| v.id == id)
    }
}

/// Flat FCD row, one per vehicle per timestep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcdRow {
    pub time_s: f64,
    pub veh_id: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub speed: Option<f64>,
}

fn parse_number(field: &str, raw: &str) -> Result<f64, TraceError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| TraceError::InvalidNumber {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

/// Collect the attributes of an element as owned `(name, value)` pairs
fn attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>, TraceError> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| TraceError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| TraceError::Xml(e.to_string()))?
            .into_owned();
        out.push((key, value));
    }
    Ok(out)
}

fn lookup<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn optional_number(attrs: &[(String, String)], name: &str) -> Result<Option<f64>, TraceError> {
    lookup(attrs, name)
        .map(|raw| parse_number(name, raw))
        .transpose()
}

fn timestep_from(e: &BytesStart<'_>) -> Result<Timestep, TraceError> {
    let attrs = attributes(e)?;
    let raw = lookup(&attrs, "time").ok_or(TraceError::MissingAttribute {
        element: "timestep",
        attr: "time",
    })?;
    Ok(Timestep {
        time_s: parse_number("time", raw)?,
        vehicles: Vec::new(),
    })
}

fn vehicle_from(e: &BytesStart<'_>) -> Result<VehicleState, TraceError> {
    let attrs = attributes(e)?;
    let id = lookup(&attrs, "id").ok_or(TraceError::MissingAttribute {
        element: "vehicle",
        attr: "id",
    })?;
    Ok(VehicleState {
        id: id.to_string(),
        x: optional_number(&attrs, "x")?,
        y: optional_number(&attrs, "y")?,
        speed: optional_number(&attrs, "speed")?,
    })
}

/// Parse an FCD document.
///
/// Only `<vehicle>` elements directly inside a `<timestep>` are read; other
/// elements (persons, containers) are ignored.
pub fn parse_fcd<R: BufRead>(reader: R) -> Result<Vec<Timestep>, TraceError> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut timesteps = Vec::new();
    let mut current: Option<Timestep> = None;
    // Elements open inside the current timestep
    let mut depth = 0usize;
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if let Some(ts) = current.as_mut() {
                    if depth == 0 && e.name().as_ref() == b"vehicle" {
                        ts.vehicles.push(vehicle_from(&e)?);
                    }
                    depth += 1;
                } else if e.name().as_ref() == b"timestep" {
                    current = Some(timestep_from(&e)?);
                    depth = 0;
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(ts) = current.as_mut() {
                    if depth == 0 && e.name().as_ref() == b"vehicle" {
                        ts.vehicles.push(vehicle_from(&e)?);
                    }
                } else if e.name().as_ref() == b"timestep" {
                    timesteps.push(timestep_from(&e)?);
                }
            }
            Ok(Event::End(_)) => {
                if current.is_some() {
                    if depth == 0 {
                        timesteps.extend(current.take());
                    } else {
                        depth -= 1;
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(TraceError::Xml(format!(
                    "at byte {}: {}",
                    xml.buffer_position(),
                    e
                )))
            }
        }
        buf.clear();
    }

    debug!("Parsed {} FCD timesteps", timesteps.len());
    Ok(timesteps)
}

/// Parse an FCD file from disk
pub fn parse_fcd_file<P: AsRef<Path>>(path: P) -> Result<Vec<Timestep>, TraceError> {
    let path = path.as_ref();
    info!("Reading FCD trace {}", path.display());
    let file = File::open(path)?;
    parse_fcd(BufReader::new(file))
}

/// Flatten timesteps into one row per vehicle, in document order
pub fn flatten(timesteps: &[Timestep]) -> Vec<FcdRow> {
    timesteps
        .iter()
        .flat_map(|ts| {
            ts.vehicles.iter().map(move |v| FcdRow {
                time_s: ts.time_s,
                veh_id: v.id.clone(),
                x: v.x,
                y: v.y,
                speed: v.speed,
            })
        })
        .collect()
}

/// Write timesteps as `time_s,veh_id,x,y,speed`; returns the row count
pub fn write_fcd_csv<W: Write>(writer: W, timesteps: &[Timestep]) -> Result<usize, TraceError> {
    write_rows(writer, &flatten(timesteps))
}

/// Read rows written by [`write_fcd_csv`]
pub fn read_fcd_csv<R: Read>(reader: R) -> Result<Vec<FcdRow>, TraceError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FCD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<fcd-export>
    <timestep time="0.00">
        <vehicle id="ego" x="100.0" y="5.0" speed="10.0" lane="e_0"/>
        <vehicle id="lead" x="130.0" y="5.0" speed="9.5"/>
    </timestep>
    <timestep time="0.10">
        <vehicle id="ego" x="101.0" speed="10.2"/>
        <person id="p0" x="3.0" y="1.0"/>
    </timestep>
    <timestep time="0.20"/>
</fcd-export>"#;

    #[test]
    fn test_parse_fcd() {
        let steps = parse_fcd(FCD.as_bytes()).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].vehicles.len(), 2);
        assert_eq!(steps[0].vehicle("lead").unwrap().speed, Some(9.5));

        let ego = steps[1].vehicle("ego").unwrap();
        assert_eq!(ego.x, Some(101.0));
        assert_eq!(ego.y, None);
        assert_eq!(steps[1].vehicles.len(), 1);
        assert!(steps[2].vehicles.is_empty());
    }

    #[test]
    fn test_nested_vehicles_ignored() {
        let xml = r#"<fcd-export>
    <timestep time="1">
        <container id="c"><vehicle id="inner" x="1"/></container>
        <vehicle id="direct" x="2"/>
    </timestep>
    <timestep time="2"><vehicle id="next" x="3"/></timestep>
</fcd-export>"#;
        let steps = parse_fcd(xml.as_bytes()).unwrap();
        assert_eq!(steps.len(), 2);
        let ids: Vec<&str> = steps[0].vehicles.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["direct"]);
        assert_eq!(steps[1].vehicles[0].id, "next");
    }

    #[test]
    fn test_missing_time_is_error() {
        let err = parse_fcd(r#"<fcd-export><timestep><vehicle id="a"/></timestep></fcd-export>"#.as_bytes());
        assert!(matches!(
            err,
            Err(TraceError::MissingAttribute { element: "timestep", attr: "time" })
        ));
    }

    #[test]
    fn test_missing_vehicle_id_is_error() {
        let err = parse_fcd(r#"<fcd-export><timestep time="1"><vehicle x="1"/></timestep></fcd-export>"#.as_bytes());
        assert!(matches!(err, Err(TraceError::MissingAttribute { attr: "id", .. })));
    }

    #[test]
    fn test_bad_number_is_error() {
        let err = parse_fcd(
            r#"<fcd-export><timestep time="1"><vehicle id="a" speed="fast"/></timestep></fcd-export>"#
                .as_bytes(),
        );
        assert!(matches!(err, Err(TraceError::InvalidNumber { .. })));
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let err = parse_fcd(r#"<fcd-export><timestep time="1"></vehicle></fcd-export>"#.as_bytes());
        assert!(matches!(err, Err(TraceError::Xml(_))));
    }

    #[test]
    fn test_csv_empty_cells_for_missing() {
        let steps = parse_fcd(FCD.as_bytes()).unwrap();
        let mut out = Vec::new();
        assert_eq!(write_fcd_csv(&mut out, &steps).unwrap(), 3);

        let text = String::from_utf8(out.clone()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("time_s,veh_id,x,y,speed"));
        assert_eq!(lines.nth(2), Some("0.1,ego,101.0,,10.2"));

        let rows = read_fcd_csv(out.as_slice()).unwrap();
        assert_eq!(rows, flatten(&steps));
    }
}
