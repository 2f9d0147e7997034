//! FCD XML through the gap table into the rule engine

use adas::{AdasConfig, AdasEngine, AlertKind};
use trace_io::{
    compute_gap, flatten, parse_fcd, read_fcd_csv, read_gap_csv, write_fcd_csv, write_gap_csv,
    AlertSink, CsvAlertSink, SpeedUnit,
};

/// Ego at 15 m/s closing on a lead at 10 m/s from 20 m
fn fcd_document() -> String {
    let mut xml = String::from("<fcd-export>\n");
    for i in 0..=20 {
        let t = i as f64 * 0.5;
        let ego_x = 15.0 * t;
        let lead_x = 20.0 + 10.0 * t;
        xml.push_str(&format!(
            "  <timestep time=\"{t:.2}\">\n    <vehicle id=\"ego\" x=\"{ego_x:.2}\" y=\"0\" speed=\"15.0\"/>\n    <vehicle id=\"lead\" x=\"{lead_x:.2}\" y=\"0\" speed=\"10.0\"/>\n  </timestep>\n"
        ));
    }
    xml.push_str("</fcd-export>\n");
    xml
}

#[test]
fn test_fcd_to_alerts() {
    let steps = parse_fcd(fcd_document().as_bytes()).unwrap();
    assert_eq!(steps.len(), 21);

    let mut fcd_csv = Vec::new();
    write_fcd_csv(&mut fcd_csv, &steps).unwrap();
    let rows = read_fcd_csv(fcd_csv.as_slice()).unwrap();
    assert_eq!(rows, flatten(&steps));

    let gap = compute_gap(&rows, "ego", "lead", None, None);
    let mut gap_csv = Vec::new();
    write_gap_csv(&mut gap_csv, &gap).unwrap();
    let gap = read_gap_csv(gap_csv.as_slice()).unwrap();
    assert_eq!(gap.len(), 21);
    assert_eq!(gap[0].distance_m, Some(20.0));

    let mut engine = AdasEngine::new(AdasConfig::default()).unwrap();
    let mut sink = CsvAlertSink::new(Vec::new());
    for row in &gap {
        let eval = engine.evaluate(&row.to_sample(SpeedUnit::Mps)).unwrap();
        for alert in &eval.alerts {
            sink.write(alert).unwrap();
        }
    }

    // Gap drops below 10 m at t=2.5 s and is never released
    assert!(engine.is_braking("ego"));
    let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    let first = text.lines().nth(1).unwrap();
    assert!(first.starts_with("2.5,DISTANCE_CLOSE,ego,54.0"), "{first}");
    assert!(!text.contains(AlertKind::DistanceClear.as_str()));
}
