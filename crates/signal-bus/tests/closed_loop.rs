//! Trace playback feeding the overspeed monitor through the in-memory broker

use adas::{AdasConfig, AlertKind, Sample};
use signal_bus::{MemoryBroker, MonitorConfig, SignalBus, SpeedMonitorLoop, TracePlayer, SPEED};
use std::time::Duration;
use tokio::sync::watch;
use trace_io::{AlertSink, CsvAlertSink};

#[tokio::test(start_paused = true)]
async fn test_player_drives_monitor_into_brake() {
    let broker = MemoryBroker::new();
    let player = TracePlayer::new(
        broker.clone(),
        vec![Sample::new(0.0, 100.0, None), Sample::new(1.0, 130.0, None)],
    );
    let config = MonitorConfig {
        max_cycles: Some(7),
        ..Default::default()
    };
    let mut monitor =
        SpeedMonitorLoop::new(broker.clone(), &AdasConfig::default(), config).without_instant_alerts();
    let mut sink = CsvAlertSink::new(Vec::new());
    let (_tx, rx) = watch::channel(false);

    // Player writes at t=0.5 and t=1.5, between polls
    let delayed_player = async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        player.play(rx.clone()).await
    };
    let (played, report) = tokio::join!(delayed_player, monitor.run(&mut sink, rx.clone()));
    assert_eq!(played.unwrap(), 2);
    let report = report.unwrap();

    // t=0 nothing yet, overspeed from t=2, fires at t=5, ramp 120/110/100
    assert_eq!(report.skipped, 1);
    assert_eq!(report.alerts, 1);
    assert_eq!(report.brake_engagements, 1);
    assert_eq!(broker.current_value(SPEED).await.unwrap(), Some(100.0));

    sink.flush().unwrap();
    let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    let row = text.lines().nth(1).unwrap();
    assert!(
        row.starts_with(&format!("5.0,{},ego,130.0,,", AlertKind::Overspeed)),
        "{row}"
    );
}
