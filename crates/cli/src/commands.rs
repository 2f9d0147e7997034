//! Subcommand implementations

use adas::{AdasEngine, CruisePolicy, DecisionPolicy, PolicyKind, Sample, TieredPolicy};
use anyhow::Context;
use signal_bus::{CruiseController, MemoryBroker, SpeedMonitorLoop, TracePlayer};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use trace_io::{
    build_all_vehicles, build_scenario, compute_gap, parse_fcd_file, read_fcd_csv, read_gap_csv,
    scenario_alerts, write_fcd_csv, write_gap_csv, write_rows, AlertSink, CsvAlertSink, GapRow,
    SpeedUnit, TraceError, TracingSink,
};

use crate::settings::Settings;

/// Writes every alert to each inner sink
pub struct FanoutSink {
    sinks: Vec<Box<dyn AlertSink>>,
}

impl FanoutSink {
    /// Log alerts, and append them to `csv_path` when given
    pub fn new(csv_path: Option<&Path>) -> anyhow::Result<Self> {
        let mut sinks: Vec<Box<dyn AlertSink>> = vec![Box::new(TracingSink)];
        if let Some(path) = csv_path {
            sinks.push(Box::new(CsvAlertSink::create(path)?));
        }
        Ok(Self { sinks })
    }
}

impl AlertSink for FanoutSink {
    fn write(&mut self, alert: &adas::Alert) -> Result<(), TraceError> {
        for sink in self.sinks.iter_mut() {
            sink.write(alert)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TraceError> {
        for sink in self.sinks.iter_mut() {
            sink.flush()?;
        }
        Ok(())
    }
}

fn create(path: &Path) -> anyhow::Result<File> {
    File::create(path).with_context(|| format!("cannot create {}", path.display()))
}

fn open(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn load_gap(path: &Path) -> anyhow::Result<Vec<GapRow>> {
    read_gap_csv(open(path)?).with_context(|| format!("cannot read gap table {}", path.display()))
}

/// FCD XML → flat per-vehicle CSV
pub fn fcd_to_csv(fcd: &Path, out: &Path) -> anyhow::Result<usize> {
    let steps = parse_fcd_file(fcd)?;
    let rows = write_fcd_csv(create(out)?, &steps)?;
    info!("Wrote {} rows to {}", rows, out.display());
    Ok(rows)
}

/// FCD CSV → ego/lead gap table
pub fn compute_gap_table(
    fcd_csv: &Path,
    ego: &str,
    lead: &str,
    start: Option<f64>,
    end: Option<f64>,
    out: &Path,
) -> anyhow::Result<usize> {
    let rows = read_fcd_csv(open(fcd_csv)?)?;
    let gap = compute_gap(&rows, ego, lead, start, end);
    if gap.is_empty() {
        warn!("No timestep contains {} in the selected window", ego);
    }
    let written = write_gap_csv(create(out)?, &gap)?;
    info!("Wrote {} gap rows to {}", written, out.display());
    Ok(written)
}

/// Row counts written by the scenario command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioSummary {
    pub rows: usize,
    pub vehicles: usize,
    pub alerts: usize,
}

/// FCD XML → annotated headway scenario, optional all-vehicle table and
/// rising-edge alert log
pub fn scenario(
    settings: &Settings,
    fcd: &Path,
    ego: &str,
    lead: &str,
    out: &Path,
    all_out: Option<&Path>,
    alerts_out: Option<&Path>,
) -> anyhow::Result<ScenarioSummary> {
    let steps = parse_fcd_file(fcd)?;
    let headway = &settings.adas.headway;
    let rows = build_scenario(&steps, ego, lead, headway, &settings.zones);
    write_rows(create(out)?, &rows)?;
    info!("Wrote {} scenario rows to {}", rows.len(), out.display());

    let mut vehicles = 0;
    if let Some(path) = all_out {
        vehicles = write_rows(create(path)?, &build_all_vehicles(&steps))?;
        info!("Wrote {} vehicle rows to {}", vehicles, path.display());
    }

    let alerts = scenario_alerts(&rows, ego);
    let mut sink = FanoutSink::new(alerts_out)?;
    for alert in &alerts {
        sink.write(alert)?;
    }
    sink.flush()?;

    Ok(ScenarioSummary {
        rows: rows.len(),
        vehicles,
        alerts: alerts.len(),
    })
}

fn policy_for(settings: &Settings) -> Box<dyn DecisionPolicy + Send + Sync> {
    match settings.adas.policy {
        PolicyKind::Tiered => Box::new(TieredPolicy::new(settings.adas.gap.clone())),
        PolicyKind::Cruise => Box::new(CruisePolicy::new(settings.adas.cruise.clone())),
    }
}

/// Replay a gap table through the decision policy, optionally publishing to
/// an in-process broker
pub async fn replay(settings: &Settings, gap_csv: &Path) -> anyhow::Result<Vec<signal_bus::ReplayStep>> {
    let rows = load_gap(gap_csv)?;
    let broker = MemoryBroker::new();
    let policy = policy_for(settings);
    let steps = signal_bus::replay_gap(&rows, policy.as_ref(), &broker, &settings.replay).await?;
    info!("Replayed {} rows", steps.len());
    Ok(steps)
}

/// Per-action counts and alert total for an evaluation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluateSummary {
    pub samples: usize,
    pub rejected: usize,
    pub alerts: usize,
    pub actions: BTreeMap<String, usize>,
}

/// Run the full rule engine over a gap table. With `json`, each evaluation
/// is written to `out` as one JSON line.
pub fn evaluate<W: Write>(
    settings: &Settings,
    gap_csv: &Path,
    speed_unit: SpeedUnit,
    alerts_out: Option<&Path>,
    json: bool,
    mut out: W,
) -> anyhow::Result<EvaluateSummary> {
    let rows = load_gap(gap_csv)?;
    let mut engine = AdasEngine::new(settings.adas.clone())?;
    let mut sink = FanoutSink::new(alerts_out)?;
    let mut summary = EvaluateSummary::default();

    for row in &rows {
        let sample: Sample = row.to_sample(speed_unit);
        let eval = match engine.evaluate(&sample) {
            Ok(eval) => eval,
            Err(e) => {
                warn!("Skipping row at t={}: {}", row.time_s, e);
                summary.rejected += 1;
                continue;
            }
        };
        summary.samples += 1;
        *summary
            .actions
            .entry(eval.decision.action.to_string())
            .or_default() += 1;
        for alert in &eval.alerts {
            sink.write(alert)?;
            summary.alerts += 1;
        }
        if json {
            serde_json::to_writer(&mut out, &eval)?;
            writeln!(out)?;
        }
    }
    sink.flush()?;

    info!(
        "Evaluated {} samples ({} rejected), {} alerts",
        summary.samples, summary.rejected, summary.alerts
    );
    Ok(summary)
}

/// What ran during a monitor session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSummary {
    pub report: signal_bus::MonitorReport,
    pub played: usize,
    pub controller_steps: u64,
}

/// Run the overspeed monitor against an in-process broker, optionally fed
/// by a gap trace and with the cruise controller alongside. Stops after the
/// configured cycles or on Ctrl-C.
pub async fn monitor(
    settings: &Settings,
    trace: Option<&Path>,
    alerts_out: Option<&Path>,
    cruise: bool,
) -> anyhow::Result<MonitorSummary> {
    let broker = MemoryBroker::new();
    let (tx, rx) = watch::channel(false);
    let tx = Arc::new(tx);

    {
        let tx = Arc::clone(&tx);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, shutting down");
                tx.send_replace(true);
            }
        });
    }

    let player = match trace {
        Some(path) => {
            let samples = load_gap(path)?
                .iter()
                .map(|r| r.to_sample(settings.replay.speed_unit))
                .collect();
            Some(TracePlayer::new(broker.clone(), samples))
        }
        None => None,
    };
    let controller = cruise.then(|| {
        CruiseController::new(
            broker.clone(),
            CruisePolicy::new(settings.adas.cruise.clone()),
            settings.controller.clone(),
        )
    });

    let mut monitor = SpeedMonitorLoop::new(broker.clone(), &settings.adas, settings.monitor.clone());
    let mut sink = FanoutSink::new(alerts_out)?;

    let monitor_run = async {
        let report = monitor.run(&mut sink, rx.clone()).await;
        tx.send_replace(true);
        report
    };
    let player_run = async {
        match &player {
            Some(p) => p.play(rx.clone()).await,
            None => Ok(0),
        }
    };
    let controller_run = async {
        match &controller {
            Some(c) => c.run(None, rx.clone()).await,
            None => 0,
        }
    };
    let (report, played, controller_steps) = tokio::join!(monitor_run, player_run, controller_run);

    Ok(MonitorSummary {
        report: report?,
        played: played?,
        controller_steps,
    })
}

/// Short text summary of an evaluation
pub fn render_summary(summary: &EvaluateSummary) -> String {
    let mut text = format!(
        "{} samples, {} rejected, {} alerts\n",
        summary.samples, summary.rejected, summary.alerts
    );
    for (action, count) in &summary.actions {
        text.push_str(&format!("  {:<16}{}\n", action, count));
    }
    text
}
