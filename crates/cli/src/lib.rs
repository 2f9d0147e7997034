//! ADAS demo driver
//!
//! Converts SUMO traces, evaluates the ADAS rules over them and runs the
//! broker loops against an in-process signal bus.

pub mod commands;
pub mod settings;

use adas::PolicyKind;
use clap::{Parser, Subcommand};
use data_validator::Validator;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trace_io::SpeedUnit;

pub use settings::{load_settings, Settings};

#[derive(Debug, Parser)]
#[command(name = "adas-demo")]
#[command(about = "ADAS threshold rules over SUMO traces and vehicle signals", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `adas=debug,info`; defaults to RUST_LOG or `info`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert an FCD XML trace to CSV
    FcdToCsv {
        /// SUMO FCD XML file
        fcd: PathBuf,

        #[arg(short, long, default_value = "fcd.csv")]
        out: PathBuf,
    },

    /// Build the ego/lead gap table from an FCD CSV
    ComputeGap {
        /// CSV written by fcd-to-csv
        fcd_csv: PathBuf,

        #[arg(long, default_value = "ego")]
        ego: String,

        #[arg(long, default_value = "lead")]
        lead: String,

        /// First time to include (s)
        #[arg(long)]
        start: Option<f64>,

        /// Last time to include (s)
        #[arg(long)]
        end: Option<f64>,

        #[arg(short, long, default_value = "gap.csv")]
        out: PathBuf,
    },

    /// Build the annotated headway/TTC scenario from an FCD XML trace
    Scenario {
        fcd: PathBuf,

        #[arg(long, default_value = "ego")]
        ego: String,

        #[arg(long, default_value = "lead")]
        lead: String,

        #[arg(short, long, default_value = "scenario.csv")]
        out: PathBuf,

        /// Also write every vehicle of every timestep
        #[arg(long)]
        all_out: Option<PathBuf>,

        /// Write BRAKE/SPEEDING alerts to this CSV
        #[arg(long)]
        alerts_out: Option<PathBuf>,
    },

    /// Replay a gap table through the decision policy
    Replay {
        gap_csv: PathBuf,

        /// Publish speed, distance and target to the bus
        #[arg(long)]
        publish: bool,

        /// Pause between rows (s)
        #[arg(long)]
        step: Option<f64>,

        #[arg(long, value_parser = parse_policy)]
        policy: Option<PolicyKind>,

        /// Unit of the speed columns: mps or kmh
        #[arg(long, value_parser = parse_speed_unit)]
        speed_unit: Option<SpeedUnit>,
    },

    /// Run every rule over a gap table and report decisions and alerts
    Evaluate {
        gap_csv: PathBuf,

        #[arg(long)]
        alerts_out: Option<PathBuf>,

        /// Print each evaluation as a JSON line
        #[arg(long)]
        json: bool,

        #[arg(long, value_parser = parse_policy)]
        policy: Option<PolicyKind>,

        #[arg(long, value_parser = parse_speed_unit)]
        speed_unit: Option<SpeedUnit>,
    },

    /// Poll Vehicle.Speed, alert on overspeed and auto-brake
    Monitor {
        /// Gap table played into the bus as the speed source
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Polling rate (Hz)
        #[arg(long)]
        hz: Option<f64>,

        #[arg(long)]
        max_cycles: Option<u64>,

        /// Speed limit (km/h)
        #[arg(long, value_parser = parse_speed_limit)]
        max_speed: Option<f64>,

        /// Seconds overspeed must persist before braking
        #[arg(long)]
        hold: Option<f64>,

        #[arg(long)]
        alerts_out: Option<PathBuf>,

        /// Alert only, never brake
        #[arg(long)]
        no_brake: bool,

        /// Run the cruise controller alongside
        #[arg(long)]
        cruise: bool,
    },
}

fn parse_policy(s: &str) -> Result<PolicyKind, String> {
    match s.to_lowercase().as_str() {
        "tiered" => Ok(PolicyKind::Tiered),
        "cruise" => Ok(PolicyKind::Cruise),
        other => Err(format!("unknown policy '{}', expected tiered or cruise", other)),
    }
}

fn parse_speed_limit(s: &str) -> Result<f64, String> {
    Validator::default()
        .parse_speed(Some(s))
        .map_err(|e| e.to_string())
}

fn parse_speed_unit(s: &str) -> Result<SpeedUnit, String> {
    match s.to_lowercase().as_str() {
        "mps" | "m/s" => Ok(SpeedUnit::Mps),
        "kmh" | "km/h" => Ok(SpeedUnit::Kmh),
        other => Err(format!("unknown speed unit '{}', expected mps or kmh", other)),
    }
}

/// Initialize logging
pub fn init_logging(level: Option<&str>, json: bool) -> anyhow::Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {}", e))
}

/// Fold command-line overrides into the loaded settings
pub fn apply_overrides(settings: &mut Settings, command: &Commands) {
    match command {
        Commands::Replay {
            publish,
            step,
            policy,
            speed_unit,
            ..
        } => {
            settings.replay.publish |= *publish;
            if let Some(step) = step {
                settings.replay.step_s = *step;
            }
            if let Some(policy) = policy {
                settings.adas.policy = *policy;
            }
            if let Some(unit) = speed_unit {
                settings.replay.speed_unit = *unit;
            }
        }
        Commands::Evaluate {
            policy, speed_unit, ..
        } => {
            if let Some(policy) = policy {
                settings.adas.policy = *policy;
            }
            if let Some(unit) = speed_unit {
                settings.replay.speed_unit = *unit;
            }
        }
        Commands::Monitor {
            hz,
            max_cycles,
            max_speed,
            hold,
            no_brake,
            ..
        } => {
            if let Some(hz) = hz {
                settings.monitor.hz = *hz;
            }
            if max_cycles.is_some() {
                settings.monitor.max_cycles = *max_cycles;
            }
            if let Some(max_speed) = max_speed {
                settings.adas.overspeed.max_speed_kmh = *max_speed;
            }
            if let Some(hold) = hold {
                settings.adas.overspeed.hold_s = *hold;
            }
            if *no_brake {
                settings.monitor.auto_brake = false;
            }
        }
        _ => {}
    }
}

/// Run one command with fully resolved settings
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = load_settings(cli.config.as_deref())?;
    apply_overrides(&mut settings, &cli.command);
    settings.adas.validate()?;

    match cli.command {
        Commands::FcdToCsv { fcd, out } => {
            commands::fcd_to_csv(&fcd, &out)?;
        }
        Commands::ComputeGap {
            fcd_csv,
            ego,
            lead,
            start,
            end,
            out,
        } => {
            commands::compute_gap_table(&fcd_csv, &ego, &lead, start, end, &out)?;
        }
        Commands::Scenario {
            fcd,
            ego,
            lead,
            out,
            all_out,
            alerts_out,
        } => {
            let summary = commands::scenario(
                &settings,
                &fcd,
                &ego,
                &lead,
                &out,
                all_out.as_deref(),
                alerts_out.as_deref(),
            )?;
            println!(
                "{} scenario rows, {} alerts",
                summary.rows, summary.alerts
            );
        }
        Commands::Replay { gap_csv, .. } => {
            let steps = commands::replay(&settings, &gap_csv).await?;
            println!("{} rows replayed", steps.len());
        }
        Commands::Evaluate {
            gap_csv,
            alerts_out,
            json,
            ..
        } => {
            let stdout = std::io::stdout();
            let summary = commands::evaluate(
                &settings,
                &gap_csv,
                settings.replay.speed_unit,
                alerts_out.as_deref(),
                json,
                stdout.lock(),
            )?;
            if !json {
                print!("{}", commands::render_summary(&summary));
                std::io::stdout().flush()?;
            }
        }
        Commands::Monitor {
            trace,
            alerts_out,
            cruise,
            ..
        } => {
            info!(
                "Monitoring {} (limit {:.1} km/h, hold {:.1} s)",
                signal_bus::SPEED,
                settings.adas.overspeed.limit(),
                settings.adas.overspeed.hold_s
            );
            let summary =
                commands::monitor(&settings, trace.as_deref(), alerts_out.as_deref(), cruise)
                    .await?;
            println!(
                "{} cycles, {} alerts, {} brake engagements",
                summary.report.cycles, summary.report.alerts, summary.report.brake_engagements
            );
        }
    }
    Ok(())
}
