//! Vehicle signal bus
//!
//! Broker seam for `Vehicle.Speed`, `Vehicle.FrontDistance` and
//! `Vehicle.TargetSpeed`, an in-process broker, and the loops that run the
//! ADAS rules against it: overspeed monitoring with auto-brake, gap replay,
//! trace playback and the cruise controller.

mod brake;
mod bus;
mod config;
mod error;
mod memory;
mod monitor;
mod replay;
pub mod signal;

pub use brake::{AutoBrake, BrakeOutcome};
pub use bus::{SignalBus, Snapshot, Subscription};
pub use config::{ControllerConfig, MonitorConfig, ReplayConfig};
pub use error::BusError;
pub use memory::MemoryBroker;
pub use monitor::{MonitorReport, SpeedMonitorLoop};
pub use replay::{replay_gap, CruiseController, ReplayStep, TracePlayer};
pub use signal::{Datapoint, FRONT_DISTANCE, SPEED, TARGET_SPEED};

use std::time::Duration;
use tokio::sync::watch;

/// Sleep for `pause` unless shutdown is requested first. Returns true when
/// the caller should stop; a dropped shutdown sender counts as a request.
pub(crate) async fn wait_or_shutdown(pause: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let closed = tokio::select! {
        _ = tokio::time::sleep(pause) => false,
        changed = shutdown.changed() => changed.is_err(),
    };
    closed || *shutdown.borrow()
}
