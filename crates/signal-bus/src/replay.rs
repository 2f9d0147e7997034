//! Gap replay, trace playback and the cruise controller loop

use adas::{CruisePolicy, Decision, DecisionPolicy, Sample};
use data_validator::{QualityGate, QualityReport};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use trace_io::GapRow;

use crate::bus::SignalBus;
use crate::config::{secs, ControllerConfig, ReplayConfig};
use crate::error::BusError;
use crate::signal::{FRONT_DISTANCE, SPEED, TARGET_SPEED};
use crate::wait_or_shutdown;

/// One replayed gap row and the decision taken for it
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayStep {
    pub time_s: f64,
    /// Ego speed (km/h)
    pub speed: f64,
    pub distance: Option<f64>,
    pub decision: Decision,
}

/// Decide a target speed for every gap row, optionally publishing speed,
/// distance and target to the bus, pausing `step_s` between rows.
pub async fn replay_gap<B, P>(
    rows: &[GapRow],
    policy: &P,
    bus: &B,
    config: &ReplayConfig,
) -> Result<Vec<ReplayStep>, BusError>
where
    B: SignalBus,
    P: DecisionPolicy + ?Sized,
{
    info!(
        "Replaying {} gap rows (publish={})",
        rows.len(),
        config.publish
    );
    let mut steps = Vec::with_capacity(rows.len());

    for row in rows {
        let sample = row.to_sample(config.speed_unit);
        let decision = policy.decide(sample.speed_kmh, sample.distance_m);
        info!(
            "[REPLAY] t={:.2} ego_sp={:.1} dist={:?} -> target={:.1} action={}",
            sample.time_s, sample.speed_kmh, sample.distance_m, decision.target_speed, decision.action
        );

        if config.publish {
            let mut payload = vec![(SPEED, sample.speed_kmh)];
            if let Some(d) = sample.distance_m {
                payload.push((FRONT_DISTANCE, d));
            }
            bus.set_current_values(&payload).await?;
            bus.set_current_values(&[(TARGET_SPEED, decision.target_speed)])
                .await?;
        }

        steps.push(ReplayStep {
            time_s: sample.time_s,
            speed: sample.speed_kmh,
            distance: sample.distance_m,
            decision,
        });
        tokio::time::sleep(config.step()).await;
    }

    Ok(steps)
}

/// Publishes a recorded trace into the bus at its own pace, standing in for
/// a live simulator feeding speed and distance.
pub struct TracePlayer<B> {
    bus: B,
    samples: Vec<Sample>,
}

impl<B: SignalBus> TracePlayer<B> {
    pub fn new(bus: B, samples: Vec<Sample>) -> Self {
        Self { bus, samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Gate the first two speed readings; `None` for traces shorter than two
    pub fn quality(&self) -> Option<QualityReport> {
        match self.samples.as_slice() {
            [a, b, ..] => Some(QualityGate::default().check(a.speed_kmh, b.speed_kmh)),
            _ => None,
        }
    }

    /// Play the trace. Each sample is written at its offset from the first
    /// sample time; samples out of order are written immediately. Returns
    /// the number of samples written before the end or shutdown.
    pub async fn play(&self, mut shutdown: watch::Receiver<bool>) -> Result<usize, BusError> {
        let Some(first) = self.samples.first() else {
            return Ok(0);
        };
        let t0 = first.time_s;
        let start = Instant::now();
        info!("Playing {} samples into the bus", self.samples.len());
        if let Some(report) = self.quality() {
            if !report.passed() {
                warn!("Trace may not exercise the monitor, playing anyway");
            }
        }

        for (i, sample) in self.samples.iter().enumerate() {
            // Offsets past the clock's range are never due
            let wait = match start.checked_add(secs(sample.time_s - t0)) {
                Some(due) => due.saturating_duration_since(Instant::now()),
                None => Duration::MAX,
            };
            if !wait.is_zero() && wait_or_shutdown(wait, &mut shutdown).await {
                info!("Playback stopped after {} samples", i);
                return Ok(i);
            }

            let mut payload = vec![(SPEED, sample.speed_kmh)];
            if let Some(d) = sample.distance_m {
                payload.push((FRONT_DISTANCE, d));
            }
            self.bus.set_current_values(&payload).await?;
            debug!("Played t={:.2} speed={:.1}", sample.time_s, sample.speed_kmh);
        }

        Ok(self.samples.len())
    }
}

/// Reads speed and distance, applies the cruise policy and writes the
/// target speed back.
pub struct CruiseController<B> {
    bus: B,
    policy: CruisePolicy,
    config: ControllerConfig,
}

impl<B: SignalBus> CruiseController<B> {
    pub fn new(bus: B, policy: CruisePolicy, config: ControllerConfig) -> Self {
        Self {
            bus,
            policy,
            config,
        }
    }

    /// One control step. A missing speed reads as standstill; a missing
    /// distance means no lead vehicle.
    pub async fn step(&self) -> Result<Decision, BusError> {
        let values = self.bus.get_current_values(&[SPEED, FRONT_DISTANCE]).await?;
        let value = |path: &str| values.get(path).copied().flatten().map(|dp| dp.value);
        let speed = value(SPEED).unwrap_or(0.0);
        let distance = value(FRONT_DISTANCE);

        let decision = self.policy.decide(speed, distance);
        if decision.action.is_braking() {
            info!(
                "[ADAS] {} (dist {:?}) -> {:.1} km/h",
                decision.action, distance, decision.target_speed
            );
        }
        self.bus
            .set_current_values(&[(TARGET_SPEED, decision.target_speed)])
            .await?;
        Ok(decision)
    }

    /// Step every `interval_s` until `max_steps` or shutdown. Step errors are
    /// logged and the loop carries on. Returns the number of steps taken.
    pub async fn run(
        &self,
        max_steps: Option<u64>,
        mut shutdown: watch::Receiver<bool>,
    ) -> u64 {
        let mut steps = 0;
        while !max_steps.is_some_and(|max| steps >= max) && !*shutdown.borrow() {
            steps += 1;
            if let Err(e) = self.step().await {
                warn!("[ADAS] Control step failed: {}", e);
            }
            if wait_or_shutdown(self.config.interval(), &mut shutdown).await {
                break;
            }
        }
        info!("Cruise controller stopped after {} steps", steps);
        steps
    }
}
