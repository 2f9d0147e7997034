//! Rule engine over streamed `(time, speed, distance)` samples

use alerting::AlertManager;
use data_validator::Validator;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::analysis::Alert;
use crate::config::{AdasConfig, PolicyKind};
use crate::decision::{CruisePolicy, Decision, DecisionPolicy, TieredPolicy};
use crate::gap::{GapMonitor, LeaderObservation};
use crate::overspeed::OverspeedDebouncer;
use crate::units::kmh_to_mps;
use crate::AdasError;

/// Subject used when a trace carries a single vehicle
pub const DEFAULT_SUBJECT: &str = "ego";

/// One sample of the followed vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time_s: f64,
    pub subject: String,
    pub speed_kmh: f64,
    /// Gap to the lead vehicle; `None` when there is no leader
    pub distance_m: Option<f64>,
    pub lead_speed_kmh: Option<f64>,
}

impl Sample {
    pub fn new(time_s: f64, speed_kmh: f64, distance_m: Option<f64>) -> Self {
        Self {
            time_s,
            subject: DEFAULT_SUBJECT.to_string(),
            speed_kmh,
            distance_m,
            lead_speed_kmh: None,
        }
    }

    pub fn with_lead_speed(mut self, lead_speed_kmh: f64) -> Self {
        self.lead_speed_kmh = Some(lead_speed_kmh);
        self
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }
}

/// Decision and alerts for one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub time_s: f64,
    pub decision: Decision,
    pub alerts: Vec<Alert>,
}

/// Runs the decision policy, overspeed debounce and gap hysteresis over a
/// sample stream, deduplicating alerts through the cooldown manager.
pub struct AdasEngine {
    config: AdasConfig,
    policy: Box<dyn DecisionPolicy + Send + Sync>,
    validator: Validator,
    overspeed: HashMap<String, OverspeedDebouncer>,
    gap: GapMonitor,
    alerts: AlertManager,
    samples_seen: u64,
}

impl AdasEngine {
    /// Create new engine
    pub fn new(config: AdasConfig) -> Result<Self, AdasError> {
        config.validate()?;

        let policy: Box<dyn DecisionPolicy + Send + Sync> = match config.policy {
            PolicyKind::Tiered => Box::new(TieredPolicy::new(config.gap.clone())),
            PolicyKind::Cruise => Box::new(CruisePolicy::new(config.cruise.clone())),
        };
        info!("Creating ADAS engine with {:?} policy", config.policy);

        Ok(Self {
            policy,
            validator: Validator::new(config.validation.clone()),
            overspeed: HashMap::new(),
            gap: GapMonitor::new(config.gap_monitor.clone()),
            alerts: AlertManager::new(config.alerts.clone()),
            samples_seen: 0,
            config,
        })
    }

    /// Evaluate one sample. Invalid samples are rejected without touching
    /// any rule state.
    pub fn evaluate(&mut self, sample: &Sample) -> Result<Evaluation, AdasError> {
        let check =
            self.validator
                .validate_sample(sample.time_s, sample.speed_kmh, sample.distance_m);
        if let Some(err) = check.first_error() {
            warn!("Rejecting sample at t={}: {}", sample.time_s, err);
            return Err(AdasError::InvalidSample(err.clone()));
        }
        if let Some(lead) = sample.lead_speed_kmh {
            self.validator.validate_speed(lead)?;
        }
        self.samples_seen += 1;

        let subject = sample.subject.as_str();
        let decision = self.policy.decide(sample.speed_kmh, sample.distance_m);
        debug!(
            "t={:.2} {} speed={:.1} dist={:?} -> {} {:.1}",
            sample.time_s,
            subject,
            sample.speed_kmh,
            sample.distance_m,
            decision.action,
            decision.target_speed
        );

        let mut candidates = Vec::new();

        let debouncer = self
            .overspeed
            .entry(subject.to_string())
            .or_insert_with(|| OverspeedDebouncer::new(self.config.overspeed.clone()));
        if let Some(alert) = debouncer.update(subject, sample.time_s, sample.speed_kmh) {
            candidates.push(alert);
        }

        // Without a measured lead speed, assume the leader matches ours.
        let leader = sample.distance_m.map(|gap_m| LeaderObservation {
            gap_m,
            leader_speed_mps: kmh_to_mps(sample.lead_speed_kmh.unwrap_or(sample.speed_kmh)),
        });
        if let Some(event) = self.gap.update(subject, leader) {
            candidates.push(event.into_alert(subject, sample.time_s, sample.speed_kmh));
        }

        let alerts = candidates
            .into_iter()
            .filter(|a| self.alerts.try_fire(&a.subject, a.kind.as_str(), a.time_s))
            .collect();

        Ok(Evaluation {
            time_s: sample.time_s,
            decision,
            alerts,
        })
    }

    /// Evaluate a whole trace, skipping invalid samples
    pub fn evaluate_all<'a, I>(&mut self, samples: I) -> Vec<Evaluation>
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        samples
            .into_iter()
            .filter_map(|s| self.evaluate(s).ok())
            .collect()
    }

    /// Whether the gap monitor currently holds the brake for `subject`
    pub fn is_braking(&self, subject: &str) -> bool {
        self.gap.is_braking(subject)
    }

    /// Number of accepted samples
    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    pub fn config(&self) -> &AdasConfig {
        &self.config
    }

    /// Forget all per-vehicle state and alert history
    pub fn reset(&mut self) {
        self.overspeed.clear();
        self.gap.reset();
        self.alerts.clear();
        self.samples_seen = 0;
    }
}
