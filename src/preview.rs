//! Dry-run previews of the message generation a compiled scenario implies.
//!
//! A preview replays every source binding up to a horizon with its own
//! seeded random source, without simulating processing or transport. It is
//! what `fogsim preview` prints and what the seed sweep aggregates.

use color_eyre::eyre::eyre;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::compiler::CompiledScenario;
use crate::topology::DeviceId;

/// One message emitted by a source binding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationEvent {
    pub time: f64,
    pub device: DeviceId,
    pub application: String,
    pub module: String,
    pub message: String,
    pub bytes: u64,
    pub instructions: u64,
}

/// Aggregates of one seeded preview run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub events: usize,
    pub total_bytes: u64,
    pub total_instructions: u64,
    /// application -> number of generated messages
    pub per_application: BTreeMap<String, usize>,
}

impl RunSummary {
    fn from_events(seed: u64, events: &[GenerationEvent]) -> Self {
        let mut per_application = BTreeMap::new();
        for event in events {
            *per_application.entry(event.application.clone()).or_insert(0) += 1;
        }
        Self {
            seed,
            events: events.len(),
            total_bytes: events.iter().map(|e| e.bytes).sum(),
            total_instructions: events.iter().map(|e| e.instructions).sum(),
            per_application,
        }
    }
}

/// Accept a preview horizon only if it is finite and positive.
pub fn check_horizon(horizon: f64) -> color_eyre::Result<f64> {
    if horizon.is_finite() && horizon > 0.0 {
        Ok(horizon)
    } else {
        Err(eyre!("Horizon must be a finite value > 0, got {}", horizon))
    }
}

/// Every message generated in `[0, horizon]` for one seed, ordered by time,
/// then device, then binding order.
///
/// The same scenario, seed and horizon always yield the same schedule.
pub fn generation_schedule(scenario: &CompiledScenario, seed: u64, horizon: f64) -> Vec<GenerationEvent> {
    if !horizon.is_finite() {
        warn!("Ignoring preview with unbounded horizon {}", horizon);
        return Vec::new();
    }

    let mut rng = scenario.run_rng(seed);
    let mut events = Vec::new();

    for binding in scenario.generators() {
        let Some(message) = scenario
            .application(&binding.application)
            .and_then(|app| app.application.message(&binding.message))
        else {
            continue;
        };

        let policy = binding.distribution.policy();
        let mut time = policy.first_arrival(&mut rng);
        while time <= horizon {
            events.push(GenerationEvent {
                time,
                device: binding.device,
                application: binding.application.clone(),
                module: binding.module.clone(),
                message: binding.message.clone(),
                bytes: message.sample_payload(&mut rng),
                instructions: message.sample_instructions(&mut rng),
            });
            time += policy.next_interval(&mut rng);
        }
    }

    // Stable sort keeps binding order among simultaneous events on a device
    events.sort_by(|a, b| a.time.total_cmp(&b.time).then(a.device.cmp(&b.device)));
    debug!("Seed {}: {} generation event(s) up to t={}", seed, events.len(), horizon);
    events
}

/// Preview the scenario once per seed in parallel. Results come back in
/// the order of `seeds`.
pub fn sweep(scenario: &CompiledScenario, seeds: &[u64], horizon: f64) -> Vec<RunSummary> {
    info!(
        "Sweeping {} seed(s) of scenario '{}' up to t={}",
        seeds.len(),
        scenario.name(),
        horizon
    );
    seeds
        .par_iter()
        .map(|&seed| RunSummary::from_events(seed, &generation_schedule(scenario, seed, horizon)))
        .collect()
}
