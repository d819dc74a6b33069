//! The compiled, simulation-ready scenario.
//!
//! A [`CompiledScenario`] is produced once per compile and never patched.
//! It holds no interior mutability, so it can be shared by reference
//! across concurrent simulation runs.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::application::rules::{ResolvedRule, RuleTable};
use crate::application::types::{Application, ModuleKindTag};
use crate::placement::types::Deployment;
use crate::population::types::{GenerationBinding, SinkBinding};
use crate::topology::{DeviceId, Topology};

/// One module running on one device.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ModuleInstance {
    pub application: String,
    pub module: String,
    pub kind: ModuleKindTag,
    pub device: DeviceId,
}

/// Everything resolved for one application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledApplication {
    pub application: Application,
    pub rules: RuleTable,
    /// Processing module deployments
    pub deployments: Vec<Deployment>,
    pub sources: Vec<GenerationBinding>,
    pub sinks: Vec<SinkBinding>,
}

impl CompiledApplication {
    /// Devices running `module` (processing, source or sink), ascending.
    pub fn devices_hosting(&self, module: &str) -> Vec<DeviceId> {
        let mut devices: Vec<DeviceId> = self
            .deployments
            .iter()
            .filter(|d| d.module == module)
            .map(|d| d.device)
            .chain(self.sources.iter().filter(|s| s.module == module).map(|s| s.device))
            .chain(self.sinks.iter().filter(|s| s.module == module).map(|s| s.device))
            .collect();
        devices.sort_unstable();
        devices.dedup();
        devices
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledScenario {
    pub(crate) name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) horizon: Option<f64>,
    pub(crate) topology: Topology,
    pub(crate) applications: BTreeMap<String, CompiledApplication>,
    /// device -> every module instance bound to it, in compile order
    pub(crate) instances: BTreeMap<DeviceId, Vec<ModuleInstance>>,
    /// device -> message generation bindings
    pub(crate) generators: BTreeMap<DeviceId, Vec<GenerationBinding>>,
}

impl CompiledScenario {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default run seed declared by the scenario, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Simulated horizon declared by the scenario, if any.
    pub fn horizon(&self) -> Option<f64> {
        self.horizon
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn application(&self, name: &str) -> Option<&CompiledApplication> {
        self.applications.get(name)
    }

    /// Compiled applications ordered by name.
    pub fn applications(&self) -> impl Iterator<Item = &CompiledApplication> {
        self.applications.values()
    }

    /// Module instances bound to `device`; empty for idle or unknown devices.
    pub fn instances_on(&self, device: DeviceId) -> &[ModuleInstance] {
        self.instances.get(&device).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Devices that host at least one instance, ascending.
    pub fn busy_devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.instances.keys().copied()
    }

    /// Candidate outputs when `instance` consumes `input`.
    pub fn rules_for(&self, instance: &ModuleInstance, input: &str) -> &[ResolvedRule] {
        self.applications
            .get(&instance.application)
            .map(|app| app.rules.lookup(&instance.module, input))
            .unwrap_or(&[])
    }

    /// Message generation bindings on `device`.
    pub fn generators_on(&self, device: DeviceId) -> &[GenerationBinding] {
        self.generators.get(&device).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every generation binding, ordered by device then compile order.
    pub fn generators(&self) -> impl Iterator<Item = &GenerationBinding> {
        self.generators.values().flatten()
    }

    pub fn deployments(&self, application: &str) -> &[Deployment] {
        self.applications
            .get(application)
            .map(|app| app.deployments.as_slice())
            .unwrap_or(&[])
    }

    pub fn devices_hosting(&self, application: &str, module: &str) -> Vec<DeviceId> {
        self.applications
            .get(application)
            .map(|app| app.devices_hosting(module))
            .unwrap_or_default()
    }

    /// Random source for one simulation run. Runs own their generator;
    /// the scenario itself holds none.
    pub fn run_rng(&self, seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
