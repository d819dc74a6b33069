//! Population type definitions.

use serde::{Deserialize, Serialize};

use crate::population::distribution::DistributionSpec;
use crate::topology::types::DeviceId;

fn default_replicas() -> usize {
    1
}

/// Source and sink bindings of one application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationSpec {
    pub application: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub sinks: Vec<SinkSpec>,
}

/// Bind a source-generated message to devices of a given model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub model: String,
    #[serde(default = "default_replicas", alias = "number")]
    pub replicas: usize,
    pub message: String,
    pub distribution: DistributionSpec,
}

/// Bind a sink module to devices of a given model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSpec {
    pub model: String,
    #[serde(default = "default_replicas", alias = "number")]
    pub replicas: usize,
    pub module: String,
}

impl PopulationSpec {
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            name: None,
            sources: Vec::new(),
            sinks: Vec::new(),
        }
    }

    pub fn source(
        mut self,
        model: impl Into<String>,
        replicas: usize,
        message: impl Into<String>,
        distribution: DistributionSpec,
    ) -> Self {
        self.sources.push(SourceSpec {
            model: model.into(),
            replicas,
            message: message.into(),
            distribution,
        });
        self
    }

    pub fn sink(mut self, model: impl Into<String>, replicas: usize, module: impl Into<String>) -> Self {
        self.sinks.push(SinkSpec {
            model: model.into(),
            replicas,
            module: module.into(),
        });
        self
    }
}

/// A source module on a concrete device, emitting `message` on `distribution`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationBinding {
    pub application: String,
    pub module: String,
    pub message: String,
    pub device: DeviceId,
    pub distribution: DistributionSpec,
}

/// A sink module on a concrete device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkBinding {
    pub application: String,
    pub module: String,
    pub device: DeviceId,
}

/// Resolved bindings of one population.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PopulationBindings {
    pub sources: Vec<GenerationBinding>,
    pub sinks: Vec<SinkBinding>,
}
