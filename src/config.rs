use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::types::ApplicationSpec;
use crate::placement::types::PlacementSpec;
use crate::population::types::PopulationSpec;
use crate::topology::types::TopologySpec;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Top-level scenario file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub general: GeneralConfig,
    pub topology: TopologySpec,
    #[serde(default)]
    pub applications: Vec<ApplicationSpec>,
    #[serde(default)]
    pub placements: Vec<PlacementSpec>,
    #[serde(default)]
    pub populations: Vec<PopulationSpec>,
}

impl ScenarioConfig {
    /// Validate the general section.
    ///
    /// Cross references between topology, applications, placements and
    /// populations are left to the compiler, which reports all of them at once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.general.name.trim().is_empty() {
            return Err(ValidationError::InvalidGeneral(
                "scenario name cannot be empty".to_string(),
            ));
        }

        if let Some(stop_time) = self.general.stop_time {
            if stop_time.is_zero() {
                return Err(ValidationError::InvalidGeneral(
                    "stop_time must be greater than zero".to_string(),
                ));
            }
        }

        if let Some(level) = &self.general.log_level {
            if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(ValidationError::InvalidGeneral(format!(
                    "log_level '{}' is not one of {:?}",
                    level, LOG_LEVELS
                )));
            }
        }

        if self.topology.devices.is_empty() {
            return Err(ValidationError::InvalidTopology(
                "topology must declare at least one device".to_string(),
            ));
        }

        Ok(())
    }

    /// Simulated horizon in time units (one unit per second of stop_time).
    pub fn horizon(&self) -> Option<f64> {
        self.general.stop_time.map(|d| d.as_secs_f64())
    }
}

/// General scenario settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub name: String,
    /// Default seed for simulation runs of this scenario
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: "scenario".to_string(),
            seed: None,
            stop_time: None,
            log_level: Some("info".to_string()),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid topology configuration: {0}")]
    InvalidTopology(String),
}
