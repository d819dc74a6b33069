//! Topology type definitions.
//!
//! Devices and links are plain typed records. They are read straight from
//! the scenario YAML and never change once the topology is loaded.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Identifier of a physical device in the topology.
pub type DeviceId = u32;

/// Attribute key that matches the device model field rather than the
/// attribute map.
pub const MODEL_KEY: &str = "model";

/// A physical device (sensor, gateway, cloud node, actuator...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub model: String,
    /// Instructions per simulated time unit
    #[serde(default, alias = "IPT")]
    pub ipt: u64,
    /// Memory capacity
    #[serde(default, alias = "RAM")]
    pub ram: u64,
    #[serde(default, alias = "COST")]
    pub cost: f64,
    #[serde(default, alias = "WATT")]
    pub watt: f64,
    /// Free-form attributes used for tag matching, e.g. `mytag: cloud1`.
    /// `model` is reserved for the model field and rejected here.
    #[serde(default, deserialize_with = "deserialize_attributes")]
    pub attributes: BTreeMap<String, String>,
}

impl Device {
    pub fn new(id: DeviceId, model: impl Into<String>) -> Self {
        Self {
            id,
            model: model.into(),
            ipt: 0,
            ram: 0,
            cost: 0.0,
            watt: 0.0,
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style helper, mostly for tests and programmatic scenarios.
    /// A `model` key stored here is shadowed by the model field on lookup.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute. The `model` key resolves to the model field.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        if key == MODEL_KEY {
            return Some(self.model.as_str());
        }
        self.attributes.get(key).map(String::as_str)
    }

    /// True when every key/value pair of `predicate` matches this device.
    pub fn matches(&self, predicate: &BTreeMap<String, String>) -> bool {
        predicate
            .iter()
            .all(|(key, value)| self.attribute(key) == Some(value.as_str()))
    }
}

/// A network link between two devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(alias = "s")]
    pub source: DeviceId,
    #[serde(alias = "d")]
    pub target: DeviceId,
    #[serde(alias = "BW")]
    pub bandwidth: f64,
    /// Propagation delay
    #[serde(alias = "PR")]
    pub delay: f64,
}

impl Link {
    pub fn new(source: DeviceId, target: DeviceId, bandwidth: f64, delay: f64) -> Self {
        Self {
            source,
            target,
            bandwidth,
            delay,
        }
    }

    /// True if this link touches `id` at either end.
    pub fn touches(&self, id: DeviceId) -> bool {
        self.source == id || self.target == id
    }
}

/// Topology section of the scenario file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologySpec {
    #[serde(default, alias = "entity")]
    pub devices: Vec<Device>,
    #[serde(default, alias = "link")]
    pub links: Vec<Link>,
}

/// Attribute values may be written as strings, numbers or booleans in YAML.
/// They are normalised to strings so tag comparison is exact and ordered.
fn deserialize_attributes<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, serde_yaml::Value> = BTreeMap::deserialize(deserializer)?;
    if raw.contains_key(MODEL_KEY) {
        return Err(serde::de::Error::custom(format!(
            "attribute '{}' is reserved, set the device model field instead",
            MODEL_KEY
        )));
    }
    raw.into_iter()
        .map(|(key, value)| {
            let text = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(serde::de::Error::custom(format!(
                        "attribute '{}' must be a scalar, found {:?}",
                        key, other
                    )))
                }
            };
            Ok((key, text))
        })
        .collect()
}
