//! Loaded topology graph and attribute-based device lookup.

use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::ScenarioError;
use crate::topology::types::{Device, DeviceId, Link, TopologySpec, MODEL_KEY};

/// Immutable device graph.
///
/// Devices are kept ordered by id, so every lookup returns ids in ascending
/// order regardless of declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Topology {
    devices: BTreeMap<DeviceId, Device>,
    links: Vec<Link>,
}

impl Topology {
    /// Build the graph, rejecting duplicate device ids, links to unknown
    /// devices and links with impossible bandwidth or delay.
    pub fn load(devices: Vec<Device>, links: Vec<Link>) -> Result<Self, ScenarioError> {
        let mut by_id = BTreeMap::new();
        for device in devices {
            let id = device.id;
            if by_id.insert(id, device).is_some() {
                return Err(ScenarioError::duplicate_device(id));
            }
        }

        for (index, link) in links.iter().enumerate() {
            for end in [link.source, link.target] {
                if !by_id.contains_key(&end) {
                    return Err(ScenarioError::malformed_topology(format!(
                        "link #{} ({} -> {}) references unknown device {}",
                        index, link.source, link.target, end
                    )));
                }
            }
            if !link.bandwidth.is_finite() || link.bandwidth <= 0.0 {
                return Err(ScenarioError::malformed_topology(format!(
                    "link #{} ({} -> {}) has bandwidth {}, expected a positive value",
                    index, link.source, link.target, link.bandwidth
                )));
            }
            if !link.delay.is_finite() || link.delay < 0.0 {
                return Err(ScenarioError::malformed_topology(format!(
                    "link #{} ({} -> {}) has delay {}, expected a value >= 0",
                    index, link.source, link.target, link.delay
                )));
            }
        }

        if by_id.len() > 1 && links.is_empty() {
            warn!("Topology has {} devices but no links", by_id.len());
        }

        info!("Loaded topology with {} devices and {} links", by_id.len(), links.len());

        Ok(Self {
            devices: by_id,
            links,
        })
    }

    /// Load from the topology section of a scenario file.
    pub fn from_spec(spec: &TopologySpec) -> Result<Self, ScenarioError> {
        Self::load(spec.devices.clone(), spec.links.clone())
    }

    /// Ids of every device whose attributes contain all pairs of `predicate`,
    /// in ascending id order. An empty predicate matches every device.
    /// No match gives an empty vector; callers decide whether that is an error.
    pub fn find_devices_by_attributes(&self, predicate: &BTreeMap<String, String>) -> Vec<DeviceId> {
        let ids: Vec<DeviceId> = self
            .devices
            .values()
            .filter(|device| device.matches(predicate))
            .map(|device| device.id)
            .collect();
        debug!("Predicate {:?} matched devices {:?}", predicate, ids);
        ids
    }

    /// Shorthand for a single key/value predicate.
    pub fn find_devices_by_tag(&self, key: &str, value: &str) -> Vec<DeviceId> {
        let predicate = BTreeMap::from([(key.to_string(), value.to_string())]);
        self.find_devices_by_attributes(&predicate)
    }

    pub fn find_devices_by_model(&self, model: &str) -> Vec<DeviceId> {
        self.find_devices_by_tag(MODEL_KEY, model)
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.devices.contains_key(&id)
    }

    /// Devices in ascending id order.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Ids linked to `id` in either direction, ascending and deduplicated.
    pub fn neighbours(&self, id: DeviceId) -> Vec<DeviceId> {
        let mut ids = BTreeSet::new();
        for link in &self.links {
            if link.source == id {
                ids.insert(link.target);
            } else if link.target == id {
                ids.insert(link.source);
            }
        }
        ids.into_iter().collect()
    }

    /// True if the device appears on at least one link.
    pub fn is_connected(&self, id: DeviceId) -> bool {
        self.links.iter().any(|link| link.touches(id))
    }
}
