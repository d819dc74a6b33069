//! Physical topology module.
//!
//! This module holds the device/link records of a scenario and the loaded,
//! immutable graph used for tag-based device selection.

pub mod graph;
pub mod types;

// Re-export key types for easier access
pub use graph::Topology;
pub use types::{Device, DeviceId, Link, TopologySpec};
