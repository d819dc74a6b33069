//! Placement module.
//!
//! Maps the processing modules named in a placement policy to concrete
//! devices by matching device attributes against placement tags.

pub mod resolver;
pub mod types;

pub use resolver::{resolve_placement, screen_placement};
pub use types::{Deployment, PlacementSpec, ScaledModule, DEFAULT_TAG_KEY};
