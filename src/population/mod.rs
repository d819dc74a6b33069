//! Population module.
//!
//! Attaches application sources and sinks to physical devices selected by
//! model, together with the message generation distribution of each source.

pub mod binder;
pub mod distribution;
pub mod types;

pub use binder::{bind_population, screen_population};
pub use distribution::{DistributionSpec, GenerationDistribution};
pub use types::{GenerationBinding, PopulationBindings, PopulationSpec, SinkBinding, SinkSpec, SourceSpec};
