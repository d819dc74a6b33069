//! # FogSim - Scenario compiler for fog/edge computing simulations
//!
//! This library turns a declarative scenario (a physical topology, a set of
//! distributed applications, placement policies and populations) into a
//! validated, immutable [`compiler::CompiledScenario`] that a discrete-event
//! simulation engine can consume directly.
//!
//! ## Overview
//!
//! Compilation runs in stages:
//!
//! 1. **Topology**: devices and links are loaded; a malformed topology is fatal.
//! 2. **Applications**: module/message graphs are built and their
//!    transmission rules resolved into lookup tables.
//! 3. **Placement**: processing modules are mapped to devices by tag.
//! 4. **Population**: sources and sinks are bound to devices by model,
//!    together with the message generation distribution of each source.
//!
//! Defects from stages 2-4 are collected and reported together; a scenario
//! compiles only when it has none.
//!
//! ## Architecture
//!
//! - `config`: Scenario file structures and general-section validation
//! - `config_loader`: YAML loading
//! - `error`: Defect kinds reported by every stage
//! - `topology`: Devices, links and tag-based device selection
//! - `application`: Application graphs and transmission rules
//! - `placement`: Placement policies and their resolution
//! - `population`: Source/sink bindings and generation distributions
//! - `compiler`: Stage orchestration and the compiled artifact
//! - `preview`: Seeded generation previews and parallel seed sweeps
//! - `orchestrator`: File-level load/compile/write
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use fogsim::{compiler, config_loader};
//!
//! let config = config_loader::load_config(Path::new("scenarios/two_clouds.yaml"))?;
//! let scenario = compiler::compile_scenario(&config)?;
//!
//! for instance in scenario.instances_on(1) {
//!     println!("{} runs {}", instance.device, instance.module);
//! }
//! # Ok::<(), color_eyre::Report>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! general:
//!   name: two_clouds
//!   seed: 1
//!   stop_time: 10000s
//!
//! topology:
//!   devices:
//!     - {id: 0, model: sensor-device}
//!     - {id: 1, model: cloud, attributes: {mytag: cloud1}}
//!   links:
//!     - {s: 0, d: 1, BW: 1, PR: 10}
//!
//! applications:
//!   - name: app_1
//!     modules:
//!       - {name: Sensor, kind: source}
//!       - {name: Service, kind: processing, ram: 10}
//!     messages:
//!       - {name: M.A, src: Sensor, dst: Service, instructions: 30, bytes: 1000, pop: true}
//!
//! placements:
//!   - {name: onCloud, application: app_1, tag: cloud1, modules: [{module: Service}]}
//!
//! populations:
//!   - application: app_1
//!     sources:
//!       - {model: sensor-device, message: M.A, distribution: {type: deterministic, period: 100}}
//! ```

pub mod application;
pub mod compiler;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod orchestrator;
pub mod placement;
pub mod population;
pub mod preview;
pub mod topology;

pub use compiler::{compile_scenario, CompiledScenario};
pub use config::ScenarioConfig;
pub use error::{CompileError, ScenarioError};
