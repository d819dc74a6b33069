//! Scenario compiler.
//!
//! Runs the stages in dependency order: topology, application graphs,
//! transmission rules, placement, population. A malformed topology aborts
//! immediately. Every other defect is collected and returned together, and
//! no [`CompiledScenario`] is produced while any defect remains.

pub mod scenario;

use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};

use crate::application::{build_application, resolve_rules, screen_thresholds, Application, ModuleKindTag, RuleTable};
use crate::config::ScenarioConfig;
use crate::error::{CompileError, ScenarioError};
use crate::placement::{resolve_placement, screen_placement, Deployment};
use crate::population::{bind_population, screen_population, PopulationBindings};
use crate::topology::Topology;

pub use scenario::{CompiledApplication, CompiledScenario, ModuleInstance};

/// Compile a parsed scenario into its simulation-ready form.
pub fn compile_scenario(config: &ScenarioConfig) -> Result<CompiledScenario, CompileError> {
    info!("Compiling scenario '{}'", config.general.name);

    let topology = Topology::from_spec(&config.topology).map_err(CompileError::Fatal)?;
    let mut errors: Vec<ScenarioError> = Vec::new();

    // Application graphs and rule tables
    let mut declared: BTreeSet<&str> = BTreeSet::new();
    let mut built: Vec<Application> = Vec::new();
    let mut tables: BTreeMap<String, RuleTable> = BTreeMap::new();

    for spec in &config.applications {
        if !declared.insert(spec.name.as_str()) {
            errors.push(ScenarioError::DuplicateApplicationName { app: spec.name.clone() });
            continue;
        }
        match build_application(spec) {
            Ok(app) => {
                match resolve_rules(&app) {
                    Ok(table) => {
                        tables.insert(app.name().to_string(), table);
                    }
                    Err(rule_errors) => errors.extend(rule_errors),
                }
                built.push(app);
            }
            Err(build_errors) => {
                errors.extend(build_errors);
                errors.extend(screen_thresholds(&spec.name, &spec.transmissions));
            }
        }
    }

    let find_app = |name: &str| built.iter().find(|app| app.name() == name);

    // Placement
    let mut deployments: BTreeMap<String, Vec<Deployment>> = BTreeMap::new();
    for placement in &config.placements {
        if !declared.contains(placement.application.as_str()) {
            errors.push(ScenarioError::UnknownApplication {
                app: placement.application.clone(),
                context: format!("placement '{}'", placement.name),
            });
            continue;
        }
        let Some(app) = find_app(&placement.application) else {
            errors.extend(screen_placement(placement, &placement.application, &topology));
            continue;
        };
        match resolve_placement(placement, app, &topology) {
            Ok(resolved) => {
                let list = deployments.entry(app.name().to_string()).or_default();
                for deployment in resolved {
                    if !list.contains(&deployment) {
                        list.push(deployment);
                    }
                }
            }
            Err(placement_errors) => errors.extend(placement_errors),
        }
    }

    // Population
    let mut populations: BTreeMap<String, PopulationBindings> = BTreeMap::new();
    for population in &config.populations {
        if !declared.contains(population.application.as_str()) {
            errors.push(ScenarioError::UnknownApplication {
                app: population.application.clone(),
                context: "population".to_string(),
            });
            continue;
        }
        let Some(app) = find_app(&population.application) else {
            errors.extend(screen_population(population, &population.application, &topology));
            continue;
        };
        match bind_population(population, app, &topology) {
            Ok(bindings) => {
                let merged = populations.entry(app.name().to_string()).or_default();
                for source in bindings.sources {
                    if merged.sources.contains(&source) {
                        debug!(
                            "Dropping repeated binding of '{}' on device {} in '{}'",
                            source.message, source.device, source.application
                        );
                    } else {
                        merged.sources.push(source);
                    }
                }
                for sink in bindings.sinks {
                    if !merged.sinks.contains(&sink) {
                        merged.sinks.push(sink);
                    }
                }
            }
            Err(population_errors) => errors.extend(population_errors),
        }
    }

    if !errors.is_empty() {
        warn!("Scenario '{}' rejected with {} defect(s)", config.general.name, errors.len());
        return Err(CompileError::Rejected(errors));
    }

    let scenario = assemble(config, topology, built, tables, deployments, populations);
    info!(
        "Compiled scenario '{}': {} application(s), {} busy device(s), {} generator(s)",
        scenario.name(),
        scenario.applications.len(),
        scenario.instances.len(),
        scenario.generators().count()
    );
    Ok(scenario)
}

/// Build the final artifact from defect-free stage outputs.
fn assemble(
    config: &ScenarioConfig,
    topology: Topology,
    built: Vec<Application>,
    mut tables: BTreeMap<String, RuleTable>,
    mut deployments: BTreeMap<String, Vec<Deployment>>,
    mut populations: BTreeMap<String, PopulationBindings>,
) -> CompiledScenario {
    let mut applications = BTreeMap::new();
    let mut instances: BTreeMap<_, Vec<ModuleInstance>> = BTreeMap::new();
    let mut generators: BTreeMap<_, Vec<_>> = BTreeMap::new();

    let mut add_instance = |instance: ModuleInstance| {
        let on_device = instances.entry(instance.device).or_default();
        if !on_device.contains(&instance) {
            on_device.push(instance);
        }
    };

    for app in built {
        let name = app.name().to_string();
        let rules = tables.remove(&name).unwrap_or_default();
        let app_deployments = deployments.remove(&name).unwrap_or_default();
        let bindings = populations.remove(&name).unwrap_or_default();

        for module in app.processing_modules() {
            if !app_deployments.iter().any(|d| d.module == module.name) {
                warn!("Processing module '{}' of '{}' is not placed on any device", module.name, name);
            }
        }

        for deployment in &app_deployments {
            add_instance(ModuleInstance {
                application: name.clone(),
                module: deployment.module.clone(),
                kind: ModuleKindTag::Processing,
                device: deployment.device,
            });
        }
        for source in &bindings.sources {
            add_instance(ModuleInstance {
                application: name.clone(),
                module: source.module.clone(),
                kind: ModuleKindTag::Source,
                device: source.device,
            });
            generators.entry(source.device).or_default().push(source.clone());
        }
        for sink in &bindings.sinks {
            add_instance(ModuleInstance {
                application: name.clone(),
                module: sink.module.clone(),
                kind: ModuleKindTag::Sink,
                device: sink.device,
            });
        }

        debug!(
            "Application '{}': {} deployment(s), {} source(s), {} sink(s)",
            name,
            app_deployments.len(),
            bindings.sources.len(),
            bindings.sinks.len()
        );

        applications.insert(
            name,
            CompiledApplication {
                application: app,
                rules,
                deployments: app_deployments,
                sources: bindings.sources,
                sinks: bindings.sinks,
            },
        );
    }

    for &device in instances.keys() {
        if topology.device_count() > 1 && !topology.is_connected(device) {
            warn!("Device {} hosts module instances but has no links", device);
        }
    }

    CompiledScenario {
        name: config.general.name.clone(),
        seed: config.general.seed,
        horizon: config.horizon(),
        topology,
        applications,
        instances,
        generators,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::types::{ApplicationSpec, Message, Module, TransmissionRule};
    use crate::config::GeneralConfig;
    use crate::placement::PlacementSpec;
    use crate::population::{DistributionSpec, PopulationSpec};
    use crate::topology::types::{Device, Link, TopologySpec};

    fn base_config() -> ScenarioConfig {
        ScenarioConfig {
            general: GeneralConfig {
                name: "unit".to_string(),
                ..GeneralConfig::default()
            },
            topology: TopologySpec {
                devices: vec![
                    Device::new(0, "sensor"),
                    Device::new(1, "cloud").with_attribute("mytag", "cloud1"),
                    Device::new(2, "actuator"),
                ],
                links: vec![Link::new(0, 1, 1.0, 2.0), Link::new(1, 2, 1.0, 2.0)],
            },
            applications: vec![ApplicationSpec {
                name: "app".to_string(),
                modules: vec![
                    Module::source("Source"),
                    Module::processing("Service", 10),
                    Module::sink("Sink"),
                ],
                messages: vec![
                    Message::new("M.A", "Source", "Service", 30, 1000).generated_by_source(),
                    Message::new("M.B", "Service", "Sink", 30, 1000),
                ],
                transmissions: vec![TransmissionRule::new("Service", "M.A", "M.B", 1.0)],
            }],
            placements: vec![PlacementSpec::new("onCloud", "app").with_tag("cloud1").scale("Service", 1)],
            populations: vec![PopulationSpec::new("app")
                .source("sensor", 1, "M.A", DistributionSpec::deterministic(100.0))
                .sink("actuator", 1, "Sink")],
        }
    }

    fn kinds(err: &CompileError) -> Vec<&'static str> {
        err.defects().iter().map(ScenarioError::kind).collect()
    }

    #[test]
    fn test_compile_pipeline() {
        let scenario = compile_scenario(&base_config()).unwrap();

        let on_cloud = scenario.instances_on(1);
        assert_eq!(on_cloud.len(), 1);
        assert_eq!(on_cloud[0].module, "Service");
        assert_eq!(on_cloud[0].kind, ModuleKindTag::Processing);

        let rules = scenario.rules_for(&on_cloud[0], "M.A");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].output, "M.B");
        assert_eq!(rules[0].threshold, 1.0);

        assert_eq!(scenario.generators_on(0).len(), 1);
        assert_eq!(scenario.instances_on(2)[0].kind, ModuleKindTag::Sink);
        assert!(scenario.generators_on(1).is_empty());
    }

    #[test]
    fn test_topology_errors_are_fatal() {
        let mut config = base_config();
        config.topology.links.push(Link::new(0, 42, 1.0, 1.0));
        // Defects elsewhere are not reported once the topology is broken
        config.placements[0].tag = Some("cloud9".to_string());

        let err = compile_scenario(&config).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(kinds(&err), vec!["MalformedTopology"]);
    }

    #[test]
    fn test_defects_across_stages_are_aggregated() {
        let mut config = base_config();
        config.applications[0].transmissions[0].threshold = 1.5;
        config.placements[0].tag = Some("cloud9".to_string());
        config.populations[0].sinks[0].model = "nothing".to_string();

        let err = compile_scenario(&config).unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(kinds(&err), vec!["InvalidThreshold", "UnsatisfiablePlacement", "UnboundSink"]);
    }

    #[test]
    fn test_broken_application_still_reports_thresholds() {
        let mut config = base_config();
        config.applications[0].modules.push(Module::sink("Sink"));
        config.applications[0].transmissions[0].threshold = -1.0;

        let err = compile_scenario(&config).unwrap_err();
        assert_eq!(kinds(&err), vec!["DuplicateModuleName", "InvalidThreshold"]);
    }

    #[test]
    fn test_unknown_and_duplicate_applications() {
        let mut config = base_config();
        config.applications.push(config.applications[0].clone());
        config.placements.push(PlacementSpec::new("elsewhere", "ghost").with_tag("cloud1"));
        config.populations.push(PopulationSpec::new("ghost"));

        let err = compile_scenario(&config).unwrap_err();
        assert_eq!(
            kinds(&err),
            vec!["DuplicateApplicationName", "UnknownApplication", "UnknownApplication"]
        );
    }

    #[test]
    fn test_overlapping_placements_do_not_duplicate() {
        let mut config = base_config();
        config
            .placements
            .push(PlacementSpec::new("again", "app").with_tag("cloud1").scale("Service", 2));

        let scenario = compile_scenario(&config).unwrap();
        assert_eq!(scenario.deployments("app").len(), 1);
        assert_eq!(scenario.instances_on(1).len(), 1);
    }

    #[test]
    fn test_seed_and_horizon_carried() {
        let mut config = base_config();
        config.general.seed = Some(7);
        config.general.stop_time = Some(std::time::Duration::from_secs(500));

        let scenario = compile_scenario(&config).unwrap();
        assert_eq!(scenario.seed(), Some(7));
        assert_eq!(scenario.horizon(), Some(500.0));
        assert_eq!(scenario.devices_hosting("app", "Service"), vec![1]);
    }

    #[test]
    fn test_broken_application_still_reports_selectors() {
        let mut config = base_config();
        config.applications[0].modules.push(Module::sink("Sink"));
        config.placements[0].tag = Some("cloud9".to_string());
        config.populations[0].sources[0].model = "sensor-9".to_string();

        let err = compile_scenario(&config).unwrap_err();
        assert_eq!(
            kinds(&err),
            vec!["DuplicateModuleName", "UnsatisfiablePlacement", "UnboundSource"]
        );
        assert!(err.defects().contains(&ScenarioError::UnsatisfiablePlacement {
            app: "app".to_string(),
            placement: "onCloud".to_string(),
            module: "Service".to_string(),
            tag: "cloud9".to_string(),
        }));
    }

    #[test]
    fn test_repeated_population_bindings_are_merged() {
        let mut config = base_config();
        config.populations.push(
            PopulationSpec::new("app")
                .source("sensor", 1, "M.A", DistributionSpec::deterministic(100.0))
                .sink("actuator", 1, "Sink"),
        );
        let repeated = config.populations[0].sources[0].clone();
        config.populations[0].sources.push(repeated);

        let scenario = compile_scenario(&config).unwrap();
        assert_eq!(scenario.generators_on(0).len(), 1);
        assert_eq!(scenario.application("app").unwrap().sinks.len(), 1);
        assert_eq!(scenario.instances_on(2).len(), 1);
    }
}
