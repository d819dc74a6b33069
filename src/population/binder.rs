//! Binding of application sources and sinks to physical devices.
//!
//! Devices are selected by model. When more devices match than replicas
//! were requested, the first `replicas` devices in ascending id order are
//! used, so generated event streams stay reproducible for a fixed seed.

use log::{debug, info, warn};

use crate::application::types::{Application, ModuleKindTag};
use crate::error::ScenarioError;
use crate::population::types::{GenerationBinding, PopulationBindings, PopulationSpec, SinkBinding, SinkSpec, SourceSpec};
use crate::topology::{DeviceId, Topology};

/// First `replicas` devices of `model`, warning if fewer exist.
/// `None` when no device has that model at all.
fn select_devices(topology: &Topology, model: &str, replicas: usize, what: &str) -> Option<Vec<DeviceId>> {
    let mut devices = topology.find_devices_by_model(model);
    if devices.is_empty() {
        return None;
    }
    if devices.len() < replicas {
        warn!(
            "{}: {} replica(s) requested but only {} device(s) of model '{}'",
            what,
            replicas,
            devices.len(),
            model
        );
    }
    devices.truncate(replicas);
    Some(devices)
}

fn bind_source(
    spec: &SourceSpec,
    app: &Application,
    topology: &Topology,
    errors: &mut Vec<ScenarioError>,
) -> Vec<GenerationBinding> {
    let app_name = app.name();
    let mut ok = true;

    let message = match app.message(&spec.message) {
        Some(message) => Some(message),
        None => {
            errors.push(ScenarioError::UnknownMessage {
                app: app_name.to_string(),
                message: spec.message.clone(),
                context: format!("source binding on model '{}'", spec.model),
            });
            ok = false;
            None
        }
    };
    if let Some(message) = message {
        let from_source = app
            .module(&message.origin)
            .map_or(false, |m| m.kind_tag() == ModuleKindTag::Source);
        if !message.source_generated || !from_source {
            errors.push(ScenarioError::NotSourceMessage {
                app: app_name.to_string(),
                message: message.name.clone(),
            });
            ok = false;
        }
    }
    if spec.replicas == 0 {
        errors.push(ScenarioError::InvalidReplicaCount {
            app: app_name.to_string(),
            context: format!("source of message '{}'", spec.message),
        });
        ok = false;
    }
    if let Err(reason) = spec.distribution.validate() {
        errors.push(ScenarioError::InvalidDistribution {
            app: app_name.to_string(),
            message: spec.message.clone(),
            reason,
        });
        ok = false;
    }

    let Some(devices) = select_devices(
        topology,
        &spec.model,
        spec.replicas,
        &format!("Source of '{}' in '{}'", spec.message, app_name),
    ) else {
        errors.push(ScenarioError::UnboundSource {
            app: app_name.to_string(),
            message: spec.message.clone(),
            model: spec.model.clone(),
        });
        return Vec::new();
    };

    let message = match (ok, message) {
        (true, Some(message)) => message,
        _ => return Vec::new(),
    };

    devices
        .into_iter()
        .map(|device| {
            debug!(
                "Source '{}' of '{}' emits '{}' on device {}",
                message.origin, app_name, message.name, device
            );
            GenerationBinding {
                application: app_name.to_string(),
                module: message.origin.clone(),
                message: message.name.clone(),
                device,
                distribution: spec.distribution.clone(),
            }
        })
        .collect()
}

fn bind_sink(
    spec: &SinkSpec,
    app: &Application,
    topology: &Topology,
    errors: &mut Vec<ScenarioError>,
) -> Vec<SinkBinding> {
    let app_name = app.name();
    let mut ok = true;

    match app.module(&spec.module) {
        None => {
            errors.push(ScenarioError::UnknownModule {
                app: app_name.to_string(),
                module: spec.module.clone(),
                context: format!("sink binding on model '{}'", spec.model),
            });
            ok = false;
        }
        Some(module) if module.kind_tag() != ModuleKindTag::Sink => {
            errors.push(ScenarioError::WrongModuleKind {
                app: app_name.to_string(),
                module: spec.module.clone(),
                expected: ModuleKindTag::Sink,
                actual: module.kind_tag(),
                context: format!("sink binding on model '{}'", spec.model),
            });
            ok = false;
        }
        Some(_) => {}
    }
    if spec.replicas == 0 {
        errors.push(ScenarioError::InvalidReplicaCount {
            app: app_name.to_string(),
            context: format!("sink '{}'", spec.module),
        });
        ok = false;
    }

    let Some(devices) = select_devices(
        topology,
        &spec.model,
        spec.replicas,
        &format!("Sink '{}' in '{}'", spec.module, app_name),
    ) else {
        errors.push(ScenarioError::UnboundSink {
            app: app_name.to_string(),
            module: spec.module.clone(),
            model: spec.model.clone(),
        });
        return Vec::new();
    };
    if !ok {
        return Vec::new();
    }

    devices
        .into_iter()
        .map(|device| {
            debug!("Sink '{}' of '{}' bound to device {}", spec.module, app_name, device);
            SinkBinding {
                application: app_name.to_string(),
                module: spec.module.clone(),
                device,
            }
        })
        .collect()
}

/// Resolve every source and sink binding of a population.
pub fn bind_population(
    spec: &PopulationSpec,
    app: &Application,
    topology: &Topology,
) -> Result<PopulationBindings, Vec<ScenarioError>> {
    let mut errors = Vec::new();
    let mut bindings = PopulationBindings::default();

    for source in &spec.sources {
        bindings.sources.extend(bind_source(source, app, topology, &mut errors));
    }
    for sink in &spec.sinks {
        bindings.sinks.extend(bind_sink(sink, app, topology, &mut errors));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    info!(
        "Population{} for application '{}': {} source binding(s), {} sink binding(s)",
        spec.name.as_deref().map(|n| format!(" '{}'", n)).unwrap_or_default(),
        app.name(),
        bindings.sources.len(),
        bindings.sinks.len()
    );
    Ok(bindings)
}

/// Device selector defects of a population whose application failed to
/// build: source and sink models that match no device.
pub fn screen_population(spec: &PopulationSpec, app: &str, topology: &Topology) -> Vec<ScenarioError> {
    let unbound_sources = spec
        .sources
        .iter()
        .filter(|source| topology.find_devices_by_model(&source.model).is_empty())
        .map(|source| ScenarioError::UnboundSource {
            app: app.to_string(),
            message: source.message.clone(),
            model: source.model.clone(),
        });
    let unbound_sinks = spec
        .sinks
        .iter()
        .filter(|sink| topology.find_devices_by_model(&sink.model).is_empty())
        .map(|sink| ScenarioError::UnboundSink {
            app: app.to_string(),
            module: sink.module.clone(),
            model: sink.model.clone(),
        });
    unbound_sources.chain(unbound_sinks).collect()
}
