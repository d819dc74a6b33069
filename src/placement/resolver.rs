//! Tag-based placement of processing modules.
//!
//! Scaled modules are visited in the application's module declaration
//! order, then replica index, then ascending device id. A tag that matches
//! several devices deploys one instance on each of them.

use log::{debug, info, warn};
use std::collections::BTreeSet;

use crate::application::types::{Application, ModuleKindTag};
use crate::error::ScenarioError;
use crate::placement::types::{Deployment, PlacementSpec, ScaledModule};
use crate::topology::Topology;

/// Per-replica tags of a scale-map entry, checked against its replica count.
fn replica_tags<'a>(
    spec: &'a PlacementSpec,
    app: &str,
    entry: &'a ScaledModule,
) -> Result<Vec<&'a str>, ScenarioError> {
    let mismatch = |tags: usize| ScenarioError::TagListLengthMismatch {
        app: app.to_string(),
        placement: spec.name.clone(),
        module: entry.module.clone(),
        replicas: entry.replicas,
        tags,
    };

    match (&entry.tags, &spec.tag) {
        (Some(tags), _) if tags.len() == 1 => Ok(vec![tags[0].as_str(); entry.replicas]),
        (Some(tags), _) if tags.len() < entry.replicas => Err(mismatch(tags.len())),
        (Some(tags), _) => {
            if tags.len() > entry.replicas {
                warn!(
                    "Placement '{}': '{}' lists {} tags for {} replica(s), ignoring {:?}",
                    spec.name,
                    entry.module,
                    tags.len(),
                    entry.replicas,
                    &tags[entry.replicas..]
                );
            }
            Ok(tags.iter().take(entry.replicas).map(String::as_str).collect())
        }
        (None, Some(tag)) => Ok(vec![tag.as_str(); entry.replicas]),
        (None, None) => Err(mismatch(0)),
    }
}

/// Check that every scale-map entry names a processing module of `app`
/// with at least one replica.
fn check_scale_map(spec: &PlacementSpec, app: &Application) -> Vec<ScenarioError> {
    let mut errors = Vec::new();
    for entry in &spec.modules {
        match app.module(&entry.module) {
            None => errors.push(ScenarioError::UnknownModule {
                app: app.name().to_string(),
                module: entry.module.clone(),
                context: format!("placement '{}'", spec.name),
            }),
            Some(module) if module.kind_tag() != ModuleKindTag::Processing => {
                errors.push(ScenarioError::WrongModuleKind {
                    app: app.name().to_string(),
                    module: entry.module.clone(),
                    expected: ModuleKindTag::Processing,
                    actual: module.kind_tag(),
                    context: format!("placement '{}'", spec.name),
                })
            }
            Some(_) => {}
        }
        if entry.replicas == 0 {
            errors.push(ScenarioError::InvalidReplicaCount {
                app: app.name().to_string(),
                context: format!("module '{}' in placement '{}'", entry.module, spec.name),
            });
        }
    }
    errors
}

/// Resolve a placement policy to concrete deployment instructions.
///
/// Fails with every defect found: unknown or non-processing modules, bad
/// replica counts, tag lists shorter than the replica count and tags that
/// match no device. Never returns a partial deployment list.
pub fn resolve_placement(
    spec: &PlacementSpec,
    app: &Application,
    topology: &Topology,
) -> Result<Vec<Deployment>, Vec<ScenarioError>> {
    let mut errors = check_scale_map(spec, app);
    let mut seen = BTreeSet::new();
    let mut deployments = Vec::new();

    for module in app.processing_modules() {
        for entry in spec.modules.iter().filter(|e| e.module == module.name && e.replicas > 0) {
            let tags = match replica_tags(spec, app.name(), entry) {
                Ok(tags) => tags,
                Err(err) => {
                    errors.push(err);
                    continue;
                }
            };

            for (replica, tag) in tags.into_iter().enumerate() {
                let devices = topology.find_devices_by_tag(&spec.tag_key, tag);
                if devices.is_empty() {
                    errors.push(ScenarioError::UnsatisfiablePlacement {
                        app: app.name().to_string(),
                        placement: spec.name.clone(),
                        module: module.name.clone(),
                        tag: tag.to_string(),
                    });
                    continue;
                }
                for device in devices {
                    let deployment = Deployment {
                        module: module.name.clone(),
                        device,
                    };
                    if seen.insert(deployment.clone()) {
                        debug!(
                            "Placement '{}': {} replica {} -> device {} ({}={})",
                            spec.name, module.name, replica, device, spec.tag_key, tag
                        );
                        deployments.push(deployment);
                    }
                }
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    info!(
        "Placement '{}' for application '{}': {} deployment(s)",
        spec.name,
        app.name(),
        deployments.len()
    );
    Ok(deployments)
}

/// Selector defects of a placement whose application failed to build.
///
/// Without a module graph only the scale map itself can be checked: tag
/// list lengths and tags that match no device. Entries are visited in
/// scale-map order and each (module, tag) pair is reported once.
pub fn screen_placement(spec: &PlacementSpec, app: &str, topology: &Topology) -> Vec<ScenarioError> {
    let mut errors = Vec::new();
    let mut reported = BTreeSet::new();

    for entry in spec.modules.iter().filter(|e| e.replicas > 0) {
        let tags = match replica_tags(spec, app, entry) {
            Ok(tags) => tags,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };
        for tag in tags {
            if !reported.insert((entry.module.as_str(), tag)) {
                continue;
            }
            if topology.find_devices_by_tag(&spec.tag_key, tag).is_empty() {
                errors.push(ScenarioError::UnsatisfiablePlacement {
                    app: app.to_string(),
                    placement: spec.name.clone(),
                    module: entry.module.clone(),
                    tag: tag.to_string(),
                });
            }
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::builder::build_application;
    use crate::application::types::{ApplicationSpec, Message, Module, TransmissionRule};
    use crate::topology::types::{Device, Link};

    fn topology() -> Topology {
        let devices = vec![
            Device::new(0, "sensor-device"),
            Device::new(1, "cloud").with_attribute("mytag", "cloud1"),
            Device::new(2, "cloud").with_attribute("mytag", "cloud2"),
            Device::new(3, "cloud").with_attribute("mytag", "cloud3"),
            Device::new(4, "cloud").with_attribute("mytag", "cluster"),
            Device::new(5, "cloud").with_attribute("mytag", "cluster"),
        ];
        let links = vec![Link::new(0, 1, 1.0, 2.0), Link::new(0, 2, 1.0, 4.0)];
        Topology::load(devices, links).unwrap()
    }

    fn two_service_app() -> Application {
        let spec = ApplicationSpec {
            name: "app_1".to_string(),
            modules: vec![
                Module::source("Sensor"),
                Module::processing("Service1", 10),
                Module::processing("Service2", 10),
                Module::sink("Actuator"),
            ],
            messages: vec![
                Message::new("m_s1", "Sensor", "Service1", 1, 1).generated_by_source(),
                Message::new("m_c1", "Service1", "Service2", 1, 1),
                Message::new("m_a1", "Service2", "Actuator", 1, 1),
            ],
            transmissions: vec![
                TransmissionRule::new("Service1", "m_s1", "m_c1", 1.0),
                TransmissionRule::new("Service2", "m_c1", "m_a1", 1.0),
            ],
        };
        build_application(&spec).unwrap()
    }

    fn dep(module: &str, device: u32) -> Deployment {
        Deployment {
            module: module.to_string(),
            device,
        }
    }

    fn kinds(errors: &[ScenarioError]) -> Vec<&'static str> {
        errors.iter().map(ScenarioError::kind).collect()
    }

    #[test]
    fn test_policy_tag_places_every_scaled_module() {
        let spec = PlacementSpec::new("onCloud", "app_1")
            .with_tag("cloud1")
            .scale("Service1", 1)
            .scale("Service2", 1);
        let deployments = resolve_placement(&spec, &two_service_app(), &topology()).unwrap();
        assert_eq!(deployments, vec![dep("Service1", 1), dep("Service2", 1)]);
    }

    #[test]
    fn test_declaration_order_not_scale_map_order() {
        let spec = PlacementSpec::new("p", "app_1")
            .scale_with_tags("Service2", 1, &["cloud3"])
            .scale_with_tags("Service1", 1, &["cloud2"]);
        let deployments = resolve_placement(&spec, &two_service_app(), &topology()).unwrap();
        assert_eq!(deployments, vec![dep("Service1", 2), dep("Service2", 3)]);
    }

    #[test]
    fn test_per_replica_tags() {
        let spec = PlacementSpec::new("p", "app_1").scale_with_tags("Service1", 2, &["cloud1", "cloud3"]);
        let deployments = resolve_placement(&spec, &two_service_app(), &topology()).unwrap();
        assert_eq!(deployments, vec![dep("Service1", 1), dep("Service1", 3)]);
    }

    #[test]
    fn test_tag_matching_many_devices_fans_out() {
        let spec = PlacementSpec::new("p", "app_1").with_tag("cluster").scale("Service2", 1);
        let deployments = resolve_placement(&spec, &two_service_app(), &topology()).unwrap();
        assert_eq!(deployments, vec![dep("Service2", 4), dep("Service2", 5)]);
    }

    #[test]
    fn test_reused_tag_does_not_duplicate_instances() {
        let spec = PlacementSpec::new("p", "app_1").with_tag("cloud1").scale("Service1", 3);
        let deployments = resolve_placement(&spec, &two_service_app(), &topology()).unwrap();
        assert_eq!(deployments, vec![dep("Service1", 1)]);
    }

    #[test]
    fn test_unmatched_tag_is_unsatisfiable() {
        let spec = PlacementSpec::new("p", "app_1").with_tag("cloud9").scale("Service1", 1);
        let errors = resolve_placement(&spec, &two_service_app(), &topology()).unwrap_err();
        assert_eq!(
            errors,
            vec![ScenarioError::UnsatisfiablePlacement {
                app: "app_1".to_string(),
                placement: "p".to_string(),
                module: "Service1".to_string(),
                tag: "cloud9".to_string(),
            }]
        );
    }

    #[test]
    fn test_short_tag_list_is_reported() {
        let spec = PlacementSpec::new("p", "app_1").scale_with_tags("Service1", 3, &["cloud1", "cloud2"]);
        let errors = resolve_placement(&spec, &two_service_app(), &topology()).unwrap_err();
        assert_eq!(kinds(&errors), vec!["TagListLengthMismatch"]);
    }

    #[test]
    fn test_long_tag_list_uses_leading_tags() {
        let spec = PlacementSpec::new("p", "app_1").scale_with_tags("Service1", 1, &["cloud2", "cloud9"]);
        let deployments = resolve_placement(&spec, &two_service_app(), &topology()).unwrap();
        assert_eq!(deployments, vec![dep("Service1", 2)]);
    }

    #[test]
    fn test_missing_selector_is_reported() {
        let spec = PlacementSpec::new("p", "app_1").scale("Service1", 1);
        let errors = resolve_placement(&spec, &two_service_app(), &topology()).unwrap_err();
        assert_eq!(kinds(&errors), vec!["TagListLengthMismatch"]);
    }

    #[test]
    fn test_scale_map_defects_are_collected() {
        let spec = PlacementSpec::new("p", "app_1")
            .with_tag("cloud1")
            .scale("Sensor", 1)
            .scale("Ghost", 1)
            .scale("Service1", 0)
            .scale("Service2", 1);
        let errors = resolve_placement(&spec, &two_service_app(), &topology()).unwrap_err();
        assert_eq!(kinds(&errors), vec!["WrongModuleKind", "UnknownModule", "InvalidReplicaCount"]);
    }

    #[test]
    fn test_unscaled_modules_are_not_placed() {
        let spec = PlacementSpec::new("p", "app_1").with_tag("cloud2").scale("Service2", 1);
        let deployments = resolve_placement(&spec, &two_service_app(), &topology()).unwrap();
        assert_eq!(deployments, vec![dep("Service2", 2)]);
    }

    #[test]
    fn test_screen_without_application_graph() {
        let spec = PlacementSpec::new("p", "broken")
            .with_tag("cloud9")
            .scale("Service", 2)
            .scale_with_tags("Cache", 2, &["cloud1", "cloud1"])
            .scale_with_tags("Store", 3, &["cloud1", "cloud2"]);
        let errors = screen_placement(&spec, "broken", &topology());

        assert_eq!(
            errors,
            vec![
                ScenarioError::UnsatisfiablePlacement {
                    app: "broken".to_string(),
                    placement: "p".to_string(),
                    module: "Service".to_string(),
                    tag: "cloud9".to_string(),
                },
                ScenarioError::TagListLengthMismatch {
                    app: "broken".to_string(),
                    placement: "p".to_string(),
                    module: "Store".to_string(),
                    replicas: 3,
                    tags: 2,
                },
            ]
        );
    }
}
