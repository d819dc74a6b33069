//! Application graph construction.
//!
//! Turns an [`ApplicationSpec`] into a validated [`Application`]. All
//! structural defects of one application are collected before returning,
//! so a broken application reports everything wrong with it at once.

use log::{debug, info};
use std::collections::BTreeMap;

use crate::application::types::{Application, ApplicationSpec, ModuleKindTag};
use crate::error::ScenarioError;

/// Build and validate one application.
///
/// Checks name uniqueness, that every message endpoint is a declared module,
/// that source-generated messages leave from a source, and that every rule
/// names known messages and sits on the processing module that consumes its
/// input or produces its output. Rule thresholds are checked by the rule
/// resolver, not here.
pub fn build_application(spec: &ApplicationSpec) -> Result<Application, Vec<ScenarioError>> {
    let app = spec.name.as_str();
    let mut errors = Vec::new();

    let mut module_index = BTreeMap::new();
    for (idx, module) in spec.modules.iter().enumerate() {
        if module_index.insert(module.name.clone(), idx).is_some() {
            errors.push(ScenarioError::DuplicateModuleName {
                app: app.to_string(),
                module: module.name.clone(),
            });
        }
    }
    // On duplicates, resolve names against the first declaration
    for (idx, module) in spec.modules.iter().enumerate().rev() {
        module_index.insert(module.name.clone(), idx);
    }

    let mut message_index = BTreeMap::new();
    for (idx, message) in spec.messages.iter().enumerate() {
        if message_index.insert(message.name.clone(), idx).is_some() {
            errors.push(ScenarioError::DuplicateMessageName {
                app: app.to_string(),
                message: message.name.clone(),
            });
        }
    }
    for (idx, message) in spec.messages.iter().enumerate().rev() {
        message_index.insert(message.name.clone(), idx);
    }

    for message in &spec.messages {
        for endpoint in [&message.origin, &message.destination] {
            if !module_index.contains_key(endpoint) {
                errors.push(ScenarioError::DanglingMessageReference {
                    app: app.to_string(),
                    message: message.name.clone(),
                    module: endpoint.clone(),
                });
            }
        }

        if let Some(std_dev) = message.noise_std_dev {
            if !std_dev.is_finite() || std_dev < 0.0 {
                errors.push(ScenarioError::InvalidNoise {
                    app: app.to_string(),
                    message: message.name.clone(),
                    std_dev,
                });
            }
        }

        if message.source_generated {
            if let Some(&idx) = module_index.get(&message.origin) {
                let origin = &spec.modules[idx];
                if origin.kind_tag() != ModuleKindTag::Source {
                    errors.push(ScenarioError::WrongModuleKind {
                        app: app.to_string(),
                        module: origin.name.clone(),
                        expected: ModuleKindTag::Source,
                        actual: origin.kind_tag(),
                        context: format!("source-generated message '{}'", message.name),
                    });
                }
            }
        }
    }

    for rule in &spec.transmissions {
        match module_index.get(&rule.module) {
            None => errors.push(ScenarioError::UnknownModule {
                app: app.to_string(),
                module: rule.module.clone(),
                context: format!("transmission rule '{}' -> '{}'", rule.input, rule.output),
            }),
            Some(&idx) => {
                let owner = &spec.modules[idx];
                if owner.kind_tag() != ModuleKindTag::Processing {
                    errors.push(ScenarioError::WrongModuleKind {
                        app: app.to_string(),
                        module: owner.name.clone(),
                        expected: ModuleKindTag::Processing,
                        actual: owner.kind_tag(),
                        context: format!("transmission rule '{}' -> '{}'", rule.input, rule.output),
                    });
                }
            }
        }

        let input = message_index.get(&rule.input).map(|&idx| &spec.messages[idx]);
        let output = message_index.get(&rule.output).map(|&idx| &spec.messages[idx]);

        for (name, found) in [(&rule.input, input.is_some()), (&rule.output, output.is_some())] {
            if !found {
                errors.push(ScenarioError::UnknownMessageInRule {
                    app: app.to_string(),
                    module: rule.module.clone(),
                    message: name.clone(),
                });
            }
        }

        if let (Some(input), Some(output)) = (input, output) {
            let consumes_input = input.destination == rule.module;
            let produces_output = output.origin == rule.module;
            if !consumes_input && !produces_output {
                errors.push(ScenarioError::RuleModuleMismatch {
                    app: app.to_string(),
                    module: rule.module.clone(),
                    input: rule.input.clone(),
                    output: rule.output.clone(),
                });
            }
        }
    }

    if !errors.is_empty() {
        debug!("Application '{}' has {} structural defect(s)", app, errors.len());
        return Err(errors);
    }

    info!(
        "Built application '{}': {} modules, {} messages, {} rules",
        app,
        spec.modules.len(),
        spec.messages.len(),
        spec.transmissions.len()
    );

    Ok(Application {
        name: spec.name.clone(),
        modules: spec.modules.clone(),
        messages: spec.messages.clone(),
        rules: spec.transmissions.clone(),
        module_index,
        message_index,
    })
}
