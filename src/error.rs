//! Configuration defects reported by the scenario compiler.
//!
//! Every stage reports problems as [`ScenarioError`] values. Topology defects
//! are fatal; everything else is collected so a single compile run lists
//! every defect in the scenario.

use std::fmt;

use crate::application::types::ModuleKindTag;
use crate::topology::types::DeviceId;

/// A single configuration defect.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScenarioError {
    #[error("Malformed topology: {reason}")]
    MalformedTopology { reason: String },

    #[error("Application '{app}' declared more than once")]
    DuplicateApplicationName { app: String },

    #[error("Application '{app}': module '{module}' declared more than once")]
    DuplicateModuleName { app: String, module: String },

    #[error("Application '{app}': message '{message}' declared more than once")]
    DuplicateMessageName { app: String, message: String },

    #[error("Application '{app}': message '{message}' references unknown module '{module}'")]
    DanglingMessageReference {
        app: String,
        message: String,
        module: String,
    },

    #[error("Application '{app}': rule on module '{module}' references unknown message '{message}'")]
    UnknownMessageInRule {
        app: String,
        module: String,
        message: String,
    },

    #[error(
        "Application '{app}': rule '{input}' -> '{output}' is attached to '{module}', \
         which neither consumes the input nor produces the output"
    )]
    RuleModuleMismatch {
        app: String,
        module: String,
        input: String,
        output: String,
    },

    #[error(
        "Application '{app}': rule '{input}' -> '{output}' on '{module}' has threshold {threshold}, \
         expected a value in [0, 1]"
    )]
    InvalidThreshold {
        app: String,
        module: String,
        input: String,
        output: String,
        threshold: f64,
    },

    #[error("Application '{app}': placement '{placement}' cannot place '{module}', no device has tag '{tag}'")]
    UnsatisfiablePlacement {
        app: String,
        placement: String,
        module: String,
        tag: String,
    },

    #[error("Application '{app}': source message '{message}' has no device of model '{model}'")]
    UnboundSource {
        app: String,
        message: String,
        model: String,
    },

    #[error("Application '{app}': sink '{module}' has no device of model '{model}'")]
    UnboundSink {
        app: String,
        module: String,
        model: String,
    },

    #[error("Unknown application '{app}' referenced by {context}")]
    UnknownApplication { app: String, context: String },

    #[error("Application '{app}': unknown module '{module}' referenced by {context}")]
    UnknownModule {
        app: String,
        module: String,
        context: String,
    },

    #[error("Application '{app}': unknown message '{message}' referenced by {context}")]
    UnknownMessage {
        app: String,
        message: String,
        context: String,
    },

    #[error("Application '{app}': module '{module}' is a {actual} module, {context} requires a {expected} module")]
    WrongModuleKind {
        app: String,
        module: String,
        expected: ModuleKindTag,
        actual: ModuleKindTag,
        context: String,
    },

    #[error("Application '{app}': message '{message}' is not source-generated and cannot be bound to a source")]
    NotSourceMessage { app: String, message: String },

    #[error(
        "Application '{app}': placement '{placement}' asks for {replicas} replica(s) of '{module}' \
         but provides {tags} tag(s)"
    )]
    TagListLengthMismatch {
        app: String,
        placement: String,
        module: String,
        replicas: usize,
        tags: usize,
    },

    #[error("Application '{app}': replica count for {context} must be at least 1")]
    InvalidReplicaCount { app: String, context: String },

    #[error("Application '{app}': distribution for message '{message}' is invalid: {reason}")]
    InvalidDistribution {
        app: String,
        message: String,
        reason: String,
    },

    #[error("Application '{app}': message '{message}' has noise std-dev {std_dev}, expected a finite value >= 0")]
    InvalidNoise {
        app: String,
        message: String,
        std_dev: f64,
    },
}

impl ScenarioError {
    pub fn malformed_topology(reason: impl Into<String>) -> Self {
        ScenarioError::MalformedTopology {
            reason: reason.into(),
        }
    }

    pub(crate) fn duplicate_device(id: DeviceId) -> Self {
        Self::malformed_topology(format!("duplicate device id {}", id))
    }

    /// Short machine-friendly name of the defect kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ScenarioError::MalformedTopology { .. } => "MalformedTopology",
            ScenarioError::DuplicateApplicationName { .. } => "DuplicateApplicationName",
            ScenarioError::DuplicateModuleName { .. } => "DuplicateModuleName",
            ScenarioError::DuplicateMessageName { .. } => "DuplicateMessageName",
            ScenarioError::DanglingMessageReference { .. } => "DanglingMessageReference",
            ScenarioError::UnknownMessageInRule { .. } => "UnknownMessageInRule",
            ScenarioError::RuleModuleMismatch { .. } => "RuleModuleMismatch",
            ScenarioError::InvalidThreshold { .. } => "InvalidThreshold",
            ScenarioError::UnsatisfiablePlacement { .. } => "UnsatisfiablePlacement",
            ScenarioError::UnboundSource { .. } => "UnboundSource",
            ScenarioError::UnboundSink { .. } => "UnboundSink",
            ScenarioError::UnknownApplication { .. } => "UnknownApplication",
            ScenarioError::UnknownModule { .. } => "UnknownModule",
            ScenarioError::UnknownMessage { .. } => "UnknownMessage",
            ScenarioError::WrongModuleKind { .. } => "WrongModuleKind",
            ScenarioError::NotSourceMessage { .. } => "NotSourceMessage",
            ScenarioError::TagListLengthMismatch { .. } => "TagListLengthMismatch",
            ScenarioError::InvalidReplicaCount { .. } => "InvalidReplicaCount",
            ScenarioError::InvalidDistribution { .. } => "InvalidDistribution",
            ScenarioError::InvalidNoise { .. } => "InvalidNoise",
        }
    }
}

/// Outcome of a failed compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// The topology could not be loaded; no later stage ran.
    Fatal(ScenarioError),
    /// One or more defects across applications, placements and populations.
    Rejected(Vec<ScenarioError>),
}

impl CompileError {
    /// All defects carried by this error, in the order they were found.
    pub fn defects(&self) -> &[ScenarioError] {
        match self {
            CompileError::Fatal(err) => std::slice::from_ref(err),
            CompileError::Rejected(errors) => errors,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, CompileError::Fatal(_))
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Fatal(err) => write!(f, "scenario compilation aborted: {}", err),
            CompileError::Rejected(errors) => {
                write!(f, "scenario rejected with {} defect(s)", errors.len())?;
                for err in errors {
                    write!(f, "\n  - {}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_display_lists_every_defect() {
        let err = CompileError::Rejected(vec![
            ScenarioError::DuplicateModuleName {
                app: "app_1".to_string(),
                module: "Service".to_string(),
            },
            ScenarioError::UnboundSink {
                app: "app_1".to_string(),
                module: "Actuator".to_string(),
                model: "actuator-device-9".to_string(),
            },
        ]);

        let text = err.to_string();
        assert!(text.starts_with("scenario rejected with 2 defect(s)"));
        assert!(text.contains("module 'Service' declared more than once"));
        assert!(text.contains("actuator-device-9"));
        assert!(!err.is_fatal());
        assert_eq!(err.defects().len(), 2);
    }

    #[test]
    fn test_fatal_carries_single_defect() {
        let err = CompileError::Fatal(ScenarioError::duplicate_device(3));
        assert!(err.is_fatal());
        assert_eq!(err.defects().len(), 1);
        assert_eq!(err.defects()[0].kind(), "MalformedTopology");
        assert!(err.to_string().contains("duplicate device id 3"));
    }
}
