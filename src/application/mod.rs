//! Application graph module.
//!
//! This module contains the module/message/rule records of an application,
//! the builder that validates them into an [`Application`], and the
//! resolver that turns its transmission rules into a lookup table.

pub mod builder;
pub mod rules;
pub mod types;

pub use builder::build_application;
pub use rules::{resolve_rules, screen_thresholds, ResolvedRule, RuleTable};
pub use types::{Application, ApplicationSpec, Message, Module, ModuleKind, ModuleKindTag, TransmissionRule};
