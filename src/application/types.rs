//! Application type definitions.
//!
//! Modules, messages and transmission rules are typed records parsed from
//! the scenario file. An [`Application`] is only ever produced by the
//! builder, so holding one means its cross references were checked.

use rand::RngCore;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind-specific module data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleKind {
    /// Emits source-generated messages
    Source,
    /// Consumes messages and emits new ones according to its rules
    Processing {
        /// Memory requirement of one instance
        #[serde(default, alias = "RAM")]
        ram: u64,
    },
    /// Terminates messages
    Sink,
}

impl ModuleKind {
    pub fn tag(&self) -> ModuleKindTag {
        match self {
            ModuleKind::Source => ModuleKindTag::Source,
            ModuleKind::Processing { .. } => ModuleKindTag::Processing,
            ModuleKind::Sink => ModuleKindTag::Sink,
        }
    }
}

/// Field-less discriminant of [`ModuleKind`], used in errors and instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKindTag {
    Source,
    Processing,
    Sink,
}

impl ModuleKindTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKindTag::Source => "source",
            ModuleKindTag::Processing => "processing",
            ModuleKindTag::Sink => "sink",
        }
    }
}

impl fmt::Display for ModuleKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A module of an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(flatten)]
    pub kind: ModuleKind,
}

impl Module {
    pub fn source(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ModuleKind::Source,
        }
    }

    pub fn processing(name: impl Into<String>, ram: u64) -> Self {
        Self {
            name: name.into(),
            kind: ModuleKind::Processing { ram },
        }
    }

    pub fn sink(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ModuleKind::Sink,
        }
    }

    pub fn kind_tag(&self) -> ModuleKindTag {
        self.kind.tag()
    }
}

/// A message type exchanged between two modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub name: String,
    /// Module that emits the message
    #[serde(alias = "src")]
    pub origin: String,
    /// Module that consumes the message
    #[serde(alias = "dst")]
    pub destination: String,
    /// Processing cost in instructions
    pub instructions: u64,
    /// Payload size in bytes
    pub bytes: u64,
    /// Standard deviation of the generation noise around the nominal values
    #[serde(default, alias = "std", skip_serializing_if = "Option::is_none")]
    pub noise_std_dev: Option<f64>,
    /// Eligible for autonomous, distribution-driven creation by a source
    #[serde(default, alias = "pop")]
    pub source_generated: bool,
}

impl Message {
    pub fn new(
        name: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
        instructions: u64,
        bytes: u64,
    ) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            destination: destination.into(),
            instructions,
            bytes,
            noise_std_dev: None,
            source_generated: false,
        }
    }

    pub fn generated_by_source(mut self) -> Self {
        self.source_generated = true;
        self
    }

    pub fn with_noise(mut self, std_dev: f64) -> Self {
        self.noise_std_dev = Some(std_dev);
        self
    }

    /// Payload size of one instance, perturbed by the configured noise.
    pub fn sample_payload(&self, rng: &mut dyn RngCore) -> u64 {
        self.sample_around(self.bytes, rng)
    }

    /// Instruction cost of one instance, perturbed by the configured noise.
    pub fn sample_instructions(&self, rng: &mut dyn RngCore) -> u64 {
        self.sample_around(self.instructions, rng)
    }

    fn sample_around(&self, nominal: u64, rng: &mut dyn RngCore) -> u64 {
        let Some(std_dev) = self.noise_std_dev.filter(|s| *s > 0.0) else {
            return nominal;
        };
        match Normal::new(nominal as f64, std_dev) {
            Ok(normal) => normal.sample(rng).max(0.0).round() as u64,
            Err(_) => nominal,
        }
    }
}

/// Forwarding rule of a processing module: each `input` instance becomes an
/// `output` instance with probability `threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionRule {
    pub module: String,
    #[serde(alias = "in")]
    pub input: String,
    #[serde(alias = "out")]
    pub output: String,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    1.0
}

impl TransmissionRule {
    pub fn new(
        module: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
        threshold: f64,
    ) -> Self {
        Self {
            module: module.into(),
            input: input.into(),
            output: output.into(),
            threshold,
        }
    }
}

/// Declarative description of one application, as written in the scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationSpec {
    pub name: String,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub transmissions: Vec<TransmissionRule>,
}

/// A validated application graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Application {
    pub(crate) name: String,
    /// Declaration order is preserved; placement relies on it.
    pub(crate) modules: Vec<Module>,
    pub(crate) messages: Vec<Message>,
    pub(crate) rules: Vec<TransmissionRule>,
    #[serde(skip)]
    pub(crate) module_index: BTreeMap<String, usize>,
    #[serde(skip)]
    pub(crate) message_index: BTreeMap<String, usize>,
}

impl Application {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn rules(&self) -> &[TransmissionRule] {
        &self.rules
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.module_index.get(name).map(|&idx| &self.modules[idx])
    }

    pub fn message(&self, name: &str) -> Option<&Message> {
        self.message_index.get(name).map(|&idx| &self.messages[idx])
    }

    fn modules_of(&self, tag: ModuleKindTag) -> impl Iterator<Item = &Module> {
        self.modules.iter().filter(move |m| m.kind_tag() == tag)
    }

    pub fn source_modules(&self) -> impl Iterator<Item = &Module> {
        self.modules_of(ModuleKindTag::Source)
    }

    pub fn processing_modules(&self) -> impl Iterator<Item = &Module> {
        self.modules_of(ModuleKindTag::Processing)
    }

    pub fn sink_modules(&self) -> impl Iterator<Item = &Module> {
        self.modules_of(ModuleKindTag::Sink)
    }

    /// Messages that sources may create on their own.
    pub fn source_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.source_generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_module_kind_parsing() {
        let yaml = r#"
- name: Sensor
  kind: source
- name: Service
  kind: processing
  RAM: 10
- name: Actuator
  kind: sink
"#;
        let modules: Vec<Module> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(modules[0], Module::source("Sensor"));
        assert_eq!(modules[1], Module::processing("Service", 10));
        assert_eq!(modules[2], Module::sink("Actuator"));
        assert_eq!(modules[1].kind_tag().to_string(), "processing");
    }

    #[test]
    fn test_unknown_module_kind_rejected() {
        let yaml = "{name: Broker, kind: router}";
        assert!(serde_yaml::from_str::<Module>(yaml).is_err());
    }

    #[test]
    fn test_message_parsing_with_short_keys() {
        let yaml = "{name: M.A, src: Sensor, dst: Service, instructions: 30, bytes: 1000, pop: true}";
        let message: Message = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(message.origin, "Sensor");
        assert_eq!(message.destination, "Service");
        assert!(message.source_generated);
        assert_eq!(message.noise_std_dev, None);
    }

    #[test]
    fn test_rule_threshold_defaults_to_one() {
        let rule: TransmissionRule = serde_yaml::from_str("{module: Service, in: M.A, out: M.B}").unwrap();
        assert_eq!(rule, TransmissionRule::new("Service", "M.A", "M.B", 1.0));
    }

    #[test]
    fn test_noiseless_sampling_is_nominal() {
        let mut rng = StdRng::seed_from_u64(7);
        let message = Message::new("M.A", "Sensor", "Service", 300, 1000);
        for _ in 0..10 {
            assert_eq!(message.sample_payload(&mut rng), 1000);
            assert_eq!(message.sample_instructions(&mut rng), 300);
        }
    }

    #[test]
    fn test_noisy_sampling_is_reproducible_and_spread() {
        let message = Message::new("M.A", "Sensor", "Service", 300, 1000).with_noise(50.0);

        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..200).map(|_| message.sample_payload(&mut rng)).collect::<Vec<_>>()
        };
        let first = draw(1);
        assert_eq!(first, draw(1));

        let mean = first.iter().sum::<u64>() as f64 / first.len() as f64;
        assert!((mean - 1000.0).abs() < 25.0, "mean {} too far from nominal", mean);
        assert!(first.iter().any(|&b| b != 1000));
    }
}
