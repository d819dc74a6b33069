//! Transmission rule resolution.
//!
//! Rules are grouped once per application by (module, input message) so the
//! engine can look up the candidate outputs of a consumed message directly.
//! Thresholds are independent forwarding probabilities: siblings need not
//! sum to one.

use log::debug;
use rand::{Rng, RngCore};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::application::types::{Application, TransmissionRule};
use crate::error::ScenarioError;

/// One candidate output of a consumed message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRule {
    pub output: String,
    pub threshold: f64,
}

impl ResolvedRule {
    /// Bernoulli draw with the threshold as success probability.
    pub fn fires(&self, rng: &mut dyn RngCore) -> bool {
        if self.threshold >= 1.0 {
            return true;
        }
        if self.threshold <= 0.0 {
            return false;
        }
        rng.gen_bool(self.threshold)
    }
}

/// module -> input message -> candidate outputs in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleTable {
    rules: BTreeMap<String, BTreeMap<String, Vec<ResolvedRule>>>,
}

impl RuleTable {
    /// Candidate outputs for `input` consumed by `module`; empty when the
    /// module has no rule for that message.
    pub fn lookup(&self, module: &str, input: &str) -> &[ResolvedRule] {
        self.rules
            .get(module)
            .and_then(|by_input| by_input.get(input))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Input messages `module` has at least one rule for.
    pub fn inputs_of(&self, module: &str) -> Vec<&str> {
        self.rules
            .get(module)
            .map(|by_input| by_input.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rules.values().flat_map(|by_input| by_input.values()).map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_threshold(app: &str, rule: &TransmissionRule) -> Result<(), ScenarioError> {
    // NaN fails the range check as well
    if (0.0..=1.0).contains(&rule.threshold) {
        Ok(())
    } else {
        Err(ScenarioError::InvalidThreshold {
            app: app.to_string(),
            module: rule.module.clone(),
            input: rule.input.clone(),
            output: rule.output.clone(),
            threshold: rule.threshold,
        })
    }
}

/// Threshold defects of raw rules, for applications whose structure failed
/// to build and therefore never reach [`resolve_rules`].
pub fn screen_thresholds(app: &str, rules: &[TransmissionRule]) -> Vec<ScenarioError> {
    rules
        .iter()
        .filter_map(|rule| check_threshold(app, rule).err())
        .collect()
}

/// Build the lookup table of a validated application.
pub fn resolve_rules(app: &Application) -> Result<RuleTable, Vec<ScenarioError>> {
    let errors = screen_thresholds(app.name(), app.rules());
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut table = RuleTable::default();
    for rule in app.rules() {
        table
            .rules
            .entry(rule.module.clone())
            .or_default()
            .entry(rule.input.clone())
            .or_default()
            .push(ResolvedRule {
                output: rule.output.clone(),
                threshold: rule.threshold,
            });
    }

    debug!("Resolved {} transmission rule(s) for application '{}'", table.len(), app.name());
    Ok(table)
}
