//! Message generation time distributions.
//!
//! A [`DistributionSpec`] is the declarative, comparable form stored in the
//! compiled scenario. [`DistributionSpec::policy`] turns it into a
//! [`GenerationDistribution`] the engine draws inter-arrival times from.
//! Draws always take an explicit random source; nothing here touches a
//! process-wide generator.

use rand::RngCore;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inter-arrival time policy of a source binding.
pub trait GenerationDistribution: fmt::Debug + Send + Sync {
    /// Offset before the first arrival window opens.
    fn start(&self) -> f64;

    /// Time until the next message after the previous one.
    fn next_interval(&self, rng: &mut dyn RngCore) -> f64;

    /// Time of the first message.
    fn first_arrival(&self, rng: &mut dyn RngCore) -> f64 {
        self.start() + self.next_interval(rng)
    }
}

/// Fixed period between messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Deterministic {
    pub period: f64,
    pub start: f64,
}

impl GenerationDistribution for Deterministic {
    fn start(&self) -> f64 {
        self.start
    }

    fn next_interval(&self, _rng: &mut dyn RngCore) -> f64 {
        self.period
    }
}

/// Poisson arrivals with the given mean inter-arrival time.
#[derive(Debug, Clone, PartialEq)]
pub struct Exponential {
    pub mean: f64,
    pub start: f64,
}

impl GenerationDistribution for Exponential {
    fn start(&self) -> f64 {
        self.start
    }

    fn next_interval(&self, rng: &mut dyn RngCore) -> f64 {
        match Exp::new(1.0 / self.mean) {
            Ok(exp) => exp.sample(rng),
            Err(_) => self.mean,
        }
    }
}

/// Inter-arrival time drawn uniformly from `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    pub min: f64,
    pub max: f64,
    pub start: f64,
}

impl GenerationDistribution for Uniform {
    fn start(&self) -> f64 {
        self.start
    }

    fn next_interval(&self, rng: &mut dyn RngCore) -> f64 {
        if self.min >= self.max {
            return self.min;
        }
        rand_distr::Uniform::new_inclusive(self.min, self.max).sample(rng)
    }
}

/// Declarative distribution, as written in the population section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DistributionSpec {
    Deterministic {
        #[serde(alias = "time")]
        period: f64,
        #[serde(default)]
        start: f64,
    },
    Exponential {
        mean: f64,
        #[serde(default)]
        start: f64,
    },
    Uniform {
        min: f64,
        max: f64,
        #[serde(default)]
        start: f64,
    },
}

impl DistributionSpec {
    pub fn deterministic(period: f64) -> Self {
        DistributionSpec::Deterministic { period, start: 0.0 }
    }

    /// Check parameters; the message explains what is wrong.
    pub fn validate(&self) -> Result<(), String> {
        let start = match self {
            DistributionSpec::Deterministic { period, start } => {
                if !period.is_finite() || *period <= 0.0 {
                    return Err(format!("period must be positive, got {}", period));
                }
                start
            }
            DistributionSpec::Exponential { mean, start } => {
                if !mean.is_finite() || *mean <= 0.0 {
                    return Err(format!("mean must be positive, got {}", mean));
                }
                start
            }
            DistributionSpec::Uniform { min, max, start } => {
                if !min.is_finite() || !max.is_finite() || *min < 0.0 || min > max {
                    return Err(format!("expected 0 <= min <= max, got min {} max {}", min, max));
                }
                if *max <= 0.0 {
                    return Err("max must be positive".to_string());
                }
                start
            }
        };
        if !start.is_finite() || *start < 0.0 {
            return Err(format!("start must be >= 0, got {}", start));
        }
        Ok(())
    }

    /// Policy object for drawing arrival times.
    pub fn policy(&self) -> Box<dyn GenerationDistribution> {
        match *self {
            DistributionSpec::Deterministic { period, start } => Box::new(Deterministic { period, start }),
            DistributionSpec::Exponential { mean, start } => Box::new(Exponential { mean, start }),
            DistributionSpec::Uniform { min, max, start } => Box::new(Uniform { min, max, start }),
        }
    }
}
