//! Monitored-metric comparison and save policies

use serde::{Deserialize, Serialize};
use std::fmt;

/// Substring that marks a metric as accuracy-like (higher is better)
pub const ACCURACY_TOKEN: &str = "acc";

/// Comparison mode as configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Lower is better
    Min,
    /// Higher is better
    Max,
    /// Infer from the monitored metric's name
    #[default]
    Auto,
}

impl Mode {
    /// Resolve to a concrete direction for the given monitored metric
    pub fn resolve(self, monitor: Option<&str>) -> Direction {
        match self {
            Mode::Min => Direction::Minimize,
            Mode::Max => Direction::Maximize,
            Mode::Auto => Direction::infer(monitor),
        }
    }
}

/// Which way a monitored metric improves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Minimize,
    Maximize,
}

impl Direction {
    /// Accuracy-like names maximize, everything else (or no name) minimizes
    pub fn infer(monitor: Option<&str>) -> Self {
        match monitor {
            Some(name) if name.contains(ACCURACY_TOKEN) => Direction::Maximize,
            _ => Direction::Minimize,
        }
    }

    /// Starting best value, worse than any real observation
    pub fn initial_best(self) -> f64 {
        match self {
            Direction::Minimize => f64::INFINITY,
            Direction::Maximize => f64::NEG_INFINITY,
        }
    }

    /// The better of two values
    ///
    /// A NaN argument loses to any number.
    pub fn extremum(self, a: f64, b: f64) -> f64 {
        match self {
            Direction::Minimize => a.min(b),
            Direction::Maximize => a.max(b),
        }
    }

    /// Whether `current` counts as an improvement over `best`
    ///
    /// Ties count. NaN never improves.
    pub fn is_improvement(self, current: f64, best: f64) -> bool {
        !current.is_nan() && self.extremum(current, best) == current
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Minimize => f.write_str("min"),
            Direction::Maximize => f.write_str("max"),
        }
    }
}

/// When an attempted checkpoint is actually written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePolicy {
    /// Every attempt writes
    #[default]
    Always,
    /// Only attempts where the monitored metric improved write
    BestOnly,
}

/// What the writer receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistScope {
    /// Metadata and parameters
    #[default]
    FullModel,
    /// Learned parameters only
    ParametersOnly,
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The improvement test agrees with the extremum function
        #[test]
        fn improvement_matches_extremum(a in -1e9f64..1e9, b in -1e9f64..1e9) {
            for d in [Direction::Minimize, Direction::Maximize] {
                prop_assert_eq!(d.is_improvement(a, b), d.extremum(a, b) == a);
            }
        }

        /// Folding with extremum never worsens the best value
        #[test]
        fn extremum_is_monotone(values in proptest::collection::vec(-1e6f64..1e6, 1..50)) {
            for d in [Direction::Minimize, Direction::Maximize] {
                let mut best = d.initial_best();
                for &v in &values {
                    let next = d.extremum(best, v);
                    prop_assert_eq!(d.extremum(next, best), next);
                    best = next;
                }
            }
        }
    }
}
