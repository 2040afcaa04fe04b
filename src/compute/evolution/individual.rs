//! Individuals of the evolving population.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compute::architecture::BlockArchitecture;

/// Multi-objective fitness. Values are unset until the individual has been
/// evaluated; objective weights give each value its direction (negative
/// minimizes, positive maximizes).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fitness {
    values: Option<Vec<f64>>,
}

impl Fitness {
    pub fn is_valid(&self) -> bool {
        self.values.is_some()
    }

    pub fn values(&self) -> Option<&[f64]> {
        self.values.as_deref()
    }

    pub fn set(&mut self, values: Vec<f64>) {
        self.values = Some(values);
    }

    pub fn invalidate(&mut self) {
        self.values = None;
    }

    /// Values multiplied by their objective weights.
    pub fn weighted(&self, weights: &[f64]) -> Option<Vec<f64>> {
        self.values
            .as_ref()
            .map(|v| v.iter().zip(weights).map(|(x, w)| x * w).collect())
    }

    /// Pareto dominance under `weights`: no worse on every objective and
    /// strictly better on at least one. Unevaluated fitness never dominates
    /// and is never dominated.
    pub fn dominates(&self, other: &Fitness, weights: &[f64]) -> bool {
        match (self.weighted(weights), other.weighted(weights)) {
            (Some(a), Some(b)) => dominates(&a, &b),
            _ => false,
        }
    }
}

/// Dominance between two already weighted value vectors.
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    let mut better = false;
    for (x, y) in a.iter().zip(b) {
        if x < y {
            return false;
        }
        if x > y {
            better = true;
        }
    }
    better
}

/// One candidate network in the population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    /// Unique identifier.
    pub id: u64,
    /// The block tree.
    pub architecture: BlockArchitecture,
    /// Fitness; invalid until evaluated.
    pub fitness: Fitness,
    /// Crowding distance from the last ranking pass.
    pub crowding_distance: f64,
    /// `(param_count, accuracy)` recorded once per generation survived.
    pub history: Vec<(u64, f64)>,
    /// Generation created.
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
}

impl Individual {
    pub fn new(id: u64, architecture: BlockArchitecture, generation: usize) -> Self {
        Self {
            id,
            architecture,
            fitness: Fitness::default(),
            crowding_distance: 0.0,
            history: Vec::new(),
            generation,
            parents: Vec::new(),
        }
    }

    /// Forget fitness and measured metrics after the tree changed.
    pub fn invalidate(&mut self) {
        self.fitness.invalidate();
        self.architecture.clear_metrics();
        self.crowding_distance = 0.0;
    }

    /// Measured `(param_count, accuracy)`, if evaluated.
    pub fn metrics(&self) -> Option<(u64, f64)> {
        Some((self.architecture.param_count?, self.architecture.accuracy?))
    }

    /// Append the current metrics to the history.
    pub fn record_history(&mut self) {
        if let Some(metrics) = self.metrics() {
            self.history.push(metrics);
        }
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.architecture)
    }
}
