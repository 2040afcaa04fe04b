//! Evolution configuration and reporting types for architecture search.
//!
//! This module provides types for configuring the generational search loop
//! (population, variation probabilities, objectives, evaluation and output)
//! and the statistics it reports back.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::{ArchitectureConfig, ConfigError};

/// Top-level configuration for an architecture search run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Architecture template and generation limits.
    #[serde(default)]
    pub architecture: ArchitectureConfig,
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Crossover and mutation probabilities.
    #[serde(default)]
    pub variation: VariationConfig,
    /// Objective weights and fitness filter.
    #[serde(default)]
    pub objectives: ObjectiveConfig,
    /// Evaluation settings (parallelism, failure handling).
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Run log and individual record output.
    #[serde(default)]
    pub output: OutputConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals in the population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Number of generations after the initial evaluation.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Individual record whose last generation seeds the initial population.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_record: Option<String>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            generations: default_generations(),
            seed_record: None,
        }
    }
}

fn default_population_size() -> usize {
    10
}
fn default_generations() -> usize {
    5
}

/// Variation probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariationConfig {
    /// Probability of mating each consecutive pair (cxpb).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Probability of mutating each individual (mutpb).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
}

impl Default for VariationConfig {
    fn default() -> Self {
        Self {
            crossover_rate: default_crossover_rate(),
            mutation_rate: default_mutation_rate(),
        }
    }
}

fn default_crossover_rate() -> f64 {
    0.5
}
fn default_mutation_rate() -> f64 {
    0.2
}

/// Objective weights and the filter that maps evaluator output to fitness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveConfig {
    /// Weight per fitness value; negative minimizes, positive maximizes.
    #[serde(default = "default_objective_weights")]
    pub weights: Vec<f64>,
    /// Filter applied to evaluator output.
    #[serde(default)]
    pub filter: FitnessFilter,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            weights: default_objective_weights(),
            filter: FitnessFilter::default(),
        }
    }
}

fn default_objective_weights() -> Vec<f64> {
    vec![-1.0, 1.0]
}

/// Transformation from evaluator output to fitness values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum FitnessFilter {
    /// Use the evaluator tuple as-is: extra metrics, parameter count, accuracy.
    #[default]
    Raw,
    /// `(param_count, accuracy)`; models over the parameter budget score zero
    /// accuracy and models under the accuracy floor get the maximal parameter
    /// penalty.
    Thresholds { max_params: u64, min_accuracy: f64 },
    /// Single objective `accuracy_weight * accuracy - param_weight * param_count`.
    Weighted {
        param_weight: f64,
        accuracy_weight: f64,
    },
}

impl FitnessFilter {
    /// Number of fitness values produced, when independent of the evaluator.
    pub fn arity(&self) -> Option<usize> {
        match self {
            FitnessFilter::Raw => None,
            FitnessFilter::Thresholds { .. } => Some(2),
            FitnessFilter::Weighted { .. } => Some(1),
        }
    }

    /// Name recorded as the title of saved individual records.
    pub fn name(&self) -> &'static str {
        match self {
            FitnessFilter::Raw => "no filter func",
            FitnessFilter::Thresholds { .. } => "thresholds",
            FitnessFilter::Weighted { .. } => "weighted",
        }
    }
}

/// What to do when the evaluator fails for an individual.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Assign the worst possible outcome (maximal parameter count, zero
    /// accuracy), warn, and continue the generation.
    #[default]
    Penalize,
    /// Stop the run and report the failing generation and individual.
    Abort,
}

/// Evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Evaluate invalid individuals in parallel.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Number of parallel workers (0 = rayon default).
    #[serde(default)]
    pub workers: usize,
    /// Evaluator failure handling.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            workers: 0,
            failure_policy: FailurePolicy::default(),
        }
    }
}

fn default_parallel() -> bool {
    true
}

/// Output settings for run logs and individual records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Name of the run; used for output paths and passed to the evaluator.
    #[serde(default = "default_test_name")]
    pub test_name: String,
    /// Root output directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Write the per-generation run log.
    #[serde(default)]
    pub log: bool,
    /// Pass test name, generation and index to the evaluator so it can
    /// persist individual models.
    #[serde(default)]
    pub save_individuals: bool,
    /// Save the per-generation individual record as JSON when the run ends.
    #[serde(default)]
    pub save_record: bool,
    /// Log generation statistics at info level.
    #[serde(default)]
    pub verbose: bool,
    /// Free-form comment stored with the individual record.
    #[serde(default)]
    pub comment: Option<String>,
    /// Run log queue capacity; lines beyond it are dropped.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            test_name: default_test_name(),
            output_dir: default_output_dir(),
            log: false,
            save_individuals: false,
            save_record: false,
            verbose: false,
            comment: None,
            log_capacity: default_log_capacity(),
        }
    }
}

fn default_test_name() -> String {
    "tensornas".to_string()
}
fn default_output_dir() -> String {
    "Output".to_string()
}
fn default_log_capacity() -> usize {
    1024
}

// ============================================================================
// Progress and Result Types
// ============================================================================

/// Statistics of one generation, per fitness objective.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerationStats {
    /// Generation number (0 = initial population).
    pub generation: usize,
    /// Evaluations performed this generation.
    pub nevals: usize,
    /// Mean per objective.
    pub avg: Vec<f64>,
    /// Standard deviation per objective.
    pub std: Vec<f64>,
    /// Minimum per objective.
    pub min: Vec<f64>,
    /// Maximum per objective.
    pub max: Vec<f64>,
}

impl GenerationStats {
    /// Compile statistics from the fitness values of a population.
    pub fn compile<'a, I>(generation: usize, nevals: usize, fitnesses: I) -> Self
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let values: Vec<&[f64]> = fitnesses.into_iter().collect();
        let objectives = values.iter().map(|v| v.len()).max().unwrap_or(0);

        let mut stats = Self {
            generation,
            nevals,
            ..Default::default()
        };

        for k in 0..objectives {
            let column: Vec<f64> = values.iter().filter_map(|v| v.get(k).copied()).collect();
            let n = column.len().max(1) as f64;
            let mean = column.iter().sum::<f64>() / n;
            let variance = column.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

            stats.avg.push(mean);
            stats.std.push(variance.sqrt());
            stats
                .min
                .push(column.iter().copied().fold(f64::INFINITY, f64::min));
            stats
                .max
                .push(column.iter().copied().fold(f64::NEG_INFINITY, f64::max));
        }

        stats
    }
}

/// Generation-by-generation statistics of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Logbook {
    pub entries: Vec<GenerationStats>,
}

impl Logbook {
    /// Append a generation's statistics.
    pub fn record(&mut self, stats: GenerationStats) {
        self.entries.push(stats);
    }

    /// Number of recorded generations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&GenerationStats> {
        self.entries.last()
    }

    /// Header row matching [`Logbook::row`].
    pub fn header() -> &'static str {
        "gen\tnevals\tavg\tstd\tmin\tmax"
    }

    /// Tab-separated row for one entry.
    pub fn row(stats: &GenerationStats) -> String {
        let fmt = |values: &[f64]| {
            let mut out = String::from("[");
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{v:.4}");
            }
            out.push(']');
            out
        };
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            stats.generation,
            stats.nevals,
            fmt(&stats.avg),
            fmt(&stats.std),
            fmt(&stats.min),
            fmt(&stats.max)
        )
    }

    /// Render the whole logbook as a table.
    pub fn stream(&self) -> String {
        let mut out = String::from(Self::header());
        for entry in &self.entries {
            out.push('\n');
            out.push_str(&Self::row(entry));
        }
        out
    }
}

/// Progress update reported after every generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Current generation number.
    pub generation: usize,
    /// Total generations planned.
    pub total_generations: usize,
    /// Current population size.
    pub population_size: usize,
    /// Number of non-dominated individuals seen so far.
    pub hall_of_fame_size: usize,
    /// Evaluator failures this generation.
    pub failed_evaluations: usize,
    /// Statistics of this generation.
    pub stats: GenerationStats,
}

/// Statistics from a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Total generations run.
    pub generations: usize,
    /// Total evaluations performed.
    pub total_evaluations: u64,
    /// Evaluations that failed and were penalized.
    pub failed_evaluations: u64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Run log lines dropped because the queue was full.
    pub dropped_log_lines: u64,
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 1")]
    PopulationTooSmall,
    #[error("Probability {name} = {value} is outside [0, 1]")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("At least one objective weight is required")]
    NoObjectives,
    #[error("Objective weight {0} must be finite and non-zero")]
    InvalidWeight(f64),
    #[error("Fitness filter produces {produced} values but {weights} weights are configured")]
    FilterArity { produced: usize, weights: usize },
    #[error("Test name must not be empty")]
    EmptyTestName,
    #[error("Run log capacity must be non-zero")]
    InvalidLogCapacity,
    #[error("Architecture config validation failed: {0}")]
    Architecture(#[from] ConfigError),
}

impl EvolutionConfig {
    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.architecture.validate()?;

        if self.population.size == 0 {
            return Err(EvolutionConfigError::PopulationTooSmall);
        }

        let check_probability = |value: f64, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(EvolutionConfigError::InvalidProbability { name, value })
            }
        };
        check_probability(self.variation.crossover_rate, "crossover_rate")?;
        check_probability(self.variation.mutation_rate, "mutation_rate")?;

        if self.objectives.weights.is_empty() {
            return Err(EvolutionConfigError::NoObjectives);
        }
        if let Some(&w) = self
            .objectives
            .weights
            .iter()
            .find(|w| !w.is_finite() || **w == 0.0)
        {
            return Err(EvolutionConfigError::InvalidWeight(w));
        }
        if let Some(produced) = self.objectives.filter.arity()
            && produced != self.objectives.weights.len()
        {
            return Err(EvolutionConfigError::FilterArity {
                produced,
                weights: self.objectives.weights.len(),
            });
        }

        if self.output.test_name.trim().is_empty() {
            return Err(EvolutionConfigError::EmptyTestName);
        }
        if self.output.log_capacity == 0 {
            return Err(EvolutionConfigError::InvalidLogCapacity);
        }

        Ok(())
    }
}
