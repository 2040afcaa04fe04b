//! Evaluation of architectures and conversion of outcomes to fitness.

use crate::compute::architecture::BlockArchitecture;
use crate::compute::blocks::ParameterCounter;
use crate::schema::FitnessFilter;

/// Failure reported by an [`Evaluator`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct EvaluationError(pub String);

impl EvaluationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One evaluation job.
///
/// The context fields are only set when individuals are saved, so evaluators
/// can name their artifacts; they never influence the search.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRequest<'a> {
    pub architecture: &'a BlockArchitecture,
    pub test_name: Option<&'a str>,
    pub generation: Option<usize>,
    /// Position among the individuals evaluated in this generation,
    /// `0..n` in population order. Not the population slot.
    pub index: Option<usize>,
}

/// Measured result of training and testing one architecture.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    /// Extra metrics preceding parameter count and accuracy.
    pub metrics: Vec<f64>,
    pub param_count: u64,
    /// Accuracy in percent, `[0, 100]`.
    pub accuracy: f64,
}

impl EvaluationOutcome {
    pub fn new(param_count: u64, accuracy: f64) -> Self {
        Self {
            metrics: Vec::new(),
            param_count,
            accuracy,
        }
    }

    pub fn with_metrics(mut self, metrics: Vec<f64>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Worst possible outcome: maximal parameter count, zero accuracy.
    /// `extra` zeroed metrics keep the value vector's arity.
    pub fn penalty(extra: usize) -> Self {
        Self {
            metrics: vec![0.0; extra],
            param_count: u64::MAX,
            accuracy: 0.0,
        }
    }

    /// Raw value vector: metrics, then parameter count, then accuracy.
    pub fn values(&self) -> Vec<f64> {
        let mut values = self.metrics.clone();
        values.push(self.param_count as f64);
        values.push(self.accuracy);
        values
    }
}

/// Trains and tests architectures.
///
/// Called concurrently from evaluation workers, so implementations must be
/// `Sync` and must not depend on the order of calls.
pub trait Evaluator: Sync {
    fn evaluate(
        &self,
        request: &EvaluationRequest<'_>,
    ) -> Result<EvaluationOutcome, EvaluationError>;
}

impl<F> Evaluator for F
where
    F: Fn(&EvaluationRequest<'_>) -> Result<EvaluationOutcome, EvaluationError> + Sync,
{
    fn evaluate(
        &self,
        request: &EvaluationRequest<'_>,
    ) -> Result<EvaluationOutcome, EvaluationError> {
        self(request)
    }
}

/// Training-free evaluator scoring capacity.
///
/// Parameter count is exact; accuracy is a saturating function of it,
/// `max_accuracy * p / (p + half_saturation)`, so larger models score higher
/// with diminishing returns. Useful for exercising the search without a
/// training backend.
#[derive(Debug, Clone, Copy)]
pub struct CapacityProxyEvaluator {
    pub half_saturation: f64,
    pub max_accuracy: f64,
}

impl Default for CapacityProxyEvaluator {
    fn default() -> Self {
        Self {
            half_saturation: 100_000.0,
            max_accuracy: 99.0,
        }
    }
}

impl Evaluator for CapacityProxyEvaluator {
    fn evaluate(
        &self,
        request: &EvaluationRequest<'_>,
    ) -> Result<EvaluationOutcome, EvaluationError> {
        if !request.architecture.validate() {
            return Err(EvaluationError::new("architecture fails validation"));
        }
        let params = ParameterCounter::count(&request.architecture.root);
        let p = params as f64;
        let accuracy = self.max_accuracy * p / (p + self.half_saturation.max(f64::EPSILON));
        Ok(EvaluationOutcome::new(params, accuracy.clamp(0.0, 100.0)))
    }
}

/// Fitness values for an outcome under a configured filter.
pub fn apply_filter(filter: &FitnessFilter, outcome: &EvaluationOutcome) -> Vec<f64> {
    match *filter {
        FitnessFilter::Raw => outcome.values(),
        FitnessFilter::Thresholds {
            max_params,
            min_accuracy,
        } => {
            let over_budget = outcome.param_count > max_params;
            let under_floor = outcome.accuracy < min_accuracy;
            vec![
                if under_floor {
                    u64::MAX as f64
                } else {
                    outcome.param_count as f64
                },
                if over_budget { 0.0 } else { outcome.accuracy },
            ]
        }
        FitnessFilter::Weighted {
            param_weight,
            accuracy_weight,
        } => vec![accuracy_weight * outcome.accuracy - param_weight * outcome.param_count as f64],
    }
}
