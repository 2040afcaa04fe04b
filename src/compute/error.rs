//! Error taxonomy for generation, validation, evaluation and reconstruction.

use crate::schema::{EvolutionConfigError, Shape};

use super::blocks::BlockId;
use super::evolution::EvaluationError;

/// Errors raised by the architecture search core.
#[derive(Debug, thiserror::Error)]
pub enum NasError {
    /// Random generation could not fill a block within the attempt cap.
    #[error(
        "{block} block generated {generated} of {required} sub-blocks after {attempts} attempts"
    )]
    GenerationFailure {
        block: &'static str,
        generated: usize,
        required: usize,
        attempts: usize,
    },
    /// Mandatory sub-blocks cannot be built for the given input.
    #[error("{block} block cannot be built for input shape {shape}")]
    UnsupportedInput { block: &'static str, shape: Shape },
    /// Every generated tree failed validation.
    #[error("{architecture} failed validation after {attempts} generation attempts")]
    ValidationFailure {
        architecture: &'static str,
        attempts: usize,
    },
    /// The evaluator failed and the failure policy is to abort.
    #[error("evaluation of individual {index} in generation {generation} failed: {source}")]
    Evaluation {
        generation: usize,
        index: usize,
        #[source]
        source: EvaluationError,
    },
    /// A block's recorded input shape disagrees with its predecessor's output.
    #[error("shape mismatch at block {block}: expected {expected}, found {found}")]
    ShapeMismatch {
        block: BlockId,
        expected: Shape,
        found: Shape,
    },
    /// Reconstructed tree has inconsistent ids or parent links.
    #[error("block {block} has inconsistent identity: {reason}")]
    CorruptTree { block: BlockId, reason: String },
    /// Fitness vector length differs from the configured weights.
    #[error("fitness has {found} values but {expected} objective weights are configured")]
    ObjectiveArity { expected: usize, found: usize },
    #[error("invalid configuration: {0}")]
    Config(#[from] EvolutionConfigError),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to build evaluation thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
