//! Evolutionary search over block architectures.
//!
//! # Overview
//!
//! - **Individuals** (`individual`): an architecture with multi-objective fitness
//! - **Evaluation** (`evaluator`): pluggable training backend and fitness filters
//! - **Selection** (`selection`): crowding distance, dominance tournaments and
//!   the Pareto hall of fame
//! - **Search** (`search`): the generational loop
//! - **Output** (`logger`, `record`): run log and per-generation JSON record
//!
//! # Example
//!
//! ```rust,no_run
//! use tensor_nas::compute::evolution::{CapacityProxyEvaluator, EvolutionEngine};
//! use tensor_nas::schema::EvolutionConfig;
//!
//! let config = EvolutionConfig::default();
//! let mut engine = EvolutionEngine::new(config, CapacityProxyEvaluator::default()).unwrap();
//! let result = engine
//!     .run_with_callback(|progress| {
//!         println!(
//!             "Generation {}: {} non-dominated",
//!             progress.generation, progress.hall_of_fame_size
//!         );
//!     })
//!     .unwrap();
//!
//! for ind in result.hall_of_fame.iter() {
//!     println!("{ind}");
//! }
//! ```
//!
//! Evaluators receive an [`EvaluationRequest`] and return parameter count and
//! accuracy, optionally preceded by extra metrics. Any
//! `Fn(&EvaluationRequest) -> Result<EvaluationOutcome, EvaluationError>`
//! closure is an evaluator.

mod evaluator;
mod individual;
mod logger;
mod record;
mod search;
mod selection;

pub use evaluator::{
    CapacityProxyEvaluator, EvaluationError, EvaluationOutcome, EvaluationRequest, Evaluator,
    apply_filter,
};
pub use individual::{Fitness, Individual, dominates};
pub use logger::RunLogger;
pub use record::{GenerationRecord, IndividualRecord, IndividualSnapshot};
pub use search::{EvolutionEngine, EvolutionResult, FitnessFn};
pub use selection::{ParetoFront, assign_crowding_distance, select_tournament_dcd};
