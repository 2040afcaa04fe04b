//! TensorNAS - Evolutionary neural architecture search over block trees.
//!
//! Candidate networks are trees of blocks. Every block has a constrained
//! input section, a randomly generated middle section and a constrained
//! output section; leaves own a single layer. Architectures are generated at
//! random, mutated and recombined while staying valid for their input shape,
//! and evolved by a multi-objective generational search that trades
//! parameter count against accuracy.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, shapes and reporting types
//! - `compute`: Layers, blocks, architectures and the evolutionary search
//!
//! # Example
//!
//! ```rust,no_run
//! use tensor_nas::{
//!     compute::{BlockArchitecture, NasRng},
//!     schema::{ArchitectureConfig, ArchitectureKind},
//! };
//!
//! let config = ArchitectureConfig {
//!     kind: ArchitectureKind::Classification,
//!     ..Default::default()
//! };
//! let mut rng = NasRng::new(42);
//!
//! let mut arch = BlockArchitecture::generate(&config, &mut rng).unwrap();
//! println!("{} parameters", arch.parameter_count());
//!
//! arch.mutate(&config.limits, &mut rng);
//! assert!(arch.validate());
//! println!("{arch}");
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EvolutionEngine, EvolutionResult, Evaluator};
pub use compute::{BlockArchitecture, NasError, NasRng};
pub use schema::{ArchitectureConfig, ArchitectureKind, EvolutionConfig};
