//! Compute module - Layers, block trees, architectures and the search loop.

pub mod architecture;
pub mod blocks;
mod error;
pub mod evolution;
pub mod layers;
mod rng;

pub use architecture::BlockArchitecture;
pub use blocks::{Block, BlockId, BlockKind, ModelBuilder, ParameterCounter};
pub use error::NasError;
pub use layers::{Layer, LayerType};
pub use rng::NasRng;
