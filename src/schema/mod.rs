//! Schema module - Configuration and reporting types for architecture search.

mod config;
mod evolution;
mod shape;

pub use config::*;
pub use evolution::*;
pub use shape::*;
