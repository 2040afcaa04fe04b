//! Dense, dropout and flatten layers.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::mutation::{MutationOperator, mutate_enum, mutate_int, mutate_rate};
use super::{Activation, LayerConstraints, LayerParam};
use crate::schema::Shape;

pub const MAX_UNITS: usize = 256;
pub const DROPOUT_RATE_MAX: f64 = 0.5;

/// Fully connected layer arguments. Applied to the last dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseArgs {
    pub units: usize,
    pub activation: Activation,
}

impl DenseArgs {
    pub const MUTABLE: &'static [LayerParam] = &[LayerParam::Units, LayerParam::Activation];

    pub fn generate<R: Rng + ?Sized>(constraints: &LayerConstraints, rng: &mut R) -> Self {
        Self {
            units: constraints
                .units
                .unwrap_or_else(|| rng.gen_range(1..=MAX_UNITS)),
            activation: constraints
                .activation
                .unwrap_or_else(|| mutate_enum(&Activation::ALL, Activation::Relu, rng)),
        }
    }

    pub fn output_shape(&self, input: &Shape) -> Shape {
        if input.rank() == 0 {
            return Shape::invalid();
        }
        input.with_last(self.units)
    }

    pub fn validate(&self, input: &Shape) -> bool {
        self.units > 0 && input.is_valid() && self.output_shape(input).is_valid()
    }

    pub fn mutate_param<R: Rng + ?Sized>(&mut self, param: LayerParam, rng: &mut R) {
        match param {
            LayerParam::Units => {
                self.units = mutate_int(self.units, (1, MAX_UNITS), MutationOperator::Random, rng)
            }
            LayerParam::Activation => {
                self.activation = mutate_enum(&Activation::ALL, self.activation, rng)
            }
            _ => {}
        }
    }

    pub fn parameter_count(&self, input: &Shape) -> u64 {
        let features = input.last().unwrap_or(0) as u64;
        features * self.units as u64 + self.units as u64
    }
}

/// Dropout arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropoutArgs {
    pub rate: f64,
    /// Upper bound the rate is mutated within.
    pub max_rate: f64,
}

impl DropoutArgs {
    pub const MUTABLE: &'static [LayerParam] = &[LayerParam::Rate];

    pub fn generate<R: Rng + ?Sized>(constraints: &LayerConstraints, rng: &mut R) -> Self {
        let max_rate = constraints
            .max_rate
            .unwrap_or(DROPOUT_RATE_MAX)
            .clamp(f64::EPSILON, DROPOUT_RATE_MAX);
        Self {
            rate: rng.gen_range(max_rate * 1e-3..=max_rate),
            max_rate,
        }
    }

    pub fn validate(&self, input: &Shape) -> bool {
        self.rate > 0.0 && self.rate <= self.max_rate && self.max_rate < 1.0 && input.is_valid()
    }

    pub fn mutate_param<R: Rng + ?Sized>(&mut self, param: LayerParam, rng: &mut R) {
        if param == LayerParam::Rate {
            self.rate = mutate_rate(self.rate, self.max_rate, 0.25, rng);
        }
    }
}

/// Output of flattening any shape.
pub fn flatten_output(input: &Shape) -> Shape {
    if input.rank() == 0 {
        return Shape::invalid();
    }
    Shape::new(vec![input.num_elements()])
}
