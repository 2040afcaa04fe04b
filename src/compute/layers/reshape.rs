//! Reshape: reinterpret a tensor under a different factorization of its
//! element count.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::{LayerConstraints, LayerParam};
use crate::schema::Shape;

/// Largest rank a generated or mutated target may have.
pub const MAX_RESHAPE_RANK: usize = 4;

/// Reshape arguments. The target must hold exactly as many elements as the
/// input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReshapeArgs {
    pub target_shape: Shape,
}

impl ReshapeArgs {
    pub const MUTABLE: &'static [LayerParam] = &[LayerParam::TargetShape];

    /// Random factorization of the input's element count into one to three
    /// dimensions, unless a target is fixed by `constraints`.
    pub fn generate<R: Rng + ?Sized>(
        input: &Shape,
        constraints: &LayerConstraints,
        rng: &mut R,
    ) -> Self {
        if let Some(target) = &constraints.target_shape {
            return Self {
                target_shape: target.clone(),
            };
        }

        let rank = rng.gen_range(1..MAX_RESHAPE_RANK);
        let mut remaining = input.num_elements();
        let mut dims = Vec::with_capacity(rank);
        for _ in 1..rank {
            let factor = divisors(remaining).choose(rng).copied().unwrap_or(1);
            dims.push(factor);
            remaining /= factor.max(1);
        }
        dims.push(remaining);
        dims.shuffle(rng);
        Self {
            target_shape: Shape::new(dims),
        }
    }

    pub fn output_shape(&self, input: &Shape) -> Shape {
        if input.is_valid() && self.target_shape.num_elements() == input.num_elements() {
            self.target_shape.clone()
        } else {
            Shape::invalid()
        }
    }

    pub fn validate(&self, input: &Shape) -> bool {
        self.target_shape.rank() <= MAX_RESHAPE_RANK && self.output_shape(input).is_valid()
    }

    pub fn mutate_param<R: Rng + ?Sized>(&mut self, param: LayerParam, rng: &mut R) {
        if param == LayerParam::TargetShape {
            self.target_shape = rebalance(&self.target_shape, rng);
        }
    }
}

/// Divisors of `n` in ascending order. Empty for zero.
pub(crate) fn divisors(n: usize) -> Vec<usize> {
    let mut low = Vec::new();
    let mut high = Vec::new();
    let mut d = 1;
    while d * d <= n {
        if n % d == 0 {
            low.push(d);
            if d * d != n {
                high.push(n / d);
            }
        }
        d += 1;
    }
    low.extend(high.into_iter().rev());
    low
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rebalance {
    /// Move a factor from one dimension to another.
    Move,
    /// Split a factor off one dimension into a new one.
    Split,
    /// Fold two neighbouring dimensions into one.
    Merge,
}

/// Redistribute factors across the dimensions of `shape`, keeping its
/// element count.
fn rebalance<R: Rng + ?Sized>(shape: &Shape, rng: &mut R) -> Shape {
    let mut dims = shape.dims().to_vec();
    let splittable: Vec<usize> = (0..dims.len()).filter(|&i| dims[i] > 1).collect();

    let mut ops = Vec::with_capacity(3);
    if dims.len() > 1 && !splittable.is_empty() {
        ops.push(Rebalance::Move);
    }
    if dims.len() < MAX_RESHAPE_RANK && !splittable.is_empty() {
        ops.push(Rebalance::Split);
    }
    if dims.len() > 1 {
        ops.push(Rebalance::Merge);
    }
    let Some(&op) = ops.choose(rng) else {
        return shape.clone();
    };

    match op {
        Rebalance::Move | Rebalance::Split => {
            let Some(&from) = splittable.choose(rng) else {
                return shape.clone();
            };
            let factor = divisors(dims[from])
                .into_iter()
                .filter(|&f| f > 1)
                .choose(rng)
                .unwrap_or(1);
            dims[from] /= factor;
            if op == Rebalance::Move {
                let to = (from + rng.gen_range(1..dims.len())) % dims.len();
                dims[to] *= factor;
            } else {
                dims.insert(rng.gen_range(0..=dims.len()), factor);
            }
        }
        Rebalance::Merge => {
            let at = rng.gen_range(0..dims.len() - 1);
            let folded = dims.remove(at + 1);
            dims[at] *= folded;
        }
    }
    Shape::new(dims)
}
