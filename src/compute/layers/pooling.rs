//! Pooling layers.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::conv::conv_output_dim;
use super::mutation::{MutationOperator, StepDirection, mutate_tuple, step};
use super::{LayerConstraints, LayerParam, Padding};
use crate::schema::Shape;

pub const MAX_POOL_SIZE: usize = 7;

/// 2D max pooling arguments. Strides default to the pool size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxPool2DArgs {
    pub pool_size: (usize, usize),
    #[serde(default)]
    pub strides: Option<(usize, usize)>,
}

impl MaxPool2DArgs {
    pub const MUTABLE: &'static [LayerParam] = &[LayerParam::PoolSize];

    pub fn generate<R: Rng + ?Sized>(
        input: &Shape,
        constraints: &LayerConstraints,
        rng: &mut R,
    ) -> Self {
        let limit = input
            .as_image()
            .map(|(h, w, _)| h.min(w).min(MAX_POOL_SIZE))
            .unwrap_or(1)
            .max(1);
        let p = rng.gen_range(1..=limit);
        Self {
            pool_size: constraints.pool_size.unwrap_or((p, p)),
            strides: constraints.strides,
        }
    }

    fn effective_strides(&self) -> (usize, usize) {
        self.strides.unwrap_or(self.pool_size)
    }

    pub fn output_shape(&self, input: &Shape) -> Shape {
        let (sh, sw) = self.effective_strides();
        match input.as_image() {
            Some((h, w, c)) => Shape::new(vec![
                conv_output_dim(h, self.pool_size.0, sh, 1, Padding::Valid),
                conv_output_dim(w, self.pool_size.1, sw, 1, Padding::Valid),
                c,
            ]),
            None => Shape::invalid(),
        }
    }

    pub fn validate(&self, input: &Shape) -> bool {
        let (sh, sw) = self.effective_strides();
        self.pool_size.0 > 0
            && self.pool_size.1 > 0
            && sh > 0
            && sw > 0
            && self.output_shape(input).is_valid()
    }

    pub fn mutate_param<R: Rng + ?Sized>(&mut self, param: LayerParam, rng: &mut R) {
        if param == LayerParam::PoolSize {
            self.pool_size = mutate_tuple(
                self.pool_size,
                (1, MAX_POOL_SIZE),
                MutationOperator::SyncStep,
                rng,
            );
        }
    }
}

/// 3D max pooling arguments over a `[d, h, w, c]` volume. Strides default to
/// the pool size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxPool3DArgs {
    pub pool_size: (usize, usize, usize),
    #[serde(default)]
    pub strides: Option<(usize, usize, usize)>,
}

impl MaxPool3DArgs {
    pub const MUTABLE: &'static [LayerParam] = &[LayerParam::PoolSize];

    /// Cubic pool no larger than the smallest spatial dimension.
    pub fn generate<R: Rng + ?Sized>(input: &Shape, rng: &mut R) -> Self {
        let limit = input
            .as_volume()
            .map(|(d, h, w, _)| d.min(h).min(w).min(MAX_POOL_SIZE))
            .unwrap_or(1)
            .max(1);
        let p = rng.gen_range(1..=limit);
        Self {
            pool_size: (p, p, p),
            strides: None,
        }
    }

    fn effective_strides(&self) -> (usize, usize, usize) {
        self.strides.unwrap_or(self.pool_size)
    }

    pub fn output_shape(&self, input: &Shape) -> Shape {
        let (sd, sh, sw) = self.effective_strides();
        let (pd, ph, pw) = self.pool_size;
        match input.as_volume() {
            Some((d, h, w, c)) => Shape::new(vec![
                conv_output_dim(d, pd, sd, 1, Padding::Valid),
                conv_output_dim(h, ph, sh, 1, Padding::Valid),
                conv_output_dim(w, pw, sw, 1, Padding::Valid),
                c,
            ]),
            None => Shape::invalid(),
        }
    }

    pub fn validate(&self, input: &Shape) -> bool {
        let (sd, sh, sw) = self.effective_strides();
        let (pd, ph, pw) = self.pool_size;
        [pd, ph, pw, sd, sh, sw].iter().all(|&v| v > 0) && self.output_shape(input).is_valid()
    }

    /// Synchronized step of all three pool dimensions.
    pub fn mutate_param<R: Rng + ?Sized>(&mut self, param: LayerParam, rng: &mut R) {
        if param == LayerParam::PoolSize {
            let bounds = (1, MAX_POOL_SIZE);
            let direction = StepDirection::random(rng);
            let (pd, ph, pw) = self.pool_size;
            self.pool_size = (
                step(pd, bounds, direction),
                step(ph, bounds, direction),
                step(pw, bounds, direction),
            );
        }
    }
}

/// Output of global average pooling over `[h, w, c]`.
pub fn global_average_pool_output(input: &Shape) -> Shape {
    match input.as_image() {
        Some((_, _, c)) => Shape::new(vec![c]),
        None => Shape::invalid(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_strides_follow_pool() {
        let args = MaxPool2DArgs {
            pool_size: (2, 2),
            strides: None,
        };
        assert_eq!(
            args.output_shape(&Shape::from([28, 28, 8])),
            Shape::from([14, 14, 8])
        );
    }

    #[test]
    fn test_asymmetric_pool() {
        let args = MaxPool2DArgs {
            pool_size: (2, 1),
            strides: Some((2, 1)),
        };
        assert_eq!(
            args.output_shape(&Shape::from([9, 9, 3])),
            Shape::from([4, 9, 3])
        );
    }

    #[test]
    fn test_pool_larger_than_input_invalid() {
        let args = MaxPool2DArgs {
            pool_size: (5, 5),
            strides: None,
        };
        assert!(!args.validate(&Shape::from([3, 3, 1])));
    }

    #[test]
    fn test_generated_pool_fits() {
        let mut rng = StdRng::seed_from_u64(5);
        let input = Shape::from([2, 3, 4]);
        for _ in 0..50 {
            let args = MaxPool2DArgs::generate(&input, &LayerConstraints::default(), &mut rng);
            assert!(args.validate(&input));
        }
    }

    #[test]
    fn test_pool3d_output_shape() {
        let args = MaxPool3DArgs {
            pool_size: (2, 2, 2),
            strides: None,
        };
        assert_eq!(
            args.output_shape(&Shape::from([8, 9, 10, 4])),
            Shape::from([4, 4, 5, 4])
        );

        let strided = MaxPool3DArgs {
            pool_size: (3, 1, 2),
            strides: Some((1, 1, 2)),
        };
        assert_eq!(
            strided.output_shape(&Shape::from([5, 6, 7, 2])),
            Shape::from([3, 6, 3, 2])
        );
    }

    #[test]
    fn test_pool3d_requires_volume() {
        let args = MaxPool3DArgs {
            pool_size: (2, 2, 2),
            strides: None,
        };
        assert!(args.validate(&Shape::from([2, 2, 2, 1])));
        assert!(!args.validate(&Shape::from([1, 4, 4, 1])));
        assert!(!args.validate(&Shape::from([8, 8, 3])));
        assert!(!args.output_shape(&Shape::from([8, 8, 3])).is_valid());
    }

    #[test]
    fn test_pool3d_generate_and_mutate_stay_cubic() {
        let mut rng = StdRng::seed_from_u64(9);
        let input = Shape::from([3, 8, 8, 2]);
        for _ in 0..50 {
            let mut args = MaxPool3DArgs::generate(&input, &mut rng);
            assert!(args.validate(&input));
            let (pd, ph, pw) = args.pool_size;
            assert!(pd <= 3 && pd == ph && ph == pw);

            args.mutate_param(LayerParam::PoolSize, &mut rng);
            let (md, mh, mw) = args.pool_size;
            assert_eq!((md, mh), (mh, mw));
            assert!(md.abs_diff(pd) <= 1 && (1..=MAX_POOL_SIZE).contains(&md));
        }
    }

    #[test]
    fn test_global_average_pool() {
        assert_eq!(
            global_average_pool_output(&Shape::from([7, 7, 32])),
            Shape::from([32])
        );
        assert!(!global_average_pool_output(&Shape::from([32])).is_valid());
    }
}
