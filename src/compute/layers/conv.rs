//! Convolution layers.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::mutation::{MutationOperator, mutate_enum, mutate_int, mutate_tuple};
use super::{Activation, LayerConstraints, LayerParam, Padding};
use crate::schema::Shape;

pub const MAX_FILTER_COUNT: usize = 128;
pub const MAX_KERNEL_DIMENSION: usize = 7;
pub const MAX_STRIDE: usize = 7;
pub const MAX_DILATION: usize = 5;
pub const MAX_DEPTH_MULTIPLIER: usize = 4;

/// Output length of one spatial dimension.
///
/// Same padding: `ceil(input / stride)`.
/// Valid padding: `floor((input - dilation * (kernel - 1) - 1) / stride) + 1`,
/// zero when the dilated kernel does not fit.
pub fn conv_output_dim(
    input: usize,
    kernel: usize,
    stride: usize,
    dilation: usize,
    padding: Padding,
) -> usize {
    let stride = stride.max(1);
    match padding {
        Padding::Same => input.div_ceil(stride),
        Padding::Valid => {
            let effective = dilation.max(1) * kernel.saturating_sub(1) + 1;
            if input < effective {
                0
            } else {
                (input - effective) / stride + 1
            }
        }
    }
}

fn is_unit(pair: (usize, usize)) -> bool {
    pair == (1, 1)
}

fn positive(pair: (usize, usize)) -> bool {
    pair.0 > 0 && pair.1 > 0
}

/// 2D convolution arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conv2DArgs {
    pub filters: usize,
    pub kernel_size: (usize, usize),
    pub strides: (usize, usize),
    pub padding: Padding,
    pub dilation_rate: (usize, usize),
    pub activation: Activation,
}

impl Conv2DArgs {
    pub const MUTABLE: &'static [LayerParam] = &[
        LayerParam::Filters,
        LayerParam::KernelSize,
        LayerParam::Strides,
        LayerParam::Padding,
        LayerParam::DilationRate,
        LayerParam::Activation,
    ];

    /// Random arguments, overridden by any fixed constraint.
    pub fn generate<R: Rng + ?Sized>(constraints: &LayerConstraints, rng: &mut R) -> Self {
        let k = rng.gen_range(1..=MAX_KERNEL_DIMENSION);
        let strides = if rng.gen_bool(0.5) {
            (1, 1)
        } else {
            let s = rng.gen_range(1..=3);
            (s, s)
        };
        Self {
            filters: constraints
                .filters
                .unwrap_or_else(|| rng.gen_range(1..=MAX_FILTER_COUNT)),
            kernel_size: constraints.kernel_size.unwrap_or((k, k)),
            strides: constraints.strides.unwrap_or(strides),
            padding: constraints
                .padding
                .unwrap_or_else(|| mutate_enum(&Padding::ALL, Padding::Same, rng)),
            dilation_rate: (1, 1),
            activation: constraints
                .activation
                .unwrap_or_else(|| mutate_enum(&Activation::ALL, Activation::Relu, rng)),
        }
    }

    /// At most one of non-unit stride and non-unit dilation may hold.
    pub fn stride_dilation_exclusive(&self) -> bool {
        is_unit(self.strides) || is_unit(self.dilation_rate)
    }

    pub fn output_shape(&self, input: &Shape) -> Shape {
        match input.as_image() {
            Some((h, w, _)) => Shape::new(vec![
                conv_output_dim(
                    h,
                    self.kernel_size.0,
                    self.strides.0,
                    self.dilation_rate.0,
                    self.padding,
                ),
                conv_output_dim(
                    w,
                    self.kernel_size.1,
                    self.strides.1,
                    self.dilation_rate.1,
                    self.padding,
                ),
                self.filters,
            ]),
            None => Shape::invalid(),
        }
    }

    pub fn validate(&self, input: &Shape) -> bool {
        self.filters > 0
            && self.filters <= MAX_FILTER_COUNT
            && positive(self.kernel_size)
            && positive(self.strides)
            && positive(self.dilation_rate)
            && self.stride_dilation_exclusive()
            && self.output_shape(input).is_valid()
    }

    pub fn mutate_param<R: Rng + ?Sized>(&mut self, param: LayerParam, rng: &mut R) {
        match param {
            LayerParam::Filters => {
                self.filters = mutate_int(
                    self.filters,
                    (1, MAX_FILTER_COUNT),
                    MutationOperator::Step,
                    rng,
                )
            }
            LayerParam::KernelSize => {
                self.kernel_size = mutate_tuple(
                    self.kernel_size,
                    (1, MAX_KERNEL_DIMENSION),
                    MutationOperator::SyncStep,
                    rng,
                )
            }
            LayerParam::Strides => {
                self.strides = mutate_tuple(
                    self.strides,
                    (1, MAX_STRIDE),
                    MutationOperator::SyncStep,
                    rng,
                )
            }
            LayerParam::Padding => self.padding = mutate_enum(&Padding::ALL, self.padding, rng),
            LayerParam::DilationRate => {
                self.dilation_rate = mutate_tuple(
                    self.dilation_rate,
                    (1, MAX_DILATION),
                    MutationOperator::SyncStep,
                    rng,
                )
            }
            LayerParam::Activation => {
                self.activation = mutate_enum(&Activation::ALL, self.activation, rng)
            }
            _ => {}
        }
    }

    /// Trainable weights: kernel plus bias.
    pub fn parameter_count(&self, input: &Shape) -> u64 {
        let channels = input.last().unwrap_or(0) as u64;
        let (kh, kw) = self.kernel_size;
        (kh * kw) as u64 * channels * self.filters as u64 + self.filters as u64
    }
}

/// Depthwise 2D convolution arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthwiseConv2DArgs {
    pub kernel_size: (usize, usize),
    pub strides: (usize, usize),
    pub padding: Padding,
    pub depth_multiplier: usize,
    pub activation: Activation,
}

impl DepthwiseConv2DArgs {
    pub const MUTABLE: &'static [LayerParam] = &[
        LayerParam::KernelSize,
        LayerParam::DepthMultiplier,
        LayerParam::Padding,
        LayerParam::Activation,
    ];

    pub fn generate<R: Rng + ?Sized>(constraints: &LayerConstraints, rng: &mut R) -> Self {
        let k = rng.gen_range(1..=MAX_KERNEL_DIMENSION);
        Self {
            kernel_size: constraints.kernel_size.unwrap_or((k, k)),
            strides: constraints.strides.unwrap_or((1, 1)),
            padding: constraints
                .padding
                .unwrap_or_else(|| mutate_enum(&Padding::ALL, Padding::Same, rng)),
            depth_multiplier: constraints
                .depth_multiplier
                .unwrap_or_else(|| rng.gen_range(1..=MAX_DEPTH_MULTIPLIER)),
            activation: constraints
                .activation
                .unwrap_or_else(|| mutate_enum(&Activation::ALL, Activation::Relu, rng)),
        }
    }

    pub fn output_shape(&self, input: &Shape) -> Shape {
        match input.as_image() {
            Some((h, w, c)) => Shape::new(vec![
                conv_output_dim(h, self.kernel_size.0, self.strides.0, 1, self.padding),
                conv_output_dim(w, self.kernel_size.1, self.strides.1, 1, self.padding),
                c * self.depth_multiplier,
            ]),
            None => Shape::invalid(),
        }
    }

    pub fn validate(&self, input: &Shape) -> bool {
        positive(self.kernel_size)
            && positive(self.strides)
            && (1..=MAX_DEPTH_MULTIPLIER).contains(&self.depth_multiplier)
            && self.output_shape(input).is_valid()
    }

    pub fn mutate_param<R: Rng + ?Sized>(&mut self, param: LayerParam, rng: &mut R) {
        match param {
            LayerParam::KernelSize => {
                self.kernel_size = mutate_tuple(
                    self.kernel_size,
                    (1, MAX_KERNEL_DIMENSION),
                    MutationOperator::SyncStep,
                    rng,
                )
            }
            LayerParam::DepthMultiplier => {
                self.depth_multiplier = mutate_int(
                    self.depth_multiplier,
                    (1, MAX_DEPTH_MULTIPLIER),
                    MutationOperator::Step,
                    rng,
                )
            }
            LayerParam::Padding => self.padding = mutate_enum(&Padding::ALL, self.padding, rng),
            LayerParam::Activation => {
                self.activation = mutate_enum(&Activation::ALL, self.activation, rng)
            }
            _ => {}
        }
    }

    pub fn parameter_count(&self, input: &Shape) -> u64 {
        let channels = input.last().unwrap_or(0) as u64;
        let (kh, kw) = self.kernel_size;
        let outputs = channels * self.depth_multiplier as u64;
        (kh * kw) as u64 * outputs + outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(strides: (usize, usize), dilation_rate: (usize, usize)) -> Conv2DArgs {
        Conv2DArgs {
            filters: 8,
            kernel_size: (3, 3),
            strides,
            padding: Padding::Same,
            dilation_rate,
            activation: Activation::Relu,
        }
    }

    #[test]
    fn test_stride_dilation_exclusive() {
        let input = Shape::from([28, 28, 1]);
        assert!(conv((1, 1), (1, 1)).validate(&input));
        assert!(conv((2, 2), (1, 1)).validate(&input));
        assert!(conv((1, 1), (2, 2)).validate(&input));
        assert!(!conv((2, 2), (2, 2)).validate(&input));
    }

    #[test]
    fn test_zero_filters_invalid() {
        let mut args = conv((1, 1), (1, 1));
        args.filters = 0;
        assert!(!args.validate(&Shape::from([28, 28, 1])));
    }

    #[test]
    fn test_output_dims() {
        assert_eq!(conv_output_dim(28, 3, 1, 1, Padding::Same), 28);
        assert_eq!(conv_output_dim(28, 3, 2, 1, Padding::Same), 14);
        assert_eq!(conv_output_dim(28, 3, 1, 1, Padding::Valid), 26);
        assert_eq!(conv_output_dim(28, 3, 1, 2, Padding::Valid), 24);
        assert_eq!(conv_output_dim(2, 3, 1, 1, Padding::Valid), 0);
    }

    #[test]
    fn test_conv_output_shape() {
        let mut args = conv((2, 2), (1, 1));
        args.padding = Padding::Valid;
        assert_eq!(
            args.output_shape(&Shape::from([28, 28, 1])),
            Shape::from([13, 13, 8])
        );
        assert_eq!(args.parameter_count(&Shape::from([28, 28, 1])), 9 * 8 + 8);
    }

    #[test]
    fn test_depthwise_channels() {
        let args = DepthwiseConv2DArgs {
            kernel_size: (1, 3),
            strides: (1, 1),
            padding: Padding::Same,
            depth_multiplier: 2,
            activation: Activation::Relu,
        };
        let input = Shape::from([10, 10, 4]);
        assert_eq!(args.output_shape(&input), Shape::from([10, 10, 8]));
        assert_eq!(args.parameter_count(&input), 3 * 8 + 8);
    }
}
