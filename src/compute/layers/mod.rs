//! Network layers: the leaves of a block tree.
//!
//! Each layer type is a variant of the closed [`Layer`] sum type carrying a
//! strongly-typed argument struct. Layers know how to:
//!
//! - generate arguments valid for an input shape (`Layer::generate`)
//! - compute their output shape as a pure function of arguments and input
//! - validate their arguments against an input shape
//! - mutate one of their declared mutable parameters
//!
//! Mutation never leaves a layer invalid for its input: a perturbation that
//! fails validation is discarded and retried.

mod conv;
mod dense;
pub mod mutation;
mod pooling;
mod reshape;

use std::fmt;

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::Shape;

pub use conv::{
    Conv2DArgs, DepthwiseConv2DArgs, MAX_DEPTH_MULTIPLIER, MAX_DILATION, MAX_FILTER_COUNT,
    MAX_KERNEL_DIMENSION, MAX_STRIDE, conv_output_dim,
};
pub use dense::{DROPOUT_RATE_MAX, DenseArgs, DropoutArgs, MAX_UNITS};
pub use pooling::{MAX_POOL_SIZE, MaxPool2DArgs, MaxPool3DArgs};
pub use reshape::{MAX_RESHAPE_RANK, ReshapeArgs};

/// Attempts made to find arguments (or a mutation) valid for an input shape.
const LAYER_ATTEMPTS: usize = 16;

/// Activation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Elu,
    Exponential,
    Linear,
    Relu,
    Selu,
    Sigmoid,
    Softmax,
    Softplus,
    Softsign,
    Tanh,
}

impl Activation {
    pub const ALL: [Activation; 10] = [
        Activation::Elu,
        Activation::Exponential,
        Activation::Linear,
        Activation::Relu,
        Activation::Selu,
        Activation::Sigmoid,
        Activation::Softmax,
        Activation::Softplus,
        Activation::Softsign,
        Activation::Tanh,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Activation::Elu => "elu",
            Activation::Exponential => "exponential",
            Activation::Linear => "linear",
            Activation::Relu => "relu",
            Activation::Selu => "selu",
            Activation::Sigmoid => "sigmoid",
            Activation::Softmax => "softmax",
            Activation::Softplus => "softplus",
            Activation::Softsign => "softsign",
            Activation::Tanh => "tanh",
        }
    }
}

/// Convolution padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    Same,
    Valid,
}

impl Padding {
    pub const ALL: [Padding; 2] = [Padding::Same, Padding::Valid];

    pub fn name(self) -> &'static str {
        match self {
            Padding::Same => "same",
            Padding::Valid => "valid",
        }
    }
}

/// Mutable layer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerParam {
    Filters,
    KernelSize,
    Strides,
    Padding,
    DilationRate,
    Activation,
    DepthMultiplier,
    PoolSize,
    Units,
    Rate,
    TargetShape,
}

/// Layer type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerType {
    Conv2D,
    DepthwiseConv2D,
    MaxPool2D,
    MaxPool3D,
    GlobalAveragePool2D,
    Flatten,
    Reshape,
    Dense,
    Dropout,
}

impl LayerType {
    pub fn name(self) -> &'static str {
        match self {
            LayerType::Conv2D => "Conv2D",
            LayerType::DepthwiseConv2D => "DepthwiseConv2D",
            LayerType::MaxPool2D => "MaxPool2D",
            LayerType::MaxPool3D => "MaxPool3D",
            LayerType::GlobalAveragePool2D => "GlobalAveragePool2D",
            LayerType::Flatten => "Flatten",
            LayerType::Reshape => "Reshape",
            LayerType::Dense => "Dense",
            LayerType::Dropout => "Dropout",
        }
    }
}

/// Fixed argument values a generated layer must use.
#[derive(Debug, Clone, Default)]
pub struct LayerConstraints {
    pub filters: Option<usize>,
    pub kernel_size: Option<(usize, usize)>,
    pub strides: Option<(usize, usize)>,
    pub padding: Option<Padding>,
    pub activation: Option<Activation>,
    pub depth_multiplier: Option<usize>,
    pub pool_size: Option<(usize, usize)>,
    pub units: Option<usize>,
    pub max_rate: Option<f64>,
    pub target_shape: Option<Shape>,
}

/// A network layer with its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Layer {
    Conv2D(Conv2DArgs),
    DepthwiseConv2D(DepthwiseConv2DArgs),
    MaxPool2D(MaxPool2DArgs),
    MaxPool3D(MaxPool3DArgs),
    GlobalAveragePool2D,
    Flatten,
    Reshape(ReshapeArgs),
    Dense(DenseArgs),
    Dropout(DropoutArgs),
}

impl Layer {
    /// Generate a layer of `layer_type` valid for `input`.
    ///
    /// Returns `None` when no argument set satisfying the constraints fits
    /// the input within the attempt bound.
    pub fn generate<R: Rng + ?Sized>(
        layer_type: LayerType,
        input: &Shape,
        constraints: &LayerConstraints,
        rng: &mut R,
    ) -> Option<Layer> {
        for _ in 0..LAYER_ATTEMPTS {
            let layer = match layer_type {
                LayerType::Conv2D => Layer::Conv2D(Conv2DArgs::generate(constraints, rng)),
                LayerType::DepthwiseConv2D => {
                    Layer::DepthwiseConv2D(DepthwiseConv2DArgs::generate(constraints, rng))
                }
                LayerType::MaxPool2D => {
                    Layer::MaxPool2D(MaxPool2DArgs::generate(input, constraints, rng))
                }
                LayerType::MaxPool3D => Layer::MaxPool3D(MaxPool3DArgs::generate(input, rng)),
                LayerType::GlobalAveragePool2D => Layer::GlobalAveragePool2D,
                LayerType::Flatten => Layer::Flatten,
                LayerType::Reshape => {
                    Layer::Reshape(ReshapeArgs::generate(input, constraints, rng))
                }
                LayerType::Dense => Layer::Dense(DenseArgs::generate(constraints, rng)),
                LayerType::Dropout => Layer::Dropout(DropoutArgs::generate(constraints, rng)),
            };
            if layer.validate(input) {
                return Some(layer);
            }
        }
        None
    }

    pub fn layer_type(&self) -> LayerType {
        match self {
            Layer::Conv2D(_) => LayerType::Conv2D,
            Layer::DepthwiseConv2D(_) => LayerType::DepthwiseConv2D,
            Layer::MaxPool2D(_) => LayerType::MaxPool2D,
            Layer::MaxPool3D(_) => LayerType::MaxPool3D,
            Layer::GlobalAveragePool2D => LayerType::GlobalAveragePool2D,
            Layer::Flatten => LayerType::Flatten,
            Layer::Reshape(_) => LayerType::Reshape,
            Layer::Dense(_) => LayerType::Dense,
            Layer::Dropout(_) => LayerType::Dropout,
        }
    }

    /// Parameters `mutate` may perturb.
    pub fn mutable_parameters(&self) -> &'static [LayerParam] {
        match self {
            Layer::Conv2D(_) => Conv2DArgs::MUTABLE,
            Layer::DepthwiseConv2D(_) => DepthwiseConv2DArgs::MUTABLE,
            Layer::MaxPool2D(_) => MaxPool2DArgs::MUTABLE,
            Layer::MaxPool3D(_) => MaxPool3DArgs::MUTABLE,
            Layer::Reshape(_) => ReshapeArgs::MUTABLE,
            Layer::Dense(_) => DenseArgs::MUTABLE,
            Layer::Dropout(_) => DropoutArgs::MUTABLE,
            Layer::GlobalAveragePool2D | Layer::Flatten => &[],
        }
    }

    /// Output shape for `input`. Invalid (see [`Shape::is_valid`]) when the
    /// arguments do not fit the input.
    pub fn output_shape(&self, input: &Shape) -> Shape {
        match self {
            Layer::Conv2D(args) => args.output_shape(input),
            Layer::DepthwiseConv2D(args) => args.output_shape(input),
            Layer::MaxPool2D(args) => args.output_shape(input),
            Layer::MaxPool3D(args) => args.output_shape(input),
            Layer::GlobalAveragePool2D => pooling::global_average_pool_output(input),
            Layer::Flatten => dense::flatten_output(input),
            Layer::Reshape(args) => args.output_shape(input),
            Layer::Dense(args) => args.output_shape(input),
            Layer::Dropout(_) => input.clone(),
        }
    }

    /// Domain check of the arguments against `input`.
    pub fn validate(&self, input: &Shape) -> bool {
        match self {
            Layer::Conv2D(args) => args.validate(input),
            Layer::DepthwiseConv2D(args) => args.validate(input),
            Layer::MaxPool2D(args) => args.validate(input),
            Layer::MaxPool3D(args) => args.validate(input),
            Layer::GlobalAveragePool2D => self.output_shape(input).is_valid(),
            Layer::Flatten => self.output_shape(input).is_valid(),
            Layer::Reshape(args) => args.validate(input),
            Layer::Dense(args) => args.validate(input),
            Layer::Dropout(args) => args.validate(input),
        }
    }

    /// Perturb one parameter chosen uniformly from [`Layer::mutable_parameters`].
    ///
    /// Mutations that would invalidate the layer for `input`, or that leave
    /// it unchanged (a clamped step, a re-picked enum value), are discarded
    /// and retried. Returns whether the arguments changed; on `false` the
    /// layer is untouched.
    pub fn mutate<R: Rng + ?Sized>(&mut self, input: &Shape, rng: &mut R) -> bool {
        let params = self.mutable_parameters();
        if params.is_empty() {
            return false;
        }

        for _ in 0..LAYER_ATTEMPTS {
            let Some(&param) = params.choose(rng) else {
                return false;
            };
            let mut candidate = self.clone();
            candidate.mutate_param(param, rng);
            if candidate != *self && candidate.validate(input) {
                *self = candidate;
                return true;
            }
        }
        false
    }

    fn mutate_param<R: Rng + ?Sized>(&mut self, param: LayerParam, rng: &mut R) {
        match self {
            Layer::Conv2D(args) => args.mutate_param(param, rng),
            Layer::DepthwiseConv2D(args) => args.mutate_param(param, rng),
            Layer::MaxPool2D(args) => args.mutate_param(param, rng),
            Layer::MaxPool3D(args) => args.mutate_param(param, rng),
            Layer::Reshape(args) => args.mutate_param(param, rng),
            Layer::Dense(args) => args.mutate_param(param, rng),
            Layer::Dropout(args) => args.mutate_param(param, rng),
            Layer::GlobalAveragePool2D | Layer::Flatten => {}
        }
    }

    /// Trainable parameters of this layer for `input`.
    pub fn parameter_count(&self, input: &Shape) -> u64 {
        match self {
            Layer::Conv2D(args) => args.parameter_count(input),
            Layer::DepthwiseConv2D(args) => args.parameter_count(input),
            Layer::Dense(args) => args.parameter_count(input),
            Layer::MaxPool2D(_)
            | Layer::MaxPool3D(_)
            | Layer::GlobalAveragePool2D
            | Layer::Flatten
            | Layer::Reshape(_)
            | Layer::Dropout(_) => 0,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Conv2D(a) => write!(
                f,
                "Conv2D(filters={}, kernel={:?}, strides={:?}, padding={}, dilation={:?}, activation={})",
                a.filters,
                a.kernel_size,
                a.strides,
                a.padding.name(),
                a.dilation_rate,
                a.activation.name()
            ),
            Layer::DepthwiseConv2D(a) => write!(
                f,
                "DepthwiseConv2D(kernel={:?}, strides={:?}, padding={}, depth_multiplier={}, activation={})",
                a.kernel_size,
                a.strides,
                a.padding.name(),
                a.depth_multiplier,
                a.activation.name()
            ),
            Layer::MaxPool2D(a) => match a.strides {
                Some(s) => write!(f, "MaxPool2D(pool={:?}, strides={:?})", a.pool_size, s),
                None => write!(f, "MaxPool2D(pool={:?})", a.pool_size),
            },
            Layer::MaxPool3D(a) => match a.strides {
                Some(s) => write!(f, "MaxPool3D(pool={:?}, strides={:?})", a.pool_size, s),
                None => write!(f, "MaxPool3D(pool={:?})", a.pool_size),
            },
            Layer::GlobalAveragePool2D => write!(f, "GlobalAveragePool2D"),
            Layer::Flatten => write!(f, "Flatten"),
            Layer::Reshape(a) => write!(f, "Reshape(target={})", a.target_shape),
            Layer::Dense(a) => write!(
                f,
                "Dense(units={}, activation={})",
                a.units,
                a.activation.name()
            ),
            Layer::Dropout(a) => write!(f, "Dropout(rate={:.3})", a.rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL_TYPES: [LayerType; 9] = [
        LayerType::Conv2D,
        LayerType::DepthwiseConv2D,
        LayerType::MaxPool2D,
        LayerType::MaxPool3D,
        LayerType::GlobalAveragePool2D,
        LayerType::Flatten,
        LayerType::Reshape,
        LayerType::Dense,
        LayerType::Dropout,
    ];

    #[test]
    fn test_generate_respects_constraints() {
        let mut rng = StdRng::seed_from_u64(42);
        let constraints = LayerConstraints {
            filters: Some(16),
            kernel_size: Some((3, 3)),
            strides: Some((1, 1)),
            padding: Some(Padding::Same),
            ..Default::default()
        };
        let layer = Layer::generate(
            LayerType::Conv2D,
            &Shape::from([28, 28, 1]),
            &constraints,
            &mut rng,
        )
        .unwrap();
        assert_eq!(layer.output_shape(&Shape::from([28, 28, 1])), Shape::from([28, 28, 16]));
    }

    #[test]
    fn test_generate_impossible_returns_none() {
        let mut rng = StdRng::seed_from_u64(1);
        let constraints = LayerConstraints {
            pool_size: Some((4, 4)),
            ..Default::default()
        };
        assert!(
            Layer::generate(
                LayerType::MaxPool2D,
                &Shape::from([2, 2, 3]),
                &constraints,
                &mut rng
            )
            .is_none()
        );
    }

    #[test]
    fn test_parameterless_layers_do_not_mutate() {
        let mut rng = StdRng::seed_from_u64(1);
        let input = Shape::from([4, 4, 2]);
        assert!(!Layer::Flatten.mutate(&input, &mut rng));
        assert!(!Layer::GlobalAveragePool2D.mutate(&input, &mut rng));
    }

    #[test]
    fn test_mutation_reports_only_real_changes() {
        let mut rng = StdRng::seed_from_u64(11);
        let input = Shape::from([32]);
        let mut layer = Layer::Dense(DenseArgs {
            units: 16,
            activation: Activation::Relu,
        });
        for _ in 0..1000 {
            let before = layer.clone();
            assert!(layer.mutate(&input, &mut rng), "no change from {before}");
            assert_ne!(layer, before);
        }
    }

    #[test]
    fn test_unchangeable_mutation_leaves_layer() {
        let mut rng = StdRng::seed_from_u64(4);
        let input = Shape::from([1, 1, 1, 3]);
        let mut layer = Layer::MaxPool3D(MaxPool3DArgs {
            pool_size: (1, 1, 1),
            strides: None,
        });
        // any step up overflows the 1x1x1 volume, any step down clamps
        assert!(!layer.mutate(&input, &mut rng));
        assert_eq!(
            layer,
            Layer::MaxPool3D(MaxPool3DArgs {
                pool_size: (1, 1, 1),
                strides: None,
            })
        );
    }

    #[test]
    fn test_reshape_layer() {
        let mut rng = StdRng::seed_from_u64(6);
        let input = Shape::from([7, 7, 8]);
        let mut layer =
            Layer::generate(LayerType::Reshape, &input, &LayerConstraints::default(), &mut rng)
                .unwrap();
        assert_eq!(layer.output_shape(&input).num_elements(), 392);
        assert_eq!(layer.parameter_count(&input), 0);
        assert!(!layer.validate(&Shape::from([7, 7, 9])));

        for _ in 0..50 {
            assert!(layer.mutate(&input, &mut rng));
            assert!(layer.validate(&input));
            assert_eq!(layer.output_shape(&input).num_elements(), 392);
        }
        assert!(layer.to_string().starts_with("Reshape(target=("));
    }

    #[test]
    fn test_max_pool_3d_layer() {
        let mut rng = StdRng::seed_from_u64(7);
        let volume = Shape::from([4, 12, 12, 3]);
        let mut layer =
            Layer::generate(LayerType::MaxPool3D, &volume, &LayerConstraints::default(), &mut rng)
                .unwrap();
        let out = layer.output_shape(&volume);
        assert_eq!(out.rank(), 4);
        assert_eq!(out.last(), Some(3));

        for _ in 0..20 {
            layer.mutate(&volume, &mut rng);
            assert!(layer.validate(&volume));
            let Layer::MaxPool3D(args) = &layer else {
                panic!("type changed: {layer}");
            };
            assert!(args.pool_size.0 <= 4);
        }

        assert!(
            Layer::generate(
                LayerType::MaxPool3D,
                &Shape::from([12, 12, 3]),
                &LayerConstraints::default(),
                &mut rng
            )
            .is_none()
        );
    }

    #[test]
    fn test_serde_tagged() {
        let layer = Layer::Dense(DenseArgs {
            units: 10,
            activation: Activation::Softmax,
        });
        let json = serde_json::to_string(&layer).unwrap();
        assert!(json.contains(r#""type":"Dense""#));
        let back: Layer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, layer);

        let flat: Layer = serde_json::from_str(r#"{"type":"Flatten"}"#).unwrap();
        assert_eq!(flat, Layer::Flatten);

        let reshape: Layer =
            serde_json::from_str(r#"{"type":"Reshape","target_shape":[4,8]}"#).unwrap();
        assert_eq!(reshape.output_shape(&Shape::from([32])), Shape::from([4, 8]));
    }

    proptest! {
        #[test]
        fn prop_mutation_keeps_positive_shape(
            seed in any::<u64>(),
            h in 1usize..40,
            w in 1usize..40,
            c in 1usize..16,
            depth in proptest::option::of(1usize..6),
            type_index in 0usize..9,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let input = match depth {
                Some(d) => Shape::from([d, h, w, c]),
                None => Shape::from([h, w, c]),
            };
            let layer_type = ALL_TYPES[type_index];
            if let Some(mut layer) = Layer::generate(layer_type, &input, &LayerConstraints::default(), &mut rng) {
                for _ in 0..20 {
                    layer.mutate(&input, &mut rng);
                    let out = layer.output_shape(&input);
                    prop_assert!(out.is_valid(), "{} produced {}", layer, out);
                    prop_assert!(layer.validate(&input));
                }
            }
        }
    }
}
