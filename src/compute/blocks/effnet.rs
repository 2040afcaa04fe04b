//! EffNet blocks: separable convolutions with asymmetric pooling.

use serde::{Deserialize, Serialize};

use crate::compute::error::NasError;
use crate::compute::layers::{Activation, LayerConstraints, LayerType, Padding};
use crate::schema::Shape;

use super::layer_block::layer_leaf;
use super::{Block, BlockTemplate, GenerationContext};

/// Fixed five-layer chain halving both spatial dimensions:
/// 1x1 conv, depthwise (1,3), max pool (2,1), depthwise (3,1), and a (1,2)
/// convolution with stride (1,2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffNetBlock;

impl EffNetBlock {
    fn stages() -> [(LayerType, LayerConstraints); 5] {
        let depthwise = |kernel| LayerConstraints {
            kernel_size: Some(kernel),
            strides: Some((1, 1)),
            padding: Some(Padding::Same),
            depth_multiplier: Some(1),
            activation: Some(Activation::Relu),
            ..Default::default()
        };
        [
            (
                LayerType::Conv2D,
                LayerConstraints {
                    kernel_size: Some((1, 1)),
                    strides: Some((1, 1)),
                    padding: Some(Padding::Same),
                    activation: Some(Activation::Relu),
                    ..Default::default()
                },
            ),
            (LayerType::DepthwiseConv2D, depthwise((1, 3))),
            (
                LayerType::MaxPool2D,
                LayerConstraints {
                    pool_size: Some((2, 1)),
                    strides: Some((2, 1)),
                    ..Default::default()
                },
            ),
            (LayerType::DepthwiseConv2D, depthwise((3, 1))),
            (
                LayerType::Conv2D,
                LayerConstraints {
                    kernel_size: Some((1, 2)),
                    strides: Some((1, 2)),
                    padding: Some(Padding::Valid),
                    activation: Some(Activation::Relu),
                    ..Default::default()
                },
            ),
        ]
    }
}

impl BlockTemplate for EffNetBlock {
    fn name(&self) -> &'static str {
        "EffNetBlock"
    }

    fn constrained_input(
        &self,
        input: &Shape,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<Block>, NasError> {
        let mut blocks = Vec::with_capacity(5);
        let mut shape = input.clone();
        for (layer_type, constraints) in Self::stages() {
            let leaf = layer_leaf(layer_type, &shape, &constraints, ctx).ok_or_else(|| {
                NasError::UnsupportedInput {
                    block: self.name(),
                    shape: input.clone(),
                }
            })?;
            shape = leaf.output_shape();
            blocks.push(leaf);
        }
        Ok(blocks)
    }

    fn validate(&self, block: &Block) -> bool {
        block.input_blocks.len() == 5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::blocks::BlockKind;
    use crate::compute::rng::NasRng;
    use crate::schema::GenerationLimits;

    #[test]
    fn test_halves_spatial_dims() {
        let limits = GenerationLimits::default();
        let mut rng = NasRng::new(41);
        let mut ctx = GenerationContext::new(&mut rng, &limits);
        let block = Block::generate(
            BlockKind::EffNet(EffNetBlock),
            &Shape::from([28, 28, 3]),
            &mut ctx,
        )
        .unwrap();

        let (h, w, _) = block.output_shape().as_image().unwrap();
        assert_eq!((h, w), (14, 14));
        assert!(block.middle_blocks.is_empty());
        assert!(block.validate());
    }

    #[test]
    fn test_too_small_input() {
        let limits = GenerationLimits::default();
        let mut rng = NasRng::new(1);
        let mut ctx = GenerationContext::new(&mut rng, &limits);
        let result = Block::generate(
            BlockKind::EffNet(EffNetBlock),
            &Shape::from([1, 1, 3]),
            &mut ctx,
        );
        assert!(matches!(result, Err(NasError::UnsupportedInput { .. })));
    }
}
