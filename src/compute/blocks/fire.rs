//! SqueezeNet fire modules.

use serde::{Deserialize, Serialize};

use crate::compute::error::NasError;
use crate::compute::layers::{Activation, Layer, LayerConstraints, LayerType, Padding};
use crate::schema::Shape;

use super::layer_block::layer_leaf;
use super::{Block, BlockTemplate, GenerationContext, SubBlockType};

/// A 1x1 squeeze convolution followed by a spatially preserving expand
/// convolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireBlock;

impl BlockTemplate for FireBlock {
    fn name(&self) -> &'static str {
        "FireBlock"
    }

    fn max_sub_blocks(&self) -> usize {
        1
    }

    fn sub_block_types(&self) -> &'static [SubBlockType] {
        &[SubBlockType::ExpandConv2D]
    }

    fn constrained_input(
        &self,
        input: &Shape,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<Block>, NasError> {
        let squeeze = LayerConstraints {
            kernel_size: Some((1, 1)),
            strides: Some((1, 1)),
            padding: Some(Padding::Same),
            activation: Some(Activation::Relu),
            ..Default::default()
        };
        layer_leaf(LayerType::Conv2D, input, &squeeze, ctx)
            .map(|leaf| vec![leaf])
            .ok_or_else(|| NasError::UnsupportedInput {
                block: self.name(),
                shape: input.clone(),
            })
    }

    fn random_sub_block(
        &self,
        input: &Shape,
        sub_type: SubBlockType,
        ctx: &mut GenerationContext<'_>,
    ) -> Vec<Block> {
        if sub_type != SubBlockType::ExpandConv2D {
            return Vec::new();
        }
        let expand = LayerConstraints {
            strides: Some((1, 1)),
            padding: Some(Padding::Same),
            activation: Some(Activation::Relu),
            ..Default::default()
        };
        layer_leaf(LayerType::Conv2D, input, &expand, ctx)
            .into_iter()
            .collect()
    }

    fn validate(&self, block: &Block) -> bool {
        matches!(
            block.input_blocks.first().and_then(|b| b.layer.as_ref()),
            Some(Layer::Conv2D(args)) if args.kernel_size == (1, 1)
        )
    }
}
