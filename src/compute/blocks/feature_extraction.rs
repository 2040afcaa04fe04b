//! Convolutional feature extraction.

use serde::{Deserialize, Serialize};

use crate::compute::error::NasError;
use crate::compute::layers::{LayerConstraints, LayerType, Padding};
use crate::schema::Shape;

use super::layer_block::{layer_leaf, leaf_type};
use super::{Block, BlockKind, BlockTemplate, GenerationContext, SubBlockType};

/// A leading convolution followed by up to two convolution, pooling or
/// dropout layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureExtractionBlock;

impl BlockTemplate for FeatureExtractionBlock {
    fn name(&self) -> &'static str {
        "FeatureExtractionBlock"
    }

    fn max_sub_blocks(&self) -> usize {
        2
    }

    fn sub_block_types(&self) -> &'static [SubBlockType] {
        &[
            SubBlockType::Conv2D,
            SubBlockType::MaxPool2D,
            SubBlockType::Dropout,
        ]
    }

    fn constrained_input(
        &self,
        input: &Shape,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<Block>, NasError> {
        layer_leaf(LayerType::Conv2D, input, &LayerConstraints::default(), ctx)
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
        let layer_type = match sub_type {
            SubBlockType::Conv2D => LayerType::Conv2D,
            SubBlockType::MaxPool2D => LayerType::MaxPool2D,
            SubBlockType::Dropout => LayerType::Dropout,
            _ => return Vec::new(),
        };
        layer_leaf(layer_type, input, &LayerConstraints::default(), ctx)
            .into_iter()
            .collect()
    }

    fn validate(&self, block: &Block) -> bool {
        block
            .input_blocks
            .first()
            .and_then(leaf_type)
            .is_some_and(|t| t == LayerType::Conv2D)
    }
}

/// Feature extraction that keeps its input shape: a stride-1, same-padded
/// convolution with the input's channel count, followed by a second such
/// convolution or by dropout. `None` for non-image input.
pub(crate) fn same_padded(input: &Shape, ctx: &mut GenerationContext<'_>) -> Option<Block> {
    let same = LayerConstraints {
        filters: input.last(),
        strides: Some((1, 1)),
        padding: Some(Padding::Same),
        ..Default::default()
    };
    let mut block = Block::empty(
        BlockKind::FeatureExtraction(FeatureExtractionBlock),
        input.clone(),
    );
    block
        .input_blocks
        .push(layer_leaf(LayerType::Conv2D, input, &same, ctx)?);
    let follow = if ctx.rng().chance(0.5) {
        layer_leaf(LayerType::Conv2D, input, &same, ctx)
    } else {
        layer_leaf(LayerType::Dropout, input, &LayerConstraints::default(), ctx)
    };
    block.middle_blocks.extend(follow);
    block.reindex();
    Some(block)
}
