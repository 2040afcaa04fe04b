//! Classification heads.

use serde::{Deserialize, Serialize};

use crate::compute::error::NasError;
use crate::compute::layers::{Activation, LayerConstraints, LayerType};
use crate::schema::Shape;

use super::layer_block::{layer_leaf, leaf_type};
use super::{Block, BlockTemplate, GenerationContext, SubBlockType};

/// Dropout ceiling inside classification heads.
pub const CLASSIFICATION_DROPOUT_MAX: f64 = 0.2;

/// Dense output layer producing `class_count` units, or a random width when
/// the head is not the network output.
fn output_dense(
    name: &'static str,
    input: &Shape,
    class_count: Option<usize>,
    ctx: &mut GenerationContext<'_>,
) -> Result<Block, NasError> {
    let constraints = LayerConstraints {
        units: class_count,
        activation: class_count.map(|_| Activation::Softmax),
        ..Default::default()
    };
    layer_leaf(LayerType::Dense, input, &constraints, ctx).ok_or_else(|| {
        NasError::UnsupportedInput {
            block: name,
            shape: input.clone(),
        }
    })
}

fn flatten(
    name: &'static str,
    input: &Shape,
    ctx: &mut GenerationContext<'_>,
) -> Result<Block, NasError> {
    layer_leaf(LayerType::Flatten, input, &LayerConstraints::default(), ctx).ok_or_else(|| {
        NasError::UnsupportedInput {
            block: name,
            shape: input.clone(),
        }
    })
}

/// Last sub-block is a dense layer and, for a known class count, the output
/// is exactly `[class_count]`.
fn ends_in_classes(block: &Block, class_count: Option<usize>) -> bool {
    let ends_dense = block
        .output_blocks
        .last()
        .and_then(leaf_type)
        .is_some_and(|t| t == LayerType::Dense);
    let classes_ok = match class_count {
        Some(n) => block.output_shape() == Shape::from([n]),
        None => true,
    };
    ends_dense && classes_ok
}

/// Flatten, dense and dropout layers ending in a dense output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationBlock {
    /// Required output width when this head is the network output.
    pub class_count: Option<usize>,
}

impl BlockTemplate for ClassificationBlock {
    fn name(&self) -> &'static str {
        "ClassificationBlock"
    }

    fn max_sub_blocks(&self) -> usize {
        10
    }

    fn sub_block_types(&self) -> &'static [SubBlockType] {
        &[
            SubBlockType::Flatten,
            SubBlockType::Dense,
            SubBlockType::Dropout,
        ]
    }

    fn constrained_output(
        &self,
        input: &Shape,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<Block>, NasError> {
        let mut blocks = Vec::with_capacity(2);
        let mut shape = input.clone();
        if input.rank() > 1 {
            let leaf = flatten(self.name(), input, ctx)?;
            shape = leaf.output_shape();
            blocks.push(leaf);
        }
        blocks.push(output_dense(self.name(), &shape, self.class_count, ctx)?);
        Ok(blocks)
    }

    fn random_sub_block(
        &self,
        input: &Shape,
        sub_type: SubBlockType,
        ctx: &mut GenerationContext<'_>,
    ) -> Vec<Block> {
        let (layer_type, constraints) = match sub_type {
            SubBlockType::Flatten => (LayerType::Flatten, LayerConstraints::default()),
            SubBlockType::Dense => (LayerType::Dense, LayerConstraints::default()),
            SubBlockType::Dropout => (
                LayerType::Dropout,
                LayerConstraints {
                    max_rate: Some(CLASSIFICATION_DROPOUT_MAX),
                    ..Default::default()
                },
            ),
            _ => return Vec::new(),
        };
        layer_leaf(layer_type, input, &constraints, ctx)
            .into_iter()
            .collect()
    }

    fn validate(&self, block: &Block) -> bool {
        ends_in_classes(block, self.class_count)
    }

    fn mutate(&self, block: &mut Block, ctx: &mut GenerationContext<'_>) -> bool {
        block.mutate_random_middle(ctx)
    }
}

/// Head for image-shaped features: global pooling (or flattening), a few
/// dense or dropout layers, and a softmax output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoDClassificationBlock {
    pub class_count: usize,
}

impl BlockTemplate for TwoDClassificationBlock {
    fn name(&self) -> &'static str {
        "TwoDClassificationBlock"
    }

    fn max_sub_blocks(&self) -> usize {
        2
    }

    fn sub_block_types(&self) -> &'static [SubBlockType] {
        &[SubBlockType::Dense, SubBlockType::Dropout]
    }

    fn constrained_input(
        &self,
        input: &Shape,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<Block>, NasError> {
        let reduce = match input.rank() {
            3 => LayerType::GlobalAveragePool2D,
            r if r > 1 => LayerType::Flatten,
            _ => return Ok(Vec::new()),
        };
        layer_leaf(reduce, input, &LayerConstraints::default(), ctx)
            .map(|leaf| vec![leaf])
            .ok_or_else(|| NasError::UnsupportedInput {
                block: self.name(),
                shape: input.clone(),
            })
    }

    fn constrained_output(
        &self,
        input: &Shape,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<Block>, NasError> {
        Ok(vec![output_dense(
            self.name(),
            input,
            Some(self.class_count),
            ctx,
        )?])
    }

    fn random_sub_block(
        &self,
        input: &Shape,
        sub_type: SubBlockType,
        ctx: &mut GenerationContext<'_>,
    ) -> Vec<Block> {
        let (layer_type, constraints) = match sub_type {
            SubBlockType::Dense => (LayerType::Dense, LayerConstraints::default()),
            SubBlockType::Dropout => (
                LayerType::Dropout,
                LayerConstraints {
                    max_rate: Some(CLASSIFICATION_DROPOUT_MAX),
                    ..Default::default()
                },
            ),
            _ => return Vec::new(),
        };
        layer_leaf(layer_type, input, &constraints, ctx)
            .into_iter()
            .collect()
    }

    fn validate(&self, block: &Block) -> bool {
        ends_in_classes(block, Some(self.class_count))
    }

    fn mutate(&self, block: &mut Block, ctx: &mut GenerationContext<'_>) -> bool {
        block.mutate_random_middle(ctx)
    }
}
