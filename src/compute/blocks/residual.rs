//! Residual blocks with an identity shortcut.

use serde::{Deserialize, Serialize};

use crate::schema::Shape;

use super::feature_extraction::same_padded;
use super::{Block, BlockTemplate, GenerationContext, SubBlockType};

/// A shape-preserving feature extraction path whose output is added to the
/// block input.
///
/// The merge itself is left to the [`ModelBuilder`](super::ModelBuilder);
/// the block only guarantees both paths have the same shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidualBlock;

impl BlockTemplate for ResidualBlock {
    fn name(&self) -> &'static str {
        "ResidualBlock"
    }

    fn max_sub_blocks(&self) -> usize {
        1
    }

    fn sub_block_types(&self) -> &'static [SubBlockType] {
        &[SubBlockType::SameConv2D]
    }

    fn random_sub_block(
        &self,
        input: &Shape,
        sub_type: SubBlockType,
        ctx: &mut GenerationContext<'_>,
    ) -> Vec<Block> {
        if sub_type != SubBlockType::SameConv2D {
            return Vec::new();
        }
        same_padded(input, ctx).into_iter().collect()
    }

    fn validate(&self, block: &Block) -> bool {
        block.output_shape() == block.input_shape
    }

    fn combines_input(&self) -> bool {
        true
    }
}
