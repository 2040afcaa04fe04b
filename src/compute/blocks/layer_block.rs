//! Leaf blocks wrapping a single layer.

use serde::{Deserialize, Serialize};

use crate::compute::layers::{Layer, LayerConstraints, LayerType};
use crate::schema::Shape;

use super::{Block, BlockTemplate, GenerationContext};

/// Template of a leaf block. The owned layer carries all state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerBlock;

impl BlockTemplate for LayerBlock {
    fn name(&self) -> &'static str {
        "LayerBlock"
    }

    fn validate(&self, block: &Block) -> bool {
        block.layer.is_some()
    }
}

/// Leaf block with a freshly generated layer, if one fits `input`.
pub(crate) fn layer_leaf(
    layer_type: LayerType,
    input: &Shape,
    constraints: &LayerConstraints,
    ctx: &mut GenerationContext<'_>,
) -> Option<Block> {
    Layer::generate(layer_type, input, constraints, ctx.rng())
        .map(|layer| Block::leaf(layer, input.clone()))
}

/// Layer type of a leaf block.
pub(crate) fn leaf_type(block: &Block) -> Option<LayerType> {
    block.layer.as_ref().map(|l| l.layer_type())
}
