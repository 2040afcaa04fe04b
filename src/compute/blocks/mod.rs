//! Composable block trees.
//!
//! A [`Block`] either owns a single [`Layer`] (a leaf) or three ordered
//! sections of sub-blocks: a constrained input section, a randomly generated
//! middle section and a constrained output section. What a block may contain
//! and how it validates and mutates is decided by its [`BlockKind`], whose
//! variants each implement [`BlockTemplate`].
//!
//! Parent links are plain [`BlockId`]s: ids are pre-order indices assigned by
//! [`Block::reindex`], so a parent is looked up, never owned.

mod architectures;
mod builder;
mod classification;
mod effnet;
mod feature_extraction;
mod fire;
mod layer_block;
mod residual;

use std::fmt;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::schema::{GenerationLimits, Shape};

use super::error::NasError;
use super::layers::Layer;
use super::rng::NasRng;

pub use architectures::ArchitectureBlock;
pub use builder::{ModelBuilder, ParameterCounter};
pub use classification::{
    CLASSIFICATION_DROPOUT_MAX, ClassificationBlock, TwoDClassificationBlock,
};
pub use effnet::EffNetBlock;
pub use feature_extraction::FeatureExtractionBlock;
pub use fire::FireBlock;
pub use layer_block::LayerBlock;
pub use residual::ResidualBlock;

/// Pre-order index of a block within its tree.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tags of the sub-blocks a block may randomly generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubBlockType {
    Conv2D,
    MaxPool2D,
    Dropout,
    Flatten,
    Dense,
    SameConv2D,
    ExpandConv2D,
    FeatureExtraction,
    Residual,
    Fire,
    EffNet,
}

/// Randomness and limits shared by one generation or mutation pass.
pub struct GenerationContext<'a> {
    rng: &'a mut NasRng,
    limits: &'a GenerationLimits,
}

impl<'a> GenerationContext<'a> {
    pub fn new(rng: &'a mut NasRng, limits: &'a GenerationLimits) -> Self {
        Self { rng, limits }
    }

    #[inline]
    pub fn rng(&mut self) -> &mut NasRng {
        self.rng
    }

    #[inline]
    pub fn limits(&self) -> &GenerationLimits {
        self.limits
    }
}

/// Capabilities of one kind of block.
///
/// Defaults describe a plain composite: no constrained sections, no random
/// sub-blocks, no extra validation, and mutation of one random child.
pub trait BlockTemplate {
    /// Human-readable block name.
    fn name(&self) -> &'static str;

    /// Upper bound of the middle section.
    fn max_sub_blocks(&self) -> usize {
        0
    }

    /// Sub-block types the middle section is generated from.
    fn sub_block_types(&self) -> &'static [SubBlockType] {
        &[]
    }

    /// Mandatory leading sub-blocks.
    fn constrained_input(
        &self,
        _input: &Shape,
        _ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<Block>, NasError> {
        Ok(Vec::new())
    }

    /// Mandatory trailing sub-blocks.
    fn constrained_output(
        &self,
        _input: &Shape,
        _ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<Block>, NasError> {
        Ok(Vec::new())
    }

    /// Zero or more sub-blocks of `sub_type` for `input`. Empty when the type
    /// cannot be built for this input.
    fn random_sub_block(
        &self,
        _input: &Shape,
        _sub_type: SubBlockType,
        _ctx: &mut GenerationContext<'_>,
    ) -> Vec<Block> {
        Vec::new()
    }

    /// Domain rules checked on top of the structural shape chain.
    fn validate(&self, _block: &Block) -> bool {
        true
    }

    /// Mutate `block` in place. Returns whether anything changed.
    fn mutate(&self, block: &mut Block, ctx: &mut GenerationContext<'_>) -> bool {
        block.mutate_random_child(ctx)
    }

    /// Whether the block's input is merged back into the output of its path.
    fn combines_input(&self) -> bool {
        false
    }
}

/// Every kind of block, carrying its template state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BlockKind {
    Layer(LayerBlock),
    FeatureExtraction(FeatureExtractionBlock),
    Classification(ClassificationBlock),
    TwoDClassification(TwoDClassificationBlock),
    Residual(ResidualBlock),
    Fire(FireBlock),
    EffNet(EffNetBlock),
    Architecture(ArchitectureBlock),
}

/// Resolve the template of a [`BlockKind`] statically.
macro_rules! with_template {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            BlockKind::Layer($t) => $body,
            BlockKind::FeatureExtraction($t) => $body,
            BlockKind::Classification($t) => $body,
            BlockKind::TwoDClassification($t) => $body,
            BlockKind::Residual($t) => $body,
            BlockKind::Fire($t) => $body,
            BlockKind::EffNet($t) => $body,
            BlockKind::Architecture($t) => $body,
        }
    };
}

impl BlockKind {
    pub fn name(&self) -> &'static str {
        with_template!(self, t => t.name())
    }

    pub fn max_sub_blocks(&self) -> usize {
        with_template!(self, t => t.max_sub_blocks())
    }

    pub fn sub_block_types(&self) -> &'static [SubBlockType] {
        with_template!(self, t => t.sub_block_types())
    }

    pub fn combines_input(&self) -> bool {
        with_template!(self, t => t.combines_input())
    }

    fn constrained_input(
        &self,
        input: &Shape,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<Block>, NasError> {
        with_template!(self, t => t.constrained_input(input, ctx))
    }

    fn constrained_output(
        &self,
        input: &Shape,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<Block>, NasError> {
        with_template!(self, t => t.constrained_output(input, ctx))
    }

    fn random_sub_block(
        &self,
        input: &Shape,
        sub_type: SubBlockType,
        ctx: &mut GenerationContext<'_>,
    ) -> Vec<Block> {
        with_template!(self, t => t.random_sub_block(input, sub_type, ctx))
    }

    fn validate(&self, block: &Block) -> bool {
        with_template!(self, t => t.validate(block))
    }

    fn mutate(&self, block: &mut Block, ctx: &mut GenerationContext<'_>) -> bool {
        with_template!(self, t => t.mutate(block, ctx))
    }
}

/// Node of a block tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(default)]
    pub parent: Option<BlockId>,
    pub kind: BlockKind,
    pub input_shape: Shape,
    #[serde(default)]
    pub input_blocks: Vec<Block>,
    #[serde(default)]
    pub middle_blocks: Vec<Block>,
    #[serde(default)]
    pub output_blocks: Vec<Block>,
    #[serde(default)]
    pub layer: Option<Layer>,
}

impl Block {
    fn empty(kind: BlockKind, input_shape: Shape) -> Self {
        Self {
            id: BlockId::default(),
            parent: None,
            kind,
            input_shape,
            input_blocks: Vec::new(),
            middle_blocks: Vec::new(),
            output_blocks: Vec::new(),
            layer: None,
        }
    }

    /// Leaf block owning `layer`.
    pub fn leaf(layer: Layer, input_shape: Shape) -> Self {
        Self {
            layer: Some(layer),
            ..Self::empty(BlockKind::Layer(LayerBlock), input_shape)
        }
    }

    /// Generate a block of `kind` for `input`.
    ///
    /// Builds the constrained input section, fills the middle section with
    /// random sub-blocks up to the kind's maximum, then appends the
    /// constrained output section for the shape threaded through the first
    /// two. Fails with [`NasError::GenerationFailure`] once
    /// `max_sub_blocks * attempt_multiplier` random attempts are spent.
    pub fn generate(
        kind: BlockKind,
        input: &Shape,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Block, NasError> {
        let mut block = Block::empty(kind, input.clone());

        let mut shape = input.clone();
        block.input_blocks = kind.constrained_input(&shape, ctx)?;
        shape = chain(&block.input_blocks, shape);

        let max = kind.max_sub_blocks();
        let types = kind.sub_block_types();
        let cap = max * ctx.limits().attempt_multiplier;
        let mut attempts = 0;

        while block.middle_blocks.len() < max {
            if attempts >= cap {
                return Err(NasError::GenerationFailure {
                    block: kind.name(),
                    generated: block.middle_blocks.len(),
                    required: max,
                    attempts,
                });
            }
            attempts += 1;

            let Some(sub_type) = ctx.rng().pick(types) else {
                break;
            };
            for sub_block in kind.random_sub_block(&shape, sub_type, ctx) {
                if block.middle_blocks.len() >= max {
                    break;
                }
                shape = chain(std::slice::from_ref(&sub_block), shape);
                block.middle_blocks.push(sub_block);
            }
        }

        block.output_blocks = kind.constrained_output(&shape, ctx)?;
        block.reindex();
        Ok(block)
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_leaf(&self) -> bool {
        self.layer.is_some()
    }

    /// Sub-blocks in execution order.
    pub fn children(&self) -> impl Iterator<Item = &Block> {
        self.input_blocks
            .iter()
            .chain(&self.middle_blocks)
            .chain(&self.output_blocks)
    }

    fn children_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.input_blocks
            .iter_mut()
            .chain(&mut self.middle_blocks)
            .chain(&mut self.output_blocks)
    }

    pub fn sub_block_count(&self) -> usize {
        self.input_blocks.len() + self.middle_blocks.len() + self.output_blocks.len()
    }

    /// Number of blocks in this subtree, including itself.
    pub fn tree_size(&self) -> usize {
        1 + self.children().map(Block::tree_size).sum::<usize>()
    }

    /// Leaf layers in execution order.
    pub fn layers(&self) -> Vec<&Layer> {
        let mut out = Vec::new();
        self.collect_layers(&mut out);
        out
    }

    fn collect_layers<'a>(&'a self, out: &mut Vec<&'a Layer>) {
        match &self.layer {
            Some(layer) => out.push(layer),
            None => self.children().for_each(|c| c.collect_layers(out)),
        }
    }

    /// Output of the owned layer, else of the last sub-block, else the input.
    pub fn output_shape(&self) -> Shape {
        if let Some(layer) = &self.layer {
            return layer.output_shape(&self.input_shape);
        }
        match self.children().last() {
            Some(last) => last.output_shape(),
            None => self.input_shape.clone(),
        }
    }

    /// Re-thread `input` through the subtree, updating every recorded input
    /// shape. Returns the new output shape.
    pub fn propagate(&mut self, input: Shape) -> Shape {
        self.input_shape = input;
        if let Some(layer) = &self.layer {
            return layer.output_shape(&self.input_shape);
        }
        let mut shape = self.input_shape.clone();
        for child in self.children_mut() {
            shape = child.propagate(shape);
        }
        shape
    }

    /// Structural and domain check of the subtree.
    ///
    /// Every sub-block must start from its predecessor's output shape and be
    /// valid itself, the middle section must respect its bound, the output
    /// must be a valid shape, and the kind's own rules must hold.
    pub fn validate(&self) -> bool {
        if let Some(layer) = &self.layer {
            return self.sub_block_count() == 0
                && layer.validate(&self.input_shape)
                && self.kind.validate(self);
        }

        if self.middle_blocks.len() > self.kind.max_sub_blocks() {
            return false;
        }

        let mut shape = self.input_shape.clone();
        for child in self.children() {
            if child.input_shape != shape || !child.validate() {
                return false;
            }
            shape = child.output_shape();
        }

        shape.is_valid() && self.kind.validate(self)
    }

    /// Mutate the subtree according to its kind. Shapes are re-threaded
    /// afterwards; the result is not validated here.
    pub fn mutate(&mut self, ctx: &mut GenerationContext<'_>) -> bool {
        let kind = self.kind;
        let changed = kind.mutate(self, ctx);
        if changed {
            self.propagate(self.input_shape.clone());
        }
        changed
    }

    /// Default policy: mutate one sub-block chosen uniformly, or the owned
    /// layer of a leaf.
    pub fn mutate_random_child(&mut self, ctx: &mut GenerationContext<'_>) -> bool {
        if let Some(layer) = &mut self.layer {
            return layer.mutate(&self.input_shape, ctx.rng());
        }
        let count = self.sub_block_count();
        if count == 0 {
            return false;
        }
        let index = ctx.rng().gen_range(0..count);
        match self.children_mut().nth(index) {
            Some(child) => child.mutate(ctx),
            None => false,
        }
    }

    /// Mutate one middle sub-block chosen uniformly.
    pub fn mutate_random_middle(&mut self, ctx: &mut GenerationContext<'_>) -> bool {
        if self.middle_blocks.is_empty() {
            return false;
        }
        let index = ctx.rng().gen_range(0..self.middle_blocks.len());
        self.middle_blocks[index].mutate(ctx)
    }

    /// Insert a freshly generated middle sub-block at a random position.
    /// Returns false when the section is full or nothing could be built.
    pub fn add_random_middle(&mut self, ctx: &mut GenerationContext<'_>) -> bool {
        let kind = self.kind;
        if self.middle_blocks.len() >= kind.max_sub_blocks() {
            return false;
        }
        let Some(sub_type) = ctx.rng().pick(kind.sub_block_types()) else {
            return false;
        };

        let position = ctx.rng().gen_range(0..=self.middle_blocks.len());
        let input = match position {
            0 => chain(&self.input_blocks, self.input_shape.clone()),
            p => self.middle_blocks[p - 1].output_shape(),
        };

        let Some(sub_block) = kind.random_sub_block(&input, sub_type, ctx).into_iter().next()
        else {
            return false;
        };
        self.middle_blocks.insert(position, sub_block);
        self.propagate(self.input_shape.clone());
        true
    }

    /// Remove a random middle sub-block, keeping at least one.
    pub fn remove_random_middle(&mut self, ctx: &mut GenerationContext<'_>) -> bool {
        if self.middle_blocks.len() <= 1 {
            return false;
        }
        let index = ctx.rng().gen_range(0..self.middle_blocks.len());
        self.middle_blocks.remove(index);
        self.propagate(self.input_shape.clone());
        true
    }

    /// Assign pre-order ids and parent links, treating this block as root.
    pub fn reindex(&mut self) {
        let mut next = 0;
        self.assign_ids(&mut next, None);
    }

    fn assign_ids(&mut self, next: &mut usize, parent: Option<BlockId>) {
        self.id = BlockId(*next);
        self.parent = parent;
        *next += 1;
        let id = self.id;
        for child in self.children_mut() {
            child.assign_ids(next, Some(id));
        }
    }

    /// Find a block by id within this subtree.
    pub fn find(&self, id: BlockId) -> Option<&Block> {
        if self.id == id {
            return Some(self);
        }
        self.children().find_map(|c| c.find(id))
    }

    /// Check ids, parent links and the shape chain of a tree rebuilt from
    /// external data.
    pub fn check_consistency(&self) -> Result<(), NasError> {
        let mut next = 0;
        self.check_node(&mut next, None)
    }

    fn check_node(&self, next: &mut usize, parent: Option<BlockId>) -> Result<(), NasError> {
        if self.id != BlockId(*next) {
            return Err(NasError::CorruptTree {
                block: self.id,
                reason: format!("expected id {}", BlockId(*next)),
            });
        }
        if self.parent != parent {
            return Err(NasError::CorruptTree {
                block: self.id,
                reason: format!("parent {:?} does not match {:?}", self.parent, parent),
            });
        }
        if self.layer.is_some() != matches!(self.kind, BlockKind::Layer(_)) {
            return Err(NasError::CorruptTree {
                block: self.id,
                reason: "layer ownership disagrees with block kind".to_string(),
            });
        }
        *next += 1;

        let mut shape = self.input_shape.clone();
        for child in self.children() {
            if child.input_shape != shape {
                return Err(NasError::ShapeMismatch {
                    block: child.id,
                    expected: shape,
                    found: child.input_shape.clone(),
                });
            }
            child.check_node(next, Some(self.id))?;
            shape = child.output_shape();
        }
        Ok(())
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match &self.layer {
            Some(layer) => writeln!(
                f,
                "{indent}{layer}: {} -> {}",
                self.input_shape,
                self.output_shape()
            )?,
            None => {
                writeln!(
                    f,
                    "{indent}{}: {} -> {}",
                    self.name(),
                    self.input_shape,
                    self.output_shape()
                )?;
                for child in self.children() {
                    child.fmt_tree(f, depth + 1)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

/// Output shape after threading `input` through `blocks`.
///
/// Panics if a block was built for a different input: that is a logic error
/// in generation, not a recoverable condition.
fn chain(blocks: &[Block], input: Shape) -> Shape {
    blocks.iter().fold(input, |shape, block| {
        assert_eq!(
            block.input_shape, shape,
            "{} built for {} but placed after output {}",
            block.name(),
            block.input_shape,
            shape
        );
        block.output_shape()
    })
}

/// Generate a nested block, logging instead of failing so the caller can
/// retry with another sub-block type.
pub(crate) fn try_generate(
    kind: BlockKind,
    input: &Shape,
    ctx: &mut GenerationContext<'_>,
) -> Vec<Block> {
    match Block::generate(kind, input, ctx) {
        Ok(block) => vec![block],
        Err(err) => {
            debug!("Skipping {} sub-block: {err}", kind.name());
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::compute::layers::{DenseArgs, LayerType};
    use crate::schema::ArchitectureKind;
    use proptest::prelude::*;

    fn kinds() -> Vec<BlockKind> {
        vec![
            BlockKind::FeatureExtraction(FeatureExtractionBlock),
            BlockKind::Classification(ClassificationBlock {
                class_count: Some(10),
            }),
            BlockKind::Classification(ClassificationBlock { class_count: None }),
            BlockKind::TwoDClassification(TwoDClassificationBlock { class_count: 10 }),
            BlockKind::Residual(ResidualBlock),
            BlockKind::Fire(FireBlock),
            BlockKind::EffNet(EffNetBlock),
            BlockKind::Architecture(ArchitectureBlock {
                kind: ArchitectureKind::Classification,
                class_count: 10,
            }),
            BlockKind::Architecture(ArchitectureBlock {
                kind: ArchitectureKind::SqueezeNet,
                class_count: 10,
            }),
            BlockKind::Architecture(ArchitectureBlock {
                kind: ArchitectureKind::EffNet,
                class_count: 10,
            }),
        ]
    }

    #[test]
    fn test_generated_blocks_validate() {
        let limits = GenerationLimits::default();
        let mut rng = NasRng::new(42);
        let input = Shape::from([28, 28, 3]);
        for kind in kinds() {
            for _ in 0..5 {
                let mut ctx = GenerationContext::new(&mut rng, &limits);
                match Block::generate(kind, &input, &mut ctx) {
                    Ok(block) => {
                        assert!(block.validate(), "{} invalid:\n{}", kind.name(), block);
                        assert!(block.middle_blocks.len() <= kind.max_sub_blocks());
                        assert!(block.check_consistency().is_ok());
                    }
                    Err(NasError::GenerationFailure { .. }) => {}
                    Err(err) => panic!("{}: {err}", kind.name()),
                }
            }
        }
    }

    /// Replace the last middle sub-block of a fresh `kind` block with a new
    /// `sub_type` sub-block. `None` when this draw could not exercise it.
    fn regrow_last_middle(
        kind: BlockKind,
        sub_type: SubBlockType,
        input: &Shape,
        ctx: &mut GenerationContext<'_>,
    ) -> Option<Block> {
        let mut block = Block::generate(kind, input, ctx).ok()?;
        block.middle_blocks.pop()?;
        block.propagate(input.clone());
        let shape = chain(&block.input_blocks, input.clone());
        let shape = chain(&block.middle_blocks, shape);
        let new = kind.random_sub_block(&shape, sub_type, ctx);
        if new.is_empty() {
            return None;
        }
        block.middle_blocks.extend(new);
        block.propagate(input.clone());
        block.reindex();
        if let BlockKind::Classification(_) | BlockKind::TwoDClassification(_) = kind {
            // head follows the new middle output
            let head_input = chain(
                &block.middle_blocks,
                chain(&block.input_blocks, input.clone()),
            );
            block.output_blocks = kind.constrained_output(&head_input, ctx).ok()?;
            block.propagate(input.clone());
        }
        Some(block)
    }

    #[test]
    fn test_random_sub_block_keeps_parent_valid() {
        let limits = GenerationLimits::default();
        let mut rng = NasRng::new(3);
        let input = Shape::from([16, 16, 4]);
        let catalogue: HashSet<(&str, SubBlockType)> = kinds()
            .iter()
            .flat_map(|kind| {
                kind.sub_block_types()
                    .iter()
                    .map(move |&t| (kind.name(), t))
            })
            .collect();

        let mut covered = HashSet::new();
        for kind in kinds() {
            for &sub_type in kind.sub_block_types() {
                for _ in 0..50 {
                    let mut ctx = GenerationContext::new(&mut rng, &limits);
                    if let Some(block) = regrow_last_middle(kind, sub_type, &input, &mut ctx) {
                        assert!(
                            block.validate(),
                            "{} with {:?}:\n{}",
                            kind.name(),
                            sub_type,
                            block
                        );
                        covered.insert((kind.name(), sub_type));
                        break;
                    }
                }
            }
        }
        let missing: Vec<_> = catalogue.difference(&covered).collect();
        assert!(missing.is_empty(), "never exercised: {missing:?}");
        assert_eq!(covered, catalogue);
    }

    #[test]
    fn test_reindex_preorder_and_parents() {
        let limits = GenerationLimits::default();
        let mut rng = NasRng::new(5);
        let mut ctx = GenerationContext::new(&mut rng, &limits);
        let kind = BlockKind::Architecture(ArchitectureBlock {
            kind: ArchitectureKind::SqueezeNet,
            class_count: 4,
        });
        let block = Block::generate(kind, &Shape::from([12, 12, 3]), &mut ctx).unwrap();

        assert_eq!(block.id, BlockId(0));
        assert_eq!(block.parent, None);
        for i in 1..block.tree_size() {
            let node = block.find(BlockId(i)).unwrap();
            let parent = block.find(node.parent.unwrap()).unwrap();
            assert!(parent.children().any(|c| c.id == node.id));
        }
        assert!(block.find(BlockId(block.tree_size())).is_none());
    }

    #[test]
    fn test_leaf_validation() {
        let leaf = Block::leaf(
            Layer::Dense(DenseArgs {
                units: 5,
                activation: crate::compute::layers::Activation::Relu,
            }),
            Shape::from([8]),
        );
        assert!(leaf.validate());
        assert_eq!(leaf.output_shape(), Shape::from([5]));
        assert_eq!(leaf.layers()[0].layer_type(), LayerType::Dense);
    }

    #[test]
    fn test_check_consistency_reports_mismatch() {
        let limits = GenerationLimits::default();
        let mut rng = NasRng::new(8);
        let mut ctx = GenerationContext::new(&mut rng, &limits);
        let mut block = Block::generate(
            BlockKind::Fire(FireBlock),
            &Shape::from([10, 10, 3]),
            &mut ctx,
        )
        .unwrap();
        block.middle_blocks[0].input_shape = Shape::from([1, 2, 3]);
        assert!(matches!(
            block.check_consistency(),
            Err(NasError::ShapeMismatch { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_generation_never_invalid(seed in any::<u64>(), kind_index in 0usize..10) {
            let limits = GenerationLimits::default();
            let mut rng = NasRng::new(seed);
            let mut ctx = GenerationContext::new(&mut rng, &limits);
            let kind = kinds()[kind_index];
            if let Ok(block) = Block::generate(kind, &Shape::from([28, 28, 1]), &mut ctx) {
                prop_assert!(block.validate(), "{}", block);
            }
        }

        #[test]
        fn prop_mutation_keeps_shapes_threaded(seed in any::<u64>()) {
            let limits = GenerationLimits::default();
            let mut rng = NasRng::new(seed);
            let mut ctx = GenerationContext::new(&mut rng, &limits);
            let input = Shape::from([20, 20, 2]);
            if let Ok(mut block) = Block::generate(BlockKind::FeatureExtraction(FeatureExtractionBlock), &input, &mut ctx) {
                for _ in 0..10 {
                    block.mutate(&mut ctx);
                    prop_assert!(block.check_consistency().is_ok());
                }
            }
        }
    }
}
