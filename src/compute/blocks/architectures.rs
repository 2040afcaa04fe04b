//! Root templates of the supported network families.

use serde::{Deserialize, Serialize};

use crate::compute::error::NasError;
use crate::schema::{ArchitectureKind, Shape};

use super::{
    Block, BlockKind, BlockTemplate, ClassificationBlock, EffNetBlock, FeatureExtractionBlock,
    FireBlock, GenerationContext, ResidualBlock, SubBlockType, TwoDClassificationBlock,
    try_generate,
};

/// Root block of a whole network.
///
/// - `Classification`: a feature extraction block, up to three feature
///   extraction or residual blocks, and a classification head.
/// - `SqueezeNet`: up to three fire blocks and a pooled classification head.
/// - `EffNet`: one fixed EffNet block, one random EffNet block, and a pooled
///   classification head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureBlock {
    pub kind: ArchitectureKind,
    pub class_count: usize,
}

impl ArchitectureBlock {
    pub fn new(kind: ArchitectureKind, class_count: usize) -> Self {
        Self { kind, class_count }
    }

    fn head(&self) -> BlockKind {
        match self.kind {
            ArchitectureKind::Classification => BlockKind::Classification(ClassificationBlock {
                class_count: Some(self.class_count),
            }),
            ArchitectureKind::SqueezeNet | ArchitectureKind::EffNet => {
                BlockKind::TwoDClassification(TwoDClassificationBlock {
                    class_count: self.class_count,
                })
            }
        }
    }
}

impl BlockTemplate for ArchitectureBlock {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn max_sub_blocks(&self) -> usize {
        match self.kind {
            ArchitectureKind::Classification | ArchitectureKind::SqueezeNet => 3,
            ArchitectureKind::EffNet => 1,
        }
    }

    fn sub_block_types(&self) -> &'static [SubBlockType] {
        match self.kind {
            ArchitectureKind::Classification => {
                &[SubBlockType::FeatureExtraction, SubBlockType::Residual]
            }
            ArchitectureKind::SqueezeNet => &[SubBlockType::Fire],
            ArchitectureKind::EffNet => &[SubBlockType::EffNet],
        }
    }

    fn constrained_input(
        &self,
        input: &Shape,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<Block>, NasError> {
        let kind = match self.kind {
            ArchitectureKind::Classification => BlockKind::FeatureExtraction(FeatureExtractionBlock),
            ArchitectureKind::EffNet => BlockKind::EffNet(EffNetBlock),
            ArchitectureKind::SqueezeNet => return Ok(Vec::new()),
        };
        Ok(vec![Block::generate(kind, input, ctx)?])
    }

    fn constrained_output(
        &self,
        input: &Shape,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<Block>, NasError> {
        Ok(vec![Block::generate(self.head(), input, ctx)?])
    }

    fn random_sub_block(
        &self,
        input: &Shape,
        sub_type: SubBlockType,
        ctx: &mut GenerationContext<'_>,
    ) -> Vec<Block> {
        let kind = match sub_type {
            SubBlockType::FeatureExtraction => BlockKind::FeatureExtraction(FeatureExtractionBlock),
            SubBlockType::Residual => BlockKind::Residual(ResidualBlock),
            SubBlockType::Fire => BlockKind::Fire(FireBlock),
            SubBlockType::EffNet => BlockKind::EffNet(EffNetBlock),
            _ => return Vec::new(),
        };
        try_generate(kind, input, ctx)
    }

    fn validate(&self, block: &Block) -> bool {
        let head = std::mem::discriminant(&self.head());
        block
            .output_blocks
            .last()
            .is_some_and(|b| std::mem::discriminant(&b.kind) == head)
            && block.output_shape() == Shape::from([self.class_count])
    }
}
