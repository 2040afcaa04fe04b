//! Whole-network block trees and the genetic operators acting on them.

use std::fmt;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::schema::{ArchitectureConfig, ArchitectureKind, GenerationLimits, Shape};

use super::blocks::{
    ArchitectureBlock, Block, BlockId, BlockKind, GenerationContext, ParameterCounter,
};
use super::error::NasError;
use super::rng::NasRng;

/// Root of a network's block tree plus the metrics measured for it.
///
/// `param_count` and `accuracy` are unknown until evaluation and are cleared
/// whenever the tree changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockArchitecture {
    pub root: Block,
    pub class_count: usize,
    #[serde(default)]
    pub param_count: Option<u64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl BlockArchitecture {
    /// Generate a valid tree for `config`.
    ///
    /// Whole trees are regenerated up to `max_generation_attempts` times when
    /// generation fails or the result does not validate.
    pub fn generate(config: &ArchitectureConfig, rng: &mut NasRng) -> Result<Self, NasError> {
        let template = ArchitectureBlock::new(config.kind, config.class_count);
        let attempts = config.limits.max_generation_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let mut ctx = GenerationContext::new(rng, &config.limits);
            match Block::generate(
                BlockKind::Architecture(template),
                &config.input_shape,
                &mut ctx,
            ) {
                Ok(root) if root.validate() => {
                    return Ok(Self {
                        root,
                        class_count: config.class_count,
                        param_count: None,
                        accuracy: None,
                    });
                }
                Ok(_) => debug!("{} attempt {attempt} failed validation", config.kind.name()),
                Err(err) => {
                    debug!("{} attempt {attempt} failed: {err}", config.kind.name());
                    last_error = Some(err);
                }
            }
        }

        Err(match last_error {
            Some(err @ NasError::UnsupportedInput { .. }) => err,
            _ => NasError::ValidationFailure {
                architecture: config.kind.name(),
                attempts,
            },
        })
    }

    /// Network family, if the root is an architecture block.
    pub fn kind(&self) -> Option<ArchitectureKind> {
        match self.root.kind {
            BlockKind::Architecture(a) => Some(a.kind),
            _ => None,
        }
    }

    pub fn input_shape(&self) -> &Shape {
        &self.root.input_shape
    }

    pub fn output_shape(&self) -> Shape {
        self.root.output_shape()
    }

    pub fn validate(&self) -> bool {
        self.root.validate() && self.output_shape() == Shape::from([self.class_count])
    }

    /// Trainable parameters computed from the tree itself.
    pub fn parameter_count(&self) -> u64 {
        ParameterCounter::count(&self.root)
    }

    pub fn find(&self, id: BlockId) -> Option<&Block> {
        self.root.find(id)
    }

    /// Parent of block `id`, resolved through the tree.
    pub fn parent_of(&self, id: BlockId) -> Option<&Block> {
        self.find(id)?.parent.and_then(|p| self.find(p))
    }

    /// Record evaluated metrics.
    pub fn set_metrics(&mut self, param_count: u64, accuracy: f64) {
        self.param_count = Some(param_count);
        self.accuracy = Some(accuracy);
    }

    pub fn clear_metrics(&mut self) {
        self.param_count = None;
        self.accuracy = None;
    }

    /// Mutate the tree.
    ///
    /// With probability `structural_mutation_rate` a middle sub-block is added
    /// or removed; otherwise one sub-block is mutated recursively. Results that
    /// fail validation are discarded and retried up to
    /// `max_mutation_attempts` times. Returns whether the tree changed.
    pub fn mutate(&mut self, limits: &GenerationLimits, rng: &mut NasRng) -> bool {
        for _ in 0..limits.max_mutation_attempts {
            let mut candidate = self.root.clone();
            let mut ctx = GenerationContext::new(rng, limits);

            let changed = if ctx.rng().chance(limits.structural_mutation_rate) {
                if ctx.rng().gen_bool(0.5) {
                    candidate.add_random_middle(&mut ctx)
                        || candidate.remove_random_middle(&mut ctx)
                } else {
                    candidate.remove_random_middle(&mut ctx)
                        || candidate.add_random_middle(&mut ctx)
                }
            } else {
                candidate.mutate(&mut ctx)
            };
            if !changed {
                continue;
            }

            if self.commit(candidate) {
                return true;
            }
        }
        false
    }

    /// Re-thread shapes and renumber `candidate`, adopting it if it is valid
    /// and differs from the current tree.
    fn commit(&mut self, mut candidate: Block) -> bool {
        candidate.propagate(self.root.input_shape.clone());
        candidate.reindex();
        let trial = Self {
            root: candidate,
            class_count: self.class_count,
            param_count: None,
            accuracy: None,
        };
        if trial.root == self.root || !trial.validate() {
            return false;
        }
        *self = trial;
        true
    }

    /// One-point crossover of the middle sections of two trees of the same
    /// family.
    ///
    /// Each parent is cut at a random point and the tails are exchanged;
    /// sections are truncated to the family's bound. Offspring that fail
    /// validation leave both parents untouched. Returns whether both were
    /// replaced.
    pub fn crossover(
        a: &mut Self,
        b: &mut Self,
        limits: &GenerationLimits,
        rng: &mut NasRng,
    ) -> bool {
        if a.root.kind != b.root.kind || a.input_shape() != b.input_shape() {
            return false;
        }
        let max = a.root.kind.max_sub_blocks();
        if a.root.middle_blocks.is_empty() && b.root.middle_blocks.is_empty() {
            return false;
        }

        for _ in 0..limits.max_mutation_attempts.max(1) {
            let cut_a = rng.gen_range(0..=a.root.middle_blocks.len());
            let cut_b = rng.gen_range(0..=b.root.middle_blocks.len());

            let (head_a, tail_a) = a.root.middle_blocks.split_at(cut_a);
            let (head_b, tail_b) = b.root.middle_blocks.split_at(cut_b);
            let mut child_a = a.root.clone();
            let mut child_b = b.root.clone();
            child_a.middle_blocks = splice(head_a, tail_b, max);
            child_b.middle_blocks = splice(head_b, tail_a, max);

            let mut next_a = a.clone();
            let mut next_b = b.clone();
            if next_a.commit(child_a) && next_b.commit(child_b) {
                *a = next_a;
                *b = next_b;
                return true;
            }
        }
        false
    }

    /// Compact JSON of the whole tree.
    pub fn to_json(&self) -> Result<String, NasError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Indented JSON of the whole tree.
    pub fn to_json_pretty(&self) -> Result<String, NasError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rebuild a tree from [`to_json`](Self::to_json) output, verifying ids,
    /// parent links and the shape chain.
    pub fn from_json(json: &str) -> Result<Self, NasError> {
        let arch: Self = serde_json::from_str(json)?;
        arch.root.check_consistency()?;
        if !matches!(arch.root.kind, BlockKind::Architecture(_)) {
            return Err(NasError::CorruptTree {
                block: arch.root.id,
                reason: format!("root is a {}", arch.root.name()),
            });
        }
        if !arch.validate() {
            return Err(NasError::CorruptTree {
                block: arch.root.id,
                reason: "tree fails validation".to_string(),
            });
        }
        Ok(arch)
    }
}

fn splice(head: &[Block], tail: &[Block], max: usize) -> Vec<Block> {
    head.iter().chain(tail).take(max).cloned().collect()
}

impl fmt::Display for BlockArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.param_count, self.accuracy) {
            (Some(p), Some(a)) => writeln!(f, "params: {p}, accuracy: {a:.2}%")?,
            _ => writeln!(f, "params: unknown, accuracy: unknown")?,
        }
        write!(f, "{}", self.root)
    }
}
