//! Configuration types for block architecture generation.

use serde::{Deserialize, Serialize};

use super::Shape;

/// Architecture template used to seed every individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArchitectureKind {
    /// Feature extraction block first, classification block last, random
    /// feature extraction / residual blocks in between.
    #[default]
    Classification,
    /// Only a classification head is fixed; the body is random fire blocks.
    SqueezeNet,
    /// EffNet block first, classification head last.
    EffNet,
}

impl ArchitectureKind {
    /// All supported architecture kinds.
    pub const ALL: [ArchitectureKind; 3] = [
        ArchitectureKind::Classification,
        ArchitectureKind::SqueezeNet,
        ArchitectureKind::EffNet,
    ];

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            ArchitectureKind::Classification => "ClassificationArchitecture",
            ArchitectureKind::SqueezeNet => "SqueezeNetArchitecture",
            ArchitectureKind::EffNet => "EffNetArchitecture",
        }
    }
}

/// Top-level architecture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    /// Which architecture template to generate.
    #[serde(default)]
    pub kind: ArchitectureKind,
    /// Input tensor shape (height, width, channels).
    #[serde(default = "default_input_shape")]
    pub input_shape: Shape,
    /// Number of output classes.
    #[serde(default = "default_class_count")]
    pub class_count: usize,
    /// Bounds on generation and mutation retries.
    #[serde(default)]
    pub limits: GenerationLimits,
}

impl Default for ArchitectureConfig {
    fn default() -> Self {
        Self {
            kind: ArchitectureKind::default(),
            input_shape: default_input_shape(),
            class_count: default_class_count(),
            limits: GenerationLimits::default(),
        }
    }
}

fn default_input_shape() -> Shape {
    Shape::from([28, 28, 1])
}
fn default_class_count() -> usize {
    10
}

/// Retry bounds for randomized generation and mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationLimits {
    /// Random sub-block attempts per block are capped at
    /// `max_sub_blocks * attempt_multiplier`.
    #[serde(default = "default_attempt_multiplier")]
    pub attempt_multiplier: usize,
    /// Whole-tree regeneration attempts when a generated tree fails validation.
    #[serde(default = "default_max_generation_attempts")]
    pub max_generation_attempts: usize,
    /// Attempts to find a mutation that leaves the tree valid.
    #[serde(default = "default_max_mutation_attempts")]
    pub max_mutation_attempts: usize,
    /// Probability that an architecture mutation adds or removes a middle
    /// block instead of mutating an existing one.
    #[serde(default = "default_structural_mutation_rate")]
    pub structural_mutation_rate: f64,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            attempt_multiplier: default_attempt_multiplier(),
            max_generation_attempts: default_max_generation_attempts(),
            max_mutation_attempts: default_max_mutation_attempts(),
            structural_mutation_rate: default_structural_mutation_rate(),
        }
    }
}

fn default_attempt_multiplier() -> usize {
    10
}
fn default_max_generation_attempts() -> usize {
    20
}
fn default_max_mutation_attempts() -> usize {
    10
}
fn default_structural_mutation_rate() -> f64 {
    0.2
}

impl ArchitectureConfig {
    /// Validate architecture parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_shape.as_image().is_none() || !self.input_shape.is_valid() {
            return Err(ConfigError::InvalidInputShape(self.input_shape.clone()));
        }
        if self.class_count == 0 {
            return Err(ConfigError::InvalidClassCount);
        }
        if self.limits.attempt_multiplier == 0
            || self.limits.max_generation_attempts == 0
            || self.limits.max_mutation_attempts == 0
        {
            return Err(ConfigError::InvalidLimits);
        }
        if !(0.0..=1.0).contains(&self.limits.structural_mutation_rate) {
            return Err(ConfigError::InvalidProbability {
                name: "structural_mutation_rate",
                value: self.limits.structural_mutation_rate,
            });
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Input shape {0} must be a non-zero (height, width, channels) triple")]
    InvalidInputShape(Shape),
    #[error("Class count must be non-zero")]
    InvalidClassCount,
    #[error("Generation and mutation attempt limits must be non-zero")]
    InvalidLimits,
    #[error("Probability {name} = {value} is outside [0, 1]")]
    InvalidProbability { name: &'static str, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_valid() {
        assert!(ArchitectureConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_flat_input() {
        let config = ArchitectureConfig {
            input_shape: Shape::from([784]),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidInputShape(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ArchitectureConfig =
            serde_json::from_str(r#"{"kind": "SqueezeNet", "class_count": 3}"#).unwrap();
        assert_eq!(config.kind, ArchitectureKind::SqueezeNet);
        assert_eq!(config.input_shape, Shape::from([28, 28, 1]));
        assert_eq!(config.limits.attempt_multiplier, 10);
    }
}
