//! Per-generation record of every individual, saved as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compute::architecture::BlockArchitecture;
use crate::compute::error::NasError;

use super::individual::Individual;

/// Snapshot of one individual within a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualSnapshot {
    pub id: u64,
    pub param_count: Option<u64>,
    pub accuracy: Option<f64>,
    pub fitness: Option<Vec<f64>>,
    /// `None` for boundary individuals (infinite distance).
    pub crowding_distance: Option<f64>,
    pub parents: Vec<u64>,
    /// Human-readable block tree.
    pub tree: String,
    pub architecture: BlockArchitecture,
}

impl From<&Individual> for IndividualSnapshot {
    fn from(ind: &Individual) -> Self {
        Self {
            id: ind.id,
            param_count: ind.architecture.param_count,
            accuracy: ind.architecture.accuracy,
            fitness: ind.fitness.values().map(<[f64]>::to_vec),
            crowding_distance: Some(ind.crowding_distance).filter(|d| d.is_finite()),
            parents: ind.parents.clone(),
            tree: ind.architecture.root.to_string(),
            architecture: ind.architecture.clone(),
        }
    }
}

/// Population of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub individuals: Vec<IndividualSnapshot>,
}

/// Every generation of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndividualRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comment: Option<String>,
    pub generations: Vec<GenerationRecord>,
}

impl IndividualRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot a population as the next generation.
    pub fn add_gen(&mut self, population: &[Individual]) {
        self.generations.push(GenerationRecord {
            generation: self.generations.len(),
            individuals: population.iter().map(IndividualSnapshot::from).collect(),
        });
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    /// Architectures of the last recorded generation, in population order.
    pub fn final_population(&self) -> Vec<BlockArchitecture> {
        self.generations
            .last()
            .map(|g| g.individuals.iter().map(|i| i.architecture.clone()).collect())
            .unwrap_or_default()
    }

    /// Where a run's record is stored.
    pub fn path_for(output_dir: &Path, test_name: &str) -> PathBuf {
        output_dir
            .join(test_name)
            .join(format!("{test_name}_individuals.json"))
    }

    /// Write the record under `output_dir/test_name`, returning the file path.
    pub fn save(
        &mut self,
        output_dir: &Path,
        test_name: &str,
        title: &str,
        comment: Option<&str>,
    ) -> Result<PathBuf, NasError> {
        self.title = title.to_string();
        self.comment = comment.map(str::to_string);

        let path = Self::path_for(output_dir, test_name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self, NasError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
