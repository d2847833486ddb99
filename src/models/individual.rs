use super::Gene;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Gene id to tick value, as handed to the fitness port.
pub type Assignment = HashMap<Uuid, u32>;

/// One candidate solution: an ordered genome plus a fitness score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Individual {
    pub(crate) fitness: Option<f64>,
    #[serde(rename = "GenePool")]
    pub(crate) genes: Vec<Gene>,
    pub(crate) generation: usize,
    #[serde(skip)]
    pub(crate) probability: f64,
}

impl Individual {
    pub fn new(genes: Vec<Gene>, generation: usize) -> Self {
        Self {
            fitness: None,
            genes,
            generation,
            probability: 0.0,
        }
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn genes_mut(&mut self) -> &mut [Gene] {
        &mut self.genes
    }

    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    /// Fitness, or 0.0 while the individual has not been evaluated.
    pub fn fitness_value(&self) -> f64 {
        self.fitness.unwrap_or_default()
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn set_generation(&mut self, generation: usize) {
        self.generation = generation;
    }

    pub fn tick_values(&self) -> Vec<u32> {
        self.genes.iter().map(Gene::tick_value).collect()
    }

    pub fn assignment(&self) -> Assignment {
        self.genes
            .iter()
            .map(|gene| (gene.id(), gene.tick_value()))
            .collect()
    }

    /// Hash over every gene id and value plus the fitness.
    pub fn structural_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for gene in &self.genes {
            gene.id().hash(&mut hasher);
            gene.tick_value().hash(&mut hasher);
        }
        self.fitness.map(f64::to_bits).hash(&mut hasher);
        hasher.finish()
    }

    /// Same genome length and the same gene identities at every index.
    pub fn is_compatible(&self, other: &Individual) -> bool {
        self.genes.len() == other.genes.len()
            && self
                .genes
                .iter()
                .zip(other.genes.iter())
                .all(|(lhs, rhs)| lhs.id() == rhs.id())
    }
}

#[cfg(test)]
pub(crate) mod test_utilities {
    use super::*;
    use crate::models::GeneSlot;

    /// Genes named `g0..gN`, ten ticks each, with fixed ids so that
    /// individuals built from the same length share gene identities.
    pub(crate) fn genome(values: &[u32]) -> Vec<Gene> {
        values
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                let id = Uuid::from_u128(index as u128 + 1);
                let mut gene = Gene::with_id(
                    id,
                    GeneSlot::slider(Uuid::from_u128(1000 + index as u128)),
                    &format!("g{index}"),
                    10,
                );
                gene.mutate_value(value).unwrap();
                gene
            })
            .collect()
    }

    pub(crate) fn individual(values: &[u32], fitness: Option<f64>) -> Individual {
        let mut individual = Individual::new(genome(values), 0);
        individual.fitness = fitness;
        individual
    }
}
