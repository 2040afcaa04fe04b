//! Multi-objective ranking, selection and the Pareto hall of fame.

use std::cmp::Ordering;

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::individual::Individual;

/// Assign crowding distances across `individuals`.
///
/// For every objective the individuals are sorted by value; the extremes get
/// an infinite distance and inner points accumulate the normalized gap
/// between their neighbours. Unevaluated individuals get zero.
pub fn assign_crowding_distance(individuals: &mut [Individual]) {
    for ind in individuals.iter_mut() {
        ind.crowding_distance = 0.0;
    }

    let mut crowd: Vec<(usize, Vec<f64>)> = individuals
        .iter()
        .enumerate()
        .filter_map(|(i, ind)| ind.fitness.values().map(|v| (i, v.to_vec())))
        .collect();
    if crowd.is_empty() {
        return;
    }

    let objectives = crowd.iter().map(|(_, v)| v.len()).min().unwrap_or(0);
    let mut distances = vec![0.0f64; individuals.len()];

    for k in 0..objectives {
        crowd.sort_by(|a, b| a.1[k].partial_cmp(&b.1[k]).unwrap_or(Ordering::Equal));

        let (first, last) = (crowd[0].0, crowd[crowd.len() - 1].0);
        distances[first] = f64::INFINITY;
        distances[last] = f64::INFINITY;

        let span = crowd[crowd.len() - 1].1[k] - crowd[0].1[k];
        if span == 0.0 {
            continue;
        }
        let norm = objectives as f64 * span;
        for w in crowd.windows(3) {
            distances[w[1].0] += (w[2].1[k] - w[0].1[k]) / norm;
        }
    }

    for (ind, d) in individuals.iter_mut().zip(distances) {
        if ind.fitness.is_valid() {
            ind.crowding_distance = d;
        }
    }
}

/// Binary tournament on dominance, then crowding distance, then a coin flip.
fn tournament<R: Rng + ?Sized>(
    population: &[Individual],
    a: usize,
    b: usize,
    weights: &[f64],
    rng: &mut R,
) -> usize {
    let (x, y) = (&population[a], &population[b]);
    if x.fitness.dominates(&y.fitness, weights) {
        return a;
    }
    if y.fitness.dominates(&x.fitness, weights) {
        return b;
    }
    if x.crowding_distance < y.crowding_distance {
        return b;
    }
    if x.crowding_distance > y.crowding_distance {
        return a;
    }
    if rng.gen_bool(0.5) { a } else { b }
}

/// Dominance/crowding-distance tournament selection of `k` indices.
///
/// Contestants are paired off from successive random permutations of the
/// population, so every individual competes before any competes twice and
/// the same individual may be selected more than once. Works for any `k`
/// and population size.
pub fn select_tournament_dcd<R: Rng + ?Sized>(
    population: &[Individual],
    k: usize,
    weights: &[f64],
    rng: &mut R,
) -> Vec<usize> {
    let n = population.len();
    if n == 0 {
        return Vec::new();
    }

    let mut pool: Vec<usize> = Vec::with_capacity(n);
    let mut draw = |rng: &mut R| {
        if pool.is_empty() {
            pool.extend(0..n);
            pool.shuffle(rng);
        }
        pool.pop().unwrap_or(0)
    };

    (0..k)
        .map(|_| {
            let a = draw(rng);
            let b = draw(rng);
            tournament(population, a, b, weights, rng)
        })
        .collect()
}

/// Hall of fame holding every non-dominated individual seen so far.
///
/// An entry only leaves when a newcomer dominates it, so the front never
/// regresses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParetoFront {
    weights: Vec<f64>,
    members: Vec<Individual>,
}

impl ParetoFront {
    pub fn new(weights: Vec<f64>) -> Self {
        Self {
            weights,
            members: Vec::new(),
        }
    }

    /// Merge evaluated individuals into the front.
    pub fn update(&mut self, population: &[Individual]) {
        for ind in population.iter().filter(|i| i.fitness.is_valid()) {
            let weights = &self.weights;
            let dominated = self
                .members
                .iter()
                .any(|m| m.fitness.dominates(&ind.fitness, weights));
            let duplicate = self.members.iter().any(|m| {
                m.fitness == ind.fitness && m.architecture.root == ind.architecture.root
            });
            if dominated || duplicate {
                continue;
            }
            self.members
                .retain(|m| !ind.fitness.dominates(&m.fitness, weights));
            self.members.push(ind.clone());
        }
    }

    pub fn members(&self) -> &[Individual] {
        &self.members
    }

    pub fn iter(&self) -> impl Iterator<Item = &Individual> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member with the best weighted value on `objective`.
    pub fn best_by(&self, objective: usize) -> Option<&Individual> {
        let weight = self.weights.get(objective).copied().unwrap_or(1.0);
        self.members.iter().max_by(|a, b| {
            let score = |i: &Individual| {
                i.fitness
                    .values()
                    .and_then(|v| v.get(objective))
                    .map_or(f64::NEG_INFINITY, |x| x * weight)
            };
            score(a).partial_cmp(&score(b)).unwrap_or(Ordering::Equal)
        })
    }
}
