use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::tree::Tree;
use crate::engines::evaluation::Problem;
use crate::types::Fitness;

/// A candidate program. Fitness is filled in at most once per tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    tree: Tree,
    fitness: Option<Fitness>,
}

impl Individual {
    pub fn new(tree: Tree) -> Self {
        Self {
            tree,
            fitness: None,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    pub fn fitness(&self) -> Option<&Fitness> {
        self.fitness.as_ref()
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    pub(crate) fn set_fitness(&mut self, fitness: Fitness) {
        self.fitness = Some(fitness);
    }

    pub fn overall_fitness(&self, problem: &dyn Problem) -> Option<f64> {
        self.fitness.as_ref().map(|f| problem.overall_fitness(f))
    }

    /// Overall fitness as a ranking key. Unevaluated and NaN rank last.
    pub(crate) fn rank_key(&self, problem: &dyn Problem) -> f64 {
        match self.overall_fitness(problem) {
            Some(v) if !v.is_nan() => v,
            _ => f64::NEG_INFINITY,
        }
    }
}

/// Ordering where better individuals come first.
pub(crate) fn compare_individuals(
    a: &Individual,
    b: &Individual,
    problem: &dyn Problem,
    favor_less_deep: bool,
) -> Ordering {
    let by_fitness = b.rank_key(problem).total_cmp(&a.rank_key(problem));
    if by_fitness == Ordering::Equal && favor_less_deep {
        a.tree.distance_to_term().cmp(&b.tree.distance_to_term())
    } else {
        by_fitness
    }
}

#[derive(Debug, Clone, Default)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    pub fn new(individuals: Vec<Individual>) -> Self {
        Self { individuals }
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Individual> {
        self.individuals.iter()
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub(crate) fn individuals_mut(&mut self) -> &mut [Individual] {
        &mut self.individuals
    }

    pub fn into_individuals(self) -> Vec<Individual> {
        self.individuals
    }

    /// Sorts best first. The sort is stable so equal individuals keep their order.
    pub fn sort_by_fitness(&mut self, problem: &dyn Problem, favor_less_deep: bool) {
        self.individuals
            .sort_by(|a, b| compare_individuals(a, b, problem, favor_less_deep));
    }

    /// Best individual by overall fitness, first one on ties.
    pub fn best(&self, problem: &dyn Problem) -> Option<&Individual> {
        self.individuals.iter().reduce(|best, candidate| {
            if candidate.rank_key(problem) > best.rank_key(problem) {
                candidate
            } else {
                best
            }
        })
    }
}
