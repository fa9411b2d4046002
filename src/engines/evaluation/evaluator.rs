use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::problem::Problem;
use crate::engines::generation::population::Individual;
use crate::error::Result;
use crate::types::Fitness;

/// Computes fitness for the unevaluated members of a batch.
pub trait Evaluator: Send + Sync {
    fn evaluate_all(&self, problem: &dyn Problem, individuals: &mut [Individual]) -> Result<()>;

    /// Fitness function calls made so far. Cached fitness is never recomputed.
    fn number_of_evaluations(&self) -> usize;
}

/// Fitness of one individual, computing and caching it if absent.
pub fn evaluate(problem: &dyn Problem, individual: &mut Individual) -> Result<Fitness> {
    if let Some(fitness) = individual.fitness() {
        return Ok(fitness.clone());
    }
    let fitness = problem.evaluate(individual.tree())?;
    individual.set_fitness(fitness.clone());
    Ok(fitness)
}

#[derive(Debug, Default)]
pub struct SequentialEvaluator {
    evaluations: AtomicUsize,
}

impl SequentialEvaluator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Evaluator for SequentialEvaluator {
    fn evaluate_all(&self, problem: &dyn Problem, individuals: &mut [Individual]) -> Result<()> {
        for individual in individuals.iter_mut().filter(|i| !i.is_evaluated()) {
            evaluate(problem, individual)?;
            self.evaluations.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn number_of_evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }
}

/// Evaluates a batch across the rayon thread pool.
///
/// The fitness function must be safe to call concurrently. The first
/// failure aborts the batch.
#[derive(Debug, Default)]
pub struct ParallelEvaluator {
    evaluations: AtomicUsize,
}

impl ParallelEvaluator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Evaluator for ParallelEvaluator {
    fn evaluate_all(&self, problem: &dyn Problem, individuals: &mut [Individual]) -> Result<()> {
        individuals
            .par_iter_mut()
            .filter(|i| !i.is_evaluated())
            .try_for_each(|individual| {
                evaluate(problem, individual)?;
                self.evaluations.fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
    }

    fn number_of_evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }
}
