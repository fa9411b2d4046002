use crate::engines::generation::tree::Tree;
use crate::error::{Result, SynthgpError};
use crate::types::Fitness;

pub type FitnessFn<T> = Box<dyn Fn(&Tree) -> anyhow::Result<T> + Send + Sync>;
pub type Combiner = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// What is being optimised: the fitness function plus its objective sense.
///
/// Internally larger overall fitness is always better; objectives flagged in
/// [`Problem::minimize`] are negated when combined.
pub trait Problem: Send + Sync {
    fn evaluate(&self, tree: &Tree) -> Result<Fitness>;

    /// Per-objective minimisation flags.
    fn minimize(&self) -> &[bool];

    /// Single ranking scalar: the signed sum of the objectives.
    fn overall_fitness(&self, fitness: &Fitness) -> f64 {
        signed_sum(fitness.values(), self.minimize())
    }

    /// Whether `best` satisfies the configured target. Never true without one.
    fn solved(&self, _best: &Fitness) -> bool {
        false
    }
}

fn signed_sum(values: &[f64], minimize: &[bool]) -> f64 {
    values
        .iter()
        .zip(minimize)
        .map(|(v, min)| if *min { -v } else { *v })
        .sum()
}

pub struct SingleObjectiveProblem {
    minimize: bool,
    fitness_fn: FitnessFn<f64>,
    target_fitness: Option<f64>,
}

impl SingleObjectiveProblem {
    pub fn new<F>(minimize: bool, fitness_fn: F) -> Self
    where
        F: Fn(&Tree) -> f64 + Send + Sync + 'static,
    {
        Self::fallible(minimize, move |tree| Ok(fitness_fn(tree)))
    }

    /// Fitness functions that can fail; their errors abort the run.
    pub fn fallible<F>(minimize: bool, fitness_fn: F) -> Self
    where
        F: Fn(&Tree) -> anyhow::Result<f64> + Send + Sync + 'static,
    {
        Self {
            minimize,
            fitness_fn: Box::new(fitness_fn),
            target_fitness: None,
        }
    }

    pub fn with_target(mut self, target: f64) -> Self {
        self.target_fitness = Some(target);
        self
    }

    pub fn target_fitness(&self) -> Option<f64> {
        self.target_fitness
    }
}

impl Problem for SingleObjectiveProblem {
    fn evaluate(&self, tree: &Tree) -> Result<Fitness> {
        (self.fitness_fn)(tree)
            .map(Fitness::Single)
            .map_err(SynthgpError::evaluation)
    }

    fn minimize(&self) -> &[bool] {
        std::slice::from_ref(&self.minimize)
    }

    fn solved(&self, best: &Fitness) -> bool {
        match (self.target_fitness, best.as_single()) {
            (Some(target), Some(best)) if self.minimize => best <= target,
            (Some(target), Some(best)) => best >= target,
            _ => false,
        }
    }
}

pub struct MultiObjectiveProblem {
    minimize: Vec<bool>,
    fitness_fn: FitnessFn<Vec<f64>>,
    combiner: Option<Combiner>,
    target_overall: Option<f64>,
}

impl MultiObjectiveProblem {
    pub fn new<F>(minimize: Vec<bool>, fitness_fn: F) -> Self
    where
        F: Fn(&Tree) -> Vec<f64> + Send + Sync + 'static,
    {
        Self::fallible(minimize, move |tree| Ok(fitness_fn(tree)))
    }

    pub fn fallible<F>(minimize: Vec<bool>, fitness_fn: F) -> Self
    where
        F: Fn(&Tree) -> anyhow::Result<Vec<f64>> + Send + Sync + 'static,
    {
        Self {
            minimize,
            fitness_fn: Box::new(fitness_fn),
            combiner: None,
            target_overall: None,
        }
    }

    /// Replaces the signed sum with a custom combination of raw objective values.
    pub fn with_combiner<C>(mut self, combiner: C) -> Self
    where
        C: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        self.combiner = Some(Box::new(combiner));
        self
    }

    /// Stop once the overall fitness reaches `target`.
    pub fn with_target(mut self, target: f64) -> Self {
        self.target_overall = Some(target);
        self
    }

    pub fn number_of_objectives(&self) -> usize {
        self.minimize.len()
    }
}

impl Problem for MultiObjectiveProblem {
    fn evaluate(&self, tree: &Tree) -> Result<Fitness> {
        let values = (self.fitness_fn)(tree).map_err(SynthgpError::evaluation)?;
        if values.len() != self.minimize.len() {
            return Err(SynthgpError::FitnessShape {
                expected: self.minimize.len(),
                actual: values.len(),
            });
        }
        Ok(Fitness::Multi(values))
    }

    fn minimize(&self) -> &[bool] {
        &self.minimize
    }

    fn overall_fitness(&self, fitness: &Fitness) -> f64 {
        match &self.combiner {
            Some(combine) => combine(fitness.values()),
            None => signed_sum(fitness.values(), &self.minimize),
        }
    }

    fn solved(&self, best: &Fitness) -> bool {
        self.target_overall
            .is_some_and(|target| self.overall_fitness(best) >= target)
    }
}
