use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::BudgetConfig;
use crate::engines::evaluation::Problem;
use crate::types::Fitness;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    TargetReached,
    MaxGenerations,
    TimeLimit,
    MaxEvaluations,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::TargetReached => "target fitness reached",
            StopReason::MaxGenerations => "generation limit reached",
            StopReason::TimeLimit => "time limit reached",
            StopReason::MaxEvaluations => "evaluation limit reached",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetState {
    Running,
    Done(StopReason),
}

/// Tracks generations, wall-clock time, evaluations and the best fitness
/// seen, and decides when a run is over.
#[derive(Debug, Clone)]
pub struct Budget {
    max_generations: Option<usize>,
    time_limit: Option<Duration>,
    max_evaluations: Option<usize>,
    start: Instant,
    generation: usize,
    evaluations: usize,
    best: Option<(Fitness, f64)>,
}

impl Budget {
    pub fn new(config: &BudgetConfig) -> Self {
        Self {
            max_generations: config.max_generations,
            // limits beyond what Duration holds never expire
            time_limit: config
                .time_limit_secs
                .map(|secs| Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)),
            max_evaluations: config.max_evaluations,
            start: Instant::now(),
            generation: 0,
            evaluations: 0,
            best: None,
        }
    }

    pub fn generations(max_generations: usize) -> Self {
        Self::new(&BudgetConfig {
            max_generations: Some(max_generations),
            time_limit_secs: None,
            max_evaluations: None,
        })
    }

    /// Completed generations; the initial population is generation 0.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn best_fitness(&self) -> Option<&Fitness> {
        self.best.as_ref().map(|(f, _)| f)
    }

    /// Records the state after evaluating a population without counting a generation.
    pub fn observe(&mut self, problem: &dyn Problem, best: &Fitness, evaluations: usize) {
        self.evaluations = evaluations;
        let overall = problem.overall_fitness(best);
        let improved = match &self.best {
            None => true,
            Some((_, current)) => overall > *current || current.is_nan(),
        };
        if improved {
            self.best = Some((best.clone(), overall));
        }
    }

    pub fn record_generation(&mut self, problem: &dyn Problem, best: &Fitness, evaluations: usize) {
        self.generation += 1;
        self.observe(problem, best, evaluations);
    }

    pub fn state(&self, problem: &dyn Problem) -> BudgetState {
        if self
            .best_fitness()
            .is_some_and(|best| problem.solved(best))
        {
            return BudgetState::Done(StopReason::TargetReached);
        }
        if self.max_generations.is_some_and(|max| self.generation >= max) {
            return BudgetState::Done(StopReason::MaxGenerations);
        }
        if self.time_limit.is_some_and(|limit| self.elapsed() >= limit) {
            return BudgetState::Done(StopReason::TimeLimit);
        }
        if self.max_evaluations.is_some_and(|max| self.evaluations >= max) {
            return BudgetState::Done(StopReason::MaxEvaluations);
        }
        BudgetState::Running
    }

    pub fn is_done(&self, problem: &dyn Problem) -> bool {
        self.state(problem) != BudgetState::Running
    }
}
