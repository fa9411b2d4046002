pub mod evaluator;
pub mod problem;

pub use evaluator::{evaluate, Evaluator, ParallelEvaluator, SequentialEvaluator};
pub use problem::{MultiObjectiveProblem, Problem, SingleObjectiveProblem};
