pub mod config;
pub mod engines;
pub mod error;
pub mod grammar;
pub mod types;

pub use engines::evaluation::{
    Evaluator, MultiObjectiveProblem, ParallelEvaluator, Problem, SequentialEvaluator,
    SingleObjectiveProblem,
};
pub use engines::generation::{EvolutionEngine, Individual, SearchResult, Tree};
pub use error::{Result, SynthgpError};
pub use grammar::{GrammarModel, GrammarRegistry, Slot};
pub use types::{Fitness, Value};
