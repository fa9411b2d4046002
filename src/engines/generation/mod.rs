pub mod tree;
pub mod synthesizer;
pub mod text;
pub mod operators;
pub mod population;
pub mod selection;
pub mod budget;
pub mod hall_of_fame;
pub mod initializer;
pub mod progress;
pub mod run_log;
pub mod evolution_engine;

pub use tree::{Child, Node, NodeId, Tree};
pub use synthesizer::{synthesize, Synthesizer};
pub use text::{parse_tree, TreeText};
pub use operators::{crossover, mutate};
pub use population::{Individual, Population};
pub use selection::{elitism, novelty, tournament};
pub use budget::{Budget, BudgetState, StopReason};
pub use hall_of_fame::{Elite, HallOfFame};
pub use initializer::{
    PopulationInitializer, ProviderInitializer, RandomInitializer, SynthesisProvider,
    TextProvider,
};
pub use progress::{
    CallbackList, ChannelProgressCallback, ConsoleProgressCallback, GenerationReport,
    ProgressCallback, ProgressMessage, RunMetadata,
};
pub use run_log::CsvRunLog;
pub use evolution_engine::{EngineState, EvolutionEngine, SearchResult};
