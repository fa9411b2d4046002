pub mod traits;
pub mod evolution;
pub mod budget;
pub mod run_log;
pub mod manager;

pub use manager::{ConfigManager, RunConfig, ENV_PREFIX};
pub use evolution::EvolutionConfig;
pub use budget::BudgetConfig;
pub use run_log::RunLogConfig;
pub use traits::{ConfigManifest, ConfigSection, FieldManifest};
