use super::{
    budget::BudgetConfig, evolution::EvolutionConfig, run_log::RunLogConfig,
    traits::ConfigSection,
};
use crate::error::SynthgpError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Prefix of environment overrides, e.g. `SYNTHGP_EVOLUTION__POPULATION_SIZE=50`.
pub const ENV_PREFIX: &str = "SYNTHGP";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub evolution: EvolutionConfig,
    pub budget: BudgetConfig,
    pub run_log: RunLogConfig,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), SynthgpError> {
        self.evolution.validate()?;
        self.budget.validate()?;
        self.run_log.validate()?;
        Ok(())
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<RunConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(RunConfig::default())),
        }
    }

    /// Loads a TOML or JSON file (by extension) with environment overrides on top.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SynthgpError> {
        let path = path.as_ref();
        let config: RunConfig = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        log::info!("Loaded configuration from {}", path.display());

        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SynthgpError> {
        let toml_str = toml::to_string_pretty(&self.get())?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn get(&self) -> RunConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `f` to a copy and stores it only if the result validates.
    pub fn update<F>(&self, f: F) -> Result<(), SynthgpError>
    where
        F: FnOnce(&mut RunConfig),
    {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = config.clone();
        f(&mut updated);
        updated.validate()?;
        *config = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rejects_invalid_changes() {
        let manager = ConfigManager::new();
        let err = manager.update(|c| c.evolution.population_size = 0);
        assert!(err.is_err());
        assert_eq!(manager.get(), RunConfig::default());

        manager
            .update(|c| c.evolution.population_size = 64)
            .unwrap();
        assert_eq!(manager.get().evolution.population_size, 64);
    }
}
