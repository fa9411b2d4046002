use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::SynthgpError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Stop conditions. The run ends when any configured limit is hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub max_generations: Option<usize>,
    pub time_limit_secs: Option<f64>,
    pub max_evaluations: Option<usize>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_generations: Some(100),
            time_limit_secs: None,
            max_evaluations: None,
        }
    }
}

impl ConfigSection for BudgetConfig {
    fn section_name() -> &'static str {
        "budget"
    }

    fn validate(&self) -> Result<(), SynthgpError> {
        if self.max_generations.is_none()
            && self.time_limit_secs.is_none()
            && self.max_evaluations.is_none()
        {
            return Err(SynthgpError::Configuration(
                "At least one of max_generations, time_limit_secs or max_evaluations must be set"
                    .to_string(),
            ));
        }
        if let Some(secs) = self.time_limit_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(SynthgpError::Configuration(format!(
                    "Time limit must be a positive number of seconds, got {}",
                    secs
                )));
            }
            Duration::try_from_secs_f64(secs).map_err(|e| {
                SynthgpError::Configuration(format!("Time limit of {} seconds: {}", secs, e))
            })?;
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Budget".to_string(),
            fields: vec![
                FieldManifest::new(
                    "max_generations",
                    "integer",
                    json!(self.max_generations),
                    "Generations after the initial population",
                )
                .range(Some(0.0), None),
                FieldManifest::new(
                    "time_limit_secs",
                    "float",
                    json!(self.time_limit_secs),
                    "Wall-clock limit in seconds",
                )
                .range(Some(0.0), None),
                FieldManifest::new(
                    "max_evaluations",
                    "integer",
                    json!(self.max_evaluations),
                    "Fitness function calls",
                )
                .range(Some(0.0), None),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_a_stop_condition() {
        let config = BudgetConfig {
            max_generations: None,
            time_limit_secs: None,
            max_evaluations: None,
        };
        assert!(config.validate().is_err());
        assert!(BudgetConfig::default().validate().is_ok());
    }

    #[test]
    fn test_time_limit_must_be_positive_and_representable() {
        for secs in [0.0, -1.0, f64::INFINITY, f64::NAN, 1e300] {
            let config = BudgetConfig {
                time_limit_secs: Some(secs),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{} accepted", secs);
        }
    }
}
