use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::SynthgpError;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub max_depth: usize,
    pub n_elites: usize,
    pub n_novelties: usize,
    pub tournament_size: usize,
    pub p_crossover: f64,
    pub p_mutation: f64,
    /// Mutants drawn per mutation; the fittest is kept. 0 or 1 is plain mutation.
    pub hill_climbing_candidates: usize,
    /// Break fitness ties in favour of shallower trees.
    pub favor_less_deep_trees: bool,
    pub parallel_evaluation: bool,
    pub hall_of_fame_size: usize,
    pub seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 200,
            max_depth: 15,
            n_elites: 5,
            n_novelties: 10,
            tournament_size: 5,
            p_crossover: 0.9,
            p_mutation: 0.01,
            hill_climbing_candidates: 0,
            favor_less_deep_trees: false,
            parallel_evaluation: false,
            hall_of_fame_size: 10,
            seed: Some(123),
        }
    }
}

fn check_probability(name: &str, p: f64) -> Result<(), SynthgpError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(SynthgpError::Configuration(format!(
            "{} must be between 0 and 1, got {}",
            name, p
        )));
    }
    Ok(())
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), SynthgpError> {
        if self.population_size < 1 {
            return Err(SynthgpError::Configuration(
                "Population size must be at least 1".to_string(),
            ));
        }
        if self.max_depth < 1 {
            return Err(SynthgpError::Configuration(
                "Max depth must be at least 1".to_string(),
            ));
        }
        if self.tournament_size < 1 {
            return Err(SynthgpError::Configuration(
                "Tournament size must be at least 1".to_string(),
            ));
        }
        if self.n_elites + self.n_novelties > self.population_size {
            return Err(SynthgpError::Configuration(format!(
                "Elites ({}) plus novelties ({}) exceed the population size ({})",
                self.n_elites, self.n_novelties, self.population_size
            )));
        }
        check_probability("Crossover probability", self.p_crossover)?;
        check_probability("Mutation probability", self.p_mutation)?;
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Evolution".to_string(),
            fields: vec![
                FieldManifest::new(
                    "population_size",
                    "integer",
                    json!(self.population_size),
                    "Number of programs per generation",
                )
                .range(Some(1.0), None),
                FieldManifest::new(
                    "max_depth",
                    "integer",
                    json!(self.max_depth),
                    "Maximum distance from a tree's root to its deepest leaf",
                )
                .range(Some(1.0), None),
                FieldManifest::new(
                    "n_elites",
                    "integer",
                    json!(self.n_elites),
                    "Best programs copied unchanged into the next generation",
                )
                .range(Some(0.0), None),
                FieldManifest::new(
                    "n_novelties",
                    "integer",
                    json!(self.n_novelties),
                    "Fresh random programs injected each generation",
                )
                .range(Some(0.0), None),
                FieldManifest::new(
                    "tournament_size",
                    "integer",
                    json!(self.tournament_size),
                    "Programs compared per parent selection",
                )
                .range(Some(1.0), None),
                FieldManifest::new(
                    "p_crossover",
                    "float",
                    json!(self.p_crossover),
                    "Chance that a parent pair is recombined",
                )
                .range(Some(0.0), Some(1.0)),
                FieldManifest::new(
                    "p_mutation",
                    "float",
                    json!(self.p_mutation),
                    "Chance that an offspring is mutated",
                )
                .range(Some(0.0), Some(1.0)),
                FieldManifest::new(
                    "hill_climbing_candidates",
                    "integer",
                    json!(self.hill_climbing_candidates),
                    "Mutants evaluated per mutation, keeping the fittest",
                )
                .range(Some(0.0), None),
                FieldManifest::new(
                    "favor_less_deep_trees",
                    "boolean",
                    json!(self.favor_less_deep_trees),
                    "Prefer shallower trees between equally fit programs",
                ),
                FieldManifest::new(
                    "parallel_evaluation",
                    "boolean",
                    json!(self.parallel_evaluation),
                    "Evaluate each generation on the rayon thread pool",
                ),
                FieldManifest::new(
                    "hall_of_fame_size",
                    "integer",
                    json!(self.hall_of_fame_size),
                    "Distinct best programs remembered across the run",
                )
                .range(Some(0.0), None),
                FieldManifest::new(
                    "seed",
                    "integer",
                    json!(self.seed),
                    "Random seed; unset draws one from the OS",
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EvolutionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = [
            EvolutionConfig {
                population_size: 0,
                n_elites: 0,
                n_novelties: 0,
                ..Default::default()
            },
            EvolutionConfig {
                p_mutation: 1.5,
                ..Default::default()
            },
            EvolutionConfig {
                p_crossover: -0.1,
                ..Default::default()
            },
            EvolutionConfig {
                tournament_size: 0,
                ..Default::default()
            },
            EvolutionConfig {
                population_size: 10,
                n_elites: 6,
                n_novelties: 5,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(SynthgpError::Configuration(_))));
        }
    }

    #[test]
    fn test_manifest_reflects_current_values() {
        let config = EvolutionConfig {
            population_size: 42,
            ..Default::default()
        };
        let manifest = config.to_manifest();
        let field = manifest.field("population_size").unwrap();
        assert_eq!(field.default, json!(42));
        assert_eq!(field.min, Some(1.0));
        assert!(manifest.field("seed").is_some());
    }
}
