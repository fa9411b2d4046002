use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::SynthgpError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLogConfig {
    /// CSV file to write; no log when unset.
    pub path: Option<PathBuf>,
    pub only_best_individual: bool,
    pub include_tree: bool,
}

impl Default for RunLogConfig {
    fn default() -> Self {
        Self {
            path: None,
            only_best_individual: true,
            include_tree: false,
        }
    }
}

impl ConfigSection for RunLogConfig {
    fn section_name() -> &'static str {
        "run_log"
    }

    fn validate(&self) -> Result<(), SynthgpError> {
        if self
            .path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(SynthgpError::Configuration(
                "Run log path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Run log".to_string(),
            fields: vec![
                FieldManifest::new("path", "path", json!(self.path), "CSV output file"),
                FieldManifest::new(
                    "only_best_individual",
                    "boolean",
                    json!(self.only_best_individual),
                    "Log only the best program of each generation",
                ),
                FieldManifest::new(
                    "include_tree",
                    "boolean",
                    json!(self.include_tree),
                    "Add the program text as a column",
                ),
            ],
        }
    }
}
