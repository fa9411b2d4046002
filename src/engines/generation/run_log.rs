use csv::Writer;
use std::fs::File;
use std::path::Path;

use super::population::Individual;
use super::progress::{GenerationReport, ProgressCallback};
use crate::config::RunLogConfig;
use crate::error::Result;

/// Writes one CSV row per logged individual after every generation.
pub struct CsvRunLog {
    writer: Writer<File>,
    only_best_individual: bool,
    include_tree: bool,
}

impl CsvRunLog {
    pub fn create<P: AsRef<Path>>(
        path: P,
        only_best_individual: bool,
        include_tree: bool,
    ) -> Result<Self> {
        let mut writer = Writer::from_path(path)?;
        let mut header = vec![
            "fitness",
            "depth",
            "nodes",
            "generation",
            "execution_time",
            "seed",
        ];
        if include_tree {
            header.push("tree");
        }
        writer.write_record(&header)?;
        Ok(Self {
            writer,
            only_best_individual,
            include_tree,
        })
    }

    /// The configured log, or `None` when no path is set.
    pub fn from_config(config: &RunLogConfig) -> Result<Option<Self>> {
        config
            .path
            .as_ref()
            .map(|path| Self::create(path, config.only_best_individual, config.include_tree))
            .transpose()
    }

    fn write_individual(&mut self, report: &GenerationReport<'_>, individual: &Individual) -> Result<()> {
        let tree = individual.tree();
        let mut row = vec![
            individual
                .fitness()
                .map(|f| f.to_string())
                .unwrap_or_default(),
            tree.distance_to_term().to_string(),
            tree.node_count().to_string(),
            report.generation.to_string(),
            format!("{:.6}", report.elapsed.as_secs_f64()),
            report.metadata.seed.to_string(),
        ];
        if self.include_tree {
            row.push(tree.to_text(report.grammar));
        }
        self.writer.write_record(&row)?;
        Ok(())
    }
}

impl ProgressCallback for CsvRunLog {
    fn on_generation_complete(&mut self, report: &GenerationReport<'_>) -> Result<()> {
        if self.only_best_individual {
            self.write_individual(report, report.best)?;
        } else {
            for individual in report.population.iter() {
                self.write_individual(report, individual)?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    fn on_evolution_end(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
