use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::mpsc::Sender;
use std::time::Duration;

use super::population::{Individual, Population};
use crate::engines::evaluation::Problem;
use crate::error::Result;
use crate::grammar::GrammarModel;
use crate::types::Fitness;

/// Fixed facts about a run, shared with every report.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    pub population_size: usize,
    pub max_depth: usize,
}

/// Snapshot handed to callbacks after each generation has been evaluated and ranked.
pub struct GenerationReport<'a> {
    pub generation: usize,
    pub population: &'a Population,
    pub best: &'a Individual,
    pub best_overall: f64,
    pub evaluations: usize,
    pub hall_of_fame_size: usize,
    pub elapsed: Duration,
    pub metadata: &'a RunMetadata,
    pub grammar: &'a GrammarModel,
    pub problem: &'a dyn Problem,
}

impl GenerationReport<'_> {
    pub fn best_fitness(&self) -> Option<&Fitness> {
        self.best.fitness()
    }
}

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, _generation: usize) {}

    fn on_generation_complete(&mut self, report: &GenerationReport<'_>) -> Result<()>;

    fn on_evolution_end(&mut self) -> Result<()> {
        Ok(())
    }
}

/// No-op callback for runs nobody watches.
impl ProgressCallback for () {
    fn on_generation_complete(&mut self, _report: &GenerationReport<'_>) -> Result<()> {
        Ok(())
    }
}

pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        log::debug!("Generation {} starting...", generation);
    }

    fn on_generation_complete(&mut self, report: &GenerationReport<'_>) -> Result<()> {
        log::info!(
            "Generation {} complete. Best fitness: {}, depth {}, nodes {}, evaluations {}, Hall of Fame size: {}",
            report.generation,
            report
                .best_fitness()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "-".to_string()),
            report.best.tree().distance_to_term(),
            report.best.tree().node_count(),
            report.evaluations,
            report.hall_of_fame_size
        );
        Ok(())
    }

    fn on_evolution_end(&mut self) -> Result<()> {
        log::info!("Evolution finished");
        Ok(())
    }
}

// For feeding progress to another thread
pub struct ChannelProgressCallback {
    sender: Sender<ProgressMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    GenerationStart(usize),
    GenerationComplete {
        generation: usize,
        best_fitness: f64,
        best_program: String,
        hall_of_fame_size: usize,
    },
    Finished,
}

impl ChannelProgressCallback {
    pub fn new(sender: Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart(generation));
    }

    fn on_generation_complete(&mut self, report: &GenerationReport<'_>) -> Result<()> {
        // A dropped receiver only means nobody is listening any more
        let _ = self.sender.send(ProgressMessage::GenerationComplete {
            generation: report.generation,
            best_fitness: report.best_overall,
            best_program: report.best.tree().to_text(report.grammar),
            hall_of_fame_size: report.hall_of_fame_size,
        });
        Ok(())
    }

    fn on_evolution_end(&mut self) -> Result<()> {
        let _ = self.sender.send(ProgressMessage::Finished);
        Ok(())
    }
}

/// Fans every event out to several callbacks in order.
#[derive(Default)]
pub struct CallbackList {
    callbacks: Vec<Box<dyn ProgressCallback>>,
}

impl CallbackList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<C: ProgressCallback + 'static>(mut self, callback: C) -> Self {
        self.callbacks.push(Box::new(callback));
        self
    }

    pub fn push(&mut self, callback: Box<dyn ProgressCallback>) {
        self.callbacks.push(callback);
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl ProgressCallback for CallbackList {
    fn on_generation_start(&mut self, generation: usize) {
        for callback in &mut self.callbacks {
            callback.on_generation_start(generation);
        }
    }

    fn on_generation_complete(&mut self, report: &GenerationReport<'_>) -> Result<()> {
        for callback in &mut self.callbacks {
            callback.on_generation_complete(report)?;
        }
        Ok(())
    }

    fn on_evolution_end(&mut self) -> Result<()> {
        for callback in &mut self.callbacks {
            callback.on_evolution_end()?;
        }
        Ok(())
    }
}
