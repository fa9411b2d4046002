use std::collections::HashSet;

use super::tree::Tree;
use crate::grammar::GrammarModel;
use crate::types::Fitness;

#[derive(Clone, Debug)]
pub struct Elite {
    pub tree: Tree,
    pub fitness: Fitness,
    pub overall_fitness: f64,
    pub canonical_string: String, // For deduplication
    pub generation: usize,
}

/// Best distinct programs seen over a whole run, best first.
pub struct HallOfFame {
    elites: Vec<Elite>,
    max_size: usize,
    seen_signatures: HashSet<String>,
}

impl HallOfFame {
    pub fn new(max_size: usize) -> Self {
        Self {
            elites: Vec::new(),
            max_size,
            seen_signatures: HashSet::new(),
        }
    }

    /// Whether an entry with this overall fitness could currently make the cut.
    pub fn admits(&self, overall_fitness: f64) -> bool {
        if overall_fitness.is_nan() || self.max_size == 0 {
            return false;
        }
        self.elites.len() < self.max_size
            || self
                .elites
                .last()
                .is_some_and(|worst| overall_fitness > worst.overall_fitness)
    }

    /// Offers a tree, computing its canonical form only when it would be kept.
    pub fn consider(
        &mut self,
        grammar: &GrammarModel,
        tree: &Tree,
        fitness: &Fitness,
        overall_fitness: f64,
        generation: usize,
    ) -> bool {
        if !self.admits(overall_fitness) {
            return false;
        }
        self.try_add(Elite {
            tree: tree.clone(),
            fitness: fitness.clone(),
            overall_fitness,
            canonical_string: canonical_tree_string(grammar, tree),
            generation,
        })
    }

    /// Attempt to add an elite; duplicates of an existing entry are rejected.
    pub fn try_add(&mut self, elite: Elite) -> bool {
        if !self.admits(elite.overall_fitness)
            || self.seen_signatures.contains(&elite.canonical_string)
        {
            return false;
        }

        self.seen_signatures.insert(elite.canonical_string.clone());
        // Stable insert keeps earlier discoveries ahead on ties
        let position = self
            .elites
            .partition_point(|e| e.overall_fitness >= elite.overall_fitness);
        self.elites.insert(position, elite);

        while self.elites.len() > self.max_size {
            if let Some(removed) = self.elites.pop() {
                self.seen_signatures.remove(&removed.canonical_string);
            }
        }
        true
    }

    pub fn get_all(&self) -> &[Elite] {
        &self.elites
    }

    pub fn get_top_n(&self, n: usize) -> &[Elite] {
        &self.elites[..n.min(self.elites.len())]
    }

    pub fn filter_by_threshold(&self, min_overall_fitness: f64) -> Vec<Elite> {
        self.elites
            .iter()
            .filter(|e| e.overall_fitness >= min_overall_fitness)
            .cloned()
            .collect()
    }

    pub fn best(&self) -> Option<&Elite> {
        self.elites.first()
    }

    pub fn len(&self) -> usize {
        self.elites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elites.is_empty()
    }
}

/// Generate canonical string for deduplication
pub fn canonical_tree_string(grammar: &GrammarModel, tree: &Tree) -> String {
    tree.to_text(grammar)
}
