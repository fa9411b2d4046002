use rand::RngCore;

use super::synthesizer::Synthesizer;
use super::text::parse_tree;
use super::tree::Tree;
use crate::error::{Result, SynthgpError};
use crate::grammar::{GrammarModel, SymbolId};

/// Produces the trees of the first generation.
pub trait PopulationInitializer: Send {
    fn initialize(
        &mut self,
        rng: &mut dyn RngCore,
        synthesizer: &Synthesizer,
        size: usize,
    ) -> Result<Vec<Tree>>;
}

/// Every tree synthesized at the full depth budget.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomInitializer;

impl PopulationInitializer for RandomInitializer {
    fn initialize(
        &mut self,
        rng: &mut dyn RngCore,
        synthesizer: &Synthesizer,
        size: usize,
    ) -> Result<Vec<Tree>> {
        (0..size).map(|_| synthesizer.random_tree(rng)).collect()
    }
}

/// External source of candidate programs, e.g. a corpus or another search.
pub trait SynthesisProvider: Send {
    /// Lazily yields up to `count` trees expanding `symbol`.
    fn provide<'a>(
        &'a mut self,
        grammar: &'a GrammarModel,
        symbol: SymbolId,
        count: usize,
    ) -> Box<dyn Iterator<Item = Result<Tree>> + 'a>;
}

/// Provider reading one tree per line in the textual tree form.
#[derive(Debug, Clone)]
pub struct TextProvider {
    lines: Vec<String>,
}

impl TextProvider {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::new(content.lines()))
    }
}

impl SynthesisProvider for TextProvider {
    fn provide<'a>(
        &'a mut self,
        grammar: &'a GrammarModel,
        symbol: SymbolId,
        count: usize,
    ) -> Box<dyn Iterator<Item = Result<Tree>> + 'a> {
        Box::new(
            self.lines
                .iter()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .take(count)
                .map(move |line| parse_tree(grammar, symbol, line)),
        )
    }
}

/// Seeds the population from a provider and tops it up with random trees.
///
/// Provided trees must conform to the grammar, expand the root symbol and
/// fit the depth limit.
pub struct ProviderInitializer<P> {
    provider: P,
}

impl<P: SynthesisProvider> ProviderInitializer<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: SynthesisProvider> PopulationInitializer for ProviderInitializer<P> {
    fn initialize(
        &mut self,
        rng: &mut dyn RngCore,
        synthesizer: &Synthesizer,
        size: usize,
    ) -> Result<Vec<Tree>> {
        let grammar = synthesizer.grammar();
        let mut trees = Vec::with_capacity(size);
        for tree in self.provider.provide(grammar, grammar.root(), size) {
            let tree = tree?;
            tree.validate(grammar)?;
            if tree.symbol() != grammar.root() {
                return Err(SynthgpError::InvalidTree(format!(
                    "provided tree expands {}, expected {}",
                    grammar.symbol(tree.symbol()).name(),
                    grammar.symbol(grammar.root()).name()
                )));
            }
            if tree.distance_to_term() > synthesizer.max_depth() {
                return Err(SynthgpError::InvalidTree(format!(
                    "provided tree has depth {}, limit is {}",
                    tree.distance_to_term(),
                    synthesizer.max_depth()
                )));
            }
            trees.push(tree);
        }

        if trees.len() < size {
            log::warn!(
                "provider supplied {} of {} initial trees, synthesizing the rest",
                trees.len(),
                size
            );
            for _ in trees.len()..size {
                trees.push(synthesizer.random_tree(rng)?);
            }
        }
        Ok(trees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarRegistry, IntRange, Slot};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn synthesizer(max_depth: usize) -> Synthesizer {
        let mut registry = GrammarRegistry::new();
        let expr = registry.symbol("Expr");
        registry.production("Lit", expr, [("v", Slot::meta(IntRange::new(0, 9)))]);
        registry.production("Neg", expr, [("e", Slot::symbol(expr))]);
        Synthesizer::new(Arc::new(registry.build(expr).unwrap()), max_depth)
    }

    #[test]
    fn test_provider_trees_come_first_then_random_top_up() {
        let synth = synthesizer(5);
        let mut init = ProviderInitializer::new(TextProvider::new(["Lit(3)", "", "# seed", "Neg(Lit(4))"]));
        let mut rng = StdRng::seed_from_u64(0);
        let trees = init.initialize(&mut rng, &synth, 6).unwrap();
        assert_eq!(trees.len(), 6);
        assert_eq!(trees[0].to_text(synth.grammar()), "Lit(3)");
        assert_eq!(trees[1].to_text(synth.grammar()), "Neg(Lit(4))");
        assert!(trees.iter().all(|t| t.distance_to_term() <= 5));
    }

    #[test]
    fn test_provider_surplus_is_ignored() {
        let synth = synthesizer(5);
        let mut init = ProviderInitializer::new(TextProvider::new(["Lit(1)", "Lit(2)", "Lit(3)"]));
        let trees = init.initialize(&mut StdRng::seed_from_u64(0), &synth, 2).unwrap();
        assert_eq!(trees.len(), 2);
    }

    #[test]
    fn test_provider_tree_over_depth_limit_is_rejected() {
        let synth = synthesizer(2);
        let mut init = ProviderInitializer::new(TextProvider::new(["Neg(Neg(Lit(1)))"]));
        let err = init.initialize(&mut StdRng::seed_from_u64(0), &synth, 3).unwrap_err();
        assert!(matches!(err, SynthgpError::InvalidTree(_)));
    }
}
