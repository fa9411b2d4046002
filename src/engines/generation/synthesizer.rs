use rand::seq::SliceRandom;
use rand::RngCore;
use std::sync::Arc;

use super::tree::{Child, Node, NodeId, Tree};
use crate::error::{Result, SynthgpError};
use crate::grammar::metahandlers::draw_list_size;
use crate::grammar::{GrammarModel, SlotContext, Slot, SymbolId};

/// Depth-bounded random tree generation over a compiled grammar.
pub struct Synthesizer {
    grammar: Arc<GrammarModel>,
    max_depth: usize,
}

impl Synthesizer {
    pub fn new(grammar: Arc<GrammarModel>, max_depth: usize) -> Self {
        Self { grammar, max_depth }
    }

    pub fn grammar(&self) -> &GrammarModel {
        &self.grammar
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Random tree for the grammar's root symbol at the full configured depth.
    pub fn random_tree(&self, rng: &mut dyn RngCore) -> Result<Tree> {
        synthesize(rng, &self.grammar, self.grammar.root(), self.max_depth)
    }

    pub fn synthesize(
        &self,
        rng: &mut dyn RngCore,
        symbol: SymbolId,
        depth_budget: usize,
    ) -> Result<Tree> {
        synthesize(rng, &self.grammar, symbol, depth_budget)
    }
}

/// Expands `symbol` into a tree whose distance to terminal is at most `depth_budget`.
///
/// Only productions that can be completed within the budget are candidates,
/// so generation always terminates; an empty candidate set is an
/// [`SynthgpError::ExhaustedBudget`].
pub fn synthesize(
    rng: &mut dyn RngCore,
    grammar: &GrammarModel,
    symbol: SymbolId,
    depth_budget: usize,
) -> Result<Tree> {
    let mut arena = Vec::new();
    expand(rng, grammar, &mut arena, symbol, depth_budget, None)?;
    Ok(Tree::from_arena(arena))
}

fn expand(
    rng: &mut dyn RngCore,
    grammar: &GrammarModel,
    arena: &mut Vec<Node>,
    symbol: SymbolId,
    budget: usize,
    parent: Option<NodeId>,
) -> Result<NodeId> {
    let candidates = grammar.feasible_productions(symbol, budget);
    let production_id = *candidates
        .choose_weighted(rng, |p| grammar.production(*p).weight())
        .map_err(|_| SynthgpError::ExhaustedBudget {
            symbol: grammar.symbol(symbol).name().to_string(),
            budget,
            required: grammar.min_depth(symbol),
        })?;
    let production = grammar.production(production_id);
    log::trace!(
        "expanding {} as {} within depth {}",
        grammar.symbol(symbol).name(),
        production.name(),
        budget
    );

    let id = NodeId(arena.len());
    arena.push(Node::new(production_id, symbol, parent));

    // feasible productions need at least depth 1
    let child_budget = budget - 1;
    let mut children = Vec::with_capacity(production.params().len());
    for (index, param) in production.params().iter().enumerate() {
        let child = match &param.slot {
            Slot::Symbol(s) => Child::Node(expand(rng, grammar, arena, *s, child_budget, Some(id))?),
            Slot::List { element, min, max } => {
                let size = draw_list_size(rng, grammar, *element, *min, *max, child_budget)?;
                let mut ids = Vec::with_capacity(size);
                for _ in 0..size {
                    ids.push(expand(rng, grammar, arena, *element, child_budget, Some(id))?);
                }
                Child::List(ids)
            }
            Slot::Meta(handler) => {
                let declared = handler.symbols();
                let context = SlotContext {
                    production: production.name(),
                    slot: &param.name,
                    index,
                };
                let mut recurse = |r: &mut dyn RngCore, s: SymbolId, depth: usize| {
                    if !declared.contains(&s) {
                        return Err(SynthgpError::Grammar(format!(
                            "metahandler on {}.{} expanded undeclared symbol {}",
                            context.production,
                            context.slot,
                            grammar.symbol(s).name()
                        )));
                    }
                    expand(r, grammar, arena, s, depth.min(child_budget), Some(id))
                };
                handler.generate(rng, grammar, &mut recurse, child_budget, &context)?
            }
        };
        children.push(child);
    }
    arena[id.0].set_children(children);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarRegistry, IntRange, ListSizeBetween};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn block_grammar() -> (GrammarModel, SymbolId, SymbolId) {
        let mut registry = GrammarRegistry::new();
        let block = registry.symbol("Block");
        let stmt = registry.symbol("Stmt");
        registry.production("Seq", block, [("body", Slot::meta(ListSizeBetween::new(stmt, 1, 3)))]);
        registry.production("Emit", stmt, [("code", Slot::meta(IntRange::new(0, 9)))]);
        registry.production("Loop", stmt, [("times", Slot::meta(IntRange::new(1, 4))), ("body", Slot::symbol(block))]);
        (registry.build(block).unwrap(), block, stmt)
    }

    #[test]
    fn test_synthesis_respects_budget() {
        let (grammar, block, _) = block_grammar();
        let mut rng = StdRng::seed_from_u64(7);
        for budget in 2..8 {
            for _ in 0..20 {
                let tree = synthesize(&mut rng, &grammar, block, budget).unwrap();
                assert!(tree.distance_to_term() <= budget);
                assert!(tree.validate(&grammar).is_ok());
            }
        }
    }

    #[test]
    fn test_budget_below_min_depth_is_exhausted() {
        let (grammar, block, _) = block_grammar();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(grammar.min_depth(block), Some(2));
        let err = synthesize(&mut rng, &grammar, block, 1).unwrap_err();
        assert!(matches!(err, SynthgpError::ExhaustedBudget { budget: 1, required: Some(2), .. }));
    }

    #[test]
    fn test_same_seed_same_tree() {
        let (grammar, block, _) = block_grammar();
        let a = synthesize(&mut StdRng::seed_from_u64(11), &grammar, block, 6).unwrap();
        let b = synthesize(&mut StdRng::seed_from_u64(11), &grammar, block, 6).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_weights_steer_production_choice() {
        let mut registry = GrammarRegistry::new();
        let root = registry.symbol("Root");
        let rare = registry.weighted_production("Rare", root, Vec::<(String, Slot)>::new(), 0.001);
        registry.weighted_production("Common", root, Vec::<(String, Slot)>::new(), 1000.0);
        let grammar = registry.build(root).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let rare_hits = (0..200)
            .filter(|_| synthesize(&mut rng, &grammar, root, 1).unwrap().root_node().production() == rare)
            .count();
        assert!(rare_hits < 5);
    }
}
