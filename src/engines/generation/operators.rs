use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::synthesizer::synthesize;
use super::tree::{NodeId, Tree};
use crate::error::Result;
use crate::grammar::GrammarModel;

/// Depth a replacement rooted at `at` may use while keeping the tree within `max_depth`.
///
/// Trees that already exceed the limit keep the height they have at `at`.
fn allowance(tree: &Tree, at: NodeId, max_depth: usize) -> usize {
    let node = tree.node(at);
    max_depth
        .saturating_sub(node.depth())
        .max(node.distance_to_term())
}

fn random_node(rng: &mut dyn RngCore, tree: &Tree) -> NodeId {
    NodeId(rng.gen_range(0..tree.node_count()))
}

/// Replaces a uniformly chosen node with a freshly synthesized subtree of the same symbol.
pub fn mutate(
    rng: &mut dyn RngCore,
    grammar: &GrammarModel,
    tree: &Tree,
    max_depth: usize,
) -> Result<Tree> {
    let at = random_node(rng, tree);
    let node = tree.node(at);
    let budget = if at == tree.root() {
        // regrowing the whole tree may deepen it by one level at most
        let height = node.distance_to_term();
        (height + 1).min(max_depth).max(height)
    } else {
        allowance(tree, at, max_depth)
    };
    let replacement = synthesize(rng, grammar, node.symbol(), budget)?;
    log::trace!(
        "mutating node {} ({}) within depth {}",
        at.index(),
        grammar.symbol(node.symbol()).name(),
        budget
    );
    Ok(tree.graft(at, &replacement, replacement.root()))
}

/// Swaps same-symbol subtrees between two parents.
///
/// The first child takes a subtree of `b` at a random node of `a`. When `b`
/// has nothing of that symbol that fits, the node is resynthesized instead
/// and the second child is a copy of `b`.
pub fn crossover(
    rng: &mut dyn RngCore,
    grammar: &GrammarModel,
    a: &Tree,
    b: &Tree,
    max_depth: usize,
) -> Result<(Tree, Tree)> {
    let at = random_node(rng, a);
    let symbol = a.node(at).symbol();
    let room_in_a = allowance(a, at, max_depth);

    let candidates: Vec<NodeId> = b
        .nodes_of_symbol(symbol)
        .iter()
        .copied()
        .filter(|id| b.node(*id).distance_to_term() <= room_in_a)
        .collect();

    let Some(&donor) = candidates.choose(rng) else {
        let replacement = synthesize(rng, grammar, symbol, room_in_a)?;
        return Ok((a.graft(at, &replacement, replacement.root()), b.clone()));
    };

    let first = a.graft(at, b, donor);
    let second = if a.node(at).distance_to_term() <= allowance(b, donor, max_depth) {
        b.graft(donor, a, at)
    } else {
        b.clone()
    };
    Ok((first, second))
}
