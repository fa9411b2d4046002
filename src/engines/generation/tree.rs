use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, SynthgpError};
use crate::grammar::{GrammarModel, ProductionId, Slot, SymbolId};
use crate::types::Value;

/// Position of a node in its tree's arena.
///
/// Arenas are kept in preorder, so the root is always `NodeId(0)` and a
/// subtree rooted at `i` occupies the contiguous range `i..i + node_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Realized content of one parameter slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Child {
    Node(NodeId),
    List(Vec<NodeId>),
    Value(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    production: ProductionId,
    symbol: SymbolId,
    children: Vec<Child>,
    parent: Option<NodeId>,
    #[serde(skip)]
    depth: usize,
    #[serde(skip)]
    node_count: usize,
    #[serde(skip)]
    distance_to_term: usize,
}

impl Node {
    pub(crate) fn new(production: ProductionId, symbol: SymbolId, parent: Option<NodeId>) -> Self {
        Self {
            production,
            symbol,
            children: Vec::new(),
            parent,
            depth: 0,
            node_count: 1,
            distance_to_term: 1,
        }
    }

    pub fn production(&self) -> ProductionId {
        self.production
    }

    /// Symbol the node's production expands.
    pub fn symbol(&self) -> SymbolId {
        self.symbol
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    pub(crate) fn set_children(&mut self, children: Vec<Child>) {
        self.children = children;
    }

    pub fn child_node(&self, slot: usize) -> Option<NodeId> {
        match self.children.get(slot) {
            Some(Child::Node(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn child_list(&self, slot: usize) -> Option<&[NodeId]> {
        match self.children.get(slot) {
            Some(Child::List(ids)) => Some(ids),
            _ => None,
        }
    }

    pub fn value(&self, slot: usize) -> Option<&Value> {
        match self.children.get(slot) {
            Some(Child::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// Grammar-typed children in slot order, list elements flattened.
    pub fn subnodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children
            .iter()
            .flat_map(|c| -> &[NodeId] {
                match c {
                    Child::Node(id) => std::slice::from_ref(id),
                    Child::List(ids) => ids,
                    Child::Value(_) => &[],
                }
            })
            .copied()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Distance from the root (root is 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn distance_to_term(&self) -> usize {
        self.distance_to_term
    }
}

/// Syntax tree stored as a preorder arena with derived metrics kept per node.
///
/// Trees are never shared between individuals: every structural edit builds a
/// fresh arena and recomputes the metrics bottom-up.
///
/// Serialized trees carry only the arena; metrics are recomputed on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Node>", into = "Vec<Node>")]
pub struct Tree {
    nodes: Vec<Node>,
    type_index: BTreeMap<SymbolId, Vec<NodeId>>,
}

impl Tree {
    /// Wraps a preorder arena (parents before children, parent links set).
    pub(crate) fn from_arena(nodes: Vec<Node>) -> Self {
        let mut tree = Self {
            nodes,
            type_index: BTreeMap::new(),
        };
        tree.relabel();
        tree
    }

    fn relabel(&mut self) {
        for i in 0..self.nodes.len() {
            self.nodes[i].depth = match self.nodes[i].parent {
                Some(p) => self.nodes[p.0].depth + 1,
                None => 0,
            };
        }

        for i in (0..self.nodes.len()).rev() {
            let (count, height) = self.nodes[i].subnodes().fold((1, 0), |(count, height), c| {
                let child = &self.nodes[c.0];
                (count + child.node_count, height.max(child.distance_to_term))
            });
            self.nodes[i].node_count = count;
            self.nodes[i].distance_to_term = height + 1;
        }

        self.type_index.clear();
        for (i, node) in self.nodes.iter().enumerate() {
            self.type_index.entry(node.symbol).or_default().push(NodeId(i));
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_node(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes[0].node_count
    }

    pub fn distance_to_term(&self) -> usize {
        self.nodes[0].distance_to_term
    }

    pub fn symbol(&self) -> SymbolId {
        self.nodes[0].symbol
    }

    /// All nodes expanding `symbol`, in preorder.
    pub fn nodes_of_symbol(&self, symbol: SymbolId) -> &[NodeId] {
        self.type_index.get(&symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn type_index(&self) -> &BTreeMap<SymbolId, Vec<NodeId>> {
        &self.type_index
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, move |p| self.node(*p).parent)
    }

    /// Copy of this tree where the subtree at `at` is replaced by the subtree
    /// of `donor` rooted at `donor_root`.
    pub fn graft(&self, at: NodeId, donor: &Tree, donor_root: NodeId) -> Tree {
        let capacity =
            self.nodes.len() - self.node(at).node_count + donor.node(donor_root).node_count;
        let mut out = Vec::with_capacity(capacity);
        copy_subtree(self, self.root(), None, &mut out, Some((at, donor, donor_root)));
        Tree::from_arena(out)
    }

    /// Standalone copy of the subtree rooted at `at`.
    pub fn subtree(&self, at: NodeId) -> Tree {
        let mut out = Vec::with_capacity(self.node(at).node_count);
        copy_subtree(self, at, None, &mut out, None);
        Tree::from_arena(out)
    }

    /// Checks that the tree is a well-formed preorder arena whose nodes follow
    /// the grammar's productions and slot types.
    pub fn validate(&self, grammar: &GrammarModel) -> Result<()> {
        check_arena(&self.nodes)?;
        for (i, node) in self.nodes.iter().enumerate() {
            let production = grammar.productions().get(node.production.0).ok_or_else(|| {
                SynthgpError::InvalidTree(format!("node {} has an unknown production", i))
            })?;
            if production.symbol() != node.symbol {
                return Err(SynthgpError::InvalidTree(format!(
                    "node {} ({}) is labelled with the wrong symbol",
                    i,
                    production.name()
                )));
            }
            if production.params().len() != node.children.len() {
                return Err(SynthgpError::InvalidTree(format!(
                    "{} expects {} slots, got {}",
                    production.name(),
                    production.params().len(),
                    node.children.len()
                )));
            }
            for (param, child) in production.params().iter().zip(&node.children) {
                self.check_slot(grammar, production.name(), &param.name, &param.slot, child)?;
            }
        }
        Ok(())
    }

    fn check_slot(
        &self,
        grammar: &GrammarModel,
        production: &str,
        slot_name: &str,
        slot: &Slot,
        child: &Child,
    ) -> Result<()> {
        let symbol_of = |id: &NodeId| self.nodes.get(id.0).map(|n| n.symbol);
        let ok = match (slot, child) {
            (Slot::Symbol(s), Child::Node(id)) => symbol_of(id) == Some(*s),
            (Slot::List { element, min, max }, Child::List(ids)) => {
                (*min..=*max).contains(&ids.len())
                    && ids.iter().all(|id| symbol_of(id) == Some(*element))
            }
            (Slot::Meta(handler), Child::Value(v)) => handler.accepts(v),
            (Slot::Meta(handler), Child::Node(id)) => {
                symbol_of(id).is_some_and(|s| handler.accepts_subtrees(&[s], false))
            }
            (Slot::Meta(handler), Child::List(ids)) => ids
                .iter()
                .map(symbol_of)
                .collect::<Option<Vec<_>>>()
                .is_some_and(|symbols| handler.accepts_subtrees(&symbols, true)),
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(SynthgpError::InvalidTree(format!(
                "slot {}.{} holds {:?}, which does not match its type in grammar rooted at {}",
                production,
                slot_name,
                child,
                grammar.symbol(grammar.root()).name()
            )))
        }
    }
}

impl TryFrom<Vec<Node>> for Tree {
    type Error = SynthgpError;

    fn try_from(nodes: Vec<Node>) -> Result<Self> {
        check_arena(&nodes)?;
        Ok(Tree::from_arena(nodes))
    }
}

impl From<Tree> for Vec<Node> {
    fn from(tree: Tree) -> Self {
        tree.nodes
    }
}

/// Structural invariants of a preorder arena: a parentless root, every other
/// node referenced exactly once by an earlier node whose id it holds as parent.
fn check_arena(nodes: &[Node]) -> Result<()> {
    let root = nodes
        .first()
        .ok_or_else(|| SynthgpError::InvalidTree("tree has no nodes".to_string()))?;
    if root.parent.is_some() {
        return Err(SynthgpError::InvalidTree("root has a parent".to_string()));
    }
    let mut referenced = vec![false; nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        for c in node.subnodes() {
            if c.0 <= i || c.0 >= nodes.len() || referenced[c.0] {
                return Err(SynthgpError::InvalidTree(format!(
                    "node {} has a child out of preorder",
                    i
                )));
            }
            if nodes[c.0].parent != Some(NodeId(i)) {
                return Err(SynthgpError::InvalidTree(format!(
                    "node {} has a stale parent link",
                    c.0
                )));
            }
            referenced[c.0] = true;
        }
    }
    if referenced.iter().skip(1).any(|r| !r) {
        return Err(SynthgpError::InvalidTree(
            "arena holds detached nodes".to_string(),
        ));
    }
    Ok(())
}

type GraftPoint<'a> = Option<(NodeId, &'a Tree, NodeId)>;

fn copy_subtree(
    src: &Tree,
    id: NodeId,
    parent: Option<NodeId>,
    out: &mut Vec<Node>,
    graft: GraftPoint<'_>,
) -> NodeId {
    if let Some((at, donor, donor_root)) = graft {
        if at == id {
            return copy_subtree(donor, donor_root, parent, out, None);
        }
    }
    let node = src.node(id);
    let new_id = NodeId(out.len());
    out.push(Node::new(node.production, node.symbol, parent));

    let mut children = Vec::with_capacity(node.children.len());
    for child in &node.children {
        let copied = match child {
            Child::Node(c) => Child::Node(copy_subtree(src, *c, Some(new_id), out, graft)),
            Child::List(cs) => {
                let mut ids = Vec::with_capacity(cs.len());
                for c in cs {
                    ids.push(copy_subtree(src, *c, Some(new_id), out, graft));
                }
                Child::List(ids)
            }
            Child::Value(v) => Child::Value(v.clone()),
        };
        children.push(copied);
    }
    out[new_id.0].children = children;
    new_id
}
