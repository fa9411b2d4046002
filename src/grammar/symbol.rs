use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::metahandlers::Metahandler;

/// Index of a symbol inside its grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub(crate) usize);

/// Index of a production inside its grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductionId(pub(crate) usize);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl ProductionId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Typed parameter slot of a production.
#[derive(Clone)]
pub enum Slot {
    /// Exactly one subtree of the given symbol.
    Symbol(SymbolId),
    /// Between `min` and `max` subtrees (inclusive) of `element`.
    List {
        element: SymbolId,
        min: usize,
        max: usize,
    },
    /// Domain-restricted value produced by a pluggable generator.
    Meta(Arc<dyn Metahandler>),
}

impl Slot {
    pub fn symbol(symbol: SymbolId) -> Self {
        Slot::Symbol(symbol)
    }

    pub fn list(element: SymbolId, min: usize, max: usize) -> Self {
        Slot::List { element, min, max }
    }

    pub fn meta<M: Metahandler + 'static>(handler: M) -> Self {
        Slot::Meta(Arc::new(handler))
    }

    /// Grammar symbols that can appear below this slot.
    pub fn symbols(&self) -> Vec<SymbolId> {
        match self {
            Slot::Symbol(s) => vec![*s],
            Slot::List { element, .. } => vec![*element],
            Slot::Meta(handler) => handler.symbols(),
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Symbol(s) => write!(f, "Symbol({})", s.0),
            Slot::List { element, min, max } => write!(f, "List({}, {}..={})", element.0, min, max),
            Slot::Meta(handler) => write!(f, "Meta({:?})", handler),
        }
    }
}

/// Named slot of a production.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub slot: Slot,
}

impl Param {
    pub fn new(name: impl Into<String>, slot: Slot) -> Self {
        Self {
            name: name.into(),
            slot,
        }
    }
}

/// Concrete constructor for a symbol.
#[derive(Debug, Clone)]
pub struct Production {
    pub(crate) name: String,
    pub(crate) symbol: SymbolId,
    pub(crate) params: Vec<Param>,
    pub(crate) weight: f64,
}

impl Production {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The symbol this production expands.
    pub fn symbol(&self) -> SymbolId {
        self.symbol
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// A terminal constructor has no grammar-typed slots.
    pub fn is_terminal(&self) -> bool {
        self.params.iter().all(|p| p.slot.symbols().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct SymbolDecl {
    pub(crate) name: String,
    pub(crate) productions: Vec<ProductionId>,
}

impl SymbolDecl {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn productions(&self) -> &[ProductionId] {
        &self.productions
    }
}
