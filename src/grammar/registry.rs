use std::collections::HashMap;

use super::model::GrammarModel;
use super::symbol::{Param, Production, ProductionId, Slot, SymbolDecl, SymbolId};
use crate::error::Result;

/// Explicit registration API for node kinds.
///
/// Symbols and productions are declared up front; all consistency checks
/// happen once in [`GrammarRegistry::build`].
#[derive(Debug, Default)]
pub struct GrammarRegistry {
    symbols: Vec<SymbolDecl>,
    productions: Vec<Production>,
    symbol_names: HashMap<String, SymbolId>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `name`, declaring the symbol on first use.
    pub fn symbol(&mut self, name: &str) -> SymbolId {
        if let Some(id) = self.symbol_names.get(name) {
            return *id;
        }
        let id = SymbolId(self.symbols.len());
        self.symbols.push(SymbolDecl {
            name: name.to_string(),
            productions: Vec::new(),
        });
        self.symbol_names.insert(name.to_string(), id);
        id
    }

    pub fn production<I, S>(&mut self, name: &str, symbol: SymbolId, params: I) -> ProductionId
    where
        I: IntoIterator<Item = (S, Slot)>,
        S: Into<String>,
    {
        self.weighted_production(name, symbol, params, 1.0)
    }

    /// Declares a production whose selection weight differs from the default 1.0.
    pub fn weighted_production<I, S>(
        &mut self,
        name: &str,
        symbol: SymbolId,
        params: I,
        weight: f64,
    ) -> ProductionId
    where
        I: IntoIterator<Item = (S, Slot)>,
        S: Into<String>,
    {
        let id = ProductionId(self.productions.len());
        self.productions.push(Production {
            name: name.to_string(),
            symbol,
            params: params
                .into_iter()
                .map(|(n, slot)| Param::new(n, slot))
                .collect(),
            weight,
        });
        if let Some(decl) = self.symbols.get_mut(symbol.0) {
            decl.productions.push(id);
        }
        id
    }

    /// Declares a constructor without slots.
    pub fn terminal(&mut self, name: &str, symbol: SymbolId) -> ProductionId {
        self.production(name, symbol, Vec::<(String, Slot)>::new())
    }

    pub fn get_symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbol_names.get(name).copied()
    }

    pub fn build(self, root: SymbolId) -> Result<GrammarModel> {
        GrammarModel::new(self.symbols, self.productions, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::metahandlers::FloatRange;

    #[test]
    fn test_symbol_is_declared_once() {
        let mut registry = GrammarRegistry::new();
        let a = registry.symbol("Expr");
        let b = registry.symbol("Expr");
        assert_eq!(a, b);
        assert_eq!(registry.get_symbol("Expr"), Some(a));
    }

    #[test]
    fn test_symbol_not_found() {
        let registry = GrammarRegistry::new();
        assert!(registry.get_symbol("NonExistent").is_none());
    }

    #[test]
    fn test_production_retrieval_after_build() {
        let mut registry = GrammarRegistry::new();
        let number = registry.symbol("Number");
        registry.production("Literal", number, [("value", Slot::meta(FloatRange::new(0.0, 1.0)))]);
        let plus = registry.production(
            "Plus",
            number,
            [("left", Slot::symbol(number)), ("right", Slot::symbol(number))],
        );
        let grammar = registry.build(number).unwrap();
        assert_eq!(grammar.production_by_name("Plus"), Some(plus));
        assert_eq!(grammar.productions_of(number).len(), 2);
    }
}
