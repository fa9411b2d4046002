use std::collections::{HashMap, VecDeque};

use super::symbol::{Production, ProductionId, Slot, SymbolDecl, SymbolId};
use crate::error::{Result, SynthgpError};

/// Compiled, immutable grammar: production tables plus the minimum depth
/// needed to fully expand every symbol and production.
#[derive(Debug)]
pub struct GrammarModel {
    symbols: Vec<SymbolDecl>,
    productions: Vec<Production>,
    root: SymbolId,
    symbol_depth: Vec<Option<usize>>,
    production_depth: Vec<Option<usize>>,
    symbol_names: HashMap<String, SymbolId>,
    production_names: HashMap<String, ProductionId>,
}

impl GrammarModel {
    pub(crate) fn new(
        symbols: Vec<SymbolDecl>,
        productions: Vec<Production>,
        root: SymbolId,
    ) -> Result<Self> {
        if root.0 >= symbols.len() {
            return Err(SynthgpError::Grammar(format!(
                "root symbol #{} is not declared",
                root.0
            )));
        }

        let symbol_names = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), SymbolId(i)))
            .collect();
        let production_names = check_productions(&symbols, &productions)?;

        let reachable = reachable_symbols(&symbols, &productions, root);
        for (i, decl) in symbols.iter().enumerate() {
            if reachable[i] && decl.productions.is_empty() {
                return Err(SynthgpError::Grammar(format!(
                    "symbol {} is reachable from {} but has no productions",
                    decl.name, symbols[root.0].name
                )));
            }
        }

        let (symbol_depth, production_depth) = compute_min_depths(&symbols, &productions);

        for (i, decl) in symbols.iter().enumerate() {
            if symbol_depth[i].is_some() {
                continue;
            }
            if reachable[i] {
                return Err(SynthgpError::Grammar(format!(
                    "symbol {} has no finite expansion",
                    decl.name
                )));
            }
            log::warn!(
                "symbol {} has no finite expansion but is unreachable from {}",
                decl.name,
                symbols[root.0].name
            );
        }

        Ok(Self {
            symbols,
            productions,
            root,
            symbol_depth,
            production_depth,
            symbol_names,
            production_names,
        })
    }

    pub fn root(&self) -> SymbolId {
        self.root
    }

    pub fn symbols(&self) -> &[SymbolDecl] {
        &self.symbols
    }

    pub fn symbol(&self, id: SymbolId) -> &SymbolDecl {
        &self.symbols[id.0]
    }

    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id.0]
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn productions_of(&self, symbol: SymbolId) -> &[ProductionId] {
        &self.symbols[symbol.0].productions
    }

    /// Minimum depth of a complete expansion of `symbol`, `None` when there is none.
    pub fn min_depth(&self, symbol: SymbolId) -> Option<usize> {
        self.symbol_depth.get(symbol.0).copied().flatten()
    }

    pub fn production_min_depth(&self, production: ProductionId) -> Option<usize> {
        self.production_depth.get(production.0).copied().flatten()
    }

    /// Productions of `symbol` that can be completed within `budget`.
    pub fn feasible_productions(&self, symbol: SymbolId, budget: usize) -> Vec<ProductionId> {
        self.productions_of(symbol)
            .iter()
            .copied()
            .filter(|p| self.production_min_depth(*p).is_some_and(|d| d <= budget))
            .collect()
    }

    pub fn symbol_by_name(&self, name: &str) -> Option<SymbolId> {
        self.symbol_names.get(name).copied()
    }

    pub fn production_by_name(&self, name: &str) -> Option<ProductionId> {
        self.production_names.get(name).copied()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_productions(
    symbols: &[SymbolDecl],
    productions: &[Production],
) -> Result<HashMap<String, ProductionId>> {
    let mut names = HashMap::with_capacity(productions.len());
    for (i, p) in productions.iter().enumerate() {
        if !is_identifier(&p.name) {
            return Err(SynthgpError::Grammar(format!(
                "production name {:?} is not an identifier",
                p.name
            )));
        }
        if names.insert(p.name.clone(), ProductionId(i)).is_some() {
            return Err(SynthgpError::Grammar(format!(
                "production {} is declared twice",
                p.name
            )));
        }
        if p.symbol.0 >= symbols.len() {
            return Err(SynthgpError::Grammar(format!(
                "production {} expands an undeclared symbol",
                p.name
            )));
        }
        if !(p.weight.is_finite() && p.weight > 0.0) {
            return Err(SynthgpError::Grammar(format!(
                "production {} has weight {}, expected a positive finite number",
                p.name, p.weight
            )));
        }
        for param in &p.params {
            match &param.slot {
                Slot::List { min, max, .. } if min > max => {
                    return Err(SynthgpError::Grammar(format!(
                        "slot {}.{} has list bounds {}..={}",
                        p.name, param.name, min, max
                    )));
                }
                Slot::Meta(handler) => handler.check().map_err(|problem| {
                    SynthgpError::Grammar(format!("slot {}.{}: {}", p.name, param.name, problem))
                })?,
                _ => {}
            }
            if param.slot.symbols().iter().any(|s| s.0 >= symbols.len()) {
                return Err(SynthgpError::Grammar(format!(
                    "slot {}.{} refers to an undeclared symbol",
                    p.name, param.name
                )));
            }
        }
    }
    Ok(names)
}

fn reachable_symbols(
    symbols: &[SymbolDecl],
    productions: &[Production],
    root: SymbolId,
) -> Vec<bool> {
    let mut seen = vec![false; symbols.len()];
    let mut queue = VecDeque::from([root]);
    seen[root.0] = true;
    while let Some(symbol) = queue.pop_front() {
        for p in &symbols[symbol.0].productions {
            for param in &productions[p.0].params {
                for s in param.slot.symbols() {
                    if !seen[s.0] {
                        seen[s.0] = true;
                        queue.push_back(s);
                    }
                }
            }
        }
    }
    seen
}

fn slot_min_depth(slot: &Slot, symbol_depth: &[Option<usize>]) -> Option<usize> {
    match slot {
        Slot::Symbol(s) => symbol_depth[s.0],
        Slot::List { element, min, .. } => {
            if *min == 0 {
                Some(0)
            } else {
                symbol_depth[element.0]
            }
        }
        Slot::Meta(handler) => {
            handler.min_depth(&|s: SymbolId| symbol_depth.get(s.0).copied().flatten())
        }
    }
}

/// Fixed-point relaxation of the minimum expansion depth.
///
/// A production needs one level more than its deepest slot; a symbol needs the
/// cheapest of its productions. Every pass settles at least one more symbol on
/// a shortest expansion chain, so `|symbols| + 1` passes always reach the fixed point.
fn compute_min_depths(
    symbols: &[SymbolDecl],
    productions: &[Production],
) -> (Vec<Option<usize>>, Vec<Option<usize>>) {
    let mut symbol_depth: Vec<Option<usize>> = vec![None; symbols.len()];
    let mut production_depth: Vec<Option<usize>> = vec![None; productions.len()];

    for _ in 0..=symbols.len() {
        let mut changed = false;

        for (i, p) in productions.iter().enumerate() {
            let depth = p
                .params
                .iter()
                .try_fold(0, |acc, param| {
                    slot_min_depth(&param.slot, &symbol_depth).map(|d| acc.max(d))
                })
                .map(|d| d + 1);
            if improves(depth, production_depth[i]) {
                production_depth[i] = depth;
                changed = true;
            }
        }

        for (i, decl) in symbols.iter().enumerate() {
            let depth = decl
                .productions
                .iter()
                .filter_map(|p| production_depth[p.0])
                .min();
            if improves(depth, symbol_depth[i]) {
                symbol_depth[i] = depth;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    (symbol_depth, production_depth)
}

fn improves(candidate: Option<usize>, current: Option<usize>) -> bool {
    match (candidate, current) {
        (Some(c), Some(cur)) => c < cur,
        (Some(_), None) => true,
        (None, _) => false,
    }
}
