use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use std::fmt;

use super::model::GrammarModel;
use super::symbol::SymbolId;
use crate::engines::generation::tree::{Child, NodeId};
use crate::error::{Result, SynthgpError};
use crate::types::Value;

/// Recursive generator handed to metahandlers: expands `symbol` within `depth`
/// and returns the id of the new subtree root.
pub type Recurse<'a> = dyn FnMut(&mut dyn RngCore, SymbolId, usize) -> Result<NodeId> + 'a;

/// Where a metahandler is being invoked.
#[derive(Debug, Clone, Copy)]
pub struct SlotContext<'a> {
    pub production: &'a str,
    pub slot: &'a str,
    pub index: usize,
}

/// Pluggable generator for a constrained slot.
///
/// `generate` receives the depth budget left for the slot's content and must
/// only call `recurse` for symbols it lists in [`Metahandler::symbols`].
pub trait Metahandler: Send + Sync + fmt::Debug {
    fn symbols(&self) -> Vec<SymbolId> {
        Vec::new()
    }

    /// Smallest depth the slot content can have, `None` when no finite expansion exists.
    fn min_depth(&self, depth_of: &dyn Fn(SymbolId) -> Option<usize>) -> Option<usize> {
        self.symbols()
            .into_iter()
            .try_fold(0, |acc, s| depth_of(s).map(|d| acc.max(d)))
    }

    fn generate(
        &self,
        rng: &mut dyn RngCore,
        grammar: &GrammarModel,
        recurse: &mut Recurse<'_>,
        depth: usize,
        context: &SlotContext<'_>,
    ) -> Result<Child>;

    /// Rejects handlers that can never generate anything, e.g. inverted bounds.
    /// Runs once when the grammar is built.
    fn check(&self) -> std::result::Result<(), String> {
        Ok(())
    }

    /// Whether a parsed literal is a value this handler could have produced.
    fn accepts(&self, _value: &Value) -> bool {
        true
    }

    /// Whether realized subtrees of the given symbols could have come from this
    /// handler. `as_list` is set when they fill the slot as a list.
    fn accepts_subtrees(&self, symbols: &[SymbolId], as_list: bool) -> bool {
        let allowed = self.symbols();
        (as_list || symbols.len() == 1) && symbols.iter().all(|s| allowed.contains(s))
    }
}

/// Integer drawn uniformly from `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
}

impl IntRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }
}

impl Metahandler for IntRange {
    fn generate(
        &self,
        rng: &mut dyn RngCore,
        _grammar: &GrammarModel,
        _recurse: &mut Recurse<'_>,
        _depth: usize,
        context: &SlotContext<'_>,
    ) -> Result<Child> {
        if self.min > self.max {
            return Err(SynthgpError::Grammar(format!(
                "IntRange({}, {}) on {}.{} is empty",
                self.min, self.max, context.production, context.slot
            )));
        }
        Ok(Child::Value(Value::Integer(rng.gen_range(self.min..=self.max))))
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.min > self.max {
            return Err(format!("IntRange({}, {}) is empty", self.min, self.max));
        }
        Ok(())
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Integer(i) if (self.min..=self.max).contains(i))
    }
}

/// Float drawn uniformly from `[min, max)`.
#[derive(Debug, Clone, Copy)]
pub struct FloatRange {
    pub min: f64,
    pub max: f64,
}

impl FloatRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl Metahandler for FloatRange {
    fn generate(
        &self,
        rng: &mut dyn RngCore,
        _grammar: &GrammarModel,
        _recurse: &mut Recurse<'_>,
        _depth: usize,
        context: &SlotContext<'_>,
    ) -> Result<Child> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min > self.max {
            return Err(SynthgpError::Grammar(format!(
                "FloatRange({}, {}) on {}.{} is not a finite interval",
                self.min, self.max, context.production, context.slot
            )));
        }
        if self.min == self.max {
            return Ok(Child::Value(Value::Float(self.min)));
        }
        Ok(Child::Value(Value::Float(rng.gen_range(self.min..self.max))))
    }

    fn check(&self) -> std::result::Result<(), String> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min > self.max {
            return Err(format!(
                "FloatRange({}, {}) is not a finite interval",
                self.min, self.max
            ));
        }
        Ok(())
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Float(x) if *x >= self.min && *x <= self.max)
    }
}

/// One value out of a fixed option list, e.g. the variable names in scope.
#[derive(Debug, Clone)]
pub struct VarRange {
    pub options: Vec<Value>,
}

impl VarRange {
    pub fn new(options: Vec<Value>) -> Self {
        Self { options }
    }

    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: names.into_iter().map(|n| Value::String(n.into())).collect(),
        }
    }
}

impl Metahandler for VarRange {
    fn generate(
        &self,
        rng: &mut dyn RngCore,
        _grammar: &GrammarModel,
        _recurse: &mut Recurse<'_>,
        _depth: usize,
        context: &SlotContext<'_>,
    ) -> Result<Child> {
        let value = self.options.choose(rng).ok_or_else(|| {
            SynthgpError::Grammar(format!(
                "VarRange on {}.{} has no options",
                context.production, context.slot
            ))
        })?;
        Ok(Child::Value(value.clone()))
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.options.is_empty() {
            return Err("VarRange has no options".to_string());
        }
        Ok(())
    }

    fn accepts(&self, value: &Value) -> bool {
        self.options.contains(value)
    }
}

/// List of `element` subtrees whose length is drawn from `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct ListSizeBetween {
    pub element: SymbolId,
    pub min: usize,
    pub max: usize,
}

impl ListSizeBetween {
    pub fn new(element: SymbolId, min: usize, max: usize) -> Self {
        Self { element, min, max }
    }
}

impl Metahandler for ListSizeBetween {
    fn symbols(&self) -> Vec<SymbolId> {
        vec![self.element]
    }

    fn min_depth(&self, depth_of: &dyn Fn(SymbolId) -> Option<usize>) -> Option<usize> {
        if self.min == 0 {
            Some(0)
        } else {
            depth_of(self.element)
        }
    }

    fn generate(
        &self,
        rng: &mut dyn RngCore,
        grammar: &GrammarModel,
        recurse: &mut Recurse<'_>,
        depth: usize,
        _context: &SlotContext<'_>,
    ) -> Result<Child> {
        let size = draw_list_size(rng, grammar, self.element, self.min, self.max, depth)?;
        let mut elements = Vec::with_capacity(size);
        for _ in 0..size {
            elements.push(recurse(rng, self.element, depth)?);
        }
        Ok(Child::List(elements))
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.min > self.max {
            return Err(format!(
                "ListSizeBetween bounds {}..={} are inverted",
                self.min, self.max
            ));
        }
        Ok(())
    }

    fn accepts_subtrees(&self, symbols: &[SymbolId], as_list: bool) -> bool {
        as_list
            && (self.min..=self.max).contains(&symbols.len())
            && symbols.iter().all(|s| *s == self.element)
    }
}

/// Draws a collection size in `[min, max]`. When the element cannot fit in
/// `depth` only the empty list is possible.
pub(crate) fn draw_list_size(
    rng: &mut dyn RngCore,
    grammar: &GrammarModel,
    element: SymbolId,
    min: usize,
    max: usize,
    depth: usize,
) -> Result<usize> {
    if min > max {
        return Err(SynthgpError::Grammar(format!(
            "list of {} has inverted bounds {}..={}",
            grammar.symbol(element).name(),
            min,
            max
        )));
    }
    let fits = grammar.min_depth(element).is_some_and(|d| d <= depth);
    if fits {
        return Ok(rng.gen_range(min..=max));
    }
    if min == 0 {
        return Ok(0);
    }
    Err(SynthgpError::ExhaustedBudget {
        symbol: grammar.symbol(element).name().to_string(),
        budget: depth,
        required: grammar.min_depth(element),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_range_accepts_bounds() {
        let h = IntRange::new(-2, 3);
        assert!(h.accepts(&Value::Integer(-2)));
        assert!(h.accepts(&Value::Integer(3)));
        assert!(!h.accepts(&Value::Integer(4)));
        assert!(!h.accepts(&Value::Float(1.0)));
    }

    #[test]
    fn test_var_range_accepts_only_options() {
        let h = VarRange::names(["x", "y"]);
        assert!(h.accepts(&Value::String("y".into())));
        assert!(!h.accepts(&Value::String("z".into())));
    }

    #[test]
    fn test_list_min_depth_is_zero_when_empty_allowed() {
        let h = ListSizeBetween::new(SymbolId(0), 0, 3);
        assert_eq!(h.min_depth(&|_| None), Some(0));
        let h = ListSizeBetween::new(SymbolId(0), 1, 3);
        assert_eq!(h.min_depth(&|_| Some(4)), Some(4));
        assert_eq!(h.min_depth(&|_| None), None);
    }

    #[test]
    fn test_check_rejects_empty_domains() {
        assert!(IntRange::new(3, 1).check().is_err());
        assert!(FloatRange::new(1.0, f64::NAN).check().is_err());
        assert!(VarRange::new(Vec::new()).check().is_err());
        assert!(ListSizeBetween::new(SymbolId(0), 3, 1).check().is_err());
        assert!(ListSizeBetween::new(SymbolId(0), 1, 1).check().is_ok());
    }

    #[test]
    fn test_list_accepts_only_sizes_in_bounds() {
        let h = ListSizeBetween::new(SymbolId(0), 1, 3);
        assert!(h.accepts_subtrees(&[SymbolId(0)], true));
        assert!(h.accepts_subtrees(&[SymbolId(0); 3], true));
        assert!(!h.accepts_subtrees(&[], true));
        assert!(!h.accepts_subtrees(&[SymbolId(0); 4], true));
        assert!(!h.accepts_subtrees(&[SymbolId(1)], true));
        assert!(!h.accepts_subtrees(&[SymbolId(0)], false));
    }

    #[test]
    fn test_draw_list_size_rejects_inverted_bounds() {
        use crate::grammar::GrammarRegistry;
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let mut registry = GrammarRegistry::new();
        let leaf = registry.symbol("Leaf");
        registry.terminal("L", leaf);
        let grammar = registry.build(leaf).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            draw_list_size(&mut rng, &grammar, leaf, 3, 1, 5),
            Err(SynthgpError::Grammar(_))
        ));
        assert_eq!(draw_list_size(&mut rng, &grammar, leaf, 2, 2, 5).unwrap(), 2);
    }
}
