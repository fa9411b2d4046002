#![allow(dead_code)]

use std::sync::Arc;

use synthgp::engines::generation::{NodeId, Tree};
use synthgp::grammar::{FloatRange, GrammarModel, GrammarRegistry, ListSizeBetween, Slot, VarRange};

/// Number ::= Literal(float in [0, 10)) | Plus(Number, Number)
pub fn number_grammar() -> Arc<GrammarModel> {
    let mut registry = GrammarRegistry::new();
    let number = registry.symbol("Number");
    registry.production("Literal", number, [("value", Slot::meta(FloatRange::new(0.0, 10.0)))]);
    registry.production(
        "Plus",
        number,
        [("left", Slot::symbol(number)), ("right", Slot::symbol(number))],
    );
    Arc::new(registry.build(number).unwrap())
}

/// Value of a number-grammar tree: literals summed.
pub fn evaluate_number(tree: &Tree) -> f64 {
    fn go(tree: &Tree, id: NodeId) -> f64 {
        let node = tree.node(id);
        match node.value(0) {
            Some(v) => v.as_f64().unwrap_or(0.0),
            None => node.subnodes().map(|c| go(tree, c)).sum(),
        }
    }
    go(tree, tree.root())
}

/// A small typed language exercising every slot kind.
///
/// ```text
/// Program ::= Block(ListSizeBetween(Stmt, 1, 3))
/// Stmt    ::= Assign(VarRange, Expr) | When(Cond, Program)
/// Expr    ::= Lit(float) | Var(VarRange) | Neg(Expr) | Sum(list[Expr; 1..=3])
/// Cond    ::= Less(Expr, Expr) | Always
/// ```
pub fn program_grammar() -> Arc<GrammarModel> {
    let mut registry = GrammarRegistry::new();
    let program = registry.symbol("Program");
    let stmt = registry.symbol("Stmt");
    let expr = registry.symbol("Expr");
    let cond = registry.symbol("Cond");
    registry.production("Block", program, [("body", Slot::meta(ListSizeBetween::new(stmt, 1, 3)))]);
    registry.production(
        "Assign",
        stmt,
        [("target", Slot::meta(VarRange::names(["x", "y"]))), ("value", Slot::symbol(expr))],
    );
    registry.production("When", stmt, [("cond", Slot::symbol(cond)), ("then", Slot::symbol(program))]);
    registry.production("Lit", expr, [("value", Slot::meta(FloatRange::new(-5.0, 5.0)))]);
    registry.production("Var", expr, [("name", Slot::meta(VarRange::names(["x", "y"])))]);
    registry.production("Neg", expr, [("inner", Slot::symbol(expr))]);
    registry.production("Sum", expr, [("terms", Slot::list(expr, 1, 3))]);
    registry.production("Less", cond, [("left", Slot::symbol(expr)), ("right", Slot::symbol(expr))]);
    registry.terminal("Always", cond);
    Arc::new(registry.build(program).unwrap())
}
