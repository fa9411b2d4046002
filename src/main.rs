use std::sync::Arc;

use synthgp::config::ConfigManager;
use synthgp::engines::generation::{
    CallbackList, ConsoleProgressCallback, CsvRunLog, EvolutionEngine, NodeId, Tree,
};
use synthgp::grammar::{GrammarModel, GrammarRegistry, Slot};
use synthgp::SingleObjectiveProblem;

const TARGET: f64 = 64.0;

/// Number ::= One | Add(Number, Number) | Sub(Number, Number) | Mul(Number, Number)
fn number_grammar() -> synthgp::Result<GrammarModel> {
    let mut registry = GrammarRegistry::new();
    let number = registry.symbol("Number");
    registry.terminal("One", number);
    for op in ["Add", "Sub", "Mul"] {
        registry.production(
            op,
            number,
            [("left", Slot::symbol(number)), ("right", Slot::symbol(number))],
        );
    }
    registry.build(number)
}

fn eval(grammar: &GrammarModel, tree: &Tree, id: NodeId) -> f64 {
    let node = tree.node(id);
    let mut operands = node.subnodes().map(|c| eval(grammar, tree, c));
    let mut next = || operands.next().unwrap_or(0.0);
    match grammar.production(node.production()).name() {
        "Add" => next() + next(),
        "Sub" => next() - next(),
        "Mul" => next() * next(),
        _ => 1.0,
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let manager = ConfigManager::new();
    if let Some(path) = std::env::args().nth(1) {
        manager.load_from_file(&path)?;
    }
    let run_config = manager.get();

    let grammar = Arc::new(number_grammar()?);
    let fitness_grammar = grammar.clone();
    let problem = SingleObjectiveProblem::new(true, move |tree| {
        (TARGET - eval(&fitness_grammar, tree, tree.root())).abs()
    })
    .with_target(0.0);

    let mut callbacks = CallbackList::new().with(ConsoleProgressCallback);
    if let Some(run_log) = CsvRunLog::from_config(&run_config.run_log)? {
        callbacks.push(Box::new(run_log));
    }

    let mut engine = EvolutionEngine::from_run_config(&run_config, grammar.clone(), problem)?;
    let result = engine.run(callbacks)?;

    println!("{}", result.tree.to_text(&grammar));
    println!(
        "value {} | fitness {} | {} generations, {} evaluations, {:.2?} ({})",
        eval(&grammar, &result.tree, result.tree.root()),
        result.fitness,
        result.generations,
        result.evaluations,
        result.elapsed,
        result.stop_reason
    );
    Ok(())
}
