mod common;

use std::sync::mpsc;

use synthgp::config::{BudgetConfig, EvolutionConfig};
use synthgp::engines::generation::{
    ChannelProgressCallback, EvolutionEngine, GenerationReport, ProgressCallback, ProgressMessage,
    ProviderInitializer, StopReason, TextProvider,
};
use synthgp::{Result, SingleObjectiveProblem};

/// Progress callback recording what the engine reports
#[derive(Default)]
struct TestProgressCallback {
    started: Vec<usize>,
    completed: Vec<(usize, f64, usize)>,
    ended: bool,
}

impl ProgressCallback for &mut TestProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        self.started.push(generation);
    }

    fn on_generation_complete(&mut self, report: &GenerationReport<'_>) -> Result<()> {
        self.completed
            .push((report.generation, report.best_overall, report.population.len()));
        Ok(())
    }

    fn on_evolution_end(&mut self) -> Result<()> {
        self.ended = true;
        Ok(())
    }
}

fn forty_two() -> SingleObjectiveProblem {
    SingleObjectiveProblem::new(false, |tree| -(common::evaluate_number(tree) - 42.0).abs())
}

fn scenario_config(seed: u64) -> EvolutionConfig {
    EvolutionConfig {
        population_size: 50,
        max_depth: 8,
        p_mutation: 0.2,
        seed: Some(seed),
        ..Default::default()
    }
}

fn generations(n: usize) -> BudgetConfig {
    BudgetConfig {
        max_generations: Some(n),
        ..Default::default()
    }
}

#[test]
fn test_evolves_numbers_close_to_42() {
    let tolerance = 2.0;
    let mut close = 0;
    for seed in 1..=5 {
        let mut engine = EvolutionEngine::new(
            scenario_config(seed),
            generations(20),
            common::number_grammar(),
            forty_two(),
        )
        .unwrap();
        let result = engine.run(()).unwrap();

        let best = result.fitness.as_single().unwrap();
        assert!(best.is_finite() && best <= 0.0, "seed {}: fitness {}", seed, best);
        assert_eq!(result.generations, 20);
        assert_eq!(result.stop_reason, StopReason::MaxGenerations);
        if (common::evaluate_number(&result.tree) - 42.0).abs() <= tolerance {
            close += 1;
        }
    }
    assert!(close >= 3, "only {} of 5 runs ended within {}", close, tolerance);
}

#[test]
fn test_callbacks_see_every_generation() {
    let mut recorder = TestProgressCallback::default();
    let mut engine = EvolutionEngine::new(
        scenario_config(7),
        generations(5),
        common::number_grammar(),
        forty_two(),
    )
    .unwrap();
    engine.run(&mut recorder).unwrap();

    assert_eq!(recorder.started, vec![1, 2, 3, 4, 5]);
    assert!(recorder.ended);
    assert!(recorder.completed.iter().all(|(_, _, size)| *size == 50));
    // elitism keeps the best individual, so the best never gets worse
    for pair in recorder.completed.windows(2) {
        assert!(pair[1].1 >= pair[0].1);
    }
}

#[test]
fn test_channel_callback_reports_progress() {
    let (sender, receiver) = mpsc::channel();
    let mut engine = EvolutionEngine::new(
        scenario_config(3),
        generations(2),
        common::number_grammar(),
        forty_two(),
    )
    .unwrap();
    engine.run(ChannelProgressCallback::new(sender)).unwrap();

    let messages: Vec<ProgressMessage> = receiver.try_iter().collect();
    assert_eq!(messages.first(), Some(&ProgressMessage::GenerationStart(1)));
    assert_eq!(messages.last(), Some(&ProgressMessage::Finished));
    let completed = messages
        .iter()
        .filter(|m| matches!(m, ProgressMessage::GenerationComplete { .. }))
        .count();
    assert_eq!(completed, 2);
}

#[test]
fn test_provider_seeded_run_can_finish_immediately() {
    let grammar = common::number_grammar();
    let provider = TextProvider::new([
        "Plus(Plus(Plus(Literal(9.0), Literal(9.0)), Plus(Literal(9.0), Literal(9.0))), Literal(6.0))",
    ]);
    let problem = forty_two().with_target(0.0);
    let mut engine = EvolutionEngine::new(scenario_config(11), generations(50), grammar, problem)
        .unwrap()
        .with_initializer(ProviderInitializer::new(provider));
    let result = engine.run(()).unwrap();

    assert_eq!(result.stop_reason, StopReason::TargetReached);
    assert_eq!(result.generations, 0);
    assert_eq!(result.evaluations, 50);
    assert_eq!(common::evaluate_number(&result.tree), 42.0);
}

#[test]
fn test_evaluation_budget_stops_the_run() {
    let mut engine = EvolutionEngine::new(
        scenario_config(5),
        BudgetConfig {
            max_generations: None,
            time_limit_secs: None,
            max_evaluations: Some(200),
        },
        common::number_grammar(),
        forty_two(),
    )
    .unwrap();
    let result = engine.run(()).unwrap();
    assert_eq!(result.stop_reason, StopReason::MaxEvaluations);
    assert!(result.evaluations >= 200);
    // at most one generation past the limit, minus the copied elites
    assert!(result.evaluations < 200 + 50);
}
