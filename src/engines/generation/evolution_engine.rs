use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;

use super::budget::{Budget, BudgetState, StopReason};
use super::hall_of_fame::{Elite, HallOfFame};
use super::initializer::{PopulationInitializer, RandomInitializer};
use super::operators::{crossover, mutate};
use super::population::{compare_individuals, Individual, Population};
use super::progress::{GenerationReport, ProgressCallback, RunMetadata};
use super::selection::{elitism, novelty, tournament};
use super::synthesizer::Synthesizer;
use super::tree::Tree;
use crate::config::{BudgetConfig, ConfigSection, EvolutionConfig, RunConfig};
use crate::engines::evaluation::{Evaluator, ParallelEvaluator, Problem, SequentialEvaluator};
use crate::error::{Result, SynthgpError};
use crate::grammar::GrammarModel;
use crate::types::Fitness;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Initializing,
    Evolving,
    Finished,
}

/// Outcome of a run: the best individual of the final generation plus run statistics.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best: Individual,
    pub fitness: Fitness,
    pub tree: Tree,
    pub generations: usize,
    pub evaluations: usize,
    pub elapsed: Duration,
    pub stop_reason: StopReason,
    pub seed: u64,
    pub hall_of_fame: Vec<Elite>,
}

pub struct EvolutionEngine {
    config: EvolutionConfig,
    budget_config: BudgetConfig,
    grammar: Arc<GrammarModel>,
    synthesizer: Synthesizer,
    problem: Box<dyn Problem>,
    evaluator: Box<dyn Evaluator>,
    initializer: Box<dyn PopulationInitializer>,
    hall_of_fame: HallOfFame,
    forced_individual: Option<Tree>,
    seed: u64,
    rng: StdRng,
    state: EngineState,
    population: Population,
}

impl EvolutionEngine {
    pub fn new<P: Problem + 'static>(
        config: EvolutionConfig,
        budget_config: BudgetConfig,
        grammar: Arc<GrammarModel>,
        problem: P,
    ) -> Result<Self> {
        config.validate()?;
        budget_config.validate()?;

        let root = grammar.root();
        let required = grammar.min_depth(root);
        if required.map_or(true, |d| d > config.max_depth) {
            return Err(SynthgpError::ExhaustedBudget {
                symbol: grammar.symbol(root).name().to_string(),
                budget: config.max_depth,
                required,
            });
        }

        let seed = config.seed.unwrap_or_else(rand::random);
        let evaluator: Box<dyn Evaluator> = if config.parallel_evaluation {
            Box::new(ParallelEvaluator::new())
        } else {
            Box::new(SequentialEvaluator::new())
        };

        Ok(Self {
            synthesizer: Synthesizer::new(grammar.clone(), config.max_depth),
            hall_of_fame: HallOfFame::new(config.hall_of_fame_size),
            rng: StdRng::seed_from_u64(seed),
            config,
            budget_config,
            grammar,
            problem: Box::new(problem),
            evaluator,
            initializer: Box::new(RandomInitializer),
            forced_individual: None,
            seed,
            state: EngineState::Initializing,
            population: Population::default(),
        })
    }

    pub fn from_run_config<P: Problem + 'static>(
        run_config: &RunConfig,
        grammar: Arc<GrammarModel>,
        problem: P,
    ) -> Result<Self> {
        Self::new(
            run_config.evolution.clone(),
            run_config.budget.clone(),
            grammar,
            problem,
        )
    }

    pub fn with_initializer<I: PopulationInitializer + 'static>(mut self, initializer: I) -> Self {
        self.initializer = Box::new(initializer);
        self
    }

    pub fn with_evaluator<E: Evaluator + 'static>(mut self, evaluator: E) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    /// Places `tree` in the first slot of the initial population.
    pub fn force_individual(mut self, tree: Tree) -> Result<Self> {
        tree.validate(&self.grammar)?;
        if tree.symbol() != self.grammar.root() {
            return Err(SynthgpError::InvalidTree(format!(
                "forced individual expands {}, expected {}",
                self.grammar.symbol(tree.symbol()).name(),
                self.grammar.symbol(self.grammar.root()).name()
            )));
        }
        if tree.distance_to_term() > self.config.max_depth {
            return Err(SynthgpError::InvalidTree(format!(
                "forced individual has depth {}, limit is {}",
                tree.distance_to_term(),
                self.config.max_depth
            )));
        }
        self.forced_individual = Some(tree);
        Ok(self)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn grammar(&self) -> &GrammarModel {
        &self.grammar
    }

    /// Current population, sorted best first once the run has started.
    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn get_hall_of_fame(&self) -> &HallOfFame {
        &self.hall_of_fame
    }

    pub fn number_of_evaluations(&self) -> usize {
        self.evaluator.number_of_evaluations()
    }

    /// Run the evolution process
    pub fn run<C: ProgressCallback>(&mut self, mut callback: C) -> Result<SearchResult> {
        self.state = EngineState::Initializing;
        let metadata = RunMetadata {
            seed: self.seed,
            started_at: Utc::now(),
            population_size: self.config.population_size,
            max_depth: self.config.max_depth,
        };
        log::info!(
            "Starting evolution: population {}, max depth {}, seed {}",
            metadata.population_size,
            metadata.max_depth,
            metadata.seed
        );

        let mut budget = Budget::new(&self.budget_config);
        let mut population = self.initial_population()?;
        self.evaluator
            .evaluate_all(self.problem.as_ref(), population.individuals_mut())?;
        population.sort_by_fitness(self.problem.as_ref(), self.config.favor_less_deep_trees);
        self.record(&population, &mut budget, false)?;

        self.state = EngineState::Evolving;
        let stop_reason = loop {
            if let BudgetState::Done(reason) = budget.state(self.problem.as_ref()) {
                break reason;
            }
            let generation = budget.generation() + 1;
            callback.on_generation_start(generation);

            population = self.next_generation(&population)?;
            self.evaluator
                .evaluate_all(self.problem.as_ref(), population.individuals_mut())?;
            population.sort_by_fitness(self.problem.as_ref(), self.config.favor_less_deep_trees);
            self.record(&population, &mut budget, true)?;

            let best = best_of(&population)?;
            let report = GenerationReport {
                generation,
                population: &population,
                best,
                best_overall: best.rank_key(self.problem.as_ref()),
                evaluations: self.evaluator.number_of_evaluations(),
                hall_of_fame_size: self.hall_of_fame.len(),
                elapsed: budget.elapsed(),
                metadata: &metadata,
                grammar: &self.grammar,
                problem: self.problem.as_ref(),
            };
            callback.on_generation_complete(&report)?;
        };
        callback.on_evolution_end()?;
        self.state = EngineState::Finished;

        let best = best_of(&population)?.clone();
        let fitness = best
            .fitness()
            .cloned()
            .ok_or_else(|| SynthgpError::Evaluation("best individual has no fitness".to_string()))?;
        log::info!(
            "Evolution finished after {} generations ({}): best fitness {}",
            budget.generation(),
            stop_reason,
            fitness
        );

        let result = SearchResult {
            tree: best.tree().clone(),
            best,
            fitness,
            generations: budget.generation(),
            evaluations: self.evaluator.number_of_evaluations(),
            elapsed: budget.elapsed(),
            stop_reason,
            seed: self.seed,
            hall_of_fame: self.hall_of_fame.get_all().to_vec(),
        };
        self.population = population;
        Ok(result)
    }

    fn initial_population(&mut self) -> Result<Population> {
        let size = self.config.population_size;
        let trees = self
            .initializer
            .initialize(&mut self.rng, &self.synthesizer, size)?;
        if trees.len() != size {
            return Err(SynthgpError::InvalidTree(format!(
                "initializer produced {} trees, expected {}",
                trees.len(),
                size
            )));
        }
        let mut individuals: Vec<Individual> = trees.into_iter().map(Individual::new).collect();
        if let Some(forced) = &self.forced_individual {
            individuals[0] = Individual::new(forced.clone());
        }
        Ok(Population::new(individuals))
    }

    /// Updates hall of fame and budget with a freshly sorted population.
    fn record(&mut self, population: &Population, budget: &mut Budget, new_generation: bool) -> Result<()> {
        let problem = self.problem.as_ref();
        let generation = budget.generation() + usize::from(new_generation);
        for individual in population.iter() {
            if let Some(fitness) = individual.fitness() {
                self.hall_of_fame.consider(
                    &self.grammar,
                    individual.tree(),
                    fitness,
                    problem.overall_fitness(fitness),
                    generation,
                );
            }
        }

        let best = best_of(population)?;
        let fitness = best
            .fitness()
            .ok_or_else(|| SynthgpError::Evaluation("population was not evaluated".to_string()))?;
        let evaluations = self.evaluator.number_of_evaluations();
        if new_generation {
            budget.record_generation(problem, fitness, evaluations);
        } else {
            budget.observe(problem, fitness, evaluations);
        }
        log::debug!(
            "generation {}: best {} (depth {}, {} nodes), {} evaluations",
            generation,
            fitness,
            best.tree().distance_to_term(),
            best.tree().node_count(),
            evaluations
        );
        Ok(())
    }

    fn next_generation(&mut self, population: &Population) -> Result<Population> {
        let mut breeder = Breeder {
            config: &self.config,
            grammar: &self.grammar,
            problem: self.problem.as_ref(),
            evaluator: self.evaluator.as_ref(),
            rng: &mut self.rng,
        };

        let size = self.config.population_size;
        let mut next = Vec::with_capacity(size);
        next.extend(elitism(
            population,
            breeder.problem,
            self.config.n_elites,
            self.config.favor_less_deep_trees,
        ));
        next.extend(novelty(&mut *breeder.rng, &self.synthesizer, self.config.n_novelties)?);

        while next.len() < size {
            let (first, second) = breeder.offspring(population)?;
            next.push(first);
            if next.len() < size {
                next.push(second);
            }
        }
        Ok(Population::new(next))
    }
}

fn best_of(population: &Population) -> Result<&Individual> {
    // the population is sorted best first
    population
        .individuals()
        .first()
        .ok_or_else(|| SynthgpError::Configuration("empty population".to_string()))
}

/// Borrowed view of the engine used while filling one generation.
struct Breeder<'a> {
    config: &'a EvolutionConfig,
    grammar: &'a GrammarModel,
    problem: &'a dyn Problem,
    evaluator: &'a dyn Evaluator,
    rng: &'a mut StdRng,
}

impl Breeder<'_> {
    fn select<'p>(&mut self, population: &'p Population) -> Result<&'p Individual> {
        tournament(&mut *self.rng, population, self.problem, self.config.tournament_size)
            .ok_or_else(|| SynthgpError::Configuration("empty population".to_string()))
    }

    fn offspring(&mut self, population: &Population) -> Result<(Individual, Individual)> {
        let a = self.select(population)?;
        let b = self.select(population)?;

        let (first, second) = if self.rng.gen::<f64>() < self.config.p_crossover {
            let (x, y) = crossover(
                &mut *self.rng,
                self.grammar,
                a.tree(),
                b.tree(),
                self.config.max_depth,
            )?;
            (Individual::new(x), Individual::new(y))
        } else {
            (a.clone(), b.clone())
        };
        Ok((self.maybe_mutate(first)?, self.maybe_mutate(second)?))
    }

    fn maybe_mutate(&mut self, individual: Individual) -> Result<Individual> {
        if self.rng.gen::<f64>() >= self.config.p_mutation {
            return Ok(individual);
        }
        let candidates = self.config.hill_climbing_candidates;
        if candidates <= 1 {
            let tree = mutate(&mut *self.rng, self.grammar, individual.tree(), self.config.max_depth)?;
            return Ok(Individual::new(tree));
        }

        // hill climbing: evaluate several mutants and keep the fittest
        let mut mutants = (0..candidates)
            .map(|_| {
                mutate(&mut *self.rng, self.grammar, individual.tree(), self.config.max_depth)
                    .map(Individual::new)
            })
            .collect::<Result<Vec<_>>>()?;
        self.evaluator.evaluate_all(self.problem, &mut mutants)?;
        let problem = self.problem;
        let favor = self.config.favor_less_deep_trees;
        mutants.sort_by(|a, b| compare_individuals(a, b, problem, favor));
        mutants
            .into_iter()
            .next()
            .ok_or_else(|| SynthgpError::Configuration("no mutants produced".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::evaluation::SingleObjectiveProblem;
    use crate::engines::generation::text::parse_tree;
    use crate::grammar::{GrammarRegistry, IntRange, Slot};

    /// Sum ::= Num(0..9) | Add(Sum, Sum); fitness is the value, maximised.
    fn sum_grammar() -> Arc<GrammarModel> {
        let mut registry = GrammarRegistry::new();
        let sum = registry.symbol("Sum");
        registry.production("Num", sum, [("v", Slot::meta(IntRange::new(0, 9)))]);
        registry.production("Add", sum, [("l", Slot::symbol(sum)), ("r", Slot::symbol(sum))]);
        Arc::new(registry.build(sum).unwrap())
    }

    fn value(tree: &Tree, id: crate::engines::generation::tree::NodeId) -> f64 {
        let node = tree.node(id);
        match node.value(0) {
            Some(v) => v.as_f64().unwrap_or(0.0),
            None => node.subnodes().map(|c| value(tree, c)).sum(),
        }
    }

    fn sum_problem() -> SingleObjectiveProblem {
        SingleObjectiveProblem::new(false, |tree| value(tree, tree.root()))
    }

    fn small_config() -> EvolutionConfig {
        EvolutionConfig {
            population_size: 21,
            max_depth: 4,
            n_elites: 2,
            n_novelties: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_population_size_is_exact_with_odd_remainder() {
        let mut engine = EvolutionEngine::new(
            small_config(),
            BudgetConfig {
                max_generations: Some(3),
                ..Default::default()
            },
            sum_grammar(),
            sum_problem(),
        )
        .unwrap();
        let result = engine.run(()).unwrap();
        assert_eq!(engine.state(), EngineState::Finished);
        assert_eq!(engine.population().len(), 21);
        assert_eq!(result.generations, 3);
        assert_eq!(result.stop_reason, StopReason::MaxGenerations);
    }

    #[test]
    fn test_elitism_never_loses_the_best() {
        let grammar = sum_grammar();
        let mut engine = EvolutionEngine::new(
            small_config(),
            BudgetConfig {
                max_generations: Some(1),
                ..Default::default()
            },
            grammar.clone(),
            sum_problem(),
        )
        .unwrap()
        .force_individual(
            parse_tree(&grammar, grammar.root(), "Add(Add(Num(9), Num(9)), Add(Num(9), Num(9)))").unwrap(),
        )
        .unwrap();
        let result = engine.run(()).unwrap();
        // the forced tree scores 36 and elitism keeps it or something better
        assert!(result.fitness.as_single().unwrap() >= 36.0);
        assert!(result.hall_of_fame[0].overall_fitness >= 36.0);
    }

    #[test]
    fn test_same_seed_same_result() {
        let run = || {
            let mut engine = EvolutionEngine::new(
                EvolutionConfig {
                    hill_climbing_candidates: 3,
                    p_mutation: 0.5,
                    ..small_config()
                },
                BudgetConfig {
                    max_generations: Some(4),
                    ..Default::default()
                },
                sum_grammar(),
                sum_problem(),
            )
            .unwrap();
            engine.run(()).unwrap()
        };
        let (a, b) = (run(), run());
        assert_eq!(a.tree, b.tree);
        assert_eq!(a.evaluations, b.evaluations);
    }

    #[test]
    fn test_target_stops_early() {
        let mut engine = EvolutionEngine::new(
            small_config(),
            BudgetConfig {
                max_generations: Some(1000),
                ..Default::default()
            },
            sum_grammar(),
            sum_problem().with_target(0.0),
        )
        .unwrap();
        let result = engine.run(()).unwrap();
        assert_eq!(result.stop_reason, StopReason::TargetReached);
        assert_eq!(result.generations, 0);
    }

    #[test]
    fn test_depth_limit_below_root_minimum_is_rejected() {
        let mut registry = GrammarRegistry::new();
        let root = registry.symbol("Root");
        let leaf = registry.symbol("Leaf");
        registry.production("Wrap", root, [("x", Slot::symbol(leaf))]);
        registry.terminal("L", leaf);
        let grammar = Arc::new(registry.build(root).unwrap());
        let err = EvolutionEngine::new(
            EvolutionConfig {
                max_depth: 1,
                ..small_config()
            },
            BudgetConfig::default(),
            grammar,
            SingleObjectiveProblem::new(false, |_| 0.0),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SynthgpError::ExhaustedBudget { required: Some(2), .. }));
    }

    #[test]
    fn test_forced_individual_deeper_than_limit_is_rejected() {
        let grammar = sum_grammar();
        // depth 4 against a limit of 3
        let deep = parse_tree(&grammar, grammar.root(), "Add(Add(Add(Num(1), Num(2)), Num(3)), Num(4))").unwrap();
        let result = EvolutionEngine::new(
            EvolutionConfig {
                max_depth: 3,
                ..small_config()
            },
            BudgetConfig::default(),
            grammar,
            sum_problem(),
        )
        .unwrap()
        .force_individual(deep);
        assert!(matches!(result, Err(SynthgpError::InvalidTree(_))));
    }

    #[test]
    fn test_unrepresentable_time_limit_is_a_configuration_error() {
        let result = EvolutionEngine::new(
            small_config(),
            BudgetConfig {
                time_limit_secs: Some(1e300),
                ..Default::default()
            },
            sum_grammar(),
            sum_problem(),
        );
        assert!(matches!(result, Err(SynthgpError::Configuration(_))));
    }
}
