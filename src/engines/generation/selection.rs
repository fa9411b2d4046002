use rand::{Rng, RngCore};

use super::population::{compare_individuals, Individual, Population};
use super::synthesizer::Synthesizer;
use crate::engines::evaluation::Problem;
use crate::error::Result;

/// Tournament selection with replacement; ties go to the first individual drawn.
///
/// A tournament at least as large as the population compares every
/// individual instead of sampling, so it always yields the best one.
pub fn tournament<'p>(
    rng: &mut dyn RngCore,
    population: &'p Population,
    problem: &dyn Problem,
    size: usize,
) -> Option<&'p Individual> {
    let individuals = population.individuals();
    if individuals.is_empty() {
        return None;
    }
    if size >= individuals.len() {
        return population.best(problem);
    }

    let mut winner = &individuals[rng.gen_range(0..individuals.len())];
    for _ in 1..size.max(1) {
        let contender = &individuals[rng.gen_range(0..individuals.len())];
        if contender.rank_key(problem) > winner.rank_key(problem) {
            winner = contender;
        }
    }
    Some(winner)
}

/// The `n` best individuals, copied with their fitness. Ties are ranked the
/// same way as [`Population::sort_by_fitness`] with the same flag.
pub fn elitism(
    population: &Population,
    problem: &dyn Problem,
    n: usize,
    favor_less_deep: bool,
) -> Vec<Individual> {
    let mut ranked: Vec<&Individual> = population.iter().collect();
    ranked.sort_by(|a, b| compare_individuals(a, b, problem, favor_less_deep));
    ranked.into_iter().take(n).cloned().collect()
}

/// `n` freshly synthesized, unevaluated individuals.
pub fn novelty(
    rng: &mut dyn RngCore,
    synthesizer: &Synthesizer,
    n: usize,
) -> Result<Vec<Individual>> {
    (0..n)
        .map(|_| synthesizer.random_tree(rng).map(Individual::new))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::evaluation::{Evaluator, SequentialEvaluator, SingleObjectiveProblem};
    use crate::grammar::{GrammarRegistry, IntRange, Slot};
    use crate::types::Fitness;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn leaf_value(individual: &Individual) -> i64 {
        let tree = individual.tree();
        tree.root_node().value(0).and_then(|v| v.as_i64()).unwrap()
    }

    fn setup(n: usize) -> (Synthesizer, SingleObjectiveProblem, Population) {
        let mut registry = GrammarRegistry::new();
        let root = registry.symbol("Root");
        registry.production("Leaf", root, [("v", Slot::meta(IntRange::new(0, 1000)))]);
        let synthesizer = Synthesizer::new(Arc::new(registry.build(root).unwrap()), 3);
        let problem = SingleObjectiveProblem::new(false, |tree| {
            tree.root_node().value(0).and_then(|v| v.as_f64()).unwrap_or(0.0)
        });
        let mut rng = StdRng::seed_from_u64(1);
        let mut individuals = novelty(&mut rng, &synthesizer, n).unwrap();
        SequentialEvaluator::new()
            .evaluate_all(&problem, &mut individuals)
            .unwrap();
        (synthesizer, problem, Population::new(individuals))
    }

    #[test]
    fn test_tournament_of_whole_population_returns_best() {
        let (_, problem, population) = setup(20);
        let best = population.best(&problem).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..10 {
            let winner = tournament(&mut rng, &population, &problem, 20).unwrap();
            assert_eq!(leaf_value(winner), leaf_value(best));
        }
    }

    #[test]
    fn test_tournament_of_one_is_uniform() {
        let (_, problem, population) = setup(4);
        let mut rng = StdRng::seed_from_u64(9);
        let mut hits = [0usize; 4];
        for _ in 0..4000 {
            let winner = tournament(&mut rng, &population, &problem, 1).unwrap();
            let idx = population
                .iter()
                .position(|i| std::ptr::eq(i, winner))
                .unwrap();
            hits[idx] += 1;
        }
        assert!(hits.iter().all(|h| (800..1200).contains(h)), "{:?}", hits);
    }

    #[test]
    fn test_elitism_copies_the_best_with_fitness() {
        let (_, problem, population) = setup(30);
        let elites = elitism(&population, &problem, 3, false);
        assert_eq!(elites.len(), 3);
        let mut values: Vec<i64> = population.iter().map(leaf_value).collect();
        values.sort_unstable_by(|a, b| b.cmp(a));
        let elite_values: Vec<i64> = elites.iter().map(leaf_value).collect();
        assert_eq!(elite_values, values[..3].to_vec());
        assert!(elites
            .iter()
            .all(|e| matches!(e.fitness(), Some(Fitness::Single(_)))));
    }

    #[test]
    fn test_novelty_is_unevaluated() {
        let (synthesizer, _, _) = setup(1);
        let mut rng = StdRng::seed_from_u64(4);
        let fresh = novelty(&mut rng, &synthesizer, 5).unwrap();
        assert_eq!(fresh.len(), 5);
        assert!(fresh.iter().all(|i| !i.is_evaluated()));
    }

    #[test]
    fn test_elitism_breaks_ties_by_depth_when_asked() {
        use crate::engines::generation::text::parse_tree;

        let mut registry = GrammarRegistry::new();
        let root = registry.symbol("Root");
        registry.production("Leaf", root, [("v", Slot::meta(IntRange::new(0, 9)))]);
        registry.production("Wrap", root, [("inner", Slot::symbol(root))]);
        let grammar = registry.build(root).unwrap();
        let problem = SingleObjectiveProblem::new(false, |_| 0.0);

        let mut individuals: Vec<Individual> = ["Wrap(Wrap(Leaf(1)))", "Leaf(2)"]
            .iter()
            .map(|text| Individual::new(parse_tree(&grammar, root, text).unwrap()))
            .collect();
        SequentialEvaluator::new()
            .evaluate_all(&problem, &mut individuals)
            .unwrap();
        let population = Population::new(individuals);

        let first = elitism(&population, &problem, 1, false);
        assert_eq!(first[0].tree().distance_to_term(), 3);
        let shallow = elitism(&population, &problem, 1, true);
        assert_eq!(shallow[0].tree().distance_to_term(), 1);

        let mut sorted = population.clone();
        sorted.sort_by_fitness(&problem, true);
        assert_eq!(sorted.individuals()[0].tree(), shallow[0].tree());
    }
}
