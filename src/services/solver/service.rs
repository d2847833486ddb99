use super::{CancellationFlag, Error, EvaluationContext, RunOutcome, SolverBuilder};
use crate::models::{
    Crossover, Evaluator, Gene, GeneRegistry, Individual, Mutation, Pairing, Population,
    Selection, SolverSettings, Termination, select_top_individuals,
};
use crate::services::observer::Observer;
use rand::{Rng, rngs::StdRng};
use std::sync::Arc;
use tracing::instrument;

/// Generations that must pass before the termination strategy is consulted.
pub const EVALUATION_THRESHOLD: usize = 5;

/// Generational solver: one instance drives one run at a time.
pub struct Solver {
    pub(super) settings: SolverSettings,
    pub(super) prototype: Vec<Gene>,
    pub(super) observer: Arc<Observer>,
    pub(super) owns_observer: bool,
    pub(super) cancellation: CancellationFlag,
    pub(super) rng: StdRng,
}

impl Solver {
    /// `prototype` lists the genes to optimize; their tick counts are
    /// resolved from the registry when a run starts.
    pub fn builder(settings: SolverSettings, prototype: Vec<Gene>) -> SolverBuilder {
        SolverBuilder {
            settings,
            prototype,
            observer: None,
            cancellation: CancellationFlag::default(),
        }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn observer(&self) -> &Arc<Observer> {
        &self.observer
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    #[instrument(level = "info", skip(self, registry, evaluator), fields(population_size = self.settings.population_size(), max_generations = self.settings.max_generations(), genome_length = self.prototype.len()))]
    pub fn run(
        &mut self,
        registry: &mut dyn GeneRegistry,
        evaluator: &dyn Evaluator,
    ) -> Result<RunOutcome, Error> {
        let mut context = EvaluationContext::new(registry, evaluator);

        self.run_with(&mut context).map_err(|err| {
            tracing::error!(err = ?err, evaluations = context.evaluations(), "Solver run aborted");
            err
        })
    }

    fn run_with(&mut self, context: &mut EvaluationContext<'_>) -> Result<RunOutcome, Error> {
        if self.prototype.is_empty() {
            return Err(Error::EmptyGenome);
        }
        if self.owns_observer {
            self.observer.reset();
        }

        let mut current = self.initialize(context)?;
        self.observer.set_population(current.clone());

        let mut generation = 0;
        let mut terminated = false;
        for next_generation in 1..self.settings.max_generations() {
            if self.cancellation.is_cancelled() {
                tracing::info!(generation = generation, "Solver run cancelled");
                return Ok(RunOutcome::Cancelled {
                    best: best_of(&current)?,
                    generations: generation,
                });
            }

            let mut next = self.breed(&current)?;

            // Trimmed on the fitness the individuals carried in from the
            // previous generation. Fresh offspring count as zero.
            next.trim_to(self.settings.population_size());

            context.evaluate_population(&mut next, next_generation)?;
            self.observer.set_population(next.clone());
            self.observer.update_generation_counter();

            current = next;
            generation = next_generation;

            tracing::info!(
                generation = generation,
                best_fitness = current.best().map(Individual::fitness_value),
                average_fitness = current.average_fitness(),
                diversity = current.diversity(),
                "Generation evaluated"
            );

            if generation >= EVALUATION_THRESHOLD
                && self
                    .observer
                    .with_statistics(|statistics| self.settings.termination().evaluate(statistics))
            {
                terminated = true;
                break;
            }
        }

        let best = best_of(&current)?;
        if self.cancellation.is_cancelled() {
            tracing::info!(generation = generation, "Solver run cancelled");
            return Ok(RunOutcome::Cancelled {
                best,
                generations: generation,
            });
        }
        context.commit(&best)?;

        Ok(if terminated {
            RunOutcome::Terminated {
                best,
                generations: generation,
            }
        } else {
            RunOutcome::Completed {
                best,
                generations: generation,
            }
        })
    }

    /// Random tick values in `[0, tick_count)`, evaluated as generation 0.
    #[instrument(level = "debug", skip(self, context), fields(population_size = self.settings.population_size()))]
    fn initialize(&mut self, context: &mut EvaluationContext<'_>) -> Result<Population, Error> {
        let genes = context.resolve(&self.prototype)?;

        let mut individuals = Vec::with_capacity(self.settings.population_size());
        for _ in 0..self.settings.population_size() {
            let mut genome = genes.clone();
            for gene in &mut genome {
                if gene.tick_count() > 0 {
                    let value = self.rng.random_range(0..gene.tick_count());
                    gene.mutate_value(value)?;
                }
            }
            individuals.push(Individual::new(genome, 0));
        }

        let mut population = Population::new(individuals);
        context.evaluate_population(&mut population, 0)?;
        Ok(population)
    }

    /// Elites first, then offspring and their mating pools until the
    /// population is full. May overshoot; the caller trims.
    #[instrument(level = "debug", skip(self, current), fields(population_size = current.len(), elite_size = self.settings.elite_size()))]
    fn breed(&mut self, current: &Population) -> Result<Population, Error> {
        let population_size = self.settings.population_size();
        let mut next = Population::new(select_top_individuals(self.settings.elite_size(), current));

        while next.len() < population_size {
            let remaining = population_size - next.len();
            let pool = self.settings.selection().select(
                current,
                remaining.clamp(1, current.len()),
                &mut self.rng,
            )?;

            for (parent1, parent2) in self.settings.pairing().pair_individuals(&pool)? {
                let crossover = self.settings.crossover();
                // A single gene has no cut point, so the parents pass through
                let recombine =
                    parent1.genes().len() > 1 && self.rng.random_bool(crossover.rate());
                let (mut child1, mut child2) = if recombine {
                    crossover.crossover(&parent1, &parent2, &mut self.rng)?
                } else {
                    (parent1, parent2)
                };

                let mutation = self.settings.mutation();
                for child in [&mut child1, &mut child2] {
                    if self.rng.random_bool(mutation.rate()) {
                        mutation.mutate(child, &mut self.rng)?;
                    }
                }

                next.push(child1);
                next.push(child2);
            }

            for individual in pool {
                next.push(individual);
            }
        }

        Ok(next)
    }
}

fn best_of(population: &Population) -> Result<Individual, Error> {
    population.best().cloned().ok_or(Error::EmptyPopulation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Assignment, CrossoverStrategy, DistanceMetric, GeneSlot, MutationStrategy,
        PairingStrategy, SelectionStrategy, TerminationStrategy,
        individual_test_utilities::individual, settings_test_utilities::settings,
    };
    use std::collections::HashMap;
    use uuid::Uuid;

    #[derive(Default)]
    struct Model {
        values: HashMap<Uuid, u32>,
        writes: usize,
    }

    impl GeneRegistry for Model {
        fn tick_count(&self, _slot: &GeneSlot) -> Result<u32, anyhow::Error> {
            Ok(20)
        }

        fn write(&mut self, gene: &Gene) -> Result<(), anyhow::Error> {
            self.values.insert(gene.id(), gene.tick_value());
            self.writes += 1;
            Ok(())
        }
    }

    fn prototype(genes: usize) -> Vec<Gene> {
        (0..genes)
            .map(|i| Gene::new(GeneSlot::slider(Uuid::now_v7()), &format!("Slider {i}"), 1))
            .collect()
    }

    fn sum(assignment: &Assignment) -> Result<f64, anyhow::Error> {
        Ok(1.0 + assignment.values().map(|&value| value as f64).sum::<f64>())
    }

    #[test]
    fn it_runs_every_generation() {
        let mut solver = Solver::builder(settings(12, 8).with_seed(1), prototype(4)).build();
        let mut model = Model::default();

        let outcome = solver.run(&mut model, &sum).unwrap();

        assert_eq!(outcome.generations(), 7);
        assert!(outcome.is_committed());

        let statistics = solver.observer().statistics();
        assert_eq!(statistics.len(), 8);
        assert!(statistics.is_consistent());
        assert_eq!(solver.observer().population().len(), 12);
    }

    #[test]
    fn it_resolves_tick_counts_before_initializing() {
        let mut solver = Solver::builder(settings(10, 2).with_seed(2), prototype(3)).build();
        let mut model = Model::default();

        solver.run(&mut model, &sum).unwrap();

        let population = solver.observer().population();
        for individual in population.individuals() {
            assert!(individual.genes().iter().all(|gene| gene.tick_count() == 20));
        }
    }

    #[test]
    fn it_commits_the_best_individual() {
        let mut solver = Solver::builder(settings(10, 6).with_seed(3), prototype(3)).build();
        let mut model = Model::default();

        let outcome = solver.run(&mut model, &sum).unwrap();

        for gene in outcome.best().genes() {
            assert_eq!(model.values[&gene.id()], gene.tick_value());
        }
        assert_eq!(
            outcome.best().fitness(),
            solver.observer().population().best().and_then(Individual::fitness)
        );
    }

    #[test]
    fn it_never_loses_the_elite() {
        let mut solver = Solver::builder(settings(16, 10).with_seed(4), prototype(5)).build();
        let mut model = Model::default();

        solver.run(&mut model, &sum).unwrap();

        let best = solver.observer().statistics().best_fitness().to_vec();
        assert!(best.windows(2).all(|pair| pair[1] >= pair[0]));
    }

    #[test]
    fn it_is_reproducible_with_a_seed() {
        let genes = prototype(3);
        let run = |seed| {
            let mut solver = Solver::builder(settings(10, 6).with_seed(seed), genes.clone()).build();
            let mut model = Model::default();
            solver.run(&mut model, &sum).unwrap();
            solver.observer().statistics()
        };

        assert_eq!(run(7), run(7));
    }

    #[test]
    fn it_waits_for_the_evaluation_threshold() {
        // Diversity can never exceed the population, so this stops as soon as allowed
        let settings = SolverSettings::new(
            SelectionStrategy::tournament(2).unwrap(),
            CrossoverStrategy::single_point(0.5).unwrap(),
            MutationStrategy::random(0.2).unwrap(),
            PairingStrategy::in_breeding(0.5, DistanceMetric::Manhattan).unwrap(),
            TerminationStrategy::population_diversity(8),
            8,
            50,
            2,
        )
        .unwrap()
        .with_seed(5);
        let mut solver = Solver::builder(settings, prototype(3)).build();
        let mut model = Model::default();

        let outcome = solver.run(&mut model, &sum).unwrap();

        assert!(matches!(outcome, RunOutcome::Terminated { generations: EVALUATION_THRESHOLD, .. }));
        assert_eq!(solver.observer().generation(), EVALUATION_THRESHOLD);
    }

    #[test]
    fn it_stops_at_a_generation_boundary_when_cancelled() {
        let cancellation = CancellationFlag::new();
        cancellation.cancel();

        let mut solver = Solver::builder(settings(10, 6).with_seed(6), prototype(3))
            .with_cancellation(cancellation)
            .build();
        let mut model = Model::default();

        let outcome = solver.run(&mut model, &sum).unwrap();

        assert!(matches!(outcome, RunOutcome::Cancelled { generations: 0, .. }));
        // Only the initial population was written, nothing committed
        assert_eq!(model.writes, 10 * 3);
        assert_eq!(solver.observer().statistics().len(), 1);
    }

    #[test]
    fn it_rejects_an_empty_genome() {
        let mut solver = Solver::builder(settings(10, 6), Vec::new()).build();
        let mut model = Model::default();

        assert!(matches!(
            solver.run(&mut model, &sum),
            Err(Error::EmptyGenome)
        ));
    }

    #[test]
    fn it_keeps_partial_statistics_on_failure() {
        let mut solver = Solver::builder(settings(6, 10).with_seed(8), prototype(2)).build();
        let mut model = Model::default();
        let calls = std::cell::Cell::new(0);
        let flaky = |_: &Assignment| -> Result<f64, anyhow::Error> {
            calls.set(calls.get() + 1);
            if calls.get() > 6 * 3 {
                anyhow::bail!("model crashed");
            }
            Ok(1.0)
        };

        assert!(matches!(
            solver.run(&mut model, &flaky),
            Err(Error::EvaluationError(_))
        ));
        assert_eq!(solver.observer().statistics().len(), 3);
    }

    #[test]
    fn it_cancels_during_the_last_generation_without_committing() {
        let cancellation = CancellationFlag::new();
        let mut solver = Solver::builder(settings(10, 3).with_seed(9), prototype(3))
            .with_cancellation(cancellation.clone())
            .build();
        let mut model = Model::default();
        let calls = std::cell::Cell::new(0);
        let cancelling = |assignment: &Assignment| -> Result<f64, anyhow::Error> {
            calls.set(calls.get() + 1);
            if calls.get() == 2 * 10 + 5 {
                cancellation.cancel();
            }
            sum(assignment)
        };

        let outcome = solver.run(&mut model, &cancelling).unwrap();

        assert!(matches!(outcome, RunOutcome::Cancelled { generations: 2, .. }));
        assert_eq!(model.writes, 3 * 10 * 3);
    }

    #[test]
    fn it_runs_a_single_gene_genome() {
        let mut solver = Solver::builder(settings(10, 6).with_seed(10), prototype(1)).build();
        let mut model = Model::default();

        let outcome = solver.run(&mut model, &sum).unwrap();

        assert_eq!(outcome.generations(), 5);
        assert_eq!(outcome.best().genes().len(), 1);
        assert!(outcome.is_committed());
    }

    #[test]
    fn it_starts_every_run_with_fresh_statistics() {
        let mut solver = Solver::builder(settings(10, 8).with_seed(11), prototype(3)).build();
        let mut model = Model::default();

        let first = solver.run(&mut model, &sum).unwrap();
        let second = solver.run(&mut model, &sum).unwrap();

        assert_eq!(first.generations(), 7);
        assert_eq!(second.generations(), 7);
        assert_eq!(solver.observer().statistics().len(), 8);
        assert_eq!(solver.observer().generation(), 7);
        assert!(solver.observer().reset_at().is_some());
    }

    #[test]
    fn it_leaves_a_shared_observer_alone() {
        let observer = Arc::new(Observer::new());
        let mut solver = Solver::builder(settings(10, 4).with_seed(12), prototype(2))
            .with_observer(observer.clone())
            .build();
        let mut model = Model::default();

        solver.run(&mut model, &sum).unwrap();
        solver.run(&mut model, &sum).unwrap();

        assert_eq!(observer.statistics().len(), 2 * 4);
        assert!(observer.reset_at().is_none());
    }

    #[test]
    fn it_trims_fresh_offspring_before_evaluating() {
        let settings = SolverSettings::new(
            SelectionStrategy::tournament(2).unwrap(),
            CrossoverStrategy::single_point(1.0).unwrap(),
            MutationStrategy::random(0.0).unwrap(),
            PairingStrategy::in_breeding(0.0, DistanceMetric::Euclidean).unwrap(),
            TerminationStrategy::max_generations(5).unwrap(),
            6,
            5,
            0,
        )
        .unwrap()
        .with_seed(13);
        let mut solver = Solver::builder(settings, prototype(3)).build();
        let current = Population::new(
            (1..=6)
                .map(|i| individual(&[i, i + 1, i + 2], Some(i as f64)))
                .collect(),
        );

        let mut next = solver.breed(&current).unwrap();
        let offspring = next
            .individuals()
            .iter()
            .filter(|individual| individual.fitness().is_none())
            .count();
        assert_eq!(next.len(), 3 * 6);
        assert_eq!(offspring, 2 * 6);

        next.trim_to(6);

        // Only the mating pool survives, still carrying last generation's fitness
        assert_eq!(next.len(), 6);
        assert!(next.individuals().iter().all(|individual| individual.fitness().is_some()));
    }
}
