use super::Error;
use crate::models::{Evaluator, Gene, GeneRegistry, Individual, Population};
use tracing::instrument;

/// Everything one run needs to reach the outside world.
///
/// Owns nothing global: the registry and evaluator are borrowed for the
/// duration of a single run, so concurrent runs never share fitness state.
pub struct EvaluationContext<'a> {
    registry: &'a mut dyn GeneRegistry,
    evaluator: &'a dyn Evaluator,
    evaluations: usize,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(registry: &'a mut dyn GeneRegistry, evaluator: &'a dyn Evaluator) -> Self {
        Self {
            registry,
            evaluator,
            evaluations: 0,
        }
    }

    /// Number of fitness calls made through this context.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Rebuilds the prototype genes with their live tick counts.
    #[instrument(level = "debug", skip(self, prototype), fields(genome_length = prototype.len()))]
    pub fn resolve(&self, prototype: &[Gene]) -> Result<Vec<Gene>, Error> {
        prototype
            .iter()
            .map(|gene| {
                let tick_count = self
                    .registry
                    .tick_count(gene.slot())
                    .map_err(Error::RegistryError)?;
                Ok(gene.resolved(tick_count))
            })
            .collect()
    }

    /// Pushes the genes into the model, then scores them.
    pub fn evaluate(&mut self, individual: &mut Individual) -> Result<f64, Error> {
        self.write(individual)?;

        // This is a long running call!
        let fitness = self
            .evaluator
            .fitness(&individual.assignment())
            .map_err(Error::EvaluationError)?;
        self.evaluations += 1;

        if !fitness.is_finite() {
            return Err(Error::NonFiniteFitness(fitness));
        }

        individual.set_fitness(fitness);
        Ok(fitness)
    }

    #[instrument(level = "debug", skip(self, population), fields(population_size = population.len(), generation = generation))]
    pub fn evaluate_population(
        &mut self,
        population: &mut Population,
        generation: usize,
    ) -> Result<(), Error> {
        for individual in population.individuals_mut() {
            self.evaluate(individual)?;
            individual.set_generation(generation);
        }
        Ok(())
    }

    /// Leaves the model in the state described by `best`.
    #[instrument(level = "info", skip(self, best), fields(fitness = ?best.fitness(), generation = best.generation()))]
    pub fn commit(&mut self, best: &Individual) -> Result<(), Error> {
        self.write(best)
    }

    fn write(&mut self, individual: &Individual) -> Result<(), Error> {
        for gene in individual.genes() {
            self.registry.write(gene).map_err(Error::RegistryError)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, GeneSlot, individual_test_utilities::individual};
    use std::collections::HashMap;
    use uuid::Uuid;

    #[derive(Default)]
    struct Model {
        tick_counts: HashMap<Uuid, u32>,
        written: Vec<(Uuid, u32)>,
    }

    impl GeneRegistry for Model {
        fn tick_count(&self, slot: &GeneSlot) -> Result<u32, anyhow::Error> {
            self.tick_counts
                .get(&slot.template_id())
                .copied()
                .ok_or_else(|| anyhow::anyhow!("unknown slot {}", slot.template_id()))
        }

        fn write(&mut self, gene: &Gene) -> Result<(), anyhow::Error> {
            self.written.push((gene.id(), gene.tick_value()));
            Ok(())
        }
    }

    fn sum(assignment: &Assignment) -> Result<f64, anyhow::Error> {
        Ok(assignment.values().map(|&value| value as f64).sum())
    }

    #[test]
    fn it_resolves_live_tick_counts() {
        let template = Uuid::now_v7();
        let mut model = Model::default();
        model.tick_counts.insert(template, 42);

        let prototype = vec![Gene::new(GeneSlot::slider(template), "Radius", 10)];
        let context = EvaluationContext::new(&mut model, &sum);

        let resolved = context.resolve(&prototype).unwrap();
        assert_eq!(resolved[0].id(), prototype[0].id());
        assert_eq!(resolved[0].tick_count(), 42);
    }

    #[test]
    fn it_reports_unknown_slots() {
        let mut model = Model::default();
        let prototype = vec![Gene::new(GeneSlot::slider(Uuid::now_v7()), "Radius", 10)];
        let context = EvaluationContext::new(&mut model, &sum);

        assert!(matches!(
            context.resolve(&prototype),
            Err(Error::RegistryError(_))
        ));
    }

    #[test]
    fn it_writes_before_evaluating() {
        let mut model = Model::default();
        let mut candidate = individual(&[1, 2, 3], None);

        let mut context = EvaluationContext::new(&mut model, &sum);
        assert_eq!(context.evaluate(&mut candidate).unwrap(), 6.0);
        assert_eq!(context.evaluations(), 1);
        drop(context);

        assert_eq!(candidate.fitness(), Some(6.0));
        assert_eq!(model.written.len(), 3);
    }

    #[test]
    fn it_tags_the_generation() {
        let mut model = Model::default();
        let mut population =
            Population::new(vec![individual(&[1, 1], None), individual(&[2, 2], None)]);

        let mut context = EvaluationContext::new(&mut model, &sum);
        context.evaluate_population(&mut population, 7).unwrap();

        assert_eq!(context.evaluations(), 2);
        assert!(population.individuals().iter().all(|i| i.generation() == 7));
        assert_eq!(population.total_fitness(), 6.0);
    }

    #[test]
    fn it_propagates_evaluation_failures() {
        let mut model = Model::default();
        let failing = |_: &Assignment| -> Result<f64, anyhow::Error> { anyhow::bail!("solver crashed") };
        let mut candidate = individual(&[1], None);

        let mut context = EvaluationContext::new(&mut model, &failing);
        assert!(matches!(
            context.evaluate(&mut candidate),
            Err(Error::EvaluationError(_))
        ));
        assert_eq!(context.evaluations(), 0);
        assert_eq!(candidate.fitness(), None);
    }

    #[test]
    fn it_rejects_non_finite_fitness() {
        let mut model = Model::default();
        let diverging = |_: &Assignment| -> Result<f64, anyhow::Error> { Ok(f64::INFINITY) };
        let mut candidate = individual(&[1], None);

        let mut context = EvaluationContext::new(&mut model, &diverging);
        assert!(matches!(
            context.evaluate(&mut candidate),
            Err(Error::NonFiniteFitness(fitness)) if fitness.is_infinite()
        ));
        assert_eq!(candidate.fitness(), None);
    }
}
