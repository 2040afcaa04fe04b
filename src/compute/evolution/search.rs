//! Generational multi-objective search over block architectures.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::compute::architecture::BlockArchitecture;
use crate::compute::error::NasError;
use crate::compute::rng::NasRng;
use crate::schema::{
    EvolutionConfig, EvolutionProgress, EvolutionStats, FailurePolicy, GenerationStats, Logbook,
};

use super::evaluator::{
    EvaluationError, EvaluationOutcome, EvaluationRequest, Evaluator, apply_filter,
};
use super::individual::Individual;
use super::logger::RunLogger;
use super::record::IndividualRecord;
use super::selection::{ParetoFront, assign_crowding_distance, select_tournament_dcd};

/// Custom mapping from evaluator outcome to fitness values.
pub type FitnessFn = Box<dyn Fn(&EvaluationOutcome) -> Vec<f64> + Send + Sync>;

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct EvolutionResult {
    /// Final population.
    pub population: Vec<Individual>,
    /// Every non-dominated individual seen during the run.
    pub hall_of_fame: ParetoFront,
    /// Per-generation statistics.
    pub logbook: Logbook,
    pub stats: EvolutionStats,
    /// Saved individual record, when enabled.
    pub record_path: Option<PathBuf>,
}

/// Evaluations performed in one pass.
#[derive(Debug, Clone, Copy, Default)]
struct EvaluationSummary {
    evaluated: usize,
    failed: usize,
}

/// Evolution engine running the generational loop.
///
/// Each generation selects parents by dominance and crowding distance,
/// applies crossover and mutation to the copies, re-evaluates what changed,
/// and replaces the population.
pub struct EvolutionEngine<E: Evaluator> {
    config: EvolutionConfig,
    evaluator: E,
    filter: Option<(String, FitnessFn)>,
    rng: NasRng,
    pool: Option<rayon::ThreadPool>,
    population: Vec<Individual>,
    next_id: u64,
}

impl<E: Evaluator> EvolutionEngine<E> {
    /// Create a new engine; fails on invalid configuration.
    pub fn new(config: EvolutionConfig, evaluator: E) -> Result<Self, NasError> {
        config.validate()?;

        let rng = config.random_seed.map_or_else(NasRng::random, NasRng::new);
        let pool = if config.evaluation.parallel && config.evaluation.workers > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.evaluation.workers)
                    .thread_name(|i| format!("tensornas-eval-{i}"))
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            config,
            evaluator,
            filter: None,
            rng,
            pool,
            population: Vec::new(),
            next_id: 0,
        })
    }

    /// Replace the configured fitness filter with a custom function. `name`
    /// titles the saved individual record.
    pub fn with_filter<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&EvaluationOutcome) -> Vec<f64> + Send + Sync + 'static,
    {
        self.filter = Some((name.into(), Box::new(filter)));
        self
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Replace the population with freshly generated, unevaluated individuals.
    pub fn initialize(&mut self) -> Result<(), NasError> {
        self.population.clear();
        for _ in 0..self.config.population.size {
            let architecture =
                BlockArchitecture::generate(&self.config.architecture, &mut self.rng)?;
            let id = self.take_id();
            self.population.push(Individual::new(id, architecture, 0));
        }
        debug!(
            "Initialized {} {} individuals",
            self.population.len(),
            self.config.architecture.kind.name()
        );
        Ok(())
    }

    /// Seed the population with existing architectures instead of generating.
    ///
    /// Architectures that do not match the configured kind, input shape and
    /// class count, or that fail validation, are skipped. Surplus ones are
    /// dropped and missing ones generated. Returns the number kept. Seeded
    /// individuals start unevaluated.
    pub fn seed_population(
        &mut self,
        architectures: Vec<BlockArchitecture>,
    ) -> Result<usize, NasError> {
        let size = self.config.population.size;
        let target = &self.config.architecture;
        let fits = |arch: &BlockArchitecture| {
            arch.kind() == Some(target.kind)
                && arch.input_shape() == &target.input_shape
                && arch.class_count == target.class_count
                && arch.root.check_consistency().is_ok()
                && arch.validate()
        };

        let offered = architectures.len();
        let kept: Vec<BlockArchitecture> = architectures
            .into_iter()
            .filter(|arch| fits(arch))
            .take(size)
            .collect();
        if kept.len() < offered.min(size) {
            warn!(
                "Skipped {} seed architectures not matching {} {}",
                offered.min(size) - kept.len(),
                target.kind.name(),
                target.input_shape
            );
        }

        self.population.clear();
        let seeded = kept.len();
        for architecture in kept {
            let id = self.take_id();
            let mut ind = Individual::new(id, architecture, 0);
            ind.invalidate();
            self.population.push(ind);
        }
        while self.population.len() < size {
            let architecture =
                BlockArchitecture::generate(&self.config.architecture, &mut self.rng)?;
            let id = self.take_id();
            self.population.push(Individual::new(id, architecture, 0));
        }
        debug!("Seeded {seeded} of {size} individuals");
        Ok(seeded)
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn filter_name(&self) -> &str {
        match &self.filter {
            Some((name, _)) => name,
            None => self.config.objectives.filter.name(),
        }
    }

    /// Evaluate every individual with invalid fitness.
    fn evaluate_invalid(&mut self, generation: usize) -> Result<EvaluationSummary, NasError> {
        let pending: Vec<usize> = self
            .population
            .iter()
            .enumerate()
            .filter(|(_, ind)| !ind.fitness.is_valid())
            .map(|(i, _)| i)
            .collect();

        type Evaluated = (usize, Result<EvaluationOutcome, EvaluationError>);
        let save = self.config.output.save_individuals;
        let test_name = self.config.output.test_name.as_str();
        let evaluator = &self.evaluator;
        let population = &self.population;
        // requests are numbered by position in this pass, not population slot
        let job = |(position, &index): (usize, &usize)| -> Evaluated {
            let request = EvaluationRequest {
                architecture: &population[index].architecture,
                test_name: save.then_some(test_name),
                generation: save.then_some(generation),
                index: save.then_some(position),
            };
            (index, evaluator.evaluate(&request))
        };

        let results: Vec<Evaluated> = match (&self.pool, self.config.evaluation.parallel) {
            (Some(pool), true) => {
                pool.install(|| pending.par_iter().enumerate().map(job).collect())
            }
            (None, true) => pending.par_iter().enumerate().map(job).collect(),
            (_, false) => pending.iter().enumerate().map(job).collect(),
        };

        let weights = self.config.objectives.weights.len();
        let mut summary = EvaluationSummary {
            evaluated: results.len(),
            failed: 0,
        };

        for (index, result) in results {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(source) => match self.config.evaluation.failure_policy {
                    FailurePolicy::Abort => {
                        return Err(NasError::Evaluation {
                            generation,
                            index,
                            source,
                        });
                    }
                    FailurePolicy::Penalize => {
                        warn!("Gen #{generation}, individual {index} failed to evaluate: {source}");
                        summary.failed += 1;
                        EvaluationOutcome::penalty(weights.saturating_sub(2))
                    }
                },
            };

            let values = match &self.filter {
                Some((_, filter)) => filter(&outcome),
                None => apply_filter(&self.config.objectives.filter, &outcome),
            };
            if values.len() != weights {
                return Err(NasError::ObjectiveArity {
                    expected: weights,
                    found: values.len(),
                });
            }

            let ind = &mut self.population[index];
            ind.architecture
                .set_metrics(outcome.param_count, outcome.accuracy);
            ind.fitness.set(values);
        }

        Ok(summary)
    }

    /// Crossover on consecutive pairs, then mutation, in place. Changed
    /// individuals become new offspring with invalid fitness.
    fn vary(&mut self, offspring: &mut [Individual], generation: usize) {
        let cxpb = self.config.variation.crossover_rate;
        let mutpb = self.config.variation.mutation_rate;
        let limits = self.config.architecture.limits.clone();

        for i in (1..offspring.len()).step_by(2) {
            if !self.rng.chance(cxpb) {
                continue;
            }
            let (left, right) = offspring.split_at_mut(i);
            let (a, b) = (&mut left[i - 1], &mut right[0]);
            if BlockArchitecture::crossover(
                &mut a.architecture,
                &mut b.architecture,
                &limits,
                &mut self.rng,
            ) {
                let parents = vec![a.id, b.id];
                for child in [a, b] {
                    let id = self.take_id();
                    rebirth(child, id, parents.clone(), generation);
                }
            }
        }

        for ind in offspring.iter_mut() {
            if !self.rng.chance(mutpb) || !ind.architecture.mutate(&limits, &mut self.rng) {
                continue;
            }
            // crossover offspring are already new individuals
            if ind.fitness.is_valid() {
                let id = self.take_id();
                let parents = vec![ind.id];
                rebirth(ind, id, parents, generation);
            }
        }
    }

    /// Crowding, record, hall of fame and statistics for the current
    /// population, shared by the initial pass and every generation.
    fn close_generation(
        &mut self,
        generation: usize,
        summary: EvaluationSummary,
        record: &mut Option<IndividualRecord>,
        hall_of_fame: &mut ParetoFront,
    ) -> GenerationStats {
        for ind in &mut self.population {
            ind.record_history();
        }
        assign_crowding_distance(&mut self.population);
        if let Some(record) = record.as_mut() {
            record.add_gen(&self.population);
        }
        hall_of_fame.update(&self.population);

        GenerationStats::compile(
            generation,
            summary.evaluated,
            self.population.iter().filter_map(|i| i.fitness.values()),
        )
    }

    /// Run the search, reporting progress after every generation.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<EvolutionResult, NasError>
    where
        F: FnMut(&EvolutionProgress),
    {
        let start_time = Instant::now();
        let generations = self.config.population.generations;
        let output = self.config.output.clone();
        let output_dir = Path::new(&output.output_dir);

        let logger = if output.log {
            Some(RunLogger::new(output_dir, &output.test_name, output.log_capacity)?)
        } else {
            None
        };
        let log = |line: String| {
            if let Some(logger) = &logger {
                logger.log(line);
            }
        };

        let mut record = output.save_record.then(IndividualRecord::new);
        let mut hall_of_fame = ParetoFront::new(self.config.objectives.weights.clone());
        let mut logbook = Logbook::default();
        let mut total_evaluations = 0u64;
        let mut failed_evaluations = 0u64;

        if self.population.is_empty() {
            match self.config.population.seed_record.clone() {
                Some(path) => {
                    let record = IndividualRecord::load(Path::new(&path))?;
                    let seeded = self.seed_population(record.final_population())?;
                    info!("Seeded {seeded} individuals from {path}");
                }
                None => self.initialize()?,
            }
        }

        if output.verbose {
            info!("{}", Logbook::header());
        }

        for generation in 0..=generations {
            if generation > 0 {
                log(format!(
                    "Gen #{generation}, population: {}",
                    self.population.len()
                ));
                let chosen = select_tournament_dcd(
                    &self.population,
                    self.population.len(),
                    &self.config.objectives.weights,
                    &mut self.rng,
                );
                let mut offspring: Vec<Individual> =
                    chosen.iter().map(|&i| self.population[i].clone()).collect();
                self.vary(&mut offspring, generation);
                self.population = offspring;
            }

            let summary = self.evaluate_invalid(generation)?;
            total_evaluations += summary.evaluated as u64;
            failed_evaluations += summary.failed as u64;

            let stats = self.close_generation(generation, summary, &mut record, &mut hall_of_fame);

            if generation > 0 {
                for (x, ind) in self.population.iter().enumerate() {
                    let (params, accuracy) = ind.metrics().unwrap_or((0, 0.0));
                    log(format!("Ind #{x}, params:{params}, acc:{accuracy}%"));
                    log(ind.to_string());
                }
            }

            if output.verbose {
                info!("{}", Logbook::row(&stats));
            } else {
                debug!("{}", Logbook::row(&stats));
            }

            callback(&EvolutionProgress {
                generation,
                total_generations: generations,
                population_size: self.population.len(),
                hall_of_fame_size: hall_of_fame.len(),
                failed_evaluations: summary.failed,
                stats: stats.clone(),
            });
            logbook.record(stats);
        }

        let dropped_log_lines = logger.map_or(0, RunLogger::shutdown);
        if dropped_log_lines > 0 {
            warn!("{dropped_log_lines} run log lines dropped");
        }

        let record_path = match record.as_mut() {
            Some(record) => Some(record.save(
                output_dir,
                &output.test_name,
                self.filter_name(),
                output.comment.as_deref(),
            )?),
            None => None,
        };

        let elapsed_seconds = start_time.elapsed().as_secs_f64();
        info!(
            "Search finished: {} generations, {} evaluations ({} failed) in {:.2}s, {} non-dominated",
            generations,
            total_evaluations,
            failed_evaluations,
            elapsed_seconds,
            hall_of_fame.len()
        );

        Ok(EvolutionResult {
            population: self.population.clone(),
            hall_of_fame,
            logbook,
            stats: EvolutionStats {
                generations,
                total_evaluations,
                failed_evaluations,
                elapsed_seconds,
                dropped_log_lines,
            },
            record_path,
        })
    }

    /// Run the search (blocking).
    pub fn run(&mut self) -> Result<EvolutionResult, NasError> {
        self.run_with_callback(|_| {})
    }
}

fn rebirth(ind: &mut Individual, id: u64, parents: Vec<u64>, generation: usize) {
    ind.invalidate();
    ind.id = id;
    ind.parents = parents;
    ind.generation = generation;
    ind.history.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FitnessFilter, PopulationConfig, Shape, VariationConfig};
    use std::fs;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config(size: usize, generations: usize) -> EvolutionConfig {
        EvolutionConfig {
            population: PopulationConfig {
                size,
                generations,
                ..Default::default()
            },
            variation: VariationConfig {
                crossover_rate: 0.5,
                mutation_rate: 0.2,
            },
            random_seed: Some(11),
            ..Default::default()
        }
    }

    fn stub(_: &EvaluationRequest<'_>) -> Result<EvaluationOutcome, EvaluationError> {
        Ok(EvaluationOutcome::new(10, 50.0))
    }

    #[test]
    fn test_evolution_run() {
        let mut engine = EvolutionEngine::new(config(4, 2), stub).unwrap();
        let mut seen = Vec::new();
        let result = engine
            .run_with_callback(|p| seen.push(p.generation))
            .unwrap();

        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(result.population.len(), 4);
        assert!(result.population.iter().all(|i| i.fitness.is_valid()));
        assert!(!result.hall_of_fame.is_empty());
        assert_eq!(result.logbook.len(), 3);
        assert_eq!(result.logbook.entries[0].nevals, 4);
        assert!(result.stats.total_evaluations >= 4);
        assert_eq!(result.stats.failed_evaluations, 0);
        assert!(result.record_path.is_none());
    }

    #[test]
    fn test_only_changed_individuals_are_evaluated() {
        let calls = AtomicUsize::new(0);
        let counting = |request: &EvaluationRequest<'_>| {
            calls.fetch_add(1, Ordering::SeqCst);
            ParamCountEvaluator.evaluate(request)
        };
        let mut cfg = config(6, 3);
        cfg.variation = VariationConfig {
            crossover_rate: 0.0,
            mutation_rate: 0.0,
        };
        let result = EvolutionEngine::new(cfg, counting).unwrap().run().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(result.stats.total_evaluations, 6);
        assert!(result.logbook.entries[1..].iter().all(|s| s.nevals == 0));
    }

    struct ParamCountEvaluator;

    impl Evaluator for ParamCountEvaluator {
        fn evaluate(
            &self,
            request: &EvaluationRequest<'_>,
        ) -> Result<EvaluationOutcome, EvaluationError> {
            let params = request.architecture.parameter_count();
            Ok(EvaluationOutcome::new(params, (params % 97) as f64))
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = |parallel: bool| {
            let mut cfg = config(6, 3);
            cfg.evaluation.parallel = parallel;
            cfg.evaluation.workers = 2;
            let result = EvolutionEngine::new(cfg, ParamCountEvaluator).unwrap().run().unwrap();
            result
                .population
                .iter()
                .map(|i| (i.id, i.fitness.values().map(<[f64]>::to_vec)))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(true), run(true));
        assert_eq!(run(true), run(false));
    }

    #[test]
    fn test_failure_policies() {
        let failing = |request: &EvaluationRequest<'_>| {
            if request.architecture.parameter_count() % 2 == 0 {
                Err(EvaluationError::new("out of memory"))
            } else {
                Ok(EvaluationOutcome::new(1, 1.0))
            }
        };
        let always = |_: &EvaluationRequest<'_>| -> Result<EvaluationOutcome, EvaluationError> {
            Err(EvaluationError::new("no backend"))
        };

        let result = EvolutionEngine::new(config(4, 1), always).unwrap().run().unwrap();
        assert!(result.stats.failed_evaluations >= 4);
        let penalized = &result.population[0];
        assert_eq!(penalized.fitness.values(), Some(&[u64::MAX as f64, 0.0][..]));

        let mut cfg = config(4, 1);
        cfg.evaluation.failure_policy = FailurePolicy::Abort;
        let err = EvolutionEngine::new(cfg.clone(), always).unwrap().run().unwrap_err();
        assert!(matches!(err, NasError::Evaluation { generation: 0, .. }));

        // mixed outcomes still complete under the penalty policy
        cfg.evaluation.failure_policy = FailurePolicy::Penalize;
        let result = EvolutionEngine::new(cfg, failing).unwrap().run().unwrap();
        assert_eq!(result.population.len(), 4);
    }

    #[test]
    fn test_custom_filter_arity_checked() {
        let mut engine = EvolutionEngine::new(config(2, 0), stub)
            .unwrap()
            .with_filter("single", |o: &EvaluationOutcome| vec![o.accuracy]);
        let err = engine.run().unwrap_err();
        assert!(matches!(
            err,
            NasError::ObjectiveArity {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_weighted_filter_single_objective() {
        let mut cfg = config(4, 2);
        cfg.objectives.weights = vec![1.0];
        cfg.objectives.filter = FitnessFilter::Weighted {
            param_weight: 0.5,
            accuracy_weight: 1.0,
        };
        let result = EvolutionEngine::new(cfg, stub).unwrap().run().unwrap();
        assert_eq!(
            result.population[0].fitness.values(),
            Some(&[45.0][..])
        );
    }

    #[test]
    fn test_outputs_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(4, 2);
        cfg.output.output_dir = dir.path().to_string_lossy().into_owned();
        cfg.output.test_name = "smoke".to_string();
        cfg.output.log = true;
        cfg.output.save_record = true;
        cfg.output.comment = Some("stub evaluator".to_string());

        let result = EvolutionEngine::new(cfg, stub).unwrap().run().unwrap();

        let log = fs::read_to_string(RunLogger::path_for(dir.path(), "smoke")).unwrap();
        assert!(log.contains("Gen #1, population: 4"));
        assert!(log.contains("Ind #0, params:10, acc:50%"));
        assert_eq!(log.lines().last(), Some("STOP"));
        assert_eq!(result.stats.dropped_log_lines, 0);

        let path = result.record_path.unwrap();
        let record = IndividualRecord::load(&path).unwrap();
        assert_eq!(record.len(), 3);
        assert_eq!(record.title, "no filter func");
        assert_eq!(record.comment.as_deref(), Some("stub evaluator"));
    }

    #[test]
    fn test_save_individuals_passes_context() {
        let mut cfg = config(3, 1);
        cfg.output.save_individuals = true;
        cfg.output.test_name = "ctx".to_string();
        let checked = |request: &EvaluationRequest<'_>| {
            if request.test_name == Some("ctx")
                && request.generation.is_some()
                && request.index.is_some()
            {
                Ok(EvaluationOutcome::new(10, 50.0))
            } else {
                Err(EvaluationError::new("missing context"))
            }
        };
        let result = EvolutionEngine::new(cfg, checked).unwrap().run().unwrap();
        assert_eq!(result.stats.failed_evaluations, 0);
    }

    #[test]
    fn test_requests_numbered_within_pass() {
        let mut cfg = config(8, 3);
        cfg.output.save_individuals = true;
        cfg.variation = VariationConfig {
            crossover_rate: 0.3,
            mutation_rate: 0.5,
        };
        let seen = Mutex::new(Vec::new());
        let recording = |request: &EvaluationRequest<'_>| {
            if let (Some(generation), Some(index)) = (request.generation, request.index) {
                seen.lock().unwrap().push((generation, index));
            }
            ParamCountEvaluator.evaluate(request)
        };
        let result = EvolutionEngine::new(cfg, recording).unwrap().run().unwrap();

        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        for stats in &result.logbook.entries {
            let mut indices: Vec<usize> = seen
                .iter()
                .filter(|(generation, _)| *generation == stats.generation)
                .map(|&(_, index)| index)
                .collect();
            indices.sort_unstable();
            assert_eq!(indices, (0..stats.nevals).collect::<Vec<_>>());
        }
        assert_eq!(seen.len() as u64, result.stats.total_evaluations);
    }

    #[test]
    fn test_seed_record_resumes_population() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = config(5, 2);
        first.output.output_dir = dir.path().to_string_lossy().into_owned();
        first.output.test_name = "first".to_string();
        first.output.save_record = true;
        let first_result = EvolutionEngine::new(first, ParamCountEvaluator)
            .unwrap()
            .run()
            .unwrap();
        let record_path = first_result.record_path.unwrap();

        let mut resumed = config(5, 0);
        resumed.random_seed = Some(99);
        resumed.population.seed_record = Some(record_path.to_string_lossy().into_owned());
        let result = EvolutionEngine::new(resumed, ParamCountEvaluator)
            .unwrap()
            .run()
            .unwrap();

        let roots: Vec<_> = result.population.iter().map(|i| &i.architecture.root).collect();
        let expected: Vec<_> = first_result
            .population
            .iter()
            .map(|i| &i.architecture.root)
            .collect();
        assert_eq!(roots, expected);
        assert_eq!(result.logbook.entries[0].nevals, 5);
        assert!(result.population.iter().all(|i| i.fitness.is_valid()));
    }

    #[test]
    fn test_seed_population_filters_and_fills() {
        let mut engine = EvolutionEngine::new(config(4, 0), stub).unwrap();
        let mut rng = NasRng::new(3);
        let own = engine.config().architecture.clone();
        let matching = BlockArchitecture::generate(&own, &mut rng).unwrap();
        let mut other = own;
        other.input_shape = Shape::from([20, 20, 3]);
        let foreign = BlockArchitecture::generate(&other, &mut rng).unwrap();

        let seeded = engine
            .seed_population(vec![foreign, matching.clone(), matching.clone()])
            .unwrap();
        assert_eq!(seeded, 2);
        let population = engine.population();
        assert_eq!(population.len(), 4);
        assert_eq!(population[0].architecture.root, matching.root);
        assert!(population.iter().all(|i| !i.fitness.is_valid()));
        assert!(population.iter().all(|i| i.architecture.validate()));

        let ids: Vec<u64> = population.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_missing_seed_record_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(3, 1);
        cfg.population.seed_record = Some(
            dir.path()
                .join("absent_individuals.json")
                .to_string_lossy()
                .into_owned(),
        );
        let err = EvolutionEngine::new(cfg, stub).unwrap().run().unwrap_err();
        assert!(matches!(err, NasError::Io(_)), "{err}");
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            EvolutionEngine::new(config(0, 1), stub),
            Err(NasError::Config(_))
        ));
    }
}
