//! End-to-end search scenarios through the public API.

use tensor_nas::compute::evolution::{
    EvaluationError, EvaluationOutcome, EvaluationRequest, EvolutionEngine,
};
use tensor_nas::schema::{
    ArchitectureKind, EvolutionConfig, PopulationConfig, VariationConfig,
};
use tensor_nas::{BlockArchitecture, NasRng};

fn fixed(_: &EvaluationRequest<'_>) -> Result<EvaluationOutcome, EvaluationError> {
    Ok(EvaluationOutcome::new(10, 50.0))
}

fn config(kind: ArchitectureKind, seed: u64) -> EvolutionConfig {
    let mut config = EvolutionConfig {
        population: PopulationConfig {
            size: 4,
            generations: 2,
            ..Default::default()
        },
        variation: VariationConfig {
            crossover_rate: 0.5,
            mutation_rate: 0.2,
        },
        random_seed: Some(seed),
        ..Default::default()
    };
    config.architecture.kind = kind;
    config
}

#[test]
fn stub_evaluator_run_keeps_population_valid() {
    for kind in ArchitectureKind::ALL {
        let mut engine = EvolutionEngine::new(config(kind, 21), fixed).unwrap();
        let result = engine.run().unwrap();

        assert_eq!(result.population.len(), 4);
        assert!(!result.hall_of_fame.is_empty());
        for ind in &result.population {
            assert_eq!(ind.fitness.values(), Some(&[10.0, 50.0][..]));
            assert_eq!(ind.architecture.kind(), Some(kind));
            assert!(ind.architecture.validate(), "{ind}");
            assert!(!ind.history.is_empty());
        }
        assert_eq!(result.logbook.len(), 3);
    }
}

#[test]
fn proxy_search_front_is_mutually_non_dominated() {
    let mut cfg = config(ArchitectureKind::Classification, 5);
    cfg.population.size = 8;
    cfg.population.generations = 3;
    let weights = cfg.objectives.weights.clone();

    let mut engine = EvolutionEngine::new(cfg, |request: &EvaluationRequest<'_>| {
        let params = request.architecture.parameter_count();
        Ok::<_, EvaluationError>(EvaluationOutcome::new(params, (params % 89) as f64))
    })
    .unwrap();
    let result = engine.run().unwrap();

    let front = result.hall_of_fame.members();
    for a in front {
        for b in front {
            assert!(!a.fitness.dominates(&b.fitness, &weights));
        }
    }
}

#[test]
fn best_architectures_survive_json() {
    let mut engine =
        EvolutionEngine::new(config(ArchitectureKind::SqueezeNet, 8), fixed).unwrap();
    let result = engine.run().unwrap();

    for ind in result.hall_of_fame.iter() {
        let json = ind.architecture.to_json().unwrap();
        let restored = BlockArchitecture::from_json(&json).unwrap();
        assert_eq!(restored, ind.architecture);
        assert_eq!(restored.parameter_count(), ind.architecture.parameter_count());
    }
}

#[test]
fn seeded_population_is_reproducible() {
    let generate = || {
        let cfg = config(ArchitectureKind::EffNet, 99);
        let mut rng = NasRng::new(99);
        BlockArchitecture::generate(&cfg.architecture, &mut rng).unwrap()
    };
    assert_eq!(generate(), generate());
}
