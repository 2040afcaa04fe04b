//! TensorNAS CLI - Run an architecture search from JSON configuration.

use std::fs;
use std::path::PathBuf;

use tensor_nas::{
    compute::evolution::{CapacityProxyEvaluator, EvolutionEngine},
    schema::EvolutionConfig,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [generations]", args[0]);
        eprintln!();
        eprintln!("Run an evolutionary architecture search from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to search configuration file");
        eprintln!("  generations  Override the configured number of generations");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);

    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let mut config: EvolutionConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Some(generations) = args.get(2).and_then(|s| s.parse().ok()) {
        config.population.generations = generations;
    }

    println!("TensorNAS Search");
    println!("================");
    println!(
        "Architecture: {} (input {}, {} classes)",
        config.architecture.kind.name(),
        config.architecture.input_shape,
        config.architecture.class_count
    );
    println!(
        "Population: {}, generations: {}",
        config.population.size, config.population.generations
    );
    if let Some(record) = &config.population.seed_record {
        println!("Seeding from: {record}");
    }
    println!(
        "cxpb: {}, mutpb: {}, weights: {:?}",
        config.variation.crossover_rate, config.variation.mutation_rate, config.objectives.weights
    );
    println!();

    let mut engine = EvolutionEngine::new(config, CapacityProxyEvaluator::default())
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    let result = engine
        .run_with_callback(|progress| {
            println!(
                "  Gen {}/{}: {} non-dominated, {} failed evaluations",
                progress.generation,
                progress.total_generations,
                progress.hall_of_fame_size,
                progress.failed_evaluations
            );
        })
        .unwrap_or_else(|e| {
            eprintln!("Search failed: {}", e);
            std::process::exit(1);
        });

    println!();
    println!("{}", result.logbook.stream());
    println!();
    println!("Hall of fame ({} individuals):", result.hall_of_fame.len());
    for ind in result.hall_of_fame.iter() {
        println!();
        println!("Individual {} (generation {})", ind.id, ind.generation);
        println!("{ind}");
    }
    println!();
    println!(
        "Evaluations: {} ({} failed), time: {:.2}s",
        result.stats.total_evaluations,
        result.stats.failed_evaluations,
        result.stats.elapsed_seconds
    );
    if let Some(path) = result.record_path {
        println!("Individual record: {}", path.display());
    }
}

fn print_example_config() {
    let config = EvolutionConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
