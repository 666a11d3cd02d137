//! Ekin search CLI - Run searches from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;

use ekin_search::{
    compute::{SearchProgress, run_search},
    schema::SearchConfig,
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [max_iterations]", args[0]);
        eprintln!();
        eprintln!("Run an Ekin search from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json     Path to search configuration file");
        eprintln!("  max_iterations  Override the configured iteration cap");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let mut config: SearchConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Some(cap) = args.get(2).and_then(|s| s.parse().ok()) {
        config.max_iterations = cap;
    }

    println!("Ekin Search");
    println!("===========");
    println!("Dimension: {}", config.dimension);
    println!(
        "Bounds: ({}, {}) exclusive",
        config.bounds.min, config.bounds.max
    );
    println!("Zero-sum subsets: {:?}", config.zero_sum);
    println!("Negation symmetry: {}", config.negation_symmetry);
    println!("Workers: {}", config.workers);
    println!("Max iterations: {}", config.max_iterations);
    println!("Output: {}", config.growth_path().display());
    if config.output.provenance {
        println!("Lineage: {}", config.lineage_path().display());
    }
    println!();

    let progress = |p: &SearchProgress| {
        if p.rounds > 0 && p.rounds % 100 == 0 {
            println!(
                "  Round {}: frontier={}, seen={}, max={}",
                p.rounds, p.frontier, p.states_seen, p.running_max
            );
        }
    };

    let result = run_search(config, progress).unwrap_or_else(|e| {
        eprintln!("Search aborted: {}", e);
        std::process::exit(1);
    });

    println!();
    for (record, gap) in result.history.iter().zip(result.iteration_gaps()) {
        println!(
            "  New max {} at iteration {} (+{})",
            record.new_max, record.iteration, gap
        );
    }

    println!();
    println!("Stopped: {:?}", result.stats.stop_reason);
    println!("Rounds: {}", result.stats.rounds);
    println!("Largest coordinate: {}", result.running_max);
    println!("States seen: {}", result.stats.states_seen);
    println!(
        "Candidates: {} proposed, {} duplicates",
        result.stats.proposed, result.stats.duplicates
    );
    println!(
        "Time: {:.2}s ({:.1} states/s)",
        result.stats.elapsed_seconds, result.stats.states_per_second
    );
}

fn print_example_config() {
    let config = SearchConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
