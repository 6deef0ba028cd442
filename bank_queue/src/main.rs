//! Bank queueing simulation runner.
//!
//! Usage:
//!   bank_queue [config.toml] [output_dir]
//!
//! Without a config file the baseline parameters are used.

use std::env;
use std::process;

use bank_queue::{run_simulation, SimulationConfig, Summary};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() > 3 {
        eprintln!("Usage: {} [config.toml] [output_dir]", args[0]);
        process::exit(1);
    }

    let config = match args.get(1) {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            SimulationConfig::from_file(path).unwrap_or_else(|e| {
                tracing::error!("Failed to load config from '{}': {}", path, e);
                process::exit(1);
            })
        }
        None => SimulationConfig::baseline(),
    };

    println!("=== Bank Process Flow Simulation ===\n");
    println!("Configuration:");
    println!("  Horizon: {} minutes", config.horizon);
    println!("  Arrival rate: {} customers/min", config.arrival_rate);
    println!("  ATMs: {}", config.num_atms);
    println!("  Cashiers: {}", config.num_cashiers);
    println!(
        "  ATM service (low, mode, high): ({}, {}, {})",
        config.atm_service.low, config.atm_service.mode, config.atm_service.high
    );
    println!(
        "  Cashier service (low, mode, high): ({}, {}, {})",
        config.cashier_service.low, config.cashier_service.mode, config.cashier_service.high
    );
    println!("  P(ATM first): {}", config.p_atm_first);
    println!("  P(cashier after ATM): {}\n", config.p_secondary_cashier);

    let result = run_simulation(&config).unwrap_or_else(|e| {
        tracing::error!("Simulation failed: {}", e);
        process::exit(1);
    });

    match result.summary() {
        Summary::Empty { arrivals } => {
            println!("No customer finished before the horizon ({} arrivals).", arrivals);
        }
        Summary::Complete(kpis) => {
            println!("=== KPIs ===");
            println!("Avg time in bank: {:.2} mins", kpis.mean_sojourn);
            println!("Median / p95 time in bank: {:.2} / {:.2} mins", kpis.median_sojourn, kpis.p95_sojourn);
            println!("Avg wait time: {:.2} mins", kpis.mean_wait);
            println!("ATM utilization: {:.2}%", kpis.atm_utilization * 100.0);
            println!("Cashier utilization: {:.2}%", kpis.cashier_utilization * 100.0);
            println!("Mean queue length - ATM: {:.2}", kpis.mean_atm_queue);
            println!("Mean queue length - Cashiers: {:.2}", kpis.mean_cashier_queue);
            println!("Total customers served: {}", kpis.finished_count);
        }
    }

    if let Some(dir) = args.get(2) {
        if let Err(e) = result.write_all(dir) {
            tracing::error!("Failed to write results to '{}': {}", dir, e);
            process::exit(1);
        }
        println!("\nResults written to {}", dir);
    }
}
