//! neuronet - CLI Entry Point
//!
//! Loads a configuration, trains on a dataset and evaluates the result.

use clap::{Parser, Subcommand};
use neuronet::checkpoint::Checkpoint;
use neuronet::Config;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "neuronet")]
#[command(version)]
#[command(about = "Feed-forward neuron graph trained on labelled image folders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a new network and evaluate it on its dataset
    Train {
        /// Configuration file (JSON or YAML)
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Dataset folder with one sub-folder per category
        #[arg(short, long, default_value = "dataset")]
        dataset: PathBuf,

        /// Save the trained network to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Random seed for weight initialisation
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Evaluate a saved network on a dataset
    Evaluate {
        /// Checkpoint file
        #[arg(short, long)]
        checkpoint: PathBuf,

        /// Dataset folder (defaults to the one the network was trained on)
        #[arg(short, long)]
        dataset: Option<PathBuf>,
    },

    /// Classify a single sample with a saved network
    Predict {
        /// Checkpoint file
        #[arg(short, long)]
        checkpoint: PathBuf,

        /// Image to classify
        sample: PathBuf,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            config,
            dataset,
            output,
            seed,
        } => train(config, dataset, output, seed),

        Commands::Evaluate {
            checkpoint,
            dataset,
        } => evaluate(checkpoint, dataset),

        Commands::Predict { checkpoint, sample } => predict(checkpoint, sample),

        Commands::Init { output } => generate_config(output),
    }
}

fn train(
    config_path: PathBuf,
    dataset: PathBuf,
    output: Option<PathBuf>,
    seed: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading config from: {:?}", config_path);
    let mut config = Config::from_file(&config_path)?;
    if seed.is_some() {
        config.seed = seed;
    }

    let mut network = config.build_network(&dataset)?;
    println!("Network created: {}", network.topology());
    println!("  Categories: {}", network.categories().join(", "));
    println!("  Epochs: {}", config.epoch);
    println!();

    let start = Instant::now();
    let summary = network.education()?;
    let elapsed = start.elapsed();

    println!("=== Training Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Samples processed: {}", summary.processed);
    println!("Samples skipped: {}", summary.skipped);
    println!();

    let report = network.check_on_data()?;
    println!("=== Evaluation ===");
    println!("{}", report);

    if let Some(path) = output {
        Checkpoint::write(&network, &path)?;
        println!("Network saved: {:?}", path);
    }

    Ok(())
}

fn evaluate(
    checkpoint_path: PathBuf,
    dataset: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut network = Checkpoint::load(&checkpoint_path)?.into_network();
    if let Some(dataset) = dataset {
        network.set_dataset(dataset);
    }

    println!("Network: {}", network.topology());
    let report = network.check_on_data()?;
    println!("=== Evaluation ===");
    println!("{}", report);

    Ok(())
}

fn predict(checkpoint_path: PathBuf, sample: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mut network = Checkpoint::load(&checkpoint_path)?.into_network();

    let categories = network.perception(&sample);
    if categories.is_empty() {
        println!("{:?}: no category", sample);
    } else {
        println!("{:?}: {}", sample, categories.join(", "));
    }

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}
