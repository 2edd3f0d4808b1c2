//! Generates a labelled QBER dataset for attack detection.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use bb84::prelude::*;
use clap::Parser;
use log::info;

#[derive(Parser, Debug)]
#[command(name = "bb84-dataset", about = "Simulate BB84 runs and append labelled QBER records")]
struct Cli {
    /// JSON experiment config; overrides the run/qubit/noise/attack flags
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 1000)]
    runs: usize,
    #[arg(long, default_value_t = 10_000)]
    qubits: usize,
    #[arg(long, default_value_t = 0.01)]
    noise: f64,
    /// Lower bound of attack intensity on odd-indexed runs
    #[arg(long, default_value_t = 0.01)]
    attack_low: f64,
    /// Upper bound (exclusive) of attack intensity on odd-indexed runs
    #[arg(long, default_value_t = 0.15)]
    attack_high: f64,
    /// Seed for a reproducible dataset; random when omitted
    #[arg(long)]
    seed: Option<u64>,
    #[arg(short, long, default_value = "data/training_data.csv")]
    output: PathBuf,
    /// Spread runs over all cores (needs a seed, one is drawn if missing)
    #[arg(long)]
    parallel: bool,
}

impl Cli {
    fn experiment_config(&self) -> Result<ExperimentConfig, Box<dyn std::error::Error>> {
        if let Some(path) = &self.config {
            let config: ExperimentConfig = serde_json::from_reader(BufReader::new(File::open(path)?))?;
            return Ok(config);
        }
        Ok(ExperimentConfig {
            num_runs: self.runs,
            qubits_per_run: self.qubits,
            natural_noise: self.noise,
            schedule: AttackSchedule::Alternating {
                low: self.attack_low,
                high: self.attack_high,
            },
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let runner = ExperimentRunner::new(cli.experiment_config()?)?;

    if let Some(dir) = cli.output.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let mut recorder = CsvRecorder::append_to(&cli.output)?;

    let summary = if cli.parallel {
        run_parallel(&runner, cli.seed, &mut recorder)?
    } else {
        match cli.seed {
            Some(seed) => runner.run(&mut SeededSource::from_seed(seed), &mut recorder)?,
            None => runner.run(&mut thread_source(), &mut recorder)?,
        }
    };
    recorder.flush()?;

    info!("dataset written to {}", cli.output.display());
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(feature = "parallel")]
fn run_parallel<R: Recorder>(
    runner: &ExperimentRunner,
    seed: Option<u64>,
    recorder: &mut R,
) -> Result<ExperimentSummary, Bb84Error> {
    let seed = seed.unwrap_or_else(rand::random);
    info!("parallel run with seed {}", seed);
    runner.run_parallel(seed, recorder)
}

#[cfg(not(feature = "parallel"))]
fn run_parallel<R: Recorder>(
    runner: &ExperimentRunner,
    seed: Option<u64>,
    recorder: &mut R,
) -> Result<ExperimentSummary, Bb84Error> {
    log::warn!("built without the parallel feature, running sequentially");
    let seed = seed.unwrap_or_else(rand::random);
    runner.run(&mut SeededSource::from_seed(seed), recorder)
}
