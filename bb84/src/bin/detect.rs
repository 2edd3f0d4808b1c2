//! Trains a QBER threshold detector on a recorded dataset and reports its accuracy.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use bb84::prelude::*;
use clap::Parser;
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[derive(Parser, Debug)]
#[command(name = "bb84-detect", about = "Fit an attack detector on a QBER dataset")]
struct Cli {
    #[arg(default_value = "data/training_data.csv")]
    dataset: PathBuf,
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f64,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value_t = 0.5)]
    learning_rate: f64,
    #[arg(long, default_value_t = 2000)]
    epochs: usize,
    /// Number of histogram bins to print; 0 disables the histogram
    #[arg(long, default_value_t = 20)]
    bins: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let records = read_dataset(BufReader::new(File::open(&cli.dataset)?))?;
    info!("loaded {} records from {}", records.len(), cli.dataset.display());

    if cli.bins > 0 {
        println!("{}", QberHistogram::new(&records, cli.bins)?);
    }

    let mut rng = ChaCha20Rng::seed_from_u64(cli.seed);
    let (train, test) = train_test_split(&records, cli.test_fraction, &mut rng)?;
    let detector = LogisticDetector::fit(&train, cli.learning_rate, cli.epochs)?;

    let matrix = ConfusionMatrix::evaluate(&detector, &test);
    match detector.decision_threshold() {
        Some(t) => println!("Decision threshold: QBER = {:.3}%", t * 100.0),
        None => println!("Decision threshold: undefined (flat model)"),
    }
    println!("Accuracy:  {:.2}%", matrix.accuracy() * 100.0);
    println!("Precision: {:.2}%", matrix.precision() * 100.0);
    println!("Recall:    {:.2}%", matrix.recall() * 100.0);
    println!();
    println!("{}", matrix);
    Ok(())
}
