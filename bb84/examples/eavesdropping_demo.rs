use bb84::prelude::*;

/// QBER introduced by an intercept-resend attacker at increasing intensity.
fn simulate_eavesdropping() -> Result<(), Bb84Error> {
    println!("BB84 Eavesdropping Simulation");
    println!("{:>10}  {:>10}  {:>12}", "intensity", "QBER [%]", "expected [%]");

    let mut rng = SeededSource::from_seed(7);
    for step in 0..=10 {
        let intensity = step as f64 / 10.0;
        let runner = ExperimentRunner::new(ExperimentConfig {
            num_runs: 1,
            qubits_per_run: 20_000,
            natural_noise: 0.0,
            schedule: AttackSchedule::Constant(intensity),
        })?;
        let outcome = runner.run_once(0, &mut rng)?;
        println!(
            "{:>10.1}  {:>10.2}  {:>12.2}",
            intensity,
            outcome.record.qber * 100.0,
            intensity * 25.0
        );
    }
    Ok(())
}

fn main() -> Result<(), Bb84Error> {
    simulate_eavesdropping()
}
