use bb84::prelude::*;

/// Single noisy pass through the protocol, printing each stage.
fn simulate_noise_effect() -> Result<(), Bb84Error> {
    println!("BB84 Protocol with Noise Simulation");

    let n = 10_000;
    let noise = 0.01;
    let mut rng = thread_source();
    let channel = Channel::noisy(noise)?;

    let sent: Vec<Qubit> = (0..n).map(|_| generate_qubit(&mut rng)).collect();
    let received: Vec<Qubit> = sent.iter().map(|&q| channel.transmit(q, &mut rng)).collect();
    println!("1. Generated and transmitted {} qubits.", n);

    let measured: Vec<Measurement> = received.iter().map(|&q| measure_qubit(q, &mut rng)).collect();
    println!("2. Receiver measured every qubit.");

    println!("   {:>4}  {:>6}  {:>8}  {:>13}", "#", "sent", "arrived", "measured");
    for (i, ((q, r), m)) in sent.iter().zip(&received).zip(&measured).take(8).enumerate() {
        let seen = Qubit::new(m.result, m.basis).state();
        println!("   {:>4}  {:>6}  {:>8}  {:>13}", i, q.state(), r.state(), seen);
    }

    let key = sift_measurements(&sent, &measured)?;
    println!("3. Sifting done. Raw key length: {} bits.", key.len());

    let qber = compute_qber(key.sender_bits(), key.receiver_bits())?;
    println!("4. QBER with {:.1}% channel noise: {:.3}%", noise * 100.0, qber * 100.0);
    Ok(())
}

fn main() -> Result<(), Bb84Error> {
    simulate_noise_effect()
}
