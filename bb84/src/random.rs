//! Randomness injected into every protocol component.
//!
//! Components never reach for a global generator; they take a
//! `&mut S where S: RandomSource` so a seeded source reproduces a whole
//! dataset. Draws happen in this order for each qubit:
//!
//! 1. qubit value, qubit basis (sender)
//! 2. intercept check, then eavesdropper basis and (on basis mismatch) outcome
//! 3. noise check
//! 4. receiver basis, then (on basis mismatch) outcome

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Supplies independent uniform bits and uniform reals in `[0, 1)`.
pub trait RandomSource {
    fn uniform_bit(&mut self) -> bool;
    fn uniform_real(&mut self) -> f64;
}

/// Adapts any `rand` generator into a [`RandomSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn uniform_bit(&mut self) -> bool {
        self.rng.gen()
    }

    fn uniform_real(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Deterministic ChaCha20-backed source.
pub type SeededSource = RngSource<ChaCha20Rng>;

impl SeededSource {
    pub fn from_seed(seed: u64) -> Self {
        Self::new(ChaCha20Rng::seed_from_u64(seed))
    }

    /// Independent substream `stream` of the generator seeded with `seed`.
    ///
    /// Parallel runs each take their own stream so that no two runs share
    /// draws, whatever order the threads execute in.
    pub fn for_stream(seed: u64, stream: u64) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        rng.set_stream(stream);
        Self::new(rng)
    }
}

/// Non-reproducible source backed by the thread-local generator.
pub fn thread_source() -> RngSource<rand::rngs::ThreadRng> {
    RngSource::new(rand::thread_rng())
}
