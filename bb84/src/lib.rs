//! # bb84
//!
//! BB84 key distribution over a noisy channel with an optional
//! intercept-resend eavesdropper, reduced to classical `(value, basis)` pairs.
//!
//! Every experiment run yields one labelled record: the sifted-key QBER and
//! whether an attacker was active. The records form a training set for
//! attack detection.
//!
//! ## Pipeline
//!
//! generate qubit -> channel (attack, noise) -> receiver measurement ->
//! sifting -> QBER -> recorder
//!
//! ## Usage
//!
//! ```no_run
//! use bb84::prelude::*;
//!
//! let runner = ExperimentRunner::new(ExperimentConfig::default()).unwrap();
//! let mut rng = SeededSource::from_seed(42);
//! let mut recorder = MemoryRecorder::default();
//! let summary = runner.run(&mut rng, &mut recorder).unwrap();
//! println!("mean attacked QBER: {}", summary.mean_qber_attacked);
//! ```

pub mod analysis;
pub mod bb84;
pub mod bb84_states;
pub mod channel;
pub mod error;
pub mod experiment;
pub mod qber;
pub mod random;
pub mod recorder;
pub mod sifting;


pub use error::{Bb84Error, Result};

pub mod prelude {
    pub use crate::analysis::*;
    pub use crate::bb84::*;
    pub use crate::bb84_states::*;
    pub use crate::channel::*;
    pub use crate::error::Bb84Error;
    pub use crate::experiment::*;
    pub use crate::qber::*;
    pub use crate::random::*;
    pub use crate::recorder::*;
    pub use crate::sifting::*;
}
