//! Transmission from sender to receiver.
//!
//! Each call runs two independent Bernoulli trials with fresh draws: first an
//! intercept-resend eavesdropper with probability `attack_intensity`, then a
//! bit flip with probability `noise_level` applied to whatever is forwarded.
//! Both draws happen on every call, so the number of reals consumed per qubit
//! does not depend on the parameters.

use crate::bb84::measure_in_basis;
use crate::bb84_states::{MeasurementBasis, Qubit};
use crate::error::{validate_prob, Result};
use crate::random::RandomSource;

/// Intercept-resend attacker.
///
/// Measures in a basis of its own choosing and re-prepares the qubit in that
/// basis. The sender's basis is lost, which is what makes the attack visible
/// as extra error after sifting.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Eavesdropper;

impl Eavesdropper {
    pub fn intercept<S: RandomSource + ?Sized>(&self, qubit: Qubit, rng: &mut S) -> Qubit {
        let basis = MeasurementBasis::random(rng);
        let value = measure_in_basis(qubit, basis, rng);
        Qubit::new(value, basis)
    }
}

/// What happened to one qubit in flight.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Transmission {
    pub qubit: Qubit,
    pub intercepted: bool,
    pub noise_flipped: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Channel {
    noise_level: f64,
    attack_intensity: f64,
    eavesdropper: Eavesdropper,
}

impl Channel {
    pub fn new(noise_level: f64, attack_intensity: f64) -> Result<Self> {
        validate_prob("noise level", noise_level)?;
        validate_prob("attack intensity", attack_intensity)?;
        Ok(Self {
            noise_level,
            attack_intensity,
            eavesdropper: Eavesdropper,
        })
    }

    /// Noisy channel without an eavesdropper.
    pub fn noisy(noise_level: f64) -> Result<Self> {
        Self::new(noise_level, 0.0)
    }

    pub fn noise_level(&self) -> f64 {
        self.noise_level
    }

    pub fn attack_intensity(&self) -> f64 {
        self.attack_intensity
    }

    pub fn transmit<S: RandomSource + ?Sized>(&self, qubit: Qubit, rng: &mut S) -> Qubit {
        self.transmit_traced(qubit, rng).qubit
    }

    pub fn transmit_traced<S: RandomSource + ?Sized>(
        &self,
        qubit: Qubit,
        rng: &mut S,
    ) -> Transmission {
        let mut forwarded = qubit;

        let intercepted = rng.uniform_real() < self.attack_intensity;
        if intercepted {
            forwarded = self.eavesdropper.intercept(forwarded, rng);
        }

        let noise_flipped = rng.uniform_real() < self.noise_level;
        if noise_flipped {
            forwarded = forwarded.flipped();
        }

        Transmission {
            qubit: forwarded,
            intercepted,
            noise_flipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bb84_states::BB84State;
    use crate::error::Bb84Error;
    use crate::random::testing::{CountingSource, ScriptedSource};
    use crate::random::SeededSource;

    #[test]
    fn test_rejects_out_of_range_parameters() {
        assert!(matches!(
            Channel::new(1.5, 0.0),
            Err(Bb84Error::InvalidProbability { name: "noise level", .. })
        ));
        assert!(matches!(
            Channel::new(0.0, -0.1),
            Err(Bb84Error::InvalidProbability { name: "attack intensity", .. })
        ));
    }

    #[test]
    fn test_clean_channel_is_identity() {
        let channel = Channel::new(0.0, 0.0).unwrap();
        let mut rng = SeededSource::from_seed(1);
        for state in [
            BB84State::QubitZero,
            BB84State::QubitOne,
            BB84State::QubitPlus,
            BB84State::QubitMinus,
        ] {
            for _ in 0..50 {
                let q = Qubit::from(state);
                assert_eq!(channel.transmit(q, &mut rng), q);
            }
        }
    }

    #[test]
    fn test_always_two_real_draws() {
        let channel = Channel::new(0.3, 0.3).unwrap();
        let mut rng = CountingSource::new(SeededSource::from_seed(2));
        let q = Qubit::new(true, MeasurementBasis::Rectilinear);
        for _ in 0..1000 {
            channel.transmit(q, &mut rng);
        }
        assert_eq!(rng.reals, 2000);
    }

    #[test]
    fn test_intercept_same_basis_keeps_value() {
        let channel = Channel::new(0.0, 0.5).unwrap();
        let q = Qubit::new(true, MeasurementBasis::Diagonal);
        // intercept check fires, eve picks diagonal, noise check misses
        let mut rng = ScriptedSource::new(&[true], &[0.1, 0.9]);
        let t = channel.transmit_traced(q, &mut rng);
        assert!(t.intercepted);
        assert!(!t.noise_flipped);
        assert_eq!(t.qubit, q);
        assert!(rng.is_exhausted());
    }

    #[test]
    fn test_intercept_wrong_basis_resends_in_eve_basis() {
        let channel = Channel::new(0.0, 1.0).unwrap();
        let q = Qubit::new(true, MeasurementBasis::Rectilinear);
        // eve picks diagonal, then draws outcome 0
        let mut rng = ScriptedSource::new(&[true, false], &[0.0, 0.5]);
        let t = channel.transmit_traced(q, &mut rng);
        assert_eq!(t.qubit.state(), BB84State::QubitPlus);
        assert!(rng.is_exhausted());
    }

    #[test]
    fn test_noise_flips_forwarded_value() {
        let channel = Channel::new(0.5, 0.5).unwrap();
        let q = Qubit::new(false, MeasurementBasis::Rectilinear);
        // eve measures rectilinear (match), then noise fires
        let mut rng = ScriptedSource::new(&[false], &[0.2, 0.4]);
        let t = channel.transmit_traced(q, &mut rng);
        assert!(t.intercepted && t.noise_flipped);
        assert_eq!(t.qubit.state(), BB84State::QubitOne);
    }

    #[test]
    fn test_boundary_draw_does_not_fire() {
        // strict less-than: r == p is a miss
        let channel = Channel::new(0.25, 0.25).unwrap();
        let q = Qubit::new(false, MeasurementBasis::Rectilinear);
        let mut rng = ScriptedSource::new(&[], &[0.25, 0.25]);
        let t = channel.transmit_traced(q, &mut rng);
        assert!(!t.intercepted && !t.noise_flipped);
    }

    #[test]
    fn test_noise_rate_matches_level() {
        let channel = Channel::noisy(0.1).unwrap();
        let mut rng = SeededSource::from_seed(4);
        let q = Qubit::new(false, MeasurementBasis::Rectilinear);
        let n = 20000;
        let flips = (0..n)
            .filter(|_| channel.transmit_traced(q, &mut rng).noise_flipped)
            .count();
        let rate = flips as f64 / n as f64;
        assert!((rate - 0.1).abs() < 0.01, "flip rate {}", rate);
    }
}
