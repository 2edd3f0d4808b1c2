use crate::bb84_states::{MeasurementBasis, Qubit};
use crate::random::RandomSource;

/// Sender side: draws the value, then the basis, as two independent bits.
pub fn generate_qubit<S: RandomSource + ?Sized>(rng: &mut S) -> Qubit {
    let value = rng.uniform_bit();
    let basis = MeasurementBasis::random(rng);
    Qubit::new(value, basis)
}

/// Result of a receiver measurement.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Measurement {
    pub result: bool,
    pub basis: MeasurementBasis,
}

/// Measures `qubit` in a fixed `basis`.
///
/// A matching basis returns the prepared value without touching `rng`;
/// a conjugate basis yields a fresh uniform bit.
pub fn measure_in_basis<S: RandomSource + ?Sized>(
    qubit: Qubit,
    basis: MeasurementBasis,
    rng: &mut S,
) -> bool {
    if qubit.basis == basis {
        qubit.value
    } else {
        rng.uniform_bit()
    }
}

/// Receiver side: picks a basis uniformly and measures in it.
pub fn measure_qubit<S: RandomSource + ?Sized>(qubit: Qubit, rng: &mut S) -> Measurement {
    let basis = MeasurementBasis::random(rng);
    let result = measure_in_basis(qubit, basis, rng);
    Measurement { result, basis }
}
