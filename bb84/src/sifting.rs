use crate::bb84::Measurement;
use crate::bb84_states::{MeasurementBasis, Qubit};
use crate::error::{Bb84Error, Result};

/// Sender and receiver bits at the positions where their bases agreed.
///
/// Both sequences always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawKeyPair {
    sender_bits: Vec<bool>,
    receiver_bits: Vec<bool>,
}

impl RawKeyPair {
    pub fn sender_bits(&self) -> &[bool] {
        &self.sender_bits
    }

    pub fn receiver_bits(&self) -> &[bool] {
        &self.receiver_bits
    }

    pub fn len(&self) -> usize {
        self.sender_bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender_bits.is_empty()
    }

    /// Number of positions where the two keys disagree.
    pub fn errors(&self) -> usize {
        self.sender_bits
            .iter()
            .zip(&self.receiver_bits)
            .filter(|(a, b)| a != b)
            .count()
    }

    pub fn into_parts(self) -> (Vec<bool>, Vec<bool>) {
        (self.sender_bits, self.receiver_bits)
    }

    fn push(&mut self, sender: bool, receiver: bool) {
        self.sender_bits.push(sender);
        self.receiver_bits.push(receiver);
    }
}

/// Keeps index `i` when the sender's basis equals the receiver's, in order.
///
/// All three inputs describe the same transmitted qubits and must have the
/// same length.
pub fn sift(
    sender_qubits: &[Qubit],
    receiver_bases: &[MeasurementBasis],
    receiver_results: &[bool],
) -> Result<RawKeyPair> {
    let n = sender_qubits.len();
    check_len("receiver bases", n, receiver_bases.len())?;
    check_len("receiver results", n, receiver_results.len())?;

    let mut key = RawKeyPair::default();
    for ((qubit, &basis), &result) in sender_qubits
        .iter()
        .zip(receiver_bases)
        .zip(receiver_results)
    {
        if qubit.basis == basis {
            key.push(qubit.value, result);
        }
    }
    Ok(key)
}

/// [`sift`] over receiver [`Measurement`]s.
pub fn sift_measurements(
    sender_qubits: &[Qubit],
    measurements: &[Measurement],
) -> Result<RawKeyPair> {
    check_len("receiver measurements", sender_qubits.len(), measurements.len())?;

    let mut key = RawKeyPair::default();
    for (qubit, m) in sender_qubits.iter().zip(measurements) {
        if qubit.basis == m.basis {
            key.push(qubit.value, m.result);
        }
    }
    Ok(key)
}

fn check_len(what: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(Bb84Error::LengthMismatch {
            what,
            expected,
            got,
        });
    }
    Ok(())
}
