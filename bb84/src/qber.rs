use crate::error::{Bb84Error, Result};
use crate::sifting::RawKeyPair;

/// Fraction of positions where `key_a` and `key_b` disagree.
///
/// Two empty keys give `0.0`: no data is reported the same way as no error,
/// so callers that care should look at the key length first. Keys of
/// different lengths are an upstream bug and are rejected rather than
/// truncated; this includes one empty key paired with a non-empty one.
pub fn compute_qber(key_a: &[bool], key_b: &[bool]) -> Result<f64> {
    if key_a.len() != key_b.len() {
        return Err(Bb84Error::LengthMismatch {
            what: "raw key",
            expected: key_a.len(),
            got: key_b.len(),
        });
    }
    if key_a.is_empty() {
        return Ok(0.0);
    }

    let errors = key_a.iter().zip(key_b).filter(|(a, b)| a != b).count();
    Ok(errors as f64 / key_a.len() as f64)
}

/// QBER of a sifted key pair, whose halves are equal length by construction.
pub fn estimate_qber(key: &RawKeyPair) -> f64 {
    if key.is_empty() {
        return 0.0;
    }
    key.errors() as f64 / key.len() as f64
}
