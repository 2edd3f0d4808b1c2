use crate::random::RandomSource;
use std::fmt;

/// Polarisation state a prepared qubit stands for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BB84State {
    QubitZero,
    QubitOne,
    QubitPlus,  // Represents the |+> state
    QubitMinus, // Represents the |-> state
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MeasurementBasis {
    /// Z basis, bit 0.
    Rectilinear,
    /// X basis, bit 1.
    Diagonal,
}

impl MeasurementBasis {
    /// Draws a basis with one uniform bit.
    pub fn random<S: RandomSource + ?Sized>(rng: &mut S) -> Self {
        Self::from_bit(rng.uniform_bit())
    }

    pub fn from_bit(bit: bool) -> Self {
        if bit {
            MeasurementBasis::Diagonal
        } else {
            MeasurementBasis::Rectilinear
        }
    }

    pub fn as_bit(self) -> bool {
        matches!(self, MeasurementBasis::Diagonal)
    }
}

pub type Basis = MeasurementBasis;

/// A prepared qubit, reduced to its classical `(value, basis)` pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Qubit {
    pub value: bool,
    pub basis: Basis,
}

impl Qubit {
    pub fn new(value: bool, basis: Basis) -> Self {
        Self { value, basis }
    }

    /// Builds a qubit from `0`/`1` encoded value and basis.
    pub fn from_bits(value: u8, basis: u8) -> Self {
        Self::new(value != 0, Basis::from_bit(basis != 0))
    }

    pub fn state(&self) -> BB84State {
        match (self.basis, self.value) {
            (MeasurementBasis::Rectilinear, false) => BB84State::QubitZero,
            (MeasurementBasis::Rectilinear, true) => BB84State::QubitOne,
            (MeasurementBasis::Diagonal, false) => BB84State::QubitPlus,
            (MeasurementBasis::Diagonal, true) => BB84State::QubitMinus,
        }
    }

    /// Same basis, opposite value.
    pub fn flipped(self) -> Self {
        Self {
            value: !self.value,
            ..self
        }
    }
}

impl From<BB84State> for Qubit {
    fn from(state: BB84State) -> Self {
        match state {
            BB84State::QubitZero => Qubit::new(false, MeasurementBasis::Rectilinear),
            BB84State::QubitOne => Qubit::new(true, MeasurementBasis::Rectilinear),
            BB84State::QubitPlus => Qubit::new(false, MeasurementBasis::Diagonal),
            BB84State::QubitMinus => Qubit::new(true, MeasurementBasis::Diagonal),
        }
    }
}

impl fmt::Display for BB84State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ket = match self {
            BB84State::QubitZero => "|0>",
            BB84State::QubitOne => "|1>",
            BB84State::QubitPlus => "|+>",
            BB84State::QubitMinus => "|->",
        };
        f.pad(ket)
    }
}
