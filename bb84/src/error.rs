use thiserror::Error;

#[derive(Error, Debug)]
pub enum Bb84Error {
    #[error("{what}: expected length {expected}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid probability for {name}: {value}. Must be between 0.0 and 1.0")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("Invalid intensity range [{low}, {high})")]
    InvalidRange { low: f64, high: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dataset parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Bb84Error>;

/// Validate probability parameter
pub(crate) fn validate_prob(name: &'static str, p: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(Bb84Error::InvalidProbability { name, value: p });
    }
    Ok(())
}

/// Validate a half-open intensity range `[low, high)` inside `[0, 1]`.
pub(crate) fn validate_range(low: f64, high: f64) -> Result<()> {
    validate_prob("range low", low)?;
    validate_prob("range high", high)?;
    if low > high {
        return Err(Bb84Error::InvalidRange { low, high });
    }
    Ok(())
}
