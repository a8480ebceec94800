//! Error types for biotope_core.
//!
//! Only structural problems are errors: a bad trait name, a species outside the
//! configured range, a malformed config file. Per-tick data conditions (a full registry,
//! a stale id, a count mismatch) are reported through outcome enums instead.

use thiserror::Error;

/// Main error type for biotope_core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Trait name missing from the trait table
    #[error("Unknown trait: {0}")]
    UnknownTrait(String),

    /// Species id outside `1..=8`
    #[error("Unknown species: {0}")]
    UnknownSpecies(i64),

    /// Trait exists but carries no global value
    #[error("Trait {0} has no global value")]
    MissingGlobal(String),

    /// Trait has neither a global nor a per-species value for this species
    #[error("Trait {name} has no value for species {species}")]
    MissingValue { name: String, species: u8 },

    /// Per-species list does not have one entry per species
    #[error("Trait {name} lists {len} species values, expected {expected}")]
    SpeciesTableLength {
        name: String,
        len: usize,
        expected: usize,
    },

    /// Value outside the trait's declared range
    #[error("Trait {name} = {value} outside [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Value present but unusable (e.g. a fractional species reference)
    #[error("Trait {name} has invalid value {value}: {reason}")]
    InvalidValue {
        name: String,
        value: f64,
        reason: String,
    },

    /// Cross-field validation failure
    #[error("Validation error: {0}")]
    Validation(String),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// File system errors
    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),
}

/// Result type alias for biotope_core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Creates a new unknown trait error.
    #[must_use]
    pub fn unknown_trait<S: Into<String>>(name: S) -> Self {
        Self::UnknownTrait(name.into())
    }

    /// Creates a new validation error.
    #[must_use]
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a new invalid value error.
    #[must_use]
    pub fn invalid_value<S: Into<String>, R: Into<String>>(name: S, value: f64, reason: R) -> Self {
        Self::InvalidValue {
            name: name.into(),
            value,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::unknown_trait("MAX_SPEED");
        assert_eq!(err.to_string(), "Unknown trait: MAX_SPEED");
    }

    #[test]
    fn test_out_of_range_display() {
        let err = CoreError::OutOfRange {
            name: "MAX_FORCE".into(),
            value: 5000.0,
            min: 0.0,
            max: 1000.0,
        };
        assert!(err.to_string().contains("MAX_FORCE = 5000"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CoreError = io_err.into();
        assert!(matches!(err, CoreError::FileSystem(_)));
    }
}
