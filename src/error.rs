//! Error types for OW-ChCCA KEM operations.

use std::fmt;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced at component boundaries.
///
/// The set is closed: every fallible operation in the crate maps its
/// failure onto exactly one of these kinds. [`Error::DecapsulationFailed`]
/// is a single value for all four decapsulation checks, so a caller cannot
/// tell which check rejected a ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Absent or structurally invalid public key input.
    InvalidPublicKey,

    /// Absent or structurally invalid private key input.
    InvalidPrivateKey,

    /// Ciphertext length, structure, or embedded length prefix does not
    /// match the parameter set.
    InvalidCiphertext,

    /// One or more of the decapsulation checks failed.
    DecapsulationFailed,

    /// Parameters are inconsistent or unconstructible.
    ParameterValidation(&'static str),

    /// The randomness source failed to produce bytes.
    InvalidRandomSource,

    /// Parameter object is missing required fields.
    InvalidSharedParams,

    /// Encoding failed.
    Serialization(&'static str),

    /// Decoding failed.
    Deserialization(&'static str),

    /// Matrix or vector shapes are incompatible.
    InvalidDimensions,

    /// The prime search crossed its bit-size boundary without a hit.
    PrimeExhausted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPublicKey => write!(f, "owchcca: invalid public key"),
            Error::InvalidPrivateKey => write!(f, "owchcca: invalid private key"),
            Error::InvalidCiphertext => write!(f, "owchcca: invalid ciphertext"),
            Error::DecapsulationFailed => write!(f, "owchcca: decapsulation failed"),
            Error::ParameterValidation(msg) => {
                write!(f, "owchcca: parameter validation failed: {msg}")
            }
            Error::InvalidRandomSource => write!(f, "owchcca: invalid random source"),
            Error::InvalidSharedParams => write!(f, "owchcca: invalid shared parameters"),
            Error::Serialization(msg) => write!(f, "owchcca: serialization error: {msg}"),
            Error::Deserialization(msg) => write!(f, "owchcca: deserialization error: {msg}"),
            Error::InvalidDimensions => write!(f, "owchcca: invalid dimensions"),
            Error::PrimeExhausted => write!(f, "owchcca: prime search exhausted"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::DecapsulationFailed.to_string(),
            "owchcca: decapsulation failed"
        );
        assert_eq!(
            Error::ParameterValidation("k should equal lambda").to_string(),
            "owchcca: parameter validation failed: k should equal lambda"
        );
    }

    #[test]
    fn test_decapsulation_error_is_a_single_value() {
        // All four decapsulation checks collapse onto the same error value.
        let a = Error::DecapsulationFailed;
        let b = Error::DecapsulationFailed;
        assert_eq!(a, b);
    }
}
