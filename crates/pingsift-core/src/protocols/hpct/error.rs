use thiserror::Error;

/// Errors returned by probe header decoding and byte-order conversion.
///
/// # Examples
/// ```
/// use pingsift_core::DecodeError;
///
/// let err = DecodeError::TruncatedHeader { needed: 88, actual: 60 };
/// assert!(err.to_string().contains("probe header truncated"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("probe header truncated: need {needed} hex characters, got {actual}")]
    TruncatedHeader { needed: usize, actual: usize },
    #[error("invalid hex length: {length} characters (expected an even count of 2..=16)")]
    InvalidHexLength { length: usize },
    #[error("invalid hex digit {character:?} at index {index}")]
    InvalidHexDigit { character: char, index: usize },
    #[error("send timestamp out of range: {millis} ms")]
    TimestampOutOfRange { millis: u64 },
}

impl DecodeError {
    pub(crate) fn from_hex(err: hex::FromHexError, length: usize) -> Self {
        match err {
            hex::FromHexError::InvalidHexCharacter { c, index } => DecodeError::InvalidHexDigit {
                character: c,
                index,
            },
            hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
                DecodeError::InvalidHexLength { length }
            }
        }
    }
}
