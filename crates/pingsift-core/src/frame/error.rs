use thiserror::Error;

/// Errors returned by link-layer slicing.
///
/// Note: this error type lives in an internal module; the example is
/// illustrative and not compiled as a public doctest.
///
/// # Examples
/// ```text
/// use pingsift_core::FrameError;
///
/// let err = FrameError::Slice("unexpected end of slice".to_string());
/// assert!(err.to_string().contains("packet slice error"));
/// ```
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("packet slice error: {0}")]
    Slice(String),
}
