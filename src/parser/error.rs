use crate::error::Error;

/// Wrap a lower-level decode failure with the raw line that produced it, so
/// the caller's logs carry enough context to reproduce the failure.
pub fn with_raw_context(raw: &str, err: Error) -> Error {
    match err {
        Error::FormatError(msg) => Error::FormatError(format!("{msg} (raw: '{raw}')")),
        other => other,
    }
}
