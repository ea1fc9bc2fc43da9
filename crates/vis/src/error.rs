use thiserror::Error;

/// Error produced when decoding a malformed escape sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VisError {
    /// The input ended in the middle of an escape sequence.
    #[error("encoded input ends mid-escape")]
    Truncated,

    /// An escape sequence named a character with no meaning.
    #[error("unknown escape character {0:?}")]
    UnknownEscape(char),

    /// A `\xHH` or `%XX` escape contained a non-hex digit.
    #[error("invalid hex digit {0:?} in escape")]
    InvalidHexDigit(char),
}
