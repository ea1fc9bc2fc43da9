use omtree_vis::VisError;
use thiserror::Error;

/// Error produced while parsing a manifest or resolving entry paths.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The underlying stream failed.
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    /// A `/command` other than `/set` or `/unset`.
    #[error("line {line}: unknown special command {name:?}")]
    UnknownSpecial {
        /// 1-based input line number.
        line: usize,
        /// The command as written.
        name: String,
    },

    /// A keyword-bearing line contained invalid UTF-8.
    #[error("line {line}: entry line is not valid UTF-8")]
    InvalidUtf8 {
        /// 1-based input line number.
        line: usize,
    },

    /// The input ended while a `\`-continued line was still open.
    #[error("line {line}: unterminated line continuation")]
    UnterminatedContinuation {
        /// 1-based line number of the continued line.
        line: usize,
    },

    /// A `..` appeared with no directory scope open.
    #[error("line {line}: '..' with no open directory")]
    UnbalancedDotDot {
        /// 1-based input line number.
        line: usize,
    },

    /// An entry name failed to decode.
    #[error("invalid encoded name: {0}")]
    Name(#[from] VisError),
}
