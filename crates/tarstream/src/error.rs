use std::io;

use omtree_keywords::KeywordError;
use thiserror::Error;

/// Error raised while consuming a tar stream.
#[derive(Debug, Error)]
pub enum TarError {
    /// The archive stream failed or a header was malformed.
    #[error("failed to read tar stream: {0}")]
    Io(#[from] io::Error),

    /// A keyword could not be produced from a header or payload.
    #[error(transparent)]
    Keyword(#[from] KeywordError),

    /// `hierarchy` was called before the stream was drained.
    #[error("tar stream has not been drained to EOF")]
    NotDrained,
}
