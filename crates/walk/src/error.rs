use std::io;
use std::path::{Path, PathBuf};

use omtree_keywords::KeywordError;
use thiserror::Error;

/// Error that terminates a walk.
///
/// Walks abort on the first failure; a partially produced manifest would
/// silently under-describe the tree, which is worse than no manifest.
#[derive(Debug, Error)]
pub enum WalkError {
    /// A filesystem operation failed.
    #[error("failed to {context} '{}': {source}", path.display())]
    Io {
        /// The operation being performed.
        context: &'static str,
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// A keyword could not be produced.
    #[error(transparent)]
    Keyword(#[from] KeywordError),

    /// `time` and `tar_time` were both requested; manifests carry one or
    /// the other, and comparison normalizes between them.
    #[error("cannot request both 'time' and 'tar_time' keywords")]
    ConflictingTimeKeywords,
}

impl WalkError {
    pub(crate) fn io(context: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }
}
