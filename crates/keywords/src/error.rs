use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error produced while producing or updating keyword values.
#[derive(Debug, Error)]
pub enum KeywordError {
    /// A requested keyword has no registered producer.
    #[error("unknown keyword {keyword:?} for file {}", path.display())]
    Unknown {
        /// The keyword as requested.
        keyword: String,
        /// The manifest path the keyword was requested for.
        path: PathBuf,
    },

    /// A keyword value could not be applied because no updater exists.
    #[error("keyword {keyword:?} cannot be updated")]
    NoUpdater {
        /// The keyword as requested.
        keyword: String,
    },

    /// A stored value failed to parse back into its native form.
    #[error("keyword {keyword:?}: invalid value {value:?}: {reason}")]
    InvalidValue {
        /// The keyword whose value is malformed.
        keyword: String,
        /// The offending textual value.
        value: String,
        /// What was expected instead.
        reason: String,
    },

    /// An operating system call failed.
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

    /// A numeric uid has no entry in the user database.
    #[error("no user database entry for uid {uid}")]
    UnknownUid {
        /// The uid that failed to resolve.
        uid: u32,
    },
}

impl KeywordError {
    pub(crate) fn io(context: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn invalid(keyword: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            keyword: keyword.to_owned(),
            value: value.to_owned(),
            reason: reason.into(),
        }
    }
}
