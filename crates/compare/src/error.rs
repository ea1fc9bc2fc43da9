use omtree_spec::SpecError;
use thiserror::Error;

/// Error raised while computing deltas.
#[derive(Debug, Error)]
pub enum CompareError {
    /// An entry path could not be resolved.
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// A `time` value did not parse as `seconds.nanoseconds` during
    /// tar-time normalization.
    #[error("failed to parse \"time\" key: invalid format {value:?}")]
    InvalidTime {
        /// The offending value.
        value: String,
    },
}
