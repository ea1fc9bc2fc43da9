#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `omtree_compare` computes discrepancies between two hierarchy
//! manifests: structural ones (an object present on only one side) and
//! keyword-level ones (an object whose attributes differ). The comparison
//! is path-keyed, so two manifests describing the same tree in different
//! entry orders or with different `/set` placement still compare equal.
//!
//! Cross-domain comparisons get special treatment: a manifest synthesized
//! from a tar archive carries `tar_time` (second granularity) where a
//! filesystem walk carries `time`, and the differ normalizes between the
//! two. The delta filter layer handles the remaining tar artifact, the
//! meaningless directory `size`.
//!
//! # Examples
//!
//! ```
//! use omtree_compare::{compare, DifferenceType};
//! use omtree_spec::parse_spec;
//!
//! let old = parse_spec("    f type=file mode=0644\n".as_bytes()).unwrap();
//! let new = parse_spec("    f type=file mode=0600\n".as_bytes()).unwrap();
//!
//! let deltas = compare(Some(&old), Some(&new), None).unwrap();
//! assert_eq!(deltas.len(), 1);
//! assert_eq!(deltas[0].diff(), DifferenceType::Modified);
//! assert_eq!(deltas[0].keys()[0].old(), Some("0644"));
//! ```

mod compare;
mod delta;
mod error;
mod filter;

pub use compare::{compare, compare_same};
pub use delta::{DifferenceType, InodeDelta, KeyDelta};
pub use error::CompareError;
pub use filter::{retain_deltas, strip_tar_directory_sizes};
