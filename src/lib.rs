#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `omtree` produces, parses, compares and applies directory-hierarchy
//! manifests in the style of BSD `mtree(8)`: compact text files that
//! enumerate a tree of filesystem objects with a set of attributes per
//! object. Manifests are used for integrity auditing, reproducible image
//! verification and tar-archive introspection.
//!
//! This crate is the facade over the workspace:
//!
//! - [`WalkBuilder`] walks a live tree into a [`DirectoryHierarchy`].
//! - [`parse_spec`] and [`DirectoryHierarchy::write_to`] convert between
//!   manifests and bytes, byte-exactly for unmutated hierarchies.
//! - [`TarStreamer`] synthesizes a hierarchy from a streamed tar archive.
//! - [`compare`] computes structural and keyword-level deltas between two
//!   hierarchies; [`check`] is walk-plus-compare against disk.
//! - [`update`] applies recorded attribute values back onto a tree.
//!
//! # Examples
//!
//! Walk a tree, serialize the manifest, and verify nothing changed:
//!
//! ```
//! use omtree::{check, WalkBuilder};
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let temp = tempfile::tempdir()?;
//! std::fs::write(temp.path().join("hello"), b"world")?;
//!
//! let dh = WalkBuilder::new(temp.path()).walk()?;
//! let deltas = check(temp.path(), &dh, None, None)?;
//! assert!(deltas.is_empty());
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```

mod check;
mod update;

pub use check::{CheckError, check};
pub use update::{UpdateError, update};

pub use omtree_compare::{
    CompareError, DifferenceType, InodeDelta, KeyDelta, compare, compare_same, retain_deltas,
    strip_tar_directory_sizes,
};
pub use omtree_keywords::{
    DEFAULT_KEYWORDS, DEFAULT_TAR_KEYWORDS, DEFAULT_UPDATE_KEYWORDS, EntryInfo, FileKind,
    InfoSource, KeyVal, Keyword, KeywordError, SET_KEYWORDS, bsd_keywords, default_keywords,
    posix_cksum, synonym,
};
pub use omtree_spec::{DirectoryHierarchy, Entry, EntryType, SpecError, parse_spec};
pub use omtree_tarstream::{TarError, TarStreamer};
pub use omtree_vis::{VisError, VisFlags, unvis, vis};
pub use omtree_walk::{
    DefaultFsEval, Exclude, ExcludeDecision, FsEval, WalkBuilder, WalkError,
    exclude_non_directories,
};
