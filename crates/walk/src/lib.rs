#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `omtree_walk` turns a live directory tree into a manifest. The walk is
//! deterministic: children are visited in ascending encoded-name order, a
//! directory's contents appear between its entry line and a closing `..`,
//! and attribute values come from a single `lstat` per object plus one
//! shared content read for however many digests were requested.
//!
//! Filesystem access goes through the [`FsEval`] trait so hosts can
//! instrument or sandbox the walk; [`DefaultFsEval`] is the plain
//! `std::fs` implementation. Exclusion predicates are tri-state
//! ([`ExcludeDecision`]) so a predicate can drop a whole subtree without
//! the walker having to stat into it.
//!
//! # Errors
//!
//! A walk aborts on the first I/O or keyword failure; partial manifests
//! are never returned.
//!
//! # Examples
//!
//! ```
//! use omtree_walk::WalkBuilder;
//! use omtree_keywords::Keyword;
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let temp = tempfile::tempdir()?;
//! std::fs::write(temp.path().join("hello"), b"world")?;
//!
//! let dh = WalkBuilder::new(temp.path())
//!     .keywords(["size", "type", "sha1digest"].map(Keyword::new))
//!     .walk()?;
//!
//! let mut out = Vec::new();
//! dh.write_to(&mut out)?;
//! let text = String::from_utf8(out)?;
//! assert!(text.contains("hello size=5"));
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```

mod error;
mod exclude;
mod fseval;
mod walker;

pub use error::WalkError;
pub use exclude::{Exclude, ExcludeDecision, exclude_non_directories};
pub use fseval::{DefaultFsEval, FsEval};
pub use walker::WalkBuilder;
