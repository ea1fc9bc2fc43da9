#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `omtree_keywords` implements the attribute engine behind manifest
//! entries. A *keyword* names one attribute of a filesystem object
//! (`size`, `mode`, `sha256digest`, `xattr.user.foo`, ...); for each
//! keyword the crate knows how to *produce* the canonical `keyword=value`
//! text from a stat-like view of an object, and (for a subset) how to
//! *update* the object on disk so it matches a previously recorded value.
//!
//! The stat-like view, [`EntryInfo`], is deliberately source-agnostic: it
//! can be synthesized from live [`std::fs::Metadata`] or from a tar header,
//! so the same producers serve the filesystem walker and the tar
//! synthesizer.
//!
//! Content-consuming keywords (digests and the POSIX `cksum`) are grouped
//! by [`evaluate`] into a single pass over the file bytes, so requesting
//! five digests still reads the file once.

mod cksum;
mod digest_sink;
mod error;
mod info;
mod keyword;
mod producers;
mod registry;
mod uname;
mod updaters;

pub use cksum::posix_cksum;
pub use error::KeywordError;
pub use info::{EntryInfo, FileKind, InfoSource};
pub use keyword::{KeyVal, Keyword, has_keyword, keyval_select, merge_set, synonym};
pub use producers::{evaluate, produce};
pub use registry::{
    DEFAULT_KEYWORDS, DEFAULT_TAR_KEYWORDS, DEFAULT_UPDATE_KEYWORDS, KeywordSpec, SET_KEYWORDS,
    bsd_keywords, default_keywords, is_content_keyword, spec_for,
};
pub use updaters::update;
