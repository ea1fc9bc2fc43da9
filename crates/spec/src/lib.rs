#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `omtree_spec` holds the manifest data model: the entry arena, the
//! line-oriented parser, and the serializer. A manifest is a context
//! sensitive text format; `/set` installs a default-attribute scope that
//! later entries inherit, Relative entries attach to the innermost open
//! directory, and `..` walks back out. The parser resolves all of that
//! into flat [`Entry`] records connected by arena indices.
//!
//! # Invariants
//!
//! - Parsing then serializing an unmutated hierarchy reproduces the input
//!   byte-for-byte, including comments, blank lines, and indented `..`
//!   markers.
//! - A Relative entry's parent is the nearest preceding unclosed
//!   `type=dir` entry; `..` with no open directory is a parse error.
//! - Scope links are resolved at parse time and never rewritten.
//!
//! # Examples
//!
//! ```
//! use omtree_spec::{parse_spec, EntryType};
//!
//! let input = b"#mtree v2.0\n/set uid=0\n. type=dir\n    f type=file size=3\n..\n";
//! let dh = parse_spec(&input[..]).unwrap();
//!
//! let mut out = Vec::new();
//! dh.write_to(&mut out).unwrap();
//! assert_eq!(out, input);
//!
//! let file = dh
//!     .entries()
//!     .iter()
//!     .position(|e| e.kind == EntryType::Relative && e.name == "f")
//!     .unwrap();
//! assert_eq!(dh.path(file).unwrap(), std::path::PathBuf::from("f"));
//! ```

mod entry;
mod error;
mod hierarchy;
mod parse;
mod pathclean;

pub use entry::{Entry, EntryType};
pub use error::SpecError;
pub use hierarchy::DirectoryHierarchy;
pub use parse::parse_spec;
pub use pathclean::{clean, clean_str};
