#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `omtree_vis` provides a byte-oriented implementation of the BSD `vis(3)`
//! encoding used by mtree manifests to represent arbitrary path names as
//! 7-bit-safe text. Manifest lines are tokenized on ASCII whitespace, so any
//! byte that would confuse the tokenizer (whitespace, `#`, `=`, glob
//! metacharacters, the escape character itself) must be rendered in an
//! escaped form that a later [`unvis`] call reverses exactly.
//!
//! Unlike the historical rune-based implementations, this crate operates on
//! raw bytes. Path names on Unix systems are byte strings with no encoding
//! guarantee; treating them as Unicode would reject valid file names.
//!
//! # Invariants
//!
//! - [`vis`] output is always printable ASCII.
//! - `unvis(&vis(b, f), f) == b` for every byte sequence `b` and any flag
//!   set `f` that does not contain [`VisFlags::NO_SLASH`].
//! - [`unvis`] fails loudly on malformed escape sequences; it never guesses.
//!
//! # Examples
//!
//! ```
//! use omtree_vis::{vis, unvis, VisFlags};
//!
//! let encoded = vis(b"with space", VisFlags::MANIFEST);
//! assert_eq!(encoded, "with\\040space");
//! assert_eq!(unvis(&encoded, VisFlags::MANIFEST).unwrap(), b"with space");
//! ```

mod decode;
mod encode;
mod error;
mod flags;

pub use decode::unvis;
pub use encode::vis;
pub use error::VisError;
pub use flags::VisFlags;
