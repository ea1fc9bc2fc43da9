#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `omtree_tarstream` reconstructs a directory tree from a streamed tar
//! archive and renders it as a manifest, without ever extracting to disk.
//! Archive payloads are hashed in the same pass that reads the headers, so
//! a single sweep over a non-seekable stream yields both structure and
//! content digests.
//!
//! Archives frequently omit headers for intermediate directories (or for
//! the root itself); the streamer materializes *placeholder* entries for
//! those, inheriting ownership from the first described child. Hard links
//! are recognized and the whole link group shares content keywords and a
//! reference count.
//!
//! # Examples
//!
//! ```
//! use omtree_tarstream::TarStreamer;
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = tar::Builder::new(Vec::new());
//! let mut header = tar::Header::new_ustar();
//! header.set_path("hello.txt")?;
//! header.set_size(5);
//! header.set_mode(0o644);
//! header.set_uid(0);
//! header.set_gid(0);
//! header.set_cksum();
//! builder.append(&header, &b"world"[..])?;
//! let archive = builder.into_inner()?;
//!
//! let mut streamer = TarStreamer::new(&archive[..], Vec::new(), None);
//! streamer.drain()?;
//! let dh = streamer.hierarchy()?;
//!
//! let mut out = Vec::new();
//! dh.write_to(&mut out)?;
//! assert!(String::from_utf8(out)?.contains("hello.txt size=5"));
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```

mod error;
mod streamer;

pub use error::TarError;
pub use streamer::TarStreamer;
