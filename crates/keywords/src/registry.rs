use crate::digest_sink::consumes_content;
use crate::keyword::{Keyword, synonym};
use crate::producers::{
    Producer, produce_content, produce_gid, produce_link, produce_mode, produce_nlink,
    produce_size, produce_tar_time, produce_time, produce_type, produce_uid, produce_uname,
    produce_xattr, produce_xattrb64,
};
use crate::updaters::{
    Updater, update_gid, update_mode, update_tar_time, update_time, update_uid, update_xattr,
    update_xattrb64,
};

/// One row of the keyword registry.
///
/// The table is append-only and insertion-ordered; listing functions
/// iterate it in declaration order so output is stable.
pub struct KeywordSpec {
    /// Registry name; prefixed keywords match on their prefix.
    pub name: &'static str,
    /// Included in the filesystem default keyword set.
    pub default: bool,
    /// Known to upstream BSD mtree(8); emitted in compatibility listings.
    pub bsd: bool,
    pub(crate) producer: Producer,
    pub(crate) updater: Option<Updater>,
}

// Synonym rows share producers; the producer consults the requested
// keyword to pick the algorithm and the emitted spelling.
static REGISTRY: &[KeywordSpec] = &[
    KeywordSpec { name: "size", default: true, bsd: true, producer: produce_size, updater: None },
    KeywordSpec { name: "type", default: true, bsd: true, producer: produce_type, updater: None },
    KeywordSpec { name: "uid", default: true, bsd: true, producer: produce_uid, updater: Some(update_uid) },
    KeywordSpec { name: "gid", default: true, bsd: true, producer: produce_gid, updater: Some(update_gid) },
    KeywordSpec { name: "mode", default: true, bsd: true, producer: produce_mode, updater: Some(update_mode) },
    KeywordSpec { name: "link", default: true, bsd: true, producer: produce_link, updater: None },
    KeywordSpec { name: "nlink", default: true, bsd: true, producer: produce_nlink, updater: None },
    KeywordSpec { name: "time", default: true, bsd: true, producer: produce_time, updater: Some(update_time) },
    KeywordSpec { name: "tar_time", default: false, bsd: false, producer: produce_tar_time, updater: Some(update_tar_time) },
    KeywordSpec { name: "uname", default: false, bsd: true, producer: produce_uname, updater: None },
    KeywordSpec { name: "cksum", default: false, bsd: true, producer: produce_content, updater: None },
    KeywordSpec { name: "md5", default: false, bsd: true, producer: produce_content, updater: None },
    KeywordSpec { name: "md5digest", default: false, bsd: true, producer: produce_content, updater: None },
    KeywordSpec { name: "rmd160", default: false, bsd: true, producer: produce_content, updater: None },
    KeywordSpec { name: "rmd160digest", default: false, bsd: true, producer: produce_content, updater: None },
    KeywordSpec { name: "ripemd160digest", default: false, bsd: true, producer: produce_content, updater: None },
    KeywordSpec { name: "sha1", default: false, bsd: true, producer: produce_content, updater: None },
    KeywordSpec { name: "sha1digest", default: false, bsd: true, producer: produce_content, updater: None },
    KeywordSpec { name: "sha256", default: false, bsd: true, producer: produce_content, updater: None },
    KeywordSpec { name: "sha256digest", default: false, bsd: true, producer: produce_content, updater: None },
    KeywordSpec { name: "sha384", default: false, bsd: true, producer: produce_content, updater: None },
    KeywordSpec { name: "sha384digest", default: false, bsd: true, producer: produce_content, updater: None },
    KeywordSpec { name: "sha512", default: false, bsd: true, producer: produce_content, updater: None },
    KeywordSpec { name: "sha512digest", default: false, bsd: true, producer: produce_content, updater: None },
    KeywordSpec { name: "xattr", default: false, bsd: false, producer: produce_xattr, updater: Some(update_xattr) },
    KeywordSpec { name: "xattrb64", default: false, bsd: false, producer: produce_xattrb64, updater: Some(update_xattrb64) },
];

/// The filesystem default keyword set.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "size", "type", "uid", "gid", "mode", "link", "nlink", "time",
];

/// The tar default keyword set; `nlink` is unreliable in archives and
/// `tar_time` replaces `time` since headers are second-granular.
pub const DEFAULT_TAR_KEYWORDS: &[&str] = &[
    "size", "type", "uid", "gid", "uname", "mode", "link", "tar_time",
];

/// Keywords a walker hoists into its leading `/set` line.
pub const SET_KEYWORDS: &[&str] = &["uid", "gid"];

/// Keywords applied to disk by default during an update.
pub const DEFAULT_UPDATE_KEYWORDS: &[&str] = &["uid", "gid", "mode", "time", "xattr"];

/// Looks up the registry row for a keyword, matching prefixed keywords on
/// their prefix (`xattr.user.foo` resolves the `xattr` row).
#[must_use]
pub fn spec_for(keyword: &Keyword) -> Option<&'static KeywordSpec> {
    REGISTRY.iter().find(|spec| spec.name == keyword.prefix())
}

/// All keywords marked as filesystem defaults, in registry order.
#[must_use]
pub fn default_keywords() -> Vec<Keyword> {
    REGISTRY
        .iter()
        .filter(|spec| spec.default)
        .map(|spec| Keyword::new(spec.name))
        .collect()
}

/// All keywords upstream BSD mtree understands, in registry order.
#[must_use]
pub fn bsd_keywords() -> Vec<Keyword> {
    REGISTRY
        .iter()
        .filter(|spec| spec.bsd)
        .map(|spec| Keyword::new(spec.name))
        .collect()
}

/// Whether the keyword consumes file content (digests and `cksum`).
#[must_use]
pub fn is_content_keyword(keyword: &Keyword) -> bool {
    consumes_content(synonym(keyword.prefix()).as_str())
}
