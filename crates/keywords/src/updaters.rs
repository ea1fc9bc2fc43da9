//! Restoring recorded keyword values onto the filesystem.

#![allow(unsafe_code)]

use std::path::Path;

use filetime::FileTime;
use rustix::fs::{AtFlags, CWD};
use tracing::debug;

use crate::error::KeywordError;
use crate::keyword::Keyword;
use crate::registry::spec_for;

/// Signature shared by every keyword updater.
pub(crate) type Updater = fn(&Keyword, &Path, &str) -> Result<(), KeywordError>;

fn parse_id(keyword: &Keyword, value: &str) -> Result<u32, KeywordError> {
    value
        .parse::<u32>()
        .map_err(|_| KeywordError::invalid(keyword.as_str(), value, "expected a numeric id"))
}

// Mirrors lchown: ids apply to the link itself, never the target.
fn chown_no_follow(
    path: &Path,
    uid: Option<u32>,
    gid: Option<u32>,
) -> Result<(), std::io::Error> {
    // SAFETY: the raw ids come straight from a parsed manifest value; any
    // u32 is a representable uid_t/gid_t.
    let uid = uid.map(|raw| unsafe { rustix::fs::Uid::from_raw(raw) });
    let gid = gid.map(|raw| unsafe { rustix::fs::Gid::from_raw(raw) });
    rustix::fs::chownat(CWD, path, uid, gid, AtFlags::SYMLINK_NOFOLLOW)
        .map_err(std::io::Error::from)
}

pub(crate) fn update_uid(
    keyword: &Keyword,
    path: &Path,
    value: &str,
) -> Result<(), KeywordError> {
    let uid = parse_id(keyword, value)?;
    chown_no_follow(path, Some(uid), None)
        .map_err(|source| KeywordError::io("change owner of", path, source))
}

pub(crate) fn update_gid(
    keyword: &Keyword,
    path: &Path,
    value: &str,
) -> Result<(), KeywordError> {
    let gid = parse_id(keyword, value)?;
    chown_no_follow(path, None, Some(gid))
        .map_err(|source| KeywordError::io("change group of", path, source))
}

pub(crate) fn update_mode(
    keyword: &Keyword,
    path: &Path,
    value: &str,
) -> Result<(), KeywordError> {
    let bits = u32::from_str_radix(value, 8)
        .map_err(|_| KeywordError::invalid(keyword.as_str(), value, "expected octal mode bits"))?;

    let metadata = std::fs::symlink_metadata(path)
        .map_err(|source| KeywordError::io("inspect", path, source))?;
    if metadata.file_type().is_symlink() {
        // Symlink permission bits are ignored by the kernel; chmod would
        // follow the link and touch the wrong inode.
        debug!(path = %path.display(), "skipping mode update on symlink");
        return Ok(());
    }

    rustix::fs::chmod(path, rustix::fs::Mode::from_raw_mode(bits & 0o7777))
        .map_err(|errno| KeywordError::io("change mode of", path, std::io::Error::from(errno)))
}

fn parse_time(keyword: &Keyword, value: &str) -> Result<(i64, u32), KeywordError> {
    let invalid = || {
        KeywordError::invalid(
            keyword.as_str(),
            value,
            "expected seconds.nanoseconds like 1469104727.000000000",
        )
    };
    let (sec, nsec) = value.split_once('.').ok_or_else(invalid)?;
    let sec: i64 = sec.parse().map_err(|_| invalid())?;
    if nsec.is_empty() || !nsec.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    // Canonical values carry nine digits; shorter values are scaled as a
    // decimal fraction.
    let mut nanos: u64 = nsec.parse().map_err(|_| invalid())?;
    for _ in nsec.len()..9 {
        nanos *= 10;
    }
    if nanos >= 1_000_000_000 {
        return Err(invalid());
    }
    Ok((sec, nanos as u32))
}

pub(crate) fn update_time(
    keyword: &Keyword,
    path: &Path,
    value: &str,
) -> Result<(), KeywordError> {
    let (sec, nsec) = parse_time(keyword, value)?;
    let time = FileTime::from_unix_time(sec, nsec);
    filetime::set_symlink_file_times(path, time, time)
        .map_err(|source| KeywordError::io("change times of", path, source))
}

// tar_time is second-granular. When the on-disk seconds already agree the
// file may carry a more precise nanosecond value that a blind write would
// destroy, so only mismatched seconds trigger a change.
pub(crate) fn update_tar_time(
    keyword: &Keyword,
    path: &Path,
    value: &str,
) -> Result<(), KeywordError> {
    let (sec, _) = parse_time(keyword, value)?;

    let metadata = std::fs::symlink_metadata(path)
        .map_err(|source| KeywordError::io("inspect", path, source))?;
    if FileTime::from_last_modification_time(&metadata).unix_seconds() == sec {
        return Ok(());
    }

    let time = FileTime::from_unix_time(sec, 0);
    filetime::set_symlink_file_times(path, time, time)
        .map_err(|source| KeywordError::io("change times of", path, source))
}

fn set_xattr_from_base64(
    keyword: &Keyword,
    path: &Path,
    value: &str,
) -> Result<(), KeywordError> {
    use base64::Engine as _;

    let Some(name) = keyword.suffix() else {
        return Err(KeywordError::invalid(
            keyword.as_str(),
            value,
            "expected a prefixed keyword naming the attribute",
        ));
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(value)
        .map_err(|_| KeywordError::invalid(keyword.as_str(), value, "expected base64 bytes"))?;
    xattr::set(path, name, &bytes)
        .map_err(|source| KeywordError::io("write extended attribute of", path, source))
}

pub(crate) fn update_xattr(
    keyword: &Keyword,
    path: &Path,
    value: &str,
) -> Result<(), KeywordError> {
    set_xattr_from_base64(keyword, path, value)
}

pub(crate) fn update_xattrb64(
    keyword: &Keyword,
    path: &Path,
    value: &str,
) -> Result<(), KeywordError> {
    set_xattr_from_base64(keyword, path, value)
}

/// Applies one recorded keyword value to the object at `path`.
///
/// # Errors
///
/// [`KeywordError::Unknown`] for unregistered keywords,
/// [`KeywordError::NoUpdater`] for read-only keywords (digests, `size`,
/// `type`, ...), and I/O or value-parse failures from the updater itself.
pub fn update(keyword: &Keyword, path: &Path, value: &str) -> Result<(), KeywordError> {
    let spec = spec_for(keyword).ok_or_else(|| KeywordError::Unknown {
        keyword: keyword.as_str().to_owned(),
        path: path.to_path_buf(),
    })?;
    let updater = spec.updater.ok_or_else(|| KeywordError::NoUpdater {
        keyword: keyword.as_str().to_owned(),
    })?;
    debug!(keyword = %keyword, path = %path.display(), "applying keyword value");
    updater(keyword, path, value)
}
