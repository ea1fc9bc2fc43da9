use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use digest::Digest as _;
use omtree_vis::{VisFlags, vis};

use crate::digest_sink::{ContentSinks, consumes_content, hex};
use crate::error::KeywordError;
use crate::info::{EntryInfo, InfoSource};
use crate::keyword::{KeyVal, Keyword, synonym};
use crate::registry::spec_for;

/// Signature shared by every keyword producer.
///
/// Producers receive the keyword as requested (so synonyms emit under the
/// spelling the caller asked for), the manifest path, the stat view, and an
/// optional content reader for content-consuming keywords. An empty result
/// means the keyword does not apply to this object.
pub(crate) type Producer = fn(
    &Keyword,
    &Path,
    &EntryInfo,
    Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError>;

fn one(keyword: &Keyword, value: impl Into<String>) -> Vec<KeyVal> {
    vec![KeyVal::new(keyword.clone(), value)]
}

pub(crate) fn produce_size(
    keyword: &Keyword,
    _path: &Path,
    info: &EntryInfo,
    _reader: Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError> {
    Ok(one(keyword, info.size.to_string()))
}

pub(crate) fn produce_type(
    keyword: &Keyword,
    _path: &Path,
    info: &EntryInfo,
    _reader: Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError> {
    Ok(one(keyword, info.kind.manifest_name()))
}

// Permission bits plus setuid/setgid/sticky, rendered the way mtree(8)
// does: a leading zero followed by octal digits.
pub(crate) fn produce_mode(
    keyword: &Keyword,
    _path: &Path,
    info: &EntryInfo,
    _reader: Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError> {
    let bits = info.mode & 0o7777;
    let value = if bits == 0 {
        "0".to_owned()
    } else {
        format!("0{bits:o}")
    };
    Ok(one(keyword, value))
}

pub(crate) fn produce_uid(
    keyword: &Keyword,
    _path: &Path,
    info: &EntryInfo,
    _reader: Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError> {
    Ok(one(keyword, info.uid.to_string()))
}

pub(crate) fn produce_gid(
    keyword: &Keyword,
    _path: &Path,
    info: &EntryInfo,
    _reader: Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError> {
    Ok(one(keyword, info.gid.to_string()))
}

pub(crate) fn produce_uname(
    keyword: &Keyword,
    path: &Path,
    info: &EntryInfo,
    _reader: Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError> {
    if let Some(uname) = &info.uname {
        return Ok(one(keyword, uname.clone()));
    }
    if info.source == InfoSource::Tar {
        // Tar headers without a uname have nothing to resolve against.
        return Ok(Vec::new());
    }
    match crate::uname::lookup_user_name(info.uid)
        .map_err(|source| KeywordError::io("resolve owner of", path, source))?
    {
        Some(name) => Ok(one(keyword, name)),
        None => Err(KeywordError::UnknownUid { uid: info.uid }),
    }
}

pub(crate) fn produce_nlink(
    keyword: &Keyword,
    _path: &Path,
    info: &EntryInfo,
    _reader: Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError> {
    match info.nlink {
        Some(n) => Ok(one(keyword, n.to_string())),
        None => Ok(Vec::new()),
    }
}

pub(crate) fn produce_link(
    keyword: &Keyword,
    path: &Path,
    info: &EntryInfo,
    _reader: Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError> {
    if !matches!(info.kind, crate::info::FileKind::Symlink) {
        return Ok(Vec::new());
    }
    let target: Vec<u8> = match &info.link_target {
        Some(target) => target.clone(),
        None => {
            #[cfg(unix)]
            {
                use std::os::unix::ffi::OsStrExt;
                let target = std::fs::read_link(path)
                    .map_err(|source| KeywordError::io("read symlink target of", path, source))?;
                target.as_os_str().as_bytes().to_vec()
            }
            #[cfg(not(unix))]
            {
                return Ok(Vec::new());
            }
        }
    };
    Ok(one(keyword, vis(&target, VisFlags::MANIFEST)))
}

pub(crate) fn produce_time(
    keyword: &Keyword,
    _path: &Path,
    info: &EntryInfo,
    _reader: Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError> {
    Ok(one(
        keyword,
        format!("{}.{:09}", info.mtime_sec, info.mtime_nsec),
    ))
}

// Tar stores second-granularity times; the keyword pins the nanosecond
// field to zero so textual equality matches semantic equality.
pub(crate) fn produce_tar_time(
    keyword: &Keyword,
    _path: &Path,
    info: &EntryInfo,
    _reader: Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError> {
    Ok(one(keyword, format!("{}.000000000", info.mtime_sec)))
}

pub(crate) fn produce_content(
    keyword: &Keyword,
    path: &Path,
    info: &EntryInfo,
    reader: Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError> {
    if !info.kind.is_regular() {
        return Ok(Vec::new());
    }
    let Some(reader) = reader else {
        return Ok(Vec::new());
    };
    let sinks = ContentSinks::new(std::iter::once(keyword));
    sinks
        .consume(reader)
        .map_err(|source| KeywordError::io("hash contents of", path, source))
}

fn xattr_pairs(
    keyword: &Keyword,
    path: &Path,
    info: &EntryInfo,
    encode: fn(&[u8]) -> String,
) -> Result<Vec<KeyVal>, KeywordError> {
    let prefix = keyword.prefix();
    let mut pairs = Vec::new();

    if let Some(xattrs) = &info.xattrs {
        for (name, value) in xattrs {
            pairs.push(KeyVal::new(format!("{prefix}.{name}"), encode(value)));
        }
        return Ok(pairs);
    }
    if info.source == InfoSource::Tar {
        return Ok(Vec::new());
    }

    #[cfg(unix)]
    {
        let mut names: Vec<std::ffi::OsString> = xattr::list(path)
            .map_err(|source| KeywordError::io("list extended attributes of", path, source))?
            .collect();
        names.sort();
        for name in names {
            let value = xattr::get(path, &name)
                .map_err(|source| KeywordError::io("read extended attribute of", path, source))?
                .unwrap_or_default();
            pairs.push(KeyVal::new(
                format!("{prefix}.{}", name.to_string_lossy()),
                encode(&value),
            ));
        }
    }
    Ok(pairs)
}

// The manifest value is a digest of the attribute bytes, not the bytes
// themselves; order independence and value privacy both fall out of this.
pub(crate) fn produce_xattr(
    keyword: &Keyword,
    path: &Path,
    info: &EntryInfo,
    _reader: Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError> {
    xattr_pairs(keyword, path, info, |value| {
        hex(&sha1::Sha1::digest(value))
    })
}

// Lossless sibling of `xattr`: the value is base64 of the raw bytes, so
// update can restore it without the digest/base64 asymmetry.
pub(crate) fn produce_xattrb64(
    keyword: &Keyword,
    path: &Path,
    info: &EntryInfo,
    _reader: Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError> {
    use base64::Engine as _;
    xattr_pairs(keyword, path, info, |value| {
        base64::engine::general_purpose::STANDARD.encode(value)
    })
}

/// Produces the `keyword=value` pairs for a single keyword.
///
/// # Errors
///
/// [`KeywordError::Unknown`] when the keyword has no registered producer;
/// otherwise whatever the producer reports.
pub fn produce(
    keyword: &Keyword,
    path: &Path,
    info: &EntryInfo,
    reader: Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError> {
    let spec = spec_for(keyword).ok_or_else(|| KeywordError::Unknown {
        keyword: keyword.as_str().to_owned(),
        path: path.to_path_buf(),
    })?;
    (spec.producer)(keyword, path, info, reader)
}

/// Evaluates a whole keyword set against one object, sharing a single pass
/// over the content across every digest/cksum keyword.
///
/// Output pairs appear in requested-keyword order. Content keywords are
/// silently skipped for non-regular files and when no reader was supplied.
///
/// # Errors
///
/// [`KeywordError::Unknown`] for an unregistered keyword, or any error the
/// individual producers report.
pub fn evaluate(
    keywords: &[Keyword],
    path: &Path,
    info: &EntryInfo,
    reader: Option<&mut dyn Read>,
) -> Result<Vec<KeyVal>, KeywordError> {
    let content_wanted: Vec<&Keyword> = keywords
        .iter()
        .filter(|k| consumes_content(synonym(k.prefix()).as_str()))
        .collect();

    // Validate every keyword up front so an unknown one fails even when it
    // would have been skipped for this particular object.
    for keyword in keywords {
        if spec_for(keyword).is_none() {
            return Err(KeywordError::Unknown {
                keyword: keyword.as_str().to_owned(),
                path: path.to_path_buf(),
            });
        }
    }

    let mut content: HashMap<String, KeyVal> = HashMap::new();
    if !content_wanted.is_empty() && info.kind.is_regular() {
        if let Some(reader) = reader {
            let sinks = ContentSinks::new(content_wanted.iter().copied());
            let pairs = sinks
                .consume(reader)
                .map_err(|source| KeywordError::io("hash contents of", path, source))?;
            for kv in pairs {
                content.insert(kv.keyword().as_str().to_owned(), kv);
            }
        }
    }

    let mut out = Vec::new();
    for keyword in keywords {
        if consumes_content(synonym(keyword.prefix()).as_str()) {
            if let Some(kv) = content.remove(keyword.as_str()) {
                out.push(kv);
            }
        } else {
            out.extend(produce(keyword, path, info, None)?);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::FileKind;
    use std::collections::BTreeMap;

    fn fake_info(kind: FileKind) -> EntryInfo {
        EntryInfo {
            kind,
            size: 11,
            mode: 0o644,
            uid: 1000,
            gid: 100,
            nlink: Some(1),
            mtime_sec: 5,
            mtime_nsec: 0,
            link_target: None,
            uname: Some("builder".to_owned()),
            xattrs: None,
            source: InfoSource::Tar,
        }
    }

    #[test]
    fn stat_keywords_format_canonically() {
        let info = fake_info(FileKind::Regular);
        let path = Path::new("f");

        let checks = [
            ("size", "size=11"),
            ("type", "type=file"),
            ("mode", "mode=0644"),
            ("uid", "uid=1000"),
            ("gid", "gid=100"),
            ("nlink", "nlink=1"),
            ("time", "time=5.000000000"),
            ("tar_time", "tar_time=5.000000000"),
            ("uname", "uname=builder"),
        ];
        for (keyword, expected) in checks {
            let out = produce(&Keyword::new(keyword), path, &info, None).unwrap();
            assert_eq!(out.len(), 1, "{keyword}");
            assert_eq!(out[0].to_string(), expected);
        }
    }

    #[test]
    fn mode_keeps_special_bits() {
        let mut info = fake_info(FileKind::Regular);
        info.mode = 0o4755;
        let out = produce(&Keyword::new("mode"), Path::new("f"), &info, None).unwrap();
        assert_eq!(out[0].to_string(), "mode=04755");
    }

    #[test]
    fn time_pads_nanoseconds_to_nine_digits() {
        let mut info = fake_info(FileKind::Regular);
        info.mtime_sec = 1138763045;
        info.mtime_nsec = 12;
        let out = produce(&Keyword::new("time"), Path::new("f"), &info, None).unwrap();
        assert_eq!(out[0].to_string(), "time=1138763045.000000012");
    }

    // Textual comparison of time values must equal semantic comparison,
    // which requires every value to match `seconds.<nine digits>`.
    #[test]
    fn time_values_are_always_canonical() {
        for (sec, nsec) in [
            (0i64, 0u32),
            (5, 0),
            (5, 1),
            (1469104727, 871_937_272),
            (1469104727, 999_999_999),
        ] {
            let mut info = fake_info(FileKind::Regular);
            info.mtime_sec = sec;
            info.mtime_nsec = nsec;
            for keyword in ["time", "tar_time"] {
                let out = produce(&Keyword::new(keyword), Path::new("f"), &info, None).unwrap();
                let value = out[0].value();
                let (s, n) = value.split_once('.').expect("dot separator");
                assert!(!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()), "{value}");
                assert_eq!(n.len(), 9, "{value}");
                assert!(n.bytes().all(|b| b.is_ascii_digit()), "{value}");
            }
        }
        let mut info = fake_info(FileKind::Regular);
        info.mtime_sec = 0;
        info.mtime_nsec = 0;
        let out = produce(&Keyword::new("time"), Path::new("f"), &info, None).unwrap();
        assert_eq!(out[0].to_string(), "time=0.000000000");
    }

    #[test]
    fn link_applies_only_to_symlinks() {
        let mut info = fake_info(FileKind::Symlink);
        info.link_target = Some(b"target with space".to_vec());
        let out = produce(&Keyword::new("link"), Path::new("l"), &info, None).unwrap();
        assert_eq!(out[0].to_string(), "link=target\\040with\\040space");

        let info = fake_info(FileKind::Regular);
        let out = produce(&Keyword::new("link"), Path::new("f"), &info, None).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn digests_only_apply_to_regular_files() {
        let info = fake_info(FileKind::Directory);
        let mut data: &[u8] = b"irrelevant";
        let out = produce(
            &Keyword::new("sha1digest"),
            Path::new("d"),
            &info,
            Some(&mut data),
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn unknown_keyword_is_an_error() {
        let info = fake_info(FileKind::Regular);
        let err = produce(&Keyword::new("nonsense"), Path::new("f"), &info, None).unwrap_err();
        assert!(matches!(err, KeywordError::Unknown { .. }));
    }

    #[test]
    fn evaluate_orders_output_by_request_and_shares_the_read() {
        let info = fake_info(FileKind::Regular);
        let mut data: &[u8] = b"hello world";
        let keywords = [
            Keyword::new("sha1"),
            Keyword::new("size"),
            Keyword::new("md5digest"),
        ];
        let out = evaluate(&keywords, Path::new("f"), &info, Some(&mut data)).unwrap();
        let rendered: Vec<String> = out.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            [
                "sha1=2aae6c35c94fcfb415dbe95f408b9ce91ee846ed",
                "size=11",
                "md5digest=5eb63bbbe01eeed093cb22bb8f5acdc3",
            ]
        );
    }

    #[test]
    fn tar_xattrs_digest_from_the_header_map() {
        let mut info = fake_info(FileKind::Regular);
        let mut xattrs = BTreeMap::new();
        xattrs.insert("user.greeting".to_owned(), b"hello".to_vec());
        info.xattrs = Some(xattrs);

        let out = produce(&Keyword::new("xattr"), Path::new("f"), &info, None).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].keyword().as_str(), "xattr.user.greeting");
        // sha1("hello")
        assert_eq!(out[0].value(), "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
    }
}
