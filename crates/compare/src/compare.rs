use std::collections::BTreeMap;
use std::path::PathBuf;

use omtree_keywords::{Keyword, synonym};
use omtree_spec::DirectoryHierarchy;
use tracing::debug;

use crate::delta::{DifferenceType, InodeDelta, KeyDelta};
use crate::error::CompareError;

// The effective keyword state of one entry, keyed by canonical full name.
struct SideKeys {
    keys: BTreeMap<String, String>,
}

impl SideKeys {
    fn from_entry(dh: &DirectoryHierarchy, idx: usize) -> Self {
        let mut keys = BTreeMap::new();
        for kv in dh.effective_keywords(idx) {
            if kv.is_bare() {
                continue;
            }
            keys.insert(
                synonym(kv.keyword().as_str()).as_str().to_owned(),
                kv.value().to_owned(),
            );
        }
        Self { keys }
    }

    fn entry_type(&self) -> Option<String> {
        self.keys.get("type").cloned()
    }
}

fn is_always_compared(name: &str) -> bool {
    // xattr sub-keys describe attributes that exist on one side only when
    // the attribute itself was added or removed, so a one-sided key is a
    // real difference. time/tar_time get their own normalization below.
    let keyword = Keyword::new(name);
    matches!(keyword.prefix(), "xattr" | "xattrb64") || name == "time" || name == "tar_time"
}

fn convert_to_tar_time(value: &str) -> Result<String, CompareError> {
    let parsed = value.split_once('.').and_then(|(sec, nsec)| {
        let valid = !sec.is_empty()
            && sec.bytes().all(|b| b.is_ascii_digit() || b == b'-')
            && !nsec.is_empty()
            && nsec.bytes().all(|b| b.is_ascii_digit());
        valid.then_some(sec)
    });
    match parsed {
        Some(sec) => Ok(format!("{sec}.000000000")),
        None => Err(CompareError::InvalidTime {
            value: value.to_owned(),
        }),
    }
}

// Per-entry keyword diff with the cross-domain time handling.
fn compare_keys(mut old: SideKeys, mut new: SideKeys) -> Result<Vec<KeyDelta>, CompareError> {
    // Drop keys present on one side only, except the always-compared set.
    old.keys
        .retain(|name, _| new.keys.contains_key(name) || is_always_compared(name));
    new.keys
        .retain(|name, _| old.keys.contains_key(name) || is_always_compared(name));

    // A manifest synthesized from a tar archive can only know seconds; to
    // compare it against a filesystem manifest, "time" values convert to
    // "tar_time" with the nanoseconds truncated. An existing "tar_time"
    // always wins over a converted one.
    let any_tar_time = old.keys.contains_key("tar_time") || new.keys.contains_key("tar_time");
    let any_time = old.keys.contains_key("time") || new.keys.contains_key("time");
    if any_tar_time && any_time {
        debug!("normalizing time to tar_time for cross-domain comparison");
        let old_time = old.keys.remove("time");
        let new_time = new.keys.remove("time");
        if let Some(time) = old_time {
            if !old.keys.contains_key("tar_time") {
                old.keys
                    .insert("tar_time".to_owned(), convert_to_tar_time(&time)?);
            }
        }
        if let Some(time) = new_time {
            if !new.keys.contains_key("tar_time") {
                new.keys
                    .insert("tar_time".to_owned(), convert_to_tar_time(&time)?);
            }
        }
    }

    let mut names: Vec<&String> = old.keys.keys().chain(new.keys.keys()).collect();
    names.sort();
    names.dedup();
    let names: Vec<String> = names.into_iter().cloned().collect();

    let mut deltas = Vec::new();
    for name in names {
        let old_value = old.keys.get(&name);
        let new_value = new.keys.get(&name);
        match (old_value, new_value) {
            (Some(old_value), None) => {
                deltas.push(KeyDelta::missing(Keyword::new(name), old_value.clone()));
            }
            (None, Some(new_value)) => {
                deltas.push(KeyDelta::extra(Keyword::new(name), new_value.clone()));
            }
            (Some(old_value), Some(new_value)) if old_value != new_value => {
                deltas.push(KeyDelta::modified(
                    Keyword::new(name),
                    old_value.clone(),
                    new_value.clone(),
                ));
            }
            _ => {}
        }
    }
    Ok(deltas)
}

fn keys_filter_allows(keys: &[Keyword], delta: &KeyDelta) -> bool {
    let name = synonym(delta.name().prefix());
    keys.iter().any(|k| {
        let wanted = synonym(k.prefix());
        wanted == name
            // time and tar_time are interchangeable after normalization.
            || (wanted.as_str() == "time" && name.as_str() == "tar_time")
            || (wanted.as_str() == "tar_time" && name.as_str() == "time")
    })
}

fn run_compare(
    old_dh: Option<&DirectoryHierarchy>,
    new_dh: Option<&DirectoryHierarchy>,
    keys: Option<&[Keyword]>,
    include_same: bool,
) -> Result<Vec<InodeDelta>, CompareError> {
    // Path-keyed states; BTreeMap gives deterministic output order.
    let mut states: BTreeMap<PathBuf, (Option<SideKeys>, Option<SideKeys>)> = BTreeMap::new();

    for (dh, is_new) in [(old_dh, false), (new_dh, true)] {
        let Some(dh) = dh else { continue };
        for (idx, entry) in dh.entries().iter().enumerate() {
            if !entry.kind.is_inode() {
                continue;
            }
            let path = dh.path(idx)?;
            let side = SideKeys::from_entry(dh, idx);
            let state = states.entry(path).or_insert((None, None));
            if is_new {
                state.1 = Some(side);
            } else {
                state.0 = Some(side);
            }
        }
    }

    let mut results = Vec::new();
    for (path, state) in states {
        match state {
            (Some(old), None) => {
                let old_type = old.entry_type();
                results.push(InodeDelta::new(
                    DifferenceType::Missing,
                    path,
                    Vec::new(),
                    old_type,
                    None,
                ));
            }
            (None, Some(new)) => {
                let new_type = new.entry_type();
                results.push(InodeDelta::new(
                    DifferenceType::Extra,
                    path,
                    Vec::new(),
                    None,
                    new_type,
                ));
            }
            (Some(old), Some(new)) => {
                let old_type = old.entry_type();
                let new_type = new.entry_type();
                let mut changed = compare_keys(old, new)?;
                if let Some(keys) = keys {
                    changed.retain(|delta| keys_filter_allows(keys, delta));
                }
                if !changed.is_empty() {
                    results.push(InodeDelta::new(
                        DifferenceType::Modified,
                        path,
                        changed,
                        old_type,
                        new_type,
                    ));
                } else if include_same {
                    results.push(InodeDelta::new(
                        DifferenceType::Same,
                        path,
                        Vec::new(),
                        old_type,
                        new_type,
                    ));
                }
            }
            (None, None) => unreachable!("state inserted without either side"),
        }
    }
    Ok(results)
}

/// Compares two manifests and returns the discrepancies between them.
///
/// Either side may be absent and is then treated as empty, which turns
/// every entry of the other side into an `Extra` or `Missing` delta.
/// Scope bookkeeping (`/set` placement) is invisible to the comparison;
/// only effective keywords matter. `keys` restricts which keyword
/// discrepancies are reported; `None` compares everything.
///
/// The parameter order matters: entries only in `old` report as Missing,
/// entries only in `new` as Extra, and Modified deltas carry old/new
/// values in that orientation.
///
/// # Errors
///
/// [`CompareError`] when an entry name fails to decode or a `time` value
/// is malformed during tar-time normalization.
pub fn compare(
    old_dh: Option<&DirectoryHierarchy>,
    new_dh: Option<&DirectoryHierarchy>,
    keys: Option<&[Keyword]>,
) -> Result<Vec<InodeDelta>, CompareError> {
    run_compare(old_dh, new_dh, keys, false)
}

/// Like [`compare`], but entries found identical are reported too, with
/// [`DifferenceType::Same`].
pub fn compare_same(
    old_dh: Option<&DirectoryHierarchy>,
    new_dh: Option<&DirectoryHierarchy>,
    keys: Option<&[Keyword]>,
) -> Result<Vec<InodeDelta>, CompareError> {
    run_compare(old_dh, new_dh, keys, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use omtree_spec::parse_spec;

    fn parse(text: &str) -> DirectoryHierarchy {
        parse_spec(text.as_bytes()).expect("manifest parses")
    }

    #[test]
    fn reflexivity() {
        let dh = parse(
            "/set uid=0 gid=0\n. type=dir\n    f type=file size=3 time=5.000000000\n",
        );
        let deltas = compare(Some(&dh), Some(&dh), None).unwrap();
        assert!(deltas.is_empty(), "{deltas:?}");
    }

    #[test]
    fn missing_and_extra_swap_under_argument_reversal() {
        let old = parse(". type=dir\n");
        let new = parse(". type=dir\n    f type=file size=3\n");

        let forward = compare(Some(&old), Some(&new), None).unwrap();
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].diff(), DifferenceType::Extra);
        assert_eq!(forward[0].path(), std::path::Path::new("f"));

        let backward = compare(Some(&new), Some(&old), None).unwrap();
        assert_eq!(backward.len(), 1);
        assert_eq!(backward[0].diff(), DifferenceType::Missing);
    }

    #[test]
    fn modified_reports_old_and_new_values() {
        let old = parse("    f type=file mode=0644\n");
        let new = parse("    f type=file mode=0600\n");
        let deltas = compare(Some(&old), Some(&new), None).unwrap();
        assert_eq!(deltas.len(), 1);
        let keys = deltas[0].keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name().as_str(), "mode");
        assert_eq!(keys[0].old(), Some("0644"));
        assert_eq!(keys[0].new(), Some("0600"));
    }

    #[test]
    fn one_sided_plain_keys_are_dropped() {
        let old = parse("    f type=file size=3 nlink=1\n");
        let new = parse("    f type=file size=3\n");
        let deltas = compare(Some(&old), Some(&new), None).unwrap();
        assert!(deltas.is_empty(), "{deltas:?}");
    }

    #[test]
    fn one_sided_xattr_keys_are_kept() {
        let old = parse("    f type=file xattr.user.a=00ff\n");
        let new = parse("    f type=file\n");
        let deltas = compare(Some(&old), Some(&new), None).unwrap();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].keys()[0].diff(), DifferenceType::Missing);
        assert_eq!(deltas[0].keys()[0].name().as_str(), "xattr.user.a");
    }

    #[test]
    fn tar_time_wins_over_time() {
        let old = parse("    f type=file time=5.454353132\n");
        let new = parse("    f type=file tar_time=5.000000000\n");
        let deltas = compare(Some(&old), Some(&new), None).unwrap();
        assert!(deltas.is_empty(), "{deltas:?}");
    }

    #[test]
    fn time_differences_survive_normalization() {
        let old = parse("    f type=file time=5.454353132\n");
        let new = parse("    f type=file tar_time=9.000000000\n");
        let deltas = compare(Some(&old), Some(&new), None).unwrap();
        assert_eq!(deltas.len(), 1);
        let key = &deltas[0].keys()[0];
        assert_eq!(key.name().as_str(), "tar_time");
        assert_eq!(key.old(), Some("5.000000000"));
        assert_eq!(key.new(), Some("9.000000000"));
    }

    #[test]
    fn synonyms_compare_as_the_same_keyword() {
        let old = parse("    f type=file md5=00ff\n");
        let new = parse("    f type=file md5digest=00aa\n");
        let deltas = compare(Some(&old), Some(&new), None).unwrap();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].keys()[0].name().as_str(), "md5digest");
    }

    #[test]
    fn keys_filter_restricts_reported_deltas() {
        let old = parse("    f type=file mode=0644 size=3\n");
        let new = parse("    f type=file mode=0600 size=4\n");
        let keys = [Keyword::new("size")];
        let deltas = compare(Some(&old), Some(&new), Some(&keys)).unwrap();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].keys().len(), 1);
        assert_eq!(deltas[0].keys()[0].name().as_str(), "size");
    }

    #[test]
    fn keys_filter_treats_time_and_tar_time_as_equivalent() {
        let old = parse("    f type=file time=5.500000000\n");
        let new = parse("    f type=file tar_time=9.000000000\n");
        let keys = [Keyword::new("time")];
        let deltas = compare(Some(&old), Some(&new), Some(&keys)).unwrap();
        assert_eq!(deltas.len(), 1, "{deltas:?}");
    }

    #[test]
    fn nil_side_treats_everything_as_extra() {
        let new = parse(". type=dir\n    f type=file\n");
        let deltas = compare(None, Some(&new), None).unwrap();
        assert_eq!(deltas.len(), 2);
        assert!(deltas.iter().all(|d| d.diff() == DifferenceType::Extra));
    }

    #[test]
    fn compare_same_reports_identical_entries() {
        let dh = parse("    f type=file size=3\n");
        let deltas = compare_same(Some(&dh), Some(&dh), None).unwrap();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].diff(), DifferenceType::Same);
    }

    #[test]
    fn set_scope_participates_in_comparison() {
        let old = parse("/set uid=0\n    f type=file\n");
        let new = parse("    f type=file uid=5\n");
        let deltas = compare(Some(&old), Some(&new), None).unwrap();
        assert_eq!(deltas.len(), 1);
        let key = &deltas[0].keys()[0];
        assert_eq!(key.name().as_str(), "uid");
        assert_eq!(key.old(), Some("0"));
        assert_eq!(key.new(), Some("5"));
    }
}
