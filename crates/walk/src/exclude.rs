use std::path::Path;

use omtree_keywords::{EntryInfo, FileKind};

/// Verdict of an exclusion predicate for one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcludeDecision {
    /// Emit the entry; recurse into directories.
    Keep,
    /// Drop the entry entirely; directories are not recursed.
    Skip,
    /// Emit the entry but do not descend into it.
    SkipSubtree,
}

/// An exclusion predicate consulted before each entry is emitted.
///
/// Predicates run in registration order; the first non-[`Keep`] decision
/// wins. The path is relative to the walk root.
///
/// [`Keep`]: ExcludeDecision::Keep
pub trait Exclude {
    /// Decides the fate of the object at `path`.
    fn decide(&self, path: &Path, info: &EntryInfo) -> ExcludeDecision;
}

impl<F> Exclude for F
where
    F: Fn(&Path, &EntryInfo) -> ExcludeDecision,
{
    fn decide(&self, path: &Path, info: &EntryInfo) -> ExcludeDecision {
        self(path, info)
    }
}

/// Keeps only directory entries, the classic structure-only manifest.
pub fn exclude_non_directories(_path: &Path, info: &EntryInfo) -> ExcludeDecision {
    if matches!(info.kind, FileKind::Directory) {
        ExcludeDecision::Keep
    } else {
        ExcludeDecision::Skip
    }
}

pub(crate) fn decide_all(
    excludes: &[Box<dyn Exclude>],
    path: &Path,
    info: &EntryInfo,
) -> ExcludeDecision {
    for exclude in excludes {
        let decision = exclude.decide(path, info);
        if decision != ExcludeDecision::Keep {
            return decision;
        }
    }
    ExcludeDecision::Keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use omtree_keywords::InfoSource;

    fn info(kind: FileKind) -> EntryInfo {
        EntryInfo {
            kind,
            size: 0,
            mode: 0o644,
            uid: 0,
            gid: 0,
            nlink: None,
            mtime_sec: 0,
            mtime_nsec: 0,
            link_target: None,
            uname: None,
            xattrs: None,
            source: InfoSource::Filesystem,
        }
    }

    #[test]
    fn non_directories_are_skipped() {
        let path = Path::new("f");
        assert_eq!(
            exclude_non_directories(path, &info(FileKind::Regular)),
            ExcludeDecision::Skip
        );
        assert_eq!(
            exclude_non_directories(path, &info(FileKind::Directory)),
            ExcludeDecision::Keep
        );
    }

    #[test]
    fn first_non_keep_decision_wins() {
        let excludes: Vec<Box<dyn Exclude>> = vec![
            Box::new(|_: &Path, _: &EntryInfo| ExcludeDecision::Keep),
            Box::new(|path: &Path, _: &EntryInfo| {
                if path.ends_with("cache") {
                    ExcludeDecision::SkipSubtree
                } else {
                    ExcludeDecision::Keep
                }
            }),
            Box::new(|_: &Path, _: &EntryInfo| ExcludeDecision::Skip),
        ];
        assert_eq!(
            decide_all(&excludes, Path::new("x/cache"), &info(FileKind::Directory)),
            ExcludeDecision::SkipSubtree
        );
        assert_eq!(
            decide_all(&excludes, Path::new("x/other"), &info(FileKind::Directory)),
            ExcludeDecision::Skip
        );
    }
}
