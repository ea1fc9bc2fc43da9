use std::path::Path;

use omtree_compare::{InodeDelta, KeyDelta};
use omtree_keywords::{DEFAULT_UPDATE_KEYWORDS, Keyword, keyval_select, synonym};
use omtree_spec::{DirectoryHierarchy, SpecError};
use thiserror::Error;
use tracing::{debug, warn};

/// Error raised by [`update`] before any file is touched.
///
/// Per-file failures during the run are not errors; they come back as
/// `Errored` deltas in the result list.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// A manifest entry could not be resolved.
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// `time` and `tar_time` were both requested.
    #[error("cannot update both 'time' and 'tar_time' keywords")]
    ConflictingTimeKeywords,
}

/// Applies recorded keyword values from a manifest back onto a tree.
///
/// Entries are visited in manifest order with their `/set` scope merged
/// in; for each entry, every requested keyword that has an updater is
/// applied to the object at `root`-joined path. The updater never
/// creates, renames or deletes files; structural drift is left for a
/// subsequent [`crate::check`].
///
/// Failures are collected per keyword as `Errored` deltas so one bad file
/// does not abort a batch; an empty result means everything applied.
///
/// # Errors
///
/// [`UpdateError`] only for conditions detected before applying anything.
pub fn update(
    root: &Path,
    dh: &DirectoryHierarchy,
    keywords: Option<&[Keyword]>,
) -> Result<Vec<InodeDelta>, UpdateError> {
    let keys: Vec<Keyword> = match keywords {
        Some(keys) => keys.iter().map(|k| synonym(k.as_str())).collect(),
        None => DEFAULT_UPDATE_KEYWORDS.iter().map(|k| Keyword::new(*k)).collect(),
    };
    let has_time = keys.iter().any(|k| k.as_str() == "time");
    let has_tar_time = keys.iter().any(|k| k.as_str() == "tar_time");
    if has_time && has_tar_time {
        return Err(UpdateError::ConflictingTimeKeywords);
    }
    debug!(root = %root.display(), ?keys, "updating tree from manifest");

    let mut failures = Vec::new();
    for (idx, entry) in dh.entries().iter().enumerate() {
        if !entry.kind.is_inode() {
            continue;
        }
        let rel = dh.path(idx)?;
        let target = root.join(&rel);

        let effective = dh.effective_keywords(idx);
        for kv in keyval_select(&effective, &keys) {
            let keyword = kv.keyword();
            match omtree_keywords::update(keyword, &target, kv.value()) {
                Ok(()) => {}
                // Read-only keywords that slipped into the request are
                // not per-file failures; there is just nothing to do.
                Err(omtree_keywords::KeywordError::NoUpdater { .. }) => {}
                Err(error) => {
                    warn!(path = %rel.display(), keyword = %keyword, %error, "update failed");
                    failures.push(InodeDelta::errored(
                        rel.clone(),
                        vec![KeyDelta::errored(keyword.clone(), error.to_string())],
                    ));
                }
            }
        }
    }
    Ok(failures)
}
