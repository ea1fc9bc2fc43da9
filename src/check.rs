use std::path::Path;

use omtree_compare::{CompareError, InodeDelta, compare};
use omtree_keywords::{KeyVal, Keyword, synonym};
use omtree_spec::DirectoryHierarchy;
use omtree_walk::{DefaultFsEval, FsEval, WalkBuilder, WalkError};
use thiserror::Error;
use tracing::debug;

/// Error raised by [`check`].
#[derive(Debug, Error)]
pub enum CheckError {
    /// Walking the live tree failed.
    #[error(transparent)]
    Walk(#[from] WalkError),

    /// Comparing the manifests failed (an entry name failed to decode, or
    /// a time value was malformed).
    #[error(transparent)]
    Compare(#[from] CompareError),
}

/// Validates a directory tree against a manifest.
///
/// Equivalent to walking `root` with the manifest's keywords and comparing
/// the two hierarchies: objects in the manifest but not on disk report as
/// Missing, unexpected objects as Extra, attribute mismatches as Modified.
/// `keywords` restricts the comparison; `None` uses every keyword the
/// manifest mentions. When both `time` and `tar_time` are in play the
/// comparison truncates to tar-time granularity.
///
/// # Errors
///
/// [`CheckError`] when the walk aborts or an entry fails to resolve.
pub fn check(
    root: &Path,
    dh: &DirectoryHierarchy,
    keywords: Option<&[Keyword]>,
    eval: Option<&dyn FsEval>,
) -> Result<Vec<InodeDelta>, CheckError> {
    let keys: Vec<Keyword> = match keywords {
        Some(keys) => keys.iter().map(|k| synonym(k.as_str())).collect(),
        None => dh.used_keywords(),
    };
    debug!(root = %root.display(), ?keys, "checking tree against manifest");

    // The walker refuses to produce both time flavors at once, so when a
    // caller asks for both (comparing a tar manifest against disk), walk
    // with "time" and derive "tar_time" from it afterwards.
    let has_time = keys.iter().any(|k| k.as_str() == "time");
    let has_tar_time = keys.iter().any(|k| k.as_str() == "tar_time");
    let both_times = has_time && has_tar_time;
    let walk_keys: Vec<Keyword> = if both_times {
        keys.iter()
            .filter(|k| k.as_str() != "tar_time")
            .cloned()
            .collect()
    } else {
        keys.clone()
    };

    let default_eval = DefaultFsEval;
    let eval = eval.unwrap_or(&default_eval);
    let mut walked = WalkBuilder::new(root)
        .keywords(walk_keys)
        .walk_with(eval)?;
    if both_times {
        derive_tar_time(&mut walked);
    }

    Ok(compare(Some(dh), Some(&walked), Some(&keys))?)
}

// Append tar_time pairs derived from each entry's time value.
fn derive_tar_time(dh: &mut DirectoryHierarchy) {
    for idx in 0..dh.entries().len() {
        if !dh.entries()[idx].kind.is_inode() {
            continue;
        }
        let derived = dh.entries()[idx]
            .keywords
            .iter()
            .find(|kv| kv.keyword().as_str() == "time")
            .and_then(|kv| kv.value().split_once('.'))
            .map(|(sec, _)| format!("{sec}.000000000"));
        if let Some(value) = derived {
            dh.entry_mut(idx)
                .keywords
                .push(KeyVal::new("tar_time", value));
        }
    }
}
