use std::fmt;
use std::path::{Path, PathBuf};

use omtree_keywords::Keyword;
use serde::{Serialize, Serializer};

/// The kind of discrepancy found for an object or a single keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DifferenceType {
    /// Present in the old manifest, absent in the new.
    Missing,
    /// Absent in the old manifest, present in the new.
    Extra,
    /// Present in both with at least one differing keyword value.
    Modified,
    /// Present in both and identical; only emitted by `compare_same`.
    Same,
    /// An update attempt failed for this keyword.
    Errored,
}

fn keyword_as_str<S: Serializer>(keyword: &Keyword, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(keyword.as_str())
}

/// A discrepancy in one keyword of one object.
#[derive(Debug, Clone, Serialize)]
pub struct KeyDelta {
    #[serde(rename = "type")]
    diff: DifferenceType,
    #[serde(serialize_with = "keyword_as_str")]
    name: Keyword,
    #[serde(skip_serializing_if = "Option::is_none")]
    old: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl KeyDelta {
    /// A keyword present only in the old manifest.
    #[must_use]
    pub fn missing(name: Keyword, old: impl Into<String>) -> Self {
        Self {
            diff: DifferenceType::Missing,
            name,
            old: Some(old.into()),
            new: None,
            error: None,
        }
    }

    /// A keyword present only in the new manifest.
    #[must_use]
    pub fn extra(name: Keyword, new: impl Into<String>) -> Self {
        Self {
            diff: DifferenceType::Extra,
            name,
            old: None,
            new: Some(new.into()),
            error: None,
        }
    }

    /// A keyword whose values differ between the manifests.
    #[must_use]
    pub fn modified(name: Keyword, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            diff: DifferenceType::Modified,
            name,
            old: Some(old.into()),
            new: Some(new.into()),
            error: None,
        }
    }

    /// A keyword whose update failed; carries the failure text.
    #[must_use]
    pub fn errored(name: Keyword, error: impl Into<String>) -> Self {
        Self {
            diff: DifferenceType::Errored,
            name,
            old: None,
            new: None,
            error: Some(error.into()),
        }
    }

    /// The discrepancy kind.
    #[must_use]
    pub fn diff(&self) -> DifferenceType {
        self.diff
    }

    /// The keyword concerned.
    #[must_use]
    pub fn name(&self) -> &Keyword {
        &self.name
    }

    /// The old-side value, for Missing and Modified deltas.
    #[must_use]
    pub fn old(&self) -> Option<&str> {
        match self.diff {
            DifferenceType::Missing | DifferenceType::Modified => self.old.as_deref(),
            _ => None,
        }
    }

    /// The new-side value, for Extra and Modified deltas.
    #[must_use]
    pub fn new(&self) -> Option<&str> {
        match self.diff {
            DifferenceType::Extra | DifferenceType::Modified => self.new.as_deref(),
            _ => None,
        }
    }

    /// The failure text, for Errored deltas.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// A discrepancy for one filesystem object between two manifests.
#[derive(Debug, Clone, Serialize)]
pub struct InodeDelta {
    #[serde(rename = "type")]
    diff: DifferenceType,
    path: PathBuf,
    keys: Vec<KeyDelta>,
    #[serde(skip)]
    old_type: Option<String>,
    #[serde(skip)]
    new_type: Option<String>,
}

impl InodeDelta {
    pub(crate) fn new(
        diff: DifferenceType,
        path: PathBuf,
        keys: Vec<KeyDelta>,
        old_type: Option<String>,
        new_type: Option<String>,
    ) -> Self {
        Self {
            diff,
            path,
            keys,
            old_type,
            new_type,
        }
    }

    /// A delta recording a failed update for `path`.
    #[must_use]
    pub fn errored(path: PathBuf, keys: Vec<KeyDelta>) -> Self {
        Self::new(DifferenceType::Errored, path, keys, None, None)
    }

    /// The discrepancy kind.
    #[must_use]
    pub fn diff(&self) -> DifferenceType {
        self.diff
    }

    /// The object path, relative to the manifest root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The per-keyword discrepancies; empty unless the kind is Modified,
    /// Same or Errored.
    #[must_use]
    pub fn keys(&self) -> &[KeyDelta] {
        &self.keys
    }

    /// Mutable access for delta filters.
    pub(crate) fn keys_mut(&mut self) -> &mut Vec<KeyDelta> {
        &mut self.keys
    }

    /// The effective `type` value of the entry, from whichever side has
    /// one. Delta filters use this to special-case directories.
    #[must_use]
    pub fn entry_type(&self) -> Option<&str> {
        self.old_type.as_deref().or(self.new_type.as_deref())
    }
}

impl fmt::Display for InodeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.diff {
            DifferenceType::Missing => write!(f, "{:?}: missing path", self.path),
            DifferenceType::Extra => write!(f, "{:?}: unexpected path", self.path),
            DifferenceType::Same => write!(f, "{:?}: unchanged", self.path),
            DifferenceType::Modified => {
                // Lead with the first failing keyword, mtree(8) style.
                match self.keys.first() {
                    Some(key) => write!(
                        f,
                        "{:?}: keyword {:?}: expected {}; got {}",
                        self.path,
                        key.name().as_str(),
                        key.old().unwrap_or("(none)"),
                        key.new().unwrap_or("(none)"),
                    ),
                    None => write!(f, "{:?}: modified", self.path),
                }
            }
            DifferenceType::Errored => match self.keys.first() {
                Some(key) => write!(
                    f,
                    "{:?}: keyword {:?}: update failed: {}",
                    self.path,
                    key.name().as_str(),
                    key.error().unwrap_or("unknown error"),
                ),
                None => write!(f, "{:?}: update failed", self.path),
            },
        }
    }
}
