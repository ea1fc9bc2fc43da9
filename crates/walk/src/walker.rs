use std::collections::HashMap;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};

use omtree_keywords::{
    EntryInfo, KeyVal, Keyword, SET_KEYWORDS, default_keywords, is_content_keyword, synonym,
};
use omtree_spec::{DirectoryHierarchy, Entry, EntryType};
use omtree_vis::{VisFlags, vis};
use tracing::{debug, trace};

use crate::error::WalkError;
use crate::exclude::{Exclude, ExcludeDecision, decide_all};
use crate::fseval::{DefaultFsEval, FsEval};

/// Configures a manifest-producing walk rooted at a directory.
///
/// The walk emits a signature, a header comment block, a `/set` line
/// hoisting common attributes, then a depth-first traversal with children
/// in ascending encoded-name order, closing each directory with `..`.
pub struct WalkBuilder {
    root: PathBuf,
    keywords: Vec<Keyword>,
    excludes: Vec<Box<dyn Exclude>>,
}

impl WalkBuilder {
    /// A walk over `root` computing the default filesystem keyword set.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            keywords: default_keywords(),
            excludes: Vec::new(),
        }
    }

    /// Replaces the keyword set to compute per entry.
    #[must_use]
    pub fn keywords<I>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = Keyword>,
    {
        self.keywords = keywords.into_iter().collect();
        self
    }

    /// Appends an exclusion predicate; predicates run in registration
    /// order and the first non-keep decision wins.
    #[must_use]
    pub fn exclude(mut self, exclude: impl Exclude + 'static) -> Self {
        self.excludes.push(Box::new(exclude));
        self
    }

    /// Runs the walk with the direct filesystem evaluator.
    pub fn walk(self) -> Result<DirectoryHierarchy, WalkError> {
        self.walk_with(&DefaultFsEval)
    }

    /// Runs the walk through a caller-supplied evaluator.
    pub fn walk_with(self, eval: &dyn FsEval) -> Result<DirectoryHierarchy, WalkError> {
        let has_time = self
            .keywords
            .iter()
            .any(|k| synonym(k.prefix()).as_str() == "time");
        let has_tar_time = self
            .keywords
            .iter()
            .any(|k| synonym(k.prefix()).as_str() == "tar_time");
        if has_time && has_tar_time {
            return Err(WalkError::ConflictingTimeKeywords);
        }

        let mut walker = Walker {
            root: self.root,
            keywords: self.keywords,
            excludes: self.excludes,
            eval,
            dh: DirectoryHierarchy::new(),
            cur_set_idx: None,
            cur_set_kvs: Vec::new(),
        };
        walker.run()?;
        Ok(walker.dh)
    }
}

struct Walker<'a> {
    root: PathBuf,
    keywords: Vec<Keyword>,
    excludes: Vec<Box<dyn Exclude>>,
    eval: &'a dyn FsEval,
    dh: DirectoryHierarchy,
    cur_set_idx: Option<usize>,
    cur_set_kvs: Vec<KeyVal>,
}

// One directory child between the stat pass and the emit pass.
struct Prepared {
    encoded_name: String,
    abs: PathBuf,
    rel: PathBuf,
    info: EntryInfo,
    decision: ExcludeDecision,
}

impl Walker<'_> {
    fn wants(&self, canonical: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| synonym(k.prefix()).as_str() == canonical)
    }

    fn run(&mut self) -> Result<(), WalkError> {
        debug_assert!(self.dh.entries().is_empty());
        debug!(root = %self.root.display(), "walking directory tree");

        let root_metadata = self
            .eval
            .lstat(&self.root)
            .map_err(|source| WalkError::io("inspect walk root", &self.root, source))?;
        let root_info = EntryInfo::from_metadata(&root_metadata);

        self.emit_header();
        self.emit_initial_set(&root_info);

        // The root itself is ".", then its children depth-first.
        let root = self.root.clone();
        let root_idx = self.emit_entry(".", &root, &root_info)?;
        self.walk_dir(&root, Path::new(""), root_idx)?;
        Ok(())
    }

    fn emit_header(&mut self) {
        let mut signature = Entry::new(EntryType::Signature);
        signature.raw = Some(b"#mtree v2.0".to_vec());
        self.dh.push(signature);

        let machine = rustix::system::uname()
            .nodename()
            .to_string_lossy()
            .into_owned();
        let date = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "unknown".to_owned());
        for text in [
            format!("#       machine: {machine}"),
            format!("#          tree: {}", self.root.display()),
            format!("#          date: {date}"),
        ] {
            let mut comment = Entry::new(EntryType::Comment);
            comment.raw = Some(text.into_bytes());
            self.dh.push(comment);
        }
    }

    // The leading /set: type=file plus the scope keywords (uid/gid) taken
    // from the root inode.
    fn emit_initial_set(&mut self, root_info: &EntryInfo) {
        let mut kvs = vec![KeyVal::new("type", "file")];
        for name in SET_KEYWORDS {
            if !self.wants(name) {
                continue;
            }
            let value = match *name {
                "uid" => root_info.uid.to_string(),
                "gid" => root_info.gid.to_string(),
                _ => continue,
            };
            kvs.push(KeyVal::new(*name, value));
        }
        self.push_set(kvs);
    }

    fn push_set(&mut self, kvs: Vec<KeyVal>) {
        let mut entry = Entry::new(EntryType::Special);
        entry.name = "/set".into();
        entry.keywords = kvs.clone();
        let idx = self.dh.push(entry);
        self.cur_set_idx = Some(idx);
        self.cur_set_kvs = kvs;
    }

    fn emit_entry(
        &mut self,
        encoded_name: &str,
        abs: &Path,
        info: &EntryInfo,
    ) -> Result<usize, WalkError> {
        self.emit_entry_under(encoded_name, abs, info, None)
    }

    fn emit_entry_under(
        &mut self,
        encoded_name: &str,
        abs: &Path,
        info: &EntryInfo,
        parent: Option<usize>,
    ) -> Result<usize, WalkError> {
        let wants_content = self.keywords.iter().any(is_content_keyword);
        let mut reader: Option<Box<dyn Read>> = None;
        if wants_content && info.kind.is_regular() {
            reader = Some(
                self.eval
                    .open(abs)
                    .map_err(|source| WalkError::io("open", abs, source))?,
            );
        }

        let reader_ref: Option<&mut dyn Read> = match reader.as_mut() {
            Some(b) => Some(b.as_mut()),
            None => None,
        };
        let mut kvs = self
            .eval
            .keyword_func(&self.keywords, abs, info, reader_ref)?;
        drop(reader);

        // Directories must carry an explicit type so the nesting survives
        // a reparse even when the caller did not request "type".
        if matches!(info.kind, omtree_keywords::FileKind::Directory)
            && !kvs.iter().any(|kv| kv.keyword().as_str() == "type")
        {
            kvs.insert(0, KeyVal::new("type", "dir"));
        }

        // Scope-relative diff: only pairs the /set does not already state.
        kvs.retain(|kv| !self.cur_set_kvs.contains(kv));

        let mut entry = Entry::new(EntryType::Relative);
        entry.name = encoded_name.to_owned();
        entry.keywords = kvs;
        entry.parent = parent;
        entry.set = self.cur_set_idx;
        trace!(name = encoded_name, "emitting entry");
        Ok(self.dh.push(entry))
    }

    fn walk_dir(
        &mut self,
        abs: &Path,
        rel: &Path,
        parent_idx: usize,
    ) -> Result<(), WalkError> {
        let mut names: Vec<OsString> = self
            .eval
            .read_dir(abs)
            .map_err(|source| WalkError::io("read directory", abs, source))?;
        names.sort_by_key(|name| encode_name(name));

        let mut children = Vec::with_capacity(names.len());
        for name in names {
            let abs_child = abs.join(&name);
            let rel_child = rel.join(&name);
            let metadata = self
                .eval
                .lstat(&abs_child)
                .map_err(|source| WalkError::io("inspect", &abs_child, source))?;
            let info = EntryInfo::from_metadata(&metadata);
            let decision = decide_all(&self.excludes, &rel_child, &info);
            if decision == ExcludeDecision::Skip {
                trace!(path = %rel_child.display(), "excluded");
                continue;
            }
            children.push(Prepared {
                encoded_name: encode_name(&name),
                abs: abs_child,
                rel: rel_child,
                info,
                decision,
            });
        }

        self.maybe_reemit_set(&children);

        for child in children {
            let idx = self.emit_entry_under(
                &child.encoded_name,
                &child.abs,
                &child.info,
                Some(parent_idx),
            )?;
            let descend = matches!(child.info.kind, omtree_keywords::FileKind::Directory)
                && child.decision != ExcludeDecision::SkipSubtree;
            if descend {
                self.walk_dir(&child.abs, &child.rel, idx)?;
                let mut close = Entry::new(EntryType::DotDot);
                close.name = "..".into();
                self.dh.push(close);
            }
        }
        Ok(())
    }

    // Re-emit /set when a strict majority of the upcoming children share a
    // scope-keyword value the current scope does not already state.
    fn maybe_reemit_set(&mut self, children: &[Prepared]) {
        if children.len() < 2 {
            return;
        }

        let mut next = self.cur_set_kvs.clone();
        let mut changed = false;
        for name in SET_KEYWORDS {
            if !self.wants(name) {
                continue;
            }
            let mut counts: HashMap<String, usize> = HashMap::new();
            for child in children {
                let value = match *name {
                    "uid" => child.info.uid.to_string(),
                    "gid" => child.info.gid.to_string(),
                    _ => continue,
                };
                *counts.entry(value).or_default() += 1;
            }
            let Some((majority, count)) = counts.into_iter().max_by_key(|(_, n)| *n) else {
                continue;
            };
            if count * 2 <= children.len() {
                continue;
            }
            let current = next
                .iter()
                .find(|kv| kv.keyword().as_str() == *name)
                .map(|kv| kv.value().to_owned());
            if current.as_deref() != Some(majority.as_str()) {
                next.retain(|kv| kv.keyword().as_str() != *name);
                next.push(KeyVal::new(*name, majority));
                changed = true;
            }
        }

        if changed {
            debug!("re-emitting /set for new directory scope");
            self.push_set(next);
        }
    }
}

fn encode_name(name: &std::ffi::OsStr) -> String {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        vis(name.as_bytes(), VisFlags::MANIFEST)
    }
    #[cfg(not(unix))]
    {
        vis(name.to_string_lossy().as_bytes(), VisFlags::MANIFEST)
    }
}
