use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;

use omtree_keywords::{
    DEFAULT_TAR_KEYWORDS, EntryInfo, FileKind, InfoSource, KeyVal, Keyword, evaluate,
};
use omtree_spec::{DirectoryHierarchy, Entry, EntryType, clean};
use omtree_vis::{VisFlags, vis};
use omtree_walk::{Exclude, ExcludeDecision};
use tracing::{debug, trace};

use crate::error::TarError;

// One node of the reconstructed archive tree. Children keep header
// arrival order; placeholders are materialized parents that no header has
// described (yet).
struct Node {
    name: Vec<u8>,
    keywords: Option<Vec<KeyVal>>,
    info: Option<EntryInfo>,
    children: Vec<usize>,
    link_group: Option<usize>,
}

impl Node {
    fn placeholder(name: Vec<u8>) -> Self {
        Self {
            name,
            keywords: None,
            info: None,
            children: Vec::new(),
            link_group: None,
        }
    }

    fn is_dir(&self) -> bool {
        match &self.info {
            Some(info) => matches!(info.kind, FileKind::Directory),
            // A placeholder only exists because something lives below it.
            None => true,
        }
    }
}

/// Streaming tar consumer that reconstructs the archive's directory tree
/// and renders it as a manifest.
///
/// Drive the streamer with [`drain`], which consumes the archive to EOF
/// (hashing file payloads in the same pass), then take the result with
/// [`hierarchy`].
///
/// [`drain`]: TarStreamer::drain
/// [`hierarchy`]: TarStreamer::hierarchy
pub struct TarStreamer<R: Read> {
    archive: tar::Archive<R>,
    keywords: Vec<Keyword>,
    excludes: Vec<Box<dyn Exclude>>,
    nodes: Vec<Node>,
    link_groups: Vec<Vec<usize>>,
    skipped_subtrees: Vec<PathBuf>,
    out_of_tree: Vec<PathBuf>,
    drained: bool,
}

impl<R: Read> TarStreamer<R> {
    /// Wraps a tar byte stream. `keywords` defaults to the tar keyword set
    /// when `None`; extended attributes are picked up automatically when
    /// headers carry them.
    #[must_use]
    pub fn new(
        reader: R,
        excludes: Vec<Box<dyn Exclude>>,
        keywords: Option<Vec<Keyword>>,
    ) -> Self {
        let keywords = keywords
            .unwrap_or_else(|| DEFAULT_TAR_KEYWORDS.iter().map(|k| Keyword::new(*k)).collect());
        Self {
            archive: tar::Archive::new(reader),
            keywords,
            excludes,
            nodes: vec![Node::placeholder(b".".to_vec())],
            link_groups: Vec::new(),
            skipped_subtrees: Vec::new(),
            out_of_tree: Vec::new(),
            drained: false,
        }
    }

    /// Paths whose headers escaped the archive root via `..`; they carry
    /// no entries in the resulting manifest.
    #[must_use]
    pub fn out_of_tree(&self) -> &[PathBuf] {
        &self.out_of_tree
    }

    /// Consumes the archive to EOF, building the tree and hashing file
    /// payloads as they stream past.
    ///
    /// # Errors
    ///
    /// [`TarError`] on stream corruption or keyword production failure.
    pub fn drain(&mut self) -> Result<(), TarError> {
        // Split borrows: the entry iterator holds the archive, everything
        // else is updated through a scratch context.
        let keywords = self.keywords.clone();
        let mut ctx = TreeContext {
            nodes: &mut self.nodes,
            link_groups: &mut self.link_groups,
            skipped_subtrees: &mut self.skipped_subtrees,
            out_of_tree: &mut self.out_of_tree,
            excludes: &self.excludes,
            keywords: &keywords,
        };

        for entry in self.archive.entries()? {
            let entry = entry?;
            ctx.consume_entry(entry)?;
        }
        self.drained = true;
        Ok(())
    }

    /// Renders the reconstructed tree as a manifest: a signature line,
    /// then `.` and a depth-first traversal with children in
    /// header-arrival order, each directory closed by `..`.
    ///
    /// # Errors
    ///
    /// [`TarError::NotDrained`] when called before [`TarStreamer::drain`].
    pub fn hierarchy(mut self) -> Result<DirectoryHierarchy, TarError> {
        if !self.drained {
            return Err(TarError::NotDrained);
        }

        self.resolve_nlink();

        let mut dh = DirectoryHierarchy::new();
        let mut signature = Entry::new(EntryType::Signature);
        signature.raw = Some(b"#mtree v2.0".to_vec());
        dh.push(signature);

        self.emit(&mut dh, 0, None);
        Ok(dh)
    }

    // Spread hard-link reference counts over every member of each group.
    fn resolve_nlink(&mut self) {
        let wants_nlink = self
            .keywords
            .iter()
            .any(|k| k.prefix() == "nlink");
        if !wants_nlink {
            return;
        }
        for group in &self.link_groups {
            let count = group.len() as u64;
            for &idx in group {
                let keywords = self.nodes[idx].keywords.get_or_insert_with(Vec::new);
                keywords.retain(|kv| kv.keyword().as_str() != "nlink");
                keywords.push(KeyVal::new("nlink", count.to_string()));
            }
        }
    }

    fn emit(&self, dh: &mut DirectoryHierarchy, node_idx: usize, parent: Option<usize>) {
        let node = &self.nodes[node_idx];
        let mut entry = Entry::new(EntryType::Relative);
        entry.name = vis(&node.name, VisFlags::MANIFEST);
        entry.parent = parent;
        entry.keywords = match &node.keywords {
            Some(keywords) => keywords.clone(),
            None => self.placeholder_keywords(node),
        };
        let idx = dh.push(entry);

        if node.is_dir() {
            for &child in &node.children {
                self.emit(dh, child, Some(idx));
            }
            if parent.is_some() {
                let mut close = Entry::new(EntryType::DotDot);
                close.name = "..".into();
                dh.push(close);
            }
        }
    }

    // Placeholder directories synthesize type=dir and inherit ownership
    // bits from the first described child. They never carry size; the
    // archive recorded nothing for them.
    fn placeholder_keywords(&self, node: &Node) -> Vec<KeyVal> {
        let inherited = node
            .children
            .iter()
            .find_map(|&child| self.nodes[child].info.as_ref());

        let mut kvs = vec![KeyVal::new("type", "dir")];
        let Some(info) = inherited else {
            return kvs;
        };
        for keyword in &self.keywords {
            match keyword.prefix() {
                "uid" => kvs.push(KeyVal::new("uid", info.uid.to_string())),
                "gid" => kvs.push(KeyVal::new("gid", info.gid.to_string())),
                "mode" => kvs.push(KeyVal::new("mode", format!("0{:o}", info.mode & 0o7777))),
                "tar_time" => {
                    kvs.push(KeyVal::new("tar_time", format!("{}.000000000", info.mtime_sec)));
                }
                _ => {}
            }
        }
        kvs
    }
}

struct TreeContext<'a> {
    nodes: &'a mut Vec<Node>,
    link_groups: &'a mut Vec<Vec<usize>>,
    skipped_subtrees: &'a mut Vec<PathBuf>,
    out_of_tree: &'a mut Vec<PathBuf>,
    excludes: &'a [Box<dyn Exclude>],
    keywords: &'a [Keyword],
}

impl TreeContext<'_> {
    fn consume_entry<R: Read>(&mut self, mut entry: tar::Entry<'_, R>) -> Result<(), TarError> {
        let header_type = entry.header().entry_type();
        let kind = match header_type {
            tar::EntryType::Regular | tar::EntryType::Continuous | tar::EntryType::GNUSparse => {
                FileKind::Regular
            }
            tar::EntryType::Directory => FileKind::Directory,
            tar::EntryType::Symlink => FileKind::Symlink,
            tar::EntryType::Link => FileKind::Regular,
            tar::EntryType::Char => FileKind::Char,
            tar::EntryType::Block => FileKind::Block,
            tar::EntryType::Fifo => FileKind::Fifo,
            _ => {
                trace!(?header_type, "skipping non-file header");
                return Ok(());
            }
        };

        let raw_path = entry.path_bytes().into_owned();
        let mut cleaned = clean(&raw_path);
        if cleaned.first() == Some(&b'/') {
            cleaned = clean(&cleaned[1..]);
        }
        if cleaned == b".." || cleaned.starts_with(b"../") {
            debug!(path = %String::from_utf8_lossy(&cleaned), "header escapes the archive root");
            self.out_of_tree.push(bytes_to_path(&cleaned));
            return Ok(());
        }

        let info = self.info_from_header(&mut entry, kind)?;
        let path = bytes_to_path(&cleaned);

        if self
            .skipped_subtrees
            .iter()
            .any(|prefix| path.starts_with(prefix))
        {
            return Ok(());
        }
        let mut decision = ExcludeDecision::Keep;
        for exclude in self.excludes {
            decision = exclude.decide(&path, &info);
            if decision != ExcludeDecision::Keep {
                break;
            }
        }
        match decision {
            ExcludeDecision::Keep => {}
            ExcludeDecision::Skip => {
                if matches!(kind, FileKind::Directory) {
                    self.skipped_subtrees.push(path);
                }
                return Ok(());
            }
            ExcludeDecision::SkipSubtree => {
                self.skipped_subtrees.push(path.clone());
            }
        }

        let node_idx = self.materialize(&cleaned);

        // Hard links adopt the target's keywords and join its link group.
        if header_type == tar::EntryType::Link {
            let target = entry
                .link_name_bytes()
                .map(|bytes| clean(&bytes))
                .unwrap_or_default();
            self.adopt_hardlink(node_idx, &target, &info)?;
            return Ok(());
        }

        let mut keywords = if matches!(kind, FileKind::Regular) {
            // Content digests stream the payload in this same pass.
            let mut wanted = self.keywords.to_vec();
            add_xattr_keyword(&mut wanted, &info);
            let info_copy = info.clone();
            let path_copy = path.clone();
            evaluate(&wanted, &path_copy, &info_copy, Some(&mut entry as &mut dyn Read))?
        } else {
            let mut wanted = self.keywords.to_vec();
            add_xattr_keyword(&mut wanted, &info);
            evaluate(&wanted, &path, &info, None)?
        };
        // Tar records no meaningful size for directories.
        if matches!(kind, FileKind::Directory) {
            keywords.retain(|kv| kv.keyword().as_str() != "size");
        }

        let node = &mut self.nodes[node_idx];
        node.info = Some(info);
        node.keywords = Some(keywords);
        Ok(())
    }

    fn info_from_header<R: Read>(
        &self,
        entry: &mut tar::Entry<'_, R>,
        kind: FileKind,
    ) -> Result<EntryInfo, TarError> {
        let header = entry.header();
        let uid = header.uid()? as u32;
        let gid = header.gid()? as u32;
        let mode = header.mode()? & 0o7777;
        let mtime_sec = header.mtime()? as i64;
        let size = entry.size();
        let uname = header
            .username()
            .ok()
            .flatten()
            .filter(|name| !name.is_empty())
            .map(str::to_owned);
        let link_target = entry.link_name_bytes().map(|bytes| bytes.into_owned());

        let mut xattrs: Option<BTreeMap<String, Vec<u8>>> = None;
        if let Some(extensions) = entry.pax_extensions()? {
            for extension in extensions {
                let extension = extension?;
                let Ok(key) = extension.key() else { continue };
                if let Some(name) = key.strip_prefix("SCHILY.xattr.") {
                    xattrs
                        .get_or_insert_with(BTreeMap::new)
                        .insert(name.to_owned(), extension.value_bytes().to_vec());
                }
            }
        }

        Ok(EntryInfo {
            kind,
            size,
            mode,
            uid,
            gid,
            nlink: None,
            mtime_sec,
            mtime_nsec: 0,
            link_target,
            uname,
            xattrs,
            source: InfoSource::Tar,
        })
    }

    // Creates (or finds) the node for a cleaned path, materializing
    // placeholder directories for any missing ancestors.
    fn materialize(&mut self, cleaned: &[u8]) -> usize {
        if cleaned == b"." {
            return 0;
        }
        let mut current = 0usize;
        for component in cleaned.split(|&b| b == b'/') {
            let existing = self.nodes[current]
                .children
                .iter()
                .copied()
                .find(|&child| self.nodes[child].name == component);
            current = match existing {
                Some(child) => child,
                None => {
                    let idx = self.nodes.len();
                    self.nodes.push(Node::placeholder(component.to_vec()));
                    self.nodes[current].children.push(idx);
                    idx
                }
            };
        }
        current
    }

    fn adopt_hardlink(
        &mut self,
        node_idx: usize,
        target: &[u8],
        info: &EntryInfo,
    ) -> Result<(), TarError> {
        let target_idx = self.materialize(target);

        let group = match self.nodes[target_idx].link_group {
            Some(group) => group,
            None => {
                let group = self.link_groups.len();
                self.link_groups.push(vec![target_idx]);
                self.nodes[target_idx].link_group = Some(group);
                group
            }
        };
        self.link_groups[group].push(node_idx);
        self.nodes[node_idx].link_group = Some(group);

        let target_keywords = self.nodes[target_idx].keywords.clone();
        let node = &mut self.nodes[node_idx];
        node.info = Some(info.clone());
        node.keywords = match target_keywords {
            Some(keywords) => Some(keywords),
            // Forward reference: fall back to the link header itself.
            None => Some(evaluate(
                self.keywords,
                &bytes_to_path(target),
                info,
                None,
            )?),
        };
        Ok(())
    }
}

fn add_xattr_keyword(wanted: &mut Vec<Keyword>, info: &EntryInfo) {
    let has_xattrs = info.xattrs.as_ref().is_some_and(|map| !map.is_empty());
    if has_xattrs && !wanted.iter().any(|k| k.prefix() == "xattr") {
        wanted.push(Keyword::new("xattr"));
    }
}

fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    #[cfg(unix)]
    {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;
        PathBuf::from(OsString::from_vec(bytes.to_vec()))
    }
    #[cfg(not(unix))]
    {
        PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
    }
}
