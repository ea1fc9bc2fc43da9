use std::io::{self, Write};
use std::path::PathBuf;

use omtree_keywords::{KeyVal, Keyword, merge_set, synonym};
use omtree_vis::{VisFlags, unvis};

use crate::entry::{Entry, EntryType};
use crate::error::SpecError;
use crate::pathclean::clean;

/// An ordered sequence of manifest entries.
///
/// Entries are held in an arena; the structural links inside [`Entry`] are
/// indices into it. Parsing and the programmatic builders both append in
/// input order, so an entry's position equals its arena index.
#[derive(Debug, Clone, Default)]
pub struct DirectoryHierarchy {
    entries: Vec<Entry>,
}

impl DirectoryHierarchy {
    /// An empty hierarchy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in input order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The entry at an arena index.
    #[must_use]
    pub fn entry(&self, idx: usize) -> &Entry {
        &self.entries[idx]
    }

    /// Mutable access to an entry, for callers that post-process a
    /// hierarchy they own (link fields are theirs to keep consistent).
    #[must_use]
    pub fn entry_mut(&mut self, idx: usize) -> &mut Entry {
        &mut self.entries[idx]
    }

    /// Appends an entry, wiring position and the input-order chain, and
    /// registering it as its parent's first child when applicable.
    pub fn push(&mut self, mut entry: Entry) -> usize {
        let idx = self.entries.len();
        entry.pos = idx;
        entry.prev = idx.checked_sub(1);
        if let Some(prev) = entry.prev {
            self.entries[prev].next = Some(idx);
        }
        if let Some(parent) = entry.parent {
            if self.entries[parent].child.is_none() {
                self.entries[parent].child = Some(idx);
            }
        }
        self.entries.push(entry);
        idx
    }

    fn path_bytes(&self, idx: usize) -> Result<Vec<u8>, SpecError> {
        let entry = &self.entries[idx];
        let decoded = unvis(&entry.name, VisFlags::MANIFEST)?;
        match entry.parent {
            Some(parent) if entry.kind != EntryType::Full => {
                let mut joined = self.path_bytes(parent)?;
                joined.push(b'/');
                joined.extend_from_slice(&decoded);
                Ok(clean(&joined))
            }
            _ => Ok(clean(&decoded)),
        }
    }

    /// The decoded, cleaned path of an inode entry, resolved through its
    /// parent chain for Relative entries.
    ///
    /// # Errors
    ///
    /// [`SpecError::Name`] when the stored name contains a malformed
    /// escape sequence.
    pub fn path(&self, idx: usize) -> Result<PathBuf, SpecError> {
        let bytes = self.path_bytes(idx)?;
        #[cfg(unix)]
        {
            use std::ffi::OsString;
            use std::os::unix::ffi::OsStringExt;
            Ok(PathBuf::from(OsString::from_vec(bytes)))
        }
        #[cfg(not(unix))]
        {
            Ok(PathBuf::from(String::from_utf8_lossy(&bytes).into_owned()))
        }
    }

    /// The entry's keywords merged with its `/set` scope; the entry's own
    /// values win on collision.
    #[must_use]
    pub fn effective_keywords(&self, idx: usize) -> Vec<KeyVal> {
        let entry = &self.entries[idx];
        match entry.set {
            Some(set) => merge_set(&self.entries[set].keywords, &entry.keywords),
            None => entry.keywords.clone(),
        }
    }

    /// The distinct canonical keyword prefixes used anywhere in the
    /// manifest (`/set` lines included), in first-appearance order.
    #[must_use]
    pub fn used_keywords(&self) -> Vec<Keyword> {
        let mut seen: Vec<Keyword> = Vec::new();
        for entry in &self.entries {
            let relevant = entry.kind.is_inode()
                || (entry.kind == EntryType::Special && entry.name == "/set");
            if !relevant {
                continue;
            }
            for kv in &entry.keywords {
                let canonical = synonym(kv.keyword().prefix());
                if !seen.contains(&canonical) {
                    seen.push(canonical);
                }
            }
        }
        seen
    }

    /// Serializes the hierarchy, replaying input order; returns the number
    /// of bytes written.
    ///
    /// Lines captured verbatim (comments, blanks, `..`, the signature)
    /// round-trip byte-for-byte.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the sink.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<u64> {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by_key(|&idx| self.entries[idx].pos);

        let mut written = 0u64;
        for idx in order {
            let line = self.entries[idx].format();
            writer.write_all(&line)?;
            writer.write_all(b"\n")?;
            written += line.len() as u64 + 1;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omtree_keywords::KeyVal;

    fn inode(name: &str, parent: Option<usize>, kvs: &[&str]) -> Entry {
        let mut entry = Entry::new(if name.contains('/') {
            EntryType::Full
        } else {
            EntryType::Relative
        });
        entry.name = name.to_owned();
        entry.parent = parent;
        entry.keywords = kvs.iter().map(|kv| KeyVal::parse(kv)).collect();
        entry
    }

    #[test]
    fn push_wires_order_and_first_child() {
        let mut dh = DirectoryHierarchy::new();
        let dir = dh.push(inode("d", None, &["type=dir"]));
        let first = dh.push(inode("a", Some(dir), &["type=file"]));
        let second = dh.push(inode("b", Some(dir), &["type=file"]));

        assert_eq!(dh.entry(dir).child, Some(first));
        assert_eq!(dh.entry(first).prev, Some(dir));
        assert_eq!(dh.entry(first).next, Some(second));
        assert_eq!(dh.entry(second).pos, 2);
    }

    #[test]
    fn paths_resolve_through_parents_and_decode() {
        let mut dh = DirectoryHierarchy::new();
        let dir = dh.push(inode("d", None, &["type=dir"]));
        let file = dh.push(inode("with\\040space", Some(dir), &["type=file"]));
        assert_eq!(dh.path(file).unwrap(), PathBuf::from("d/with space"));

        let full = dh.push(inode("x/y", None, &[]));
        assert_eq!(dh.path(full).unwrap(), PathBuf::from("x/y"));
    }

    #[test]
    fn effective_keywords_merge_scope() {
        let mut dh = DirectoryHierarchy::new();
        let mut set = Entry::new(EntryType::Special);
        set.name = "/set".into();
        set.keywords = vec![KeyVal::parse("uid=0"), KeyVal::parse("type=file")];
        let set = dh.push(set);

        let mut entry = inode("f", None, &["uid=1000"]);
        entry.set = Some(set);
        let entry = dh.push(entry);

        let merged: Vec<String> = dh
            .effective_keywords(entry)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(merged, ["uid=1000", "type=file"]);
    }

    #[test]
    fn used_keywords_canonicalize_and_dedupe() {
        let mut dh = DirectoryHierarchy::new();
        let mut set = Entry::new(EntryType::Special);
        set.name = "/set".into();
        set.keywords = vec![KeyVal::parse("uid=0")];
        dh.push(set);
        dh.push(inode("f", None, &["md5=00", "xattr.user.a=bb", "uid=1"]));

        let keywords = dh.used_keywords();
        let used: Vec<&str> = keywords.iter().map(|k| k.as_str()).collect();
        assert_eq!(used, ["uid", "md5digest", "xattr"]);
    }
}
