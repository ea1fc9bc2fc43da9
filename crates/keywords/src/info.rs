use std::collections::BTreeMap;
use std::fs;

/// The class of filesystem object an entry describes, as named by the
/// `type` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A regular file (`type=file`).
    Regular,
    /// A directory (`type=dir`).
    Directory,
    /// A symbolic link (`type=link`).
    Symlink,
    /// A Unix domain socket (`type=socket`).
    Socket,
    /// A named pipe (`type=fifo`).
    Fifo,
    /// A character device (`type=char`).
    Char,
    /// A block device (`type=device`).
    Block,
}

impl FileKind {
    /// The value emitted for the `type` keyword.
    #[must_use]
    pub fn manifest_name(self) -> &'static str {
        match self {
            FileKind::Regular => "file",
            FileKind::Directory => "dir",
            FileKind::Symlink => "link",
            FileKind::Socket => "socket",
            FileKind::Fifo => "fifo",
            FileKind::Char => "char",
            FileKind::Block => "device",
        }
    }

    /// Whether content keywords (digests, cksum) apply.
    #[must_use]
    pub fn is_regular(self) -> bool {
        matches!(self, FileKind::Regular)
    }
}

/// Where an [`EntryInfo`] was synthesized from. Producers consult this to
/// decide whether the live filesystem may be queried for data the view
/// does not carry (xattrs, link targets, user names).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoSource {
    /// Backed by a real inode; producers may issue follow-up syscalls.
    Filesystem,
    /// Synthesized from a tar header; everything known is in the view.
    Tar,
}

/// A source-agnostic stat view of one filesystem object.
///
/// The walker fills this from [`fs::Metadata`]; the tar synthesizer fills
/// it from header fields. Optional fields stay `None` when the source
/// cannot know them (`nlink` for tar, `uname` for the filesystem, where it
/// is resolved through the user database instead).
#[derive(Debug, Clone)]
pub struct EntryInfo {
    /// Object class.
    pub kind: FileKind,
    /// Byte length as reported by the source.
    pub size: u64,
    /// Permission bits plus setuid/setgid/sticky (the low 12 mode bits).
    pub mode: u32,
    /// Numeric owner.
    pub uid: u32,
    /// Numeric group.
    pub gid: u32,
    /// Hard link count, when the source tracks one.
    pub nlink: Option<u64>,
    /// Modification time, whole seconds.
    pub mtime_sec: i64,
    /// Modification time, nanosecond remainder.
    pub mtime_nsec: u32,
    /// Symlink target bytes, when already known (tar headers carry it).
    pub link_target: Option<Vec<u8>>,
    /// Owner name, when the source carries one (tar headers do).
    pub uname: Option<String>,
    /// Extended attributes, when the source carries them (PAX headers).
    /// `None` means "consult the filesystem" for filesystem-backed views.
    pub xattrs: Option<BTreeMap<String, Vec<u8>>>,
    /// Provenance of this view.
    pub source: InfoSource,
}

impl EntryInfo {
    /// Builds a filesystem-backed view from `lstat`-style metadata.
    #[cfg(unix)]
    #[must_use]
    pub fn from_metadata(metadata: &fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        let mode = metadata.mode();
        let kind = match mode & 0o170000 {
            0o140000 => FileKind::Socket,
            0o120000 => FileKind::Symlink,
            0o060000 => FileKind::Block,
            0o040000 => FileKind::Directory,
            0o020000 => FileKind::Char,
            0o010000 => FileKind::Fifo,
            _ => FileKind::Regular,
        };

        Self {
            kind,
            size: metadata.size(),
            mode: mode & 0o7777,
            uid: metadata.uid(),
            gid: metadata.gid(),
            nlink: Some(metadata.nlink()),
            mtime_sec: metadata.mtime(),
            mtime_nsec: metadata.mtime_nsec() as u32,
            link_target: None,
            uname: None,
            xattrs: None,
            source: InfoSource::Filesystem,
        }
    }
}
