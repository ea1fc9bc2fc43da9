use omtree_keywords::KeyVal;

/// The shapes a manifest line can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// The `#mtree v2.0` header line.
    Signature,
    /// A line that is empty or whitespace-only.
    Blank,
    /// Any other line starting with `#`.
    Comment,
    /// A `/set` or `/unset` scope command.
    Special,
    /// An entry named without `/`, attached to the enclosing directory.
    Relative,
    /// The `..` marker closing the innermost open directory.
    DotDot,
    /// An entry whose name carries at least one `/`; stands alone.
    Full,
}

impl EntryType {
    /// Whether this line describes a filesystem object (as opposed to
    /// structure, scope, or commentary).
    #[must_use]
    pub fn is_inode(self) -> bool {
        matches!(self, EntryType::Relative | EntryType::Full)
    }
}

/// One line of a manifest, stored in the hierarchy's entry arena.
///
/// Links between entries are arena indices rather than references; the
/// graph is cyclic (parent/child/prev/next/set) and an index-based arena
/// keeps it safely traversable in both directions.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Line shape.
    pub kind: EntryType,
    /// The name exactly as written (still vis-encoded). `..` for DotDot
    /// lines, `/set`/`/unset` for specials, empty for comments and blanks.
    pub name: String,
    /// The original line bytes for lines that re-emit verbatim
    /// (signature, comments, blanks, `..`).
    pub raw: Option<Vec<u8>>,
    /// The `keyword=value` pairs as written, in order.
    pub keywords: Vec<KeyVal>,
    /// Order of appearance in the input; serialization replays this order.
    pub pos: usize,
    /// Enclosing directory for Relative entries.
    pub parent: Option<usize>,
    /// The `/set` in effect when this entry was read.
    pub set: Option<usize>,
    /// Previous entry in input order.
    pub prev: Option<usize>,
    /// Next entry in input order.
    pub next: Option<usize>,
    /// First child entry, for directory entries.
    pub child: Option<usize>,
}

impl Entry {
    /// A bare entry of the given shape; callers fill the relevant fields.
    #[must_use]
    pub fn new(kind: EntryType) -> Self {
        Self {
            kind,
            name: String::new(),
            raw: None,
            keywords: Vec::new(),
            pos: 0,
            parent: None,
            set: None,
            prev: None,
            next: None,
            child: None,
        }
    }

    /// Renders the entry as a manifest line (without the newline).
    ///
    /// Lines captured verbatim re-emit their original bytes; everything
    /// else is formatted canonically. Relative non-directory entries are
    /// indented four spaces, the traditional mtree layout.
    #[must_use]
    pub fn format(&self) -> Vec<u8> {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        match self.kind {
            EntryType::Blank => Vec::new(),
            EntryType::DotDot => self.name.clone().into_bytes(),
            _ => {
                let mut line = String::new();
                let indent = self.kind == EntryType::Relative && !self.is_dir();
                if indent {
                    line.push_str("    ");
                }
                line.push_str(&self.name);
                for kv in &self.keywords {
                    line.push(' ');
                    line.push_str(&kv.to_string());
                }
                line.into_bytes()
            }
        }
    }

    /// Whether the entry's own keywords declare `type=dir`.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.keywords
            .iter()
            .any(|kv| kv.keyword().as_str() == "type" && kv.value() == "dir")
    }
}
