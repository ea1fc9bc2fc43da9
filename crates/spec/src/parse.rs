use std::io::{BufRead, BufReader, Read};

use omtree_keywords::KeyVal;

use crate::entry::{Entry, EntryType};
use crate::error::SpecError;
use crate::hierarchy::DirectoryHierarchy;
use crate::pathclean::clean_str;

struct Lines<R> {
    reader: BufReader<R>,
    line_no: usize,
}

impl<R: Read> Lines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_no: 0,
        }
    }

    // One input line without its newline; None at end of stream.
    fn next(&mut self) -> Result<Option<Vec<u8>>, SpecError> {
        let mut buf = Vec::new();
        let n = self.reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        self.line_no += 1;
        Ok(Some(buf))
    }
}

fn leading_trimmed(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|&b| b != b' ' && b != b'\t')
        .unwrap_or(line.len());
    &line[start..]
}

// Folds `\`-continued lines into one logical line.
fn fold_continuations<R: Read>(
    lines: &mut Lines<R>,
    mut line: Vec<u8>,
) -> Result<Vec<u8>, SpecError> {
    while line.last() == Some(&b'\\') {
        let start_line = lines.line_no;
        line.pop();
        match lines.next()? {
            Some(next) => line.extend_from_slice(&next),
            None => return Err(SpecError::UnterminatedContinuation { line: start_line }),
        }
    }
    Ok(line)
}

fn tokenize(line: Vec<u8>, line_no: usize) -> Result<Vec<String>, SpecError> {
    let text =
        String::from_utf8(line).map_err(|_| SpecError::InvalidUtf8 { line: line_no })?;
    Ok(text
        .split_ascii_whitespace()
        .map(str::to_owned)
        .collect())
}

/// Parses a manifest stream into a [`DirectoryHierarchy`].
///
/// The parser is line-oriented and context-sensitive: `/set`/`/unset`
/// install and clear the attribute scope, Relative entries attach to the
/// innermost open directory, and `..` closes it. Comment, blank and `..`
/// lines keep their raw bytes so serialization reproduces them exactly.
///
/// # Errors
///
/// [`SpecError`] on I/O failure, an unknown `/command`, invalid UTF-8 in a
/// keyword-bearing line, an unterminated `\` continuation, or `..` with no
/// open directory.
pub fn parse_spec<R: Read>(reader: R) -> Result<DirectoryHierarchy, SpecError> {
    let mut lines = Lines::new(reader);
    let mut dh = DirectoryHierarchy::new();
    let mut cur_set: Option<usize> = None;
    let mut cur_dir: Option<usize> = None;

    while let Some(line) = lines.next()? {
        let line_no = lines.line_no;
        let trimmed = leading_trimmed(&line);

        if trimmed.first() == Some(&b'#') {
            let kind = if trimmed.starts_with(b"#mtree") {
                EntryType::Signature
            } else {
                EntryType::Comment
            };
            let mut entry = Entry::new(kind);
            entry.raw = Some(line);
            dh.push(entry);
            continue;
        }

        if trimmed.is_empty() {
            let mut entry = Entry::new(EntryType::Blank);
            entry.raw = Some(line);
            dh.push(entry);
            continue;
        }

        if line.first() == Some(&b'/') {
            let folded = fold_continuations(&mut lines, line)?;
            let tokens = tokenize(folded, line_no)?;
            let mut entry = Entry::new(EntryType::Special);
            entry.name = tokens[0].clone();
            entry.keywords = tokens[1..].iter().map(|t| KeyVal::parse(t)).collect();
            match entry.name.as_str() {
                "/set" => {
                    let idx = dh.push(entry);
                    cur_set = Some(idx);
                }
                "/unset" => {
                    dh.push(entry);
                    cur_set = None;
                }
                other => {
                    return Err(SpecError::UnknownSpecial {
                        line: line_no,
                        name: other.to_owned(),
                    });
                }
            }
            continue;
        }

        let first_token_end = trimmed
            .iter()
            .position(|&b| b == b' ' || b == b'\t')
            .unwrap_or(trimmed.len());
        if &trimmed[..first_token_end] == b".." {
            let Some(open) = cur_dir else {
                return Err(SpecError::UnbalancedDotDot { line: line_no });
            };
            cur_dir = dh.entry(open).parent;
            let mut entry = Entry::new(EntryType::DotDot);
            entry.name = "..".into();
            entry.raw = Some(line);
            dh.push(entry);
            continue;
        }

        // An inode entry line.
        let folded = fold_continuations(&mut lines, line)?;
        let tokens = tokenize(folded, line_no)?;
        let mut entry = Entry::new(EntryType::Relative);
        entry.name = tokens[0].clone();
        entry.keywords = tokens[1..].iter().map(|t| KeyVal::parse(t)).collect();

        // Effective type decides whether this opens a directory scope.
        let own_type = entry
            .keywords
            .iter()
            .find(|kv| kv.keyword().as_str() == "type")
            .map(|kv| kv.value().to_owned());
        let effective_type = own_type.or_else(|| {
            cur_set.and_then(|set| {
                dh.entry(set)
                    .keywords
                    .iter()
                    .find(|kv| kv.keyword().as_str() == "type")
                    .map(|kv| kv.value().to_owned())
            })
        });
        let is_dir = effective_type.as_deref() == Some("dir");

        if entry.name.contains('/') {
            entry.kind = EntryType::Full;
        } else {
            entry.parent = cur_dir;
        }
        entry.set = cur_set;
        // Clean only after classification: cleaning can strip slashes, and
        // a name like "dir/" must still parse as a Full entry.
        entry.name = clean_str(&entry.name);

        let idx = dh.push(entry);
        if is_dir && dh.entry(idx).kind == EntryType::Relative {
            cur_dir = Some(idx);
        }
    }

    Ok(dh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> DirectoryHierarchy {
        parse_spec(text.as_bytes()).expect("manifest should parse")
    }

    #[test]
    fn classifies_line_shapes() {
        let dh = parse(
            "#mtree v2.0\n\
             # a comment\n\
             \n\
             /set type=file uid=0\n\
             . type=dir\n\
                 file size=3\n\
             ..\n\
             /unset\n\
             some/full/path size=1\n",
        );
        let kinds: Vec<EntryType> = dh.entries().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                EntryType::Signature,
                EntryType::Comment,
                EntryType::Blank,
                EntryType::Special,
                EntryType::Relative,
                EntryType::Relative,
                EntryType::DotDot,
                EntryType::Special,
                EntryType::Full,
            ]
        );
    }

    #[test]
    fn set_scope_attaches_to_entries() {
        let dh = parse("/set uid=0 gid=0\n. type=dir\n    f type=file\n");
        let file = &dh.entries()[2];
        assert_eq!(file.set, Some(0));
        let effective: Vec<String> = dh
            .effective_keywords(2)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(effective, ["uid=0", "gid=0", "type=file"]);
    }

    #[test]
    fn unset_clears_the_scope() {
        let dh = parse("/set uid=0\n/unset\n    f type=file\n");
        assert_eq!(dh.entries()[2].set, None);
    }

    #[test]
    fn directories_nest_and_dotdot_closes() {
        let dh = parse(
            ". type=dir\n\
             sub type=dir\n\
                 inner type=file\n\
             ..\n\
             sibling type=file\n",
        );
        // inner's parent is sub, sibling's parent is . again.
        assert_eq!(dh.entries()[2].parent, Some(1));
        assert_eq!(dh.entries()[4].parent, Some(0));
        assert_eq!(
            dh.path(2).unwrap(),
            std::path::PathBuf::from("sub/inner")
        );
    }

    #[test]
    fn set_type_dir_opens_scope_for_plain_names() {
        // The entry's effective type comes from the scope here.
        let dh = parse("/set type=dir\nd\n    sub\n");
        assert_eq!(dh.entries()[2].parent, Some(1));
    }

    #[test]
    fn line_continuations_fold() {
        let dh = parse("/set uid=0 \\\ngid=5\n    f type=file\n");
        let set = &dh.entries()[0];
        let kvs: Vec<String> = set.keywords.iter().map(ToString::to_string).collect();
        assert_eq!(kvs, ["uid=0", "gid=5"]);
    }

    #[test]
    fn unterminated_continuation_is_fatal() {
        assert!(matches!(
            parse_spec("f size=1 \\".as_bytes()),
            Err(SpecError::UnterminatedContinuation { .. })
        ));
    }

    #[test]
    fn unknown_special_is_fatal() {
        assert!(matches!(
            parse_spec("/frobnicate a=1\n".as_bytes()),
            Err(SpecError::UnknownSpecial { .. })
        ));
    }

    #[test]
    fn dotdot_without_open_directory_is_fatal() {
        assert!(matches!(
            parse_spec("..\n".as_bytes()),
            Err(SpecError::UnbalancedDotDot { .. })
        ));
    }

    #[test]
    fn malformed_keyvals_are_kept_verbatim() {
        let dh = parse("    f type=file optional\n");
        let entry = &dh.entries()[0];
        assert!(entry.keywords[1].is_bare());
        assert_eq!(entry.keywords[1].to_string(), "optional");
    }

    #[test]
    fn names_are_cleaned_after_classification() {
        let dh = parse("dir/ size=1\n");
        // "dir/" cleans to "dir" but was classified as Full first.
        assert_eq!(dh.entries()[0].kind, EntryType::Full);
        assert_eq!(dh.entries()[0].name, "dir");
    }
}
