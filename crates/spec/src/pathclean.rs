/// Lexically cleans a slash-separated byte path.
///
/// Collapses repeated separators, drops `.` components, resolves `..`
/// against preceding components where possible, and never touches the
/// filesystem. An empty input cleans to `.`, matching the conventions the
/// manifest grammar relies on (`clean("./a//b") == "a/b"`).
#[must_use]
pub fn clean(path: &[u8]) -> Vec<u8> {
    let rooted = path.first() == Some(&b'/');
    let mut out: Vec<&[u8]> = Vec::new();

    for component in path.split(|&b| b == b'/') {
        match component {
            b"" | b"." => {}
            b".." => {
                match out.last() {
                    Some(&last) if last != b".." => {
                        out.pop();
                    }
                    _ if rooted => {}
                    _ => out.push(b".."),
                }
            }
            other => out.push(other),
        }
    }

    let mut cleaned = Vec::with_capacity(path.len());
    if rooted {
        cleaned.push(b'/');
    }
    for (i, component) in out.iter().enumerate() {
        if i > 0 {
            cleaned.push(b'/');
        }
        cleaned.extend_from_slice(component);
    }
    if cleaned.is_empty() {
        cleaned.push(b'.');
    }
    cleaned
}

/// [`clean`] over UTF-8 text, for already-encoded manifest names.
#[must_use]
pub fn clean_str(path: &str) -> String {
    // Encoded names are ASCII, so the cleaned bytes are valid UTF-8.
    String::from_utf8_lossy(&clean(path.as_bytes())).into_owned()
}
