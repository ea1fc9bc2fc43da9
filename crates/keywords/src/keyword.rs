use std::fmt;

/// The full name of a manifest attribute, e.g. `sha1digest` or
/// `xattr.user.foo`.
///
/// Prefixed keywords carry a suffix after the first `.`; the prefix names
/// the registry entry while the suffix selects the concrete attribute (for
/// `xattr`, the attribute name itself).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keyword(String);

impl Keyword {
    /// Wraps a keyword name without canonicalization; use [`synonym`] to
    /// canonicalize user input first.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The keyword name as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the first `.`, which names the registry entry.
    /// Equals the whole name for unprefixed keywords.
    #[must_use]
    pub fn prefix(&self) -> &str {
        match self.0.split_once('.') {
            Some((prefix, _)) => prefix,
            None => &self.0,
        }
    }

    /// The part after the first `.`, if any.
    #[must_use]
    pub fn suffix(&self) -> Option<&str> {
        self.0.split_once('.').map(|(_, suffix)| suffix)
    }

    /// Whether the keyword carries a suffix.
    #[must_use]
    pub fn is_prefixed(&self) -> bool {
        self.0.contains('.')
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Keyword {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for Keyword {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl PartialEq<str> for Keyword {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Keyword {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Resolves a keyword name to its canonical form.
///
/// The digest short names map to their `*digest` forms, the historical
/// `rmd160` spellings collapse to `ripemd160digest`, and `xattrs` is an
/// alias for `xattr`. Unknown names pass through unchanged, and the
/// function is idempotent. Suffixes of prefixed keywords are preserved.
#[must_use]
pub fn synonym(name: &str) -> Keyword {
    let (prefix, suffix) = match name.split_once('.') {
        Some((prefix, suffix)) => (prefix, Some(suffix)),
        None => (name, None),
    };
    let canonical = match prefix {
        "md5" => "md5digest",
        "sha1" => "sha1digest",
        "sha256" => "sha256digest",
        "sha384" => "sha384digest",
        "sha512" => "sha512digest",
        "rmd160" | "rmd160digest" => "ripemd160digest",
        "xattrs" => "xattr",
        other => other,
    };
    match suffix {
        Some(suffix) => Keyword::new(format!("{canonical}.{suffix}")),
        None => Keyword::new(canonical),
    }
}

/// One `keyword=value` pair from a manifest line.
///
/// A token without `=` is kept verbatim as a *bare* pair; it surfaces as an
/// unknown-keyword error only if something later asks for its value, which
/// mirrors how manifests tolerate trailing junk tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyVal {
    keyword: Keyword,
    value: Option<String>,
}

impl KeyVal {
    /// Builds a pair from an already-split keyword and value.
    pub fn new(keyword: impl Into<Keyword>, value: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            value: Some(value.into()),
        }
    }

    /// Splits a whitespace-delimited manifest token on its first `=`.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token.split_once('=') {
            Some((keyword, value)) => Self {
                keyword: Keyword::new(keyword),
                value: Some(value.to_owned()),
            },
            None => Self {
                keyword: Keyword::new(token),
                value: None,
            },
        }
    }

    /// The keyword half of the pair.
    #[must_use]
    pub fn keyword(&self) -> &Keyword {
        &self.keyword
    }

    /// The textual value; empty for bare tokens.
    #[must_use]
    pub fn value(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    /// Whether the token lacked an `=` entirely.
    #[must_use]
    pub fn is_bare(&self) -> bool {
        self.value.is_none()
    }
}

impl fmt::Display for KeyVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.keyword, value),
            None => write!(f, "{}", self.keyword),
        }
    }
}

/// Finds the first pair whose full keyword name equals `name`.
#[must_use]
pub fn has_keyword<'a>(kvs: &'a [KeyVal], name: &str) -> Option<&'a KeyVal> {
    kvs.iter().find(|kv| kv.keyword().as_str() == name)
}

/// Merges a `/set` scope with an entry's own pairs; the entry wins on full
/// keyword-name collisions and its novel pairs are appended in order.
#[must_use]
pub fn merge_set(set: &[KeyVal], entry: &[KeyVal]) -> Vec<KeyVal> {
    let mut merged: Vec<KeyVal> = Vec::with_capacity(set.len() + entry.len());
    for kv in set {
        match has_keyword(entry, kv.keyword().as_str()) {
            Some(own) => merged.push(own.clone()),
            None => merged.push(kv.clone()),
        }
    }
    for kv in entry {
        if has_keyword(set, kv.keyword().as_str()).is_none() {
            merged.push(kv.clone());
        }
    }
    merged
}

/// Filters pairs down to those whose keyword prefix appears in `keywords`
/// (by canonical prefix, so `xattr` selects every `xattr.*` and
/// `xattrs.*` pair).
#[must_use]
pub fn keyval_select(kvs: &[KeyVal], keywords: &[Keyword]) -> Vec<KeyVal> {
    kvs.iter()
        .filter(|kv| {
            let wanted = synonym(kv.keyword().prefix());
            keywords.iter().any(|k| synonym(k.prefix()) == wanted)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_and_suffix_split_on_first_dot() {
        let kw = Keyword::new("xattr.user.foo");
        assert_eq!(kw.prefix(), "xattr");
        assert_eq!(kw.suffix(), Some("user.foo"));
        assert!(kw.is_prefixed());

        let plain = Keyword::new("sha1digest");
        assert_eq!(plain.prefix(), "sha1digest");
        assert_eq!(plain.suffix(), None);
    }

    #[test]
    fn synonyms_canonicalize_and_are_idempotent() {
        for (name, canonical) in [
            ("md5", "md5digest"),
            ("sha1", "sha1digest"),
            ("sha256", "sha256digest"),
            ("sha384", "sha384digest"),
            ("sha512", "sha512digest"),
            ("rmd160", "ripemd160digest"),
            ("rmd160digest", "ripemd160digest"),
            ("xattrs", "xattr"),
            ("size", "size"),
        ] {
            let once = synonym(name);
            assert_eq!(once.as_str(), canonical);
            assert_eq!(synonym(once.as_str()), once);
        }
    }

    #[test]
    fn synonym_preserves_suffix() {
        assert_eq!(synonym("xattrs.user.foo").as_str(), "xattr.user.foo");
    }

    #[test]
    fn keyval_parse_splits_on_first_equals() {
        let kv = KeyVal::parse("link=a=b");
        assert_eq!(kv.keyword().as_str(), "link");
        assert_eq!(kv.value(), "a=b");

        let bare = KeyVal::parse("optional");
        assert!(bare.is_bare());
        assert_eq!(bare.value(), "");
        assert_eq!(bare.to_string(), "optional");
    }

    #[test]
    fn merge_set_entry_wins_and_appends() {
        let set = vec![KeyVal::parse("uid=0"), KeyVal::parse("gid=0")];
        let entry = vec![KeyVal::parse("uid=1000"), KeyVal::parse("size=5")];
        let merged = merge_set(&set, &entry);
        let rendered: Vec<String> = merged.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["uid=1000", "gid=0", "size=5"]);
    }

    #[test]
    fn keyval_select_matches_on_prefix() {
        let kvs = vec![
            KeyVal::parse("uid=0"),
            KeyVal::parse("xattr.user.a=aa"),
            KeyVal::parse("size=1"),
        ];
        let picked = keyval_select(&kvs, &[Keyword::new("xattr"), Keyword::new("uid")]);
        let rendered: Vec<String> = picked.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["uid=0", "xattr.user.a=aa"]);
    }
}
