use std::fmt;
use std::ops::BitOr;

/// Bit set selecting which byte classes are encoded and in what style.
///
/// The flag names follow the `vis(3)` tradition. Style flags
/// ([`VisFlags::OCTAL`], [`VisFlags::CSTYLE`], [`VisFlags::HTTP_STYLE`])
/// choose the rendering of encoded bytes; class flags
/// ([`VisFlags::SPACE`], [`VisFlags::TAB`], [`VisFlags::NEWLINE`],
/// [`VisFlags::GLOB`], [`VisFlags::SAFE`]) widen or narrow the set of bytes
/// considered unsafe.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VisFlags(u16);

impl VisFlags {
    /// Encode space characters.
    pub const SPACE: Self = Self(1 << 0);
    /// Encode horizontal tabs.
    pub const TAB: Self = Self(1 << 1);
    /// Encode newlines.
    pub const NEWLINE: Self = Self(1 << 2);
    /// Leave "safe" bytes (backspace, bell, carriage return) unencoded.
    pub const SAFE: Self = Self(1 << 3);
    /// Render encoded bytes as three-digit octal escapes (`\ooo`).
    pub const OCTAL: Self = Self(1 << 4);
    /// Render encoded bytes using C-style short escapes where one exists
    /// (`\n`, `\t`, `\s`, ...).
    pub const CSTYLE: Self = Self(1 << 5);
    /// Render unsafe bytes as RFC 1808 `%XX` hex escapes.
    pub const HTTP_STYLE: Self = Self(1 << 6);
    /// Encode the glob metacharacters `*`, `?`, `[` and `#`.
    pub const GLOB: Self = Self(1 << 7);
    /// Do not emit the leading backslash. Encodings produced with this flag
    /// are not reversible; [`crate::unvis`] does not support it.
    pub const NO_SLASH: Self = Self(1 << 8);

    /// All whitespace classes together.
    pub const WHITESPACE: Self = Self(Self::SPACE.0 | Self::TAB.0 | Self::NEWLINE.0);

    /// The flag set used for manifest path names: whitespace, glob
    /// metacharacters, and high-bit bytes all become octal escapes.
    pub const MANIFEST: Self = Self(Self::WHITESPACE.0 | Self::OCTAL.0 | Self::GLOB.0);

    /// An empty flag set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Reports whether every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Reports whether any bit of `other` is set in `self`.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns the union of the two flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for VisFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for VisFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: &[(VisFlags, &str)] = &[
            (VisFlags::SPACE, "SPACE"),
            (VisFlags::TAB, "TAB"),
            (VisFlags::NEWLINE, "NEWLINE"),
            (VisFlags::SAFE, "SAFE"),
            (VisFlags::OCTAL, "OCTAL"),
            (VisFlags::CSTYLE, "CSTYLE"),
            (VisFlags::HTTP_STYLE, "HTTP_STYLE"),
            (VisFlags::GLOB, "GLOB"),
            (VisFlags::NO_SLASH, "NO_SLASH"),
        ];

        let mut first = true;
        write!(f, "VisFlags(")?;
        for (flag, name) in NAMES {
            if self.contains(*flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        if first {
            write!(f, "empty")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::VisFlags;

    #[test]
    fn whitespace_covers_all_three_classes() {
        assert!(VisFlags::WHITESPACE.contains(VisFlags::SPACE));
        assert!(VisFlags::WHITESPACE.contains(VisFlags::TAB));
        assert!(VisFlags::WHITESPACE.contains(VisFlags::NEWLINE));
        assert!(!VisFlags::WHITESPACE.contains(VisFlags::OCTAL));
    }

    #[test]
    fn manifest_set_is_whitespace_octal_glob() {
        assert_eq!(
            VisFlags::MANIFEST,
            VisFlags::WHITESPACE | VisFlags::OCTAL | VisFlags::GLOB
        );
    }

    #[test]
    fn debug_lists_set_bits() {
        let flags = VisFlags::SPACE | VisFlags::OCTAL;
        let rendered = format!("{flags:?}");
        assert!(rendered.contains("SPACE"));
        assert!(rendered.contains("OCTAL"));
        assert!(!rendered.contains("GLOB"));
    }
}
