use crate::flags::VisFlags;
use std::fmt::Write as _;

fn is_graphic(b: u8) -> bool {
    (0x21..=0x7e).contains(&b)
}

fn is_glob(b: u8) -> bool {
    matches!(b, b'*' | b'?' | b'[' | b'#')
}

// Bytes considered safe enough to pass through under VisFlags::SAFE.
fn is_unsafe(b: u8) -> bool {
    matches!(b, 0x08 | 0x07 | 0x0d)
}

fn is_http(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'$' | b'-' | b'_' | b'.' | b'+' | b'!' | b'*' | b'\'' | b'(' | b')' | b','
        )
}

fn cstyle_escape(b: u8) -> Option<&'static str> {
    Some(match b {
        b'\n' => "\\n",
        b'\r' => "\\r",
        0x08 => "\\b",
        0x07 => "\\a",
        0x0b => "\\v",
        b'\t' => "\\t",
        0x0c => "\\f",
        b' ' => "\\s",
        0 => "\\000",
        _ => return None,
    })
}

fn encode_byte(b: u8, flags: VisFlags, out: &mut String) {
    if flags.contains(VisFlags::HTTP_STYLE) && !is_http(b) {
        let _ = write!(out, "%{b:02X}");
        return;
    }

    let passes = !(flags.contains(VisFlags::GLOB) && is_glob(b))
        && ((is_graphic(b) && b != b' ')
            || (!flags.contains(VisFlags::SPACE) && b == b' ')
            || (!flags.contains(VisFlags::TAB) && b == b'\t')
            || (!flags.contains(VisFlags::NEWLINE) && b == b'\n')
            || (flags.contains(VisFlags::SAFE) && is_unsafe(b)));
    if passes {
        out.push(b as char);
        if b == b'\\' && !flags.contains(VisFlags::NO_SLASH) {
            out.push('\\');
        }
        return;
    }

    if flags.contains(VisFlags::CSTYLE) {
        if let Some(esc) = cstyle_escape(b) {
            out.push_str(esc);
            return;
        }
    }

    // Graphic bytes only reach this point when a class flag (glob, space)
    // forced them out of the pass-through set; render those as octal even
    // without VisFlags::OCTAL so the tokenizer never sees them bare. The
    // space-family check keeps meta notation from emitting a literal space.
    if flags.contains(VisFlags::OCTAL) || is_graphic(b) || (b & 0x7f) == b' ' {
        let _ = write!(out, "\\{b:03o}");
        return;
    }

    // Meta notation, the historical cvis() fallback.
    if !flags.contains(VisFlags::NO_SLASH) {
        out.push('\\');
    }
    let mut low = b;
    if low & 0x80 != 0 {
        low &= 0x7f;
        out.push('M');
    }
    if low < 0x20 || low == 0x7f {
        out.push('^');
        if low == 0x7f {
            out.push('?');
        } else {
            out.push((low + b'@') as char);
        }
    } else {
        out.push('-');
        out.push(low as char);
    }
}

/// Encodes `src` into a printable ASCII string according to `flags`.
///
/// Every byte is mapped independently; the output can be handed to
/// [`crate::unvis`] with the same flags to recover `src` exactly (as long as
/// [`VisFlags::NO_SLASH`] is not used).
#[must_use]
pub fn vis(src: &[u8], flags: VisFlags) -> String {
    let mut out = String::with_capacity(src.len());
    for &b in src {
        encode_byte(b, flags, &mut out);
    }
    out
}
