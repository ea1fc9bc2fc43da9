use crate::error::VisError;
use crate::flags::VisFlags;

/// Cursor over the encoded input bytes.
struct Decoder<'a> {
    src: &'a [u8],
    idx: usize,
    flags: VisFlags,
}

impl<'a> Decoder<'a> {
    fn new(src: &'a [u8], flags: VisFlags) -> Self {
        Self { src, idx: 0, flags }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.idx).copied()
    }

    fn next(&mut self) -> Result<u8, VisError> {
        let b = self.peek().ok_or(VisError::Truncated)?;
        self.idx += 1;
        Ok(b)
    }

    fn done(&self) -> bool {
        self.idx >= self.src.len()
    }

    fn hex_pair(&mut self) -> Result<u8, VisError> {
        let mut value = 0u8;
        for _ in 0..2 {
            let b = self.next()?;
            let digit = (b as char)
                .to_digit(16)
                .ok_or(VisError::InvalidHexDigit(b as char))?;
            value = (value << 4) | digit as u8;
        }
        Ok(value)
    }

    // Up to three octal digits; the first has already been validated.
    fn octal(&mut self, first: u8) -> u8 {
        let mut value = u32::from(first - b'0');
        for _ in 0..2 {
            match self.peek() {
                Some(b @ b'0'..=b'7') => {
                    self.idx += 1;
                    value = (value << 3) | u32::from(b - b'0');
                }
                _ => break,
            }
        }
        value as u8
    }

    fn meta(&mut self, high: bool, out: &mut Vec<u8>) -> Result<(), VisError> {
        let bit = if high { 0x80 } else { 0 };
        match self.next()? {
            b'-' => {
                let b = self.next()?;
                out.push(bit | b);
            }
            b'^' => {
                let b = self.next()?;
                out.push(bit | control(b));
            }
            other => return Err(VisError::UnknownEscape(other as char)),
        }
        Ok(())
    }

    fn escape(&mut self, out: &mut Vec<u8>) -> Result<(), VisError> {
        match self.next()? {
            b'\\' => out.push(b'\\'),
            b @ b'0'..=b'7' => out.push(self.octal(b)),
            b'x' => {
                let b = self.hex_pair()?;
                out.push(b);
            }
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b'b' => out.push(0x08),
            b'a' => out.push(0x07),
            b'v' => out.push(0x0b),
            b't' => out.push(b'\t'),
            b'f' => out.push(0x0c),
            b's' => out.push(b' '),
            b'E' => out.push(0x1b),
            b'M' => self.meta(true, out)?,
            b'^' => {
                let b = self.next()?;
                out.push(control(b));
            }
            // Hidden newline (line continuation) and hidden marker both
            // decode to nothing.
            b'\n' | b'$' => {}
            other => return Err(VisError::UnknownEscape(other as char)),
        }
        Ok(())
    }
}

fn control(b: u8) -> u8 {
    if b == b'?' { 0x7f } else { b.wrapping_sub(b'@') }
}

/// Decodes a `vis`-encoded string back into the original byte sequence.
///
/// All escape forms the encoder can emit are accepted regardless of the
/// style bits in `flags`; `%XX` hex escapes are only recognized under
/// [`VisFlags::HTTP_STYLE`] since `%` is an ordinary byte otherwise.
///
/// # Errors
///
/// Returns [`VisError`] when an escape sequence is truncated or names an
/// unknown escape character.
pub fn unvis(src: &str, flags: VisFlags) -> Result<Vec<u8>, VisError> {
    let mut decoder = Decoder::new(src.as_bytes(), flags);
    let mut out = Vec::with_capacity(src.len());
    while !decoder.done() {
        match decoder.next()? {
            b'\\' => decoder.escape(&mut out)?,
            b'%' if flags.contains(VisFlags::HTTP_STYLE) => {
                let b = decoder.hex_pair()?;
                out.push(b);
            }
            b => out.push(b),
        }
    }
    Ok(out)
}
