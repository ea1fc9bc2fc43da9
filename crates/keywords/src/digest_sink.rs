use std::fmt::Write as _;
use std::io::{self, Read};

use digest::DynDigest;

use crate::cksum::Cksum;
use crate::keyword::{KeyVal, Keyword};

pub(crate) fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

// Maps a canonical digest keyword to a fresh hasher.
fn hasher_for(canonical: &str) -> Option<Box<dyn DynDigest>> {
    Some(match canonical {
        "md5digest" => Box::new(md5::Md5::default()),
        "sha1digest" => Box::new(sha1::Sha1::default()),
        "sha256digest" => Box::new(sha2::Sha256::default()),
        "sha384digest" => Box::new(sha2::Sha384::default()),
        "sha512digest" => Box::new(sha2::Sha512::default()),
        "ripemd160digest" => Box::new(ripemd::Ripemd160::default()),
        _ => return None,
    })
}

/// Whether the keyword consumes file content (and so takes part in the
/// shared single-pass read).
pub(crate) fn consumes_content(canonical: &str) -> bool {
    canonical == "cksum" || hasher_for(canonical).is_some()
}

enum Sink {
    Digest(Box<dyn DynDigest>),
    Cksum(Cksum),
}

/// Fans one content stream out to every requested digest plus the POSIX
/// cksum, so a file is read exactly once no matter how many content
/// keywords were asked for.
pub(crate) struct ContentSinks {
    sinks: Vec<(Keyword, Sink)>,
}

impl ContentSinks {
    /// Builds sinks for the given keywords; keywords that do not consume
    /// content are ignored. The keyword is kept as requested (synonyms
    /// emit under their requested name), while the hasher is chosen by the
    /// canonical name.
    pub(crate) fn new<'a>(keywords: impl Iterator<Item = &'a Keyword>) -> Self {
        let mut sinks = Vec::new();
        for keyword in keywords {
            let canonical = crate::keyword::synonym(keyword.as_str());
            if canonical.as_str() == "cksum" {
                sinks.push((keyword.clone(), Sink::Cksum(Cksum::new())));
            } else if let Some(hasher) = hasher_for(canonical.as_str()) {
                sinks.push((keyword.clone(), Sink::Digest(hasher)));
            }
        }
        Self { sinks }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Streams the reader to every sink and returns the finished pairs in
    /// registration order.
    pub(crate) fn consume<R: Read>(mut self, mut reader: R) -> io::Result<Vec<KeyVal>> {
        let mut buf = [0u8; 8192];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            for (_, sink) in &mut self.sinks {
                match sink {
                    Sink::Digest(hasher) => hasher.update(&buf[..n]),
                    Sink::Cksum(state) => state.update(&buf[..n]),
                }
            }
        }

        let mut out = Vec::with_capacity(self.sinks.len());
        for (keyword, sink) in self.sinks {
            let value = match sink {
                Sink::Digest(hasher) => hex(&hasher.finalize()),
                Sink::Cksum(state) => {
                    let (sum, _) = state.finalize();
                    sum.to_string()
                }
            };
            out.push(KeyVal::new(keyword, value));
        }
        Ok(out)
    }
}
