//! Character encoding conversion and the mail content-transfer policy.

use thiserror::Error;
use tracing::debug;

/// The encoding assumed when a record declares none.
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Errors from converting between encodings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscodeError {
    #[error("unsupported encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("invalid {encoding} byte sequence at offset {offset}")]
    InvalidSequence { encoding: String, offset: usize },
}

/// Converts bytes from one character encoding to another.
pub trait Transcoder {
    fn transcode(&self, bytes: &[u8], from: &str, to: &str) -> Result<Vec<u8>, TranscodeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Charset {
    Utf8,
    Latin1,
    Ascii,
}

impl Charset {
    fn lookup(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Charset::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" | "l1" => Some(Charset::Latin1),
            "us-ascii" | "ascii" => Some(Charset::Ascii),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Ascii => "US-ASCII",
        }
    }
}

/// [`Transcoder`] for UTF-8, ISO-8859-1 and US-ASCII.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTranscoder;

impl BuiltinTranscoder {
    fn decode(bytes: &[u8], charset: Charset) -> Result<String, TranscodeError> {
        let invalid = |offset| TranscodeError::InvalidSequence {
            encoding: charset.name().to_string(),
            offset,
        };
        match charset {
            Charset::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| invalid(e.valid_up_to())),
            Charset::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Charset::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(offset) => Err(invalid(offset)),
                None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            },
        }
    }

    fn encode(text: &str, charset: Charset) -> Result<Vec<u8>, TranscodeError> {
        let limit = match charset {
            Charset::Utf8 => return Ok(text.as_bytes().to_vec()),
            Charset::Latin1 => 0xff,
            Charset::Ascii => 0x7f,
        };
        text.char_indices()
            .map(|(offset, c)| {
                u8::try_from(u32::from(c))
                    .ok()
                    .filter(|&b| u32::from(b) <= limit)
                    .ok_or_else(|| TranscodeError::InvalidSequence {
                        encoding: charset.name().to_string(),
                        offset,
                    })
            })
            .collect()
    }
}

impl Transcoder for BuiltinTranscoder {
    fn transcode(&self, bytes: &[u8], from: &str, to: &str) -> Result<Vec<u8>, TranscodeError> {
        let source = Charset::lookup(from)
            .ok_or_else(|| TranscodeError::UnsupportedEncoding(from.to_string()))?;
        let target =
            Charset::lookup(to).ok_or_else(|| TranscodeError::UnsupportedEncoding(to.to_string()))?;
        if source == target {
            return Ok(bytes.to_vec());
        }
        let text = Self::decode(bytes, source)?;
        Self::encode(&text, target)
    }
}

/// True when both names refer to the same encoding, ignoring case.
pub fn same_encoding(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
        || matches!((Charset::lookup(a), Charset::lookup(b)), (Some(x), Some(y)) if x == y)
}

/// Converts `bytes` from `from` to `to`, or returns them unchanged.
///
/// Conversion failures never surface: the original bytes are kept and the
/// fallback is logged.
pub fn reencode(bytes: &[u8], from: &str, to: &str, transcoder: &dyn Transcoder) -> Vec<u8> {
    if same_encoding(from, to) {
        return bytes.to_vec();
    }
    match transcoder.transcode(bytes, from, to) {
        Ok(converted) => converted,
        Err(err) => {
            debug!(%from, %to, error = %err, "reencoding failed, keeping original bytes");
            bytes.to_vec()
        }
    }
}

/// True iff any byte has the high bit set.
pub fn needs_8bit_content_transfer(bytes: &[u8]) -> bool {
    bytes.iter().any(|&b| b >= 0x80)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_to_utf8() {
        let out = BuiltinTranscoder
            .transcode(b"caf\xe9", "ISO-8859-1", "UTF-8")
            .unwrap();
        assert_eq!(out, "café".as_bytes());
    }

    #[test]
    fn test_utf8_to_latin1() {
        let out = BuiltinTranscoder
            .transcode("café".as_bytes(), "utf8", "latin1")
            .unwrap();
        assert_eq!(out, b"caf\xe9");
    }

    #[test]
    fn test_unrepresentable_character() {
        let err = BuiltinTranscoder
            .transcode("日本".as_bytes(), "UTF-8", "ISO-8859-1")
            .unwrap_err();
        assert!(matches!(err, TranscodeError::InvalidSequence { offset: 0, .. }));
    }

    #[test]
    fn test_unsupported_encoding() {
        let err = BuiltinTranscoder
            .transcode(b"x", "KOI8-R", "UTF-8")
            .unwrap_err();
        assert_eq!(err, TranscodeError::UnsupportedEncoding("KOI8-R".to_string()));
    }

    #[test]
    fn test_reencode_falls_back_to_original() {
        let bytes = b"bad \xff utf8";
        assert_eq!(
            reencode(bytes, "UTF-8", "ISO-8859-1", &BuiltinTranscoder),
            bytes.to_vec()
        );
        assert_eq!(
            reencode(b"abc", "EBCDIC", "UTF-8", &BuiltinTranscoder),
            b"abc".to_vec()
        );
    }

    #[test]
    fn test_same_encoding_is_untouched() {
        assert!(same_encoding("utf-8", "UTF8"));
        assert!(same_encoding("KOI8-R", "koi8-r"));
        assert_eq!(
            reencode(b"\xff", "utf-8", "UTF-8", &BuiltinTranscoder),
            b"\xff".to_vec()
        );
    }

    #[test]
    fn test_needs_8bit() {
        assert!(!needs_8bit_content_transfer(b"plain ascii"));
        assert!(needs_8bit_content_transfer("naïve".as_bytes()));
        assert!(needs_8bit_content_transfer(b"\x80"));
    }
}
