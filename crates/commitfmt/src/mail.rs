//! Mail header encoding for the `email` and `mboxrd` layouts.

use crate::width::{display_width, line_width};

/// Longest header line before folding.
pub const MAX_HEADER_LENGTH: usize = 78;

/// Longest line holding an RFC 2047 encoded word.
pub const MAX_ENCODED_LENGTH: usize = 76;

/// Where an encoded word appears; addresses restrict the literal set further.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rfc2047Kind {
    Subject,
    Address,
}

fn non_ascii(b: u8) -> bool {
    !b.is_ascii() || b == 0x1b
}

/// True when `text` cannot appear in a header as is.
pub fn needs_rfc2047_encoding(text: &[u8]) -> bool {
    text.iter().enumerate().any(|(i, &b)| {
        non_ascii(b) || b == b'\n' || (b == b'=' && text.get(i + 1) == Some(&b'?'))
    })
}

fn is_rfc2047_special(b: u8, kind: Rfc2047Kind) -> bool {
    if non_ascii(b) || !(b.is_ascii_graphic() || b == b' ') {
        return true;
    }
    if b.is_ascii_whitespace() || b == b'=' || b == b'?' || b == b'_' {
        return true;
    }
    if kind != Rfc2047Kind::Address {
        return false;
    }
    !(b.is_ascii_alphanumeric() || matches!(b, b'!' | b'*' | b'+' | b'-' | b'/'))
}

/// Byte length of the character at the start of `bytes` in `encoding`.
/// Only UTF-8 has multi-byte characters here.
fn char_len(bytes: &[u8], encoding: &str) -> usize {
    if !encoding.eq_ignore_ascii_case("utf-8") && !encoding.eq_ignore_ascii_case("utf8") {
        return 1;
    }
    let len = match bytes[0] {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return 1,
    };
    match bytes.get(..len).map(std::str::from_utf8) {
        Some(Ok(_)) => len,
        _ => 1,
    }
}

/// Appends `text` as Q-encoded words, breaking lines so none exceeds
/// [`MAX_ENCODED_LENGTH`]. Multi-byte characters are never split.
pub fn add_rfc2047(out: &mut Vec<u8>, text: &[u8], encoding: &str, kind: Rfc2047Kind) {
    let mut line_len = line_width(out);
    out.extend_from_slice(format!("=?{}?q?", encoding).as_bytes());
    line_len += encoding.len() + 5;

    let mut pos = 0;
    while pos < text.len() {
        let len = char_len(&text[pos..], encoding);
        let chunk = &text[pos..pos + len];
        let special = len > 1 || is_rfc2047_special(chunk[0], kind);
        let encoded_len = if special { 3 * len } else { 1 };

        if line_len + encoded_len + 2 > MAX_ENCODED_LENGTH {
            out.extend_from_slice(format!("?=\n =?{}?q?", encoding).as_bytes());
            line_len = encoding.len() + 5 + 1;
        }
        if special {
            for b in chunk {
                out.extend_from_slice(format!("={:02X}", b).as_bytes());
            }
        } else {
            out.push(chunk[0]);
        }
        line_len += encoded_len;
        pos += len;
    }
    out.extend_from_slice(b"?=");
}

fn is_rfc822_special(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b':' | b';' | b'@' | b',' | b'.' | b'"' | b'\\'
    )
}

/// True when a display name must be quoted.
pub fn needs_rfc822_quoting(name: &[u8]) -> bool {
    name.iter().copied().any(is_rfc822_special)
}

/// Wraps `name` in double quotes, escaping `"` and `\`.
pub fn rfc822_quote(name: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len() + 2);
    out.push(b'"');
    for &b in name {
        if b == b'"' || b == b'\\' {
            out.push(b'\\');
        }
        out.push(b);
    }
    out.push(b'"');
    out
}

/// Appends `text`, folding at spaces so lines stay within `width`.
/// Continuation lines start with a single space.
pub fn fold_header(out: &mut Vec<u8>, text: &[u8], width: usize) {
    let mut col = line_width(out);
    for (i, word) in text.split(|&b| b == b' ').enumerate() {
        let w = display_width(word);
        if i > 0 {
            if col + 1 + w > width {
                out.extend_from_slice(b"\n ");
                col = 1;
            } else {
                out.push(b' ');
                col += 1;
            }
        }
        out.extend_from_slice(word);
        col += w;
    }
}

/// True for lines an mbox reader would take as a message separator,
/// possibly already escaped: `>*From `.
pub fn is_mboxrd_from(line: &[u8]) -> bool {
    let quotes = line.iter().take_while(|&&b| b == b'>').count();
    line[quotes..].starts_with(b"From ")
}

/// True for `Token: value` lines.
pub fn is_pseudo_header(line: &[u8]) -> bool {
    let Some(colon) = line.iter().position(|&b| b == b':') else {
        return false;
    };
    colon > 0
        && line[..colon]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'-')
        && line.get(colon + 1) == Some(&b' ')
}
