//! Trailer extraction for `%(trailers[:options])`.
//!
//! A trailer block is the last paragraph of the message when it consists of
//! `Token: value` lines (values may continue on indented lines). A block
//! with some other lines still counts when it contains a line that tools
//! generate themselves (`Signed-off-by: `, `(cherry picked from commit `)
//! and at least a quarter of its lines are trailers.

use crate::error::{FormatError, Result};
use crate::locator::{find_eol, is_blank};

const GENERATED_PREFIXES: &[&[u8]] = &[b"Signed-off-by: ", b"(cherry picked from commit "];

/// Options of a `%(trailers)` directive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrailerOptions {
    /// Drop non-trailer lines from the block.
    pub only: bool,
    /// Join continuation lines into a single line.
    pub unfold: bool,
    /// Keep only trailers with one of these keys (case-insensitive).
    pub keys: Vec<String>,
    /// Inserted between trailers instead of terminating each with a newline.
    pub separator: Option<Vec<u8>>,
    /// Inserted between key and value instead of `": "`.
    pub key_value_separator: Option<Vec<u8>>,
    pub value_only: bool,
    pub key_only: bool,
}

impl TrailerOptions {
    /// Parses the comma-separated option list after `trailers:`.
    ///
    /// Boolean options accept an optional `=true`/`=false` (also
    /// `yes`/`no`, `on`/`off`, `1`/`0`). `key=` implies `only`. Separator
    /// values understand `%n` and `%xNN`.
    pub fn parse(args: &str) -> Result<Self> {
        let mut opts = TrailerOptions::default();
        let unknown = || FormatError::UnknownDirective(format!("(trailers:{})", args));

        for arg in args.split(',').filter(|a| !a.is_empty()) {
            let (name, value) = match arg.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (arg, None),
            };
            match name {
                "only" => opts.only = parse_bool(value).ok_or_else(unknown)?,
                "unfold" => opts.unfold = parse_bool(value).ok_or_else(unknown)?,
                "valueonly" => opts.value_only = parse_bool(value).ok_or_else(unknown)?,
                "keyonly" => opts.key_only = parse_bool(value).ok_or_else(unknown)?,
                "key" => {
                    let key = value.filter(|v| !v.is_empty()).ok_or_else(unknown)?;
                    opts.keys
                        .push(key.strip_suffix(':').unwrap_or(key).to_string());
                    opts.only = true;
                }
                "separator" => {
                    opts.separator = Some(expand_escapes(value.unwrap_or("")).ok_or_else(unknown)?)
                }
                "key_value_separator" => {
                    opts.key_value_separator =
                        Some(expand_escapes(value.unwrap_or("")).ok_or_else(unknown)?)
                }
                _ => return Err(unknown()),
            }
        }
        Ok(opts)
    }
}

fn parse_bool(value: Option<&str>) -> Option<bool> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("true") | Some("yes") | Some("on") | Some("1") => Some(true),
        Some("false") | Some("no") | Some("off") | Some("0") => Some(false),
        _ => None,
    }
}

/// Expands `%n` and `%xNN` in a separator argument.
fn expand_escapes(text: &str) -> Option<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        match bytes.get(i + 1) {
            Some(b'n') => {
                out.push(b'\n');
                i += 2;
            }
            Some(b'%') => {
                out.push(b'%');
                i += 2;
            }
            Some(b'x') => {
                let hex = text.get(i + 2..i + 4)?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 4;
            }
            _ => {
                out.push(b'%');
                i += 1;
            }
        }
    }
    Some(out)
}

/// Renders the trailer block of a message body.
pub trait TrailerFormatter {
    fn format(&self, body: &[u8], options: &TrailerOptions) -> Vec<u8>;
}

/// The built-in trailer parser described in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTrailerFormatter;

#[derive(Debug, PartialEq, Eq)]
enum Item<'a> {
    Trailer { key: &'a [u8], value: Vec<u8> },
    Other(&'a [u8]),
}

impl SimpleTrailerFormatter {
    fn block(body: &[u8]) -> Option<Vec<Item<'_>>> {
        let mut lines: Vec<&[u8]> = Vec::new();
        let mut pos = 0;
        while pos < body.len() {
            let eol = find_eol(body, pos);
            lines.push(&body[pos..eol]);
            pos = eol + 1;
        }
        while lines.last().is_some_and(|l| is_blank(l)) {
            lines.pop();
        }
        let start = lines
            .iter()
            .rposition(|l| is_blank(l))
            .map_or(0, |i| i + 1);
        let paragraph = &lines[start..];

        let mut items: Vec<Item<'_>> = Vec::new();
        let mut trailers = 0;
        let mut others = 0;
        let mut generated = false;
        for &line in paragraph {
            let continuation = line.first().is_some_and(|b| b.is_ascii_whitespace());
            if continuation {
                if let Some(Item::Trailer { value, .. }) = items.last_mut() {
                    value.push(b'\n');
                    value.extend_from_slice(line);
                    continue;
                }
            }
            if GENERATED_PREFIXES.iter().any(|p| line.starts_with(p)) {
                generated = true;
            }
            match split_trailer(line) {
                Some((key, value)) => {
                    trailers += 1;
                    items.push(Item::Trailer {
                        key,
                        value: value.to_vec(),
                    });
                }
                None if generated && line.starts_with(b"(cherry picked from commit ") => {
                    trailers += 1;
                    items.push(Item::Other(line));
                }
                None => {
                    others += 1;
                    items.push(Item::Other(line));
                }
            }
        }

        let qualifies = trailers > 0 && (others == 0 || (generated && trailers * 3 >= others));
        qualifies.then_some(items)
    }
}

/// Splits `Token: value`, where the token is alphanumeric or `-`.
fn split_trailer(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let colon = line.iter().position(|&b| b == b':')?;
    let key = trim_end(&line[..colon]);
    if key.is_empty() || !key.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-') {
        return None;
    }
    let value = &line[colon + 1..];
    let start = value
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(value.len());
    Some((key, trim_end(&value[start..])))
}

fn trim_end(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &bytes[..end]
}

fn unfold(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    let mut lines = value.split(|&b| b == b'\n');
    if let Some(first) = lines.next() {
        out.extend_from_slice(first);
    }
    for line in lines {
        let start = line
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(line.len());
        out.push(b' ');
        out.extend_from_slice(&line[start..]);
    }
    out
}

impl TrailerFormatter for SimpleTrailerFormatter {
    fn format(&self, body: &[u8], options: &TrailerOptions) -> Vec<u8> {
        let Some(items) = Self::block(body) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for item in items {
            let mut piece = Vec::new();
            match item {
                Item::Trailer { key, value } => {
                    if !options.keys.is_empty()
                        && !options
                            .keys
                            .iter()
                            .any(|k| k.as_bytes().eq_ignore_ascii_case(key))
                    {
                        continue;
                    }
                    if !options.value_only {
                        piece.extend_from_slice(key);
                    }
                    if !options.key_only && !options.value_only {
                        piece.extend_from_slice(
                            options.key_value_separator.as_deref().unwrap_or(b": "),
                        );
                    }
                    if !options.key_only {
                        if options.unfold {
                            piece.extend_from_slice(&unfold(&value));
                        } else {
                            piece.extend_from_slice(&value);
                        }
                    }
                }
                Item::Other(line) => {
                    if options.only {
                        continue;
                    }
                    piece.extend_from_slice(line);
                }
            }
            match &options.separator {
                Some(separator) => {
                    if !out.is_empty() {
                        out.extend_from_slice(separator);
                    }
                    out.extend_from_slice(&piece);
                }
                None => {
                    out.extend_from_slice(&piece);
                    out.push(b'\n');
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = b"Explain the change.\n\
\n\
Reviewed-by: Rev Iewer <rev@example.com>\n\
Signed-off-by: A U Thor <author@example.com>\n";

    fn format(body: &[u8], args: &str) -> String {
        let opts = TrailerOptions::parse(args).unwrap();
        String::from_utf8(SimpleTrailerFormatter.format(body, &opts)).unwrap()
    }

    #[test]
    fn test_plain_block() {
        assert_eq!(
            format(BODY, ""),
            "Reviewed-by: Rev Iewer <rev@example.com>\n\
Signed-off-by: A U Thor <author@example.com>\n"
        );
    }

    #[test]
    fn test_key_filter_implies_only() {
        assert_eq!(
            format(BODY, "key=signed-off-by:"),
            "Signed-off-by: A U Thor <author@example.com>\n"
        );
        let opts = TrailerOptions::parse("key=Reviewed-by").unwrap();
        assert!(opts.only);
    }

    #[test]
    fn test_separators() {
        assert_eq!(
            format(BODY, "keyonly,separator=%x2C "),
            "Reviewed-by, Signed-off-by"
        );
        assert_eq!(
            format(BODY, "key=Reviewed-by,valueonly"),
            "Rev Iewer <rev@example.com>\n"
        );
        assert_eq!(
            format(BODY, "key=Reviewed-by,key_value_separator=%x3D"),
            "Reviewed-by=Rev Iewer <rev@example.com>\n"
        );
    }

    #[test]
    fn test_continuation_and_unfold() {
        let body = b"Fixes: a very long\n  description\n";
        assert_eq!(format(body, ""), "Fixes: a very long\n  description\n");
        assert_eq!(format(body, "unfold"), "Fixes: a very long description\n");
    }

    #[test]
    fn test_non_trailer_paragraph() {
        assert_eq!(format(b"Just prose.\nNothing: here really\n", ""), "");
        assert_eq!(format(b"", ""), "");
    }

    #[test]
    fn test_mixed_block_with_generated_line() {
        let body = b"Some note\n\
Signed-off-by: A <a@example.com>\n\
Acked-by: B <b@example.com>\n\
Tested-by: C <c@example.com>\n";
        assert_eq!(
            format(body, ""),
            "Some note\n\
Signed-off-by: A <a@example.com>\n\
Acked-by: B <b@example.com>\n\
Tested-by: C <c@example.com>\n"
        );
        assert!(!format(body, "only").contains("Some note"));
    }

    #[test]
    fn test_mixed_block_needs_a_quarter_trailers() {
        let quarter = b"one\ntwo\nthree\nSigned-off-by: A <a@example.com>\n";
        assert_eq!(format(quarter, "only"), "Signed-off-by: A <a@example.com>\n");
        let fewer = b"one\ntwo\nthree\nfour\nSigned-off-by: A <a@example.com>\n";
        assert_eq!(format(fewer, ""), "");
    }

    #[test]
    fn test_invalid_options() {
        assert!(TrailerOptions::parse("bogus").is_err());
        assert!(TrailerOptions::parse("only=maybe").is_err());
        assert!(TrailerOptions::parse("key=").is_err());
        let opts = TrailerOptions::parse("only=no,unfold").unwrap();
        assert!(!opts.only);
        assert!(opts.unfold);
    }
}
