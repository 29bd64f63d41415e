//! Display width accounting over rendered output bytes.
//!
//! Output is a byte buffer that may hold UTF-8 text, stray non-UTF-8 bytes
//! and ANSI color escapes. Width is counted per code point with
//! `unicode-width`; escape sequences are zero width; a tab advances to the
//! next multiple of [`TAB_WIDTH`]; bytes that are not valid UTF-8 count as one
//! column each.
//!
//! Truncation keeps every escape sequence it encounters, including those in
//! the dropped part, so a color reset is never lost when its text is cut.

use std::ops::Range;

use unicode_width::UnicodeWidthChar;

/// Marker inserted where truncation removed text. One column wide.
pub const ELLIPSIS: &str = "…";

/// Tab stops for width accounting.
pub const TAB_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Escape,
    Newline,
    Tab,
    Char,
}

#[derive(Debug, Clone)]
struct Unit {
    range: Range<usize>,
    kind: Kind,
    width: usize,
}

impl Unit {
    fn is_escape(&self) -> bool {
        self.kind == Kind::Escape
    }
}

/// Splits `text` into escapes, control characters and display characters,
/// with each unit's width at its position when `text` starts at column
/// `col` (tabs depend on the column).
fn units(text: &[u8], mut col: usize) -> Vec<Unit> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let (len, kind, width) = match text[pos] {
            0x1b => (escape_len(&text[pos..]), Kind::Escape, 0),
            b'\n' => {
                col = 0;
                (1, Kind::Newline, 0)
            }
            b'\t' => (1, Kind::Tab, TAB_WIDTH - col % TAB_WIDTH),
            _ => {
                let (len, width) = char_at(&text[pos..]);
                (len, Kind::Char, width)
            }
        };
        col += width;
        out.push(Unit {
            range: pos..pos + len,
            kind,
            width,
        });
        pos += len;
    }
    out
}

/// Length of the escape sequence at the start of `bytes`.
fn escape_len(bytes: &[u8]) -> usize {
    if bytes.get(1) != Some(&b'[') {
        return 1;
    }
    let mut i = 2;
    while i < bytes.len() {
        if (0x40..=0x7e).contains(&bytes[i]) {
            return i + 1;
        }
        if !(0x20..=0x3f).contains(&bytes[i]) {
            return i;
        }
        i += 1;
    }
    bytes.len()
}

/// Byte length and display width of the character at the start of `bytes`.
fn char_at(bytes: &[u8]) -> (usize, usize) {
    let len = match bytes[0] {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return (1, 1),
    };
    let decoded = bytes
        .get(..len)
        .and_then(|b| std::str::from_utf8(b).ok())
        .and_then(|s| s.chars().next());
    match decoded {
        Some(c) => (len, c.width().unwrap_or(0)),
        None => (1, 1),
    }
}

/// Display width of `text`. Newlines are zero width.
pub fn display_width(text: &[u8]) -> usize {
    display_width_from(text, 0)
}

/// Display width of `text` written starting at column `col`.
pub fn display_width_from(text: &[u8], col: usize) -> usize {
    units(text, col).iter().map(|u| u.width).sum()
}

/// Display width of the last line of `buf`.
pub fn line_width(buf: &[u8]) -> usize {
    let start = buf
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    display_width(&buf[start..])
}

/// Shortens `text` to `max_width` by removing trailing characters.
///
/// Text that already fits is returned unchanged. Otherwise the result is the
/// longest prefix that fits in `max_width - 1` columns followed by
/// [`ELLIPSIS`]. A `max_width` of zero leaves only escape sequences.
///
/// ```rust
/// use commitfmt::width::truncate_end;
///
/// assert_eq!(truncate_end(b"hello world", 5), "hell…".as_bytes());
/// assert_eq!(truncate_end(b"hi", 5), b"hi");
/// ```
pub fn truncate_end(text: &[u8], max_width: usize) -> Vec<u8> {
    truncate_end_from(text, max_width, 0)
}

/// [`truncate_end`] for text written starting at column `col`.
pub fn truncate_end_from(text: &[u8], max_width: usize, col: usize) -> Vec<u8> {
    let units = units(text, col);
    if fits(&units, max_width) {
        return text.to_vec();
    }
    if max_width == 0 {
        return escapes_only(text, &units);
    }

    let budget = max_width - 1;
    let mut kept = Vec::with_capacity(text.len());
    let mut dropped_escapes = Vec::new();
    let mut acc = 0;
    let mut cut = false;
    for unit in &units {
        let bytes = &text[unit.range.clone()];
        if unit.is_escape() {
            if cut {
                dropped_escapes.extend_from_slice(bytes);
            } else {
                kept.extend_from_slice(bytes);
            }
        } else if !cut && acc + unit.width <= budget {
            kept.extend_from_slice(bytes);
            acc += unit.width;
        } else {
            cut = true;
        }
    }
    kept.extend_from_slice(ELLIPSIS.as_bytes());
    kept.extend_from_slice(&dropped_escapes);
    kept
}

/// Shortens `text` to `max_width` by removing leading characters.
///
/// The mirror of [`truncate_end`]: the ellipsis goes first.
pub fn truncate_start(text: &[u8], max_width: usize) -> Vec<u8> {
    truncate_start_from(text, max_width, 0)
}

/// [`truncate_start`] for text written starting at column `col`.
pub fn truncate_start_from(text: &[u8], max_width: usize, col: usize) -> Vec<u8> {
    let units = units(text, col);
    if fits(&units, max_width) {
        return text.to_vec();
    }
    if max_width == 0 {
        return escapes_only(text, &units);
    }

    let budget = max_width - 1;
    let mut acc = 0;
    let mut start = 0;
    for (i, unit) in units.iter().enumerate().rev() {
        if unit.is_escape() {
            continue;
        }
        if acc + unit.width > budget {
            start = i + 1;
            break;
        }
        acc += unit.width;
    }

    let mut out = Vec::with_capacity(text.len());
    for unit in units[..start].iter().filter(|u| u.is_escape()) {
        out.extend_from_slice(&text[unit.range.clone()]);
    }
    out.extend_from_slice(ELLIPSIS.as_bytes());
    for unit in &units[start..] {
        out.extend_from_slice(&text[unit.range.clone()]);
    }
    out
}

/// Shortens `text` to `max_width` by removing characters from the middle.
///
/// The remaining `max_width - 1` columns are split between prefix and
/// suffix; when they do not split evenly the prefix gets the extra column.
pub fn truncate_middle(text: &[u8], max_width: usize) -> Vec<u8> {
    truncate_middle_from(text, max_width, 0)
}

/// [`truncate_middle`] for text written starting at column `col`.
pub fn truncate_middle_from(text: &[u8], max_width: usize, col: usize) -> Vec<u8> {
    let units = units(text, col);
    if fits(&units, max_width) {
        return text.to_vec();
    }
    if max_width == 0 {
        return escapes_only(text, &units);
    }

    let budget = max_width - 1;
    let prefix_budget = budget.div_ceil(2);
    let suffix_budget = budget / 2;

    let mut front_end = units.len();
    let mut acc = 0;
    for (i, unit) in units.iter().enumerate() {
        if unit.is_escape() {
            continue;
        }
        if acc + unit.width > prefix_budget {
            front_end = i;
            break;
        }
        acc += unit.width;
    }

    let mut back_start = front_end;
    acc = 0;
    for (i, unit) in units.iter().enumerate().skip(front_end).rev() {
        if unit.is_escape() {
            continue;
        }
        if acc + unit.width > suffix_budget {
            back_start = i + 1;
            break;
        }
        acc += unit.width;
    }

    let mut out = Vec::with_capacity(text.len());
    for unit in &units[..front_end] {
        out.extend_from_slice(&text[unit.range.clone()]);
    }
    for unit in units[front_end..back_start].iter().filter(|u| u.is_escape()) {
        out.extend_from_slice(&text[unit.range.clone()]);
    }
    out.extend_from_slice(ELLIPSIS.as_bytes());
    for unit in &units[back_start..] {
        out.extend_from_slice(&text[unit.range.clone()]);
    }
    out
}

/// Splits `pad` columns into left and right shares, right ≥ left.
pub fn center_split(pad: usize) -> (usize, usize) {
    let left = pad / 2;
    (left, pad - left)
}

/// Replaces tabs with spaces up to the next multiple of `tab_width`,
/// counting columns from the start of `line`.
pub fn expand_tabs(line: &[u8], tab_width: usize) -> Vec<u8> {
    if tab_width == 0 || !line.contains(&b'\t') {
        return line.to_vec();
    }
    let mut out = Vec::with_capacity(line.len() + tab_width);
    let mut col = 0;
    for unit in units(line, 0) {
        match unit.kind {
            Kind::Tab => {
                let spaces = tab_width - col % tab_width;
                out.resize(out.len() + spaces, b' ');
                col += spaces;
            }
            Kind::Newline => {
                out.push(b'\n');
                col = 0;
            }
            _ => {
                out.extend_from_slice(&line[unit.range.clone()]);
                col += unit.width;
            }
        }
    }
    out
}

fn fits(units: &[Unit], max_width: usize) -> bool {
    units.iter().map(|u| u.width).sum::<usize>() <= max_width
}

fn escapes_only(text: &[u8], units: &[Unit]) -> Vec<u8> {
    units
        .iter()
        .filter(|u| u.is_escape())
        .flat_map(|u| text[u.range.clone()].iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_width_ascii() {
        assert_eq!(display_width(b"hello"), 5);
        assert_eq!(display_width(b""), 0);
    }

    #[test]
    fn test_display_width_ignores_escapes() {
        assert_eq!(display_width(b"\x1b[31mred\x1b[m"), 3);
        assert_eq!(display_width(b"\x1b[1;38;5;208mx"), 1);
    }

    #[test]
    fn test_display_width_tabs() {
        assert_eq!(display_width(b"\t"), 8);
        assert_eq!(display_width(b"ab\t"), 8);
        assert_eq!(display_width(b"ab\tc"), 9);
    }

    #[test]
    fn test_tabs_measured_from_start_column() {
        assert_eq!(display_width_from(b"\tX", 3), 6);
        assert_eq!(display_width_from(b"\tX", 8), 9);
        assert_eq!(display_width_from(b"a\n\tX", 3), 10);
        assert_eq!(truncate_end_from(b"\tXYZ", 7, 3), "\tX…".as_bytes());
        assert_eq!(truncate_end(b"\tXYZ", 7), "…".as_bytes());
    }

    #[test]
    fn test_display_width_wide_and_invalid() {
        assert_eq!(display_width("日本".as_bytes()), 4);
        assert_eq!(display_width("é".as_bytes()), 1);
        assert_eq!(display_width(b"\xff\xfe"), 2);
    }

    #[test]
    fn test_line_width() {
        assert_eq!(line_width(b"first line\nabc"), 3);
        assert_eq!(line_width(b"abc\n"), 0);
    }

    #[test]
    fn test_truncate_end() {
        assert_eq!(truncate_end(b"hello world", 5), "hell…".as_bytes());
        assert_eq!(truncate_end(b"12345", 5), b"12345");
        assert_eq!(truncate_end(b"123456", 5), "1234…".as_bytes());
        assert_eq!(truncate_end(b"hello", 1), "…".as_bytes());
        assert_eq!(truncate_end(b"hello", 0), b"");
    }

    #[test]
    fn test_truncate_start() {
        assert_eq!(truncate_start(b"hello world", 5), "…orld".as_bytes());
        assert_eq!(truncate_start(b"hi", 5), b"hi");
    }

    #[test]
    fn test_truncate_middle() {
        assert_eq!(truncate_middle(b"hello world", 5), "he…ld".as_bytes());
        // Odd remainder: the prefix gets the extra column.
        assert_eq!(truncate_middle(b"hello world", 6), "hel…ld".as_bytes());
    }

    #[test]
    fn test_truncate_keeps_escapes() {
        let out = truncate_end(b"\x1b[31mhello world\x1b[m", 5);
        assert_eq!(out, "\x1b[31mhell…\x1b[m".as_bytes());
        let out = truncate_start(b"\x1b[31mhello world\x1b[m", 5);
        assert_eq!(out, "\x1b[31m…orld\x1b[m".as_bytes());
    }

    #[test]
    fn test_truncate_wide_chars() {
        let out = truncate_end("日本語テキスト".as_bytes(), 6);
        assert_eq!(out, "日本…".as_bytes());
        assert!(display_width(&out) <= 6);
    }

    #[test]
    fn test_center_split() {
        assert_eq!(center_split(0), (0, 0));
        assert_eq!(center_split(3), (1, 2));
        assert_eq!(center_split(4), (2, 2));
    }

    #[test]
    fn test_expand_tabs() {
        assert_eq!(expand_tabs(b"a\tb", 8), b"a       b");
        assert_eq!(expand_tabs(b"\tx", 4), b"    x");
        assert_eq!(expand_tabs(b"no tabs", 8), b"no tabs");
    }
}
