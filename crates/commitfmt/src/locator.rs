//! Lazy location of structural fields inside a raw commit buffer.
//!
//! A raw commit is a block of `name value` header lines, a blank line, and a
//! free-form message:
//!
//! ```text
//! tree 9bed...
//! parent 5d3c...
//! author A U Thor <author@example.com> 1112911993 -0700
//! committer C O Mitter <committer@example.com> 1112911993 -0700
//!
//! subject line
//!
//! body text
//! ```
//!
//! [`RecordLocator`] finds the byte spans of these fields on demand. The
//! header is scanned once, the first time any header field is requested; the
//! message is scanned once, forward from the message start, the first time a
//! message field is requested. Later lookups are answered from the cache.

use std::borrow::Cow;
use std::fmt;

use crate::error::{FormatError, Result};

/// A structurally significant field of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// The value of the `author` header line.
    Author,
    /// The value of the `committer` header line.
    Committer,
    /// The first byte after the blank line that ends the header.
    MessageStart,
    /// The first paragraph of the message.
    Subject,
    /// Everything after the subject paragraph and its trailing blank lines.
    Body,
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Anchor::Author => "author line",
            Anchor::Committer => "committer line",
            Anchor::MessageStart => "message start",
            Anchor::Subject => "subject",
            Anchor::Body => "body",
        };
        f.write_str(name)
    }
}

/// A half-open byte range into the record buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Default)]
struct HeaderSpans {
    tree: Option<Span>,
    parents: Vec<Span>,
    author: Option<Span>,
    committer: Option<Span>,
    encoding: Option<Span>,
    /// Everything before the separating blank line, newline included.
    header: Span,
    message_start: usize,
}

#[derive(Debug, Clone, Copy)]
struct MessageSpans {
    subject: Span,
    body_start: usize,
}

/// Field locator over one record buffer, with a per-render cache.
#[derive(Debug, Clone)]
pub struct RecordLocator<'a> {
    buf: Cow<'a, [u8]>,
    header: Option<HeaderSpans>,
    message: Option<MessageSpans>,
}

impl<'a> RecordLocator<'a> {
    /// Creates a locator over `buf`. Nothing is scanned until a field is requested.
    pub fn new(buf: impl Into<Cow<'a, [u8]>>) -> Self {
        Self {
            buf: buf.into(),
            header: None,
            message: None,
        }
    }

    /// The full record buffer.
    pub fn buffer(&self) -> &[u8] {
        &self.buf
    }

    /// The bytes covered by `span`.
    pub fn slice(&self, span: Span) -> &[u8] {
        &self.buf[span.start..span.end]
    }

    /// Returns the span of `anchor`, scanning the buffer on first use.
    ///
    /// `Author` and `Committer` fail when the header has no such line;
    /// everything fails when the header is not terminated by a blank line.
    pub fn locate(&mut self, anchor: Anchor) -> Result<Span> {
        match anchor {
            Anchor::Author => self
                .header()?
                .author
                .ok_or(FormatError::MalformedRecord(Anchor::Author)),
            Anchor::Committer => self
                .header()?
                .committer
                .ok_or(FormatError::MalformedRecord(Anchor::Committer)),
            Anchor::MessageStart => {
                let start = self.header()?.message_start;
                Ok(Span::new(start, self.buf.len()))
            }
            Anchor::Subject => Ok(self.message()?.subject),
            Anchor::Body => {
                let start = self.message()?.body_start;
                Ok(Span::new(start, self.buf.len()))
            }
        }
    }

    /// Header lines, including the final newline but not the blank separator.
    pub fn header_span(&mut self) -> Result<Span> {
        Ok(self.header()?.header)
    }

    /// The value of the `tree` header, if present.
    pub fn tree(&mut self) -> Result<Option<Span>> {
        Ok(self.header()?.tree)
    }

    /// The values of all `parent` headers in order.
    pub fn parents(&mut self) -> Result<Vec<Span>> {
        Ok(self.header()?.parents.clone())
    }

    /// The value of the `encoding` header, if present.
    pub fn encoding(&mut self) -> Result<Option<Span>> {
        Ok(self.header()?.encoding)
    }

    /// The raw message: from the first non-blank message line to the end.
    pub fn raw_body(&mut self) -> Result<Span> {
        let subject = self.locate(Anchor::Subject)?;
        Ok(Span::new(subject.start, self.buf.len()))
    }

    fn header(&mut self) -> Result<&HeaderSpans> {
        let header = match self.header.take() {
            Some(header) => header,
            None => parse_header(&self.buf)?,
        };
        Ok(self.header.insert(header))
    }

    fn message(&mut self) -> Result<MessageSpans> {
        if let Some(message) = self.message {
            return Ok(message);
        }
        let start = self.header()?.message_start;
        let message = parse_message(&self.buf, start);
        self.message = Some(message);
        Ok(message)
    }
}

fn parse_header(buf: &[u8]) -> Result<HeaderSpans> {
    let mut spans = HeaderSpans::default();
    let mut pos = 0;

    while pos < buf.len() {
        let eol = find_eol(buf, pos);
        if eol == pos {
            spans.header = Span::new(0, pos);
            spans.message_start = (pos + 1).min(buf.len());
            return Ok(spans);
        }

        let line = &buf[pos..eol];
        let value = |prefix: &[u8]| Span::new(pos + prefix.len(), eol);
        if line.starts_with(b"tree ") {
            spans.tree = Some(value(b"tree "));
        } else if line.starts_with(b"parent ") {
            spans.parents.push(value(b"parent "));
        } else if line.starts_with(b"author ") {
            spans.author = Some(value(b"author "));
        } else if line.starts_with(b"committer ") {
            spans.committer = Some(value(b"committer "));
        } else if line.starts_with(b"encoding ") {
            spans.encoding = Some(value(b"encoding "));
        }
        pos = eol + 1;
    }

    Err(FormatError::MalformedRecord(Anchor::MessageStart))
}

fn parse_message(buf: &[u8], start: usize) -> MessageSpans {
    let subject_start = skip_blank_lines(buf, start);
    let mut pos = subject_start;
    while pos < buf.len() {
        let eol = find_eol(buf, pos);
        if is_blank(&buf[pos..eol]) {
            break;
        }
        pos = (eol + 1).min(buf.len());
    }
    let subject = Span::new(subject_start, pos);
    let body_start = skip_blank_lines(buf, pos);
    MessageSpans {
        subject,
        body_start,
    }
}

/// Index of the next `\n` at or after `pos`, or the buffer length.
pub(crate) fn find_eol(buf: &[u8], pos: usize) -> usize {
    buf[pos..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(buf.len(), |i| pos + i)
}

/// Skips lines consisting only of whitespace.
pub(crate) fn skip_blank_lines(buf: &[u8], mut pos: usize) -> usize {
    while pos < buf.len() {
        let eol = find_eol(buf, pos);
        if !is_blank(&buf[pos..eol]) {
            break;
        }
        pos = (eol + 1).min(buf.len());
    }
    pos
}

pub(crate) fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|b| b.is_ascii_whitespace())
}

/// Strips trailing ASCII whitespace.
pub(crate) fn rtrim(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMIT: &[u8] = b"tree 9bedf67800b2923982bdf60c89c57ce6ce2d9a1c\n\
parent 5d3c2ae0c4e6d1c1fd1c1f3c3a0a2c2d81f6a1f1\n\
author A U Thor <author@example.com> 1112911993 -0700\n\
committer C O Mitter <committer@example.com> 1112912053 -0700\n\
\n\
\n\
First line\n\
continued\n\
\n\
\n\
Body paragraph.\n";

    #[test]
    fn test_locates_identity_lines() {
        let mut loc = RecordLocator::new(COMMIT);
        let author = loc.locate(Anchor::Author).unwrap();
        assert_eq!(
            loc.slice(author),
            b"A U Thor <author@example.com> 1112911993 -0700"
        );
        let committer = loc.locate(Anchor::Committer).unwrap();
        assert!(loc.slice(committer).starts_with(b"C O Mitter"));
    }

    #[test]
    fn test_subject_is_first_paragraph() {
        let mut loc = RecordLocator::new(COMMIT);
        let subject = loc.locate(Anchor::Subject).unwrap();
        assert_eq!(loc.slice(subject), b"First line\ncontinued\n");
    }

    #[test]
    fn test_body_skips_blank_lines() {
        let mut loc = RecordLocator::new(COMMIT);
        let body = loc.locate(Anchor::Body).unwrap();
        assert_eq!(loc.slice(body), b"Body paragraph.\n");
    }

    #[test]
    fn test_anchors_are_ordered() {
        let mut loc = RecordLocator::new(COMMIT);
        let author = loc.locate(Anchor::Author).unwrap();
        let committer = loc.locate(Anchor::Committer).unwrap();
        let message = loc.locate(Anchor::MessageStart).unwrap();
        let subject = loc.locate(Anchor::Subject).unwrap();
        let body = loc.locate(Anchor::Body).unwrap();
        assert!(author.start <= committer.start);
        assert!(committer.end <= message.start);
        assert!(message.start <= subject.start);
        assert!(subject.end <= body.start);
    }

    #[test]
    fn test_tree_and_parents() {
        let mut loc = RecordLocator::new(COMMIT);
        let tree = loc.tree().unwrap().unwrap();
        assert_eq!(
            loc.slice(tree),
            b"9bedf67800b2923982bdf60c89c57ce6ce2d9a1c"
        );
        assert_eq!(loc.parents().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_author_is_malformed() {
        let mut loc = RecordLocator::new(&b"tree abc\n\nmsg\n"[..]);
        assert_eq!(
            loc.locate(Anchor::Author),
            Err(FormatError::MalformedRecord(Anchor::Author))
        );
        // The message is still reachable.
        let subject = loc.locate(Anchor::Subject).unwrap();
        assert_eq!(loc.slice(subject), b"msg\n");
    }

    #[test]
    fn test_unterminated_header_is_malformed() {
        let mut loc = RecordLocator::new(&b"tree abc\nauthor x <y> 1 +0000"[..]);
        assert_eq!(
            loc.locate(Anchor::Subject),
            Err(FormatError::MalformedRecord(Anchor::MessageStart))
        );
    }

    #[test]
    fn test_empty_message() {
        let mut loc = RecordLocator::new(&b"tree abc\n\n"[..]);
        let subject = loc.locate(Anchor::Subject).unwrap();
        assert!(subject.is_empty());
        let body = loc.locate(Anchor::Body).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_subject_without_trailing_newline() {
        let mut loc = RecordLocator::new(&b"tree abc\n\nonly subject"[..]);
        let subject = loc.locate(Anchor::Subject).unwrap();
        assert_eq!(loc.slice(subject), b"only subject");
        assert!(loc.locate(Anchor::Body).unwrap().is_empty());
    }

    #[test]
    fn test_rtrim() {
        assert_eq!(rtrim(b"abc  \t"), b"abc");
        assert_eq!(rtrim(b"   "), b"");
    }
}
