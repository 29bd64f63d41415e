//! Collaborators the formatter consults but does not own.
//!
//! Each collaborator is an object-safe trait with a simple default
//! implementation. [`Services`] bundles references to one of each; the
//! default bundle uses the built-in implementations.

use std::collections::HashMap;

use crate::date::{ChronoDateRenderer, DateRenderer};
use crate::encoding::{BuiltinTranscoder, Transcoder};
use crate::trailers::{SimpleTrailerFormatter, TrailerFormatter};

/// Reflog data for the entry being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReflogField {
    /// `refs/heads/main@{0}`
    Selector,
    /// `main@{0}`
    ShortSelector,
    /// The identity line of whoever made the entry.
    Identity,
    /// The entry's message.
    Message,
}

/// Looks up reflog data. `None` means there is no reflog context.
pub trait ReflogLookup {
    fn lookup(&self, field: ReflogField) -> Option<Vec<u8>>;
}

/// No reflog context: every reflog directive expands to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReflog;

impl ReflogLookup for NoReflog {
    fn lookup(&self, _field: ReflogField) -> Option<Vec<u8>> {
        None
    }
}

/// A single reflog entry held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReflogEntry {
    pub selector: String,
    pub short_selector: String,
    pub identity: Vec<u8>,
    pub message: Vec<u8>,
}

impl ReflogLookup for ReflogEntry {
    fn lookup(&self, field: ReflogField) -> Option<Vec<u8>> {
        let value = match field {
            ReflogField::Selector => self.selector.as_bytes(),
            ReflogField::ShortSelector => self.short_selector.as_bytes(),
            ReflogField::Identity => &self.identity,
            ReflogField::Message => &self.message,
        };
        Some(value.to_vec())
    }
}

/// Shortens object ids.
pub trait Abbreviator {
    /// Returns at least `len` leading characters of `id`.
    fn abbreviate(&self, id: &str, len: usize) -> String;
}

/// Plain prefix abbreviation, never shorter than [`PrefixAbbreviator::MIN_LEN`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixAbbreviator;

impl PrefixAbbreviator {
    pub const MIN_LEN: usize = 4;
}

impl Abbreviator for PrefixAbbreviator {
    fn abbreviate(&self, id: &str, len: usize) -> String {
        let len = len.max(Self::MIN_LEN);
        id.chars().take(len).collect()
    }
}

/// Maps identities to their canonical name and email.
pub trait Mailmap {
    /// Returns the canonical `(name, email)`, or `None` to keep the original.
    fn map(&self, name: &[u8], email: &[u8]) -> Option<(Vec<u8>, Vec<u8>)>;
}

/// Keeps every identity as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMailmap;

impl Mailmap for NoMailmap {
    fn map(&self, _name: &[u8], _email: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
        None
    }
}

/// In-memory mailmap keyed by email address, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct MailmapTable {
    entries: HashMap<String, (Option<String>, Option<String>)>,
}

impl MailmapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `email` to a canonical name and/or email.
    pub fn entry(
        mut self,
        email: &str,
        name: Option<&str>,
        canonical_email: Option<&str>,
    ) -> Self {
        self.entries.insert(
            email.to_lowercase(),
            (name.map(str::to_owned), canonical_email.map(str::to_owned)),
        );
        self
    }
}

impl Mailmap for MailmapTable {
    fn map(&self, name: &[u8], email: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
        let key = String::from_utf8_lossy(email).to_lowercase();
        let (new_name, new_email) = self.entries.get(&key)?;
        Some((
            new_name
                .as_ref()
                .map_or_else(|| name.to_vec(), |n| n.as_bytes().to_vec()),
            new_email
                .as_ref()
                .map_or_else(|| email.to_vec(), |e| e.as_bytes().to_vec()),
        ))
    }
}

/// Precomputed result of verifying the record's signature.
///
/// `status` is the `%G?` letter: `G` good, `B` bad, `U` good with unknown
/// validity, `X` expired signature, `Y` expired key, `R` revoked key, `E`
/// missing key, `N` no signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureCheck {
    pub status: char,
    pub output: String,
    pub signer: String,
    pub key: String,
    pub fingerprint: String,
    pub primary_key_fingerprint: String,
    pub trust: String,
}

impl Default for SignatureCheck {
    fn default() -> Self {
        SignatureCheck {
            status: 'N',
            output: String::new(),
            signer: String::new(),
            key: String::new(),
            fingerprint: String::new(),
            primary_key_fingerprint: String::new(),
            trust: String::new(),
        }
    }
}

static DATES: ChronoDateRenderer = ChronoDateRenderer::new();
static TRANSCODER: BuiltinTranscoder = BuiltinTranscoder;
static REFLOG: NoReflog = NoReflog;
static ABBREVIATOR: PrefixAbbreviator = PrefixAbbreviator;
static MAILMAP: NoMailmap = NoMailmap;
static TRAILERS: SimpleTrailerFormatter = SimpleTrailerFormatter;

/// References to one implementation of each collaborator.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub dates: &'a dyn DateRenderer,
    pub transcoder: &'a dyn Transcoder,
    pub reflog: &'a dyn ReflogLookup,
    pub abbreviator: &'a dyn Abbreviator,
    pub mailmap: &'a dyn Mailmap,
    pub trailers: &'a dyn TrailerFormatter,
}

impl Default for Services<'_> {
    fn default() -> Self {
        Services {
            dates: &DATES,
            transcoder: &TRANSCODER,
            reflog: &REFLOG,
            abbreviator: &ABBREVIATOR,
            mailmap: &MAILMAP,
            trailers: &TRAILERS,
        }
    }
}

impl std::fmt::Debug for Services<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_abbreviator() {
        let id = "9bedf67800b2923982bdf60c89c57ce6ce2d9a1c";
        assert_eq!(PrefixAbbreviator.abbreviate(id, 7), "9bedf67");
        assert_eq!(PrefixAbbreviator.abbreviate(id, 1), "9bed");
        assert_eq!(PrefixAbbreviator.abbreviate(id, 100), id);
    }

    #[test]
    fn test_mailmap_table() {
        let map = MailmapTable::new().entry("old@example.com", Some("Canonical Name"), None);
        let (name, email) = map.map(b"Old Name", b"OLD@example.com").unwrap();
        assert_eq!(name, b"Canonical Name");
        assert_eq!(email, b"OLD@example.com");
        assert!(map.map(b"x", b"other@example.com").is_none());
    }

    #[test]
    fn test_reflog_entry() {
        let entry = ReflogEntry {
            selector: "refs/heads/main@{0}".to_string(),
            short_selector: "main@{0}".to_string(),
            identity: b"A <a@example.com> 0 +0000".to_vec(),
            message: b"commit: fix".to_vec(),
        };
        assert_eq!(
            entry.lookup(ReflogField::ShortSelector),
            Some(b"main@{0}".to_vec())
        );
        assert_eq!(NoReflog.lookup(ReflogField::Message), None);
    }

    #[test]
    fn test_default_signature_is_unsigned() {
        assert_eq!(SignatureCheck::default().status, 'N');
    }
}
