//! Per-render presentation options.

use crate::date::DateMode;
use crate::services::{Services, SignatureCheck};

/// Default object id abbreviation length.
pub const DEFAULT_ABBREV: usize = 7;

/// Default tab stop for expanding tabs in message bodies.
pub const DEFAULT_TAB_WIDTH: usize = 8;

/// Options that shape a render but are not part of the record.
///
/// ```rust
/// use commitfmt::{DateMode, PrettyOptions};
///
/// let options = PrettyOptions::new()
///     .date_mode(DateMode::Short)
///     .abbrev(10)
///     .decorations(["HEAD -> main", "tag: v1.0"]);
/// assert_eq!(options.abbrev, 10);
/// ```
#[derive(Debug, Clone)]
pub struct PrettyOptions<'a> {
    pub date_mode: DateMode,
    pub abbrev: usize,
    /// Whether color directives emit escapes.
    pub color: bool,
    /// Tab stop for message bodies. `None` uses the layout's default;
    /// `Some(0)` disables expansion.
    pub expand_tabs: Option<usize>,
    pub notes: Option<Vec<u8>>,
    pub decorations: Vec<String>,
    pub source: Option<String>,
    pub mark: Option<String>,
    pub signature: SignatureCheck,
    /// Text after `Subject: [` in mail layouts. Empty gives `Subject: `.
    pub subject_prefix: String,
    /// Keep the subject's line breaks in mail layouts instead of joining.
    pub preserve_subject: bool,
    /// Extra header text written after the mail subject.
    pub after_subject: Option<Vec<u8>>,
    /// Sender identity (`Name <email>`) for mail layouts. When it differs
    /// from the author, the author moves to an in-body `From:` line.
    pub from_ident: Option<Vec<u8>>,
    /// RFC 2047-encode non-ASCII mail headers.
    pub encode_email_headers: bool,
    pub services: Services<'a>,
}

impl Default for PrettyOptions<'_> {
    fn default() -> Self {
        PrettyOptions {
            date_mode: DateMode::Default,
            abbrev: DEFAULT_ABBREV,
            color: false,
            expand_tabs: None,
            notes: None,
            decorations: Vec::new(),
            source: None,
            mark: None,
            signature: SignatureCheck::default(),
            subject_prefix: "PATCH".to_string(),
            preserve_subject: false,
            after_subject: None,
            from_ident: None,
            encode_email_headers: true,
            services: Services::default(),
        }
    }
}

impl<'a> PrettyOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date_mode(mut self, mode: DateMode) -> Self {
        self.date_mode = mode;
        self
    }

    pub fn abbrev(mut self, len: usize) -> Self {
        self.abbrev = len;
        self
    }

    pub fn color(mut self, enable: bool) -> Self {
        self.color = enable;
        self
    }

    pub fn expand_tabs(mut self, tab_width: usize) -> Self {
        self.expand_tabs = Some(tab_width);
        self
    }

    pub fn notes(mut self, notes: impl Into<Vec<u8>>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn decorations<S: Into<String>, I: IntoIterator<Item = S>>(mut self, names: I) -> Self {
        self.decorations = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn mark(mut self, mark: impl Into<String>) -> Self {
        self.mark = Some(mark.into());
        self
    }

    pub fn signature(mut self, check: SignatureCheck) -> Self {
        self.signature = check;
        self
    }

    pub fn subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into();
        self
    }

    pub fn preserve_subject(mut self, preserve: bool) -> Self {
        self.preserve_subject = preserve;
        self
    }

    pub fn after_subject(mut self, text: impl Into<Vec<u8>>) -> Self {
        self.after_subject = Some(text.into());
        self
    }

    pub fn from_ident(mut self, ident: impl Into<Vec<u8>>) -> Self {
        self.from_ident = Some(ident.into());
        self
    }

    pub fn encode_email_headers(mut self, encode: bool) -> Self {
        self.encode_email_headers = encode;
        self
    }

    /// Replaces the collaborator bundle.
    pub fn services(mut self, services: Services<'a>) -> Self {
        self.services = services;
        self
    }

    /// The tab stop to use for a layout whose default is `layout_default`.
    pub(crate) fn tab_width(&self, layout_default: usize) -> usize {
        self.expand_tabs.unwrap_or(layout_default)
    }
}
