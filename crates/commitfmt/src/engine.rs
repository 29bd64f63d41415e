//! The placeholder expansion engine.
//!
//! A [`FormatContext`] is created per render. It reencodes the record once,
//! locates fields lazily, and carries the directive state that outlives a
//! single directive: the pending alignment region, the active wrap region and
//! the `%C(auto)` flag. Expansion writes into a scratch buffer that is handed
//! back only when the whole template succeeded.

use std::borrow::Cow;

use tracing::{debug, trace};

use crate::align::{Region, WrapState};
use crate::color::{ColorDirective, AUTO_ID_COLOR, RESET};
use crate::date::DateMode;
use crate::directive::{
    self, Directive, Field, Magic, Parsed, PersonField, ReflogDirective, SignatureField, Who,
};
use crate::encoding::{reencode, same_encoding};
use crate::error::{FormatError, Result};
use crate::ident::{format_identity_date, split_identity, Identity};
use crate::locator::{rtrim, Anchor, RecordLocator};
use crate::options::PrettyOptions;
use crate::record::Record;
use crate::services::ReflogField;
use crate::trailers::TrailerOptions;
use crate::width::line_width;

/// Per-render state.
pub struct FormatContext<'a> {
    record: &'a Record,
    options: &'a PrettyOptions<'a>,
    locator: RecordLocator<'a>,
    date_mode: DateMode,
    region: Region,
    wrap: Option<WrapState>,
    auto_color: bool,
}

impl<'a> FormatContext<'a> {
    /// Creates a context, converting the record to its output encoding.
    pub fn new(record: &'a Record, options: &'a PrettyOptions<'a>) -> Self {
        let from = record.source_encoding();
        let to = record.target_encoding();
        let buf: Cow<'a, [u8]> = if same_encoding(&from, to) {
            Cow::Borrowed(record.raw())
        } else {
            Cow::Owned(reencode(
                record.raw(),
                &from,
                to,
                options.services.transcoder,
            ))
        };
        FormatContext {
            record,
            options,
            locator: RecordLocator::new(buf),
            date_mode: options.date_mode,
            region: Region::Idle,
            wrap: None,
            auto_color: false,
        }
    }

    /// Uses `mode` for `%ad`/`%cd` instead of the options' date mode.
    pub fn with_date_mode(mut self, mode: DateMode) -> Self {
        self.date_mode = mode;
        self
    }

    pub(crate) fn record(&self) -> &'a Record {
        self.record
    }

    pub(crate) fn options(&self) -> &'a PrettyOptions<'a> {
        self.options
    }

    pub(crate) fn locator(&mut self) -> &mut RecordLocator<'a> {
        &mut self.locator
    }

    /// Expands `template` and returns the output.
    ///
    /// On error nothing is returned; directive state is reset either way.
    pub fn expand(&mut self, template: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let result = self.expand_into(template, &mut out);
        self.region = Region::Idle;
        self.wrap = None;
        self.auto_color = false;
        result.map(|()| out)
    }

    fn expand_into(&mut self, template: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let mut pos = 0;
        while pos < template.len() {
            let Some(offset) = template[pos..].iter().position(|&b| b == b'%') else {
                self.write_literal(&template[pos..], out);
                break;
            };
            self.write_literal(&template[pos..pos + offset], out);

            let start = pos + offset + 1;
            let parsed = directive::parse(&template[start..])?;
            pos = start + parsed.len;
            trace!(directive = ?parsed.directive, "expanding");
            self.apply(parsed, &template[start..pos], out)?;
        }

        self.region.finalize(out);
        if let Some(wrap) = self.wrap.take() {
            wrap.finalize(out);
        }
        Ok(())
    }

    /// Template text between directives. A pending region closes before
    /// the first newline.
    fn write_literal(&mut self, text: &[u8], out: &mut Vec<u8>) {
        match text.iter().position(|&b| b == b'\n') {
            Some(nl) if self.region.is_open() => {
                out.extend_from_slice(&text[..nl]);
                self.region.finalize(out);
                out.extend_from_slice(&text[nl..]);
            }
            _ => out.extend_from_slice(text),
        }
    }

    fn apply(&mut self, parsed: Parsed, text: &[u8], out: &mut Vec<u8>) -> Result<()> {
        match parsed.directive {
            Directive::Color(ColorDirective::Auto) => self.auto_color = true,
            Directive::Color(color) => {
                if let Some(escape) = color.emit(self.options.color) {
                    out.extend_from_slice(escape.as_bytes());
                }
            }
            Directive::Wrap(spec) => {
                self.region.finalize(out);
                if let Some(wrap) = self.wrap.take() {
                    wrap.finalize(out);
                }
                if !spec.is_noop() {
                    self.wrap = Some(WrapState::new(spec, out));
                }
            }
            Directive::Align(spec) => {
                if self.region.is_open() {
                    return Err(FormatError::NestedAlignment(
                        String::from_utf8_lossy(text).into_owned(),
                    ));
                }
                self.region = Region::open(&spec, out);
            }
            Directive::Pad { column, fill } => {
                let current = line_width(out);
                if column > current {
                    out.resize(out.len() + column - current, fill);
                }
            }
            Directive::Literal(bytes) => {
                self.magic_prefix(parsed.magic, bytes.is_empty(), out);
                if bytes.contains(&b'\n') {
                    self.write_literal(&bytes, out);
                } else {
                    out.extend_from_slice(&bytes);
                    self.region.finalize(out);
                }
            }
            Directive::Field(field) => {
                let value = self.field(field)?;
                self.write_content(parsed.magic, &value, out);
            }
            Directive::Trailers(options) => {
                let value = self.trailers(&options)?;
                self.write_content(parsed.magic, &value, out);
            }
        }
        Ok(())
    }

    fn write_content(&mut self, magic: Magic, value: &[u8], out: &mut Vec<u8>) {
        self.magic_prefix(magic, value.is_empty(), out);
        out.extend_from_slice(value);
        self.region.finalize(out);
    }

    fn magic_prefix(&mut self, magic: Magic, empty: bool, out: &mut Vec<u8>) {
        match magic {
            Magic::None => {}
            Magic::AddNewline if !empty => {
                self.region.finalize(out);
                out.push(b'\n');
            }
            Magic::AddSpace if !empty => out.push(b' '),
            Magic::StripNewlines if empty => {
                let floor = self
                    .region
                    .start()
                    .unwrap_or(0)
                    .max(self.wrap.map_or(0, |w| w.start));
                while out.len() > floor && out.last() == Some(&b'\n') {
                    out.pop();
                }
            }
            _ => {}
        }
    }

    fn field(&mut self, field: Field) -> Result<Vec<u8>> {
        let options = self.options;
        let services = &options.services;
        let value = match field {
            Field::Hash => self.colored_id(self.record.id().to_string()),
            Field::AbbrevHash => {
                let short = services.abbreviator.abbreviate(self.record.id(), options.abbrev);
                self.colored_id(short)
            }
            Field::Tree => self.tree(false)?,
            Field::AbbrevTree => self.tree(true)?,
            Field::Parents => self.parents(false)?.join(&b' '),
            Field::AbbrevParents => self.parents(true)?.join(&b' '),
            Field::Person(who, part) => self.person(who, part)?,
            Field::Subject => self.subject()?,
            Field::SanitizedSubject => sanitize_subject(&self.subject()?),
            Field::Body => self.span_bytes(Anchor::Body)?,
            Field::RawBody => {
                let span = self.locator.raw_body()?;
                self.locator.slice(span).to_vec()
            }
            Field::Encoding => match self.locator.encoding()? {
                Some(span) => self.locator.slice(span).to_vec(),
                None => Vec::new(),
            },
            Field::Notes => options.notes.clone().unwrap_or_default(),
            Field::Decorations { wrapped } => decorations(&options.decorations, wrapped),
            Field::Source => options.source.clone().unwrap_or_default().into_bytes(),
            Field::Mark => options.mark.clone().unwrap_or_default().into_bytes(),
            Field::Signature(part) => signature(options, part),
            Field::Reflog(part) => self.reflog(part),
        };
        Ok(value)
    }

    fn colored_id(&self, id: String) -> Vec<u8> {
        if self.auto_color && self.options.color {
            format!("{}{}{}", AUTO_ID_COLOR, id, RESET).into_bytes()
        } else {
            id.into_bytes()
        }
    }

    fn tree(&mut self, abbreviate: bool) -> Result<Vec<u8>> {
        let Some(span) = self.locator.tree()? else {
            return Ok(Vec::new());
        };
        let id = self.locator.slice(span);
        Ok(if abbreviate {
            self.abbreviate(id).into_bytes()
        } else {
            id.to_vec()
        })
    }

    /// Parent ids in header order, optionally abbreviated.
    pub(crate) fn parents(&mut self, abbreviate: bool) -> Result<Vec<Vec<u8>>> {
        let spans = self.locator.parents()?;
        Ok(spans
            .into_iter()
            .map(|span| {
                let id = self.locator.slice(span);
                if abbreviate {
                    self.abbreviate(id).into_bytes()
                } else {
                    id.to_vec()
                }
            })
            .collect())
    }

    fn abbreviate(&self, id: &[u8]) -> String {
        self.options
            .services
            .abbreviator
            .abbreviate(&String::from_utf8_lossy(id), self.options.abbrev)
    }

    fn span_bytes(&mut self, anchor: Anchor) -> Result<Vec<u8>> {
        let span = self.locator.locate(anchor)?;
        Ok(self.locator.slice(span).to_vec())
    }

    /// The identity line of `who`, or `None` when the header lacks it.
    pub(crate) fn identity_line(&mut self, who: Who) -> Result<Option<Vec<u8>>> {
        let anchor = match who {
            Who::Author => Anchor::Author,
            Who::Committer => Anchor::Committer,
        };
        match self.locator.locate(anchor) {
            Ok(span) => Ok(Some(self.locator.slice(span).to_vec())),
            Err(FormatError::MalformedRecord(missing)) if missing == anchor => {
                debug!(%missing, "record has no identity line, substituting empty text");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn person(&mut self, who: Who, part: PersonField) -> Result<Vec<u8>> {
        let Some(line) = self.identity_line(who)? else {
            return Ok(Vec::new());
        };
        let ident = match split_identity(&line) {
            Ok(ident) => ident,
            Err(err) => {
                debug!(error = %err, "cannot split identity, substituting empty text");
                return Ok(Vec::new());
            }
        };
        Ok(self.identity_part(&ident, part))
    }

    fn identity_part(&self, ident: &Identity<'_>, part: PersonField) -> Vec<u8> {
        let services = &self.options.services;
        let mapped = || {
            services
                .mailmap
                .map(ident.name, ident.email)
                .unwrap_or_else(|| (ident.name.to_vec(), ident.email.to_vec()))
        };
        let date = |mode| format_identity_date(ident, mode, services.dates).into_bytes();
        match part {
            PersonField::Name => ident.name.to_vec(),
            PersonField::MailmapName => mapped().0,
            PersonField::Email => ident.email.to_vec(),
            PersonField::MailmapEmail => mapped().1,
            PersonField::LocalPart => ident.local_part().to_vec(),
            PersonField::MailmapLocalPart => {
                let email = mapped().1;
                let end = email.iter().position(|&b| b == b'@').unwrap_or(email.len());
                email[..end].to_vec()
            }
            PersonField::Date => date(self.date_mode),
            PersonField::Rfc2822Date => date(DateMode::Rfc2822),
            PersonField::RelativeDate => date(DateMode::Relative),
            PersonField::UnixDate => date(DateMode::Unix),
            PersonField::IsoDate => date(DateMode::Iso8601),
            PersonField::StrictIsoDate => date(DateMode::Iso8601Strict),
            PersonField::ShortDate => date(DateMode::Short),
            PersonField::HumanDate => date(DateMode::Human),
        }
    }

    /// The subject paragraph with its lines trimmed and joined by spaces.
    pub(crate) fn subject(&mut self) -> Result<Vec<u8>> {
        let span = self.locator.locate(Anchor::Subject)?;
        Ok(join_subject(self.locator.slice(span), b" "))
    }

    fn trailers(&mut self, options: &TrailerOptions) -> Result<Vec<u8>> {
        let span = self.locator.locate(Anchor::Body)?;
        let body = self.locator.slice(span);
        Ok(self.options.services.trailers.format(body, options))
    }

    fn reflog(&self, part: ReflogDirective) -> Vec<u8> {
        let reflog = self.options.services.reflog;
        let field = match part {
            ReflogDirective::ShortSelector => ReflogField::ShortSelector,
            ReflogDirective::Selector => ReflogField::Selector,
            ReflogDirective::Subject => ReflogField::Message,
            ReflogDirective::Name
            | ReflogDirective::MailmapName
            | ReflogDirective::Email
            | ReflogDirective::MailmapEmail => ReflogField::Identity,
        };
        let Some(value) = reflog.lookup(field) else {
            return Vec::new();
        };
        if field != ReflogField::Identity {
            return value;
        }

        let Ok(ident) = split_identity(&value) else {
            debug!("cannot split reflog identity, substituting empty text");
            return Vec::new();
        };
        let person = match part {
            ReflogDirective::Name => PersonField::Name,
            ReflogDirective::MailmapName => PersonField::MailmapName,
            ReflogDirective::Email => PersonField::Email,
            _ => PersonField::MailmapEmail,
        };
        self.identity_part(&ident, person)
    }
}

/// Joins the lines of a subject paragraph with `separator`, trimming
/// trailing whitespace from each.
pub(crate) fn join_subject(paragraph: &[u8], separator: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(paragraph.len());
    for line in paragraph.split(|&b| b == b'\n') {
        let line = rtrim(line);
        if line.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.extend_from_slice(separator);
        }
        out.extend_from_slice(line);
    }
    out
}

fn is_title_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'.' || b == b'_'
}

/// Turns a subject into a file-name-safe slug (`%f`).
///
/// Runs of other characters become a single `-`, runs of dots collapse to
/// one, and trailing dots and dashes are dropped.
pub fn sanitize_subject(subject: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(subject.len());
    // 2: nothing written yet, 1: separator pending, 0: inside a word.
    let mut space = 2u8;
    let mut i = 0;
    while i < subject.len() {
        let b = subject[i];
        if is_title_char(b) {
            if space == 1 {
                out.push(b'-');
            }
            space = 0;
            out.push(b);
            if b == b'.' {
                while subject.get(i + 1) == Some(&b'.') {
                    i += 1;
                }
            }
        } else {
            space |= 1;
        }
        i += 1;
    }
    while matches!(out.last(), Some(b'.') | Some(b'-')) {
        out.pop();
    }
    out
}

fn decorations(names: &[String], wrapped: bool) -> Vec<u8> {
    if names.is_empty() {
        return Vec::new();
    }
    let joined = names.join(", ");
    if wrapped {
        format!(" ({})", joined).into_bytes()
    } else {
        joined.into_bytes()
    }
}

fn signature(options: &PrettyOptions<'_>, part: SignatureField) -> Vec<u8> {
    let check = &options.signature;
    let text = match part {
        SignatureField::Status => return check.status.to_string().into_bytes(),
        SignatureField::Output => &check.output,
        SignatureField::Signer => &check.signer,
        SignatureField::Key => &check.key,
        SignatureField::Fingerprint => &check.fingerprint,
        SignatureField::PrimaryKeyFingerprint => &check.primary_key_fingerprint,
        SignatureField::Trust => &check.trust,
    };
    text.as_bytes().to_vec()
}

/// Expands `template` against `record`.
///
/// ```rust
/// use commitfmt::{expand, PrettyOptions, Record};
///
/// let record = Record::new(
///     "9bedf67800b2923982bdf60c89c57ce6ce2d9a1c",
///     &b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
/// author A U Thor <author@example.com> 1112911993 -0700\n\
/// committer A U Thor <author@example.com> 1112911993 -0700\n\
/// \n\
/// Initial import\n"[..],
/// );
/// let out = expand("%h %an: %s", &record, &PrettyOptions::new()).unwrap();
/// assert_eq!(out, b"9bedf67 A U Thor: Initial import");
/// ```
pub fn expand(template: &str, record: &Record, options: &PrettyOptions<'_>) -> Result<Vec<u8>> {
    FormatContext::new(record, options).expand(template.as_bytes())
}

/// Appends the expansion of `template` to `out`. On error `out` is untouched.
pub fn format_commit_message(
    template: &str,
    record: &Record,
    options: &PrettyOptions<'_>,
    out: &mut Vec<u8>,
) -> Result<()> {
    out.extend_from_slice(&expand(template, record, options)?);
    Ok(())
}
