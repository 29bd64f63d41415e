//! Built-in layouts and commit format names.
//!
//! ```text
//! medium                      fuller
//! Author: A U Thor <a@x>      Author:     A U Thor <a@x>
//! Date:   Thu Apr 7 ...       AuthorDate: Thu Apr 7 ...
//!                             Commit:     C O Mitter <c@x>
//!     subject                 CommitDate: Thu Apr 7 ...
//!
//!     body                        subject
//! ```
//!
//! The `commit <id>` line that usually precedes these layouts belongs to the
//! caller; the layouts start at the header.

use std::collections::HashMap;

use tracing::debug;

use crate::date::DateMode;
use crate::directive::Who;
use crate::encoding::needs_8bit_content_transfer;
use crate::engine::{join_subject, FormatContext};
use crate::error::{FormatError, Result};
use crate::ident::{format_identity_date, split_identity};
use crate::locator::{find_eol, is_blank, rtrim, skip_blank_lines, Anchor};
use crate::mail::{
    add_rfc2047, fold_header, is_mboxrd_from, is_pseudo_header, needs_rfc2047_encoding,
    needs_rfc822_quoting, rfc822_quote, Rfc2047Kind, MAX_ENCODED_LENGTH, MAX_HEADER_LENGTH,
};
use crate::options::{PrettyOptions, DEFAULT_TAB_WIDTH};
use crate::record::Record;
use crate::width::{expand_tabs, line_width};

/// Indent of message lines in the multi-line layouts.
const MESSAGE_INDENT: usize = 4;

/// Template of the `reference` format.
pub const REFERENCE_TEMPLATE: &str = "%C(auto)%h (%s, %ad)";

/// A user template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFormat {
    pub template: String,
    /// Each entry is followed by a newline (`tformat:`) rather than entries
    /// being separated by one (`format:`).
    pub terminator: bool,
    /// Date mode forced by the format, overriding the options.
    pub date_mode: Option<DateMode>,
}

impl UserFormat {
    pub fn new(template: impl Into<String>, terminator: bool) -> Self {
        UserFormat {
            template: template.into(),
            terminator,
            date_mode: None,
        }
    }
}

/// A rendering recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Layout {
    Raw,
    #[default]
    Medium,
    Short,
    Full,
    Fuller,
    Oneline,
    Email,
    Mboxrd,
    User(UserFormat),
}

impl Layout {
    pub fn is_mail(&self) -> bool {
        matches!(self, Layout::Email | Layout::Mboxrd)
    }

    /// Whether entries are terminated, rather than separated, by newlines.
    pub fn uses_terminator(&self) -> bool {
        match self {
            Layout::Oneline => true,
            Layout::User(format) => format.terminator,
            _ => false,
        }
    }

    fn default_tab_width(&self) -> usize {
        match self {
            Layout::Raw | Layout::Email | Layout::Mboxrd => 0,
            _ => DEFAULT_TAB_WIDTH,
        }
    }
}

/// True only for a user template that is empty.
pub fn commit_format_is_empty(layout: &Layout) -> bool {
    matches!(layout, Layout::User(format) if format.template.is_empty())
}

/// Resolves a format name: a built-in layout, `format:`/`tformat:`, a bare
/// template containing `%`, or an alias from `aliases`.
///
/// Built-in names take precedence over aliases of the same name.
pub fn parse_commit_format(name: &str, aliases: &HashMap<String, String>) -> Result<Layout> {
    let mut seen = Vec::new();
    resolve(name, aliases, &mut seen)
}

fn resolve(name: &str, aliases: &HashMap<String, String>, seen: &mut Vec<String>) -> Result<Layout> {
    if let Some(template) = name.strip_prefix("format:") {
        return Ok(Layout::User(UserFormat::new(template, false)));
    }
    if let Some(template) = name.strip_prefix("tformat:") {
        return Ok(Layout::User(UserFormat::new(template, true)));
    }
    let layout = match name {
        "" | "medium" => Layout::Medium,
        "raw" => Layout::Raw,
        "short" => Layout::Short,
        "full" => Layout::Full,
        "fuller" => Layout::Fuller,
        "oneline" => Layout::Oneline,
        "email" => Layout::Email,
        "mboxrd" => Layout::Mboxrd,
        "reference" => Layout::User(UserFormat {
            template: REFERENCE_TEMPLATE.to_string(),
            terminator: true,
            date_mode: Some(DateMode::Short),
        }),
        _ if name.contains('%') => Layout::User(UserFormat::new(name, true)),
        _ => {
            let target = aliases
                .get(name)
                .ok_or_else(|| FormatError::UnknownFormat(name.to_string()))?;
            if seen.iter().any(|s| s == name) {
                return Err(FormatError::AliasLoop(name.to_string()));
            }
            seen.push(name.to_string());
            return resolve(target, aliases, seen);
        }
    };
    Ok(layout)
}

/// Renders `record` with `layout` and appends the result to `out`.
///
/// On error `out` is left untouched.
pub fn pretty_print_commit(
    layout: &Layout,
    record: &Record,
    options: &PrettyOptions<'_>,
    out: &mut Vec<u8>,
) -> Result<()> {
    let mut ctx = FormatContext::new(record, options);
    let rendered = match layout {
        Layout::User(format) => {
            if let Some(mode) = format.date_mode {
                ctx = ctx.with_date_mode(mode);
            }
            ctx.expand(format.template.as_bytes())?
        }
        _ => Printer::new(layout, &mut ctx).print()?,
    };
    out.extend_from_slice(&rendered);
    Ok(())
}

/// Renders one of the fixed layouts.
struct Printer<'c, 'a> {
    layout: &'c Layout,
    ctx: &'c mut FormatContext<'a>,
    out: Vec<u8>,
    in_body_headers: Vec<Vec<u8>>,
}

impl<'c, 'a> Printer<'c, 'a> {
    fn new(layout: &'c Layout, ctx: &'c mut FormatContext<'a>) -> Self {
        Printer {
            layout,
            ctx,
            out: Vec::new(),
            in_body_headers: Vec::new(),
        }
    }

    fn print(mut self) -> Result<Vec<u8>> {
        let mail = self.layout.is_mail();
        let oneline = *self.layout == Layout::Oneline;
        let indent = if oneline || mail { 0 } else { MESSAGE_INDENT };

        let message_start = self.ctx.locator().locate(Anchor::MessageStart)?.start;
        let need_8bit = mail && self.body_needs_8bit(message_start);

        self.header()?;
        if !oneline && !mail {
            self.out.push(b'\n');
        }

        let subject = self.ctx.locator().locate(Anchor::Subject)?;
        let mut rest = subject.start;
        if oneline || mail {
            rest = self.title_line(need_8bit)?;
        }

        let beginning_of_body = self.out.len();
        if !oneline {
            self.remainder(rest, indent);
        }

        let trimmed = rtrim(&self.out).len();
        self.out.truncate(trimmed);
        if !oneline {
            self.out.push(b'\n');
        }
        if mail && self.out.len() <= beginning_of_body {
            self.out.push(b'\n');
        }
        Ok(self.out)
    }

    fn body_needs_8bit(&mut self, message_start: usize) -> bool {
        let record = self.ctx.record();
        if record.needs_8bit_cte() {
            return true;
        }
        if self.ctx.options().after_subject.is_some() {
            return false;
        }
        needs_8bit_content_transfer(&self.ctx.locator().buffer()[message_start..])
    }

    fn header(&mut self) -> Result<()> {
        if *self.layout == Layout::Raw {
            let span = self.ctx.locator().header_span()?;
            let header = self.ctx.locator().slice(span).to_vec();
            self.out.extend_from_slice(&header);
            return Ok(());
        }

        if !matches!(self.layout, Layout::Oneline | Layout::Email | Layout::Mboxrd) {
            let parents = self.ctx.parents(true)?;
            if parents.len() > 1 {
                self.out.extend_from_slice(b"Merge:");
                for parent in parents {
                    self.out.push(b' ');
                    self.out.extend_from_slice(&parent);
                }
                self.out.push(b'\n');
            }
        }

        self.user_info(Who::Author)?;
        if matches!(self.layout, Layout::Full | Layout::Fuller) {
            self.user_info(Who::Committer)?;
        }
        Ok(())
    }

    fn user_info(&mut self, who: Who) -> Result<()> {
        if *self.layout == Layout::Oneline {
            return Ok(());
        }
        let Some(line) = self.ctx.identity_line(who)? else {
            return Ok(());
        };
        let ident = match split_identity(&line) {
            Ok(ident) => ident,
            Err(err) => {
                debug!(error = %err, "skipping unparsable identity line");
                return Ok(());
            }
        };
        let options = self.ctx.options();
        let what = match who {
            Who::Author => "Author",
            Who::Committer => "Commit",
        };

        if self.layout.is_mail() {
            let mut name = ident.name.to_vec();
            let mut email = ident.email.to_vec();
            if let Some(from) = options.from_ident.as_deref() {
                if let Ok(sender) = split_identity(from) {
                    if sender.name != ident.name || sender.email != ident.email {
                        let mut header = b"From: ".to_vec();
                        header.extend_from_slice(&name);
                        header.extend_from_slice(b" <");
                        header.extend_from_slice(&email);
                        header.extend_from_slice(b">\n");
                        self.in_body_headers.push(header);
                        name = sender.name.to_vec();
                        email = sender.email.to_vec();
                    }
                }
            }
            self.mail_from(&name, &email);
            let date = format_identity_date(&ident, DateMode::Rfc2822, options.services.dates);
            self.out.extend_from_slice(format!("Date: {}\n", date).as_bytes());
            return Ok(());
        }

        let pad = if *self.layout == Layout::Fuller { "    " } else { "" };
        self.out
            .extend_from_slice(format!("{}: {}", what, pad).as_bytes());
        self.out.extend_from_slice(ident.name);
        self.out.extend_from_slice(b" <");
        self.out.extend_from_slice(ident.email);
        self.out.extend_from_slice(b">\n");

        let dates = options.services.dates;
        match self.layout {
            Layout::Medium => {
                let date = format_identity_date(&ident, options.date_mode, dates);
                self.out
                    .extend_from_slice(format!("Date:   {}\n", date).as_bytes());
            }
            Layout::Fuller => {
                let date = format_identity_date(&ident, options.date_mode, dates);
                self.out
                    .extend_from_slice(format!("{}Date: {}\n", what, date).as_bytes());
            }
            _ => {}
        }
        Ok(())
    }

    fn mail_from(&mut self, name: &[u8], email: &[u8]) {
        let options = self.ctx.options();
        let encoding = self.ctx.record().target_encoding();
        let mut max_length = MAX_HEADER_LENGTH;

        self.out.extend_from_slice(b"From: ");
        if options.encode_email_headers && needs_rfc2047_encoding(name) {
            add_rfc2047(&mut self.out, name, encoding, Rfc2047Kind::Address);
            max_length = MAX_ENCODED_LENGTH;
        } else if needs_rfc822_quoting(name) {
            fold_header(&mut self.out, &rfc822_quote(name), max_length);
        } else {
            fold_header(&mut self.out, name, max_length);
        }

        if max_length < line_width(&self.out) + 2 + email.len() + 1 {
            self.out.push(b'\n');
        }
        self.out.extend_from_slice(b" <");
        self.out.extend_from_slice(email);
        self.out.extend_from_slice(b">\n");
    }

    /// Writes the title line (and for mail, the headers after it). Returns
    /// the offset where the remainder of the message starts.
    fn title_line(&mut self, mut need_8bit: bool) -> Result<usize> {
        let subject = self.ctx.locator().locate(Anchor::Subject)?;
        let options = self.ctx.options();
        let separator: &[u8] = if options.preserve_subject { b"\n" } else { b" " };
        let title = join_subject(self.ctx.locator().slice(subject), separator);
        let mut rest = subject.end;

        if !self.layout.is_mail() {
            self.out.extend_from_slice(&title);
            self.out.push(b'\n');
            return Ok(rest);
        }

        let encoding = self.ctx.record().target_encoding();
        if options.subject_prefix.is_empty() {
            self.out.extend_from_slice(b"Subject: ");
        } else {
            self.out
                .extend_from_slice(format!("Subject: [{}] ", options.subject_prefix).as_bytes());
        }
        if options.encode_email_headers && needs_rfc2047_encoding(&title) {
            add_rfc2047(&mut self.out, &title, encoding, Rfc2047Kind::Subject);
        } else {
            fold_header(&mut self.out, &title, MAX_HEADER_LENGTH);
        }
        self.out.push(b'\n');

        rest = self.take_pseudo_headers(rest);
        if !need_8bit {
            need_8bit = self
                .in_body_headers
                .iter()
                .any(|h| needs_8bit_content_transfer(h));
        }
        if need_8bit {
            self.out.extend_from_slice(
                format!(
                    "MIME-Version: 1.0\n\
                     Content-Type: text/plain; charset={}\n\
                     Content-Transfer-Encoding: 8bit\n",
                    encoding
                )
                .as_bytes(),
            );
        }
        if let Some(after) = &options.after_subject {
            self.out.extend_from_slice(after);
        }
        self.out.push(b'\n');

        if !self.in_body_headers.is_empty() {
            for header in self.in_body_headers.drain(..) {
                self.out.extend_from_slice(&header);
            }
            self.out.push(b'\n');
        }
        Ok(rest)
    }

    /// Moves a leading body paragraph made only of `Token: value` lines into
    /// the in-body header block. Returns where the remainder starts.
    fn take_pseudo_headers(&mut self, from: usize) -> usize {
        let buf = self.ctx.locator().buffer();
        let start = skip_blank_lines(buf, from);
        let mut pos = start;
        let mut lines = Vec::new();
        while pos < buf.len() {
            let eol = find_eol(buf, pos);
            let line = &buf[pos..eol];
            if is_blank(line) {
                break;
            }
            if !is_pseudo_header(line) {
                return from;
            }
            let mut header = rtrim(line).to_vec();
            header.push(b'\n');
            lines.push(header);
            pos = eol + 1;
        }
        if lines.is_empty() {
            return from;
        }
        self.in_body_headers.extend(lines);
        pos.min(buf.len())
    }

    fn remainder(&mut self, from: usize, indent: usize) {
        let tab_width = self.ctx.options().tab_width(self.layout.default_tab_width());
        let mboxrd = *self.layout == Layout::Mboxrd;
        let short = *self.layout == Layout::Short;
        let buf = self.ctx.locator().buffer();

        let mut first = true;
        let mut pos = from;
        while pos < buf.len() {
            let eol = find_eol(buf, pos);
            let line = rtrim(&buf[pos..eol]);
            pos = eol + 1;
            if line.is_empty() {
                if first {
                    continue;
                }
                if short {
                    break;
                }
            }
            first = false;

            self.out.resize(self.out.len() + indent, b' ');
            if mboxrd && is_mboxrd_from(line) {
                self.out.push(b'>');
            }
            if tab_width > 0 {
                self.out.extend_from_slice(&expand_tabs(line, tab_width));
            } else {
                self.out.extend_from_slice(line);
            }
            self.out.push(b'\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_aliases() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_builtin_names() {
        let aliases = no_aliases();
        assert_eq!(parse_commit_format("oneline", &aliases).unwrap(), Layout::Oneline);
        assert_eq!(parse_commit_format("fuller", &aliases).unwrap(), Layout::Fuller);
        assert_eq!(parse_commit_format("mboxrd", &aliases).unwrap(), Layout::Mboxrd);
        assert_eq!(parse_commit_format("", &aliases).unwrap(), Layout::Medium);
    }

    #[test]
    fn test_user_formats() {
        let aliases = no_aliases();
        assert_eq!(
            parse_commit_format("format:%h", &aliases).unwrap(),
            Layout::User(UserFormat::new("%h", false))
        );
        assert_eq!(
            parse_commit_format("tformat:%h", &aliases).unwrap(),
            Layout::User(UserFormat::new("%h", true))
        );
        assert_eq!(
            parse_commit_format("%h %s", &aliases).unwrap(),
            Layout::User(UserFormat::new("%h %s", true))
        );
    }

    #[test]
    fn test_reference_format() {
        let Layout::User(format) = parse_commit_format("reference", &no_aliases()).unwrap() else {
            panic!("expected user format");
        };
        assert_eq!(format.template, REFERENCE_TEMPLATE);
        assert_eq!(format.date_mode, Some(DateMode::Short));
    }

    #[test]
    fn test_aliases() {
        let mut aliases = HashMap::new();
        aliases.insert("mine".to_string(), "format:%an".to_string());
        aliases.insert("indirect".to_string(), "mine".to_string());
        aliases.insert("medium".to_string(), "format:ignored".to_string());
        assert_eq!(
            parse_commit_format("indirect", &aliases).unwrap(),
            Layout::User(UserFormat::new("%an", false))
        );
        assert_eq!(parse_commit_format("medium", &aliases).unwrap(), Layout::Medium);
    }

    #[test]
    fn test_alias_loop() {
        let mut aliases = HashMap::new();
        aliases.insert("a".to_string(), "b".to_string());
        aliases.insert("b".to_string(), "a".to_string());
        assert!(matches!(
            parse_commit_format("a", &aliases),
            Err(FormatError::AliasLoop(_))
        ));
    }

    #[test]
    fn test_unknown_format() {
        assert_eq!(
            parse_commit_format("fancy", &no_aliases()),
            Err(FormatError::UnknownFormat("fancy".to_string()))
        );
    }

    #[test]
    fn test_commit_format_is_empty() {
        assert!(commit_format_is_empty(&Layout::User(UserFormat::new("", false))));
        assert!(!commit_format_is_empty(&Layout::User(UserFormat::new("%h", false))));
        assert!(!commit_format_is_empty(&Layout::Oneline));
    }
}
