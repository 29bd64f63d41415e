//! Directive grammar.
//!
//! [`parse`] reads one directive from the bytes following a `%` and reports
//! how many bytes it consumed. It never looks at a record, so the same
//! grammar drives both expansion and the requirements pre-scan.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::align::{AlignSpec, Flush, TruncateAt, WrapSpec};
use crate::color::{short_color, ColorDirective, ColorWhen};
use crate::error::{FormatError, Result};
use crate::trailers::TrailerOptions;

/// Whose identity a person directive reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Who {
    Author,
    Committer,
}

/// The part of an identity a person directive renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PersonField {
    Name,
    MailmapName,
    Email,
    MailmapEmail,
    LocalPart,
    MailmapLocalPart,
    /// Date in the render's date mode.
    Date,
    Rfc2822Date,
    RelativeDate,
    UnixDate,
    IsoDate,
    StrictIsoDate,
    ShortDate,
    HumanDate,
}

/// Signature fields (`%G?`, `%GG`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignatureField {
    Status,
    Output,
    Signer,
    Key,
    Fingerprint,
    PrimaryKeyFingerprint,
    Trust,
}

/// Reflog fields (`%gd`, `%gn`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReflogDirective {
    ShortSelector,
    Selector,
    Name,
    MailmapName,
    Email,
    MailmapEmail,
    Subject,
}

/// A placeholder that substitutes record or option data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Hash,
    AbbrevHash,
    Tree,
    AbbrevTree,
    Parents,
    AbbrevParents,
    Person(Who, PersonField),
    Subject,
    SanitizedSubject,
    Body,
    RawBody,
    Encoding,
    Notes,
    /// `%d` with surrounding ` (...)`, `%D` without.
    Decorations { wrapped: bool },
    Source,
    Mark,
    Signature(SignatureField),
    Reflog(ReflogDirective),
}

/// Output adjustment requested by a `+`, `-` or space after `%`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Magic {
    #[default]
    None,
    /// `%+x`: newline before non-empty output.
    AddNewline,
    /// `%-x`: drop preceding newlines when the output is empty.
    StripNewlines,
    /// `% x`: space before non-empty output.
    AddSpace,
}

/// One parsed directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    /// `%n`, `%%`, `%xNN`.
    Literal(Vec<u8>),
    Field(Field),
    Trailers(TrailerOptions),
    Color(ColorDirective),
    Wrap(WrapSpec),
    /// `%|(column[,fill])`
    Pad { column: usize, fill: u8 },
    Align(AlignSpec),
}

/// A directive with its magic prefix and the bytes it consumed after `%`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parsed {
    pub magic: Magic,
    pub directive: Directive,
    pub len: usize,
}

static FIELDS: Lazy<HashMap<&'static [u8], Field>> = Lazy::new(|| {
    let mut map: HashMap<&'static [u8], Field> = HashMap::new();
    map.insert(b"H", Field::Hash);
    map.insert(b"h", Field::AbbrevHash);
    map.insert(b"T", Field::Tree);
    map.insert(b"t", Field::AbbrevTree);
    map.insert(b"P", Field::Parents);
    map.insert(b"p", Field::AbbrevParents);
    map.insert(b"s", Field::Subject);
    map.insert(b"f", Field::SanitizedSubject);
    map.insert(b"b", Field::Body);
    map.insert(b"B", Field::RawBody);
    map.insert(b"e", Field::Encoding);
    map.insert(b"N", Field::Notes);
    map.insert(b"d", Field::Decorations { wrapped: true });
    map.insert(b"D", Field::Decorations { wrapped: false });
    map.insert(b"S", Field::Source);
    map.insert(b"m", Field::Mark);

    map.insert(b"G?", Field::Signature(SignatureField::Status));
    map.insert(b"GG", Field::Signature(SignatureField::Output));
    map.insert(b"GS", Field::Signature(SignatureField::Signer));
    map.insert(b"GK", Field::Signature(SignatureField::Key));
    map.insert(b"GF", Field::Signature(SignatureField::Fingerprint));
    map.insert(b"GP", Field::Signature(SignatureField::PrimaryKeyFingerprint));
    map.insert(b"GT", Field::Signature(SignatureField::Trust));

    map.insert(b"gd", Field::Reflog(ReflogDirective::ShortSelector));
    map.insert(b"gD", Field::Reflog(ReflogDirective::Selector));
    map.insert(b"gn", Field::Reflog(ReflogDirective::Name));
    map.insert(b"gN", Field::Reflog(ReflogDirective::MailmapName));
    map.insert(b"ge", Field::Reflog(ReflogDirective::Email));
    map.insert(b"gE", Field::Reflog(ReflogDirective::MailmapEmail));
    map.insert(b"gs", Field::Reflog(ReflogDirective::Subject));
    map
});

static PERSON_FIELDS: Lazy<HashMap<u8, PersonField>> = Lazy::new(|| {
    [
        (b'n', PersonField::Name),
        (b'N', PersonField::MailmapName),
        (b'e', PersonField::Email),
        (b'E', PersonField::MailmapEmail),
        (b'l', PersonField::LocalPart),
        (b'L', PersonField::MailmapLocalPart),
        (b'd', PersonField::Date),
        (b'D', PersonField::Rfc2822Date),
        (b'r', PersonField::RelativeDate),
        (b't', PersonField::UnixDate),
        (b'i', PersonField::IsoDate),
        (b'I', PersonField::StrictIsoDate),
        (b's', PersonField::ShortDate),
        (b'h', PersonField::HumanDate),
    ]
    .into_iter()
    .collect()
});

fn unknown(text: &[u8]) -> FormatError {
    FormatError::UnknownDirective(String::from_utf8_lossy(text).into_owned())
}

/// The first character of `rest`, for error messages.
fn first_char(rest: &[u8]) -> &[u8] {
    let len = match rest.first() {
        None => 0,
        Some(0xc0..=0xdf) => 2,
        Some(0xe0..=0xef) => 3,
        Some(0xf0..=0xf7) => 4,
        Some(_) => 1,
    };
    &rest[..len.min(rest.len())]
}

/// Parses the directive at the start of `rest` (the bytes after `%`).
pub fn parse(rest: &[u8]) -> Result<Parsed> {
    let magic = match rest.first() {
        Some(b'+') => Magic::AddNewline,
        Some(b'-') => Magic::StripNewlines,
        Some(b' ') => Magic::AddSpace,
        _ => Magic::None,
    };
    let offset = usize::from(magic != Magic::None);
    let (directive, len) = parse_bare(&rest[offset..])?;
    Ok(Parsed {
        magic,
        directive,
        len: offset + len,
    })
}

fn parse_bare(rest: &[u8]) -> Result<(Directive, usize)> {
    let Some(&c) = rest.first() else {
        return Err(unknown(b""));
    };
    match c {
        b'n' => Ok((Directive::Literal(b"\n".to_vec()), 1)),
        b'%' => Ok((Directive::Literal(b"%".to_vec()), 1)),
        b'x' => {
            let byte = rest
                .get(1..3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| unknown(&rest[..rest.len().min(3)]))?;
            Ok((Directive::Literal(vec![byte]), 3))
        }
        b'a' | b'c' => {
            let who = if c == b'a' { Who::Author } else { Who::Committer };
            let field = rest
                .get(1)
                .and_then(|b| PERSON_FIELDS.get(b))
                .ok_or_else(|| unknown(&rest[..rest.len().min(2)]))?;
            Ok((Directive::Field(Field::Person(who, *field)), 2))
        }
        b'G' => {
            let key = rest.get(..2).ok_or_else(|| unknown(rest))?;
            let field = FIELDS.get(key).ok_or_else(|| unknown(key))?;
            Ok((Directive::Field(*field), 2))
        }
        b'g' => {
            let key = rest.get(..2).ok_or_else(|| unknown(rest))?;
            let field = FIELDS.get(key).ok_or_else(|| {
                FormatError::UnknownReflogField(String::from_utf8_lossy(key).into_owned())
            })?;
            Ok((Directive::Field(*field), 2))
        }
        b'C' => parse_color(rest),
        b'w' => {
            let (args, len) = parenthesized(rest, 1)?;
            let spec = parse_wrap(args).ok_or_else(|| unknown(&rest[..len]))?;
            Ok((Directive::Wrap(spec), len))
        }
        b'|' => {
            let (args, len) = parenthesized(rest, 1)?;
            let (column, fill) = parse_pad(args).ok_or_else(|| unknown(&rest[..len]))?;
            Ok((Directive::Pad { column, fill }, len))
        }
        b'<' | b'>' => parse_align(rest),
        b'(' => parse_named(rest),
        _ => match FIELDS.get(&rest[..1]) {
            Some(field) => Ok((Directive::Field(*field), 1)),
            None => Err(unknown(first_char(rest))),
        },
    }
}

/// Returns the text between `(` at `rest[open]` and the matching `)`, and
/// the length consumed through the `)`.
fn parenthesized(rest: &[u8], open: usize) -> Result<(&str, usize)> {
    if rest.get(open) != Some(&b'(') {
        return Err(unknown(&rest[..open.min(rest.len())]));
    }
    let close = rest[open..]
        .iter()
        .position(|&b| b == b')')
        .map(|i| open + i)
        .ok_or_else(|| unknown(rest))?;
    let args = std::str::from_utf8(&rest[open + 1..close]).map_err(|_| unknown(&rest[..=close]))?;
    Ok((args, close + 1))
}

fn parse_color(rest: &[u8]) -> Result<(Directive, usize)> {
    if rest.get(1) == Some(&b'(') {
        let (body, len) = parenthesized(rest, 1)?;
        return Ok((Directive::Color(ColorDirective::parse(body)?), len));
    }
    for name in ["red", "green", "blue", "reset"] {
        if rest[1..].starts_with(name.as_bytes()) {
            let escape = short_color(name).unwrap_or_default().to_string();
            return Ok((
                Directive::Color(ColorDirective::Spec {
                    when: ColorWhen::Enabled,
                    escape,
                }),
                1 + name.len(),
            ));
        }
    }
    let word: Vec<u8> = rest[1..]
        .iter()
        .copied()
        .take_while(u8::is_ascii_alphanumeric)
        .collect();
    Err(FormatError::UnknownColor(
        String::from_utf8_lossy(&word).into_owned(),
    ))
}

fn parse_number(arg: &str) -> Option<usize> {
    arg.trim().parse().ok()
}

fn parse_wrap(args: &str) -> Option<WrapSpec> {
    let mut spec = WrapSpec::default();
    if args.trim().is_empty() {
        return Some(spec);
    }
    let parts: Vec<&str> = args.split(',').collect();
    if parts.len() > 3 {
        return None;
    }
    let slots = [&mut spec.width, &mut spec.indent1, &mut spec.indent2];
    for (slot, part) in slots.into_iter().zip(parts) {
        *slot = parse_number(part)?;
    }
    Some(spec)
}

fn parse_fill(arg: &str) -> Option<u8> {
    match arg.as_bytes() {
        [b] if b.is_ascii_graphic() || *b == b' ' => Some(*b),
        _ => None,
    }
}

fn parse_pad(args: &str) -> Option<(usize, u8)> {
    let mut parts = args.splitn(2, ',');
    let column = parse_number(parts.next()?)?;
    let fill = match parts.next() {
        Some(fill) => parse_fill(fill)?,
        None => b' ',
    };
    Some((column, fill))
}

fn parse_align(rest: &[u8]) -> Result<(Directive, usize)> {
    let (flush, mut pos) = match rest {
        [b'<', ..] => (Flush::Right, 1),
        [b'>', b'>', ..] => (Flush::LeftSteal, 2),
        [b'>', b'<', ..] => (Flush::Both, 2),
        _ => (Flush::Left, 1),
    };
    let mut column = false;
    if rest.get(pos) == Some(&b'|') {
        column = true;
        pos += 1;
    }
    let (args, mut len) = parenthesized(rest, pos)?;
    if !column && rest.get(len) == Some(&b'|') {
        column = true;
        len += 1;
    }

    let mut parts = args.split(',');
    let width = parts
        .next()
        .and_then(parse_number)
        .ok_or_else(|| unknown(&rest[..len]))?;
    let mut spec = AlignSpec {
        flush,
        width,
        column,
        truncate: None,
        fill: b' ',
    };
    for option in parts {
        match option.trim() {
            "trunc" => spec.truncate = Some(TruncateAt::End),
            "ltrunc" => spec.truncate = Some(TruncateAt::Start),
            "mtrunc" => spec.truncate = Some(TruncateAt::Middle),
            _ => spec.fill = parse_fill(option).ok_or_else(|| unknown(&rest[..len]))?,
        }
    }
    Ok((Directive::Align(spec), len))
}

fn parse_named(rest: &[u8]) -> Result<(Directive, usize)> {
    let (body, len) = parenthesized(rest, 0)?;
    let options = match body.split_once(':') {
        Some(("trailers", args)) => args,
        None if body == "trailers" => "",
        _ => return Err(unknown(&rest[..len])),
    };
    Ok((Directive::Trailers(TrailerOptions::parse(options)?), len))
}

/// Iterates over the directives of `template`, skipping literal text and
/// anything after a `%` that does not parse.
pub fn directives(template: &[u8]) -> impl Iterator<Item = Parsed> + '_ {
    let mut pos = 0;
    std::iter::from_fn(move || loop {
        let percent = template[pos..].iter().position(|&b| b == b'%')?;
        let start = pos + percent + 1;
        match parse(&template[start..]) {
            Ok(parsed) => {
                pos = start + parsed.len;
                return Some(parsed);
            }
            Err(_) => pos = start,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive(text: &str) -> Directive {
        parse(text.as_bytes()).unwrap().directive
    }

    #[test]
    fn test_simple_fields() {
        assert_eq!(directive("H"), Directive::Field(Field::Hash));
        assert_eq!(
            directive("an"),
            Directive::Field(Field::Person(Who::Author, PersonField::Name))
        );
        assert_eq!(
            directive("cI"),
            Directive::Field(Field::Person(Who::Committer, PersonField::StrictIsoDate))
        );
        assert_eq!(
            directive("G?"),
            Directive::Field(Field::Signature(SignatureField::Status))
        );
    }

    #[test]
    fn test_consumed_length() {
        assert_eq!(parse(b"sxyz").unwrap().len, 1);
        assert_eq!(parse(b"ae rest").unwrap().len, 2);
        assert_eq!(parse(b"<(10,trunc)|").unwrap().len, 12);
        assert_eq!(parse(b"<|(10)|").unwrap().len, 6);
        assert_eq!(parse(b"+s").unwrap().len, 2);
    }

    #[test]
    fn test_literals() {
        assert_eq!(directive("n"), Directive::Literal(b"\n".to_vec()));
        assert_eq!(directive("%"), Directive::Literal(b"%".to_vec()));
        assert_eq!(directive("x41"), Directive::Literal(b"A".to_vec()));
        assert!(parse(b"xZZ").is_err());
    }

    #[test]
    fn test_unknown_directive_names_offender() {
        assert_eq!(
            parse(b"Q"),
            Err(FormatError::UnknownDirective("Q".to_string()))
        );
        assert_eq!(
            parse(b"az"),
            Err(FormatError::UnknownDirective("az".to_string()))
        );
        assert_eq!(parse(b""), Err(FormatError::UnknownDirective(String::new())));
    }

    #[test]
    fn test_unknown_reflog_field() {
        assert_eq!(
            parse(b"gq"),
            Err(FormatError::UnknownReflogField("gq".to_string()))
        );
    }

    #[test]
    fn test_magic_prefixes() {
        let parsed = parse(b"+b").unwrap();
        assert_eq!(parsed.magic, Magic::AddNewline);
        assert_eq!(parsed.directive, Directive::Field(Field::Body));
        assert_eq!(parse(b"-b").unwrap().magic, Magic::StripNewlines);
        assert_eq!(parse(b" b").unwrap().magic, Magic::AddSpace);
    }

    #[test]
    fn test_colors() {
        assert_eq!(parse(b"Cred").unwrap().len, 4);
        assert_eq!(parse(b"Creset").unwrap().len, 6);
        assert_eq!(
            directive("C(auto)"),
            Directive::Color(ColorDirective::Auto)
        );
        assert_eq!(
            parse(b"Cpurple"),
            Err(FormatError::UnknownColor("purple".to_string()))
        );
        assert!(matches!(
            parse(b"C(nocolor)"),
            Err(FormatError::UnknownColor(_))
        ));
    }

    #[test]
    fn test_alignment_forms() {
        let Directive::Align(spec) = directive("<(5,trunc)") else {
            panic!("expected alignment");
        };
        assert_eq!(spec.flush, Flush::Right);
        assert_eq!(spec.width, 5);
        assert_eq!(spec.truncate, Some(TruncateAt::End));
        assert!(!spec.column);

        let Directive::Align(spec) = directive(">>|(20,mtrunc,.)") else {
            panic!("expected alignment");
        };
        assert_eq!(spec.flush, Flush::LeftSteal);
        assert!(spec.column);
        assert_eq!(spec.truncate, Some(TruncateAt::Middle));
        assert_eq!(spec.fill, b'.');

        let Directive::Align(spec) = directive("><(8)") else {
            panic!("expected alignment");
        };
        assert_eq!(spec.flush, Flush::Both);

        let Directive::Align(spec) = directive(">(10)|") else {
            panic!("expected alignment");
        };
        assert_eq!(spec.flush, Flush::Left);
        assert!(spec.column);
    }

    #[test]
    fn test_malformed_alignment() {
        assert!(parse(b"<10").is_err());
        assert!(parse(b"<(ten)").is_err());
        assert!(parse(b"<(10,squash)").is_err());
        assert!(parse(b"<(10").is_err());
    }

    #[test]
    fn test_wrap_and_pad() {
        assert_eq!(
            directive("w(72,4,8)"),
            Directive::Wrap(WrapSpec {
                width: 72,
                indent1: 4,
                indent2: 8
            })
        );
        assert_eq!(directive("w()"), Directive::Wrap(WrapSpec::default()));
        assert_eq!(
            directive("w(20)"),
            Directive::Wrap(WrapSpec {
                width: 20,
                indent1: 0,
                indent2: 0
            })
        );
        assert_eq!(directive("|(30)"), Directive::Pad { column: 30, fill: b' ' });
        assert_eq!(directive("|(30,-)"), Directive::Pad { column: 30, fill: b'-' });
        assert!(parse(b"w(1,2,3,4)").is_err());
    }

    #[test]
    fn test_trailers() {
        assert_eq!(
            directive("(trailers)"),
            Directive::Trailers(TrailerOptions::default())
        );
        let Directive::Trailers(opts) = directive("(trailers:only,unfold)") else {
            panic!("expected trailers");
        };
        assert!(opts.only && opts.unfold);
        assert!(parse(b"(describe)").is_err());
    }

    #[test]
    fn test_directives_iterator() {
        let found: Vec<_> = directives(b"%h %s %% done")
            .map(|p| p.directive)
            .collect();
        assert_eq!(
            found,
            vec![
                Directive::Field(Field::AbbrevHash),
                Directive::Field(Field::Subject),
                Directive::Literal(b"%".to_vec()),
            ]
        );
        let found: Vec<_> = directives(b"%Q%s%").map(|p| p.directive).collect();
        assert_eq!(found, vec![Directive::Field(Field::Subject)]);
    }
}
