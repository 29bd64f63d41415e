//! Identity lines: `Name <email> timestamp tz`.
//!
//! Commit records are historical, untrusted data. An identity line that has
//! no `<email>` part cannot be split and yields [`IdentError`]; one whose
//! timestamp or timezone is missing or out of range still splits, and its
//! date renders as a fixed sentinel (the epoch in `+0000`) instead of garbage.

use thiserror::Error;
use tracing::debug;

use crate::date::{DateMode, DateRenderer};

/// Largest accepted timestamp: 9999-12-31T23:59:59Z.
pub const MAX_TIMESTAMP: u64 = 253_402_300_799;

/// Largest accepted timezone offset, in `hhmm` form.
pub const MAX_TZ: i32 = 1400;

/// Timestamp and offset substituted for bogus dates.
pub const SENTINEL_TIMESTAMP: i64 = 0;
pub const SENTINEL_TZ: i32 = 0;

/// Errors from splitting an identity line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentError {
    /// The line has no `<email>` part.
    #[error("malformed identity line: {0}")]
    MalformedIdentity(String),
}

/// The parts of an identity line, borrowed from the record buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity<'a> {
    pub name: &'a [u8],
    pub email: &'a [u8],
    /// Digits of the timestamp, when the line has a date trailer.
    pub timestamp: Option<&'a [u8]>,
    /// Signed offset digits (`-0700`), when the line has a date trailer.
    pub tz: Option<&'a [u8]>,
}

impl<'a> Identity<'a> {
    /// The part of the email address before `@`.
    pub fn local_part(&self) -> &'a [u8] {
        let email = self.email;
        match email.iter().position(|&b| b == b'@') {
            Some(at) => &email[..at],
            None => email,
        }
    }

    /// The validated timestamp and offset, or `None` if either is bogus.
    pub fn date(&self) -> Option<(i64, i32)> {
        let timestamp = parse_timestamp(self.timestamp?)?;
        let tz = parse_tz(self.tz?)?;
        Some((timestamp, tz))
    }
}

/// Splits `line` into name, email and optional date trailer.
///
/// The name is everything before the first `<`, with trailing whitespace
/// removed. The email runs to the first `>`. The date trailer is looked for
/// after the last `>`, so a stray `>` inside the address does not confuse it.
pub fn split_identity(line: &[u8]) -> Result<Identity<'_>, IdentError> {
    let malformed = || IdentError::MalformedIdentity(String::from_utf8_lossy(line).into_owned());

    let lt = line.iter().position(|&b| b == b'<').ok_or_else(malformed)?;
    let gt = line[lt + 1..]
        .iter()
        .position(|&b| b == b'>')
        .map(|i| lt + 1 + i)
        .ok_or_else(malformed)?;

    let name_end = line[..lt]
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);

    let mut ident = Identity {
        name: &line[..name_end],
        email: &line[lt + 1..gt],
        timestamp: None,
        tz: None,
    };

    // Last '>' always exists: at worst it is `gt`.
    let last_gt = line.iter().rposition(|&b| b == b'>').unwrap_or(gt);
    let rest = &line[last_gt + 1..];
    let rest = trim_start(rest);
    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return Ok(ident);
    }
    let (timestamp, rest) = rest.split_at(digits);
    let rest = trim_start(rest);
    if !matches!(rest.first(), Some(b'+') | Some(b'-')) {
        return Ok(ident);
    }
    let tz_digits = rest[1..].iter().take_while(|b| b.is_ascii_digit()).count();
    if tz_digits == 0 {
        return Ok(ident);
    }
    ident.timestamp = Some(timestamp);
    ident.tz = Some(&rest[..1 + tz_digits]);
    Ok(ident)
}

/// Renders the date of `ident` in `mode`, substituting the sentinel date
/// when the timestamp or offset is missing or out of range.
pub fn format_identity_date(
    ident: &Identity<'_>,
    mode: DateMode,
    renderer: &dyn DateRenderer,
) -> String {
    match ident.date() {
        Some((timestamp, tz)) => renderer.render(timestamp, tz, mode),
        None => {
            debug!(
                timestamp = ?ident.timestamp.map(String::from_utf8_lossy),
                tz = ?ident.tz.map(String::from_utf8_lossy),
                "bogus identity date, rendering sentinel"
            );
            sentinel_date(mode, renderer)
        }
    }
}

/// The text rendered in place of a bogus date.
pub fn sentinel_date(mode: DateMode, renderer: &dyn DateRenderer) -> String {
    renderer.render(SENTINEL_TIMESTAMP, SENTINEL_TZ, mode)
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

fn parse_timestamp(digits: &[u8]) -> Option<i64> {
    let value: u64 = std::str::from_utf8(digits).ok()?.parse().ok()?;
    if value > MAX_TIMESTAMP {
        return None;
    }
    i64::try_from(value).ok()
}

fn parse_tz(text: &[u8]) -> Option<i32> {
    let value: i32 = std::str::from_utf8(text).ok()?.parse().ok()?;
    if value.abs() > MAX_TZ || value.abs() % 100 >= 60 {
        return None;
    }
    Some(value)
}
