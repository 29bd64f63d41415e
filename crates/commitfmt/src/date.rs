//! Date display modes and the date rendering service.
//!
//! Calendar rendering is a collaborator of the formatter: anything that
//! implements [`DateRenderer`] can be plugged into
//! [`PrettyOptions`](crate::PrettyOptions). [`ChronoDateRenderer`] is the
//! default implementation.
//!
//! Timezone offsets are carried the way commit headers spell them: a signed
//! `hhmm` integer, so `-0700` is `-700` and `+0530` is `530`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// How a timestamp is displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DateMode {
    /// `Thu Apr 7 15:13:13 2005 -0700`
    #[default]
    Default,
    /// `Thu, 7 Apr 2005 15:13:13 -0700`
    Rfc2822,
    /// `2005-04-07 15:13:13 -0700`
    Iso8601,
    /// `2005-04-07T15:13:13-07:00`
    Iso8601Strict,
    /// `2005-04-07`
    Short,
    /// `1112911993 -0700`
    Raw,
    /// `1112911993`
    Unix,
    /// `3 weeks ago`
    Relative,
    /// Relative for recent dates, shortened absolute dates otherwise.
    Human,
}

impl DateMode {
    /// The name accepted by [`DateMode::from_str`].
    pub fn name(&self) -> &'static str {
        match self {
            DateMode::Default => "default",
            DateMode::Rfc2822 => "rfc2822",
            DateMode::Iso8601 => "iso8601",
            DateMode::Iso8601Strict => "iso8601-strict",
            DateMode::Short => "short",
            DateMode::Raw => "raw",
            DateMode::Unix => "unix",
            DateMode::Relative => "relative",
            DateMode::Human => "human",
        }
    }
}

impl fmt::Display for DateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s.trim().to_lowercase().as_str() {
            "default" => DateMode::Default,
            "rfc" | "rfc2822" => DateMode::Rfc2822,
            "iso" | "iso8601" => DateMode::Iso8601,
            "iso-strict" | "iso8601-strict" => DateMode::Iso8601Strict,
            "short" => DateMode::Short,
            "raw" => DateMode::Raw,
            "unix" => DateMode::Unix,
            "relative" => DateMode::Relative,
            "human" => DateMode::Human,
            other => return Err(format!("unknown date mode: {}", other)),
        };
        Ok(mode)
    }
}

impl TryFrom<String> for DateMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateMode> for String {
    fn from(mode: DateMode) -> Self {
        mode.name().to_string()
    }
}

/// Renders a timestamp with a timezone offset in a display mode.
pub trait DateRenderer {
    /// `tz` is a signed `hhmm` offset. Callers validate both values first.
    fn render(&self, timestamp: i64, tz: i32, mode: DateMode) -> String;
}

/// [`DateRenderer`] backed by `chrono`.
///
/// Relative and human dates are computed against the current time unless a
/// fixed reference time is supplied with [`ChronoDateRenderer::with_now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ChronoDateRenderer {
    now: Option<i64>,
}

impl ChronoDateRenderer {
    pub const fn new() -> Self {
        Self { now: None }
    }

    /// Uses `now` (seconds since the epoch) as the reference for relative dates.
    pub const fn with_now(now: i64) -> Self {
        Self { now: Some(now) }
    }

    fn now(&self) -> i64 {
        self.now.unwrap_or_else(|| Utc::now().timestamp())
    }
}

impl DateRenderer for ChronoDateRenderer {
    fn render(&self, timestamp: i64, tz: i32, mode: DateMode) -> String {
        let Some(local) = to_local(timestamp, tz) else {
            return format!("{} {}", timestamp, format_tz(tz));
        };

        match mode {
            DateMode::Default => local.format("%a %b %-d %H:%M:%S %Y %z").to_string(),
            DateMode::Rfc2822 => local.format("%a, %-d %b %Y %H:%M:%S %z").to_string(),
            DateMode::Iso8601 => local.format("%Y-%m-%d %H:%M:%S %z").to_string(),
            DateMode::Iso8601Strict => local.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
            DateMode::Short => local.format("%Y-%m-%d").to_string(),
            DateMode::Raw => format!("{} {}", timestamp, format_tz(tz)),
            DateMode::Unix => timestamp.to_string(),
            DateMode::Relative => relative(timestamp, self.now()),
            DateMode::Human => human(&local, timestamp, self.now(), tz),
        }
    }
}

/// Converts a signed `hhmm` offset to seconds east of UTC.
pub fn tz_offset_seconds(tz: i32) -> i32 {
    let minutes = (tz.abs() / 100) * 60 + tz.abs() % 100;
    tz.signum() * minutes * 60
}

/// Formats a signed `hhmm` offset as `+hhmm` / `-hhmm`.
pub fn format_tz(tz: i32) -> String {
    let sign = if tz < 0 { '-' } else { '+' };
    format!("{}{:04}", sign, tz.abs())
}

fn to_local(timestamp: i64, tz: i32) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(tz_offset_seconds(tz))?;
    let utc = DateTime::from_timestamp(timestamp, 0)?;
    Some(utc.with_timezone(&offset))
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

fn relative(timestamp: i64, now: i64) -> String {
    if timestamp > now {
        return "in the future".to_string();
    }
    let mut diff = now - timestamp;
    if diff < 90 {
        return format!("{} ago", plural(diff, "second"));
    }
    diff = (diff + 30) / 60;
    if diff < 90 {
        return format!("{} ago", plural(diff, "minute"));
    }
    diff = (diff + 30) / 60;
    if diff < 36 {
        return format!("{} ago", plural(diff, "hour"));
    }
    // Days from here on.
    diff = (diff + 12) / 24;
    if diff < 14 {
        return format!("{} ago", plural(diff, "day"));
    }
    if diff < 70 {
        return format!("{} ago", plural((diff + 3) / 7, "week"));
    }
    if diff < 365 {
        return format!("{} ago", plural((diff + 15) / 30, "month"));
    }
    if diff < 1825 {
        let total_months = (diff * 12 * 2 + 365) / (365 * 2);
        let years = total_months / 12;
        let months = total_months % 12;
        if months > 0 {
            return format!(
                "{}, {} ago",
                plural(years, "year"),
                plural(months, "month")
            );
        }
        return format!("{} ago", plural(years, "year"));
    }
    format!("{} ago", plural((diff + 183) / 365, "year"))
}

fn human(local: &DateTime<FixedOffset>, timestamp: i64, now: i64, tz: i32) -> String {
    let age = now - timestamp;
    if (0..12 * 60 * 60).contains(&age) {
        return relative(timestamp, now);
    }
    let same_year = to_local(now, tz)
        .map(|n| n.format("%Y").to_string() == local.format("%Y").to_string())
        .unwrap_or(false);
    if same_year {
        local.format("%a %b %-d %H:%M").to_string()
    } else {
        local.format("%b %-d %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: i64 = 1112911993;

    #[test]
    fn test_default_mode() {
        let r = ChronoDateRenderer::new();
        assert_eq!(
            r.render(TS, -700, DateMode::Default),
            "Thu Apr 7 15:13:13 2005 -0700"
        );
    }

    #[test]
    fn test_rfc2822_mode() {
        let r = ChronoDateRenderer::new();
        assert_eq!(
            r.render(TS, -700, DateMode::Rfc2822),
            "Thu, 7 Apr 2005 15:13:13 -0700"
        );
    }

    #[test]
    fn test_iso_modes() {
        let r = ChronoDateRenderer::new();
        assert_eq!(
            r.render(TS, -700, DateMode::Iso8601),
            "2005-04-07 15:13:13 -0700"
        );
        assert_eq!(
            r.render(TS, -700, DateMode::Iso8601Strict),
            "2005-04-07T15:13:13-07:00"
        );
        assert_eq!(r.render(TS, -700, DateMode::Short), "2005-04-07");
    }

    #[test]
    fn test_raw_and_unix() {
        let r = ChronoDateRenderer::new();
        assert_eq!(r.render(TS, -700, DateMode::Raw), "1112911993 -0700");
        assert_eq!(r.render(TS, 530, DateMode::Raw), "1112911993 +0530");
        assert_eq!(r.render(TS, -700, DateMode::Unix), "1112911993");
    }

    #[test]
    fn test_relative() {
        let r = ChronoDateRenderer::with_now(TS + 3 * 60 * 60);
        assert_eq!(r.render(TS, 0, DateMode::Relative), "3 hours ago");
        let r = ChronoDateRenderer::with_now(TS + 1);
        assert_eq!(r.render(TS, 0, DateMode::Relative), "1 second ago");
        let r = ChronoDateRenderer::with_now(TS + 20 * 86400);
        assert_eq!(r.render(TS, 0, DateMode::Relative), "3 weeks ago");
        let r = ChronoDateRenderer::with_now(TS - 10);
        assert_eq!(r.render(TS, 0, DateMode::Relative), "in the future");
    }

    #[test]
    fn test_relative_years_and_months() {
        let r = ChronoDateRenderer::with_now(TS + 400 * 86400);
        assert_eq!(r.render(TS, 0, DateMode::Relative), "1 year, 1 month ago");
        let r = ChronoDateRenderer::with_now(TS + 3000 * 86400);
        assert_eq!(r.render(TS, 0, DateMode::Relative), "8 years ago");
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("iso".parse::<DateMode>().unwrap(), DateMode::Iso8601);
        assert_eq!("RFC".parse::<DateMode>().unwrap(), DateMode::Rfc2822);
        assert!("sometime".parse::<DateMode>().is_err());
    }

    #[test]
    fn test_mode_deserializes_from_yaml() {
        let mode: DateMode = serde_yaml::from_str("iso-strict").unwrap();
        assert_eq!(mode, DateMode::Iso8601Strict);
    }

    #[test]
    fn test_tz_offset_seconds() {
        assert_eq!(tz_offset_seconds(-700), -7 * 3600);
        assert_eq!(tz_offset_seconds(530), 5 * 3600 + 30 * 60);
        assert_eq!(tz_offset_seconds(0), 0);
    }
}
