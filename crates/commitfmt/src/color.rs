//! Color specifications and the escape sequences they produce.
//!
//! A color spec is a whitespace-separated list of words:
//!
//! - Colors: `normal`, `default`, `black`, `red`, `green`, `yellow`, `blue`,
//!   `magenta`, `cyan`, `white`, their `bright` variants (`brightred`),
//!   256-color palette indices `0` through `255`, and hex codes `#ff6b35` or
//!   `#fff`. The first color is the foreground, the second the background.
//! - Attributes: `bold`, `dim`, `italic`, `ul`, `blink`, `reverse`,
//!   `strike`, and their negations `nobold` / `no-bold` and so on.
//! - `reset`, which clears everything before applying the rest.
//!
//! ```rust
//! use commitfmt::color::ColorSpec;
//!
//! let spec = ColorSpec::parse("bold red").unwrap();
//! assert_eq!(spec.escape(), "\x1b[1;31m");
//! assert_eq!(ColorSpec::parse("reset").unwrap().escape(), "\x1b[m");
//! ```

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{FormatError, Result};

/// The escape sequence that resets all attributes.
pub const RESET: &str = "\x1b[m";

/// Color used for object ids under `%C(auto)`.
pub const AUTO_ID_COLOR: &str = "\x1b[33m";

static NAMED: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    [
        ("black", 0),
        ("red", 1),
        ("green", 2),
        ("yellow", 3),
        ("blue", 4),
        ("magenta", 5),
        ("cyan", 6),
        ("white", 7),
    ]
    .into_iter()
    .collect()
});

static ATTRIBUTES: Lazy<HashMap<&'static str, (u8, u8)>> = Lazy::new(|| {
    // (set, unset)
    [
        ("bold", (1, 22)),
        ("dim", (2, 22)),
        ("italic", (3, 23)),
        ("ul", (4, 24)),
        ("blink", (5, 25)),
        ("reverse", (7, 27)),
        ("strike", (9, 29)),
    ]
    .into_iter()
    .collect()
});

/// A single color value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDef {
    /// Leaves the slot untouched.
    Normal,
    /// The terminal's default color.
    Default,
    /// One of the eight basic colors.
    Ansi(u8),
    /// Bright variant of a basic color.
    Bright(u8),
    /// 256-color palette index.
    Color256(u8),
    /// True color RGB.
    Rgb(u8, u8, u8),
}

impl ColorDef {
    /// Parses one color word, or returns `None` if the word is not a color.
    pub fn parse_word(word: &str) -> Option<Self> {
        let lower = word.to_ascii_lowercase();
        match lower.as_str() {
            "normal" => return Some(ColorDef::Normal),
            "default" => return Some(ColorDef::Default),
            _ => {}
        }
        if let Some(&index) = NAMED.get(lower.as_str()) {
            return Some(ColorDef::Ansi(index));
        }
        if let Some(base) = lower.strip_prefix("bright") {
            return NAMED.get(base).map(|&index| ColorDef::Bright(index));
        }
        if let Some(hex) = lower.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        lower.parse::<u8>().ok().map(ColorDef::Color256)
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => Some(ColorDef::Rgb(
                channel(&hex[0..1])? * 17,
                channel(&hex[1..2])? * 17,
                channel(&hex[2..3])? * 17,
            )),
            6 => Some(ColorDef::Rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => None,
        }
    }

    /// SGR parameters for this color; `base` is 30 for foreground, 40 for background.
    fn sgr(&self, base: u8) -> Option<String> {
        match *self {
            ColorDef::Normal => None,
            ColorDef::Default => Some((base + 9).to_string()),
            ColorDef::Ansi(i) => Some((base + i).to_string()),
            ColorDef::Bright(i) => Some((base + 60 + i).to_string()),
            ColorDef::Color256(n) => Some(format!("{};5;{}", base + 8, n)),
            ColorDef::Rgb(r, g, b) => Some(format!("{};2;{};{};{}", base + 8, r, g, b)),
        }
    }
}

/// A parsed color spec: foreground, background and attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorSpec {
    pub fg: Option<ColorDef>,
    pub bg: Option<ColorDef>,
    /// SGR attribute codes in the order given.
    pub attributes: Vec<u8>,
    pub reset: bool,
}

impl ColorSpec {
    /// Parses a color spec. Any unrecognized word fails with
    /// [`FormatError::UnknownColor`] naming the whole spec.
    pub fn parse(spec: &str) -> Result<Self> {
        let unknown = || FormatError::UnknownColor(spec.to_string());
        let mut parsed = ColorSpec::default();

        for word in spec.split_whitespace() {
            let lower = word.to_ascii_lowercase();
            if lower == "reset" {
                parsed.reset = true;
                continue;
            }
            if let Some(color) = ColorDef::parse_word(&lower) {
                if parsed.fg.is_none() {
                    parsed.fg = Some(color);
                } else if parsed.bg.is_none() {
                    parsed.bg = Some(color);
                } else {
                    return Err(unknown());
                }
                continue;
            }
            let (negated, name) = match lower.strip_prefix("no") {
                Some(rest) => (true, rest.strip_prefix('-').unwrap_or(rest)),
                None => (false, lower.as_str()),
            };
            let &(set, unset) = ATTRIBUTES.get(name).ok_or_else(unknown)?;
            parsed.attributes.push(if negated { unset } else { set });
        }
        Ok(parsed)
    }

    /// The escape sequence for this spec. Empty when the spec sets nothing.
    pub fn escape(&self) -> String {
        let mut params: Vec<String> = self.attributes.iter().map(u8::to_string).collect();
        params.extend(self.fg.and_then(|c| c.sgr(30)));
        params.extend(self.bg.and_then(|c| c.sgr(40)));

        match (self.reset, params.is_empty()) {
            (true, true) => RESET.to_string(),
            (true, false) => format!("\x1b[;{}m", params.join(";")),
            (false, true) => String::new(),
            (false, false) => format!("\x1b[{}m", params.join(";")),
        }
    }
}

/// When a `%C(...)` directive emits its escape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorWhen {
    /// Only when color is enabled in the options.
    Enabled,
    /// Regardless of the options.
    Always,
}

/// The body of a `%C(...)` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorDirective {
    /// `%C(auto)`: color ids and decorations automatically from here on.
    Auto,
    /// An explicit color, with the condition for emitting it.
    Spec { when: ColorWhen, escape: String },
}

impl ColorDirective {
    /// Parses the text between `%C(` and `)`.
    pub fn parse(body: &str) -> Result<Self> {
        let body = body.trim();
        if body == "auto" {
            return Ok(ColorDirective::Auto);
        }
        let (when, spec) = if let Some(rest) = body.strip_prefix("auto,") {
            (ColorWhen::Enabled, rest)
        } else if let Some(rest) = body.strip_prefix("always,") {
            (ColorWhen::Always, rest)
        } else {
            (ColorWhen::Enabled, body)
        };
        let escape = ColorSpec::parse(spec)?.escape();
        Ok(ColorDirective::Spec { when, escape })
    }

    /// The escape to write, given whether color is enabled.
    pub fn emit(&self, color_enabled: bool) -> Option<&str> {
        match self {
            ColorDirective::Auto => None,
            ColorDirective::Spec { when, escape } => {
                (color_enabled || *when == ColorWhen::Always).then_some(escape.as_str())
            }
        }
    }
}

/// Escape for the short color forms `%Cred`, `%Cgreen`, `%Cblue`, `%Creset`.
pub fn short_color(name: &str) -> Option<&'static str> {
    match name {
        "red" => Some("\x1b[31m"),
        "green" => Some("\x1b[32m"),
        "blue" => Some("\x1b[34m"),
        "reset" => Some(RESET),
        _ => None,
    }
}
