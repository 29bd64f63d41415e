//! YAML configuration for default formats, date modes and format aliases.
//!
//! ```rust
//! use commitfmt::PrettyConfig;
//!
//! let config = PrettyConfig::from_yaml(r#"
//! format: lg
//! date: short
//! aliases:
//!   lg: "%h %ad %s"
//! "#).unwrap();
//! assert_eq!(config.aliases["lg"], "%h %ad %s");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::date::DateMode;
use crate::error::Result;
use crate::layout::{parse_commit_format, Layout};
use crate::options::PrettyOptions;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// When color directives emit escapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColorChoice {
    /// Color when writing to a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn name(&self) -> &'static str {
        match self {
            ColorChoice::Auto => "auto",
            ColorChoice::Always => "always",
            ColorChoice::Never => "never",
        }
    }

    /// Whether to color, given whether the output is a terminal.
    pub fn enabled(&self, is_terminal: bool) -> bool {
        match self {
            ColorChoice::Auto => is_terminal,
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

impl fmt::Display for ColorChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" | "true" => Ok(ColorChoice::Always),
            "never" | "false" => Ok(ColorChoice::Never),
            other => Err(format!("unknown color choice: {}", other)),
        }
    }
}

impl TryFrom<String> for ColorChoice {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColorChoice> for String {
    fn from(choice: ColorChoice) -> Self {
        choice.name().to_string()
    }
}

/// Defaults read from a configuration file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrettyConfig {
    /// Format name, alias or template used when none is given.
    pub format: Option<String>,
    pub date: Option<DateMode>,
    pub color: ColorChoice,
    pub abbrev: Option<usize>,
    pub expand_tabs: Option<usize>,
    pub subject_prefix: Option<String>,
    /// Format aliases, name to format string.
    pub aliases: HashMap<String, String>,
}

impl PrettyConfig {
    /// Parses configuration from YAML. A document with no content gives
    /// the defaults.
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, ConfigError> {
        let blank = yaml
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with('#') || line == "---");
        if blank {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads and parses a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Self::from_yaml(&content)
    }

    /// Resolves `name`, or the configured format when `None`, against the
    /// built-in layouts and the configured aliases.
    pub fn layout(&self, name: Option<&str>) -> Result<Layout> {
        let name = name.or(self.format.as_deref()).unwrap_or("medium");
        parse_commit_format(name, &self.aliases)
    }

    /// Copies the configured values onto `options`. Color is left alone
    /// since it depends on the output stream.
    pub fn apply<'a>(&self, mut options: PrettyOptions<'a>) -> PrettyOptions<'a> {
        if let Some(mode) = self.date {
            options.date_mode = mode;
        }
        if let Some(abbrev) = self.abbrev {
            options.abbrev = abbrev;
        }
        if let Some(tab_width) = self.expand_tabs {
            options.expand_tabs = Some(tab_width);
        }
        if let Some(prefix) = &self.subject_prefix {
            options.subject_prefix = prefix.clone();
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use crate::layout::UserFormat;

    #[test]
    fn test_empty_config() {
        assert_eq!(PrettyConfig::from_yaml("").unwrap(), PrettyConfig::default());
        assert_eq!(
            PrettyConfig::from_yaml("# nothing here\n").unwrap(),
            PrettyConfig::default()
        );
    }

    #[test]
    fn test_full_config() {
        let config = PrettyConfig::from_yaml(
            r#"
format: oneline
date: iso
color: never
abbrev: 12
expand_tabs: 4
subject_prefix: RFC PATCH
aliases:
  short-log: "%h %s"
"#,
        )
        .unwrap();
        assert_eq!(config.format.as_deref(), Some("oneline"));
        assert_eq!(config.date, Some(DateMode::Iso8601));
        assert_eq!(config.color, ColorChoice::Never);
        assert_eq!(config.abbrev, Some(12));
        assert_eq!(config.expand_tabs, Some(4));
        assert_eq!(config.subject_prefix.as_deref(), Some("RFC PATCH"));
        assert_eq!(config.aliases.len(), 1);
    }

    #[test]
    fn test_rejects_unknown_keys_and_values() {
        assert!(matches!(
            PrettyConfig::from_yaml("colour: always"),
            Err(ConfigError::Parse(_))
        ));
        assert!(PrettyConfig::from_yaml("date: yesterday").is_err());
        assert!(PrettyConfig::from_yaml("color: sometimes").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = PrettyConfig::from_file("/nonexistent/commitfmt.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/commitfmt.yaml"));
    }

    #[test]
    fn test_layout_resolution() {
        let config = PrettyConfig::from_yaml("format: lg\naliases:\n  lg: \"%h %s\"\n").unwrap();
        assert_eq!(
            config.layout(None).unwrap(),
            Layout::User(UserFormat::new("%h %s", true))
        );
        assert_eq!(config.layout(Some("short")).unwrap(), Layout::Short);
        assert_eq!(PrettyConfig::default().layout(None).unwrap(), Layout::Medium);
        assert!(matches!(
            config.layout(Some("nope")),
            Err(FormatError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_apply() {
        let config = PrettyConfig {
            date: Some(DateMode::Short),
            abbrev: Some(10),
            subject_prefix: Some("RFC".to_string()),
            ..PrettyConfig::default()
        };
        let options = config.apply(PrettyOptions::new());
        assert_eq!(options.date_mode, DateMode::Short);
        assert_eq!(options.abbrev, 10);
        assert_eq!(options.subject_prefix, "RFC");
        assert_eq!(options.expand_tabs, None);
    }

    #[test]
    fn test_color_choice() {
        assert!(ColorChoice::Auto.enabled(true));
        assert!(!ColorChoice::Auto.enabled(false));
        assert!(ColorChoice::Always.enabled(false));
        assert!(!ColorChoice::Never.enabled(true));
        assert_eq!("always".parse::<ColorChoice>(), Ok(ColorChoice::Always));
    }
}
