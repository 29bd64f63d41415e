//! Commitfmt - pretty-printing for raw commit objects.
//!
//! Commitfmt renders a commit (a header block of `key value` lines, a blank
//! line, then a free-form message) either with one of the classic built-in
//! layouts or through a `%`-placeholder template. It supports:
//!
//! - Built-in layouts: `oneline`, `short`, `medium`, `full`, `fuller`,
//!   `raw`, `email`, `mboxrd` and `reference`
//! - Placeholders for ids, identities, dates, subject and body, trailers,
//!   decorations, signatures and reflog entries
//! - Color, wrapping, column padding and aligned or truncated regions
//! - Mail headers with RFC 2047 encoding and MIME headers
//! - Re-encoding of messages stored in a legacy charset
//!
//! # Quick Start
//!
//! ```rust
//! use commitfmt::{expand, PrettyOptions, Record};
//!
//! let record = Record::new(
//!     "9bedf67800b2923982bdf60c89c57ce6ce2d9a1c",
//!     &b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
//! author A U Thor <author@example.com> 1112911993 -0700\n\
//! committer C O Mitter <committer@example.com> 1112912053 -0700\n\
//! \n\
//! Add the frobnicator\n"[..],
//! );
//!
//! let options = PrettyOptions::new();
//! let line = expand("%h %<(12,trunc)%an|%s", &record, &options).unwrap();
//! assert_eq!(line, "9bedf67 A U Thor    |Add the frobnicator".as_bytes());
//! ```
//!
//! # Layouts
//!
//! ```rust
//! use std::collections::HashMap;
//! use commitfmt::{parse_commit_format, pretty_print_commit, PrettyOptions, Record};
//!
//! let record = Record::new(
//!     "9bedf67800b2923982bdf60c89c57ce6ce2d9a1c",
//!     &b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
//! author A U Thor <author@example.com> 1112911993 -0700\n\
//! committer A U Thor <author@example.com> 1112911993 -0700\n\
//! \n\
//! Initial import\n"[..],
//! );
//! let layout = parse_commit_format("short", &HashMap::new()).unwrap();
//! let mut out = Vec::new();
//! pretty_print_commit(&layout, &record, &PrettyOptions::new(), &mut out).unwrap();
//! assert_eq!(out, b"Author: A U Thor <author@example.com>\n\n    Initial import\n");
//! ```
//!
//! # Collaborators
//!
//! Anything that needs a repository is behind a trait: dates
//! ([`DateRenderer`]), charsets ([`Transcoder`]), abbreviation
//! ([`Abbreviator`]), reflog entries ([`ReflogLookup`]), the mailmap
//! ([`Mailmap`]) and trailer parsing ([`TrailerFormatter`]). [`Services`]
//! bundles them; its default uses the built-in implementations.

pub mod align;
pub mod color;
pub mod config;
pub mod date;
pub mod directive;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod ident;
pub mod layout;
pub mod locator;
pub mod mail;
pub mod options;
pub mod record;
pub mod requirements;
pub mod services;
pub mod trailers;
pub mod width;

pub use config::{ColorChoice, ConfigError, PrettyConfig};
pub use date::{ChronoDateRenderer, DateMode, DateRenderer};
pub use encoding::{needs_8bit_content_transfer, reencode, BuiltinTranscoder, Transcoder};
pub use engine::{expand, format_commit_message, sanitize_subject, FormatContext};
pub use error::{FormatError, Result};
pub use ident::{split_identity, IdentError, Identity};
pub use layout::{
    commit_format_is_empty, parse_commit_format, pretty_print_commit, Layout, UserFormat,
};
pub use locator::{Anchor, RecordLocator};
pub use options::PrettyOptions;
pub use record::Record;
pub use requirements::{userformat_find_requirements, Requirements};
pub use services::{
    Abbreviator, Mailmap, MailmapTable, NoMailmap, NoReflog, PrefixAbbreviator, ReflogEntry,
    ReflogField, ReflogLookup, Services, SignatureCheck,
};
pub use trailers::{SimpleTrailerFormatter, TrailerFormatter, TrailerOptions};
