//! `commitfmt`: prints raw commit objects with a built-in layout or a
//! placeholder template.
//!
//! ```text
//! git cat-file commit HEAD | commitfmt --id "$(git rev-parse HEAD)" --format=fuller
//! ```

use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use commitfmt::color::{AUTO_ID_COLOR, RESET};
use commitfmt::{
    pretty_print_commit, Abbreviator, ColorChoice, DateMode, Layout, PrettyConfig,
    PrettyOptions, Record,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Id printed for inputs without an `--id`.
const NULL_ID: &str = "0000000000000000000000000000000000000000";

/// Pretty-print raw commit objects.
#[derive(Parser, Debug)]
#[command(name = "commitfmt", version, about)]
struct Args {
    /// Raw commit files. One commit is read from stdin when none are given.
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Layout name, configured alias, `format:<template>` or `tformat:<template>`
    #[arg(long, visible_alias = "pretty", value_name = "FORMAT")]
    format: Option<String>,

    /// Shorthand for `--format=oneline`
    #[arg(long, conflicts_with = "format")]
    oneline: bool,

    /// Date mode: default, rfc2822, iso8601, iso8601-strict, short, raw, unix, relative, human
    #[arg(long, value_name = "MODE")]
    date: Option<DateMode>,

    /// When to color output: auto, always, never
    #[arg(long, value_name = "WHEN")]
    color: Option<ColorChoice>,

    /// Length of abbreviated ids
    #[arg(long, value_name = "N")]
    abbrev: Option<usize>,

    /// Tab stop for message bodies; 0 keeps tabs
    #[arg(long, value_name = "N")]
    expand_tabs: Option<usize>,

    /// Text inside `[...]` on mail subjects
    #[arg(long, value_name = "PREFIX")]
    subject_prefix: Option<String>,

    /// Object id of each input, in order
    #[arg(long = "id", value_name = "ID")]
    ids: Vec<String>,

    /// Ref name shown by `%d`/`%D` and next to the id; repeatable
    #[arg(long = "decorate", value_name = "REF")]
    decorations: Vec<String>,

    /// YAML configuration file
    #[arg(long, env = "COMMITFMT_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&args, &mut out)
}

/// Logs to stderr, filtered by `COMMITFMT_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_env("COMMITFMT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(args: &Args, out: &mut impl Write) -> Result<()> {
    let config = match &args.config {
        Some(path) => PrettyConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PrettyConfig::default(),
    };

    let name = if args.oneline {
        Some("oneline")
    } else {
        args.format.as_deref()
    };
    let layout = config.layout(name).context("resolving commit format")?;

    let choice = args.color.unwrap_or(config.color);
    let color = choice.enabled(console::Term::stdout().features().colors_supported());
    let options = apply_args(args, config.apply(PrettyOptions::new())).color(color);
    debug!(?layout, color, "rendering");

    let records = read_records(args)?;
    let mut rendered = Vec::new();
    for (i, record) in records.iter().enumerate() {
        if i > 0 && !layout.uses_terminator() {
            rendered.push(b'\n');
        }
        write_entry(&layout, record, &options, &mut rendered)
            .with_context(|| format!("formatting commit {}", record.id()))?;
    }

    out.write_all(&rendered).context("writing output")?;
    out.flush().context("writing output")?;
    Ok(())
}

/// Command-line flags win over configuration.
fn apply_args<'a>(args: &Args, mut options: PrettyOptions<'a>) -> PrettyOptions<'a> {
    if let Some(mode) = args.date {
        options.date_mode = mode;
    }
    if let Some(abbrev) = args.abbrev {
        options.abbrev = abbrev;
    }
    if let Some(tab_width) = args.expand_tabs {
        options.expand_tabs = Some(tab_width);
    }
    if let Some(prefix) = &args.subject_prefix {
        options.subject_prefix = prefix.clone();
    }
    options.decorations = args.decorations.clone();
    options
}

fn read_records(args: &Args) -> Result<Vec<Record>> {
    let inputs = if args.files.is_empty() {
        let mut raw = Vec::new();
        io::stdin()
            .read_to_end(&mut raw)
            .context("reading commit from stdin")?;
        vec![raw]
    } else {
        args.files
            .iter()
            .map(|path| std::fs::read(path).with_context(|| format!("reading {}", path.display())))
            .collect::<Result<Vec<_>>>()?
    };

    Ok(inputs
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            let id = args.ids.get(i).map_or(NULL_ID, String::as_str);
            debug!(id, bytes = raw.len(), "loaded commit");
            Record::new(id, raw)
        })
        .collect())
}

/// One entry: the line the layout expects before it, then the layout.
fn write_entry(
    layout: &Layout,
    record: &Record,
    options: &PrettyOptions<'_>,
    out: &mut Vec<u8>,
) -> commitfmt::Result<()> {
    match layout {
        Layout::User(_) => {}
        Layout::Email | Layout::Mboxrd => {
            out.extend_from_slice(
                format!("From {} Mon Sep 17 00:00:00 2001\n", record.id()).as_bytes(),
            );
        }
        Layout::Oneline => {
            let short = options
                .services
                .abbreviator
                .abbreviate(record.id(), options.abbrev);
            write_id_line(out, &short, options);
            out.push(b' ');
        }
        _ => {
            write_id_line(out, &format!("commit {}", record.id()), options);
            out.push(b'\n');
        }
    }

    pretty_print_commit(layout, record, options, out)?;
    if layout.uses_terminator() {
        out.push(b'\n');
    }
    Ok(())
}

fn write_id_line(out: &mut Vec<u8>, text: &str, options: &PrettyOptions<'_>) {
    if options.color {
        out.extend_from_slice(format!("{}{}{}", AUTO_ID_COLOR, text, RESET).as_bytes());
    } else {
        out.extend_from_slice(text.as_bytes());
    }
    if !options.decorations.is_empty() {
        out.extend_from_slice(format!(" ({})", options.decorations.join(", ")).as_bytes());
    }
}
