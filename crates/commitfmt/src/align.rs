//! Deferred edits over the output buffer: alignment regions and wrapping.
//!
//! Both directives mark an offset in the output, let expansion append past
//! it, and rewrite the suffix when the region ends. An alignment region ends
//! after the next content-producing directive, before a newline, or at the
//! end of the template; a wrap region ends at the next `%w` or the end of
//! the template.

use crate::width::{
    center_split, display_width, display_width_from, line_width, truncate_end_from,
    truncate_middle_from, truncate_start_from,
};

/// Which side of the region receives padding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flush {
    /// `%>(N)`: content pushed to the right edge, padding before it.
    Left,
    /// `%<(N)`: content at the left edge, padding after it.
    Right,
    /// `%>>(N)`: like [`Flush::Left`], but one space written just before
    /// the region is removed.
    LeftSteal,
    /// `%><(N)`: centered; an odd column goes to the right.
    Both,
}

/// Where overflowing content is cut.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TruncateAt {
    /// `trunc`: keep the start.
    End,
    /// `ltrunc`: keep the end.
    Start,
    /// `mtrunc`: keep both ends.
    Middle,
}

/// A parsed alignment directive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlignSpec {
    pub flush: Flush,
    pub width: usize,
    /// `width` names a column of the current line rather than a width.
    pub column: bool,
    pub truncate: Option<TruncateAt>,
    pub fill: u8,
}

/// The pending alignment state of one render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Region {
    #[default]
    Idle,
    Open {
        flush: Flush,
        truncate: Option<TruncateAt>,
        width: usize,
        fill: u8,
        start: usize,
    },
}

impl Region {
    /// Opens a region at the end of `out`. Column-anchored widths are
    /// measured against the current line now.
    pub fn open(spec: &AlignSpec, out: &[u8]) -> Self {
        let width = if spec.column {
            spec.width.saturating_sub(line_width(out))
        } else {
            spec.width
        };
        Region::Open {
            flush: spec.flush,
            truncate: spec.truncate,
            width,
            fill: spec.fill,
            start: out.len(),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Region::Open { .. })
    }

    /// Output offset the region started at.
    pub fn start(&self) -> Option<usize> {
        match *self {
            Region::Idle => None,
            Region::Open { start, .. } => Some(start),
        }
    }

    /// Rewrites the region's suffix of `out` and returns to idle.
    pub fn finalize(&mut self, out: &mut Vec<u8>) {
        let Region::Open {
            flush,
            truncate,
            width,
            fill,
            start,
        } = std::mem::take(self)
        else {
            return;
        };

        let content = out.split_off(start.min(out.len()));
        if flush == Flush::LeftSteal && out.last() == Some(&b' ') {
            out.pop();
        }

        // Tabs in the content are measured from where the region starts.
        let col = line_width(out);
        let content = match truncate {
            Some(TruncateAt::End) => truncate_end_from(&content, width, col),
            Some(TruncateAt::Start) => truncate_start_from(&content, width, col),
            Some(TruncateAt::Middle) => truncate_middle_from(&content, width, col),
            None => content,
        };

        let pad = width.saturating_sub(display_width_from(&content, col));
        let (before, after) = match flush {
            Flush::Left | Flush::LeftSteal => (pad, 0),
            Flush::Right => (0, pad),
            Flush::Both => center_split(pad),
        };
        out.resize(out.len() + before, fill);
        out.extend_from_slice(&content);
        out.resize(out.len() + after, fill);
    }
}

/// Parameters of a `%w(width,indent1,indent2)` directive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WrapSpec {
    pub width: usize,
    pub indent1: usize,
    pub indent2: usize,
}

impl WrapSpec {
    /// True when wrapping would leave text untouched.
    pub fn is_noop(&self) -> bool {
        self.width == 0 && self.indent1 == 0 && self.indent2 == 0
    }
}

/// An active wrap region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WrapState {
    pub spec: WrapSpec,
    pub start: usize,
}

impl WrapState {
    pub fn new(spec: WrapSpec, out: &[u8]) -> Self {
        WrapState {
            spec,
            start: out.len(),
        }
    }

    /// Rewraps everything written since the region started.
    pub fn finalize(self, out: &mut Vec<u8>) {
        let text = out.split_off(self.start.min(out.len()));
        out.extend_from_slice(&wrap_text(&text, &self.spec));
    }
}

/// Greedy word wrap.
///
/// Each input line is wrapped on its own. Words are runs of non-blank bytes;
/// runs of blanks collapse to one space. A word wider than the limit stays
/// whole on its own line. The first output line is indented by `indent1`,
/// every later non-empty line by `indent2`. `width` counts the indent; zero
/// means no breaking.
pub fn wrap_text(text: &[u8], spec: &WrapSpec) -> Vec<u8> {
    if spec.is_noop() {
        return text.to_vec();
    }

    let mut out = Vec::with_capacity(text.len() + spec.indent1);
    let mut first = true;
    for (i, line) in text.split(|&b| b == b'\n').enumerate() {
        if i > 0 {
            out.push(b'\n');
        }
        let words: Vec<&[u8]> = line
            .split(|&b| b == b' ' || b == b'\t')
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            first = false;
            continue;
        }

        let indent = if first { spec.indent1 } else { spec.indent2 };
        first = false;
        out.resize(out.len() + indent, b' ');
        let mut col = indent;
        let mut line_has_word = false;
        for word in words {
            let w = display_width(word);
            if line_has_word {
                if spec.width > 0 && col + 1 + w > spec.width {
                    out.push(b'\n');
                    out.resize(out.len() + spec.indent2, b' ');
                    col = spec.indent2;
                } else {
                    out.push(b' ');
                    col += 1;
                }
            }
            out.extend_from_slice(word);
            col += w;
            line_has_word = true;
        }
    }
    out
}
