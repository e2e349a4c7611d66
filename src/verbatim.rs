//! Line wrapping for verbatim (code) blocks.
//!
//! Code in a printed book has no reflow: a long line either runs past the
//! margin or is broken into continuation lines. Which of those happens, and
//! where a break may fall, is decided by the [`WrapPolicy`].
//!
//! Breaks inserted here are *soft*: they exist for display only. Every line a
//! break splits ends with [`DisplayLine::continues`] set, and the backend
//! draws the policy's continuation marker in the column reserved for it. No
//! character of the input is ever dropped, so joining the display lines back
//! together (see [`reconstruct`]) always yields the formatter's input.
//!
//! Widths are counted in display columns of *normalized* text (see
//! [`crate::unicode`]); formatting text before normalizing it would measure
//! glyphs that never get printed.

use crate::error::ConfigurationError;
use crate::unicode::{char_width, display_width};

/// How verbatim lines wider than the page are treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapPolicy {
    wrap_long_lines: bool,
    break_anywhere: bool,
    max_line_width: usize,
    continuation_marker: String,
}

impl Default for WrapPolicy {
    fn default() -> Self {
        WrapPolicy {
            wrap_long_lines: true,
            break_anywhere: false,
            max_line_width: 80,
            continuation_marker: "\\".to_string(),
        }
    }
}

impl WrapPolicy {
    /// A policy with the default continuation marker.
    pub fn new(
        wrap_long_lines: bool,
        break_anywhere: bool,
        max_line_width: usize,
    ) -> Result<Self, ConfigurationError> {
        WrapPolicy {
            wrap_long_lines,
            break_anywhere,
            max_line_width,
            ..WrapPolicy::default()
        }
        .validated()
    }

    /// Replace the continuation marker; an empty marker reserves no column.
    pub fn with_continuation_marker<S: Into<String>>(
        self,
        marker: S,
    ) -> Result<Self, ConfigurationError> {
        WrapPolicy {
            continuation_marker: marker.into(),
            ..self
        }
        .validated()
    }

    fn validated(self) -> Result<Self, ConfigurationError> {
        if self.wrap_long_lines {
            if self.max_line_width == 0 {
                return Err(ConfigurationError::ZeroLineWidth);
            }
            let width = self.marker_width();
            if width >= self.max_line_width {
                return Err(ConfigurationError::MarkerTooWide {
                    marker: self.continuation_marker.clone(),
                    width,
                    max_line_width: self.max_line_width,
                });
            }
        }
        Ok(self)
    }

    pub fn wrap_long_lines(&self) -> bool {
        self.wrap_long_lines
    }

    pub fn break_anywhere(&self) -> bool {
        self.break_anywhere
    }

    pub fn max_line_width(&self) -> usize {
        self.max_line_width
    }

    pub fn continuation_marker(&self) -> &str {
        &self.continuation_marker
    }

    pub fn marker_width(&self) -> usize {
        display_width(&self.continuation_marker)
    }

    /// Blocks that may only break at whitespace are kept together on a page.
    pub fn keeps_blocks_together(&self) -> bool {
        !self.break_anywhere
    }
}

/// One printed line of a verbatim block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub text: String,
    /// A soft break follows: the next display line continues this one.
    pub continues: bool,
}

impl DisplayLine {
    pub fn hard<S: Into<String>>(text: S) -> Self {
        DisplayLine {
            text: text.into(),
            continues: false,
        }
    }

    pub fn soft<S: Into<String>>(text: S) -> Self {
        DisplayLine {
            text: text.into(),
            continues: true,
        }
    }

    pub fn width(&self) -> usize {
        display_width(&self.text)
    }
}

/// Format a normalized verbatim payload into display lines.
///
/// An empty payload has no lines at all.
pub fn format_verbatim(text: &str, policy: &WrapPolicy) -> Vec<DisplayLine> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut lines = Vec::new();
    for line in text.split('\n') {
        wrap_line(line, policy, &mut lines);
    }
    lines
}

/// Join display lines back into the text they were formatted from.
pub fn reconstruct(lines: &[DisplayLine]) -> String {
    let mut text = String::new();
    for (i, line) in lines.iter().enumerate() {
        text.push_str(&line.text);
        if !line.continues && i + 1 < lines.len() {
            text.push('\n');
        }
    }
    text
}

fn wrap_line(line: &str, policy: &WrapPolicy, out: &mut Vec<DisplayLine>) {
    let max = policy.max_line_width();
    if !policy.wrap_long_lines() || display_width(line) <= max {
        out.push(DisplayLine::hard(line));
        return;
    }

    // every line that continues loses the marker's columns
    let available = max - policy.marker_width();
    let mut rest = line;
    while display_width(rest) > max {
        let split = find_split(rest, available, policy.break_anywhere());
        let (head, tail) = rest.split_at(split);
        out.push(DisplayLine::soft(head));
        rest = tail;
    }
    out.push(DisplayLine::hard(rest));
}

/// Byte offset at which to break `s` so the head fits in `available` columns.
///
/// `s` is known to be wider than `available`, and the returned head is never
/// empty.
fn find_split(s: &str, available: usize, break_anywhere: bool) -> usize {
    // the furthest column we could break at; zero-width characters stay with
    // the character they modify
    let mut hard = 0;
    let mut width = 0;
    for (i, c) in s.char_indices() {
        let w = char_width(c);
        if width + w > available {
            break;
        }
        width += w;
        hard = i + c.len_utf8();
    }
    debug_assert!(hard > 0 && hard < s.len());

    if break_anywhere {
        return hard;
    }

    // breaking right before whitespace fills the line completely
    if s[hard..].starts_with(char::is_whitespace) {
        return hard;
    }

    // otherwise break after the last whitespace, as long as that doesn't
    // leave a mostly empty line behind
    let boundary = s[..hard]
        .char_indices()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
        .filter(|&b| !s[b..].starts_with(|c: char| char_width(c) == 0))
        .last();
    match boundary {
        Some(b) if display_width(&s[..b]) * 2 >= available => b,
        _ => hard,
    }
}
