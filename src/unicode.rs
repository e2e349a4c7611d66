//! Unicode normalization for print output.
//!
//! Print backends can't be trusted to carry every glyph a source document
//! uses: narrow and fixed-width spaces vanish or render as boxes, and
//! box-drawing characters come out in a fallback font whose width doesn't
//! match the body text. The [`NormalizationTable`] maps those code points to
//! safe substitutes before any width is measured, so wrap decisions are made
//! on the text that is actually printed.
//!
//! Normalizing a string happens in three steps:
//!
//! 1. line endings are unified to `\n`
//! 2. the text is composed to NFC, so a base letter and its combining accent
//!    count as a single column
//! 3. every code point with a registered rule is replaced by its substitute
//!
//! Rules are validated when the table is built so that the result is stable:
//! normalizing already normalized text changes nothing.

use crate::error::ConfigurationError;
use std::collections::HashMap;
use std::fmt;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::{is_nfc, UnicodeNormalization};

/// Largest number of code points a single rule may cover.
pub const MAX_RUN_LEN: u32 = 0x10000;

/// An inclusive run of code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodePointRun {
    pub start: char,
    pub end: char,
}

impl CodePointRun {
    pub fn single(c: char) -> Self {
        CodePointRun { start: c, end: c }
    }

    pub fn new(start: char, end: char) -> Self {
        CodePointRun { start, end }
    }

    /// Number of scalar values in the run (surrogates excluded).
    pub fn len(&self) -> u32 {
        self.chars().count() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn chars(&self) -> impl Iterator<Item = char> {
        (self.start as u32..=self.end as u32).filter_map(char::from_u32)
    }

    /// Parse `U+202F`, `0x202F`, a literal character, or a run of two of
    /// those joined by `..` or `..=`.
    pub fn parse(s: &str) -> Result<CodePointRun, ConfigurationError> {
        let trimmed = s.trim();
        if trimmed.chars().count() > 1 {
            if let Some((start, end)) = trimmed.split_once("..") {
                let end = end.strip_prefix('=').unwrap_or(end);
                return Ok(CodePointRun::new(parse_code_point(start)?, parse_code_point(end)?));
            }
        }
        parse_code_point(s).map(CodePointRun::single)
    }
}

impl fmt::Display for CodePointRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "U+{:04X}", self.start as u32)
        } else {
            write!(f, "U+{:04X}..U+{:04X}", self.start as u32, self.end as u32)
        }
    }
}

/// Parse a single code point written as `U+XXXX`, `0xXXXX` or the literal
/// character itself.
pub fn parse_code_point(s: &str) -> Result<char, ConfigurationError> {
    let trimmed = s.trim();
    let hex = trimmed
        .strip_prefix("U+")
        .or_else(|| trimmed.strip_prefix("u+"))
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"));

    match hex {
        Some(hex) => u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| ConfigurationError::InvalidCodePoint(s.to_string())),
        None => {
            // a literal character; don't trim it, it may well be a space
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(ConfigurationError::InvalidCodePoint(s.to_string())),
            }
        }
    }
}

/// Maps a code point (or run of them) to a printable substitute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionRule {
    pub source: CodePointRun,
    pub replacement: String,
}

impl SubstitutionRule {
    pub fn new<S: Into<String>>(source: CodePointRun, replacement: S) -> Self {
        SubstitutionRule {
            source,
            replacement: replacement.into(),
        }
    }

    pub fn single<S: Into<String>>(c: char, replacement: S) -> Self {
        SubstitutionRule::new(CodePointRun::single(c), replacement)
    }
}

/// Rules for the glyphs print output most often chokes on: tabs, the
/// fixed-width and narrow spaces, and box drawing.
pub fn default_rules() -> Vec<SubstitutionRule> {
    const RUNS: &[(u32, u32, &str)] = &[
        (0x0009, 0x0009, "    "),
        (0x00A0, 0x00A0, " "),
        (0x2000, 0x200A, " "),
        (0x202F, 0x202F, " "),
        (0x205F, 0x205F, " "),
        (0x3000, 0x3000, " "),
        // box drawing: straight lines
        (0x2500, 0x2501, "-"),
        (0x2502, 0x2503, "|"),
        (0x2504, 0x2505, "-"),
        (0x2506, 0x2507, "|"),
        (0x2508, 0x2509, "-"),
        (0x250A, 0x250B, "|"),
        // corners, tees and crosses
        (0x250C, 0x254B, "+"),
        (0x254C, 0x254D, "-"),
        (0x254E, 0x254F, "|"),
        (0x2550, 0x2550, "="),
        (0x2551, 0x2551, "|"),
        (0x2552, 0x2570, "+"),
        (0x2571, 0x2571, "/"),
        (0x2572, 0x2572, "\\"),
        (0x2573, 0x2573, "X"),
        // half lines
        (0x2574, 0x2574, "-"),
        (0x2575, 0x2575, "|"),
        (0x2576, 0x2576, "-"),
        (0x2577, 0x2577, "|"),
        (0x2578, 0x2578, "-"),
        (0x2579, 0x2579, "|"),
        (0x257A, 0x257A, "-"),
        (0x257B, 0x257B, "|"),
        (0x257C, 0x257C, "-"),
        (0x257D, 0x257D, "|"),
        (0x257E, 0x257E, "-"),
        (0x257F, 0x257F, "|"),
    ];

    RUNS.iter()
        .filter_map(|&(start, end, replacement)| {
            Some(SubstitutionRule::new(
                CodePointRun::new(char::from_u32(start)?, char::from_u32(end)?),
                replacement,
            ))
        })
        .collect()
}

/// Validated, read-only substitution table.
#[derive(Debug, Clone, Default)]
pub struct NormalizationTable {
    rules: Vec<SubstitutionRule>,
    lookup: HashMap<char, usize>,
}

impl NormalizationTable {
    /// A table that only unifies line endings and composes to NFC.
    pub fn empty() -> Self {
        NormalizationTable::default()
    }

    /// Build a table from rules, rejecting any code point claimed twice and
    /// any replacement that would make normalization unstable.
    pub fn new(rules: Vec<SubstitutionRule>) -> Result<Self, ConfigurationError> {
        let mut lookup: HashMap<char, usize> = HashMap::new();

        for (i, rule) in rules.iter().enumerate() {
            let run = rule.source;
            if run.is_empty() {
                return Err(ConfigurationError::InvalidSourceRun {
                    rule: i,
                    start: run.start as u32,
                    end: run.end as u32,
                });
            }
            let len = run.end as u32 - run.start as u32 + 1;
            if len > MAX_RUN_LEN {
                return Err(ConfigurationError::SourceRunTooLarge {
                    rule: i,
                    len,
                    max: MAX_RUN_LEN,
                });
            }

            for c in run.chars() {
                if let Some(&first) = lookup.get(&c) {
                    return Err(ConfigurationError::AmbiguousSubstitution {
                        code_point: c as u32,
                        first,
                        second: i,
                    });
                }
                lookup.insert(c, i);
            }
        }

        // replacements are checked once every source is known
        for (i, rule) in rules.iter().enumerate() {
            let invalid = |reason| ConfigurationError::InvalidReplacement {
                rule: i,
                replacement: rule.replacement.clone(),
                reason,
            };

            for c in rule.replacement.chars() {
                if c.is_control() {
                    return Err(invalid("it contains a control character"));
                }
                if is_combining_mark(c) {
                    return Err(invalid("it contains a combining mark"));
                }
                if lookup.contains_key(&c) {
                    return Err(invalid("it contains a code point the table substitutes"));
                }
            }
            if !is_nfc(&rule.replacement) {
                return Err(invalid("it is not in NFC form"));
            }
        }

        log::debug!(
            "built normalization table with {} rules covering {} code points",
            rules.len(),
            lookup.len()
        );

        Ok(NormalizationTable { rules, lookup })
    }

    /// The built-in table from [`default_rules`].
    pub fn with_defaults() -> Result<Self, ConfigurationError> {
        NormalizationTable::new(default_rules())
    }

    pub fn rules(&self) -> &[SubstitutionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// The substitute registered for `c`, if any.
    pub fn lookup(&self, c: char) -> Option<&str> {
        self.lookup
            .get(&c)
            .map(|&i| self.rules[i].replacement.as_str())
    }

    /// Normalize a text payload for measuring and printing.
    pub fn normalize(&self, text: &str) -> String {
        let unified = if text.contains('\r') {
            text.replace("\r\n", "\n").replace('\r', "\n")
        } else {
            text.to_string()
        };

        let mut out = String::with_capacity(unified.len());
        for c in unified.nfc() {
            match self.lookup(c) {
                Some(replacement) => out.push_str(replacement),
                None => out.push(c),
            }
        }
        out
    }
}

/// Columns a normalized character occupies: combining marks ride on the
/// previous character, everything else takes one column.
pub fn char_width(c: char) -> usize {
    if is_combining_mark(c) {
        0
    } else {
        1
    }
}

/// Display width of normalized text.
pub fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}
