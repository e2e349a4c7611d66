//! Verbatim line length analysis.
//!
//! Measures the code blocks of a set of documents against the configured wrap
//! policy, so that `doc-book check` can tell how much of the code would be
//! broken onto continuation lines before anything is rendered. Lines are
//! measured after normalization, in display columns, exactly as the formatter
//! sees them.
//!
//! The 95th percentile is reported next to the maximum because a handful of
//! very long lines (generated tables, long URLs) shouldn't drive the choice of
//! `max_line_width` for the whole book.

use crate::config::Settings;
use crate::document::{Document, DocumentNode, NodePath};
use crate::unicode::display_width;
use std::path::{Path, PathBuf};

/// Where the longest verbatim line was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongestLine {
    pub length: usize,
    pub tree: PathBuf,
    pub node: NodePath,
    /// 1-indexed line within the block
    pub line_number: usize,
}

/// Statistics about verbatim line lengths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineStats {
    pub total_lines: usize,
    pub lines_that_wrap: usize,
    pub longest_line: Option<LongestLine>,
    pub percentile_95: usize,
}

impl LineStats {
    /// Percentage of lines wider than `max_line_width`; 0.0 with no lines.
    pub fn wrap_percentage(&self) -> f64 {
        if self.total_lines == 0 {
            0.0
        } else {
            (self.lines_that_wrap as f64 / self.total_lines as f64) * 100.0
        }
    }

    pub fn longest_line_length(&self) -> usize {
        self.longest_line.as_ref().map_or(0, |l| l.length)
    }
}

struct Collector<'a> {
    settings: &'a Settings,
    tree: &'a Path,
    lengths: Vec<usize>,
    lines_that_wrap: usize,
    longest: Option<LongestLine>,
}

impl Collector<'_> {
    fn visit(&mut self, nodes: &[DocumentNode], parent: &NodePath) {
        for (i, node) in nodes.iter().enumerate() {
            let path = parent.child(i, node);
            match node {
                DocumentNode::VerbatimBlock {
                    code: Some(code), ..
                } => self.measure(code, &path),
                DocumentNode::Heading { children, .. } => self.visit(children, &path),
                _ => {}
            }
        }
    }

    fn measure(&mut self, code: &str, path: &NodePath) {
        let normalized = self.settings.table.normalize(code);
        let body = normalized.strip_suffix('\n').unwrap_or(&normalized);
        if body.is_empty() {
            return;
        }
        let max = self.settings.policy.max_line_width();

        for (line_number, line) in body.split('\n').enumerate() {
            let length = display_width(line);
            self.lengths.push(length);
            if length > max {
                self.lines_that_wrap += 1;
            }
            if length > self.longest.as_ref().map_or(0, |l| l.length) {
                self.longest = Some(LongestLine {
                    length,
                    tree: self.tree.to_path_buf(),
                    node: path.clone(),
                    line_number: line_number + 1,
                });
            }
        }
    }
}

/// Measure every verbatim line of the given documents.
pub fn analyze_line_lengths(documents: &[(PathBuf, Document)], settings: &Settings) -> LineStats {
    let mut lengths = Vec::new();
    let mut lines_that_wrap = 0;
    let mut longest: Option<LongestLine> = None;

    for (tree, document) in documents {
        let mut collector = Collector {
            settings,
            tree,
            lengths: Vec::new(),
            lines_that_wrap: 0,
            longest: None,
        };
        collector.visit(&document.nodes, &NodePath::root());

        lengths.append(&mut collector.lengths);
        lines_that_wrap += collector.lines_that_wrap;
        if let Some(candidate) = collector.longest {
            if candidate.length > longest.as_ref().map_or(0, |l| l.length) {
                longest = Some(candidate);
            }
        }
    }

    lengths.sort_unstable();
    let percentile_95_idx = (lengths.len() as f64 * 0.95) as usize;
    let percentile_95 = lengths
        .get(percentile_95_idx.min(lengths.len().saturating_sub(1)))
        .copied()
        .unwrap_or(0);

    LineStats {
        total_lines: lengths.len(),
        lines_that_wrap,
        longest_line: longest,
        percentile_95,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;

    fn settings(max_line_width: usize) -> Settings {
        let mut config = Configuration::default();
        config.layout.max_line_width = max_line_width;
        config.settings().unwrap()
    }

    #[test]
    fn no_code_means_no_wrapping() {
        let documents = vec![(
            PathBuf::from("prose.json"),
            Document::new(vec![DocumentNode::paragraph("just words")]),
        )];
        let stats = analyze_line_lengths(&documents, &settings(20));
        assert_eq!(stats, LineStats::default());
        assert_eq!(stats.wrap_percentage(), 0.0);
    }

    #[test]
    fn measures_nested_code_blocks() {
        let documents = vec![
            (
                PathBuf::from("a.json"),
                Document::new(vec![DocumentNode::verbatim("short\nalso short\n")]),
            ),
            (
                PathBuf::from("b.json"),
                Document::new(vec![DocumentNode::heading(
                    1,
                    "Code",
                    vec![
                        DocumentNode::paragraph("see below"),
                        DocumentNode::verbatim("ok\nfunction computeTotal(x, y) { return x + y }"),
                    ],
                )]),
            ),
        ];
        let stats = analyze_line_lengths(&documents, &settings(20));
        assert_eq!(stats.total_lines, 4);
        assert_eq!(stats.lines_that_wrap, 1);
        assert_eq!(stats.wrap_percentage(), 25.0);

        let longest = stats.longest_line.unwrap();
        assert_eq!(longest.length, 44);
        assert_eq!(longest.tree, PathBuf::from("b.json"));
        assert_eq!(longest.line_number, 2);
        assert_eq!(longest.node.to_string(), "document/heading[0]/verbatim_block[1]");
        assert_eq!(stats.percentile_95, 44);
    }

    #[test]
    fn lines_are_measured_after_normalization() {
        // a tab becomes four spaces, combining marks take no column
        let documents = vec![(
            PathBuf::from("t.json"),
            Document::new(vec![DocumentNode::verbatim("\tx\ne\u{301}\u{301}")]),
        )];
        let stats = analyze_line_lengths(&documents, &settings(80));
        assert_eq!(stats.longest_line_length(), 5);
        assert_eq!(stats.percentile_95, 5);
    }
}
