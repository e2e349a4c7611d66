//! Error types for the document pipeline.
//!
//! Configuration and structure errors are fatal and abort a build before any
//! output is produced. Overflow is not an error at all: it is recorded as a
//! [`BlockOverflowWarning`] on the assembled document. Render errors only fail
//! the backend they came from.

use crate::document::NodePath;
use std::fmt;
use std::io;
use thiserror::Error;

/// Invalid wrap policy, layout, or substitution table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("code point U+{code_point:04X} is claimed by substitution rules {first} and {second}")]
    AmbiguousSubstitution {
        code_point: u32,
        first: usize,
        second: usize,
    },

    #[error("substitution rule {rule} has an empty or reversed source run U+{start:04X}..U+{end:04X}")]
    InvalidSourceRun { rule: usize, start: u32, end: u32 },

    #[error("substitution rule {rule} covers {len} code points (at most {max} are allowed)")]
    SourceRunTooLarge { rule: usize, len: u32, max: u32 },

    #[error("substitution rule {rule} has an unusable replacement {replacement:?}: {reason}")]
    InvalidReplacement {
        rule: usize,
        replacement: String,
        reason: &'static str,
    },

    #[error("could not parse code point {0:?} (expected `U+XXXX`, `0xXXXX` or a single character)")]
    InvalidCodePoint(String),

    #[error("max_line_width must be greater than zero when wrap_long_lines is enabled")]
    ZeroLineWidth,

    #[error("continuation marker {marker:?} is {width} columns wide, which leaves no room in a {max_line_width}-column line")]
    MarkerTooWide {
        marker: String,
        width: usize,
        max_line_width: usize,
    },

    #[error("{field} must be greater than zero")]
    ZeroDimension { field: &'static str },

    #[error("invalid exclude pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// A malformed node in the parsed document tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentStructureError {
    #[error("unknown node kind at {path}")]
    UnknownKind { path: NodePath },

    #[error("node {path} has no payload")]
    MissingPayload { path: NodePath },

    #[error("title page at {path} must be a top-level node")]
    NestedTitlePage { path: NodePath },

    #[error("title page at {path} duplicates an earlier title page")]
    DuplicateTitlePage { path: NodePath },

    #[error("heading at {path} has level {level} (expected 1 to 6)")]
    InvalidHeadingLevel { path: NodePath, level: u8 },
}

impl DocumentStructureError {
    /// The path of the offending node.
    pub fn path(&self) -> &NodePath {
        match self {
            DocumentStructureError::UnknownKind { path }
            | DocumentStructureError::MissingPayload { path }
            | DocumentStructureError::NestedTitlePage { path }
            | DocumentStructureError::DuplicateTitlePage { path }
            | DocumentStructureError::InvalidHeadingLevel { path, .. } => path,
        }
    }
}

/// A non-breakable unit taller than a whole page. It is placed anyway, on a
/// page of its own that spans several physical pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOverflowWarning {
    /// Index of the page the unit was placed on.
    pub page_index: usize,
    /// Height of the unit in lines.
    pub height: usize,
    /// Page capacity in lines.
    pub capacity: usize,
    /// Node the unit was produced from, if any.
    pub node: Option<NodePath>,
}

impl BlockOverflowWarning {
    /// Number of physical pages the unit spans.
    pub fn spans(&self) -> usize {
        self.height.div_ceil(self.capacity.max(1))
    }
}

impl fmt::Display for BlockOverflowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block of {} lines exceeds the {}-line page and spans {} pages (page {}",
            self.height,
            self.capacity,
            self.spans(),
            self.page_index
        )?;
        if let Some(node) = &self.node {
            write!(f, ", node {node}")?;
        }
        write!(f, ")")
    }
}

/// Backend serialization failure.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to write page {page_index}: {source}")]
    Page {
        page_index: usize,
        #[source]
        source: io::Error,
    },

    #[error("failed to write document: {0}")]
    Io(#[from] io::Error),
}

impl RenderError {
    /// Index of the page that failed to render, when the failure belongs to one.
    pub fn page_index(&self) -> Option<usize> {
        match self {
            RenderError::Page { page_index, .. } => Some(*page_index),
            RenderError::Io(_) => None,
        }
    }
}

/// Everything that can stop a document from being assembled.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("document structure error: {0}")]
    Structure(#[from] DocumentStructureError),

    #[error("failed to parse document tree {path}: {source}")]
    Tree {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}
