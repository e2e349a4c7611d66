//! The parsed document tree handed over by the markup front-end.
//!
//! Trees arrive as JSON, one file per document. Nodes are tagged by `kind`;
//! headings are the only container and own the section they open. Nodes of a
//! kind this crate doesn't know deserialize to [`DocumentNode::Unknown`] so
//! that assembly can reject them with a proper [`NodePath`] instead of failing
//! somewhere inside the JSON parser.

use crate::error::BuildError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

fn default_heading_level() -> u8 {
    1
}

/// A node of the parsed document tree.
///
/// Payload fields are optional at this level: a known node missing its
/// payload is a structure error found during assembly, reported with its path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentNode {
    Heading {
        #[serde(default = "default_heading_level")]
        level: u8,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        children: Vec<DocumentNode>,
    },
    Paragraph {
        #[serde(default)]
        text: Option<String>,
    },
    VerbatimBlock {
        /// Kept for reference only, never interpreted.
        #[serde(default)]
        language: Option<String>,
        #[serde(default)]
        code: Option<String>,
    },
    Image {
        #[serde(default)]
        source: Option<String>,
        #[serde(default)]
        alt: Option<String>,
        /// Placeholder height in lines
        #[serde(default)]
        height_lines: Option<usize>,
    },
    TitlePage {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        author: Option<String>,
        #[serde(default)]
        date: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl DocumentNode {
    pub fn heading<S: Into<String>>(level: u8, text: S, children: Vec<DocumentNode>) -> Self {
        DocumentNode::Heading {
            level,
            text: Some(text.into()),
            children,
        }
    }

    pub fn paragraph<S: Into<String>>(text: S) -> Self {
        DocumentNode::Paragraph {
            text: Some(text.into()),
        }
    }

    pub fn verbatim<S: Into<String>>(code: S) -> Self {
        DocumentNode::VerbatimBlock {
            language: None,
            code: Some(code.into()),
        }
    }

    pub fn image<S: Into<String>>(source: S, height_lines: Option<usize>) -> Self {
        DocumentNode::Image {
            source: Some(source.into()),
            alt: None,
            height_lines,
        }
    }

    /// The `kind` tag this node is serialized with.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DocumentNode::Heading { .. } => "heading",
            DocumentNode::Paragraph { .. } => "paragraph",
            DocumentNode::VerbatimBlock { .. } => "verbatim_block",
            DocumentNode::Image { .. } => "image",
            DocumentNode::TitlePage { .. } => "title_page",
            DocumentNode::Unknown => "unknown",
        }
    }

    /// Child nodes, empty for leaf kinds.
    pub fn children(&self) -> &[DocumentNode] {
        match self {
            DocumentNode::Heading { children, .. } => children,
            _ => &[],
        }
    }
}

/// The root of a parsed tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub nodes: Vec<DocumentNode>,
}

impl Document {
    pub fn new(nodes: Vec<DocumentNode>) -> Self {
        Document { nodes }
    }

    /// Parse a tree from its JSON form. `origin` names the input in errors.
    pub fn from_json_str(json: &str, origin: &str) -> Result<Document, BuildError> {
        serde_json::from_str(json).map_err(|source| BuildError::Tree {
            path: origin.to_string(),
            source,
        })
    }

    /// Load a tree from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Document, BuildError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| BuildError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Document::from_json_str(&contents, &path.display().to_string())
    }
}

/// One step of a [`NodePath`]: the child index and the kind found there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub index: usize,
    pub kind: &'static str,
}

/// Location of a node in the tree, from the root down.
///
/// Displays as `document/heading[0]/verbatim_block[2]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    pub fn root() -> Self {
        NodePath(Vec::new())
    }

    /// The path of the `index`th child of this node.
    pub fn child(&self, index: usize, node: &DocumentNode) -> NodePath {
        let mut segments = self.0.clone();
        segments.push(PathSegment {
            index,
            kind: node.kind_name(),
        });
        NodePath(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Number of steps from the root; top-level nodes have depth 1.
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document")?;
        for segment in &self.0 {
            write!(f, "/{}[{}]", segment.kind, segment.index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_parse_tree_from_json() {
        let json = r#"{
            "nodes": [
                { "kind": "title_page", "title": "Handbook" },
                { "kind": "heading", "level": 1, "text": "Intro", "children": [
                    { "kind": "paragraph", "text": "Hello." },
                    { "kind": "verbatim_block", "language": "scala", "code": "val x = 1\n" },
                    { "kind": "image", "source": "wave.png", "height_lines": 6 }
                ] }
            ]
        }"#;
        let doc = Document::from_json_str(json, "test.json").expect("can parse tree");
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.nodes[1].children().len(), 3);
        assert_eq!(
            doc.nodes[1].children()[1],
            DocumentNode::VerbatimBlock {
                language: Some("scala".to_string()),
                code: Some("val x = 1\n".to_string()),
            }
        );
    }

    #[test]
    fn unknown_kinds_and_null_payloads_survive_parsing() {
        let json = r#"{ "nodes": [
            { "kind": "table", "rows": [[1, 2]] },
            { "kind": "verbatim_block", "code": null }
        ] }"#;
        let doc = Document::from_json_str(json, "test.json").expect("can parse tree");
        assert_eq!(doc.nodes[0], DocumentNode::Unknown);
        assert_eq!(
            doc.nodes[1],
            DocumentNode::VerbatimBlock {
                language: None,
                code: None
            }
        );
    }

    #[test]
    fn nodes_missing_their_payload_still_parse() {
        let json = r#"{ "nodes": [
            { "kind": "paragraph" },
            { "kind": "heading", "level": 2 },
            { "kind": "image", "alt": "wave" }
        ] }"#;
        let doc = Document::from_json_str(json, "test.json").expect("can parse tree");
        assert_eq!(doc.nodes[0], DocumentNode::Paragraph { text: None });
        assert!(matches!(doc.nodes[1], DocumentNode::Heading { text: None, .. }));
        assert!(matches!(doc.nodes[2], DocumentNode::Image { source: None, .. }));
    }

    #[test]
    fn invalid_json_names_its_origin() {
        let err = Document::from_json_str("{ nodes: ", "broken.json").unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn node_paths_display_kinds_and_indices() {
        let heading = DocumentNode::heading(1, "Intro", vec![]);
        let code = DocumentNode::verbatim("");
        let path = NodePath::root().child(0, &heading).child(2, &code);
        assert_eq!(path.to_string(), "document/heading[0]/verbatim_block[2]");
        assert_eq!(path.depth(), 2);
        assert_eq!(NodePath::root().to_string(), "document");
    }
}
