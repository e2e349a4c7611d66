//! Document assembly.
//!
//! The assembler walks a parsed tree depth-first, in reading order, turning
//! each leaf into output units and feeding them to the [`PageFitter`]. Page
//! state is cumulative, so one document is always assembled sequentially.
//!
//! Every document opens with a title page synthesized from the project
//! metadata, followed by a blank leaf. The first content page therefore
//! always lands on a right-hand (odd-numbered) page when printed double-sided.
//!
//! Assembly is all-or-nothing: the first malformed node stops it with a
//! [`DocumentStructureError`] naming the node's path.

use crate::config::Settings;
use crate::document::{Document, DocumentNode, NodePath};
use crate::error::{BlockOverflowWarning, BuildError, DocumentStructureError};
use crate::pagination::{
    OutputUnit, Page, PageFitter, PageKind, TextRole, HEADING_PADDING, PARAGRAPH_PADDING,
};
use crate::unicode::{char_width, display_width, NormalizationTable};
use crate::verbatim::format_verbatim;

/// Placeholder height for images that don't say how tall they are.
pub const DEFAULT_IMAGE_HEIGHT: usize = 8;

/// Document metadata shown on the title page and in running headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub author: Option<String>,
    pub date: String,
    pub language: String,
}

impl Metadata {
    fn with_overrides(
        &self,
        title: Option<&String>,
        author: Option<&String>,
        date: Option<&String>,
    ) -> Metadata {
        Metadata {
            title: title.cloned().unwrap_or_else(|| self.title.clone()),
            author: author.cloned().or_else(|| self.author.clone()),
            date: date.cloned().unwrap_or_else(|| self.date.clone()),
            language: self.language.clone(),
        }
    }

    /// Fill the `{title}`, `{author}` and `{date}` placeholders.
    pub fn expand(&self, template: &str) -> String {
        template
            .replace("{title}", &self.title)
            .replace("{author}", self.author.as_deref().unwrap_or(""))
            .replace("{date}", &self.date)
    }
}

/// Visits the pages of a [`RenderedDocument`] in order.
pub trait PageVisitor {
    type Error;

    fn begin_page(&mut self, index: usize, page: &Page) -> Result<(), Self::Error>;

    fn unit(&mut self, page_index: usize, unit: &OutputUnit) -> Result<(), Self::Error>;

    fn end_page(&mut self, index: usize, page: &Page) -> Result<(), Self::Error> {
        let _ = (index, page);
        Ok(())
    }
}

/// The paginated result of assembling one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    metadata: Metadata,
    pages: Vec<Page>,
    warnings: Vec<BlockOverflowWarning>,
    capacity: usize,
    continuation_marker: String,
}

impl RenderedDocument {
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// All pages, the title page first.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn title_page(&self) -> &Page {
        &self.pages[0]
    }

    pub fn content_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().filter(|p| p.kind() == PageKind::Content)
    }

    pub fn first_content_page_index(&self) -> Option<usize> {
        self.pages.iter().position(|p| p.kind() == PageKind::Content)
    }

    pub fn warnings(&self) -> &[BlockOverflowWarning] {
        &self.warnings
    }

    /// Lines per physical page.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn continuation_marker(&self) -> &str {
        &self.continuation_marker
    }

    /// Pages once overflowing pages are spread over as many sheets as they need.
    pub fn physical_page_count(&self) -> usize {
        self.pages.iter().map(Page::physical_pages).sum()
    }

    /// Visit every unit of every page exactly once, in order.
    pub fn visit<V: PageVisitor>(&self, visitor: &mut V) -> Result<(), V::Error> {
        for (index, page) in self.pages.iter().enumerate() {
            visitor.begin_page(index, page)?;
            for unit in page.units() {
                visitor.unit(index, unit)?;
            }
            visitor.end_page(index, page)?;
        }
        Ok(())
    }
}

/// Turns document trees into paginated documents under fixed settings.
pub struct Assembler<'a> {
    settings: &'a Settings,
}

impl<'a> Assembler<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Assembler { settings }
    }

    fn table(&self) -> &NormalizationTable {
        &self.settings.table
    }

    /// Assemble a whole document.
    pub fn assemble(&self, document: &Document) -> Result<RenderedDocument, BuildError> {
        let metadata = self.resolve_metadata(document)?;
        let capacity = self.settings.page_height_lines;

        let mut fitter = PageFitter::new(capacity, PageKind::Title)?;
        fitter.place(self.title_unit(&metadata));
        fitter.break_page(PageKind::Blank);
        fitter.place(OutputUnit::blank());
        fitter.break_page(PageKind::Content);

        self.walk(&document.nodes, &NodePath::root(), &mut fitter)?;

        let (pages, warnings) = fitter.finish();
        log::debug!(
            "assembled '{}': {} pages, {} overflow warnings",
            metadata.title,
            pages.len(),
            warnings.len()
        );

        Ok(RenderedDocument {
            metadata,
            pages,
            warnings,
            capacity,
            continuation_marker: self.settings.policy.continuation_marker().to_string(),
        })
    }

    /// Apply the overrides of a top-level title page node, if there is one.
    fn resolve_metadata(&self, document: &Document) -> Result<Metadata, DocumentStructureError> {
        let root = NodePath::root();
        let mut title_page: Option<&DocumentNode> = None;
        for (i, node) in document.nodes.iter().enumerate() {
            if let DocumentNode::TitlePage { .. } = node {
                if title_page.is_some() {
                    return Err(DocumentStructureError::DuplicateTitlePage {
                        path: root.child(i, node),
                    });
                }
                title_page = Some(node);
            }
        }

        Ok(match title_page {
            Some(DocumentNode::TitlePage {
                title,
                author,
                date,
            }) => self
                .settings
                .metadata
                .with_overrides(title.as_ref(), author.as_ref(), date.as_ref()),
            _ => self.settings.metadata.clone(),
        })
    }

    fn title_unit(&self, metadata: &Metadata) -> OutputUnit {
        let expanded = metadata.expand(&self.settings.title_page_template);
        let normalized = self.table().normalize(&expanded);
        OutputUnit::title(normalized.lines().map(str::to_string).collect())
    }

    fn walk(
        &self,
        nodes: &[DocumentNode],
        parent: &NodePath,
        fitter: &mut PageFitter,
    ) -> Result<(), DocumentStructureError> {
        for (i, node) in nodes.iter().enumerate() {
            let path = parent.child(i, node);
            match node {
                DocumentNode::Heading {
                    level,
                    text,
                    children,
                } => {
                    if !(1..=6).contains(level) {
                        return Err(DocumentStructureError::InvalidHeadingLevel {
                            path,
                            level: *level,
                        });
                    }
                    let Some(text) = text else {
                        return Err(DocumentStructureError::MissingPayload { path });
                    };
                    let lines = self.prose_lines(text);
                    fitter.place(OutputUnit::text(
                        TextRole::Heading(*level),
                        lines,
                        HEADING_PADDING,
                        Some(path.clone()),
                    ));
                    self.walk(children, &path, fitter)?;
                }
                DocumentNode::Paragraph { text } => {
                    let Some(text) = text else {
                        return Err(DocumentStructureError::MissingPayload { path });
                    };
                    let lines = self.prose_lines(text);
                    if !lines.is_empty() {
                        fitter.place(OutputUnit::text(
                            TextRole::Body,
                            lines,
                            PARAGRAPH_PADDING,
                            Some(path),
                        ));
                    }
                }
                DocumentNode::VerbatimBlock { language, code } => {
                    let Some(code) = code else {
                        return Err(DocumentStructureError::MissingPayload { path });
                    };
                    let normalized = self.table().normalize(code);
                    // the closing newline belongs to the fence, not the code
                    let body = normalized.strip_suffix('\n').unwrap_or(&normalized);
                    let lines = format_verbatim(body, &self.settings.policy);
                    fitter.place(OutputUnit::verbatim(
                        language.clone(),
                        lines,
                        self.settings.policy.keeps_blocks_together(),
                        Some(path),
                    ));
                }
                DocumentNode::Image {
                    source,
                    alt,
                    height_lines,
                } => {
                    let Some(source) = source else {
                        return Err(DocumentStructureError::MissingPayload { path });
                    };
                    let height = height_lines.unwrap_or(DEFAULT_IMAGE_HEIGHT).max(1);
                    let alt = alt.as_deref().map(|a| self.table().normalize(a));
                    fitter.place(OutputUnit::image(source.clone(), alt, height, Some(path)));
                }
                DocumentNode::TitlePage { .. } => {
                    // top-level title pages were folded into the metadata
                    if path.depth() > 1 {
                        return Err(DocumentStructureError::NestedTitlePage { path });
                    }
                }
                DocumentNode::Unknown => {
                    return Err(DocumentStructureError::UnknownKind { path });
                }
            }
        }
        Ok(())
    }

    fn prose_lines(&self, text: &str) -> Vec<String> {
        wrap_prose(&self.table().normalize(text), self.settings.text_width)
    }
}

/// Reflow prose to `width` columns. Whitespace is collapsed; words wider than
/// a line are cut.
pub fn wrap_prose(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_width = 0;

    for word in text.split_whitespace() {
        let mut word = word;
        let mut word_width = display_width(word);

        if line_width > 0 && line_width + 1 + word_width <= width {
            line.push(' ');
            line.push_str(word);
            line_width += 1 + word_width;
            continue;
        }
        if line_width > 0 {
            lines.push(std::mem::take(&mut line));
            line_width = 0;
        }

        while word_width > width {
            let cut = cut_at_width(word, width);
            lines.push(word[..cut].to_string());
            word = &word[cut..];
            word_width = display_width(word);
        }
        line.push_str(word);
        line_width = word_width;
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Byte offset of the longest prefix of `s` at most `width` columns wide.
fn cut_at_width(s: &str, width: usize) -> usize {
    let mut used = 0;
    let mut cut = 0;
    for (i, c) in s.char_indices() {
        let w = char_width(c);
        if used + w > width {
            break;
        }
        used += w;
        cut = i + c.len_utf8();
    }
    cut.max(s.chars().next().map_or(0, char::len_utf8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::pagination::{UnitContent, FRAME_PADDING};

    fn settings(page_height_lines: usize) -> Settings {
        let mut config = Configuration::default();
        config.project.title = "Handbook".to_string();
        config.project.author = Some("A. Author".to_string());
        config.project.date = Some("2025-01-31".to_string());
        config.layout.page_height_lines = page_height_lines;
        config.layout.max_line_width = 20;
        config.layout.text_width = 30;
        config.settings().unwrap()
    }

    fn sample() -> Document {
        Document::new(vec![
            DocumentNode::heading(
                1,
                "Introduction",
                vec![
                    DocumentNode::paragraph(
                        "The pipeline turns parsed trees into pages, one unit at a time.",
                    ),
                    DocumentNode::verbatim("val a = 1\nval b = 2\n"),
                ],
            ),
            DocumentNode::heading(
                1,
                "Signals",
                vec![
                    DocumentNode::paragraph("A signal\u{202F}carries values."),
                    DocumentNode::verbatim(
                        "\u{250C}\u{2500}\u{2510}\n\u{2514}\u{2500}\u{2518}\n",
                    ),
                    DocumentNode::image("wave.png", Some(4)),
                ],
            ),
        ])
    }

    #[test]
    fn title_and_blank_pages_come_first() {
        let settings = settings(20);
        let doc = Assembler::new(&settings).assemble(&sample()).unwrap();

        let pages = doc.pages();
        assert_eq!(pages[0].kind(), PageKind::Title);
        assert_eq!(pages[1].kind(), PageKind::Blank);
        assert_eq!(doc.first_content_page_index(), Some(2));

        let UnitContent::Title { lines } = doc.title_page().units()[0].content() else {
            panic!("title page holds the title block");
        };
        assert_eq!(lines[0], "Handbook");
        assert!(lines.contains(&"A. Author".to_string()));
        assert!(lines.contains(&"2025-01-31".to_string()));
    }

    #[test]
    fn empty_document_still_gets_its_front_matter() {
        let settings = settings(20);
        let doc = Assembler::new(&settings)
            .assemble(&Document::default())
            .unwrap();
        assert_eq!(doc.pages().len(), 2);
        assert_eq!(doc.first_content_page_index(), None);
    }

    #[test]
    fn units_follow_reading_order() {
        let settings = settings(100);
        let doc = Assembler::new(&settings).assemble(&sample()).unwrap();
        let kinds: Vec<&str> = doc
            .content_pages()
            .flat_map(|p| p.units())
            .map(|u| match u.content() {
                UnitContent::Text {
                    role: TextRole::Heading(_),
                    ..
                } => "heading",
                UnitContent::Text { .. } => "paragraph",
                UnitContent::Verbatim { .. } => "verbatim",
                UnitContent::Image { .. } => "image",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "heading",
                "paragraph",
                "verbatim",
                "heading",
                "paragraph",
                "verbatim",
                "image"
            ]
        );
    }

    #[test]
    fn payloads_are_normalized_before_layout() {
        let settings = settings(100);
        let doc = Assembler::new(&settings).assemble(&sample()).unwrap();
        let units: Vec<&OutputUnit> = doc.content_pages().flat_map(|p| p.units()).collect();

        let UnitContent::Text { lines, .. } = units[4].content() else {
            panic!("expected paragraph");
        };
        assert_eq!(lines, &vec!["A signal carries values.".to_string()]);

        let UnitContent::Verbatim { lines, .. } = units[5].content() else {
            panic!("expected verbatim block");
        };
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["+-+", "+-+"]);
        assert_eq!(units[5].height(), 2 + FRAME_PADDING);
    }

    #[test]
    fn empty_verbatim_block_takes_only_its_frame() {
        let settings = settings(100);
        let doc = Assembler::new(&settings)
            .assemble(&Document::new(vec![DocumentNode::verbatim("")]))
            .unwrap();
        let page = doc.content_pages().next().unwrap();
        assert_eq!(page.consumed(), FRAME_PADDING);
        let UnitContent::Verbatim { lines, .. } = page.units()[0].content() else {
            panic!("expected verbatim block");
        };
        assert!(lines.is_empty());
    }

    #[test]
    fn level_one_headings_become_running_chapters() {
        let settings = settings(8);
        let doc = Assembler::new(&settings).assemble(&sample()).unwrap();
        let chapters: Vec<Option<&str>> = doc.content_pages().map(|p| p.chapter()).collect();
        assert_eq!(chapters.first(), Some(&Some("Introduction")));
        assert_eq!(chapters.last(), Some(&Some("Signals")));
    }

    #[test]
    fn assembly_is_deterministic() {
        let settings = settings(7);
        let assembler = Assembler::new(&settings);
        let first = assembler.assemble(&sample()).unwrap();
        let second = assembler.assemble(&sample()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_nodes_stop_assembly_with_their_path() {
        let settings = settings(20);
        let assembler = Assembler::new(&settings);

        let doc = Document::new(vec![DocumentNode::heading(
            1,
            "Intro",
            vec![
                DocumentNode::paragraph("fine"),
                DocumentNode::VerbatimBlock {
                    language: Some("scala".to_string()),
                    code: None,
                },
            ],
        )]);
        let err = assembler.assemble(&doc).unwrap_err();
        let BuildError::Structure(err) = err else {
            panic!("expected a structure error");
        };
        assert!(matches!(err, DocumentStructureError::MissingPayload { .. }));
        assert_eq!(err.path().to_string(), "document/heading[0]/verbatim_block[1]");

        let doc = Document::new(vec![
            DocumentNode::paragraph("fine"),
            DocumentNode::Unknown,
        ]);
        let err = assembler.assemble(&doc).unwrap_err();
        assert!(
            matches!(err, BuildError::Structure(DocumentStructureError::UnknownKind { ref path }) if path.to_string() == "document/unknown[1]")
        );
    }

    #[test]
    fn known_nodes_without_payload_are_rejected_with_their_path() {
        let settings = settings(20);
        let assembler = Assembler::new(&settings);
        let cases = [
            (
                r#"{"nodes": [{"kind": "paragraph"}]}"#,
                "document/paragraph[0]",
            ),
            (
                r#"{"nodes": [{"kind": "heading", "text": "Intro", "children": [
                    {"kind": "paragraph", "text": "fine"},
                    {"kind": "heading", "level": 2}
                ]}]}"#,
                "document/heading[0]/heading[1]",
            ),
            (
                r#"{"nodes": [{"kind": "image", "alt": "wave"}]}"#,
                "document/image[0]",
            ),
        ];
        for (json, expected) in cases {
            let doc = Document::from_json_str(json, "tree.json").unwrap();
            let BuildError::Structure(err) = assembler.assemble(&doc).unwrap_err() else {
                panic!("expected a structure error for {expected}");
            };
            assert!(matches!(err, DocumentStructureError::MissingPayload { .. }));
            assert_eq!(err.path().to_string(), expected);
        }
    }

    #[test]
    fn title_page_nodes_override_metadata() {
        let settings = settings(20);
        let assembler = Assembler::new(&settings);
        let doc = Document::new(vec![DocumentNode::TitlePage {
            title: Some("Override".to_string()),
            author: None,
            date: None,
        }]);
        let rendered = assembler.assemble(&doc).unwrap();
        assert_eq!(rendered.metadata().title, "Override");
        assert_eq!(rendered.metadata().author.as_deref(), Some("A. Author"));

        let nested = Document::new(vec![DocumentNode::heading(
            1,
            "Intro",
            vec![DocumentNode::TitlePage {
                title: None,
                author: None,
                date: None,
            }],
        )]);
        assert!(matches!(
            assembler.assemble(&nested).unwrap_err(),
            BuildError::Structure(DocumentStructureError::NestedTitlePage { .. })
        ));

        let twice = Document::new(vec![
            DocumentNode::TitlePage {
                title: None,
                author: None,
                date: None,
            },
            DocumentNode::TitlePage {
                title: None,
                author: None,
                date: None,
            },
        ]);
        assert!(matches!(
            assembler.assemble(&twice).unwrap_err(),
            BuildError::Structure(DocumentStructureError::DuplicateTitlePage { .. })
        ));
    }

    #[test]
    fn visitor_sees_every_unit_once_in_order() {
        struct Collect(Vec<(usize, usize)>);
        impl PageVisitor for Collect {
            type Error = ();
            fn begin_page(&mut self, _: usize, _: &Page) -> Result<(), ()> {
                Ok(())
            }
            fn unit(&mut self, page_index: usize, unit: &OutputUnit) -> Result<(), ()> {
                self.0.push((page_index, unit.height()));
                Ok(())
            }
        }

        let settings = settings(6);
        let doc = Assembler::new(&settings).assemble(&sample()).unwrap();
        let mut visitor = Collect(Vec::new());
        doc.visit(&mut visitor).unwrap();

        let expected: Vec<(usize, usize)> = doc
            .pages()
            .iter()
            .enumerate()
            .flat_map(|(i, p)| p.units().iter().map(move |u| (i, u.height())))
            .collect();
        assert_eq!(visitor.0, expected);
    }

    #[test]
    fn prose_is_reflowed_and_long_words_cut() {
        assert_eq!(
            wrap_prose("one  two\nthree   four five", 9),
            vec!["one two", "three", "four five"]
        );
        assert_eq!(
            wrap_prose("a reallylongword b", 6),
            vec!["a", "really", "longwo", "rd b"]
        );
        assert!(wrap_prose("   ", 10).is_empty());
    }
}
