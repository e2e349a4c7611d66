//! Page-fit estimation.
//!
//! Pages are filled top to bottom with [`OutputUnit`]s, each measured in line
//! units. A page is *Open* until a unit no longer fits, then *Full*. What
//! happens to a unit that doesn't fit depends on whether it may be split:
//!
//! - breakable units (prose, and code under a break-anywhere policy) are cut
//!   so that the part that fits stays and the rest opens the next page
//! - non-breakable units (headings, images, code kept together) move to the
//!   next page whole
//! - a non-breakable unit taller than a page can't be helped by moving it, so
//!   it gets a page of its own spanning several physical pages and a
//!   [`BlockOverflowWarning`] is recorded
//!
//! Every page's consumed height stays within its capacity, except for pages
//! holding exactly one such oversized unit.

use crate::document::NodePath;
use crate::error::{BlockOverflowWarning, ConfigurationError};
use crate::verbatim::DisplayLine;

/// Blank lines framing a verbatim block. An empty block still takes this much.
pub const FRAME_PADDING: usize = 1;

/// Blank lines above a heading.
pub const HEADING_PADDING: usize = 1;

/// Blank lines above a paragraph.
pub const PARAGRAPH_PADDING: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    Heading(u8),
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitContent {
    /// The synthesized title block
    Title { lines: Vec<String> },
    /// An intentionally empty leaf
    Blank,
    Text {
        role: TextRole,
        lines: Vec<String>,
    },
    Verbatim {
        language: Option<String>,
        lines: Vec<DisplayLine>,
    },
    Image {
        source: String,
        alt: Option<String>,
        height: usize,
    },
}

/// The atomic thing placed on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputUnit {
    content: UnitContent,
    padding: usize,
    breakable: bool,
    continued: bool,
    node: Option<NodePath>,
}

impl OutputUnit {
    fn new(content: UnitContent, padding: usize, breakable: bool, node: Option<NodePath>) -> Self {
        OutputUnit {
            content,
            padding,
            breakable,
            continued: false,
            node,
        }
    }

    pub fn title(lines: Vec<String>) -> Self {
        OutputUnit::new(UnitContent::Title { lines }, 0, false, None)
    }

    pub fn blank() -> Self {
        OutputUnit::new(UnitContent::Blank, 0, false, None)
    }

    /// Prose. Body text may be split across pages, headings may not.
    pub fn text(role: TextRole, lines: Vec<String>, padding: usize, node: Option<NodePath>) -> Self {
        let breakable = role == TextRole::Body;
        OutputUnit::new(UnitContent::Text { role, lines }, padding, breakable, node)
    }

    pub fn verbatim(
        language: Option<String>,
        lines: Vec<DisplayLine>,
        keep_together: bool,
        node: Option<NodePath>,
    ) -> Self {
        OutputUnit::new(
            UnitContent::Verbatim { language, lines },
            FRAME_PADDING,
            !keep_together,
            node,
        )
    }

    pub fn image(source: String, alt: Option<String>, height: usize, node: Option<NodePath>) -> Self {
        OutputUnit::new(UnitContent::Image { source, alt, height }, 0, false, node)
    }

    pub fn content(&self) -> &UnitContent {
        &self.content
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    pub fn is_breakable(&self) -> bool {
        self.breakable
    }

    /// This unit is the remainder of a unit split at a page break.
    pub fn is_continued(&self) -> bool {
        self.continued
    }

    pub fn node(&self) -> Option<&NodePath> {
        self.node.as_ref()
    }

    fn line_count(&self) -> Option<usize> {
        match &self.content {
            UnitContent::Text { lines, .. } => Some(lines.len()),
            UnitContent::Verbatim { lines, .. } => Some(lines.len()),
            _ => None,
        }
    }

    /// Height in line units, padding included.
    pub fn height(&self) -> usize {
        let content = match &self.content {
            UnitContent::Title { lines } => lines.len(),
            UnitContent::Blank => 0,
            UnitContent::Text { lines, .. } => lines.len(),
            UnitContent::Verbatim { lines, .. } => lines.len(),
            UnitContent::Image { height, .. } => *height,
        };
        self.padding + content
    }

    /// Whether the unit can be cut into a head of exactly `height` lines and a
    /// non-empty tail. The head always keeps the padding and at least one line.
    pub fn can_split_at(&self, height: usize) -> bool {
        match self.line_count() {
            Some(lines) if self.breakable && height > self.padding => {
                height - self.padding < lines
            }
            _ => false,
        }
    }

    /// Cut the unit into a head of `height` lines and the remainder. Hands the
    /// unit back untouched when it can't be split there.
    pub fn split_at(self, height: usize) -> Result<(OutputUnit, OutputUnit), OutputUnit> {
        if !self.can_split_at(height) {
            return Err(self);
        }
        let at = height - self.padding;

        let (head, tail) = match self.content {
            UnitContent::Text { role, mut lines } => {
                let tail = lines.split_off(at);
                (
                    UnitContent::Text { role, lines },
                    UnitContent::Text { role, lines: tail },
                )
            }
            UnitContent::Verbatim {
                language,
                mut lines,
            } => {
                let tail = lines.split_off(at);
                (
                    UnitContent::Verbatim {
                        language: language.clone(),
                        lines,
                    },
                    UnitContent::Verbatim {
                        language,
                        lines: tail,
                    },
                )
            }
            content => {
                return Err(OutputUnit { content, ..self });
            }
        };

        let head = OutputUnit {
            content: head,
            padding: self.padding,
            breakable: self.breakable,
            continued: self.continued,
            node: self.node.clone(),
        };
        let tail = OutputUnit {
            content: tail,
            padding: 0,
            breakable: self.breakable,
            continued: true,
            node: self.node,
        };
        Ok((head, tail))
    }

    /// The same unit without its leading blank lines.
    pub fn without_padding(self) -> OutputUnit {
        OutputUnit { padding: 0, ..self }
    }

    fn chapter_title(&self) -> Option<String> {
        match &self.content {
            UnitContent::Text {
                role: TextRole::Heading(1),
                lines,
            } if !self.continued => Some(lines.join(" ")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Title,
    Blank,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Open,
    Full,
}

/// An ordered run of units sharing one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    kind: PageKind,
    units: Vec<OutputUnit>,
    consumed: usize,
    capacity: usize,
    state: PageState,
    chapter: Option<String>,
}

impl Page {
    pub fn new(kind: PageKind, capacity: usize, chapter: Option<String>) -> Self {
        Page {
            kind,
            units: Vec::new(),
            consumed: 0,
            capacity,
            state: PageState::Open,
            chapter,
        }
    }

    pub fn kind(&self) -> PageKind {
        self.kind
    }

    pub fn units(&self) -> &[OutputUnit] {
        &self.units
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.consumed)
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    /// Running chapter title: the last level-1 heading in effect on this page.
    pub fn chapter(&self) -> Option<&str> {
        self.chapter.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn is_overflowing(&self) -> bool {
        self.consumed > self.capacity
    }

    /// Number of physical pages needed to print this page.
    pub fn physical_pages(&self) -> usize {
        self.consumed.div_ceil(self.capacity.max(1)).max(1)
    }
}

/// What to do with a unit given the page it is offered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The unit fits on the current page.
    Place,
    /// Keep the first `head_height` lines here, move the rest on.
    Split { head_height: usize },
    /// Close the page and offer the unit to the next one.
    NewPage,
    /// Too tall for any page: place it anyway on a page of its own.
    Overflow,
}

/// Decide where a unit of the given shape goes on a page that has already
/// consumed `consumed` of its `capacity` lines.
pub fn decide(consumed: usize, capacity: usize, unit: &OutputUnit) -> Placement {
    let height = unit.height();
    if consumed + height <= capacity {
        return Placement::Place;
    }

    let remaining = capacity.saturating_sub(consumed);
    if unit.can_split_at(remaining) {
        Placement::Split {
            head_height: remaining,
        }
    } else if consumed > 0 && height <= capacity {
        Placement::NewPage
    } else if unit.is_breakable() && consumed > 0 {
        // a tall breakable unit that can't start here might still split
        // cleanly on a fresh page
        Placement::NewPage
    } else {
        Placement::Overflow
    }
}

/// Fills pages one unit at a time.
#[derive(Debug)]
pub struct PageFitter {
    capacity: usize,
    pages: Vec<Page>,
    current: Page,
    chapter: Option<String>,
    warnings: Vec<BlockOverflowWarning>,
}

impl PageFitter {
    /// Start filling with an open page of the given kind.
    pub fn new(capacity: usize, first: PageKind) -> Result<Self, ConfigurationError> {
        if capacity == 0 {
            return Err(ConfigurationError::ZeroDimension {
                field: "page_height_lines",
            });
        }
        Ok(PageFitter {
            capacity,
            pages: Vec::new(),
            current: Page::new(first, capacity, None),
            chapter: None,
            warnings: Vec::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn current(&self) -> &Page {
        &self.current
    }

    /// Index the current page will have in the finished sequence.
    pub fn current_index(&self) -> usize {
        self.pages.len()
    }

    /// Close the current page, even if it is empty, and open one of `kind`.
    pub fn break_page(&mut self, kind: PageKind) {
        let next = Page::new(kind, self.capacity, self.chapter.clone());
        let mut done = std::mem::replace(&mut self.current, next);
        done.state = PageState::Full;
        log::trace!(
            "closed {:?} page {} at {}/{} lines",
            done.kind,
            self.pages.len(),
            done.consumed,
            done.capacity
        );
        self.pages.push(done);
    }

    /// Move on to a fresh content page unless the current one is still empty.
    fn advance(&mut self) {
        if self.current.is_empty() {
            self.current.state = PageState::Open;
        } else {
            self.break_page(PageKind::Content);
        }
    }

    fn push(&mut self, unit: OutputUnit) {
        if let Some(chapter) = unit.chapter_title() {
            self.chapter = Some(chapter.clone());
            self.current.chapter = Some(chapter);
        }
        self.current.consumed += unit.height();
        self.current.units.push(unit);
        if self.current.consumed >= self.capacity {
            self.current.state = PageState::Full;
        }
    }

    /// Place a unit, opening, splitting, and overflowing pages as needed.
    pub fn place(&mut self, unit: OutputUnit) {
        let mut unit = unit;
        loop {
            if self.current.state == PageState::Full {
                self.advance();
            }

            // padding can't hold even one line of a breakable unit at the top
            // of an empty page; drop it rather than overflow
            if self.current.is_empty()
                && unit.is_breakable()
                && unit.height() > self.capacity
                && !unit.can_split_at(self.capacity)
            {
                unit = unit.without_padding();
            }

            match decide(self.current.consumed, self.capacity, &unit) {
                Placement::Place => {
                    self.push(unit);
                    return;
                }
                Placement::Split { head_height } => match unit.split_at(head_height) {
                    Ok((head, tail)) => {
                        log::debug!(
                            "split {}-line unit: {} lines stay on page {}, {} move on",
                            head.height() + tail.height(),
                            head.height(),
                            self.current_index(),
                            tail.height()
                        );
                        self.push(head);
                        self.current.state = PageState::Full;
                        unit = tail;
                    }
                    Err(whole) => {
                        self.current.state = PageState::Full;
                        unit = whole;
                    }
                },
                Placement::NewPage => {
                    log::debug!(
                        "{}-line unit doesn't fit in the {} lines left on page {}",
                        unit.height(),
                        self.current.remaining(),
                        self.current_index()
                    );
                    self.current.state = PageState::Full;
                }
                Placement::Overflow => {
                    self.advance();
                    let warning = BlockOverflowWarning {
                        page_index: self.current_index(),
                        height: unit.height(),
                        capacity: self.capacity,
                        node: unit.node().cloned(),
                    };
                    log::warn!("{warning}");
                    self.warnings.push(warning);
                    self.push(unit);
                    self.current.state = PageState::Full;
                    return;
                }
            }
        }
    }

    /// Finish filling. A trailing content page that never received a unit is
    /// dropped.
    pub fn finish(mut self) -> (Vec<Page>, Vec<BlockOverflowWarning>) {
        if !(self.current.kind == PageKind::Content && self.current.is_empty()) {
            self.pages.push(self.current);
        }
        (self.pages, self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(lines: usize) -> OutputUnit {
        let lines = (0..lines).map(|i| format!("line {i}")).collect();
        OutputUnit::text(TextRole::Body, lines, 0, None)
    }

    fn code(lines: usize, keep_together: bool) -> OutputUnit {
        let lines = (0..lines).map(|i| DisplayLine::hard(format!("{i}"))).collect();
        OutputUnit::verbatim(None, lines, keep_together, None)
    }

    fn fitter(capacity: usize) -> PageFitter {
        PageFitter::new(capacity, PageKind::Content).unwrap()
    }

    #[test]
    fn zero_capacity_is_a_configuration_error() {
        assert!(PageFitter::new(0, PageKind::Content).is_err());
    }

    #[test]
    fn breakable_unit_splits_across_the_page_break() {
        let unit = body(10);
        assert_eq!(decide(48, 50, &unit), Placement::Split { head_height: 2 });

        let mut fitter = fitter(50);
        fitter.place(body(48));
        fitter.place(body(10));
        let (pages, warnings) = fitter.finish();

        assert!(warnings.is_empty());
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].consumed(), 50);
        assert_eq!(pages[0].units()[1].height(), 2);
        assert_eq!(pages[1].consumed(), 8);
        assert!(pages[1].units()[0].is_continued());
        assert_eq!(pages[0].state(), PageState::Full);
    }

    #[test]
    fn empty_verbatim_block_takes_its_frame() {
        let mut fitter = fitter(50);
        fitter.place(body(3));
        let before = fitter.current().consumed();
        fitter.place(code(0, true));
        assert_eq!(fitter.current().consumed() - before, FRAME_PADDING);
    }

    #[test]
    fn kept_together_block_moves_to_the_next_page() {
        let mut fitter = fitter(20);
        fitter.place(body(15));
        fitter.place(code(8, true));
        let (pages, warnings) = fitter.finish();
        assert!(warnings.is_empty());
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].consumed(), 15);
        assert_eq!(pages[1].consumed(), 8 + FRAME_PADDING);
    }

    #[test]
    fn breakable_block_keeps_its_frame_on_the_first_page() {
        let mut fitter = fitter(20);
        fitter.place(body(15));
        fitter.place(code(8, false));
        let (pages, _) = fitter.finish();
        assert_eq!(pages[0].consumed(), 20);
        // frame padding plus four lines stay behind
        assert_eq!(pages[0].units()[1].height(), 5);
        assert_eq!(pages[1].consumed(), 4);
        assert_eq!(pages[1].units()[0].padding(), 0);
    }

    #[test]
    fn split_never_leaves_only_padding_behind() {
        let mut fitter = fitter(20);
        fitter.place(body(19));
        fitter.place(code(8, false));
        let (pages, _) = fitter.finish();
        assert_eq!(pages[0].consumed(), 19);
        assert_eq!(pages[1].consumed(), 8 + FRAME_PADDING);
    }

    #[test]
    fn oversized_block_overflows_on_its_own_page() {
        let mut fitter = fitter(10);
        fitter.place(body(3));
        fitter.place(code(24, true));
        fitter.place(body(2));
        let (pages, warnings) = fitter.finish();

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].consumed(), 3);
        assert!(pages[1].is_overflowing());
        assert_eq!(pages[1].units().len(), 1);
        assert_eq!(pages[1].physical_pages(), 3);
        assert_eq!(pages[2].consumed(), 2);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].page_index, 1);
        assert_eq!(warnings[0].height, 25);
    }

    #[test]
    fn tall_breakable_unit_spreads_over_pages() {
        let mut fitter = fitter(10);
        fitter.place(body(35));
        let (pages, warnings) = fitter.finish();
        assert!(warnings.is_empty());
        let heights: Vec<usize> = pages.iter().map(Page::consumed).collect();
        assert_eq!(heights, vec![10, 10, 10, 5]);
    }

    #[test]
    fn breakable_unit_never_overflows_a_tiny_page() {
        let paragraph = OutputUnit::text(
            TextRole::Body,
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            PARAGRAPH_PADDING,
            None,
        );
        let mut fitter = fitter(1);
        fitter.place(body(1));
        fitter.place(paragraph);
        let (pages, warnings) = fitter.finish();

        assert!(warnings.is_empty());
        let heights: Vec<usize> = pages.iter().map(Page::consumed).collect();
        assert_eq!(heights, vec![1, 1, 1, 1]);
        assert!(pages.iter().all(|p| !p.is_overflowing()));
    }

    #[test]
    fn consumed_height_stays_within_capacity() {
        let mut fitter = fitter(12);
        let units = [
            body(5),
            code(3, true),
            body(9),
            code(14, true),
            code(7, false),
            body(1),
            code(0, true),
            code(11, true),
            body(30),
        ];
        for unit in units {
            fitter.place(unit);
        }
        let (pages, warnings) = fitter.finish();
        for (i, page) in pages.iter().enumerate() {
            if page.is_overflowing() {
                assert_eq!(page.units().len(), 1, "page {i} overflows with company");
                assert!(warnings.iter().any(|w| w.page_index == i));
            } else {
                assert!(page.consumed() <= 12);
            }
        }
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn level_one_headings_set_the_running_chapter() {
        let mut fitter = fitter(4);
        fitter.place(OutputUnit::text(
            TextRole::Heading(1),
            vec!["Getting started".to_string()],
            0,
            None,
        ));
        fitter.place(body(6));
        let (pages, _) = fitter.finish();
        assert_eq!(pages.len(), 2);
        assert!(pages
            .iter()
            .all(|p| p.chapter() == Some("Getting started")));
    }

    #[test]
    fn unsplittable_content_is_handed_back() {
        let image = OutputUnit::image("logo.png".to_string(), None, 6, None);
        assert!(!image.can_split_at(3));
        assert!(image.split_at(3).is_err());
    }
}
