use serde::{Deserialize, Serialize};

/// Horizontal placement of running header/footer text.
#[derive(Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Debug, Default)]
pub enum Position {
    /// Away from the binding: right on recto pages, left on verso pages
    #[default]
    Outer,
    /// Towards the binding: left on recto pages, right on verso pages
    Inner,
    Centre,
    Left,
    Right,
}

/// Where a horizontal rule goes relative to a running header/footer.
#[derive(Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Debug, Default)]
pub enum RulePosition {
    #[default]
    None,
    Above,
    Below,
}

#[derive(Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Debug, Default)]
pub enum PageNumberStyle {
    #[default]
    Arabic,
    RomanLower,
    RomanUpper,
}

/// One piece of text on a running header or footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Template with `{title}`, `{chapter}`, `{n}` and `{total}` placeholders
    pub template: String,
    pub position: Position,
}

impl Slot {
    pub fn new<S: Into<String>>(template: S, position: Position) -> Self {
        Slot {
            template: template.into(),
            position,
        }
    }
}

/// A running header or footer. With no slots and no rule it takes no rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunningLine {
    #[serde(default)]
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub rule: RulePosition,
}

impl RunningLine {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.rule == RulePosition::None
    }

    /// Rows this line adds to every physical page.
    pub fn rows(&self) -> usize {
        match (self.is_empty(), self.rule) {
            (true, _) => 0,
            (false, RulePosition::None) => 1,
            (false, _) => 2,
        }
    }
}

/// Print (paginated plain text) output configuration.
///
/// Content pages carry running headers and footers; title and blank pages
/// are left bare. The defaults mirror a classic two-sided book: a rule under
/// an empty header, and a footer with the page number on the outer edge and
/// the chapter title on the inner edge above a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Print {
    /// File extension of the printed artifact
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Columns per line, used to place header/footer text and centre the title
    #[serde(default = "default_page_width_columns")]
    pub page_width_columns: usize,
    #[serde(default)]
    pub page_number_style: PageNumberStyle,
    /// Number given to the first content page
    #[serde(default = "default_page_number_start")]
    pub page_number_start: usize,
    #[serde(default = "default_header")]
    pub header: RunningLine,
    #[serde(default = "default_footer")]
    pub footer: RunningLine,
}

fn default_extension() -> String {
    "txt".to_string()
}
fn default_page_width_columns() -> usize {
    80
}
fn default_header() -> RunningLine {
    RunningLine {
        slots: Vec::new(),
        rule: RulePosition::Below,
    }
}
fn default_footer() -> RunningLine {
    RunningLine {
        slots: vec![
            Slot::new("{n}", Position::Outer),
            Slot::new("{chapter}", Position::Inner),
        ],
        rule: RulePosition::Above,
    }
}
fn default_page_number_start() -> usize {
    1
}

impl Default for Print {
    fn default() -> Self {
        Print {
            extension: default_extension(),
            page_width_columns: default_page_width_columns(),
            page_number_style: PageNumberStyle::default(),
            page_number_start: default_page_number_start(),
            header: default_header(),
            footer: default_footer(),
        }
    }
}
