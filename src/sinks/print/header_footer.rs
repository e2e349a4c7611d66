//! Running headers and footers for printed pages.
//!
//! Templates support placeholders:
//! - `{title}` - document title
//! - `{chapter}` - running chapter title of the page
//! - `{n}` - page number (formatted per page_number_style)
//! - `{total}` - total number of content pages
//!
//! Outer and inner positions alternate with page parity so that, once the
//! pages are printed double-sided and bound, page numbers always sit on the
//! edge away from the spine.

use super::config::{PageNumberStyle, Position, RulePosition, RunningLine};
use crate::unicode::{char_width, display_width};

/// Values substituted into header and footer templates for one page.
#[derive(Clone, Debug, Default)]
pub struct PageContext<'a> {
    pub title: &'a str,
    pub chapter: Option<&'a str>,
    pub number: usize,
    pub total: usize,
    /// Absolute index of the physical page; even indices are recto pages
    pub physical_index: usize,
}

const NUMERALS: [(usize, &str); 13] = [
    (1000, "m"),
    (900, "cm"),
    (500, "d"),
    (400, "cd"),
    (100, "c"),
    (90, "xc"),
    (50, "l"),
    (40, "xl"),
    (10, "x"),
    (9, "ix"),
    (5, "v"),
    (4, "iv"),
    (1, "i"),
];

/// Lowercase Roman numerals for `n`. There is no numeral for zero, so it
/// stays `0`.
fn to_roman(n: usize) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let (roman, _) = NUMERALS
        .iter()
        .fold((String::new(), n), |(mut roman, left), &(value, numeral)| {
            roman.push_str(&numeral.repeat(left / value));
            (roman, left % value)
        });
    roman
}

/// A page number in the configured style.
pub fn format_page_number(n: usize, style: PageNumberStyle) -> String {
    match style {
        PageNumberStyle::Arabic => n.to_string(),
        PageNumberStyle::RomanLower => to_roman(n),
        PageNumberStyle::RomanUpper => to_roman(n).to_uppercase(),
    }
}

fn expand_template(template: &str, context: &PageContext, style: PageNumberStyle) -> String {
    template
        .replace("{title}", context.title)
        .replace("{chapter}", context.chapter.unwrap_or(""))
        .replace("{n}", &format_page_number(context.number, style))
        .replace("{total}", &format_page_number(context.total, style))
}

/// Column at which text of `text_width` columns starts on a `width`-column
/// line.
fn column_for(position: Position, physical_index: usize, width: usize, text_width: usize) -> usize {
    let is_recto = physical_index % 2 == 0;
    let right = width.saturating_sub(text_width);

    match position {
        Position::Outer => {
            if is_recto {
                right
            } else {
                0
            }
        }
        Position::Inner => {
            if is_recto {
                0
            } else {
                right
            }
        }
        Position::Centre => right / 2,
        Position::Left => 0,
        Position::Right => right,
    }
}

/// Lay out the slots of a running line on a single row. Later slots win
/// where text collides; anything past the page width is clipped.
fn compose_row(
    line: &RunningLine,
    context: &PageContext,
    style: PageNumberStyle,
    width: usize,
) -> String {
    // one grapheme per column; empty cells print as spaces
    let mut cells: Vec<String> = vec![String::new(); width];

    for slot in &line.slots {
        let text = expand_template(&slot.template, context, style);
        if text.is_empty() {
            continue;
        }
        let mut column = column_for(
            slot.position,
            context.physical_index,
            width,
            display_width(&text),
        );
        for c in text.chars() {
            if char_width(c) == 0 {
                if column > 0 && column <= width {
                    cells[column - 1].push(c);
                }
                continue;
            }
            if column >= width {
                break;
            }
            cells[column] = c.to_string();
            column += 1;
        }
    }

    let mut row: String = cells
        .iter()
        .map(|cell| if cell.is_empty() { " " } else { cell.as_str() })
        .collect();
    row.truncate(row.trim_end().len());
    row
}

fn rule(width: usize) -> String {
    "-".repeat(width)
}

/// Rows for a running line, rule included.
pub fn render_running_line(
    line: &RunningLine,
    context: &PageContext,
    style: PageNumberStyle,
    width: usize,
) -> Vec<String> {
    if line.is_empty() {
        return Vec::new();
    }
    let text = compose_row(line, context, style, width);
    match line.rule {
        RulePosition::None => vec![text],
        RulePosition::Above => vec![rule(width), text],
        RulePosition::Below => vec![text, rule(width)],
    }
}

/// Blank rows standing in for a running line on pages that don't show it.
pub fn blank_running_line(line: &RunningLine) -> Vec<String> {
    vec![String::new(); line.rows()]
}

#[cfg(test)]
mod tests {
    use super::super::config::Slot;
    use super::*;

    fn context(physical_index: usize) -> PageContext<'static> {
        PageContext {
            title: "My Book",
            chapter: Some("Signals"),
            number: 5,
            total: 100,
            physical_index,
        }
    }

    #[test]
    fn can_convert_to_roman_numerals() {
        assert_eq!(to_roman(1), "i");
        assert_eq!(to_roman(4), "iv");
        assert_eq!(to_roman(9), "ix");
        assert_eq!(to_roman(14), "xiv");
        assert_eq!(to_roman(42), "xlii");
        assert_eq!(to_roman(99), "xcix");
        assert_eq!(to_roman(1984), "mcmlxxxiv");
        assert_eq!(to_roman(0), "0");
        assert_eq!(to_roman(3999), "mmmcmxcix");
        assert_eq!(to_roman(4000), "mmmm");
    }

    #[test]
    fn can_format_page_numbers() {
        assert_eq!(format_page_number(42, PageNumberStyle::Arabic), "42");
        assert_eq!(format_page_number(42, PageNumberStyle::RomanLower), "xlii");
        assert_eq!(format_page_number(42, PageNumberStyle::RomanUpper), "XLII");
        assert_eq!(format_page_number(0, PageNumberStyle::RomanUpper), "0");
    }

    #[test]
    fn totals_follow_the_number_style() {
        let result = expand_template("{n}/{total}", &context(0), PageNumberStyle::RomanUpper);
        assert_eq!(result, "V/C");
    }

    #[test]
    fn can_expand_template() {
        let result = expand_template(
            "Page {n} of {total} - {chapter} ({title})",
            &context(0),
            PageNumberStyle::Arabic,
        );
        assert_eq!(result, "Page 5 of 100 - Signals (My Book)");
    }

    #[test]
    fn outer_and_inner_alternate_with_parity() {
        let line = RunningLine {
            slots: vec![
                Slot::new("{n}", Position::Outer),
                Slot::new("{chapter}", Position::Inner),
            ],
            rule: RulePosition::None,
        };
        // recto: chapter at the spine (left), number outside (right)
        let recto = compose_row(&line, &context(2), PageNumberStyle::Arabic, 20);
        assert_eq!(recto, "Signals            5");
        // verso: mirrored
        let verso = compose_row(&line, &context(3), PageNumberStyle::Arabic, 20);
        assert_eq!(verso, "5            Signals");
    }

    #[test]
    fn centred_text_and_rules() {
        let line = RunningLine {
            slots: vec![Slot::new("{title}", Position::Centre)],
            rule: RulePosition::Above,
        };
        let rows = render_running_line(&line, &context(0), PageNumberStyle::Arabic, 11);
        assert_eq!(rows, vec!["-----------".to_string(), "  My Book".to_string()]);
    }

    #[test]
    fn overlong_text_is_clipped() {
        let line = RunningLine {
            slots: vec![Slot::new("{title} {title} {title}", Position::Left)],
            rule: RulePosition::None,
        };
        let row = compose_row(&line, &context(0), PageNumberStyle::Arabic, 10);
        assert_eq!(row, "My Book My");
    }
}
