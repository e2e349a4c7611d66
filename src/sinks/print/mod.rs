//! Print output: paginated, fixed-width text.
//!
//! Every logical page becomes one or more physical pages of exactly
//! `page_height_lines` content rows, framed by the running header and footer
//! and terminated by a form feed. Pages that overflow (a block taller than a
//! page) are spread over as many physical pages as they need, so nothing is
//! ever cut off.

mod config;
mod header_footer;

pub use config::{PageNumberStyle, Position, Print, RulePosition, RunningLine, Slot};

use crate::assembler::{PageVisitor, RenderedDocument};
use crate::error::RenderError;
use crate::pagination::{OutputUnit, Page, PageKind, TextRole, UnitContent};
use crate::unicode::display_width;
use header_footer::{blank_running_line, render_running_line, PageContext};
use std::io::Write;

use super::{Backend, Format};

impl Backend for Print {
    fn format(&self) -> Format {
        Format::Print
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn render(&self, document: &RenderedDocument, out: &mut dyn Write) -> Result<(), RenderError> {
        let total = document
            .content_pages()
            .map(Page::physical_pages)
            .sum::<usize>();
        let mut writer = PrintWriter {
            config: self,
            document,
            out,
            rows: Vec::new(),
            physical_index: 0,
            content_number: self.page_number_start,
            total,
        };
        document.visit(&mut writer)?;
        writer.out.flush()?;
        log::debug!(
            "printed '{}' on {} physical pages",
            document.metadata().title,
            writer.physical_index
        );
        Ok(())
    }
}

/// Collects the rows of one logical page, then lays them out on physical pages.
struct PrintWriter<'a> {
    config: &'a Print,
    document: &'a RenderedDocument,
    out: &'a mut dyn Write,
    rows: Vec<String>,
    physical_index: usize,
    content_number: usize,
    total: usize,
}

impl PrintWriter<'_> {
    fn centre(&self, text: &str) -> String {
        let pad = self
            .config
            .page_width_columns
            .saturating_sub(display_width(text))
            / 2;
        format!("{}{}", " ".repeat(pad), text)
    }

    fn unit_rows(&self, unit: &OutputUnit) -> Vec<String> {
        let mut rows = vec![String::new(); unit.padding()];
        match unit.content() {
            UnitContent::Title { lines } => {
                rows.extend(lines.iter().map(|line| self.centre(line)));
            }
            UnitContent::Blank => {}
            UnitContent::Text { role, lines } => match role {
                TextRole::Heading(1) => rows.extend(lines.iter().map(|l| l.to_uppercase())),
                _ => rows.extend(lines.iter().cloned()),
            },
            UnitContent::Verbatim { lines, .. } => {
                let marker = self.document.continuation_marker();
                rows.extend(lines.iter().map(|line| {
                    if line.continues {
                        format!("{}{}", line.text, marker)
                    } else {
                        line.text.clone()
                    }
                }));
            }
            UnitContent::Image {
                source,
                alt,
                height,
            } => {
                let label = alt.as_deref().unwrap_or(source);
                rows.push(format!("[image: {label}]"));
                rows.extend(std::iter::repeat(String::new()).take(height.saturating_sub(1)));
            }
        }
        rows
    }

    fn write_page(&mut self, page: &Page) -> std::io::Result<()> {
        let capacity = self.document.capacity().max(1);
        let rows = std::mem::take(&mut self.rows);
        let chunks: Vec<&[String]> = if rows.is_empty() {
            vec![rows.as_slice()]
        } else {
            rows.chunks(capacity).collect()
        };

        for chunk in chunks {
            let decorated = page.kind() == PageKind::Content;
            let context = PageContext {
                title: &self.document.metadata().title,
                chapter: page.chapter(),
                number: self.content_number,
                total: self.total,
                physical_index: self.physical_index,
            };
            let width = self.config.page_width_columns;
            let style = self.config.page_number_style;

            let (header, footer) = if decorated {
                (
                    render_running_line(&self.config.header, &context, style, width),
                    render_running_line(&self.config.footer, &context, style, width),
                )
            } else {
                (
                    blank_running_line(&self.config.header),
                    blank_running_line(&self.config.footer),
                )
            };

            for row in header.iter().chain(chunk) {
                writeln!(self.out, "{row}")?;
            }
            for _ in chunk.len()..capacity {
                writeln!(self.out)?;
            }
            for row in &footer {
                writeln!(self.out, "{row}")?;
            }
            write!(self.out, "\x0c")?;

            self.physical_index += 1;
            if decorated {
                self.content_number += 1;
            }
        }
        Ok(())
    }
}

impl PageVisitor for PrintWriter<'_> {
    type Error = RenderError;

    fn begin_page(&mut self, _index: usize, _page: &Page) -> Result<(), RenderError> {
        self.rows.clear();
        Ok(())
    }

    fn unit(&mut self, _page_index: usize, unit: &OutputUnit) -> Result<(), RenderError> {
        let rows = self.unit_rows(unit);
        self.rows.extend(rows);
        Ok(())
    }

    fn end_page(&mut self, index: usize, page: &Page) -> Result<(), RenderError> {
        self.write_page(page)
            .map_err(|source| RenderError::Page {
                page_index: index,
                source,
            })
    }
}
