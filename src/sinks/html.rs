//! HTML output.
//!
//! One HTML5 document per tree, with a `<section>` per page so the page
//! layout decided by the assembler survives in the markup. All text is
//! escaped with `html_escape`; soft line breaks inside verbatim blocks show
//! the continuation marker in a `soft-break` span.

use crate::assembler::{PageVisitor, RenderedDocument};
use crate::error::RenderError;
use crate::pagination::{OutputUnit, Page, PageKind, TextRole, UnitContent};
use serde::{Deserialize, Serialize};
use std::io::Write;

use super::{Backend, Format};

const STYLESHEET: &str = r#"body { font-family: serif; max-width: 48em; margin: 0 auto; }
section.page { border-bottom: 1px dashed #999; padding: 1em 0; }
section.title { text-align: center; }
pre { font-family: monospace; background: #f6f6f6; padding: 0.5em; }
.soft-break { color: #999; user-select: none; }
.image { border: 1px solid #ccc; padding: 0.5em; color: #666; }
"#;

/// HTML output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Html {
    #[serde(default = "default_extension")]
    pub extension: String,
    /// `lang` attribute of the document. Defaults to the project language.
    #[serde(default)]
    pub language: Option<String>,
}

fn default_extension() -> String {
    "html".to_string()
}

impl Default for Html {
    fn default() -> Self {
        Html {
            extension: default_extension(),
            language: None,
        }
    }
}

impl Backend for Html {
    fn format(&self) -> Format {
        Format::Html
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn render(&self, document: &RenderedDocument, out: &mut dyn Write) -> Result<(), RenderError> {
        let metadata = document.metadata();
        let language = self.language.as_deref().unwrap_or(&metadata.language);

        writeln!(out, "<!DOCTYPE html>")?;
        writeln!(
            out,
            r#"<html lang="{}">"#,
            html_escape::encode_double_quoted_attribute(language)
        )?;
        writeln!(out, "<head>")?;
        writeln!(out, r#"<meta charset="utf-8">"#)?;
        writeln!(
            out,
            "<title>{}</title>",
            html_escape::encode_text(&metadata.title)
        )?;
        if let Some(author) = &metadata.author {
            writeln!(
                out,
                r#"<meta name="author" content="{}">"#,
                html_escape::encode_double_quoted_attribute(author)
            )?;
        }
        writeln!(out, "<style>\n{STYLESHEET}</style>")?;
        writeln!(out, "</head>")?;
        writeln!(out, "<body>")?;

        let mut writer = HtmlWriter {
            out,
            marker: document.continuation_marker(),
        };
        document.visit(&mut writer)?;

        writeln!(writer.out, "</body>")?;
        writeln!(writer.out, "</html>")?;
        writer.out.flush()?;
        Ok(())
    }
}

struct HtmlWriter<'a> {
    out: &'a mut dyn Write,
    marker: &'a str,
}

impl HtmlWriter<'_> {
    fn write_unit(&mut self, unit: &OutputUnit) -> std::io::Result<()> {
        match unit.content() {
            UnitContent::Title { lines } => {
                for line in lines.iter().filter(|l| !l.trim().is_empty()) {
                    writeln!(self.out, "<p>{}</p>", html_escape::encode_text(line))?;
                }
            }
            UnitContent::Blank => {}
            UnitContent::Text { role, lines } => {
                let text = html_escape::encode_text(&lines.join(" ")).into_owned();
                match role {
                    TextRole::Heading(level) => {
                        writeln!(self.out, "<h{level}>{text}</h{level}>")?
                    }
                    TextRole::Body => writeln!(self.out, "<p>{text}</p>")?,
                }
            }
            UnitContent::Verbatim { language, lines } => {
                match language {
                    Some(language) => write!(
                        self.out,
                        r#"<pre><code class="language-{}">"#,
                        html_escape::encode_double_quoted_attribute(language)
                    )?,
                    None => write!(self.out, "<pre><code>")?,
                }
                for line in lines {
                    write!(self.out, "{}", html_escape::encode_text(&line.text))?;
                    if line.continues {
                        write!(
                            self.out,
                            r#"<span class="soft-break">{}</span>"#,
                            html_escape::encode_text(self.marker)
                        )?;
                    }
                    writeln!(self.out)?;
                }
                writeln!(self.out, "</code></pre>")?;
            }
            UnitContent::Image { source, alt, .. } => {
                writeln!(
                    self.out,
                    r#"<figure class="image"><img src="{}" alt="{}"></figure>"#,
                    html_escape::encode_double_quoted_attribute(source),
                    html_escape::encode_double_quoted_attribute(alt.as_deref().unwrap_or(""))
                )?;
            }
        }
        Ok(())
    }
}

impl PageVisitor for HtmlWriter<'_> {
    type Error = RenderError;

    fn begin_page(&mut self, index: usize, page: &Page) -> Result<(), RenderError> {
        let class = match page.kind() {
            PageKind::Title => "page title",
            PageKind::Blank => "page blank",
            PageKind::Content => "page",
        };
        writeln!(self.out, r#"<section class="{class}" id="page-{index}">"#).map_err(|source| {
            RenderError::Page {
                page_index: index,
                source,
            }
        })
    }

    fn unit(&mut self, page_index: usize, unit: &OutputUnit) -> Result<(), RenderError> {
        self.write_unit(unit)
            .map_err(|source| RenderError::Page { page_index, source })
    }

    fn end_page(&mut self, index: usize, _page: &Page) -> Result<(), RenderError> {
        writeln!(self.out, "</section>").map_err(|source| RenderError::Page {
            page_index: index,
            source,
        })
    }
}
