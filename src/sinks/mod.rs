use crate::assembler::RenderedDocument;
use crate::config::Configuration;
use crate::error::RenderError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

mod html;
pub use html::*;

mod print;
pub use print::*;

/// Output formats a document can be rendered to.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Print,
    Html,
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Print => f.pad("print"),
            Format::Html => f.pad("html"),
        }
    }
}

/// Serializes rendered documents into one output format.
pub trait Backend: Send + Sync {
    fn format(&self) -> Format;

    /// File extension of the artifacts this backend writes.
    fn extension(&self) -> &str;

    /// Write the whole document to `out`, visiting every unit once in order.
    fn render(&self, document: &RenderedDocument, out: &mut dyn Write) -> Result<(), RenderError>;
}

/// Render a document into a file, returning the number of bytes written.
pub fn render_to_file(
    backend: &dyn Backend,
    document: &RenderedDocument,
    path: &Path,
) -> Result<u64, RenderError> {
    {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        backend.render(document, &mut out)?;
        out.flush()?;
    }
    Ok(std::fs::metadata(path)?.len())
}

/// The configured backend for `format`, or its defaults when the
/// configuration has no section for it.
pub fn backend_for(format: Format, config: &Configuration) -> Box<dyn Backend> {
    match format {
        Format::Print => Box::new(config.print.clone().unwrap_or_default()),
        Format::Html => Box::new(config.html.clone().unwrap_or_default()),
    }
}
