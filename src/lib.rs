//! Turns parsed documentation trees into paginated, print-ready books.
//!
//! The pipeline runs in fixed stages:
//!
//! 1. [`unicode`] normalizes every text payload against a substitution table,
//!    so that nothing the output fonts can't draw survives.
//! 2. [`verbatim`] breaks long code lines into display lines under a
//!    [`verbatim::WrapPolicy`], marking the soft breaks.
//! 3. [`assembler`] walks a [`document::Document`] in reading order and feeds
//!    output units to the [`pagination::PageFitter`], which decides where each
//!    page ends.
//! 4. A [`sinks::Backend`] serializes the finished
//!    [`assembler::RenderedDocument`].
//!
//! [`pipeline`] ties the stages together for a directory of trees.

pub mod analysis;
pub mod assembler;
pub mod config;
pub mod document;
pub mod error;
pub mod pagination;
pub mod pipeline;
pub mod sinks;
pub mod source;
pub mod unicode;
pub mod verbatim;
