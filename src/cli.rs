use clap::{Args, Parser, Subcommand};
use doc_book::sinks::Format;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// Configuration file to load
    #[clap(long, default_value = doc_book::config::CONFIG_FILE)]
    pub config: PathBuf,

    /// Directory of parsed trees, overriding `source.directory`
    #[clap(long)]
    pub source: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    #[clap(flatten)]
    pub project: ProjectArgs,

    /// Directory the artifacts are written to
    #[clap(long, default_value = "out")]
    pub out: PathBuf,

    /// Output formats; every configured format when omitted
    #[clap(long = "target", value_enum)]
    pub targets: Vec<Format>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generates a doc-book.toml config file
    Config,
    /// Builds every document tree into the configured formats
    Build(BuildArgs),
    /// Reports verbatim line lengths and overflowing blocks without writing anything
    Check(ProjectArgs),
}

#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}
