use anyhow::{anyhow, Context, Result};
use cli::{BuildArgs, Cli, ProjectArgs};
use doc_book::analysis::analyze_line_lengths;
use doc_book::assembler::Assembler;
use doc_book::config::Configuration;
use doc_book::document::Document;
use doc_book::pipeline::Pipeline;
use doc_book::sinks::Format;
use doc_book::source::TreeSource;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;
mod config_wizard;

fn main() -> ExitCode {
    env_logger::init();

    if let Err(e) = try_main() {
        eprintln!("{}: {e:#}", console::style("Error").red());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<()> {
    use clap::Parser;
    let cli = Cli::parse();

    match &cli.command {
        cli::Commands::Config => config_wizard::run(),
        cli::Commands::Build(args) => build(args),
        cli::Commands::Check(args) => check(args),
    }
}

fn load_configuration(args: &ProjectArgs) -> Result<Configuration> {
    let contents = std::fs::read_to_string(&args.config).with_context(|| {
        format!(
            "Failed to load {} - run 'doc-book config' first",
            args.config.display()
        )
    })?;
    let mut config = Configuration::from_toml_str(&contents)
        .with_context(|| format!("Failed to parse {}", args.config.display()))?;
    if let Some(source) = &args.source {
        config.source.directory = source.clone();
    }
    Ok(config)
}

fn progress_bar(len: usize) -> ProgressBar {
    let progress = ProgressBar::new(len as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("can parse progress style")
            .progress_chars("#>-"),
    );
    progress
}

fn format_size(bytes: u64) -> String {
    byte_unit::Byte::from_u128(bytes as u128)
        .map(|size| {
            size.get_appropriate_unit(byte_unit::UnitType::Binary)
                .to_string()
        })
        .unwrap_or_else(|| format!("{bytes} B"))
}

fn build(args: &BuildArgs) -> Result<()> {
    println!("Loading configuration...");
    let config = load_configuration(&args.project)?;

    let mut targets = args.targets.clone();
    if targets.is_empty() {
        if config.print.is_some() {
            targets.push(Format::Print);
        }
        if config.html.is_some() {
            targets.push(Format::Html);
        }
    }
    if targets.is_empty() {
        println!("No output configured, defaulting to print.");
        targets.push(Format::Print);
    }

    let pipeline =
        Pipeline::new(&config, &targets, &args.out).with_context(|| "Invalid configuration")?;
    let source = TreeSource::from_config(&config.source).with_context(|| {
        format!(
            "Failed to find document trees in {}",
            config.source.directory.display()
        )
    })?;
    if source.is_empty() {
        println!(
            "No document trees found in {}.",
            config.source.directory.display()
        );
        return Ok(());
    }

    let progress = progress_bar(source.len());
    progress.set_message("Building...");
    let results = pipeline.build_all(&source, |tree| {
        progress.set_message(source.stem_of(tree).display().to_string());
        progress.inc(1);
    });
    progress.finish_and_clear();

    let mut failed = 0;
    for (tree, result) in source.trees.iter().zip(results) {
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                failed += 1;
                eprintln!(
                    "{} {}: {e:#}",
                    console::style("Failed").red(),
                    tree.display()
                );
                continue;
            }
        };

        for warning in &report.warnings {
            println!(
                "{} {}: {warning}",
                console::style("Warning").yellow(),
                tree.display()
            );
        }
        for artifact in &report.artifacts {
            println!(
                "  {:<6} {} ({}, {} pages)",
                artifact.format,
                artifact.path.display(),
                format_size(artifact.bytes),
                report.pages
            );
        }
        for (format, e) in &report.failures {
            failed += 1;
            eprintln!(
                "{} {} as {format}: {e}",
                console::style("Failed").red(),
                tree.display()
            );
        }
    }

    if failed > 0 {
        Err(anyhow!("{failed} of the outputs failed to build"))
    } else {
        println!(
            "{} {} documents",
            console::style("Built").green().bold(),
            source.len()
        );
        Ok(())
    }
}

fn check(args: &ProjectArgs) -> Result<()> {
    let config = load_configuration(args)?;
    let settings = config.settings().with_context(|| "Invalid configuration")?;
    let source = TreeSource::from_config(&config.source).with_context(|| {
        format!(
            "Failed to find document trees in {}",
            config.source.directory.display()
        )
    })?;

    let progress = progress_bar(source.len());
    progress.set_message("Analysing trees...");
    let mut documents: Vec<(PathBuf, Document)> = Vec::with_capacity(source.len());
    for tree in &source.trees {
        progress.inc(1);
        let document = Document::load(tree)?;
        documents.push((tree.clone(), document));
    }
    progress.finish_and_clear();

    let stats = analyze_line_lengths(&documents, &settings);
    println!("Code line analysis:");
    println!("  Total lines:     {}", stats.total_lines);
    println!(
        "  Lines that wrap: {} ({:.1}%) at {} columns",
        stats.lines_that_wrap,
        stats.wrap_percentage(),
        settings.policy.max_line_width()
    );
    if let Some(longest) = &stats.longest_line {
        println!(
            "  Longest line:    {} columns ({} line {}, {})",
            longest.length,
            longest.tree.display(),
            longest.line_number,
            longest.node
        );
    }
    println!("  95th percentile: {} columns", stats.percentile_95);

    let assembler = Assembler::new(&settings);
    let mut warnings = 0;
    for (tree, document) in &documents {
        let rendered = assembler
            .assemble(document)
            .with_context(|| format!("Failed to assemble {}", tree.display()))?;
        for warning in rendered.warnings() {
            warnings += 1;
            println!(
                "{} {}: {warning}",
                console::style("Warning").yellow(),
                tree.display()
            );
        }
    }
    if warnings == 0 {
        println!("No blocks overflow their page.");
    }

    Ok(())
}
