//! Interactive configuration wizard for creating `doc-book.toml`.
//!
//! The wizard collects book metadata, where the parsed trees live, the page
//! layout and the output formats through a series of prompts. When trees are
//! already present it measures their code blocks and lets the user adjust
//! `max_line_width` until the amount of wrapping looks right.

use anyhow::{Context, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};
use doc_book::analysis::analyze_line_lengths;
use doc_book::config::{Configuration, ProjectConfig, SourceConfig, CONFIG_FILE};
use doc_book::document::Document;
use doc_book::sinks::{Html, Print};
use doc_book::source::TreeSource;
use globset::Glob;
use std::path::PathBuf;

/// Run the interactive configuration wizard.
///
/// Prompts for book metadata, source and layout settings and output formats,
/// then writes `doc-book.toml` to the current directory.
pub fn run() -> Result<()> {
    let theme = ColorfulTheme::default();

    let title: String = Input::with_theme(&theme)
        .with_prompt("Book title")
        .allow_empty(false)
        .interact()
        .with_context(|| "Failed to obtain title")?;

    let author: String = Input::with_theme(&theme)
        .with_prompt("Author (leave blank for none)")
        .allow_empty(true)
        .interact()?;
    let author = Some(author.trim().to_string()).filter(|a| !a.is_empty());

    let language: String = Input::with_theme(&theme)
        .with_prompt("Language (BCP 47, e.g. en, de)")
        .default("en".to_string())
        .interact()?;

    let directory: String = Input::with_theme(&theme)
        .with_prompt("Directory of parsed document trees")
        .default("trees".to_string())
        .interact()?;
    let directory = PathBuf::from(directory);

    let mut exclude_patterns: Vec<String> = Vec::new();
    if Confirm::with_theme(&theme)
        .with_prompt("Do you wish to exclude some trees from the build?")
        .default(false)
        .interact()?
    {
        'exclude: loop {
            if !exclude_patterns.is_empty() {
                println!("Excluded globs: [{}]", exclude_patterns.join("], ["));
            }
            let glob: String = Input::with_theme(&theme)
                .with_prompt("Glob of trees to exclude (leave empty for done)")
                .allow_empty(true)
                .interact()?;
            if glob.trim().is_empty() {
                break 'exclude;
            }

            Glob::new(glob.trim()).with_context(|| "Failed to parse glob!")?;
            exclude_patterns.push(glob.trim().to_string());
        }
    }

    let mut config = Configuration {
        project: ProjectConfig {
            title,
            author,
            language,
            ..ProjectConfig::default()
        },
        source: SourceConfig {
            directory,
            exclude_patterns,
        },
        ..Configuration::default()
    };

    config.layout.page_height_lines = Input::with_theme(&theme)
        .with_prompt("Lines per page")
        .default(config.layout.page_height_lines)
        .validate_with(|input: &usize| {
            if *input > 0 {
                Ok(())
            } else {
                Err("A page needs at least one line")
            }
        })
        .interact()?;

    choose_line_width(&theme, &mut config)?;

    if Confirm::with_theme(&theme)
        .with_prompt("Do you want print (paginated text) output?")
        .default(true)
        .interact()?
    {
        config.print = Some(Print {
            page_width_columns: config.layout.max_line_width,
            ..Print::default()
        });
    }
    if Confirm::with_theme(&theme)
        .with_prompt("Do you want HTML output?")
        .default(false)
        .interact()?
    {
        config.html = Some(Html::default());
    }

    // make sure what we write can be loaded again
    config
        .settings()
        .with_context(|| "The chosen settings are invalid")?;

    let contents = toml::to_string_pretty(&config)
        .with_context(|| "Failed to convert configuration to TOML")?;

    let config_path = PathBuf::from(CONFIG_FILE);
    if config_path.exists()
        && !Confirm::with_theme(&theme)
            .with_prompt(format!(
                "{CONFIG_FILE} already exists, do you want to override it?"
            ))
            .interact()?
    {
        println!("Configuration:");
        println!("{}", contents);
    } else {
        std::fs::write(&config_path, contents)
            .with_context(|| "Failed to write configuration file")?;
        println!("{CONFIG_FILE} written!");
    }

    Ok(())
}

/// Ask for `max_line_width`, showing how much code would wrap at each choice
/// when the trees can already be read.
fn choose_line_width(theme: &ColorfulTheme, config: &mut Configuration) -> Result<()> {
    let documents: Vec<(PathBuf, Document)> = match TreeSource::from_config(&config.source) {
        Ok(source) => source
            .trees
            .into_iter()
            .filter_map(|tree| Document::load(&tree).ok().map(|doc| (tree, doc)))
            .collect(),
        Err(e) => {
            log::debug!("not analysing trees: {e}");
            Vec::new()
        }
    };

    loop {
        config.layout.max_line_width = Input::with_theme(theme)
            .with_prompt("Maximum code line width (columns)")
            .default(config.layout.max_line_width)
            .validate_with(|input: &usize| {
                if *input > 1 {
                    Ok(())
                } else {
                    Err("Lines need room for at least one character and the continuation marker")
                }
            })
            .interact()?;

        if documents.is_empty() {
            return Ok(());
        }

        let settings = config.settings()?;
        let stats = analyze_line_lengths(&documents, &settings);
        println!(
            "{} of {} code lines would wrap ({:.1}%); longest is {} columns, 95% fit in {}",
            stats.lines_that_wrap,
            stats.total_lines,
            stats.wrap_percentage(),
            stats.longest_line_length(),
            stats.percentile_95
        );

        if stats.lines_that_wrap == 0
            || !Confirm::with_theme(theme)
                .with_prompt("Do you want to try a different width?")
                .default(false)
                .interact()?
        {
            return Ok(());
        }
    }
}
