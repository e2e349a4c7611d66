//! The `doc-book.toml` configuration file.
//!
//! The file is plain serde data; nothing in it is trusted until
//! [`Configuration::settings`] has validated it into the runtime objects the
//! pipeline uses (the [`NormalizationTable`], the [`WrapPolicy`], page
//! dimensions and document metadata). Validation happens once, before any
//! document is touched, so a bad configuration never produces partial output.

use crate::assembler::Metadata;
use crate::error::ConfigurationError;
use crate::sinks::{Html, Print};
use crate::unicode::{default_rules, CodePointRun, NormalizationTable, SubstitutionRule};
use crate::verbatim::WrapPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the configuration file looked for in the working directory.
pub const CONFIG_FILE: &str = "doc-book.toml";

/// Complete configuration for a doc-book project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    pub project: ProjectConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub unicode: UnicodeConfig,
    #[serde(default)]
    pub print: Option<Print>,
    #[serde(default)]
    pub html: Option<Html>,
}

/// Book metadata, used for the title page and running headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    /// Date shown on the title page. Defaults to the day of the build.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    /// Title page text with `{title}`, `{author}` and `{date}` placeholders
    #[serde(default = "default_title_page_template")]
    pub title_page_template: String,
}

fn default_language() -> String {
    "en".to_string()
}

pub fn default_title_page_template() -> String {
    r#"{title}

- by -

{author}

{date}"#
        .to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            title: "Untitled".to_string(),
            author: None,
            date: None,
            language: default_language(),
            title_page_template: default_title_page_template(),
        }
    }
}

/// Where parsed document trees are found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory holding one `.json` tree per document
    #[serde(default = "default_source_directory")]
    pub directory: PathBuf,
    /// Globs of tree files to leave out
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_source_directory() -> PathBuf {
    PathBuf::from("trees")
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            directory: default_source_directory(),
            exclude_patterns: Vec::new(),
        }
    }
}

/// Wrap policy and page geometry, all measured in character columns and lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_true")]
    pub wrap_long_lines: bool,
    #[serde(default)]
    pub break_anywhere: bool,
    /// Widest verbatim line, continuation marker included
    #[serde(default = "default_max_line_width")]
    pub max_line_width: usize,
    #[serde(default = "default_continuation_marker")]
    pub continuation_marker: String,
    /// Width prose is wrapped to
    #[serde(default = "default_text_width")]
    pub text_width: usize,
    /// Lines of content per page
    #[serde(default = "default_page_height_lines")]
    pub page_height_lines: usize,
}

fn default_true() -> bool {
    true
}
fn default_max_line_width() -> usize {
    80
}
fn default_continuation_marker() -> String {
    "\\".to_string()
}
fn default_text_width() -> usize {
    72
}
fn default_page_height_lines() -> usize {
    54
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            wrap_long_lines: true,
            break_anywhere: false,
            max_line_width: default_max_line_width(),
            continuation_marker: default_continuation_marker(),
            text_width: default_text_width(),
            page_height_lines: default_page_height_lines(),
        }
    }
}

impl LayoutConfig {
    pub fn wrap_policy(&self) -> Result<WrapPolicy, ConfigurationError> {
        WrapPolicy::new(self.wrap_long_lines, self.break_anywhere, self.max_line_width)?
            .with_continuation_marker(self.continuation_marker.clone())
    }
}

/// A single `[[unicode.substitutions]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionEntry {
    /// `U+202F`, `0x202F`, a literal character, or a run like `U+2500..U+257F`
    pub codepoint: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnicodeConfig {
    /// Start from the built-in substitutions for spaces, tabs and box drawing
    #[serde(default = "default_true")]
    pub include_defaults: bool,
    #[serde(default)]
    pub substitutions: Vec<SubstitutionEntry>,
}

impl Default for UnicodeConfig {
    fn default() -> Self {
        UnicodeConfig {
            include_defaults: true,
            substitutions: Vec::new(),
        }
    }
}

impl UnicodeConfig {
    /// Build the substitution table. Configured rules come after the
    /// defaults, and may not claim a code point the defaults already cover.
    pub fn table(&self) -> Result<NormalizationTable, ConfigurationError> {
        let mut rules = if self.include_defaults {
            default_rules()
        } else {
            Vec::new()
        };
        for entry in &self.substitutions {
            rules.push(SubstitutionRule::new(
                CodePointRun::parse(&entry.codepoint)?,
                entry.replacement.clone(),
            ));
        }
        NormalizationTable::new(rules)
    }
}

/// Validated, read-only settings shared by every document of a build.
#[derive(Debug, Clone)]
pub struct Settings {
    pub table: NormalizationTable,
    pub policy: WrapPolicy,
    pub page_height_lines: usize,
    pub text_width: usize,
    pub metadata: Metadata,
    pub title_page_template: String,
}

impl Configuration {
    pub fn from_toml_str(contents: &str) -> Result<Configuration, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// Validate the configuration into build settings.
    pub fn settings(&self) -> Result<Settings, ConfigurationError> {
        let layout = &self.layout;
        if layout.page_height_lines == 0 {
            return Err(ConfigurationError::ZeroDimension {
                field: "page_height_lines",
            });
        }
        if layout.text_width == 0 {
            return Err(ConfigurationError::ZeroDimension {
                field: "text_width",
            });
        }

        let policy = layout.wrap_policy()?;
        let table = self.unicode.table()?;

        let date = self
            .project
            .date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

        Ok(Settings {
            table,
            policy,
            page_height_lines: layout.page_height_lines,
            text_width: layout.text_width,
            metadata: Metadata {
                title: self.project.title.clone(),
                author: self.project.author.clone(),
                date,
                language: self.project.language.clone(),
            },
            title_page_template: self.project.title_page_template.clone(),
        })
    }
}
