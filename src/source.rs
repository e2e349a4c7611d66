//! Discovery of parsed document trees on disk.

use crate::config::SourceConfig;
use crate::error::{BuildError, ConfigurationError};
use globset::{Glob, GlobMatcher};
use ignore::Walk;
use std::path::{Path, PathBuf};

/// Compile exclude patterns, failing on the first one that isn't a valid glob.
pub fn compile_excludes(patterns: &[String]) -> Result<Vec<GlobMatcher>, ConfigurationError> {
    patterns
        .iter()
        .map(|pattern| {
            Glob::new(pattern)
                .map(|glob| glob.compile_matcher())
                .map_err(|e| ConfigurationError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.kind().to_string(),
                })
        })
        .collect()
}

/// The tree files of a project, sorted by path.
#[derive(Debug, Clone)]
pub struct TreeSource {
    pub root: PathBuf,
    pub trees: Vec<PathBuf>,
}

impl TreeSource {
    /// Walk `root` (honouring ignore files) for `.json` trees, leaving out
    /// anything whose path relative to `root` matches an exclude pattern.
    pub fn discover<P: Into<PathBuf>>(
        root: P,
        exclude_patterns: &[String],
    ) -> Result<TreeSource, BuildError> {
        let root: PathBuf = root.into();
        let block = compile_excludes(exclude_patterns)?;

        if !root.is_dir() {
            return Err(BuildError::Io {
                path: root.display().to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "source directory doesn't exist",
                ),
            });
        }

        let mut trees = Vec::new();
        for entry in Walk::new(&root) {
            let entry = entry.map_err(|e| BuildError::Io {
                path: root.display().to_string(),
                source: std::io::Error::other(e),
            })?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let relative = path.strip_prefix(&root).unwrap_or(path);
            if block.iter().any(|glob| glob.is_match(relative)) {
                log::debug!("excluding {}", relative.display());
                continue;
            }
            trees.push(entry.into_path());
        }
        trees.sort();

        log::debug!("found {} trees in {}", trees.len(), root.display());
        Ok(TreeSource { root, trees })
    }

    pub fn from_config(config: &SourceConfig) -> Result<TreeSource, BuildError> {
        TreeSource::discover(&config.directory, &config.exclude_patterns)
    }

    /// Path of a tree relative to the source directory, extension dropped.
    /// Artifacts are named after it.
    pub fn stem_of(&self, tree: &Path) -> PathBuf {
        tree.strip_prefix(&self.root)
            .unwrap_or(tree)
            .with_extension("")
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }
}
