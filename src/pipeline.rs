//! The build pipeline: tree files in, artifacts out.
//!
//! Each document is loaded, assembled and rendered by one worker; documents
//! are independent, so a build spreads them over the rayon thread pool. The
//! settings and backends are shared read-only between workers.

use crate::assembler::{Assembler, RenderedDocument};
use crate::config::{Configuration, Settings};
use crate::document::Document;
use crate::error::{BlockOverflowWarning, BuildError, RenderError};
use crate::sinks::{backend_for, render_to_file, Backend, Format};
use crate::source::TreeSource;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Load and assemble one tree.
pub fn build_document(path: &Path, settings: &Settings) -> Result<RenderedDocument, BuildError> {
    let document = Document::load(path)?;
    Assembler::new(settings).assemble(&document)
}

/// A file written by a backend.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub format: Format,
    pub path: PathBuf,
    pub bytes: u64,
}

/// What became of one tree.
#[derive(Debug)]
pub struct DocumentReport {
    pub tree: PathBuf,
    pub pages: usize,
    pub warnings: Vec<BlockOverflowWarning>,
    pub artifacts: Vec<Artifact>,
    /// Backends that failed; the others still ran
    pub failures: Vec<(Format, RenderError)>,
}

impl DocumentReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Pipeline {
    settings: Settings,
    backends: Vec<Box<dyn Backend>>,
    out_dir: PathBuf,
}

impl Pipeline {
    /// Validate the configuration and set up one backend per format. Repeated
    /// formats are only rendered once.
    pub fn new<P: Into<PathBuf>>(
        config: &Configuration,
        formats: &[Format],
        out_dir: P,
    ) -> Result<Pipeline, BuildError> {
        let settings = config.settings()?;
        let mut unique: Vec<Format> = Vec::new();
        for format in formats {
            if !unique.contains(format) {
                unique.push(*format);
            }
        }
        let backends = unique
            .into_iter()
            .map(|format| backend_for(format, config))
            .collect();

        Ok(Pipeline {
            settings,
            backends,
            out_dir: out_dir.into(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Build one tree. Structure and I/O errors fail the whole document; a
    /// render error only fails the backend it came from.
    pub fn build_one(&self, source: &TreeSource, tree: &Path) -> Result<DocumentReport, BuildError> {
        let rendered = build_document(tree, &self.settings)?;
        let stem = source.stem_of(tree);

        let mut report = DocumentReport {
            tree: tree.to_path_buf(),
            pages: rendered.physical_page_count(),
            warnings: rendered.warnings().to_vec(),
            artifacts: Vec::new(),
            failures: Vec::new(),
        };

        for backend in &self.backends {
            // appended, so dotted stems like `guide.v1` keep every part
            let mut name = stem.clone().into_os_string();
            name.push(".");
            name.push(backend.extension());
            let path = self.out_dir.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|source| BuildError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
            }

            match render_to_file(backend.as_ref(), &rendered, &path) {
                Ok(bytes) => {
                    log::info!("wrote {} ({} bytes)", path.display(), bytes);
                    report.artifacts.push(Artifact {
                        format: backend.format(),
                        path,
                        bytes,
                    });
                }
                Err(e) => {
                    log::error!(
                        "failed to render {} as {}: {e}",
                        tree.display(),
                        backend.format()
                    );
                    report.failures.push((backend.format(), e));
                }
            }
        }

        Ok(report)
    }

    /// Build every tree in parallel. Results come back in tree order;
    /// `on_done` is called as each tree finishes.
    pub fn build_all<F>(
        &self,
        source: &TreeSource,
        on_done: F,
    ) -> Vec<Result<DocumentReport, BuildError>>
    where
        F: Fn(&Path) + Sync,
    {
        source
            .trees
            .par_iter()
            .map(|tree| {
                let result = self.build_one(source, tree);
                on_done(tree);
                result
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const GUIDE: &str = r#"{
  "nodes": [
    { "kind": "heading", "level": 1, "text": "Intro", "children": [
      { "kind": "paragraph", "text": "Hello world." },
      { "kind": "verbatim_block", "language": "scala", "code": "val x = 1\n" }
    ] }
  ]
}"#;

    fn project() -> (tempfile::TempDir, Configuration) {
        let dir = tempfile::tempdir().unwrap();
        let trees = dir.path().join("trees");
        fs::create_dir_all(trees.join("part")).unwrap();
        fs::write(trees.join("guide.json"), GUIDE).unwrap();
        fs::write(trees.join("part").join("two.json"), GUIDE).unwrap();

        let mut config = Configuration::default();
        config.project.title = "Guide".to_string();
        config.project.date = Some("2025-01-01".to_string());
        config.source.directory = trees;
        (dir, config)
    }

    #[test]
    fn builds_every_tree_for_every_format() {
        let (dir, config) = project();
        let out = dir.path().join("out");
        let pipeline = Pipeline::new(&config, &[Format::Print, Format::Html, Format::Print], &out)
            .unwrap();
        let source = TreeSource::from_config(&config.source).unwrap();

        let results = pipeline.build_all(&source, |_| {});
        assert_eq!(results.len(), 2);
        for result in results {
            let report = result.unwrap();
            assert!(report.is_success());
            assert_eq!(report.artifacts.len(), 2);
            assert!(report.warnings.is_empty());
        }

        assert!(out.join("guide.txt").is_file());
        assert!(out.join("guide.html").is_file());
        assert!(out.join("part").join("two.txt").is_file());

        let html = fs::read_to_string(out.join("guide.html")).unwrap();
        assert!(html.contains("Hello world."));
    }

    #[test]
    fn malformed_trees_fail_only_themselves() {
        let (dir, config) = project();
        fs::write(
            config.source.directory.join("broken.json"),
            r#"{"nodes": [{"kind": "verbatim_block", "code": null}]}"#,
        )
        .unwrap();
        fs::write(config.source.directory.join("garbage.json"), "{ nope").unwrap();

        let pipeline = Pipeline::new(&config, &[Format::Print], dir.path().join("out")).unwrap();
        let source = TreeSource::from_config(&config.source).unwrap();
        let results = pipeline.build_all(&source, |_| {});

        // broken, garbage, guide, part/two
        assert!(matches!(results[0], Err(BuildError::Structure(_))));
        assert!(matches!(results[1], Err(BuildError::Tree { .. })));
        assert!(results[2].is_ok());
        assert!(results[3].is_ok());
        assert!(!dir.path().join("out").join("broken.txt").exists());
    }

    #[test]
    fn dotted_tree_names_get_their_own_artifacts() {
        let (dir, config) = project();
        fs::write(config.source.directory.join("guide.v1.json"), GUIDE).unwrap();
        fs::write(config.source.directory.join("guide.v2.json"), GUIDE).unwrap();
        let out = dir.path().join("out");
        let pipeline = Pipeline::new(&config, &[Format::Html], &out).unwrap();
        let source = TreeSource::from_config(&config.source).unwrap();

        let mut paths: Vec<PathBuf> = pipeline
            .build_all(&source, |_| {})
            .into_iter()
            .flat_map(|result| result.unwrap().artifacts)
            .map(|artifact| artifact.path)
            .collect();
        paths.sort();
        paths.dedup();

        assert_eq!(paths.len(), 4);
        assert!(out.join("guide.html").is_file());
        assert!(out.join("guide.v1.html").is_file());
        assert!(out.join("guide.v2.html").is_file());
        assert!(out.join("part").join("two.html").is_file());
    }

    #[test]
    fn a_failing_backend_leaves_the_others_alone() {
        let (dir, config) = project();
        let out = dir.path().join("out");
        fs::create_dir_all(out.join("guide.txt")).unwrap();
        let pipeline = Pipeline::new(&config, &[Format::Print, Format::Html], &out).unwrap();
        let source = TreeSource::from_config(&config.source).unwrap();
        let guide = config.source.directory.join("guide.json");

        let report = pipeline.build_one(&source, &guide).unwrap();
        assert!(!report.is_success());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, Format::Print);
        assert_eq!(report.artifacts.len(), 1);
        assert_eq!(report.artifacts[0].format, Format::Html);
        assert!(out.join("guide.html").is_file());
        assert!(out.join("guide.txt").is_dir());
    }

    #[test]
    fn invalid_configuration_stops_before_any_document() {
        let (dir, mut config) = project();
        config.layout.max_line_width = 0;
        assert!(matches!(
            Pipeline::new(&config, &[Format::Print], dir.path().join("out")),
            Err(BuildError::Configuration(_))
        ));
    }
}
