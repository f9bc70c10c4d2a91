use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::analyzers::base::LanguageAnalyzer;
use crate::analyzers::registry::AnalyzerRegistry;
use crate::core::graph_contract::validate_graph_contract;
use crate::core::ignore_rules::build_exclusion_rules;
use crate::core::inventory::{read_code_file, scan_tree};
use crate::core::linking::link_imports;
use crate::core::records::{CodeFile, Entity, GraphBatch};
use crate::core::structure::build_directory_scaffold;
use crate::core::text::process_text;
use crate::core::types::EntityType;

/// What to extract from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractSource {
    /// A directory (walked recursively) or a single file.
    Path(PathBuf),
    /// Free text or a code snippet, handled by the text processor.
    Text(String),
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub batch: GraphBatch,
    pub files_analyzed: usize,
    pub files_skipped: usize,
    pub directories_pruned: usize,
}

#[derive(Debug, Clone)]
pub struct Extractor {
    registry: Arc<AnalyzerRegistry>,
    workers: usize,
    extra_excluded_dirs: Vec<String>,
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

impl Extractor {
    pub fn new(registry: Arc<AnalyzerRegistry>) -> Self {
        Self {
            registry,
            workers: default_workers(),
            extra_excluded_dirs: Vec::new(),
        }
    }

    /// Zero means "available parallelism".
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 { default_workers() } else { workers };
        self
    }

    pub fn with_extra_excluded_dirs(mut self, dirs: Vec<String>) -> Self {
        self.extra_excluded_dirs = dirs;
        self
    }

    pub fn registry(&self) -> &AnalyzerRegistry {
        &self.registry
    }

    pub fn extract(&self, source: &ExtractSource) -> anyhow::Result<ExtractionReport> {
        match source {
            ExtractSource::Text(text) => Ok(self.extract_text(text)),
            ExtractSource::Path(p) => {
                let meta = std::fs::metadata(p).with_context(|| format!("cannot read {}", p.display()))?;
                if meta.is_dir() {
                    self.extract_codebase(p)
                } else {
                    self.extract_file(p)
                }
            }
        }
    }

    /// File entity plus whatever the resolved analyzer finds in it.
    pub fn analyze_file(&self, file: &CodeFile) -> GraphBatch {
        let file_entity = file.file_entity();
        let analyzer = self.registry.resolve(&file.language);
        tracing::debug!(path = %file.path, language = %file.language, analyzer = analyzer.name(), "analyzing file");
        analyzer.analyze(file, &file_entity)
    }

    /// Walk `root`, analyze every eligible file, then add the directory scaffold
    /// and import links.
    pub fn extract_codebase(&self, root: &Path) -> anyhow::Result<ExtractionReport> {
        let rules = build_exclusion_rules(root, &self.extra_excluded_dirs)?;
        let scan = scan_tree(root, &rules)?;
        tracing::info!(
            root = %root.display(),
            files = scan.files.len(),
            pruned = scan.directories_pruned,
            "scan complete"
        );

        let (batches, read_failures) = self.analyze_all(&scan.files);

        let mut batch = GraphBatch::new();
        for b in batches {
            batch.extend(b);
        }

        let file_entities: Vec<&Entity> = batch.entities_of_type(EntityType::File).collect();
        let scaffold = build_directory_scaffold(root, &file_entities);
        let links = link_imports(&batch.entities);
        batch.extend(scaffold);
        batch.relationships.extend(links);
        batch.coalesce();
        validate_graph_contract(&batch)?;

        let files_analyzed = scan.files.len() - read_failures;
        let files_skipped = read_failures + scan.unreadable.len();
        tracing::info!(
            files_analyzed,
            files_skipped,
            entities = batch.entities.len(),
            relationships = batch.relationships.len(),
            "extraction complete"
        );

        Ok(ExtractionReport {
            batch,
            files_analyzed,
            files_skipped,
            directories_pruned: scan.directories_pruned,
        })
    }

    /// One file, no directory scaffold. Unmapped extensions fall back to the generic analyzer.
    pub fn extract_file(&self, path: &Path) -> anyhow::Result<ExtractionReport> {
        let file = read_code_file(path)?;
        let mut batch = self.analyze_file(&file);
        let links = link_imports(&batch.entities);
        batch.relationships.extend(links);
        batch.coalesce();
        validate_graph_contract(&batch)?;
        Ok(ExtractionReport {
            batch,
            files_analyzed: 1,
            files_skipped: 0,
            directories_pruned: 0,
        })
    }

    pub fn extract_text(&self, text: &str) -> ExtractionReport {
        let mut batch = process_text(text, None);
        batch.coalesce();
        ExtractionReport {
            batch,
            ..ExtractionReport::default()
        }
    }

    /// Read and analyze `files` on a scoped worker pool. Results come back in input order.
    fn analyze_all(&self, files: &[PathBuf]) -> (Vec<GraphBatch>, usize) {
        let next = AtomicUsize::new(0);
        let failures = AtomicUsize::new(0);
        let results: Mutex<Vec<(usize, GraphBatch)>> = Mutex::new(Vec::with_capacity(files.len()));
        let workers = self.workers.clamp(1, files.len().max(1));

        std::thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| {
                    loop {
                        let idx = next.fetch_add(1, Ordering::Relaxed);
                        let Some(path) = files.get(idx) else {
                            break;
                        };
                        match read_code_file(path) {
                            Ok(file) => {
                                let b = self.analyze_file(&file);
                                results
                                    .lock()
                                    .unwrap_or_else(PoisonError::into_inner)
                                    .push((idx, b));
                            }
                            Err(err) => {
                                tracing::warn!(path = %path.display(), error = %err, "skipping unreadable file");
                                failures.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                });
            }
        });

        let mut results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
        results.sort_by_key(|(idx, _)| *idx);
        (
            results.into_iter().map(|(_, b)| b).collect(),
            failures.into_inner(),
        )
    }
}
