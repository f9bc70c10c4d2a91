use anyhow::Context;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};

use crate::core::ignore_rules::ExclusionRules;
use crate::core::records::CodeFile;

pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Extensions eligible for extraction. Anything else is never read.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".py", ".java", ".cpp", ".c", ".h", ".hpp", ".cs",
    ".go", ".rs", ".rb", ".php", ".json", ".yaml", ".yml", ".xml", ".md", ".txt", ".sql",
];

pub fn is_supported_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}

/// Language tag for an extension (leading dot included). Unmapped extensions yield `"unknown"`.
pub fn language_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        ".ts" | ".tsx" => "typescript",
        ".js" | ".jsx" | ".mjs" | ".cjs" => "javascript",
        ".py" => "python",
        ".java" => "java",
        ".cpp" | ".hpp" => "cpp",
        ".c" | ".h" => "c",
        ".cs" => "csharp",
        ".go" => "go",
        ".rs" => "rust",
        ".rb" => "ruby",
        ".php" => "php",
        ".json" => "json",
        ".yaml" | ".yml" => "yaml",
        ".xml" => "xml",
        ".md" => "markdown",
        ".sql" => "sql",
        _ => UNKNOWN_LANGUAGE,
    }
}

pub fn extension_of(p: &Path) -> String {
    p.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_default()
}

pub fn to_posix(p: &Path) -> String {
    p.to_string_lossy().replace('\\', "/")
}

pub fn to_posix_rel_path(root: &Path, p: &Path) -> String {
    let rel = p.strip_prefix(root).unwrap_or(p);
    let mut out = String::new();
    for c in rel.components() {
        let s = match c {
            Component::Normal(os) => os.to_string_lossy(),
            _ => continue,
        };
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(&s);
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Eligible files in walk order (sorted by name per directory).
    pub files: Vec<PathBuf>,
    pub directories_pruned: usize,
    /// Entries the walker could not read, with the reason.
    pub unreadable: Vec<(String, String)>,
}

/// Walk `root` depth-first, pruning excluded directories and keeping supported files.
///
/// An unreadable root is fatal; unreadable entries below it are recorded and skipped.
pub fn scan_tree(root: &Path, rules: &ExclusionRules) -> anyhow::Result<ScanOutcome> {
    let meta = std::fs::metadata(root).with_context(|| format!("cannot read root {}", root.display()))?;
    if meta.is_dir() {
        std::fs::read_dir(root).with_context(|| format!("cannot list root {}", root.display()))?;
    }

    let mut out = ScanOutcome::default();
    let pruned = std::cell::Cell::new(0usize);
    let walker = walkdir::WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let rel = to_posix_rel_path(root, e.path());
            if rules.is_excluded_dir(&rel) {
                tracing::debug!(dir = %rel, "pruning excluded directory");
                pruned.set(pruned.get() + 1);
                return false;
            }
            true
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                let path = err.path().map(to_posix).unwrap_or_default();
                if err.depth() == 0 {
                    return Err(anyhow::anyhow!(err).context(format!("cannot walk root {}", root.display())));
                }
                tracing::warn!(path = %path, error = %err, "skipping unreadable entry");
                out.unreadable.push((path, err.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if is_supported_extension(&extension_of(entry.path())) {
            out.files.push(entry.path().to_path_buf());
        }
    }

    out.directories_pruned = pruned.get();
    Ok(out)
}

/// Read one file into a [`CodeFile`]. Invalid UTF-8 is replaced, not rejected.
pub fn read_code_file(p: &Path) -> anyhow::Result<CodeFile> {
    let meta = std::fs::metadata(p).with_context(|| format!("stat {}", p.display()))?;
    let bytes = std::fs::read(p).with_context(|| format!("read {}", p.display()))?;
    let content = String::from_utf8_lossy(&bytes).into_owned();
    let extension = extension_of(p);
    let last_modified = meta.modified().ok().map(DateTime::<Utc>::from);

    Ok(CodeFile {
        path: to_posix(p),
        name: p
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        language: language_for_extension(&extension).to_string(),
        extension,
        size: meta.len(),
        content,
        last_modified,
    })
}
