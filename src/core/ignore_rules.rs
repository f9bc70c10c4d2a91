use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// Directory names pruned anywhere below the walk root.
pub const EXCLUDED_DIR_NAMES: &[&str] = &[
    "node_modules",
    ".git",
    ".svn",
    "dist",
    "build",
    "out",
    "target",
    "bin",
    "obj",
    ".vscode",
    ".idea",
    "__pycache__",
    "coverage",
    ".nyc_output",
    "tmp",
    "temp",
    "logs",
    "vendor",
];

#[derive(Debug, Clone)]
pub struct ExclusionRules {
    gitignore: Gitignore,
}

impl ExclusionRules {
    /// `rel_posix_path` is relative to the walk root; the root itself is never passed here.
    pub fn is_excluded_dir(&self, rel_posix_path: &str) -> bool {
        if rel_posix_path.is_empty() {
            return false;
        }
        self.gitignore.matched(rel_posix_path, true).is_ignore()
    }
}

pub fn build_exclusion_rules(root: &Path, extra_dir_names: &[String]) -> anyhow::Result<ExclusionRules> {
    let mut b = GitignoreBuilder::new(root);
    for name in EXCLUDED_DIR_NAMES {
        b.add_line(None, &format!("{name}/"))?;
    }
    // any dot-directory
    b.add_line(None, ".*/")?;
    for name in extra_dir_names {
        let name = name.trim().trim_matches('/');
        if name.is_empty() {
            continue;
        }
        b.add_line(None, &format!("{name}/"))?;
    }

    let gi = b.build()?;
    Ok(ExclusionRules { gitignore: gi })
}
