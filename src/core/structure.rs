use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::inventory::{to_posix, to_posix_rel_path};
use crate::core::records::{Entity, GraphBatch, Properties, Relationship};
use crate::core::types::{EntityType, RelationshipType};

fn directory_label(dir: &Path) -> String {
    match dir.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => "root".to_string(),
    }
}

fn full_path(dir: &Path) -> String {
    std::path::absolute(dir)
        .map(|p| to_posix(&p))
        .unwrap_or_else(|_| to_posix(dir))
}

fn directory_entity(root: &Path, dir: &Path) -> Entity {
    let mut props = Properties::new();
    props.insert("path".to_string(), Value::String(to_posix(dir)));
    props.insert("relativePath".to_string(), Value::String(to_posix_rel_path(root, dir)));
    props.insert("fullPath".to_string(), Value::String(full_path(dir)));
    Entity::new(directory_label(dir), EntityType::Directory, props)
}

/// Directory chain of one file: parent first, walk root last. Never climbs above the root.
fn enclosing_dirs(root: &Path, file: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for anc in file.ancestors().skip(1) {
        if anc.as_os_str().is_empty() || !anc.starts_with(root) {
            break;
        }
        out.push(anc.to_path_buf());
        if anc == root {
            break;
        }
    }
    out
}

/// Build DIRECTORY entities for every enclosing directory of the given FILE entities,
/// plus CONTAINS edges directory → subdirectory and directory → file.
///
/// Files are joined to directories by exact match of their `path` property's parent.
pub fn build_directory_scaffold(root: &Path, file_entities: &[&Entity]) -> GraphBatch {
    let mut dirs: BTreeMap<PathBuf, Entity> = BTreeMap::new();
    for f in file_entities {
        let Some(path) = f.prop_str("path") else {
            continue;
        };
        for dir in enclosing_dirs(root, Path::new(path)) {
            if dirs.contains_key(&dir) {
                // ancestors of a known directory are already present
                break;
            }
            let entity = directory_entity(root, &dir);
            dirs.insert(dir, entity);
        }
    }

    let mut out = GraphBatch::new();
    for (dir, entity) in &dirs {
        if dir.as_path() == root {
            continue;
        }
        if let Some(parent) = dir.parent().and_then(|p| dirs.get(p)) {
            out.relationships
                .push(Relationship::between(parent, entity, RelationshipType::Contains));
        }
    }

    for f in file_entities {
        let Some(path) = f.prop_str("path") else {
            continue;
        };
        if let Some(dir) = Path::new(path).parent().and_then(|p| dirs.get(p)) {
            out.relationships
                .push(Relationship::between(dir, f, RelationshipType::Contains));
        }
    }

    out.entities = dirs.into_values().collect();
    out
}
