use crate::core::records::{Entity, Relationship};
use crate::core::types::{EntityType, RelationshipType};

/// Strip relative-path prefixes so `./utils` can match `utils.ts`.
fn normalize_source(source: &str) -> &str {
    let mut s = source.trim();
    loop {
        if let Some(rest) = s.strip_prefix("./") {
            s = rest;
        } else if let Some(rest) = s.strip_prefix("../") {
            s = rest;
        } else {
            return s;
        }
    }
}

/// Emit REFERENCES import → module for every import whose source textually
/// overlaps a FILE/MODULE entity: the last source segment must occur in the
/// candidate's label and the whole normalized source in its path.
///
/// First match wins; an import never references the file it was declared in.
pub fn link_imports(entities: &[Entity]) -> Vec<Relationship> {
    let modules: Vec<&Entity> = entities
        .iter()
        .filter(|e| matches!(e.entity_type, EntityType::File | EntityType::Module))
        .collect();

    let mut out = Vec::new();
    for import in entities.iter().filter(|e| e.entity_type == EntityType::Import) {
        let Some(source) = import.prop_str("source") else {
            continue;
        };
        let needle = normalize_source(source);
        let stem = needle.rsplit('/').next().unwrap_or(needle);
        if stem.is_empty() {
            continue;
        }
        let declared_in = import.prop_str("sourceFile");

        let target = modules.iter().find(|m| {
            let Some(path) = m.prop_str("path") else {
                return false;
            };
            if declared_in == Some(path) {
                return false;
            }
            m.label.contains(stem) && path.contains(needle)
        });
        if let Some(m) = target {
            out.push(
                Relationship::between(import, m, RelationshipType::References)
                    .with_property("source", source),
            );
        }
    }
    out
}
