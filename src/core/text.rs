use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

use crate::core::records::{Entity, GraphBatch, Properties, Relationship};
use crate::core::types::{EntityType, RelationshipType};

pub const TEXT_ENTITY_CONFIDENCE: f64 = 0.7;
pub const TEXT_RELATIONSHIP_CONFIDENCE: f64 = 0.8;

/// Bytes of surrounding text kept in `extractedFrom`.
const CONTEXT_RADIUS: usize = 20;

fn re_doc_comment() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*\*(.*?)\*/").unwrap())
}

fn re_block_comment() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*(.*?)\*/").unwrap())
}

fn re_line_comment() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)//(.+)$").unwrap())
}

fn re_config_keyword() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(config|configuration|settings|options)\b").unwrap())
}

fn re_env_keyword() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(env|environment|ENV_\w+)\b").unwrap())
}

fn re_extends() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"class\s+(\w+)\s+extends\s+(\w+)").unwrap())
}

fn re_implements() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"class\s+(\w+)\s+implements\s+(\w+)").unwrap())
}

fn re_member_call() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\w+)\.(\w+)\(").unwrap())
}

fn entity_patterns() -> [(EntityType, &'static Regex); 5] {
    [
        (EntityType::Comment, re_doc_comment()),
        (EntityType::Comment, re_block_comment()),
        (EntityType::Comment, re_line_comment()),
        (EntityType::Configuration, re_config_keyword()),
        (EntityType::Configuration, re_env_keyword()),
    ]
}

fn relationship_patterns() -> [(RelationshipType, &'static Regex); 3] {
    [
        (RelationshipType::Extends, re_extends()),
        (RelationshipType::Implements, re_implements()),
        (RelationshipType::Uses, re_member_call()),
    ]
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

fn context_around(text: &str, start: usize, end: usize) -> &str {
    let from = floor_char_boundary(text, start.saturating_sub(CONTEXT_RADIUS));
    let to = ceil_char_boundary(text, (end + CONTEXT_RADIUS).min(text.len()));
    &text[from..to]
}

/// Doc-comment bodies keep their leading `*` decoration; drop it so the same
/// comment matched by two patterns dedups to one entity.
fn clean_capture(raw: &str) -> String {
    raw.trim().trim_start_matches('*').trim().to_string()
}

/// Pull COMMENT and CONFIGURATION entities out of free text or source code.
///
/// Each distinct text yields one entity, positioned at its first occurrence.
pub fn extract_text_entities(text: &str, source_file: Option<&str>) -> Vec<Entity> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for (entity_type, re) in entity_patterns() {
        for caps in re.captures_iter(text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let label = clean_capture(inner.as_str());
            if label.chars().count() < 2 || !seen.insert(label.clone()) {
                continue;
            }
            let mut props = Properties::new();
            props.insert(
                "extractedFrom".to_string(),
                Value::String(context_around(text, whole.start(), whole.end()).to_string()),
            );
            props.insert("position".to_string(), Value::from(whole.start() as u64));
            if let Some(sf) = source_file {
                props.insert("sourceFile".to_string(), Value::String(sf.to_string()));
            }
            out.push(Entity::new(label, entity_type, props).with_confidence(TEXT_ENTITY_CONFIDENCE));
        }
    }
    out
}

/// Exact (case-insensitive) label match first, then substring overlap in either direction.
fn find_by_text<'a>(needle: &str, entities: &'a [Entity]) -> Option<&'a Entity> {
    let needle = needle.to_lowercase();
    entities
        .iter()
        .find(|e| e.label.to_lowercase() == needle)
        .or_else(|| {
            entities.iter().find(|e| {
                let label = e.label.to_lowercase();
                label.contains(&needle) || needle.contains(&label)
            })
        })
}

pub fn extract_text_relationships(text: &str, entities: &[Entity], source_file: Option<&str>) -> Vec<Relationship> {
    let mut out = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for (rel_type, re) in relationship_patterns() {
        for caps in re.captures_iter(text) {
            let (Some(src), Some(dst)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let (Some(source), Some(target)) = (
                find_by_text(src.as_str().trim(), entities),
                find_by_text(dst.as_str().trim(), entities),
            ) else {
                continue;
            };
            if source.id == target.id {
                continue;
            }
            let mut rel = Relationship::between(source, target, rel_type)
                .with_confidence(TEXT_RELATIONSHIP_CONFIDENCE)
                .with_property("extractedFrom", &caps[0]);
            if let Some(sf) = source_file {
                rel = rel.with_property("sourceFile", sf);
            }
            if seen.insert(rel.id.clone()) {
                out.push(rel);
            }
        }
    }
    out
}

pub fn process_text(text: &str, source_file: Option<&str>) -> GraphBatch {
    let entities = extract_text_entities(text, source_file);
    let relationships = extract_text_relationships(text, &entities, source_file);
    tracing::debug!(
        entities = entities.len(),
        relationships = relationships.len(),
        "text processed"
    );
    GraphBatch {
        entities,
        relationships,
    }
}

/// Collapse whitespace runs and strip everything but word characters and basic punctuation.
pub fn clean_text(text: &str) -> String {
    fn re_space() -> &'static Regex {
        static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| Regex::new(r"\s+").unwrap())
    }
    fn re_noise() -> &'static Regex {
        static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| Regex::new(r"[^\w\s.,!?;:()\-]").unwrap())
    }
    let collapsed = re_space().replace_all(text, " ");
    re_noise().replace_all(&collapsed, "").trim().to_string()
}

pub fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
