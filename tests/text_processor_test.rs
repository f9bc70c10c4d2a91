mod common;

use code_knowledge_graph::core::text::{
    TEXT_ENTITY_CONFIDENCE, TEXT_RELATIONSHIP_CONFIDENCE, clean_text, extract_text_entities,
    extract_text_relationships, process_text, split_sentences,
};
use code_knowledge_graph::core::records::{Entity, Properties};
use code_knowledge_graph::core::types::{EntityType, RelationshipType};
use common::{find, has_edge, labels_of};
use serde_json::json;

const SNIPPET: &str = "/** Handles user config */\nclass UserService extends BaseService {}\n// env setup\nconst port = ENV_PORT;\n";

#[test]
fn comments_and_configuration_keywords() {
    let batch = process_text(SNIPPET, Some("snippet.ts"));
    assert_eq!(labels_of(&batch, EntityType::Comment), vec!["Handles user config", "env setup"]);
    assert_eq!(labels_of(&batch, EntityType::Configuration), vec!["config", "env", "ENV_PORT"]);
    assert!(batch.entities.iter().all(|e| e.confidence == TEXT_ENTITY_CONFIDENCE));

    let doc = find(&batch, EntityType::Comment, "Handles user config");
    assert_eq!(doc.properties["position"], json!(0));
    assert_eq!(doc.prop_str("sourceFile"), Some("snippet.ts"));
    assert!(doc.prop_str("extractedFrom").unwrap().contains("/** Handles user config */"));
}

#[test]
fn duplicate_text_yields_one_entity() {
    let entities = extract_text_entities("// retry\nfoo();\n// retry\n", None);
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].label, "retry");
    assert_eq!(entities[0].properties["position"], json!(0));
    assert!(entities[0].prop_str("sourceFile").is_none());
}

#[test]
fn single_character_captures_are_dropped() {
    assert!(extract_text_entities("//x\n", None).is_empty());
}

fn class(label: &str) -> Entity {
    Entity::new(label, EntityType::Class, Properties::new())
}

#[test]
fn relationships_match_labels_exactly_then_partially() {
    let entities = vec![class("UserService"), class("BaseService"), class("Loader")];
    let text = "class UserService extends BaseService {}\nclass UserService implements Runnable\nuser.load();\n";
    let rels = extract_text_relationships(text, &entities, Some("a.ts"));

    assert_eq!(rels.len(), 2);
    let extends = &rels[0];
    assert_eq!(extends.rel_type, RelationshipType::Extends);
    assert_eq!(extends.source_id, entities[0].id);
    assert_eq!(extends.target_id, entities[1].id);
    assert_eq!(extends.confidence, TEXT_RELATIONSHIP_CONFIDENCE);
    assert_eq!(extends.properties["extractedFrom"], json!("class UserService extends BaseService"));
    assert_eq!(extends.properties["sourceFile"], json!("a.ts"));

    let uses = &rels[1];
    assert_eq!(uses.rel_type, RelationshipType::Uses);
    assert_eq!(uses.source_id, entities[0].id);
    assert_eq!(uses.target_id, entities[2].id);
}

#[test]
fn process_text_links_its_own_entities() {
    let text = "// settings loader\nsettings.reload();\n";
    let batch = process_text(text, None);
    let comment = find(&batch, EntityType::Comment, "settings loader");
    let settings = find(&batch, EntityType::Configuration, "settings");
    assert_ne!(comment.id, settings.id);
    // `reload` overlaps no extracted label
    assert!(batch.relationships.is_empty());

    let batch = process_text("// config loader\nconfig.loader();\n", None);
    let config = find(&batch, EntityType::Configuration, "config");
    let comment = find(&batch, EntityType::Comment, "config loader");
    assert!(has_edge(&batch, config, RelationshipType::Uses, comment));
}

#[test]
fn clean_text_collapses_whitespace_and_noise() {
    assert_eq!(clean_text("  hello,\t\n world!@#$ (ok) "), "hello, world! (ok)");
    assert_eq!(clean_text(""), "");
}

#[test]
fn split_sentences_drops_empty_fragments() {
    assert_eq!(
        split_sentences("First one. Second!  Third?.."),
        vec!["First one", "Second", "Third"]
    );
    assert!(split_sentences("...").is_empty());
}
