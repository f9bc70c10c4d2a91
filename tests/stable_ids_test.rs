mod common;

use code_knowledge_graph::core::records::{Entity, Relationship};
use code_knowledge_graph::core::stable_ids::{entity_id, entity_key_parts, relationship_id, stable_id};
use code_knowledge_graph::core::types::{EntityType, RelationshipType};
use common::props;
use serde_json::json;

#[test]
fn stable_id_is_deterministic_and_sized() {
    let a = stable_id(["x", "y"]);
    let b = stable_id(["x", "y"]);
    assert_eq!(a, b);
    assert_eq!(a.len(), 32);
    assert_ne!(a, stable_id(["y", "x"]));
}

#[test]
fn entity_key_parts_follow_identity_order() {
    let p = props(json!({
        "sourceFile": "Pkg/A.go",
        "lineNumber": 3,
        "relativePath": "ignored/because/path/wins",
        "path": "Pkg/A.go",
        "package": "Main",
        "namespace": "Core",
    }));
    assert_eq!(
        entity_key_parts("Foo", EntityType::Class, &p),
        vec!["class", "foo", "pkg/a.go", "pkg/a.go", "line:3", "ns:core", "pkg:main"]
    );
}

#[test]
fn full_path_beats_path() {
    let p = props(json!({ "fullPath": "/abs/x.go", "path": "x.go" }));
    assert_eq!(entity_key_parts("x.go", EntityType::File, &p)[2], "/abs/x.go");
}

#[test]
fn entity_id_matches_known_digest() {
    let p = props(json!({ "sourceFile": "pkg/a.go", "lineNumber": 3 }));
    assert_eq!(entity_id("Foo", EntityType::Class, &p), "dfac425ccadfcb41d5608e1222d1fafd");
}

#[test]
fn identity_ignores_label_case_and_non_identity_properties() {
    let a = Entity::new("Foo", EntityType::Class, props(json!({ "sourceFile": "a.go", "lineNumber": 3 })));
    let b = Entity::new(
        "FOO",
        EntityType::Class,
        props(json!({ "sourceFile": "a.go", "lineNumber": 3, "isExported": true })),
    );
    assert_eq!(a.id, b.id);
}

#[test]
fn identity_distinguishes_type_file_and_line() {
    let base = Entity::new("Foo", EntityType::Class, props(json!({ "sourceFile": "a.go", "lineNumber": 3 })));
    let other_type = Entity::new("Foo", EntityType::Interface, props(json!({ "sourceFile": "a.go", "lineNumber": 3 })));
    let other_file = Entity::new("Foo", EntityType::Class, props(json!({ "sourceFile": "b.go", "lineNumber": 3 })));
    let other_line = Entity::new("Foo", EntityType::Class, props(json!({ "sourceFile": "a.go", "lineNumber": 4 })));
    assert_ne!(base.id, other_type.id);
    assert_ne!(base.id, other_file.id);
    assert_ne!(base.id, other_line.id);
}

#[test]
fn relationship_id_hashes_source_type_target() {
    assert_eq!(relationship_id("a", RelationshipType::Calls, "b"), "99d4a96d9d5d278c4e6c0bbc4cb7d129");
    let r = Relationship::new("a", "b", RelationshipType::Calls, Default::default());
    assert_eq!(r.id, stable_id(["a", "CALLS", "b"]));
    assert_ne!(r.id, relationship_id("b", RelationshipType::Calls, "a"));
}
