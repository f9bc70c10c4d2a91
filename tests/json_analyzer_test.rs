mod common;

use code_knowledge_graph::analyzers::base::LanguageAnalyzer;
use code_knowledge_graph::analyzers::json::JsonAnalyzer;
use code_knowledge_graph::core::records::{CodeFile, GraphBatch};
use code_knowledge_graph::core::types::{EntityType, RelationshipType};
use common::{find, has_edge};

fn analyze(path: &str, content: &str) -> GraphBatch {
    let file = CodeFile::from_content(path, "json", content);
    JsonAnalyzer.analyze(&file, &file.file_entity())
}

#[test]
fn package_manifest_yields_package_and_dependencies() {
    let batch = analyze(
        "web/package.json",
        r#"{
            "name": "web-app",
            "version": "1.2.0",
            "dependencies": { "react": "^18.2.0", "axios": "1.6.0" },
            "devDependencies": { "jest": "^29.0.0" },
            "peerDependencies": { "react-dom": "^18.0.0" }
        }"#,
    );
    let file = &batch.entities[0];
    assert_eq!(file.entity_type, EntityType::File);

    let pkg = find(&batch, EntityType::Package, "web-app");
    assert_eq!(pkg.prop_str("version"), Some("1.2.0"));
    assert!(has_edge(&batch, file, RelationshipType::Defines, pkg));

    let react = find(&batch, EntityType::Dependency, "react");
    assert_eq!(react.prop_str("version"), Some("^18.2.0"));
    assert_eq!(react.prop_str("dependencyType"), Some("dependency"));
    assert_eq!(react.prop_str("category"), Some("runtime"));

    let jest = find(&batch, EntityType::Dependency, "jest");
    assert_eq!(jest.prop_str("category"), Some("development"));
    let peer = find(&batch, EntityType::Dependency, "react-dom");
    assert_eq!(peer.prop_str("dependencyType"), Some("peerDependency"));

    let depends: Vec<_> = batch.relationships_of_type(RelationshipType::DependsOn).collect();
    assert_eq!(depends.len(), 4);
    assert!(depends.iter().all(|r| r.source_id == file.id));
}

#[test]
fn malformed_manifest_keeps_only_the_file() {
    let batch = analyze("package.json", "{ \"name\": ");
    assert_eq!(batch.entities.len(), 1);
    assert!(batch.relationships.is_empty());
}

#[test]
fn other_json_files_are_not_interpreted() {
    let batch = analyze("config/settings.json", r#"{ "name": "x", "dependencies": { "a": "1" } }"#);
    assert_eq!(batch.entities.len(), 1);
    assert!(batch.relationships.is_empty());
}

#[test]
fn manifest_without_name_still_lists_dependencies() {
    let batch = analyze("package.json", r#"{ "dependencies": { "lodash": "4.17.21" } }"#);
    assert!(batch.entities_of_type(EntityType::Package).next().is_none());
    assert_eq!(batch.entities_of_type(EntityType::Dependency).count(), 1);
}
