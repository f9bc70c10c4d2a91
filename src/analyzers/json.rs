use serde_json::Value;

use crate::analyzers::base::LanguageAnalyzer;
use crate::core::records::{CodeFile, Entity, GraphBatch, Properties, Relationship};
use crate::core::types::{EntityType, RelationshipType};

/// (manifest key, dependencyType tag, category)
const DEPENDENCY_SECTIONS: &[(&str, &str, &str)] = &[
    ("dependencies", "dependency", "runtime"),
    ("devDependencies", "devDependency", "development"),
    ("peerDependencies", "peerDependency", "peer"),
    ("optionalDependencies", "optionalDependency", "optional"),
];

/// Only npm manifests carry structure worth extracting; other JSON files yield the file entity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JsonAnalyzer;

impl LanguageAnalyzer for JsonAnalyzer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn supported_languages(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn analyze(&self, file: &CodeFile, file_entity: &Entity) -> GraphBatch {
        let mut out = GraphBatch {
            entities: vec![file_entity.clone()],
            relationships: Vec::new(),
        };
        if file.name != "package.json" {
            return out;
        }

        let manifest: Value = match serde_json::from_str(&file.content) {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(path = %file.path, error = %err, "malformed package.json; keeping file entity only");
                return out;
            }
        };
        let Some(manifest) = manifest.as_object() else {
            return out;
        };

        if let Some(name) = manifest.get("name").and_then(Value::as_str) {
            let mut props = Properties::new();
            props.insert("sourceFile".to_string(), Value::String(file.path.clone()));
            props.insert("language".to_string(), Value::String(file.language.clone()));
            if let Some(version) = manifest.get("version").and_then(Value::as_str) {
                props.insert("version".to_string(), Value::String(version.to_string()));
            }
            let pkg = Entity::new(name, EntityType::Package, props);
            out.relationships
                .push(Relationship::between(file_entity, &pkg, RelationshipType::Defines));
            out.entities.push(pkg);
        }

        for (section, dependency_type, category) in DEPENDENCY_SECTIONS {
            let Some(deps) = manifest.get(*section).and_then(Value::as_object) else {
                continue;
            };
            for (name, version) in deps {
                let Some(version) = version.as_str() else {
                    continue;
                };
                let mut props = Properties::new();
                props.insert("version".to_string(), Value::String(version.to_string()));
                props.insert("sourceFile".to_string(), Value::String(file.path.clone()));
                props.insert("dependencyType".to_string(), Value::String(dependency_type.to_string()));
                props.insert("category".to_string(), Value::String(category.to_string()));
                let dep = Entity::new(name.as_str(), EntityType::Dependency, props);
                out.relationships.push(
                    Relationship::between(file_entity, &dep, RelationshipType::DependsOn)
                        .with_property("category", *category),
                );
                out.entities.push(dep);
            }
        }
        out
    }
}
