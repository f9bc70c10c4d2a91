use regex::Regex;
use serde_json::Value;

use crate::analyzers::base::LanguageAnalyzer;
use crate::analyzers::calls::link_call_sites;
use crate::analyzers::common::{
    brace_delta, code_entity, is_comment, link_supertypes, split_top_level, string_list, strip_generics,
};
use crate::core::records::{CodeFile, Entity, GraphBatch, Properties, Relationship};
use crate::core::types::{EntityType, RelationshipType};

const COMMENT_PREFIXES: &[&str] = &["//", "/*", "*"];

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "static", "final", "abstract", "synchronized", "native", "default",
    "transient", "volatile", "strictfp", "sealed", "non-sealed",
];

const STATEMENT_KEYWORDS: &[&str] = &[
    "return", "new", "throw", "if", "else", "for", "while", "switch", "case", "catch", "try", "do", "this",
    "super", "yield", "assert",
];

fn re_package() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^package\s+([\w.]+)\s*;").unwrap())
}

fn re_import() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^import\s+(static\s+)?([\w.]+(?:\.\*)?)\s*;").unwrap())
}

fn re_type_decl() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^((?:(?:public|private|protected|static|final|abstract|sealed|non-sealed|strictfp)\s+)*)(class|interface|enum|record|@interface)\s+(\w+)(?:<[^{]*?>)?(?:\s*\([^)]*\))?(?:\s+extends\s+([^{]+?))?(?:\s+implements\s+([^{]+?))?(?:\s+permits\s+[^{]+?)?\s*(?:\{.*)?$",
        )
        .unwrap()
    })
}

fn re_method() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^((?:(?:public|private|protected|static|final|abstract|synchronized|native|default|strictfp)\s+)*)(?:<[^>]+>\s+)?(?:([\w.$\[\]<>?, ]+?)\s+)?(\w+)\s*\(([^)]*)\)?\s*(?:throws\s+[\w.,\s]+?)?\s*(?:;|\{.*)?$",
        )
        .unwrap()
    })
}

fn re_field() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^((?:(?:public|private|protected|static|final|transient|volatile)\s+)*)([\w.$\[\]<>?, ]+?)\s+(\w+)\s*(?:=\s*(.*?))?;\s*$",
        )
        .unwrap()
    })
}

fn modifiers_of(raw: &str) -> Vec<&str> {
    raw.split_whitespace().filter(|w| MODIFIERS.contains(w)).collect()
}

fn visibility(modifiers: &[&str]) -> &'static str {
    if modifiers.contains(&"public") {
        "public"
    } else if modifiers.contains(&"private") {
        "private"
    } else if modifiers.contains(&"protected") {
        "protected"
    } else {
        "package"
    }
}

fn type_list(raw: Option<&str>) -> Vec<String> {
    raw.map(split_top_level)
        .unwrap_or_default()
        .into_iter()
        .map(|t| strip_generics(&t).to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn strip_annotations(line: &str) -> &str {
    let mut s = line;
    while let Some(rest) = s.strip_prefix('@') {
        if rest.starts_with("interface") {
            return s;
        }
        // skip `@Name` or `@Name(...)`
        let end = rest.find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.')).unwrap_or(rest.len());
        let mut after = &rest[end..];
        if after.starts_with('(') {
            match after.find(')') {
                Some(close) => after = &after[close + 1..],
                None => return "",
            }
        }
        s = after.trim_start();
    }
    s
}

/// An open type body and the brace depth at which its members are declared.
struct OpenType {
    entity: usize,
    body_depth: i32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JavaAnalyzer;

impl LanguageAnalyzer for JavaAnalyzer {
    fn name(&self) -> &'static str {
        "java"
    }

    fn supported_languages(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn analyze(&self, file: &CodeFile, file_entity: &Entity) -> GraphBatch {
        let lines: Vec<&str> = file.content.lines().collect();
        let mut entities: Vec<Entity> = vec![file_entity.clone()];
        let mut relationships: Vec<Relationship> = Vec::new();

        let mut depth: i32 = 0;
        let mut open: Vec<OpenType> = Vec::new();
        let mut pending_type: Option<usize> = None;
        let mut in_block_comment = false;

        for (i, raw) in lines.iter().enumerate() {
            let ln = i + 1;
            let trimmed = raw.trim();
            if in_block_comment {
                if trimmed.contains("*/") {
                    in_block_comment = false;
                }
                continue;
            }
            if trimmed.starts_with("/*") && !trimmed.contains("*/") {
                in_block_comment = true;
                continue;
            }
            if trimmed.is_empty() || is_comment(trimmed, COMMENT_PREFIXES) {
                continue;
            }
            let delta = brace_delta(trimmed);
            let line = strip_annotations(trimmed);

            if depth == 0 && open.is_empty() {
                if let Some(m) = re_package().captures(line) {
                    let pkg = code_entity(file, &m[1], EntityType::Package, ln, Properties::new());
                    relationships.push(Relationship::between(file_entity, &pkg, RelationshipType::Defines));
                    entities.push(pkg);
                    continue;
                }
                if let Some(m) = re_import().captures(line) {
                    let path = &m[2];
                    let label = path.trim_end_matches(".*").rsplit('.').next().unwrap_or(path);
                    let mut extra = Properties::new();
                    extra.insert("source".to_string(), Value::String(path.replace('.', "/")));
                    extra.insert("qualifiedName".to_string(), Value::String(path.to_string()));
                    extra.insert("isStatic".to_string(), Value::Bool(m.get(1).is_some()));
                    extra.insert("isWildcard".to_string(), Value::Bool(path.ends_with(".*")));
                    let e = code_entity(file, label, EntityType::Import, ln, extra);
                    relationships.push(Relationship::between(file_entity, &e, RelationshipType::Imports));
                    entities.push(e);
                    continue;
                }
            }

            let member_depth = open.last().map(|t| t.body_depth);
            let at_member_level = member_depth == Some(depth);

            if let Some(m) = re_type_decl().captures(line) {
                let modifiers = modifiers_of(m.get(1).map(|x| x.as_str()).unwrap_or(""));
                let kind = &m[2];
                let entity_type = match kind {
                    "interface" | "@interface" => EntityType::Interface,
                    "enum" => EntityType::Enum,
                    _ => EntityType::Class,
                };
                let mut extra = Properties::new();
                extra.insert("kind".to_string(), Value::String(kind.trim_start_matches('@').to_string()));
                extra.insert("visibility".to_string(), Value::String(visibility(&modifiers).to_string()));
                extra.insert("isAbstract".to_string(), Value::Bool(modifiers.contains(&"abstract")));
                extra.insert("isStatic".to_string(), Value::Bool(modifiers.contains(&"static")));
                extra.insert("extends".to_string(), string_list(type_list(m.get(4).map(|x| x.as_str()))));
                extra.insert("implements".to_string(), string_list(type_list(m.get(5).map(|x| x.as_str()))));
                let te = code_entity(file, &m[3], entity_type, ln, extra);
                match open.last() {
                    Some(outer) => relationships.push(Relationship::between(
                        &entities[outer.entity],
                        &te,
                        RelationshipType::Contains,
                    )),
                    None => relationships.push(Relationship::between(file_entity, &te, RelationshipType::Defines)),
                }
                pending_type = Some(entities.len());
                entities.push(te);
            } else if at_member_level {
                let owner = open.last().map(|t| t.entity).unwrap_or(0);
                let owner_label = entities[owner].label.clone();
                if let Some(member) = member_entity(file, line, ln, &owner_label) {
                    relationships.push(Relationship::between(&entities[owner], &member, RelationshipType::Contains));
                    entities.push(member);
                }
            }

            if delta > 0 {
                if let Some(idx) = pending_type.take() {
                    open.push(OpenType {
                        entity: idx,
                        body_depth: depth + 1,
                    });
                }
            } else if line.contains('{') {
                // `enum Color { RED, GREEN }`, `interface Marker {}`
                pending_type = None;
            }
            depth += delta;
            while open.last().is_some_and(|t| t.body_depth > depth) {
                open.pop();
            }
        }

        relationships.extend(link_supertypes(&entities));
        relationships.extend(link_call_sites(&lines, &entities, COMMENT_PREFIXES));

        GraphBatch {
            entities,
            relationships,
        }
    }
}

fn member_entity(file: &CodeFile, line: &str, ln: usize, owner: &str) -> Option<Entity> {
    let first = line.split_whitespace().next().unwrap_or("");
    if STATEMENT_KEYWORDS.contains(&first) || first.starts_with('}') {
        return None;
    }

    let paren = line.find('(');
    let assign = line.find('=');
    let is_call_shape = match (paren, assign) {
        (Some(p), Some(a)) => p < a,
        (Some(_), None) => true,
        _ => false,
    };

    if is_call_shape {
        let m = re_method().captures(line)?;
        let name = &m[3];
        if STATEMENT_KEYWORDS.contains(&name) {
            return None;
        }
        let modifiers = modifiers_of(m.get(1).map(|x| x.as_str()).unwrap_or(""));
        let return_type = m.get(2).map(|r| r.as_str().trim().to_string());
        let is_constructor = return_type.is_none() && name == owner;
        if return_type.is_none() && !is_constructor {
            return None;
        }
        let bodiless = line.trim_end().ends_with(';');
        let mut extra = Properties::new();
        extra.insert("visibility".to_string(), Value::String(visibility(&modifiers).to_string()));
        extra.insert("isStatic".to_string(), Value::Bool(modifiers.contains(&"static")));
        extra.insert("isConstructor".to_string(), Value::Bool(is_constructor));
        extra.insert(
            "parameters".to_string(),
            string_list(m.get(4).map(|p| split_top_level(p.as_str())).unwrap_or_default()),
        );
        extra.insert("returnType".to_string(), Value::String(return_type.unwrap_or_default()));
        if bodiless {
            extra.insert("abstract".to_string(), Value::Bool(true));
        }
        return Some(code_entity(file, name, EntityType::Method, ln, extra));
    }

    let m = re_field().captures(line)?;
    let modifiers = modifiers_of(m.get(1).map(|x| x.as_str()).unwrap_or(""));
    let type_name = m[2].trim();
    // enum constant lists such as `RED, GREEN;`
    if STATEMENT_KEYWORDS.contains(&type_name) || type_name.ends_with(',') {
        return None;
    }
    let mut extra = Properties::new();
    extra.insert("type".to_string(), Value::String(type_name.to_string()));
    extra.insert("visibility".to_string(), Value::String(visibility(&modifiers).to_string()));
    extra.insert("isStatic".to_string(), Value::Bool(modifiers.contains(&"static")));
    extra.insert("isFinal".to_string(), Value::Bool(modifiers.contains(&"final")));
    Some(code_entity(file, &m[3], EntityType::Property, ln, extra))
}
