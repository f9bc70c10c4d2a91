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

const NOT_A_MEMBER: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "super", "function", "else", "do", "try", "new",
    "throw", "await", "yield", "typeof", "delete",
];

fn re_import_from() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^import\s+(?:type\s+)?(.+?)\s+from\s+['"]([^'"]+)['"]"#).unwrap())
}

fn re_import_side_effect() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^import\s+['"]([^'"]+)['"]"#).unwrap())
}

fn re_require() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(?:export\s+)?(?:const|let|var)\s+(\{[^}]*\}|[\w$]+)\s*=\s*require\(\s*['"]([^'"]+)['"]\s*\)"#)
            .unwrap()
    })
}

fn re_class() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:export\s+)?(?:default\s+)?(?:declare\s+)?(abstract\s+)?class\s+([\w$]+)(?:<[^>]*>)?(?:\s+extends\s+([\w$.]+)(?:<[^>]*>)?)?(?:\s+implements\s+([^{]+))?",
        )
        .unwrap()
    })
}

fn re_interface() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:export\s+)?(?:default\s+)?(?:declare\s+)?interface\s+([\w$]+)(?:<[^>]*>)?(?:\s+extends\s+([^{]+))?")
            .unwrap()
    })
}

fn re_type_alias() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:export\s+)?(?:declare\s+)?type\s+([\w$]+)(?:<[^>]*>)?\s*=\s*(.*)$").unwrap())
}

fn re_enum() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:export\s+)?(?:declare\s+)?(const\s+)?enum\s+([\w$]+)").unwrap())
}

fn re_function() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:export\s+)?(?:default\s+)?(async\s+)?function\s*\*?\s*([\w$]+)\s*(?:<[^>]*>)?\s*\(([^)]*)\)?(?:\s*:\s*([^{]+))?")
            .unwrap()
    })
}

fn re_arrow() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:export\s+)?(?:const|let|var)\s+([\w$]+)\s*(?::\s*[^=]+)?=\s*(async\s+)?(?:function\b[^(]*\(([^)]*)\)?|\(([^)]*)\)\s*(?::\s*[^=]+?)?\s*=>|([\w$]+)\s*=>)",
        )
        .unwrap()
    })
}

fn re_method() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:(public|private|protected)\s+)?(?:(static)\s+)?(?:abstract\s+)?(?:override\s+)?(?:(async)\s+)?(?:(?:get|set)\s+)?\*?(#?[\w$]+)\s*[?!]?\s*(?:<[^>]*>)?\s*\(([^)]*)\)?\s*(?::\s*([^{;]+?))?\s*(?:;|\{.*)?$",
        )
        .unwrap()
    })
}

fn re_property() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:(public|private|protected)\s+)?(?:(static)\s+)?(?:(readonly)\s+)?(?:declare\s+)?(#?[\w$]+)[?!]?\s*(?::\s*([^=;]+?))?\s*(?:=\s*(.*?))?;?\s*$",
        )
        .unwrap()
    })
}

#[derive(Debug, Clone)]
struct TsImport {
    name: String,
    source: String,
    alias: Option<String>,
    is_default: bool,
    is_namespace: bool,
    is_side_effect: bool,
    line: usize,
}

fn clean_params(raw: Option<&str>) -> Vec<String> {
    raw.map(split_top_level).unwrap_or_default()
}

fn clean_type(raw: Option<&str>) -> String {
    raw.map(|t| t.trim().trim_end_matches(['{', ';']).trim().to_string())
        .unwrap_or_default()
}

fn names_list(raw: &str) -> Vec<String> {
    split_top_level(raw)
        .into_iter()
        .map(|n| strip_generics(&n).to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

/// Join a multi-line `import { a,\n b\n} from 'x'` into one statement, keyed by its first line.
fn import_statements(lines: &[&str]) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut pending: Option<(usize, String)> = None;
    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        if let Some((start, mut buf)) = pending.take() {
            buf.push(' ');
            buf.push_str(line);
            if line.contains("from") || line.ends_with(';') {
                out.push((start, buf));
            } else {
                pending = Some((start, buf));
            }
            continue;
        }
        if !line.starts_with("import") {
            if re_require().is_match(line) {
                out.push((i + 1, line.to_string()));
            }
            continue;
        }
        if line.contains('{') && !line.contains('}') {
            pending = Some((i + 1, line.to_string()));
        } else {
            out.push((i + 1, line.to_string()));
        }
    }
    out
}

fn parse_named(inner: &str, source: &str, line: usize, out: &mut Vec<TsImport>) {
    for item in inner.split(',') {
        let item = item.trim();
        let item = item.strip_prefix("type ").unwrap_or(item).trim();
        if item.is_empty() {
            continue;
        }
        let (name, alias) = match item.split_once(" as ") {
            Some((n, a)) => (n.trim().to_string(), Some(a.trim().to_string())),
            None => (item.to_string(), None),
        };
        out.push(TsImport {
            name,
            source: source.to_string(),
            alias,
            is_default: false,
            is_namespace: false,
            is_side_effect: false,
            line,
        });
    }
}

fn extract_imports(lines: &[&str]) -> Vec<TsImport> {
    let mut out = Vec::new();
    for (line, stmt) in import_statements(lines) {
        if let Some(m) = re_require().captures(&stmt) {
            let binding = m[1].trim();
            let source = &m[2];
            if let Some(inner) = binding.strip_prefix('{').and_then(|b| b.strip_suffix('}')) {
                parse_named(&inner.replace(':', " as "), source, line, &mut out);
            } else {
                out.push(TsImport {
                    name: binding.to_string(),
                    source: source.to_string(),
                    alias: None,
                    is_default: true,
                    is_namespace: false,
                    is_side_effect: false,
                    line,
                });
            }
            continue;
        }
        if let Some(m) = re_import_side_effect().captures(&stmt) {
            out.push(TsImport {
                name: m[1].to_string(),
                source: m[1].to_string(),
                alias: None,
                is_default: false,
                is_namespace: false,
                is_side_effect: true,
                line,
            });
            continue;
        }
        let Some(m) = re_import_from().captures(&stmt) else {
            continue;
        };
        let clause = m[1].trim();
        let source = &m[2];

        let (head, named) = match (clause.find('{'), clause.rfind('}')) {
            (Some(a), Some(b)) if b > a => (clause[..a].trim(), Some(&clause[a + 1..b])),
            _ => (clause, None),
        };
        for part in head.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if let Some(ns) = part.strip_prefix('*') {
                let ns = ns.trim().trim_start_matches("as").trim();
                out.push(TsImport {
                    name: ns.to_string(),
                    source: source.to_string(),
                    alias: None,
                    is_default: false,
                    is_namespace: true,
                    is_side_effect: false,
                    line,
                });
            } else {
                out.push(TsImport {
                    name: part.to_string(),
                    source: source.to_string(),
                    alias: None,
                    is_default: true,
                    is_namespace: false,
                    is_side_effect: false,
                    line,
                });
            }
        }
        if let Some(inner) = named {
            parse_named(inner, source, line, &mut out);
        }
    }
    out
}

/// Open class body: index of the class entity and the brace depth of its members.
struct OpenClass {
    entity: usize,
    body_depth: i32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TypeScriptAnalyzer;

impl LanguageAnalyzer for TypeScriptAnalyzer {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn supported_languages(&self) -> &'static [&'static str] {
        &["typescript", "javascript"]
    }

    fn analyze(&self, file: &CodeFile, file_entity: &Entity) -> GraphBatch {
        let lines: Vec<&str> = file.content.lines().collect();
        let mut entities: Vec<Entity> = vec![file_entity.clone()];
        let mut relationships: Vec<Relationship> = Vec::new();

        for imp in extract_imports(&lines) {
            let mut extra = Properties::new();
            extra.insert("source".to_string(), Value::String(imp.source.clone()));
            extra.insert("isDefault".to_string(), Value::Bool(imp.is_default));
            extra.insert("isNamespace".to_string(), Value::Bool(imp.is_namespace));
            if imp.is_side_effect {
                extra.insert("isSideEffect".to_string(), Value::Bool(true));
            }
            if let Some(alias) = &imp.alias {
                extra.insert("alias".to_string(), Value::String(alias.clone()));
            }
            let e = code_entity(file, &imp.name, EntityType::Import, imp.line, extra);
            relationships.push(Relationship::between(file_entity, &e, RelationshipType::Imports));
            entities.push(e);
        }

        let mut depth: i32 = 0;
        let mut open: Vec<OpenClass> = Vec::new();
        let mut pending_class: Option<usize> = None;

        for (i, raw) in lines.iter().enumerate() {
            let ln = i + 1;
            let line = raw.trim();
            let delta = brace_delta(line);
            if line.is_empty() || is_comment(line, COMMENT_PREFIXES) {
                continue;
            }
            let exported = line.starts_with("export");
            let in_class_body = open.last().is_some_and(|c| c.body_depth == depth);

            if let Some(m) = re_class().captures(line) {
                let mut extra = Properties::new();
                extra.insert("isAbstract".to_string(), Value::Bool(m.get(1).is_some()));
                extra.insert("isExported".to_string(), Value::Bool(exported));
                extra.insert(
                    "extends".to_string(),
                    string_list(m.get(3).map(|e| strip_generics(e.as_str()).to_string())),
                );
                extra.insert(
                    "implements".to_string(),
                    string_list(m.get(4).map(|s| names_list(s.as_str())).unwrap_or_default()),
                );
                let ce = code_entity(file, &m[2], EntityType::Class, ln, extra);
                relationships.push(Relationship::between(file_entity, &ce, RelationshipType::Defines));
                pending_class = Some(entities.len());
                entities.push(ce);
            } else if in_class_body {
                let owner = open.last().map(|c| c.entity).unwrap_or(0);
                if let Some(member) = class_member(file, line, ln) {
                    relationships.push(Relationship::between(
                        &entities[owner],
                        &member,
                        RelationshipType::Contains,
                    ));
                    entities.push(member);
                }
            } else if let Some(m) = re_interface().captures(line) {
                let mut extra = Properties::new();
                extra.insert("isExported".to_string(), Value::Bool(exported));
                extra.insert(
                    "extends".to_string(),
                    string_list(m.get(2).map(|s| names_list(s.as_str())).unwrap_or_default()),
                );
                let ie = code_entity(file, &m[1], EntityType::Interface, ln, extra);
                relationships.push(Relationship::between(file_entity, &ie, RelationshipType::Defines));
                entities.push(ie);
            } else if let Some(m) = re_type_alias().captures(line) {
                let mut extra = Properties::new();
                extra.insert("isExported".to_string(), Value::Bool(exported));
                extra.insert(
                    "definition".to_string(),
                    Value::String(m[2].trim().trim_end_matches(';').to_string()),
                );
                let te = code_entity(file, &m[1], EntityType::Type, ln, extra);
                relationships.push(Relationship::between(file_entity, &te, RelationshipType::Defines));
                entities.push(te);
            } else if let Some(m) = re_enum().captures(line) {
                let mut extra = Properties::new();
                extra.insert("isExported".to_string(), Value::Bool(exported));
                extra.insert("isConst".to_string(), Value::Bool(m.get(1).is_some()));
                let ee = code_entity(file, &m[2], EntityType::Enum, ln, extra);
                relationships.push(Relationship::between(file_entity, &ee, RelationshipType::Defines));
                entities.push(ee);
            } else if let Some(m) = re_function().captures(line) {
                let mut extra = Properties::new();
                extra.insert("isAsync".to_string(), Value::Bool(m.get(1).is_some()));
                extra.insert("isExported".to_string(), Value::Bool(exported));
                extra.insert("parameters".to_string(), string_list(clean_params(m.get(3).map(|p| p.as_str()))));
                extra.insert("returnType".to_string(), Value::String(clean_type(m.get(4).map(|r| r.as_str()))));
                let fe = code_entity(file, &m[2], EntityType::Function, ln, extra);
                relationships.push(Relationship::between(file_entity, &fe, RelationshipType::Defines));
                entities.push(fe);
            } else if let Some(m) = re_arrow().captures(line) {
                let params = m
                    .get(3)
                    .or_else(|| m.get(4))
                    .or_else(|| m.get(5))
                    .map(|p| p.as_str());
                let mut extra = Properties::new();
                extra.insert("isAsync".to_string(), Value::Bool(m.get(2).is_some()));
                extra.insert("isExported".to_string(), Value::Bool(exported));
                extra.insert("isArrow".to_string(), Value::Bool(m.get(3).is_none()));
                extra.insert("parameters".to_string(), string_list(clean_params(params)));
                let fe = code_entity(file, &m[1], EntityType::Function, ln, extra);
                relationships.push(Relationship::between(file_entity, &fe, RelationshipType::Defines));
                entities.push(fe);
            }

            if delta > 0 {
                if let Some(idx) = pending_class.take() {
                    open.push(OpenClass {
                        entity: idx,
                        body_depth: depth + 1,
                    });
                }
            } else if line.contains('{') {
                // body opened and closed on the header line
                pending_class = None;
            }
            depth += delta;
            while open.last().is_some_and(|c| c.body_depth > depth) {
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

/// A method or property declared directly in a class body.
fn class_member(file: &CodeFile, line: &str, ln: usize) -> Option<Entity> {
    let first_word = line
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$' || c == '#'))
        .next()
        .unwrap_or("");
    if NOT_A_MEMBER.contains(&first_word) {
        return None;
    }

    let paren = line.find('(');
    let assign = line.find('=');
    let looks_like_method = match (paren, assign) {
        (Some(p), Some(a)) => p < a,
        (Some(_), None) => true,
        _ => false,
    };

    if looks_like_method {
        let m = re_method().captures(line)?;
        let name = &m[4];
        if NOT_A_MEMBER.contains(&name) {
            return None;
        }
        let mut extra = Properties::new();
        extra.insert(
            "visibility".to_string(),
            Value::String(m.get(1).map(|v| v.as_str()).unwrap_or("public").to_string()),
        );
        extra.insert("isStatic".to_string(), Value::Bool(m.get(2).is_some()));
        extra.insert("isAsync".to_string(), Value::Bool(m.get(3).is_some()));
        extra.insert("parameters".to_string(), string_list(clean_params(m.get(5).map(|p| p.as_str()))));
        extra.insert("returnType".to_string(), Value::String(clean_type(m.get(6).map(|r| r.as_str()))));
        if line.ends_with(';') {
            extra.insert("abstract".to_string(), Value::Bool(true));
        }
        return Some(code_entity(file, name, EntityType::Method, ln, extra));
    }

    let m = re_property().captures(line)?;
    let name = &m[4];
    let value = m.get(6).map(|v| v.as_str().trim()).unwrap_or("");
    let mut extra = Properties::new();
    extra.insert(
        "visibility".to_string(),
        Value::String(m.get(1).map(|v| v.as_str()).unwrap_or("public").to_string()),
    );
    extra.insert("isStatic".to_string(), Value::Bool(m.get(2).is_some()));

    // `handler = async (x) => { ... }` is a method bound as a property
    if value.contains("=>") {
        extra.insert("isAsync".to_string(), Value::Bool(value.starts_with("async")));
        extra.insert("isArrow".to_string(), Value::Bool(true));
        return Some(code_entity(file, name, EntityType::Method, ln, extra));
    }

    extra.insert("isReadonly".to_string(), Value::Bool(m.get(3).is_some()));
    extra.insert("type".to_string(), Value::String(clean_type(m.get(5).map(|t| t.as_str()))));
    Some(code_entity(file, name, EntityType::Property, ln, extra))
}
