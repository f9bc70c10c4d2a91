use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

use crate::analyzers::base::LanguageAnalyzer;
use crate::analyzers::calls::link_call_sites;
use crate::analyzers::common::{code_entity, leading_indent, link_supertypes, split_top_level, string_list};
use crate::core::records::{CodeFile, Entity, GraphBatch, Properties, Relationship};
use crate::core::types::{EntityType, RelationshipType};

const COMMENT_PREFIXES: &[&str] = &["#"];

fn re_import() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^import\s+(.+)$").unwrap())
}

fn re_from_import() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^from\s+([\w.]+)\s+import\s+(.+)$").unwrap())
}

fn re_class() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^class\s+(\w+)\s*(?:\(([^)]*)\))?\s*:").unwrap())
}

fn re_def() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(async\s+)?def\s+(\w+)\s*\(([^)]*)\)?\s*(?:->\s*([^:]+))?").unwrap())
}

fn re_decorator() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@([\w.]+)").unwrap())
}

fn re_assignment() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z_]\w*)\s*(?::\s*([^=]+?))?\s*=[^=](.*)$").unwrap())
}

fn re_annotation() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z_]\w*)\s*:\s*([^=]+)$").unwrap())
}

fn re_self_attribute() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^self\.(\w+)\s*(?::\s*[^=]+?)?\s*=[^=]").unwrap())
}

fn re_constant_name() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").unwrap())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Class,
    Function,
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    indent: usize,
    entity: usize,
    /// Indentation of the first body line, once seen.
    body_indent: Option<usize>,
}

/// `pkg.sub` → `pkg/sub`, `..models` → `../models`, so imports line up with file paths.
fn module_source(module: &str) -> String {
    let dots = module.chars().take_while(|c| *c == '.').count();
    let rest = module[dots..].replace('.', "/");
    match dots {
        0 => rest,
        1 => format!("./{rest}"),
        n => format!("{}{rest}", "../".repeat(n - 1)),
    }
}

/// Cut a trailing `#` comment. A `#` inside a string literal is kept.
fn without_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '#' => return line[..i].trim_end(),
                _ => {}
            },
        }
    }
    line
}

/// Join parenthesized `from m import (\n a,\n b\n)` statements onto one logical line.
fn logical_import(lines: &[&str], start: usize) -> (String, usize) {
    let first = without_comment(lines[start].trim());
    if !first.contains('(') || first.contains(')') {
        return (first.to_string(), start);
    }
    let mut buf = first.to_string();
    for (j, raw) in lines.iter().enumerate().skip(start + 1) {
        let part = without_comment(raw.trim());
        buf.push(' ');
        buf.push_str(part);
        if part.contains(')') {
            return (buf, j);
        }
    }
    (buf, lines.len().saturating_sub(1))
}

fn import_entities(file: &CodeFile, stmt: &str, line: usize) -> Vec<Entity> {
    let mut out = Vec::new();
    if let Some(m) = re_from_import().captures(stmt) {
        let module = &m[1];
        let names = m[2].replace(['(', ')'], " ");
        for item in names.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (name, alias) = match item.split_once(" as ") {
                Some((n, a)) => (n.trim(), Some(a.trim())),
                None => (item, None),
            };
            // `from . import views` imports the sibling module itself
            let source = if module.chars().all(|c| c == '.') {
                module_source(&format!("{module}{name}"))
            } else {
                module_source(module)
            };
            let mut extra = Properties::new();
            extra.insert("source".to_string(), Value::String(source));
            extra.insert("module".to_string(), Value::String(module.to_string()));
            extra.insert("isFromImport".to_string(), Value::Bool(true));
            if let Some(a) = alias {
                extra.insert("alias".to_string(), Value::String(a.to_string()));
            }
            out.push(code_entity(file, name, EntityType::Import, line, extra));
        }
    } else if let Some(m) = re_import().captures(stmt) {
        for item in m[1].split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (module, alias) = match item.split_once(" as ") {
                Some((n, a)) => (n.trim(), Some(a.trim())),
                None => (item, None),
            };
            let mut extra = Properties::new();
            extra.insert("source".to_string(), Value::String(module_source(module)));
            extra.insert("module".to_string(), Value::String(module.to_string()));
            extra.insert("isFromImport".to_string(), Value::Bool(false));
            if let Some(a) = alias {
                extra.insert("alias".to_string(), Value::String(a.to_string()));
            }
            out.push(code_entity(file, module, EntityType::Import, line, extra));
        }
    }
    out
}

fn parameters(raw: Option<&str>) -> Vec<String> {
    raw.map(split_top_level)
        .unwrap_or_default()
        .into_iter()
        .filter(|p| {
            let name = p.split([':', '=']).next().unwrap_or("").trim();
            name != "self" && name != "cls"
        })
        .collect()
}

/// Toggle state for a line that opens or closes a triple-quoted string.
fn flips_docstring(line: &str) -> bool {
    let n = line.matches("\"\"\"").count() + line.matches("'''").count();
    n % 2 == 1
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PythonAnalyzer;

impl LanguageAnalyzer for PythonAnalyzer {
    fn name(&self) -> &'static str {
        "python"
    }

    fn supported_languages(&self) -> &'static [&'static str] {
        &["python"]
    }

    fn analyze(&self, file: &CodeFile, file_entity: &Entity) -> GraphBatch {
        let lines: Vec<&str> = file.content.lines().collect();
        let mut entities: Vec<Entity> = vec![file_entity.clone()];
        let mut relationships: Vec<Relationship> = Vec::new();

        let mut scopes: Vec<Scope> = Vec::new();
        let mut decorators: Vec<String> = Vec::new();
        // (class entity index, attribute name)
        let mut attributes: HashSet<(usize, String)> = HashSet::new();
        let mut in_docstring = false;
        let mut skip_until: Option<usize> = None;

        for (i, raw) in lines.iter().enumerate() {
            if skip_until.is_some_and(|end| i <= end) {
                continue;
            }
            let ln = i + 1;
            let line = raw.trim();
            if in_docstring {
                if flips_docstring(line) {
                    in_docstring = false;
                }
                continue;
            }
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if (line.starts_with("\"\"\"") || line.starts_with("'''")) && flips_docstring(line) {
                in_docstring = true;
                continue;
            }

            let indent = leading_indent(raw);
            while scopes.last().is_some_and(|s| indent <= s.indent) {
                scopes.pop();
            }
            if let Some(top) = scopes.last_mut() {
                top.body_indent.get_or_insert(indent);
            }
            let top = scopes.last().map(|s| (s.kind, s.entity, s.body_indent == Some(indent)));

            if line.starts_with("import ") || line.starts_with("from ") {
                let (stmt, end) = logical_import(&lines, i);
                if end > i {
                    skip_until = Some(end);
                }
                for imp in import_entities(file, &stmt, ln) {
                    relationships.push(Relationship::between(file_entity, &imp, RelationshipType::Imports));
                    entities.push(imp);
                }
                continue;
            }

            if let Some(m) = re_decorator().captures(line) {
                decorators.push(m[1].to_string());
                continue;
            }

            if let Some(m) = re_class().captures(line) {
                let bases: Vec<String> = m
                    .get(2)
                    .map(|b| split_top_level(b.as_str()))
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|b| !b.contains('=') && b != "object")
                    .collect();
                let mut extra = Properties::new();
                extra.insert("extends".to_string(), string_list(bases));
                extra.insert("decorators".to_string(), string_list(std::mem::take(&mut decorators)));
                let ce = code_entity(file, &m[1], EntityType::Class, ln, extra);
                match top {
                    Some((_, owner, _)) => {
                        relationships.push(Relationship::between(&entities[owner], &ce, RelationshipType::Contains))
                    }
                    None => relationships.push(Relationship::between(file_entity, &ce, RelationshipType::Defines)),
                }
                scopes.push(Scope {
                    kind: ScopeKind::Class,
                    indent,
                    entity: entities.len(),
                    body_indent: None,
                });
                entities.push(ce);
                continue;
            }

            if let Some(m) = re_def().captures(line) {
                let name = &m[2];
                let mut extra = Properties::new();
                extra.insert("isAsync".to_string(), Value::Bool(m.get(1).is_some()));
                extra.insert("parameters".to_string(), string_list(parameters(m.get(3).map(|p| p.as_str()))));
                if let Some(ret) = m.get(4) {
                    extra.insert("returnType".to_string(), Value::String(ret.as_str().trim().to_string()));
                }
                extra.insert("decorators".to_string(), string_list(std::mem::take(&mut decorators)));
                extra.insert("isPrivate".to_string(), Value::Bool(name.starts_with('_')));

                let (entity_type, owner) = match top {
                    Some((ScopeKind::Class, owner, _)) => (EntityType::Method, Some(owner)),
                    Some((ScopeKind::Function, owner, _)) => (EntityType::Function, Some(owner)),
                    None => (EntityType::Function, None),
                };
                let fe = code_entity(file, name, entity_type, ln, extra);
                match owner {
                    Some(o) => relationships.push(Relationship::between(&entities[o], &fe, RelationshipType::Contains)),
                    None => relationships.push(Relationship::between(file_entity, &fe, RelationshipType::Defines)),
                }
                scopes.push(Scope {
                    kind: ScopeKind::Function,
                    indent,
                    entity: entities.len(),
                    body_indent: None,
                });
                entities.push(fe);
                continue;
            }
            decorators.clear();

            let line = without_comment(line);
            match top {
                None => {
                    if let Some(m) = re_assignment().captures(line) {
                        let name = &m[1];
                        if re_constant_name().is_match(name) {
                            let mut extra = Properties::new();
                            extra.insert("value".to_string(), Value::String(m[3].trim().to_string()));
                            let ce = code_entity(file, name, EntityType::Constant, ln, extra);
                            relationships.push(Relationship::between(file_entity, &ce, RelationshipType::Defines));
                            entities.push(ce);
                        }
                    }
                }
                Some((ScopeKind::Class, owner, true)) => {
                    let found = re_assignment()
                        .captures(line)
                        .map(|m| (m[1].to_string(), m.get(2).map(|t| t.as_str().trim().to_string())))
                        .or_else(|| {
                            re_annotation()
                                .captures(line)
                                .map(|m| (m[1].to_string(), Some(m[2].trim().to_string())))
                        });
                    if let Some((name, annotation)) = found {
                        if attributes.insert((owner, name.clone())) {
                            let mut extra = Properties::new();
                            extra.insert("isClassAttribute".to_string(), Value::Bool(true));
                            if let Some(t) = annotation {
                                extra.insert("type".to_string(), Value::String(t));
                            }
                            let pe = code_entity(file, &name, EntityType::Property, ln, extra);
                            relationships.push(Relationship::between(&entities[owner], &pe, RelationshipType::Contains));
                            entities.push(pe);
                        }
                    }
                }
                Some((ScopeKind::Function, _, _)) => {
                    let Some(m) = re_self_attribute().captures(line) else {
                        continue;
                    };
                    // the class that owns the method this line sits in
                    let Some(class_idx) = scopes
                        .iter()
                        .rev()
                        .find(|s| s.kind == ScopeKind::Class)
                        .map(|s| s.entity)
                    else {
                        continue;
                    };
                    let name = m[1].to_string();
                    if attributes.insert((class_idx, name.clone())) {
                        let mut extra = Properties::new();
                        extra.insert("isClassAttribute".to_string(), Value::Bool(false));
                        let pe = code_entity(file, &name, EntityType::Property, ln, extra);
                        relationships.push(Relationship::between(
                            &entities[class_idx],
                            &pe,
                            RelationshipType::Contains,
                        ));
                        entities.push(pe);
                    }
                }
                Some((ScopeKind::Class, _, false)) => {}
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
