use regex::Regex;
use serde_json::Value;

use crate::analyzers::base::LanguageAnalyzer;
use crate::analyzers::calls::link_call_sites;
use crate::analyzers::common::{brace_delta, code_entity, is_comment, split_top_level, string_list};
use crate::core::records::{CodeFile, Entity, GraphBatch, Properties, Relationship};
use crate::core::types::{EntityType, RelationshipType};

const COMMENT_PREFIXES: &[&str] = &["//", "/*", "*"];

fn re_package() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^package\s+(\w+)").unwrap())
}

fn re_import_single() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^import\s+(?:([\w.]+)\s+)?"([^"]+)""#).unwrap())
}

fn re_import_block_start() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^import\s*\(").unwrap())
}

fn re_import_spec() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^(?:([\w.]+)\s+)?"([^"]+)""#).unwrap())
}

fn re_struct() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^type\s+(\w+)(?:\[[^\]]*\])?\s+struct\b").unwrap())
}

fn re_interface() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^type\s+(\w+)(?:\[[^\]]*\])?\s+interface\b").unwrap())
}

fn re_named_type() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^type\s+(\w+)(?:\[[^\]]*\])?\s+(.+?)\s*$").unwrap())
}

fn re_func() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^func\s*(?:\(([^)]*)\)\s*)?(\w+)\s*(?:\[[^\]]*\])?\s*\(([^)]*)\)?\s*(.*)$").unwrap()
    })
}

fn re_const_single() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^const\s+(\w+)\s*([\w.*\[\]]+)?\s*=\s*(.+)$").unwrap())
}

fn re_const_block_start() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^const\s*\(").unwrap())
}

fn re_const_spec() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+)\s*([\w.*\[\]]+)?\s*(?:=\s*(.+))?$").unwrap())
}

fn re_field() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+(?:\s*,\s*\w+)*)\s+(\S.*)$").unwrap())
}

fn re_embedded() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\*?([\w.]+)$").unwrap())
}

fn re_interface_method() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+)\s*\((.*)$").unwrap())
}

#[derive(Debug, Clone)]
struct GoImport {
    name: String,
    path: String,
    alias: Option<String>,
    line: usize,
}

#[derive(Debug, Clone)]
struct GoField {
    name: String,
    type_name: String,
    line: usize,
}

#[derive(Debug, Clone)]
struct GoStruct {
    name: String,
    line: usize,
    fields: Vec<GoField>,
}

#[derive(Debug, Clone)]
struct GoInterface {
    name: String,
    line: usize,
    /// (method name, signature, line)
    methods: Vec<(String, String, usize)>,
}

#[derive(Debug, Clone)]
struct GoFunction {
    name: String,
    line: usize,
    receiver: Option<String>,
    parameters: Vec<String>,
    return_types: Vec<String>,
}

#[derive(Debug, Clone)]
struct GoNamedType {
    name: String,
    line: usize,
    definition: String,
}

#[derive(Debug, Clone)]
struct GoConstant {
    name: String,
    line: usize,
    type_name: Option<String>,
    value: Option<String>,
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

fn import_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Strip a trailing `// comment` and a struct tag.
fn strip_field_noise(line: &str) -> &str {
    let line = match line.find("//") {
        Some(i) => &line[..i],
        None => line,
    };
    let line = match line.find('`') {
        Some(i) => &line[..i],
        None => line,
    };
    line.trim()
}

/// `s *pkg.Server[T]` → `Server`
pub(crate) fn receiver_type_name(receiver: &str) -> String {
    let ty = receiver.split_whitespace().last().unwrap_or("");
    let ty = ty.trim_start_matches('*');
    let ty = ty.rsplit('.').next().unwrap_or(ty);
    let ty = match ty.find('[') {
        Some(i) => &ty[..i],
        None => ty,
    };
    ty.to_string()
}

fn extract_imports(lines: &[&str]) -> Vec<GoImport> {
    let mut out = Vec::new();
    let mut in_block = false;
    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        if in_block {
            if line.starts_with(')') {
                in_block = false;
                continue;
            }
            if let Some(m) = re_import_spec().captures(line) {
                let path = m[2].to_string();
                let alias = m.get(1).map(|a| a.as_str().to_string());
                out.push(GoImport {
                    name: alias.clone().unwrap_or_else(|| import_name(&path)),
                    path,
                    alias,
                    line: i + 1,
                });
            }
            continue;
        }
        if re_import_block_start().is_match(line) {
            in_block = true;
            continue;
        }
        if let Some(m) = re_import_single().captures(line) {
            let path = m[2].to_string();
            let alias = m.get(1).map(|a| a.as_str().to_string());
            out.push(GoImport {
                name: alias.clone().unwrap_or_else(|| import_name(&path)),
                path,
                alias,
                line: i + 1,
            });
        }
    }
    out
}

/// Lines of a `{ ... }` body opened on line `start`, with their 1-based numbers.
/// Only lines at nesting depth one are returned.
fn body_lines<'a>(lines: &[&'a str], start: usize) -> Vec<(usize, &'a str)> {
    let mut depth = brace_delta(lines[start]);
    if depth <= 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    for (j, raw) in lines.iter().enumerate().skip(start + 1) {
        let line = raw.trim();
        if depth == 1 && !line.is_empty() && !line.starts_with('}') && !is_comment(line, COMMENT_PREFIXES) {
            out.push((j + 1, line));
        }
        depth += brace_delta(line);
        if depth <= 0 {
            break;
        }
    }
    out
}

fn extract_structs(lines: &[&str]) -> Vec<GoStruct> {
    let mut out = Vec::new();
    for (i, raw) in lines.iter().enumerate() {
        let Some(m) = re_struct().captures(raw.trim()) else {
            continue;
        };
        let mut fields = Vec::new();
        for (ln, line) in body_lines(lines, i) {
            let line = strip_field_noise(line);
            if line.is_empty() {
                continue;
            }
            if let Some(f) = re_field().captures(line) {
                let type_name = f[2].trim().trim_end_matches('{').trim().to_string();
                for name in f[1].split(',') {
                    fields.push(GoField {
                        name: name.trim().to_string(),
                        type_name: type_name.clone(),
                        line: ln,
                    });
                }
            } else if let Some(e) = re_embedded().captures(line) {
                let full = e[1].to_string();
                fields.push(GoField {
                    name: full.rsplit('.').next().unwrap_or(&full).to_string(),
                    type_name: line.to_string(),
                    line: ln,
                });
            }
        }
        out.push(GoStruct {
            name: m[1].to_string(),
            line: i + 1,
            fields,
        });
    }
    out
}

fn extract_interfaces(lines: &[&str]) -> Vec<GoInterface> {
    let mut out = Vec::new();
    for (i, raw) in lines.iter().enumerate() {
        let Some(m) = re_interface().captures(raw.trim()) else {
            continue;
        };
        let methods = body_lines(lines, i)
            .into_iter()
            .filter_map(|(ln, line)| {
                let line = strip_field_noise(line);
                re_interface_method()
                    .captures(line)
                    .map(|mm| (mm[1].to_string(), line.to_string(), ln))
            })
            .collect();
        out.push(GoInterface {
            name: m[1].to_string(),
            line: i + 1,
            methods,
        });
    }
    out
}

fn extract_named_types(lines: &[&str]) -> Vec<GoNamedType> {
    let mut out = Vec::new();
    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        if re_struct().is_match(line) || re_interface().is_match(line) {
            continue;
        }
        let Some(m) = re_named_type().captures(line) else {
            continue;
        };
        let definition = m[2].trim_start_matches('=').trim();
        let definition = strip_field_noise(definition);
        out.push(GoNamedType {
            name: m[1].to_string(),
            line: i + 1,
            definition: definition.to_string(),
        });
    }
    out
}

fn extract_functions(lines: &[&str]) -> Vec<GoFunction> {
    let mut out = Vec::new();
    for (i, raw) in lines.iter().enumerate() {
        let Some(m) = re_func().captures(raw.trim()) else {
            continue;
        };
        let receiver = m
            .get(1)
            .map(|r| r.as_str().trim().to_string())
            .filter(|r| !r.is_empty());
        let parameters = m.get(3).map(|p| split_top_level(p.as_str())).unwrap_or_default();
        let rest = m.get(4).map(|r| r.as_str()).unwrap_or("");
        let rest = rest.trim().trim_end_matches('{').trim();
        let rest = rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')).unwrap_or(rest);
        let return_types = if rest.is_empty() || rest.starts_with("//") {
            Vec::new()
        } else {
            split_top_level(rest)
        };
        out.push(GoFunction {
            name: m[2].to_string(),
            line: i + 1,
            receiver,
            parameters,
            return_types,
        });
    }
    out
}

fn extract_constants(lines: &[&str]) -> Vec<GoConstant> {
    let mut out = Vec::new();
    let mut in_block = false;
    for (i, raw) in lines.iter().enumerate() {
        let line = strip_field_noise(raw.trim());
        if in_block {
            if line.starts_with(')') {
                in_block = false;
                continue;
            }
            if line.is_empty() {
                continue;
            }
            if let Some(m) = re_const_spec().captures(line) {
                out.push(GoConstant {
                    name: m[1].to_string(),
                    line: i + 1,
                    type_name: m.get(2).map(|t| t.as_str().to_string()),
                    value: m.get(3).map(|v| v.as_str().trim().to_string()),
                });
            }
            continue;
        }
        if re_const_block_start().is_match(line) {
            in_block = true;
            continue;
        }
        if let Some(m) = re_const_single().captures(line) {
            out.push(GoConstant {
                name: m[1].to_string(),
                line: i + 1,
                type_name: m.get(2).map(|t| t.as_str().to_string()),
                value: Some(m[3].trim().to_string()),
            });
        }
    }
    out
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GoAnalyzer;

impl LanguageAnalyzer for GoAnalyzer {
    fn name(&self) -> &'static str {
        "go"
    }

    fn supported_languages(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn analyze(&self, file: &CodeFile, file_entity: &Entity) -> GraphBatch {
        let lines: Vec<&str> = file.content.lines().collect();
        let mut entities: Vec<Entity> = vec![file_entity.clone()];
        let mut relationships: Vec<Relationship> = Vec::new();

        if let Some((i, m)) = lines
            .iter()
            .enumerate()
            .find_map(|(i, l)| re_package().captures(l.trim()).map(|m| (i, m)))
        {
            let pkg = code_entity(file, &m[1], EntityType::Package, i + 1, Properties::new());
            relationships.push(Relationship::between(file_entity, &pkg, RelationshipType::Defines));
            entities.push(pkg);
        }

        for imp in extract_imports(&lines) {
            let mut extra = Properties::new();
            extra.insert("source".to_string(), Value::String(imp.path.clone()));
            if let Some(alias) = &imp.alias {
                extra.insert("alias".to_string(), Value::String(alias.clone()));
            }
            let e = code_entity(file, &imp.name, EntityType::Import, imp.line, extra);
            relationships.push(Relationship::between(file_entity, &e, RelationshipType::Imports));
            entities.push(e);
        }

        // receiver name → owning type entity
        let mut owners: Vec<Entity> = Vec::new();

        for st in extract_structs(&lines) {
            let mut extra = Properties::new();
            extra.insert("isExported".to_string(), Value::Bool(is_exported(&st.name)));
            extra.insert("structType".to_string(), Value::Bool(true));
            let se = code_entity(file, &st.name, EntityType::Class, st.line, extra);
            relationships.push(Relationship::between(file_entity, &se, RelationshipType::Defines));
            for field in &st.fields {
                let mut extra = Properties::new();
                extra.insert("type".to_string(), Value::String(field.type_name.clone()));
                extra.insert("isExported".to_string(), Value::Bool(is_exported(&field.name)));
                let fe = code_entity(file, &field.name, EntityType::Property, field.line, extra);
                relationships.push(Relationship::between(&se, &fe, RelationshipType::Contains));
                entities.push(fe);
            }
            owners.push(se.clone());
            entities.push(se);
        }

        for iface in extract_interfaces(&lines) {
            let mut extra = Properties::new();
            extra.insert("isExported".to_string(), Value::Bool(is_exported(&iface.name)));
            extra.insert(
                "methods".to_string(),
                string_list(iface.methods.iter().map(|(name, _, _)| name.clone())),
            );
            let ie = code_entity(file, &iface.name, EntityType::Interface, iface.line, extra);
            relationships.push(Relationship::between(file_entity, &ie, RelationshipType::Defines));
            for (name, signature, line) in &iface.methods {
                let mut extra = Properties::new();
                extra.insert("signature".to_string(), Value::String(signature.clone()));
                extra.insert("abstract".to_string(), Value::Bool(true));
                extra.insert("isExported".to_string(), Value::Bool(is_exported(name)));
                let me = code_entity(file, name, EntityType::Method, *line, extra);
                relationships.push(Relationship::between(&ie, &me, RelationshipType::Contains));
                entities.push(me);
            }
            entities.push(ie);
        }

        for ty in extract_named_types(&lines) {
            let mut extra = Properties::new();
            extra.insert("isExported".to_string(), Value::Bool(is_exported(&ty.name)));
            extra.insert("definition".to_string(), Value::String(ty.definition.clone()));
            let te = code_entity(file, &ty.name, EntityType::Type, ty.line, extra);
            relationships.push(Relationship::between(file_entity, &te, RelationshipType::Defines));
            owners.push(te.clone());
            entities.push(te);
        }

        for f in extract_functions(&lines) {
            let mut extra = Properties::new();
            extra.insert("isExported".to_string(), Value::Bool(is_exported(&f.name)));
            extra.insert("parameters".to_string(), string_list(f.parameters.clone()));
            extra.insert("returnTypes".to_string(), string_list(f.return_types.clone()));
            let entity_type = match &f.receiver {
                Some(receiver) => {
                    extra.insert("receiver".to_string(), Value::String(receiver.clone()));
                    EntityType::Method
                }
                None => EntityType::Function,
            };
            let fe = code_entity(file, &f.name, entity_type, f.line, extra);

            let owner = f.receiver.as_deref().and_then(|r| {
                let ty = receiver_type_name(r);
                owners.iter().find(|o| o.label == ty)
            });
            match owner {
                Some(o) => relationships.push(Relationship::between(o, &fe, RelationshipType::Contains)),
                None => relationships.push(Relationship::between(file_entity, &fe, RelationshipType::Defines)),
            }
            entities.push(fe);
        }

        for c in extract_constants(&lines) {
            let mut extra = Properties::new();
            extra.insert("isExported".to_string(), Value::Bool(is_exported(&c.name)));
            if let Some(t) = &c.type_name {
                extra.insert("type".to_string(), Value::String(t.clone()));
            }
            if let Some(v) = &c.value {
                extra.insert("value".to_string(), Value::String(v.clone()));
            }
            let ce = code_entity(file, &c.name, EntityType::Constant, c.line, extra);
            relationships.push(Relationship::between(file_entity, &ce, RelationshipType::Defines));
            entities.push(ce);
        }

        relationships.extend(link_call_sites(&lines, &entities, COMMENT_PREFIXES));

        GraphBatch {
            entities,
            relationships,
        }
    }
}
