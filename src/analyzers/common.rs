use serde_json::Value;

use crate::core::records::{CodeFile, Entity, Properties, Relationship};
use crate::core::types::{EntityType, RelationshipType};

/// Properties every code-level entity carries: where it was seen and in what language.
pub(crate) fn code_props(file: &CodeFile, line: usize) -> Properties {
    let mut props = Properties::new();
    props.insert("sourceFile".to_string(), Value::String(file.path.clone()));
    props.insert("lineNumber".to_string(), Value::from(line as u64));
    props.insert("language".to_string(), Value::String(file.language.clone()));
    props
}

pub(crate) fn code_entity(
    file: &CodeFile,
    label: &str,
    entity_type: EntityType,
    line: usize,
    extra: Properties,
) -> Entity {
    let mut props = code_props(file, line);
    props.extend(extra);
    Entity::new(label, entity_type, props)
}

pub(crate) fn string_list<I, S>(items: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Value::Array(items.into_iter().map(|s| Value::String(s.into())).collect())
}

pub(crate) fn is_comment(trimmed: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| trimmed.starts_with(p))
}

/// Net `{`/`}` balance of a line, ignoring string literals and `//` comments.
pub(crate) fn brace_delta(line: &str) -> i32 {
    let mut delta = 0;
    let mut quote: Option<char> = None;
    let mut prev = '\0';
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == q && prev != '\\' {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' | '`' => quote = Some(c),
                '/' if chars.peek() == Some(&'/') => break,
                '{' => delta += 1,
                '}' => delta -= 1,
                _ => {}
            },
        }
        prev = if prev == '\\' && c == '\\' { '\0' } else { c };
    }
    delta
}

/// Split on commas that are not nested inside `<>`, `()`, `[]` or `{}`.
pub(crate) fn split_top_level(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut cur = String::new();
    for c in s.chars() {
        match c {
            '<' | '(' | '[' | '{' => {
                depth += 1;
                cur.push(c);
            }
            '>' | ')' | ']' | '}' => {
                depth -= 1;
                cur.push(c);
            }
            ',' if depth <= 0 => {
                let t = cur.trim();
                if !t.is_empty() {
                    out.push(t.to_string());
                }
                cur.clear();
            }
            _ => cur.push(c),
        }
    }
    let t = cur.trim();
    if !t.is_empty() {
        out.push(t.to_string());
    }
    out
}

/// Drop a trailing generic argument list: `List<String>` → `List`.
pub(crate) fn strip_generics(s: &str) -> &str {
    match s.find('<') {
        Some(i) => s[..i].trim(),
        None => s.trim(),
    }
}

pub(crate) fn leading_indent(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn type_names(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// `pkg.Base<T>` → `Base`
fn simple_type_name(name: &str) -> &str {
    let name = strip_generics(name);
    name.rsplit('.').next().unwrap_or(name).trim()
}

/// EXTENDS / IMPLEMENTS edges between types declared in the same file, driven
/// by the `extends` and `implements` properties analyzers record.
pub(crate) fn link_supertypes(entities: &[Entity]) -> Vec<Relationship> {
    let is_type = |e: &&Entity| {
        matches!(
            e.entity_type,
            EntityType::Class | EntityType::Interface | EntityType::Enum
        )
    };
    let types: Vec<&Entity> = entities.iter().filter(is_type).collect();
    let find = |name: &str, self_id: &str| {
        let wanted = simple_type_name(name);
        types
            .iter()
            .find(|t| t.label == wanted && t.id != self_id)
            .copied()
    };

    let mut out = Vec::new();
    for t in &types {
        for name in type_names(t.properties.get("extends")) {
            if let Some(sup) = find(&name, &t.id) {
                out.push(Relationship::between(t, sup, RelationshipType::Extends));
            }
        }
        for name in type_names(t.properties.get("implements")) {
            if let Some(sup) = find(&name, &t.id) {
                out.push(Relationship::between(t, sup, RelationshipType::Implements));
            }
        }
    }
    out
}
