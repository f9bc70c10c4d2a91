use regex::Regex;
use std::collections::{BTreeMap, HashSet};

use crate::analyzers::common::is_comment;
use crate::core::records::{Entity, Relationship};
use crate::core::types::RelationshipType;

fn re_call_site() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    // bare `name(` and member access `recv.name(` both end in an identifier followed by `(`
    RE.get_or_init(|| Regex::new(r"([A-Za-z_$][\w$]*)\s*\(").unwrap())
}

fn line_of(e: &Entity) -> Option<usize> {
    e.properties
        .get("lineNumber")
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
}

/// Link call sites to callables declared in the same file.
///
/// The enclosing callable of a line is the last callable with a body declared above it.
/// On a declaration line only the text after its `{` is scanned, attributed to
/// that declaration. Blank lines and comment lines are not scanned. A call to
/// a name the enclosing callable itself carries is treated as recursion and
/// skipped. One CALLS edge per (caller, callee), carrying the first call line.
pub(crate) fn link_call_sites(
    lines: &[&str],
    entities: &[Entity],
    comment_prefixes: &[&str],
) -> Vec<Relationship> {
    let mut callables: Vec<(usize, &Entity)> = entities
        .iter()
        .filter(|e| e.entity_type.is_callable())
        .filter_map(|e| line_of(e).map(|ln| (ln, e)))
        .collect();
    if callables.is_empty() {
        return Vec::new();
    }
    callables.sort_by_key(|(ln, _)| *ln);

    let decl_lines: HashSet<usize> = callables.iter().map(|(ln, _)| *ln).collect();
    // bodiless declarations (interface members) can be called but never enclose a call
    let callers: Vec<(usize, &Entity)> = callables
        .iter()
        .filter(|(_, e)| e.properties.get("abstract").and_then(|v| v.as_bool()) != Some(true))
        .copied()
        .collect();
    let mut by_name: BTreeMap<&str, Vec<&Entity>> = BTreeMap::new();
    for (_, e) in &callables {
        by_name.entry(e.label.as_str()).or_default().push(*e);
    }

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut out = Vec::new();
    for (idx, raw) in lines.iter().enumerate() {
        let ln = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || is_comment(trimmed, comment_prefixes) {
            continue;
        }
        let (caller, body) = if decl_lines.contains(&ln) {
            // only a body written on the declaration line itself: `int getX() { return x(); }`
            let Some(open) = trimmed.find('{') else {
                continue;
            };
            let Some((_, caller)) = callers.iter().rev().find(|(decl, _)| *decl == ln) else {
                continue;
            };
            (*caller, &trimmed[open + 1..])
        } else {
            let pos = callers.partition_point(|(decl, _)| *decl < ln);
            if pos == 0 {
                continue;
            }
            (callers[pos - 1].1, trimmed)
        };

        for cap in re_call_site().captures_iter(body) {
            let Some(candidates) = by_name.get(&cap[1]) else {
                continue;
            };
            if candidates.iter().any(|c| c.id == caller.id) {
                continue;
            }
            let callee = candidates[0];
            if !seen.insert((caller.id.clone(), callee.id.clone())) {
                continue;
            }
            out.push(
                Relationship::between(caller, callee, RelationshipType::Calls)
                    .with_property("lineNumber", ln as u64),
            );
        }
    }
    out
}
