//! Violation message rendering.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ir::Resource;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z_]*)\s*\}\}").unwrap());

/// Substitute `{{resource_name}}`, `{{resource_type}}`, `{{file}}` and
/// `{{line}}`. A template with any other placeholder or a stray brace pair
/// is returned unchanged.
pub fn render(template: &str, resource: &Resource) -> String {
    try_render(template, resource).unwrap_or_else(|| template.to_string())
}

fn try_render(template: &str, resource: &Resource) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let whole = caps.get(0)?;
        out.push_str(literal(&template[last..whole.start()])?);
        match &caps[1] {
            "resource_name" => out.push_str(&resource.name),
            "resource_type" => out.push_str(&resource.kind),
            "file" => out.push_str(&resource.location.file.display().to_string()),
            "line" => out.push_str(&resource.location.line.to_string()),
            _ => return None,
        }
        last = whole.end();
    }

    out.push_str(literal(&template[last..])?);
    Some(out)
}

fn literal(text: &str) -> Option<&str> {
    if text.contains("{{") || text.contains("}}") {
        None
    } else {
        Some(text)
    }
}
