//! Human-readable rendering of proxied values
//!
//! Nested tables indent; a table that appears a second time prints its
//! diagnostic tag instead of its entries, which also keeps shared or
//! cyclic structures from looping.

use std::collections::HashSet;

use crate::error::Result;
use crate::proxy::Value;

pub fn format_human(value: &Value) -> Result<String> {
    let mut out = String::new();
    let mut seen = HashSet::new();
    render(value, 0, &mut seen, &mut out)?;
    Ok(out)
}

fn render(
    value: &Value,
    indent: usize,
    seen: &mut HashSet<String>,
    out: &mut String,
) -> Result<()> {
    match value {
        Value::Str(s) => out.push_str(&format!("{:?}", s)),
        Value::Table(proxy) => {
            let tag = proxy.describe();
            if !seen.insert(tag.clone()) {
                out.push_str(&tag);
                return Ok(());
            }
            out.push_str("{\n");
            let pad = "  ".repeat(indent + 1);
            for entry in proxy {
                let (key, entry_value) = entry?;
                out.push_str(&pad);
                out.push_str(&key_text(&key));
                out.push_str(" = ");
                render(&entry_value, indent + 1, seen, out)?;
                out.push_str(",\n");
            }
            out.push_str(&"  ".repeat(indent));
            out.push('}');
        }
        other => out.push_str(&other.to_string()),
    }
    Ok(())
}

fn key_text(key: &Value) -> String {
    match key {
        Value::Str(s) if is_plain_name(s) => s.clone(),
        Value::Str(s) => format!("[{:?}]", s),
        Value::Table(p) => format!("[{}]", p.describe()),
        other => format!("[{}]", other),
    }
}

fn is_plain_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
