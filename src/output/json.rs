//! JSON rendering of proxied values

use std::collections::HashSet;

use serde_json::{json, Map, Number};

use crate::error::Result;
use crate::proxy::Value;

/// Convert a marshaled value to JSON. A table whose entries are exactly
/// the sequence `1..=len` becomes an array; every other table becomes
/// an object with stringified keys. A table seen before renders as its
/// diagnostic tag.
pub fn to_json(value: &Value) -> Result<serde_json::Value> {
    let mut seen = HashSet::new();
    convert(value, &mut seen)
}

fn convert(value: &Value, seen: &mut HashSet<String>) -> Result<serde_json::Value> {
    match value {
        Value::Nil => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(json!(b)),
        Value::Int(n) => Ok(json!(n)),
        Value::Float(x) => Ok(match Number::from_f64(*x) {
            Some(n) => serde_json::Value::Number(n),
            // NaN and infinities have no JSON number form
            None => serde_json::Value::Null,
        }),
        Value::Str(s) => Ok(json!(s)),
        Value::Table(proxy) => {
            let tag = proxy.describe();
            if !seen.insert(tag) {
                return Ok(json!(proxy.describe()));
            }

            let len = proxy.len()?;
            let mut entries = Vec::new();
            for entry in proxy {
                entries.push(entry?);
            }

            if len > 0 && entries.len() as i64 == len {
                let mut items = Vec::with_capacity(entries.len());
                for index in 1..=len {
                    let item = proxy.get(index)?;
                    items.push(convert(&item, seen)?);
                }
                return Ok(serde_json::Value::Array(items));
            }

            let mut object = Map::new();
            for (key, entry_value) in &entries {
                object.insert(key_string(key), convert(entry_value, seen)?);
            }
            Ok(serde_json::Value::Object(object))
        }
    }
}

fn key_string(key: &Value) -> String {
    match key {
        Value::Str(s) => s.clone(),
        Value::Table(p) => p.describe(),
        other => other.to_string(),
    }
}
