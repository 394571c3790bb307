//! Command-line interface

pub mod args;

pub use args::{Args, SubCommand};

use crate::error::{ExdbError, Result};
use crate::proxy::{Proxy, Value};

/// Follow a key path from a root handle. A segment that parses as an
/// integer indexes as one; everything else is a string key.
pub fn resolve_path(root: &Proxy, path: &[String]) -> Result<Value> {
    let mut current = Value::Table(root.clone());
    let mut walked: Vec<&str> = Vec::new();

    for segment in path {
        let table = match current.as_table() {
            Some(p) => p.clone(),
            None => return Err(ExdbError::NotContainer(walked.join("."))),
        };
        walked.push(segment);
        let key: Value = match segment.parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::from(segment.as_str()),
        };
        current = table.get(key)?;
    }

    Ok(current)
}
