//! Output formatting for proxied values

pub mod human;
pub mod json;

use crate::error::Result;
use crate::proxy::Value;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Render a marshaled value. Tables are traversed through their proxy
/// handles, so everything printed went through the same read path a
/// consumer would use.
pub fn format_value(value: &Value, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Human => human::format_human(value),
        OutputFormat::Json => {
            let json = json::to_json(value)?;
            Ok(serde_json::to_string_pretty(&json).unwrap_or_else(|_| "null".to_string()))
        }
    }
}
