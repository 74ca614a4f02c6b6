//! Result → human/json string formatting.
//!
//! - **Human** (default): bare key strings; decoded keys as pretty JSON
//! - **JSON** (`--json`): every result as a pretty JSON object

use gcdkit_core::Key;
use serde_json::{json, Value as JsonValue};

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

fn pretty(value: &JsonValue) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Format a key string result (`encode`, `parent`).
pub fn format_ks(key: &Key, ks: &str, mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => ks.to_string(),
        OutputMode::Json => pretty(&json!({"ks": ks, "key": key.to_json()})),
    }
}

/// Format a decoded key (`decode`).
pub fn format_decoded(key: &Key, mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => pretty(&key.to_json()),
        OutputMode::Json => {
            let ks = key.ks().map(str::to_owned).ok();
            pretty(&json!({"ks": ks, "key": key.to_json()}))
        }
    }
}

/// Format an error.
pub fn format_error(err: &str, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&json!({ "error": err })),
        OutputMode::Human => format!("error: {}", err),
    }
}
