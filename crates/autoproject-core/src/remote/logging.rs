//! Remote API request/response logging
//!
//! Set the `AUTOPROJECT_API_LOG` environment variable to append every
//! request/response pair sent to the remote service to a JSON-lines file.
//!
//! Example: `AUTOPROJECT_API_LOG=/tmp/api.log autoproject "Build a site"`

use std::io::Write;
use std::path::Path;

use serde_json::{json, Value};
use tracing::warn;

pub const API_LOG_ENV: &str = "AUTOPROJECT_API_LOG";

/// What to include in one log line
#[derive(Default)]
pub struct ApiLogEntry<'a> {
    pub method: &'a str,
    pub path: &'a str,
    /// Request body, if any
    pub request: Option<&'a Value>,
    pub status: Option<u16>,
    /// Raw response body
    pub response: Option<&'a str>,
    /// Transport error, if the request never got a response
    pub error: Option<&'a str>,
}

impl ApiLogEntry<'_> {
    fn to_json(&self) -> Value {
        // Keep the body structured when it parses
        let response = self
            .response
            .map(|raw| serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string())));

        json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "method": self.method,
            "path": self.path,
            "request": self.request,
            "status": self.status,
            "response": response,
            "error": self.error,
        })
    }
}

/// Log a remote call if `AUTOPROJECT_API_LOG` is set
pub fn log_api_call(entry: ApiLogEntry<'_>) {
    let Ok(log_file) = std::env::var(API_LOG_ENV) else {
        return;
    };
    if log_file.is_empty() {
        return;
    }
    append_entry(Path::new(&log_file), &entry);
}

/// Append one JSON line to `path`; failures are logged, never raised
pub fn append_entry(path: &Path, entry: &ApiLogEntry<'_>) {
    let line = entry.to_json().to_string();

    match std::fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(mut file) => {
            if let Err(e) = writeln!(file, "{}", line) {
                warn!("Failed to write to API log file: {}", e);
            }
        }
        Err(e) => {
            warn!("Failed to open API log file {}: {}", path.display(), e);
        }
    }
}
