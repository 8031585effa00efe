//! JSON output formatting

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Envelope for `--format json`: the payload under `data`, run details under `meta`
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T> {
    /// The actual data
    pub data: T,

    /// Metadata about the response
    pub meta: Metadata,
}

/// Metadata included in JSON output
#[derive(Debug, Serialize, Deserialize)]
pub struct Metadata {
    /// Timestamp of the response
    pub timestamp: String,

    /// irsync version
    pub version: String,

    /// Domain of the tenant read from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Domain of the tenant written to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

impl<T> JsonOutput<T> {
    /// Create a new JSON output with metadata
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: Metadata {
                timestamp: Utc::now().to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                source: None,
                destination: None,
            },
        }
    }

    /// Output for a run that compared or copied between two tenants.
    pub fn between(data: T, source: Option<&str>, destination: Option<&str>) -> Self {
        let mut output = Self::new(data);
        output.meta.source = source.map(str::to_string);
        output.meta.destination = destination.map(str::to_string);
        output
    }
}

/// Format data as pretty-printed JSON
pub fn format_json<T: Serialize + ?Sized>(data: &T) -> Result<String, serde_json::Error> {
    let output = JsonOutput::new(data);
    serde_json::to_string_pretty(&output)
}

/// Format a tenant-to-tenant result, naming both tenants in `meta`
pub fn format_json_between<T: Serialize + ?Sized>(
    data: &T,
    source: Option<&str>,
    destination: Option<&str>,
) -> Result<String, serde_json::Error> {
    let output = JsonOutput::between(data, source, destination);
    serde_json::to_string_pretty(&output)
}
