//! Input JSONL records and document id derivation.

use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hex characters of the source digest kept in derived ids.
const SOURCE_DIGEST_HEX: usize = 16;

/// One input line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputRecord {
    /// Raw markup body.
    #[serde(default)]
    pub text: Option<String>,
    /// Alternate field for the markup body.
    #[serde(default)]
    pub document_text: Option<String>,
    /// Explicit identifier, string or number.
    #[serde(default)]
    pub example_id: Option<Value>,
    /// Origin reference such as a URL.
    #[serde(default)]
    pub source: Option<String>,
    /// Question associated with the document; carried but not used for chunking.
    #[serde(default)]
    pub query: Option<String>,
}

impl InputRecord {
    /// Parses one JSON line.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Markup body: `text` when non-empty, else `document_text`, else empty.
    pub fn markup(&self) -> &str {
        non_empty(self.text.as_deref())
            .or_else(|| non_empty(self.document_text.as_deref()))
            .unwrap_or("")
    }

    /// Stable document id for the record at 1-based `line`.
    ///
    /// Priority: `example_id`, then a digest of `source`, then the line number.
    pub fn doc_id(&self, line: usize) -> String {
        if let Some(id) = self.example_id.as_ref().and_then(id_string) {
            return id;
        }
        if let Some(source) = non_empty(self.source.as_deref()) {
            let digest = Sha256::digest(source.as_bytes());
            let hex = format!("{digest:x}");
            return format!("src-{}", &hex[..SOURCE_DIGEST_HEX]);
        }
        format!("doc-{line}")
    }

    /// Source reference, falling back to `doc_id`.
    pub fn source_or<'a>(&'a self, doc_id: &'a str) -> &'a str {
        non_empty(self.source.as_deref()).unwrap_or(doc_id)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(id) if id.is_empty() => None,
        Value::String(id) => Some(id.clone()),
        other => Some(other.to_string()),
    }
}
