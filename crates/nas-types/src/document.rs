//! Document type handed to downstream ingestion.
//!
//! A document is created once per successfully read file and never
//! modified afterwards. Its serialized form is the `{text, metadata}`
//! shape that ingestion components accept.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata key holding the originating backend path. Always present.
pub const FILE_PATH_KEY: &str = "file_path";

/// Metadata key holding the last path segment.
pub const FILE_NAME_KEY: &str = "file_name";

/// Metadata key holding the protocol the file was read over.
pub const PROTOCOL_KEY: &str = "protocol";

/// An immutable text record with string metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier (ULID string)
    doc_id: String,

    /// Extracted text content
    text: String,

    /// Source metadata (file path, file name, protocol, ...)
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl Document {
    /// Create a document for the file at `file_path`.
    ///
    /// Sets `file_path` and `file_name` metadata.
    pub fn from_file(file_path: impl Into<String>, text: impl Into<String>) -> Self {
        let file_path = file_path.into();
        let mut metadata = BTreeMap::new();
        metadata.insert(FILE_NAME_KEY.to_string(), file_name_of(&file_path).to_string());
        metadata.insert(FILE_PATH_KEY.to_string(), file_path);

        Self {
            doc_id: ulid::Ulid::new().to_string(),
            text: text.into(),
            metadata,
        }
    }

    /// Add a metadata entry. `file_path` cannot be overridden.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if key != FILE_PATH_KEY {
            self.metadata.insert(key, value.into());
        }
        self
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Path of the file this document was read from.
    pub fn file_path(&self) -> Option<&str> {
        self.metadata.get(FILE_PATH_KEY).map(String::as_str)
    }

    /// Consume the document, returning its text and metadata.
    pub fn into_parts(self) -> (String, BTreeMap<String, String>) {
        (self.text, self.metadata)
    }

    /// Serialize document to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize document from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Last segment of a `/` or `\` separated path.
fn file_name_of(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(path)
}
