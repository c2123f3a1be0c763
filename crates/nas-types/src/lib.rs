//! # nas-types
//!
//! Shared domain types for the NAS reader workspace.
//!
//! This crate defines the data structures used across the other crates:
//! - Documents: Immutable `(text, metadata)` records handed to ingestion
//! - Settings: Layered configuration for connections and embeddings
//!
//! ## Usage
//!
//! ```rust
//! use nas_types::Document;
//!
//! let doc = Document::from_file("docs/readme.txt", "hello");
//! assert_eq!(doc.file_path(), Some("docs/readme.txt"));
//! ```

pub mod config;
pub mod document;
pub mod error;

pub use config::{EmbeddingSettings, Settings, DEFAULT_EMBEDDING_REPO, DEFAULT_SMB_PORT};
pub use document::{Document, FILE_NAME_KEY, FILE_PATH_KEY, PROTOCOL_KEY};
pub use error::ConfigError;
