//! Error types for NAS reader operations.

use std::string::FromUtf8Error;
use thiserror::Error;

/// Broad failure classes callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad or missing construction parameters
    Configuration,
    /// Host unreachable, credentials rejected, session failures
    Connectivity,
    /// Directory or file does not exist
    Lookup,
    /// File content is not valid UTF-8
    Decoding,
    /// Local I/O or extractor failure
    Io,
}

/// Errors that can occur while listing or reading NAS files.
#[derive(Error, Debug)]
pub enum NasError {
    /// Protocol name outside the supported set.
    #[error("Unsupported protocol '{protocol}'. Supported protocols are: smb, nfs")]
    UnsupportedProtocol { protocol: String },

    /// SMB selected without the parameters it needs.
    #[error("Missing required SMB parameters: {}", .missing.join(", "))]
    MissingCredentials { missing: Vec<&'static str> },

    /// Any other invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session could not be opened or was lost.
    #[error("Connection error for {host}: {message}")]
    Connection { host: String, message: String },

    /// Remote operation failed after the session was established.
    #[error("Remote error at {path}: {message}")]
    Remote { path: String, message: String },

    /// Path does not resolve on the backend.
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Path resolves to something other than a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    /// File bytes are not UTF-8.
    #[error("File {path} is not valid UTF-8: {source}")]
    Decode {
        path: String,
        #[source]
        source: FromUtf8Error,
    },

    /// Local filesystem error.
    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Glob pattern could not be compiled.
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A per-extension extractor rejected the file.
    #[error("Extraction failed for {path}: {message}")]
    Extraction { path: String, message: String },
}

impl NasError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error.
    pub fn connection(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create a remote operation error.
    pub fn remote(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create an extraction error.
    pub fn extraction(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error, mapping `NotFound` to [`NasError::NotFound`].
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Failure class of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedProtocol { .. }
            | Self::MissingCredentials { .. }
            | Self::Config(_)
            | Self::InvalidPattern { .. } => ErrorCategory::Configuration,
            Self::Connection { .. } | Self::Remote { .. } => ErrorCategory::Connectivity,
            Self::NotFound { .. } | Self::NotADirectory { .. } => ErrorCategory::Lookup,
            Self::Decode { .. } => ErrorCategory::Decoding,
            Self::Io { .. } | Self::Extraction { .. } => ErrorCategory::Io,
        }
    }

    /// Whether construction parameters were rejected.
    pub fn is_configuration(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    /// Whether a directory or file could not be found.
    pub fn is_lookup(&self) -> bool {
        self.category() == ErrorCategory::Lookup
    }
}
