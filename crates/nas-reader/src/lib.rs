//! # nas-reader
//!
//! List and read files on network-attached storage and turn them into
//! documents for ingestion.
//!
//! ## Core Components
//!
//! - [`ProtocolStrategy`]: Capability set every backend implements
//! - [`SmbStrategy`]: Remote share reached through an [`SmbSession`]
//! - [`NfsStrategy`]: NFS export already mounted into the local filesystem
//! - [`NasReader`]: Facade that binds one strategy and bulk-loads documents
//! - [`ExtractorMap`]: Optional per-extension text extraction
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nas_reader::{NasReader, ReaderConfig};
//!
//! let reader = NasReader::new(ReaderConfig::nfs("10.0.0.5", "/mnt/nas/docs"))?;
//! for doc in reader.load_data("*.md", true)? {
//!     println!("{:?}: {} bytes", doc.file_path(), doc.text().len());
//! }
//! # Ok::<(), nas_reader::NasError>(())
//! ```
//!
//! SMB support through the system libsmbclient is behind the
//! `libsmbclient` feature. Without it, SMB readers can still be built
//! from any [`SmbSession`] implementation via
//! [`NasReader::with_connector`].

pub mod config;
pub mod error;
pub mod extractor;
#[cfg(feature = "libsmbclient")]
pub mod libsmb;
pub mod nfs;
pub mod pattern;
pub mod protocol;
pub mod reader;
pub mod smb;
pub mod strategy;

// Re-export main types at crate root
pub use config::ReaderConfig;
pub use error::{ErrorCategory, NasError};
pub use extractor::{ExtractorMap, FileExtractor, LossyTextExtractor};
#[cfg(feature = "libsmbclient")]
pub use libsmb::LibSmbConnector;
pub use nfs::NfsStrategy;
pub use pattern::{FilePattern, MATCH_ALL};
pub use protocol::{Protocol, SUPPORTED_PROTOCOLS};
pub use reader::{DefaultConnector, LoadFailure, LoadReport, NasReader};
pub use smb::{SmbConnector, SmbEntry, SmbParams, SmbSession, SmbStrategy};
pub use strategy::ProtocolStrategy;

pub use nas_types::Document;
