//! Reader facade.
//!
//! `NasReader` validates its configuration, binds one protocol strategy at
//! construction and keeps it for its lifetime. It exposes listing, reading
//! and bulk loading into [`Document`]s.

use std::path::Path;

use tempfile::TempDir;
use tracing::{debug, info, warn};

use nas_types::{Document, PROTOCOL_KEY};

use crate::config::ReaderConfig;
use crate::error::NasError;
use crate::extractor::ExtractorMap;
use crate::nfs::NfsStrategy;
use crate::pattern::{FilePattern, MATCH_ALL};
use crate::protocol::Protocol;
use crate::smb::{SmbConnector, SmbSession, SmbStrategy};
use crate::strategy::ProtocolStrategy;

/// A file that failed during a lenient bulk load.
#[derive(Debug)]
pub struct LoadFailure {
    pub file_path: String,
    pub error: NasError,
}

/// Outcome of [`NasReader::load_data_lenient`].
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    /// Whether every listed file produced a document.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Connector used by [`NasReader::new`].
///
/// Opens libsmbclient sessions when built with the `libsmbclient` feature;
/// otherwise every SMB connection attempt fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnector;

impl SmbConnector for DefaultConnector {
    #[cfg(feature = "libsmbclient")]
    fn connect(
        &self,
        params: &crate::smb::SmbParams,
    ) -> Result<Box<dyn SmbSession>, NasError> {
        crate::libsmb::LibSmbConnector.connect(params)
    }

    #[cfg(not(feature = "libsmbclient"))]
    fn connect(
        &self,
        params: &crate::smb::SmbParams,
    ) -> Result<Box<dyn SmbSession>, NasError> {
        Err(NasError::connection(
            &params.host,
            "built without SMB client support; enable the `libsmbclient` feature",
        ))
    }
}

/// Reads files from a NAS over SMB or NFS.
pub struct NasReader {
    config: ReaderConfig,
    strategy: Box<dyn ProtocolStrategy>,
    extractors: ExtractorMap,
}

impl NasReader {
    /// Protocol names accepted by [`NasReader::new`].
    pub const SUPPORTED_PROTOCOLS: &'static [&'static str] = crate::protocol::SUPPORTED_PROTOCOLS;

    /// Validate `config` and bind the matching strategy.
    ///
    /// SMB sessions are opened here, so an unreachable host or rejected
    /// credentials fail construction.
    ///
    /// # Errors
    ///
    /// `UnsupportedProtocol` for names outside [`Self::SUPPORTED_PROTOCOLS`],
    /// `MissingCredentials` for SMB without username, password and share name,
    /// `Connection` if the SMB session cannot be opened.
    pub fn new(config: ReaderConfig) -> Result<Self, NasError> {
        Self::with_connector(config, &DefaultConnector)
    }

    /// Like [`NasReader::new`], opening SMB sessions through `connector`.
    pub fn with_connector(
        config: ReaderConfig,
        connector: &dyn SmbConnector,
    ) -> Result<Self, NasError> {
        let protocol = config.validate()?;

        let strategy: Box<dyn ProtocolStrategy> = match protocol {
            Protocol::Smb => {
                let params = config.smb_params()?;
                Box::new(SmbStrategy::connect(connector, &params)?)
            }
            Protocol::Nfs => Box::new(NfsStrategy::new(&config.nas_path)),
        };

        info!(
            protocol = %protocol,
            host = %config.nas_ip,
            path = %config.nas_path,
            "NAS reader ready"
        );

        Ok(Self {
            config,
            strategy,
            extractors: ExtractorMap::new(),
        })
    }

    /// Bind a caller-provided strategy, skipping protocol validation.
    pub fn with_strategy(config: ReaderConfig, strategy: Box<dyn ProtocolStrategy>) -> Self {
        Self {
            config,
            strategy,
            extractors: ExtractorMap::new(),
        }
    }

    /// Wrap an already open SMB session.
    pub fn from_smb_session(
        config: ReaderConfig,
        session: Box<dyn SmbSession>,
    ) -> Result<Self, NasError> {
        let params = config.smb_params()?;
        let strategy = SmbStrategy::from_session(session, params.host, params.share_name);
        Ok(Self::with_strategy(config, Box::new(strategy)))
    }

    /// Use `extractors` for matching extensions during bulk loads.
    pub fn with_extractors(mut self, extractors: ExtractorMap) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn protocol(&self) -> Protocol {
        self.strategy.protocol()
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn extractors(&self) -> &ExtractorMap {
        &self.extractors
    }

    /// List files under the configured NAS path matching `pattern`.
    pub fn list_files(&self, pattern: &str, recursive: bool) -> Result<Vec<String>, NasError> {
        let pattern = FilePattern::new(pattern)?;
        self.strategy
            .list_files(&self.config.nas_path, &pattern, recursive)
    }

    /// List every file under the NAS path, recursively.
    pub fn list_all(&self) -> Result<Vec<String>, NasError> {
        self.list_files(MATCH_ALL, true)
    }

    /// Read a file as UTF-8 text.
    pub fn read_file(&self, file_path: &str) -> Result<String, NasError> {
        self.strategy.read_file(file_path)
    }

    /// Load every matching file as a document.
    ///
    /// All-or-nothing: the first file that cannot be read or extracted
    /// aborts the load and no documents are returned. Each file is staged
    /// into a temporary directory that is removed when the call returns.
    pub fn load_data(&self, pattern: &str, recursive: bool) -> Result<Vec<Document>, NasError> {
        let files = self.list_files(pattern, recursive)?;
        let staging = self.staging_dir()?;

        let mut documents = Vec::with_capacity(files.len());
        for (index, file_path) in files.iter().enumerate() {
            documents.push(self.load_one(staging.path(), index, file_path)?);
        }

        info!(
            protocol = %self.protocol(),
            pattern,
            recursive,
            count = documents.len(),
            "Loaded documents"
        );
        Ok(documents)
    }

    /// Load every file under the NAS path, recursively.
    pub fn load_all(&self) -> Result<Vec<Document>, NasError> {
        self.load_data(MATCH_ALL, true)
    }

    /// Load every matching file, collecting per-file failures instead of
    /// aborting. Listing failures still abort.
    pub fn load_data_lenient(&self, pattern: &str, recursive: bool) -> Result<LoadReport, NasError> {
        let files = self.list_files(pattern, recursive)?;
        let staging = self.staging_dir()?;

        let mut report = LoadReport::default();
        for (index, file_path) in files.into_iter().enumerate() {
            match self.load_one(staging.path(), index, &file_path) {
                Ok(document) => report.documents.push(document),
                Err(error) => {
                    warn!(path = %file_path, error = %error, "Skipping file");
                    report.failures.push(LoadFailure { file_path, error });
                }
            }
        }

        info!(
            protocol = %self.protocol(),
            pattern,
            recursive,
            count = report.documents.len(),
            failed = report.failures.len(),
            "Loaded documents (lenient)"
        );
        Ok(report)
    }

    /// Tear down the backend session and report any error doing so.
    pub fn close(mut self) -> Result<(), NasError> {
        self.strategy.close()
    }

    fn staging_dir(&self) -> Result<TempDir, NasError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("nas-reader-");
        let result = match &self.config.staging_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        };
        result.map_err(|e| {
            let location = self
                .config
                .staging_dir
                .as_deref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| std::env::temp_dir().to_string_lossy().into_owned());
            NasError::Io {
                path: location,
                source: e,
            }
        })
    }

    fn load_one(&self, staging: &Path, index: usize, file_path: &str) -> Result<Document, NasError> {
        let local_path = staging.join(staged_name(index, file_path));

        let text = match self.extractors.for_path(file_path) {
            Some(extractor) => {
                let bytes = self.strategy.read_bytes(file_path)?;
                write_staged(&local_path, &bytes)?;
                extractor.extract(&local_path).map_err(|e| match e {
                    NasError::Extraction { .. } => e,
                    other => NasError::extraction(file_path, other.to_string()),
                })?
            }
            None => {
                let text = self.strategy.read_file(file_path)?;
                write_staged(&local_path, text.as_bytes())?;
                text
            }
        };

        debug!(path = file_path, bytes = text.len(), "Loaded file");
        Ok(Document::from_file(file_path, text).with_metadata(PROTOCOL_KEY, self.protocol().as_str()))
    }
}

impl std::fmt::Debug for NasReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NasReader")
            .field("protocol", &self.protocol())
            .field("config", &self.config)
            .field("extractors", &self.extractors)
            .finish()
    }
}

/// Name a staged copy so files sharing a base name do not collide.
fn staged_name(index: usize, file_path: &str) -> String {
    let base = file_path
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("file");
    format!("{:05}-{}", index, base)
}

fn write_staged(local_path: &Path, bytes: &[u8]) -> Result<(), NasError> {
    std::fs::write(local_path, bytes).map_err(|e| NasError::Io {
        path: local_path.to_string_lossy().into_owned(),
        source: e,
    })
}
