//! libsmbclient-backed SMB sessions.
//!
//! Enabled with the `libsmbclient` feature. Session negotiation and
//! authentication are handled entirely by the system library through
//! `pavao`.

use std::io::Read;

use pavao::{SmbClient, SmbCredentials, SmbDirentType, SmbError, SmbOpenOptions, SmbOptions};
use tracing::debug;

use crate::error::NasError;
use crate::smb::{SmbConnector, SmbEntry, SmbParams, SmbSession};

/// Opens sessions through libsmbclient.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibSmbConnector;

impl SmbConnector for LibSmbConnector {
    fn connect(&self, params: &SmbParams) -> Result<Box<dyn SmbSession>, NasError> {
        let credentials = SmbCredentials::default()
            .server(params.server_url())
            .share(format!("/{}", params.share_name.trim_matches('/')))
            .username(params.username.as_str())
            .password(params.password());

        let client = SmbClient::new(credentials, SmbOptions::default().one_share_per_server(true))
            .map_err(|e| NasError::connection(&params.host, e.to_string()))?;

        // libsmbclient connects lazily; list the share root so bad hosts and
        // rejected credentials surface here
        client
            .list_dir("/")
            .map_err(|e| NasError::connection(&params.host, e.to_string()))?;

        debug!(host = %params.host, share = %params.share_name, "SMB session established");
        Ok(Box::new(LibSmbSession {
            client: Some(client),
            host: params.host.clone(),
        }))
    }
}

/// Session over one share.
pub struct LibSmbSession {
    client: Option<SmbClient>,
    host: String,
}

impl LibSmbSession {
    fn client(&self) -> Result<&SmbClient, NasError> {
        self.client
            .as_ref()
            .ok_or_else(|| NasError::connection(&self.host, "session already closed"))
    }
}

fn share_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

fn map_error(path: &str, err: SmbError) -> NasError {
    match err {
        SmbError::Io(io) => NasError::io(path, io),
        other => NasError::remote(path, other.to_string()),
    }
}

impl SmbSession for LibSmbSession {
    fn list_path(&self, path: &str) -> Result<Vec<SmbEntry>, NasError> {
        let entries = self
            .client()?
            .list_dir(&share_path(path))
            .map_err(|e| map_error(path, e))?;

        Ok(entries
            .into_iter()
            .map(|entry| SmbEntry {
                name: entry.name().to_string(),
                is_directory: matches!(entry.get_type(), SmbDirentType::Dir),
            })
            .collect())
    }

    fn retrieve_file(&self, path: &str) -> Result<Vec<u8>, NasError> {
        let mut file = self
            .client()?
            .open_with(share_path(path), SmbOpenOptions::default().read(true))
            .map_err(|e| map_error(path, e))?;

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .map_err(|e| NasError::io(path, e))?;
        Ok(buffer)
    }

    fn disconnect(&mut self) -> Result<(), NasError> {
        // Dropping the client frees the libsmbclient context
        self.client.take();
        Ok(())
    }
}
