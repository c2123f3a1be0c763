//! Supported NAS access protocols.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::NasError;

/// Protocol names accepted at construction.
pub const SUPPORTED_PROTOCOLS: &[&str] = &["smb", "nfs"];

/// Protocol a reader is bound to for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Remote share reached through an SMB session
    Smb,
    /// NFS export already mounted into the local filesystem
    Nfs,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Smb => "smb",
            Protocol::Nfs => "nfs",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = NasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smb" => Ok(Protocol::Smb),
            "nfs" => Ok(Protocol::Nfs),
            other => Err(NasError::UnsupportedProtocol {
                protocol: other.to_string(),
            }),
        }
    }
}
