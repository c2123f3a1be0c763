//! Configuration types for the NAS reader.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

use nas_types::{Settings, DEFAULT_SMB_PORT};

use crate::error::NasError;
use crate::protocol::Protocol;
use crate::smb::SmbParams;

/// Connection parameters for a [`crate::NasReader`].
///
/// Bound once at construction; the reader never mutates it.
#[derive(Debug, Clone, Deserialize)]
pub struct ReaderConfig {
    /// NAS host name or IP address.
    #[serde(default)]
    pub nas_ip: String,

    /// Root directory to list: share-relative for smb, mount path for nfs.
    #[serde(default)]
    pub nas_path: String,

    /// Protocol name, "smb" or "nfs".
    pub protocol: String,

    /// SMB port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// SMB user name.
    #[serde(default)]
    pub username: Option<String>,

    /// SMB password.
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,

    /// SMB share name.
    #[serde(default)]
    pub share_name: Option<String>,

    /// Parent directory for bulk-load scratch space (system temp dir if unset).
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
}

fn default_port() -> u16 {
    DEFAULT_SMB_PORT
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

impl ReaderConfig {
    /// Config for an SMB share.
    pub fn smb(
        nas_ip: impl Into<String>,
        share_name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            nas_ip: nas_ip.into(),
            nas_path: String::new(),
            protocol: Protocol::Smb.as_str().to_string(),
            port: DEFAULT_SMB_PORT,
            username: Some(username.into()),
            password: Some(SecretString::from(password.into())),
            share_name: Some(share_name.into()),
            staging_dir: None,
        }
    }

    /// Config for an NFS export mounted at `mount_path`.
    pub fn nfs(nas_ip: impl Into<String>, mount_path: impl Into<String>) -> Self {
        Self {
            nas_ip: nas_ip.into(),
            nas_path: mount_path.into(),
            protocol: Protocol::Nfs.as_str().to_string(),
            port: DEFAULT_SMB_PORT,
            username: None,
            password: None,
            share_name: None,
            staging_dir: None,
        }
    }

    /// Build from layered application settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            nas_ip: settings.host.clone(),
            nas_path: settings.path.clone(),
            protocol: settings.protocol.clone(),
            port: settings.port,
            username: settings.username.clone(),
            password: settings.password.clone(),
            share_name: settings.share.clone(),
            staging_dir: None,
        }
    }

    /// Set the root directory to list.
    pub fn with_path(mut self, nas_path: impl Into<String>) -> Self {
        self.nas_path = nas_path.into();
        self
    }

    /// Set the SMB port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the parent directory for bulk-load scratch space.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Parse and check the protocol name.
    pub fn protocol(&self) -> Result<Protocol, NasError> {
        self.protocol.parse()
    }

    /// SMB session parameters, failing if any required one is missing.
    pub fn smb_params(&self) -> Result<SmbParams, NasError> {
        let username = non_empty(self.username.as_deref());
        let password = self
            .password
            .as_ref()
            .filter(|p| !p.expose_secret().is_empty());
        let share_name = non_empty(self.share_name.as_deref());

        let mut missing = Vec::new();
        if username.is_none() {
            missing.push("username");
        }
        if password.is_none() {
            missing.push("password");
        }
        if share_name.is_none() {
            missing.push("share_name");
        }

        match (username, password, share_name) {
            (Some(username), Some(password), Some(share_name)) => {
                if self.nas_ip.trim().is_empty() {
                    return Err(NasError::config("nas_ip is required for smb"));
                }
                Ok(SmbParams {
                    host: self.nas_ip.trim().to_string(),
                    port: self.port,
                    username: username.to_string(),
                    password: password.clone(),
                    share_name: share_name.to_string(),
                })
            }
            _ => Err(NasError::MissingCredentials { missing }),
        }
    }

    /// Check that every parameter the chosen protocol needs is present.
    pub fn validate(&self) -> Result<Protocol, NasError> {
        let protocol = self.protocol()?;
        match protocol {
            Protocol::Smb => {
                self.smb_params()?;
            }
            Protocol::Nfs => {
                if self.nas_path.trim().is_empty() {
                    return Err(NasError::config("nas_path is required for nfs"));
                }
            }
        }
        if self.port == 0 {
            return Err(NasError::config("port must be > 0"));
        }
        Ok(protocol)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nfs_config_valid() {
        let config = ReaderConfig::nfs("10.0.0.4", "/mnt/nas");
        assert_eq!(config.validate().unwrap(), Protocol::Nfs);
    }

    #[test]
    fn test_nfs_requires_path() {
        let config = ReaderConfig::nfs("10.0.0.4", "  ");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, NasError::Config(_)));
    }

    #[test]
    fn test_smb_config_valid() {
        let config = ReaderConfig::smb("10.0.0.4", "docs", "reader", "pw").with_path("team");
        assert_eq!(config.validate().unwrap(), Protocol::Smb);

        let params = config.smb_params().unwrap();
        assert_eq!(params.host, "10.0.0.4");
        assert_eq!(params.port, 139);
        assert_eq!(params.share_name, "docs");
    }

    #[test]
    fn test_smb_missing_each_credential() {
        let base = ReaderConfig::smb("10.0.0.4", "docs", "reader", "pw");

        let mut no_user = base.clone();
        no_user.username = None;
        let mut no_password = base.clone();
        no_password.password = Some(SecretString::from(String::new()));
        let mut no_share = base.clone();
        no_share.share_name = Some(String::new());

        for (config, field) in [
            (no_user, "username"),
            (no_password, "password"),
            (no_share, "share_name"),
        ] {
            match config.validate().unwrap_err() {
                NasError::MissingCredentials { missing } => assert_eq!(missing, vec![field]),
                other => panic!("Expected MissingCredentials, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_smb_missing_all_credentials() {
        let mut config = ReaderConfig::nfs("10.0.0.4", "/mnt");
        config.protocol = "smb".to_string();

        match config.validate().unwrap_err() {
            NasError::MissingCredentials { missing } => {
                assert_eq!(missing, vec!["username", "password", "share_name"])
            }
            other => panic!("Expected MissingCredentials, got {:?}", other),
        }
    }

    #[test]
    fn test_smb_requires_host() {
        let config = ReaderConfig::smb("", "docs", "reader", "pw");
        assert!(matches!(config.validate(), Err(NasError::Config(_))));
    }

    #[test]
    fn test_unsupported_protocol() {
        let mut config = ReaderConfig::nfs("10.0.0.4", "/mnt");
        config.protocol = "webdav".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, NasError::UnsupportedProtocol { ref protocol } if protocol == "webdav"));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let config: ReaderConfig = toml::from_str(
            r#"
nas_ip = "192.168.1.20"
protocol = "smb"
username = "svc"
password = "pw"
share_name = "archive"
nas_path = "2024"
"#,
        )
        .unwrap();

        assert_eq!(config.port, DEFAULT_SMB_PORT);
        assert_eq!(config.validate().unwrap(), Protocol::Smb);
        assert!(!format!("{:?}", config).contains("\"pw\""));
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings {
            protocol: "smb".to_string(),
            host: "nas".to_string(),
            path: "shared".to_string(),
            username: Some("u".to_string()),
            password: Some(SecretString::from("p".to_string())),
            share: Some("s".to_string()),
            ..Default::default()
        };

        let config = ReaderConfig::from_settings(&settings);
        assert_eq!(config.nas_path, "shared");
        assert_eq!(config.validate().unwrap(), Protocol::Smb);
    }
}
