//! Configuration loading for the NAS reader.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/nas-reader/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// NetBIOS session service port, used unless overridden.
pub const DEFAULT_SMB_PORT: u16 = 139;

/// Embedding model fetched when no repository is configured.
pub const DEFAULT_EMBEDDING_REPO: &str = "BAAI/bge-small-en-v1.5";

/// Embedding model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Hugging Face repository used by `save-model`
    #[serde(default = "default_repo_id")]
    pub repo_id: String,

    /// Folder holding config.json, tokenizer.json and model.safetensors
    #[serde(default)]
    pub model_dir: Option<String>,

    /// Pooling strategy ("cls" or "mean")
    #[serde(default = "default_pooling")]
    pub pooling: String,

    /// L2-normalize output vectors
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Maximum tokens per input; longer inputs are truncated
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Number of texts per forward pass
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Prefix prepended to queries
    #[serde(default)]
    pub query_instruction: Option<String>,

    /// Prefix prepended to documents
    #[serde(default)]
    pub text_instruction: Option<String>,
}

fn default_repo_id() -> String {
    DEFAULT_EMBEDDING_REPO.to_string()
}

fn default_pooling() -> String {
    "cls".to_string()
}

fn default_normalize() -> bool {
    true
}

fn default_max_length() -> usize {
    512
}

fn default_batch_size() -> usize {
    10
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            repo_id: default_repo_id(),
            model_dir: None,
            pooling: default_pooling(),
            normalize: default_normalize(),
            max_length: default_max_length(),
            batch_size: default_batch_size(),
            query_instruction: None,
            text_instruction: None,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Protocol used to reach the NAS ("smb" or "nfs")
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// NAS host name or IP address
    #[serde(default)]
    pub host: String,

    /// Root directory on the NAS (share-relative for smb, mount path for nfs)
    #[serde(default)]
    pub path: String,

    /// SMB port
    #[serde(default = "default_port")]
    pub port: u16,

    /// SMB user name
    #[serde(default)]
    pub username: Option<String>,

    /// SMB password (prefer the NAS_PASSWORD env var over the config file)
    #[serde(default, skip_serializing, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,

    /// SMB share name
    #[serde(default)]
    pub share: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingSettings,
}

fn default_protocol() -> String {
    "nfs".to_string()
}

fn default_port() -> u16 {
    DEFAULT_SMB_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            host: String::new(),
            path: String::new(),
            port: default_port(),
            username: None,
            password: None,
            share: None,
            log_level: default_log_level(),
            embedding: EmbeddingSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/nas-reader/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (NAS_*, nested keys use `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = ProjectDirs::from("", "", "nas-reader")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("protocol", default_protocol())
            .map_err(|e| ConfigError::Load(e.to_string()))?
            .set_default("port", default_port() as i64)
            .map_err(|e| ConfigError::Load(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| ConfigError::Load(e.to_string()))?
            .set_default("embedding.repo_id", default_repo_id())
            .map_err(|e| ConfigError::Load(e.to_string()))?
            .set_default("embedding.pooling", default_pooling())
            .map_err(|e| ConfigError::Load(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // NAS_HOST, NAS_PASSWORD, NAS_LOG_LEVEL, NAS_EMBEDDING__MODEL_DIR, ...
        builder = builder.add_source(
            Environment::with_prefix("NAS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::invalid("port", "must be > 0"));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::invalid("embedding.batch_size", "must be > 0"));
        }
        if self.embedding.max_length == 0 {
            return Err(ConfigError::invalid("embedding.max_length", "must be > 0"));
        }
        Ok(())
    }

    /// Expand ~ in the embedding model directory
    pub fn expanded_model_dir(&self) -> Option<PathBuf> {
        let dir = self.embedding.model_dir.as_deref()?;
        if let Some(rest) = dir.strip_prefix("~/") {
            if let Some(base) = directories::BaseDirs::new() {
                return Some(base.home_dir().join(rest));
            }
        }
        Some(PathBuf::from(dir))
    }
}
