//! Command implementations for the NAS reader CLI.
//!
//! Results go to the given writer (stdout in the binary); logs go to stderr.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use nas_embeddings::{create_and_save_model, CandleEmbedder, EmbeddingModel};
use nas_reader::{NasReader, ReaderConfig};
use nas_types::Settings;

/// Connection values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct ConnectionOverrides {
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub path: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub share: Option<String>,
    pub log_level: Option<String>,
}

impl ConnectionOverrides {
    /// Apply CLI overrides (highest precedence).
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(protocol) = &self.protocol {
            settings.protocol = protocol.clone();
        }
        if let Some(host) = &self.host {
            settings.host = host.clone();
        }
        if let Some(path) = &self.path {
            settings.path = path.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(username) = &self.username {
            settings.username = Some(username.clone());
        }
        if let Some(share) = &self.share {
            settings.share = Some(share.clone());
        }
        if let Some(log_level) = &self.log_level {
            settings.log_level = log_level.clone();
        }
    }
}

/// Load configuration: defaults -> file -> env -> CLI.
pub fn load_settings(config_path: Option<&str>, overrides: &ConnectionOverrides) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    overrides.apply(&mut settings);
    settings
        .validate()
        .context("Invalid configuration after applying CLI flags")?;
    Ok(settings)
}

/// Initialize logging. `RUST_LOG` wins over the configured level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn open_reader(settings: &Settings) -> Result<NasReader> {
    let config = ReaderConfig::from_settings(settings);
    NasReader::new(config).with_context(|| {
        format!(
            "Failed to open {} reader for host '{}'",
            settings.protocol, settings.host
        )
    })
}

/// Print every matching path, one per line.
pub fn list_files<W: Write>(
    settings: &Settings,
    pattern: &str,
    recursive: bool,
    out: &mut W,
) -> Result<usize> {
    let reader = open_reader(settings)?;
    let files = reader
        .list_files(pattern, recursive)
        .context("Failed to list files")?;
    for file in &files {
        writeln!(out, "{}", file)?;
    }
    reader.close().context("Failed to close connection")?;
    Ok(files.len())
}

/// Print the text of a single file.
pub fn read_file<W: Write>(settings: &Settings, path: &str, out: &mut W) -> Result<()> {
    let reader = open_reader(settings)?;
    let text = reader
        .read_file(path)
        .with_context(|| format!("Failed to read {}", path))?;
    out.write_all(text.as_bytes())?;
    reader.close().context("Failed to close connection")?;
    Ok(())
}

/// Load documents and print them as JSON lines.
///
/// Strict mode prints nothing unless every file loads. Lenient mode prints
/// what loaded and logs each failure.
pub fn load_documents<W: Write>(
    settings: &Settings,
    pattern: &str,
    recursive: bool,
    lenient: bool,
    out: &mut W,
) -> Result<usize> {
    let reader = open_reader(settings)?;

    let documents = if lenient {
        let report = reader
            .load_data_lenient(pattern, recursive)
            .context("Failed to load documents")?;
        for failure in &report.failures {
            warn!(file = %failure.file_path, error = %failure.error, "Skipped file");
        }
        if !report.is_complete() {
            warn!(
                loaded = report.documents.len(),
                failed = report.failures.len(),
                "Load finished with failures"
            );
        }
        report.documents
    } else {
        reader
            .load_data(pattern, recursive)
            .context("Failed to load documents")?
    };

    for document in &documents {
        serde_json::to_writer(&mut *out, document)?;
        writeln!(out)?;
    }
    reader.close().context("Failed to close connection")?;

    info!(count = documents.len(), "Documents written");
    Ok(documents.len())
}

/// Embed one text and print the vector as a JSON array.
pub fn embed_text<W: Write>(
    settings: &Settings,
    text: &str,
    model_dir: Option<&str>,
    query: bool,
    out: &mut W,
) -> Result<()> {
    let model_dir: Option<PathBuf> = match model_dir {
        Some(dir) => Some(PathBuf::from(dir)),
        None => settings.expanded_model_dir(),
    };
    let embedder = CandleEmbedder::from_settings(&settings.embedding, model_dir.as_deref())
        .context("Failed to load embedding model")?;

    let vector = if query {
        embedder.get_query_embedding(text)
    } else {
        embedder.get_text_embedding(text)
    }
    .context("Failed to embed text")?;

    serde_json::to_writer(&mut *out, &vector)?;
    writeln!(out)?;
    Ok(())
}

/// Download `repo` into `output_dir`.
pub fn save_model(repo: &str, output_dir: &str) -> Result<()> {
    let paths = create_and_save_model(repo, Path::new(output_dir))
        .with_context(|| format!("Failed to save model {} to {}", repo, output_dir))?;
    info!(repo = %repo, weights = ?paths.weights, "Model saved");
    Ok(())
}
