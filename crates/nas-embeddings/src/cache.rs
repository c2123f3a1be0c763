//! Model folders.
//!
//! A model folder holds the files needed to run a BERT-family encoder
//! locally. Folders are created once from HuggingFace Hub and then loaded
//! offline.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use nas_types::DEFAULT_EMBEDDING_REPO;

use crate::error::EmbeddingError;

/// Files a model folder must contain
pub const MODEL_FILES: &[&str] = &["config.json", "tokenizer.json", "model.safetensors"];

/// Default cache location for models fetched on demand
#[derive(Debug, Clone)]
pub struct ModelCache {
    /// Cache directory path
    pub cache_dir: PathBuf,
    /// Model repository ID
    pub repo_id: String,
}

impl Default for ModelCache {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("nas-reader")
            .join("models");

        Self {
            cache_dir,
            repo_id: DEFAULT_EMBEDDING_REPO.to_string(),
        }
    }
}

impl ModelCache {
    pub fn new(cache_dir: impl Into<PathBuf>, repo_id: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            repo_id: repo_id.into(),
        }
    }

    /// Folder this cache stores `repo_id` in
    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir.join(self.repo_id.replace('/', "_"))
    }

    pub fn is_cached(&self) -> bool {
        is_complete(&self.model_dir())
    }

    /// Return the cached folder, downloading it first when incomplete.
    pub fn get_or_download(&self) -> Result<ModelPaths, EmbeddingError> {
        let model_dir = self.model_dir();
        if self.is_cached() {
            debug!(path = ?model_dir, "Using cached model");
            return model_paths(&model_dir);
        }
        create_and_save_model(&self.repo_id, &model_dir)
    }
}

/// Paths to model files
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

/// True when `folder` holds every file in [`MODEL_FILES`].
pub fn is_complete(folder: &Path) -> bool {
    MODEL_FILES.iter().all(|f| folder.join(f).is_file())
}

/// Resolve the files of an existing model folder.
pub fn model_paths(folder: &Path) -> Result<ModelPaths, EmbeddingError> {
    if let Some(missing) = MODEL_FILES.iter().find(|f| !folder.join(f).is_file()) {
        return Err(EmbeddingError::ModelNotFound(format!(
            "{} is missing from {}",
            missing,
            folder.display()
        )));
    }

    Ok(ModelPaths {
        config: folder.join("config.json"),
        tokenizer: folder.join("tokenizer.json"),
        weights: folder.join("model.safetensors"),
    })
}

/// Download a model from HuggingFace Hub and save it as a loadable folder.
///
/// `output_dir` is created if needed; existing files are overwritten.
pub fn create_and_save_model(
    repo_id: &str,
    output_dir: &Path,
) -> Result<ModelPaths, EmbeddingError> {
    use hf_hub::api::sync::Api;

    info!(repo = %repo_id, dir = ?output_dir, "Downloading model files...");

    let api = Api::new().map_err(|e| EmbeddingError::Download(e.to_string()))?;
    let repo = api.model(repo_id.to_string());

    std::fs::create_dir_all(output_dir)?;

    for filename in MODEL_FILES {
        info!(file = filename, "Downloading...");
        let source_path = repo
            .get(filename)
            .map_err(|e| EmbeddingError::Download(format!("{}: {}", filename, e)))?;

        let dest_path = output_dir.join(filename);
        std::fs::copy(&source_path, &dest_path)?;
        debug!(file = filename, "Saved to {:?}", dest_path);
    }

    model_paths(output_dir)
}
