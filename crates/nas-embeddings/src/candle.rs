//! Candle-based embedding implementation.
//!
//! Runs a BERT-family encoder (BGE by default, 384 dimensions for
//! bge-small-en-v1.5) on CPU from a saved model folder.

use std::path::Path;

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use nas_types::EmbeddingSettings;

use crate::cache::{model_paths, ModelCache};
use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo, Pooling};

/// Default maximum sequence length in tokens
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// Default number of texts per forward pass
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Inference options for [`CandleEmbedder`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedderOptions {
    pub pooling: Pooling,
    /// Scale every output vector to unit length
    pub normalize: bool,
    /// Truncation length; clamped to the model's position limit
    pub max_length: usize,
    pub batch_size: usize,
    pub query_instruction: Option<String>,
    pub text_instruction: Option<String>,
}

impl Default for EmbedderOptions {
    fn default() -> Self {
        Self {
            pooling: Pooling::Cls,
            normalize: true,
            max_length: DEFAULT_MAX_LENGTH,
            batch_size: DEFAULT_BATCH_SIZE,
            query_instruction: None,
            text_instruction: None,
        }
    }
}

impl EmbedderOptions {
    /// Build options from the `[embedding]` settings section.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self, EmbeddingError> {
        let options = Self {
            pooling: settings.pooling.parse()?,
            normalize: settings.normalize,
            max_length: settings.max_length,
            batch_size: settings.batch_size,
            query_instruction: settings.query_instruction.clone(),
            text_instruction: settings.text_instruction.clone(),
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.max_length == 0 {
            return Err(EmbeddingError::InvalidInput(
                "max_length must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(EmbeddingError::InvalidInput(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Candle-based embedder for BERT-family sentence encoders.
pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    info: ModelInfo,
    options: EmbedderOptions,
}

impl CandleEmbedder {
    /// Load a model folder written by
    /// [`create_and_save_model`](crate::cache::create_and_save_model).
    pub fn from_folder(folder: &Path, options: EmbedderOptions) -> Result<Self, EmbeddingError> {
        let paths = model_paths(folder)?;
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| folder.display().to_string());
        Self::load_from_paths(
            name,
            &paths.config,
            &paths.tokenizer,
            &paths.weights,
            options,
        )
    }

    /// Load from the cache, downloading if needed.
    pub fn load(cache: &ModelCache, options: EmbedderOptions) -> Result<Self, EmbeddingError> {
        let paths = cache.get_or_download()?;
        Self::load_from_paths(
            cache.repo_id.clone(),
            &paths.config,
            &paths.tokenizer,
            &paths.weights,
            options,
        )
    }

    /// Load according to settings: `model_dir` if set, otherwise the
    /// default cache for `repo_id`.
    pub fn from_settings(
        settings: &EmbeddingSettings,
        model_dir: Option<&Path>,
    ) -> Result<Self, EmbeddingError> {
        let options = EmbedderOptions::from_settings(settings)?;
        match model_dir {
            Some(dir) => Self::from_folder(dir, options),
            None => {
                let cache = ModelCache {
                    repo_id: settings.repo_id.clone(),
                    ..ModelCache::default()
                };
                Self::load(&cache, options)
            }
        }
    }

    /// Load from explicit file paths
    pub fn load_from_paths(
        name: String,
        config_path: &Path,
        tokenizer_path: &Path,
        weights_path: &Path,
        options: EmbedderOptions,
    ) -> Result<Self, EmbeddingError> {
        options.validate()?;
        info!(model = %name, "Loading embedding model...");

        let device = Device::Cpu;

        let config_str = std::fs::read_to_string(config_path)?;
        let config: BertConfig = serde_json::from_str(&config_str)
            .map_err(|e| EmbeddingError::ModelNotFound(format!("Invalid config: {}", e)))?;
        let limits = ConfigLimits::parse(&config_str)?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path.to_path_buf()], DType::F32, &device)?
        };

        let model = BertModel::load(vb, &config)?;

        let max_sequence_length = options.max_length.min(limits.max_position_embeddings);

        info!(
            dim = limits.hidden_size,
            max_seq = max_sequence_length,
            pooling = ?options.pooling,
            "Model loaded successfully"
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            info: ModelInfo {
                name,
                dimension: limits.hidden_size,
                max_sequence_length,
            },
            options,
        })
    }

    pub fn options(&self) -> &EmbedderOptions {
        &self.options
    }

    fn embed_chunk(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.info.max_sequence_length);

        let mut input_ids: Vec<u32> = Vec::with_capacity(texts.len() * max_len);
        let mut attention_mask: Vec<u32> = Vec::with_capacity(texts.len() * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();

            let truncated_len = ids.len().min(max_len);
            let mut padded_ids = ids[..truncated_len].to_vec();
            let mut padded_mask = mask[..truncated_len].to_vec();
            padded_ids.resize(max_len, 0);
            padded_mask.resize(max_len, 0);

            input_ids.extend(padded_ids);
            attention_mask.extend(padded_mask);
        }

        let shape = (texts.len(), max_len);
        let input_ids = Tensor::from_vec(input_ids, shape, &self.device)?;
        let attention_mask = Tensor::from_vec(attention_mask, shape, &self.device)?;
        let token_type_ids = Tensor::zeros_like(&input_ids)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = match self.options.pooling {
            Pooling::Cls => output.i((.., 0))?.contiguous()?,
            Pooling::Mean => mean_pooling(&output, &attention_mask)?,
        };

        let pooled_vec: Vec<Vec<f32>> = pooled.to_vec2()?;
        let embeddings = pooled_vec
            .into_iter()
            .map(|values| {
                if self.options.normalize {
                    Embedding::new(values)
                } else {
                    Embedding::unnormalized(values)
                }
            })
            .collect();

        Ok(embeddings)
    }
}

impl EmbeddingModel for CandleEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidInput("model returned no embedding".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!(count = texts.len(), batch_size = self.options.batch_size, "Embedding batch");

        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.options.batch_size) {
            embeddings.extend(self.embed_chunk(chunk)?);
        }

        if let Some(first) = embeddings.first() {
            if first.dimension() != self.info.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.info.dimension,
                    actual: first.dimension(),
                });
            }
        }

        debug!(count = embeddings.len(), dim = self.info.dimension, "Batch complete");
        Ok(embeddings)
    }

    fn text_instruction(&self) -> Option<&str> {
        self.options.text_instruction.as_deref()
    }

    fn query_instruction(&self) -> Option<&str> {
        self.options.query_instruction.as_deref()
    }
}

/// Mean pooling over token embeddings (excluding padding)
fn mean_pooling(embeddings: &Tensor, attention_mask: &Tensor) -> Result<Tensor, EmbeddingError> {
    let mask = attention_mask
        .unsqueeze(2)?
        .broadcast_as(embeddings.shape())?;
    let mask_f32 = mask.to_dtype(DType::F32)?;

    let masked = embeddings.broadcast_mul(&mask_f32)?;
    let sum = masked.sum(1)?;

    let mask_sum = mask_f32.sum(1)?;
    let mask_sum = mask_sum.clamp(1e-9, f64::MAX)?;

    Ok(sum.broadcast_div(&mask_sum)?)
}

/// Sizes read from config.json alongside the typed BERT config.
#[derive(Debug, serde::Deserialize)]
struct ConfigLimits {
    hidden_size: usize,
    #[serde(default = "default_position_limit")]
    max_position_embeddings: usize,
}

fn default_position_limit() -> usize {
    DEFAULT_MAX_LENGTH
}

impl ConfigLimits {
    fn parse(config_str: &str) -> Result<Self, EmbeddingError> {
        serde_json::from_str(config_str)
            .map_err(|e| EmbeddingError::ModelNotFound(format!("Invalid config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_and_save_model;
    use nas_types::DEFAULT_EMBEDDING_REPO;

    #[test]
    fn test_options_defaults() {
        let options = EmbedderOptions::default();
        assert_eq!(options.pooling, Pooling::Cls);
        assert!(options.normalize);
        assert_eq!(options.max_length, 512);
        assert_eq!(options.batch_size, 10);
    }

    #[test]
    fn test_options_from_settings() {
        let settings = EmbeddingSettings {
            pooling: "mean".to_string(),
            normalize: false,
            query_instruction: Some("Represent this sentence: ".to_string()),
            ..Default::default()
        };
        let options = EmbedderOptions::from_settings(&settings).unwrap();
        assert_eq!(options.pooling, Pooling::Mean);
        assert!(!options.normalize);
        assert_eq!(
            options.query_instruction.as_deref(),
            Some("Represent this sentence: ")
        );
    }

    #[test]
    fn test_options_reject_bad_pooling() {
        let settings = EmbeddingSettings {
            pooling: "max".to_string(),
            ..Default::default()
        };
        assert!(EmbedderOptions::from_settings(&settings).is_err());
    }

    #[test]
    fn test_options_reject_zero_batch() {
        let options = EmbedderOptions {
            batch_size: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_config_limits_parse() {
        let limits =
            ConfigLimits::parse(r#"{"hidden_size": 384, "max_position_embeddings": 512}"#)
                .unwrap();
        assert_eq!(limits.hidden_size, 384);
        assert_eq!(limits.max_position_embeddings, 512);

        let limits = ConfigLimits::parse(r#"{"hidden_size": 768}"#).unwrap();
        assert_eq!(limits.max_position_embeddings, DEFAULT_MAX_LENGTH);
    }

    #[test]
    fn test_from_folder_missing_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = CandleEmbedder::from_folder(temp.path(), EmbedderOptions::default());
        assert!(matches!(result, Err(EmbeddingError::ModelNotFound(_))));
    }

    fn saved_default_model() -> (tempfile::TempDir, CandleEmbedder) {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("models").join("bge");
        create_and_save_model(DEFAULT_EMBEDDING_REPO, &dir).unwrap();
        let embedder = CandleEmbedder::from_folder(&dir, EmbedderOptions::default()).unwrap();
        (temp, embedder)
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_text_embedding_matches_reference() {
        let (_temp, embedder) = saved_default_model();
        let embedding = embedder.get_text_embedding("Hello World!").unwrap();

        assert_eq!(embedding.len(), 384);
        let reference = [
            -0.003_275_696_7_f32,
            -0.011_690_77,
            0.041_559_17,
            -0.038_148_1,
            0.024_183_035,
        ];
        for (actual, expected) in embedding.iter().zip(reference.iter()) {
            assert!((actual - expected).abs() < 1e-4, "{actual} vs {expected}");
        }
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_embed_batch_spans_chunks() {
        let (_temp, embedder) = saved_default_model();
        let texts: Vec<String> = (0..23).map(|i| format!("document {}", i)).collect();
        let vectors = embedder.get_text_embedding_batch(&texts).unwrap();
        assert_eq!(vectors.len(), 23);
        assert!(vectors.iter().all(|v| v.len() == 384));
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_similar_texts_high_similarity() {
        let (_temp, embedder) = saved_default_model();
        let emb1 = embedder.embed("The cat sat on the mat").unwrap();
        let emb2 = embedder.embed("A cat is sitting on a mat").unwrap();
        let emb3 = embedder.embed("Python programming language").unwrap();

        assert!(emb1.cosine_similarity(&emb2) > emb1.cosine_similarity(&emb3));
    }
}
