//! # nas-embeddings
//!
//! Local embedding generation for documents loaded from NAS shares.
//!
//! ## Features
//! - Local inference via Candle on CPU
//! - BAAI/bge-small-en-v1.5 by default (384 dimensions, CLS pooling)
//! - Model folders saved once from HuggingFace Hub, then loaded offline
//! - Optional query and document instruction prefixes

pub mod cache;
pub mod candle;
pub mod error;
pub mod model;

pub use crate::candle::{CandleEmbedder, EmbedderOptions, DEFAULT_BATCH_SIZE, DEFAULT_MAX_LENGTH};
pub use cache::{create_and_save_model, model_paths, ModelCache, ModelPaths, MODEL_FILES};
pub use error::EmbeddingError;
pub use model::{Embedding, EmbeddingModel, ModelInfo, Pooling};
