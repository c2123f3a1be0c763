//! Embedding model trait and types.
//!
//! Defines the interface for generating vector embeddings from text.

use std::str::FromStr;

use crate::error::EmbeddingError;

/// Vector embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// The embedding vector
    pub values: Vec<f32>,
}

impl Embedding {
    /// Create a new embedding from a vector.
    /// Normalizes the vector to unit length.
    pub fn new(values: Vec<f32>) -> Self {
        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        let normalized = if norm > 0.0 {
            values.iter().map(|x| x / norm).collect()
        } else {
            values
        };
        Self { values: normalized }
    }

    /// Create embedding without normalization
    pub fn unnormalized(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Compute cosine similarity with another embedding.
    /// Returns value in [-1, 1] range (1 = identical).
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }
        let dot: f32 = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum();
        let norm_a: f32 = self.values.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = other.values.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }
}

/// How token vectors are reduced to one sentence vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pooling {
    /// Hidden state of the first ([CLS]) token. BGE models expect this.
    #[default]
    Cls,
    /// Mean of non-padding token states (sentence-transformers convention)
    Mean,
}

impl FromStr for Pooling {
    type Err = EmbeddingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cls" => Ok(Pooling::Cls),
            "mean" => Ok(Pooling::Mean),
            other => Err(EmbeddingError::InvalidInput(format!(
                "unknown pooling '{}', expected 'cls' or 'mean'",
                other
            ))),
        }
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name (e.g., "bge-small-en-v1.5")
    pub name: String,
    /// Embedding dimension
    pub dimension: usize,
    /// Maximum sequence length in tokens
    pub max_sequence_length: usize,
}

/// Trait for embedding models.
///
/// Implementations must be thread-safe (Send + Sync) for concurrent use.
pub trait EmbeddingModel: Send + Sync {
    /// Get model information
    fn info(&self) -> &ModelInfo;

    /// Generate embedding for a single text.
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Generate embeddings for multiple texts (batch).
    /// Default implementation calls embed() for each text.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Prefix prepended to documents before embedding.
    fn text_instruction(&self) -> Option<&str> {
        None
    }

    /// Prefix prepended to queries before embedding.
    fn query_instruction(&self) -> Option<&str> {
        None
    }

    /// Embed a document text.
    fn get_text_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let input = with_instruction(self.text_instruction(), text);
        Ok(self.embed(&input)?.values)
    }

    /// Embed a search query.
    fn get_query_embedding(&self, query: &str) -> Result<Vec<f32>, EmbeddingError> {
        let input = with_instruction(self.query_instruction(), query);
        Ok(self.embed(&input)?.values)
    }

    /// Embed several document texts.
    fn get_text_embedding_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let inputs: Vec<String> = texts
            .iter()
            .map(|text| with_instruction(self.text_instruction(), text))
            .collect();
        let refs: Vec<&str> = inputs.iter().map(|s| s.as_str()).collect();
        Ok(self
            .embed_batch(&refs)?
            .into_iter()
            .map(|embedding| embedding.values)
            .collect())
    }
}

fn with_instruction(instruction: Option<&str>, text: &str) -> String {
    match instruction {
        Some(prefix) => format!("{}{}", prefix, text),
        None => text.to_string(),
    }
}
