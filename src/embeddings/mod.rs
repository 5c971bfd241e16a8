// Embeddings module
// Provider capability over pluggable backends, plus content chunking

pub mod chunking;
pub mod gemini;
mod http;
pub mod ollama;
pub mod openai;

pub use chunking::{Chunk, ChunkingConfig, chunk_text};
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use crate::config::{EmbeddingConfig, ProviderKind};
use crate::{IndexerError, Result};

/// Capability interface over embedding backends.
///
/// Implementations guarantee that output ordering matches input ordering
/// and that every vector has the configured dimensionality. Transient
/// failures (rate limits, timeouts) are retried internally with backoff and
/// surface as `IndexerError::TransientProvider` once retries are exhausted;
/// permanent failures (auth, malformed request) surface immediately as
/// `IndexerError::PermanentProvider`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds one batch of texts.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Identifier of the underlying model, e.g. `text-embedding-004`.
    fn model_id(&self) -> &str;

    /// Fixed output dimensionality for the configured model.
    fn dimension(&self) -> usize;

    /// Maximum batch size accepted per request.
    fn max_batch_size(&self) -> usize;
}

/// Builds the configured provider backend.
///
/// Selection happens once at startup; the rest of the pipeline only sees
/// the `EmbeddingProvider` capability.
#[inline]
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider {
        ProviderKind::Ollama => Ok(Box::new(OllamaClient::new(config)?)),
        ProviderKind::OpenAi => Ok(Box::new(OpenAiClient::new(config)?)),
        ProviderKind::Gemini => Ok(Box::new(GeminiClient::new(config)?)),
    }
}

/// Normalizes a model identifier into a valid named-vector key.
///
/// Non-alphanumeric characters become underscores, so e.g.
/// `text-embedding-004` is stored under `text_embedding_004`.
#[inline]
pub fn vector_name(model_id: &str) -> String {
    model_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Validates a response batch: one vector per input, all with the expected
/// dimensionality.
pub(crate) fn check_batch(
    vectors: &[Vec<f32>],
    expected_len: usize,
    dimension: usize,
) -> Result<()> {
    if vectors.len() != expected_len {
        return Err(IndexerError::PermanentProvider(format!(
            "provider returned {} embeddings for {} inputs",
            vectors.len(),
            expected_len
        )));
    }
    for vector in vectors {
        if vector.len() != dimension {
            return Err(IndexerError::DimensionMismatch {
                got: vector.len(),
                want: dimension,
            });
        }
    }
    Ok(())
}
