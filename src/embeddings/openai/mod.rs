
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::EmbeddingConfig;
use crate::embeddings::http::{
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_TIMEOUT_SECONDS, build_agent, request_with_retry,
};
use crate::embeddings::{EmbeddingProvider, check_batch};
use crate::{IndexerError, Result};

/// Hosted OpenAI-compatible embeddings backend.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    endpoint: Url,
    api_key: String,
    model: String,
    dimension: usize,
    batch_size: usize,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            IndexerError::Config(
                "OpenAI API key missing: set embedding.api_key or OPENAI_API_KEY".to_string(),
            )
        })?;

        let base = config
            .endpoint_url()
            .map_err(|e| IndexerError::Config(e.to_string()))?;
        let endpoint = Url::parse(&format!(
            "{}/embeddings",
            base.as_str().trim_end_matches('/')
        ))
        .map_err(|e| IndexerError::Config(format!("Failed to build embeddings URL: {e}")))?;

        let agent = build_agent(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));

        Ok(Self {
            endpoint,
            api_key,
            model: config.model.clone(),
            dimension: config.dimension,
            batch_size: config.batch_size as usize,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }
}

impl EmbeddingProvider for OpenAiClient {
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() > self.batch_size {
            return Err(IndexerError::PermanentProvider(format!(
                "batch of {} exceeds configured max {}",
                texts.len(),
                self.batch_size
            )));
        }

        debug!("Requesting {} embeddings from OpenAI", texts.len());

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| IndexerError::PermanentProvider(format!("Bad request body: {e}")))?;

        let auth = format!("Bearer {}", self.api_key);
        let response_text = request_with_retry(self.retry_attempts, || {
            self.agent
                .post(self.endpoint.as_str())
                .header("Authorization", &auth)
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let mut parsed: EmbeddingResponse = serde_json::from_str(&response_text)
            .map_err(|e| IndexerError::PermanentProvider(format!("Bad embed response: {e}")))?;

        // The API may return entries out of order; the index field restores
        // input ordering.
        parsed.data.sort_by_key(|entry| entry.index);
        let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|entry| entry.embedding).collect();

        check_batch(&vectors, texts.len(), self.dimension)?;

        Ok(vectors)
    }

    #[inline]
    fn model_id(&self) -> &str {
        &self.model
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn max_batch_size(&self) -> usize {
        self.batch_size
    }
}
