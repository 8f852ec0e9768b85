use crate::constants::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_DIMS, DEFAULT_OPENAI_MODEL};
use crate::embeddings::EmbeddingProvider;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Embedding provider for the OpenAI `/embeddings` API and compatible servers
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    max_retries: u32,
    retry_base_delay: Duration,
    dimension: AtomicUsize,
}

impl OpenAiEmbeddingProvider {
    /// Create a new provider. `base_url` defaults to the public OpenAI API
    pub fn new(
        base_url: Option<&str>,
        model: Option<&str>,
        api_key: &str,
        dimension: Option<usize>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or(DEFAULT_OPENAI_MODEL).to_string(),
            api_key: api_key.to_string(),
            max_retries,
            retry_base_delay: Duration::from_secs(1),
            dimension: AtomicUsize::new(dimension.unwrap_or(DEFAULT_OPENAI_DIMS)),
        })
    }

    /// Override the first backoff delay (doubles on every retry)
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_base_delay * (1u32 << (attempt - 1).min(5))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn compute_embedding(&self, content: &str) -> Result<Vec<f32>> {
        let content = content.trim();
        if content.is_empty() {
            anyhow::bail!("Cannot generate embedding for empty content");
        }

        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.model,
            input: content,
        };

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying embedding request");
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(attempt, error = %e, "embedding request failed");
                    last_err = Some(anyhow::Error::new(e).context("Failed to reach embedding API"));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                let parsed: EmbeddingResponse = response
                    .json()
                    .await
                    .context("Failed to parse embedding response")?;

                let embedding = parsed
                    .data
                    .into_iter()
                    .next()
                    .map(|d| d.embedding)
                    .context("Embedding API returned no data")?;

                if embedding.is_empty() {
                    anyhow::bail!("Embedding API returned an empty vector");
                }

                let expected = self.dimension.load(Ordering::Relaxed);
                if embedding.len() != expected {
                    debug!(
                        model = %self.model,
                        actual = embedding.len(),
                        expected,
                        "updating embedding dimension to match the model"
                    );
                    self.dimension.store(embedding.len(), Ordering::Relaxed);
                }

                return Ok(embedding);
            }

            let body = response.text().await.unwrap_or_default();

            // Rate limited or server error: retry
            if status.as_u16() == 429 || status.is_server_error() {
                warn!(attempt, %status, "embedding API asked to retry");
                last_err = Some(anyhow::anyhow!("Embedding API error {}: {}", status, body));
                continue;
            }

            anyhow::bail!("Embedding API error {}: {}", status, body);
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Embedding failed after retries")))
    }

    fn dimension(&self) -> usize {
        self.dimension.load(Ordering::Relaxed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
