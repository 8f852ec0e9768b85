pub mod ollama;
pub mod openai;
pub mod r#trait;

pub use ollama::OllamaEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;
pub use r#trait::EmbeddingProvider;

use crate::config::Config;
use crate::constants::API_KEY_ENV;
use anyhow::Result;
use std::time::Duration;

/// Build the embedding provider selected in `[embedding].provider`
pub fn provider_from_config(config: &Config) -> Result<Box<dyn EmbeddingProvider>> {
    let embedding = &config.embedding;
    let timeout = Duration::from_secs(embedding.timeout_secs);

    match embedding.provider.as_str() {
        "openai" => {
            let api_key = config.embedding_api_key().ok_or_else(|| {
                anyhow::anyhow!("No embedding API key: set [embedding].api_key or {}", API_KEY_ENV)
            })?;
            Ok(Box::new(OpenAiEmbeddingProvider::new(
                embedding.url.as_deref(),
                embedding.model.as_deref(),
                &api_key,
                embedding.dims,
                timeout,
                embedding.max_retries,
            )?))
        }
        "ollama" => Ok(Box::new(OllamaEmbeddingProvider::new(
            embedding.url.as_deref(),
            embedding.model.as_deref(),
            embedding.dims,
            timeout,
        )?)),
        other => anyhow::bail!("Unknown embedding provider '{}' (expected openai or ollama)", other),
    }
}
