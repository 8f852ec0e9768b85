use crate::utils;
use anyhow::Result;

/// Trait for embedding providers that can compute semantic vectors from text
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Compute embedding vector from text content
    async fn compute_embedding(&self, content: &str) -> Result<Vec<f32>>;

    /// Get the dimension of embeddings produced by this provider
    fn dimension(&self) -> usize;

    /// Model identifier, used in logs and summaries
    fn model_name(&self) -> &str;

    /// Compute the embedding of at most `max_chars` leading characters of `content`
    ///
    /// Embedding services reject inputs over their context length, so long
    /// documents are represented by their beginning only. Leading whitespace
    /// does not count towards the limit.
    async fn compute_truncated_embedding(&self, content: &str, max_chars: usize) -> Result<Vec<f32>> {
        let content = content.trim_start();
        let truncated = utils::truncate_chars(content, max_chars);
        if truncated.len() < content.len() {
            tracing::debug!(
                kept_chars = max_chars,
                model = self.model_name(),
                "input truncated before embedding"
            );
        }
        self.compute_embedding(truncated).await
    }
}
