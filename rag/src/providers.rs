use async_trait::async_trait;

use crate::error::Result;

/// Text embedding backend. Implementations wrap a hosted service; the
/// pipeline never assumes anything about the vectors beyond a fixed
/// dimension per provider.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize;

    /// Stable identity of the embedding function. Stored with every index
    /// so a query can never be compared against vectors produced by a
    /// different function.
    fn identity(&self) -> String;
}

/// Chat completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    fn identity(&self) -> String;
}
