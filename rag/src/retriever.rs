use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::models::ScoredChunk;
use crate::providers::EmbeddingProvider;

/// Returns the `k` index entries most similar to the query, best first.
/// `k` larger than the index is clamped, ties keep original chunk order,
/// and the query must be embedded by the same function as the index.
pub async fn retrieve(
    index: &VectorIndex,
    query_text: &str,
    k: usize,
    embedder: &dyn EmbeddingProvider,
) -> Result<Vec<ScoredChunk>> {
    if embedder.identity() != index.embedder {
        return Err(Error::Configuration(format!(
            "index was built with embedder {} but the query uses {}",
            index.embedder,
            embedder.identity()
        )));
    }

    let query_embedding = embedder.embed(query_text).await?;

    let mut scored: Vec<ScoredChunk> = index
        .entries
        .iter()
        .map(|entry| ScoredChunk {
            chunk: entry.chunk.clone(),
            similarity: cosine_similarity(&query_embedding, &entry.embedding),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.chunk.sequence_index.cmp(&b.chunk.sequence_index))
    });
    scored.truncate(k);

    log::info!("retrieved {} chunks for query", scored.len());
    Ok(scored)
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let min_len = a.len().min(b.len());

    let dot: f32 = a[..min_len]
        .iter()
        .zip(b[..min_len].iter())
        .map(|(x, y)| x * y)
        .sum();

    let norm_a: f32 = a[..min_len].iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b[..min_len].iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
