use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::{Chunk, Document};
use crate::providers::EmbeddingProvider;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// All embedded chunks of one document, searchable by similarity. The
/// identity of the embedding function that produced the vectors travels
/// with the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    pub fingerprint: String,
    pub embedder: String,
    pub dimensions: usize,
    pub entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds one index per document, optionally persisted to disk keyed by the
/// document fingerprint so re-uploading unchanged content skips embedding.
pub struct Indexer {
    persist_dir: Option<PathBuf>,
}

impl Indexer {
    pub fn new(persist_dir: Option<PathBuf>) -> Self {
        Self { persist_dir }
    }

    /// Loads the persisted index for this document if one exists, otherwise
    /// embeds every chunk and builds a fresh one. A single embedding failure
    /// fails the whole build: a partial index would retrieve from an
    /// incomplete document with no signal to the caller.
    pub async fn build(
        &self,
        document: &Document,
        chunks: &[Chunk],
        embedder: &dyn EmbeddingProvider,
    ) -> Result<VectorIndex> {
        if let Some(index) = self.load_persisted(&document.fingerprint, embedder)? {
            log::info!(
                "reusing persisted index for {} ({} entries)",
                document.filename,
                index.len()
            );
            return Ok(index);
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = embedder.embed(&chunk.text).await.map_err(|e| {
                Error::Index(format!(
                    "embedding failed for chunk {}: {}",
                    chunk.sequence_index, e
                ))
            })?;
            entries.push(IndexEntry {
                chunk: chunk.clone(),
                embedding,
            });
        }

        let index = VectorIndex {
            fingerprint: document.fingerprint.clone(),
            embedder: embedder.identity(),
            dimensions: embedder.dimensions(),
            entries,
        };
        log::info!("indexed {} chunks for {}", index.len(), document.filename);

        if let Some(dir) = &self.persist_dir {
            self.persist(dir, &index)?;
        }

        Ok(index)
    }

    fn index_path(dir: &Path, fingerprint: &str) -> PathBuf {
        dir.join(format!("{}.json", fingerprint))
    }

    fn load_persisted(
        &self,
        fingerprint: &str,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Option<VectorIndex>> {
        let dir = match &self.persist_dir {
            Some(dir) => dir,
            None => return Ok(None),
        };
        let path = Self::index_path(dir, fingerprint);
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&path)?;
        let index: VectorIndex = serde_json::from_str(&data)?;
        if index.embedder != embedder.identity() {
            log::warn!(
                "persisted index at {} was built with {}, active embedder is {}; rebuilding",
                path.display(),
                index.embedder,
                embedder.identity()
            );
            return Ok(None);
        }
        Ok(Some(index))
    }

    fn persist(&self, dir: &Path, index: &VectorIndex) -> Result<()> {
        fs::create_dir_all(dir)?;
        let path = Self::index_path(dir, &index.fingerprint);
        fs::write(&path, serde_json::to_string(index)?)?;
        log::info!("persisted index to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
        fail_at: Option<usize>,
        identity: String,
    }

    impl CountingEmbedder {
        fn new(identity: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_at: None,
                identity: identity.to_string(),
            }
        }

        fn failing_at(call: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_at: Some(call),
                identity: "counting".to_string(),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_at == Some(call) {
                return Err(Error::Provider("simulated quota failure".to_string()));
            }
            Ok(vec![text.len() as f32, 1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn identity(&self) -> String {
            self.identity.clone()
        }
    }

    fn document(fingerprint: &str) -> Document {
        Document {
            id: "d".to_string(),
            filename: "policy.pdf".to_string(),
            pages: vec!["text".to_string()],
            text: "text".to_string(),
            page_offsets: vec![0],
            fingerprint: fingerprint.to_string(),
        }
    }

    fn chunk(seq: usize, text: &str) -> Chunk {
        Chunk {
            id: format!("c{}", seq),
            text: text.to_string(),
            source_page: 1,
            sequence_index: seq,
            start_position: 0,
            end_position: text.len(),
        }
    }

    #[tokio::test]
    async fn one_embedding_failure_fails_the_whole_build() {
        let indexer = Indexer::new(None);
        let chunks = vec![chunk(0, "one"), chunk(1, "two"), chunk(2, "three")];
        let embedder = CountingEmbedder::failing_at(1);

        let err = indexer
            .build(&document("fp"), &chunks, &embedder)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "index");
        assert!(err.to_string().contains("chunk 1"));
    }

    #[tokio::test]
    async fn persisted_index_is_reused_for_the_same_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let indexer = Indexer::new(Some(dir.path().to_path_buf()));
        let chunks = vec![chunk(0, "alpha"), chunk(1, "beta")];
        let embedder = CountingEmbedder::new("counting");

        let first = indexer
            .build(&document("same"), &chunks, &embedder)
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);

        let second = indexer
            .build(&document("same"), &chunks, &embedder)
            .await
            .unwrap();
        assert_eq!(second.len(), 2);
        // no further embedding calls: the persisted index was loaded
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
        assert_eq!(second.embedder, "counting");
    }

    #[tokio::test]
    async fn embedder_change_invalidates_the_persisted_index() {
        let dir = tempfile::tempdir().unwrap();
        let indexer = Indexer::new(Some(dir.path().to_path_buf()));
        let chunks = vec![chunk(0, "alpha")];

        let old = CountingEmbedder::new("model-a");
        indexer
            .build(&document("same"), &chunks, &old)
            .await
            .unwrap();

        let new = CountingEmbedder::new("model-b");
        let rebuilt = indexer
            .build(&document("same"), &chunks, &new)
            .await
            .unwrap();
        assert_eq!(rebuilt.embedder, "model-b");
        assert_eq!(new.calls.load(Ordering::SeqCst), 1);
    }
}
