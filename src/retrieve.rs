//! Context retrieval for the prompt's `{rag_context}` slot.
//!
//! The retriever owns a [`DocumentIndexer`] and keeps the most recently
//! loaded [`VectorIndex`] in memory. The document digest is recomputed on
//! every query; the cached index is reused only while it still matches.

use crate::config::Config;
use crate::embedding;
use crate::error::RetrievalError;
use crate::index::{DocumentIndexer, IndexState, VectorIndex};

pub struct ContextRetriever {
    indexer: DocumentIndexer,
    top_k: usize,
    cached: Option<VectorIndex>,
}

impl ContextRetriever {
    pub fn new(config: &Config, indexer: DocumentIndexer) -> Self {
        Self {
            indexer,
            top_k: config.retrieval.top_k,
            cached: None,
        }
    }

    pub fn indexer(&self) -> &DocumentIndexer {
        &self.indexer
    }

    /// Text returned in place of context when retrieval fails.
    pub fn fallback_message(&self) -> String {
        format!(
            "No relevant agricultural knowledge found. Please add PDF documents to '{}/'.",
            self.indexer.documents_dir().display()
        )
    }

    /// Top-k context for `query`, or the fallback message. Never fails.
    pub async fn retrieve_context(&mut self, query: &str) -> String {
        let k = self.top_k;
        match self.try_retrieve(query, k).await {
            Ok(context) => context,
            Err(e) => {
                tracing::error!("retrieval failed: {}", e);
                self.fallback_message()
            }
        }
    }

    /// Embed `query` and join the `k` most similar chunks with blank lines.
    pub async fn try_retrieve(&mut self, query: &str, k: usize) -> Result<String, RetrievalError> {
        self.refresh_index().await?;
        let index = self.cached.as_ref().ok_or(RetrievalError::Unavailable)?;
        let vector = embedding::embed_query(self.indexer.provider(), query)
            .await
            .map_err(RetrievalError::QueryEmbedding)?;

        let hits = index.search(&vector, k);
        tracing::debug!(hits = hits.len(), k, "retrieved chunks");
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        Ok(texts.join("\n\n"))
    }

    /// Make `cached` hold an index matching the documents on disk.
    async fn refresh_index(&mut self) -> Result<(), RetrievalError> {
        let manifest = self.indexer.manifest()?;
        if matches!(&self.cached, Some(index) if index.digest == manifest.digest) {
            return Ok(());
        }

        self.cached = None;
        match self.indexer.build_or_load_for(manifest, false).await? {
            IndexState::Ready { index, origin } => {
                tracing::debug!(?origin, chunks = index.len(), "vector index ready");
                self.cached = Some(index);
                Ok(())
            }
            IndexState::Unavailable => Err(RetrievalError::Unavailable),
        }
    }
}
