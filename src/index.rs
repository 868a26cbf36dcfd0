//! Document indexer: content-hash gated build-or-load of the vector index.
//!
//! The manifest is a single SHA-256 digest over the bytes of every source
//! PDF in sorted path order, stored as one hex line in
//! `<index_dir>/.doc_hash`. When the stored digest matches the documents on
//! disk, the persisted `<index_dir>/index.sqlite` is loaded as-is and no
//! text is re-embedded. Any byte change in any PDF (or an added/removed
//! file) changes the digest and forces a rebuild.
//!
//! ```text
//! scan PDFs ──▶ digest ──▶ matches .doc_hash? ──yes──▶ load index.sqlite
//!                                 │ no / load failed
//!                                 ▼
//!             extract ─▶ chunk ─▶ embed ─▶ write index.sqlite ─▶ write .doc_hash
//! ```

use anyhow::Context;
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::chunk::chunk_text;
use crate::config::{ChunkingConfig, Config, DocumentsConfig};
use crate::db;
use crate::documents::{digest_files, scan_documents, SourceFile};
use crate::embedding::{self, EmbeddingProvider};
use crate::error::IndexError;
use crate::extract::{PdfExtractor, TextExtractor};
use crate::models::{Chunk, SourceDocument};
use crate::progress::{IndexProgressEvent, IndexProgressReporter, NoProgress};

const INDEX_FILE: &str = "index.sqlite";
const MANIFEST_FILE: &str = ".doc_hash";

/// The current set of source files and their combined digest.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub files: Vec<SourceFile>,
    pub digest: String,
}

/// A chunk together with its embedding.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A search hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f32,
}

/// An in-memory vector index, loaded from or about to be written to disk.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    pub digest: String,
    pub model: String,
    pub dims: usize,
    entries: Vec<IndexedChunk>,
}

impl VectorIndex {
    pub fn new(digest: String, model: String, dims: usize, entries: Vec<IndexedChunk>) -> Self {
        Self {
            digest,
            model,
            dims,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexedChunk] {
        &self.entries
    }

    /// Top-`k` chunks by cosine similarity, best first. Ties keep index order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk<'_>> {
        let mut hits: Vec<ScoredChunk<'_>> = self
            .entries
            .iter()
            .map(|e| ScoredChunk {
                chunk: &e.chunk,
                score: embedding::cosine_similarity(query, &e.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        hits
    }
}

/// How a ready index was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    /// Loaded from disk; nothing was re-embedded.
    Loaded,
    /// Built from the source documents.
    Built,
}

/// Result of [`DocumentIndexer::build_or_load_index`].
#[derive(Debug)]
pub enum IndexState {
    Ready {
        index: VectorIndex,
        origin: IndexOrigin,
    },
    /// No documents (or no extractable text) to index.
    Unavailable,
}

pub struct DocumentIndexer {
    documents: DocumentsConfig,
    chunking: ChunkingConfig,
    batch_size: usize,
    provider: Arc<dyn EmbeddingProvider>,
    extractor: Arc<dyn TextExtractor>,
    progress: Box<dyn IndexProgressReporter>,
}

impl DocumentIndexer {
    pub fn new(config: &Config, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            documents: config.documents.clone(),
            chunking: config.chunking.clone(),
            batch_size: config.embedding.batch_size.max(1),
            provider,
            extractor: Arc::new(PdfExtractor),
            progress: Box::new(NoProgress),
        }
    }

    /// Replace the PDF extractor (tests feed plain-text fixtures through this).
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn IndexProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn documents_dir(&self) -> &Path {
        &self.documents.dir
    }

    pub fn provider(&self) -> &dyn EmbeddingProvider {
        self.provider.as_ref()
    }

    pub fn index_path(&self) -> PathBuf {
        self.documents.index_dir.join(INDEX_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.documents.index_dir.join(MANIFEST_FILE)
    }

    /// Scan the documents directory and digest its PDFs.
    pub fn manifest(&self) -> Result<Manifest, IndexError> {
        let files = scan_documents(&self.documents)?;
        let digest = digest_files(&files)?;
        Ok(Manifest { files, digest })
    }

    /// The digest recorded by the last successful build, if any.
    pub fn stored_digest(&self) -> Option<String> {
        std::fs::read_to_string(self.manifest_path())
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Load the persisted index when its digest matches, otherwise rebuild.
    pub async fn build_or_load_index(&self) -> Result<IndexState, IndexError> {
        let manifest = self.manifest()?;
        self.build_or_load_for(manifest, false).await
    }

    /// Rebuild unconditionally, ignoring the stored digest.
    pub async fn rebuild_index(&self) -> Result<IndexState, IndexError> {
        let manifest = self.manifest()?;
        self.build_or_load_for(manifest, true).await
    }

    pub async fn build_or_load_for(
        &self,
        manifest: Manifest,
        force: bool,
    ) -> Result<IndexState, IndexError> {
        if manifest.files.is_empty() {
            tracing::error!(
                dir = %self.documents.dir.display(),
                "no PDF documents found, cannot build vector index"
            );
            return Ok(IndexState::Unavailable);
        }

        if !force {
            if let Some(previous) = self.stored_digest() {
                tracing::info!("checking existing vector index");
                if previous == manifest.digest && self.index_path().exists() {
                    tracing::info!(path = %self.index_path().display(), "loading existing vector index");
                    match self.load_persisted(&manifest.digest).await {
                        Ok(index) => {
                            return Ok(IndexState::Ready {
                                index,
                                origin: IndexOrigin::Loaded,
                            })
                        }
                        Err(e) => {
                            tracing::error!("{}", e);
                            tracing::info!("rebuilding vector index");
                        }
                    }
                }
            }
        }

        tracing::info!("rebuilding vector index due to document changes or load failure");
        self.build(manifest).await
    }

    /// Read `index.sqlite` into memory.
    ///
    /// Fails if the file is unreadable, empty, or was embedded with a
    /// different model than the current provider.
    pub async fn load_persisted(&self, digest: &str) -> Result<VectorIndex, IndexError> {
        let path = self.index_path();
        let index = read_index(&path, digest).await.map_err(IndexError::Load)?;

        if index.model != self.provider.model_name() {
            return Err(IndexError::Load(anyhow::anyhow!(
                "index was embedded with '{}' but the configured model is '{}'",
                index.model,
                self.provider.model_name()
            )));
        }
        if index.is_empty() {
            return Err(IndexError::Load(anyhow::anyhow!(
                "index at {} holds no chunks",
                path.display()
            )));
        }

        tracing::info!(chunks = index.len(), "loaded vector index");
        Ok(index)
    }

    async fn build(&self, manifest: Manifest) -> Result<IndexState, IndexError> {
        let documents = self.load_documents(&manifest.files).await;
        if documents.is_empty() {
            tracing::error!(
                dir = %self.documents.dir.display(),
                "no valid PDF documents found, cannot build vector index"
            );
            return Ok(IndexState::Unavailable);
        }
        tracing::info!(documents = documents.len(), "loaded documents for processing");

        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|doc| {
                chunk_text(
                    &doc.source,
                    &doc.text,
                    self.chunking.chunk_size,
                    self.chunking.chunk_overlap,
                )
            })
            .collect();
        tracing::info!(chunks = chunks.len(), "split documents into chunks");

        let vectors = self.embed_chunks(&chunks).await?;
        let dims = vectors.first().map(|v| v.len()).unwrap_or(0);
        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedChunk { chunk, vector })
            .collect();

        let index = VectorIndex::new(
            manifest.digest,
            self.provider.model_name().to_string(),
            dims,
            entries,
        );

        tracing::info!("saving vector index");
        self.persist(&index).await?;
        self.progress.report(IndexProgressEvent::Saved {
            chunks: index.len() as u64,
        });
        tracing::info!(path = %self.index_path().display(), "saved vector index");

        Ok(IndexState::Ready {
            index,
            origin: IndexOrigin::Built,
        })
    }

    /// Read and extract every file. Failures are logged and skipped.
    async fn load_documents(&self, files: &[SourceFile]) -> Vec<SourceDocument> {
        tracing::info!(dir = %self.documents.dir.display(), "loading PDF documents");
        let total = files.len() as u64;
        let mut documents = Vec::new();

        for (i, file) in files.iter().enumerate() {
            self.progress.report(IndexProgressEvent::Loading {
                source: file.relative.clone(),
                n: i as u64 + 1,
                total,
            });

            let bytes = match tokio::fs::read(&file.path).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!(file = %file.relative, "failed to read: {}", e);
                    continue;
                }
            };

            let extractor = Arc::clone(&self.extractor);
            let extracted =
                tokio::task::spawn_blocking(move || extractor.extract(&bytes)).await;
            let text = match extracted {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    tracing::error!(file = %file.relative, "failed to load: {}", e);
                    continue;
                }
                Err(e) => {
                    tracing::error!(file = %file.relative, "extraction task failed: {}", e);
                    continue;
                }
            };

            if text.trim().is_empty() {
                tracing::warn!(file = %file.relative, "no extractable text, skipping");
                continue;
            }

            tracing::info!(file = %file.relative, chars = text.chars().count(), "loaded document");
            documents.push(SourceDocument {
                source: file.relative.clone(),
                text,
            });
        }

        documents
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, IndexError> {
        tracing::info!(model = self.provider.model_name(), "embedding chunks");
        let total = chunks.len() as u64;
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let batch_vectors = self
                .provider
                .embed(&texts)
                .await
                .map_err(IndexError::Embedding)?;
            if batch_vectors.len() != batch.len() {
                return Err(IndexError::EmbeddingCount {
                    expected: batch.len(),
                    got: batch_vectors.len(),
                });
            }
            vectors.extend(batch_vectors);
            self.progress.report(IndexProgressEvent::Embedding {
                n: vectors.len() as u64,
                total,
            });
        }

        if let Some(first) = vectors.first() {
            let dims = first.len();
            if dims == 0 || vectors.iter().any(|v| v.len() != dims) {
                return Err(IndexError::Embedding(anyhow::anyhow!(
                    "embedding provider returned vectors of inconsistent dimensions"
                )));
            }
            if let Some(expected) = self.provider.dims() {
                if expected != dims {
                    return Err(IndexError::Embedding(anyhow::anyhow!(
                        "expected {}-dimensional embeddings, got {}",
                        expected,
                        dims
                    )));
                }
            }
        }

        Ok(vectors)
    }

    /// Write the index to a temporary file, swap it into place, then record
    /// the digest. The digest is only written once the index is on disk.
    async fn persist(&self, index: &VectorIndex) -> Result<(), IndexError> {
        let final_path = self.index_path();
        let tmp_path = self.documents.index_dir.join(format!("{}.tmp", INDEX_FILE));

        std::fs::create_dir_all(&self.documents.index_dir)
            .context("failed to create index directory")
            .map_err(IndexError::Persist)?;
        if tmp_path.exists() {
            std::fs::remove_file(&tmp_path)
                .context("failed to remove stale temporary index")
                .map_err(IndexError::Persist)?;
        }

        write_index(&tmp_path, index)
            .await
            .map_err(IndexError::Persist)?;

        std::fs::rename(&tmp_path, &final_path)
            .with_context(|| format!("failed to move index into {}", final_path.display()))
            .map_err(IndexError::Persist)?;

        std::fs::write(self.manifest_path(), &index.digest)
            .context("failed to write index digest")
            .map_err(IndexError::Persist)?;

        Ok(())
    }
}

async fn write_index(path: &Path, index: &VectorIndex) -> anyhow::Result<()> {
    let pool = db::connect(path).await?;
    db::create_schema(&pool).await?;

    let mut tx = pool.begin().await?;
    let meta = [
        ("digest", index.digest.clone()),
        ("model", index.model.clone()),
        ("dims", index.dims.to_string()),
        ("built_at", chrono::Utc::now().to_rfc3339()),
    ];
    for (key, value) in meta {
        sqlx::query("INSERT OR REPLACE INTO meta (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
    }

    for entry in index.entries() {
        let chunk = &entry.chunk;
        sqlx::query(
            r#"
            INSERT INTO chunks (id, source, chunk_index, text, hash, embedding)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.source)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(&chunk.hash)
        .bind(embedding::vec_to_blob(&entry.vector))
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    pool.close().await;
    Ok(())
}

async fn read_index(path: &Path, digest: &str) -> anyhow::Result<VectorIndex> {
    let pool = db::connect_read_only(path).await?;

    let meta_rows = sqlx::query("SELECT key, value FROM meta")
        .fetch_all(&pool)
        .await?;
    let mut model = None;
    let mut dims = None;
    let mut stored_digest = None;
    for row in &meta_rows {
        let key: String = row.try_get("key")?;
        let value: String = row.try_get("value")?;
        match key.as_str() {
            "model" => model = Some(value),
            "dims" => dims = Some(value.parse::<usize>()?),
            "digest" => stored_digest = Some(value),
            _ => {}
        }
    }

    let model = model.ok_or_else(|| anyhow::anyhow!("index metadata is missing the model"))?;
    let dims = dims.ok_or_else(|| anyhow::anyhow!("index metadata is missing dimensions"))?;
    if stored_digest.as_deref() != Some(digest) {
        anyhow::bail!("index digest does not match the documents on disk");
    }

    let rows = sqlx::query(
        "SELECT id, source, chunk_index, text, hash, embedding FROM chunks ORDER BY source, chunk_index",
    )
    .fetch_all(&pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in &rows {
        let blob: Vec<u8> = row.try_get("embedding")?;
        let vector = embedding::blob_to_vec(&blob);
        if vector.len() != dims {
            anyhow::bail!(
                "stored embedding has {} dimensions, expected {}",
                vector.len(),
                dims
            );
        }
        entries.push(IndexedChunk {
            chunk: Chunk {
                id: row.try_get("id")?,
                source: row.try_get("source")?,
                chunk_index: row.try_get("chunk_index")?,
                text: row.try_get("text")?,
                hash: row.try_get("hash")?,
            },
            vector,
        });
    }

    pool.close().await;
    Ok(VectorIndex::new(digest.to_string(), model, dims, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pdf_with_text, CountingProvider, Utf8Extractor};
    use std::fs;
    use tempfile::TempDir;

    fn indexer(root: &Path, provider: Arc<CountingProvider>) -> DocumentIndexer {
        let mut config = Config::minimal();
        config.documents.dir = root.join("docs");
        config.documents.index_dir = root.join("index");
        config.chunking.chunk_size = 80;
        config.chunking.chunk_overlap = 20;
        DocumentIndexer::new(&config, provider).with_extractor(Arc::new(Utf8Extractor))
    }

    fn write_docs(root: &Path) {
        let docs = root.join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(
            docs.join("irrigation.pdf"),
            "Drip irrigation saves water.\n\nWater early in the morning to limit evaporation.",
        )
        .unwrap();
        fs::write(
            docs.join("soil.pdf"),
            "Soil pH between 6.0 and 7.0 suits most vegetables.",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn unchanged_documents_are_not_reembedded() {
        let tmp = TempDir::new().unwrap();
        write_docs(tmp.path());
        let provider = Arc::new(CountingProvider::new());
        let indexer = indexer(tmp.path(), provider.clone());

        let first = indexer.build_or_load_index().await.unwrap();
        let built_calls = provider.texts_embedded();
        assert!(built_calls > 0);
        assert!(matches!(
            first,
            IndexState::Ready {
                origin: IndexOrigin::Built,
                ..
            }
        ));

        let second = indexer.build_or_load_index().await.unwrap();
        assert_eq!(provider.texts_embedded(), built_calls);
        match second {
            IndexState::Ready { index, origin } => {
                assert_eq!(origin, IndexOrigin::Loaded);
                assert!(!index.is_empty());
            }
            IndexState::Unavailable => panic!("expected a ready index"),
        }
    }

    #[tokio::test]
    async fn changing_one_byte_triggers_rebuild() {
        let tmp = TempDir::new().unwrap();
        write_docs(tmp.path());
        let provider = Arc::new(CountingProvider::new());
        let indexer = indexer(tmp.path(), provider.clone());

        indexer.build_or_load_index().await.unwrap();
        let before = provider.texts_embedded();
        let old_digest = indexer.stored_digest().unwrap();

        fs::write(
            tmp.path().join("docs/soil.pdf"),
            "Soil pH between 6.0 and 7.5 suits most vegetables.",
        )
        .unwrap();

        let state = indexer.build_or_load_index().await.unwrap();
        assert!(matches!(
            state,
            IndexState::Ready {
                origin: IndexOrigin::Built,
                ..
            }
        ));
        assert!(provider.texts_embedded() > before);
        assert_ne!(indexer.stored_digest().unwrap(), old_digest);
    }

    #[tokio::test]
    async fn real_pdf_text_reaches_chunks() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(
            docs.join("mulch.pdf"),
            pdf_with_text(&["Mulch keeps soil moisture steady", "Water drip lines at dawn"]),
        )
        .unwrap();
        fs::write(docs.join("broken.pdf"), b"not a valid pdf").unwrap();

        let mut config = Config::minimal();
        config.documents.dir = docs;
        config.documents.index_dir = tmp.path().join("index");
        let provider = Arc::new(CountingProvider::new());
        let indexer = DocumentIndexer::new(&config, provider.clone());

        let IndexState::Ready { index, origin } = indexer.build_or_load_index().await.unwrap()
        else {
            panic!("expected a ready index");
        };
        assert_eq!(origin, IndexOrigin::Built);
        assert!(provider.texts_embedded() > 0);
        assert!(index.entries().iter().all(|e| e.chunk.source == "mulch.pdf"));
        let text: String = index.entries().iter().map(|e| e.chunk.text.as_str()).collect();
        assert!(text.contains("Mulch"), "chunks: {:?}", text);
        assert!(text.contains("drip"), "chunks: {:?}", text);

        let reloaded = indexer.load_persisted(&index.digest).await.unwrap();
        assert_eq!(reloaded.len(), index.len());
    }

    #[tokio::test]
    async fn no_documents_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("docs")).unwrap();
        let provider = Arc::new(CountingProvider::new());
        let indexer = indexer(tmp.path(), provider.clone());

        let state = indexer.build_or_load_index().await.unwrap();
        assert!(matches!(state, IndexState::Unavailable));
        assert_eq!(provider.texts_embedded(), 0);
        assert!(indexer.stored_digest().is_none());
    }

    #[tokio::test]
    async fn corrupt_index_falls_back_to_rebuild() {
        let tmp = TempDir::new().unwrap();
        write_docs(tmp.path());
        let provider = Arc::new(CountingProvider::new());
        let indexer = indexer(tmp.path(), provider.clone());

        indexer.build_or_load_index().await.unwrap();
        fs::write(indexer.index_path(), b"definitely not sqlite").unwrap();

        let state = indexer.build_or_load_index().await.unwrap();
        assert!(matches!(
            state,
            IndexState::Ready {
                origin: IndexOrigin::Built,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn embedding_failure_is_fatal_and_keeps_old_digest() {
        let tmp = TempDir::new().unwrap();
        write_docs(tmp.path());
        let provider = Arc::new(CountingProvider::failing());
        let indexer = indexer(tmp.path(), provider);

        let err = indexer.build_or_load_index().await.unwrap_err();
        assert!(matches!(err, IndexError::Embedding(_)));
        assert!(indexer.stored_digest().is_none());
    }

    #[tokio::test]
    async fn forced_rebuild_ignores_manifest() {
        let tmp = TempDir::new().unwrap();
        write_docs(tmp.path());
        let provider = Arc::new(CountingProvider::new());
        let indexer = indexer(tmp.path(), provider.clone());

        indexer.build_or_load_index().await.unwrap();
        let before = provider.texts_embedded();
        let state = indexer.rebuild_index().await.unwrap();
        assert!(matches!(
            state,
            IndexState::Ready {
                origin: IndexOrigin::Built,
                ..
            }
        ));
        assert_eq!(provider.texts_embedded(), before * 2);
    }

    #[test]
    fn search_orders_by_similarity() {
        let chunk = |text: &str, i: i64| Chunk {
            id: format!("c{}", i),
            source: "doc.pdf".to_string(),
            chunk_index: i,
            text: text.to_string(),
            hash: String::new(),
        };
        let index = VectorIndex::new(
            "d".to_string(),
            "m".to_string(),
            2,
            vec![
                IndexedChunk {
                    chunk: chunk("east", 0),
                    vector: vec![1.0, 0.0],
                },
                IndexedChunk {
                    chunk: chunk("north", 1),
                    vector: vec![0.0, 1.0],
                },
                IndexedChunk {
                    chunk: chunk("north-east", 2),
                    vector: vec![0.7, 0.7],
                },
            ],
        );
        let hits = index.search(&[0.1, 1.0], 2);
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["north", "north-east"]);
    }
}
