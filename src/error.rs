//! Typed errors for each pipeline boundary.
//!
//! Plumbing (config loading, CLI wiring) uses `anyhow`. The reader, indexer,
//! retriever, and model client return these enums instead, so the shells can
//! decide how each failure is shown.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SensorLogError {
    #[error("sensor data file {0} not found")]
    NotFound(PathBuf),
    #[error("failed to read sensor data file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("failed to scan documents in {path}: {message}")]
    Scan { path: PathBuf, message: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),
    #[error("embedding provider returned {got} vectors for {expected} chunks")]
    EmbeddingCount { expected: usize, got: usize },
    #[error("failed to persist index: {0}")]
    Persist(#[source] anyhow::Error),
    #[error("failed to load index: {0}")]
    Load(#[source] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("no documents are indexed")]
    Unavailable,
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("failed to embed query: {0}")]
    QueryEmbedding(#[source] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },
    #[error("model endpoint returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to decode model response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("model response contained no message")]
    EmptyResponse,
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("failed to read prompt template {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unknown placeholder {{{0}}} in prompt template")]
    UnknownPlaceholder(String),
    #[error("unbalanced brace at byte {0} in prompt template")]
    UnbalancedBrace(usize),
}

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error(transparent)]
    Model(#[from] ModelError),
}
