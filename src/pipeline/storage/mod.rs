pub mod types;
pub mod chunker;
pub mod corpus;
pub mod fallback;
pub mod embedder;
pub mod vectordb;
pub mod persist;

use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading the source document. Never escapes the corpus
/// loader: every variant ends in the bundled fallback set.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Source document not found: {0}")]
    SourceMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("Source document produced no text")]
    NoText,
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Cannot build an index from zero chunks")]
    EmptyCorpus,

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Embedding model initialization: {0}")]
    ModelInit(String),

    #[error("Tokenization error: {0}")]
    Tokenization(String),

    #[error("Index file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index file serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
