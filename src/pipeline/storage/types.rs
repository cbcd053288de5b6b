use serde::{Deserialize, Serialize};

use super::IndexError;
use crate::models::CorpusOrigin;

/// A bounded span of reference text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub text: String,
    /// Human-readable source label (document stem or the bundled set name).
    pub source: String,
    /// 1-based page of the source document; `None` for bundled passages.
    pub unit: Option<usize>,
    /// Position in the corpus. Monotonically increasing, starting at 0.
    pub chunk_index: usize,
}

/// Output of the corpus loader.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub chunks: Vec<KnowledgeChunk>,
    pub origin: CorpusOrigin,
    /// Raw bytes the chunks were derived from; drives the index fingerprint.
    pub fingerprint_input: Vec<u8>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Chunking strategy trait
pub trait Chunker {
    /// Split one logical unit of text, numbering chunks from `first_index`.
    fn chunk(&self, text: &str, source: &str, unit: Option<usize>, first_index: usize)
        -> Vec<KnowledgeChunk>;
}

/// Embedding model abstraction. Implementations must be a pure function of
/// the input text.
pub trait EmbeddingModel: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError>;
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexError>;
    fn dimension(&self) -> usize;
    /// Stable identifier folded into the index fingerprint.
    fn id(&self) -> &str;
}
