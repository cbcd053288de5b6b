use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::embedder::cosine_similarity;
use super::types::{EmbeddingModel, KnowledgeChunk};
use super::IndexError;

/// Chunks are embedded in batches of this size.
const EMBED_BATCH: usize = 100;

/// A chunk with its embedding, as held in memory and on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub chunk: KnowledgeChunk,
    pub vector: Vec<f32>,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: KnowledgeChunk,
    /// Cosine similarity clamped to [0, 1].
    pub score: f32,
}

/// Brute-force cosine index over the knowledge corpus.
///
/// Read-only after construction; share it behind an `Arc` and query from any
/// number of tasks without locking.
pub struct KnowledgeIndex {
    entries: Vec<IndexedChunk>,
    embedder: Arc<dyn EmbeddingModel>,
}

impl KnowledgeIndex {
    /// Embed every chunk. Fails if there are no chunks or the embedder fails
    /// for any of them.
    pub fn build(
        chunks: Vec<KnowledgeChunk>,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Result<Self, IndexError> {
        if chunks.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let vectors = embedder.embed_batch(&texts)?;
            if vectors.len() != batch.len() {
                return Err(IndexError::Embedding(format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }
            for (chunk, vector) in batch.iter().zip(vectors) {
                check_dimension(embedder.dimension(), vector.len())?;
                entries.push(IndexedChunk {
                    chunk: chunk.clone(),
                    vector,
                });
            }
        }

        tracing::debug!(chunks = entries.len(), embedder = embedder.id(), "Knowledge index built");
        Ok(Self { entries, embedder })
    }

    /// Reassemble an index from persisted entries without re-embedding.
    pub fn from_entries(
        entries: Vec<IndexedChunk>,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Result<Self, IndexError> {
        if entries.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }
        for entry in &entries {
            check_dimension(embedder.dimension(), entry.vector.len())?;
        }
        Ok(Self { entries, embedder })
    }

    /// Top `k` chunks for `query`, by descending score with ties broken by
    /// ascending chunk index.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_vector = self.embedder.embed(query)?;

        let mut hits: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: clamp_score(cosine_similarity(&query_vector, &entry.vector)),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
        });
        hits.truncate(k);
        Ok(hits)
    }

    pub fn entries(&self) -> &[IndexedChunk] {
        &self.entries
    }

    pub fn embedder_id(&self) -> &str {
        self.embedder.id()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn check_dimension(expected: usize, actual: usize) -> Result<(), IndexError> {
    if expected != actual {
        return Err(IndexError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::storage::corpus::fallback_corpus;
    use crate::pipeline::storage::embedder::HashingEmbedder;

    struct BrokenEmbedder;

    impl EmbeddingModel for BrokenEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, IndexError> {
            Err(IndexError::Embedding("model offline".into()))
        }

        fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexError> {
            Err(IndexError::Embedding("model offline".into()))
        }

        fn dimension(&self) -> usize {
            8
        }

        fn id(&self) -> &str {
            "broken"
        }
    }

    fn chunk(i: usize, text: &str) -> KnowledgeChunk {
        KnowledgeChunk {
            text: text.into(),
            source: "test".into(),
            unit: None,
            chunk_index: i,
        }
    }

    fn hashing() -> Arc<dyn EmbeddingModel> {
        Arc::new(HashingEmbedder::new())
    }

    #[test]
    fn search_returns_at_most_k_in_descending_order() {
        let index = KnowledgeIndex::build(fallback_corpus().chunks, hashing()).unwrap();
        let hits = index.search("What are the side effects of ACE inhibitors?", 3).unwrap();

        assert_eq!(hits.len(), 3);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert!(hits.iter().all(|h| (0.0..=1.0).contains(&h.score)));
    }

    #[test]
    fn relevant_passage_ranks_first() {
        let index = KnowledgeIndex::build(fallback_corpus().chunks, hashing()).unwrap();
        let hits = index.search("peritoneal dialysis exchanges", 1).unwrap();
        assert!(hits[0].chunk.text.starts_with("Peritoneal dialysis"));
    }

    #[test]
    fn equal_scores_break_ties_by_chunk_index() {
        let chunks = vec![
            chunk(0, "unrelated words entirely"),
            chunk(1, "kidney stones"),
            chunk(2, "kidney stones"),
        ];
        let index = KnowledgeIndex::build(chunks, hashing()).unwrap();
        let hits = index.search("kidney stones", 3).unwrap();
        assert_eq!(hits[0].chunk.chunk_index, 1);
        assert_eq!(hits[1].chunk.chunk_index, 2);
        assert_eq!(hits[0].score, hits[1].score);
    }

    #[test]
    fn k_larger_than_corpus_returns_everything() {
        let index = KnowledgeIndex::build(vec![chunk(0, "one"), chunk(1, "two")], hashing()).unwrap();
        assert_eq!(index.search("one", 10).unwrap().len(), 2);
        assert!(index.search("one", 0).unwrap().is_empty());
    }

    #[test]
    fn rebuild_is_deterministic() {
        let a = KnowledgeIndex::build(fallback_corpus().chunks, hashing()).unwrap();
        let b = KnowledgeIndex::build(fallback_corpus().chunks, hashing()).unwrap();
        assert_eq!(a.entries(), b.entries());
        assert_eq!(
            a.search("anemia treatment", 5).unwrap(),
            b.search("anemia treatment", 5).unwrap()
        );
    }

    #[test]
    fn empty_corpus_is_a_build_failure() {
        assert!(matches!(
            KnowledgeIndex::build(vec![], hashing()),
            Err(IndexError::EmptyCorpus)
        ));
    }

    #[test]
    fn embedder_failure_is_a_build_failure() {
        let result = KnowledgeIndex::build(vec![chunk(0, "text")], Arc::new(BrokenEmbedder));
        assert!(matches!(result, Err(IndexError::Embedding(_))));
    }

    #[test]
    fn from_entries_rejects_wrong_dimension() {
        let entries = vec![IndexedChunk {
            chunk: chunk(0, "text"),
            vector: vec![0.0; 3],
        }];
        assert!(matches!(
            KnowledgeIndex::from_entries(entries, hashing()),
            Err(IndexError::DimensionMismatch { expected: 384, actual: 3 })
        ));
    }
}
