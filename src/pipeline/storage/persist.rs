//! On-disk embedding index keyed by a content fingerprint.
//!
//! An unchanged source (same bytes, same chunking, same embedder) reuses the
//! stored vectors; anything else rebuilds and overwrites the file.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::types::{Corpus, EmbeddingModel};
use super::vectordb::{IndexedChunk, KnowledgeIndex};
use super::IndexError;

const INDEX_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    fingerprint: String,
    embedder: String,
    entries: Vec<IndexedChunk>,
}

/// Result of `load_or_build`.
pub struct LoadedIndex {
    pub index: KnowledgeIndex,
    /// `true` when the stored vectors were reused without re-embedding.
    pub reused: bool,
}

/// SHA-256 (base64) over the corpus bytes and every setting that changes
/// the chunks or their vectors.
pub fn fingerprint(corpus: &Corpus, chunk_size: usize, overlap: usize, embedder_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(&corpus.fingerprint_input);
    hasher.update(corpus.origin.as_str().as_bytes());
    hasher.update((chunk_size as u64).to_le_bytes());
    hasher.update((overlap as u64).to_le_bytes());
    hasher.update(embedder_id.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Reuse the index at `path` when its fingerprint matches, otherwise embed
/// `corpus` and persist the result. A failed write is logged, not fatal.
pub fn load_or_build(
    path: &Path,
    corpus: Corpus,
    chunk_size: usize,
    overlap: usize,
    embedder: Arc<dyn EmbeddingModel>,
) -> Result<LoadedIndex, IndexError> {
    let expected = fingerprint(&corpus, chunk_size, overlap, embedder.id());

    match read_index_file(path) {
        Ok(Some(file)) if file.version == INDEX_FORMAT_VERSION && file.fingerprint == expected => {
            match KnowledgeIndex::from_entries(file.entries, embedder.clone()) {
                Ok(index) => {
                    tracing::info!(path = %path.display(), chunks = index.len(), "Knowledge index reused");
                    return Ok(LoadedIndex { index, reused: true });
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Stored index unusable, rebuilding");
                }
            }
        }
        Ok(Some(_)) => {
            tracing::info!(path = %path.display(), "Source changed since last index build, rebuilding");
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Stored index unreadable, rebuilding");
        }
    }

    let index = KnowledgeIndex::build(corpus.chunks, embedder)?;
    tracing::info!(chunks = index.len(), embedder = index.embedder_id(), "Knowledge index built");

    if let Err(e) = write_index_file(path, &expected, &index) {
        tracing::warn!(path = %path.display(), error = %e, "Failed to persist knowledge index");
    }
    Ok(LoadedIndex { index, reused: false })
}

fn read_index_file(path: &Path) -> Result<Option<IndexFile>, IndexError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read(path)?;
    Ok(Some(serde_json::from_slice(&data)?))
}

fn write_index_file(path: &Path, fingerprint: &str, index: &KnowledgeIndex) -> Result<(), IndexError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let file = IndexFile {
        version: INDEX_FORMAT_VERSION,
        fingerprint: fingerprint.to_string(),
        embedder: index.embedder_id().to_string(),
        entries: index.entries().to_vec(),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    serde_json::to_writer(&mut tmp, &file)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| IndexError::Io(e.error))?;
    Ok(())
}
