//! Knowledge Corpus Loader.
//!
//! Reads the clinical reference document page by page and chunks it. Any
//! failure (missing file, unreadable PDF, no text) is absorbed here and the
//! bundled passages are returned instead.

use std::path::Path;

use super::chunker::SlidingWindowChunker;
use super::fallback::{FALLBACK_PASSAGES, FALLBACK_SOURCE};
use super::types::{Chunker, Corpus, KnowledgeChunk};
use super::CorpusError;
use crate::models::CorpusOrigin;

const PAGE_BREAK: char = '\x0c';

/// Load and chunk `source`, falling back to the bundled set on any failure.
pub fn load(source: &Path, chunker: &SlidingWindowChunker) -> Corpus {
    match load_document(source, chunker) {
        Ok(corpus) => {
            tracing::info!(
                source = %source.display(),
                chunks = corpus.len(),
                "Knowledge corpus loaded from document"
            );
            corpus
        }
        Err(e) => {
            tracing::warn!(
                source = %source.display(),
                error = %e,
                "Source document unusable, using bundled knowledge"
            );
            fallback_corpus()
        }
    }
}

/// The bundled passages as a corpus. Deterministic.
pub fn fallback_corpus() -> Corpus {
    let chunks = FALLBACK_PASSAGES
        .iter()
        .enumerate()
        .map(|(i, text)| KnowledgeChunk {
            text: (*text).to_string(),
            source: FALLBACK_SOURCE.to_string(),
            unit: None,
            chunk_index: i,
        })
        .collect();

    Corpus {
        chunks,
        origin: CorpusOrigin::Fallback,
        fingerprint_input: FALLBACK_PASSAGES.join("\n").into_bytes(),
    }
}

fn load_document(source: &Path, chunker: &SlidingWindowChunker) -> Result<Corpus, CorpusError> {
    if !source.is_file() {
        return Err(CorpusError::SourceMissing(source.to_path_buf()));
    }
    let bytes = std::fs::read(source)?;
    let pages = extract_pages(source, &bytes)?;

    let label = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string());

    let mut chunks = Vec::new();
    for (i, page) in pages.iter().enumerate() {
        let next_index = chunks.len();
        chunks.extend(chunker.chunk(page, &label, Some(i + 1), next_index));
    }

    if chunks.is_empty() {
        return Err(CorpusError::NoText);
    }

    Ok(Corpus {
        chunks,
        origin: CorpusOrigin::Document,
        fingerprint_input: bytes,
    })
}

/// One string per page. PDFs go through pdf-extract; anything else is read
/// as UTF-8 text with form feeds separating pages.
fn extract_pages(source: &Path, bytes: &[u8]) -> Result<Vec<String>, CorpusError> {
    let is_pdf = source
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| CorpusError::Pdf(e.to_string()))?;
        tracing::debug!(pages = pages.len(), "PDF text extracted");
        Ok(pages)
    } else {
        let text = String::from_utf8_lossy(bytes);
        Ok(text.split(PAGE_BREAK).map(str::to_string).collect())
    }
}
