use super::types::{Chunker, KnowledgeChunk};

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Fixed-size sliding window over whitespace-collapsed text.
///
/// Each window of `size` chars is cut at the last sentence terminator if that
/// cut lands past the middle of the window, otherwise at exactly `size`. The
/// next window starts `overlap` chars before the previous cut. Sizes are
/// counted in chars, never bytes, so multi-byte text cannot split a code point.
///
/// Without terminators, a text of `L > size` chars yields
/// `ceil((L - overlap) / (size - overlap))` chunks and every neighbouring pair
/// shares exactly `overlap` chars.
pub struct SlidingWindowChunker {
    size: usize,
    overlap: usize,
}

impl SlidingWindowChunker {
    /// `overlap` is clamped below `size`.
    pub fn new(size: usize, overlap: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            overlap: overlap.min(size - 1),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into window strings.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = collapse_whitespace(text).chars().collect();
        let len = chars.len();
        let mut pieces = Vec::new();
        if len == 0 {
            return pieces;
        }

        let mut start = 0;
        loop {
            let end = (start + self.size).min(len);
            let cut = if end < len {
                sentence_cut(&chars[start..end], self.size / 2)
                    .map(|pos| start + pos)
                    .unwrap_or(end)
            } else {
                end
            };

            let piece: String = chars[start..cut].iter().collect();
            let piece = piece.trim();
            if !piece.is_empty() {
                pieces.push(piece.to_string());
            }

            if cut >= len {
                break;
            }
            let next = cut.saturating_sub(self.overlap);
            start = if next > start { next } else { cut };
        }

        pieces
    }
}

impl Chunker for SlidingWindowChunker {
    fn chunk(
        &self,
        text: &str,
        source: &str,
        unit: Option<usize>,
        first_index: usize,
    ) -> Vec<KnowledgeChunk> {
        self.split(text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| KnowledgeChunk {
                text,
                source: source.to_string(),
                unit,
                chunk_index: first_index + i,
            })
            .collect()
    }
}

/// Exclusive end of the window when cutting after the last terminator, if
/// that terminator sits beyond `min_pos`.
fn sentence_cut(window: &[char], min_pos: usize) -> Option<usize> {
    window
        .iter()
        .rposition(|c| SENTENCE_TERMINATORS.contains(c))
        .filter(|&pos| pos > min_pos)
        .map(|pos| pos + 1)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
