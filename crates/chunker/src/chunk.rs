use serde::{Deserialize, Serialize};

use crate::token::{tokenize, Token};
use crate::{ChunkConfig, ChunkError};

/// Token window `[start, end)` of a single chunk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Position of the chunk within its document, starting at 0.
    pub index: usize,
    /// First token (inclusive).
    pub start: usize,
    /// Last token (exclusive).
    pub end: usize,
}

impl ChunkSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Computes chunk windows over a sequence of `token_count` tokens.
///
/// Windows start every `chunk_size - overlap` tokens and stop after the first
/// window that reaches the end of the sequence, so the last window may be
/// shorter than `chunk_size`. Zero tokens yield zero windows.
pub fn chunk_spans(token_count: usize, cfg: &ChunkConfig) -> Result<Vec<ChunkSpan>, ChunkError> {
    let stride = cfg.stride()?;
    let mut spans = Vec::with_capacity(token_count.div_ceil(stride));

    let mut start = 0usize;
    while start < token_count {
        let end = (start + cfg.chunk_size).min(token_count);
        spans.push(ChunkSpan {
            index: spans.len(),
            start,
            end,
        });
        if start + cfg.chunk_size >= token_count {
            break;
        }
        start += stride;
    }

    Ok(spans)
}

/// Splits `text` into overlapping passages of at most `cfg.chunk_size` tokens.
///
/// Each passage is its window's tokens joined by a single space. The config is
/// validated before the text is inspected, so an invalid config fails even for
/// empty input.
pub fn chunk_text(text: &str, cfg: &ChunkConfig) -> Result<Vec<String>, ChunkError> {
    cfg.validate()?;
    let tokens = tokenize(text);
    let spans = chunk_spans(tokens.len(), cfg)?;
    Ok(spans
        .iter()
        .map(|span| join_tokens(&tokens[span.start..span.end]))
        .collect())
}

fn join_tokens(tokens: &[Token<'_>]) -> String {
    let capacity = tokens.iter().map(|t| t.text.len() + 1).sum::<usize>();
    let mut out = String::with_capacity(capacity);
    for token in tokens {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token.text);
    }
    out
}
