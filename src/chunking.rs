//! Text chunking strategies.
//!
//! A document's extracted text is split into an ordered sequence of chunks before
//! embedding. The splitting strategy is pluggable behind the [`Splitter`] trait:
//!
//! - [`FixedSizeSplitter`] (the default): contiguous windows of a fixed number of
//!   characters, with no awareness of content. Fast and deterministic, at the cost
//!   of cutting mid-sentence.
//! - [`SentenceSplitter`]: packs whole sentences up to a size budget, falling back
//!   to hard windows for oversized sentences.
//!
//! Both strategies partition the input: the concatenation of the produced chunks is
//! always exactly the original text.

use thiserror::Error;

/// Default chunk size in characters when no override is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Errors produced while configuring a splitting strategy.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// A chunk size of zero can never make progress.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// One bounded-length contiguous span of an extracted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// 0-based position of this chunk within the document. Contiguous at
    /// chunking time; downstream stages may drop chunks, leaving gaps.
    pub index: usize,
    /// The text span itself.
    pub text: String,
}

/// Strategy for splitting extracted text into spans.
///
/// Implementations must partition the input: spans are contiguous,
/// non-overlapping, and concatenate back to the original text.
pub trait Splitter: Send + Sync {
    /// Split `text` into ordered spans. Empty text yields an empty vector.
    fn split(&self, text: &str) -> Vec<String>;
}

/// Wrap a splitter's spans with their 0-based sequence indices.
pub fn chunk_text(text: &str, splitter: &dyn Splitter) -> Vec<TextChunk> {
    splitter
        .split(text)
        .into_iter()
        .enumerate()
        .map(|(index, text)| TextChunk { index, text })
        .collect()
}

/// Splits text into windows of exactly `size` characters; the final window may
/// be shorter. Content-independent and pure.
pub struct FixedSizeSplitter {
    size: usize,
}

impl FixedSizeSplitter {
    /// Create a splitter with the given window size in characters.
    pub fn new(size: usize) -> Result<Self, ChunkingError> {
        if size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        Ok(Self { size })
    }
}

impl Default for FixedSizeSplitter {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Splitter for FixedSizeSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        split_chars(text, self.size)
    }
}

/// Splits text at sentence boundaries, packing whole sentences up to `max_size`
/// characters per chunk. A single sentence longer than the budget is hard-split
/// into fixed windows so the size bound always holds.
pub struct SentenceSplitter {
    max_size: usize,
}

impl SentenceSplitter {
    /// Create a splitter with the given per-chunk character budget.
    pub fn new(max_size: usize) -> Result<Self, ChunkingError> {
        if max_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        Ok(Self { max_size })
    }
}

impl Splitter for SentenceSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for sentence in split_sentences(text) {
            let sentence_len = sentence.chars().count();

            if sentence_len > self.max_size {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let mut windows = split_chars(&sentence, self.max_size);
                // Keep a short trailing window open so following sentences can pack into it.
                if let Some(last) = windows.pop() {
                    chunks.extend(windows);
                    current_len = last.chars().count();
                    if current_len == self.max_size {
                        chunks.push(last);
                        current_len = 0;
                    } else {
                        current = last;
                    }
                }
                continue;
            }

            if current_len + sentence_len > self.max_size {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push_str(&sentence);
            current_len += sentence_len;
        }

        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

/// Split into windows of exactly `size` characters (the last may be shorter),
/// always on character boundaries.
fn split_chars(text: &str, size: usize) -> Vec<String> {
    let mut spans = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == size {
            spans.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        spans.push(current);
    }
    spans
}

/// Partition text into sentence-ish segments. A segment ends after terminal
/// punctuation (or a newline) plus any trailing whitespace, which stays attached
/// to the segment so concatenation reproduces the input.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut at_boundary = false;

    for ch in text.chars() {
        if at_boundary && !ch.is_whitespace() && !is_terminal(ch) {
            sentences.push(std::mem::take(&mut current));
            at_boundary = false;
        }
        current.push(ch);
        if is_terminal(ch) {
            at_boundary = true;
        } else if !ch.is_whitespace() {
            at_boundary = false;
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    sentences
}

fn is_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?' | '\n')
}
