/// Default chunk size in words
pub const DEFAULT_CHUNK_WORDS: usize = 200;

/// Represents a text chunk with its position in the document
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    /// Position of this chunk in the document (0..N-1)
    pub index: usize,
    /// The actual text content of this chunk
    pub text: String,
    /// Number of words in this chunk
    pub word_count: usize,
}

/// Split text into chunks of at most `max_words` whitespace-delimited words.
///
/// Words are re-joined with single spaces, so chunk boundaries are word
/// aligned and the last chunk may be shorter. Empty text yields no chunks.
pub fn chunk_text(text: &str, max_words: usize) -> Vec<TextChunk> {
    // A zero size would never advance
    let max_words = max_words.max(1);

    let words: Vec<&str> = text.split_whitespace().collect();

    words
        .chunks(max_words)
        .enumerate()
        .map(|(index, group)| TextChunk {
            index,
            text: group.join(" "),
            word_count: group.len(),
        })
        .collect()
}
