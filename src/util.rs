//! Small text helpers shared by the segmenter and the rewriters.
//!
//! Entity offsets are character offsets, while Rust strings are indexed by
//! byte. Everything that slices annotated text goes through these helpers.

/// Byte index of the `char_idx`-th character of `text`, clamped to `text.len()`.
pub fn byte_offset(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

/// Slice `text` by character offsets `[start, end)`; out of range offsets are clamped.
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let begin = byte_offset(text, start);
    let finish = byte_offset(text, end).max(begin);
    &text[begin..finish]
}

/// Number of characters in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// `word` with its final character removed.
pub fn drop_last_char(word: &str) -> &str {
    match word.char_indices().last() {
        Some((idx, _)) => &word[..idx],
        None => word,
    }
}

/// Number of whitespace-delimited words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
