//! Text chunking for long-form generation
//!
//! Models accept a bounded amount of text per call. Long inputs are cut at
//! sentence boundaries and greedily packed into chunks of at most `max_chars`
//! characters.

use once_cell::sync::Lazy;
use regex::Regex;

/// Sentence-ending punctuation followed by a whitespace run
static SENTENCE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("sentence break pattern is valid"));

/// Split text into sentences. The punctuation stays with its sentence, the
/// whitespace run after it is dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_BREAK.find_iter(text) {
        // The punctuation mark is a single ASCII byte
        let end = m.start() + 1;
        sentences.push(&text[start..end]);
        start = m.end();
    }
    sentences.push(&text[start..]);

    sentences
}

/// Split text into chunks at sentence boundaries.
///
/// Every chunk is trimmed and at most `max_chars` characters long, unless a
/// single sentence is longer than that on its own, in which case it is kept
/// whole. Blank input comes back as a single chunk holding the original text.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        let sentence_len = sentence.chars().count();

        if current_len + sentence_len > max_chars && !current.is_empty() {
            let chunk = current.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            current.clear();
            current_len = 0;
        }

        current.push_str(sentence);
        current.push(' ');
        current_len += sentence_len + 1;
    }

    let tail = current.trim();
    if !tail.is_empty() {
        chunks.push(tail.to_string());
    }

    if chunks.is_empty() {
        vec![text.to_string()]
    } else {
        chunks
    }
}
