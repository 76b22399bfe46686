//! Case- and punctuation-insensitive tokenization shared by the validator
//! and the transcript aligner. Both sides must normalize identically or
//! phrases accepted at validation time would fail to align later.

/// Words that carry no search signal when reformulating an asset hint.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "of", "in", "on", "at", "to", "for", "and", "or", "with",
    "is", "are", "was", "were", "be", "this", "that", "de", "da", "do", "e",
    "o", "os", "as", "um", "uma", "que", "com", "para", "sobre",
];

/// Lower-case a text and split it into words with punctuation stripped.
/// Words that are pure punctuation disappear entirely.
pub fn normalize_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter_map(|word| {
            let cleaned: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            if cleaned.is_empty() { None } else { Some(cleaned) }
        })
        .collect()
}

/// Word count after normalization.
pub fn word_count(text: &str) -> usize {
    normalize_words(text).len()
}

/// Strip terminal punctuation from a phrase without touching inner
/// punctuation. Anchor phrases must not end a sentence.
pub fn trim_terminal_punctuation(phrase: &str) -> &str {
    phrase.trim_end_matches(['.', '!', '?', ',', ';', ':', '…'])
}

/// Reduce a search term to at most `cap` significant words, dropping
/// stop-words first. Falls back to the original words when everything
/// would be dropped.
pub fn significant_words(term: &str, cap: usize) -> Vec<String> {
    let words = normalize_words(term);
    let significant: Vec<String> = words
        .iter()
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .cloned()
        .collect();
    let mut picked = if significant.is_empty() { words } else { significant };
    picked.truncate(cap);
    picked
}

/// Whether `needle` occurs as a contiguous run inside `haystack`.
/// Returns the start index of the first occurrence.
pub fn find_subsequence(haystack: &[String], needle: &[String]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}
