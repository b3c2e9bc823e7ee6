//! Token-window entry chunker.
//!
//! Splits entries whose compiled text is longer than the embedding model
//! accepts into sub-entries of at most `max_tokens` whitespace-delimited
//! tokens. Each continuation chunk is prefixed with the tail of the
//! entry heading so it stays self-describing when retrieved on its own.
//!
//! # Algorithm
//!
//! 1. Tokenize `compiled` on whitespace.
//! 2. Drop tokens longer than `max_word_length` characters.
//! 3. The first window takes up to `max_tokens` tokens and keeps the
//!    entry as-is (its heading is already part of the compiled text).
//! 4. Later windows are prefixed with the last 100 characters of the
//!    heading followed by `".\n"`, and shrink by the prefix token count
//!    so the total never exceeds `max_tokens`.
//! 5. All chunks of one entry share a fresh `corpus_id`.
//!
//! # Example
//!
//! ```rust
//! use corpus_sync_core::chunk::split_entries_by_max_tokens;
//! use corpus_sync_core::models::Entry;
//!
//! let entry = Entry::new("one two three four five", "raw", "Notes", "a.md");
//! let chunks = split_entries_by_max_tokens(&[entry], 3, 500);
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks[0].compiled, "one two three");
//! assert_eq!(chunks[1].compiled, "Notes.\nfour five");
//! ```

use uuid::Uuid;

use crate::models::Entry;

/// Default window size in tokens.
pub const DEFAULT_MAX_TOKENS: usize = 256;

/// Default cap on a single token's length in characters.
pub const DEFAULT_MAX_WORD_LENGTH: usize = 500;

/// How much of the heading, from its end, prefixes continuation chunks.
const HEADING_TAIL_CHARS: usize = 100;

/// Split entries so that no chunk's compiled text exceeds `max_tokens`
/// whitespace-delimited tokens.
///
/// Output order follows input order; chunks of one entry are contiguous.
/// Entries left with no tokens after filtering produce no chunks.
pub fn split_entries_by_max_tokens(
    entries: &[Entry],
    max_tokens: usize,
    max_word_length: usize,
) -> Vec<Entry> {
    let max_tokens = max_tokens.max(1);
    let mut chunked = Vec::new();

    for entry in entries {
        // Overlong tokens are dropped rather than truncating the entry.
        let words: Vec<&str> = entry
            .compiled
            .split_whitespace()
            .filter(|w| w.chars().count() <= max_word_length)
            .collect();
        if words.is_empty() {
            continue;
        }

        let corpus_id = Uuid::new_v4();
        let prefix = continuation_prefix(&entry.heading, max_tokens);
        let window = max_tokens - prefix.map(token_count).unwrap_or(0);

        let first_end = max_tokens.min(words.len());
        chunked.push(make_chunk(entry, words[..first_end].join(" "), corpus_id));

        let mut start = first_end;
        while start < words.len() {
            let end = (start + window).min(words.len());
            let body = words[start..end].join(" ");
            let compiled = match prefix {
                Some(p) => format!("{}.\n{}", p, body),
                None => body,
            };
            chunked.push(make_chunk(entry, compiled, corpus_id));
            start = end;
        }
    }

    chunked
}

/// Heading tail used to prefix continuation chunks, cut further from the
/// front if it would leave no room for content.
fn continuation_prefix(heading: &str, max_tokens: usize) -> Option<&str> {
    let tail = tail_chars(heading.trim_end(), HEADING_TAIL_CHARS);
    let starts = token_starts(tail);
    if starts.is_empty() || max_tokens < 2 {
        return None;
    }
    let keep = max_tokens - 1;
    if starts.len() > keep {
        Some(&tail[starts[starts.len() - keep]..])
    } else {
        Some(tail)
    }
}

/// The last `n` characters of `s`, on a char boundary.
fn tail_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    let skip = count - n;
    match s.char_indices().nth(skip) {
        Some((i, _)) => &s[i..],
        None => s,
    }
}

/// Byte offsets where whitespace-delimited tokens begin.
fn token_starts(s: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut in_token = false;
    for (i, c) in s.char_indices() {
        if c.is_whitespace() {
            in_token = false;
        } else if !in_token {
            starts.push(i);
            in_token = true;
        }
    }
    starts
}

fn token_count(s: &str) -> usize {
    s.split_whitespace().count()
}

fn make_chunk(entry: &Entry, compiled: String, corpus_id: Uuid) -> Entry {
    Entry {
        compiled,
        raw: entry.raw.clone(),
        heading: entry.heading.clone(),
        file: entry.file.clone(),
        corpus_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_short_entry_single_chunk() {
        let entry = Entry::new("a short entry", "raw", "Heading", "a.md");
        let chunks = split_entries_by_max_tokens(&[entry.clone()], 256, 500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].compiled, "a short entry");
        assert_eq!(chunks[0].raw, entry.raw);
        assert_eq!(chunks[0].heading, entry.heading);
    }

    #[test]
    fn test_chunk_size_bound() {
        let heading = "Projects / Rust / Chunking experiments with long headings";
        let entry = Entry::new(words(1000), "raw", heading, "a.md");
        for max_tokens in [1, 2, 3, 5, 16, 256] {
            let chunks = split_entries_by_max_tokens(&[entry.clone()], max_tokens, 500);
            assert!(!chunks.is_empty());
            for c in &chunks {
                assert!(
                    c.compiled.split_whitespace().count() <= max_tokens,
                    "chunk over {} tokens: {:?}",
                    max_tokens,
                    c.compiled
                );
            }
        }
    }

    #[test]
    fn test_no_tokens_lost() {
        let entry = Entry::new(words(50), "raw", "", "a.md");
        let chunks = split_entries_by_max_tokens(&[entry], 7, 500);
        let rejoined: Vec<String> = chunks
            .iter()
            .flat_map(|c| c.compiled.split_whitespace().map(String::from))
            .collect();
        assert_eq!(rejoined.join(" "), words(50));
    }

    #[test]
    fn test_heading_propagation() {
        let heading = "Journal / 2024 / Trip";
        let entry = Entry::new(words(10), "raw", heading, "j.org");
        let chunks = split_entries_by_max_tokens(&[entry], 6, 500);
        assert!(chunks.len() >= 2);
        assert!(chunks[0].compiled.starts_with("w0"));
        for c in &chunks[1..] {
            assert!(c.compiled.starts_with("Journal / 2024 / Trip.\n"));
        }
    }

    #[test]
    fn test_long_heading_keeps_last_100_chars() {
        let heading = format!("{}{}", "x".repeat(150), " tail section");
        let entry = Entry::new(words(600), "raw", heading.clone(), "a.md");
        let chunks = split_entries_by_max_tokens(&[entry], 256, 500);
        assert!(chunks.len() >= 3);
        let tail: String = heading.chars().skip(heading.chars().count() - 100).collect();
        for c in &chunks[1..] {
            assert!(c.compiled.starts_with(&format!("{}.\n", tail)));
        }
    }

    #[test]
    fn test_multibyte_heading_tail() {
        let heading = "é".repeat(120);
        let entry = Entry::new(words(20), "raw", heading, "a.md");
        let chunks = split_entries_by_max_tokens(&[entry], 10, 500);
        assert!(chunks[1].compiled.starts_with(&"é".repeat(100)));
        assert!(!chunks[1].compiled.starts_with(&"é".repeat(101)));
    }

    #[test]
    fn test_overlong_words_dropped() {
        let long = "z".repeat(501);
        let entry = Entry::new(format!("keep {} me", long), "raw", "h", "a.md");
        let chunks = split_entries_by_max_tokens(&[entry], 256, 500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].compiled, "keep me");
    }

    #[test]
    fn test_entry_without_tokens_dropped() {
        let entry = Entry::new("   \n\t ", "raw", "h", "a.md");
        assert!(split_entries_by_max_tokens(&[entry], 256, 500).is_empty());
    }

    #[test]
    fn test_corpus_id_shared_per_entry_and_order_kept() {
        let a = Entry::new(words(10), "a", "A", "a.md");
        let b = Entry::new(words(10), "b", "B", "b.md");
        let chunks = split_entries_by_max_tokens(&[a, b], 4, 500);
        let a_chunks: Vec<&Entry> = chunks.iter().filter(|c| c.file == "a.md").collect();
        let b_chunks: Vec<&Entry> = chunks.iter().filter(|c| c.file == "b.md").collect();
        assert!(a_chunks.iter().all(|c| c.corpus_id == a_chunks[0].corpus_id));
        assert!(b_chunks.iter().all(|c| c.corpus_id == b_chunks[0].corpus_id));
        assert_ne!(a_chunks[0].corpus_id, b_chunks[0].corpus_id);
        // All of a's chunks come before b's.
        let first_b = chunks.iter().position(|c| c.file == "b.md").unwrap();
        assert!(chunks[..first_b].iter().all(|c| c.file == "a.md"));
    }

    #[test]
    fn test_tail_chars() {
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("ab", 3), "ab");
    }
}
