//! Text Loading and Cleaning
//!
//! The pipeline consumes a list of sentences. This module gets there from a
//! file on disk:
//!
//! ```text
//! read_text("corpus.txt")  →  "Hello world! Hello again."
//! split_sentences(..)      →  ["Hello world", "Hello again"]
//! clean_text(..)           →  "hello world"
//! ```
//!
//! Splitting happens before cleaning because cleaning removes the `.!?`
//! terminators that sentence boundaries are found by.

use crate::error::{QuillError, Result};
use std::fs;
use std::path::Path;

/// Characters that end a sentence
pub const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?'];

/// Read a whole text file into memory
pub fn read_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|e| QuillError::io(path, e))
}

/// Split text into sentences on `.`, `!` and `?`
///
/// Fragments are trimmed and empty fragments (e.g. from "?!") are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split(SENTENCE_TERMINATORS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercase, keep ASCII letters and digits, collapse whitespace runs to one space
///
/// Every other character is dropped.
pub fn clean_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            cleaned.push(c.to_ascii_lowercase());
            last_was_space = false;
        } else if c.is_ascii_whitespace() && !last_was_space {
            cleaned.push(' ');
            last_was_space = true;
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("Hello world! Hello again. Is it me?!  ");
        assert_eq!(sentences, vec!["Hello world", "Hello again", "Is it me"]);
    }

    #[test]
    fn test_split_without_terminator() {
        assert_eq!(split_sentences("no end in sight"), vec!["no end in sight"]);
        assert!(split_sentences("...").is_empty());
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("Hello,   World!! 42"), "hello world 42");
        assert_eq!(clean_text("line one\n\tline two"), "line one line two");
        assert_eq!(clean_text("café"), "caf");
    }

    #[test]
    fn test_read_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        fs::write(&path, "Hello world.").unwrap();
        assert_eq!(read_text(&path).unwrap(), "Hello world.");

        let err = read_text(dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, QuillError::Io { .. }));
    }
}
