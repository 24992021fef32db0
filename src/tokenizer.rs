//! Word Tokenizer and Vocabulary
//!
//! This module turns sentences into integer token ids and gives every token an
//! embedding vector. The vocabulary is a hash table with a fixed number of
//! buckets and chaining on collision.
//!
//! ## How It Works
//!
//! 1. **Split**: each sentence is cut on spaces and common punctuation
//!    (`" ,.;!?-"`, plus tabs and newlines)
//! 2. **Fold**: words are lowercased, so "Hello" and "hello" are one token
//! 3. **Hash**: DJB2 (`h = h * 33 + c`, starting from 5381) picks the bucket
//! 4. **Insert**: a word not yet in its bucket's chain gets the next id
//!    (ids start at 1) and is prepended to the chain
//! 5. **Embed**: the new entry gets an embedding from the configured
//!    [`EmbeddingInit`] policy
//!
//! ## Example
//!
//! ```text
//! ["Hello world!", "Hello again."]
//!   → hello = 1, world = 2, again = 3
//! ```
//!
//! Id 0 is never assigned. [`Vocabulary::encode`] uses it for words that are not
//! in the vocabulary, the same way an unknown token would be encoded.
//!
//! ## Costs
//!
//! Word lookups touch one bucket chain. Looking an embedding up *by token id*
//! ([`Vocabulary::embedding_for_token_id`]) scans every bucket, O(vocabulary
//! size + table size). That is acceptable for vocabularies of a few thousand
//! words and is the price of keying the table by word only.

use crate::config::{Config, EmbeddingInit};
use crate::error::{try_zeroed, QuillError, Result};
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use std::fmt;
use tracing::{debug, warn};

/// Id reserved for "not in the vocabulary"
pub const UNKNOWN_TOKEN: u32 = 0;

/// Characters that separate words inside a sentence
pub const WORD_DELIMITERS: &str = " ,.;!?-";

/// DJB2 starting value
const DJB2_SEED: u64 = 5381;

/// Bucket index of `word` in a table of `table_size` buckets
///
/// Case-insensitive for ASCII: `hash("Hello", n) == hash("hello", n)`.
///
/// # Panics
///
/// Panics if `table_size` is zero
pub fn hash(word: &str, table_size: usize) -> usize {
    let h = word.bytes().fold(DJB2_SEED, |h, b| {
        h.wrapping_shl(5)
            .wrapping_add(h)
            .wrapping_add(u64::from(b.to_ascii_lowercase()))
    });
    (h % table_size as u64) as usize
}

/// Split a sentence into words
pub fn split_words(sentence: &str) -> impl Iterator<Item = &str> {
    sentence
        .split(|c: char| WORD_DELIMITERS.contains(c) || c.is_whitespace())
        .filter(|word| !word.is_empty())
}

/// Generate the embedding for a newly assigned token id
///
/// # Errors
///
/// Returns [`QuillError::Allocation`] if the vector cannot be reserved and
/// [`QuillError::InvalidConfig`] if the policy's range is not a valid interval.
pub fn generate_embedding(
    token_id: u32,
    dim: usize,
    init: EmbeddingInit,
    rng: &mut StdRng,
) -> Result<Vec<f32>> {
    let (low, high) = init.range();
    let dist = Uniform::new_inclusive(low, high).map_err(|e| {
        QuillError::InvalidConfig(format!("embedding range [{low}, {high}]: {e}"))
    })?;

    let mut embedding = try_zeroed(dim, "token embedding")?;
    match init {
        EmbeddingInit::SinCosScaled { .. } => {
            let angle = f64::from(token_id);
            for (j, value) in embedding.iter_mut().enumerate() {
                let scale = dist.sample(rng);
                let wave = if j % 2 == 0 { angle.sin() } else { angle.cos() };
                *value = scale * wave as f32;
            }
        }
        EmbeddingInit::Uniform { .. } => {
            for value in embedding.iter_mut() {
                *value = dist.sample(rng);
            }
        }
    }
    Ok(embedding)
}

/// One word in the vocabulary
#[derive(Clone, Debug, PartialEq)]
pub struct VocabularyEntry {
    /// The lowercased word
    pub word: String,
    /// Id assigned on first sighting, starting at 1
    pub token_id: u32,
    /// Embedding, filled once right after insertion
    pub embedding: Option<Vec<f32>>,
}

/// Hash-table vocabulary with an embedding per word
///
/// Owns its random generator so that a seeded run assigns the same embeddings
/// every time.
pub struct Vocabulary {
    /// Bucket chains; the most recently inserted entry is at the end of its Vec
    buckets: Vec<Vec<VocabularyEntry>>,
    next_id: u32,
    len: usize,
    embedding_dim: usize,
    init: EmbeddingInit,
    rng: StdRng,
}

impl Vocabulary {
    /// Create an empty vocabulary
    ///
    /// # Panics
    ///
    /// Panics if `table_size` is zero
    pub fn new(table_size: usize, embedding_dim: usize, init: EmbeddingInit, seed: u64) -> Self {
        assert!(table_size > 0, "table_size must be positive");
        Self {
            buckets: vec![Vec::new(); table_size],
            next_id: 1,
            len: 0,
            embedding_dim,
            init,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create a vocabulary sized by a pipeline configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.table_size,
            config.embedding_dim,
            config.embedding_init,
            config.seed,
        )
    }

    /// Number of buckets
    pub fn table_size(&self) -> usize {
        self.buckets.len()
    }

    /// Width of the stored embeddings
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Number of distinct words
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no word has been inserted
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn fold(word: &str) -> String {
        word.to_ascii_lowercase()
    }

    fn find(&self, key: &str) -> Option<&VocabularyEntry> {
        self.buckets[hash(key, self.buckets.len())]
            .iter()
            .rev()
            .find(|entry| entry.word == key)
    }

    /// True if `word` has been inserted
    pub fn is_present(&self, word: &str) -> bool {
        self.find(&Self::fold(word)).is_some()
    }

    /// Token id of `word`, or `None` if it was never inserted
    pub fn token_id(&self, word: &str) -> Option<u32> {
        self.find(&Self::fold(word)).map(|entry| entry.token_id)
    }

    /// Insert `word` and return its id
    ///
    /// A word that is already present keeps its id and nothing changes.
    pub fn insert(&mut self, word: &str) -> u32 {
        let key = Self::fold(word);
        if let Some(entry) = self.find(&key) {
            return entry.token_id;
        }
        let token_id = self.next_id;
        self.next_id += 1;
        self.len += 1;
        let bucket = hash(&key, self.buckets.len());
        self.buckets[bucket].push(VocabularyEntry {
            word: key,
            token_id,
            embedding: None,
        });
        token_id
    }

    fn set_embedding(&mut self, word_key: &str, embedding: Vec<f32>) {
        let bucket = hash(word_key, self.buckets.len());
        if let Some(entry) = self.buckets[bucket]
            .iter_mut()
            .rev()
            .find(|entry| entry.word == word_key)
        {
            if entry.embedding.is_none() {
                entry.embedding = Some(embedding);
            }
        }
    }

    /// Add every new word of every sentence, with an embedding each
    ///
    /// Words already present are skipped. If an embedding cannot be generated
    /// the word stays in the vocabulary without one (it reads as a zero vector)
    /// and extraction continues with the rest of the sentence.
    ///
    /// # Returns
    ///
    /// Number of words added
    pub fn extract_unique_words<S: AsRef<str>>(&mut self, sentences: &[S]) -> usize {
        let before = self.len;
        for sentence in sentences {
            for word in split_words(sentence.as_ref()) {
                if self.is_present(word) {
                    continue;
                }
                let token_id = self.insert(word);
                match generate_embedding(token_id, self.embedding_dim, self.init, &mut self.rng) {
                    Ok(embedding) => self.set_embedding(&Self::fold(word), embedding),
                    Err(e) => warn!(word, token_id, error = %e, "skipping embedding"),
                }
            }
        }
        let added = self.len - before;
        debug!(
            sentences = sentences.len(),
            added,
            total = self.len,
            "extracted unique words"
        );
        added
    }

    /// Embedding of the token with id `token_id`
    ///
    /// Scans every bucket. Unknown ids, and words whose embedding could not be
    /// generated, yield a zero vector.
    pub fn embedding_for_token_id(&self, token_id: u32) -> Vec<f32> {
        self.buckets
            .iter()
            .flat_map(|chain| chain.iter())
            .find(|entry| entry.token_id == token_id)
            .and_then(|entry| entry.embedding.clone())
            .unwrap_or_else(|| vec![0.0; self.embedding_dim])
    }

    /// Token ids of a sentence; unknown words become [`UNKNOWN_TOKEN`]
    pub fn encode(&self, sentence: &str) -> Vec<u32> {
        split_words(sentence)
            .map(|word| self.token_id(word).unwrap_or(UNKNOWN_TOKEN))
            .collect()
    }

    /// Embedding matrix `[max_len, embedding_dim]` for a list of token ids
    ///
    /// Ids beyond `max_len` are dropped. Rows past the end of the sequence,
    /// and rows of unknown tokens, are zero (padding).
    pub fn embedding_matrix_for_ids(&self, ids: &[u32], max_len: usize) -> Tensor {
        let mut matrix = Tensor::zeros(max_len, self.embedding_dim);
        for (pos, &id) in ids.iter().take(max_len).enumerate() {
            if id != UNKNOWN_TOKEN {
                matrix
                    .row_mut(pos)
                    .copy_from_slice(&self.embedding_for_token_id(id));
            }
        }
        matrix
    }

    /// Embedding matrix `[max_len, embedding_dim]` for a sentence
    pub fn embedding_matrix(&self, sentence: &str, max_len: usize) -> Tensor {
        self.embedding_matrix_for_ids(&self.encode(sentence), max_len)
    }

    /// All entries in bucket-then-chain order (newest first within a bucket)
    pub fn entries(&self) -> impl Iterator<Item = &VocabularyEntry> {
        self.buckets.iter().flat_map(|chain| chain.iter().rev())
    }
}

impl fmt::Display for Vocabulary {
    /// One `word : id : { e0, e1, ... }` line per entry, in table order
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Token / Token ID / Embedding:")?;
        writeln!(f, "Table Size: {}", self.buckets.len())?;
        for entry in self.entries() {
            let values: Vec<String> = match &entry.embedding {
                Some(embedding) => embedding.iter().map(|v| format!("{v:.4}")).collect(),
                None => vec![format!("{:.4}", 0.0); self.embedding_dim],
            };
            writeln!(
                f,
                "{} : {} : {{ {} }}",
                entry.word,
                entry.token_id,
                values.join(", ")
            )?;
        }
        Ok(())
    }
}
