//! Transformer Pipeline
//!
//! Composes the layers into the full pipeline and implements one training step.
//!
//! ## Architecture Overview
//!
//! ```text
//! Sentence
//!     ↓
//! Token ids (Vocabulary)
//!     ↓
//! Embedding rows [seq_len, dim]
//!     + Positional encoding
//!     ↓
//! Self-Attention
//!     ↓
//! Feed-Forward (per row)
//!     ↓
//! Layer Norm
//!     ↓
//! Last position → Output head → prediction [dim]
//! ```
//!
//! ## Training Target
//!
//! Every step predicts the next word of a sentence. For `"the cat sat"` the
//! input is `the cat` and the target is the embedding of `sat`. The loss is the
//! mean squared error between prediction and target embedding.
//!
//! ## Update Order
//!
//! After the loss is known, weights are updated from the output backwards:
//!
//! 1. Output head final layer (last-layer rule, scaled by the semi-final weights)
//! 2. Output head semi-final layer (hidden-layer rule)
//! 3. Feed-forward `W2`, then `W1` (hidden-layer rule)
//! 4. Attention Q/K/V (one clipped scalar for every element)
//!
//! See [`crate::backprop`] for the rules themselves.
//!
//! ## Example
//!
//! ```rust,no_run
//! use quill::{Config, TrainingConfig, Transformer, Vocabulary};
//!
//! let config = Config::demo();
//! let mut vocab = Vocabulary::from_config(&config);
//! vocab.extract_unique_words(&["the cat sat on the mat"]);
//!
//! let mut model = Transformer::new(&config)?;
//! let loss = model.train_step(&vocab, "the cat sat", &TrainingConfig::default())?;
//! # Ok::<(), quill::QuillError>(())
//! ```

use crate::backprop::{mse, ScalarBroadcastRule};
use crate::config::{Config, TrainingConfig};
use crate::error::{QuillError, Result};
use crate::layers::{FeedForward, LayerNorm, OutputHead, SelfAttention};
use crate::positional::add_positional_encoding;
use crate::tensor::Tensor;
use crate::tokenizer::{Vocabulary, UNKNOWN_TOKEN};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use tracing::{debug, warn};

/// Offset added to the configured seed for weight initialisation, so model
/// weights and vocabulary embeddings come from different streams
const WEIGHT_SEED_OFFSET: u64 = 1;

/// The full attention → feed-forward → layer norm → head pipeline
#[derive(Clone, Debug)]
pub struct Transformer {
    pub config: Config,
    pub attention: SelfAttention,
    pub feed_forward: FeedForward,
    pub layer_norm: LayerNorm,
    pub head: OutputHead,
}

impl Transformer {
    /// Create a model with freshly initialised weights
    ///
    /// # Errors
    ///
    /// [`QuillError::InvalidConfig`] if the configuration does not validate,
    /// [`QuillError::Allocation`] if a weight buffer cannot be reserved.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let dim = config.embedding_dim;
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(WEIGHT_SEED_OFFSET));

        let attention = SelfAttention::new(dim, &mut rng);
        let feed_forward = FeedForward::new(dim, config.hidden_dim, dim, &mut rng)?;
        let head = OutputHead::new(dim, dim, &mut rng)?;

        Ok(Self {
            config: config.clone(),
            attention,
            feed_forward,
            layer_norm: LayerNorm::new(config.layer_norm_eps),
            head,
        })
    }

    /// Load every weight of a model saved with [`Transformer::save`]
    pub fn load(dir: &Path, config: &Config) -> Result<Self> {
        config.validate()?;
        let dim = config.embedding_dim;
        Ok(Self {
            config: config.clone(),
            attention: SelfAttention::load(dir, dim)?,
            feed_forward: FeedForward::load(dir, dim, config.hidden_dim, dim)?,
            layer_norm: LayerNorm::new(config.layer_norm_eps),
            head: OutputHead::load(dir, dim, dim)?,
        })
    }

    /// Write every weight under `dir` as one file per value
    pub fn save(&self, dir: &Path) -> Result<()> {
        self.attention.save(dir)?;
        self.feed_forward.save(dir)?;
        self.head.save(dir)
    }

    /// Ids of the words of `sentence` that are in the vocabulary, at most `limit`
    ///
    /// Unknown words are dropped rather than kept as zero rows, so positions
    /// are counted over known words only.
    fn known_ids(vocab: &Vocabulary, sentence: &str, limit: usize) -> Vec<u32> {
        vocab
            .encode(sentence)
            .into_iter()
            .filter(|&id| id != UNKNOWN_TOKEN)
            .take(limit)
            .collect()
    }

    /// Embedding rows for `ids` with positional encoding added
    ///
    /// At most `max_seq_len` ids are used. Unknown ids give zero (padding) rows.
    pub fn input_matrix(&self, vocab: &Vocabulary, ids: &[u32]) -> Tensor {
        let len = ids.len().min(self.config.max_seq_len);
        let mut matrix = vocab.embedding_matrix_for_ids(ids, len);
        add_positional_encoding(&mut matrix);
        matrix
    }

    /// Attention, feed-forward and layer norm over every row
    pub fn forward(&self, x: &Tensor) -> Tensor {
        let attended = self.attention.forward(x);
        let transformed = self.feed_forward.forward_rows(&attended);
        self.layer_norm.forward(&transformed)
    }

    /// Prediction for the word after `sentence`
    ///
    /// Unknown words are skipped, the same way [`Transformer::train_step`]
    /// skips them, and the last known word's position feeds the head. Returns
    /// `None` if no word of the sentence is in the vocabulary.
    pub fn predict(&self, vocab: &Vocabulary, sentence: &str) -> Result<Option<Vec<f32>>> {
        let ids = Self::known_ids(vocab, sentence, self.config.max_seq_len);
        if ids.is_empty() {
            return Ok(None);
        }
        let x = self.input_matrix(vocab, &ids);
        let hidden = self.forward(&x);
        self.head.forward(hidden.row(hidden.rows - 1)).map(Some)
    }

    /// One forward pass and weight update on a single sentence
    ///
    /// # Returns
    ///
    /// The loss before the update, or `None` if the sentence has fewer than two
    /// known words (nothing to predict).
    ///
    /// # Errors
    ///
    /// [`QuillError::ShapeMismatch`] if the vocabulary's embedding width differs
    /// from the model's.
    pub fn train_step(
        &mut self,
        vocab: &Vocabulary,
        sentence: &str,
        training: &TrainingConfig,
    ) -> Result<Option<f32>> {
        if vocab.embedding_dim() != self.config.embedding_dim {
            return Err(QuillError::ShapeMismatch {
                context: "vocabulary embedding width",
                expected: self.config.embedding_dim,
                actual: vocab.embedding_dim(),
            });
        }

        let ids = Self::known_ids(vocab, sentence, self.config.max_seq_len + 1);
        let Some((&target_id, context)) = ids.split_last() else {
            return Ok(None);
        };
        if context.is_empty() {
            return Ok(None);
        }

        let x = self.input_matrix(vocab, context);
        let hidden = self.forward(&x);
        let prediction = self.head.forward(hidden.row(hidden.rows - 1))?;
        let target = vocab.embedding_for_token_id(target_id);
        let loss = mse(&prediction, &target);

        if !loss.is_finite() {
            warn!(loss, sentence, "non-finite loss, skipping update");
            return Ok(Some(loss));
        }

        let lr = training.learning_rate;
        let rule = ScalarBroadcastRule::new(training.clip_threshold);
        rule.update_last_layer(loss, lr, &mut self.head.final_layer, &self.head.semi_final)?;
        rule.update_hidden_layer(loss, lr, &mut self.head.semi_final);
        rule.update_hidden_layer(loss, lr, &mut self.feed_forward.weights2.data);
        rule.update_hidden_layer(loss, lr, &mut self.feed_forward.weights1.data);
        let attention_step =
            self.attention
                .update_weights(loss, lr, training.attention_clip_threshold);

        debug!(
            tokens = context.len(),
            target_id, loss, attention_step, "train step"
        );
        Ok(Some(loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(config: &Config) -> (Transformer, Vocabulary) {
        let mut vocab = Vocabulary::from_config(config);
        vocab.extract_unique_words(&["the cat sat on the mat", "a dog ran"]);
        (Transformer::new(config).unwrap(), vocab)
    }

    #[test]
    fn test_forward_shape() {
        let config = Config::small();
        let (model, vocab) = setup(&config);
        let ids = vocab.encode("the cat sat");
        let x = model.input_matrix(&vocab, &ids);
        assert_eq!((x.rows, x.cols), (3, 64));
        let y = model.forward(&x);
        assert_eq!((y.rows, y.cols), (3, 64));
        assert!(y.data.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_predict() {
        let config = Config::demo();
        let (model, vocab) = setup(&config);
        let prediction = model.predict(&vocab, "the cat").unwrap().unwrap();
        assert_eq!(prediction.len(), 2);
        assert!(model.predict(&vocab, "unknown words only").unwrap().is_none());
    }

    #[test]
    fn test_predict_ignores_unknown_words() {
        let config = Config::demo();
        let (model, vocab) = setup(&config);
        let plain = model.predict(&vocab, "the cat").unwrap().unwrap();
        let with_unknown = model.predict(&vocab, "the stranger cat").unwrap().unwrap();
        assert_eq!(plain, with_unknown);
        assert!(plain.iter().any(|v| v.abs() > 1e-20));

        let trailing = model.predict(&vocab, "the cat zzz").unwrap().unwrap();
        assert_eq!(plain, trailing);
    }

    #[test]
    fn test_train_step_updates_every_component() {
        let config = Config::demo();
        let (mut model, vocab) = setup(&config);
        let before = model.clone();

        let loss = model
            .train_step(&vocab, "the cat sat", &TrainingConfig::default())
            .unwrap()
            .unwrap();
        assert!(loss.is_finite());
        assert!(loss > 0.0);

        assert_ne!(model.head.final_layer, before.head.final_layer);
        assert_ne!(model.head.semi_final, before.head.semi_final);
        assert_ne!(model.feed_forward.weights1, before.feed_forward.weights1);
        assert_ne!(model.feed_forward.weights2, before.feed_forward.weights2);
        assert_ne!(model.attention.w_query, before.attention.w_query);
        // biases are not trained
        assert_eq!(model.feed_forward.bias2, before.feed_forward.bias2);
    }

    #[test]
    fn test_train_step_skips_short_sentences() {
        let config = Config::demo();
        let (mut model, vocab) = setup(&config);
        let training = TrainingConfig::default();
        assert_eq!(model.train_step(&vocab, "cat", &training).unwrap(), None);
        assert_eq!(model.train_step(&vocab, "", &training).unwrap(), None);
        assert_eq!(
            model.train_step(&vocab, "cat unseenword", &training).unwrap(),
            None
        );
    }

    #[test]
    fn test_mismatched_vocabulary_width() {
        let (mut model, _) = setup(&Config::demo());
        let mut wide = Vocabulary::from_config(&Config::small());
        wide.extract_unique_words(&["the cat sat"]);
        let err = model
            .train_step(&wide, "the cat sat", &TrainingConfig::default())
            .unwrap_err();
        assert!(matches!(err, QuillError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::demo();
        let (model, vocab) = setup(&config);
        model.save(dir.path()).unwrap();

        let loaded = Transformer::load(dir.path(), &config).unwrap();
        let a = model.predict(&vocab, "the cat").unwrap().unwrap();
        let b = loaded.predict(&vocab, "the cat").unwrap().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-3);
        }
    }

    #[test]
    fn test_same_seed_same_model() {
        let config = Config::demo();
        let a = Transformer::new(&config).unwrap();
        let b = Transformer::new(&config).unwrap();
        assert_eq!(a.attention, b.attention);
        assert_eq!(a.head, b.head);
    }
}
