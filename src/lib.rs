//! Quill: A Small Transformer Pipeline From First Principles
//!
//! A word tokenizer, sinusoidal positional encoding, single-head
//! self-attention, a feed-forward network and layer normalisation, trained
//! with a deliberately simple clipped update rule. Everything is written out
//! by hand so each step of the pipeline can be read in one place.
//!
//! # Modules
//!
//! - [`tokenizer`] - Hash-table vocabulary and token embeddings
//! - [`positional`] - Sinusoidal positional encoding
//! - [`layers`] - Attention, feed-forward, activation and layer norm
//! - [`backprop`] - Loss, gradient clipping and the scalar-broadcast update rule
//! - [`model`] - The composed pipeline and its training step
//! - [`train`] - Epoch loop
//! - [`text`], [`preprocess`], [`weights`] - Input text, scaling and weight files
//!
//! # Example
//!
//! ```rust,no_run
//! use quill::{text, Config, TrainingConfig, Transformer, Vocabulary};
//!
//! let raw = text::read_text("corpus.txt")?;
//! let sentences = text::split_sentences(&raw);
//!
//! let config = Config::demo();
//! let mut vocab = Vocabulary::from_config(&config);
//! vocab.extract_unique_words(&sentences);
//! println!("{vocab}");
//!
//! let mut model = Transformer::new(&config)?;
//! let losses = quill::train(&mut model, &vocab, &sentences, &TrainingConfig::default(), None)?;
//! # Ok::<(), quill::QuillError>(())
//! ```

pub mod backprop;
pub mod config;
pub mod error;
pub mod layers;
pub mod model;
pub mod positional;
pub mod preprocess;
pub mod tensor;
pub mod text;
pub mod tokenizer;
pub mod train;
pub mod training_logger;
pub mod weights;

// Re-export main types for convenience
pub use backprop::{clip_gradient, mse, ScalarBroadcastRule};
pub use config::{Config, EmbeddingInit, TrainingConfig};
pub use error::{QuillError, Result};
pub use model::Transformer;
pub use positional::{add_positional_encoding, positional_encoding};
pub use tensor::Tensor;
pub use tokenizer::{Vocabulary, VocabularyEntry, UNKNOWN_TOKEN};
pub use train::train;
pub use training_logger::TrainingLogger;
