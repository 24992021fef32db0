//! Training Loop
//!
//! Runs [`Transformer::train_step`] over every sentence, once per epoch, and
//! reports the mean loss of each epoch.
//!
//! ```text
//! Epoch    1 | Loss: 412.3051 | Steps:   12 | Time:    0.0s
//! Epoch    2 | Loss: 398.7710 | Steps:   12 | Time:    0.0s
//! ...
//! ```
//!
//! Sentences with fewer than two known words produce no step and do not count
//! toward the mean. An epoch without a single step has a mean loss of zero.
//!
//! ## Example
//!
//! ```rust,no_run
//! use quill::{train, Config, TrainingConfig, Transformer, Vocabulary};
//!
//! let config = Config::demo();
//! let sentences = vec!["the cat sat on the mat".to_string()];
//! let mut vocab = Vocabulary::from_config(&config);
//! vocab.extract_unique_words(&sentences);
//!
//! let mut model = Transformer::new(&config)?;
//! let losses = train(&mut model, &vocab, &sentences, &TrainingConfig::tiny(), None)?;
//! # Ok::<(), quill::QuillError>(())
//! ```

use crate::config::TrainingConfig;
use crate::error::Result;
use crate::model::Transformer;
use crate::tokenizer::Vocabulary;
use crate::training_logger::TrainingLogger;
use std::time::Instant;
use tracing::info;

/// Train `model` on `sentences` for `training.epochs` epochs
///
/// # Arguments
///
/// * `model` - Model to update in place
/// * `vocab` - Vocabulary the sentences were extracted into
/// * `sentences` - Training sentences
/// * `training` - Learning rate, epochs, clipping and reporting interval
/// * `logger` - Optional CSV logger, one row per epoch
///
/// # Returns
///
/// Mean loss of every epoch
pub fn train<S: AsRef<str>>(
    model: &mut Transformer,
    vocab: &Vocabulary,
    sentences: &[S],
    training: &TrainingConfig,
    mut logger: Option<&mut TrainingLogger>,
) -> Result<Vec<f32>> {
    let start = Instant::now();
    let print_every = training.print_every.max(1);
    let mut epoch_losses = Vec::with_capacity(training.epochs);

    info!(
        sentences = sentences.len(),
        epochs = training.epochs,
        learning_rate = training.learning_rate,
        "starting training"
    );

    for epoch in 1..=training.epochs {
        let mut total = 0.0;
        let mut steps = 0usize;
        for sentence in sentences {
            if let Some(loss) = model.train_step(vocab, sentence.as_ref(), training)? {
                total += loss;
                steps += 1;
            }
        }
        let mean = if steps > 0 { total / steps as f32 } else { 0.0 };
        epoch_losses.push(mean);

        if let Some(logger) = logger.as_deref_mut() {
            logger.log(epoch, training.learning_rate, mean)?;
        }
        info!(epoch, loss = mean, steps, "epoch complete");
        if epoch % print_every == 0 || epoch == training.epochs {
            println!(
                "Epoch {:4} | Loss: {:.4} | Steps: {:4} | Time: {:6.1}s",
                epoch,
                mean,
                steps,
                start.elapsed().as_secs_f32()
            );
        }
    }

    Ok(epoch_losses)
}
