//! Train the Pipeline on a Text File
//!
//! Splits a text file into sentences, builds the vocabulary, and runs the
//! training loop, printing the mean loss per epoch.
//!
//! ## Usage
//!
//! ```bash
//! # 2-dimensional illustrative configuration
//! cargo run --release --example train -- --data corpus.txt --preset demo
//!
//! # Override preset parameters
//! cargo run --release --example train -- --data corpus.txt --preset small --epochs 50 --lr 0.005
//!
//! # Resume from saved weights and write them back with a CSV log
//! cargo run --release --example train -- --data corpus.txt --preset demo \
//!     --load-weights weights --save-weights weights --log train.csv
//!
//! # Verbose per-step logging
//! RUST_LOG=quill=debug cargo run --release --example train -- --data corpus.txt
//! ```

use clap::Parser;
use quill::{text, Config, TrainingConfig, TrainingLogger, Transformer, Vocabulary};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "train", about = "Train the transformer pipeline on a text file")]
struct Args {
    /// Path to training text file
    #[arg(long)]
    data: PathBuf,

    /// Named configuration: demo, small or full
    #[arg(long, default_value = "demo")]
    preset: String,

    /// Load the architecture from a JSON file instead of a preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Embedding dimension
    #[arg(long)]
    embd: Option<usize>,

    /// Feed-forward hidden dimension
    #[arg(long)]
    hidden: Option<usize>,

    /// Maximum sentence length in tokens
    #[arg(long)]
    context: Option<usize>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    // Training parameters
    /// Number of epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Learning rate
    #[arg(long)]
    lr: Option<f32>,

    /// Gradient clipping threshold
    #[arg(long)]
    clip: Option<f32>,

    /// Print a summary every N epochs
    #[arg(long)]
    print_every: Option<usize>,

    // Weights and logs
    /// Directory to load weight files from
    #[arg(long)]
    load_weights: Option<PathBuf>,

    /// Directory to write weight files to after training
    #[arg(long)]
    save_weights: Option<PathBuf>,

    /// CSV file for per-epoch losses
    #[arg(long)]
    log: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // ========================================================================
    // Resolve configuration from preset + CLI overrides
    // ========================================================================
    let mut config = match args.config {
        Some(ref path) => Config::load(path)?,
        None => Config::preset(&args.preset).ok_or_else(|| {
            format!(
                "Unknown preset '{}'. Available: demo, small, full.",
                args.preset
            )
        })?,
    };
    if let Some(embd) = args.embd {
        config.embedding_dim = embd;
    }
    if let Some(hidden) = args.hidden {
        config.hidden_dim = hidden;
    }
    if let Some(context) = args.context {
        config.max_seq_len = context;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate()?;

    let mut training = TrainingConfig::default();
    if let Some(epochs) = args.epochs {
        training.epochs = epochs;
    }
    if let Some(lr) = args.lr {
        training.learning_rate = lr;
    }
    if let Some(clip) = args.clip {
        training.clip_threshold = clip;
    }
    if let Some(print_every) = args.print_every {
        training.print_every = print_every;
    }

    println!("\n{}", "=".repeat(70));
    println!("  Training — preset: {}", args.preset);
    println!("{}", "=".repeat(70));
    println!();
    println!("Embedding dim: {}", config.embedding_dim);
    println!("Hidden dim:    {}", config.hidden_dim);
    println!("Max seq len:   {}", config.max_seq_len);
    println!("Epochs:        {}", training.epochs);
    println!("Learning rate: {}", training.learning_rate);

    // ========================================================================
    // 1. Load Training Data
    // ========================================================================
    println!("\n{}", "=".repeat(70));
    println!("1. Loading Training Data");
    println!("{}", "=".repeat(70));
    println!();

    let raw = text::read_text(&args.data)?;
    let sentences: Vec<String> = text::split_sentences(&raw)
        .iter()
        .map(|s| text::clean_text(s))
        .filter(|s| !s.trim().is_empty())
        .collect();
    println!(
        "Loaded: {} ({} characters, {} sentences)",
        args.data.display(),
        raw.chars().count(),
        sentences.len()
    );

    // ========================================================================
    // 2. Vocabulary
    // ========================================================================
    println!("\n{}", "=".repeat(70));
    println!("2. Vocabulary");
    println!("{}", "=".repeat(70));
    println!();

    let mut vocab = Vocabulary::from_config(&config);
    let added = vocab.extract_unique_words(&sentences);
    println!("Unique words: {added}");

    // ========================================================================
    // 3. Model
    // ========================================================================
    println!("\n{}", "=".repeat(70));
    println!("3. Model");
    println!("{}", "=".repeat(70));
    println!();

    let mut model = match args.load_weights {
        Some(ref dir) => {
            println!("Loading weights from {}", dir.display());
            Transformer::load(dir, &config)?
        }
        None => Transformer::new(&config)?,
    };

    // ========================================================================
    // 4. Train
    // ========================================================================
    println!("\n{}", "=".repeat(70));
    println!("4. Training");
    println!("{}", "=".repeat(70));
    println!();

    let mut logger = match args.log {
        Some(ref path) => Some(TrainingLogger::new(path)?),
        None => None,
    };
    let losses = quill::train(&mut model, &vocab, &sentences, &training, logger.as_mut())?;

    if let (Some(first), Some(last)) = (losses.first(), losses.last()) {
        println!("\nLoss: {first:.4} → {last:.4}");
    }

    if let Some(ref dir) = args.save_weights {
        model.save(dir)?;
        println!("Saved weights to {}", dir.display());
    }

    Ok(())
}
