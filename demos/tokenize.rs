//! Vocabulary Report for a Text File
//!
//! Splits a text file into sentences, builds the hash-table vocabulary and
//! prints every word with its token id and embedding, followed by the first
//! sentence's embedding matrix with positional encoding added.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --example tokenize -- corpus.txt
//! cargo run --example tokenize -- corpus.txt --preset small --scale
//! ```

use clap::Parser;
use quill::{add_positional_encoding, preprocess, text, Config, Vocabulary};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tokenize", about = "Print the vocabulary built from a text file")]
struct Args {
    /// Path to the text file
    data: PathBuf,

    /// Named configuration: demo, small or full
    #[arg(long, default_value = "demo")]
    preset: String,

    /// Scale the sample embedding matrix to [-1, 1] before printing
    #[arg(long)]
    scale: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::preset(&args.preset)
        .ok_or_else(|| format!("Unknown preset '{}'", args.preset))?;

    let raw = text::read_text(&args.data)?;
    let sentences = text::split_sentences(&raw);
    println!("Sentences: {}\n", sentences.len());

    let mut vocab = Vocabulary::from_config(&config);
    vocab.extract_unique_words(&sentences);
    println!("{vocab}");
    println!("Unique words: {}", vocab.len());

    let Some(first) = sentences.first() else {
        return Ok(());
    };
    let len = vocab.encode(first).len().min(config.max_seq_len);
    let mut matrix = vocab.embedding_matrix(first, len);
    add_positional_encoding(&mut matrix);
    if args.scale {
        preprocess::scale_to_unit_range(&mut matrix);
    }

    println!("\nEmbedding matrix for \"{first}\":");
    for i in 0..matrix.rows {
        let values: Vec<String> = matrix.row(i).iter().map(|v| format!("{v:8.4}")).collect();
        println!("  {:3}: [{}]", i, values.join(", "));
    }
    println!(
        "Meaningful span: {} of {} values",
        preprocess::meaningful_length(&matrix.data),
        matrix.data.len()
    );

    Ok(())
}
