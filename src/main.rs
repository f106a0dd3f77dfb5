use std::{fs, path::PathBuf, time::Instant};

use anyhow::Context;
use clap::Parser;
use nutrilabel::{parse_label, ParserOptions, TextBox, MIN_VALID_SCORE};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Parses recognised label text into nutrition facts.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON array of text fragments with normalised bounds
    fragments: PathBuf,
    /// Facts plus serving size needed to accept a label
    #[arg(long, default_value_t = MIN_VALID_SCORE)]
    min_score: usize,
    /// Print one "item: amount" line per fact instead of JSON
    #[arg(long)]
    plain: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let json = fs::read_to_string(&args.fragments)
        .with_context(|| format!("Failed to read {}", args.fragments.display()))?;
    let fragments: Vec<TextBox> =
        serde_json::from_str(&json).context("Fragments are not a JSON array of text boxes")?;

    let options = ParserOptions {
        min_valid_score: args.min_score,
        ..ParserOptions::default()
    };
    let start = Instant::now();
    let label = parse_label(&fragments, &options)?;
    log::debug!("{:?}", start.elapsed());

    match label {
        Some(label) if args.plain => {
            for (item, amount) in label.formatted_facts() {
                println!("{item:?}: {amount}");
            }
        }
        Some(label) => println!("{}", serde_json::to_string_pretty(&label)?),
        None => println!("no label found"),
    }
    Ok(())
}
