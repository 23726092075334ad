use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead};
use std::path::PathBuf;

use chordmatch_server::assembler::{assemble, AssembledResult};
use chordmatch_server::corpus::{SongId, SqliteCorpusSource};
use chordmatch_server::similarity::{CorpusContext, SimilaritySettings};

fn parse_db_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s).canonicalize()?;
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite corpus database file.
    #[clap(value_parser = parse_db_path)]
    pub db_path: PathBuf,

    /// Key every progression is normalized into.
    #[clap(long, default_value = "C")]
    pub reference_key: String,

    /// Number of matches to print per query.
    #[clap(long, default_value_t = 10)]
    pub limit: usize,
}

fn print_result(result: &AssembledResult) {
    for warning in &result.warnings {
        println!(
            "  warning: unrecognized token {:?} at {}",
            warning.token, warning.position
        );
    }
    if result.rows.is_empty() {
        println!("No matches found.");
        return;
    }
    for row in &result.rows {
        println!(
            "{:.3} {} - {} [{}, +{}] -> {}",
            row.score, row.artist, row.title, row.matched_key, row.transposition, row.id,
        );
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let reference = cli_args
        .reference_key
        .parse()
        .with_context(|| format!("Invalid reference key {:?}", cli_args.reference_key))?;
    let settings = SimilaritySettings::default();

    println!("Cli Similar loading corpus at {}...", cli_args.db_path.display());
    let source = SqliteCorpusSource::new(&cli_args.db_path);
    let context = CorpusContext::load(&source, None, reference, settings.collapse_repeats)?;
    println!("Done! {} songs indexed.", context.index.len());

    let stdin = io::stdin();
    loop {
        println!("Enter a song id or a chord progression:");

        let mut user_input = String::new();
        if stdin
            .lock()
            .read_line(&mut user_input)
            .context("Failed to read line")?
            == 0
        {
            return Ok(());
        }
        let user_input = user_input.trim();
        if user_input.is_empty() {
            continue;
        }

        let limit = Some(cli_args.limit);
        let outcome = match user_input.parse::<SongId>() {
            Ok(song_id) => context.similar_by_existing(song_id, limit, &settings),
            Err(_) => context
                .similar_by_chords(user_input, None, limit, &settings)
                .map(|(result, key)| {
                    println!("Detected key {}", key);
                    result
                }),
        };

        match outcome {
            Ok(result) => print_result(&assemble(&context.corpus, result)),
            Err(err) => println!("Error: {}", err),
        }
        println!("\n");
    }
}
