use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use anyhow::{Context, Result};
use clap::Parser;
use fastchunk::{
    run, CharTokenizer, Chunker, ChunkerConfig, Cl100kTokenizer, Cli, RunOptions, RunSummary,
    TokenizerKind,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FASTCHUNK_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.build_config().context("invalid chunking configuration")?;
    let options = RunOptions {
        workers: cli.workers,
        id_namespace: cli.id_namespace,
        progress_every: cli.progress_every,
    };
    options.validate().context("invalid run options")?;

    let summary = match cli.tokenizer {
        TokenizerKind::Cl100k => {
            let tokenizer = Cl100kTokenizer::new().context("failed to load cl100k_base")?;
            chunk_file(&cli, config, tokenizer, &options)?
        }
        TokenizerKind::Chars => chunk_file(&cli, config, CharTokenizer, &options)?,
    };

    println!(
        "{} documents chunked, {} skipped, {} chunks written to {}",
        summary.documents,
        summary.skipped,
        summary.chunks,
        cli.output.display()
    );
    Ok(())
}

fn chunk_file<T: fastchunk::Tokenizer>(
    cli: &Cli,
    config: ChunkerConfig,
    tokenizer: T,
    options: &RunOptions,
) -> Result<RunSummary> {
    let chunker = Chunker::new(config, tokenizer);
    let input = File::open(&cli.input).with_context(|| format!("failed to open {:?}", cli.input))?;
    let output =
        File::create(&cli.output).with_context(|| format!("failed to create {:?}", cli.output))?;
    let mut writer = BufWriter::new(output);

    let summary = run(BufReader::new(input), &mut writer, &chunker, options)
        .with_context(|| format!("chunking {:?} failed", cli.input))?;
    writer.flush()?;
    Ok(summary)
}
