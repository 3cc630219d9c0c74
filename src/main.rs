//! # dumpstream CLI
//!
//! Command-line shell over the streaming pipeline.
//!
//! ## Usage
//!
//! ```bash
//! # Stream records out of a zlib-compressed dump
//! dumpstream extract enwik8.zlib
//!
//! # Uncompressed input, Wikipedia-style element names
//! dumpstream extract --plain --record-tag page dump.xml
//!
//! # Produce a compressed dump (how fixtures are made)
//! dumpstream compress dump.xml dump.xml.zlib
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use dumpstream::assembler::RecordTags;
use dumpstream::pipeline::{compress_reader, DumpReader, PipelineConfig};

/// dumpstream - Streaming record extraction from compressed XML dumps
#[derive(Parser)]
#[command(name = "dumpstream")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream records out of a dump to stdout, one "title<TAB>id" per line
    Extract {
        /// Input dump file (zlib-compressed unless --plain)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Input is uncompressed XML
        #[arg(long)]
        plain: bool,

        /// Chunk size in bytes for the codec and tokenizer stages
        #[arg(short = 'c', long, default_value = "32768")]
        chunk_size: usize,

        /// Stop after this many records
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Element name delimiting one record
        #[arg(long, default_value = "record")]
        record_tag: String,

        /// Element name of the title child
        #[arg(long, default_value = "title")]
        title_tag: String,

        /// Element name of the id child
        #[arg(long, default_value = "id")]
        id_tag: String,
    },

    /// Compress a plain dump into a zlib stream
    Compress {
        /// Input file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Chunk size in bytes fed to the compressor
        #[arg(short = 'c', long, default_value = "32768")]
        chunk_size: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Extract {
            input,
            plain,
            chunk_size,
            limit,
            record_tag,
            title_tag,
            id_tag,
        } => extract(
            input,
            plain,
            PipelineConfig {
                chunk_size,
                tags: RecordTags {
                    record: record_tag,
                    title: title_tag,
                    id: id_tag,
                },
                ..PipelineConfig::default()
            },
            limit,
        ),
        Commands::Compress {
            input,
            output,
            chunk_size,
        } => compress(input, output, chunk_size),
    }
}

fn extract(
    input: PathBuf,
    plain: bool,
    config: PipelineConfig,
    limit: Option<usize>,
) -> Result<()> {
    let file = File::open(&input).with_context(|| format!("opening {}", input.display()))?;
    let start = Instant::now();

    let records: Box<dyn Iterator<Item = _>> = if plain {
        Box::new(DumpReader::from_plain_reader_with(file, config))
    } else {
        Box::new(DumpReader::from_reader_with(file, config))
    };

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut count = 0usize;
    for record in records {
        let record = record.with_context(|| format!("extracting from {}", input.display()))?;
        writeln!(out, "{}\t{}", record.title, record.id)?;
        count += 1;
        if limit.is_some_and(|n| count >= n) {
            break;
        }
    }
    out.flush()?;

    info!(
        "extracted {} records from {} in {:.2?}",
        count,
        input.display(),
        start.elapsed()
    );
    Ok(())
}

fn compress(input: PathBuf, output: PathBuf, chunk_size: usize) -> Result<()> {
    let file = File::open(&input).with_context(|| format!("opening {}", input.display()))?;
    let out_file =
        File::create(&output).with_context(|| format!("creating {}", output.display()))?;
    let mut out = BufWriter::new(out_file);
    let start = Instant::now();

    let mut written = 0u64;
    for chunk in compress_reader(file, chunk_size) {
        let chunk = chunk.with_context(|| format!("compressing {}", input.display()))?;
        out.write_all(&chunk)?;
        written += chunk.len() as u64;
    }
    out.flush()?;

    info!(
        "wrote {} compressed bytes to {} in {:.2?}",
        written,
        output.display(),
        start.elapsed()
    );
    Ok(())
}
