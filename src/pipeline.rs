//! Pipeline fusion
//!
//! Fluent composition of the stages into one demand-driven pull chain, plus
//! convenience constructors for the common case of reading records straight
//! out of a dump file:
//!
//! ```rust,no_run
//! use dumpstream::pipeline::DumpReader;
//!
//! for record in DumpReader::open("dump.xml.zlib")? {
//!     let record = record?;
//!     println!("{}\t{}", record.title, record.id);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Every stage pulls from its upstream only what the next output unit needs;
//! dropping the iterator releases the file handle, codec session and
//! tokenizer at once.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::assembler::{RecordTags, Records};
use crate::chunk::Chunks;
use crate::codec::{CodedChunks, IncrementalCodec, Mode, BUFFER_SIZE};
use crate::error::PipelineError;
use crate::flatten::Flatten;
use crate::source::ByteRuns;
use crate::tokenizer::{PushTokenizer, SaxTokenizer, Token};
use crate::tokens::Tokens;

/// Fluent constructors for the pipeline stages.
///
/// Each method wraps `self` in the corresponding stage; the result is again
/// an iterator, so stages chain the way the data flows.
pub trait PipelineExt: Iterator + Sized {
    /// Regroup a byte sequence into fixed-size chunks ([`Chunks`]).
    fn chunked<E>(self, size: usize) -> Chunks<Self>
    where
        Self: Iterator<Item = Result<u8, E>>,
    {
        Chunks::new(self, size)
    }

    /// Flatten a sequence of containers into their elements ([`Flatten`]).
    fn flatten_runs<C, E>(self) -> Flatten<Self, C>
    where
        Self: Iterator<Item = Result<C, E>>,
        C: IntoIterator,
    {
        Flatten::new(self)
    }

    /// Run chunks through a fresh zlib compression session ([`CodedChunks`]).
    fn compressed<E>(self) -> CodedChunks<Self>
    where
        Self: Iterator<Item = Result<Vec<u8>, E>>,
    {
        CodedChunks::new(self, IncrementalCodec::new(Mode::Compress))
    }

    /// Run chunks through a fresh zlib decompression session
    /// ([`CodedChunks`]).
    fn decompressed<E>(self) -> CodedChunks<Self>
    where
        Self: Iterator<Item = Result<Vec<u8>, E>>,
    {
        CodedChunks::new(self, IncrementalCodec::new(Mode::Decompress))
    }

    /// Tokenize chunks with the default SAX tokenizer ([`Tokens`]).
    fn tokens<E>(self) -> Tokens<Self>
    where
        Self: Iterator<Item = Result<Vec<u8>, E>>,
    {
        Tokens::new(self, SaxTokenizer::new())
    }

    /// Tokenize chunks with a caller-supplied tokenizer ([`Tokens`]).
    fn tokens_with<T, E>(self, tokenizer: T) -> Tokens<Self, T>
    where
        Self: Iterator<Item = Result<Vec<u8>, E>>,
        T: PushTokenizer,
    {
        Tokens::new(self, tokenizer)
    }

    /// Assemble records with the default element names ([`Records`]).
    fn records<E>(self) -> Records<Self>
    where
        Self: Iterator<Item = Result<Token, E>>,
    {
        Records::new(self)
    }

    /// Assemble records with custom element names ([`Records`]).
    fn records_with<E>(self, tags: RecordTags) -> Records<Self>
    where
        Self: Iterator<Item = Result<Token, E>>,
    {
        Records::with_tags(self, tags)
    }
}

impl<I: Iterator> PipelineExt for I {}

/// Knobs for the convenience constructors.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Size of the chunks fed to the codec and tokenizer.
    pub chunk_size: usize,
    /// Size of the runs read from the byte source.
    pub run_size: usize,
    /// Element names of the record grammar.
    pub tags: RecordTags,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: BUFFER_SIZE,
            run_size: crate::source::RUN_SIZE,
            tags: RecordTags::default(),
        }
    }
}

/// Chunked byte stream out of a reader.
type ByteStream<R> = Chunks<Flatten<ByteRuns<R>, Vec<u8>>>;

/// Record iterator over an uncompressed dump.
pub type PlainRecords<R> = Records<Tokens<ByteStream<R>>>;

/// Record iterator over a zlib-compressed dump.
pub type ZlibRecords<R> = Records<Tokens<CodedChunks<ByteStream<R>>>>;

/// Convenience constructors assembling the full pipeline.
pub struct DumpReader;

impl DumpReader {
    /// Stream records out of a zlib-compressed dump file.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<ZlibRecords<BufReader<File>>> {
        let file = File::open(path.as_ref())?;
        Ok(Self::from_reader(BufReader::with_capacity(64 * 1024, file)))
    }

    /// Stream records out of an uncompressed dump file.
    pub fn open_plain<P: AsRef<Path>>(path: P) -> io::Result<PlainRecords<BufReader<File>>> {
        let file = File::open(path.as_ref())?;
        Ok(Self::from_plain_reader(BufReader::with_capacity(
            64 * 1024,
            file,
        )))
    }

    /// Stream records out of any zlib-compressed byte source.
    pub fn from_reader<R: Read>(reader: R) -> ZlibRecords<R> {
        Self::from_reader_with(reader, PipelineConfig::default())
    }

    /// Stream records out of any zlib-compressed byte source, with explicit
    /// configuration.
    pub fn from_reader_with<R: Read>(reader: R, config: PipelineConfig) -> ZlibRecords<R> {
        byte_stream(reader, &config)
            .decompressed()
            .tokens()
            .records_with(config.tags)
    }

    /// Stream records out of any uncompressed byte source.
    pub fn from_plain_reader<R: Read>(reader: R) -> PlainRecords<R> {
        Self::from_plain_reader_with(reader, PipelineConfig::default())
    }

    /// Stream records out of any uncompressed byte source, with explicit
    /// configuration.
    pub fn from_plain_reader_with<R: Read>(reader: R, config: PipelineConfig) -> PlainRecords<R> {
        byte_stream(reader, &config)
            .tokens()
            .records_with(config.tags)
    }
}

fn byte_stream<R: Read>(reader: R, config: &PipelineConfig) -> ByteStream<R> {
    ByteRuns::with_run_size(reader, config.run_size)
        .flatten_runs()
        .chunked(config.chunk_size)
}

/// Compress a byte source into a zlib stream, chunk by chunk.
///
/// The counterpart of [`DumpReader`]: how compressed dump fixtures are made.
pub fn compress_reader<R: Read>(
    reader: R,
    chunk_size: usize,
) -> impl Iterator<Item = Result<Vec<u8>, PipelineError>> {
    ByteRuns::new(reader)
        .flatten_runs()
        .chunked(chunk_size)
        .compressed()
}
