//! # dumpstream - Streaming Record Extraction from Compressed XML Dumps
//!
//! `dumpstream` turns a raw byte stream holding a large, optionally
//! zlib-compressed XML dump into a lazy sequence of structured records,
//! without ever materializing the input. It is built as a chain of small,
//! composable iterator adapters, fused into a single demand-driven pull
//! chain:
//!
//! ```text
//! byte source → flatten → chunk → [zlib codec] → tokenize → assemble
//! ```
//!
//! ## Design
//!
//! - **Pull everywhere**: every stage is an `Iterator`; a pull propagates
//!   upstream and each stage requests only what its next output unit needs.
//! - **Push bridged once**: the SAX tokenizer is push-based (it invokes a
//!   callback while being fed); [`tokens`] buffers one invocation's tokens
//!   and replays them, the single push-to-pull conversion in the pipeline.
//! - **Tolerant outside, strict inside**: unknown structure around and inside
//!   records is skipped; the known record grammar (one title, one id) is
//!   validated and violations abort the stream with a tagged error.
//! - **Deterministic teardown**: dropping the record iterator releases the
//!   source handle, codec session and tokenizer, even mid-stream.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dumpstream::pipeline::DumpReader;
//!
//! let mut count = 0usize;
//! for record in DumpReader::open("enwik8.zlib")? {
//!     let record = record?;
//!     println!("{}\t{}", record.title, record.id);
//!     count += 1;
//! }
//! println!("{count} records");
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Stages can also be composed by hand via [`pipeline::PipelineExt`]:
//!
//! ```rust
//! use std::io::Cursor;
//! use dumpstream::pipeline::PipelineExt;
//! use dumpstream::source::ByteRuns;
//!
//! let doc = "<w><record><title>Earth</title><id>9</id></record></w>";
//! let records: Vec<_> = ByteRuns::new(Cursor::new(doc))
//!     .flatten_runs()
//!     .chunked(16)
//!     .tokens()
//!     .records()
//!     .collect::<Result<_, _>>()?;
//! assert_eq!(records[0].title, "Earth");
//! # Ok::<(), dumpstream::error::PipelineError>(())
//! ```
//!
//! ## Modules
//!
//! - [`source`]: byte-run source over any reader
//! - [`chunk`]: fixed-size chunk aggregation
//! - [`flatten`]: container-to-element flattening
//! - [`codec`]: incremental zlib sessions and the codec stage
//! - [`tokenizer`]: the token type and the incremental SAX tokenizer
//! - [`tokens`]: push-to-pull token adaptation
//! - [`assembler`]: recursive-descent record assembly
//! - [`pipeline`]: stage fusion and convenience constructors
//! - [`error`]: the unified pipeline error

#![warn(missing_docs)]

pub mod assembler;
pub mod chunk;
pub mod codec;
pub mod error;
pub mod flatten;
pub mod pipeline;
pub mod source;
pub mod tokenizer;
pub mod tokens;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::assembler::{Record, RecordTags, Records, StructureError};
    pub use crate::chunk::Chunks;
    pub use crate::codec::{CodecError, CodedChunks, IncrementalCodec, Mode};
    pub use crate::error::PipelineError;
    pub use crate::flatten::Flatten;
    pub use crate::pipeline::{DumpReader, PipelineConfig, PipelineExt};
    pub use crate::source::ByteRuns;
    pub use crate::tokenizer::{PushTokenizer, SaxTokenizer, Token, TokenizerError};
    pub use crate::tokens::Tokens;
}
