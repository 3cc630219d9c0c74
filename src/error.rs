//! Unified pipeline error
//!
//! Stage-local errors stay precise (`CodecError`, `TokenizerError`,
//! `StructureError`); a fused pipeline needs one item error type, and the
//! variants keep codec failure ("corrupt archive") distinguishable from
//! structural failure ("unexpected record shape").

use crate::assembler::StructureError;
use crate::codec::CodecError;
use crate::tokenizer::TokenizerError;

/// Any failure a fused pipeline can surface.
///
/// None of these are retried internally; a pipeline instance that yielded an
/// error is finished and must be discarded.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    #[error("structure error: {0}")]
    Structure(#[from] StructureError),
}
