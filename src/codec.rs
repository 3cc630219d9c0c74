//! Incremental zlib codec
//!
//! Wraps flate2's stateful [`Compress`]/[`Decompress`] sessions behind the
//! buffering protocol the pipeline needs: undigested input accumulates in
//! front of the session, each step writes into a fixed output buffer, and the
//! session is drained for as long as a step fills that buffer completely.
//! Losing the drain loop would silently drop output that lands exactly on the
//! buffer boundary; draining unconditionally would busy-loop when the session
//! has nothing more to give. See [`IncrementalCodec::feed`].

use std::collections::VecDeque;

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::error::PipelineError;

/// Default size of the fixed output buffer, and the conventional chunk size
/// for feeding the codec.
pub const BUFFER_SIZE: usize = 32 * 1024;

/// Direction of a codec session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Produce a zlib stream from raw bytes.
    Compress,
    /// Recover raw bytes from a zlib stream.
    Decompress,
}

/// Errors surfaced by the codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("compression step failed: {0}")]
    Compress(#[from] flate2::CompressError),

    #[error("decompression step failed: {0}")]
    Decompress(#[from] flate2::DecompressError),

    #[error("input ended before the codec stream was complete")]
    TruncatedStream,
}

enum Session {
    Compress(Compress),
    Decompress(Decompress),
}

/// A stateful zlib session with chunked feed and explicit finalization.
///
/// Input handed to [`feed`](Self::feed) that the session does not consume
/// immediately is kept in an undigested buffer and offered again on the next
/// step. [`finish`](Self::finish) must be called exactly once, after the last
/// `feed`, to flush whatever the session still holds. A session that has
/// reported an error is unusable and must be discarded.
pub struct IncrementalCodec {
    session: Session,
    /// Input bytes not yet consumed by a codec step.
    pending: Vec<u8>,
    /// Fixed-capacity scratch buffer each step writes into.
    out: Vec<u8>,
    /// Set once the session reports end of stream; later input is ignored.
    done: bool,
}

impl IncrementalCodec {
    /// Create a codec session with the default output buffer size.
    pub fn new(mode: Mode) -> Self {
        Self::with_buffer_size(mode, BUFFER_SIZE)
    }

    /// Create a codec session with an explicit output buffer size.
    ///
    /// # Panics
    /// Panics if `buffer_size` is zero.
    pub fn with_buffer_size(mode: Mode, buffer_size: usize) -> Self {
        assert!(buffer_size > 0, "codec output buffer must be at least 1 byte");
        let session = match mode {
            Mode::Compress => Session::Compress(Compress::new(Compression::default(), true)),
            Mode::Decompress => Session::Decompress(Decompress::new(true)),
        };
        Self {
            session,
            pending: Vec::new(),
            out: vec![0; buffer_size],
            done: false,
        }
    }

    /// Feed one input chunk, returning every output chunk that became ready.
    ///
    /// The session is stepped repeatedly while a step both succeeds and fills
    /// the output buffer completely; each non-empty buffer is emitted as one
    /// produced chunk and the buffer is reset. Input the session did not
    /// consume stays in the undigested buffer for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, CodecError> {
        if self.done {
            return Ok(Vec::new());
        }
        self.pending.extend_from_slice(chunk);
        self.drain(false)
    }

    /// Finalize the session after the last `feed`, returning any remaining
    /// output (possibly empty).
    pub fn finish(&mut self) -> Result<Vec<u8>, CodecError> {
        if self.done {
            return Ok(Vec::new());
        }
        if self.pending.is_empty() && self.total_in() == 0 {
            // Nothing was ever fed. A decompressor has no stream to complete;
            // a compressor still owes the (empty) stream framing.
            if let Session::Decompress(_) = self.session {
                self.done = true;
                return Ok(Vec::new());
            }
        }
        let chunks = self.drain(true)?;
        Ok(chunks.concat())
    }

    /// Total bytes the underlying session has consumed so far.
    fn total_in(&self) -> u64 {
        match &self.session {
            Session::Compress(c) => c.total_in(),
            Session::Decompress(d) => d.total_in(),
        }
    }

    /// Run one codec step over the undigested buffer, reporting bytes
    /// consumed, bytes written, and the session's status.
    fn step(&mut self, finalize: bool) -> Result<(usize, usize, Status), CodecError> {
        match &mut self.session {
            Session::Compress(c) => {
                let (before_in, before_out) = (c.total_in(), c.total_out());
                let flush = if finalize {
                    FlushCompress::Finish
                } else {
                    FlushCompress::None
                };
                let status = c.compress(&self.pending, &mut self.out, flush)?;
                Ok((
                    (c.total_in() - before_in) as usize,
                    (c.total_out() - before_out) as usize,
                    status,
                ))
            }
            Session::Decompress(d) => {
                let (before_in, before_out) = (d.total_in(), d.total_out());
                let flush = if finalize {
                    FlushDecompress::Finish
                } else {
                    FlushDecompress::None
                };
                let status = d.decompress(&self.pending, &mut self.out, flush)?;
                Ok((
                    (d.total_in() - before_in) as usize,
                    (d.total_out() - before_out) as usize,
                    status,
                ))
            }
        }
    }

    fn drain(&mut self, finalize: bool) -> Result<Vec<Vec<u8>>, CodecError> {
        let mut produced = Vec::new();
        loop {
            let (consumed, written, status) = self.step(finalize)?;
            self.pending.drain(..consumed);
            if written > 0 {
                produced.push(self.out[..written].to_vec());
            }
            match status {
                Status::StreamEnd => {
                    // End of stream: during decompression any trailing bytes
                    // are ignored from here on.
                    self.done = true;
                    return Ok(produced);
                }
                Status::Ok => {
                    if !finalize && written < self.out.len() {
                        // Output buffer not filled: nothing more pending.
                        return Ok(produced);
                    }
                    if finalize && consumed == 0 && written == 0 {
                        return Err(CodecError::TruncatedStream);
                    }
                }
                Status::BufError => {
                    if finalize {
                        // The buffer always has space, so no-progress at
                        // finalize means the stream ended early.
                        return Err(CodecError::TruncatedStream);
                    }
                    // Needs more input.
                    return Ok(produced);
                }
            }
        }
    }
}

/// Pipeline stage running binary chunks through an [`IncrementalCodec`].
///
/// One upstream chunk may produce zero or more output chunks; ready output is
/// queued and handed out one chunk per pull before the next upstream chunk is
/// requested. Upstream exhaustion triggers exactly one `finish`. After an
/// error the stage is fused.
pub struct CodedChunks<I> {
    upstream: I,
    codec: IncrementalCodec,
    ready: VecDeque<Vec<u8>>,
    finished: bool,
}

impl<I> CodedChunks<I> {
    /// Wrap `upstream` with the given codec session.
    pub fn new(upstream: I, codec: IncrementalCodec) -> Self {
        Self {
            upstream,
            codec,
            ready: VecDeque::new(),
            finished: false,
        }
    }
}

impl<I, E> Iterator for CodedChunks<I>
where
    I: Iterator<Item = Result<Vec<u8>, E>>,
    PipelineError: From<E>,
{
    type Item = Result<Vec<u8>, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = self.ready.pop_front() {
                return Some(Ok(chunk));
            }
            if self.finished {
                return None;
            }
            match self.upstream.next() {
                Some(Ok(chunk)) => match self.codec.feed(&chunk) {
                    Ok(produced) => self.ready.extend(produced),
                    Err(e) => {
                        self.finished = true;
                        return Some(Err(e.into()));
                    }
                },
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(PipelineError::from(e)));
                }
                None => {
                    self.finished = true;
                    match self.codec.finish() {
                        Ok(bytes) if bytes.is_empty() => return None,
                        Ok(bytes) => return Some(Ok(bytes)),
                        Err(e) => return Some(Err(e.into())),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn run_through(codec: &mut IncrementalCodec, data: &[u8], step: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in data.chunks(step.max(1)) {
            for produced in codec.feed(chunk).unwrap() {
                out.extend_from_slice(&produced);
            }
        }
        out.extend_from_slice(&codec.finish().unwrap());
        out
    }

    #[test]
    fn test_round_trip() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(100);

        let mut enc = IncrementalCodec::new(Mode::Compress);
        let compressed = run_through(&mut enc, &data, 7);
        assert!(compressed.len() < data.len());

        let mut dec = IncrementalCodec::new(Mode::Decompress);
        let recovered = run_through(&mut dec, &compressed, 5);
        assert_eq!(recovered, data);
    }

    #[test]
    fn test_small_output_buffer_produces_multiple_chunks() {
        let data = b"abcdefgh".repeat(512);
        let mut enc = IncrementalCodec::new(Mode::Compress);
        let mut compressed = run_through(&mut enc, &data, 1024);

        let mut dec = IncrementalCodec::with_buffer_size(Mode::Decompress, 64);
        let tail = compressed.split_off(compressed.len() / 2);
        let mut chunks = dec.feed(&compressed).unwrap();
        chunks.extend(dec.feed(&tail).unwrap());
        // 4096 bytes of output cannot fit a 64-byte buffer once.
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 64);
        }
        let mut recovered = chunks.concat();
        recovered.extend_from_slice(&dec.finish().unwrap());
        assert_eq!(recovered, data);
    }

    #[test]
    fn test_garbage_input_fails() {
        let mut dec = IncrementalCodec::new(Mode::Decompress);
        let result = dec.feed(&[0xde, 0xad, 0xbe, 0xef, 0x00, 0x01, 0x02]);
        assert!(matches!(result, Err(CodecError::Decompress(_))));
    }

    #[test]
    fn test_truncated_stream_fails_at_finish() {
        let data = b"some compressible payload, repeated a bit".repeat(20);
        let mut enc = IncrementalCodec::new(Mode::Compress);
        let mut compressed = run_through(&mut enc, &data, 64);
        compressed.truncate(compressed.len() - 8);

        let mut dec = IncrementalCodec::new(Mode::Decompress);
        for chunk in compressed.chunks(32) {
            dec.feed(chunk).unwrap();
        }
        assert!(matches!(dec.finish(), Err(CodecError::TruncatedStream)));
    }

    #[test]
    fn test_decompress_nothing_is_empty() {
        let mut dec = IncrementalCodec::new(Mode::Decompress);
        assert_eq!(dec.finish().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_compress_empty_round_trips() {
        let mut enc = IncrementalCodec::new(Mode::Compress);
        let stream = enc.finish().unwrap();
        // An empty input still owes the zlib framing.
        assert!(!stream.is_empty());

        let mut dec = IncrementalCodec::new(Mode::Decompress);
        let recovered = run_through(&mut dec, &stream, 3);
        assert!(recovered.is_empty());
    }

    #[test]
    fn test_trailing_bytes_after_stream_end_ignored() {
        let data = b"payload".to_vec();
        let mut enc = IncrementalCodec::new(Mode::Compress);
        let mut compressed = run_through(&mut enc, &data, 64);
        compressed.extend_from_slice(b"junk after the stream");

        let mut dec = IncrementalCodec::new(Mode::Decompress);
        let recovered = run_through(&mut dec, &compressed, 1024);
        assert_eq!(recovered, data);
    }

    #[test]
    fn test_coded_chunks_stage_round_trip() {
        let data = b"stage level round trip".repeat(50);
        let chunks: Vec<Result<Vec<u8>, PipelineError>> =
            data.chunks(13).map(|c| Ok(c.to_vec())).collect();

        let compressed: Vec<Vec<u8>> =
            CodedChunks::new(chunks.into_iter(), IncrementalCodec::new(Mode::Compress))
                .collect::<Result<_, _>>()
                .unwrap();

        let back: Vec<Result<Vec<u8>, PipelineError>> =
            compressed.into_iter().map(Ok).collect();
        let recovered: Vec<Vec<u8>> =
            CodedChunks::new(back.into_iter(), IncrementalCodec::new(Mode::Decompress))
                .collect::<Result<_, _>>()
                .unwrap();

        assert_eq!(recovered.concat(), data);
    }

    proptest! {
        /// Compress-then-decompress reproduces the input for any payload and
        /// any feed chunking on either side.
        #[test]
        fn prop_codec_round_trip(
            data in proptest::collection::vec(any::<u8>(), 0..2048),
            enc_step in 1usize..257,
            dec_step in 1usize..257,
        ) {
            let mut enc = IncrementalCodec::new(Mode::Compress);
            let compressed = run_through(&mut enc, &data, enc_step);

            let mut dec = IncrementalCodec::new(Mode::Decompress);
            let recovered = run_through(&mut dec, &compressed, dec_step);
            prop_assert_eq!(recovered, data);
        }
    }
}
