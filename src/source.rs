//! Byte sources
//!
//! Adapts any [`Read`] into the pipeline's upstream contract: a lazy sequence
//! of byte runs with an end-of-data signal. The underlying handle is released
//! when the pipeline is dropped, whether iteration ran to exhaustion or was
//! abandoned early.

use std::io::{self, Read};

/// Conventional run length for file-backed sources.
pub const RUN_SIZE: usize = 64 * 1024;

/// Lazy sequence of byte runs read from a reader.
///
/// Each pull performs at most one `read` call and yields whatever it
/// returned, so a run may be shorter than the configured length. A zero-byte
/// read ends the sequence.
pub struct ByteRuns<R> {
    reader: R,
    run_size: usize,
    done: bool,
}

impl<R: Read> ByteRuns<R> {
    /// Read runs of the default length.
    pub fn new(reader: R) -> Self {
        Self::with_run_size(reader, RUN_SIZE)
    }

    /// Read runs of at most `run_size` bytes.
    ///
    /// # Panics
    /// Panics if `run_size` is zero.
    pub fn with_run_size(reader: R, run_size: usize) -> Self {
        assert!(run_size > 0, "run size must be at least 1");
        Self {
            reader,
            run_size,
            done: false,
        }
    }
}

impl<R: Read> Iterator for ByteRuns<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut run = vec![0u8; self.run_size];
        loop {
            match self.reader.read(&mut run) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(n) => {
                    run.truncate(n);
                    return Some(Ok(run));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
