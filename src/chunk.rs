//! Chunk aggregation
//!
//! Regroups an element-at-a-time byte sequence into fixed-size binary chunks
//! suitable for feeding the codec and tokenizer stages. The aggregator is
//! pull-driven: it reads exactly as many bytes from upstream as one chunk
//! needs and no more.

/// Iterator adapter that groups a fallible byte iterator into `Vec<u8>`
/// chunks of a fixed target size.
///
/// Every produced chunk has exactly the target length except possibly the
/// last, which holds whatever remained when upstream was exhausted. An empty
/// upstream produces no chunk at all.
pub struct Chunks<I> {
    upstream: I,
    size: usize,
}

impl<I> Chunks<I> {
    /// Create an aggregator producing chunks of `size` bytes.
    ///
    /// # Panics
    /// Panics if `size` is zero.
    pub fn new(upstream: I, size: usize) -> Self {
        assert!(size > 0, "chunk size must be at least 1");
        Self { upstream, size }
    }
}

impl<I, E> Iterator for Chunks<I>
where
    I: Iterator<Item = Result<u8, E>>,
{
    type Item = Result<Vec<u8>, E>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chunk = Vec::with_capacity(self.size);
        while chunk.len() < self.size {
            match self.upstream.next() {
                Some(Ok(byte)) => chunk.push(byte),
                Some(Err(e)) => return Some(Err(e)),
                None => break,
            }
        }
        if chunk.is_empty() {
            None
        } else {
            Some(Ok(chunk))
        }
    }
}
