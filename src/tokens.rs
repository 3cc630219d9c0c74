//! Push-to-pull token adaptation
//!
//! The tokenizer delivers tokens by invoking a callback whenever it is fed a
//! buffer; the rest of the pipeline wants to pull one token at a time. This
//! stage is the single place that conversion happens: tokens emitted by one
//! tokenizer invocation are buffered and replayed in order, and the next
//! upstream chunk is requested only once the buffer runs dry.

use std::collections::VecDeque;

use crate::error::PipelineError;
use crate::tokenizer::{PushTokenizer, SaxTokenizer, Token};

/// Lazy token sequence over binary chunks, driving a push tokenizer.
///
/// On each pull the front of the token buffer is returned if present;
/// otherwise one chunk is pulled from upstream and fed to the tokenizer,
/// whose synchronous callbacks refill the buffer. Upstream exhaustion
/// finalizes the tokenizer exactly once, flushing any in-flight content.
/// After an error the stage is fused.
pub struct Tokens<I, T = SaxTokenizer> {
    upstream: I,
    tokenizer: T,
    buffer: VecDeque<Token>,
    finished: bool,
}

impl<I, T> Tokens<I, T> {
    /// Wrap `upstream` chunks with the given tokenizer.
    pub fn new(upstream: I, tokenizer: T) -> Self {
        Self {
            upstream,
            tokenizer,
            buffer: VecDeque::new(),
            finished: false,
        }
    }
}

impl<I, T, E> Iterator for Tokens<I, T>
where
    I: Iterator<Item = Result<Vec<u8>, E>>,
    T: PushTokenizer,
    PipelineError: From<E>,
{
    type Item = Result<Token, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.buffer.pop_front() {
                return Some(Ok(token));
            }
            if self.finished {
                return None;
            }
            let Self {
                upstream,
                tokenizer,
                buffer,
                finished,
            } = self;
            match upstream.next() {
                Some(Ok(chunk)) => {
                    if let Err(e) = tokenizer.feed(&chunk, &mut |t| buffer.push_back(t)) {
                        *finished = true;
                        return Some(Err(e.into()));
                    }
                }
                Some(Err(e)) => {
                    *finished = true;
                    return Some(Err(PipelineError::from(e)));
                }
                None => {
                    *finished = true;
                    if let Err(e) = tokenizer.finish(&mut |t| buffer.push_back(t)) {
                        return Some(Err(e.into()));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TokenizerError;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Scripted tokenizer: each feed emits one token per input byte, plus a
    /// terminal marker on finish.
    #[derive(Default)]
    struct FakeTokenizer {
        feeds: usize,
        finishes: Rc<Cell<usize>>,
    }

    impl PushTokenizer for FakeTokenizer {
        fn feed(
            &mut self,
            input: &[u8],
            sink: &mut dyn FnMut(Token),
        ) -> Result<(), TokenizerError> {
            self.feeds += 1;
            for (i, _) in input.iter().enumerate() {
                sink(Token::Text(format!("feed{}:{}", self.feeds, i)));
            }
            Ok(())
        }

        fn finish(&mut self, sink: &mut dyn FnMut(Token)) -> Result<(), TokenizerError> {
            self.finishes.set(self.finishes.get() + 1);
            sink(Token::Text("final".to_string()));
            Ok(())
        }
    }

    fn chunks(data: &[&[u8]]) -> Vec<Result<Vec<u8>, PipelineError>> {
        data.iter().map(|c| Ok(c.to_vec())).collect()
    }

    #[test]
    fn test_tokens_delivered_in_emission_order() {
        let upstream = chunks(&[b"ab", b"c"]);
        let tokens: Vec<Token> = Tokens::new(upstream.into_iter(), FakeTokenizer::default())
            .collect::<Result<_, _>>()
            .unwrap();
        let texts: Vec<&str> = tokens
            .iter()
            .map(|t| match t {
                Token::Text(s) => s.as_str(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(texts, vec!["feed1:0", "feed1:1", "feed2:0", "final"]);
    }

    #[test]
    fn test_no_chunk_requested_while_buffer_nonempty() {
        // A two-byte chunk buffers two tokens; the second upstream pull must
        // not happen until both are consumed.
        let pulls = Rc::new(Cell::new(0usize));
        let pulls_seen = pulls.clone();
        let upstream = vec![Ok::<_, PipelineError>(b"xy".to_vec()), Ok(b"z".to_vec())]
            .into_iter()
            .inspect(move |_| pulls_seen.set(pulls_seen.get() + 1));

        let mut tokens = Tokens::new(upstream, FakeTokenizer::default());
        tokens.next().unwrap().unwrap();
        assert_eq!(pulls.get(), 1);
        tokens.next().unwrap().unwrap();
        assert_eq!(pulls.get(), 1);
        tokens.next().unwrap().unwrap();
        assert_eq!(pulls.get(), 2);
    }

    #[test]
    fn test_finish_called_exactly_once() {
        let finishes = Rc::new(Cell::new(0usize));
        let tokenizer = FakeTokenizer {
            feeds: 0,
            finishes: finishes.clone(),
        };
        let mut tokens = Tokens::new(chunks(&[b"a"]).into_iter(), tokenizer);
        while tokens.next().is_some() {}
        assert_eq!(finishes.get(), 1);
        // Fused: further pulls neither finalize again nor yield.
        assert!(tokens.next().is_none());
        assert_eq!(finishes.get(), 1);
    }

    #[test]
    fn test_empty_chunks_are_transparent() {
        let upstream = chunks(&[b"", b"a", b""]);
        let tokens: Vec<Token> = Tokens::new(upstream.into_iter(), FakeTokenizer::default())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(tokens.len(), 2); // one per byte plus the final marker
    }

    #[test]
    fn test_upstream_error_surfaces_and_fuses() {
        let upstream: Vec<Result<Vec<u8>, PipelineError>> = vec![
            Ok(b"a".to_vec()),
            Err(PipelineError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "gone",
            ))),
        ];
        let mut tokens = Tokens::new(upstream.into_iter(), FakeTokenizer::default());
        assert!(matches!(tokens.next(), Some(Ok(_))));
        assert!(matches!(tokens.next(), Some(Err(PipelineError::Io(_)))));
        assert!(tokens.next().is_none());
    }

    #[test]
    fn test_sax_end_to_end() {
        let doc = b"<r><record><title>T</title><id>1</id></record></r>";
        let upstream: Vec<Result<Vec<u8>, PipelineError>> =
            doc.chunks(4).map(|c| Ok(c.to_vec())).collect();
        let tokens: Vec<Token> = Tokens::new(upstream.into_iter(), SaxTokenizer::new())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(tokens.first(), Some(&Token::ElementStart("r".to_string())));
        assert_eq!(tokens.last(), Some(&Token::ElementEnd("r".to_string())));
        assert!(tokens.contains(&Token::Text("T".to_string())));
    }
}
