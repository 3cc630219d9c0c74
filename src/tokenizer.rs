//! Incremental XML tokenization
//!
//! Defines the [`Token`] event type, the push-style tokenizer contract
//! ([`PushTokenizer`]), and [`SaxTokenizer`], an incremental tokenizer built
//! on quick-xml. The tokenizer is push-based: each `feed` synchronously
//! invokes the caller's sink zero or more times before returning. The
//! pull-side adaptation lives in [`crate::tokens`].
//!
//! quick-xml wants a complete fragment, so the tokenizer keeps a carry buffer
//! of bytes past the last markup boundary and only parses the prefix that is
//! known to end on one. Character data after the final complete tag is held
//! back too, which keeps entities and multi-byte UTF-8 sequences from being
//! split across fragments.

use std::fmt;
use std::str;

use quick_xml::events::Event;
use quick_xml::Reader;

/// One tokenizer event, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Opening tag with the element's name. Empty elements (`<x/>`) produce
    /// a start immediately followed by the matching end.
    ElementStart(String),
    /// Closing tag with the element's name.
    ElementEnd(String),
    /// A run of character data, entity-unescaped. Long runs may arrive as
    /// several consecutive `Text` tokens.
    Text(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::ElementStart(name) => write!(f, "start tag <{name}>"),
            Token::ElementEnd(name) => write!(f, "end tag </{name}>"),
            Token::Text(_) => write!(f, "character data"),
        }
    }
}

/// Errors from the tokenizer primitive.
#[derive(Debug, thiserror::Error)]
pub enum TokenizerError {
    #[error("XML syntax error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid UTF-8 in markup: {0}")]
    Utf8(#[from] str::Utf8Error),
}

/// Push-style tokenizer contract.
///
/// `feed` may invoke `sink` any number of times, synchronously, before it
/// returns; tokens arrive in document order. `finish` flushes whatever
/// partial content is still buffered and must not be followed by further
/// `feed` calls.
pub trait PushTokenizer {
    /// Feed one chunk of input bytes.
    fn feed(&mut self, input: &[u8], sink: &mut dyn FnMut(Token)) -> Result<(), TokenizerError>;

    /// Signal end of input, flushing any pending content.
    fn finish(&mut self, sink: &mut dyn FnMut(Token)) -> Result<(), TokenizerError>;
}

/// Incremental SAX-style tokenizer over quick-xml.
///
/// Input is UTF-8 XML; comments, processing instructions and declarations are
/// consumed without producing tokens; CDATA sections are delivered as text.
#[derive(Debug, Default)]
pub struct SaxTokenizer {
    /// Bytes past the last complete markup boundary, waiting for more input.
    carry: Vec<u8>,
}

impl SaxTokenizer {
    /// Create a tokenizer with no buffered input.
    pub fn new() -> Self {
        Self::default()
    }

    fn run_fragment(
        fragment: &[u8],
        sink: &mut dyn FnMut(Token),
    ) -> Result<(), TokenizerError> {
        let mut reader = Reader::from_reader(fragment);
        let config = reader.config_mut();
        // Start and end tags of one element routinely land in different
        // fragments, so the per-fragment reader cannot match them up.
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.expand_empty_elements = true;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = str::from_utf8(e.name().as_ref())?.to_string();
                    sink(Token::ElementStart(name));
                }
                Event::End(e) => {
                    let name = str::from_utf8(e.name().as_ref())?.to_string();
                    sink(Token::ElementEnd(name));
                }
                Event::Text(t) => {
                    let text = t.unescape()?.into_owned();
                    if !text.is_empty() {
                        sink(Token::Text(text));
                    }
                }
                Event::CData(c) => {
                    let text = str::from_utf8(c.into_inner().as_ref())?.to_string();
                    if !text.is_empty() {
                        sink(Token::Text(text));
                    }
                }
                Event::Eof => return Ok(()),
                // Declarations, comments, PIs and doctypes carry no tokens.
                _ => {}
            }
        }
    }
}

impl PushTokenizer for SaxTokenizer {
    fn feed(&mut self, input: &[u8], sink: &mut dyn FnMut(Token)) -> Result<(), TokenizerError> {
        self.carry.extend_from_slice(input);
        let cut = complete_prefix_len(&self.carry);
        if cut > 0 {
            Self::run_fragment(&self.carry[..cut], sink)?;
            self.carry.drain(..cut);
        }
        Ok(())
    }

    fn finish(&mut self, sink: &mut dyn FnMut(Token)) -> Result<(), TokenizerError> {
        if self.carry.is_empty() {
            return Ok(());
        }
        let rest = std::mem::take(&mut self.carry);
        Self::run_fragment(&rest, sink)
    }
}

/// Length of the longest prefix of `buf` that ends directly after a complete
/// markup construct and is therefore safe to parse as a standalone fragment.
///
/// Trailing character data is deliberately not included: it is only known to
/// be complete once the next tag (or end of input) arrives.
fn complete_prefix_len(buf: &[u8]) -> usize {
    let mut cut = 0;
    let mut i = 0;
    while i < buf.len() {
        match memchr::memchr(b'<', &buf[i..]) {
            Some(offset) => i += offset,
            None => break,
        }
        match markup_len(&buf[i..]) {
            Some(len) => {
                i += len;
                cut = i;
            }
            // Incomplete markup: hold everything from here.
            None => break,
        }
    }
    cut
}

/// Length of the markup construct starting at `buf[0] == b'<'`, if `buf`
/// contains all of it.
fn markup_len(buf: &[u8]) -> Option<usize> {
    const COMMENT_OPEN: &[u8] = b"<!--";
    const CDATA_OPEN: &[u8] = b"<![CDATA[";

    debug_assert_eq!(buf.first(), Some(&b'<'));

    if buf.starts_with(COMMENT_OPEN) {
        return memchr::memmem::find(&buf[COMMENT_OPEN.len()..], b"-->")
            .map(|pos| COMMENT_OPEN.len() + pos + 3);
    }
    if buf.starts_with(CDATA_OPEN) {
        return memchr::memmem::find(&buf[CDATA_OPEN.len()..], b"]]>")
            .map(|pos| CDATA_OPEN.len() + pos + 3);
    }
    // A short tail may still grow into one of the above.
    if COMMENT_OPEN.starts_with(buf) || CDATA_OPEN.starts_with(buf) {
        return None;
    }

    // Ordinary tag, declaration or PI: ends at the first `>` outside quotes,
    // so attribute values containing `>` do not split the tag.
    let mut quote: Option<u8> = None;
    for (i, &byte) in buf.iter().enumerate().skip(1) {
        match quote {
            Some(q) => {
                if byte == q {
                    quote = None;
                }
            }
            None => match byte {
                b'"' | b'\'' => quote = Some(byte),
                b'>' => return Some(i + 1),
                _ => {}
            },
        }
    }
    None
}
