//! Record assembly
//!
//! Recursive-descent consumer of the token sequence. The grammar is fixed: a
//! record element contains, among other children, exactly one title and one
//! id child whose text content becomes the [`Record`]. Structure outside a
//! record is tolerated and skipped; structure inside a matched record is
//! validated strictly, because that part of the grammar is known.

use crate::error::PipelineError;
use crate::tokenizer::Token;

/// One structured record extracted from the dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Text content of the record's title child.
    pub title: String,
    /// Text content of the record's id child.
    pub id: String,
}

/// Structural failures inside an opened record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructureError {
    #[error("unexpected {found} inside a record")]
    MalformedStructure {
        /// The token that violated the record grammar.
        found: Token,
    },

    #[error("record closed without both title and id")]
    IncompleteRecord,

    #[error("token stream ended inside an open element")]
    UnexpectedEndOfInput,
}

/// Element names recognized by the assembler.
///
/// The grammar's shape is fixed; only the names vary between dump formats
/// (Wikipedia dumps call the record element `page`, for instance).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTags {
    /// Name of the element that delimits one record.
    pub record: String,
    /// Name of the text-bearing title child.
    pub title: String,
    /// Name of the text-bearing id child.
    pub id: String,
}

impl Default for RecordTags {
    fn default() -> Self {
        Self {
            record: "record".to_string(),
            title: "title".to_string(),
            id: "id".to_string(),
        }
    }
}

/// Lazy record sequence over a token stream.
///
/// Between records, tokens are skipped one at a time rather than
/// subtree-aware: records sit inside enclosing container elements, so
/// skipping a non-record element's whole subtree at top level would swallow
/// the document root and find nothing. Inside a record the grammar is
/// enforced and violations abort the stream. After an error the stage is
/// fused.
pub struct Records<I> {
    tokens: I,
    tags: RecordTags,
    failed: bool,
}

impl<I> Records<I> {
    /// Assemble records using the default `record`/`title`/`id` names.
    pub fn new(tokens: I) -> Self {
        Self::with_tags(tokens, RecordTags::default())
    }

    /// Assemble records using custom element names.
    pub fn with_tags(tokens: I, tags: RecordTags) -> Self {
        Self {
            tokens,
            tags,
            failed: false,
        }
    }
}

impl<I, E> Records<I>
where
    I: Iterator<Item = Result<Token, E>>,
    PipelineError: From<E>,
{
    fn next_token(&mut self) -> Result<Option<Token>, PipelineError> {
        match self.tokens.next() {
            Some(Ok(token)) => Ok(Some(token)),
            Some(Err(e)) => Err(PipelineError::from(e)),
            None => Ok(None),
        }
    }

    /// Scan-for-record state: consume tokens until a record start token,
    /// then assemble; end of tokens means no more records.
    fn scan(&mut self) -> Result<Option<Record>, PipelineError> {
        while let Some(token) = self.next_token()? {
            if let Token::ElementStart(name) = token {
                if name == self.tags.record {
                    return self.assemble().map(Some);
                }
            }
        }
        Ok(None)
    }

    /// Assemble-record state, entered having just consumed the record start
    /// token.
    fn assemble(&mut self) -> Result<Record, PipelineError> {
        let mut title: Option<String> = None;
        let mut id: Option<String> = None;

        while let Some(token) = self.next_token()? {
            match token {
                Token::ElementStart(name) => {
                    if name == self.tags.title {
                        title = Some(self.collect_text(&name)?);
                    } else if name == self.tags.id {
                        id = Some(self.collect_text(&name)?);
                    } else {
                        self.skip_subtree(&name)?;
                    }
                }
                Token::ElementEnd(name) if name == self.tags.record => {
                    return match (title, id) {
                        (Some(title), Some(id)) => Ok(Record { title, id }),
                        _ => Err(StructureError::IncompleteRecord.into()),
                    };
                }
                Token::Text(_) => {}
                other => {
                    return Err(StructureError::MalformedStructure { found: other }.into());
                }
            }
        }
        Err(StructureError::UnexpectedEndOfInput.into())
    }

    /// Collect-text state: concatenate character data until the matching end
    /// tag. Text-bearing elements are leaf-only; nested markup is an error.
    fn collect_text(&mut self, until: &str) -> Result<String, PipelineError> {
        let mut text = String::new();
        while let Some(token) = self.next_token()? {
            match token {
                Token::Text(s) => text.push_str(&s),
                Token::ElementEnd(name) if name == until => return Ok(text),
                other => {
                    return Err(StructureError::MalformedStructure { found: other }.into());
                }
            }
        }
        Err(StructureError::UnexpectedEndOfInput.into())
    }

    /// Skip-subtree state: discard everything, recursing into nested
    /// elements, until the matching end tag at the same depth.
    fn skip_subtree(&mut self, until: &str) -> Result<(), PipelineError> {
        while let Some(token) = self.next_token()? {
            match token {
                Token::Text(_) => {}
                Token::ElementStart(name) => self.skip_subtree(&name)?,
                Token::ElementEnd(name) if name == until => return Ok(()),
                other => {
                    return Err(StructureError::MalformedStructure { found: other }.into());
                }
            }
        }
        Err(StructureError::UnexpectedEndOfInput.into())
    }
}

impl<I, E> Iterator for Records<I>
where
    I: Iterator<Item = Result<Token, E>>,
    PipelineError: From<E>,
{
    type Item = Result<Record, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.scan() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
