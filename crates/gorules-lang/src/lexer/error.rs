use thiserror::Error;

use crate::range::Range;

#[derive(Error, Debug, PartialEq)]
pub enum LexerError {
    #[error("Unexpected character `{1}`")]
    UnexpectedCharacter(Range, char),
    #[error("Wildcards are only allowed in patterns")]
    UnexpectedWildcard(Range),
}

impl LexerError {
    #[cold]
    pub fn range(&self) -> Range {
        match self {
            LexerError::UnexpectedCharacter(range, _) => *range,
            LexerError::UnexpectedWildcard(range) => *range,
        }
    }
}
