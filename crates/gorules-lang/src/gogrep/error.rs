use thiserror::Error;

use crate::ast::error::ParseError;
use crate::range::Range;

#[derive(Error, Debug, PartialEq)]
pub enum CompileError {
    #[error("empty source")]
    EmptySource,
    #[error("syntax error at {}: {}", .0.range().start, .0)]
    Syntax(ParseError),
    #[error("unsupported construct: {1}")]
    Unsupported(Range, &'static str),
    #[error("implementation limitation: {0}")]
    Limitation(&'static str),
}

impl CompileError {
    #[cold]
    pub fn range(&self) -> Range {
        match self {
            CompileError::Syntax(e) => e.range(),
            CompileError::Unsupported(range, _) => *range,
            CompileError::EmptySource | CompileError::Limitation(_) => Range::default(),
        }
    }
}
