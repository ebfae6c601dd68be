use smol_str::SmolStr;
use thiserror::Error;

use crate::range::{Position, Range};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("can't compile {1} yet")]
    Unsupported(Position, &'static str),
    #[error("can't assign to {1}, params are readonly")]
    AssignToParam(Position, SmolStr),
    #[error("{1} variable shadowing is not allowed")]
    Shadowing(Position, SmolStr),
    #[error("too many locals")]
    TooManyLocals(Position),
    #[error("too many constants")]
    TooManyConstants(Position),
    #[error("too many functions")]
    TooManyFuncs(Position),
    #[error("only functions with a single non-void results are supported")]
    ResultCount(Position),
    #[error("naked return statements are not allowed")]
    NakedReturn(Position),
    #[error("missing return at the end of the function")]
    MissingReturn(Position),
    #[error("{1} is not defined")]
    Undefined(Position, SmolStr),
    #[error("unsupported type {1}")]
    UnsupportedType(Position, String),
    #[error("{1}")]
    Type(Position, String),
    #[error("jump offset out of range")]
    JumpOutOfRange(Position),
}

impl CompileError {
    #[cold]
    pub fn range(&self) -> Range {
        let start = match self {
            CompileError::Unsupported(pos, _)
            | CompileError::AssignToParam(pos, _)
            | CompileError::Shadowing(pos, _)
            | CompileError::TooManyLocals(pos)
            | CompileError::TooManyConstants(pos)
            | CompileError::TooManyFuncs(pos)
            | CompileError::ResultCount(pos)
            | CompileError::NakedReturn(pos)
            | CompileError::MissingReturn(pos)
            | CompileError::Undefined(pos, _)
            | CompileError::UnsupportedType(pos, _)
            | CompileError::Type(pos, _)
            | CompileError::JumpOutOfRange(pos) => *pos,
        };
        Range { start, end: start }
    }
}
