use thiserror::Error;

use crate::lexer::error::LexerError;
use crate::lexer::token::{Token, TokenKind};
use crate::range::Range;

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error("unexpected `{}`", if .0.is_eof() { "EOF".to_string() } else { .0.to_string() })]
    UnexpectedToken(Token),
    #[error("expected `{}`, found `{}`", .1, if .0.is_eof() { "EOF".to_string() } else { .0.to_string() })]
    ExpectedToken(Token, TokenKind),
    #[error("expected {}, found `{}`", .1, if .0.is_eof() { "EOF".to_string() } else { .0.to_string() })]
    Expected(Token, &'static str),
    #[error("{1}")]
    InvalidSyntax(Range, &'static str),
}

impl ParseError {
    #[cold]
    pub fn range(&self) -> Range {
        match self {
            ParseError::Lexer(e) => e.range(),
            ParseError::UnexpectedToken(token)
            | ParseError::ExpectedToken(token, _)
            | ParseError::Expected(token, _) => token.range,
            ParseError::InvalidSyntax(range, _) => *range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use smol_str::SmolStr;

    fn token(kind: TokenKind) -> Token {
        Token {
            range: Range::default(),
            kind,
        }
    }

    #[rstest]
    #[case::unexpected(ParseError::UnexpectedToken(token(TokenKind::RBrace)), "unexpected `}`")]
    #[case::unexpected_eof(ParseError::UnexpectedToken(token(TokenKind::Eof)), "unexpected `EOF`")]
    #[case::expected_token(
        ParseError::ExpectedToken(token(TokenKind::Ident(SmolStr::new("x"))), TokenKind::RBrace),
        "expected `}`, found `x`"
    )]
    #[case::expected_token_eof(
        ParseError::ExpectedToken(token(TokenKind::Eof), TokenKind::RBrace),
        "expected `}`, found `EOF`"
    )]
    #[case::expected(
        ParseError::Expected(token(TokenKind::RBrace), "expression"),
        "expected expression, found `}`"
    )]
    #[case::invalid(ParseError::InvalidSyntax(Range::default(), "bad label"), "bad label")]
    fn test_display(#[case] err: ParseError, #[case] expected: &str) {
        assert_eq!(err.to_string(), expected);
    }
}
