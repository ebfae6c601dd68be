use miette::{Diagnostic, SourceOffset, SourceSpan};

use crate::{
    ast::error::ParseError, gogrep, lexer::error::LexerError, quasigo, range::Range,
    rules::ConfigError,
};

#[derive(Debug, thiserror::Error)]
pub enum InnerError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Pattern(#[from] gogrep::CompileError),
    #[error(transparent)]
    Quasigo(#[from] quasigo::CompileError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Represents a high-level error with diagnostic information for the user.
#[derive(Debug, thiserror::Error)]
#[error("{cause}")]
pub struct Error {
    /// The underlying cause of the error.
    pub cause: InnerError,
    /// The source code related to the error.
    pub source_code: String,
    /// The location in the source code for diagnostics.
    pub location: SourceSpan,
}

impl Error {
    /// Builds an error pointing into `source_code`, the text that was being
    /// parsed or compiled. Rule file errors may point into a pattern or a
    /// filter of the file instead.
    pub fn from_error(source_code: impl Into<String>, cause: InnerError) -> Self {
        let source_code = source_code.into();
        let (source_code, location) = match &cause {
            InnerError::Lexer(err) => {
                let location = span(&source_code, Some(err.range()));
                (source_code, location)
            }
            InnerError::Parse(err) => {
                let location = span(&source_code, Some(err.range()));
                (source_code, location)
            }
            InnerError::Pattern(err) => {
                let range = match err {
                    gogrep::CompileError::EmptySource | gogrep::CompileError::Limitation(_) => None,
                    _ => Some(err.range()),
                };
                let location = span(&source_code, range);
                (source_code, location)
            }
            InnerError::Quasigo(err) => {
                let location = span(&source_code, Some(err.range()));
                (source_code, location)
            }
            InnerError::Config(ConfigError::Toml(err)) => {
                let location = err
                    .span()
                    .map(|span| SourceSpan::new(span.start.into(), span.len().max(1)))
                    .unwrap_or_else(|| span(&source_code, None));
                (source_code, location)
            }
            InnerError::Config(err) => {
                let (text, range) = err.location(&source_code);
                let text = text.to_string();
                let location = span(&text, range);
                (text, location)
            }
        };

        Self {
            cause,
            source_code,
            location,
        }
    }
}

fn span(source_code: &str, range: Option<Range>) -> SourceSpan {
    let Some(range) = range else {
        return SourceSpan::new(SourceOffset::from_location(source_code, 0, 0), 1);
    };

    // SourceOffset::from_location takes one-based lines and columns.
    let start = SourceOffset::from_location(
        source_code,
        range.start.line as usize,
        range.start.column,
    );
    let end = SourceOffset::from_location(source_code, range.end.line as usize, range.end.column);
    SourceSpan::new(
        start,
        std::cmp::max(end.offset().saturating_sub(start.offset()), 1),
    )
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let c = match &self.cause {
            InnerError::Lexer(LexerError::UnexpectedCharacter(_, _)) => {
                "LexerError::UnexpectedCharacter"
            }
            InnerError::Lexer(LexerError::UnexpectedWildcard(_)) => "LexerError::UnexpectedWildcard",
            InnerError::Parse(ParseError::Lexer(_)) => "ParseError::Lexer",
            InnerError::Parse(ParseError::UnexpectedToken(_)) => "ParseError::UnexpectedToken",
            InnerError::Parse(ParseError::ExpectedToken(_, _)) => "ParseError::ExpectedToken",
            InnerError::Parse(ParseError::Expected(_, _)) => "ParseError::Expected",
            InnerError::Parse(ParseError::InvalidSyntax(_, _)) => "ParseError::InvalidSyntax",
            InnerError::Pattern(gogrep::CompileError::EmptySource) => "PatternError::EmptySource",
            InnerError::Pattern(gogrep::CompileError::Syntax(_)) => "PatternError::Syntax",
            InnerError::Pattern(gogrep::CompileError::Unsupported(_, _)) => {
                "PatternError::Unsupported"
            }
            InnerError::Pattern(gogrep::CompileError::Limitation(_)) => "PatternError::Limitation",
            InnerError::Quasigo(err) => quasigo_code(err),
            InnerError::Config(ConfigError::Toml(_)) => "ConfigError::Toml",
            InnerError::Config(ConfigError::DuplicateRule(_)) => "ConfigError::DuplicateRule",
            InnerError::Config(ConfigError::NoPatterns(_)) => "ConfigError::NoPatterns",
            InnerError::Config(ConfigError::Pattern { .. }) => "ConfigError::Pattern",
            InnerError::Config(ConfigError::FilterSyntax { .. }) => "ConfigError::FilterSyntax",
            InnerError::Config(ConfigError::FilterCompile { source, .. }) => quasigo_code(source),
            InnerError::Config(ConfigError::EmptyFilter(_)) => "ConfigError::EmptyFilter",
            InnerError::Config(ConfigError::FilterResult(_)) => "ConfigError::FilterResult",
            InnerError::Config(ConfigError::FilterParam { .. }) => "ConfigError::FilterParam",
        };

        Some(Box::new(c))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let msg = match &self.cause {
            InnerError::Lexer(LexerError::UnexpectedWildcard(_)) => {
                Some("Wildcards such as `$x` can only be used in patterns.")
            }
            InnerError::Pattern(gogrep::CompileError::Unsupported(_, _)) => {
                Some("Patterns match expressions and statements, not declarations.")
            }
            InnerError::Pattern(gogrep::CompileError::Limitation(_)) => {
                Some("Split the pattern into smaller patterns.")
            }
            InnerError::Quasigo(quasigo::CompileError::Unsupported(_, _))
            | InnerError::Config(ConfigError::FilterCompile {
                source: quasigo::CompileError::Unsupported(_, _),
                ..
            }) => Some("Filters support a subset of Go: if, for, locals, calls and basic types."),
            InnerError::Quasigo(quasigo::CompileError::TooManyLocals(_))
            | InnerError::Config(ConfigError::FilterCompile {
                source: quasigo::CompileError::TooManyLocals(_),
                ..
            }) => Some("Move part of the filter into a helper function."),
            InnerError::Config(ConfigError::FilterParam { .. }) => {
                Some("Declare filter parameters as `name *Var`, where `$name` appears in a pattern.")
            }
            _ => None,
        };

        msg.map(|m| Box::new(m) as Box<dyn std::fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(
            miette::LabeledSpan::new_with_span(Some(format!("{}", self.cause)), self.location),
        )))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source_code)
    }
}

fn quasigo_code(err: &quasigo::CompileError) -> &'static str {
    match err {
        quasigo::CompileError::Unsupported(_, _) => "QuasigoError::Unsupported",
        quasigo::CompileError::AssignToParam(_, _) => "QuasigoError::AssignToParam",
        quasigo::CompileError::Shadowing(_, _) => "QuasigoError::Shadowing",
        quasigo::CompileError::TooManyLocals(_) => "QuasigoError::TooManyLocals",
        quasigo::CompileError::TooManyConstants(_) => "QuasigoError::TooManyConstants",
        quasigo::CompileError::TooManyFuncs(_) => "QuasigoError::TooManyFuncs",
        quasigo::CompileError::ResultCount(_) => "QuasigoError::ResultCount",
        quasigo::CompileError::NakedReturn(_) => "QuasigoError::NakedReturn",
        quasigo::CompileError::MissingReturn(_) => "QuasigoError::MissingReturn",
        quasigo::CompileError::Undefined(_, _) => "QuasigoError::Undefined",
        quasigo::CompileError::UnsupportedType(_, _) => "QuasigoError::UnsupportedType",
        quasigo::CompileError::Type(_, _) => "QuasigoError::Type",
        quasigo::CompileError::JumpOutOfRange(_) => "QuasigoError::JumpOutOfRange",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Position;
    use rstest::rstest;

    #[rstest]
    #[case::pattern(
        "f(",
        InnerError::Pattern(gogrep::CompileError::Limitation("too many statements")),
        "PatternError::Limitation"
    )]
    #[case::quasigo(
        "func f() {}",
        InnerError::Quasigo(quasigo::CompileError::ResultCount(Position::new(1, 1))),
        "QuasigoError::ResultCount"
    )]
    #[case::config(
        "",
        InnerError::Config(ConfigError::NoPatterns("a".into())),
        "ConfigError::NoPatterns"
    )]
    fn test_code(#[case] source: &str, #[case] cause: InnerError, #[case] expected: &str) {
        let err = Error::from_error(source, cause);
        assert_eq!(err.code().map(|code| code.to_string()), Some(expected.to_string()));
    }

    #[test]
    fn test_location() {
        let code = "func f(x int) int {\n\tx = 1\n\treturn x\n}";
        let cause = InnerError::Quasigo(quasigo::CompileError::AssignToParam(
            Position::new(2, 2),
            "x".into(),
        ));
        let err = Error::from_error(code, cause);
        assert_eq!(err.location.offset(), 21);
        assert_eq!(err.location.len(), 1);
    }

    #[test]
    fn test_config_error_points_into_filter() {
        let filter = "func f(x *Var) bool { x = nil; return true }".to_string();
        let cause = InnerError::Config(ConfigError::FilterCompile {
            rule: "a".into(),
            filter: filter.clone(),
            source: quasigo::CompileError::AssignToParam(Position::new(1, 23), "x".into()),
        });
        let err = Error::from_error("[[rules]]", cause);
        assert_eq!(err.source_code, filter);
        assert_eq!(err.location.offset(), 22);
    }
}
