//! `gorules-lang` provides the building blocks of a rule engine for Go code:
//! a Go-subset parser, a syntax pattern matcher with wildcards, and a small
//! compiler and VM for filter functions written in Go.
//!
//! ## Examples
//!
//! ```rust
//! use gorules_lang::{NodeRef, Pattern, parse_exprs};
//!
//! let pattern = Pattern::compile("$x == $x").unwrap();
//! let exprs = parse_exprs("a.b == a.b", false).unwrap();
//! let data = pattern.match_node(NodeRef::Expr(&exprs[0])).unwrap();
//! assert_eq!(data.get("x").unwrap().to_string(), "a.b");
//!
//! // Rules combine patterns with a filter and a report template.
//! let rules = gorules_lang::RuleSet::load(r#"
//! [[rules]]
//! name = "selfAssign"
//! patterns = ["$x = $x"]
//! report = "suspicious self-assignment of $x"
//! filter = "func f(x *Var) bool { return x.Pure() }"
//! "#).unwrap();
//!
//! let reports = rules.run_source("package p\nfunc f() {\n\tv = v\n}\n").unwrap();
//! assert_eq!(reports[0].message, "suspicious self-assignment of v");
//! ```
pub mod ast;
mod error;
pub mod gogrep;
pub mod lexer;
pub mod quasigo;
mod range;
pub mod rules;

pub use ast::error::ParseError;
pub use ast::node::{Expr, ExprKind, Field, File, FuncDecl, NodeRef, Stmt, StmtKind};
pub use ast::walk::{walk, walk_file};
pub use ast::{parse_exprs, parse_file, parse_funcs, parse_stmts};
pub use error::{Error, InnerError};
pub use gogrep::{Capture, MatchData, MatcherState, Pattern};
pub use lexer::error::LexerError;
pub use lexer::{Lexer, Options as LexerOptions};
pub use range::{Pos, Position, Range};
pub use rules::{ConfigError, Report, Rule, RuleFile, RuleSet};

pub type Result<T, E = Box<Error>> = std::result::Result<T, E>;

/// Compiles a pattern, reporting errors against `src`.
pub fn compile_pattern(src: &str) -> Result<Pattern> {
    Pattern::compile(src).map_err(|err| Box::new(Error::from_error(src, InnerError::Pattern(err))))
}

/// Loads a TOML rule file, reporting errors against `text`.
pub fn load_rules(text: &str) -> Result<RuleSet> {
    RuleSet::load(text).map_err(|err| Box::new(Error::from_error(text, InnerError::Config(err))))
}

/// Parses a Go source file, reporting errors against `code`.
pub fn parse(code: &str) -> Result<File> {
    parse_file(code).map_err(|err| Box::new(Error::from_error(code, InnerError::Parse(err))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_pattern_error() {
        let err = compile_pattern("f(").unwrap_err();
        assert!(matches!(err.cause, InnerError::Pattern(gogrep::CompileError::Syntax(_))));
    }

    #[test]
    fn test_load_rules_error_points_into_pattern() {
        let err = load_rules("[[rules]]\nname = \"a\"\npatterns = [\"f(\"]\nreport = \"\"\n").unwrap_err();
        assert_eq!(err.source_code, "f(");
    }

    #[test]
    fn test_parse_error() {
        let err = parse("package p\nfunc f() {\n").unwrap_err();
        assert!(matches!(err.cause, InnerError::Parse(_)));
    }
}
