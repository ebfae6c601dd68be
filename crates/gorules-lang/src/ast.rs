pub mod error;
pub mod node;
pub mod parser;
pub mod printer;
pub mod walk;

use error::ParseError;
use node::{Expr, File, FuncDecl, Stmt};
use parser::Parser;

use crate::lexer::{Lexer, Options};

pub fn parse_file(code: &str) -> Result<File, ParseError> {
    let tokens = Lexer::new(Options::default()).tokenize(code)?;
    Parser::new(&tokens).parse_file()
}

/// Parses function declarations that are not wrapped in a package clause.
pub fn parse_funcs(code: &str) -> Result<Vec<FuncDecl>, ParseError> {
    let tokens = Lexer::new(Options::default()).tokenize(code)?;
    Parser::new(&tokens).parse_funcs()
}

pub fn parse_exprs(code: &str, allow_wildcards: bool) -> Result<Vec<Expr>, ParseError> {
    let tokens = Lexer::new(Options { allow_wildcards }).tokenize(code)?;
    Parser::new(&tokens).parse_expr_list_to_end()
}

pub fn parse_stmts(code: &str, allow_wildcards: bool) -> Result<Vec<Stmt>, ParseError> {
    let tokens = Lexer::new(Options { allow_wildcards }).tokenize(code)?;
    Parser::new(&tokens).parse_stmt_list_to_end()
}
