use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;

use crate::range::{Position, Range};

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Token {
    pub range: Range,
    pub kind: TokenKind,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    pub fn start(&self) -> Position {
        self.range.start
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.kind)
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum TokenKind {
    // Literals and names. Literal values keep their source text.
    Ident(SmolStr),
    IntLiteral(SmolStr),
    FloatLiteral(SmolStr),
    ImagLiteral(SmolStr),
    CharLiteral(SmolStr),
    StringLiteral(SmolStr),
    /// `$name` (`any == false`) or `$*name` (`any == true`); pattern mode only.
    Wildcard { name: SmolStr, any: bool },

    // Keywords
    Break,
    Case,
    Chan,
    Const,
    Continue,
    Default,
    Defer,
    Else,
    Fallthrough,
    For,
    Func,
    Go,
    Goto,
    If,
    Import,
    Interface,
    Map,
    Package,
    Range,
    Return,
    Select,
    Struct,
    Switch,
    Type,
    Var,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    AndNot,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    ShlAssign,
    ShrAssign,
    AndNotAssign,
    AndAnd,
    OrOr,
    Arrow,
    Inc,
    Dec,
    EqEq,
    Lt,
    Gt,
    Assign,
    Not,
    NeEq,
    Lte,
    Gte,
    Define,
    Ellipsis,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    SemiColon,
    Colon,

    NewLine,
    Eof,
}

impl TokenKind {
    pub(crate) fn keyword(ident: &str) -> Option<TokenKind> {
        let kind = match ident {
            "break" => TokenKind::Break,
            "case" => TokenKind::Case,
            "chan" => TokenKind::Chan,
            "const" => TokenKind::Const,
            "continue" => TokenKind::Continue,
            "default" => TokenKind::Default,
            "defer" => TokenKind::Defer,
            "else" => TokenKind::Else,
            "fallthrough" => TokenKind::Fallthrough,
            "for" => TokenKind::For,
            "func" => TokenKind::Func,
            "go" => TokenKind::Go,
            "goto" => TokenKind::Goto,
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "interface" => TokenKind::Interface,
            "map" => TokenKind::Map,
            "package" => TokenKind::Package,
            "range" => TokenKind::Range,
            "return" => TokenKind::Return,
            "select" => TokenKind::Select,
            "struct" => TokenKind::Struct,
            "switch" => TokenKind::Switch,
            "type" => TokenKind::Type,
            "var" => TokenKind::Var,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether a line break after this token terminates the statement.
    pub(crate) fn ends_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::Ident(_)
                | TokenKind::IntLiteral(_)
                | TokenKind::FloatLiteral(_)
                | TokenKind::ImagLiteral(_)
                | TokenKind::CharLiteral(_)
                | TokenKind::StringLiteral(_)
                | TokenKind::Wildcard { .. }
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Fallthrough
                | TokenKind::Return
                | TokenKind::Inc
                | TokenKind::Dec
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match &self {
            TokenKind::Ident(s)
            | TokenKind::IntLiteral(s)
            | TokenKind::FloatLiteral(s)
            | TokenKind::ImagLiteral(s)
            | TokenKind::CharLiteral(s)
            | TokenKind::StringLiteral(s) => write!(f, "{}", s),
            TokenKind::Wildcard { name, any: false } => write!(f, "${}", name),
            TokenKind::Wildcard { name, any: true } => write!(f, "$*{}", name),
            TokenKind::Break => write!(f, "break"),
            TokenKind::Case => write!(f, "case"),
            TokenKind::Chan => write!(f, "chan"),
            TokenKind::Const => write!(f, "const"),
            TokenKind::Continue => write!(f, "continue"),
            TokenKind::Default => write!(f, "default"),
            TokenKind::Defer => write!(f, "defer"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::Fallthrough => write!(f, "fallthrough"),
            TokenKind::For => write!(f, "for"),
            TokenKind::Func => write!(f, "func"),
            TokenKind::Go => write!(f, "go"),
            TokenKind::Goto => write!(f, "goto"),
            TokenKind::If => write!(f, "if"),
            TokenKind::Import => write!(f, "import"),
            TokenKind::Interface => write!(f, "interface"),
            TokenKind::Map => write!(f, "map"),
            TokenKind::Package => write!(f, "package"),
            TokenKind::Range => write!(f, "range"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::Select => write!(f, "select"),
            TokenKind::Struct => write!(f, "struct"),
            TokenKind::Switch => write!(f, "switch"),
            TokenKind::Type => write!(f, "type"),
            TokenKind::Var => write!(f, "var"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Amp => write!(f, "&"),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::Shl => write!(f, "<<"),
            TokenKind::Shr => write!(f, ">>"),
            TokenKind::AndNot => write!(f, "&^"),
            TokenKind::PlusAssign => write!(f, "+="),
            TokenKind::MinusAssign => write!(f, "-="),
            TokenKind::StarAssign => write!(f, "*="),
            TokenKind::SlashAssign => write!(f, "/="),
            TokenKind::PercentAssign => write!(f, "%="),
            TokenKind::AmpAssign => write!(f, "&="),
            TokenKind::PipeAssign => write!(f, "|="),
            TokenKind::CaretAssign => write!(f, "^="),
            TokenKind::ShlAssign => write!(f, "<<="),
            TokenKind::ShrAssign => write!(f, ">>="),
            TokenKind::AndNotAssign => write!(f, "&^="),
            TokenKind::AndAnd => write!(f, "&&"),
            TokenKind::OrOr => write!(f, "||"),
            TokenKind::Arrow => write!(f, "<-"),
            TokenKind::Inc => write!(f, "++"),
            TokenKind::Dec => write!(f, "--"),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Assign => write!(f, "="),
            TokenKind::Not => write!(f, "!"),
            TokenKind::NeEq => write!(f, "!="),
            TokenKind::Lte => write!(f, "<="),
            TokenKind::Gte => write!(f, ">="),
            TokenKind::Define => write!(f, ":="),
            TokenKind::Ellipsis => write!(f, "..."),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Dot => write!(f, "."),
            TokenKind::SemiColon => write!(f, ";"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::NewLine => writeln!(f),
            TokenKind::Eof => write!(f, "EOF"),
        }
    }
}
