pub mod error;
pub mod token;

use error::LexerError;
use nom::Parser;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{is_not, tag, take_until, take_while, take_while1},
    character::complete::{anychar, char, one_of, satisfy},
    combinator::{map, opt, recognize, value},
    multi::{many0, many1},
    sequence::pair,
};
use smol_str::SmolStr;
use token::{Token, TokenKind};

use crate::range::{Position, Range, Span};

macro_rules! define_token_parser {
    ($name:ident, $tag:expr, $kind:expr) => {
        fn $name(input: Span) -> IResult<Span, Token> {
            map(tag($tag), |span: Span| Token {
                range: span.into(),
                kind: $kind,
            })
            .parse(input)
        }
    };
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Accept `$name` / `$*name` wildcard tokens.
    pub allow_wildcards: bool,
}

pub struct Lexer {
    options: Options,
}

impl Lexer {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, LexerError> {
        match many0(item).parse(Span::new(input)) {
            Ok((rest, items)) => {
                if let Some(c) = rest.fragment().chars().next() {
                    let start = Position::from(rest);
                    return Err(LexerError::UnexpectedCharacter(
                        Range {
                            start,
                            end: Position::new(start.line, start.column + 1),
                        },
                        c,
                    ));
                }

                let tokens = items.into_iter().flatten().collect::<Vec<_>>();

                if !self.options.allow_wildcards {
                    if let Some(token) = tokens
                        .iter()
                        .find(|token| matches!(token.kind, TokenKind::Wildcard { .. }))
                    {
                        return Err(LexerError::UnexpectedWildcard(token.range));
                    }
                }

                let eof = Position::from(rest);
                Ok(insert_semicolons(
                    tokens,
                    Range {
                        start: eof,
                        end: eof,
                    },
                ))
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let start = Position::from(e.input);
                Err(LexerError::UnexpectedCharacter(
                    Range {
                        start,
                        end: Position::new(start.line, start.column + 1),
                    },
                    e.input.fragment().chars().next().unwrap_or('\0'),
                ))
            }
            Err(nom::Err::Incomplete(_)) => unreachable!(),
        }
    }
}

/// Turns line breaks into `;` after tokens that can end a statement and
/// appends the trailing `Eof`.
fn insert_semicolons(tokens: Vec<Token>, eof: Range) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len() + 2);

    for token in tokens {
        if token.kind == TokenKind::NewLine {
            if out.last().is_some_and(|last| last.kind.ends_statement()) {
                out.push(Token {
                    range: token.range,
                    kind: TokenKind::SemiColon,
                });
            }
            continue;
        }
        out.push(token);
    }

    if out.last().is_some_and(|last| last.kind.ends_statement()) {
        out.push(Token {
            range: eof,
            kind: TokenKind::SemiColon,
        });
    }

    out.push(Token {
        range: eof,
        kind: TokenKind::Eof,
    });
    out
}

fn item(input: Span) -> IResult<Span, Option<Token>> {
    alt((
        value(None, whitespace),
        map(newline, Some),
        value(None, line_comment),
        block_comment,
        map(token, Some),
    ))
    .parse(input)
}

fn whitespace(input: Span) -> IResult<Span, Span> {
    take_while1(|c: char| c == ' ' || c == '\t' || c == '\r').parse(input)
}

fn newline(input: Span) -> IResult<Span, Token> {
    map(tag("\n"), |span: Span| Token {
        range: span.into(),
        kind: TokenKind::NewLine,
    })
    .parse(input)
}

fn line_comment(input: Span) -> IResult<Span, Span> {
    recognize(pair(tag("//"), take_while(|c: char| c != '\n'))).parse(input)
}

/// A block comment spanning lines acts like a newline.
fn block_comment(input: Span) -> IResult<Span, Option<Token>> {
    map(
        recognize((tag("/*"), take_until("*/"), tag("*/"))),
        |span: Span| {
            span.fragment().contains('\n').then(|| Token {
                range: span.into(),
                kind: TokenKind::NewLine,
            })
        },
    )
    .parse(input)
}

fn token(input: Span) -> IResult<Span, Token> {
    alt((
        literals,
        wildcard,
        ident,
        punctuations3,
        punctuations2,
        punctuations1,
    ))
    .parse(input)
}

define_token_parser!(shl_assign, "<<=", TokenKind::ShlAssign);
define_token_parser!(shr_assign, ">>=", TokenKind::ShrAssign);
define_token_parser!(and_not_assign, "&^=", TokenKind::AndNotAssign);
define_token_parser!(ellipsis, "...", TokenKind::Ellipsis);
define_token_parser!(and_and, "&&", TokenKind::AndAnd);
define_token_parser!(or_or, "||", TokenKind::OrOr);
define_token_parser!(arrow, "<-", TokenKind::Arrow);
define_token_parser!(inc, "++", TokenKind::Inc);
define_token_parser!(dec, "--", TokenKind::Dec);
define_token_parser!(eq_eq, "==", TokenKind::EqEq);
define_token_parser!(ne_eq, "!=", TokenKind::NeEq);
define_token_parser!(lte, "<=", TokenKind::Lte);
define_token_parser!(gte, ">=", TokenKind::Gte);
define_token_parser!(define, ":=", TokenKind::Define);
define_token_parser!(plus_assign, "+=", TokenKind::PlusAssign);
define_token_parser!(minus_assign, "-=", TokenKind::MinusAssign);
define_token_parser!(star_assign, "*=", TokenKind::StarAssign);
define_token_parser!(slash_assign, "/=", TokenKind::SlashAssign);
define_token_parser!(percent_assign, "%=", TokenKind::PercentAssign);
define_token_parser!(amp_assign, "&=", TokenKind::AmpAssign);
define_token_parser!(pipe_assign, "|=", TokenKind::PipeAssign);
define_token_parser!(caret_assign, "^=", TokenKind::CaretAssign);
define_token_parser!(shl, "<<", TokenKind::Shl);
define_token_parser!(shr, ">>", TokenKind::Shr);
define_token_parser!(and_not, "&^", TokenKind::AndNot);
define_token_parser!(plus, "+", TokenKind::Plus);
define_token_parser!(minus, "-", TokenKind::Minus);
define_token_parser!(star, "*", TokenKind::Star);
define_token_parser!(slash, "/", TokenKind::Slash);
define_token_parser!(percent, "%", TokenKind::Percent);
define_token_parser!(amp, "&", TokenKind::Amp);
define_token_parser!(pipe, "|", TokenKind::Pipe);
define_token_parser!(caret, "^", TokenKind::Caret);
define_token_parser!(lt, "<", TokenKind::Lt);
define_token_parser!(gt, ">", TokenKind::Gt);
define_token_parser!(assign, "=", TokenKind::Assign);
define_token_parser!(not, "!", TokenKind::Not);
define_token_parser!(l_paren, "(", TokenKind::LParen);
define_token_parser!(r_paren, ")", TokenKind::RParen);
define_token_parser!(l_bracket, "[", TokenKind::LBracket);
define_token_parser!(r_bracket, "]", TokenKind::RBracket);
define_token_parser!(l_brace, "{", TokenKind::LBrace);
define_token_parser!(r_brace, "}", TokenKind::RBrace);
define_token_parser!(comma, ",", TokenKind::Comma);
define_token_parser!(dot, ".", TokenKind::Dot);
define_token_parser!(semi_colon, ";", TokenKind::SemiColon);
define_token_parser!(colon, ":", TokenKind::Colon);

fn punctuations3(input: Span) -> IResult<Span, Token> {
    alt((shl_assign, shr_assign, and_not_assign, ellipsis)).parse(input)
}

fn punctuations2(input: Span) -> IResult<Span, Token> {
    alt((
        and_and,
        or_or,
        arrow,
        inc,
        dec,
        eq_eq,
        ne_eq,
        lte,
        gte,
        define,
        plus_assign,
        minus_assign,
        star_assign,
        slash_assign,
        percent_assign,
        amp_assign,
        pipe_assign,
        caret_assign,
        shl,
        shr,
        and_not,
    ))
    .parse(input)
}

fn punctuations1(input: Span) -> IResult<Span, Token> {
    alt((
        alt((plus, minus, star, slash, percent, amp, pipe, caret, lt, gt, assign)),
        alt((
            not, l_paren, r_paren, l_bracket, r_bracket, l_brace, r_brace, comma, dot, semi_colon,
            colon,
        )),
    ))
    .parse(input)
}

fn digits(input: Span) -> IResult<Span, Span> {
    take_while1(|c: char| c.is_ascii_digit() || c == '_').parse(input)
}

fn exponent(input: Span) -> IResult<Span, Span> {
    recognize((one_of("eE"), opt(one_of("+-")), digits)).parse(input)
}

fn prefixed_int(input: Span) -> IResult<Span, Span> {
    recognize(alt((
        pair(
            alt((tag("0x"), tag("0X"))),
            take_while1(|c: char| c.is_ascii_hexdigit() || c == '_'),
        ),
        pair(
            alt((tag("0b"), tag("0B"))),
            take_while1(|c: char| c == '0' || c == '1' || c == '_'),
        ),
        pair(
            alt((tag("0o"), tag("0O"))),
            take_while1(|c: char| ('0'..='7').contains(&c) || c == '_'),
        ),
    )))
    .parse(input)
}

fn decimal(input: Span) -> IResult<Span, Span> {
    recognize(alt((
        recognize((digits, opt(pair(char('.'), opt(digits))), opt(exponent))),
        recognize((char('.'), digits, opt(exponent))),
    )))
    .parse(input)
}

fn number_literal(input: Span) -> IResult<Span, Token> {
    let (rest, number) = alt((prefixed_int, decimal)).parse(input)?;
    let (rest, imag) = opt(char('i')).parse(rest)?;
    let text = number.fragment();
    let range = Range {
        start: Position::from(input),
        end: Position::from(rest),
    };

    let is_prefixed = text.len() > 1
        && text.starts_with('0')
        && matches!(&text[1..2], "x" | "X" | "b" | "B" | "o" | "O");
    let is_float = !is_prefixed && (text.contains('.') || text.contains(['e', 'E']));

    let kind = match (imag, is_float) {
        (Some(_), _) => TokenKind::ImagLiteral(SmolStr::new(format!("{}i", text))),
        (None, true) => TokenKind::FloatLiteral(SmolStr::new(text)),
        (None, false) => TokenKind::IntLiteral(SmolStr::new(text)),
    };

    Ok((rest, Token { range, kind }))
}

fn escaped_body<'a>(input: Span<'a>, quote: &'static str) -> IResult<Span<'a>, Span<'a>> {
    recognize(many0(alt((
        recognize(is_not(quote)),
        recognize(pair(char('\\'), anychar)),
    ))))
    .parse(input)
}

fn char_literal(input: Span) -> IResult<Span, Token> {
    map(
        recognize((
            char('\''),
            many1(alt((
                recognize(is_not("\\'\n")),
                recognize(pair(char('\\'), anychar)),
            ))),
            char('\''),
        )),
        |span: Span| Token {
            range: span.into(),
            kind: TokenKind::CharLiteral(SmolStr::new(span.fragment())),
        },
    )
    .parse(input)
}

fn string_literal(input: Span) -> IResult<Span, Token> {
    map(
        recognize((
            char('"'),
            |i| escaped_body(i, "\\\"\n"),
            char('"'),
        )),
        |span: Span| Token {
            range: span.into(),
            kind: TokenKind::StringLiteral(SmolStr::new(span.fragment())),
        },
    )
    .parse(input)
}

fn raw_string_literal(input: Span) -> IResult<Span, Token> {
    map(
        recognize((char('`'), take_until("`"), char('`'))),
        |span: Span| Token {
            range: span.into(),
            kind: TokenKind::StringLiteral(SmolStr::new(span.fragment())),
        },
    )
    .parse(input)
}

fn literals(input: Span) -> IResult<Span, Token> {
    alt((
        number_literal,
        char_literal,
        string_literal,
        raw_string_literal,
    ))
    .parse(input)
}

fn ident_text(input: Span) -> IResult<Span, Span> {
    recognize(pair(
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn ident(input: Span) -> IResult<Span, Token> {
    map(ident_text, |span: Span| {
        let kind = TokenKind::keyword(span.fragment())
            .unwrap_or_else(|| TokenKind::Ident(SmolStr::new(span.fragment())));
        Token {
            range: span.into(),
            kind,
        }
    })
    .parse(input)
}

fn wildcard(input: Span) -> IResult<Span, Token> {
    let (rest, _) = char('$').parse(input)?;
    let (rest, any) = opt(char('*')).parse(rest)?;
    let (rest, name) = ident_text(rest)?;

    Ok((
        rest,
        Token {
            range: Range {
                start: Position::from(input),
                end: Position::from(rest),
            },
            kind: TokenKind::Wildcard {
                name: SmolStr::new(name.fragment()),
                any: any.is_some(),
            },
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn kinds(code: &str, allow_wildcards: bool) -> Vec<TokenKind> {
        Lexer::new(Options { allow_wildcards })
            .tokenize(code)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[rstest]
    #[case::call("f(x, 1)", vec![
        TokenKind::Ident("f".into()),
        TokenKind::LParen,
        TokenKind::Ident("x".into()),
        TokenKind::Comma,
        TokenKind::IntLiteral("1".into()),
        TokenKind::RParen,
        TokenKind::SemiColon,
        TokenKind::Eof,
    ])]
    #[case::longest_operator("a &^= b <<= 2", vec![
        TokenKind::Ident("a".into()),
        TokenKind::AndNotAssign,
        TokenKind::Ident("b".into()),
        TokenKind::ShlAssign,
        TokenKind::IntLiteral("2".into()),
        TokenKind::SemiColon,
        TokenKind::Eof,
    ])]
    #[case::keywords("for range x {}", vec![
        TokenKind::For,
        TokenKind::Range,
        TokenKind::Ident("x".into()),
        TokenKind::LBrace,
        TokenKind::RBrace,
        TokenKind::SemiColon,
        TokenKind::Eof,
    ])]
    #[case::numbers("0x1F 1.5 .5e3 2i 1_000", vec![
        TokenKind::IntLiteral("0x1F".into()),
        TokenKind::FloatLiteral("1.5".into()),
        TokenKind::FloatLiteral(".5e3".into()),
        TokenKind::ImagLiteral("2i".into()),
        TokenKind::IntLiteral("1_000".into()),
        TokenKind::SemiColon,
        TokenKind::Eof,
    ])]
    #[case::strings(r#""a\"b" `raw` '\n'"#, vec![
        TokenKind::StringLiteral(r#""a\"b""#.into()),
        TokenKind::StringLiteral("`raw`".into()),
        TokenKind::CharLiteral(r"'\n'".into()),
        TokenKind::SemiColon,
        TokenKind::Eof,
    ])]
    fn test_tokenize(#[case] code: &str, #[case] expected: Vec<TokenKind>) {
        assert_eq!(kinds(code, false), expected);
    }

    #[test]
    fn test_semicolon_insertion() {
        let tokens = kinds("x := 1\nif x {\n\treturn\n}\n// done\n", false);
        assert_eq!(
            tokens,
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Define,
                TokenKind::IntLiteral("1".into()),
                TokenKind::SemiColon,
                TokenKind::If,
                TokenKind::Ident("x".into()),
                TokenKind::LBrace,
                TokenKind::Return,
                TokenKind::SemiColon,
                TokenKind::RBrace,
                TokenKind::SemiColon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_no_semicolon_after_operator() {
        let tokens = kinds("a +\nb", false);
        assert_eq!(
            tokens,
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Plus,
                TokenKind::Ident("b".into()),
                TokenKind::SemiColon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_wildcards() {
        let tokens = kinds("f($x, $*_)", true);
        assert_eq!(
            tokens[2],
            TokenKind::Wildcard {
                name: "x".into(),
                any: false
            }
        );
        assert_eq!(
            tokens[4],
            TokenKind::Wildcard {
                name: "_".into(),
                any: true
            }
        );
    }

    #[test]
    fn test_wildcards_rejected_outside_patterns() {
        let result = Lexer::new(Options::default()).tokenize("f($x)");
        assert!(matches!(result, Err(LexerError::UnexpectedWildcard(_))));
    }

    #[test]
    fn test_unexpected_character() {
        let result = Lexer::new(Options::default()).tokenize("a\n  #");
        assert_eq!(
            result,
            Err(LexerError::UnexpectedCharacter(
                Range {
                    start: Position::new(2, 3),
                    end: Position::new(2, 4)
                },
                '#'
            ))
        );
    }

    #[test]
    fn test_unterminated_string() {
        let result = Lexer::new(Options::default()).tokenize("x := \"abc");
        assert!(matches!(
            result,
            Err(LexerError::UnexpectedCharacter(_, '"'))
        ));
    }
}
