use std::mem;

use smol_str::SmolStr;

use crate::lexer::token::{Token, TokenKind};
use crate::range::{Pos, Range};

use super::error::ParseError;
use super::node::{
    AssignOp, BinaryOp, BranchKind, ChanDir, Expr, ExprKind, Field, File, FuncDecl, FuncType,
    Import, LitKind, Stmt, StmtKind, UnaryOp,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum SimpleMode {
    Basic,
    Labeled,
    Range,
}

struct RangeClause {
    key: Option<Expr>,
    value: Option<Expr>,
    define: bool,
    x: Expr,
    pos: Pos,
}

enum SimpleStmt {
    Stmt(Stmt),
    Range(RangeClause),
}

impl SimpleStmt {
    fn into_stmt(self) -> Result<Stmt, ParseError> {
        match self {
            SimpleStmt::Stmt(stmt) => Ok(stmt),
            SimpleStmt::Range(clause) => Err(ParseError::InvalidSyntax(
                point(clause.pos),
                "range clause is only allowed in for statements",
            )),
        }
    }
}

enum ForHeader {
    Clauses {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
    },
    Range(RangeClause),
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    index: usize,
    /// Below zero inside control clause headers, where `T {` opens a block
    /// instead of a composite literal.
    expr_lev: i32,
}

impl<'a> Parser<'a> {
    /// `tokens` must end with `Eof`, as produced by the lexer.
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            index: 0,
            expr_lev: 0,
        }
    }

    pub fn parse_file(&mut self) -> Result<File, ParseError> {
        self.expect(TokenKind::Package)?;
        let (package, _) = self.parse_ident_name()?;
        self.expect_stmt_end()?;

        let mut imports = Vec::new();
        while self.peek_kind() == &TokenKind::Import {
            self.next();
            if self.eat(&TokenKind::LParen) {
                while self.peek_kind() != &TokenKind::RParen {
                    imports.push(self.parse_import_spec()?);
                    if !self.eat(&TokenKind::SemiColon) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen)?;
            } else {
                imports.push(self.parse_import_spec()?);
            }
            self.expect_stmt_end()?;
        }

        let mut funcs = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::SemiColon => {
                    self.next();
                }
                TokenKind::Func => {
                    funcs.push(self.parse_func_decl()?);
                    self.expect_stmt_end()?;
                }
                TokenKind::Var | TokenKind::Const | TokenKind::Type => self.skip_decl(),
                _ => return Err(ParseError::UnexpectedToken(self.peek().clone())),
            }
        }

        Ok(File {
            package,
            imports,
            funcs,
        })
    }

    /// Parses a sequence of function declarations without a package clause.
    pub fn parse_funcs(&mut self) -> Result<Vec<FuncDecl>, ParseError> {
        let mut funcs = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::SemiColon => {
                    self.next();
                }
                _ => {
                    funcs.push(self.parse_func_decl()?);
                    self.expect_stmt_end()?;
                }
            }
        }
        Ok(funcs)
    }

    /// Parses the whole input as a comma separated expression list.
    pub fn parse_expr_list_to_end(&mut self) -> Result<Vec<Expr>, ParseError> {
        let exprs = self.parse_expr_list()?;
        self.eat(&TokenKind::SemiColon);
        self.expect_eof()?;
        Ok(exprs)
    }

    /// Parses the whole input as a statement list.
    pub fn parse_stmt_list_to_end(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let stmts = self.parse_stmt_list()?;
        self.expect_eof()?;
        Ok(stmts)
    }

    fn parse_import_spec(&mut self) -> Result<Import, ParseError> {
        let name = match self.peek_kind() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.next();
                Some(name)
            }
            TokenKind::Dot => {
                self.next();
                Some(SmolStr::new("."))
            }
            _ => None,
        };

        let token = self.next();
        match &token.kind {
            TokenKind::StringLiteral(path) => Ok(Import {
                name,
                path: path.clone(),
            }),
            _ => Err(ParseError::Expected(token.clone(), "import path")),
        }
    }

    /// Skips a top level `var`, `const` or `type` declaration.
    fn skip_decl(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                    depth = depth.saturating_sub(1)
                }
                TokenKind::SemiColon if depth == 0 => break,
                _ => {}
            }
            self.next();
        }
    }

    fn parse_func_decl(&mut self) -> Result<FuncDecl, ParseError> {
        let pos = self.pos();
        self.expect(TokenKind::Func)?;

        let recv = if self.peek_kind() == &TokenKind::LParen {
            let mut fields = self.parse_params()?;
            if fields.len() != 1 {
                return Err(ParseError::InvalidSyntax(
                    point(pos),
                    "method must have exactly one receiver",
                ));
            }
            fields.pop()
        } else {
            None
        };

        let (name, _) = self.parse_ident_name()?;
        let ty = self.parse_signature()?;
        let body = if self.peek_kind() == &TokenKind::LBrace {
            Some(self.parse_block_stmt()?)
        } else {
            None
        };

        Ok(FuncDecl {
            recv,
            name,
            ty,
            body,
            pos,
        })
    }

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_expr(1)
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat(&TokenKind::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut x = self.parse_unary_expr()?;

        while let Some(op) = binary_op(self.peek_kind()) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.next();
            let y = self.parse_binary_expr(prec + 1)?;
            let pos = x.pos;
            x = Expr::new(
                ExprKind::Binary {
                    op,
                    x: Box::new(x),
                    y: Box::new(y),
                },
                pos,
            );
        }

        Ok(x)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, ParseError> {
        let pos = self.pos();
        let op = match self.peek_kind() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Caret => UnaryOp::Xor,
            TokenKind::Amp => UnaryOp::Addr,
            TokenKind::Arrow => UnaryOp::Recv,
            TokenKind::Star => {
                self.next();
                let x = self.parse_unary_expr()?;
                return Ok(Expr::new(ExprKind::Star(Box::new(x)), pos));
            }
            _ => return self.parse_primary_expr(),
        };
        self.next();

        // `<-chan T`
        if op == UnaryOp::Recv && self.peek_kind() == &TokenKind::Chan {
            self.next();
            let value = self.parse_type()?;
            return Ok(Expr::new(
                ExprKind::ChanType {
                    dir: ChanDir::Recv,
                    value: Box::new(value),
                },
                pos,
            ));
        }

        let x = self.parse_unary_expr()?;
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                x: Box::new(x),
            },
            pos,
        ))
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        let mut x = self.parse_operand()?;

        loop {
            let pos = x.pos;
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.next();
                    let token = self.next();
                    x = match &token.kind {
                        TokenKind::Ident(name) => Expr::new(
                            ExprKind::Selector {
                                x: Box::new(x),
                                sel: Box::new(Expr::new(
                                    ExprKind::Ident(name.clone()),
                                    token.start().into(),
                                )),
                            },
                            pos,
                        ),
                        TokenKind::Wildcard { name, any } => Expr::new(
                            ExprKind::Selector {
                                x: Box::new(x),
                                sel: Box::new(Expr::new(
                                    ExprKind::Wildcard {
                                        name: name.clone(),
                                        any: *any,
                                    },
                                    token.start().into(),
                                )),
                            },
                            pos,
                        ),
                        TokenKind::LParen => {
                            let ty = if self.eat(&TokenKind::Type) {
                                None
                            } else {
                                Some(Box::new(self.parse_type()?))
                            };
                            self.expect(TokenKind::RParen)?;
                            Expr::new(
                                ExprKind::TypeAssert {
                                    x: Box::new(x),
                                    ty,
                                },
                                pos,
                            )
                        }
                        _ => return Err(ParseError::Expected(token.clone(), "selector")),
                    };
                }
                TokenKind::LBracket => {
                    self.next();
                    self.expr_lev += 1;
                    let result = self.parse_index_or_slice(x);
                    self.expr_lev -= 1;
                    x = result?;
                }
                TokenKind::LParen => {
                    self.next();
                    self.expr_lev += 1;
                    let result = self.parse_call_args();
                    self.expr_lev -= 1;
                    let (args, ellipsis) = result?;
                    x = Expr::new(
                        ExprKind::Call {
                            fun: Box::new(x),
                            args,
                            ellipsis,
                        },
                        pos,
                    );
                }
                TokenKind::LBrace
                    if is_literal_type(&x) && (self.expr_lev >= 0 || !is_type_name(&x)) =>
                {
                    x = self.parse_composite_lit(Some(x))?;
                }
                _ => break,
            }
        }

        Ok(x)
    }

    fn parse_index_or_slice(&mut self, x: Expr) -> Result<Expr, ParseError> {
        let pos = x.pos;
        let mut index: [Option<Box<Expr>>; 3] = [None, None, None];
        let mut colons = 0;

        if self.peek_kind() != &TokenKind::Colon {
            index[0] = Some(Box::new(self.parse_expr()?));
        }
        while self.peek_kind() == &TokenKind::Colon && colons < 2 {
            self.next();
            colons += 1;
            if !matches!(
                self.peek_kind(),
                TokenKind::Colon | TokenKind::RBracket
            ) {
                index[colons] = Some(Box::new(self.parse_expr()?));
            }
        }
        let close = self.expect(TokenKind::RBracket)?;

        let [low, high, max] = index;
        if colons == 0 {
            return match low {
                Some(index) => Ok(Expr::new(
                    ExprKind::Index {
                        x: Box::new(x),
                        index,
                    },
                    pos,
                )),
                None => Err(ParseError::Expected(close.clone(), "operand")),
            };
        }

        let slice3 = colons == 2;
        if slice3 && (high.is_none() || max.is_none()) {
            return Err(ParseError::InvalidSyntax(
                close.range,
                "middle and final index required in 3-index slice",
            ));
        }

        Ok(Expr::new(
            ExprKind::Slice {
                x: Box::new(x),
                low,
                high,
                max,
                slice3,
            },
            pos,
        ))
    }

    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, bool), ParseError> {
        let mut args = Vec::new();
        let mut ellipsis = false;

        while self.peek_kind() != &TokenKind::RParen {
            args.push(self.parse_expr()?);
            if self.eat(&TokenKind::Ellipsis) {
                ellipsis = true;
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        Ok((args, ellipsis))
    }

    fn parse_operand(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek();
        let pos: Pos = token.start().into();

        let kind = match &token.kind {
            TokenKind::Ident(name) => ExprKind::Ident(name.clone()),
            TokenKind::Wildcard { name, any } => ExprKind::Wildcard {
                name: name.clone(),
                any: *any,
            },
            TokenKind::IntLiteral(value) => basic_lit(LitKind::Int, value),
            TokenKind::FloatLiteral(value) => basic_lit(LitKind::Float, value),
            TokenKind::ImagLiteral(value) => basic_lit(LitKind::Imag, value),
            TokenKind::CharLiteral(value) => basic_lit(LitKind::Char, value),
            TokenKind::StringLiteral(value) => basic_lit(LitKind::String, value),
            TokenKind::LParen => {
                self.next();
                self.expr_lev += 1;
                let result = self.parse_expr();
                self.expr_lev -= 1;
                let x = result?;
                self.expect(TokenKind::RParen)?;
                return Ok(Expr::new(ExprKind::Paren(Box::new(x)), pos));
            }
            TokenKind::Func => {
                self.next();
                let ty = self.parse_signature()?;
                if self.peek_kind() == &TokenKind::LBrace {
                    self.expr_lev += 1;
                    let result = self.parse_block_stmt();
                    self.expr_lev -= 1;
                    return Ok(Expr::new(
                        ExprKind::FuncLit {
                            ty: Box::new(ty),
                            body: Box::new(result?),
                        },
                        pos,
                    ));
                }
                return Ok(Expr::new(ExprKind::FuncType(Box::new(ty)), pos));
            }
            TokenKind::LBracket
            | TokenKind::Map
            | TokenKind::Chan
            | TokenKind::Struct
            | TokenKind::Interface => return self.parse_type(),
            _ => return Err(ParseError::Expected(token.clone(), "expression")),
        };

        self.next();
        Ok(Expr::new(kind, pos))
    }

    fn parse_composite_lit(&mut self, ty: Option<Expr>) -> Result<Expr, ParseError> {
        let lbrace = self.expect(TokenKind::LBrace)?;
        let pos = ty
            .as_ref()
            .map(|ty| ty.pos)
            .unwrap_or_else(|| lbrace.start().into());

        self.expr_lev += 1;
        let result = self.parse_elements();
        self.expr_lev -= 1;
        let elts = result?;
        self.expect(TokenKind::RBrace)?;

        Ok(Expr::new(
            ExprKind::CompositeLit {
                ty: ty.map(Box::new),
                elts,
            },
            pos,
        ))
    }

    fn parse_elements(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut elts = Vec::new();
        while self.peek_kind() != &TokenKind::RBrace {
            let key = self.parse_element_value()?;
            if self.eat(&TokenKind::Colon) {
                let value = self.parse_element_value()?;
                let pos = key.pos;
                elts.push(Expr::new(
                    ExprKind::KeyValue {
                        key: Box::new(key),
                        value: Box::new(value),
                    },
                    pos,
                ));
            } else {
                elts.push(key);
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(elts)
    }

    fn parse_element_value(&mut self) -> Result<Expr, ParseError> {
        if self.peek_kind() == &TokenKind::LBrace {
            self.parse_composite_lit(None)
        } else {
            self.parse_expr()
        }
    }

    pub fn parse_type(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek();
        let pos: Pos = token.start().into();

        match &token.kind {
            TokenKind::Ident(_) | TokenKind::Wildcard { .. } => {
                let x = self.parse_operand()?;
                if self.peek_kind() == &TokenKind::Dot
                    && matches!(
                        self.peek_nth(1),
                        TokenKind::Ident(_) | TokenKind::Wildcard { .. }
                    )
                {
                    self.next();
                    let sel = self.parse_operand()?;
                    return Ok(Expr::new(
                        ExprKind::Selector {
                            x: Box::new(x),
                            sel: Box::new(sel),
                        },
                        pos,
                    ));
                }
                Ok(x)
            }
            TokenKind::Star => {
                self.next();
                let x = self.parse_type()?;
                Ok(Expr::new(ExprKind::Star(Box::new(x)), pos))
            }
            TokenKind::LBracket => {
                self.next();
                let len = if self.eat(&TokenKind::RBracket) {
                    None
                } else {
                    let len = if self.peek_kind() == &TokenKind::Ellipsis {
                        let ellipsis = self.next();
                        Expr::new(ExprKind::Ellipsis(None), ellipsis.start().into())
                    } else {
                        self.expr_lev += 1;
                        let result = self.parse_expr();
                        self.expr_lev -= 1;
                        result?
                    };
                    self.expect(TokenKind::RBracket)?;
                    Some(Box::new(len))
                };
                let elem = self.parse_type()?;
                Ok(Expr::new(
                    ExprKind::ArrayType {
                        len,
                        elem: Box::new(elem),
                    },
                    pos,
                ))
            }
            TokenKind::Map => {
                self.next();
                self.expect(TokenKind::LBracket)?;
                let key = self.parse_type()?;
                self.expect(TokenKind::RBracket)?;
                let value = self.parse_type()?;
                Ok(Expr::new(
                    ExprKind::MapType {
                        key: Box::new(key),
                        value: Box::new(value),
                    },
                    pos,
                ))
            }
            TokenKind::Chan => {
                self.next();
                let dir = if self.eat(&TokenKind::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                let value = self.parse_type()?;
                Ok(Expr::new(
                    ExprKind::ChanType {
                        dir,
                        value: Box::new(value),
                    },
                    pos,
                ))
            }
            TokenKind::Arrow => {
                self.next();
                self.expect(TokenKind::Chan)?;
                let value = self.parse_type()?;
                Ok(Expr::new(
                    ExprKind::ChanType {
                        dir: ChanDir::Recv,
                        value: Box::new(value),
                    },
                    pos,
                ))
            }
            TokenKind::Func => {
                self.next();
                let ty = self.parse_signature()?;
                Ok(Expr::new(ExprKind::FuncType(Box::new(ty)), pos))
            }
            TokenKind::Struct => self.parse_struct_type(),
            TokenKind::Interface => self.parse_interface_type(),
            TokenKind::LParen => {
                self.next();
                let x = self.parse_type()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::new(ExprKind::Paren(Box::new(x)), pos))
            }
            _ => Err(ParseError::Expected(token.clone(), "type")),
        }
    }

    fn parse_struct_type(&mut self) -> Result<Expr, ParseError> {
        let pos = self.pos();
        self.expect(TokenKind::Struct)?;
        self.expect(TokenKind::LBrace)?;

        let mut fields = Vec::new();
        while self.peek_kind() != &TokenKind::RBrace {
            let field_pos = self.pos();
            let first = self.parse_type()?;
            let field = if self.eat(&TokenKind::Comma) {
                let mut names = vec![first];
                loop {
                    names.push(self.parse_name()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                let ty = self.parse_type()?;
                Field {
                    names,
                    ty,
                    pos: field_pos,
                }
            } else if !matches!(
                self.peek_kind(),
                TokenKind::SemiColon | TokenKind::RBrace | TokenKind::StringLiteral(_)
            ) {
                let ty = self.parse_type()?;
                Field {
                    names: vec![first],
                    ty,
                    pos: field_pos,
                }
            } else {
                Field {
                    names: Vec::new(),
                    ty: first,
                    pos: field_pos,
                }
            };

            // Tags are not kept.
            if matches!(self.peek_kind(), TokenKind::StringLiteral(_)) {
                self.next();
            }
            fields.push(field);
            if !self.eat(&TokenKind::SemiColon) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Expr::new(ExprKind::StructType(fields), pos))
    }

    fn parse_interface_type(&mut self) -> Result<Expr, ParseError> {
        let pos = self.pos();
        self.expect(TokenKind::Interface)?;
        self.expect(TokenKind::LBrace)?;

        let mut methods = Vec::new();
        while self.peek_kind() != &TokenKind::RBrace {
            let field_pos = self.pos();
            let field = if matches!(self.peek_kind(), TokenKind::Ident(_))
                && self.peek_nth(1) == &TokenKind::LParen
            {
                let name = self.parse_name()?;
                let sig = self.parse_signature()?;
                Field {
                    names: vec![name],
                    ty: Expr::new(ExprKind::FuncType(Box::new(sig)), field_pos),
                    pos: field_pos,
                }
            } else {
                Field {
                    names: Vec::new(),
                    ty: self.parse_type()?,
                    pos: field_pos,
                }
            };
            methods.push(field);
            if !self.eat(&TokenKind::SemiColon) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Expr::new(ExprKind::InterfaceType(methods), pos))
    }

    fn parse_signature(&mut self) -> Result<FuncType, ParseError> {
        let params = self.parse_params()?;
        let results = match self.peek_kind() {
            TokenKind::LParen => self.parse_params()?,
            kind if starts_type(kind) => {
                let pos = self.pos();
                vec![Field {
                    names: Vec::new(),
                    ty: self.parse_type()?,
                    pos,
                }]
            }
            _ => Vec::new(),
        };
        Ok(FuncType { params, results })
    }

    /// Parses a parenthesized parameter list. Entries are either all types
    /// or all `name Type` groups, where consecutive names share the next type.
    fn parse_params(&mut self) -> Result<Vec<Field>, ParseError> {
        self.expect(TokenKind::LParen)?;

        let mut entries: Vec<(Expr, Option<Expr>)> = Vec::new();
        while self.peek_kind() != &TokenKind::RParen {
            let first = self.parse_param_type()?;
            let second = if matches!(self.peek_kind(), TokenKind::Comma | TokenKind::RParen) {
                None
            } else {
                Some(self.parse_param_type()?)
            };
            entries.push((first, second));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(TokenKind::RParen)?;

        if !entries.iter().any(|(_, ty)| ty.is_some()) {
            return Ok(entries
                .into_iter()
                .map(|(ty, _)| Field {
                    names: Vec::new(),
                    pos: ty.pos,
                    ty,
                })
                .collect());
        }

        let mut fields = Vec::new();
        let mut names: Vec<Expr> = Vec::new();
        for (name, ty) in entries {
            if !matches!(name.kind, ExprKind::Ident(_) | ExprKind::Wildcard { .. }) {
                return Err(ParseError::InvalidSyntax(
                    point(name.pos),
                    "mixed named and unnamed parameters",
                ));
            }
            names.push(name);
            if let Some(ty) = ty {
                let pos = names[0].pos;
                fields.push(Field {
                    names: mem::take(&mut names),
                    ty,
                    pos,
                });
            }
        }
        if !names.is_empty() {
            return Err(ParseError::InvalidSyntax(
                close.range,
                "mixed named and unnamed parameters",
            ));
        }

        Ok(fields)
    }

    fn parse_param_type(&mut self) -> Result<Expr, ParseError> {
        if self.peek_kind() == &TokenKind::Ellipsis {
            let pos = self.pos();
            self.next();
            let elem = self.parse_type()?;
            return Ok(Expr::new(ExprKind::Ellipsis(Some(Box::new(elem))), pos));
        }
        self.parse_type()
    }

    fn parse_name(&mut self) -> Result<Expr, ParseError> {
        let token = self.next();
        let kind = match &token.kind {
            TokenKind::Ident(name) => ExprKind::Ident(name.clone()),
            TokenKind::Wildcard { name, any } => ExprKind::Wildcard {
                name: name.clone(),
                any: *any,
            },
            _ => return Err(ParseError::Expected(token.clone(), "identifier")),
        };
        Ok(Expr::new(kind, token.start().into()))
    }

    fn parse_ident_name(&mut self) -> Result<(SmolStr, Pos), ParseError> {
        let token = self.next();
        match &token.kind {
            TokenKind::Ident(name) => Ok((name.clone(), token.start().into())),
            _ => Err(ParseError::Expected(token.clone(), "identifier")),
        }
    }

    pub fn parse_stmt_list(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();

        while !matches!(
            self.peek_kind(),
            TokenKind::RBrace | TokenKind::Eof | TokenKind::Case | TokenKind::Default
        ) {
            if self.eat(&TokenKind::SemiColon) {
                continue;
            }
            stmts.push(self.parse_stmt()?);
            self.expect_stmt_end()?;
        }

        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let token = self.peek();
        let pos: Pos = token.start().into();

        match &token.kind {
            TokenKind::Var => self.parse_var_decl(),
            TokenKind::Go => {
                self.next();
                let call = self.parse_expr()?;
                Ok(Stmt::new(StmtKind::Go(call), pos))
            }
            TokenKind::Defer => {
                self.next();
                let call = self.parse_expr()?;
                Ok(Stmt::new(StmtKind::Defer(call), pos))
            }
            TokenKind::Return => {
                self.next();
                let results = if matches!(
                    self.peek_kind(),
                    TokenKind::SemiColon | TokenKind::RBrace | TokenKind::Eof
                ) {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                Ok(Stmt::new(StmtKind::Return(results), pos))
            }
            TokenKind::Break | TokenKind::Continue | TokenKind::Goto | TokenKind::Fallthrough => {
                let kind = match &token.kind {
                    TokenKind::Break => BranchKind::Break,
                    TokenKind::Continue => BranchKind::Continue,
                    TokenKind::Goto => BranchKind::Goto,
                    _ => BranchKind::Fallthrough,
                };
                self.next();
                let label = match self.peek_kind() {
                    TokenKind::Ident(name) => {
                        let name = name.clone();
                        self.next();
                        Some(name)
                    }
                    _ => None,
                };
                Ok(Stmt::new(StmtKind::Branch { kind, label }, pos))
            }
            TokenKind::LBrace => self.parse_block_stmt(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::SemiColon => Ok(Stmt::new(StmtKind::Empty, pos)),
            TokenKind::Const
            | TokenKind::Type
            | TokenKind::Select
            | TokenKind::Import
            | TokenKind::Package => Err(ParseError::UnexpectedToken(token.clone())),
            _ => self.parse_simple_stmt(SimpleMode::Labeled)?.into_stmt(),
        }
    }

    fn parse_simple_stmt(&mut self, mode: SimpleMode) -> Result<SimpleStmt, ParseError> {
        let pos = self.pos();

        if mode == SimpleMode::Range && self.eat(&TokenKind::Range) {
            let x = self.parse_expr()?;
            return Ok(SimpleStmt::Range(RangeClause {
                key: None,
                value: None,
                define: false,
                x,
                pos,
            }));
        }

        let mut lhs = self.parse_expr_list()?;
        let token = self.peek();

        if let Some(op) = assign_op(&token.kind) {
            self.next();

            if mode == SimpleMode::Range
                && matches!(op, AssignOp::Assign | AssignOp::Define)
                && self.eat(&TokenKind::Range)
            {
                if lhs.len() > 2 {
                    return Err(ParseError::InvalidSyntax(
                        token.range,
                        "range clause permits at most two iteration variables",
                    ));
                }
                let x = self.parse_expr()?;
                let mut vars = lhs.into_iter();
                return Ok(SimpleStmt::Range(RangeClause {
                    key: vars.next(),
                    value: vars.next(),
                    define: op == AssignOp::Define,
                    x,
                    pos,
                }));
            }

            let rhs = self.parse_expr_list()?;
            return Ok(SimpleStmt::Stmt(Stmt::new(
                StmtKind::Assign { lhs, op, rhs },
                pos,
            )));
        }

        let kind = match &token.kind {
            TokenKind::Colon
                if mode == SimpleMode::Labeled
                    && lhs.len() == 1
                    && lhs[0].ident_name().is_some() =>
            {
                self.next();
                let label = lhs[0].ident_name().cloned().unwrap_or_default();
                let stmt = if matches!(self.peek_kind(), TokenKind::RBrace) {
                    Stmt::new(StmtKind::Empty, self.pos())
                } else {
                    self.parse_stmt()?
                };
                StmtKind::Labeled {
                    label,
                    stmt: Box::new(stmt),
                }
            }
            TokenKind::Arrow => {
                self.next();
                let chan = single(&mut lhs, token)?;
                let value = self.parse_expr()?;
                StmtKind::Send { chan, value }
            }
            TokenKind::Inc | TokenKind::Dec => {
                self.next();
                let x = single(&mut lhs, token)?;
                StmtKind::IncDec {
                    x,
                    inc: token.kind == TokenKind::Inc,
                }
            }
            _ => StmtKind::Expr(single(&mut lhs, token)?),
        };

        Ok(SimpleStmt::Stmt(Stmt::new(kind, pos)))
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.pos();
        self.expect(TokenKind::Var)?;

        let mut names = vec![self.parse_name()?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.parse_name()?);
        }

        let ty = if matches!(
            self.peek_kind(),
            TokenKind::Assign | TokenKind::SemiColon | TokenKind::RBrace | TokenKind::Eof
        ) {
            None
        } else {
            Some(self.parse_type()?)
        };

        let values = if self.eat(&TokenKind::Assign) {
            self.parse_expr_list()?
        } else {
            Vec::new()
        };

        Ok(Stmt::new(StmtKind::Var { names, ty, values }, pos))
    }

    fn parse_block_stmt(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.pos();
        self.expect(TokenKind::LBrace)?;
        let stmts = self.parse_stmt_list()?;
        self.expect(TokenKind::RBrace)?;
        Ok(Stmt::new(StmtKind::Block(stmts), pos))
    }

    /// Runs `f` with composite literals of type names disabled.
    fn in_header<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let outer = self.expr_lev;
        self.expr_lev = -1;
        let result = f(self);
        self.expr_lev = outer;
        result
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.pos();
        self.expect(TokenKind::If)?;

        if self.peek_kind() == &TokenKind::LBrace {
            return Err(ParseError::Expected(self.peek().clone(), "condition"));
        }

        let (init, cond) = self.in_header(|p| {
            let stmt = if p.peek_kind() != &TokenKind::SemiColon {
                Some(p.parse_simple_stmt(SimpleMode::Basic)?.into_stmt()?)
            } else {
                None
            };
            if p.eat(&TokenKind::SemiColon) {
                let cond = p.parse_expr()?;
                Ok((stmt.map(Box::new), cond))
            } else {
                let token = p.peek();
                match stmt.map(|stmt| stmt.kind) {
                    Some(StmtKind::Expr(cond)) => Ok((None, cond)),
                    _ => Err(ParseError::Expected(token.clone(), "condition")),
                }
            }
        })?;

        let body = self.parse_block_stmt()?;
        let els = if self.eat(&TokenKind::Else) {
            match self.peek_kind() {
                TokenKind::If => Some(Box::new(self.parse_if_stmt()?)),
                TokenKind::LBrace => Some(Box::new(self.parse_block_stmt()?)),
                _ => {
                    return Err(ParseError::Expected(
                        self.peek().clone(),
                        "if statement or block",
                    ));
                }
            }
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::If {
                init,
                cond,
                body: Box::new(body),
                els,
            },
            pos,
        ))
    }

    fn parse_switch_stmt(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.pos();
        self.expect(TokenKind::Switch)?;

        let (init, tag) = self.in_header(|p| {
            let mut init = None;
            let mut tag = None;
            if p.peek_kind() != &TokenKind::LBrace {
                if p.peek_kind() != &TokenKind::SemiColon {
                    tag = Some(p.parse_simple_stmt(SimpleMode::Basic)?.into_stmt()?);
                }
                if p.eat(&TokenKind::SemiColon) {
                    init = tag.take();
                    if p.peek_kind() != &TokenKind::LBrace {
                        tag = Some(p.parse_simple_stmt(SimpleMode::Basic)?.into_stmt()?);
                    }
                }
            }
            Ok((init.map(Box::new), tag))
        })?;

        let body_pos = self.pos();
        self.expect(TokenKind::LBrace)?;
        let mut clauses = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Case | TokenKind::Default => clauses.push(self.parse_case_clause()?),
                // A wildcard stands in for any number of clauses.
                TokenKind::Wildcard { .. } => {
                    clauses.push(self.parse_stmt()?);
                    self.expect_stmt_end()?;
                }
                TokenKind::SemiColon => {
                    self.next();
                }
                _ => break,
            }
        }
        self.expect(TokenKind::RBrace)?;
        let body = Box::new(Stmt::new(StmtKind::Block(clauses), body_pos));

        let kind = match tag {
            Some(stmt) if is_type_switch_guard(&stmt) => StmtKind::TypeSwitch {
                init,
                assign: Box::new(stmt),
                body,
            },
            Some(Stmt {
                kind: StmtKind::Expr(tag),
                ..
            }) => StmtKind::Switch {
                init,
                tag: Some(tag),
                body,
            },
            Some(stmt) => {
                return Err(ParseError::InvalidSyntax(
                    point(stmt.pos),
                    "switch expression must be an expression",
                ));
            }
            None => StmtKind::Switch {
                init,
                tag: None,
                body,
            },
        };

        Ok(Stmt::new(kind, pos))
    }

    fn parse_case_clause(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.pos();
        let list = if self.eat(&TokenKind::Case) {
            Some(self.parse_expr_list()?)
        } else {
            self.expect(TokenKind::Default)?;
            None
        };
        self.expect(TokenKind::Colon)?;
        let body = self.parse_stmt_list()?;
        Ok(Stmt::new(StmtKind::Case { list, body }, pos))
    }

    fn parse_for_stmt(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.pos();
        self.expect(TokenKind::For)?;

        let header = self.in_header(|p| {
            if p.peek_kind() == &TokenKind::LBrace {
                return Ok(ForHeader::Clauses {
                    init: None,
                    cond: None,
                    post: None,
                });
            }

            let first = if p.peek_kind() != &TokenKind::SemiColon {
                match p.parse_simple_stmt(SimpleMode::Range)? {
                    SimpleStmt::Range(clause) => return Ok(ForHeader::Range(clause)),
                    SimpleStmt::Stmt(stmt) => Some(stmt),
                }
            } else {
                None
            };

            if p.eat(&TokenKind::SemiColon) {
                let cond = if p.peek_kind() != &TokenKind::SemiColon {
                    Some(p.parse_expr()?)
                } else {
                    None
                };
                p.expect(TokenKind::SemiColon)?;
                let post = if p.peek_kind() != &TokenKind::LBrace {
                    Some(Box::new(
                        p.parse_simple_stmt(SimpleMode::Basic)?.into_stmt()?,
                    ))
                } else {
                    None
                };
                return Ok(ForHeader::Clauses {
                    init: first.map(Box::new),
                    cond,
                    post,
                });
            }

            let token = p.peek();
            match first.map(|stmt| stmt.kind) {
                Some(StmtKind::Expr(cond)) => Ok(ForHeader::Clauses {
                    init: None,
                    cond: Some(cond),
                    post: None,
                }),
                _ => Err(ParseError::Expected(token.clone(), "for loop condition")),
            }
        })?;

        let body = Box::new(self.parse_block_stmt()?);

        let kind = match header {
            ForHeader::Range(RangeClause {
                key,
                value,
                define,
                x,
                ..
            }) => StmtKind::Range {
                key,
                value,
                define,
                x,
                body,
            },
            ForHeader::Clauses { init, cond, post } => StmtKind::For {
                init,
                cond,
                post,
                body,
            },
        };

        Ok(Stmt::new(kind, pos))
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token {
        let tokens = self.tokens;
        &tokens[self.index.min(tokens.len() - 1)]
    }

    #[inline(always)]
    fn peek_kind(&self) -> &'a TokenKind {
        &self.peek().kind
    }

    fn peek_nth(&self, n: usize) -> &'a TokenKind {
        let tokens = self.tokens;
        &tokens[(self.index + n).min(tokens.len() - 1)].kind
    }

    fn next(&mut self) -> &'a Token {
        let token = self.peek();
        if !token.is_eof() {
            self.index += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'a Token, ParseError> {
        let token = self.peek();
        if token.kind == kind {
            self.next();
            Ok(token)
        } else {
            Err(ParseError::ExpectedToken(token.clone(), kind))
        }
    }

    /// A statement ends with `;` unless the enclosing list closes right after it.
    fn expect_stmt_end(&mut self) -> Result<(), ParseError> {
        match self.peek_kind() {
            TokenKind::SemiColon => {
                self.next();
                Ok(())
            }
            TokenKind::RBrace
            | TokenKind::RParen
            | TokenKind::Eof
            | TokenKind::Case
            | TokenKind::Default => Ok(()),
            _ => Err(ParseError::ExpectedToken(
                self.peek().clone(),
                TokenKind::SemiColon,
            )),
        }
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        let token = self.peek();
        if token.is_eof() {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken(token.clone()))
        }
    }

    fn pos(&self) -> Pos {
        self.peek().start().into()
    }
}

fn point(pos: Pos) -> Range {
    Range {
        start: pos.0,
        end: pos.0,
    }
}

fn basic_lit(kind: LitKind, value: &SmolStr) -> ExprKind {
    ExprKind::BasicLit {
        kind,
        value: value.clone(),
    }
}

fn single(exprs: &mut Vec<Expr>, token: &Token) -> Result<Expr, ParseError> {
    if exprs.len() != 1 {
        return Err(ParseError::InvalidSyntax(
            token.range,
            "expected 1 expression",
        ));
    }
    exprs
        .pop()
        .ok_or(ParseError::InvalidSyntax(token.range, "expected 1 expression"))
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Quo,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::Amp => BinaryOp::And,
        TokenKind::Pipe => BinaryOp::Or,
        TokenKind::Caret => BinaryOp::Xor,
        TokenKind::Shl => BinaryOp::Shl,
        TokenKind::Shr => BinaryOp::Shr,
        TokenKind::AndNot => BinaryOp::AndNot,
        TokenKind::AndAnd => BinaryOp::LAnd,
        TokenKind::OrOr => BinaryOp::LOr,
        TokenKind::EqEq => BinaryOp::Eql,
        TokenKind::NeEq => BinaryOp::Neq,
        TokenKind::Lt => BinaryOp::Lss,
        TokenKind::Gt => BinaryOp::Gtr,
        TokenKind::Lte => BinaryOp::Leq,
        TokenKind::Gte => BinaryOp::Geq,
        _ => return None,
    };
    Some(op)
}

fn assign_op(kind: &TokenKind) -> Option<AssignOp> {
    let op = match kind {
        TokenKind::Assign => AssignOp::Assign,
        TokenKind::Define => AssignOp::Define,
        TokenKind::PlusAssign => AssignOp::Op(BinaryOp::Add),
        TokenKind::MinusAssign => AssignOp::Op(BinaryOp::Sub),
        TokenKind::StarAssign => AssignOp::Op(BinaryOp::Mul),
        TokenKind::SlashAssign => AssignOp::Op(BinaryOp::Quo),
        TokenKind::PercentAssign => AssignOp::Op(BinaryOp::Rem),
        TokenKind::AmpAssign => AssignOp::Op(BinaryOp::And),
        TokenKind::PipeAssign => AssignOp::Op(BinaryOp::Or),
        TokenKind::CaretAssign => AssignOp::Op(BinaryOp::Xor),
        TokenKind::ShlAssign => AssignOp::Op(BinaryOp::Shl),
        TokenKind::ShrAssign => AssignOp::Op(BinaryOp::Shr),
        TokenKind::AndNotAssign => AssignOp::Op(BinaryOp::AndNot),
        _ => return None,
    };
    Some(op)
}

fn starts_type(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident(_)
            | TokenKind::Wildcard { .. }
            | TokenKind::Star
            | TokenKind::LBracket
            | TokenKind::Map
            | TokenKind::Chan
            | TokenKind::Func
            | TokenKind::Struct
            | TokenKind::Interface
            | TokenKind::Arrow
    )
}

fn is_type_name(x: &Expr) -> bool {
    match &x.kind {
        ExprKind::Ident(_) | ExprKind::Wildcard { .. } => true,
        ExprKind::Selector { x, .. } => matches!(x.kind, ExprKind::Ident(_)),
        _ => false,
    }
}

fn is_literal_type(x: &Expr) -> bool {
    is_type_name(x)
        || matches!(
            x.kind,
            ExprKind::ArrayType { .. } | ExprKind::StructType(_) | ExprKind::MapType { .. }
        )
}

fn is_type_switch_guard(stmt: &Stmt) -> bool {
    let is_guard = |expr: &Expr| matches!(expr.kind, ExprKind::TypeAssert { ty: None, .. });
    match &stmt.kind {
        StmtKind::Expr(expr) => is_guard(expr),
        StmtKind::Assign {
            op: AssignOp::Define,
            rhs,
            ..
        } => rhs.len() == 1 && is_guard(&rhs[0]),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Lexer, Options};
    use rstest::rstest;

    fn tokens(code: &str) -> Vec<Token> {
        Lexer::new(Options {
            allow_wildcards: true,
        })
        .tokenize(code)
        .unwrap()
    }

    fn stmts(code: &str) -> Vec<Stmt> {
        let tokens = tokens(code);
        Parser::new(&tokens).parse_stmt_list_to_end().unwrap()
    }

    fn expr(code: &str) -> Expr {
        let tokens = tokens(code);
        let mut exprs = Parser::new(&tokens).parse_expr_list_to_end().unwrap();
        assert_eq!(exprs.len(), 1);
        exprs.remove(0)
    }

    #[test]
    fn test_binary_precedence() {
        let x = expr("a + b * c == d || e");
        let ExprKind::Binary { op, x: lhs, .. } = &x.kind else {
            panic!("expected binary expression");
        };
        assert_eq!(*op, BinaryOp::LOr);
        let ExprKind::Binary { op, x: lhs, .. } = &lhs.kind else {
            panic!("expected binary expression");
        };
        assert_eq!(*op, BinaryOp::Eql);
        let ExprKind::Binary { op, y, .. } = &lhs.kind else {
            panic!("expected binary expression");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            y.kind,
            ExprKind::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[rstest]
    #[case::slice("s[1:2]", false)]
    #[case::slice3("s[1:2:3]", true)]
    fn test_slice(#[case] code: &str, #[case] expected_slice3: bool) {
        let x = expr(code);
        assert!(matches!(x.kind, ExprKind::Slice { slice3, .. } if slice3 == expected_slice3));
    }

    #[test]
    fn test_composite_literal_not_allowed_in_if_header() {
        let stmts = stmts("if x == y { return }");
        let StmtKind::If { cond, body, .. } = &stmts[0].kind else {
            panic!("expected if statement");
        };
        assert!(matches!(cond.kind, ExprKind::Binary { .. }));
        assert_eq!(
            body.block_stmts().map(|stmts| stmts.len()),
            Some(1)
        );
    }

    #[test]
    fn test_composite_literal() {
        let x = expr("[]T{{1, 2}, {a: 3}}");
        let ExprKind::CompositeLit { ty, elts } = &x.kind else {
            panic!("expected composite literal");
        };
        assert!(ty.is_some());
        assert_eq!(elts.len(), 2);
        assert!(matches!(
            &elts[1].kind,
            ExprKind::CompositeLit { ty: None, elts } if matches!(elts[0].kind, ExprKind::KeyValue { .. })
        ));
    }

    #[test]
    fn test_for_forms() {
        let stmts = stmts(
            "for {}\nfor x {}\nfor i := 0; i < n; i++ {}\nfor k, v := range m {}\nfor range ch {}",
        );
        assert!(matches!(
            stmts[0].kind,
            StmtKind::For {
                init: None,
                cond: None,
                post: None,
                ..
            }
        ));
        assert!(matches!(
            stmts[1].kind,
            StmtKind::For {
                init: None,
                cond: Some(_),
                post: None,
                ..
            }
        ));
        assert!(matches!(
            stmts[2].kind,
            StmtKind::For {
                init: Some(_),
                cond: Some(_),
                post: Some(_),
                ..
            }
        ));
        assert!(matches!(
            stmts[3].kind,
            StmtKind::Range {
                key: Some(_),
                value: Some(_),
                define: true,
                ..
            }
        ));
        assert!(matches!(
            stmts[4].kind,
            StmtKind::Range {
                key: None,
                value: None,
                define: false,
                ..
            }
        ));
    }

    #[test]
    fn test_switch_forms() {
        let stmts = stmts(
            "switch x := f(); x {\ncase 1, 2:\n\ty()\ndefault:\n}\nswitch v := x.(type) {\ncase int:\n}",
        );
        let StmtKind::Switch { init, tag, body } = &stmts[0].kind else {
            panic!("expected switch statement");
        };
        assert!(init.is_some());
        assert!(tag.is_some());
        let clauses = body.block_stmts().unwrap();
        assert_eq!(clauses.len(), 2);
        assert!(matches!(&clauses[0].kind, StmtKind::Case { list: Some(list), body } if list.len() == 2 && body.len() == 1));
        assert!(matches!(clauses[1].kind, StmtKind::Case { list: None, .. }));
        assert!(matches!(stmts[1].kind, StmtKind::TypeSwitch { .. }));
    }

    #[rstest]
    #[case::tagged("switch $x { $*_ }", 1)]
    #[case::no_tag("switch { $*_ }", 1)]
    #[case::type_switch("switch $x.(type) { $*_ }", 1)]
    #[case::mixed("switch $x { case 1: a(); $*_\ndefault: }", 2)]
    #[case::before_default("switch { $*_; default: }", 2)]
    fn test_switch_wildcard_clauses(#[case] code: &str, #[case] expected: usize) {
        let stmts = crate::ast::parse_stmts(code, true).unwrap();
        let (StmtKind::Switch { body, .. } | StmtKind::TypeSwitch { body, .. }) = &stmts[0].kind else {
            panic!("expected switch statement");
        };
        let clauses = body.block_stmts().unwrap();
        assert_eq!(clauses.len(), expected);
    }

    #[test]
    fn test_labeled_and_branch() {
        let stmts = stmts("outer:\nfor {\n\tbreak outer\n}");
        let StmtKind::Labeled { label, stmt } = &stmts[0].kind else {
            panic!("expected labeled statement");
        };
        assert_eq!(label, "outer");
        let StmtKind::For { body, .. } = &stmt.kind else {
            panic!("expected for statement");
        };
        assert!(matches!(
            &body.block_stmts().unwrap()[0].kind,
            StmtKind::Branch { kind: BranchKind::Break, label: Some(label) } if label == "outer"
        ));
    }

    #[test]
    fn test_params_grouping() {
        let tokens = tokens("func f(a, b int, c ...string) (n int, err error) {}");
        let funcs = Parser::new(&tokens).parse_funcs().unwrap();
        let ty = &funcs[0].ty;
        assert_eq!(ty.params.len(), 2);
        assert_eq!(ty.params[0].names.len(), 2);
        assert!(matches!(ty.params[1].ty.kind, ExprKind::Ellipsis(Some(_))));
        assert_eq!(ty.results.len(), 2);
    }

    #[test]
    fn test_unnamed_params() {
        let tokens = tokens("func f(int, *T) bool");
        let funcs = Parser::new(&tokens).parse_funcs().unwrap();
        assert!(funcs[0].ty.params.iter().all(|field| field.names.is_empty()));
        assert!(funcs[0].body.is_none());
    }

    #[test]
    fn test_mixed_params() {
        let tokens = tokens("func f(a int, []int) {}");
        let result = Parser::new(&tokens).parse_funcs();
        assert!(matches!(
            result,
            Err(ParseError::InvalidSyntax(_, "mixed named and unnamed parameters"))
        ));
    }

    #[test]
    fn test_file() {
        let tokens = tokens(
            "package main\n\nimport (\n\t\"fmt\"\n\tstr \"strings\"\n)\n\ntype T struct {\n\tx int\n}\n\nfunc (t *T) M() {}\n\nfunc main() {\n\tfmt.Println(str.ToUpper(\"x\"))\n}\n",
        );
        let file = Parser::new(&tokens).parse_file().unwrap();
        assert_eq!(file.package, "main");
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[1].name.as_deref(), Some("str"));
        assert_eq!(file.funcs.len(), 2);
        assert!(file.funcs[0].recv.is_some());
    }

    #[rstest]
    #[case::missing_brace("if x { y()")]
    #[case::dangling_operator("a +")]
    #[case::bad_assign("a, b++")]
    fn test_syntax_errors(#[case] code: &str) {
        let tokens = tokens(code);
        assert!(Parser::new(&tokens).parse_stmt_list_to_end().is_err());
    }
}
