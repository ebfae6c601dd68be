use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::ast::error::ParseError;
use crate::ast::node::{Expr, ExprKind, Field, FuncType, LitKind, Stmt, StmtKind};
use crate::ast::parser::Parser;
use crate::lexer::token::{Token, TokenKind};
use crate::lexer::{Lexer, Options};
use crate::range::Range;

use super::error::CompileError;
use super::operation::{
    Operation, assign_op_code, binary_op_code, branch_code, chan_dir_code, inc_dec_code,
    range_code, unary_op_code,
};
use super::program::{Instruction, Program};

/// String table indices are 8 bits wide.
const MAX_STRINGS: usize = 255;
const MAX_LIST_LEN: usize = 255;
/// Deepest expression or statement nesting a pattern may have. Matching
/// recurses once per level.
const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Single,
    Seq,
    Opt,
}

enum Parsed {
    Exprs(Vec<Expr>),
    Stmts(Vec<Stmt>),
}

pub(crate) fn compile(src: &str) -> Result<Program, CompileError> {
    let tokens = Lexer::new(Options {
        allow_wildcards: true,
    })
    .tokenize(src)
    .map_err(|e| CompileError::Syntax(ParseError::from(e)))?;

    if tokens
        .iter()
        .all(|token| matches!(token.kind, TokenKind::SemiColon | TokenKind::Eof))
    {
        return Err(CompileError::EmptySource);
    }
    if is_declaration(&tokens) {
        return Err(CompileError::Unsupported(tokens[0].range, "declaration"));
    }

    let parsed = match Parser::new(&tokens).parse_expr_list_to_end() {
        Ok(exprs) => Parsed::Exprs(exprs),
        Err(expr_err) => match Parser::new(&tokens).parse_stmt_list_to_end() {
            Ok(stmts) => Parsed::Stmts(stmts),
            Err(stmt_err) => {
                // Report whichever attempt got further into the source.
                let err = if expr_err.range().start > stmt_err.range().start {
                    expr_err
                } else {
                    stmt_err
                };
                return Err(CompileError::Syntax(err));
            }
        },
    };

    let mut compiler = Compiler::default();
    match parsed {
        Parsed::Exprs(exprs) if exprs.len() == 1 => compiler.compile_expr(&exprs[0])?,
        Parsed::Exprs(exprs) => {
            compiler.emit(Operation::MultiExpr);
            compiler.compile_expr_list(&exprs)?;
        }
        Parsed::Stmts(stmts) if stmts.is_empty() => return Err(CompileError::EmptySource),
        Parsed::Stmts(stmts) if stmts.len() == 1 => compiler.compile_stmt(&stmts[0])?,
        Parsed::Stmts(stmts) => {
            compiler.emit(Operation::MultiStmt);
            compiler.compile_stmt_list(&stmts)?;
        }
    }

    Ok(compiler.prog)
}

/// `func name(...)`, `func (recv) name(...)` and the other top level forms.
fn is_declaration(tokens: &[Token]) -> bool {
    let kind = |i: usize| tokens.get(i).map(|token| &token.kind);

    match kind(0) {
        Some(TokenKind::Package | TokenKind::Import | TokenKind::Type | TokenKind::Const) => true,
        Some(TokenKind::Func) => match kind(1) {
            Some(TokenKind::Ident(_)) => true,
            Some(TokenKind::LParen) => {
                let mut depth = 0usize;
                for (i, token) in tokens.iter().enumerate().skip(1) {
                    match token.kind {
                        TokenKind::LParen => depth += 1,
                        TokenKind::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                return matches!(kind(i + 1), Some(TokenKind::Ident(_)))
                                    && matches!(kind(i + 2), Some(TokenKind::LParen));
                            }
                        }
                        _ => {}
                    }
                }
                false
            }
            _ => false,
        },
        _ => false,
    }
}

fn expr_wildcard(expr: &Expr) -> Option<(&SmolStr, bool)> {
    match &expr.kind {
        ExprKind::Wildcard { name, any } => Some((name, *any)),
        _ => None,
    }
}

fn stmt_wildcard(stmt: &Stmt) -> Option<(&SmolStr, bool)> {
    match &stmt.kind {
        StmtKind::Expr(expr) => expr_wildcard(expr),
        _ => None,
    }
}

fn point(expr: &Expr) -> Range {
    Range {
        start: expr.pos.0,
        end: expr.pos.0,
    }
}

#[derive(Default)]
struct Compiler {
    prog: Program,
    string_ids: FxHashMap<SmolStr, u8>,
    depth: usize,
}

impl Compiler {
    fn emit(&mut self, op: Operation) {
        self.prog.insts.push(Instruction::new(op));
    }

    fn emit_value(&mut self, op: Operation, value: u8) {
        self.prog.insts.push(Instruction {
            op,
            value,
            value_index: 0,
        });
    }

    fn emit_string(&mut self, op: Operation, s: &SmolStr) -> Result<(), CompileError> {
        let value_index = self.intern(s)?;
        self.prog.insts.push(Instruction {
            op,
            value: 0,
            value_index,
        });
        Ok(())
    }

    fn intern(&mut self, s: &SmolStr) -> Result<u8, CompileError> {
        if let Some(index) = self.string_ids.get(s) {
            return Ok(*index);
        }
        if self.prog.strings.len() >= MAX_STRINGS {
            return Err(CompileError::Limitation("too many string literals"));
        }
        let index = self.prog.strings.len() as u8;
        self.prog.strings.push(s.clone());
        self.string_ids.insert(s.clone(), index);
        Ok(index)
    }

    fn emit_wildcard(&mut self, name: &SmolStr, slot: Slot) -> Result<(), CompileError> {
        let anonymous = name == "_";
        let op = match (slot, anonymous) {
            (Slot::Single, true) => Operation::Node,
            (Slot::Single, false) => Operation::NamedNode,
            (Slot::Seq, true) => Operation::NodeSeq,
            (Slot::Seq, false) => Operation::NamedNodeSeq,
            (Slot::Opt, true) => Operation::OptNode,
            (Slot::Opt, false) => Operation::NamedOptNode,
        };
        if anonymous {
            self.emit(op);
            Ok(())
        } else {
            self.emit_string(op, name)
        }
    }

    fn compile_expr_list(&mut self, exprs: &[Expr]) -> Result<(), CompileError> {
        if exprs.len() > MAX_LIST_LEN {
            return Err(CompileError::Limitation("too many expressions"));
        }
        for expr in exprs {
            match expr_wildcard(expr) {
                Some((name, true)) => self.emit_wildcard(name, Slot::Seq)?,
                _ => self.compile_expr(expr)?,
            }
        }
        self.emit(Operation::End);
        Ok(())
    }

    fn compile_stmt_list(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        if stmts.len() > MAX_LIST_LEN {
            return Err(CompileError::Limitation("too many statements"));
        }
        for stmt in stmts {
            match stmt_wildcard(stmt) {
                Some((name, true)) => self.emit_wildcard(name, Slot::Seq)?,
                _ => self.compile_stmt(stmt)?,
            }
        }
        self.emit(Operation::End);
        Ok(())
    }

    fn compile_field_list(&mut self, fields: &[Field]) -> Result<(), CompileError> {
        if fields.len() > MAX_LIST_LEN {
            return Err(CompileError::Limitation("too many fields"));
        }
        self.emit(Operation::FieldList);
        for field in fields {
            match (field.names.is_empty(), expr_wildcard(&field.ty)) {
                (true, Some((name, true))) => self.emit_wildcard(name, Slot::Seq)?,
                _ => self.compile_field(field)?,
            }
        }
        self.emit(Operation::End);
        Ok(())
    }

    fn compile_field(&mut self, field: &Field) -> Result<(), CompileError> {
        match &field.names[..] {
            [] => match expr_wildcard(&field.ty) {
                Some((name, _)) => self.emit_wildcard(name, Slot::Single),
                None => {
                    self.emit(Operation::UnnamedField);
                    self.compile_expr(&field.ty)
                }
            },
            [name] => match &name.kind {
                ExprKind::Ident(ident) => {
                    self.emit_string(Operation::SimpleField, ident)?;
                    self.compile_expr(&field.ty)
                }
                _ => {
                    self.emit(Operation::Field);
                    self.compile_expr(name)?;
                    self.compile_expr(&field.ty)
                }
            },
            names => {
                self.emit(Operation::MultiField);
                self.compile_expr_list(names)?;
                self.compile_expr(&field.ty)
            }
        }
    }

    fn compile_func_type(&mut self, ty: &FuncType) -> Result<(), CompileError> {
        if ty.results.is_empty() {
            self.emit(Operation::VoidFuncType);
            self.compile_field_list(&ty.params)
        } else {
            self.emit(Operation::FuncType);
            self.compile_field_list(&ty.params)?;
            self.compile_field_list(&ty.results)
        }
    }

    /// A slot that is absent in some nodes, like a `for` init statement.
    fn compile_opt_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr_wildcard(expr) {
            Some((name, true)) => self.emit_wildcard(name, Slot::Opt),
            _ => self.compile_expr(expr),
        }
    }

    fn compile_opt_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt_wildcard(stmt) {
            Some((name, true)) => self.emit_wildcard(name, Slot::Opt),
            _ => self.compile_stmt(stmt),
        }
    }

    fn nested<F>(&mut self, f: F) -> Result<(), CompileError>
    where
        F: FnOnce(&mut Self) -> Result<(), CompileError>,
    {
        if self.depth >= MAX_NESTING {
            return Err(CompileError::Limitation("too deeply nested"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        self.nested(|c| c.compile_expr_kind(expr))
    }

    fn compile_expr_kind(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::Wildcard { name, .. } => self.emit_wildcard(name, Slot::Single)?,
            ExprKind::Ident(name) => self.emit_string(Operation::Ident, name)?,
            ExprKind::BasicLit { kind, value } => {
                let op = match kind {
                    LitKind::Int => Operation::StrictIntLit,
                    LitKind::Float => Operation::StrictFloatLit,
                    LitKind::Imag => Operation::StrictComplexLit,
                    LitKind::Char => Operation::StrictCharLit,
                    LitKind::String => Operation::StrictStringLit,
                };
                self.emit_string(op, value)?;
            }
            ExprKind::CompositeLit { ty: None, elts } => {
                self.emit(Operation::CompositeLit);
                self.compile_expr_list(elts)?;
            }
            ExprKind::CompositeLit { ty: Some(ty), elts } => {
                self.emit(Operation::TypedCompositeLit);
                self.compile_expr(ty)?;
                self.compile_expr_list(elts)?;
            }
            ExprKind::FuncLit { ty, body } => {
                self.emit(Operation::FuncLit);
                self.compile_func_type(ty)?;
                self.compile_stmt(body)?;
            }
            ExprKind::Paren(x) => {
                self.emit(Operation::ParenExpr);
                self.compile_expr(x)?;
            }
            ExprKind::Selector { x, sel } => match &sel.kind {
                ExprKind::Ident(name) => {
                    self.emit_string(Operation::SimpleSelectorExpr, name)?;
                    self.compile_expr(x)?;
                }
                ExprKind::Wildcard { any: true, .. } => {
                    return Err(CompileError::Unsupported(
                        point(sel),
                        "variadic wildcard as a selector",
                    ));
                }
                _ => {
                    self.emit(Operation::SelectorExpr);
                    self.compile_expr(x)?;
                    self.compile_expr(sel)?;
                }
            },
            ExprKind::Index { x, index } => {
                self.emit(Operation::IndexExpr);
                self.compile_expr(x)?;
                self.compile_expr(index)?;
            }
            ExprKind::Slice {
                x, low, high, max, ..
            } => {
                let op = match (low.is_some(), high.is_some(), max.is_some()) {
                    (false, false, false) => Operation::SliceExpr,
                    (true, false, false) => Operation::SliceFromExpr,
                    (false, true, false) => Operation::SliceToExpr,
                    (true, true, false) => Operation::SliceFromToExpr,
                    (false, true, true) => Operation::SliceToCapExpr,
                    (true, true, true) => Operation::SliceFromToCapExpr,
                    _ => {
                        return Err(CompileError::Unsupported(
                            point(expr),
                            "3-index slice without a high bound",
                        ));
                    }
                };
                self.emit(op);
                self.compile_expr(x)?;
                for index in [low, high, max].into_iter().flatten() {
                    self.compile_expr(index)?;
                }
            }
            ExprKind::TypeAssert { x, ty: Some(ty) } => {
                self.emit(Operation::TypeAssertExpr);
                self.compile_expr(x)?;
                self.compile_expr(ty)?;
            }
            ExprKind::TypeAssert { x, ty: None } => {
                self.emit(Operation::TypeSwitchAssertExpr);
                self.compile_expr(x)?;
            }
            ExprKind::Call {
                fun,
                args,
                ellipsis,
            } => {
                let op = if *ellipsis {
                    Operation::VariadicCallExpr
                } else if args
                    .last()
                    .and_then(expr_wildcard)
                    .is_some_and(|(_, any)| any)
                {
                    Operation::CallExpr
                } else {
                    Operation::NonVariadicCallExpr
                };
                self.emit(op);
                self.compile_expr(fun)?;
                self.compile_expr_list(args)?;
            }
            ExprKind::Star(x) => {
                self.emit(Operation::StarExpr);
                self.compile_expr(x)?;
            }
            ExprKind::Unary { op, x } => {
                self.emit_value(Operation::UnaryExpr, unary_op_code(*op));
                self.compile_expr(x)?;
            }
            ExprKind::Binary { op, x, y } => {
                self.emit_value(Operation::BinaryExpr, binary_op_code(*op));
                self.compile_expr(x)?;
                self.compile_expr(y)?;
            }
            ExprKind::KeyValue { key, value } => {
                self.emit(Operation::KeyValueExpr);
                self.compile_expr(key)?;
                self.compile_expr(value)?;
            }
            ExprKind::ArrayType { len: None, elem } => {
                self.emit(Operation::SliceType);
                self.compile_expr(elem)?;
            }
            ExprKind::ArrayType {
                len: Some(len),
                elem,
            } => {
                self.emit(Operation::ArrayType);
                self.compile_expr(len)?;
                self.compile_expr(elem)?;
            }
            ExprKind::Ellipsis(None) => self.emit(Operation::Ellipsis),
            ExprKind::Ellipsis(Some(elem)) => {
                self.emit(Operation::TypedEllipsis);
                self.compile_expr(elem)?;
            }
            ExprKind::MapType { key, value } => {
                self.emit(Operation::MapType);
                self.compile_expr(key)?;
                self.compile_expr(value)?;
            }
            ExprKind::ChanType { dir, value } => {
                self.emit_value(Operation::ChanType, chan_dir_code(*dir));
                self.compile_expr(value)?;
            }
            ExprKind::FuncType(ty) => self.compile_func_type(ty)?,
            ExprKind::StructType(fields) => {
                self.emit(Operation::StructType);
                self.compile_field_list(fields)?;
            }
            ExprKind::InterfaceType(methods) => {
                self.emit(Operation::InterfaceType);
                self.compile_field_list(methods)?;
            }
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        self.nested(|c| c.compile_stmt_kind(stmt))
    }

    fn compile_stmt_kind(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match &stmt.kind {
            StmtKind::Expr(x) => match expr_wildcard(x) {
                Some((name, _)) => self.emit_wildcard(name, Slot::Single)?,
                None => {
                    self.emit(Operation::ExprStmt);
                    self.compile_expr(x)?;
                }
            },
            StmtKind::Send { chan, value } => {
                self.emit(Operation::SendStmt);
                self.compile_expr(chan)?;
                self.compile_expr(value)?;
            }
            StmtKind::IncDec { x, inc } => {
                self.emit_value(Operation::IncDecStmt, inc_dec_code(*inc));
                self.compile_expr(x)?;
            }
            StmtKind::Assign { lhs, op, rhs } => {
                let is_variadic = |exprs: &[Expr]| {
                    exprs
                        .iter()
                        .any(|expr| expr_wildcard(expr).is_some_and(|(_, any)| any))
                };
                if lhs.len() == 1 && rhs.len() == 1 && !is_variadic(lhs) && !is_variadic(rhs) {
                    self.emit_value(Operation::AssignStmt, assign_op_code(*op));
                    self.compile_expr(&lhs[0])?;
                    self.compile_expr(&rhs[0])?;
                } else {
                    self.emit_value(Operation::MultiAssignStmt, assign_op_code(*op));
                    self.compile_expr_list(lhs)?;
                    self.compile_expr_list(rhs)?;
                }
            }
            StmtKind::Var {
                names,
                ty: None,
                values,
            } => {
                self.emit(Operation::VarStmt);
                self.compile_expr_list(names)?;
                self.compile_expr_list(values)?;
            }
            StmtKind::Var {
                names,
                ty: Some(ty),
                values,
            } => {
                self.emit(Operation::TypedVarStmt);
                self.compile_expr_list(names)?;
                self.compile_expr(ty)?;
                self.compile_expr_list(values)?;
            }
            StmtKind::Go(call) => {
                self.emit(Operation::GoStmt);
                self.compile_expr(call)?;
            }
            StmtKind::Defer(call) => {
                self.emit(Operation::DeferStmt);
                self.compile_expr(call)?;
            }
            StmtKind::Return(results) => {
                self.emit(Operation::ReturnStmt);
                self.compile_expr_list(results)?;
            }
            StmtKind::Branch { kind, label: None } => {
                self.emit_value(Operation::BranchStmt, branch_code(*kind));
            }
            StmtKind::Branch {
                kind,
                label: Some(label),
            } => {
                let value_index = self.intern(label)?;
                self.prog.insts.push(Instruction {
                    op: Operation::LabeledBranchStmt,
                    value: branch_code(*kind),
                    value_index,
                });
            }
            StmtKind::Labeled { label, stmt } => {
                self.emit_string(Operation::LabeledStmt, label)?;
                self.compile_stmt(stmt)?;
            }
            StmtKind::Block(stmts) => {
                self.emit(Operation::BlockStmt);
                self.compile_stmt_list(stmts)?;
            }
            StmtKind::If {
                init,
                cond,
                body,
                els,
            } => {
                let op = match (init.is_some(), els.is_some()) {
                    (false, false) => Operation::IfStmt,
                    (false, true) => Operation::IfElseStmt,
                    (true, false) => Operation::IfInitStmt,
                    (true, true) => Operation::IfInitElseStmt,
                };
                self.emit(op);
                if let Some(init) = init {
                    self.compile_opt_stmt(init)?;
                }
                self.compile_expr(cond)?;
                self.compile_stmt(body)?;
                if let Some(els) = els {
                    self.compile_stmt(els)?;
                }
            }
            StmtKind::Switch { init, tag, body } => {
                let op = match (init.is_some(), tag.is_some()) {
                    (false, false) => Operation::SwitchStmt,
                    (false, true) => Operation::TagSwitchStmt,
                    (true, false) => Operation::InitSwitchStmt,
                    (true, true) => Operation::InitTagSwitchStmt,
                };
                self.emit(op);
                if let Some(init) = init {
                    self.compile_opt_stmt(init)?;
                }
                if let Some(tag) = tag {
                    self.compile_opt_expr(tag)?;
                }
                self.compile_stmt(body)?;
            }
            StmtKind::TypeSwitch { init, assign, body } => {
                match init {
                    Some(init) => {
                        self.emit(Operation::TypeSwitchInitStmt);
                        self.compile_opt_stmt(init)?;
                    }
                    None => self.emit(Operation::TypeSwitchStmt),
                }
                self.compile_stmt(assign)?;
                self.compile_stmt(body)?;
            }
            StmtKind::Case {
                list: Some(list),
                body,
            } => {
                self.emit(Operation::CaseClause);
                self.compile_expr_list(list)?;
                self.compile_stmt_list(body)?;
            }
            StmtKind::Case { list: None, body } => {
                self.emit(Operation::DefaultCaseClause);
                self.compile_stmt_list(body)?;
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                self.emit(Operation::for_op(
                    init.is_some(),
                    cond.is_some(),
                    post.is_some(),
                ));
                if let Some(init) = init {
                    self.compile_opt_stmt(init)?;
                }
                if let Some(cond) = cond {
                    self.compile_opt_expr(cond)?;
                }
                if let Some(post) = post {
                    self.compile_opt_stmt(post)?;
                }
                self.compile_stmt(body)?;
            }
            StmtKind::Range {
                key,
                value,
                define,
                x,
                body,
            } => {
                match (key, value) {
                    (None, _) => self.emit(Operation::RangeStmt),
                    (Some(key), None) => {
                        self.emit_value(Operation::RangeKeyStmt, range_code(*define));
                        self.compile_expr(key)?;
                    }
                    (Some(key), Some(value)) => {
                        self.emit_value(Operation::RangeKeyValueStmt, range_code(*define));
                        self.compile_expr(key)?;
                        self.compile_expr(value)?;
                    }
                }
                self.compile_expr(x)?;
                self.compile_stmt(body)?;
            }
            StmtKind::Empty => self.emit(Operation::EmptyStmt),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use rstest::rstest;

    fn ops(src: &str) -> Vec<Operation> {
        compile(src)
            .unwrap()
            .insts
            .into_iter()
            .map(|inst| inst.op)
            .collect()
    }

    #[rstest]
    #[case::ident("x", vec![Operation::Ident])]
    #[case::variadic_args("f($*_, x, $*_)", vec![
        Operation::CallExpr,
        Operation::Ident,
        Operation::NodeSeq,
        Operation::Ident,
        Operation::NodeSeq,
        Operation::End,
    ])]
    #[case::variadic_call("f(xs...)", vec![
        Operation::VariadicCallExpr,
        Operation::Ident,
        Operation::Ident,
        Operation::End,
    ])]
    #[case::fixed_call("f($x)", vec![
        Operation::NonVariadicCallExpr,
        Operation::Ident,
        Operation::NamedNode,
        Operation::End,
    ])]
    #[case::simple_selector("a.b", vec![Operation::SimpleSelectorExpr, Operation::Ident])]
    #[case::wildcard_selector("a.$x", vec![
        Operation::SelectorExpr,
        Operation::Ident,
        Operation::NamedNode,
    ])]
    #[case::slice_to_cap("s[:$h:$m]", vec![
        Operation::SliceToCapExpr,
        Operation::Ident,
        Operation::NamedNode,
        Operation::NamedNode,
    ])]
    #[case::assign("$x = $x", vec![
        Operation::AssignStmt,
        Operation::NamedNode,
        Operation::NamedNode,
    ])]
    #[case::multi_assign("$*_ = f()", vec![
        Operation::MultiAssignStmt,
        Operation::NodeSeq,
        Operation::End,
        Operation::NonVariadicCallExpr,
        Operation::Ident,
        Operation::End,
        Operation::End,
    ])]
    #[case::if_else("if $c { } else { }", vec![
        Operation::IfElseStmt,
        Operation::NamedNode,
        Operation::BlockStmt,
        Operation::End,
        Operation::BlockStmt,
        Operation::End,
    ])]
    #[case::for_opt("for $*_; $c; $*_ { $*_ }", vec![
        Operation::ForInitCondPostStmt,
        Operation::OptNode,
        Operation::NamedNode,
        Operation::OptNode,
        Operation::BlockStmt,
        Operation::NodeSeq,
        Operation::End,
    ])]
    #[case::range("for $k, $v := range $x {}", vec![
        Operation::RangeKeyValueStmt,
        Operation::NamedNode,
        Operation::NamedNode,
        Operation::NamedNode,
        Operation::BlockStmt,
        Operation::End,
    ])]
    #[case::return_list("return $*_, err", vec![
        Operation::ReturnStmt,
        Operation::NodeSeq,
        Operation::Ident,
        Operation::End,
    ])]
    #[case::multi_stmt("a; b", vec![
        Operation::MultiStmt,
        Operation::ExprStmt,
        Operation::Ident,
        Operation::ExprStmt,
        Operation::Ident,
        Operation::End,
    ])]
    #[case::multi_expr("a, $*_", vec![
        Operation::MultiExpr,
        Operation::Ident,
        Operation::NodeSeq,
        Operation::End,
    ])]
    #[case::func_lit("func($x int) { }", vec![
        Operation::FuncLit,
        Operation::VoidFuncType,
        Operation::FieldList,
        Operation::Field,
        Operation::NamedNode,
        Operation::Ident,
        Operation::End,
        Operation::BlockStmt,
        Operation::End,
    ])]
    #[case::switch("switch $x { case 1: $*_; default: }", vec![
        Operation::TagSwitchStmt,
        Operation::NamedNode,
        Operation::BlockStmt,
        Operation::CaseClause,
        Operation::StrictIntLit,
        Operation::End,
        Operation::NodeSeq,
        Operation::End,
        Operation::DefaultCaseClause,
        Operation::End,
        Operation::End,
    ])]
    fn test_compile(#[case] src: &str, #[case] expected: Vec<Operation>) {
        assert_eq!(ops(src), expected);
    }

    #[test]
    fn test_strings_are_interned() {
        let prog = compile("$x + $x + y").unwrap();
        assert_eq!(prog.strings, vec![SmolStr::new("x"), SmolStr::new("y")]);
    }

    #[test]
    fn test_binary_value() {
        let prog = compile("$x &^ $x").unwrap();
        assert_eq!(prog.insts[0].op, Operation::BinaryExpr);
        assert_eq!(
            prog.insts[0].value,
            binary_op_code(crate::ast::node::BinaryOp::AndNot)
        );
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank("  \n\t")]
    #[case::comment("// nothing here")]
    fn test_empty_source(#[case] src: &str) {
        assert_eq!(compile(src), Err(CompileError::EmptySource));
    }

    #[rstest]
    #[case::func("func f() {}")]
    #[case::method("func (r *T) M() {}")]
    #[case::type_decl("type T int")]
    fn test_declarations_are_unsupported(#[case] src: &str) {
        assert!(matches!(
            compile(src),
            Err(CompileError::Unsupported(_, "declaration"))
        ));
    }

    #[test]
    fn test_func_lit_is_not_a_declaration() {
        assert!(compile("func(x int) {}").is_ok());
    }

    #[test]
    fn test_syntax_error_message() {
        let err = compile("f(").unwrap_err();
        assert!(matches!(err, CompileError::Syntax(_)));
        assert!(err.to_string().starts_with("syntax error at 1:"));
    }

    #[test]
    fn test_too_many_strings() {
        let src = format!(
            "f({}); g({})",
            (0..128).map(|i| format!("a{}", i)).join(", "),
            (128..256).map(|i| format!("a{}", i)).join(", ")
        );
        assert_eq!(
            compile(&src),
            Err(CompileError::Limitation("too many string literals"))
        );
    }

    #[rstest]
    #[case::shallow(30, true)]
    #[case::binary_chain(200, false)]
    fn test_nesting_limit(#[case] depth: usize, #[case] ok: bool) {
        let src = (0..depth).map(|i| format!("a{}", i)).join(" + ");
        let result = compile(&src);
        if ok {
            assert!(result.is_ok());
        } else {
            assert_eq!(result, Err(CompileError::Limitation("too deeply nested")));
        }
    }

    #[test]
    fn test_nested_blocks_limit() {
        let src = format!("{}x{}", "{ ".repeat(66), " }".repeat(66));
        assert_eq!(compile(&src), Err(CompileError::Limitation("too deeply nested")));
    }

    #[test]
    fn test_too_many_statements() {
        let src = (0..256).map(|_| "x").join("; ");
        assert_eq!(
            compile(&src),
            Err(CompileError::Limitation("too many statements"))
        );
    }
}
