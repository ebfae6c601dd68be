use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::debug;

use crate::ast::node::{
    AssignOp, BinaryOp, BranchKind, Expr, ExprKind, FuncDecl, LitKind, Stmt, StmtKind, UnaryOp,
};
use crate::range::Position;

use super::env::{Env, Func};
use super::error::CompileError;
use super::opcode::Opcode;
use super::types::{Signature, Type};
use super::value::Value;

/// Locals live in a fixed size frame; a slot is never reused.
pub const MAX_LOCALS: usize = 8;

pub struct CompileContext<'e> {
    pub env: &'e Env,
    /// Qualifier compiled functions are registered under. Unqualified calls
    /// are resolved in this package.
    pub package: SmolStr,
}

/// Compiles every declaration of `decls` and registers it in `env`.
///
/// All signatures are registered before any body is compiled, so the
/// functions may call each other regardless of their order. Returns the
/// function ids in declaration order.
pub fn compile_package(
    env: &mut Env,
    package: &str,
    decls: &[FuncDecl],
) -> Result<Vec<u16>, CompileError> {
    for decl in decls {
        let (sig, _) = signature(decl)?;
        env.add_func(
            package,
            Func {
                name: decl.name.clone(),
                code: Vec::new(),
                constants: Vec::new(),
                num_params: sig.params.len(),
                num_locals: 0,
                sig,
            },
        )
        .ok_or(CompileError::TooManyFuncs(decl.pos.0))?;
    }

    let mut ids = Vec::with_capacity(decls.len());
    for decl in decls {
        let func = compile(
            &CompileContext {
                env,
                package: SmolStr::new(package),
            },
            decl,
        )?;
        ids.push(
            env.add_func(package, func)
                .ok_or(CompileError::TooManyFuncs(decl.pos.0))?,
        );
    }
    Ok(ids)
}

pub fn compile(ctx: &CompileContext<'_>, decl: &FuncDecl) -> Result<Func, CompileError> {
    let (sig, param_names) = signature(decl)?;
    let Some(body) = decl.body.as_ref().and_then(|body| body.block_stmts()) else {
        return Err(CompileError::Unsupported(
            decl.pos.0,
            "function declaration without a body",
        ));
    };

    let mut params = FxHashMap::default();
    for (i, (name, ty)) in param_names.iter().zip(&sig.params).enumerate() {
        let index = u8::try_from(i).map_err(|_| {
            CompileError::Unsupported(decl.pos.0, "function with more than 255 params")
        })?;
        params.insert(name.clone(), (index, ty.clone()));
    }

    let mut compiler = Compiler {
        ctx,
        name: decl.name.clone(),
        sig,
        params,
        locals: FxHashMap::default(),
        code: Vec::new(),
        constants: Vec::new(),
        loops: Vec::new(),
    };
    compiler.compile_stmts(body)?;
    if !body.last().is_some_and(is_terminating) {
        return Err(CompileError::MissingReturn(decl.pos.0));
    }

    debug!(
        package = %ctx.package,
        func = %compiler.name,
        code = compiler.code.len(),
        constants = compiler.constants.len(),
        locals = compiler.locals.len(),
        "compiled function"
    );
    Ok(Func {
        name: compiler.name,
        code: compiler.code,
        constants: compiler.constants,
        num_params: compiler.sig.params.len(),
        num_locals: compiler.locals.len(),
        sig: compiler.sig,
    })
}

/// The signature of `decl` and its parameter names (`_` for unnamed ones).
fn signature(decl: &FuncDecl) -> Result<(Signature, Vec<SmolStr>), CompileError> {
    if decl.recv.is_some() {
        return Err(CompileError::Unsupported(decl.pos.0, "method declaration"));
    }

    let mut sig = Signature::default();
    let mut names = Vec::new();
    for field in &decl.ty.params {
        let ty = Type::from_expr(&field.ty)
            .ok_or_else(|| CompileError::UnsupportedType(field.pos.0, field.ty.to_string()))?;
        if field.names.is_empty() {
            names.push(SmolStr::new_inline("_"));
            sig.params.push(ty);
            continue;
        }
        for name in &field.names {
            names.push(name.ident_name().cloned().unwrap_or_else(|| SmolStr::new_inline("_")));
            sig.params.push(ty.clone());
        }
    }

    let num_results: usize = decl
        .ty
        .results
        .iter()
        .map(|field| field.names.len().max(1))
        .sum();
    if num_results != 1 {
        return Err(CompileError::ResultCount(decl.pos.0));
    }
    let result = &decl.ty.results[0];
    let ty = Type::from_expr(&result.ty)
        .ok_or_else(|| CompileError::UnsupportedType(result.pos.0, result.ty.to_string()))?;
    sig.results.push(ty);

    Ok((sig, names))
}

fn is_terminating(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) => true,
        StmtKind::Block(stmts) => stmts.last().is_some_and(is_terminating),
        StmtKind::If {
            body,
            els: Some(els),
            ..
        } => is_terminating(body) && is_terminating(els),
        StmtKind::For {
            cond: None, body, ..
        } => !has_break(body),
        _ => false,
    }
}

/// Whether `stmt` contains a `break` that leaves the enclosing loop.
fn has_break(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Branch {
            kind: BranchKind::Break,
            label: None,
        } => true,
        StmtKind::Block(stmts) => stmts.iter().any(has_break),
        StmtKind::If { body, els, .. } => {
            has_break(body) || els.as_deref().is_some_and(has_break)
        }
        StmtKind::Labeled { stmt, .. } => has_break(stmt),
        _ => false,
    }
}

fn stmt_desc(stmt: &Stmt) -> &'static str {
    match &stmt.kind {
        StmtKind::Switch { .. } => "switch statement",
        StmtKind::TypeSwitch { .. } => "type switch statement",
        StmtKind::Case { .. } => "case clause",
        StmtKind::Go(_) => "go statement",
        StmtKind::Defer(_) => "defer statement",
        StmtKind::Send { .. } => "send statement",
        StmtKind::Var { .. } => "var declaration",
        StmtKind::Labeled { .. } => "labeled statement",
        StmtKind::Range { .. } => "range statement",
        StmtKind::Branch { label: Some(_), .. } => "labeled branch statement",
        StmtKind::Branch {
            kind: BranchKind::Goto,
            ..
        } => "goto statement",
        StmtKind::Branch {
            kind: BranchKind::Fallthrough,
            ..
        } => "fallthrough statement",
        _ => "statement",
    }
}

fn expr_desc(expr: &Expr) -> &'static str {
    match &expr.kind {
        ExprKind::CompositeLit { .. } => "composite literal",
        ExprKind::FuncLit { .. } => "func literal",
        ExprKind::Selector { .. } => "selector expression",
        ExprKind::Index { .. } => "index expression",
        ExprKind::Slice { .. } => "3-index slice expression",
        ExprKind::TypeAssert { .. } => "type assertion",
        ExprKind::Star(_) => "pointer dereference",
        ExprKind::Unary { .. } => "unary expression",
        ExprKind::KeyValue { .. } => "key-value expression",
        ExprKind::BasicLit {
            kind: LitKind::Float,
            ..
        } => "float literal",
        ExprKind::BasicLit {
            kind: LitKind::Imag,
            ..
        } => "imaginary literal",
        ExprKind::BasicLit {
            kind: LitKind::Char,
            ..
        } => "rune literal",
        ExprKind::Wildcard { .. } => "wildcard",
        _ => "type expression",
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let text = text.replace('_', "");
    let (digits, radix) = match text.get(..2) {
        Some("0x" | "0X") => (&text[2..], 16),
        Some("0b" | "0B") => (&text[2..], 2),
        Some("0o" | "0O") => (&text[2..], 8),
        _ if text.len() > 1 && text.starts_with('0') => (&text[1..], 8),
        _ => (&text[..], 10),
    };
    i64::from_str_radix(digits, radix).ok()
}

/// Decodes the source text of a string literal.
pub(crate) fn unquote(text: &str) -> Option<String> {
    if let Some(raw) = text.strip_prefix('`') {
        return raw.strip_suffix('`').map(|raw| raw.replace('\r', ""));
    }

    let body = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0c',
            'v' => '\x0b',
            '\\' => '\\',
            '"' => '"',
            '\'' => '\'',
            'x' => hex_char(&mut chars, 2)?,
            'u' => hex_char(&mut chars, 4)?,
            'U' => hex_char(&mut chars, 8)?,
            d @ '0'..='7' => {
                let digits = [Some(d), chars.next(), chars.next()]
                    .into_iter()
                    .collect::<Option<String>>()?;
                char::from_u32(u32::from_str_radix(&digits, 8).ok()?)?
            }
            _ => return None,
        };
        out.push(escaped);
    }
    Some(out)
}

fn hex_char(chars: &mut std::str::Chars<'_>, len: usize) -> Option<char> {
    let digits = chars.take(len).collect::<String>();
    if digits.len() != len {
        return None;
    }
    char::from_u32(u32::from_str_radix(&digits, 16).ok()?)
}

#[derive(Debug, Default)]
struct LoopLabels {
    breaks: Vec<usize>,
    continues: Vec<usize>,
}

struct Compiler<'c, 'e> {
    ctx: &'c CompileContext<'e>,
    name: SmolStr,
    sig: Signature,
    params: FxHashMap<SmolStr, (u8, Type)>,
    locals: FxHashMap<SmolStr, (u8, Type)>,
    code: Vec<u8>,
    constants: Vec<Value>,
    loops: Vec<LoopLabels>,
}

impl<'c, 'e> Compiler<'c, 'e> {
    fn emit(&mut self, op: Opcode) {
        self.code.push(op as u8);
    }

    fn emit_index(&mut self, op: Opcode, index: u8) {
        self.code.extend([op as u8, index]);
    }

    fn emit_id(&mut self, op: Opcode, id: u16) {
        let [lo, hi] = id.to_le_bytes();
        self.code.extend([op as u8, lo, hi]);
    }

    /// Emits a jump with a placeholder offset and returns its position.
    fn emit_jump(&mut self, op: Opcode) -> usize {
        let at = self.code.len();
        self.code.extend([op as u8, 0, 0]);
        at
    }

    fn emit_jump_to(&mut self, op: Opcode, target: usize, pos: Position) -> Result<(), CompileError> {
        let at = self.emit_jump(op);
        self.patch_jump_to(at, target, pos)
    }

    fn patch_jump(&mut self, at: usize, pos: Position) -> Result<(), CompileError> {
        self.patch_jump_to(at, self.code.len(), pos)
    }

    fn patch_jump_to(&mut self, at: usize, target: usize, pos: Position) -> Result<(), CompileError> {
        let offset = i64::try_from(target)
            .ok()
            .zip(i64::try_from(at).ok())
            .and_then(|(target, at)| i16::try_from(target - at).ok())
            .ok_or(CompileError::JumpOutOfRange(pos))?;
        let [lo, hi] = offset.to_le_bytes();
        self.code[at + 1] = lo;
        self.code[at + 2] = hi;
        Ok(())
    }

    fn push_const(&mut self, pos: Position, value: Value) -> Result<(), CompileError> {
        let index = match self.constants.iter().position(|constant| *constant == value) {
            Some(index) => index,
            None => {
                self.constants.push(value);
                self.constants.len() - 1
            }
        };
        let index = u8::try_from(index).map_err(|_| CompileError::TooManyConstants(pos))?;
        self.emit_index(Opcode::PushConst, index);
        Ok(())
    }

    fn is_var(&self, name: &str) -> bool {
        self.params.contains_key(name) || self.locals.contains_key(name)
    }

    fn compile_stmts(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        stmts.iter().try_for_each(|stmt| self.compile_stmt(stmt))
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        let pos = stmt.pos.0;
        match &stmt.kind {
            StmtKind::Expr(x) => self.compile_expr_stmt(x),
            StmtKind::Return(results) => match &results[..] {
                [] => Err(CompileError::NakedReturn(pos)),
                [x] => self.compile_return(x),
                _ => Err(CompileError::ResultCount(pos)),
            },
            StmtKind::Assign { lhs, op, rhs } => self.compile_assign(pos, lhs, *op, rhs),
            StmtKind::IncDec { x, inc } => self.compile_inc_dec(x, *inc),
            StmtKind::Block(stmts) => self.compile_stmts(stmts),
            StmtKind::If {
                init,
                cond,
                body,
                els,
            } => self.compile_if(pos, init.as_deref(), cond, body, els.as_deref()),
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => self.compile_for(pos, init.as_deref(), cond.as_ref(), post.as_deref(), body),
            StmtKind::Branch {
                kind: kind @ (BranchKind::Break | BranchKind::Continue),
                label: None,
            } => self.compile_branch(pos, *kind),
            StmtKind::Empty => Ok(()),
            _ => Err(CompileError::Unsupported(pos, stmt_desc(stmt))),
        }
    }

    fn compile_expr_stmt(&mut self, x: &Expr) -> Result<(), CompileError> {
        if !matches!(x.kind, ExprKind::Call { .. }) {
            return Err(CompileError::Type(x.pos.0, format!("{} is not used", x)));
        }
        let results = self.compile_call(x)?;
        for _ in results {
            self.emit(Opcode::Pop);
        }
        Ok(())
    }

    fn compile_return(&mut self, x: &Expr) -> Result<(), CompileError> {
        let result = self.sig.results[0].clone();
        if result == Type::Bool {
            if let ExprKind::Ident(name) = &x.kind {
                if !self.is_var(name) && (name == "true" || name == "false") {
                    self.emit(if name == "true" {
                        Opcode::ReturnTrue
                    } else {
                        Opcode::ReturnFalse
                    });
                    return Ok(());
                }
            }
        }

        let ty = self.compile_expr(x)?;
        check_assignable(x.pos.0, &ty, &result, "return statement")?;
        self.emit(Opcode::ReturnTop);
        Ok(())
    }

    fn compile_assign(
        &mut self,
        pos: Position,
        lhs: &[Expr],
        op: AssignOp,
        rhs: &[Expr],
    ) -> Result<(), CompileError> {
        match (op, lhs, rhs) {
            (AssignOp::Define | AssignOp::Assign, [target], [value]) => {
                let ty = self.compile_expr(value)?;
                if ty == Type::Nil && op == AssignOp::Define {
                    return Err(CompileError::Type(
                        value.pos.0,
                        "use of untyped nil in assignment".to_string(),
                    ));
                }
                self.store(target, &ty, op == AssignOp::Define)
            }
            (AssignOp::Define | AssignOp::Assign, [first, second], [call])
                if matches!(call.kind, ExprKind::Call { .. }) =>
            {
                let results = self.compile_call(call)?;
                if results.len() != 2 {
                    return Err(CompileError::Type(
                        pos,
                        format!(
                            "assignment mismatch: 2 variables but {} returns {} value(s)",
                            call,
                            results.len()
                        ),
                    ));
                }
                let define = op == AssignOp::Define;
                self.store(second, &results[1], define)?;
                self.store(first, &results[0], define)
            }
            (AssignOp::Op(bin), [target], [value]) => {
                let (slot, ty) = self.assignable_local(target)?;
                self.emit_index(Opcode::PushLocal, slot);
                let value_ty = self.compile_expr(value)?;
                let result = self.emit_binary(pos, bin, &ty, &value_ty)?;
                check_assignable(pos, &result, &ty, "assignment")?;
                self.emit_index(Opcode::SetLocal, slot);
                Ok(())
            }
            _ => Err(CompileError::Unsupported(pos, "multi-value assignment")),
        }
    }

    /// Pops the top of the stack into `target`.
    fn store(&mut self, target: &Expr, ty: &Type, define: bool) -> Result<(), CompileError> {
        let pos = target.pos.0;
        let ExprKind::Ident(name) = &target.kind else {
            return Err(CompileError::Unsupported(pos, "assignment to a non-identifier"));
        };
        if name == "_" {
            self.emit(Opcode::Pop);
            return Ok(());
        }

        if define {
            if self.is_var(name) {
                return Err(CompileError::Shadowing(pos, name.clone()));
            }
            if self.locals.len() >= MAX_LOCALS {
                return Err(CompileError::TooManyLocals(pos));
            }
            let slot = self.locals.len() as u8;
            self.locals.insert(name.clone(), (slot, ty.clone()));
            self.emit_index(Opcode::SetLocal, slot);
            return Ok(());
        }

        let (slot, local_ty) = self.assignable_local(target)?;
        check_assignable(pos, ty, &local_ty, "assignment")?;
        self.emit_index(Opcode::SetLocal, slot);
        Ok(())
    }

    fn assignable_local(&self, target: &Expr) -> Result<(u8, Type), CompileError> {
        let pos = target.pos.0;
        let ExprKind::Ident(name) = &target.kind else {
            return Err(CompileError::Unsupported(pos, "assignment to a non-identifier"));
        };
        if self.params.contains_key(name) {
            return Err(CompileError::AssignToParam(pos, name.clone()));
        }
        self.locals
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::Undefined(pos, name.clone()))
    }

    fn compile_inc_dec(&mut self, x: &Expr, inc: bool) -> Result<(), CompileError> {
        let (slot, ty) = self.assignable_local(x)?;
        if ty != Type::Int {
            return Err(CompileError::Type(
                x.pos.0,
                format!("invalid operation: {}{} (non-numeric type {})", x, if inc { "++" } else { "--" }, ty),
            ));
        }
        self.emit_index(if inc { Opcode::IncLocal } else { Opcode::DecLocal }, slot);
        Ok(())
    }

    fn compile_cond(&mut self, cond: &Expr, context: &str) -> Result<(), CompileError> {
        let ty = self.compile_expr(cond)?;
        if ty != Type::Bool {
            return Err(CompileError::Type(
                cond.pos.0,
                format!("non-boolean condition in {}", context),
            ));
        }
        Ok(())
    }

    fn compile_if(
        &mut self,
        pos: Position,
        init: Option<&Stmt>,
        cond: &Expr,
        body: &Stmt,
        els: Option<&Stmt>,
    ) -> Result<(), CompileError> {
        if let Some(init) = init {
            self.compile_stmt(init)?;
        }
        self.compile_cond(cond, "if statement")?;
        let else_jump = self.emit_jump(Opcode::JumpFalse);
        self.compile_stmt(body)?;

        match els {
            None => self.patch_jump(else_jump, pos),
            Some(els) => {
                let end_jump = self.emit_jump(Opcode::Jump);
                self.patch_jump(else_jump, pos)?;
                self.compile_stmt(els)?;
                self.patch_jump(end_jump, pos)
            }
        }
    }

    fn compile_for(
        &mut self,
        pos: Position,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        post: Option<&Stmt>,
        body: &Stmt,
    ) -> Result<(), CompileError> {
        if let Some(init) = init {
            self.compile_stmt(init)?;
        }

        let top = self.code.len();
        let exit_jump = match cond {
            Some(cond) => {
                self.compile_cond(cond, "for statement")?;
                Some(self.emit_jump(Opcode::JumpFalse))
            }
            None => None,
        };

        self.loops.push(LoopLabels::default());
        self.compile_stmt(body)?;
        let labels = self.loops.pop().unwrap_or_default();

        let continue_target = self.code.len();
        for at in labels.continues {
            self.patch_jump_to(at, continue_target, pos)?;
        }
        if let Some(post) = post {
            self.compile_stmt(post)?;
        }
        self.emit_jump_to(Opcode::Jump, top, pos)?;

        if let Some(at) = exit_jump {
            self.patch_jump(at, pos)?;
        }
        for at in labels.breaks {
            self.patch_jump(at, pos)?;
        }
        Ok(())
    }

    fn compile_branch(&mut self, pos: Position, kind: BranchKind) -> Result<(), CompileError> {
        if self.loops.is_empty() {
            return Err(CompileError::Type(
                pos,
                format!("{} is not in a loop", kind.as_str()),
            ));
        }
        let at = self.emit_jump(Opcode::Jump);
        if let Some(labels) = self.loops.last_mut() {
            match kind {
                BranchKind::Continue => labels.continues.push(at),
                _ => labels.breaks.push(at),
            }
        }
        Ok(())
    }

    fn compile_expr(&mut self, x: &Expr) -> Result<Type, CompileError> {
        let pos = x.pos.0;
        match &x.kind {
            ExprKind::Ident(name) => self.compile_ident(pos, name),
            ExprKind::BasicLit {
                kind: LitKind::Int,
                value,
            } => {
                let n = parse_int(value).ok_or_else(|| {
                    CompileError::Type(pos, format!("cannot use {} as an int value", value))
                })?;
                self.push_const(pos, Value::Int(n))?;
                Ok(Type::Int)
            }
            ExprKind::BasicLit {
                kind: LitKind::String,
                value,
            } => {
                let s = unquote(value).ok_or_else(|| {
                    CompileError::Type(pos, format!("invalid string literal {}", value))
                })?;
                self.push_const(pos, Value::from(s))?;
                Ok(Type::String)
            }
            ExprKind::Paren(x) => self.compile_expr(x),
            ExprKind::Unary { op: UnaryOp::Not, x } => {
                self.compile_operand(x, &Type::Bool, "!")?;
                self.emit(Opcode::Not);
                Ok(Type::Bool)
            }
            ExprKind::Unary { op: UnaryOp::Neg, x } => {
                self.compile_operand(x, &Type::Int, "-")?;
                self.emit(Opcode::Neg);
                Ok(Type::Int)
            }
            ExprKind::Binary { op, x, y } => self.compile_binary(pos, *op, x, y),
            ExprKind::Call { .. } => {
                let results = self.compile_call(x)?;
                match &results[..] {
                    [result] => Ok(result.clone()),
                    [] => Err(CompileError::Type(
                        pos,
                        format!("{} (no value) used as value", x),
                    )),
                    _ => Err(CompileError::Type(
                        pos,
                        format!("multiple-value {} in single-value context", x),
                    )),
                }
            }
            ExprKind::Slice {
                x: s,
                low,
                high,
                max: None,
                ..
            } => {
                self.compile_operand(s, &Type::String, "slice")?;
                let op = match (low, high) {
                    (None, None) => return Ok(Type::String),
                    (Some(low), None) => {
                        self.compile_operand(low, &Type::Int, "slice")?;
                        Opcode::StringSliceFrom
                    }
                    (None, Some(high)) => {
                        self.compile_operand(high, &Type::Int, "slice")?;
                        Opcode::StringSliceTo
                    }
                    (Some(low), Some(high)) => {
                        self.compile_operand(low, &Type::Int, "slice")?;
                        self.compile_operand(high, &Type::Int, "slice")?;
                        Opcode::StringSlice
                    }
                };
                self.emit(op);
                Ok(Type::String)
            }
            _ => Err(CompileError::Unsupported(pos, expr_desc(x))),
        }
    }

    fn compile_operand(&mut self, x: &Expr, want: &Type, op: &str) -> Result<(), CompileError> {
        let ty = self.compile_expr(x)?;
        if ty != *want {
            return Err(CompileError::Type(
                x.pos.0,
                format!("invalid operation: operator {} not defined on {} ({})", op, x, ty),
            ));
        }
        Ok(())
    }

    fn compile_ident(&mut self, pos: Position, name: &SmolStr) -> Result<Type, CompileError> {
        if let Some((index, ty)) = self.params.get(name).cloned() {
            self.emit_index(Opcode::PushParam, index);
            return Ok(ty);
        }
        if let Some((slot, ty)) = self.locals.get(name).cloned() {
            self.emit_index(Opcode::PushLocal, slot);
            return Ok(ty);
        }
        match name.as_str() {
            "true" => {
                self.emit(Opcode::PushTrue);
                Ok(Type::Bool)
            }
            "false" => {
                self.emit(Opcode::PushFalse);
                Ok(Type::Bool)
            }
            "nil" => {
                self.emit(Opcode::PushNil);
                Ok(Type::Nil)
            }
            _ => Err(CompileError::Undefined(pos, name.clone())),
        }
    }

    fn is_nil(&self, x: &Expr) -> bool {
        matches!(&x.kind, ExprKind::Ident(name) if name == "nil" && !self.is_var(name))
    }

    fn compile_binary(
        &mut self,
        pos: Position,
        op: BinaryOp,
        x: &Expr,
        y: &Expr,
    ) -> Result<Type, CompileError> {
        match op {
            BinaryOp::LAnd | BinaryOp::LOr => {
                self.compile_operand(x, &Type::Bool, op.as_str())?;
                self.emit(Opcode::Dup);
                let jump = self.emit_jump(if op == BinaryOp::LAnd {
                    Opcode::JumpFalse
                } else {
                    Opcode::JumpTrue
                });
                self.emit(Opcode::Pop);
                self.compile_operand(y, &Type::Bool, op.as_str())?;
                self.patch_jump(jump, pos)?;
                Ok(Type::Bool)
            }
            BinaryOp::Eql | BinaryOp::Neq if self.is_nil(x) || self.is_nil(y) => {
                let other = if self.is_nil(y) { x } else { y };
                let ty = self.compile_expr(other)?;
                if !ty.is_nillable() || ty == Type::Nil {
                    return Err(CompileError::Type(
                        pos,
                        format!("invalid operation: mismatched types {} and untyped nil", ty),
                    ));
                }
                self.emit(if op == BinaryOp::Eql {
                    Opcode::IsNil
                } else {
                    Opcode::IsNotNil
                });
                Ok(Type::Bool)
            }
            _ => {
                let x_ty = self.compile_expr(x)?;
                let y_ty = self.compile_expr(y)?;
                self.emit_binary(pos, op, &x_ty, &y_ty)
            }
        }
    }

    fn emit_binary(
        &mut self,
        pos: Position,
        op: BinaryOp,
        x_ty: &Type,
        y_ty: &Type,
    ) -> Result<Type, CompileError> {
        if x_ty != y_ty {
            return Err(CompileError::Type(
                pos,
                format!("invalid operation: mismatched types {} and {}", x_ty, y_ty),
            ));
        }

        let (opcode, result) = match (op, x_ty) {
            (BinaryOp::Eql, Type::Int) => (Opcode::EqInt, Type::Bool),
            (BinaryOp::Neq, Type::Int) => (Opcode::NotEqInt, Type::Bool),
            (BinaryOp::Lss, Type::Int) => (Opcode::LtInt, Type::Bool),
            (BinaryOp::Leq, Type::Int) => (Opcode::LtEqInt, Type::Bool),
            (BinaryOp::Gtr, Type::Int) => (Opcode::GtInt, Type::Bool),
            (BinaryOp::Geq, Type::Int) => (Opcode::GtEqInt, Type::Bool),
            (BinaryOp::Add, Type::Int) => (Opcode::Add, Type::Int),
            (BinaryOp::Sub, Type::Int) => (Opcode::Sub, Type::Int),
            (BinaryOp::Mul, Type::Int) => (Opcode::Mul, Type::Int),
            (BinaryOp::Quo, Type::Int) => (Opcode::Div, Type::Int),
            (BinaryOp::Rem, Type::Int) => (Opcode::Mod, Type::Int),
            (BinaryOp::Eql, Type::Bool) => (Opcode::EqBool, Type::Bool),
            (BinaryOp::Neq, Type::Bool) => (Opcode::NotEqBool, Type::Bool),
            (BinaryOp::Eql, Type::String) => (Opcode::EqString, Type::Bool),
            (BinaryOp::Neq, Type::String) => (Opcode::NotEqString, Type::Bool),
            (BinaryOp::Add, Type::String) => (Opcode::Concat, Type::String),
            (BinaryOp::Lss, Type::String) => (Opcode::LtString, Type::Bool),
            (BinaryOp::Leq, Type::String) => (Opcode::LtEqString, Type::Bool),
            (BinaryOp::Gtr, Type::String) => (Opcode::GtString, Type::Bool),
            (BinaryOp::Geq, Type::String) => (Opcode::GtEqString, Type::Bool),
            _ => {
                return Err(CompileError::Type(
                    pos,
                    format!(
                        "invalid operation: operator {} not defined on {}",
                        op.as_str(),
                        x_ty
                    ),
                ));
            }
        };
        self.emit(opcode);
        Ok(result)
    }

    fn compile_args(
        &mut self,
        pos: Position,
        callee: &str,
        params: &[Type],
        args: &[Expr],
    ) -> Result<(), CompileError> {
        if params.len() != args.len() {
            return Err(CompileError::Type(
                pos,
                format!(
                    "wrong number of arguments in call to {}: have {}, want {}",
                    callee,
                    args.len(),
                    params.len()
                ),
            ));
        }
        for (arg, param) in args.iter().zip(params) {
            let ty = self.compile_expr(arg)?;
            check_assignable(arg.pos.0, &ty, param, &format!("argument to {}", callee))?;
        }
        Ok(())
    }

    /// Compiles a call and returns its result types.
    fn compile_call(&mut self, call: &Expr) -> Result<Vec<Type>, CompileError> {
        let pos = call.pos.0;
        let ExprKind::Call {
            fun,
            args,
            ellipsis,
        } = &call.kind
        else {
            return Err(CompileError::Unsupported(pos, expr_desc(call)));
        };
        if *ellipsis {
            return Err(CompileError::Unsupported(pos, "variadic call"));
        }

        let env = self.ctx.env;
        match &fun.kind {
            ExprKind::Ident(name) if name == "len" && !self.is_var(name) => {
                self.compile_args(pos, name, &[Type::String], args)?;
                self.emit(Opcode::StringLen);
                Ok(vec![Type::Int])
            }
            ExprKind::Ident(name) if *name == self.name => {
                let sig = self.sig.clone();
                self.compile_args(pos, name, &sig.params, args)?;
                self.emit(Opcode::CallRecur);
                Ok(sig.results)
            }
            ExprKind::Ident(name) => {
                let package = self.ctx.package.clone();
                if let Some((id, func)) = env.lookup_func(&package, name) {
                    self.compile_args(pos, name, &func.sig.params, args)?;
                    self.emit_id(Opcode::Call, id);
                    return Ok(func.sig.results.clone());
                }
                if let Some((id, native)) = env.lookup_native(&package, name) {
                    self.compile_args(pos, name, &native.sig.params, args)?;
                    self.emit_id(Opcode::CallNative, id);
                    return Ok(native.sig.results.clone());
                }
                Err(CompileError::Undefined(fun.pos.0, name.clone()))
            }
            ExprKind::Selector { x, sel } => {
                let Some(method) = sel.ident_name() else {
                    return Err(CompileError::Unsupported(pos, "selector expression"));
                };

                match &x.kind {
                    ExprKind::Ident(qualifier) if !self.is_var(qualifier) => {
                        let qualified = format!("{}.{}", qualifier, method);
                        if let Some((id, native)) = env.lookup_native(qualifier, method) {
                            self.compile_args(pos, &qualified, &native.sig.params, args)?;
                            self.emit_id(Opcode::CallNative, id);
                            return Ok(native.sig.results.clone());
                        }
                        if let Some((id, func)) = env.lookup_func(qualifier, method) {
                            self.compile_args(pos, &qualified, &func.sig.params, args)?;
                            self.emit_id(Opcode::Call, id);
                            return Ok(func.sig.results.clone());
                        }
                        Err(CompileError::Undefined(fun.pos.0, SmolStr::from(qualified)))
                    }
                    _ => {
                        let recv_ty = self.compile_expr(x)?;
                        let type_name = recv_ty.to_string();
                        let qualified = format!("({}).{}", type_name, method);
                        let Some((id, native)) = env.lookup_native(&type_name, method) else {
                            return Err(CompileError::Undefined(fun.pos.0, SmolStr::from(qualified)));
                        };
                        self.compile_args(pos, &qualified, &native.sig.params, args)?;
                        self.emit_id(Opcode::CallNative, id);
                        Ok(native.sig.results.clone())
                    }
                }
            }
            _ => Err(CompileError::Unsupported(pos, "indirect call")),
        }
    }
}

fn check_assignable(pos: Position, ty: &Type, target: &Type, context: &str) -> Result<(), CompileError> {
    if ty.is_assignable_to(target) {
        return Ok(());
    }
    Err(CompileError::Type(
        pos,
        format!("cannot use {} value as {} value in {}", ty, target, context),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_funcs;
    use rstest::rstest;

    fn compile_src(src: &str) -> Result<Func, CompileError> {
        let decls = parse_funcs(src).unwrap();
        let mut env = Env::new();
        env.add_native_func(
            "strings",
            "HasPrefix",
            Signature::new([Type::String, Type::String], [Type::Bool]),
            |_| {},
        );
        env.add_native_func(
            "strconv",
            "Atoi",
            Signature::new([Type::String], [Type::Int, Type::Error]),
            |_| {},
        );
        let ctx = CompileContext {
            env: &env,
            package: SmolStr::new("main"),
        };
        compile(&ctx, &decls[0])
    }

    fn compile_err(src: &str) -> String {
        compile_src(src).unwrap_err().to_string()
    }

    #[rstest]
    #[case::switch(
        "func f(x int) int { switch x { case 1: return 1 }; return 0 }",
        "can't compile switch statement yet"
    )]
    #[case::param_assign("func f(x int) int { x = 1; return x }", "can't assign to x, params are readonly")]
    #[case::param_inc("func f(x int) int { x++; return x }", "can't assign to x, params are readonly")]
    #[case::shadow_param("func f(x int) int { x := 1; return x }", "x variable shadowing is not allowed")]
    #[case::shadow_local(
        "func f() int { y := 1; if true { y := 2; return y }; return y }",
        "y variable shadowing is not allowed"
    )]
    #[case::too_many_locals(
        "func f() int { a := 1; b := 1; c := 1; d := 1; e := 1; g := 1; h := 1; i := 1; j := 1; return a }",
        "too many locals"
    )]
    #[case::void("func f() { }", "only functions with a single non-void results are supported")]
    #[case::two_results(
        "func f() (int, error) { return 1, nil }",
        "only functions with a single non-void results are supported"
    )]
    #[case::naked_return("func f() (ok bool) { return }", "naked return statements are not allowed")]
    #[case::missing_return("func f(x int) bool { if x > 0 { return true } }", "missing return at the end of the function")]
    #[case::undefined("func f() int { return y }", "y is not defined")]
    #[case::undefined_native("func f() bool { return strings.Contains(\"a\", \"b\") }", "strings.Contains is not defined")]
    #[case::unsupported_type("func f(xs []int) bool { return true }", "unsupported type []int")]
    #[case::mismatched("func f(x int, s string) bool { return x == s }", "invalid operation: mismatched types int and string")]
    #[case::bool_ordering("func f(a bool, b bool) bool { return a < b }", "invalid operation: operator < not defined on bool")]
    #[case::go_stmt("func f() bool { go g(); return true }", "can't compile go statement yet")]
    #[case::composite("func f() bool { return T{} == nil }", "can't compile composite literal yet")]
    #[case::break_outside("func f() bool { break; return true }", "break is not in a loop")]
    #[case::arg_count("func f() bool { return strings.HasPrefix(\"a\") }", "wrong number of arguments in call to strings.HasPrefix: have 1, want 2")]
    #[case::multi_value("func f() int { return strconv.Atoi(\"1\") }", "multiple-value strconv.Atoi(\"1\") in single-value context")]
    fn test_compile_errors(#[case] src: &str, #[case] expected: &str) {
        assert_eq!(compile_err(src), expected);
    }

    #[test]
    fn test_short_circuit_layout() {
        let func = compile_src("func f(i int) bool { return i == 10 || i == 2 }").unwrap();
        assert_eq!(
            func.code,
            vec![
                Opcode::PushParam as u8,
                0,
                Opcode::PushConst as u8,
                0,
                Opcode::EqInt as u8,
                Opcode::Dup as u8,
                Opcode::JumpTrue as u8,
                9,
                0,
                Opcode::Pop as u8,
                Opcode::PushParam as u8,
                0,
                Opcode::PushConst as u8,
                1,
                Opcode::EqInt as u8,
                Opcode::ReturnTop as u8,
            ]
        );
        assert_eq!(func.constants, vec![Value::Int(10), Value::Int(2)]);
    }

    #[test]
    fn test_locals_and_two_results() {
        let func = compile_src(
            "func f(s string) bool { n, err := strconv.Atoi(s); if err != nil { return false }; return n > 0 }",
        )
        .unwrap();
        assert_eq!(func.num_params, 1);
        assert_eq!(func.num_locals, 2);
    }

    #[test]
    fn test_infinite_loop_terminates_function() {
        assert!(compile_src("func f() int { i := 0; for { i++; if i > 3 { return i } } }").is_ok());
        assert_eq!(
            compile_err("func f() int { for { break }; }"),
            "missing return at the end of the function"
        );
    }

    #[rstest]
    #[case("42", Some(42))]
    #[case("0x2A", Some(42))]
    #[case("0b101010", Some(42))]
    #[case("0o52", Some(42))]
    #[case("052", Some(42))]
    #[case("1_000", Some(1000))]
    #[case("0", Some(0))]
    #[case("99999999999999999999", None)]
    fn test_parse_int(#[case] text: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_int(text), expected);
    }

    #[rstest]
    #[case(r#""a\tb""#, Some("a\tb"))]
    #[case(r#""\x41é\101""#, Some("AéA"))]
    #[case("`raw\\n`", Some("raw\\n"))]
    #[case(r#""bad\q""#, None)]
    fn test_unquote(#[case] text: &str, #[case] expected: Option<&str>) {
        assert_eq!(unquote(text).as_deref(), expected);
    }

    #[test]
    fn test_compile_package_forward_reference() {
        let decls = parse_funcs(
            "func f(n int) bool { return isBig(n) }\nfunc isBig(n int) bool { return n > 100 }",
        )
        .unwrap();
        let mut env = Env::new();
        let ids = compile_package(&mut env, "rules", &decls).unwrap();
        assert_eq!(ids, vec![0, 1]);
        assert!(env.func(1).is_some_and(|func| !func.code.is_empty()));
    }

    #[test]
    fn test_compile_package_too_many_funcs() {
        let mut env = Env::new();
        for i in 0..=u16::MAX {
            let func = Func {
                name: format!("g{}", i).into(),
                code: Vec::new(),
                constants: Vec::new(),
                num_params: 0,
                num_locals: 0,
                sig: Signature::default(),
            };
            assert!(env.add_func("rules", func).is_some());
        }

        let decls = parse_funcs("func f() bool { return true }").unwrap();
        assert_eq!(
            compile_package(&mut env, "rules", &decls),
            Err(CompileError::TooManyFuncs(decls[0].pos.0))
        );
    }
}
