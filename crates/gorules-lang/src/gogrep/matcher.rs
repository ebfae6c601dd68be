use smallvec::SmallVec;

use crate::ast::node::{Expr, ExprKind, Field, FuncType, LitKind, NodeRef, Stmt, StmtKind};

use super::operation::{
    Operation, assign_op_code, binary_op_code, branch_code, chan_dir_code, inc_dec_code,
    range_code, unary_op_code,
};
use super::program::{Instruction, Program};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CapturedNode<'a> {
    pub name: u8,
    pub node: NodeRef<'a>,
}

/// Scratch state of one matching attempt.
///
/// A state can be reused across attempts to avoid reallocating the capture
/// buffer; it never outlives the tree it borrows from.
#[derive(Debug, Default)]
pub struct MatcherState<'a> {
    pc: usize,
    pub(crate) captures: SmallVec<[CapturedNode<'a>; 8]>,
}

/// An element type of a syntax list.
pub(crate) trait ListElem {
    fn node_ref(&self) -> NodeRef<'_>;
    fn list_ref(list: &[Self]) -> NodeRef<'_>
    where
        Self: Sized;
}

impl ListElem for Expr {
    fn node_ref(&self) -> NodeRef<'_> {
        NodeRef::Expr(self)
    }

    fn list_ref(list: &[Self]) -> NodeRef<'_> {
        NodeRef::ExprList(list)
    }
}

impl ListElem for Stmt {
    fn node_ref(&self) -> NodeRef<'_> {
        NodeRef::Stmt(self)
    }

    fn list_ref(list: &[Self]) -> NodeRef<'_> {
        NodeRef::StmtList(list)
    }
}

impl ListElem for Field {
    fn node_ref(&self) -> NodeRef<'_> {
        NodeRef::Field(self)
    }

    fn list_ref(list: &[Self]) -> NodeRef<'_> {
        NodeRef::FieldList(list)
    }
}

/// Point to resume from when a variadic wildcard has to swallow one more
/// element.
#[derive(Debug, Clone, Copy)]
struct Restart {
    seq_pc: usize,
    start: usize,
    len: usize,
    captures_len: usize,
}

impl<'a> MatcherState<'a> {
    pub(crate) fn reset(&mut self) {
        self.pc = 0;
        self.captures.clear();
    }

    #[inline(always)]
    pub(crate) fn next_inst(&mut self, prog: &Program) -> Instruction {
        let inst = prog.insts[self.pc];
        self.pc += 1;
        inst
    }

    fn capture(&mut self, inst: Instruction, node: NodeRef<'a>) -> bool {
        // `$x;` in statement position binds the expression itself so that it
        // compares equal to `$x` used as an expression.
        let node = match node {
            NodeRef::Stmt(Stmt {
                kind: StmtKind::Expr(expr),
                ..
            }) => NodeRef::Expr(expr),
            node => node,
        };

        match self
            .captures
            .iter()
            .find(|captured| captured.name == inst.value_index)
        {
            Some(captured) => captured.node == node,
            None => {
                self.captures.push(CapturedNode {
                    name: inst.value_index,
                    node,
                });
                true
            }
        }
    }

    fn capture_seq(&mut self, inst: Instruction, node: NodeRef<'a>) -> bool {
        match inst.op {
            Operation::NamedNodeSeq => self.capture(inst, node),
            _ => true,
        }
    }

    pub(crate) fn match_node(&mut self, prog: &Program, node: NodeRef<'a>) -> bool {
        let inst = self.next_inst(prog);

        match inst.op {
            Operation::Node | Operation::NodeSeq | Operation::OptNode => true,
            Operation::NamedNode | Operation::NamedNodeSeq | Operation::NamedOptNode => {
                self.capture(inst, node)
            }
            Operation::MultiStmt | Operation::MultiExpr | Operation::End => false,
            _ => match node {
                NodeRef::Expr(expr) => self.match_expr(prog, inst, expr),
                NodeRef::Stmt(stmt) => self.match_stmt(prog, inst, stmt),
                NodeRef::Field(field) => self.match_field(prog, inst, field),
                NodeRef::FieldList(fields) => {
                    inst.op == Operation::FieldList && self.match_list(prog, fields, false).is_some()
                }
                NodeRef::ExprList(_) | NodeRef::StmtList(_) => false,
            },
        }
    }

    /// Matches the `End` terminated element instructions at the current pc
    /// against `list`.
    ///
    /// Returns the number of consumed elements. Unless `partial` is set the
    /// whole list has to be consumed.
    pub(crate) fn match_list<T: ListElem>(
        &mut self,
        prog: &Program,
        list: &'a [T],
        partial: bool,
    ) -> Option<usize> {
        let mut restarts: SmallVec<[Restart; 4]> = SmallVec::new();
        let mut i = 0;

        loop {
            let pc = self.pc;
            let inst = prog.insts[pc];

            let matched = match inst.op {
                Operation::End => {
                    self.pc += 1;
                    if partial || i == list.len() {
                        return Some(i);
                    }
                    false
                }
                Operation::NodeSeq | Operation::NamedNodeSeq => {
                    self.pc += 1;
                    if i < list.len() {
                        restarts.push(Restart {
                            seq_pc: pc,
                            start: i,
                            len: 1,
                            captures_len: self.captures.len(),
                        });
                    }
                    self.capture_seq(inst, T::list_ref(&list[i..i]))
                }
                _ => {
                    if i < list.len() && self.match_node(prog, list[i].node_ref()) {
                        i += 1;
                        true
                    } else {
                        false
                    }
                }
            };

            if matched {
                continue;
            }

            loop {
                let restart = restarts.pop()?;
                self.captures.truncate(restart.captures_len);

                let end = restart.start + restart.len;
                if end < list.len() {
                    restarts.push(Restart {
                        len: restart.len + 1,
                        ..restart
                    });
                }

                self.pc = restart.seq_pc + 1;
                i = end;
                let inst = prog.insts[restart.seq_pc];
                if self.capture_seq(inst, T::list_ref(&list[restart.start..end])) {
                    break;
                }
            }
        }
    }

    #[inline(always)]
    fn expr(&mut self, prog: &Program, expr: &'a Expr) -> bool {
        self.match_node(prog, NodeRef::Expr(expr))
    }

    #[inline(always)]
    fn stmt(&mut self, prog: &Program, stmt: &'a Stmt) -> bool {
        self.match_node(prog, NodeRef::Stmt(stmt))
    }

    #[inline(always)]
    fn exprs(&mut self, prog: &Program, exprs: &'a [Expr]) -> bool {
        self.match_list(prog, exprs, false).is_some()
    }

    #[inline(always)]
    fn stmts(&mut self, prog: &Program, stmts: &'a [Stmt]) -> bool {
        self.match_list(prog, stmts, false).is_some()
    }

    fn fields(&mut self, prog: &Program, fields: &'a [Field]) -> bool {
        self.match_node(prog, NodeRef::FieldList(fields))
    }

    /// An optional part of a node that the pattern spells out.
    fn opt_expr(&mut self, prog: &Program, expr: Option<&'a Expr>) -> bool {
        match expr {
            Some(expr) => self.expr(prog, expr),
            None => {
                let inst = self.next_inst(prog);
                match inst.op {
                    Operation::OptNode => true,
                    Operation::NamedOptNode => self.capture(inst, NodeRef::ExprList(&[])),
                    _ => false,
                }
            }
        }
    }

    fn opt_stmt(&mut self, prog: &Program, stmt: Option<&'a Stmt>) -> bool {
        match stmt {
            Some(stmt) => self.stmt(prog, stmt),
            None => {
                let inst = self.next_inst(prog);
                match inst.op {
                    Operation::OptNode => true,
                    Operation::NamedOptNode => self.capture(inst, NodeRef::StmtList(&[])),
                    _ => false,
                }
            }
        }
    }

    fn match_signature(&mut self, prog: &Program, inst: Instruction, ty: &'a FuncType) -> bool {
        match inst.op {
            Operation::VoidFuncType => ty.results.is_empty() && self.fields(prog, &ty.params),
            Operation::FuncType => {
                !ty.results.is_empty()
                    && self.fields(prog, &ty.params)
                    && self.fields(prog, &ty.results)
            }
            _ => false,
        }
    }

    fn match_field(&mut self, prog: &Program, inst: Instruction, field: &'a Field) -> bool {
        match (inst.op, &field.names[..]) {
            (Operation::UnnamedField, []) => self.expr(prog, &field.ty),
            (Operation::SimpleField, [name]) => {
                name.ident_name() == Some(prog.string(inst.value_index))
                    && self.expr(prog, &field.ty)
            }
            (Operation::Field, [name]) => self.expr(prog, name) && self.expr(prog, &field.ty),
            (Operation::MultiField, names) if !names.is_empty() => {
                self.exprs(prog, names) && self.expr(prog, &field.ty)
            }
            _ => false,
        }
    }

    fn match_expr(&mut self, prog: &Program, inst: Instruction, expr: &'a Expr) -> bool {
        let value = || prog.string(inst.value_index);

        match (inst.op, &expr.kind) {
            (Operation::Ident, ExprKind::Ident(name)) => name == value(),
            (Operation::StrictIntLit, ExprKind::BasicLit { kind: LitKind::Int, value: v })
            | (Operation::StrictFloatLit, ExprKind::BasicLit { kind: LitKind::Float, value: v })
            | (Operation::StrictComplexLit, ExprKind::BasicLit { kind: LitKind::Imag, value: v })
            | (Operation::StrictCharLit, ExprKind::BasicLit { kind: LitKind::Char, value: v })
            | (
                Operation::StrictStringLit,
                ExprKind::BasicLit {
                    kind: LitKind::String,
                    value: v,
                },
            ) => v == value(),
            (Operation::CompositeLit, ExprKind::CompositeLit { ty: None, elts }) => {
                self.exprs(prog, elts)
            }
            (Operation::TypedCompositeLit, ExprKind::CompositeLit { ty: Some(ty), elts }) => {
                self.expr(prog, ty) && self.exprs(prog, elts)
            }
            (Operation::FuncLit, ExprKind::FuncLit { ty, body }) => {
                let signature = self.next_inst(prog);
                self.match_signature(prog, signature, ty) && self.stmt(prog, body)
            }
            (Operation::ParenExpr, ExprKind::Paren(x)) | (Operation::StarExpr, ExprKind::Star(x)) => {
                self.expr(prog, x)
            }
            (Operation::SimpleSelectorExpr, ExprKind::Selector { x, sel }) => {
                sel.ident_name() == Some(value()) && self.expr(prog, x)
            }
            (Operation::SelectorExpr, ExprKind::Selector { x, sel }) => {
                self.expr(prog, x) && self.expr(prog, sel)
            }
            (Operation::IndexExpr, ExprKind::Index { x, index }) => {
                self.expr(prog, x) && self.expr(prog, index)
            }
            (
                op,
                ExprKind::Slice {
                    x,
                    low,
                    high,
                    max,
                    slice3,
                },
            ) => {
                let Some((want_low, want_high, want_max)) = op.slice_parts() else {
                    return false;
                };
                want_low == low.is_some()
                    && want_high == high.is_some()
                    && want_max == max.is_some()
                    && *slice3 == want_max
                    && self.expr(prog, x)
                    && [low, high, max]
                        .into_iter()
                        .flatten()
                        .all(|index| self.expr(prog, index))
            }
            (Operation::TypeAssertExpr, ExprKind::TypeAssert { x, ty: Some(ty) }) => {
                self.expr(prog, x) && self.expr(prog, ty)
            }
            (Operation::TypeSwitchAssertExpr, ExprKind::TypeAssert { x, ty: None }) => {
                self.expr(prog, x)
            }
            (
                Operation::VariadicCallExpr | Operation::CallExpr | Operation::NonVariadicCallExpr,
                ExprKind::Call {
                    fun,
                    args,
                    ellipsis,
                },
            ) => {
                let ellipsis_ok = match inst.op {
                    Operation::VariadicCallExpr => *ellipsis,
                    Operation::NonVariadicCallExpr => !*ellipsis,
                    _ => true,
                };
                ellipsis_ok && self.expr(prog, fun) && self.exprs(prog, args)
            }
            (Operation::UnaryExpr, ExprKind::Unary { op, x }) => {
                unary_op_code(*op) == inst.value && self.expr(prog, x)
            }
            (Operation::BinaryExpr, ExprKind::Binary { op, x, y }) => {
                binary_op_code(*op) == inst.value && self.expr(prog, x) && self.expr(prog, y)
            }
            (Operation::KeyValueExpr, ExprKind::KeyValue { key, value }) => {
                self.expr(prog, key) && self.expr(prog, value)
            }
            (Operation::SliceType, ExprKind::ArrayType { len: None, elem }) => {
                self.expr(prog, elem)
            }
            (
                Operation::ArrayType,
                ExprKind::ArrayType {
                    len: Some(len),
                    elem,
                },
            ) => self.expr(prog, len) && self.expr(prog, elem),
            (Operation::Ellipsis, ExprKind::Ellipsis(None)) => true,
            (Operation::TypedEllipsis, ExprKind::Ellipsis(Some(elem))) => self.expr(prog, elem),
            (Operation::MapType, ExprKind::MapType { key, value }) => {
                self.expr(prog, key) && self.expr(prog, value)
            }
            (Operation::ChanType, ExprKind::ChanType { dir, value }) => {
                chan_dir_code(*dir) == inst.value && self.expr(prog, value)
            }
            (Operation::VoidFuncType | Operation::FuncType, ExprKind::FuncType(ty)) => {
                self.match_signature(prog, inst, ty)
            }
            (Operation::StructType, ExprKind::StructType(fields))
            | (Operation::InterfaceType, ExprKind::InterfaceType(fields)) => {
                self.fields(prog, fields)
            }
            _ => false,
        }
    }

    fn match_stmt(&mut self, prog: &Program, inst: Instruction, stmt: &'a Stmt) -> bool {
        match (inst.op, &stmt.kind) {
            (Operation::ExprStmt, StmtKind::Expr(x))
            | (Operation::GoStmt, StmtKind::Go(x))
            | (Operation::DeferStmt, StmtKind::Defer(x)) => self.expr(prog, x),
            (Operation::SendStmt, StmtKind::Send { chan, value }) => {
                self.expr(prog, chan) && self.expr(prog, value)
            }
            (Operation::IncDecStmt, StmtKind::IncDec { x, inc }) => {
                inc_dec_code(*inc) == inst.value && self.expr(prog, x)
            }
            (Operation::AssignStmt, StmtKind::Assign { lhs, op, rhs }) => match (&lhs[..], &rhs[..]) {
                ([lhs], [rhs]) => {
                    assign_op_code(*op) == inst.value
                        && self.expr(prog, lhs)
                        && self.expr(prog, rhs)
                }
                _ => false,
            },
            (Operation::MultiAssignStmt, StmtKind::Assign { lhs, op, rhs }) => {
                assign_op_code(*op) == inst.value && self.exprs(prog, lhs) && self.exprs(prog, rhs)
            }
            (
                Operation::VarStmt,
                StmtKind::Var {
                    names,
                    ty: None,
                    values,
                },
            ) => self.exprs(prog, names) && self.exprs(prog, values),
            (
                Operation::TypedVarStmt,
                StmtKind::Var {
                    names,
                    ty: Some(ty),
                    values,
                },
            ) => self.exprs(prog, names) && self.expr(prog, ty) && self.exprs(prog, values),
            (Operation::ReturnStmt, StmtKind::Return(results)) => self.exprs(prog, results),
            (Operation::BranchStmt, StmtKind::Branch { kind, label: None }) => {
                branch_code(*kind) == inst.value
            }
            (
                Operation::LabeledBranchStmt,
                StmtKind::Branch {
                    kind,
                    label: Some(label),
                },
            ) => branch_code(*kind) == inst.value && label == prog.string(inst.value_index),
            (Operation::LabeledStmt, StmtKind::Labeled { label, stmt }) => {
                label == prog.string(inst.value_index) && self.stmt(prog, stmt)
            }
            (Operation::BlockStmt, StmtKind::Block(stmts)) => self.stmts(prog, stmts),
            (Operation::EmptyStmt, StmtKind::Empty) => true,
            (
                op,
                StmtKind::If {
                    init,
                    cond,
                    body,
                    els,
                },
            ) => {
                let (want_init, want_else) = match op {
                    Operation::IfStmt => (false, false),
                    Operation::IfElseStmt => (false, true),
                    Operation::IfInitStmt => (true, false),
                    Operation::IfInitElseStmt => (true, true),
                    _ => return false,
                };
                (want_init || init.is_none())
                    && want_else == els.is_some()
                    && (!want_init || self.opt_stmt(prog, init.as_deref()))
                    && self.expr(prog, cond)
                    && self.stmt(prog, body)
                    && els.as_deref().is_none_or(|els| self.stmt(prog, els))
            }
            (op, StmtKind::Switch { init, tag, body }) => {
                let (want_init, want_tag) = match op {
                    Operation::SwitchStmt => (false, false),
                    Operation::TagSwitchStmt => (false, true),
                    Operation::InitSwitchStmt => (true, false),
                    Operation::InitTagSwitchStmt => (true, true),
                    _ => return false,
                };
                (want_init || init.is_none())
                    && (want_tag || tag.is_none())
                    && (!want_init || self.opt_stmt(prog, init.as_deref()))
                    && (!want_tag || self.opt_expr(prog, tag.as_ref()))
                    && self.stmt(prog, body)
            }
            (op, StmtKind::TypeSwitch { init, assign, body }) => {
                let want_init = match op {
                    Operation::TypeSwitchStmt => false,
                    Operation::TypeSwitchInitStmt => true,
                    _ => return false,
                };
                (want_init || init.is_none())
                    && (!want_init || self.opt_stmt(prog, init.as_deref()))
                    && self.stmt(prog, assign)
                    && self.stmt(prog, body)
            }
            (
                Operation::CaseClause,
                StmtKind::Case {
                    list: Some(list),
                    body,
                },
            ) => self.exprs(prog, list) && self.stmts(prog, body),
            (Operation::DefaultCaseClause, StmtKind::Case { list: None, body }) => {
                self.stmts(prog, body)
            }
            (
                op,
                StmtKind::For {
                    init,
                    cond,
                    post,
                    body,
                },
            ) => {
                let Some((want_init, want_cond, want_post)) = op.for_parts() else {
                    return false;
                };
                (want_init || init.is_none())
                    && (want_cond || cond.is_none())
                    && (want_post || post.is_none())
                    && (!want_init || self.opt_stmt(prog, init.as_deref()))
                    && (!want_cond || self.opt_expr(prog, cond.as_ref()))
                    && (!want_post || self.opt_stmt(prog, post.as_deref()))
                    && self.stmt(prog, body)
            }
            (
                Operation::RangeStmt,
                StmtKind::Range {
                    key: None, x, body, ..
                },
            ) => self.expr(prog, x) && self.stmt(prog, body),
            (
                Operation::RangeKeyStmt,
                StmtKind::Range {
                    key: Some(key),
                    value: None,
                    define,
                    x,
                    body,
                },
            ) => {
                range_code(*define) == inst.value
                    && self.expr(prog, key)
                    && self.expr(prog, x)
                    && self.stmt(prog, body)
            }
            (
                Operation::RangeKeyValueStmt,
                StmtKind::Range {
                    key: Some(key),
                    value: Some(value),
                    define,
                    x,
                    body,
                },
            ) => {
                range_code(*define) == inst.value
                    && self.expr(prog, key)
                    && self.expr(prog, value)
                    && self.expr(prog, x)
                    && self.stmt(prog, body)
            }
            _ => false,
        }
    }
}
