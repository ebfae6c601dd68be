//! Syntax pattern matching.
//!
//! A pattern is Go source text that may contain wildcards:
//!
//! * `$x` matches any single node and binds it to `x`;
//! * `$_` matches any single node without binding it;
//! * `$*x` matches any run of nodes (possibly empty) inside a list, or an
//!   optional node such as a `for` loop's init statement;
//! * `$*_` is the anonymous form of `$*x`.
//!
//! Patterns compile into a flat [`Program`] that is shared between clones of
//! a [`Pattern`]; all per-attempt state lives in a [`MatcherState`].

pub mod compile;
pub mod debug;
pub mod error;
pub mod matcher;
pub mod node;
pub mod operation;
pub mod program;

use std::sync::Arc;

use tracing::{debug, trace};

use crate::ast::node::{File, NodeRef};
use crate::ast::walk::{walk, walk_file};

pub use error::CompileError;
pub use matcher::MatcherState;
pub use node::{Capture, MatchData};
pub use operation::Operation;
pub use program::{Instruction, Program};

#[derive(Debug, Clone)]
pub struct Pattern {
    prog: Arc<Program>,
}

impl Pattern {
    pub fn compile(src: &str) -> Result<Self, CompileError> {
        let prog = compile::compile(src)?;
        debug!(
            pattern = src,
            insts = prog.insts.len(),
            strings = prog.strings.len(),
            "compiled pattern"
        );
        Ok(Self {
            prog: Arc::new(prog),
        })
    }

    pub fn program(&self) -> &Program {
        &self.prog
    }

    /// Whether the pattern matches windows of statement or expression lists.
    pub fn is_list(&self) -> bool {
        self.prog.is_list()
    }

    pub fn match_node<'a>(&self, node: NodeRef<'a>) -> Option<MatchData<'a>> {
        let mut state = MatcherState::default();
        let mut result = None;
        self.match_node_with(&mut state, node, |data| result = Some(data));
        result
    }

    /// Matches `node` as a whole and calls `accept` on success.
    ///
    /// List patterns only match a list node whose every element is covered.
    pub fn match_node_with<'a, F>(
        &self,
        state: &mut MatcherState<'a>,
        node: NodeRef<'a>,
        accept: F,
    ) -> bool
    where
        F: FnOnce(MatchData<'a>),
    {
        let prog = &*self.prog;
        state.reset();

        let window = if self.is_list() {
            let root = state.next_inst(prog);
            let end = match (root.op, node) {
                (Operation::MultiStmt, NodeRef::StmtList(stmts)) => {
                    state.match_list(prog, stmts, false)
                }
                (Operation::MultiExpr, NodeRef::ExprList(exprs)) => {
                    state.match_list(prog, exprs, false)
                }
                _ => None,
            };
            match end {
                Some(end) => Some(0..end),
                None => return false,
            }
        } else {
            if node.is_list() || !state.match_node(prog, node) {
                return false;
            }
            None
        };

        trace!(node = node.kind_name(), "pattern matched");
        accept(MatchData::new(prog, node, window, state));
        true
    }

    /// Finds the first window of `list[from..]` that starts at `from` and
    /// matches this list pattern.
    pub fn match_list<'a>(
        &self,
        state: &mut MatcherState<'a>,
        list: NodeRef<'a>,
        from: usize,
    ) -> Option<MatchData<'a>> {
        let prog = &*self.prog;
        state.reset();
        if from >= list.len() {
            return None;
        }

        let root = state.next_inst(prog);
        let (node, end) = match (root.op, list) {
            (Operation::MultiStmt, NodeRef::StmtList(stmts)) => {
                let len = state.match_list(prog, &stmts[from..], true)?;
                (NodeRef::StmtList(&stmts[from..from + len]), from + len)
            }
            (Operation::MultiExpr, NodeRef::ExprList(exprs)) => {
                let len = state.match_list(prog, &exprs[from..], true)?;
                (NodeRef::ExprList(&exprs[from..from + len]), from + len)
            }
            _ => return None,
        };

        trace!(node = list.kind_name(), from, end, "list pattern matched");
        Some(MatchData::new(prog, node, Some(from..end), state))
    }

    /// Iterates over the non-overlapping matches of this list pattern in
    /// `list`, left to right.
    pub fn matches<'p, 'a>(&'p self, list: NodeRef<'a>) -> Matches<'p, 'a> {
        Matches {
            pattern: self,
            state: MatcherState::default(),
            list,
            from: 0,
        }
    }

    /// Collects every match inside `root`, in pre-order.
    pub fn find<'a>(&self, root: NodeRef<'a>) -> Vec<MatchData<'a>> {
        let mut found = Vec::new();
        walk(root, &mut |node| self.collect(node, &mut found));
        found
    }

    /// Collects every match inside the functions of `file`.
    pub fn find_in_file<'a>(&self, file: &'a File) -> Vec<MatchData<'a>> {
        let mut found = Vec::new();
        walk_file(file, &mut |node| self.collect(node, &mut found));
        found
    }

    fn collect<'a>(&self, node: NodeRef<'a>, found: &mut Vec<MatchData<'a>>) {
        if self.is_list() {
            if node.is_list() {
                found.extend(self.matches(node));
            }
        } else if !node.is_list() {
            self.match_node_with(&mut MatcherState::default(), node, |data| found.push(data));
        }
    }
}

/// Lazy iterator returned by [`Pattern::matches`].
pub struct Matches<'p, 'a> {
    pattern: &'p Pattern,
    state: MatcherState<'a>,
    list: NodeRef<'a>,
    from: usize,
}

impl<'a> Iterator for Matches<'_, 'a> {
    type Item = MatchData<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.from < self.list.len() {
            let from = self.from;
            match self.pattern.match_list(&mut self.state, self.list, from) {
                Some(data) => {
                    let end = data.window.as_ref().map_or(from, |window| window.end);
                    self.from = end.max(from + 1);
                    return Some(data);
                }
                None => self.from += 1,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{parse_exprs, parse_file, parse_stmts};
    use rstest::rstest;

    #[rstest]
    #[case("==")]
    #[case("!=")]
    #[case("<")]
    #[case(">")]
    #[case("<=")]
    #[case(">=")]
    #[case("|")]
    #[case("&")]
    #[case("^")]
    #[case("&^")]
    #[case("%")]
    #[case("/")]
    #[case("-")]
    #[case("&&")]
    #[case("||")]
    fn test_repeated_operand(#[case] op: &str) {
        let pattern = Pattern::compile(&format!("$x {} $x", op)).unwrap();

        let same = parse_exprs(&format!("a {} a", op), false).unwrap();
        let data = pattern.match_node(NodeRef::Expr(&same[0])).unwrap();
        assert_eq!(data.get("x").map(|node| node.to_string()), Some("a".to_string()));

        let different = parse_exprs(&format!("a {} b", op), false).unwrap();
        assert!(pattern.match_node(NodeRef::Expr(&different[0])).is_none());
    }

    #[test]
    fn test_list_window() {
        let pattern = Pattern::compile("b; c").unwrap();
        let stmts = parse_stmts("a; b; c; d", false).unwrap();
        let windows = pattern
            .matches(NodeRef::StmtList(&stmts))
            .map(|data| data.window)
            .collect::<Vec<_>>();
        assert_eq!(windows, vec![Some(1..3)]);
    }

    #[test]
    fn test_list_window_does_not_overlap() {
        let pattern = Pattern::compile("b; c").unwrap();
        let stmts = parse_stmts("b; b; c; c", false).unwrap();
        let windows = pattern
            .matches(NodeRef::StmtList(&stmts))
            .map(|data| data.window)
            .collect::<Vec<_>>();
        assert_eq!(windows, vec![Some(1..3)]);
    }

    #[test]
    fn test_empty_list_match_advances() {
        let pattern = Pattern::compile("$*_, $*_").unwrap();
        let exprs = parse_exprs("a, b, c", false).unwrap();
        let windows = pattern
            .matches(NodeRef::ExprList(&exprs))
            .map(|data| data.window)
            .collect::<Vec<_>>();
        assert_eq!(windows, vec![Some(0..0), Some(1..1), Some(2..2)]);
    }

    #[test]
    fn test_whole_list_match() {
        let pattern = Pattern::compile("$x, $*_").unwrap();
        let exprs = parse_exprs("a, b, c", false).unwrap();
        let data = pattern.match_node(NodeRef::ExprList(&exprs)).unwrap();
        assert_eq!(data.window, Some(0..3));
        assert!(pattern.match_node(NodeRef::Expr(&exprs[0])).is_none());
    }

    #[test]
    fn test_single_pattern_rejects_lists() {
        let pattern = Pattern::compile("$x").unwrap();
        let exprs = parse_exprs("a, b", false).unwrap();
        assert!(pattern.match_node(NodeRef::ExprList(&exprs)).is_none());
    }

    #[test]
    fn test_find_in_file() {
        let file = parse_file(
            "package p\n\nfunc f() {\n\ta = a\n\tif ok {\n\t\tb = b\n\t}\n\tc = d\n}\n",
        )
        .unwrap();
        let pattern = Pattern::compile("$x = $x").unwrap();
        let lines = pattern
            .find_in_file(&file)
            .iter()
            .filter_map(|data| data.node.pos().map(|pos| pos.line()))
            .collect::<Vec<_>>();
        assert_eq!(lines, vec![4, 6]);
    }

    #[test]
    fn test_clone_shares_program() {
        let pattern = Pattern::compile("f($*_)").unwrap();
        let cloned = pattern.clone();
        assert!(std::ptr::eq(pattern.program(), cloned.program()));
    }
}
