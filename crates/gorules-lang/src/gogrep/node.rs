use std::ops::Range;

use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::ast::node::NodeRef;

use super::matcher::MatcherState;
use super::program::Program;

/// A named wildcard bound to a sub-tree of the matched tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture<'a> {
    pub name: SmolStr,
    pub node: NodeRef<'a>,
}

/// The result of a successful match.
///
/// Every node is borrowed from the tree the pattern was matched against.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchData<'a> {
    /// The matched node, or the matched sub-list for list patterns.
    pub node: NodeRef<'a>,
    /// Element range of `node` inside the list it was taken from.
    pub window: Option<Range<usize>>,
    pub captures: SmallVec<[Capture<'a>; 4]>,
}

impl<'a> MatchData<'a> {
    pub(crate) fn new(
        prog: &Program,
        node: NodeRef<'a>,
        window: Option<Range<usize>>,
        state: &MatcherState<'a>,
    ) -> Self {
        Self {
            node,
            window,
            captures: state
                .captures
                .iter()
                .map(|captured| Capture {
                    name: prog.string(captured.name).clone(),
                    node: captured.node,
                })
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<NodeRef<'a>> {
        self.captures
            .iter()
            .find(|capture| capture.name == name)
            .map(|capture| capture.node)
    }
}
