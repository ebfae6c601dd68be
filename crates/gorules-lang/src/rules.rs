//! Rules: a syntax pattern, an optional filter and a report template.
pub mod config;
pub mod facts;
pub mod runner;

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use serde::Serialize;
use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::gogrep::{MatchData, Pattern};
use crate::quasigo::{EvalEnv, Func, Value, eval};

pub use config::{ConfigError, RuleConfig, RuleFile};
pub use facts::Var;
pub use runner::RuleSet;

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: SmolStr,
    pub patterns: Vec<Pattern>,
    pub filter: Option<Filter>,
    /// Message template: `$name` expands to the text captured by `name`
    /// and `$$` to the whole match.
    pub report: String,
    pub suggest: Option<String>,
}

/// A compiled filter. `funcs[0]` is the filter itself, the rest are the
/// helpers declared after it.
#[derive(Debug, Clone)]
pub struct Filter {
    pub funcs: Vec<Arc<Func>>,
    /// Capture name of every parameter, in order.
    pub params: Vec<SmolStr>,
}

impl Filter {
    pub fn func(&self) -> &Func {
        &self.funcs[0]
    }

    /// Evaluates the filter with a [`Var`] for each captured parameter.
    /// Parameters without a capture receive `nil`.
    pub fn accepts(&self, env: &mut EvalEnv, data: &MatchData<'_>) -> bool {
        let args = self
            .params
            .iter()
            .map(|name| {
                data.get(name)
                    .map_or(Value::Nil, |node| Value::new_ref(Var::new(node)))
            })
            .collect::<SmallVec<[Value; 4]>>();
        eval(env, self.func(), &args).as_bool()
    }
}

/// A finding of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub rule: String,
    pub line: u32,
    pub column: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Source text of the match, as printed from the syntax tree.
    pub matched: String,
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}: {}", self.line, self.column, self.rule, self.message)
    }
}

/// Expands `$name` and `$$` in `template`. Unknown names are kept as is.
pub fn render(template: &str, data: &MatchData<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(at) = rest.find('$') {
        out.push_str(&rest[..at]);
        rest = &rest[at + 1..];

        if let Some(tail) = rest.strip_prefix('$') {
            out.push_str(&data.node.to_string());
            rest = tail;
            continue;
        }

        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let name = &rest[..len];
        match data.get(name) {
            Some(node) if !name.is_empty() => out.push_str(&node.to_string()),
            _ => {
                out.push('$');
                out.push_str(name);
            }
        }
        rest = &rest[len..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::NodeRef;
    use crate::ast::parse_exprs;
    use rstest::rstest;

    #[rstest]
    #[case::capture("self-assignment of $x", "self-assignment of a.b")]
    #[case::whole("$$ is redundant", "a.b == a.b is redundant")]
    #[case::unknown("$y and $", "$y and $")]
    #[case::adjacent("[$x]", "[a.b]")]
    fn test_render(#[case] template: &str, #[case] expected: &str) {
        let exprs = parse_exprs("a.b == a.b", false).unwrap();
        let pattern = Pattern::compile("$x == $x").unwrap();
        let data = pattern.match_node(NodeRef::Expr(&exprs[0])).unwrap();
        assert_eq!(render(template, &data), expected);
    }

    #[test]
    fn test_report_display() {
        let report = Report {
            rule: "selfAssign".to_string(),
            line: 3,
            column: 2,
            message: "suspicious self-assignment of x".to_string(),
            suggestion: None,
            matched: "x = x".to_string(),
        };
        assert_eq!(report.to_string(), "3:2: selfAssign: suspicious self-assignment of x");
    }
}
