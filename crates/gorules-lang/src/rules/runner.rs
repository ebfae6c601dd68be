use std::fmt::Write;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::ast::error::ParseError;
use crate::ast::node::{File, FuncDecl};
use crate::ast::walk::walk_file;
use crate::ast::{parse_file, parse_funcs};
use crate::gogrep::debug::dump_program;
use crate::gogrep::{MatchData, MatcherState, Pattern};
use crate::quasigo::{Env, EvalEnv, Type, compile_package, disasm};

use super::config::{ConfigError, RuleConfig, RuleFile};
use super::facts::{self, VAR_TYPE};
use super::{Filter, Report, Rule, render};

/// A loaded set of rules sharing one native registry.
///
/// A `RuleSet` is immutable once built and can be shared between threads;
/// every [`run`](RuleSet::run) uses its own matcher and evaluation state.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    env: Arc<Env>,
}

impl RuleSet {
    pub fn load(text: &str) -> Result<Self, ConfigError> {
        Self::from_config(RuleFile::parse(text)?)
    }

    pub fn from_config(file: RuleFile) -> Result<Self, ConfigError> {
        let mut env = Env::new();
        facts::register(&mut env);

        let mut names = FxHashSet::default();
        let mut rules = Vec::with_capacity(file.rules.len());
        for config in file.rules {
            let name = SmolStr::from(config.name.as_str());
            if !names.insert(name.clone()) {
                return Err(ConfigError::DuplicateRule(name));
            }
            rules.push(build_rule(&mut env, name, config)?);
        }

        debug!(rules = rules.len(), natives = env.num_natives(), "loaded rule set");
        Ok(Self {
            rules,
            env: Arc::new(env),
        })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    /// Matches every rule against every node and node list of `file`.
    ///
    /// Reports are sorted by position; a rule reports a position once.
    pub fn run(&self, file: &File) -> Vec<Report> {
        let mut eval_env = EvalEnv::new(Arc::clone(&self.env));
        let mut state = MatcherState::default();
        let mut reports = Vec::new();

        walk_file(file, &mut |node| {
            for rule in &self.rules {
                for pattern in &rule.patterns {
                    if pattern.is_list() {
                        if node.is_list() {
                            for data in pattern.matches(node) {
                                report(rule, &data, &mut eval_env, &mut reports);
                            }
                        }
                    } else if !node.is_list() {
                        let mut matched = None;
                        pattern.match_node_with(&mut state, node, |data| matched = Some(data));
                        if let Some(data) = matched {
                            report(rule, &data, &mut eval_env, &mut reports);
                        }
                    }
                }
            }
        });

        reports.sort_by(|a, b| (a.line, a.column, &a.rule).cmp(&(b.line, b.column, &b.rule)));
        reports.dedup_by(|a, b| (a.line, a.column, &a.rule) == (b.line, b.column, &b.rule));
        reports
    }

    pub fn run_source(&self, code: &str) -> Result<Vec<Report>, ParseError> {
        Ok(self.run(&parse_file(code)?))
    }

    /// Listing of every compiled pattern and filter, grouped by rule.
    pub fn disasm(&self) -> String {
        let mut out = String::new();
        for rule in &self.rules {
            for (i, pattern) in rule.patterns.iter().enumerate() {
                let _ = writeln!(out, "{}.pattern{}:", rule.name, i);
                for line in dump_program(pattern.program()).lines() {
                    let _ = writeln!(out, "  {}", line);
                }
            }
            let Some(filter) = &rule.filter else {
                continue;
            };
            for func in &filter.funcs {
                let _ = writeln!(out, "{}.{} {}:", rule.name, func.name, func.sig);
                out.push_str(&disasm(&self.env, func));
            }
        }
        out
    }
}

fn report(rule: &Rule, data: &MatchData<'_>, env: &mut EvalEnv, reports: &mut Vec<Report>) {
    if let Some(filter) = &rule.filter {
        if !filter.accepts(env, data) {
            trace!(rule = %rule.name, node = data.node.kind_name(), "filter rejected match");
            return;
        }
    }

    let pos = data.node.pos().map(|pos| pos.0).unwrap_or_default();
    reports.push(Report {
        rule: rule.name.to_string(),
        line: pos.line,
        column: pos.column,
        message: render(&rule.report, data),
        suggestion: rule.suggest.as_deref().map(|template| render(template, data)),
        matched: data.node.to_string(),
    });
}

fn build_rule(env: &mut Env, name: SmolStr, config: RuleConfig) -> Result<Rule, ConfigError> {
    if config.patterns.is_empty() {
        return Err(ConfigError::NoPatterns(name));
    }

    let patterns = config
        .patterns
        .iter()
        .map(|pattern| {
            Pattern::compile(pattern).map_err(|source| ConfigError::Pattern {
                rule: name.clone(),
                pattern: pattern.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let filter = match &config.filter {
        Some(src) => Some(build_filter(env, &name, src, &patterns)?),
        None => None,
    };

    Ok(Rule {
        name,
        patterns,
        filter,
        report: config.report,
        suggest: config.suggest,
    })
}

fn build_filter(
    env: &mut Env,
    rule: &SmolStr,
    src: &str,
    patterns: &[Pattern],
) -> Result<Filter, ConfigError> {
    let decls = parse_funcs(src).map_err(|source| ConfigError::FilterSyntax {
        rule: rule.clone(),
        filter: src.to_string(),
        source,
    })?;
    let Some(decl) = decls.first() else {
        return Err(ConfigError::EmptyFilter(rule.clone()));
    };

    let captures = patterns
        .iter()
        .flat_map(|pattern| pattern.program().capture_names())
        .collect::<FxHashSet<_>>();
    let params = filter_params(rule, decl, |name| captures.contains(name))?;

    let ids = compile_package(env, rule, &decls).map_err(|source| ConfigError::FilterCompile {
        rule: rule.clone(),
        filter: src.to_string(),
        source,
    })?;
    let funcs = ids
        .iter()
        .filter_map(|&id| env.func(id).cloned())
        .collect::<Vec<_>>();
    if funcs.first().is_none_or(|func| func.sig.results != [Type::Bool]) {
        return Err(ConfigError::FilterResult(rule.clone()));
    }

    debug!(rule = %rule, params = params.len(), funcs = funcs.len(), "compiled filter");
    Ok(Filter { funcs, params })
}

/// Every filter parameter must be a `*Var` named after a capture.
fn filter_params(
    rule: &SmolStr,
    decl: &FuncDecl,
    is_capture: impl Fn(&SmolStr) -> bool,
) -> Result<Vec<SmolStr>, ConfigError> {
    let mut params = Vec::new();
    for field in &decl.ty.params {
        let is_var = Type::from_expr(&field.ty) == Some(Type::named(VAR_TYPE));
        if field.names.is_empty() {
            return Err(ConfigError::FilterParam {
                rule: rule.clone(),
                param: SmolStr::new(field.ty.to_string()),
            });
        }
        for name in &field.names {
            let param = name.ident_name().cloned().unwrap_or_default();
            if !is_var || !is_capture(&param) {
                return Err(ConfigError::FilterParam {
                    rule: rule.clone(),
                    param,
                });
            }
            params.push(param);
        }
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const RULES: &str = r#"
[[rules]]
name = "selfAssign"
patterns = ["$x = $x"]
report = "suspicious self-assignment of $x"
filter = """
func f(x *Var) bool { return x.Pure() }
"""

[[rules]]
name = "boolCompare"
patterns = ["$x == true", "$x != false"]
report = "omit comparison with a bool literal"
suggest = "$x"

[[rules]]
name = "lenCheck"
patterns = ["len($s) == 0"]
report = "use $s == \"\""
filter = """
func f(s *Var) bool { return isShort(s.Text()) }
func isShort(text string) bool { return len(text) <= 3 }
"""
"#;

    const SOURCE: &str = r#"package main

func main() {
	a = a
	xs[f()] = xs[f()]
	if ok == true {
		println(len(str) == 0, len(longName) == 0)
	}
	for done != false {
	}
}
"#;

    #[test]
    fn test_run() {
        let rules = RuleSet::load(RULES).unwrap();
        let reports = rules.run_source(SOURCE).unwrap();
        let found = reports
            .iter()
            .map(|report| (report.line, report.rule.as_str(), report.message.as_str()))
            .collect::<Vec<_>>();

        assert_eq!(
            found,
            vec![
                (4, "selfAssign", "suspicious self-assignment of a"),
                (6, "boolCompare", "omit comparison with a bool literal"),
                (7, "lenCheck", "use str == \"\""),
                (9, "boolCompare", "omit comparison with a bool literal"),
            ]
        );
        assert_eq!(reports[1].suggestion.as_deref(), Some("ok"));
        assert_eq!(reports[3].suggestion.as_deref(), Some("done"));
    }

    #[test]
    fn test_list_rule() {
        let rules = RuleSet::load(
            r#"
[[rules]]
name = "doubleUnlock"
patterns = ["mu.Unlock(); mu.Unlock()"]
report = "double unlock: $$"
"#,
        )
        .unwrap();
        let reports = rules
            .run_source("package p\nfunc f() {\n\tmu.Lock()\n\tmu.Unlock()\n\tmu.Unlock()\n}\n")
            .unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].line, 4);
    }

    #[rstest]
    #[case::duplicate(
        "[[rules]]\nname = \"a\"\npatterns = [\"x\"]\nreport = \"\"\n[[rules]]\nname = \"a\"\npatterns = [\"y\"]\nreport = \"\"\n",
        "duplicate rule name a"
    )]
    #[case::no_patterns("[[rules]]\nname = \"a\"\npatterns = []\nreport = \"\"\n", "rule a has no patterns")]
    #[case::bad_pattern(
        "[[rules]]\nname = \"a\"\npatterns = [\"package p\"]\nreport = \"\"\n",
        "rule a: invalid pattern: unsupported construct: declaration"
    )]
    #[case::param_not_captured(
        "[[rules]]\nname = \"a\"\npatterns = [\"f($x)\"]\nreport = \"\"\nfilter = \"func f(y *Var) bool { return true }\"\n",
        "rule a: filter parameter y must be a *Var named after a capture"
    )]
    #[case::param_type(
        "[[rules]]\nname = \"a\"\npatterns = [\"f($x)\"]\nreport = \"\"\nfilter = \"func f(x string) bool { return true }\"\n",
        "rule a: filter parameter x must be a *Var named after a capture"
    )]
    #[case::result_type(
        "[[rules]]\nname = \"a\"\npatterns = [\"f($x)\"]\nreport = \"\"\nfilter = \"func f(x *Var) int { return 1 }\"\n",
        "rule a: filter must return bool"
    )]
    #[case::filter_compile(
        "[[rules]]\nname = \"a\"\npatterns = [\"f($x)\"]\nreport = \"\"\nfilter = \"func f(x *Var) bool { x = nil; return true }\"\n",
        "rule a: invalid filter: can't assign to x, params are readonly"
    )]
    #[case::empty_filter(
        "[[rules]]\nname = \"a\"\npatterns = [\"f($x)\"]\nreport = \"\"\nfilter = \"\"\n",
        "rule a: filter declares no function"
    )]
    fn test_load_errors(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(RuleSet::load(text).unwrap_err().to_string(), expected);
    }

    #[test]
    fn test_disasm() {
        let rules = RuleSet::load(RULES).unwrap();
        let listing = rules.disasm();
        assert!(listing.starts_with("selfAssign.pattern0:\n  AssignStmt =\n"));
        assert!(listing.contains("selfAssign.f func(*Var) bool:\n"));
        assert!(listing.contains("CallNative (*Var).Pure"));
        assert!(listing.contains("lenCheck.isShort func(string) bool:\n"));
        assert!(listing.contains("Call isShort"));
    }

    #[test]
    fn test_rule_set_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RuleSet>();

        let rules = Arc::new(RuleSet::load(RULES).unwrap());
        let handles = (0..2)
            .map(|_| {
                let rules = Arc::clone(&rules);
                std::thread::spawn(move || rules.run_source(SOURCE).unwrap().len())
            })
            .collect::<Vec<_>>();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 4);
        }
    }
}
