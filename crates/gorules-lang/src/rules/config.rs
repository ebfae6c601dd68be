use serde::Deserialize;
use smol_str::SmolStr;
use thiserror::Error;

use crate::ast::error::ParseError;
use crate::range::Range;
use crate::{gogrep, quasigo};

/// A rule file as written by users.
///
/// ```toml
/// [[rules]]
/// name = "selfAssign"
/// patterns = ["$x = $x"]
/// report = "suspicious self-assignment of $x"
/// filter = "func f(x *Var) bool { return x.Pure() }"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleFile {
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub name: String,
    pub patterns: Vec<String>,
    pub report: String,
    /// Go source of the filter function, followed by optional helpers.
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub suggest: Option<String>,
}

impl RuleFile {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid rule file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("duplicate rule name {0}")]
    DuplicateRule(SmolStr),
    #[error("rule {0} has no patterns")]
    NoPatterns(SmolStr),
    #[error("rule {rule}: invalid pattern: {source}")]
    Pattern {
        rule: SmolStr,
        pattern: String,
        source: gogrep::CompileError,
    },
    #[error("rule {rule}: invalid filter: {source}")]
    FilterSyntax {
        rule: SmolStr,
        filter: String,
        source: ParseError,
    },
    #[error("rule {rule}: invalid filter: {source}")]
    FilterCompile {
        rule: SmolStr,
        filter: String,
        source: quasigo::CompileError,
    },
    #[error("rule {0}: filter declares no function")]
    EmptyFilter(SmolStr),
    #[error("rule {0}: filter must return bool")]
    FilterResult(SmolStr),
    #[error("rule {rule}: filter parameter {param} must be a *Var named after a capture")]
    FilterParam { rule: SmolStr, param: SmolStr },
}

impl ConfigError {
    /// The text the error points into and the range inside it.
    ///
    /// Rule file errors point into `rule_file`; pattern and filter errors
    /// point into the pattern or filter source.
    #[cold]
    pub fn location<'a>(&'a self, rule_file: &'a str) -> (&'a str, Option<Range>) {
        match self {
            ConfigError::Pattern {
                pattern, source, ..
            } => (pattern, Some(source.range())),
            ConfigError::FilterSyntax { filter, source, .. } => (filter, Some(source.range())),
            ConfigError::FilterCompile { filter, source, .. } => (filter, Some(source.range())),
            _ => (rule_file, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule_file() {
        let file = RuleFile::parse(
            r#"
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
"#,
        )
        .unwrap();

        assert_eq!(file.rules.len(), 2);
        assert_eq!(file.rules[0].name, "selfAssign");
        assert!(file.rules[0].filter.is_some());
        assert_eq!(file.rules[1].patterns.len(), 2);
        assert_eq!(file.rules[1].suggest.as_deref(), Some("$x"));
    }

    #[test]
    fn test_unknown_field() {
        let err = RuleFile::parse("[[rules]]\nname = \"a\"\npatterns = []\nreport = \"\"\nseverity = 1\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(RuleFile::parse("").unwrap(), RuleFile::default());
    }
}
