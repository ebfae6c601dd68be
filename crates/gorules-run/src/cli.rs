use clap::{Parser, Subcommand};
use colored::Colorize;
use gorules_lang::{Pattern, Report, RuleSet};
use itertools::Itertools;
use miette::IntoDiagnostic;
use miette::miette;
use rayon::prelude::*;
use serde::Serialize;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "gorules")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = "# Examples:\n\n\
    ## To check Go files against a rule file:\n\
    gorules check --rules rules.toml main.go\n\n\
    ## To search Go files with a pattern:\n\
    gorules grep 'fmt.Errorf($s)' main.go\n\n\
    ## To show the compiled filters of a rule file:\n\
    gorules disasm --rules rules.toml")]
#[command(about = "gorules checks Go code against syntax pattern rules.", long_about = None)]
pub struct Cli {
    /// Set output format
    #[arg(short = 'F', long, value_enum, default_value_t, global = true)]
    format: OutputFormat,

    /// Number of files to process before switching to parallel processing
    #[arg(short = 'P', default_value_t = 10, global = true)]
    parallel_threshold: usize,

    #[clap(subcommand)]
    commands: Commands,
}

#[derive(Clone, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check Go files against the rules of a rule file
    Check {
        /// Path to the TOML rule file
        #[arg(short, long)]
        rules: PathBuf,
        /// Go files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the matches of a pattern in Go files
    Grep {
        /// Pattern to search for, such as `$x == $x`
        pattern: String,
        /// Go files to search
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the bytecode of the filters of a rule file
    Disasm {
        /// Path to the TOML rule file
        #[arg(short, long)]
        rules: PathBuf,
    },
}

/// A finding together with the file it was found in.
#[derive(Debug, Serialize)]
struct Finding {
    file: String,
    #[serde(flatten)]
    report: Report,
}

impl Cli {
    pub fn run(&self) -> miette::Result<()> {
        match &self.commands {
            Commands::Check { rules, files } => {
                let rules = load_rules(rules)?;
                let findings = self.process(files, |code| {
                    gorules_lang::parse(code).map(|file| rules.run(&file)).map_err(|e| *e)
                })?;
                self.print(&findings)?;

                if findings.is_empty() {
                    Ok(())
                } else {
                    Err(miette!("{} issue(s) found", findings.len()))
                }
            }
            Commands::Grep { pattern, files } => {
                let pattern = gorules_lang::compile_pattern(pattern).map_err(|e| *e)?;
                let findings = self.process(files, |code| {
                    gorules_lang::parse(code)
                        .map(|file| grep(&pattern, &file))
                        .map_err(|e| *e)
                })?;
                self.print(&findings)
            }
            Commands::Disasm { rules } => {
                let rules = load_rules(rules)?;
                let stdout = io::stdout();
                let mut handle = BufWriter::new(stdout.lock());
                write!(handle, "{}", rules.disasm()).into_diagnostic()?;
                handle.flush().into_diagnostic()
            }
        }
    }

    /// Runs `run` on the contents of every file and collects the reports,
    /// ordered by file.
    fn process<F>(&self, files: &[PathBuf], run: F) -> miette::Result<Vec<Finding>>
    where
        F: Fn(&str) -> Result<Vec<Report>, gorules_lang::Error> + Sync,
    {
        let check = |file: &PathBuf| -> miette::Result<Vec<Finding>> {
            if !file.exists() {
                return Err(miette!("File not found: {}", file.display()));
            }

            debug!(file = %file.display(), "processing");
            let content = fs::read_to_string(file).into_diagnostic()?;
            let reports = run(&content)
                .map_err(|e| miette::Report::new(e).wrap_err(format!("Failed to parse {}", file.display())))?;

            Ok(reports
                .into_iter()
                .map(|report| Finding {
                    file: file.display().to_string(),
                    report,
                })
                .collect())
        };

        let findings = if files.len() > self.parallel_threshold {
            files.par_iter().map(check).collect::<miette::Result<Vec<_>>>()?
        } else {
            files.iter().map(check).collect::<miette::Result<Vec<_>>>()?
        };

        Ok(findings.into_iter().flatten().collect())
    }

    fn print(&self, findings: &[Finding]) -> miette::Result<()> {
        let stdout = io::stdout();
        let mut handle = BufWriter::new(stdout.lock());

        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(findings).into_diagnostic()?;
                writeln!(handle, "{}", json).into_diagnostic()?;
            }
            OutputFormat::Text => {
                let color = io::stdout().is_terminal();
                for finding in findings {
                    writeln!(handle, "{}", format_finding(finding, color)).into_diagnostic()?;
                }
            }
        }

        handle.flush().into_diagnostic()
    }
}

fn load_rules(path: &PathBuf) -> miette::Result<RuleSet> {
    if !path.exists() {
        return Err(miette!("File not found: {}", path.display()));
    }

    let text = fs::read_to_string(path).into_diagnostic()?;
    let rules = gorules_lang::load_rules(&text)
        .map_err(|e| miette::Report::new(*e).wrap_err(format!("Failed to load {}", path.display())))?;
    debug!(
        rules = %rules.rules().iter().map(|rule| rule.name.as_str()).join(", "),
        "loaded rules"
    );
    Ok(rules)
}

fn grep(pattern: &Pattern, file: &gorules_lang::File) -> Vec<Report> {
    pattern
        .find_in_file(file)
        .into_iter()
        .filter_map(|data| {
            let pos = data.node.pos()?.0;
            let matched = data.node.to_string();
            Some(Report {
                rule: "grep".to_string(),
                line: pos.line,
                column: pos.column,
                message: matched.clone(),
                suggestion: None,
                matched,
            })
        })
        .collect()
}

fn format_finding(finding: &Finding, color: bool) -> String {
    let Finding { file, report } = finding;
    let location = format!("{}:{}:{}", file, report.line, report.column);

    let mut line = if color {
        format!("{}: {}: {}", location.bold(), report.rule.yellow(), report.message)
    } else {
        format!("{}: {}: {}", location, report.rule, report.message)
    };

    if let Some(suggestion) = &report.suggestion {
        if color {
            line.push_str(&format!("\n  {} {}", "suggestion:".green(), suggestion));
        } else {
            line.push_str(&format!("\n  suggestion: {}", suggestion));
        }
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn finding(suggestion: Option<&str>) -> Finding {
        Finding {
            file: "main.go".to_string(),
            report: Report {
                rule: "selfAssign".to_string(),
                line: 3,
                column: 2,
                message: "suspicious self-assignment of x".to_string(),
                suggestion: suggestion.map(str::to_string),
                matched: "x = x".to_string(),
            },
        }
    }

    #[rstest]
    #[case::plain(None, "main.go:3:2: selfAssign: suspicious self-assignment of x")]
    #[case::suggestion(
        Some("// x = x"),
        "main.go:3:2: selfAssign: suspicious self-assignment of x\n  suggestion: // x = x"
    )]
    fn test_format_finding(#[case] suggestion: Option<&str>, #[case] expected: &str) {
        assert_eq!(format_finding(&finding(suggestion), false), expected);
    }

    #[test]
    fn test_finding_json_is_flat() {
        let json = serde_json::to_value(finding(None)).unwrap();
        assert_eq!(json["file"], "main.go");
        assert_eq!(json["rule"], "selfAssign");
        assert_eq!(json["line"], 3);
        assert!(json.get("suggestion").is_none());
    }

    #[test]
    fn test_grep() {
        let pattern = Pattern::compile("$x = $x").unwrap();
        let file = gorules_lang::parse_file("package p\nfunc f() {\n\tv = v\n\tw = v\n}\n").unwrap();
        let reports = grep(&pattern, &file);
        assert_eq!(reports.len(), 1);
        assert_eq!((reports[0].line, reports[0].column), (3, 2));
        assert_eq!(reports[0].matched, "v = v");
    }

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from(["gorules", "check", "--rules", "rules.toml", "a.go", "b.go"]).unwrap();
        assert!(matches!(cli.commands, Commands::Check { ref files, .. } if files.len() == 2));
        assert!(Cli::try_parse_from(["gorules", "check", "--rules", "rules.toml"]).is_err());
    }
}
