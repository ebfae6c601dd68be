use assert_cmd::cargo;
use rstest::rstest;
use scopeguard::defer;
use std::io::Write;
use std::{fs::File, path::PathBuf};

const RULES: &str = r#"
[[rules]]
name = "selfAssign"
patterns = ["$x = $x"]
report = "suspicious self-assignment of $x"
filter = "func f(x *Var) bool { return x.Pure() }"

[[rules]]
name = "errorfNoArgs"
patterns = ["fmt.Errorf($s)"]
report = "use errors.New($s)"
suggest = "errors.New($s)"
filter = """
func f(s *Var) bool {
	return s.Const() && !strings.Contains(s.Text(), "%")
}
"""
"#;

const CODE: &str = r#"package main

func run(v int) error {
	v = v
	return fmt.Errorf("failed")
}
"#;

pub fn create_file(name: &str, content: &str) -> (PathBuf, PathBuf) {
    let temp_dir = std::env::temp_dir();
    let temp_file_path = temp_dir.join(name);
    let mut file = File::create(&temp_file_path).expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");

    (temp_dir, temp_file_path)
}

#[test]
fn test_check_reports_findings() -> Result<(), Box<dyn std::error::Error>> {
    let (_, rules) = create_file("gorules_check_rules.toml", RULES);
    let (_, code) = create_file("gorules_check_main.go", CODE);
    defer! {
        std::fs::remove_file(&rules).ok();
        std::fs::remove_file(&code).ok();
    }

    let mut cmd = cargo::cargo_bin_cmd!("gorules");
    let assert = cmd
        .arg("check")
        .arg("--rules")
        .arg(rules.to_string_lossy().to_string())
        .arg(code.to_string_lossy().to_string())
        .assert();
    assert.failure().code(1).stdout(format!(
        "{file}:4:2: selfAssign: suspicious self-assignment of v\n\
         {file}:5:9: errorfNoArgs: use errors.New(\"failed\")\n  suggestion: errors.New(\"failed\")\n",
        file = code.display()
    ));

    Ok(())
}

#[test]
fn test_check_without_findings_succeeds() -> Result<(), Box<dyn std::error::Error>> {
    let (_, rules) = create_file("gorules_clean_rules.toml", RULES);
    let (_, code) = create_file("gorules_clean_main.go", "package main\n\nfunc run(v int) int {\n\treturn v\n}\n");
    defer! {
        std::fs::remove_file(&rules).ok();
        std::fs::remove_file(&code).ok();
    }

    let mut cmd = cargo::cargo_bin_cmd!("gorules");
    let assert = cmd
        .arg("check")
        .arg("--rules")
        .arg(rules.to_string_lossy().to_string())
        .arg(code.to_string_lossy().to_string())
        .assert();
    assert.success().code(0).stdout("");

    Ok(())
}

#[test]
fn test_check_json() -> Result<(), Box<dyn std::error::Error>> {
    let (_, rules) = create_file("gorules_json_rules.toml", RULES);
    let (_, code) = create_file("gorules_json_main.go", CODE);
    defer! {
        std::fs::remove_file(&rules).ok();
        std::fs::remove_file(&code).ok();
    }

    let mut cmd = cargo::cargo_bin_cmd!("gorules");
    let output = cmd
        .arg("--format")
        .arg("json")
        .arg("check")
        .arg("--rules")
        .arg(rules.to_string_lossy().to_string())
        .arg(code.to_string_lossy().to_string())
        .output()?;

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains(r#""rule": "selfAssign""#), "{stdout}");
    assert!(stdout.contains(r#""matched": "v = v""#), "{stdout}");
    assert!(stdout.contains(r#""suggestion": "errors.New(\"failed\")""#), "{stdout}");

    Ok(())
}

#[rstest]
#[case::self_assign("self_assign", "$x = $x", "4:2: grep: v = v\n")]
#[case::call("call", "fmt.Errorf($*_)", "5:9: grep: fmt.Errorf(\"failed\")\n")]
#[case::none("none", "$x + $x", "")]
fn test_grep(
    #[case] name: &str,
    #[case] pattern: &str,
    #[case] expected: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_, code) = create_file(&format!("gorules_grep_{}.go", name), CODE);
    defer! {
        std::fs::remove_file(&code).ok();
    }

    let mut cmd = cargo::cargo_bin_cmd!("gorules");
    let assert = cmd
        .arg("grep")
        .arg(pattern)
        .arg(code.to_string_lossy().to_string())
        .assert();

    let expected = expected
        .lines()
        .map(|line| format!("{}:{}\n", code.display(), line))
        .collect::<String>();
    assert.success().code(0).stdout(expected);

    Ok(())
}

#[test]
fn test_disasm() -> Result<(), Box<dyn std::error::Error>> {
    let (_, rules) = create_file("gorules_disasm_rules.toml", RULES);
    defer! {
        std::fs::remove_file(&rules).ok();
    }

    let mut cmd = cargo::cargo_bin_cmd!("gorules");
    let output = cmd
        .arg("disasm")
        .arg("--rules")
        .arg(rules.to_string_lossy().to_string())
        .output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("selfAssign.f"), "{stdout}");
    assert!(stdout.contains("CallNative (*Var).Pure"), "{stdout}");
    assert!(stdout.contains("errorfNoArgs.f"), "{stdout}");

    Ok(())
}

#[rstest]
#[case::invalid_pattern(
    "invalid_pattern",
    "[[rules]]\nname = \"a\"\npatterns = [\"f(\"]\nreport = \"\"\n",
    "invalid pattern"
)]
#[case::invalid_filter(
    "invalid_filter",
    "[[rules]]\nname = \"a\"\npatterns = [\"$x\"]\nreport = \"\"\nfilter = \"func f(x *Var) bool { switch x { case nil: return false }; return true }\"\n",
    "switch"
)]
#[case::unknown_key(
    "unknown_key",
    "[[rules]]\nname = \"a\"\npatterns = [\"$x\"]\nreport = \"\"\nlevel = 1\n",
    "level"
)]
fn test_invalid_rules(
    #[case] name: &str,
    #[case] rules: &str,
    #[case] expected: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_, rules) = create_file(&format!("gorules_invalid_{}.toml", name), rules);
    let (_, code) = create_file(&format!("gorules_invalid_{}.go", name), CODE);
    defer! {
        std::fs::remove_file(&rules).ok();
        std::fs::remove_file(&code).ok();
    }

    let mut cmd = cargo::cargo_bin_cmd!("gorules");
    let output = cmd
        .arg("check")
        .arg("--rules")
        .arg(rules.to_string_lossy().to_string())
        .arg(code.to_string_lossy().to_string())
        .output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains(expected), "{stderr}");

    Ok(())
}

#[test]
fn test_missing_file() {
    let mut cmd = cargo::cargo_bin_cmd!("gorules");
    let assert = cmd.arg("grep").arg("$x").arg("/nonexistent/gorules.go").assert();
    assert.failure();
}
