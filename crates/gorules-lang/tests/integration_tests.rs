use std::sync::Arc;

use gorules_lang::quasigo::{Env, EvalEnv, Signature, Type, Value, compile_package, eval};
use gorules_lang::{NodeRef, Pattern, parse_exprs, parse_file, parse_funcs, parse_stmts};
use rstest::rstest;

#[rstest]
#[case::eql("==")]
#[case::neq("!=")]
#[case::lss("<")]
#[case::gtr(">")]
#[case::leq("<=")]
#[case::geq(">=")]
#[case::or("|")]
#[case::and("&")]
#[case::xor("^")]
#[case::and_not("&^")]
#[case::rem("%")]
#[case::quo("/")]
#[case::sub("-")]
#[case::land("&&")]
#[case::lor("||")]
fn test_repeated_wildcard(#[case] op: &str) {
    let pattern = Pattern::compile(&format!("$x {op} $x")).unwrap();

    let same = parse_exprs(&format!("a {op} a"), false).unwrap();
    let data = pattern.match_node(NodeRef::Expr(&same[0])).unwrap();
    assert_eq!(data.get("x").map(|node| node.to_string()), Some("a".to_string()));

    let different = parse_exprs(&format!("a {op} b"), false).unwrap();
    assert!(pattern.match_node(NodeRef::Expr(&different[0])).is_none());
}

#[rstest]
#[case::alone("f(x)", true)]
#[case::last("f(1, x)", true)]
#[case::first("f(x, 1)", true)]
#[case::middle("f(1, x, 2)", true)]
#[case::missing("f(1, 2)", false)]
#[case::no_args("f()", false)]
fn test_variadic_arguments(#[case] code: &str, #[case] expected: bool) {
    let pattern = Pattern::compile("f($*_, x, $*_)").unwrap();
    let exprs = parse_exprs(code, false).unwrap();
    assert_eq!(pattern.match_node(NodeRef::Expr(&exprs[0])).is_some(), expected);
}

#[rstest]
#[case::once("a; b; c; d", vec![1..3])]
#[case::overlapping("b; b; c; c", vec![1..3])]
#[case::twice("b; c; b; c", vec![0..2, 2..4])]
#[case::none("a; b; d", vec![])]
fn test_list_windows(#[case] code: &str, #[case] expected: Vec<std::ops::Range<usize>>) {
    let pattern = Pattern::compile("b; c").unwrap();
    let stmts = parse_stmts(code, false).unwrap();
    let windows = pattern
        .matches(NodeRef::StmtList(&stmts))
        .map(|data| data.window.unwrap())
        .collect::<Vec<_>>();
    assert_eq!(windows, expected);
}

#[test]
fn test_formatting_does_not_affect_equality() {
    let pattern = Pattern::compile("$x = $x").unwrap();
    let stmts = parse_stmts("m[ k+1 ] = m[k + 1]", false).unwrap();
    assert!(pattern.match_node(NodeRef::Stmt(&stmts[0])).is_some());
}

#[test]
fn test_find_in_file() {
    let file = parse_file(
        r#"package main

import "fmt"

func main() {
	if err != nil {
		return err
	}
	fmt.Println(err)
	go func() {
		if err != nil {
			return err
		}
	}()
}
"#,
    )
    .unwrap();
    let pattern = Pattern::compile("if $e != nil { return $e }").unwrap();
    let lines = pattern
        .find_in_file(&file)
        .iter()
        .map(|data| data.node.pos().unwrap().0.line)
        .collect::<Vec<_>>();
    assert_eq!(lines, vec![6, 11]);
}

fn run_filter(env: Env, src: &str, args: &[Value]) -> Value {
    let mut env = env;
    let decls = parse_funcs(src).unwrap();
    let ids = compile_package(&mut env, "main", &decls).unwrap();
    let env = Arc::new(env);
    let func = Arc::clone(env.func(ids[0]).unwrap());
    eval(&mut EvalEnv::new(env), &func, args)
}

#[rstest]
#[case(10, true)]
#[case(2, true)]
#[case(3, false)]
fn test_quasigo_or(#[case] i: i64, #[case] expected: bool) {
    assert_eq!(
        run_filter(Env::new(), "func f(i int) bool { return i == 10 || i == 2 }", &[Value::Int(i)]),
        Value::Bool(expected)
    );
}

#[test]
fn test_quasigo_short_circuit_is_observable() {
    let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let mut env = Env::new();
    let seen = Arc::clone(&calls);
    env.add_native_func("log", "Hit", Signature::new([Type::Int], [Type::Bool]), move |stack| {
        stack.pop();
        seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        stack.push(true);
    });

    let src = "func f(i int) bool { return i == 10 || log.Hit(i) }";
    assert_eq!(run_filter(env.clone(), src, &[Value::Int(10)]), Value::Bool(true));
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(run_filter(env, src, &[Value::Int(3)]), Value::Bool(true));
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[rstest]
#[case::switch(
    "func f(x int) bool { switch x { case 1: return true }; return false }",
    "switch"
)]
#[case::param("func f(limit int) bool { limit = 2; return true }", "limit")]
fn test_quasigo_errors_name_the_construct(#[case] src: &str, #[case] needle: &str) {
    let decls = parse_funcs(src).unwrap();
    let err = compile_package(&mut Env::new(), "main", &decls).unwrap_err();
    assert!(err.to_string().contains(needle), "{err}");
}

#[test]
fn test_rules_end_to_end() {
    let rules = gorules_lang::load_rules(
        r#"
[[rules]]
name = "errorfNoArgs"
patterns = ["fmt.Errorf($s)"]
report = "use errors.New($s)"
suggest = "errors.New($s)"
filter = """
func f(s *Var) bool { return s.Const() && !strings.Contains(s.Text(), "%") }
"""
"#,
    )
    .unwrap();

    let reports = rules
        .run_source(
            r#"package p

func f(name string) error {
	if name == "" {
		return fmt.Errorf("empty name")
	}
	return fmt.Errorf("bad %s")
}
"#,
        )
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].line, 5);
    assert_eq!(reports[0].message, r#"use errors.New("empty name")"#);
    assert_eq!(reports[0].suggestion.as_deref(), Some(r#"errors.New("empty name")"#));
}
