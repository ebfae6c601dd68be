//! Property-based tests for pattern compilation, matching and filters.
use std::sync::Arc;

use gorules_lang::quasigo::{Env, EvalEnv, Value, compile_package, eval};
use gorules_lang::{NodeRef, Pattern, parse_exprs, parse_funcs};
use proptest::prelude::*;

mod strategies {
    use super::*;

    /// Generates Go identifiers that are not keywords.
    pub fn ident() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,6}".prop_filter("Avoid reserved keywords", |s| {
            !matches!(
                s.as_str(),
                "break"
                    | "case"
                    | "chan"
                    | "const"
                    | "continue"
                    | "default"
                    | "defer"
                    | "else"
                    | "fallthrough"
                    | "for"
                    | "func"
                    | "go"
                    | "goto"
                    | "if"
                    | "import"
                    | "interface"
                    | "map"
                    | "package"
                    | "range"
                    | "return"
                    | "select"
                    | "struct"
                    | "switch"
                    | "type"
                    | "var"
            )
        })
    }

    pub fn binary_op() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("+"),
            Just("-"),
            Just("*"),
            Just("=="),
            Just("<"),
            Just("&&"),
            Just("||"),
        ]
    }

    /// Generates source text of Go expressions.
    pub fn expr() -> impl Strategy<Value = String> {
        let leaf = prop_oneof![ident(), (0u32..1000).prop_map(|n| n.to_string())];
        leaf.prop_recursive(4, 24, 3, |inner| {
            prop_oneof![
                (inner.clone(), binary_op(), inner.clone())
                    .prop_map(|(x, op, y)| format!("({x} {op} {y})")),
                (ident(), prop::collection::vec(inner.clone(), 0..3))
                    .prop_map(|(fun, args)| format!("{fun}({})", args.join(", "))),
                (ident(), ident()).prop_map(|(x, sel)| format!("{x}.{sel}")),
                inner.prop_map(|x| format!("!{x}")),
            ]
        })
    }
}

proptest! {
    #[test]
    fn test_compile_is_deterministic(src in strategies::expr()) {
        let first = Pattern::compile(&src).unwrap();
        let second = Pattern::compile(&src).unwrap();
        prop_assert_eq!(first.program(), second.program());
    }

    #[test]
    fn test_expression_matches_itself(src in strategies::expr()) {
        let pattern = Pattern::compile(&src).unwrap();
        let exprs = parse_exprs(&src, false).unwrap();
        prop_assert!(pattern.match_node(NodeRef::Expr(&exprs[0])).is_some());
    }

    #[test]
    fn test_repeated_wildcard_binds_operand(src in strategies::expr()) {
        let pattern = Pattern::compile("$x + $x").unwrap();
        let code = format!("({src}) + ({src})");
        let exprs = parse_exprs(&code, false).unwrap();

        let first = pattern.match_node(NodeRef::Expr(&exprs[0])).map(|data| data.get("x").map(|node| node.to_string()));
        let second = pattern.match_node(NodeRef::Expr(&exprs[0])).map(|data| data.get("x").map(|node| node.to_string()));
        prop_assert!(first.is_some());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_printed_expression_parses_back(src in strategies::expr()) {
        let exprs = parse_exprs(&src, false).unwrap();
        let printed = exprs[0].to_string();
        let reparsed = parse_exprs(&printed, false).unwrap();
        prop_assert_eq!(&exprs[0], &reparsed[0]);
    }

    #[test]
    fn test_int_arithmetic_wraps(a in any::<i64>(), b in any::<i64>()) {
        let mut env = Env::new();
        let decls = parse_funcs("func f(a int, b int) int { return a*2 - b }").unwrap();
        let ids = compile_package(&mut env, "main", &decls).unwrap();
        let env = Arc::new(env);
        let func = Arc::clone(env.func(ids[0]).unwrap());

        let result = eval(&mut EvalEnv::new(env), &func, &[Value::Int(a), Value::Int(b)]);
        prop_assert_eq!(result, Value::Int(a.wrapping_mul(2).wrapping_sub(b)));
    }
}
