//! Facts about captured nodes, exposed to filters as `*Var` methods, and
//! the standard library natives filters may call.
use crate::ast::node::{Expr, ExprKind, NodeRef, UnaryOp};
use crate::quasigo::{Env, Signature, Type, Value};

/// Type name filter parameters are declared with.
pub const VAR_TYPE: &str = "*Var";

/// A snapshot of a captured node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Var {
    pub text: String,
    pub kind: &'static str,
    pub line: u32,
    pub len: usize,
    pub is_list: bool,
    pub pure: bool,
    pub constant: bool,
}

impl Var {
    pub fn new(node: NodeRef<'_>) -> Self {
        let (pure, constant) = match node {
            NodeRef::Expr(expr) => (is_pure(expr), is_const(expr)),
            NodeRef::ExprList(exprs) => (
                exprs.iter().all(is_pure),
                !exprs.is_empty() && exprs.iter().all(is_const),
            ),
            _ => (false, false),
        };

        Self {
            text: node.to_string(),
            kind: node.kind_name(),
            line: node.pos().map_or(0, |pos| pos.0.line),
            len: node.len(),
            is_list: node.is_list(),
            pure,
            constant,
        }
    }
}

/// Whether evaluating `expr` has no side effects.
pub fn is_pure(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Ident(_) | ExprKind::BasicLit { .. } | ExprKind::FuncLit { .. } => true,
        ExprKind::Paren(x) | ExprKind::Star(x) | ExprKind::Selector { x, .. } => is_pure(x),
        ExprKind::TypeAssert { x, .. } => is_pure(x),
        ExprKind::Unary { op, x } => *op != UnaryOp::Recv && is_pure(x),
        ExprKind::Binary { x, y, .. } => is_pure(x) && is_pure(y),
        ExprKind::Index { x, index } => is_pure(x) && is_pure(index),
        ExprKind::Slice {
            x, low, high, max, ..
        } => {
            is_pure(x)
                && [low, high, max]
                    .into_iter()
                    .all(|part| part.as_deref().is_none_or(is_pure))
        }
        ExprKind::CompositeLit { elts, .. } => elts.iter().all(is_pure),
        ExprKind::KeyValue { key, value } => is_pure(key) && is_pure(value),
        ExprKind::Call { .. } | ExprKind::Wildcard { .. } => false,
        ExprKind::ArrayType { .. }
        | ExprKind::Ellipsis(_)
        | ExprKind::MapType { .. }
        | ExprKind::ChanType { .. }
        | ExprKind::FuncType(_)
        | ExprKind::StructType(_)
        | ExprKind::InterfaceType(_) => true,
    }
}

/// Whether `expr` is built only from literals and constant operators.
pub fn is_const(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::BasicLit { .. } => true,
        ExprKind::Ident(name) => name == "true" || name == "false",
        ExprKind::Paren(x) => is_const(x),
        ExprKind::Unary { op, x } => {
            matches!(op, UnaryOp::Plus | UnaryOp::Neg | UnaryOp::Not | UnaryOp::Xor) && is_const(x)
        }
        ExprKind::Binary { x, y, .. } => is_const(x) && is_const(y),
        _ => false,
    }
}

fn add_var_method<T, F>(env: &mut Env, name: &str, result: Type, get: F)
where
    T: Into<Value>,
    F: Fn(&Var) -> T + Send + Sync + 'static,
{
    env.add_native_method(VAR_TYPE, name, Signature::new(Vec::new(), [result]), move |stack| {
        let value: Value = stack
            .pop()
            .downcast_ref::<Var>()
            .map(|var| get(var).into())
            .unwrap_or_default();
        stack.push(value);
    });
}

fn add_string_predicate(env: &mut Env, name: &str, predicate: fn(&str, &str) -> bool) {
    env.add_native_func(
        "strings",
        name,
        Signature::new([Type::String, Type::String], [Type::Bool]),
        move |stack| {
            let y = stack.pop_str();
            let x = stack.pop_str();
            stack.push(predicate(&x, &y));
        },
    );
}

fn add_string_mapping(env: &mut Env, name: &str, mapping: fn(&str) -> String) {
    env.add_native_func(
        "strings",
        name,
        Signature::new([Type::String], [Type::String]),
        move |stack| {
            let s = stack.pop_str();
            stack.push(mapping(&s));
        },
    );
}

/// Registers the `*Var` methods and the `strings` / `strconv` natives.
pub fn register(env: &mut Env) {
    add_var_method(env, "Text", Type::String, |var| var.text.clone());
    add_var_method(env, "Kind", Type::String, |var| var.kind);
    add_var_method(env, "Pure", Type::Bool, |var| var.pure);
    add_var_method(env, "Const", Type::Bool, |var| var.constant);
    add_var_method(env, "Line", Type::Int, |var| i64::from(var.line));
    add_var_method(env, "Len", Type::Int, |var| var.len);
    add_var_method(env, "IsList", Type::Bool, |var| var.is_list);

    add_string_predicate(env, "HasPrefix", |s, prefix| s.starts_with(prefix));
    add_string_predicate(env, "HasSuffix", |s, suffix| s.ends_with(suffix));
    add_string_predicate(env, "Contains", |s, sub| s.contains(sub));
    add_string_mapping(env, "ToLower", str::to_lowercase);
    add_string_mapping(env, "ToUpper", str::to_uppercase);
    add_string_mapping(env, "TrimSpace", |s| s.trim().to_string());

    env.add_native_func(
        "strings",
        "Index",
        Signature::new([Type::String, Type::String], [Type::Int]),
        |stack| {
            let sub = stack.pop_str();
            let s = stack.pop_str();
            stack.push(s.find(sub.as_str()).map_or(-1, |at| i64::try_from(at).unwrap_or(-1)));
        },
    );

    env.add_native_func(
        "strconv",
        "Atoi",
        Signature::new([Type::String], [Type::Int, Type::Error]),
        |stack| {
            let s = stack.pop_str();
            match s.parse::<i64>() {
                Ok(n) => {
                    stack.push(n);
                    stack.push(Value::Nil);
                }
                Err(err) => {
                    stack.push(0i64);
                    stack.push(format!("strconv.Atoi: parsing {:?}: {}", s.as_str(), err));
                }
            }
        },
    );
}
