use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;

use crate::ast::node::{Expr, ExprKind};

/// Static type of a quasigo expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Int,
    String,
    Error,
    /// The type of the untyped `nil` literal.
    Nil,
    /// Any other type, kept opaque: `*Var`, `types.Type`, `interface{}`.
    Named(SmolStr),
}

impl Type {
    pub fn named(name: &str) -> Self {
        Type::Named(SmolStr::new(name))
    }

    /// Parses a type expression of a function signature.
    ///
    /// Returns `None` for types that cannot be represented, such as slices
    /// or maps.
    pub fn from_expr(expr: &Expr) -> Option<Self> {
        match &expr.kind {
            ExprKind::Ident(name) => Some(match name.as_str() {
                "bool" => Type::Bool,
                "int" => Type::Int,
                "string" => Type::String,
                "error" => Type::Error,
                _ => Type::Named(name.clone()),
            }),
            ExprKind::Star(_) | ExprKind::Selector { .. } => {
                opaque_name(expr).map(|name| Type::Named(SmolStr::from(name)))
            }
            ExprKind::InterfaceType(methods) if methods.is_empty() => {
                Some(Type::named("interface{}"))
            }
            _ => None,
        }
    }

    /// Whether values of this type can be compared with `nil`.
    pub fn is_nillable(&self) -> bool {
        matches!(self, Type::Error | Type::Named(_) | Type::Nil)
    }

    /// Whether a value of type `self` can be used where `target` is expected.
    pub fn is_assignable_to(&self, target: &Type) -> bool {
        self == target || (*self == Type::Nil && target.is_nillable() && *target != Type::Nil)
    }
}

fn opaque_name(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Ident(name) => Some(name.to_string()),
        ExprKind::Star(x) => opaque_name(x).map(|name| format!("*{}", name)),
        ExprKind::Selector { x, sel } => match (&x.kind, &sel.kind) {
            (ExprKind::Ident(pkg), ExprKind::Ident(name)) => Some(format!("{}.{}", pkg, name)),
            _ => None,
        },
        _ => None,
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::String => write!(f, "string"),
            Type::Error => write!(f, "error"),
            Type::Nil => write!(f, "untyped nil"),
            Type::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Parameter and result types of a function.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
}

impl Signature {
    pub fn new(params: impl Into<Vec<Type>>, results: impl Into<Vec<Type>>) -> Self {
        Self {
            params: params.into(),
            results: results.into(),
        }
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let join = |types: &[Type]| {
            types
                .iter()
                .map(|ty| ty.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "func({})", join(&self.params))?;
        match &self.results[..] {
            [] => Ok(()),
            [result] => write!(f, " {}", result),
            results => write!(f, " ({})", join(results)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_exprs;
    use rstest::rstest;

    fn parse_type(code: &str) -> Option<Type> {
        let exprs = parse_exprs(&format!("func(x {})", code), false).unwrap();
        match &exprs[0].kind {
            ExprKind::FuncType(ty) => Type::from_expr(&ty.params[0].ty),
            _ => panic!("not a func type"),
        }
    }

    #[rstest]
    #[case("bool", Some(Type::Bool))]
    #[case("int", Some(Type::Int))]
    #[case("string", Some(Type::String))]
    #[case("error", Some(Type::Error))]
    #[case("*Var", Some(Type::named("*Var")))]
    #[case("types.Type", Some(Type::named("types.Type")))]
    #[case("*ast.CallExpr", Some(Type::named("*ast.CallExpr")))]
    #[case("interface{}", Some(Type::named("interface{}")))]
    #[case("[]int", None)]
    #[case("map[string]int", None)]
    fn test_from_expr(#[case] code: &str, #[case] expected: Option<Type>) {
        assert_eq!(parse_type(code), expected);
    }

    #[test]
    fn test_assignable() {
        assert!(Type::Nil.is_assignable_to(&Type::Error));
        assert!(Type::Nil.is_assignable_to(&Type::named("*Var")));
        assert!(!Type::Nil.is_assignable_to(&Type::Int));
        assert!(!Type::Int.is_assignable_to(&Type::String));
    }

    #[test]
    fn test_signature_display() {
        let sig = Signature::new([Type::String], [Type::Int, Type::Error]);
        assert_eq!(sig.to_string(), "func(string) (int, error)");
    }
}
