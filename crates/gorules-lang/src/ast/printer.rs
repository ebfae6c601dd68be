use std::fmt::{self, Display, Formatter};

use itertools::Itertools;

use super::node::{
    ChanDir, Expr, ExprKind, Field, FuncDecl, FuncType, NodeRef, Stmt, StmtKind,
};

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Ident(name) => write!(f, "{}", name),
            ExprKind::Wildcard { name, any: false } => write!(f, "${}", name),
            ExprKind::Wildcard { name, any: true } => write!(f, "$*{}", name),
            ExprKind::BasicLit { value, .. } => write!(f, "{}", value),
            ExprKind::CompositeLit { ty, elts } => {
                if let Some(ty) = ty {
                    write!(f, "{}", ty)?;
                }
                write!(f, "{{{}}}", elts.iter().join(", "))
            }
            ExprKind::FuncLit { ty, body } => {
                write!(f, "func")?;
                fmt_signature(ty, f)?;
                write!(f, " {}", body)
            }
            ExprKind::Paren(x) => write!(f, "({})", x),
            ExprKind::Selector { x, sel } => write!(f, "{}.{}", x, sel),
            ExprKind::Index { x, index } => write!(f, "{}[{}]", x, index),
            ExprKind::Slice {
                x,
                low,
                high,
                max,
                slice3,
            } => {
                write!(f, "{}[", x)?;
                if let Some(low) = low {
                    write!(f, "{}", low)?;
                }
                write!(f, ":")?;
                if let Some(high) = high {
                    write!(f, "{}", high)?;
                }
                if *slice3 {
                    write!(f, ":")?;
                    if let Some(max) = max {
                        write!(f, "{}", max)?;
                    }
                }
                write!(f, "]")
            }
            ExprKind::TypeAssert { x, ty: Some(ty) } => write!(f, "{}.({})", x, ty),
            ExprKind::TypeAssert { x, ty: None } => write!(f, "{}.(type)", x),
            ExprKind::Call {
                fun,
                args,
                ellipsis,
            } => write!(
                f,
                "{}({}{})",
                fun,
                args.iter().join(", "),
                if *ellipsis { "..." } else { "" }
            ),
            ExprKind::Star(x) => write!(f, "*{}", x),
            ExprKind::Unary { op, x } => write!(f, "{}{}", op.as_str(), x),
            ExprKind::Binary { op, x, y } => write!(f, "{} {} {}", x, op.as_str(), y),
            ExprKind::KeyValue { key, value } => write!(f, "{}: {}", key, value),
            ExprKind::ArrayType { len: None, elem } => write!(f, "[]{}", elem),
            ExprKind::ArrayType {
                len: Some(len),
                elem,
            } => write!(f, "[{}]{}", len, elem),
            ExprKind::Ellipsis(None) => write!(f, "..."),
            ExprKind::Ellipsis(Some(elem)) => write!(f, "...{}", elem),
            ExprKind::MapType { key, value } => write!(f, "map[{}]{}", key, value),
            ExprKind::ChanType { dir, value } => match dir {
                ChanDir::Both => write!(f, "chan {}", value),
                ChanDir::Send => write!(f, "chan<- {}", value),
                ChanDir::Recv => write!(f, "<-chan {}", value),
            },
            ExprKind::FuncType(ty) => {
                write!(f, "func")?;
                fmt_signature(ty, f)
            }
            ExprKind::StructType(fields) => {
                write!(f, "struct{{{}}}", fields.iter().join("; "))
            }
            ExprKind::InterfaceType(methods) => {
                write!(f, "interface{{")?;
                for (i, method) in methods.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    match (&method.names[..], &method.ty.kind) {
                        ([name], ExprKind::FuncType(sig)) => {
                            write!(f, "{}", name)?;
                            fmt_signature(sig, f)?;
                        }
                        _ => write!(f, "{}", method)?,
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.names.is_empty() {
            write!(f, "{}", self.ty)
        } else {
            write!(f, "{} {}", self.names.iter().join(", "), self.ty)
        }
    }
}

fn fmt_signature(ty: &FuncType, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "({})", ty.params.iter().join(", "))?;
    match &ty.results[..] {
        [] => Ok(()),
        [result] if result.names.is_empty() => write!(f, " {}", result),
        results => write!(f, " ({})", results.iter().join(", ")),
    }
}

fn fmt_header(init: Option<&Stmt>, f: &mut Formatter<'_>) -> fmt::Result {
    if let Some(init) = init {
        write!(f, "{}; ", init)?;
    }
    Ok(())
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StmtKind::Expr(x) => write!(f, "{}", x),
            StmtKind::Send { chan, value } => write!(f, "{} <- {}", chan, value),
            StmtKind::IncDec { x, inc } => write!(f, "{}{}", x, if *inc { "++" } else { "--" }),
            StmtKind::Assign { lhs, op, rhs } => write!(
                f,
                "{} {} {}",
                lhs.iter().join(", "),
                op,
                rhs.iter().join(", ")
            ),
            StmtKind::Var { names, ty, values } => {
                write!(f, "var {}", names.iter().join(", "))?;
                if let Some(ty) = ty {
                    write!(f, " {}", ty)?;
                }
                if !values.is_empty() {
                    write!(f, " = {}", values.iter().join(", "))?;
                }
                Ok(())
            }
            StmtKind::Go(call) => write!(f, "go {}", call),
            StmtKind::Defer(call) => write!(f, "defer {}", call),
            StmtKind::Return(results) if results.is_empty() => write!(f, "return"),
            StmtKind::Return(results) => write!(f, "return {}", results.iter().join(", ")),
            StmtKind::Branch { kind, label } => match label {
                Some(label) => write!(f, "{} {}", kind.as_str(), label),
                None => write!(f, "{}", kind.as_str()),
            },
            StmtKind::Labeled { label, stmt } => write!(f, "{}: {}", label, stmt),
            StmtKind::Block(stmts) if stmts.is_empty() => write!(f, "{{}}"),
            StmtKind::Block(stmts) => write!(f, "{{ {} }}", stmts.iter().join("; ")),
            StmtKind::If {
                init,
                cond,
                body,
                els,
            } => {
                write!(f, "if ")?;
                fmt_header(init.as_deref(), f)?;
                write!(f, "{} {}", cond, body)?;
                if let Some(els) = els {
                    write!(f, " else {}", els)?;
                }
                Ok(())
            }
            StmtKind::Switch { init, tag, body } => {
                write!(f, "switch ")?;
                fmt_header(init.as_deref(), f)?;
                if let Some(tag) = tag {
                    write!(f, "{} ", tag)?;
                }
                write!(f, "{}", body)
            }
            StmtKind::TypeSwitch { init, assign, body } => {
                write!(f, "switch ")?;
                fmt_header(init.as_deref(), f)?;
                write!(f, "{} {}", assign, body)
            }
            StmtKind::Case { list, body } => {
                match list {
                    Some(list) => write!(f, "case {}:", list.iter().join(", "))?,
                    None => write!(f, "default:")?,
                }
                if !body.is_empty() {
                    write!(f, " {}", body.iter().join("; "))?;
                }
                Ok(())
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                write!(f, "for ")?;
                if init.is_some() || post.is_some() {
                    if let Some(init) = init {
                        write!(f, "{}", init)?;
                    }
                    write!(f, "; ")?;
                    if let Some(cond) = cond {
                        write!(f, "{}", cond)?;
                    }
                    write!(f, "; ")?;
                    if let Some(post) = post {
                        write!(f, "{} ", post)?;
                    }
                } else if let Some(cond) = cond {
                    write!(f, "{} ", cond)?;
                }
                write!(f, "{}", body)
            }
            StmtKind::Range {
                key,
                value,
                define,
                x,
                body,
            } => {
                write!(f, "for ")?;
                if let Some(key) = key {
                    write!(f, "{}", key)?;
                    if let Some(value) = value {
                        write!(f, ", {}", value)?;
                    }
                    write!(f, " {} ", if *define { ":=" } else { "=" })?;
                }
                write!(f, "range {} {}", x, body)
            }
            StmtKind::Empty => Ok(()),
        }
    }
}

impl Display for FuncDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "func ")?;
        if let Some(recv) = &self.recv {
            write!(f, "({}) ", recv)?;
        }
        write!(f, "{}", self.name)?;
        fmt_signature(&self.ty, f)?;
        if let Some(body) = &self.body {
            write!(f, " {}", body)?;
        }
        Ok(())
    }
}

impl Display for NodeRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Expr(expr) => write!(f, "{}", expr),
            NodeRef::Stmt(stmt) => write!(f, "{}", stmt),
            NodeRef::Field(field) => write!(f, "{}", field),
            NodeRef::ExprList(exprs) => write!(f, "{}", exprs.iter().join(", ")),
            NodeRef::StmtList(stmts) => write!(f, "{}", stmts.iter().join("; ")),
            NodeRef::FieldList(fields) => write!(f, "{}", fields.iter().join(", ")),
        }
    }
}
