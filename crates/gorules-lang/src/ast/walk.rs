use super::node::{Expr, ExprKind, Field, File, FuncType, NodeRef, Stmt, StmtKind};

/// Visits every function body of `file` in source order.
pub fn walk_file<'a, F>(file: &'a File, visit: &mut F)
where
    F: FnMut(NodeRef<'a>),
{
    for func in &file.funcs {
        if let Some(recv) = &func.recv {
            walk_field(recv, visit);
        }
        walk_func_type(&func.ty, visit);
        if let Some(body) = &func.body {
            walk_stmt(body, visit);
        }
    }
}

/// Pre-order traversal: a node is visited before its children, and a
/// non-empty list is visited before its elements.
pub fn walk<'a, F>(node: NodeRef<'a>, visit: &mut F)
where
    F: FnMut(NodeRef<'a>),
{
    match node {
        NodeRef::Expr(expr) => walk_expr(expr, visit),
        NodeRef::Stmt(stmt) => walk_stmt(stmt, visit),
        NodeRef::Field(field) => walk_field(field, visit),
        NodeRef::ExprList(exprs) => walk_exprs(exprs, visit),
        NodeRef::StmtList(stmts) => walk_stmts(stmts, visit),
        NodeRef::FieldList(fields) => walk_fields(fields, visit),
    }
}

fn walk_exprs<'a, F>(exprs: &'a [Expr], visit: &mut F)
where
    F: FnMut(NodeRef<'a>),
{
    if !exprs.is_empty() {
        visit(NodeRef::ExprList(exprs));
    }
    for expr in exprs {
        walk_expr(expr, visit);
    }
}

fn walk_stmts<'a, F>(stmts: &'a [Stmt], visit: &mut F)
where
    F: FnMut(NodeRef<'a>),
{
    if !stmts.is_empty() {
        visit(NodeRef::StmtList(stmts));
    }
    for stmt in stmts {
        walk_stmt(stmt, visit);
    }
}

fn walk_fields<'a, F>(fields: &'a [Field], visit: &mut F)
where
    F: FnMut(NodeRef<'a>),
{
    if !fields.is_empty() {
        visit(NodeRef::FieldList(fields));
    }
    for field in fields {
        walk_field(field, visit);
    }
}

fn walk_field<'a, F>(field: &'a Field, visit: &mut F)
where
    F: FnMut(NodeRef<'a>),
{
    visit(NodeRef::Field(field));
    for name in &field.names {
        walk_expr(name, visit);
    }
    walk_expr(&field.ty, visit);
}

fn walk_func_type<'a, F>(ty: &'a FuncType, visit: &mut F)
where
    F: FnMut(NodeRef<'a>),
{
    walk_fields(&ty.params, visit);
    walk_fields(&ty.results, visit);
}

fn walk_opt_expr<'a, F>(expr: Option<&'a Expr>, visit: &mut F)
where
    F: FnMut(NodeRef<'a>),
{
    if let Some(expr) = expr {
        walk_expr(expr, visit);
    }
}

fn walk_opt_stmt<'a, F>(stmt: Option<&'a Stmt>, visit: &mut F)
where
    F: FnMut(NodeRef<'a>),
{
    if let Some(stmt) = stmt {
        walk_stmt(stmt, visit);
    }
}

fn walk_expr<'a, F>(expr: &'a Expr, visit: &mut F)
where
    F: FnMut(NodeRef<'a>),
{
    visit(NodeRef::Expr(expr));

    match &expr.kind {
        ExprKind::Ident(_) | ExprKind::Wildcard { .. } | ExprKind::BasicLit { .. } => {}
        ExprKind::CompositeLit { ty, elts } => {
            walk_opt_expr(ty.as_deref(), visit);
            walk_exprs(elts, visit);
        }
        ExprKind::FuncLit { ty, body } => {
            walk_func_type(ty, visit);
            walk_stmt(body, visit);
        }
        ExprKind::Paren(x) | ExprKind::Star(x) | ExprKind::Unary { x, .. } => {
            walk_expr(x, visit)
        }
        ExprKind::Selector { x, sel } => {
            walk_expr(x, visit);
            walk_expr(sel, visit);
        }
        ExprKind::Index { x, index } => {
            walk_expr(x, visit);
            walk_expr(index, visit);
        }
        ExprKind::Slice {
            x, low, high, max, ..
        } => {
            walk_expr(x, visit);
            walk_opt_expr(low.as_deref(), visit);
            walk_opt_expr(high.as_deref(), visit);
            walk_opt_expr(max.as_deref(), visit);
        }
        ExprKind::TypeAssert { x, ty } => {
            walk_expr(x, visit);
            walk_opt_expr(ty.as_deref(), visit);
        }
        ExprKind::Call { fun, args, .. } => {
            walk_expr(fun, visit);
            walk_exprs(args, visit);
        }
        ExprKind::Binary { x, y, .. } => {
            walk_expr(x, visit);
            walk_expr(y, visit);
        }
        ExprKind::KeyValue { key, value } | ExprKind::MapType { key, value } => {
            walk_expr(key, visit);
            walk_expr(value, visit);
        }
        ExprKind::ArrayType { len, elem } => {
            walk_opt_expr(len.as_deref(), visit);
            walk_expr(elem, visit);
        }
        ExprKind::Ellipsis(elem) => walk_opt_expr(elem.as_deref(), visit),
        ExprKind::ChanType { value, .. } => walk_expr(value, visit),
        ExprKind::FuncType(ty) => walk_func_type(ty, visit),
        ExprKind::StructType(fields) | ExprKind::InterfaceType(fields) => {
            walk_fields(fields, visit)
        }
    }
}

fn walk_stmt<'a, F>(stmt: &'a Stmt, visit: &mut F)
where
    F: FnMut(NodeRef<'a>),
{
    visit(NodeRef::Stmt(stmt));

    match &stmt.kind {
        StmtKind::Expr(x)
        | StmtKind::IncDec { x, .. }
        | StmtKind::Go(x)
        | StmtKind::Defer(x) => walk_expr(x, visit),
        StmtKind::Send { chan, value } => {
            walk_expr(chan, visit);
            walk_expr(value, visit);
        }
        StmtKind::Assign { lhs, rhs, .. } => {
            walk_exprs(lhs, visit);
            walk_exprs(rhs, visit);
        }
        StmtKind::Var { names, ty, values } => {
            walk_exprs(names, visit);
            walk_opt_expr(ty.as_ref(), visit);
            walk_exprs(values, visit);
        }
        StmtKind::Return(results) => walk_exprs(results, visit),
        StmtKind::Branch { .. } | StmtKind::Empty => {}
        StmtKind::Labeled { stmt, .. } => walk_stmt(stmt, visit),
        StmtKind::Block(stmts) => walk_stmts(stmts, visit),
        StmtKind::If {
            init,
            cond,
            body,
            els,
        } => {
            walk_opt_stmt(init.as_deref(), visit);
            walk_expr(cond, visit);
            walk_stmt(body, visit);
            walk_opt_stmt(els.as_deref(), visit);
        }
        StmtKind::Switch { init, tag, body } => {
            walk_opt_stmt(init.as_deref(), visit);
            walk_opt_expr(tag.as_ref(), visit);
            walk_stmt(body, visit);
        }
        StmtKind::TypeSwitch { init, assign, body } => {
            walk_opt_stmt(init.as_deref(), visit);
            walk_stmt(assign, visit);
            walk_stmt(body, visit);
        }
        StmtKind::Case { list, body } => {
            if let Some(list) = list {
                walk_exprs(list, visit);
            }
            walk_stmts(body, visit);
        }
        StmtKind::For {
            init,
            cond,
            post,
            body,
        } => {
            walk_opt_stmt(init.as_deref(), visit);
            walk_opt_expr(cond.as_ref(), visit);
            walk_opt_stmt(post.as_deref(), visit);
            walk_stmt(body, visit);
        }
        StmtKind::Range {
            key,
            value,
            x,
            body,
            ..
        } => {
            walk_opt_expr(key.as_ref(), visit);
            walk_opt_expr(value.as_ref(), visit);
            walk_expr(x, visit);
            walk_stmt(body, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_file;

    #[test]
    fn test_walk_visits_lists_before_elements() {
        let file = parse_file("package p\nfunc f() {\n\ta()\n\tb(1, 2)\n}\n").unwrap();
        let mut kinds = Vec::new();
        walk_file(&file, &mut |node: NodeRef<'_>| kinds.push(node.kind_name()));

        assert_eq!(
            kinds,
            vec![
                "BlockStmt",
                "StmtList",
                "ExprStmt",
                "CallExpr",
                "Ident",
                "ExprStmt",
                "CallExpr",
                "Ident",
                "ExprList",
                "BasicLit",
                "BasicLit",
            ]
        );
    }

    #[test]
    fn test_walk_visits_nested_blocks() {
        let file =
            parse_file("package p\nfunc f() {\n\tif x {\n\t\tfor {\n\t\t\ty++\n\t\t}\n\t}\n}\n")
                .unwrap();
        let mut count = 0;
        walk_file(&file, &mut |node: NodeRef<'_>| {
            if matches!(node, NodeRef::Stmt(Stmt { kind: StmtKind::IncDec { .. }, .. })) {
                count += 1;
            }
        });
        assert_eq!(count, 1);
    }
}
