use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;

use crate::range::Pos;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    Xor,
    Addr,
    Recv,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Xor => "^",
            UnaryOp::Addr => "&",
            UnaryOp::Recv => "<-",
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
    LAnd,
    LOr,
    Eql,
    Neq,
    Lss,
    Gtr,
    Leq,
    Geq,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Quo => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::AndNot => "&^",
            BinaryOp::LAnd => "&&",
            BinaryOp::LOr => "||",
            BinaryOp::Eql => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Lss => "<",
            BinaryOp::Gtr => ">",
            BinaryOp::Leq => "<=",
            BinaryOp::Geq => ">=",
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::LOr => 1,
            BinaryOp::LAnd => 2,
            BinaryOp::Eql
            | BinaryOp::Neq
            | BinaryOp::Lss
            | BinaryOp::Gtr
            | BinaryOp::Leq
            | BinaryOp::Geq => 3,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Or | BinaryOp::Xor => 4,
            BinaryOp::Mul
            | BinaryOp::Quo
            | BinaryOp::Rem
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::And
            | BinaryOp::AndNot => 5,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum AssignOp {
    Assign,
    Define,
    Op(BinaryOp),
}

impl Display for AssignOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AssignOp::Assign => write!(f, "="),
            AssignOp::Define => write!(f, ":="),
            AssignOp::Op(op) => write!(f, "{}=", op.as_str()),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

impl BranchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchKind::Break => "break",
            BranchKind::Continue => "continue",
            BranchKind::Goto => "goto",
            BranchKind::Fallthrough => "fallthrough",
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Pos,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum ExprKind {
    Ident(SmolStr),
    Wildcard {
        name: SmolStr,
        any: bool,
    },
    /// `value` keeps the literal's source text.
    BasicLit {
        kind: LitKind,
        value: SmolStr,
    },
    /// `ty` is `None` for elided element literals such as `{1, 2}` in `[][]int{{1, 2}}`.
    CompositeLit {
        ty: Option<Box<Expr>>,
        elts: Vec<Expr>,
    },
    FuncLit {
        ty: Box<FuncType>,
        body: Box<Stmt>,
    },
    Paren(Box<Expr>),
    /// `sel` is an identifier or, in patterns, a wildcard.
    Selector {
        x: Box<Expr>,
        sel: Box<Expr>,
    },
    Index {
        x: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        x: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
        max: Option<Box<Expr>>,
        slice3: bool,
    },
    /// `ty` is `None` for the `x.(type)` form of type switches.
    TypeAssert {
        x: Box<Expr>,
        ty: Option<Box<Expr>>,
    },
    Call {
        fun: Box<Expr>,
        args: Vec<Expr>,
        ellipsis: bool,
    },
    Star(Box<Expr>),
    Unary {
        op: UnaryOp,
        x: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        x: Box<Expr>,
        y: Box<Expr>,
    },
    KeyValue {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    /// `len` is `None` for slice types.
    ArrayType {
        len: Option<Box<Expr>>,
        elem: Box<Expr>,
    },
    Ellipsis(Option<Box<Expr>>),
    MapType {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    ChanType {
        dir: ChanDir,
        value: Box<Expr>,
    },
    FuncType(Box<FuncType>),
    StructType(Vec<Field>),
    InterfaceType(Vec<Field>),
}

impl Expr {
    pub fn new(kind: ExprKind, pos: Pos) -> Self {
        Self { kind, pos }
    }

    pub fn ident_name(&self) -> Option<&SmolStr> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self.kind, ExprKind::Wildcard { .. })
    }

    /// Node kind name as used by Go's `go/ast` package.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Ident(_) | ExprKind::Wildcard { .. } => "Ident",
            ExprKind::BasicLit { .. } => "BasicLit",
            ExprKind::CompositeLit { .. } => "CompositeLit",
            ExprKind::FuncLit { .. } => "FuncLit",
            ExprKind::Paren(_) => "ParenExpr",
            ExprKind::Selector { .. } => "SelectorExpr",
            ExprKind::Index { .. } => "IndexExpr",
            ExprKind::Slice { .. } => "SliceExpr",
            ExprKind::TypeAssert { .. } => "TypeAssertExpr",
            ExprKind::Call { .. } => "CallExpr",
            ExprKind::Star(_) => "StarExpr",
            ExprKind::Unary { .. } => "UnaryExpr",
            ExprKind::Binary { .. } => "BinaryExpr",
            ExprKind::KeyValue { .. } => "KeyValueExpr",
            ExprKind::ArrayType { .. } => "ArrayType",
            ExprKind::Ellipsis(_) => "Ellipsis",
            ExprKind::MapType { .. } => "MapType",
            ExprKind::ChanType { .. } => "ChanType",
            ExprKind::FuncType(_) => "FuncType",
            ExprKind::StructType(_) => "StructType",
            ExprKind::InterfaceType(_) => "InterfaceType",
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct FuncType {
    pub params: Vec<Field>,
    pub results: Vec<Field>,
}

/// A parameter, result, struct field or interface method. `names` holds
/// identifiers (or wildcards) and is empty for unnamed entries.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Field {
    pub names: Vec<Expr>,
    pub ty: Expr,
    pub pos: Pos,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: Pos,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum StmtKind {
    Expr(Expr),
    Send {
        chan: Expr,
        value: Expr,
    },
    IncDec {
        x: Expr,
        inc: bool,
    },
    Assign {
        lhs: Vec<Expr>,
        op: AssignOp,
        rhs: Vec<Expr>,
    },
    Var {
        names: Vec<Expr>,
        ty: Option<Expr>,
        values: Vec<Expr>,
    },
    Go(Expr),
    Defer(Expr),
    Return(Vec<Expr>),
    Branch {
        kind: BranchKind,
        label: Option<SmolStr>,
    },
    Labeled {
        label: SmolStr,
        stmt: Box<Stmt>,
    },
    Block(Vec<Stmt>),
    /// `body` is a block; `els` is a block or another `if`.
    If {
        init: Option<Box<Stmt>>,
        cond: Expr,
        body: Box<Stmt>,
        els: Option<Box<Stmt>>,
    },
    /// `body` is a block of `Case` clauses.
    Switch {
        init: Option<Box<Stmt>>,
        tag: Option<Expr>,
        body: Box<Stmt>,
    },
    /// `assign` is `x.(type)` or `v := x.(type)`.
    TypeSwitch {
        init: Option<Box<Stmt>>,
        assign: Box<Stmt>,
        body: Box<Stmt>,
    },
    /// `list` is `None` for `default`.
    Case {
        list: Option<Vec<Expr>>,
        body: Vec<Stmt>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Box<Stmt>,
    },
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        x: Expr,
        body: Box<Stmt>,
    },
    Empty,
}

impl Stmt {
    pub fn new(kind: StmtKind, pos: Pos) -> Self {
        Self { kind, pos }
    }

    pub fn block_stmts(&self) -> Option<&[Stmt]> {
        match &self.kind {
            StmtKind::Block(stmts) => Some(stmts),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            StmtKind::Expr(_) => "ExprStmt",
            StmtKind::Send { .. } => "SendStmt",
            StmtKind::IncDec { .. } => "IncDecStmt",
            StmtKind::Assign { .. } => "AssignStmt",
            StmtKind::Var { .. } => "DeclStmt",
            StmtKind::Go(_) => "GoStmt",
            StmtKind::Defer(_) => "DeferStmt",
            StmtKind::Return(_) => "ReturnStmt",
            StmtKind::Branch { .. } => "BranchStmt",
            StmtKind::Labeled { .. } => "LabeledStmt",
            StmtKind::Block(_) => "BlockStmt",
            StmtKind::If { .. } => "IfStmt",
            StmtKind::Switch { .. } => "SwitchStmt",
            StmtKind::TypeSwitch { .. } => "TypeSwitchStmt",
            StmtKind::Case { .. } => "CaseClause",
            StmtKind::For { .. } => "ForStmt",
            StmtKind::Range { .. } => "RangeStmt",
            StmtKind::Empty => "EmptyStmt",
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Import {
    pub name: Option<SmolStr>,
    pub path: SmolStr,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct FuncDecl {
    pub recv: Option<Field>,
    pub name: SmolStr,
    pub ty: FuncType,
    /// A block statement; `None` for declarations without a body.
    pub body: Option<Stmt>,
    pub pos: Pos,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct File {
    pub package: SmolStr,
    pub imports: Vec<Import>,
    pub funcs: Vec<FuncDecl>,
}

/// A borrowed reference to a node or node list of a parsed tree.
///
/// Comparing two references compares the referenced subtrees structurally;
/// source positions are ignored.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Expr(&'a Expr),
    Stmt(&'a Stmt),
    ExprList(&'a [Expr]),
    StmtList(&'a [Stmt]),
    Field(&'a Field),
    FieldList(&'a [Field]),
}

impl<'a> NodeRef<'a> {
    pub fn pos(&self) -> Option<Pos> {
        match self {
            NodeRef::Expr(expr) => Some(expr.pos),
            NodeRef::Stmt(stmt) => Some(stmt.pos),
            NodeRef::Field(field) => Some(field.pos),
            NodeRef::ExprList(exprs) => exprs.first().map(|expr| expr.pos),
            NodeRef::StmtList(stmts) => stmts.first().map(|stmt| stmt.pos),
            NodeRef::FieldList(fields) => fields.first().map(|field| field.pos),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            NodeRef::ExprList(_) | NodeRef::StmtList(_) | NodeRef::FieldList(_)
        )
    }

    /// Number of elements for lists, `1` for single nodes.
    pub fn len(&self) -> usize {
        match self {
            NodeRef::ExprList(exprs) => exprs.len(),
            NodeRef::StmtList(stmts) => stmts.len(),
            NodeRef::FieldList(fields) => fields.len(),
            NodeRef::Expr(_) | NodeRef::Stmt(_) | NodeRef::Field(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeRef::Expr(expr) => expr.kind_name(),
            NodeRef::Stmt(stmt) => stmt.kind_name(),
            NodeRef::Field(_) => "Field",
            NodeRef::ExprList(_) => "ExprList",
            NodeRef::StmtList(_) => "StmtList",
            NodeRef::FieldList(_) => "FieldList",
        }
    }

    pub fn as_expr(&self) -> Option<&'a Expr> {
        match self {
            NodeRef::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn as_stmt(&self) -> Option<&'a Stmt> {
        match self {
            NodeRef::Stmt(stmt) => Some(stmt),
            _ => None,
        }
    }
}
