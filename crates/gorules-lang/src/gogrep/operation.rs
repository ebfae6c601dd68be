//! The closed set of pattern instructions.
//!
//! Every operation describes one concrete syntax shape. Its arguments are the
//! instructions that follow it in pre-order; a variadic argument is a run of
//! element instructions terminated by [`Operation::End`].

use crate::ast::node::{AssignOp, BinaryOp, BranchKind, ChanDir, UnaryOp};

/// How an instruction's `value` / `value_index` fields are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Empty,
    /// `value_index` points into the program's string table.
    String,
    /// `value` holds an encoded operator or keyword.
    Token,
    /// `value` holds an encoded channel direction.
    ChanDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationInfo {
    pub num_args: usize,
    pub value_kind: ValueKind,
    pub extra_value_kind: ValueKind,
    /// Bit `i` is set when argument `i` is an `End` terminated list.
    pub variadic_map: u32,
}

impl OperationInfo {
    #[inline(always)]
    pub fn is_variadic_arg(&self, i: usize) -> bool {
        self.variadic_map & (1 << i) != 0
    }
}

macro_rules! define_operations {
    ($(
        $(#[$doc:meta])*
        $name:ident($args:expr, $value:ident, $extra:ident, $variadic:expr)
    ),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Operation {
            $($(#[$doc])* $name,)*
        }

        static OPERATION_INFO: &[OperationInfo] = &[
            $(OperationInfo {
                num_args: $args,
                value_kind: ValueKind::$value,
                extra_value_kind: ValueKind::$extra,
                variadic_map: $variadic,
            },)*
        ];

        impl Operation {
            #[inline(always)]
            pub fn info(self) -> &'static OperationInfo {
                &OPERATION_INFO[self as usize]
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Operation::$name => stringify!($name),)*
                }
            }
        }
    };
}

define_operations! {
    /// `$_`
    Node(0, Empty, Empty, 0),
    /// `$x`
    NamedNode(0, String, Empty, 0),
    /// `$*_` inside a list.
    NodeSeq(0, Empty, Empty, 0),
    /// `$*x` inside a list.
    NamedNodeSeq(0, String, Empty, 0),
    /// `$*_` in a slot that may be absent.
    OptNode(0, Empty, Empty, 0),
    /// `$*x` in a slot that may be absent.
    NamedOptNode(0, String, Empty, 0),

    /// Root of a statement list pattern: `a; b`.
    MultiStmt(1, Empty, Empty, 0b1),
    /// Root of an expression list pattern: `a, b`.
    MultiExpr(1, Empty, Empty, 0b1),
    End(0, Empty, Empty, 0),

    StrictIntLit(0, String, Empty, 0),
    StrictFloatLit(0, String, Empty, 0),
    StrictComplexLit(0, String, Empty, 0),
    StrictCharLit(0, String, Empty, 0),
    StrictStringLit(0, String, Empty, 0),
    Ident(0, String, Empty, 0),

    /// `x[i]`
    IndexExpr(2, Empty, Empty, 0),
    /// `x[:]`
    SliceExpr(1, Empty, Empty, 0),
    /// `x[low:]`
    SliceFromExpr(2, Empty, Empty, 0),
    /// `x[:high]`
    SliceToExpr(2, Empty, Empty, 0),
    /// `x[low:high]`
    SliceFromToExpr(3, Empty, Empty, 0),
    /// `x[:high:max]`
    SliceToCapExpr(3, Empty, Empty, 0),
    /// `x[low:high:max]`
    SliceFromToCapExpr(4, Empty, Empty, 0),
    /// Args: signature, body.
    FuncLit(2, Empty, Empty, 0),
    /// `{elts}` with the type elided.
    CompositeLit(1, Empty, Empty, 0b1),
    /// `T{elts}`
    TypedCompositeLit(2, Empty, Empty, 0b10),
    /// `x.sel` where `sel` is a plain identifier stored as the value.
    SimpleSelectorExpr(1, String, Empty, 0),
    /// `x.$sel`
    SelectorExpr(2, Empty, Empty, 0),
    /// `x.(T)`
    TypeAssertExpr(2, Empty, Empty, 0),
    /// `x.(type)`
    TypeSwitchAssertExpr(1, Empty, Empty, 0),
    StructType(1, Empty, Empty, 0),
    InterfaceType(1, Empty, Empty, 0),
    /// `func(params)`
    VoidFuncType(1, Empty, Empty, 0),
    /// `func(params) results`
    FuncType(2, Empty, Empty, 0),
    /// `[]T`
    SliceType(1, Empty, Empty, 0),
    /// `[N]T`
    ArrayType(2, Empty, Empty, 0),
    MapType(2, Empty, Empty, 0),
    ChanType(1, ChanDir, Empty, 0),
    KeyValueExpr(2, Empty, Empty, 0),
    /// `...` as an array length.
    Ellipsis(0, Empty, Empty, 0),
    /// `...T`
    TypedEllipsis(1, Empty, Empty, 0),
    StarExpr(1, Empty, Empty, 0),
    UnaryExpr(1, Token, Empty, 0),
    BinaryExpr(2, Token, Empty, 0),
    ParenExpr(1, Empty, Empty, 0),
    /// `f(args...)`
    VariadicCallExpr(2, Empty, Empty, 0b10),
    /// `f(args, $*rest)`: matches calls with or without a trailing `...`.
    CallExpr(2, Empty, Empty, 0b10),
    /// `f(args)` without a trailing `...`.
    NonVariadicCallExpr(2, Empty, Empty, 0b10),

    FieldList(1, Empty, Empty, 0b1),
    /// `T`
    UnnamedField(1, Empty, Empty, 0),
    /// `name T`
    SimpleField(1, String, Empty, 0),
    /// `$name T`
    Field(2, Empty, Empty, 0),
    /// `a, b T`
    MultiField(2, Empty, Empty, 0b01),

    ExprStmt(1, Empty, Empty, 0),
    SendStmt(2, Empty, Empty, 0),
    IncDecStmt(1, Token, Empty, 0),
    /// `lhs op rhs` with one expression on each side.
    AssignStmt(2, Token, Empty, 0),
    MultiAssignStmt(2, Token, Empty, 0b11),
    /// `var names = values`
    VarStmt(2, Empty, Empty, 0b11),
    /// `var names T = values`
    TypedVarStmt(3, Empty, Empty, 0b101),
    GoStmt(1, Empty, Empty, 0),
    DeferStmt(1, Empty, Empty, 0),
    ReturnStmt(1, Empty, Empty, 0b1),
    BranchStmt(0, Token, Empty, 0),
    LabeledBranchStmt(0, Token, String, 0),
    LabeledStmt(1, String, Empty, 0),
    BlockStmt(1, Empty, Empty, 0b1),
    EmptyStmt(0, Empty, Empty, 0),
    /// Args: cond, body.
    IfStmt(2, Empty, Empty, 0),
    /// Args: cond, body, else.
    IfElseStmt(3, Empty, Empty, 0),
    /// Args: init, cond, body.
    IfInitStmt(3, Empty, Empty, 0),
    /// Args: init, cond, body, else.
    IfInitElseStmt(4, Empty, Empty, 0),
    /// Args: body.
    SwitchStmt(1, Empty, Empty, 0),
    /// Args: tag, body.
    TagSwitchStmt(2, Empty, Empty, 0),
    /// Args: init, body.
    InitSwitchStmt(2, Empty, Empty, 0),
    /// Args: init, tag, body.
    InitTagSwitchStmt(3, Empty, Empty, 0),
    /// Args: assign, body.
    TypeSwitchStmt(2, Empty, Empty, 0),
    /// Args: init, assign, body.
    TypeSwitchInitStmt(3, Empty, Empty, 0),
    /// Args: list, body.
    CaseClause(2, Empty, Empty, 0b11),
    DefaultCaseClause(1, Empty, Empty, 0b1),
    /// `for {}`
    ForStmt(1, Empty, Empty, 0),
    ForPostStmt(2, Empty, Empty, 0),
    ForCondStmt(2, Empty, Empty, 0),
    ForCondPostStmt(3, Empty, Empty, 0),
    ForInitStmt(2, Empty, Empty, 0),
    ForInitPostStmt(3, Empty, Empty, 0),
    ForInitCondStmt(3, Empty, Empty, 0),
    ForInitCondPostStmt(4, Empty, Empty, 0),
    /// `for range x {}`
    RangeStmt(2, Empty, Empty, 0),
    /// `for k := range x {}`
    RangeKeyStmt(3, Token, Empty, 0),
    /// `for k, v := range x {}`
    RangeKeyValueStmt(4, Token, Empty, 0),
}

impl Operation {
    /// Which of `init`, `cond` and `post` a `for` operation carries.
    pub(crate) fn for_parts(self) -> Option<(bool, bool, bool)> {
        let parts = match self {
            Operation::ForStmt => (false, false, false),
            Operation::ForPostStmt => (false, false, true),
            Operation::ForCondStmt => (false, true, false),
            Operation::ForCondPostStmt => (false, true, true),
            Operation::ForInitStmt => (true, false, false),
            Operation::ForInitPostStmt => (true, false, true),
            Operation::ForInitCondStmt => (true, true, false),
            Operation::ForInitCondPostStmt => (true, true, true),
            _ => return None,
        };
        Some(parts)
    }

    pub(crate) fn for_op(init: bool, cond: bool, post: bool) -> Operation {
        match (init, cond, post) {
            (false, false, false) => Operation::ForStmt,
            (false, false, true) => Operation::ForPostStmt,
            (false, true, false) => Operation::ForCondStmt,
            (false, true, true) => Operation::ForCondPostStmt,
            (true, false, false) => Operation::ForInitStmt,
            (true, false, true) => Operation::ForInitPostStmt,
            (true, true, false) => Operation::ForInitCondStmt,
            (true, true, true) => Operation::ForInitCondPostStmt,
        }
    }

    /// Which of `low`, `high` and `max` a slice operation carries.
    pub(crate) fn slice_parts(self) -> Option<(bool, bool, bool)> {
        let parts = match self {
            Operation::SliceExpr => (false, false, false),
            Operation::SliceFromExpr => (true, false, false),
            Operation::SliceToExpr => (false, true, false),
            Operation::SliceFromToExpr => (true, true, false),
            Operation::SliceToCapExpr => (false, true, true),
            Operation::SliceFromToCapExpr => (true, true, true),
            _ => return None,
        };
        Some(parts)
    }
}

pub(crate) const UNARY_OPS: [UnaryOp; 6] = [
    UnaryOp::Plus,
    UnaryOp::Neg,
    UnaryOp::Not,
    UnaryOp::Xor,
    UnaryOp::Addr,
    UnaryOp::Recv,
];

pub(crate) const BINARY_OPS: [BinaryOp; 19] = [
    BinaryOp::Add,
    BinaryOp::Sub,
    BinaryOp::Mul,
    BinaryOp::Quo,
    BinaryOp::Rem,
    BinaryOp::And,
    BinaryOp::Or,
    BinaryOp::Xor,
    BinaryOp::Shl,
    BinaryOp::Shr,
    BinaryOp::AndNot,
    BinaryOp::LAnd,
    BinaryOp::LOr,
    BinaryOp::Eql,
    BinaryOp::Neq,
    BinaryOp::Lss,
    BinaryOp::Gtr,
    BinaryOp::Leq,
    BinaryOp::Geq,
];

pub(crate) const BRANCH_KINDS: [BranchKind; 4] = [
    BranchKind::Break,
    BranchKind::Continue,
    BranchKind::Goto,
    BranchKind::Fallthrough,
];

pub(crate) fn unary_op_code(op: UnaryOp) -> u8 {
    op as u8
}

pub(crate) fn binary_op_code(op: BinaryOp) -> u8 {
    op as u8
}

pub(crate) fn branch_code(kind: BranchKind) -> u8 {
    kind as u8
}

pub(crate) fn chan_dir_code(dir: ChanDir) -> u8 {
    dir as u8
}

pub(crate) fn assign_op_code(op: AssignOp) -> u8 {
    match op {
        AssignOp::Assign => 0,
        AssignOp::Define => 1,
        AssignOp::Op(op) => 2 + binary_op_code(op),
    }
}

pub(crate) fn decode_assign_op(code: u8) -> Option<AssignOp> {
    match code {
        0 => Some(AssignOp::Assign),
        1 => Some(AssignOp::Define),
        code => BINARY_OPS
            .get(usize::from(code - 2))
            .map(|op| AssignOp::Op(*op)),
    }
}

pub(crate) fn inc_dec_code(inc: bool) -> u8 {
    if inc { 0 } else { 1 }
}

pub(crate) fn range_code(define: bool) -> u8 {
    if define { 1 } else { 0 }
}
