//! Expression AST nodes

use super::Type;
use crate::common::Span;

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Expression kinds
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal: 42, 0xFF
    IntLiteral(i64),

    /// true, false
    BoolLiteral(bool),

    /// Character literal: 'a', '\n'
    CharLiteral(char),

    /// String literal: "hello"
    StringLiteral(String),

    /// NULL
    Null,

    /// Variable or function name
    Identifier(String),

    /// \result, only inside @ensures
    Result,

    /// \length(e), only inside contracts
    Length(Box<Expr>),

    /// Binary operation: a + b, x && y
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary operation: -x, !flag, ~bits
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// Ternary conditional: cond ? then : else
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },

    /// Direct call: foo(a, b)
    Call {
        name: String,
        args: Vec<Expr>,
    },

    /// Call through a function pointer: (*f)(a, b)
    PtrCall {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    /// Address of a function: &f
    AddrOf(String),

    /// Dereference: *ptr
    Deref(Box<Expr>),

    /// Member access: obj.field
    Member {
        object: Box<Expr>,
        field: String,
    },

    /// Pointer member access: ptr->field
    PtrMember {
        pointer: Box<Expr>,
        field: String,
    },

    /// Array subscript: arr[i]
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
    },

    /// alloc(t)
    Alloc(Type),

    /// alloc_array(t, n)
    AllocArray {
        ty: Type,
        count: Box<Expr>,
    },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    LogAnd,
    LogOr,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::LogAnd => "&&",
            BinaryOp::LogOr => "||",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,    // -
    Not,    // !
    BitNot, // ~
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,    // =
    AddAssign, // +=
    SubAssign, // -=
    MulAssign, // *=
    DivAssign, // /=
    ModAssign, // %=
    AndAssign, // &=
    OrAssign,  // |=
    XorAssign, // ^=
    ShlAssign, // <<=
    ShrAssign, // >>=
}

impl AssignOp {
    /// The arithmetic operator behind a compound assignment
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::ModAssign => Some(BinaryOp::Mod),
            AssignOp::AndAssign => Some(BinaryOp::BitAnd),
            AssignOp::OrAssign => Some(BinaryOp::BitOr),
            AssignOp::XorAssign => Some(BinaryOp::BitXor),
            AssignOp::ShlAssign => Some(BinaryOp::Shl),
            AssignOp::ShrAssign => Some(BinaryOp::Shr),
        }
    }
}
