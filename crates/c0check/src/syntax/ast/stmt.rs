//! Statement AST nodes

use super::{AssignOp, Expr, Type};
use crate::common::Span;

/// Statement node
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Statement kinds
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Local declaration: int x; int x = e;
    Decl {
        name: String,
        ty: Type,
        init: Option<Expr>,
    },

    /// Assignment: lv = e, lv += e
    Assign {
        op: AssignOp,
        target: Expr,
        value: Expr,
    },

    /// lv++
    PostIncrement(Expr),

    /// lv--
    PostDecrement(Expr),

    /// Expression statement: f(x);
    Expr(Expr),

    /// Empty statement: ;
    Empty,

    /// Compound statement (block): { ... }
    Block(Block),

    /// If statement: if (cond) then [else else]
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// While loop with its //@loop_invariant annotations
    While {
        condition: Expr,
        invariants: Vec<Expr>,
        body: Box<Stmt>,
    },

    /// For loop: for (init; cond; update) body
    For {
        init: Option<Box<Stmt>>,
        condition: Expr,
        update: Option<Box<Stmt>>,
        invariants: Vec<Expr>,
        body: Box<Stmt>,
    },

    /// Return statement: return [expr];
    Return(Option<Expr>),

    /// Break statement
    Break,

    /// Continue statement
    Continue,

    /// //@assert e;
    Assert(Expr),

    /// error(msg);
    Error(Expr),
}

/// Block (compound statement)
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}
