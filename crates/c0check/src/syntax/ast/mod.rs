//! Abstract Syntax Tree definitions

mod types;
mod expr;
mod stmt;
mod decl;

pub use types::*;
pub use expr::*;
pub use stmt::*;
pub use decl::*;

/// Declarations of one source file, in source order
#[derive(Debug, Clone, Default)]
pub struct SourceUnit {
    pub declarations: Vec<Declaration>,
}

impl SourceUnit {
    pub fn new(declarations: Vec<Declaration>) -> Self {
        Self { declarations }
    }
}
