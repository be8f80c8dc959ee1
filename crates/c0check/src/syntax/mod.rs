//! Surface syntax: tokens, AST and parser
//!
//! Parsing is a collaborator of the checker. It hands over declaration
//! sequences in source order and does no name resolution beyond tracking
//! which identifiers are type names.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::common::CheckResult;

/// Parse one file's declarations
pub fn parse_source(source: &str, file: usize) -> CheckResult<Vec<Declaration>> {
    let mut parser = Parser::for_file(source, file)?;
    Ok(parser.parse()?.declarations)
}
