//! Lexer module for tokenizing C0 source code

mod token;
mod scanner;

pub use token::{Token, TokenKind};
pub use scanner::Lexer;
