//! c0check - declaration checker and linker for C0
//!
//! Checks the top-level declarations of a library and a program against a
//! growing global environment, then verifies that every function the
//! program relies on is defined exactly once.
//!
//! ## Architecture
//!
//! - **Syntax** (`syntax/`): lexer, AST and parser for C0 with contracts
//! - **Sema** (`sema/`): global environment, type, statement and flow
//!   checks, the per-declaration checker and the linker
//! - **Driver** (`driver/`): loads files, threads type names across them
//!   and reports diagnostics
//! - **Common** (`common/`): errors, diagnostics and spans

pub mod common;
pub mod driver;
pub mod sema;
pub mod syntax;

// Re-exports for convenience
pub use common::{CheckError, CheckResult, DiagnosticReporter, Diagnostics, Span};
pub use sema::{check_declaration, link, CheckConfig, GlobalEnv, Linked, Linker, Origin};
pub use syntax::{parse_source, Declaration};
