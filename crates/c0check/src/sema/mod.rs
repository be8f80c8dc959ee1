//! Declaration-level semantic checking and linking
//!
//! Each top-level declaration is checked against a persistent global
//! environment and, if it passes, added to it. The [`link`] entry point
//! folds a library and a program through the checker and then verifies
//! that every function the program relies on is defined.

pub mod decl;
pub mod env;
pub mod expr;
pub mod flow;
pub mod free_vars;
pub mod link;
pub mod params;
pub mod scope;
pub mod stmt;
pub mod structs;
pub mod types;

pub use decl::{check_declaration, Checked, DeclChecker};
pub use env::{Binding, FunEntry, FunSig, GlobalEnv, Origin};
pub use link::{link, CheckConfig, Linked, Linker};
