//! Shared infrastructure: spans, errors and diagnostic reporting

mod error;
mod span;

pub use error::{CheckError, CheckResult, DiagnosticReporter, Diagnostics};
pub use span::Span;
