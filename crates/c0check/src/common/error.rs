//! Error types and diagnostic reporting

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, NoColor, StandardStream};
use thiserror::Error;
use super::Span;

/// Everything the checker can complain about
///
/// Conflict kinds also carry the span of the earlier declaration they
/// collide with, so the reporter can point at both.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("lexer error: {message}")]
    Lexer { message: String, span: Span },

    #[error("syntax error: {message}")]
    Parser { message: String, span: Span },

    #[error("type error: {message}")]
    Type { message: String, span: Span },

    #[error("flow error: {message}")]
    Flow { message: String, span: Span },

    #[error("struct error: {message}")]
    Struct { message: String, span: Span },

    #[error("{message}")]
    DuplicateParameter { message: String, span: Span },

    #[error("{message}")]
    DuplicateType { message: String, span: Span, previous: Span },

    #[error("{message}")]
    TypeFunctionConflict { message: String, span: Span, previous: Span },

    #[error("{message}")]
    DuplicateFunctionType { message: String, span: Span, previous: Span },

    #[error("{message}")]
    FunctionTypeFunctionConflict { message: String, span: Span, previous: Span },

    #[error("{message}")]
    DuplicateDefinition { message: String, span: Span, previous: Span },

    #[error("{message}")]
    SignatureMismatch { message: String, span: Span, previous: Span },

    #[error("{message}")]
    MissingReturn { message: String, span: Span },

    #[error("{message}")]
    UndefinedFunction { message: String, span: Span },

    #[error("{message}")]
    NeverDefined { message: String, span: Span },
}

impl CheckError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer { message: message.into(), span }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser { message: message.into(), span }
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::Type { message: message.into(), span }
    }

    pub fn flow(message: impl Into<String>, span: Span) -> Self {
        Self::Flow { message: message.into(), span }
    }

    pub fn struct_error(message: impl Into<String>, span: Span) -> Self {
        Self::Struct { message: message.into(), span }
    }

    pub fn duplicate_parameter(name: &str, span: Span) -> Self {
        Self::DuplicateParameter {
            message: format!("parameter '{name}' declared more than once"),
            span,
        }
    }

    pub fn duplicate_type(name: &str, span: Span, previous: Span) -> Self {
        Self::DuplicateType {
            message: format!("type name '{name}' already defined"),
            span,
            previous,
        }
    }

    pub fn type_function_conflict(message: impl Into<String>, span: Span, previous: Span) -> Self {
        Self::TypeFunctionConflict { message: message.into(), span, previous }
    }

    pub fn duplicate_function_type(name: &str, span: Span, previous: Span) -> Self {
        Self::DuplicateFunctionType {
            message: format!("function type name '{name}' already defined"),
            span,
            previous,
        }
    }

    pub fn function_type_function_conflict(
        message: impl Into<String>,
        span: Span,
        previous: Span,
    ) -> Self {
        Self::FunctionTypeFunctionConflict { message: message.into(), span, previous }
    }

    pub fn duplicate_definition(name: &str, span: Span, previous: Span) -> Self {
        Self::DuplicateDefinition {
            message: format!("function '{name}' defined more than once"),
            span,
            previous,
        }
    }

    pub fn signature_mismatch(message: impl Into<String>, span: Span, previous: Span) -> Self {
        Self::SignatureMismatch { message: message.into(), span, previous }
    }

    pub fn missing_return(name: &str, span: Span) -> Self {
        Self::MissingReturn {
            message: format!("function '{name}' does not return a value on every control path"),
            span,
        }
    }

    pub fn undefined_function(name: &str, span: Span) -> Self {
        Self::UndefinedFunction {
            message: format!("function '{name}' is used but never declared"),
            span,
        }
    }

    pub fn never_defined(name: &str, span: Span) -> Self {
        Self::NeverDefined {
            message: format!("function '{name}' is declared and used but never defined"),
            span,
        }
    }

    pub fn entry_never_defined(name: &str, span: Span) -> Self {
        Self::NeverDefined {
            message: format!("entry point '{name}' is never defined"),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Lexer { span, .. }
            | Self::Parser { span, .. }
            | Self::Type { span, .. }
            | Self::Flow { span, .. }
            | Self::Struct { span, .. }
            | Self::DuplicateParameter { span, .. }
            | Self::DuplicateType { span, .. }
            | Self::TypeFunctionConflict { span, .. }
            | Self::DuplicateFunctionType { span, .. }
            | Self::FunctionTypeFunctionConflict { span, .. }
            | Self::DuplicateDefinition { span, .. }
            | Self::SignatureMismatch { span, .. }
            | Self::MissingReturn { span, .. }
            | Self::UndefinedFunction { span, .. }
            | Self::NeverDefined { span, .. } => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Lexer { message, .. }
            | Self::Parser { message, .. }
            | Self::Type { message, .. }
            | Self::Flow { message, .. }
            | Self::Struct { message, .. }
            | Self::DuplicateParameter { message, .. }
            | Self::DuplicateType { message, .. }
            | Self::TypeFunctionConflict { message, .. }
            | Self::DuplicateFunctionType { message, .. }
            | Self::FunctionTypeFunctionConflict { message, .. }
            | Self::DuplicateDefinition { message, .. }
            | Self::SignatureMismatch { message, .. }
            | Self::MissingReturn { message, .. }
            | Self::UndefinedFunction { message, .. }
            | Self::NeverDefined { message, .. } => message,
        }
    }

    /// Span of the earlier declaration this error collides with, if any
    pub fn previous(&self) -> Option<Span> {
        match self {
            Self::DuplicateType { previous, .. }
            | Self::TypeFunctionConflict { previous, .. }
            | Self::DuplicateFunctionType { previous, .. }
            | Self::FunctionTypeFunctionConflict { previous, .. }
            | Self::DuplicateDefinition { previous, .. }
            | Self::SignatureMismatch { previous, .. } => Some(*previous),
            _ => None,
        }
    }

    /// Short headline used by the reporter
    pub fn title(&self) -> &'static str {
        match self {
            Self::Lexer { .. } => "Lexer error",
            Self::Parser { .. } => "Syntax error",
            Self::Type { .. } => "Type error",
            Self::Flow { .. } => "Flow error",
            Self::Struct { .. } => "Struct error",
            Self::DuplicateParameter { .. } => "Duplicate parameter",
            Self::DuplicateType { .. } => "Duplicate type name",
            Self::TypeFunctionConflict { .. } => "Type name conflicts with function",
            Self::DuplicateFunctionType { .. } => "Duplicate function type name",
            Self::FunctionTypeFunctionConflict { .. } => "Function type name conflicts with function",
            Self::DuplicateDefinition { .. } => "Duplicate definition",
            Self::SignatureMismatch { .. } => "Signature mismatch",
            Self::MissingReturn { .. } => "Missing return",
            Self::UndefinedFunction { .. } => "Undefined function",
            Self::NeverDefined { .. } => "Function never defined",
        }
    }
}

pub type CheckResult<T> = Result<T, CheckError>;

/// Collected diagnostics of one checking pass
///
/// `report` is the single entry point every failure goes through.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    errors: Vec<CheckError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, error: CheckError) {
        log::debug!("{}: {}", error.title(), error.message());
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheckError> {
        self.errors.iter()
    }

    pub fn into_errors(self) -> Vec<CheckError> {
        self.errors
    }
}

impl Extend<CheckError> for Diagnostics {
    fn extend<I: IntoIterator<Item = CheckError>>(&mut self, iter: I) {
        for error in iter {
            self.report(error);
        }
    }
}

/// Diagnostic reporter for pretty error output
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self::with_color(ColorChoice::Auto)
    }

    pub fn with_color(choice: ColorChoice) -> Self {
        Self {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(choice),
            config: term::Config::default(),
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    fn diagnostic(&self, error: &CheckError) -> Diagnostic<usize> {
        let span = error.span();
        let mut labels = vec![
            Label::primary(span.file, span.start..span.end).with_message(error.message()),
        ];
        if let Some(previous) = error.previous() {
            labels.push(
                Label::secondary(previous.file, previous.start..previous.end)
                    .with_message("previous declaration here"),
            );
        }
        Diagnostic::error().with_message(error.title()).with_labels(labels)
    }

    pub fn report_error(&self, error: &CheckError) {
        let diagnostic = self.diagnostic(error);
        if term::emit(&mut self.writer.lock(), &self.config, &self.files, &diagnostic).is_err() {
            // Spans without a registered file (e.g. the builtin entry point)
            eprintln!("error: {error}");
        }
    }

    pub fn report_all<'e>(&self, errors: impl IntoIterator<Item = &'e CheckError>) {
        for error in errors {
            self.report_error(error);
        }
    }

    /// Render one diagnostic without colors, for tests and logs
    pub fn render(&self, error: &CheckError) -> String {
        let diagnostic = self.diagnostic(error);
        let mut buffer = NoColor::new(Vec::new());
        match term::emit(&mut buffer, &self.config, &self.files, &diagnostic) {
            Ok(()) => String::from_utf8_lossy(&buffer.into_inner()).into_owned(),
            Err(_) => format!("error: {error}"),
        }
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}
