//! Declaration AST nodes

use super::{Block, Expr, Type};
use crate::common::Span;

/// Top-level declaration node
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub kind: DeclKind,
    pub span: Span,
}

impl Declaration {
    pub fn new(kind: DeclKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Name introduced by this declaration, if any
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            DeclKind::Pragma(_) => None,
            DeclKind::Struct(s) => Some(&s.name),
            DeclKind::TypeDef(t) => Some(&t.name),
            DeclKind::FunctionTypeDef(t) => Some(&t.name),
            DeclKind::Function(f) => Some(&f.name),
        }
    }
}

/// Declaration kinds
#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    /// Compiler directive: #use <conio>
    Pragma(Pragma),

    /// struct s; or struct s { ... };
    Struct(StructDecl),

    /// typedef int num;
    TypeDef(TypeDef),

    /// typedef int cmp(int a, int b) //@requires ...;
    FunctionTypeDef(FunctionTypeDef),

    /// Function declaration or definition
    Function(FuncDecl),
}

/// Pragma line, kept verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct Pragma {
    pub directive: String,
    pub span: Span,
}

impl Pragma {
    pub fn new(directive: String, span: Span) -> Self {
        Self { directive, span }
    }
}

/// Struct declaration; `fields` is `None` for a forward declaration
#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub fields: Option<Vec<Field>>,
    pub span: Span,
}

impl StructDecl {
    pub fn new(name: String, fields: Option<Vec<Field>>, span: Span) -> Self {
        Self { name, fields, span }
    }
}

/// Struct field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

impl Field {
    pub fn new(name: String, ty: Type, span: Span) -> Self {
        Self { name, ty, span }
    }
}

/// Type synonym
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

impl TypeDef {
    pub fn new(name: String, ty: Type, span: Span) -> Self {
        Self { name, ty, span }
    }
}

/// Function type synonym
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTypeDef {
    pub name: String,
    pub signature: Signature,
    pub span: Span,
}

impl FunctionTypeDef {
    pub fn new(name: String, signature: Signature, span: Span) -> Self {
        Self { name, signature, span }
    }
}

/// Return type, parameters and contracts shared by functions and
/// function types
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub return_type: Type,
    pub params: Vec<Param>,
    pub requires: Vec<Expr>,
    pub ensures: Vec<Expr>,
}

impl Signature {
    pub fn new(return_type: Type, params: Vec<Param>) -> Self {
        Self {
            return_type,
            params,
            requires: Vec::new(),
            ensures: Vec::new(),
        }
    }

    pub fn with_requires(mut self, condition: Expr) -> Self {
        self.requires.push(condition);
        self
    }

    pub fn with_ensures(mut self, condition: Expr) -> Self {
        self.ensures.push(condition);
        self
    }
}

/// Function declaration or definition
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub signature: Signature,
    pub body: Option<Block>,
    pub span: Span,
}

impl FuncDecl {
    pub fn new(name: String, signature: Signature, span: Span) -> Self {
        Self {
            name,
            signature,
            body: None,
            span,
        }
    }

    pub fn with_body(mut self, body: Block) -> Self {
        self.body = Some(body);
        self
    }

    /// Check if this is just a declaration (no body)
    pub fn is_declaration(&self) -> bool {
        self.body.is_none()
    }

    /// Check if this is a definition (has body)
    pub fn is_definition(&self) -> bool {
        self.body.is_some()
    }
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

impl Param {
    pub fn new(name: String, ty: Type, span: Span) -> Self {
        Self { name, ty, span }
    }
}
