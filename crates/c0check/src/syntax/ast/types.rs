//! Type representations in the AST

use std::fmt;

/// A type as written in source, or as resolved by the checker
///
/// `Named` only appears before resolution; `Function` and `Null` only after.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Bool,
    Char,
    String,
    Void,
    Pointer(Box<Type>),
    Array(Box<Type>),
    Struct(String),
    /// Type name introduced by `typedef`
    Named(String),
    /// Function type name; only legal behind a pointer
    Function(String),
    /// Type of the `NULL` literal
    Null,
}

impl Type {
    pub fn pointer_to(inner: Type) -> Self {
        Self::Pointer(Box::new(inner))
    }

    pub fn array_of(element: Type) -> Self {
        Self::Array(Box::new(element))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    /// Pointers, including the type of `NULL`
    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_) | Type::Null)
    }

    /// Values that fit in a variable: everything except void, struct values
    /// and bare function types
    pub fn is_small(&self) -> bool {
        !matches!(self, Type::Void | Type::Struct(_) | Type::Function(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Char => write!(f, "char"),
            Type::String => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Pointer(inner) => write!(f, "{inner}*"),
            Type::Array(element) => write!(f, "{element}[]"),
            Type::Struct(name) => write!(f, "struct {name}"),
            Type::Named(name) | Type::Function(name) => write!(f, "{name}"),
            Type::Null => write!(f, "NULL"),
        }
    }
}
