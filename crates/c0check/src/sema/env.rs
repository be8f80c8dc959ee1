//! Global environment of types, function types, structs and functions
//!
//! The environment is persistent: `extend` returns a new environment that
//! shares every older binding with its parent. Environments captured
//! earlier in the fold stay valid and unchanged.

use std::fmt;
use std::rc::Rc;

use crate::common::Span;
use crate::syntax::{Block, Type};

/// Where a declaration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Provided by the checker itself (the entry point prototype)
    Builtin,
    Library,
    Program,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Builtin => write!(f, "builtin"),
            Origin::Library => write!(f, "library"),
            Origin::Program => write!(f, "program"),
        }
    }
}

/// Resolved function signature
///
/// Parameter names are kept for messages and dumps; they take no part in
/// signature equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunSig {
    pub return_type: Type,
    pub params: Vec<(String, Type)>,
}

impl FunSig {
    pub fn new(return_type: Type, params: Vec<(String, Type)>) -> Self {
        Self { return_type, params }
    }

    /// Same return type and same parameter types in the same order
    pub fn same_shape(&self, other: &FunSig) -> bool {
        self.return_type == other.return_type
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|((_, a), (_, b))| a == b)
    }

    pub fn param_types(&self) -> impl Iterator<Item = &Type> {
        self.params.iter().map(|(_, ty)| ty)
    }
}

impl fmt::Display for FunSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.return_type)?;
        for (i, (name, ty)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ty} {name}")?;
        }
        write!(f, ")")
    }
}

/// Type synonym record; `ty` is already resolved
#[derive(Debug, Clone, PartialEq)]
pub struct TypeEntry {
    pub name: String,
    pub ty: Type,
    pub origin: Origin,
    pub span: Span,
}

/// Function type synonym record
#[derive(Debug, Clone, PartialEq)]
pub struct FunTypeEntry {
    pub name: String,
    pub sig: Rc<FunSig>,
    pub origin: Origin,
    pub span: Span,
}

/// Struct record; `fields` is `None` for a forward declaration
#[derive(Debug, Clone, PartialEq)]
pub struct StructEntry {
    pub name: String,
    pub fields: Option<Vec<(String, Type)>>,
    pub origin: Origin,
    pub span: Span,
}

impl StructEntry {
    pub fn field(&self, name: &str) -> Option<&Type> {
        self.fields
            .as_ref()?
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty)
    }
}

/// One declaration or definition of a function
#[derive(Debug, Clone, PartialEq)]
pub struct FunEntry {
    pub name: String,
    pub sig: Rc<FunSig>,
    pub body: Option<Rc<Block>>,
    pub origin: Origin,
    pub span: Span,
}

impl FunEntry {
    pub fn is_definition(&self) -> bool {
        self.body.is_some()
    }

    /// "declaration" or "definition", for messages
    pub fn describe(&self) -> &'static str {
        if self.is_definition() { "definition" } else { "declaration" }
    }
}

/// A single environment binding
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Type(TypeEntry),
    FunctionType(FunTypeEntry),
    Struct(StructEntry),
    Function(FunEntry),
}

impl Binding {
    pub fn name(&self) -> &str {
        match self {
            Binding::Type(entry) => &entry.name,
            Binding::FunctionType(entry) => &entry.name,
            Binding::Struct(entry) => &entry.name,
            Binding::Function(entry) => &entry.name,
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Type(entry) => write!(f, "typedef {} {};", entry.ty, entry.name),
            Binding::FunctionType(entry) => {
                let sig = &entry.sig;
                write!(f, "typedef {} {}(", sig.return_type, entry.name)?;
                write_params(f, sig)?;
                write!(f, ");")
            }
            Binding::Struct(entry) => match &entry.fields {
                Some(fields) => write!(f, "struct {} {{ {} fields }};", entry.name, fields.len()),
                None => write!(f, "struct {};", entry.name),
            },
            Binding::Function(entry) => {
                let sig = &entry.sig;
                write!(f, "{} {}(", sig.return_type, entry.name)?;
                write_params(f, sig)?;
                let end = if entry.is_definition() { ") { ... }" } else { ");" };
                write!(f, "{end}    [{}]", entry.origin)
            }
        }
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, sig: &FunSig) -> fmt::Result {
    for (i, (name, ty)) in sig.params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{ty} {name}")?;
    }
    Ok(())
}

#[derive(Debug)]
struct Frame {
    binding: Binding,
    parent: Option<Rc<Frame>>,
}

/// Persistent global environment
///
/// Lookups walk from the newest binding to the oldest.
#[derive(Debug, Clone, Default)]
pub struct GlobalEnv {
    head: Option<Rc<Frame>>,
    len: usize,
}

impl GlobalEnv {
    /// Environment with no bindings at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Starting environment: the prototype `int <entry>()`
    pub fn initial(entry_point: &str) -> Self {
        Self::empty().extend(Binding::Function(FunEntry {
            name: entry_point.to_string(),
            sig: Rc::new(FunSig::new(Type::Int, Vec::new())),
            body: None,
            origin: Origin::Builtin,
            span: Span::builtin(),
        }))
    }

    /// New environment with `binding` added on top; `self` is untouched
    pub fn extend(&self, binding: Binding) -> Self {
        Self {
            head: Some(Rc::new(Frame {
                binding,
                parent: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bindings from newest to oldest
    pub fn bindings(&self) -> Bindings<'_> {
        Bindings { next: self.head.as_deref() }
    }

    pub fn lookup_type(&self, name: &str) -> Option<&TypeEntry> {
        self.bindings().find_map(|binding| match binding {
            Binding::Type(entry) if entry.name == name => Some(entry),
            _ => None,
        })
    }

    pub fn lookup_function_type(&self, name: &str) -> Option<&FunTypeEntry> {
        self.bindings().find_map(|binding| match binding {
            Binding::FunctionType(entry) if entry.name == name => Some(entry),
            _ => None,
        })
    }

    /// Latest struct record, which may be a forward declaration
    pub fn lookup_struct(&self, name: &str) -> Option<&StructEntry> {
        self.bindings().find_map(|binding| match binding {
            Binding::Struct(entry) if entry.name == name => Some(entry),
            _ => None,
        })
    }

    /// The struct record carrying a field list, if the struct is defined
    pub fn struct_definition(&self, name: &str) -> Option<&StructEntry> {
        self.bindings().find_map(|binding| match binding {
            Binding::Struct(entry) if entry.name == name && entry.fields.is_some() => Some(entry),
            _ => None,
        })
    }

    /// Latest record for a function name
    pub fn lookup_function(&self, name: &str) -> Option<&FunEntry> {
        self.bindings().find_map(|binding| match binding {
            Binding::Function(entry) if entry.name == name => Some(entry),
            _ => None,
        })
    }

    /// The record of `name` that carries a body, wherever it sits in the
    /// chain
    pub fn lookup_definition(&self, name: &str) -> Option<&FunEntry> {
        self.bindings().find_map(|binding| match binding {
            Binding::Function(entry) if entry.name == name && entry.is_definition() => Some(entry),
            _ => None,
        })
    }
}

impl fmt::Display for GlobalEnv {
    /// One binding per line, oldest first
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bindings: Vec<_> = self.bindings().collect();
        bindings.reverse();
        for binding in bindings {
            writeln!(f, "{binding}")?;
        }
        Ok(())
    }
}

/// Iterator over the bindings of a [`GlobalEnv`]
pub struct Bindings<'a> {
    next: Option<&'a Frame>,
}

impl<'a> Iterator for Bindings<'a> {
    type Item = &'a Binding;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.next?;
        self.next = frame.parent.as_deref();
        Some(&frame.binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn function(name: &str, sig: FunSig, defined: bool) -> Binding {
        Binding::Function(FunEntry {
            name: name.to_string(),
            sig: Rc::new(sig),
            body: defined.then(|| Rc::new(Block::new(Vec::new(), Span::default()))),
            origin: Origin::Program,
            span: Span::default(),
        })
    }

    #[test]
    fn test_initial_has_entry_prototype() {
        let env = GlobalEnv::initial("main");
        let main = env.lookup_function("main").expect("main prototype");
        assert_eq!(main.sig.return_type, Type::Int);
        assert!(main.sig.params.is_empty());
        assert!(!main.is_definition());
        assert_eq!(main.origin, Origin::Builtin);
        assert!(env.lookup_definition("main").is_none());
    }

    #[test]
    fn test_extend_leaves_original_untouched() {
        let base = GlobalEnv::initial("main");
        let extended = base.extend(Binding::Type(TypeEntry {
            name: "num".into(),
            ty: Type::Int,
            origin: Origin::Program,
            span: Span::default(),
        }));

        assert!(base.lookup_type("num").is_none());
        assert_eq!(extended.lookup_type("num").map(|t| &t.ty), Some(&Type::Int));
        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
    }

    #[test]
    fn test_latest_record_and_definition_lookup() {
        let sig = FunSig::new(Type::Int, vec![("x".into(), Type::Int)]);
        let env = GlobalEnv::empty()
            .extend(function("f", sig.clone(), false))
            .extend(function("f", sig.clone(), true))
            .extend(function("f", sig, false));

        assert!(!env.lookup_function("f").expect("f").is_definition());
        assert!(env.lookup_definition("f").is_some());
    }

    #[test]
    fn test_same_shape_ignores_parameter_names() {
        let a = FunSig::new(Type::Int, vec![("x".into(), Type::Int), ("y".into(), Type::Bool)]);
        let b = FunSig::new(Type::Int, vec![("a".into(), Type::Int), ("b".into(), Type::Bool)]);
        let c = FunSig::new(Type::Int, vec![("a".into(), Type::Bool), ("b".into(), Type::Int)]);
        let d = FunSig::new(Type::Bool, vec![("x".into(), Type::Int), ("y".into(), Type::Bool)]);
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
        assert!(!a.same_shape(&d));
    }

    #[test]
    fn test_struct_definition_survives_later_forward_declaration() {
        let defined = StructEntry {
            name: "point".into(),
            fields: Some(vec![("x".into(), Type::Int)]),
            origin: Origin::Program,
            span: Span::default(),
        };
        let forward = StructEntry { fields: None, ..defined.clone() };
        let env = GlobalEnv::empty()
            .extend(Binding::Struct(defined))
            .extend(Binding::Struct(forward));

        assert!(env.lookup_struct("point").expect("point").fields.is_none());
        let def = env.struct_definition("point").expect("definition");
        assert_eq!(def.field("x"), Some(&Type::Int));
        assert_eq!(def.field("y"), None);
    }

    #[test]
    fn test_display_lists_oldest_first() {
        let env = GlobalEnv::initial("main").extend(function(
            "f",
            FunSig::new(Type::Void, vec![("p".into(), Type::pointer_to(Type::Int))]),
            true,
        ));
        assert_eq!(
            env.to_string(),
            "int main();    [builtin]\nvoid f(int* p) { ... }    [program]\n"
        );
    }
}
