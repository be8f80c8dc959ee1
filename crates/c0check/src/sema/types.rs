//! Type well-formedness and compatibility

use super::env::GlobalEnv;
use crate::common::{CheckError, CheckResult, Span};
use crate::syntax::Type;

/// Where a type is written; decides which resolved types are allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Parameter,
    Return,
    Variable,
    Field,
    /// Right-hand side of a `typedef`
    Alias,
    /// Argument of `alloc` / `alloc_array`
    Alloc,
}

impl Position {
    fn describe(self) -> &'static str {
        match self {
            Position::Parameter => "a parameter type",
            Position::Return => "a return type",
            Position::Variable => "a variable type",
            Position::Field => "a field type",
            Position::Alias => "a type definition",
            Position::Alloc => "an allocation type",
        }
    }
}

/// Resolve type names and check the result is allowed at `position`
///
/// Synonyms are replaced by what they stand for; function type names
/// become [`Type::Function`].
pub fn resolve_type(env: &GlobalEnv, ty: &Type, position: Position, span: Span) -> CheckResult<Type> {
    let resolved = resolve(env, ty, span)?;
    let allowed = match position {
        Position::Parameter | Position::Variable => resolved.is_small(),
        Position::Return => resolved.is_small() || resolved.is_void(),
        Position::Field | Position::Alias | Position::Alloc => {
            !matches!(resolved, Type::Void | Type::Function(_))
        }
    };
    if allowed {
        Ok(resolved)
    } else {
        Err(CheckError::type_error(
            format!("type '{resolved}' is not allowed as {}", position.describe()),
            span,
        ))
    }
}

fn resolve(env: &GlobalEnv, ty: &Type, span: Span) -> CheckResult<Type> {
    match ty {
        Type::Named(name) => {
            if let Some(entry) = env.lookup_type(name) {
                Ok(entry.ty.clone())
            } else if env.lookup_function_type(name).is_some() {
                Ok(Type::Function(name.clone()))
            } else {
                Err(CheckError::type_error(format!("unknown type name '{name}'"), span))
            }
        }
        Type::Pointer(inner) => {
            let inner = resolve(env, inner, span)?;
            if inner.is_void() {
                return Err(CheckError::type_error("pointers to void are not supported", span));
            }
            Ok(Type::pointer_to(inner))
        }
        Type::Array(element) => {
            let element = resolve(env, element, span)?;
            if matches!(element, Type::Void | Type::Function(_)) {
                return Err(CheckError::type_error(
                    format!("arrays of '{element}' are not allowed"),
                    span,
                ));
            }
            Ok(Type::array_of(element))
        }
        Type::Null => Err(CheckError::type_error("NULL is not a type", span)),
        other => Ok(other.clone()),
    }
}

/// Can a value of type `actual` be used where `expected` is required
pub fn assignable(expected: &Type, actual: &Type) -> bool {
    expected == actual || (matches!(actual, Type::Null) && matches!(expected, Type::Pointer(_)))
}

/// Common type of two branches or comparison operands
pub fn join(a: &Type, b: &Type) -> Option<Type> {
    match (a, b) {
        _ if a == b => Some(a.clone()),
        (Type::Null, Type::Pointer(_)) => Some(b.clone()),
        (Type::Pointer(_), Type::Null) => Some(a.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::env::{Binding, FunSig, FunTypeEntry, Origin, TypeEntry};
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn env() -> GlobalEnv {
        GlobalEnv::empty()
            .extend(Binding::Type(TypeEntry {
                name: "num".into(),
                ty: Type::Int,
                origin: Origin::Program,
                span: Span::default(),
            }))
            .extend(Binding::FunctionType(FunTypeEntry {
                name: "cmp".into(),
                sig: Rc::new(FunSig::new(Type::Bool, Vec::new())),
                origin: Origin::Program,
                span: Span::default(),
            }))
    }

    fn resolve_at(ty: Type, position: Position) -> CheckResult<Type> {
        resolve_type(&env(), &ty, position, Span::default())
    }

    #[test]
    fn test_synonyms_resolve_through() {
        let ty = Type::array_of(Type::Named("num".into()));
        assert_eq!(resolve_at(ty, Position::Variable), Ok(Type::array_of(Type::Int)));
    }

    #[test]
    fn test_function_type_only_behind_pointer() {
        let ptr = Type::pointer_to(Type::Named("cmp".into()));
        assert_eq!(
            resolve_at(ptr, Position::Parameter),
            Ok(Type::pointer_to(Type::Function("cmp".into())))
        );
        assert!(resolve_at(Type::Named("cmp".into()), Position::Parameter).is_err());
    }

    #[test]
    fn test_void_only_as_return() {
        assert!(resolve_at(Type::Void, Position::Return).is_ok());
        assert!(resolve_at(Type::Void, Position::Parameter).is_err());
        assert!(resolve_at(Type::pointer_to(Type::Void), Position::Return).is_err());
        assert!(resolve_at(Type::array_of(Type::Void), Position::Variable).is_err());
    }

    #[test]
    fn test_struct_values_only_in_fields_and_alloc() {
        let s = Type::Struct("s".into());
        assert!(resolve_at(s.clone(), Position::Field).is_ok());
        assert!(resolve_at(s.clone(), Position::Alloc).is_ok());
        assert!(resolve_at(s.clone(), Position::Variable).is_err());
        assert!(resolve_at(Type::pointer_to(s), Position::Variable).is_ok());
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = resolve_at(Type::Named("nope".into()), Position::Variable).unwrap_err();
        assert_eq!(err.message(), "unknown type name 'nope'");
    }

    #[test]
    fn test_null_joins_with_pointers() {
        let p = Type::pointer_to(Type::Int);
        assert!(assignable(&p, &Type::Null));
        assert!(!assignable(&Type::Int, &Type::Null));
        assert_eq!(join(&Type::Null, &p), Some(p.clone()));
        assert_eq!(join(&Type::Int, &p), None);
    }
}
