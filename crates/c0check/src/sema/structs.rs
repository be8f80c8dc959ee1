//! Struct declarations

use std::collections::HashSet;

use super::env::{GlobalEnv, Origin, StructEntry};
use super::types::{resolve_type, Position};
use crate::common::{CheckError, CheckResult};
use crate::syntax::{StructDecl, Type};

/// Validate a struct declaration against `env`
///
/// Forward declarations always succeed, before or after the definition.
/// A definition needs distinct field names, well-formed field types and
/// every struct it embeds by value to be defined already.
pub fn check_struct(env: &GlobalEnv, decl: &StructDecl, origin: Origin) -> CheckResult<StructEntry> {
    let Some(fields) = &decl.fields else {
        return Ok(StructEntry {
            name: decl.name.clone(),
            fields: None,
            origin,
            span: decl.span,
        });
    };

    if env.struct_definition(&decl.name).is_some() {
        return Err(CheckError::struct_error(
            format!("struct '{}' is already defined", decl.name),
            decl.span,
        ));
    }

    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(fields.len());
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(CheckError::struct_error(
                format!("field '{}' appears more than once in struct '{}'", field.name, decl.name),
                field.span,
            ));
        }
        let ty = resolve_type(env, &field.ty, Position::Field, field.span)?;
        if let Type::Struct(inner) = &ty {
            if *inner == decl.name {
                return Err(CheckError::struct_error(
                    format!("struct '{inner}' cannot contain itself"),
                    field.span,
                ));
            }
            if env.struct_definition(inner).is_none() {
                return Err(CheckError::struct_error(
                    format!("struct '{inner}' is used as a field type before it is defined"),
                    field.span,
                ));
            }
        }
        resolved.push((field.name.clone(), ty));
    }

    Ok(StructEntry {
        name: decl.name.clone(),
        fields: Some(resolved),
        origin,
        span: decl.span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Span;
    use crate::sema::env::Binding;
    use crate::syntax::Field;

    fn field(name: &str, ty: Type) -> Field {
        Field::new(name.into(), ty, Span::default())
    }

    fn definition(name: &str, fields: Vec<Field>) -> StructDecl {
        StructDecl::new(name.into(), Some(fields), Span::default())
    }

    #[test]
    fn test_linked_list_node() {
        let decl = definition(
            "node",
            vec![
                field("data", Type::Int),
                field("next", Type::pointer_to(Type::Struct("node".into()))),
            ],
        );
        let entry = check_struct(&GlobalEnv::empty(), &decl, Origin::Program).unwrap();
        assert_eq!(entry.field("data"), Some(&Type::Int));
    }

    #[test]
    fn test_forward_declaration_after_definition() {
        let defined = check_struct(
            &GlobalEnv::empty(),
            &definition("s", vec![field("x", Type::Int)]),
            Origin::Program,
        )
        .unwrap();
        let env = GlobalEnv::empty().extend(Binding::Struct(defined));
        let forward = StructDecl::new("s".into(), None, Span::default());
        assert!(check_struct(&env, &forward, Origin::Program).is_ok());
        assert!(check_struct(&env, &definition("s", vec![]), Origin::Program).is_err());
    }

    #[test]
    fn test_duplicate_field() {
        let decl = definition("s", vec![field("x", Type::Int), field("x", Type::Bool)]);
        let err = check_struct(&GlobalEnv::empty(), &decl, Origin::Program).unwrap_err();
        assert!(err.message().contains("more than once"));
    }

    #[test]
    fn test_embedded_struct_must_be_defined() {
        let decl = definition("outer", vec![field("inner", Type::Struct("inner".into()))]);
        assert!(check_struct(&GlobalEnv::empty(), &decl, Origin::Program).is_err());

        let recursive = definition("s", vec![field("me", Type::Struct("s".into()))]);
        assert!(check_struct(&GlobalEnv::empty(), &recursive, Origin::Program).is_err());
    }
}
