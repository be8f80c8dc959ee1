//! Local variable scopes

use std::collections::HashMap;

use crate::syntax::Type;

/// Variables visible inside a function body
///
/// Parameters live in the outermost scope; every block pushes a child.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: HashMap<String, Type>,
    parent: Option<Box<Scope>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`; fails if any enclosing scope already has it
    pub fn define(&mut self, name: &str, ty: Type) -> Result<(), String> {
        if self.lookup(name).is_some() {
            return Err(format!("variable '{name}' is already declared"));
        }
        self.vars.insert(name.to_string(), ty);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Type> {
        if let Some(ty) = self.vars.get(name) {
            Some(ty)
        } else if let Some(parent) = &self.parent {
            parent.lookup(name)
        } else {
            None
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Push a new child scope
    pub fn push_child(&mut self) {
        let old_scope = std::mem::take(self);
        self.parent = Some(Box::new(old_scope));
    }

    /// Drop the innermost scope
    pub fn pop_to_parent(&mut self) -> bool {
        if let Some(parent) = self.parent.take() {
            *self = *parent;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_scope_sees_parent() {
        let mut scope = Scope::new();
        scope.define("x", Type::Int).unwrap();
        scope.push_child();
        scope.define("y", Type::Bool).unwrap();
        assert_eq!(scope.lookup("x"), Some(&Type::Int));

        assert!(scope.pop_to_parent());
        assert!(!scope.contains("y"));
        assert!(scope.contains("x"));
        assert!(!scope.pop_to_parent());
    }

    #[test]
    fn test_no_shadowing() {
        let mut scope = Scope::new();
        scope.define("x", Type::Int).unwrap();
        scope.push_child();
        assert!(scope.define("x", Type::Bool).is_err());
    }
}
