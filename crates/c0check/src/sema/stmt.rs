//! Statement type checking

use super::env::GlobalEnv;
use super::expr::{Context, ExprChecker};
use super::scope::Scope;
use super::types::{resolve_type, Position};
use crate::common::{CheckError, CheckResult};
use crate::syntax::{AssignOp, Expr, ExprKind, Stmt, StmtKind, Type};

/// How a statement list relates to the scope it is given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A function body: declarations land next to the parameters
    Body,
    /// A nested block: declarations go in a fresh child scope
    Block,
}

/// Type checker for one function body
pub struct StmtChecker<'a> {
    env: &'a GlobalEnv,
    scope: Scope,
    return_type: Type,
    loop_depth: usize,
}

impl<'a> StmtChecker<'a> {
    pub fn new(env: &'a GlobalEnv, locals: &Scope, return_type: &Type) -> Self {
        Self {
            env,
            scope: locals.clone(),
            return_type: return_type.clone(),
            loop_depth: 0,
        }
    }

    /// Check `stmts` in order under `mode`
    pub fn check_body(&mut self, stmts: &[Stmt], mode: Mode) -> CheckResult<()> {
        if mode == Mode::Block {
            self.scope.push_child();
        }
        for stmt in stmts {
            self.check_stmt(stmt)?;
        }
        if mode == Mode::Block {
            self.scope.pop_to_parent();
        }
        Ok(())
    }

    fn exprs(&self, context: Context) -> ExprChecker<'_> {
        ExprChecker::new(self.env, &self.scope, context)
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> CheckResult<()> {
        match &stmt.kind {
            StmtKind::Decl { name, ty, init } => {
                let ty = resolve_type(self.env, ty, Position::Variable, stmt.span)?;
                if let Some(init) = init {
                    self.exprs(Context::Code).check(init, &ty)?;
                }
                self.scope
                    .define(name, ty)
                    .map_err(|e| CheckError::type_error(e, stmt.span))?;
            }
            StmtKind::Assign { op, target, value } => {
                let ty = self.lvalue(target)?;
                let expected = if *op == AssignOp::Assign {
                    ty
                } else if ty == Type::Int {
                    Type::Int
                } else {
                    return Err(CheckError::type_error(
                        format!("compound assignment needs an int target, found '{ty}'"),
                        target.span,
                    ));
                };
                self.exprs(Context::Code).check(value, &expected)?;
            }
            StmtKind::PostIncrement(target) | StmtKind::PostDecrement(target) => {
                let ty = self.lvalue(target)?;
                if ty != Type::Int {
                    return Err(CheckError::type_error(
                        format!("++ and -- need an int target, found '{ty}'"),
                        target.span,
                    ));
                }
            }
            StmtKind::Expr(expr) => {
                self.exprs(Context::Code).infer(expr)?;
            }
            StmtKind::Empty => {}
            StmtKind::Block(block) => self.check_body(&block.stmts, Mode::Block)?,
            StmtKind::If { condition, then_branch, else_branch } => {
                self.exprs(Context::Code).check(condition, &Type::Bool)?;
                self.nested(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.nested(else_branch)?;
                }
            }
            StmtKind::While { condition, invariants, body } => {
                self.exprs(Context::Code).check(condition, &Type::Bool)?;
                self.invariants(invariants)?;
                self.loop_body(body)?;
            }
            StmtKind::For { init, condition, update, invariants, body } => {
                self.scope.push_child();
                let result = self.check_for(init.as_deref(), condition, update.as_deref(), invariants, body);
                self.scope.pop_to_parent();
                result?;
            }
            StmtKind::Return(value) => match (value, self.return_type.is_void()) {
                (None, true) => {}
                (Some(value), false) => {
                    let expected = self.return_type.clone();
                    self.exprs(Context::Code).check(value, &expected)?;
                }
                (Some(_), true) => {
                    return Err(CheckError::type_error(
                        "function returning void cannot return a value",
                        stmt.span,
                    ));
                }
                (None, false) => {
                    return Err(CheckError::type_error(
                        format!("return without a value in function returning '{}'", self.return_type),
                        stmt.span,
                    ));
                }
            },
            StmtKind::Break | StmtKind::Continue => {
                if self.loop_depth == 0 {
                    let keyword = if matches!(stmt.kind, StmtKind::Break) { "break" } else { "continue" };
                    return Err(CheckError::type_error(format!("{keyword} outside loop"), stmt.span));
                }
            }
            StmtKind::Assert(condition) => {
                self.exprs(Context::Assertion).check(condition, &Type::Bool)?;
            }
            StmtKind::Error(message) => {
                self.exprs(Context::Code).check(message, &Type::String)?;
            }
        }
        Ok(())
    }

    fn check_for(
        &mut self,
        init: Option<&Stmt>,
        condition: &Expr,
        update: Option<&Stmt>,
        invariants: &[Expr],
        body: &Stmt,
    ) -> CheckResult<()> {
        if let Some(init) = init {
            self.check_stmt(init)?;
        }
        self.exprs(Context::Code).check(condition, &Type::Bool)?;
        if let Some(update) = update {
            if matches!(update.kind, StmtKind::Decl { .. }) {
                return Err(CheckError::type_error(
                    "the update of a for loop cannot declare a variable",
                    update.span,
                ));
            }
            self.check_stmt(update)?;
        }
        self.invariants(invariants)?;
        self.loop_body(body)
    }

    fn invariants(&self, invariants: &[Expr]) -> CheckResult<()> {
        let checker = self.exprs(Context::Assertion);
        for invariant in invariants {
            checker.check(invariant, &Type::Bool)?;
        }
        Ok(())
    }

    fn loop_body(&mut self, body: &Stmt) -> CheckResult<()> {
        self.loop_depth += 1;
        let result = self.nested(body);
        self.loop_depth -= 1;
        result
    }

    /// Branch and loop bodies get their own scope even without braces
    fn nested(&mut self, stmt: &Stmt) -> CheckResult<()> {
        self.scope.push_child();
        let result = self.check_stmt(stmt);
        self.scope.pop_to_parent();
        result
    }

    /// Type of an assignment target
    fn lvalue(&self, target: &Expr) -> CheckResult<Type> {
        let ty = match &target.kind {
            ExprKind::Identifier(name) => match self.scope.lookup(name) {
                Some(ty) => ty.clone(),
                None => return Err(CheckError::type_error(format!("undeclared variable '{name}'"), target.span)),
            },
            ExprKind::Deref(_)
            | ExprKind::Member { .. }
            | ExprKind::PtrMember { .. }
            | ExprKind::Index { .. } => self.exprs(Context::Code).infer(target)?,
            _ => return Err(CheckError::type_error("invalid assignment target", target.span)),
        };
        if ty.is_small() {
            Ok(ty)
        } else {
            Err(CheckError::type_error(
                format!("cannot assign to a location of type '{ty}'"),
                target.span,
            ))
        }
    }
}

/// Check a statement list against `locals` and the function's return type
pub fn check_stmts(
    env: &GlobalEnv,
    locals: &Scope,
    stmts: &[Stmt],
    return_type: &Type,
    mode: Mode,
) -> CheckResult<()> {
    StmtChecker::new(env, locals, return_type).check_body(stmts, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{DeclKind, Parser};

    /// Check the body of the single function in `source` against its
    /// parameters
    fn check_function(source: &str) -> CheckResult<()> {
        let unit = Parser::new(source).unwrap().parse().unwrap();
        let DeclKind::Function(func) = &unit.declarations[0].kind else {
            panic!("expected a function");
        };
        let env = GlobalEnv::initial("main");
        let mut locals = Scope::new();
        for param in &func.signature.params {
            locals.define(&param.name, param.ty.clone()).unwrap();
        }
        let body = func.body.as_ref().expect("body");
        check_stmts(&env, &locals, &body.stmts, &func.signature.return_type, Mode::Body)
    }

    #[test]
    fn test_well_typed_body() {
        let source = "int sum(int[] a, int n) {
            int total = 0;
            for (int i = 0; i < n; i++)
            //@loop_invariant 0 <= i && i <= \\length(a);
            {
                total += a[i];
            }
            //@assert total >= 0 || total < 0;
            return total;
        }";
        assert!(check_function(source).is_ok());
    }

    #[test]
    fn test_return_value_must_match() {
        assert!(check_function("int f() { return true; }").is_err());
        assert!(check_function("void f() { return 1; }").is_err());
        assert!(check_function("int f() { return; }").is_err());
        assert!(check_function("void f() { return; }").is_ok());
    }

    #[test]
    fn test_no_shadowing_of_parameters() {
        let err = check_function("int f(int x) { int x = 2; return x; }").unwrap_err();
        assert_eq!(err.message(), "variable 'x' is already declared");
    }

    #[test]
    fn test_block_locals_go_out_of_scope() {
        assert!(check_function("int f() { { int y = 1; } return y; }").is_err());
        assert!(check_function("int f() { { int y = 1; } int y = 2; return y; }").is_ok());
    }

    #[test]
    fn test_break_outside_loop() {
        assert!(check_function("void f() { break; }").is_err());
        assert!(check_function("void f() { while (true) { break; } }").is_ok());
    }

    #[test]
    fn test_initializer_cannot_mention_itself() {
        assert!(check_function("int f() { int x = x + 1; return x; }").is_err());
    }

    #[test]
    fn test_assignment_targets() {
        assert!(check_function("void f(int[] a) { a[0] = 1; a[1] += 2; a[2]++; }").is_ok());
        assert!(check_function("void f(bool b) { b += 1; }").is_err());
        assert!(check_function("void f(int x) { x + 1 = 2; }").is_err());
    }

    #[test]
    fn test_error_takes_a_string() {
        assert!(check_function("int f() { error(\"unreachable\"); }").is_ok());
        assert!(check_function("int f() { error(3); }").is_err());
    }

    #[test]
    fn test_length_not_allowed_in_code() {
        assert!(check_function("int f(int[] a) { return \\length(a); }").is_err());
    }
}
