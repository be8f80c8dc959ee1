//! Expression type checking
//!
//! Bidirectional: `infer` synthesizes a type, `check` compares against an
//! expected one. `&f` only has a type when checked against a function
//! pointer type.

use super::env::{FunSig, GlobalEnv};
use super::scope::Scope;
use super::types::{assignable, join, resolve_type, Position};
use crate::common::{CheckError, CheckResult, Span};
use crate::syntax::{BinaryOp, Expr, ExprKind, Type, UnaryOp};

/// What kind of expression is being checked
#[derive(Debug, Clone, PartialEq)]
pub enum Context {
    /// Statement or loop condition inside a body
    Code,
    /// `@requires`
    Requires,
    /// `@ensures` of a function returning the given type
    Ensures(Type),
    /// `@assert` and `@loop_invariant`
    Assertion,
}

impl Context {
    fn is_contract(&self) -> bool {
        !matches!(self, Context::Code)
    }
}

/// Type checker for expressions over a fixed environment and scope
pub struct ExprChecker<'a> {
    env: &'a GlobalEnv,
    locals: &'a Scope,
    context: Context,
}

impl<'a> ExprChecker<'a> {
    pub fn new(env: &'a GlobalEnv, locals: &'a Scope, context: Context) -> Self {
        Self { env, locals, context }
    }

    /// Check `expr` has a type usable where `expected` is required
    pub fn check(&self, expr: &Expr, expected: &Type) -> CheckResult<()> {
        if let ExprKind::AddrOf(name) = &expr.kind {
            return self.check_address_of(name, expected, expr.span);
        }
        let actual = self.infer(expr)?;
        if assignable(expected, &actual) {
            Ok(())
        } else {
            Err(mismatch(expected, &actual, expr.span))
        }
    }

    /// Synthesize the type of `expr`
    pub fn infer(&self, expr: &Expr) -> CheckResult<Type> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::IntLiteral(_) => Ok(Type::Int),
            ExprKind::BoolLiteral(_) => Ok(Type::Bool),
            ExprKind::CharLiteral(_) => Ok(Type::Char),
            ExprKind::StringLiteral(_) => Ok(Type::String),
            ExprKind::Null => Ok(Type::Null),

            ExprKind::Identifier(name) => self.variable(name, span),

            ExprKind::Result => match &self.context {
                Context::Ensures(ty) if ty.is_void() => Err(CheckError::type_error(
                    "\\result cannot be used in a function returning void",
                    span,
                )),
                Context::Ensures(ty) => Ok(ty.clone()),
                _ => Err(CheckError::type_error("\\result is only allowed in @ensures", span)),
            },

            ExprKind::Length(array) => {
                if !self.context.is_contract() {
                    return Err(CheckError::type_error(
                        "\\length is only allowed in annotations",
                        span,
                    ));
                }
                match self.infer(array)? {
                    Type::Array(_) => Ok(Type::Int),
                    other => Err(CheckError::type_error(
                        format!("\\length expects an array, found '{other}'"),
                        array.span,
                    )),
                }
            }

            ExprKind::Binary { op, left, right } => self.binary(*op, left, right, span),

            ExprKind::Unary { op, operand } => {
                let ty = match op {
                    UnaryOp::Not => Type::Bool,
                    UnaryOp::Neg | UnaryOp::BitNot => Type::Int,
                };
                self.check(operand, &ty)?;
                Ok(ty)
            }

            ExprKind::Ternary { condition, then_expr, else_expr } => {
                self.check(condition, &Type::Bool)?;
                let then_ty = self.infer(then_expr)?;
                let else_ty = self.infer(else_expr)?;
                match join(&then_ty, &else_ty) {
                    Some(ty) if ty.is_small() => Ok(ty),
                    Some(ty) => Err(CheckError::type_error(
                        format!("conditional expression cannot have type '{ty}'"),
                        span,
                    )),
                    None => Err(CheckError::type_error(
                        format!("branches of conditional have types '{then_ty}' and '{else_ty}'"),
                        span,
                    )),
                }
            }

            ExprKind::Call { name, args } => {
                if self.locals.contains(name) {
                    return Err(CheckError::type_error(
                        format!("'{name}' is a variable, not a function"),
                        span,
                    ));
                }
                let Some(entry) = self.env.lookup_function(name) else {
                    return Err(CheckError::type_error(format!("undeclared function '{name}'"), span));
                };
                self.arguments(name, &entry.sig, args, span)?;
                Ok(entry.sig.return_type.clone())
            }

            ExprKind::PtrCall { callee, args } => {
                let callee_ty = self.infer(callee)?;
                let Type::Pointer(inner) = &callee_ty else {
                    return Err(CheckError::type_error(
                        format!("cannot call through non-pointer type '{callee_ty}'"),
                        callee.span,
                    ));
                };
                let Type::Function(fn_type) = inner.as_ref() else {
                    return Err(CheckError::type_error(
                        format!("cannot call through '{callee_ty}', which does not point to a function"),
                        callee.span,
                    ));
                };
                let Some(entry) = self.env.lookup_function_type(fn_type) else {
                    return Err(CheckError::type_error(
                        format!("unknown function type '{fn_type}'"),
                        callee.span,
                    ));
                };
                self.arguments(fn_type, &entry.sig, args, span)?;
                Ok(entry.sig.return_type.clone())
            }

            ExprKind::AddrOf(name) => Err(CheckError::type_error(
                format!("cannot infer the type of &{name}; use it where a function pointer is expected"),
                span,
            )),

            ExprKind::Deref(pointer) => match self.infer(pointer)? {
                Type::Pointer(inner) if matches!(*inner, Type::Function(_)) => Err(
                    CheckError::type_error("function pointers can only be dereferenced to call them", span),
                ),
                Type::Pointer(inner) => Ok(*inner),
                Type::Null => Err(CheckError::type_error("cannot dereference NULL", span)),
                other => Err(CheckError::type_error(
                    format!("cannot dereference non-pointer type '{other}'"),
                    span,
                )),
            },

            ExprKind::Member { object, field } => match self.infer(object)? {
                Type::Struct(name) => self.field(&name, field, span),
                other => Err(CheckError::type_error(
                    format!("'.{field}' applied to non-struct type '{other}'"),
                    span,
                )),
            },

            ExprKind::PtrMember { pointer, field } => match self.infer(pointer)? {
                Type::Pointer(inner) => match *inner {
                    Type::Struct(name) => self.field(&name, field, span),
                    other => Err(CheckError::type_error(
                        format!("'->{field}' applied to pointer to non-struct type '{other}'"),
                        span,
                    )),
                },
                other => Err(CheckError::type_error(
                    format!("'->{field}' applied to non-pointer type '{other}'"),
                    span,
                )),
            },

            ExprKind::Index { array, index } => {
                let array_ty = self.infer(array)?;
                let Type::Array(element) = array_ty else {
                    return Err(CheckError::type_error(
                        format!("cannot index into non-array type '{array_ty}'"),
                        array.span,
                    ));
                };
                self.check(index, &Type::Int)?;
                Ok(*element)
            }

            ExprKind::Alloc(ty) => {
                let ty = self.allocated(ty, span)?;
                Ok(Type::pointer_to(ty))
            }

            ExprKind::AllocArray { ty, count } => {
                let ty = self.allocated(ty, span)?;
                self.check(count, &Type::Int)?;
                Ok(Type::array_of(ty))
            }
        }
    }

    fn variable(&self, name: &str, span: Span) -> CheckResult<Type> {
        if let Some(ty) = self.locals.lookup(name) {
            return Ok(ty.clone());
        }
        let message = if self.env.lookup_function(name).is_some() {
            format!("function '{name}' used as a value; call it or take its address")
        } else {
            format!("undeclared variable '{name}'")
        };
        Err(CheckError::type_error(message, span))
    }

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr, span: Span) -> CheckResult<Type> {
        match op {
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::Shl
            | BinaryOp::Shr => {
                self.check(left, &Type::Int)?;
                self.check(right, &Type::Int)?;
                Ok(Type::Int)
            }
            BinaryOp::LogAnd | BinaryOp::LogOr => {
                self.check(left, &Type::Bool)?;
                self.check(right, &Type::Bool)?;
                Ok(Type::Bool)
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                let ty = self.infer(left)?;
                if !matches!(ty, Type::Int | Type::Char) {
                    return Err(CheckError::type_error(
                        format!("'{}' compares int or char, found '{ty}'", op.symbol()),
                        left.span,
                    ));
                }
                self.check(right, &ty)?;
                Ok(Type::Bool)
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let left_ty = self.infer(left)?;
                let right_ty = self.infer(right)?;
                match join(&left_ty, &right_ty) {
                    Some(Type::String) => Err(CheckError::type_error(
                        "strings cannot be compared with '==' or '!='",
                        span,
                    )),
                    Some(ty) if ty.is_small() => Ok(Type::Bool),
                    _ => Err(CheckError::type_error(
                        format!("cannot compare '{left_ty}' with '{right_ty}'"),
                        span,
                    )),
                }
            }
        }
    }

    fn arguments(&self, callee: &str, sig: &FunSig, args: &[Expr], span: Span) -> CheckResult<()> {
        if args.len() != sig.params.len() {
            return Err(CheckError::type_error(
                format!(
                    "'{callee}' expects {} argument(s), {} given",
                    sig.params.len(),
                    args.len()
                ),
                span,
            ));
        }
        for (arg, expected) in args.iter().zip(sig.param_types()) {
            self.check(arg, expected)?;
        }
        Ok(())
    }

    fn check_address_of(&self, name: &str, expected: &Type, span: Span) -> CheckResult<()> {
        let Some(function) = self.env.lookup_function(name) else {
            return Err(CheckError::type_error(format!("undeclared function '{name}'"), span));
        };
        let target = match expected {
            Type::Pointer(inner) => match inner.as_ref() {
                Type::Function(fn_type) => self.env.lookup_function_type(fn_type),
                _ => None,
            },
            _ => None,
        };
        let Some(target) = target else {
            return Err(CheckError::type_error(
                format!("&{name} used where '{expected}' is expected"),
                span,
            ));
        };
        if function.sig.same_shape(&target.sig) {
            Ok(())
        } else {
            Err(CheckError::type_error(
                format!(
                    "function '{name}' has signature {} which does not match function type '{}'",
                    function.sig, target.name
                ),
                span,
            ))
        }
    }

    fn field(&self, struct_name: &str, field: &str, span: Span) -> CheckResult<Type> {
        let Some(def) = self.env.struct_definition(struct_name) else {
            return Err(CheckError::type_error(
                format!("struct '{struct_name}' is not defined"),
                span,
            ));
        };
        def.field(field).cloned().ok_or_else(|| {
            CheckError::type_error(format!("struct '{struct_name}' has no field '{field}'"), span)
        })
    }

    fn allocated(&self, ty: &Type, span: Span) -> CheckResult<Type> {
        let ty = resolve_type(self.env, ty, Position::Alloc, span)?;
        if let Type::Struct(name) = &ty {
            if self.env.struct_definition(name).is_none() {
                return Err(CheckError::type_error(
                    format!("cannot allocate undefined struct '{name}'"),
                    span,
                ));
            }
        }
        Ok(ty)
    }
}

fn mismatch(expected: &Type, actual: &Type, span: Span) -> CheckError {
    CheckError::type_error(format!("expected '{expected}', found '{actual}'"), span)
}
