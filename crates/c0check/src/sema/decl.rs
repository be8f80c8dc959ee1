//! Checking one top-level declaration against the global environment

use std::collections::BTreeSet;
use std::rc::Rc;

use super::env::{Binding, FunEntry, FunSig, FunTypeEntry, GlobalEnv, Origin, TypeEntry};
use super::expr::{Context, ExprChecker};
use super::flow;
use super::free_vars::{called_functions, free_functions, free_vars};
use super::params::{build_param_env, ParamEnv};
use super::stmt::{check_stmts, Mode};
use super::structs::check_struct;
use super::types::{resolve_type, Position};
use crate::common::{CheckError, CheckResult, Diagnostics, Span};
use crate::syntax::{DeclKind, Declaration, FuncDecl, FunctionTypeDef, Signature, Type, TypeDef};

/// Outcome of a declaration whose name and signature were accepted
#[derive(Debug, Clone, Default)]
pub struct Checked {
    /// Functions mentioned by contracts and, for definitions, by the body
    pub functions_used: BTreeSet<String>,
    /// What to add to the environment, if anything
    pub binding: Option<Binding>,
}

/// Checker for top-level declarations
///
/// Name conflicts and ill-formed signatures make the declaration
/// meaningless and are returned. Everything found once the signature is
/// known (contracts, duplicate definitions, mismatches, body and flow
/// errors, missing returns) is reported to `diagnostics` and the
/// declaration still yields its binding.
pub struct DeclChecker<'a> {
    env: &'a GlobalEnv,
    origin: Origin,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> DeclChecker<'a> {
    pub fn new(env: &'a GlobalEnv, origin: Origin, diagnostics: &'a mut Diagnostics) -> Self {
        Self { env, origin, diagnostics }
    }

    pub fn check(&mut self, decl: &Declaration) -> CheckResult<Checked> {
        match &decl.kind {
            DeclKind::Pragma(_) => Ok(Checked::default()),
            DeclKind::Struct(s) => {
                let entry = check_struct(self.env, s, self.origin)?;
                Ok(Checked {
                    functions_used: BTreeSet::new(),
                    binding: Some(Binding::Struct(entry)),
                })
            }
            DeclKind::TypeDef(t) => self.check_typedef(t),
            DeclKind::FunctionTypeDef(t) => self.check_function_typedef(t),
            DeclKind::Function(f) => self.check_function(f),
        }
    }

    fn check_typedef(&mut self, t: &TypeDef) -> CheckResult<Checked> {
        if let Some(previous) = self.previous_type_name(&t.name) {
            return Err(CheckError::duplicate_type(&t.name, t.span, previous));
        }
        if let Some(function) = self.env.lookup_function(&t.name) {
            return Err(CheckError::type_function_conflict(
                format!(
                    "type name '{}' was already {} as a function",
                    t.name,
                    self.function_status(&t.name)
                ),
                t.span,
                function.span,
            ));
        }

        let ty = resolve_type(self.env, &t.ty, Position::Alias, t.span)?;
        Ok(Checked {
            functions_used: BTreeSet::new(),
            binding: Some(Binding::Type(TypeEntry {
                name: t.name.clone(),
                ty,
                origin: self.origin,
                span: t.span,
            })),
        })
    }

    fn check_function_typedef(&mut self, t: &FunctionTypeDef) -> CheckResult<Checked> {
        if let Some(previous) = self.previous_type_name(&t.name) {
            return Err(CheckError::duplicate_function_type(&t.name, t.span, previous));
        }
        if let Some(function) = self.env.lookup_function(&t.name) {
            return Err(CheckError::function_type_function_conflict(
                format!(
                    "function type name '{}' was already {} as a function",
                    t.name,
                    self.function_status(&t.name)
                ),
                t.span,
                function.span,
            ));
        }

        let (sig, params) = self.signature(&t.signature, t.span)?;
        let functions_used = self.contracts(&params, &sig.return_type, &t.signature);
        Ok(Checked {
            functions_used,
            binding: Some(Binding::FunctionType(FunTypeEntry {
                name: t.name.clone(),
                sig: Rc::new(sig),
                origin: self.origin,
                span: t.span,
            })),
        })
    }

    fn check_function(&mut self, f: &FuncDecl) -> CheckResult<Checked> {
        if let Some(entry) = self.env.lookup_type(&f.name) {
            return Err(CheckError::type_function_conflict(
                format!("function '{}' conflicts with type name '{}'", f.name, f.name),
                f.span,
                entry.span,
            ));
        }
        if let Some(entry) = self.env.lookup_function_type(&f.name) {
            return Err(CheckError::function_type_function_conflict(
                format!("function '{}' conflicts with function type name '{}'", f.name, f.name),
                f.span,
                entry.span,
            ));
        }

        let (sig, params) = self.signature(&f.signature, f.span)?;
        let mut functions_used = self.contracts(&params, &sig.return_type, &f.signature);
        let sig = Rc::new(sig);

        let mut keep_body = true;
        let mut record = true;
        if f.is_definition() {
            if let Some(previous) = self.env.lookup_definition(&f.name) {
                self.diagnostics
                    .report(CheckError::duplicate_definition(&f.name, f.span, previous.span));
                keep_body = false;
            }
        }
        if let Some(previous) = self.env.lookup_function(&f.name) {
            if !previous.sig.same_shape(&sig) {
                let error = self.mismatch(f, &sig, previous);
                self.diagnostics.report(error);
                record = false;
            }
        }

        if let Some(body) = &f.body {
            // The body may call the function itself
            let recursive = self.env.extend(Binding::Function(FunEntry {
                name: f.name.clone(),
                sig: Rc::clone(&sig),
                body: None,
                origin: self.origin,
                span: f.span,
            }));
            let constants = ensures_constants(&params, &f.signature);
            let summary = check_stmts(&recursive, &params.scope, &body.stmts, &sig.return_type, Mode::Body)
                .and_then(|()| flow::analyze(&params.names, &constants, &params.names, &body.stmts));
            match summary {
                Ok(summary) => {
                    if !sig.return_type.is_void() && !summary.returns {
                        self.diagnostics.report(CheckError::missing_return(&f.name, f.span));
                    }
                    functions_used.extend(summary.called);
                }
                Err(error) => {
                    self.diagnostics.report(error);
                    // Undeclared callees were the error itself
                    functions_used.extend(
                        called_functions(&body.stmts)
                            .into_iter()
                            .filter(|name| recursive.lookup_function(name).is_some()),
                    );
                }
            }
        }

        log::trace!(
            "{} '{}' uses {:?}",
            if f.is_definition() { "definition" } else { "declaration" },
            f.name,
            functions_used
        );

        let binding = record.then(|| {
            Binding::Function(FunEntry {
                name: f.name.clone(),
                sig,
                body: f.body.clone().filter(|_| keep_body).map(Rc::new),
                origin: self.origin,
                span: f.span,
            })
        });
        Ok(Checked { functions_used, binding })
    }

    /// Resolve a return type and build the parameter environment
    fn signature(&self, signature: &Signature, span: Span) -> CheckResult<(FunSig, ParamEnv)> {
        let return_type = resolve_type(self.env, &signature.return_type, Position::Return, span)?;
        let params = build_param_env(self.env, &signature.params)?;
        Ok((FunSig::new(return_type, params.params.clone()), params))
    }

    /// Check the contracts, reporting the first failure
    ///
    /// A contract that fails contributes no functions.
    fn contracts(&mut self, params: &ParamEnv, return_type: &Type, signature: &Signature) -> BTreeSet<String> {
        match check_contracts(self.env, params, return_type, signature) {
            Ok(used) => used,
            Err(error) => {
                self.diagnostics.report(error);
                BTreeSet::new()
            }
        }
    }

    /// Span of an earlier type or function type with this name
    fn previous_type_name(&self, name: &str) -> Option<Span> {
        self.env
            .lookup_type(name)
            .map(|entry| entry.span)
            .or_else(|| self.env.lookup_function_type(name).map(|entry| entry.span))
    }

    fn function_status(&self, name: &str) -> &'static str {
        if self.env.lookup_definition(name).is_some() {
            "defined"
        } else {
            "declared"
        }
    }

    fn mismatch(&self, f: &FuncDecl, sig: &FunSig, previous: &FunEntry) -> CheckError {
        let this = if f.is_definition() { "definition" } else { "declaration" };
        let where_from = match previous.origin {
            Origin::Builtin => format!(" (the entry point must be 'int {}()')", previous.name),
            Origin::Library => " in the library".to_string(),
            Origin::Program => String::new(),
        };
        CheckError::signature_mismatch(
            format!(
                "{this} of '{}' as {} does not match the previous {}{where_from} as {}",
                f.name,
                sig,
                previous.describe(),
                previous.sig
            ),
            f.span,
            previous.span,
        )
    }
}

/// Check `@requires` and `@ensures` and collect the functions they call
///
/// Contracts see only the parameters. Preconditions are checked in the
/// requires context, postconditions in the ensures context so that
/// `\result` has the return type.
pub fn check_contracts(
    env: &GlobalEnv,
    params: &ParamEnv,
    return_type: &Type,
    signature: &Signature,
) -> CheckResult<BTreeSet<String>> {
    let requires = ExprChecker::new(env, &params.scope, Context::Requires);
    for condition in &signature.requires {
        requires.check(condition, &Type::Bool)?;
    }
    let ensures = ExprChecker::new(env, &params.scope, Context::Ensures(return_type.clone()));
    for condition in &signature.ensures {
        ensures.check(condition, &Type::Bool)?;
    }

    Ok(signature
        .requires
        .iter()
        .chain(&signature.ensures)
        .flat_map(|condition| free_functions(condition, &params.names))
        .collect())
}

/// Parameters that postconditions mention; the body may not assign them
fn ensures_constants(params: &ParamEnv, signature: &Signature) -> BTreeSet<String> {
    signature
        .ensures
        .iter()
        .flat_map(free_vars)
        .filter(|name| params.names.contains(name))
        .collect()
}

/// Check one declaration
pub fn check_declaration(
    env: &GlobalEnv,
    decl: &Declaration,
    origin: Origin,
    diagnostics: &mut Diagnostics,
) -> CheckResult<Checked> {
    DeclChecker::new(env, origin, diagnostics).check(decl)
}
