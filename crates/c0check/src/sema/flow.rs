//! Control-flow analysis of function bodies
//!
//! Runs after type checking. Tracks which variables are definitely
//! initialized, rejects assignments to parameters that postconditions
//! depend on, and decides whether every path ends in `return` or `error`.
//! Loops are never assumed to run, so a return inside a loop body does
//! not count.

use std::collections::BTreeSet;

use super::free_vars::{visit_names, NameRef};
use crate::common::{CheckError, CheckResult, Span};
use crate::syntax::{AssignOp, Expr, ExprKind, Stmt, StmtKind};

/// Result of analyzing one body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowSummary {
    /// Every control path returns a value or aborts
    pub returns: bool,
    /// Functions called or whose address is taken
    pub called: BTreeSet<String>,
}

#[derive(Debug, Clone)]
struct State {
    declared: BTreeSet<String>,
    defined: BTreeSet<String>,
    returns: bool,
}

impl State {
    /// After a return everything is vacuously initialized
    fn terminate(&mut self) {
        self.defined = self.declared.clone();
        self.returns = true;
    }

    fn merge(mut self, other: State) -> State {
        self.defined = match (self.returns, other.returns) {
            (true, false) => other.defined,
            (false, true) => self.defined,
            _ => self.defined.intersection(&other.defined).cloned().collect(),
        };
        self.returns = self.returns && other.returns;
        self
    }
}

struct Analyzer<'a> {
    constants: &'a BTreeSet<String>,
    called: BTreeSet<String>,
}

/// Analyze `body`
///
/// `defined` holds the variables initialized on entry (the parameters),
/// `declared` every variable in scope on entry, and `constants` the
/// parameters that may not be assigned.
pub fn analyze(
    defined: &BTreeSet<String>,
    constants: &BTreeSet<String>,
    declared: &BTreeSet<String>,
    body: &[Stmt],
) -> CheckResult<FlowSummary> {
    let mut analyzer = Analyzer {
        constants,
        called: BTreeSet::new(),
    };
    let state = State {
        declared: declared.clone(),
        defined: defined.clone(),
        returns: false,
    };
    let state = analyzer.stmts(body, state)?;
    Ok(FlowSummary {
        returns: state.returns,
        called: analyzer.called,
    })
}

impl Analyzer<'_> {
    fn stmts(&mut self, stmts: &[Stmt], mut state: State) -> CheckResult<State> {
        for stmt in stmts {
            let returned = state.returns;
            state = self.stmt(stmt, state)?;
            // Unreachable code cannot undo an earlier return
            state.returns |= returned;
        }
        Ok(state)
    }

    fn stmt(&mut self, stmt: &Stmt, mut state: State) -> CheckResult<State> {
        match &stmt.kind {
            StmtKind::Decl { name, init, .. } => {
                if let Some(init) = init {
                    self.uses(init, &state)?;
                }
                state.declared.insert(name.clone());
                if init.is_some() {
                    state.defined.insert(name.clone());
                } else {
                    state.defined.remove(name);
                }
            }
            StmtKind::Assign { op, target, value } => {
                self.uses(value, &state)?;
                self.assign(target, *op != AssignOp::Assign, &mut state, stmt.span)?;
            }
            StmtKind::PostIncrement(target) | StmtKind::PostDecrement(target) => {
                self.assign(target, true, &mut state, stmt.span)?;
            }
            StmtKind::Expr(expr) | StmtKind::Assert(expr) => self.uses(expr, &state)?,
            StmtKind::Empty | StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Block(block) => {
                let after = self.stmts(&block.stmts, state.clone())?;
                state = leave_scope(&state, after);
            }
            StmtKind::If { condition, then_branch, else_branch } => {
                self.uses(condition, &state)?;
                let then_state = self.stmt(then_branch, state.clone())?;
                let else_state = match else_branch {
                    Some(branch) => self.stmt(branch, state.clone())?,
                    None => state.clone(),
                };
                state = leave_scope(&state, then_state.merge(else_state));
            }
            StmtKind::While { condition, invariants, body } => {
                self.uses(condition, &state)?;
                for invariant in invariants {
                    self.uses(invariant, &state)?;
                }
                self.stmt(body, state.clone())?;
            }
            StmtKind::For { init, condition, update, invariants, body } => {
                let mut inner = match init {
                    Some(init) => self.stmt(init, state.clone())?,
                    None => state.clone(),
                };
                self.uses(condition, &inner)?;
                for invariant in invariants {
                    self.uses(invariant, &inner)?;
                }
                let after_body = self.stmt(body, inner.clone())?;
                if let Some(update) = update {
                    self.stmt(update, after_body)?;
                }
                inner.returns = state.returns;
                state = leave_scope(&state, inner);
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.uses(value, &state)?;
                }
                state.terminate();
            }
            StmtKind::Error(message) => {
                self.uses(message, &state)?;
                state.terminate();
            }
        }
        Ok(state)
    }

    /// Record an assignment to `target`; `reads` when the old value is used
    fn assign(&mut self, target: &Expr, reads: bool, state: &mut State, span: Span) -> CheckResult<()> {
        match &target.kind {
            ExprKind::Identifier(name) => {
                if self.constants.contains(name) {
                    return Err(CheckError::flow(
                        format!("cannot assign to parameter '{name}', which @ensures refers to"),
                        span,
                    ));
                }
                if reads {
                    self.uses(target, state)?;
                }
                state.defined.insert(name.clone());
                Ok(())
            }
            _ => self.uses(target, state),
        }
    }

    fn uses(&mut self, expr: &Expr, state: &State) -> CheckResult<()> {
        let mut uninitialized = None;
        visit_names(expr, &mut |name| match name {
            NameRef::Variable(var) => {
                if uninitialized.is_none() && state.declared.contains(var) && !state.defined.contains(var) {
                    uninitialized = Some(var.to_string());
                }
            }
            NameRef::Function(function) => {
                self.called.insert(function.to_string());
            }
        });
        match uninitialized {
            Some(var) => Err(CheckError::flow(
                format!("variable '{var}' may be used before it is initialized"),
                expr.span,
            )),
            None => Ok(()),
        }
    }
}

/// State after a nested scope: its locals are gone, what it initialized
/// in the outer scope stays
fn leave_scope(outer: &State, inner: State) -> State {
    let defined = if inner.returns {
        outer.declared.clone()
    } else {
        inner.defined.intersection(&outer.declared).cloned().collect()
    };
    State {
        declared: outer.declared.clone(),
        defined,
        returns: inner.returns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{DeclKind, Parser};
    use pretty_assertions::assert_eq;

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn analyze_function(source: &str, constants: &[&str]) -> CheckResult<FlowSummary> {
        let unit = Parser::new(source).unwrap().parse().unwrap();
        let DeclKind::Function(func) = &unit.declarations[0].kind else {
            panic!("expected a function");
        };
        let params: BTreeSet<String> = func.signature.params.iter().map(|p| p.name.clone()).collect();
        let body = func.body.as_ref().expect("body");
        analyze(&params, &names(constants), &params, &body.stmts)
    }

    fn returns(source: &str) -> bool {
        analyze_function(source, &[]).unwrap().returns
    }

    #[test]
    fn test_straight_line_return() {
        assert!(returns("int f(int x) { return x; }"));
        assert!(!returns("int f(int x) { x = 1; }"));
    }

    #[test]
    fn test_return_in_one_branch_only() {
        assert!(!returns("int f(int x) { if (x > 0) return 1; }"));
        assert!(returns("int f(int x) { if (x > 0) return 1; else return 2; }"));
        assert!(returns("int f(int x) { if (x > 0) return 1; return 2; }"));
    }

    #[test]
    fn test_loops_do_not_count() {
        assert!(!returns("int f() { while (true) { return 1; } }"));
        assert!(!returns("int f() { for (int i = 0; i < 3; i++) return i; }"));
    }

    #[test]
    fn test_error_terminates() {
        assert!(returns("int f(int x) { if (x > 0) return 1; error(\"negative\"); }"));
    }

    #[test]
    fn test_nested_block_return() {
        assert!(returns("int f() { { return 1; } }"));
    }

    #[test]
    fn test_use_before_initialization() {
        let err = analyze_function("int f() { int x; return x; }", &[]).unwrap_err();
        assert_eq!(err.message(), "variable 'x' may be used before it is initialized");

        assert!(analyze_function("int f(bool b) { int x; if (b) x = 1; else x = 2; return x; }", &[]).is_ok());
        assert!(analyze_function("int f(bool b) { int x; if (b) x = 1; return x; }", &[]).is_err());
        assert!(analyze_function("int f(bool b) { int x; if (b) return 0; else x = 2; return x; }", &[]).is_ok());
        assert!(analyze_function("int f() { int x; x++; return x; }", &[]).is_err());
    }

    #[test]
    fn test_loop_initialization_is_not_trusted() {
        let source = "int f() { int x; while (true) { x = 1; } return x; }";
        assert!(analyze_function(source, &[]).is_err());
    }

    #[test]
    fn test_constants_cannot_be_assigned() {
        let source = "int f(int x) { x = x + 1; return x; }";
        assert!(analyze_function(source, &[]).is_ok());
        let err = analyze_function(source, &["x"]).unwrap_err();
        assert!(matches!(err, CheckError::Flow { .. }));
        assert!(err.message().contains("'x'"));
    }

    #[test]
    fn test_called_functions_collected() {
        let source = "int f(int x) {
            if (x > 0) return g(x) + h(1);
            while (p(x)) { x = k(x); }
            //@assert q(x);
            return 0;
        }";
        let summary = analyze_function(source, &[]).unwrap();
        assert_eq!(summary.called, names(&["g", "h", "k", "p", "q"]));
    }

    #[test]
    fn test_unreachable_code_is_still_scanned() {
        let summary = analyze_function("int f() { return 0; g(); }", &[]).unwrap();
        assert!(summary.returns);
        assert!(summary.called.contains("g"));
    }
}
