//! Names an expression mentions

use std::collections::BTreeSet;

use crate::syntax::{Expr, ExprKind, Stmt, StmtKind};

/// A name occurrence inside an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRef<'a> {
    /// Plain identifier
    Variable(&'a str),
    /// Callee of a direct call, or the operand of `&`
    Function(&'a str),
}

/// Visit every name occurrence in `expr`, left to right
pub fn visit_names<'a>(expr: &'a Expr, f: &mut impl FnMut(NameRef<'a>)) {
    match &expr.kind {
        ExprKind::IntLiteral(_)
        | ExprKind::BoolLiteral(_)
        | ExprKind::CharLiteral(_)
        | ExprKind::StringLiteral(_)
        | ExprKind::Null
        | ExprKind::Result
        | ExprKind::Alloc(_) => {}
        ExprKind::Identifier(name) => f(NameRef::Variable(name)),
        ExprKind::AddrOf(name) => f(NameRef::Function(name)),
        ExprKind::Call { name, args } => {
            f(NameRef::Function(name));
            for arg in args {
                visit_names(arg, f);
            }
        }
        ExprKind::PtrCall { callee, args } => {
            visit_names(callee, f);
            for arg in args {
                visit_names(arg, f);
            }
        }
        ExprKind::Binary { left, right, .. } => {
            visit_names(left, f);
            visit_names(right, f);
        }
        ExprKind::Ternary { condition, then_expr, else_expr } => {
            visit_names(condition, f);
            visit_names(then_expr, f);
            visit_names(else_expr, f);
        }
        ExprKind::Index { array, index } => {
            visit_names(array, f);
            visit_names(index, f);
        }
        ExprKind::Length(inner)
        | ExprKind::Unary { operand: inner, .. }
        | ExprKind::Deref(inner)
        | ExprKind::Member { object: inner, .. }
        | ExprKind::PtrMember { pointer: inner, .. }
        | ExprKind::AllocArray { count: inner, .. } => visit_names(inner, f),
    }
}

/// Every identifier, callee and `&` operand in `expr`
pub fn free_vars(expr: &Expr) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    visit_names(expr, &mut |name| {
        let (NameRef::Variable(name) | NameRef::Function(name)) = name;
        names.insert(name.to_string());
    });
    names
}

/// Free variables of `expr` that are not in `bound`
///
/// In a contract the only variables in scope are the parameters, so once
/// they are removed what is left names functions.
pub fn free_functions(expr: &Expr, bound: &BTreeSet<String>) -> BTreeSet<String> {
    free_vars(expr)
        .into_iter()
        .filter(|name| !bound.contains(name))
        .collect()
}

/// Functions called or addressed anywhere in `stmts`
///
/// A purely syntactic walk, usable on bodies that failed to type check.
pub fn called_functions(stmts: &[Stmt]) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for stmt in stmts {
        visit_stmt_exprs(stmt, &mut |expr| {
            visit_names(expr, &mut |name| {
                if let NameRef::Function(function) = name {
                    names.insert(function.to_string());
                }
            });
        });
    }
    names
}

fn visit_stmt_exprs<'a>(stmt: &'a Stmt, f: &mut impl FnMut(&'a Expr)) {
    match &stmt.kind {
        StmtKind::Decl { init, .. } => init.iter().for_each(|e| f(e)),
        StmtKind::Assign { target, value, .. } => {
            f(target);
            f(value);
        }
        StmtKind::PostIncrement(e)
        | StmtKind::PostDecrement(e)
        | StmtKind::Expr(e)
        | StmtKind::Assert(e)
        | StmtKind::Error(e) => f(e),
        StmtKind::Return(value) => value.iter().for_each(|e| f(e)),
        StmtKind::Empty | StmtKind::Break | StmtKind::Continue => {}
        StmtKind::Block(block) => {
            for inner in &block.stmts {
                visit_stmt_exprs(inner, f);
            }
        }
        StmtKind::If { condition, then_branch, else_branch } => {
            f(condition);
            visit_stmt_exprs(then_branch, f);
            if let Some(branch) = else_branch {
                visit_stmt_exprs(branch, f);
            }
        }
        StmtKind::While { condition, invariants, body } => {
            f(condition);
            invariants.iter().for_each(|e| f(e));
            visit_stmt_exprs(body, f);
        }
        StmtKind::For { init, condition, update, invariants, body } => {
            if let Some(init) = init {
                visit_stmt_exprs(init, f);
            }
            f(condition);
            if let Some(update) = update {
                visit_stmt_exprs(update, f);
            }
            invariants.iter().for_each(|e| f(e));
            visit_stmt_exprs(body, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Parser;
    use pretty_assertions::assert_eq;

    fn contract(source: &str) -> Expr {
        let text = format!("int f(int x, int[] a)\n//@requires {source};\n;");
        let unit = Parser::new(&text).unwrap().parse().unwrap();
        match &unit.declarations[0].kind {
            crate::syntax::DeclKind::Function(func) => func.signature.requires[0].clone(),
            other => panic!("unexpected declaration {other:?}"),
        }
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_free_vars_collects_all_names() {
        let expr = contract("is_sorted(a, 0, x) && g(&h) > \\length(a)");
        assert_eq!(free_vars(&expr), set(&["a", "g", "h", "is_sorted", "x"]));
    }

    #[test]
    fn test_free_functions_removes_parameters() {
        let expr = contract("0 <= x && x <= len(a)");
        assert_eq!(free_functions(&expr, &set(&["a", "x"])), set(&["len"]));
    }

    #[test]
    fn test_visit_distinguishes_calls() {
        let expr = contract("p(x)");
        let mut seen = Vec::new();
        visit_names(&expr, &mut |name| seen.push(name));
        assert_eq!(seen, vec![NameRef::Function("p"), NameRef::Variable("x")]);
    }

    #[test]
    fn test_called_functions_in_statements() {
        let text = "int f(int x) {
            int y = g(x);
            if (y > 0) { while (p(y)) { y = k(y); } } else { error(msg()); }
            for (int i = 0; i < n(); i++) { //@assert q(i);
            }
            return x + y;
        }";
        let unit = Parser::new(text).unwrap().parse().unwrap();
        let crate::syntax::DeclKind::Function(func) = &unit.declarations[0].kind else {
            panic!("expected a function");
        };
        let body = func.body.as_ref().unwrap();
        assert_eq!(called_functions(&body.stmts), set(&["g", "k", "msg", "n", "p", "q"]));
    }
}
