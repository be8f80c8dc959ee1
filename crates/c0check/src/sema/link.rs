//! Whole-program checking
//!
//! Library declarations are folded into the environment first, then the
//! program's. Afterwards every function that was used, plus the entry
//! point, must have been declared and defined somewhere.

use std::collections::BTreeSet;

use super::decl::check_declaration;
use super::env::{GlobalEnv, Origin};
use crate::common::{CheckError, Diagnostics, Span};
use crate::syntax::Declaration;

/// Settings of one checking run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    /// Function every program must define
    pub entry_point: String,
}

impl CheckConfig {
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self { entry_point: entry_point.into() }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self::new("main")
    }
}

/// Result of folding all declarations
#[derive(Debug, Clone)]
pub struct Linked {
    /// Final global environment
    pub env: GlobalEnv,
    /// Functions used anywhere, entry point not included
    pub functions_used: BTreeSet<String>,
}

/// Folds declarations through the checker and runs the closure check
pub struct Linker {
    config: CheckConfig,
    env: GlobalEnv,
    functions_used: BTreeSet<String>,
    diagnostics: Diagnostics,
}

impl Linker {
    pub fn new(config: CheckConfig) -> Self {
        let env = GlobalEnv::initial(&config.entry_point);
        Self {
            config,
            env,
            functions_used: BTreeSet::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Fold `decls` into the environment, in order
    ///
    /// A declaration that fails is reported and left out of the
    /// environment; the fold continues with the next one.
    pub fn add_declarations(&mut self, decls: &[Declaration], origin: Origin) {
        for decl in decls {
            match check_declaration(&self.env, decl, origin, &mut self.diagnostics) {
                Ok(checked) => {
                    self.functions_used.extend(checked.functions_used);
                    if let Some(binding) = checked.binding {
                        log::trace!("bind {}", binding.name());
                        self.env = self.env.extend(binding);
                    }
                }
                Err(error) => self.diagnostics.report(error),
            }
        }
        log::debug!(
            "folded {} {origin} declaration(s); {} binding(s) in scope",
            decls.len(),
            self.env.len()
        );
    }

    /// Run the closure check and hand back the environment with every
    /// diagnostic collected along the way
    pub fn finish(mut self) -> (Linked, Diagnostics) {
        let mut required = self.functions_used.clone();
        required.insert(self.config.entry_point.clone());

        for name in &required {
            match self.env.lookup_function(name) {
                None => self
                    .diagnostics
                    .report(CheckError::undefined_function(name, Span::builtin())),
                Some(entry) if self.env.lookup_definition(name).is_none() => {
                    let error = if *name == self.config.entry_point {
                        CheckError::entry_never_defined(name, entry.span)
                    } else {
                        CheckError::never_defined(name, entry.span)
                    };
                    self.diagnostics.report(error);
                }
                Some(_) => {}
            }
        }
        log::info!(
            "checked {} required function(s), {} error(s)",
            required.len(),
            self.diagnostics.len()
        );

        let linked = Linked {
            env: self.env,
            functions_used: self.functions_used,
        };
        (linked, self.diagnostics)
    }

    /// Check a library followed by a program
    pub fn run(mut self, library: &[Declaration], program: &[Declaration]) -> (Linked, Diagnostics) {
        self.add_declarations(library, Origin::Library);
        self.add_declarations(program, Origin::Program);
        self.finish()
    }
}

/// Check `library` then `program` with the default entry point `main`
pub fn link(library: &[Declaration], program: &[Declaration]) -> Result<Linked, Vec<CheckError>> {
    let (linked, diagnostics) = Linker::new(CheckConfig::default()).run(library, program);
    if diagnostics.has_errors() {
        Err(diagnostics.into_errors())
    } else {
        Ok(linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Parser;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Vec<Declaration> {
        Parser::new(source).unwrap().parse().unwrap().declarations
    }

    fn link_sources(library: &str, program: &str) -> Result<Linked, Vec<CheckError>> {
        link(&parse(library), &parse(program))
    }

    fn titles(errors: &[CheckError]) -> Vec<&'static str> {
        errors.iter().map(CheckError::title).collect()
    }

    #[test]
    fn test_minimal_program() {
        let linked = link_sources("", "int main() { return 0; }").unwrap();
        assert!(linked.env.lookup_definition("main").is_some());
        assert!(linked.functions_used.is_empty());
    }

    #[test]
    fn test_empty_input_needs_main() {
        let errors = link_sources("", "").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], CheckError::NeverDefined { .. }));
        assert_eq!(errors[0].message(), "entry point 'main' is never defined");
        assert_eq!(errors[0].span(), Span::builtin());
    }

    #[test]
    fn test_library_only_needs_main() {
        let errors = link_sources("int abs(int x) { return x < 0 ? -x : x; }", "").unwrap_err();
        assert_eq!(titles(&errors), vec!["Function never defined"]);
    }

    #[test]
    fn test_declared_but_never_defined() {
        let errors = link_sources("", "int f(int x);\nint main() { return f(1); }").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message(), "function 'f' is declared and used but never defined");
    }

    #[test]
    fn test_unused_declaration_is_fine() {
        assert!(link_sources("", "int f(int x);\nint main() { return 0; }").is_ok());
    }

    #[test]
    fn test_library_definition_satisfies_program() {
        let library = "int square(int x) { return x * x; }";
        let program = "int square(int x);\nint main() { return square(3); }";
        let linked = link_sources(library, program).unwrap();
        assert_eq!(
            linked.functions_used,
            ["square".to_string()].into_iter().collect::<BTreeSet<_>>()
        );
        let definition = linked.env.lookup_definition("square").unwrap();
        assert_eq!(definition.origin, Origin::Library);
    }

    #[test]
    fn test_mutual_recursion_through_prototypes() {
        let program = "bool is_even(int n);
            bool is_odd(int n) { if (n == 0) return false; return is_even(n - 1); }
            bool is_even(int n) { if (n == 0) return true; return is_odd(n - 1); }
            int main() { return is_even(4) ? 1 : 0; }";
        assert!(link_sources("", program).is_ok());
    }

    #[test]
    fn test_use_of_failed_declaration_is_undefined() {
        let errors = link_sources("", "int f(int x, int x);\nint main() { return 0; }\n").unwrap_err();
        assert_eq!(titles(&errors), vec!["Duplicate parameter"]);
    }

    #[test]
    fn test_contract_uses_count() {
        let program = "bool pos(int x);
            int f(int x) //@requires pos(x);
            { return x; }
            int main() { return f(1); }";
        let errors = link_sources("", program).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().contains("'pos'"));
    }

    #[test]
    fn test_errors_from_both_phases_are_collected() {
        let library = "int f(int x) { return x; }";
        let program = "int f(int x) { return x + 1; }\nint main() { return g(); }";
        let errors = link_sources(library, program).unwrap_err();
        assert_eq!(titles(&errors), vec!["Duplicate definition", "Type error"]);
    }

    #[test]
    fn test_custom_entry_point() {
        let linker = Linker::new(CheckConfig::new("start"));
        let (linked, diagnostics) = linker.run(&[], &parse("int start() { return 0; }"));
        assert!(diagnostics.is_empty());
        assert!(linked.env.lookup_function("main").is_none());
    }

    #[test]
    fn test_undefined_function_reported_by_closure() {
        // Checked declarations only use declared names; inject one
        let mut linker = Linker::new(CheckConfig::default());
        linker.add_declarations(&parse("int main() { return 0; }"), Origin::Program);
        linker.functions_used.insert("ghost".to_string());
        let (_, diagnostics) = linker.finish();
        let errors = diagnostics.into_errors();
        assert_eq!(titles(&errors), vec!["Undefined function"]);
    }

    #[test]
    fn test_ill_typed_body_reports_once() {
        let errors = link_sources("", "int f() { return true; }\nint main() { return f(); }").unwrap_err();
        assert_eq!(titles(&errors), vec!["Type error"]);
        assert_eq!(errors[0].message(), "expected 'int', found 'bool'");
    }

    #[test]
    fn test_ill_typed_contract_reports_once() {
        let program = "int f(int x)
            //@ensures ghost(x);
            { return x; }
            int main() { return f(1); }";
        let errors = link_sources("", program).unwrap_err();
        assert_eq!(titles(&errors), vec!["Type error"]);
        assert!(errors[0].message().contains("'ghost'"));
    }

    #[test]
    fn test_mismatch_after_definition() {
        let program = "int f(int x) { return x; }\nint f(bool x);\nint main() { return f(1); }";
        let errors = link_sources("", program).unwrap_err();
        assert_eq!(titles(&errors), vec!["Signature mismatch"]);
        assert!(errors[0].message().contains("previous definition"), "{}", errors[0].message());
    }

    #[test]
    fn test_independent_declarations_commute() {
        let pairs = [
            ("int g(int x) { return x; }", "typedef int number;"),
            ("struct point { int x; int y; };", "bool flag(int x);"),
            ("int k(int x)\n//@requires ok(x);\n;", "typedef int number;"),
            ("int g(int x) { return x; }", "int g(bool x);"),
        ];
        let mut rejected = 0;
        for (first, second) in pairs {
            let around = |a: &str, b: &str| format!("bool ok(int x);\n{a}\n{b}\nint main() {{ return 0; }}");
            let forward = link_sources("", &around(first, second));
            let swapped = link_sources("", &around(second, first));
            assert_eq!(forward.is_ok(), swapped.is_ok(), "{first} / {second}");
            if let (Err(forward), Err(swapped)) = (forward, swapped) {
                rejected += 1;
                assert_eq!(titles(&forward), titles(&swapped));
            }
        }
        assert_eq!(rejected, 2);
    }

    #[test]
    fn test_checking_is_deterministic() {
        let library = "bool pos(int x) { return x > 0; }\nint abs(int x) { return x < 0 ? -x : x; }";
        let program = "int f(int x)
            //@requires pos(x);
            //@ensures \\result >= 0;
            { return abs(x); }
            int g(int x);
            int main() { return f(1) + g(2); }";
        let library = parse(library);
        let program = parse(program);

        let run = || Linker::new(CheckConfig::default()).run(&library, &program);
        let (first, first_errors) = run();
        let (second, second_errors) = run();
        assert_eq!(first.functions_used, second.functions_used);
        assert_eq!(first.env.to_string(), second.env.to_string());
        let messages = |d: Diagnostics| d.into_errors().iter().map(|e| e.message().to_string()).collect::<Vec<_>>();
        let first_messages = messages(first_errors);
        assert_eq!(first_messages, messages(second_errors));
        assert_eq!(first_messages, vec!["function 'g' is declared and used but never defined"]);
    }

    #[test]
    fn test_function_only_in_postcondition() {
        let program = "bool pos(int x);
            int f(int x)
            //@ensures pos(\\result);
            { return x; }
            int main() { return 0; }";
        let (linked, diagnostics) = Linker::new(CheckConfig::default()).run(&[], &parse(program));
        assert!(linked.functions_used.contains("pos"));
        let errors = diagnostics.into_errors();
        assert_eq!(titles(&errors), vec!["Function never defined"]);
        assert!(errors[0].message().contains("'pos'"));
    }
}
