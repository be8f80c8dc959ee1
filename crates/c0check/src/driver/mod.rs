//! Checking pipeline: load sources, parse them in order, link, report

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs};

use anyhow::Context as _;
use codespan_reporting::term::termcolor::ColorChoice;

use crate::common::{CheckError, DiagnosticReporter};
use crate::sema::{CheckConfig, Linked, Linker, Origin};
use crate::syntax::{Declaration, Parser};

/// Environment variable holding the log level filter
pub const LOG_ENV: &str = "C0CHECK_LOG";

/// Log level from `C0CHECK_LOG`, or `default` when unset or invalid
pub fn log_level_from_env(default: log::LevelFilter) -> log::LevelFilter {
    env::var(LOG_ENV)
        .ok()
        .and_then(|var| log::LevelFilter::from_str(&var.to_uppercase()).ok())
        .unwrap_or(default)
}

/// A named source text
#[derive(Debug, Clone)]
pub struct Source {
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into() }
    }

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::new(path.display().to_string(), text))
    }
}

/// What a checking run produced
#[derive(Debug)]
pub struct Outcome {
    /// Library declarations, all files concatenated
    pub library: Vec<Declaration>,
    /// Program declarations, all files concatenated
    pub program: Vec<Declaration>,
    /// `None` when parsing failed and nothing was linked
    pub linked: Option<Linked>,
    pub errors: Vec<CheckError>,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One invocation of the checker
///
/// Every source handed to the session is registered with the reporter,
/// so error spans can be rendered against it afterwards.
pub struct Session {
    config: CheckConfig,
    reporter: DiagnosticReporter,
    type_names: HashSet<String>,
}

impl Session {
    pub fn new(config: CheckConfig) -> Self {
        Self::with_color(config, ColorChoice::Auto)
    }

    pub fn with_color(config: CheckConfig, color: ColorChoice) -> Self {
        Self {
            config,
            reporter: DiagnosticReporter::with_color(color),
            type_names: HashSet::new(),
        }
    }

    pub fn reporter(&self) -> &DiagnosticReporter {
        &self.reporter
    }

    /// Read and check library and program files
    pub fn check_files(&mut self, library: &[PathBuf], program: &[PathBuf]) -> anyhow::Result<Outcome> {
        let library = read_all(library)?;
        let program = read_all(program)?;
        Ok(self.check_sources(&library, &program))
    }

    /// Parse every source, then link library before program
    ///
    /// Type names declared by one file are known to the parser of every
    /// later file. A parse error stops the run before linking.
    pub fn check_sources(&mut self, library: &[Source], program: &[Source]) -> Outcome {
        let mut errors = Vec::new();
        let library = self.parse_all(library, &mut errors);
        let program = self.parse_all(program, &mut errors);

        if !errors.is_empty() {
            log::info!("{} file(s) failed to parse; skipping semantic checks", errors.len());
            return Outcome { library, program, linked: None, errors };
        }

        let mut linker = Linker::new(self.config.clone());
        linker.add_declarations(&library, Origin::Library);
        linker.add_declarations(&program, Origin::Program);
        let (linked, diagnostics) = linker.finish();

        Outcome {
            library,
            program,
            linked: Some(linked),
            errors: diagnostics.into_errors(),
        }
    }

    fn parse_all(&mut self, sources: &[Source], errors: &mut Vec<CheckError>) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        for source in sources {
            let file = self.reporter.add_file(source.name.as_str(), source.text.as_str());
            match self.parse_one(&source.text, file) {
                Ok(decls) => {
                    log::debug!("parsed {}: {} declaration(s)", source.name, decls.len());
                    declarations.extend(decls);
                }
                Err(error) => errors.push(error),
            }
        }
        declarations
    }

    fn parse_one(&mut self, text: &str, file: usize) -> Result<Vec<Declaration>, CheckError> {
        let mut parser = Parser::for_file(text, file)?.with_type_names(self.type_names.iter().cloned());
        let unit = parser.parse()?;
        self.type_names = parser.type_names().clone();
        Ok(unit.declarations)
    }

    /// Print every error of `outcome` to stderr
    pub fn report(&self, outcome: &Outcome) {
        self.reporter.report_all(&outcome.errors);
    }
}

fn read_all(paths: &[PathBuf]) -> anyhow::Result<Vec<Source>> {
    paths.iter().map(|path| Source::read(path)).collect()
}
