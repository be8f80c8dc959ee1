//! c0check - check and link C0 libraries and programs
//!
//! Usage: c0check [OPTIONS] <files>...

use clap::Parser as ClapParser;
use c0_check::driver::{log_level_from_env, Session};
use c0_check::CheckConfig;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser, Debug)]
#[command(name = "c0check")]
#[command(version)]
#[command(about = "Declaration checker and linker for C0 programs", long_about = None)]
struct Args {
    /// Program source files, checked in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Library source file, checked before the program (repeatable)
    #[arg(short = 'l', long = "lib")]
    libs: Vec<PathBuf>,

    /// Function the program must define
    #[arg(long, default_value = "main")]
    entry: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Dump AST (for debugging)
    #[arg(long)]
    dump_ast: bool,

    /// Dump the final global environment (for debugging)
    #[arg(long)]
    dump_env: bool,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Warn };
    env_logger::builder()
        .filter_level(log_level_from_env(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    match run(&args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(2);
        }
    }
}

/// Returns whether the input checked cleanly
fn run(args: &Args) -> anyhow::Result<bool> {
    let mut session = Session::new(CheckConfig::new(args.entry.as_str()));
    let outcome = session.check_files(&args.libs, &args.files)?;

    if args.dump_ast {
        eprintln!("=== AST ===");
        for decl in outcome.library.iter().chain(&outcome.program) {
            eprintln!("{decl:#?}");
        }
        eprintln!("=== End AST ===\n");
    }

    if args.dump_env {
        if let Some(linked) = &outcome.linked {
            eprintln!("=== Environment ===");
            eprint!("{}", linked.env);
            eprintln!("=== End Environment ===\n");
        }
    }

    session.report(&outcome);

    if outcome.is_ok() {
        if args.verbose {
            eprintln!(
                "{} library and {} program file(s) checked",
                args.libs.len(),
                args.files.len()
            );
        }
        Ok(true)
    } else {
        eprintln!("{} error(s) found", outcome.errors.len());
        Ok(false)
    }
}
