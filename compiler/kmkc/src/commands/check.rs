//! The `check` command: compile makefiles without evaluating them.

use kmk_cc::CompilerContext;

use crate::check_files;

use super::{Options, Reporter};

/// Compile every makefile in parallel and report the problems found.
pub fn check_command(options: &Options) -> bool {
    let files = options.all_makefiles();
    if files.is_empty() {
        eprintln!("Usage: kmk-cc check <makefile>...");
        return false;
    }
    let cx = CompilerContext::new(options.config.clone());
    let mut reporter = Reporter::new(options.color);
    for outcome in check_files(&cx, &files) {
        reporter.emit_all(&outcome.diagnostics);
        if !outcome.has_errors() {
            println!("{}: ok ({} instructions)", outcome.path.display(), outcome.instructions);
        }
    }
    reporter.ok()
}
