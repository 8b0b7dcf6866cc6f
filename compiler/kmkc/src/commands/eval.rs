//! The `eval`, `dump` and `stats` commands.

use std::path::PathBuf;

use crate::Engine;

use super::{prepare_engine, Options, Reporter};

fn makefiles(options: &Options, command: &str) -> Option<Vec<PathBuf>> {
    let files = options.all_makefiles();
    if files.is_empty() {
        eprintln!("Usage: kmk-cc {command} [NAME=value]... <makefile>...");
        return None;
    }
    Some(files)
}

/// Evaluate every makefile in order. Stops at the first fatal error.
fn evaluate(options: &Options, files: &[PathBuf], reporter: &mut Reporter) -> Option<Engine> {
    let mut engine = prepare_engine(options, reporter)?;
    for file in files {
        let result = engine.eval_file(file);
        reporter.drain(&mut engine);
        if let Err(err) = result {
            reporter.error(&err);
            return None;
        }
    }
    Some(engine)
}

/// Evaluate makefiles and print the resulting variables and rules.
pub fn eval_command(options: &Options) -> bool {
    let Some(files) = makefiles(options, "eval") else {
        return false;
    };
    let mut reporter = Reporter::new(options.color);
    let Some(engine) = evaluate(options, &files, &mut reporter) else {
        return false;
    };
    print!("{}", engine.render_variables());
    let rules = engine.render_rules();
    if !rules.is_empty() {
        println!();
        print!("{rules}");
    }
    reporter.ok()
}

/// Print the evaluation program listing of each makefile.
pub fn dump_command(options: &Options) -> bool {
    let Some(files) = makefiles(options, "dump") else {
        return false;
    };
    let mut reporter = Reporter::new(options.color);
    let engine = Engine::new(options.config.clone());
    for file in &files {
        match engine.dump_file(file) {
            Ok(listing) => {
                println!("# {}", file.display());
                print!("{listing}");
            }
            Err(err) => reporter.error(&err),
        }
    }
    reporter.ok()
}

/// Evaluate makefiles and print compiler statistics.
pub fn stats_command(options: &Options) -> bool {
    let Some(files) = makefiles(options, "stats") else {
        return false;
    };
    let mut reporter = Reporter::new(options.color);
    let Some(engine) = evaluate(options, &files, &mut reporter) else {
        return false;
    };
    println!("{}", engine.stats());
    reporter.ok()
}
