//! The `expand` command: expand text against variables from the command
//! line and any `-f` makefiles.

use super::{prepare_engine, Options, Reporter};

pub fn expand_command(options: &Options) -> bool {
    if options.positional.is_empty() {
        eprintln!("Usage: kmk-cc expand [-f makefile]... [NAME=value]... [--] <text>...");
        return false;
    }
    let mut reporter = Reporter::new(options.color);
    let Some(mut engine) = prepare_engine(options, &mut reporter) else {
        return false;
    };
    for makefile in &options.makefiles {
        if let Err(err) = engine.eval_file(makefile) {
            reporter.drain(&mut engine);
            reporter.error(&err);
            return false;
        }
    }
    for text in &options.positional {
        match engine.expand(text) {
            Ok(out) => println!("{out}"),
            Err(err) => {
                reporter.drain(&mut engine);
                reporter.emit_all([&err.to_diagnostic()]);
                return false;
            }
        }
    }
    reporter.drain(&mut engine);
    reporter.ok()
}
