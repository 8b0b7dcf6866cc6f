//! Command handlers for the `kmk-cc` CLI.
//!
//! Each handler returns `true` on success; `main` turns `false` into exit
//! status 1. Argument parsing and diagnostic rendering shared by all
//! commands live here.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use kmk_cc::CompilerConfig;
use kmk_diagnostic::emitter::{ColorMode, TerminalEmitter};
use kmk_diagnostic::Diagnostic;

use crate::{split_definition, Engine, EngineError};

mod check;
mod eval;
mod expand;

pub use check::check_command;
pub use eval::{dump_command, eval_command, stats_command};
pub use expand::expand_command;

/// Options shared by every command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub config: CompilerConfig,
    pub color: ColorMode,
    /// `NAME=value` arguments, in order.
    pub definitions: Vec<String>,
    /// Makefiles given with `-f`.
    pub makefiles: Vec<PathBuf>,
    /// Everything else.
    pub positional: Vec<String>,
    /// Do not import the process environment.
    pub no_environment: bool,
}

impl Options {
    /// Parse the arguments following the command name.
    ///
    /// Arguments after `--` are always positional.
    pub fn parse(args: &[String]) -> Result<Options, String> {
        let mut options = Options::default();
        let mut rest = args.iter();
        while let Some(arg) = rest.next() {
            if arg == "--" {
                options.positional.extend(rest.by_ref().cloned());
                break;
            }
            if arg == "--warn-undefined-variables" {
                options.config.warn_undefined = true;
            } else if arg == "--no-environment" {
                options.no_environment = true;
            } else if let Some(mode) = arg.strip_prefix("--color=") {
                options.color = match mode {
                    "auto" => ColorMode::Auto,
                    "always" => ColorMode::Always,
                    "never" => ColorMode::Never,
                    _ => return Err(format!("invalid color mode '{mode}'")),
                };
            } else if let Some(depth) = arg.strip_prefix("--max-include-depth=") {
                let depth = depth
                    .parse()
                    .map_err(|_| format!("invalid include depth '{depth}'"))?;
                options.config.max_include_depth = depth;
            } else if arg == "-f" {
                let Some(file) = rest.next() else {
                    return Err("option '-f' requires a file".to_owned());
                };
                options.makefiles.push(PathBuf::from(file));
            } else if let Some(file) = arg.strip_prefix("-f").filter(|f| !f.is_empty()) {
                options.makefiles.push(PathBuf::from(file));
            } else if arg.starts_with('-') && arg.len() > 1 {
                return Err(format!("unknown option '{arg}'"));
            } else if split_definition(arg).is_some() {
                options.definitions.push(arg.clone());
            } else {
                options.positional.push(arg.clone());
            }
        }
        Ok(options)
    }

    /// `-f` makefiles followed by positional makefiles.
    pub fn all_makefiles(&self) -> Vec<PathBuf> {
        self.makefiles
            .iter()
            .cloned()
            .chain(self.positional.iter().map(PathBuf::from))
            .collect()
    }
}

/// Renders diagnostics to stderr and remembers whether any were errors.
pub(crate) struct Reporter {
    emitter: TerminalEmitter<io::Stderr>,
    errors: usize,
}

impl Reporter {
    pub(crate) fn new(color: ColorMode) -> Self {
        let is_tty = io::stderr().is_terminal();
        Reporter {
            emitter: TerminalEmitter::stderr(color, is_tty),
            errors: 0,
        }
    }

    pub(crate) fn emit_all<'a>(&mut self, diags: impl IntoIterator<Item = &'a Diagnostic>) {
        let diags: Vec<_> = diags.into_iter().collect();
        self.errors += diags.iter().filter(|d| d.is_error()).count();
        if let Err(err) = self.emitter.emit_all(diags) {
            tracing::warn!(%err, "cannot write diagnostics");
        }
    }

    pub(crate) fn error(&mut self, err: &EngineError) {
        self.emit_all([&err.to_diagnostic()]);
    }

    /// Flush the engine's queued warnings.
    pub(crate) fn drain(&mut self, engine: &mut Engine) {
        let diags = engine.take_diagnostics();
        self.emit_all(&diags);
    }

    pub(crate) fn ok(&self) -> bool {
        self.errors == 0
    }
}

/// An engine with the environment and command-line definitions applied.
pub(crate) fn prepare_engine(options: &Options, reporter: &mut Reporter) -> Option<Engine> {
    let mut engine = Engine::new(options.config.clone());
    if !options.no_environment {
        let vars = std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)));
        engine.import_environment(vars);
    }
    for definition in &options.definitions {
        if let Err(err) = engine.define_command_line(definition) {
            reporter.error(&err);
            return None;
        }
    }
    Some(engine)
}
