//! The evaluation engine: one compiler instance plus the host side
//! collaborators (variables, rules, diagnostics).

use std::fmt::{self, Write as _};
use std::io;
use std::path::{Path, PathBuf};

use kmk_cc::{
    compile_evaluation, compile_expansion, execute_evaluation, run_expansion, CompilerConfig,
    CompilerContext, Definition, EvalError, EvaluationProgram, FsIncludes, IncludeResolver,
    RuleList, StatsSnapshot, VariableSet, VariableTable,
};
use kmk_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use kmk_ir::{Flavor, Origin};
use rayon::prelude::*;

/// Failure of an engine operation.
#[derive(Debug)]
pub enum EngineError {
    /// A makefile could not be read.
    Read { path: PathBuf, source: io::Error },
    /// A `NAME=value` argument that does not parse.
    Definition(String),
    /// Compilation or evaluation failed.
    Eval(EvalError),
}

impl EngineError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            EngineError::Eval(err) => err.to_diagnostic(),
            EngineError::Read { .. } => Diagnostic::error(ErrorCode::K3005).with_message(self.to_string()),
            EngineError::Definition(_) => Diagnostic::error(ErrorCode::K3011).with_message(self.to_string()),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Read { path, source } => {
                write!(f, "cannot read '{}': {source}", path.display())
            }
            EngineError::Definition(text) => {
                write!(f, "malformed variable definition '{text}'")
            }
            EngineError::Eval(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Read { source, .. } => Some(source),
            EngineError::Eval(err) => Some(err),
            EngineError::Definition(_) => None,
        }
    }
}

impl From<EvalError> for EngineError {
    fn from(err: EvalError) -> Self {
        EngineError::Eval(err)
    }
}

impl From<kmk_cc::CompileError> for EngineError {
    fn from(err: kmk_cc::CompileError) -> Self {
        EngineError::Eval(err.into())
    }
}

/// Split `NAME=value` or `NAME:=value`.
///
/// Returns `None` when there is no `=` or the name is empty or contains
/// blanks or `$`.
pub fn split_definition(text: &str) -> Option<(&str, &str, Flavor)> {
    let eq = text.find('=')?;
    let (lhs, value) = (&text[..eq], &text[eq + 1..]);
    let (name, flavor) = match lhs.strip_suffix(':') {
        Some(name) => (name, Flavor::Simple),
        None => (lhs, Flavor::Recursive),
    };
    let valid = !name.is_empty() && !name.contains(|c: char| c.is_whitespace() || c == '$');
    valid.then_some((name, value, flavor))
}

fn read(path: &Path) -> Result<String, EngineError> {
    std::fs::read_to_string(path).map_err(|source| EngineError::Read {
        path: path.to_owned(),
        source,
    })
}

/// Directory `include` names are resolved against.
fn base_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

pub struct Engine {
    cx: CompilerContext,
    vars: VariableSet,
    rules: RuleList,
    diagnostics: DiagnosticQueue,
}

impl Engine {
    pub fn new(config: CompilerConfig) -> Self {
        Self::with_context(CompilerContext::new(config))
    }

    pub fn with_context(cx: CompilerContext) -> Self {
        let vars = VariableSet::for_context(&cx);
        Engine {
            cx,
            vars,
            rules: RuleList::new(),
            diagnostics: DiagnosticQueue::new(),
        }
    }

    pub fn context(&self) -> &CompilerContext {
        &self.cx
    }

    pub fn variables(&self) -> &VariableSet {
        &self.vars
    }

    pub fn rules(&self) -> &RuleList {
        &self.rules
    }

    pub fn diagnostics(&self) -> &DiagnosticQueue {
        &self.diagnostics
    }

    /// Drain the warnings collected so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.flush()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.cx.stats().snapshot()
    }

    /// Value of `name`, unexpanded.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(kmk_cc::Variable::value)
    }

    pub fn define(&mut self, name: &str, value: &str, flavor: Flavor, origin: Origin) -> Result<bool, EvalError> {
        let name = self.cx.interner().intern(name);
        self.vars.define(Definition::new(name, value, flavor, origin))
    }

    /// Define a variable from a `NAME=value` or `NAME:=value` argument.
    /// `:=` values are expanded against the definitions made so far.
    pub fn define_command_line(&mut self, text: &str) -> Result<bool, EngineError> {
        let Some((name, value, flavor)) = split_definition(text) else {
            return Err(EngineError::Definition(text.to_owned()));
        };
        let value = match flavor {
            Flavor::Simple => self.expand(value)?,
            Flavor::Recursive => value.to_owned(),
        };
        Ok(self.define(name, &value, flavor, Origin::CommandLine)?)
    }

    /// Import environment variables as recursive `environment` variables.
    /// Entries whose names could not be referenced are skipped.
    pub fn import_environment<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in vars {
            let name = name.as_ref();
            if name.is_empty() || name.contains(|c: char| c.is_whitespace() || matches!(c, '$' | '=' | ':')) {
                tracing::trace!(name, "skipping environment entry");
                continue;
            }
            if let Err(err) = self.define(name, value.as_ref(), Flavor::Recursive, Origin::Environment) {
                tracing::warn!(name, %err, "environment variable not imported");
            }
        }
    }

    /// Expand `text` against the current variables.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn expand(&mut self, text: &str) -> Result<String, EvalError> {
        let program = compile_expansion(&self.cx, text)?;
        let mut out = String::new();
        run_expansion(&self.cx, &program, &mut self.vars, &mut self.diagnostics, &mut out)?;
        Ok(out)
    }

    /// Compile and execute makefile text.
    #[tracing::instrument(level = "debug", skip(self, text, includes))]
    pub fn eval_text(&mut self, text: &str, file: &str, includes: &mut dyn IncludeResolver) -> Result<(), EvalError> {
        let program = compile_evaluation(&self.cx, text, file, 1, None)?;
        execute_evaluation(
            &self.cx,
            &program,
            &mut self.vars,
            &mut self.rules,
            includes,
            &mut self.diagnostics,
        )
    }

    /// Evaluate a makefile; its includes resolve relative to its directory.
    pub fn eval_file(&mut self, path: &Path) -> Result<(), EngineError> {
        let text = read(path)?;
        let mut includes = FsIncludes::new(base_dir(path));
        self.eval_text(&text, &path.display().to_string(), &mut includes)?;
        Ok(())
    }

    /// Compile a makefile without executing it.
    pub fn compile_file(&self, path: &Path) -> Result<EvaluationProgram, EngineError> {
        let text = read(path)?;
        Ok(compile_evaluation(&self.cx, &text, &path.display().to_string(), 1, None)?)
    }

    /// Listing of a makefile's evaluation program.
    pub fn dump_file(&self, path: &Path) -> Result<String, EngineError> {
        Ok(self.compile_file(path)?.dump(&self.cx))
    }

    /// Variables set by makefiles or the command line, `make -p` style.
    pub fn render_variables(&self) -> String {
        let mut out = String::new();
        for (name, var) in self.vars.sorted() {
            if matches!(var.origin(), Origin::Default | Origin::Environment) {
                continue;
            }
            let op = match var.flavor() {
                Flavor::Recursive => "=",
                Flavor::Simple => ":=",
            };
            let export = if self.vars.is_exported(var.name()) { "export " } else { "" };
            let _ = writeln!(out, "# {}", var.origin().as_str());
            let _ = writeln!(out, "{export}{name} {op} {}", var.value());
        }
        out
    }

    pub fn render_rules(&self) -> String {
        let mut out = String::new();
        for rule in self.rules.rules() {
            let _ = writeln!(out, "# {}", rule.location);
            let _ = writeln!(out, "{rule}");
        }
        out
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

/// Result of compiling one file with [`check_files`].
#[derive(Debug)]
pub struct CheckOutcome {
    pub path: PathBuf,
    /// Instructions in the compiled program; zero when compilation failed.
    pub instructions: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckOutcome {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Compile every file without executing any of them.
///
/// Files are independent, so they are compiled in parallel; outcomes come
/// back in input order.
pub fn check_files(cx: &CompilerContext, paths: &[PathBuf]) -> Vec<CheckOutcome> {
    paths.par_iter().map(|path| check_one(cx, path)).collect()
}

fn check_one(cx: &CompilerContext, path: &Path) -> CheckOutcome {
    let compiled = read(path).and_then(|text| {
        compile_evaluation(cx, &text, &path.display().to_string(), 1, None).map_err(EngineError::from)
    });
    let (instructions, diagnostics) = match compiled {
        Ok(program) => (program.stats().instructions, program.warnings().to_vec()),
        Err(err) => (0, vec![err.to_diagnostic()]),
    };
    tracing::debug!(path = %path.display(), instructions, "checked");
    CheckOutcome {
        path: path.to_owned(),
        instructions,
        diagnostics,
    }
}
