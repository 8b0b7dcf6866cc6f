//! kmk CC - expansion and directive compiler for kmk makefiles.
//!
//! Makefile text is compiled once into bytecode and interpreted many times:
//! - Expansion programs: the value of a recursive variable, a function
//!   argument, any text containing `$`
//! - Evaluation programs: whole makefile fragments (assignments,
//!   conditionals, includes, rules)
//!
//! # Architecture
//!
//! - `arena`: block-chained storage for instructions and text
//! - `expand`: expansion compiler and interpreter ([`Expander`])
//! - `directive`: evaluation compiler, `exec`: its executor
//! - `functions`: the registry of built-in functions
//! - `vars`: the variable table and cached per-variable programs
//!
//! Everything a compilation needs (configuration, interner, function
//! registry, statistics, print handler) lives in one [`CompilerContext`].

mod arena;
mod config;
pub mod directive;
pub mod errors;
pub mod exec;
pub mod expand;
pub mod functions;
mod print;
mod program;
mod stack;
mod stats;
pub mod vars;

use std::sync::Arc;

use kmk_diagnostic::DiagnosticQueue;
use kmk_ir::SharedInterner;

pub use arena::{Addr, ArenaStats, Blocks, TextBlocks, TextId};
pub use config::CompilerConfig;
pub use directive::{compile_evaluation, EvaluationProgram};
pub use errors::{CompileError, EvalError, EvalErrorKind};
pub use exec::{Executor, FsIncludes, IncludeResolver, MemoryIncludes, RecipeSink, Rule, RuleList};
pub use expand::{compile_expansion, Expander, ExpansionProgram};
pub use functions::{FunctionDef, FunctionId, FunctionRegistry, Implementation, LazyArgs};
pub use print::{buffer_handler, silent_handler, stdout_handler, PrintHandler, SharedPrintHandler};
pub use program::{Invalidation, ProgramHeader};
pub use stats::{CompilerStats, StatsSnapshot};
pub use vars::{Definition, Variable, VariableSet, VariableTable};

/// Shared state of one compiler instance.
///
/// Cheap to share by reference across threads: the interner is sharded,
/// the statistics are atomic and the registry is read-only once built.
pub struct CompilerContext {
    config: CompilerConfig,
    interner: SharedInterner,
    functions: FunctionRegistry,
    stats: Arc<CompilerStats>,
    print: SharedPrintHandler,
}

impl CompilerContext {
    /// A context with the built-in functions and output on stdout.
    pub fn new(config: CompilerConfig) -> Self {
        CompilerContext {
            config,
            interner: SharedInterner::new(),
            functions: FunctionRegistry::with_builtins(),
            stats: Arc::new(CompilerStats::new()),
            print: stdout_handler(),
        }
    }

    #[must_use]
    pub fn with_interner(mut self, interner: SharedInterner) -> Self {
        self.interner = interner;
        self
    }

    /// Send `$(info)` output to `print`.
    #[must_use]
    pub fn with_print_handler(mut self, print: SharedPrintHandler) -> Self {
        self.print = print;
        self
    }

    /// Register additional functions before compiling anything.
    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn stats(&self) -> &CompilerStats {
        &self.stats
    }

    pub fn stats_arc(&self) -> Arc<CompilerStats> {
        Arc::clone(&self.stats)
    }

    pub fn print(&self) -> &SharedPrintHandler {
        &self.print
    }
}

impl Default for CompilerContext {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

/// Run an expansion program, appending its output to `out`.
pub fn run_expansion(
    cx: &CompilerContext,
    program: &ExpansionProgram,
    vars: &mut dyn VariableTable,
    diagnostics: &mut DiagnosticQueue,
    out: &mut String,
) -> Result<(), EvalError> {
    Expander::new(vars, cx, diagnostics).run(program, out)
}

/// Execute an evaluation program.
pub fn execute_evaluation(
    cx: &CompilerContext,
    program: &EvaluationProgram,
    vars: &mut dyn VariableTable,
    rules: &mut dyn RecipeSink,
    includes: &mut dyn IncludeResolver,
    diagnostics: &mut DiagnosticQueue,
) -> Result<(), EvalError> {
    let exp = Expander::new(vars, cx, diagnostics);
    Executor::new(exp, rules, includes).execute(program)
}

/// Detach a program so it can be freed. Refused while a run is in flight.
pub fn invalidate(cx: &CompilerContext, header: &ProgramHeader) -> Invalidation {
    let result = header.invalidate();
    if result == Invalidation::Done {
        cx.stats().record_invalidation();
    }
    result
}
