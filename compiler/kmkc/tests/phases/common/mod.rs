//! Shared fixtures for phase tests.

use kmk_cc::{silent_handler, CompilerConfig, CompilerContext, EvalError, MemoryIncludes};
use kmk_diagnostic::ErrorCode;
use kmkc::Engine;

/// An engine plus in-memory include files. Evaluated text is named
/// `Makefile`.
pub struct Fixture {
    pub engine: Engine,
    pub includes: MemoryIncludes,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(CompilerConfig::default())
    }

    pub fn with_config(config: CompilerConfig) -> Self {
        let cx = CompilerContext::new(config).with_print_handler(silent_handler());
        Fixture {
            engine: Engine::with_context(cx),
            includes: MemoryIncludes::new(),
        }
    }

    #[must_use]
    pub fn file(mut self, name: &str, text: &str) -> Self {
        self.includes.insert(name, text);
        self
    }

    pub fn eval(&mut self, text: &str) -> Result<(), EvalError> {
        self.engine.eval_text(text, "Makefile", &mut self.includes)
    }

    pub fn run(&mut self, text: &str) -> &mut Self {
        if let Err(err) = self.eval(text) {
            panic!("{text:?} failed: {err}");
        }
        self
    }

    /// Raw value of a variable; empty if undefined.
    pub fn value(&self, name: &str) -> String {
        self.engine.value(name).unwrap_or_default().to_owned()
    }

    pub fn expand(&mut self, text: &str) -> String {
        self.engine
            .expand(text)
            .unwrap_or_else(|err| panic!("{text:?} failed: {err}"))
    }

    /// Code and `file:line` of the error `text` fails with.
    pub fn failure(&mut self, text: &str) -> (ErrorCode, Option<String>) {
        let Err(err) = self.eval(text) else {
            panic!("{text:?} should fail");
        };
        let diag = err.to_diagnostic();
        let at = diag.location.map(|l| format!("{}:{}", l.file, l.line));
        (diag.code, at)
    }

    pub fn warnings(&mut self) -> Vec<(ErrorCode, String)> {
        self.engine
            .take_diagnostics()
            .into_iter()
            .map(|d| (d.code, d.message))
            .collect()
    }
}
