//! Expansion interpreter.

use std::borrow::Cow;
use std::sync::Arc;

use kmk_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use kmk_ir::{Flavor, Location, Name};
use smallvec::SmallVec;

use super::subst::{reference_patterns, split_subst_ref, substitute_words};
use super::{compile_expansion, ExpInstr, ExpansionArena, ExpansionProgram, Operand, SubProgram};
use crate::arena::Addr;
use crate::errors::{argument_mutated, self_reference, EvalError};
use crate::functions::{FunctionDef, FunctionImpl, Implementation, LazyArgs};
use crate::stack::ensure_sufficient_stack;
use crate::vars::{Variable, VariableTable};
use crate::CompilerContext;

/// Run state of one expansion (and of the evaluation executor built on it).
///
/// Holds the collaborators a run needs: the variable table, the compiler
/// context (function registry, interner, statistics) and the diagnostics
/// sink. `active` lists recursive variables currently being expanded, to
/// catch self-references.
pub struct Expander<'a> {
    vars: &'a mut dyn VariableTable,
    cx: &'a CompilerContext,
    diagnostics: &'a mut DiagnosticQueue,
    location: Option<Location>,
    active: SmallVec<[Name; 8]>,
}

impl<'a> Expander<'a> {
    pub fn new(
        vars: &'a mut dyn VariableTable,
        cx: &'a CompilerContext,
        diagnostics: &'a mut DiagnosticQueue,
    ) -> Self {
        Expander {
            vars,
            cx,
            diagnostics,
            location: None,
            active: SmallVec::new(),
        }
    }

    pub fn context(&self) -> &'a CompilerContext {
        self.cx
    }

    pub fn vars(&self) -> &dyn VariableTable {
        &*self.vars
    }

    pub fn vars_mut(&mut self) -> &mut dyn VariableTable {
        &mut *self.vars
    }

    pub fn diagnostics(&mut self) -> &mut DiagnosticQueue {
        &mut *self.diagnostics
    }

    /// Location attached to warnings and errors raised from here on.
    pub fn set_location(&mut self, location: Option<Location>) {
        self.location = location;
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Run a whole program, appending its output to `out`.
    pub fn run(&mut self, program: &ExpansionProgram, out: &mut String) -> Result<(), EvalError> {
        let _guard = program.header().try_begin_run()?;
        self.cx.stats().record_expansion_run();
        out.reserve(program.header().size_hint());
        let before = out.len();
        self.run_sub(program.arena(), program.entry(), out)?;
        program.header().record_output(out.len() - before);
        Ok(())
    }

    /// Run one stream of `arena`.
    pub fn run_sub(&mut self, arena: &ExpansionArena, sub: SubProgram, out: &mut String) -> Result<(), EvalError> {
        ensure_sufficient_stack(|| self.exec(arena, sub.entry, out))
    }

    /// [`run_sub`](Self::run_sub) or a verbatim copy.
    pub fn operand(&mut self, arena: &ExpansionArena, operand: Operand, out: &mut String) -> Result<(), EvalError> {
        match operand {
            Operand::Plain(text) => {
                out.push_str(arena.text(text));
                Ok(())
            }
            Operand::Sub(sub) => self.run_sub(arena, sub, out),
        }
    }

    pub fn operand_to_string(&mut self, arena: &ExpansionArena, operand: Operand) -> Result<String, EvalError> {
        let mut out = String::new();
        self.operand(arena, operand, &mut out)?;
        Ok(out)
    }

    fn exec(&mut self, arena: &ExpansionArena, mut at: Addr, out: &mut String) -> Result<(), EvalError> {
        loop {
            match &arena.code[at] {
                ExpInstr::CopyString(text) => out.push_str(arena.text(*text)),
                ExpInstr::PlainVariable(name) => self.expand_variable(*name, out)?,
                ExpInstr::DynamicVariable(sub) => {
                    let mut name = String::new();
                    self.run_sub(arena, *sub, &mut name)?;
                    self.expand_computed(&name, out)?;
                }
                ExpInstr::SearchAndReplacePlainVariable(sr) => {
                    let mut value = String::new();
                    self.expand_variable(sr.name, &mut value)?;
                    let search = sr.search.resolve(&arena.text);
                    let replace = sr.replace.resolve(&arena.text);
                    substitute_words(&value, &search, &replace, out);
                }
                ExpInstr::PlainFunction { func, args } => {
                    let def = *self.cx.functions().get(*func);
                    match def.implementation {
                        Implementation::Expanded(implementation) => {
                            let mut args: SmallVec<[Cow<'_, str>; 4]> =
                                args.iter().map(|t| Cow::Borrowed(arena.text(*t))).collect();
                            self.call(&def, implementation, &mut args, out)?;
                        }
                        Implementation::Lazy(implementation) => {
                            let args: SmallVec<[Operand; 4]> = args.iter().map(|&t| Operand::Plain(t)).collect();
                            implementation(self, &LazyArgs::new(arena, &args), out)?;
                        }
                    }
                }
                ExpInstr::DynamicFunction { func, args } => {
                    let def = *self.cx.functions().get(*func);
                    match def.implementation {
                        Implementation::Lazy(implementation) => {
                            implementation(self, &LazyArgs::new(arena, args), out)?;
                        }
                        Implementation::Expanded(implementation) => {
                            let mut values = self.expand_operands(arena, args)?;
                            self.call(&def, implementation, &mut values, out)?;
                        }
                    }
                }
                ExpInstr::Return => return Ok(()),
            }
            at = arena.code.successor(at);
        }
    }

    /// Append the value of `name`.
    ///
    /// Simple variables are copied; recursive ones run their cached program,
    /// compiling it on first use. Undefined variables expand to nothing.
    pub fn expand_variable(&mut self, name: Name, out: &mut String) -> Result<(), EvalError> {
        let Some(var) = self.vars.lookup(name) else {
            self.undefined(self.cx.interner().lookup(name));
            return Ok(());
        };
        if var.flavor() == Flavor::Simple || !var.value().contains('$') {
            out.push_str(var.value());
            return Ok(());
        }
        let program = var
            .expansion_program(self.cx)
            .map_err(|e| EvalError::from(e).at_opt(self.location.as_ref()))?;
        self.expand_recursive(name, &program, out)
    }

    fn expand_recursive(
        &mut self,
        name: Name,
        program: &Arc<ExpansionProgram>,
        out: &mut String,
    ) -> Result<(), EvalError> {
        if self.active.contains(&name) {
            return Err(self_reference(self.cx.interner().lookup(name)).at_opt(self.location.as_ref()));
        }
        self.active.push(name);
        let result = self.run(program, out);
        self.active.pop();
        result
    }

    /// Expand a variable whose name was computed at run time; handles the
    /// `NAME:search=replace` form.
    pub fn expand_computed(&mut self, text: &str, out: &mut String) -> Result<(), EvalError> {
        if let Some((name, search, replace)) = split_subst_ref(text) {
            let mut value = String::new();
            self.expand_named(name, &mut value)?;
            let (search, replace) = reference_patterns(search, replace);
            substitute_words(&value, &search, &replace, out);
            return Ok(());
        }
        self.expand_named(text, out)
    }

    /// Expand the variable spelled `name`.
    pub fn expand_named(&mut self, name: &str, out: &mut String) -> Result<(), EvalError> {
        // Every defined variable has an interned name.
        match self.cx.interner().get(name) {
            Some(name) => self.expand_variable(name, out),
            None => {
                self.undefined(name);
                Ok(())
            }
        }
    }

    /// Expand arbitrary text, compiling it on the fly.
    pub fn expand_text(&mut self, text: &str, out: &mut String) -> Result<(), EvalError> {
        if !text.contains('$') {
            out.push_str(text);
            return Ok(());
        }
        let program = compile_expansion(self.cx, text)
            .map_err(|e| EvalError::from(e).at_opt(self.location.as_ref()))?;
        self.run(&program, out)
    }

    pub fn expand_to_string(&mut self, text: &str) -> Result<String, EvalError> {
        let mut out = String::new();
        self.expand_text(text, &mut out)?;
        Ok(out)
    }

    /// Variable spelled `name`, if defined.
    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.vars.lookup(self.cx.interner().get(name)?)
    }

    /// Queue a run-time warning at the current location.
    pub fn warn(&mut self, code: ErrorCode, message: impl Into<String>) {
        let diag = Diagnostic::warning(code)
            .with_message(message)
            .at_opt(self.location.clone());
        self.diagnostics.warn(diag);
    }

    fn undefined(&mut self, name: &str) {
        if self.cx.config().warn_undefined {
            self.warn(ErrorCode::K3001, format!("undefined variable '{name}'"));
        }
    }

    fn expand_operands<'x>(
        &mut self,
        arena: &'x ExpansionArena,
        args: &[Operand],
    ) -> Result<SmallVec<[Cow<'x, str>; 4]>, EvalError> {
        let mut values = SmallVec::with_capacity(args.len());
        for &arg in args {
            values.push(match arg {
                Operand::Plain(text) => Cow::Borrowed(arena.text(text)),
                Operand::Sub(sub) => {
                    let mut buf = String::new();
                    self.run_sub(arena, sub, &mut buf)?;
                    Cow::Owned(buf)
                }
            });
        }
        Ok(values)
    }

    /// Call a function.
    ///
    /// Dirty functions get private copies of every argument. Clean functions
    /// get the arguments as they are; debug builds check that they come
    /// back unchanged.
    pub(crate) fn call(
        &mut self,
        def: &FunctionDef,
        implementation: FunctionImpl,
        args: &mut [Cow<'_, str>],
        out: &mut String,
    ) -> Result<(), EvalError> {
        if def.dirty {
            for arg in args.iter_mut() {
                if let Cow::Borrowed(text) = *arg {
                    *arg = Cow::Owned(text.to_owned());
                }
            }
            return implementation(self, args, out);
        }

        let snapshot: Option<Vec<String>> =
            cfg!(debug_assertions).then(|| args.iter().map(|a| a.as_ref().to_owned()).collect());
        implementation(self, args, out)?;
        if let Some(snapshot) = snapshot {
            let unchanged = snapshot.len() == args.len()
                && snapshot.iter().zip(args.iter()).all(|(before, after)| before == after.as_ref());
            if !unchanged {
                return Err(argument_mutated(def.name).at_opt(self.location.as_ref()));
            }
        }
        Ok(())
    }
}
