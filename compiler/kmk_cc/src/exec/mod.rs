//! Evaluation executor.
//!
//! Runs an [`EvaluationProgram`] directly against the variable table.
//! Rules go to a [`RecipeSink`]; included files come from an
//! [`IncludeResolver`] and are compiled and executed in place.

pub mod if_expr;
mod sink;

use kmk_ir::{AssignOp, Flavor, Location, Name, Origin};

use crate::directive::{compile_evaluation, AssignFlags, Assignment, CondTest, EvalInstr, EvaluationProgram, IncludeKind};
use crate::errors::{empty_name, include_not_found, include_too_deep, not_blank, EvalError};
use crate::expand::{ExpansionArena, Expander, Operand};
use crate::stack::ensure_sufficient_stack;
use crate::vars::Definition;

pub use sink::{FsIncludes, IncludeResolver, MemoryIncludes, RecipeSink, Rule, RuleList};

pub struct Executor<'a> {
    exp: Expander<'a>,
    rules: &'a mut dyn RecipeSink,
    includes: &'a mut dyn IncludeResolver,
    depth: u32,
    /// Files named by `includedep-queue`, read at the next flush.
    queued: Vec<String>,
}

impl<'a> Executor<'a> {
    pub fn new(exp: Expander<'a>, rules: &'a mut dyn RecipeSink, includes: &'a mut dyn IncludeResolver) -> Self {
        Executor {
            exp,
            rules,
            includes,
            depth: 0,
            queued: Vec::new(),
        }
    }

    pub fn expander(&mut self) -> &mut Expander<'a> {
        &mut self.exp
    }

    /// Execute `program`, then read any dependency files still queued.
    pub fn execute(&mut self, program: &EvaluationProgram) -> Result<(), EvalError> {
        self.report_warnings(program);
        self.run(program)?;
        if self.depth == 0 && !self.queued.is_empty() {
            let queued = std::mem::take(&mut self.queued);
            let location = Location::new(std::sync::Arc::clone(program.file()), 0);
            for file in &queued {
                self.include_file(file, true, &location)?;
            }
        }
        Ok(())
    }

    fn report_warnings(&mut self, program: &EvaluationProgram) {
        for warning in program.warnings() {
            self.exp.diagnostics().warn(warning.clone());
        }
    }

    fn run(&mut self, program: &EvaluationProgram) -> Result<(), EvalError> {
        let _guard = program.header().try_begin_run()?;
        self.exp.context().stats().record_evaluation_run();
        let code = program.code();
        let arena = program.expansions();
        let mut at = program.entry();
        loop {
            let mut next = code.successor(at);
            match &code[at] {
                EvalInstr::Conditional {
                    test,
                    false_target,
                    location,
                } => {
                    self.exp.set_location(Some(location.clone()));
                    if !self.test(arena, test)? {
                        next = *false_target;
                    }
                }
                EvalInstr::Jump(target) => next = *target,
                EvalInstr::Assign(assignment) => self.assign(arena, assignment)?,
                EvalInstr::Export(names) => {
                    for name in self.names(arena, names)? {
                        self.exp.vars_mut().set_exported(name, true);
                    }
                }
                EvalInstr::Unexport(names) => {
                    for name in self.names(arena, names)? {
                        self.exp.vars_mut().set_exported(name, false);
                    }
                }
                EvalInstr::ExportAll => self.exp.vars_mut().export_all(true),
                EvalInstr::UnexportAll => self.exp.vars_mut().export_all(false),
                EvalInstr::Undefine { names, origin } => {
                    for name in self.names(arena, names)? {
                        let location = self.exp.location().cloned();
                        self.exp
                            .vars_mut()
                            .undefine(name, *origin)
                            .map_err(|e| e.at_opt(location.as_ref()))?;
                    }
                }
                EvalInstr::Include { kind, files, location } => {
                    self.exp.set_location(Some(location.clone()));
                    self.include(arena, *kind, files, location)?;
                }
                EvalInstr::RecipeStart(header) => {
                    self.exp.set_location(Some(header.location.clone()));
                    let rule = Rule {
                        targets: self.words(arena, header.targets)?,
                        prereqs: self.words(arena, header.prereqs)?,
                        order_only: self.words(arena, header.order_only)?,
                        double_colon: header.double_colon,
                        location: header.location.clone(),
                        commands: Vec::new(),
                    };
                    self.rules.start_rule(rule);
                }
                EvalInstr::RecipeCommands(lines) => {
                    for line in lines.iter() {
                        self.rules.add_command(arena.text(*line));
                    }
                }
                EvalInstr::ExpandLine { text, location } => {
                    self.exp.set_location(Some(location.clone()));
                    let mut out = String::new();
                    self.exp.run_sub(arena, *text, &mut out)?;
                    let out = out.trim();
                    if !out.is_empty() {
                        return Err(not_blank(out).at_opt(Some(location)));
                    }
                }
                EvalInstr::Return => return Ok(()),
            }
            at = next;
        }
    }

    fn words(&mut self, arena: &ExpansionArena, operand: Operand) -> Result<Vec<String>, EvalError> {
        let text = self.exp.operand_to_string(arena, operand)?;
        Ok(text.split_ascii_whitespace().map(str::to_owned).collect())
    }

    /// Interned variable names listed by `operands`.
    fn names(&mut self, arena: &ExpansionArena, operands: &[Operand]) -> Result<Vec<Name>, EvalError> {
        let interner = self.exp.context().interner();
        let mut names = Vec::new();
        for &operand in operands {
            names.extend(self.words(arena, operand)?.iter().map(|w| interner.intern(w)));
        }
        Ok(names)
    }

    fn test(&mut self, arena: &ExpansionArena, test: &CondTest) -> Result<bool, EvalError> {
        Ok(match *test {
            CondTest::Defined(name) => self.is_defined(arena, name)?,
            CondTest::NotDefined(name) => !self.is_defined(arena, name)?,
            CondTest::Equal(a, b) => self.exp.operand_to_string(arena, a)? == self.exp.operand_to_string(arena, b)?,
            CondTest::NotEqual(a, b) => {
                self.exp.operand_to_string(arena, a)? != self.exp.operand_to_string(arena, b)?
            }
            CondTest::OneOf(a, b) => self.one_of(arena, a, b)?,
            CondTest::NotOneOf(a, b) => !self.one_of(arena, a, b)?,
            CondTest::Expr(expr) => {
                let text = self.exp.operand_to_string(arena, expr)?;
                let exp = &self.exp;
                if_expr::evaluate(&text, &|name| exp.lookup(name).is_some())
                    .map_err(|e| e.at_opt(exp.location()))?
            }
        })
    }

    /// Defined and not empty.
    fn is_defined(&mut self, arena: &ExpansionArena, name: Operand) -> Result<bool, EvalError> {
        let name = self.exp.operand_to_string(arena, name)?;
        Ok(self
            .exp
            .lookup(name.trim())
            .is_some_and(|var| !var.value().is_empty()))
    }

    fn one_of(&mut self, arena: &ExpansionArena, left: Operand, right: Operand) -> Result<bool, EvalError> {
        let left = self.exp.operand_to_string(arena, left)?;
        let right = self.exp.operand_to_string(arena, right)?;
        let right: Vec<&str> = right.split_ascii_whitespace().collect();
        Ok(left.split_ascii_whitespace().any(|w| right.contains(&w)))
    }

    fn assign(&mut self, arena: &ExpansionArena, assignment: &Assignment) -> Result<(), EvalError> {
        let location = &assignment.location;
        self.exp.set_location(Some(location.clone()));
        let name = self.exp.operand_to_string(arena, assignment.name)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(empty_name().at_opt(Some(location)));
        }
        let name = self.exp.context().interner().intern(name);
        let origin = if assignment.flags.contains(AssignFlags::OVERRIDE) {
            Origin::Override
        } else if assignment.flags.contains(AssignFlags::LOCAL) {
            Origin::Local
        } else {
            Origin::File
        };
        let raw = arena.text(assignment.value);

        let definition = match assignment.op {
            AssignOp::Recursive => Some(Definition::new(name, raw, Flavor::Recursive, origin)),
            AssignOp::Simple => {
                let value = match assignment.value_sub {
                    Some(sub) => {
                        let mut out = String::new();
                        self.exp.run_sub(arena, sub, &mut out)?;
                        out
                    }
                    None => raw.to_owned(),
                };
                Some(Definition::new(name, value, Flavor::Simple, origin))
            }
            AssignOp::Conditional => self
                .exp
                .vars()
                .lookup(name)
                .is_none()
                .then(|| Definition::new(name, raw, Flavor::Recursive, origin)),
            AssignOp::Append | AssignOp::Prepend => Some(self.combine(name, raw, assignment.op, origin)?),
        };

        let vars = self.exp.vars_mut();
        if let Some(definition) = definition {
            vars.define(definition).map_err(|e| e.at_opt(Some(location)))?;
        }
        if assignment.flags.contains(AssignFlags::EXPORT) {
            vars.set_exported(name, true);
        }
        if assignment.flags.contains(AssignFlags::PRIVATE) {
            vars.set_private(name, true);
        }
        Ok(())
    }

    /// `+=` and `<=`: the addition is expanded first when the variable is
    /// simple. An undefined variable becomes a recursive one.
    fn combine(&mut self, name: Name, raw: &str, op: AssignOp, origin: Origin) -> Result<Definition, EvalError> {
        let Some((old, flavor)) = self
            .exp
            .vars()
            .lookup(name)
            .map(|var| (var.value().to_owned(), var.flavor()))
        else {
            return Ok(Definition::new(name, raw, Flavor::Recursive, origin));
        };
        let addition = match flavor {
            Flavor::Simple => self.exp.expand_to_string(raw)?,
            Flavor::Recursive => raw.to_owned(),
        };
        let value = if old.is_empty() {
            addition
        } else if addition.is_empty() {
            old
        } else if op == AssignOp::Append {
            format!("{old} {addition}")
        } else {
            format!("{addition} {old}")
        };
        Ok(Definition::new(name, value, flavor, origin))
    }

    fn include(
        &mut self,
        arena: &ExpansionArena,
        kind: IncludeKind,
        files: &[Operand],
        location: &Location,
    ) -> Result<(), EvalError> {
        let mut names = Vec::new();
        for &file in files {
            names.extend(self.words(arena, file)?);
        }
        match kind {
            IncludeKind::DepQueue => {
                self.queued.extend(names);
                Ok(())
            }
            IncludeKind::DepFlush => {
                let queued = std::mem::take(&mut self.queued);
                for file in queued.iter().chain(&names) {
                    self.include_file(file, true, location)?;
                }
                Ok(())
            }
            IncludeKind::Normal | IncludeKind::Silent | IncludeKind::Dep => {
                let silent = kind != IncludeKind::Normal;
                for file in &names {
                    self.include_file(file, silent, location)?;
                }
                Ok(())
            }
        }
    }

    fn include_file(&mut self, file: &str, silent: bool, location: &Location) -> Result<(), EvalError> {
        let cx = self.exp.context();
        let limit = cx.config().max_include_depth;
        if self.depth >= limit {
            return Err(include_too_deep(file, limit).at_opt(Some(location)));
        }
        let Some(text) = self.includes.load(file) else {
            if silent {
                tracing::debug!(file, "optional include not found");
                return Ok(());
            }
            return Err(include_not_found(file).at_opt(Some(location)));
        };
        tracing::debug!(file, depth = self.depth + 1, "including");
        let program = compile_evaluation(cx, &text, file, 1, None)?;
        self.report_warnings(&program);

        self.depth += 1;
        let result = ensure_sufficient_stack(|| self.run(&program));
        self.depth -= 1;
        self.exp.set_location(Some(location.clone()));
        result
    }
}
