//! Variable table.
//!
//! The compilers and interpreters only see the [`VariableTable`] trait;
//! [`VariableSet`] is the reference implementation used by the driver and
//! the tests.
//!
//! A recursive variable caches its compiled [`ExpansionProgram`]. Changing
//! or deleting the variable retires that program, which is refused while a
//! run of it is in flight.

use std::sync::{Arc, OnceLock};

use kmk_ir::{Flavor, Name, Origin, SharedInterner};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{program_in_flight, CompileError, EvalError};
use crate::expand::{compile_shared, ExpansionProgram};
use crate::program::Invalidation;
use crate::stats::CompilerStats;
use crate::CompilerContext;

/// Everything needed to (re)define a variable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Definition {
    pub name: Name,
    pub value: Arc<str>,
    pub flavor: Flavor,
    pub origin: Origin,
}

impl Definition {
    pub fn new(name: Name, value: impl Into<Arc<str>>, flavor: Flavor, origin: Origin) -> Self {
        Definition {
            name,
            value: value.into(),
            flavor,
            origin,
        }
    }
}

#[derive(Debug)]
pub struct Variable {
    name: Name,
    value: Arc<str>,
    flavor: Flavor,
    origin: Origin,
    exported: bool,
    private: bool,
    program: OnceLock<Arc<ExpansionProgram>>,
}

impl Variable {
    fn from_definition(def: Definition) -> Self {
        Variable {
            name: def.name,
            value: def.value,
            flavor: def.flavor,
            origin: def.origin,
            exported: false,
            private: false,
            program: OnceLock::new(),
        }
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_exported(&self) -> bool {
        self.exported
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn definition(&self) -> Definition {
        Definition {
            name: self.name,
            value: Arc::clone(&self.value),
            flavor: self.flavor,
            origin: self.origin,
        }
    }

    /// The cached expansion program, compiled on first use.
    pub fn expansion_program(&self, cx: &CompilerContext) -> Result<Arc<ExpansionProgram>, CompileError> {
        if let Some(program) = self.program.get() {
            return Ok(Arc::clone(program));
        }
        let program = compile_shared(cx, &self.value)?;
        tracing::debug!(name = cx.interner().lookup(self.name), "compiled variable program");
        Ok(Arc::clone(self.program.get_or_init(|| program)))
    }

    /// The cached program, if one was compiled.
    pub fn compiled_program(&self) -> Option<&Arc<ExpansionProgram>> {
        self.program.get()
    }

    pub fn is_in_flight(&self) -> bool {
        self.program.get().is_some_and(|p| p.header().is_in_flight())
    }
}

/// What the compilers and interpreters need from a variable table.
pub trait VariableTable {
    fn lookup(&self, name: Name) -> Option<&Variable>;

    /// Define or redefine `def.name`, unless an existing definition has a
    /// higher-precedence origin. Returns whether the definition was stored.
    fn define(&mut self, def: Definition) -> Result<bool, EvalError>;

    /// Define `def.name` regardless of precedence.
    fn replace(&mut self, def: Definition) -> Result<(), EvalError>;

    /// Delete `name` unless it has a higher-precedence origin than `origin`.
    fn undefine(&mut self, name: Name, origin: Origin) -> Result<bool, EvalError>;

    /// Delete `name` regardless of precedence.
    fn remove(&mut self, name: Name) -> Result<Option<Variable>, EvalError>;

    fn set_exported(&mut self, name: Name, exported: bool);

    fn set_private(&mut self, name: Name, private: bool);

    /// `export` / `unexport` without names.
    fn export_all(&mut self, exported: bool);

    /// Drop the cached program of `name` after its value changed in place.
    fn mark_changed(&mut self, name: Name) -> Result<(), EvalError>;

    /// Bind `def` over any definition of the same name until the matching
    /// [`pop_local`](Self::pop_local). The shadowed variable and its
    /// program are left alone, even while that program runs.
    fn push_local(&mut self, def: Definition);

    /// Drop the innermost binding made by [`push_local`](Self::push_local).
    fn pop_local(&mut self);
}

/// Hash-map backed [`VariableTable`].
#[derive(Debug)]
pub struct VariableSet {
    vars: FxHashMap<Name, Variable>,
    interner: SharedInterner,
    stats: Arc<CompilerStats>,
    export_all: bool,
    pending_export: FxHashMap<Name, bool>,
    private_names: FxHashSet<Name>,
    /// Scoped bindings, innermost last; consulted before `vars`.
    locals: Vec<Variable>,
}

impl VariableSet {
    /// An empty set sharing `cx`'s interner and statistics.
    pub fn for_context(cx: &CompilerContext) -> Self {
        VariableSet {
            vars: FxHashMap::default(),
            interner: cx.interner().clone(),
            stats: cx.stats_arc(),
            export_all: false,
            pending_export: FxHashMap::default(),
            private_names: FxHashSet::default(),
            locals: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Lookup by spelling.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.lookup(self.interner.get(name)?)
    }

    pub fn exports_all(&self) -> bool {
        self.export_all
    }

    /// Whether `name` is passed to the environment of recipes.
    pub fn is_exported(&self, name: Name) -> bool {
        match self.vars.get(&name) {
            Some(var) => var.exported || (self.export_all && !var.private),
            None => false,
        }
    }

    /// Variables sorted by name.
    pub fn sorted(&self) -> Vec<(&'static str, &Variable)> {
        let mut vars: Vec<_> = self
            .vars
            .values()
            .map(|v| (self.interner.lookup(v.name), v))
            .collect();
        vars.sort_unstable_by_key(|(name, _)| *name);
        vars
    }

    /// Refuse to touch a variable whose program is running, otherwise
    /// invalidate its program.
    fn retire(&self, var: &Variable) -> Result<(), EvalError> {
        let Some(program) = var.compiled_program() else {
            return Ok(());
        };
        match program.header().invalidate() {
            Invalidation::Done => {
                self.stats.record_invalidation();
                tracing::trace!(name = self.interner.lookup(var.name), "invalidated program");
                Ok(())
            }
            Invalidation::AlreadyInvalid => Ok(()),
            Invalidation::InFlight => Err(program_in_flight(self.interner.lookup(var.name))),
        }
    }

    fn store(&mut self, def: Definition) -> Result<(), EvalError> {
        let name = def.name;
        let (exported, private) = match self.vars.get(&name) {
            Some(old) => {
                self.retire(old)?;
                (old.exported, old.private)
            }
            None => (
                self.pending_export.remove(&name).unwrap_or(false),
                self.private_names.remove(&name),
            ),
        };
        let mut var = Variable::from_definition(def);
        var.exported = exported;
        var.private = private;
        self.vars.insert(name, var);
        Ok(())
    }
}

impl VariableTable for VariableSet {
    fn lookup(&self, name: Name) -> Option<&Variable> {
        self.locals
            .iter()
            .rev()
            .find(|var| var.name == name)
            .or_else(|| self.vars.get(&name))
    }

    fn define(&mut self, def: Definition) -> Result<bool, EvalError> {
        if let Some(old) = self.vars.get(&def.name) {
            if old.origin > def.origin && def.origin != Origin::Override {
                return Ok(false);
            }
        }
        self.store(def)?;
        Ok(true)
    }

    fn replace(&mut self, def: Definition) -> Result<(), EvalError> {
        self.store(def)
    }

    fn undefine(&mut self, name: Name, origin: Origin) -> Result<bool, EvalError> {
        let Some(old) = self.vars.get(&name) else {
            return Ok(false);
        };
        if old.origin > origin && origin != Origin::Override {
            return Ok(false);
        }
        Ok(self.remove(name)?.is_some())
    }

    fn remove(&mut self, name: Name) -> Result<Option<Variable>, EvalError> {
        if let Some(old) = self.vars.get(&name) {
            self.retire(old)?;
        }
        Ok(self.vars.remove(&name))
    }

    fn set_exported(&mut self, name: Name, exported: bool) {
        match self.vars.get_mut(&name) {
            Some(var) => var.exported = exported,
            None => {
                self.pending_export.insert(name, exported);
            }
        }
    }

    fn set_private(&mut self, name: Name, private: bool) {
        match self.vars.get_mut(&name) {
            Some(var) => var.private = private,
            None if private => {
                self.private_names.insert(name);
            }
            None => {
                self.private_names.remove(&name);
            }
        }
    }

    fn export_all(&mut self, exported: bool) {
        self.export_all = exported;
    }

    fn mark_changed(&mut self, name: Name) -> Result<(), EvalError> {
        let Some(var) = self.vars.get(&name) else {
            return Ok(());
        };
        self.retire(var)?;
        if let Some(var) = self.vars.get_mut(&name) {
            var.program = OnceLock::new();
        }
        Ok(())
    }

    fn push_local(&mut self, def: Definition) {
        self.locals.push(Variable::from_definition(def));
    }

    fn pop_local(&mut self) {
        self.locals.pop();
    }
}
