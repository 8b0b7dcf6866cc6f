//! Function registry.
//!
//! The expansion compiler resolves `$(name ...)` against the registry once,
//! at compile time, and stores the [`FunctionId`]. Hosts may register extra
//! functions before the registry is shared.

mod builtins;

use std::borrow::Cow;

use rustc_hash::FxHashMap;

use crate::errors::EvalError;
use crate::expand::{ExpansionArena, Expander, Operand, MAX_FUNCTION_NAME, MIN_FUNCTION_NAME};

/// Signature of a function whose arguments arrive expanded.
pub type FunctionImpl =
    fn(&mut Expander<'_>, &mut [Cow<'_, str>], &mut String) -> Result<(), EvalError>;

/// Signature of a function that expands its arguments itself, through
/// [`LazyArgs`].
pub type LazyFunctionImpl = fn(&mut Expander<'_>, &LazyArgs<'_>, &mut String) -> Result<(), EvalError>;

#[derive(Copy, Clone, Debug)]
pub enum Implementation {
    Expanded(FunctionImpl),
    Lazy(LazyFunctionImpl),
}

#[derive(Copy, Clone, Debug)]
pub struct FunctionDef {
    pub name: &'static str,
    pub min_args: usize,
    /// 0 means unlimited. Past the maximum, commas belong to the last
    /// argument.
    pub max_args: usize,
    /// The implementation may modify its argument buffers.
    pub dirty: bool,
    pub implementation: Implementation,
}

impl FunctionDef {
    pub const fn new(name: &'static str, min_args: usize, max_args: usize, implementation: FunctionImpl) -> Self {
        FunctionDef {
            name,
            min_args,
            max_args,
            dirty: false,
            implementation: Implementation::Expanded(implementation),
        }
    }

    /// A function that decides which arguments to expand, such as `if`.
    pub const fn lazy(name: &'static str, min_args: usize, max_args: usize, implementation: LazyFunctionImpl) -> Self {
        FunctionDef {
            name,
            min_args,
            max_args,
            dirty: false,
            implementation: Implementation::Lazy(implementation),
        }
    }

    #[must_use]
    pub const fn dirty(mut self) -> Self {
        self.dirty = true;
        self
    }

    /// Arguments are expanded before the call.
    pub const fn expands_args(&self) -> bool {
        matches!(self.implementation, Implementation::Expanded(_))
    }
}

/// Unexpanded arguments of a lazy function.
///
/// Arguments containing `$` were compiled together with the call, so
/// expanding one runs its subprogram instead of compiling it again.
pub struct LazyArgs<'a> {
    arena: &'a ExpansionArena,
    args: &'a [Operand],
}

impl<'a> LazyArgs<'a> {
    pub(crate) fn new(arena: &'a ExpansionArena, args: &'a [Operand]) -> Self {
        LazyArgs { arena, args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Expand argument `index` onto `out`. A missing argument is empty.
    pub fn expand_into(&self, exp: &mut Expander<'_>, index: usize, out: &mut String) -> Result<(), EvalError> {
        match self.args.get(index) {
            Some(&arg) => exp.operand(self.arena, arg, out),
            None => Ok(()),
        }
    }

    pub fn expand(&self, exp: &mut Expander<'_>, index: usize) -> Result<String, EvalError> {
        let mut out = String::new();
        self.expand_into(exp, index, &mut out)?;
        Ok(out)
    }
}

/// Index of a registered function.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FunctionId(u32);

#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    defs: Vec<FunctionDef>,
    by_name: FxHashMap<&'static str, FunctionId>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every builtin function.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for def in builtins::BUILTINS {
            registry.register(*def);
        }
        registry
    }

    /// Add `def`, shadowing an earlier function of the same name. Ids of
    /// earlier registrations stay valid.
    pub fn register(&mut self, def: FunctionDef) -> FunctionId {
        debug_assert!(
            (MIN_FUNCTION_NAME..=MAX_FUNCTION_NAME).contains(&def.name.len()),
            "function name '{}' cannot be called",
            def.name
        );
        let id = FunctionId(u32::try_from(self.defs.len()).unwrap_or(u32::MAX));
        self.defs.push(def);
        self.by_name.insert(def.name, id);
        id
    }

    pub fn resolve(&self, name: &str) -> Option<FunctionId> {
        self.by_name.get(name).copied()
    }

    /// # Panics
    /// Panics if `id` came from another registry.
    pub fn get(&self, id: FunctionId) -> &FunctionDef {
        &self.defs[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.by_name.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests;
