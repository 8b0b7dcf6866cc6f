//! Expansion programs: compiled `$(...)` text.
//!
//! A value such as `hello $(NAME)` compiles to a stream of [`ExpInstr`]
//! ending in [`ExpInstr::Return`]. Nested text that itself needs expansion
//! (a computed variable name, a function argument containing `$`) compiles
//! to a [`SubProgram`] in the same arena. Each stream is stored contiguously
//! and after the subprograms it refers to, so the interpreter walks it with
//! [`Blocks::successor`] and never needs a jump.

mod compile;
mod run;
pub mod subst;

use std::sync::Arc;

use kmk_ir::Name;

use crate::arena::{Addr, ArenaStats, Blocks, TextBlocks, TextId};
use crate::errors::CompileError;
use crate::functions::FunctionId;
use crate::program::ProgramHeader;
use crate::CompilerContext;

pub(crate) use compile::ExpCompiler;
pub use compile::{MAX_NESTING, MAX_FUNCTION_NAME, MIN_FUNCTION_NAME};
pub use run::Expander;

/// Entry point of a nested instruction stream.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct SubProgram {
    pub entry: Addr,
}

/// Text that is either used verbatim or produced by a subprogram.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Operand {
    Plain(TextId),
    Sub(SubProgram),
}

/// A `%` pattern whose escapes were resolved at compile time.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct StoredPattern {
    pub prefix: TextId,
    pub suffix: TextId,
    pub percent: bool,
}

impl StoredPattern {
    pub fn resolve<'a>(&self, text: &'a TextBlocks) -> subst::Pattern<'a> {
        subst::Pattern {
            prefix: std::borrow::Cow::Borrowed(text.get(self.prefix)),
            suffix: text.get(self.suffix),
            percent: self.percent,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SearchReplace {
    pub name: Name,
    pub search: StoredPattern,
    pub replace: StoredPattern,
}

/// One expansion instruction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExpInstr {
    /// Append literal text.
    CopyString(TextId),
    /// Append the value of a variable named at compile time.
    PlainVariable(Name),
    /// Run the subprogram to get a name (possibly `NAME:a=b`), then append
    /// that variable's value.
    DynamicVariable(SubProgram),
    /// `$(NAME:search=replace)` with a literal name.
    SearchAndReplacePlainVariable(Box<SearchReplace>),
    /// Function call whose arguments are all literal.
    PlainFunction { func: FunctionId, args: Box<[TextId]> },
    /// Function call with at least one argument needing expansion.
    DynamicFunction { func: FunctionId, args: Box<[Operand]> },
    /// End of stream.
    Return,
}

/// Instruction and text storage of one program.
#[derive(Debug)]
pub struct ExpansionArena {
    pub(crate) code: Blocks<ExpInstr>,
    pub(crate) text: TextBlocks,
}

impl ExpansionArena {
    pub fn with_size_hint(slots: usize, text_bytes: usize) -> Self {
        ExpansionArena {
            code: Blocks::with_capacity(slots),
            text: TextBlocks::with_capacity(text_bytes),
        }
    }

    pub fn code(&self) -> &Blocks<ExpInstr> {
        &self.code
    }

    pub fn text(&self, id: TextId) -> &str {
        self.text.get(id)
    }

    pub fn stats(&self) -> ArenaStats {
        self.code.stats() + self.text.stats()
    }

    /// Instructions of the stream starting at `entry`, up to and including
    /// its `Return`.
    pub fn stream(&self, entry: Addr) -> Vec<&ExpInstr> {
        let mut out = Vec::new();
        let mut at = entry;
        while let Some(instr) = self.code.get(at) {
            out.push(instr);
            if matches!(instr, ExpInstr::Return) {
                break;
            }
            at = self.code.successor(at);
        }
        out
    }

    pub fn free_all(&mut self) {
        self.code.free_all();
        self.text.free_all();
    }
}

/// A compiled, re-runnable variable value.
///
/// Immutable once built; shared between runs (and threads) through `Arc`.
#[derive(Debug)]
pub struct ExpansionProgram {
    header: ProgramHeader,
    arena: ExpansionArena,
    entry: SubProgram,
}

impl ExpansionProgram {
    pub fn header(&self) -> &ProgramHeader {
        &self.header
    }

    pub fn arena(&self) -> &ExpansionArena {
        &self.arena
    }

    pub fn entry(&self) -> SubProgram {
        self.entry
    }

    /// Top-level instructions, in execution order.
    pub fn instructions(&self) -> Vec<&ExpInstr> {
        self.arena.stream(self.entry.entry)
    }

    /// Listing of every instruction in the arena, one per line.
    pub fn dump(&self, cx: &CompilerContext) -> String {
        let mut out = String::new();
        for (addr, instr) in self.arena.code.iter() {
            let marker = if addr == self.entry.entry { ">" } else { " " };
            out.push_str(&format!("{marker}{:<8} ", addr.to_string()));
            write_exp_instr(&mut out, instr, &self.arena, cx);
            out.push('\n');
        }
        out
    }
}

pub(crate) fn write_exp_instr(
    out: &mut String,
    instr: &ExpInstr,
    arena: &ExpansionArena,
    cx: &CompilerContext,
) {
    let names = cx.interner();
    let operand = |op: &Operand| match op {
        Operand::Plain(t) => format!("{:?}", arena.text(*t)),
        Operand::Sub(s) => format!("sub{}", s.entry),
    };
    let line = match instr {
        ExpInstr::CopyString(t) => format!("copy {:?}", arena.text(*t)),
        ExpInstr::PlainVariable(name) => format!("var {}", names.lookup(*name)),
        ExpInstr::DynamicVariable(sub) => format!("dynvar sub{}", sub.entry),
        ExpInstr::SearchAndReplacePlainVariable(sr) => format!(
            "subst {} {:?}{}{:?} -> {:?}{}{:?}",
            names.lookup(sr.name),
            arena.text(sr.search.prefix),
            if sr.search.percent { "%" } else { "" },
            arena.text(sr.search.suffix),
            arena.text(sr.replace.prefix),
            if sr.replace.percent { "%" } else { "" },
            arena.text(sr.replace.suffix),
        ),
        ExpInstr::PlainFunction { func, args } => {
            let args: Vec<String> = args.iter().map(|t| format!("{:?}", arena.text(*t))).collect();
            format!("call {} [{}]", cx.functions().get(*func).name, args.join(", "))
        }
        ExpInstr::DynamicFunction { func, args } => {
            let args: Vec<String> = args.iter().map(operand).collect();
            format!("dyncall {} [{}]", cx.functions().get(*func).name, args.join(", "))
        }
        ExpInstr::Return => "return".to_owned(),
    };
    out.push_str(&line);
}

/// Compile a variable value into an expansion program.
#[tracing::instrument(level = "trace", skip(cx, text), fields(len = text.len()))]
pub fn compile_expansion(cx: &CompilerContext, text: &str) -> Result<ExpansionProgram, CompileError> {
    let mut compiler = ExpCompiler::new(cx, ExpansionArena::with_size_hint(cx.config().first_block_hint, text.len()));
    let entry = compiler
        .compile_stream(text, 1)
        .inspect_err(|_| cx.stats().record_compile_error())?;
    let arena = compiler.finish();
    cx.stats().record_expansion_program(arena.stats());
    tracing::trace!(instructions = arena.code.len(), "compiled expansion program");
    Ok(ExpansionProgram {
        header: ProgramHeader::new(),
        arena,
        entry,
    })
}

/// [`compile_expansion`] into a shareable handle.
pub fn compile_shared(cx: &CompilerContext, text: &str) -> Result<Arc<ExpansionProgram>, CompileError> {
    compile_expansion(cx, text).map(Arc::new)
}

#[cfg(test)]
mod tests;
