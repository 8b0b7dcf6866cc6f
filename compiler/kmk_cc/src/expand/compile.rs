//! Expansion compiler.

use smallvec::SmallVec;

use super::subst::{reference_patterns, split_subst_ref, Pattern};
use super::{ExpInstr, ExpansionArena, Operand, SearchReplace, StoredPattern, SubProgram};
use crate::errors::{too_few_arguments, too_many_levels, unterminated_reference, CompileError};
use crate::functions::FunctionDef;
use crate::CompilerContext;

/// Deepest stream level that may be compiled; the top-level text is level 1.
pub const MAX_NESTING: u32 = 16;

/// Function names shorter or longer than this are never looked up.
pub const MIN_FUNCTION_NAME: usize = 2;
pub const MAX_FUNCTION_NAME: usize = 16;

pub(crate) struct ExpCompiler<'c> {
    arena: ExpansionArena,
    cx: &'c CompilerContext,
}

impl<'c> ExpCompiler<'c> {
    pub(crate) fn new(cx: &'c CompilerContext, arena: ExpansionArena) -> Self {
        ExpCompiler { arena, cx }
    }

    pub(crate) fn finish(self) -> ExpansionArena {
        self.arena
    }

    pub(crate) fn dup(&mut self, text: &str) -> crate::arena::TextId {
        self.arena.text.dup(text)
    }

    /// Literal text stays plain; anything with a `$` becomes a top-level
    /// subprogram.
    pub(crate) fn operand(&mut self, text: &str) -> Result<Operand, CompileError> {
        if text.contains('$') {
            Ok(Operand::Sub(self.compile_stream(text, 1)?))
        } else {
            Ok(Operand::Plain(self.dup(text)))
        }
    }

    /// Compile `text` into a stream ending in `Return`.
    ///
    /// Nested streams are emitted first; this stream's instructions are
    /// buffered and emitted contiguously at the end.
    pub(crate) fn compile_stream(&mut self, text: &str, level: u32) -> Result<SubProgram, CompileError> {
        if level > MAX_NESTING {
            return Err(too_many_levels(MAX_NESTING));
        }
        let bytes = text.as_bytes();
        let mut stream: SmallVec<[ExpInstr; 4]> = SmallVec::new();
        let mut literal = String::new();
        let mut pos = 0;

        while let Some(off) = memchr::memchr(b'$', &bytes[pos..]) {
            let dollar = pos + off;
            literal.push_str(&text[pos..dollar]);
            let run = bytes[dollar..].iter().take_while(|&&b| b == b'$').count();
            for _ in 0..run / 2 {
                literal.push('$');
            }
            pos = dollar + run;
            if run % 2 == 0 {
                continue;
            }
            // A lone `$` at the very end expands to nothing.
            let Some(c) = text[pos..].chars().next() else {
                break;
            };
            self.flush_literal(&mut literal, &mut stream);
            match c {
                '(' | '{' => {
                    let (open, close) = if c == '(' { (b'(', b')') } else { (b'{', b'}') };
                    let body_start = pos + 1;
                    let body_end = find_close(bytes, body_start, open, close)
                        .ok_or_else(|| unterminated_reference(c, char::from(close)))?;
                    let instr = self.reference(&text[body_start..body_end], open, close, level)?;
                    stream.push(instr);
                    pos = body_end + 1;
                }
                _ => {
                    let end = pos + c.len_utf8();
                    let name = self.cx.interner().intern(&text[pos..end]);
                    stream.push(ExpInstr::PlainVariable(name));
                    pos = end;
                }
            }
        }
        literal.push_str(&text[pos..]);
        self.flush_literal(&mut literal, &mut stream);
        stream.push(ExpInstr::Return);

        let entry = self.arena.code.next_addr();
        for instr in stream {
            self.arena.code.alloc(instr);
        }
        Ok(SubProgram { entry })
    }

    fn flush_literal(&mut self, literal: &mut String, stream: &mut SmallVec<[ExpInstr; 4]>) {
        if !literal.is_empty() {
            let id = self.arena.text.dup(literal);
            stream.push(ExpInstr::CopyString(id));
            literal.clear();
        }
    }

    /// Body of a `$(...)` or `${...}`: function call or variable reference.
    fn reference(&mut self, body: &str, open: u8, close: u8, level: u32) -> Result<ExpInstr, CompileError> {
        if let Some(instr) = self.function_call(body, open, close, level)? {
            return Ok(instr);
        }
        if body.contains('$') {
            let name = self.compile_stream(body, level + 1)?;
            return Ok(ExpInstr::DynamicVariable(name));
        }
        if let Some((name, search, replace)) = split_subst_ref(body) {
            let (search, replace) = reference_patterns(search, replace);
            let search = self.store_pattern(&search);
            let replace = self.store_pattern(&replace);
            return Ok(ExpInstr::SearchAndReplacePlainVariable(Box::new(SearchReplace {
                name: self.cx.interner().intern(name),
                search,
                replace,
            })));
        }
        Ok(ExpInstr::PlainVariable(self.cx.interner().intern(body)))
    }

    fn store_pattern(&mut self, pattern: &Pattern<'_>) -> StoredPattern {
        StoredPattern {
            prefix: self.arena.text.dup(&pattern.prefix),
            suffix: self.arena.text.dup(pattern.suffix),
            percent: pattern.percent,
        }
    }

    fn function_call(
        &mut self,
        body: &str,
        open: u8,
        close: u8,
        level: u32,
    ) -> Result<Option<ExpInstr>, CompileError> {
        let name_len = body
            .bytes()
            .position(kmk_lexer::is_blank)
            .unwrap_or(body.len());
        if !(MIN_FUNCTION_NAME..=MAX_FUNCTION_NAME).contains(&name_len) {
            return Ok(None);
        }
        let registry = self.cx.functions();
        let Some(func) = registry.resolve(&body[..name_len]) else {
            return Ok(None);
        };
        let def: FunctionDef = *registry.get(func);

        let args = if name_len == body.len() {
            SmallVec::new()
        } else {
            let rest = body[name_len..].trim_start_matches([' ', '\t']);
            split_args(rest, open, close, def.max_args)
        };
        if args.len() < def.min_args {
            return Err(too_few_arguments(def.name, args.len(), def.min_args));
        }

        // Arguments of lazy functions are compiled here too; the function
        // picks which subprograms to run.
        if args.iter().all(|a| !a.contains('$')) {
            let args = args.iter().map(|a| self.arena.text.dup(a)).collect();
            return Ok(Some(ExpInstr::PlainFunction { func, args }));
        }
        let mut operands = Vec::with_capacity(args.len());
        for arg in args {
            let operand = if arg.contains('$') {
                Operand::Sub(self.compile_stream(arg, level + 1)?)
            } else {
                Operand::Plain(self.arena.text.dup(arg))
            };
            operands.push(operand);
        }
        Ok(Some(ExpInstr::DynamicFunction {
            func,
            args: operands.into_boxed_slice(),
        }))
    }
}

/// Offset of the delimiter closing a reference whose body starts at `from`.
/// Only delimiters of the same kind are counted.
fn find_close(bytes: &[u8], from: usize, open: u8, close: u8) -> Option<usize> {
    let mut depth = 1usize;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split function arguments on top-level commas. Once `max` arguments are
/// reached (0 = unlimited) the remainder, commas included, is the last one.
fn split_args(text: &str, open: u8, close: u8, max: usize) -> SmallVec<[&str; 4]> {
    let mut args = SmallVec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, b) in text.bytes().enumerate() {
        if max != 0 && args.len() + 1 == max {
            break;
        }
        if b == open {
            depth += 1;
        } else if b == close {
            depth = depth.saturating_sub(1);
        } else if b == b',' && depth == 0 {
            args.push(&text[start..i]);
            start = i + 1;
        }
    }
    args.push(&text[start..]);
    args
}
