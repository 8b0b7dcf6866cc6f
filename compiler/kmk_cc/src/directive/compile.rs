//! Directive compiler: the line-driven state machine.

use std::sync::Arc;

use kmk_diagnostic::{Diagnostic, ErrorCode};
use kmk_ir::{AssignOp, Location, Origin};
use kmk_lexer::{classify_keyword, split_words, Keyword, LineReader, LogicalLine, Word};
use smallvec::SmallVec;

use super::{AssignFlags, Assignment, CondTest, EvalInstr, IncludeKind, RuleHeader};
use crate::arena::{Addr, Blocks, TextId};
use crate::errors::{
    duplicate_else, else_without_if, empty_variable_name, endif_without_if, extraneous_endef,
    extraneous_text, malformed_conditional, missing_endef, missing_endif, missing_separator,
    missing_target, qualifier_without_assignment, too_deep_nesting, unsupported, CompileError,
};
use crate::expand::{ExpCompiler, ExpansionArena, Operand};
use crate::CompilerContext;

/// Deepest conditional nesting accepted.
pub const MAX_CONDITIONAL_DEPTH: usize = 32;

pub(super) struct Compiled {
    pub exp: ExpansionArena,
    pub code: Blocks<EvalInstr>,
    pub entry: Addr,
    pub warnings: Vec<Diagnostic>,
}

/// Compile-time state of one open conditional.
struct CondFrame {
    /// Conditional whose false target is still open.
    pending: Option<Addr>,
    /// Jumps that leave a taken branch; all land after `endif`.
    exit_jumps: SmallVec<[Addr; 4]>,
    seen_else: bool,
    location: Location,
}

/// What a line that is not a directive turned out to be.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum LineKind {
    Assign { at: u32, op: AssignOp, len: u32 },
    Rule { colon: u32 },
    Shell,
    Other,
}

pub(super) struct EvalCompiler<'c, 's> {
    exp: ExpCompiler<'c>,
    code: Blocks<EvalInstr>,
    lines: LineReader<'s>,
    src: &'s str,
    file: Arc<str>,
    frames: SmallVec<[CondFrame; 4]>,
    /// Lines of the rule being read; `None` outside a recipe.
    recipe: Option<Vec<TextId>>,
    warnings: Vec<Diagnostic>,
}

impl<'c, 's> EvalCompiler<'c, 's> {
    pub(super) fn new(cx: &'c CompilerContext, src: &'s str, file: Arc<str>, first_line: u32) -> Self {
        let hint = cx.config().first_block_hint;
        EvalCompiler {
            exp: ExpCompiler::new(cx, ExpansionArena::with_size_hint(hint, src.len() / 2)),
            code: Blocks::with_capacity(hint),
            lines: LineReader::new(src, first_line),
            src,
            file,
            frames: SmallVec::new(),
            recipe: None,
            warnings: Vec::new(),
        }
    }

    pub(super) fn run(mut self) -> Result<Compiled, CompileError> {
        let entry = self.code.next_addr();
        while let Some(line) = self.lines.next() {
            self.line(line)?;
        }
        if let Some(frame) = self.frames.last() {
            return Err(missing_endif().at(frame.location.clone()));
        }
        self.end_recipe();
        self.code.alloc(EvalInstr::Return);
        Ok(Compiled {
            exp: self.exp.finish(),
            code: self.code,
            entry,
            warnings: self.warnings,
        })
    }

    fn location(&self, line: &LogicalLine, at: u32) -> Location {
        line.location(&self.file, at)
    }

    fn warn(&mut self, code: ErrorCode, message: String, location: Location) {
        tracing::warn!(%location, "{message}");
        self.warnings
            .push(Diagnostic::warning(code).with_message(message).at(location));
    }

    fn line(&mut self, mut line: LogicalLine) -> Result<(), CompileError> {
        let src = self.src;
        if self.recipe.is_some() && line.starts_with_tab(src) {
            let id = self.exp.dup(&src[line.start as usize + 1..line.end as usize]);
            if let Some(recipe) = self.recipe.as_mut() {
                recipe.push(id);
            }
            return Ok(());
        }

        line.strip_comment(src);
        if line.is_blank(src) {
            return Ok(());
        }
        let start = line.skip_blanks(src, line.start, line.end);
        let location = self.location(&line, start);
        let keyword = classify_keyword(&src[start as usize..line.end as usize]);

        if let Some((kw, len)) = keyword {
            let after = start + len as u32;
            // Conditionals may appear inside a recipe without ending it.
            match kw {
                _ if kw.is_conditional() => {
                    self.flush_commands();
                    return self.open_conditional(kw, &line, after, location);
                }
                Keyword::Else => {
                    self.flush_commands();
                    return self.else_branch(&line, after, location);
                }
                Keyword::Endif => {
                    self.flush_commands();
                    return self.endif(&line, after, location);
                }
                _ => {}
            }
        }
        self.end_recipe();

        match keyword {
            Some((Keyword::Define, len)) => self.define(&line, start + len as u32, AssignFlags::empty(), location),
            Some((Keyword::Endef, _)) => Err(extraneous_endef().at(location)),
            Some((kw, _)) if kw.is_qualifier() => self.qualified(&line, start, location),
            Some((Keyword::Unexport, len)) => self.export_list(&line, start + len as u32, false, location),
            Some((Keyword::Undefine, len)) => self.undefine(&line, start + len as u32, Origin::File, location),
            Some((
                kw @ (Keyword::Include
                | Keyword::IncludeSilent
                | Keyword::Sinclude
                | Keyword::IncludeDep
                | Keyword::IncludeDepQueue
                | Keyword::IncludeDepFlush),
                len,
            )) => {
                let kind = match kw {
                    Keyword::Include => IncludeKind::Normal,
                    Keyword::IncludeDep => IncludeKind::Dep,
                    Keyword::IncludeDepQueue => IncludeKind::DepQueue,
                    Keyword::IncludeDepFlush => IncludeKind::DepFlush,
                    _ => IncludeKind::Silent,
                };
                self.include(kind, &line, start + len as u32, location)
            }
            _ => self.statement(&line, start, AssignFlags::empty(), location),
        }
    }

    // Recipes

    fn flush_commands(&mut self) {
        if let Some(recipe) = self.recipe.as_mut() {
            if !recipe.is_empty() {
                let lines = std::mem::take(recipe).into_boxed_slice();
                self.code.alloc(EvalInstr::RecipeCommands(lines));
            }
        }
    }

    fn end_recipe(&mut self) {
        self.flush_commands();
        self.recipe = None;
    }

    // Conditionals

    fn open_conditional(
        &mut self,
        kw: Keyword,
        line: &LogicalLine,
        after: u32,
        location: Location,
    ) -> Result<(), CompileError> {
        if self.frames.len() >= MAX_CONDITIONAL_DEPTH {
            return Err(too_deep_nesting(MAX_CONDITIONAL_DEPTH).at(location));
        }
        let addr = self.conditional(kw, line, after, location.clone())?;
        self.frames.push(CondFrame {
            pending: Some(addr),
            exit_jumps: SmallVec::new(),
            seen_else: false,
            location,
        });
        Ok(())
    }

    fn conditional(
        &mut self,
        kw: Keyword,
        line: &LogicalLine,
        after: u32,
        location: Location,
    ) -> Result<Addr, CompileError> {
        let test = self.cond_test(kw, line, after).map_err(|e| e.at(location.clone()))?;
        Ok(self.code.alloc(EvalInstr::Conditional {
            test,
            false_target: Addr::PENDING,
            location,
        }))
    }

    fn cond_test(&mut self, kw: Keyword, line: &LogicalLine, after: u32) -> Result<CondTest, CompileError> {
        let src = self.src;
        let from = line.skip_blanks(src, after, line.end);
        let to = line.trim_end(src, from, line.end);
        match kw {
            Keyword::Ifdef | Keyword::Ifndef => {
                let words = split_words(line, src, from, to);
                let word = match words.as_slice() {
                    [] => return Err(malformed_conditional(kw.as_str(), "missing variable name")),
                    [word] => *word,
                    _ => return Err(extraneous_text(kw.as_str())),
                };
                let name = self.word_operand(line, &word)?;
                Ok(if kw == Keyword::Ifdef {
                    CondTest::Defined(name)
                } else {
                    CondTest::NotDefined(name)
                })
            }
            Keyword::If => {
                if from == to {
                    return Err(malformed_conditional("if", "missing expression"));
                }
                let expr = line.normalized(src, from, to);
                Ok(CondTest::Expr(self.exp.operand(&expr)?))
            }
            _ => {
                let text = line.normalized(src, from, to);
                let (left, right) = split_comparison(kw.as_str(), &text)?;
                let left = self.exp.operand(left)?;
                let right = self.exp.operand(right)?;
                Ok(match kw {
                    Keyword::Ifeq => CondTest::Equal(left, right),
                    Keyword::Ifneq => CondTest::NotEqual(left, right),
                    Keyword::If1of => CondTest::OneOf(left, right),
                    _ => CondTest::NotOneOf(left, right),
                })
            }
        }
    }

    fn else_branch(&mut self, line: &LogicalLine, after: u32, location: Location) -> Result<(), CompileError> {
        let src = self.src;
        let Some(frame) = self.frames.last() else {
            return Err(else_without_if().at(location));
        };
        if frame.seen_else {
            return Err(duplicate_else().at(location));
        }
        let rest = line.skip_blanks(src, after, line.end);
        let chained = if rest < line.end {
            match classify_keyword(&src[rest as usize..line.end as usize]) {
                Some((kw, len)) if kw.is_conditional() => Some((kw, rest + len as u32)),
                _ => return Err(extraneous_text("else").at(location)),
            }
        } else {
            None
        };

        let jump = self.code.alloc(EvalInstr::Jump(Addr::PENDING));
        let target = self.code.next_addr();
        let pending = self.frames.last_mut().and_then(|frame| {
            frame.exit_jumps.push(jump);
            frame.pending.take()
        });
        if let Some(cond) = pending {
            self.patch(cond, target);
        }

        match chained {
            Some((kw, after)) => {
                let cond = self.conditional(kw, line, after, location)?;
                if let Some(frame) = self.frames.last_mut() {
                    frame.pending = Some(cond);
                }
            }
            None => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.seen_else = true;
                }
            }
        }
        Ok(())
    }

    fn endif(&mut self, line: &LogicalLine, after: u32, location: Location) -> Result<(), CompileError> {
        if line.skip_blanks(self.src, after, line.end) < line.end {
            return Err(extraneous_text("endif").at(location));
        }
        let Some(frame) = self.frames.pop() else {
            return Err(endif_without_if().at(location));
        };
        let target = self.code.next_addr();
        for addr in frame.pending.into_iter().chain(frame.exit_jumps) {
            self.patch(addr, target);
        }
        Ok(())
    }

    fn patch(&mut self, at: Addr, target: Addr) {
        match self.code.get_mut(at) {
            Some(EvalInstr::Conditional { false_target, .. }) => *false_target = target,
            Some(EvalInstr::Jump(to)) => *to = target,
            other => debug_assert!(other.is_none(), "patching a non-branch instruction at {at}"),
        }
    }

    // Operands

    /// Plain words are stored as they are; the lexer already looked for `$`.
    fn word_operand(&mut self, line: &LogicalLine, word: &Word) -> Result<Operand, CompileError> {
        let text = word.text(line, self.src);
        if word.needs_expansion() {
            Ok(Operand::Sub(self.exp.compile_stream(&text, 1)?))
        } else {
            Ok(Operand::Plain(self.exp.dup(&text)))
        }
    }

    fn word_operands(&mut self, line: &LogicalLine, from: u32) -> Result<Box<[Operand]>, CompileError> {
        let words = split_words(line, self.src, from, line.end);
        let mut ops = Vec::with_capacity(words.len());
        for word in &words {
            ops.push(self.word_operand(line, word)?);
        }
        Ok(ops.into_boxed_slice())
    }

    fn region_operand(&mut self, line: &LogicalLine, from: u32, to: u32) -> Result<Operand, CompileError> {
        let from = line.skip_blanks(self.src, from, to);
        let to = line.trim_end(self.src, from, to);
        let text = line.normalized(self.src, from, to);
        self.exp.operand(&text)
    }

    // Variables

    /// `export`, `local`, `override` and `private`, in any order, in front of
    /// an assignment or `define`. A lone `export` is the export directive.
    /// `override` may also qualify `undefine`.
    fn qualified(&mut self, line: &LogicalLine, start: u32, location: Location) -> Result<(), CompileError> {
        let src = self.src;
        let mut flags = AssignFlags::empty();
        let mut first = None;
        let mut pos = start;
        while let Some((kw, len)) = classify_keyword(&src[pos as usize..line.end as usize]) {
            if kw == Keyword::Define {
                return self.define(line, pos + len as u32, flags, location);
            }
            if kw == Keyword::Undefine && flags == AssignFlags::OVERRIDE {
                return self.undefine(line, pos + len as u32, Origin::Override, location);
            }
            let Some(flag) = AssignFlags::from_keyword(kw) else {
                break;
            };
            if flags.contains(flag) {
                self.warn(ErrorCode::W2001, format!("'{kw}' given more than once"), location.clone());
            }
            flags |= flag;
            first.get_or_insert(kw);
            pos = line.skip_blanks(src, pos + len as u32, line.end);
        }

        if let LineKind::Assign { .. } = classify_line(src, pos, line.end) {
            return self.statement(line, pos, flags, location);
        }
        if flags == AssignFlags::EXPORT {
            return self.export_list(line, pos, true, location);
        }
        let qualifier = first.map_or("export", Keyword::as_str);
        Err(qualifier_without_assignment(qualifier).at(location))
    }

    fn export_list(&mut self, line: &LogicalLine, from: u32, export: bool, location: Location) -> Result<(), CompileError> {
        let names = self.word_operands(line, from).map_err(|e| e.at(location))?;
        let instr = match (names.is_empty(), export) {
            (true, true) => EvalInstr::ExportAll,
            (true, false) => EvalInstr::UnexportAll,
            (false, true) => EvalInstr::Export(names),
            (false, false) => EvalInstr::Unexport(names),
        };
        self.code.alloc(instr);
        Ok(())
    }

    fn undefine(&mut self, line: &LogicalLine, from: u32, origin: Origin, location: Location) -> Result<(), CompileError> {
        let names = self.word_operands(line, from).map_err(|e| e.at(location.clone()))?;
        if names.is_empty() {
            return Err(empty_variable_name().at(location));
        }
        self.code.alloc(EvalInstr::Undefine { names, origin });
        Ok(())
    }

    fn include(
        &mut self,
        kind: IncludeKind,
        line: &LogicalLine,
        from: u32,
        location: Location,
    ) -> Result<(), CompileError> {
        let files = self.word_operands(line, from).map_err(|e| e.at(location.clone()))?;
        if files.is_empty() && kind != IncludeKind::DepFlush {
            return Ok(());
        }
        self.code.alloc(EvalInstr::Include { kind, files, location });
        Ok(())
    }

    /// Assignment, rule or reference-only line.
    fn statement(
        &mut self,
        line: &LogicalLine,
        start: u32,
        flags: AssignFlags,
        location: Location,
    ) -> Result<(), CompileError> {
        match classify_line(self.src, start, line.end) {
            LineKind::Assign { at, op, len } => self.assignment(line, start, (at, op, len), flags, location),
            LineKind::Rule { colon } => self.rule(line, start, colon, location),
            LineKind::Shell => Err(unsupported("shell assignments ('!=')").at(location)),
            LineKind::Other => {
                let text = line.normalized(self.src, start, line.end);
                if !text.contains('$') {
                    return Err(missing_separator().at(location));
                }
                let text = self.exp.compile_stream(&text, 1).map_err(|e| e.at(location.clone()))?;
                self.code.alloc(EvalInstr::ExpandLine { text, location });
                Ok(())
            }
        }
    }

    fn assignment(
        &mut self,
        line: &LogicalLine,
        start: u32,
        (at, op, len): (u32, AssignOp, u32),
        flags: AssignFlags,
        location: Location,
    ) -> Result<(), CompileError> {
        let src = self.src;
        let name_end = line.trim_end(src, start, at);
        if name_end == start {
            return Err(empty_variable_name().at(location));
        }
        let name = self.region_operand(line, start, name_end).map_err(|e| e.at(location.clone()))?;
        let value_from = line.skip_blanks(src, at + len, line.end);
        let value_to = line.trim_end(src, value_from, line.end);
        let value = line.normalized(src, value_from, value_to);
        self.emit_assignment(name, op, flags, &value, location)
    }

    fn emit_assignment(
        &mut self,
        name: Operand,
        op: AssignOp,
        flags: AssignFlags,
        value: &str,
        location: Location,
    ) -> Result<(), CompileError> {
        let value_sub = if op == AssignOp::Simple && value.contains('$') {
            Some(self.exp.compile_stream(value, 1).map_err(|e| e.at(location.clone()))?)
        } else {
            None
        };
        let value = self.exp.dup(value);
        self.code.alloc(EvalInstr::Assign(Box::new(Assignment {
            name,
            op,
            flags,
            value,
            value_sub,
            location,
        })));
        Ok(())
    }

    /// `define NAME [op]` up to the matching `endef`. The body is kept
    /// verbatim, lines joined with `\n`.
    fn define(
        &mut self,
        line: &LogicalLine,
        after: u32,
        flags: AssignFlags,
        location: Location,
    ) -> Result<(), CompileError> {
        let src = self.src;
        let from = line.skip_blanks(src, after, line.end);
        let to = line.trim_end(src, from, line.end);
        let header = line.normalized(src, from, to);
        let (name, op) = split_define_header(&header);
        if name.is_empty() {
            return Err(empty_variable_name().at(location));
        }
        let name = self.exp.operand(name).map_err(|e| e.at(location.clone()))?;

        let mut body = String::new();
        let mut depth = 1usize;
        let mut first = true;
        loop {
            let Some(body_line) = self.lines.next() else {
                return Err(missing_endef().at(location));
            };
            let raw = body_line.raw(src);
            let trimmed = raw.trim_start_matches([' ', '\t']);
            match classify_keyword(trimmed) {
                Some((Keyword::Define, _)) => depth += 1,
                Some((Keyword::Endef, len)) => {
                    depth -= 1;
                    if depth == 0 {
                        let rest = trimmed[len..].trim_start_matches([' ', '\t']);
                        if !rest.is_empty() && !rest.starts_with('#') {
                            let at = body_line.start + (raw.len() - rest.len()) as u32;
                            return Err(extraneous_text("endef").at(self.location(&body_line, at)));
                        }
                        break;
                    }
                }
                _ => {}
            }
            if !first {
                body.push('\n');
            }
            body.push_str(raw);
            first = false;
        }
        self.emit_assignment(name, op, flags, &body, location)
    }

    // Rules

    fn rule(&mut self, line: &LogicalLine, start: u32, colon: u32, location: Location) -> Result<(), CompileError> {
        let src = self.src;
        let bytes = src.as_bytes();
        if line.trim_end(src, start, colon) == start {
            return Err(missing_target().at(location));
        }
        let double_colon = bytes.get(colon as usize + 1) == Some(&b':');
        let deps = colon + 1 + u32::from(double_colon);
        let tail = scan_rule_tail(src, deps, line.end).map_err(|e| e.at(location.clone()))?;
        let deps_end = tail.semicolon.unwrap_or(line.end);
        let (prereqs_end, order_start) = match tail.pipe {
            Some(pipe) => (pipe, pipe + 1),
            None => (deps_end, deps_end),
        };

        let at = |e: CompileError| e.at(location.clone());
        let targets = self.region_operand(line, start, colon).map_err(at)?;
        let prereqs = self.region_operand(line, deps, prereqs_end).map_err(at)?;
        let order_only = self.region_operand(line, order_start, deps_end).map_err(at)?;
        self.code.alloc(EvalInstr::RecipeStart(Box::new(RuleHeader {
            targets,
            prereqs,
            order_only,
            double_colon,
            location,
        })));

        let mut recipe = Vec::new();
        if let Some(semi) = tail.semicolon {
            let from = line.skip_blanks(src, semi + 1, line.end);
            if from < line.end {
                recipe.push(self.exp.dup(&src[from as usize..line.end as usize]));
            }
        }
        self.recipe = Some(recipe);
        Ok(())
    }
}

/// Positions after the colon of a rule line.
struct RuleTail {
    semicolon: Option<u32>,
    pipe: Option<u32>,
}

fn scan_rule_tail(src: &str, from: u32, to: u32) -> Result<RuleTail, CompileError> {
    let mut tail = RuleTail {
        semicolon: None,
        pipe: None,
    };
    for (i, b) in top_level_bytes(src, from, to) {
        match b {
            b';' => {
                tail.semicolon = Some(i);
                break;
            }
            b'=' => return Err(unsupported("target-specific variables")),
            b':' => return Err(unsupported("static pattern rules")),
            b'|' if tail.pipe.is_none() => tail.pipe = Some(i),
            _ => {}
        }
    }
    Ok(tail)
}

/// Bytes of `from..to` that are outside any `$(...)` or `${...}`, with
/// their offsets. `$$` is skipped.
fn top_level_bytes(src: &str, from: u32, to: u32) -> impl Iterator<Item = (u32, u8)> + '_ {
    let bytes = &src.as_bytes()[..to as usize];
    let mut depth = 0usize;
    let mut i = from as usize;
    std::iter::from_fn(move || {
        while i < bytes.len() {
            let at = i;
            let b = bytes[i];
            i += 1;
            match b {
                b'$' if matches!(bytes.get(at + 1), Some(b'(' | b'{')) => {
                    depth += 1;
                    i += 1;
                }
                b'$' if bytes.get(at + 1) == Some(&b'$') => i += 1,
                b'(' | b'{' if depth > 0 => depth += 1,
                b')' | b'}' if depth > 0 => depth -= 1,
                _ if depth > 0 => {}
                _ => return Some((u32::try_from(at).unwrap_or(u32::MAX), b)),
            }
        }
        None
    })
}

fn classify_line(src: &str, from: u32, to: u32) -> LineKind {
    let bytes = src.as_bytes();
    for (i, b) in top_level_bytes(src, from, to) {
        let rest = &bytes[i as usize..to as usize];
        if rest.starts_with(b"!=") {
            return LineKind::Shell;
        }
        if let Some((op, len)) = AssignOp::parse_prefix(rest) {
            return LineKind::Assign {
                at: i,
                op,
                len: u32::try_from(len).unwrap_or(u32::MAX),
            };
        }
        if b == b':' {
            return LineKind::Rule { colon: i };
        }
    }
    LineKind::Other
}

/// Split the operands of `ifeq`-style conditionals: `(a,b)`, `"a" "b"` or
/// `'a' 'b'` (quote kinds may be mixed).
fn split_comparison<'t>(keyword: &str, text: &'t str) -> Result<(&'t str, &'t str), CompileError> {
    let bytes = text.as_bytes();
    match bytes.first() {
        Some(b'(') => {
            let mut depth = 0usize;
            let mut braces = 0usize;
            let mut comma = None;
            let mut close = None;
            for (i, &b) in bytes.iter().enumerate() {
                match b {
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            close = Some(i);
                            break;
                        }
                    }
                    b'{' => braces += 1,
                    b'}' => braces = braces.saturating_sub(1),
                    b',' if depth == 1 && braces == 0 && comma.is_none() => comma = Some(i),
                    _ => {}
                }
            }
            let close = close.ok_or_else(|| malformed_conditional(keyword, "missing ')'"))?;
            let comma = comma.ok_or_else(|| malformed_conditional(keyword, "missing ','"))?;
            if !text[close + 1..].trim().is_empty() {
                return Err(extraneous_text(keyword));
            }
            Ok((text[1..comma].trim(), text[comma + 1..close].trim()))
        }
        Some(b'"' | b'\'') => {
            let (left, rest) = quoted(keyword, text)?;
            let rest = rest.trim_start();
            if rest.is_empty() {
                return Err(malformed_conditional(keyword, "missing second operand"));
            }
            let (right, rest) = quoted(keyword, rest)?;
            if !rest.trim().is_empty() {
                return Err(extraneous_text(keyword));
            }
            Ok((left, right))
        }
        _ => Err(malformed_conditional(keyword, "expected '(' or a quoted string")),
    }
}

fn quoted<'t>(keyword: &str, text: &'t str) -> Result<(&'t str, &'t str), CompileError> {
    let quote = match text.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return Err(malformed_conditional(keyword, "expected a quoted string")),
    };
    let end = text[1..]
        .find(quote)
        .ok_or_else(|| malformed_conditional(keyword, "unterminated string"))?
        + 1;
    Ok((&text[1..end], &text[end + 1..]))
}

/// `NAME`, `NAME =`, `NAME :=` ... of a `define` line.
fn split_define_header(header: &str) -> (&str, AssignOp) {
    const OPERATORS: [(&str, AssignOp); 6] = [
        ("::=", AssignOp::Simple),
        (":=", AssignOp::Simple),
        ("+=", AssignOp::Append),
        ("?=", AssignOp::Conditional),
        ("<=", AssignOp::Prepend),
        ("=", AssignOp::Recursive),
    ];
    for (suffix, op) in OPERATORS {
        if let Some(name) = header.strip_suffix(suffix) {
            return (name.trim_end(), op);
        }
    }
    (header, AssignOp::Recursive)
}
