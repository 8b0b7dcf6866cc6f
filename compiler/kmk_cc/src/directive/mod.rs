//! Evaluation programs: compiled makefile text.
//!
//! A makefile fragment compiles to a stream of [`EvalInstr`]. Operands that
//! need expansion are subprograms in the program's [`ExpansionArena`], so
//! one program owns both arenas.
//!
//! Conditionals compile to a [`EvalInstr::Conditional`] whose false target
//! and the [`EvalInstr::Jump`]s closing each taken branch are patched when
//! the matching `else`/`endif` is reached. Once compiled, nothing in the
//! program changes.

mod compile;

use std::sync::Arc;

use bitflags::bitflags;
use kmk_diagnostic::Diagnostic;
use kmk_ir::{AssignOp, Location, Name, Origin};

use crate::arena::{Addr, ArenaStats, Blocks, TextId};
use crate::errors::CompileError;
use crate::expand::{write_exp_instr, ExpansionArena, Operand, SubProgram};
use crate::program::ProgramHeader;
use crate::CompilerContext;

pub use compile::MAX_CONDITIONAL_DEPTH;

bitflags! {
    /// Qualifiers written in front of an assignment.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct AssignFlags: u8 {
        const LOCAL = 1 << 0;
        const OVERRIDE = 1 << 1;
        const PRIVATE = 1 << 2;
        const EXPORT = 1 << 3;
    }
}

impl AssignFlags {
    pub fn from_keyword(keyword: kmk_lexer::Keyword) -> Option<AssignFlags> {
        use kmk_lexer::Keyword;
        Some(match keyword {
            Keyword::Local => AssignFlags::LOCAL,
            Keyword::Override => AssignFlags::OVERRIDE,
            Keyword::Private => AssignFlags::PRIVATE,
            Keyword::Export => AssignFlags::EXPORT,
            _ => return None,
        })
    }
}

/// Test of a conditional directive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CondTest {
    /// `ifdef NAME`
    Defined(Operand),
    /// `ifndef NAME`
    NotDefined(Operand),
    /// `ifeq`
    Equal(Operand, Operand),
    /// `ifneq`
    NotEqual(Operand, Operand),
    /// `if1of`: some word of the left side occurs on the right side.
    OneOf(Operand, Operand),
    /// `ifn1of`
    NotOneOf(Operand, Operand),
    /// `if <expression>`
    Expr(Operand),
}

impl CondTest {
    pub fn keyword(&self) -> &'static str {
        match self {
            CondTest::Defined(_) => "ifdef",
            CondTest::NotDefined(_) => "ifndef",
            CondTest::Equal(..) => "ifeq",
            CondTest::NotEqual(..) => "ifneq",
            CondTest::OneOf(..) => "if1of",
            CondTest::NotOneOf(..) => "ifn1of",
            CondTest::Expr(_) => "if",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Assignment {
    pub name: Operand,
    pub op: AssignOp,
    pub flags: AssignFlags,
    /// Unexpanded value.
    pub value: TextId,
    /// Compiled value of a `:=` assignment that needs expansion.
    pub value_sub: Option<SubProgram>,
    pub location: Location,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum IncludeKind {
    /// `include`
    Normal,
    /// `-include` / `sinclude`: missing files are ignored.
    Silent,
    /// `includedep`
    Dep,
    /// `includedep-queue`: read once the queue is flushed.
    DepQueue,
    /// `includedep-flush`
    DepFlush,
}

impl IncludeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IncludeKind::Normal => "include",
            IncludeKind::Silent => "-include",
            IncludeKind::Dep => "includedep",
            IncludeKind::DepQueue => "includedep-queue",
            IncludeKind::DepFlush => "includedep-flush",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RuleHeader {
    pub targets: Operand,
    pub prereqs: Operand,
    pub order_only: Operand,
    pub double_colon: bool,
    pub location: Location,
}

/// One evaluation instruction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EvalInstr {
    /// Continue with the successor if `test` holds, else at `false_target`.
    Conditional {
        test: CondTest,
        false_target: Addr,
        location: Location,
    },
    Jump(Addr),
    Assign(Box<Assignment>),
    Export(Box<[Operand]>),
    Unexport(Box<[Operand]>),
    ExportAll,
    UnexportAll,
    /// `undefine`; `origin` is `Override` under the `override` qualifier.
    Undefine {
        names: Box<[Operand]>,
        origin: Origin,
    },
    Include {
        kind: IncludeKind,
        files: Box<[Operand]>,
        location: Location,
    },
    RecipeStart(Box<RuleHeader>),
    /// Unexpanded recipe lines of the current rule.
    RecipeCommands(Box<[TextId]>),
    /// A line that is only references; it must expand to blanks.
    ExpandLine { text: SubProgram, location: Location },
    Return,
}

/// A compiled makefile fragment.
#[derive(Debug)]
pub struct EvaluationProgram {
    header: ProgramHeader,
    exp: ExpansionArena,
    code: Blocks<EvalInstr>,
    entry: Addr,
    file: Arc<str>,
    variable: Option<Name>,
    warnings: Vec<Diagnostic>,
}

impl EvaluationProgram {
    pub fn header(&self) -> &ProgramHeader {
        &self.header
    }

    pub fn expansions(&self) -> &ExpansionArena {
        &self.exp
    }

    pub fn code(&self) -> &Blocks<EvalInstr> {
        &self.code
    }

    pub fn entry(&self) -> Addr {
        self.entry
    }

    pub fn file(&self) -> &Arc<str> {
        &self.file
    }

    /// Variable whose value this program was compiled from, if any.
    pub fn variable(&self) -> Option<Name> {
        self.variable
    }

    /// Compile-time warnings.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn stats(&self) -> ArenaStats {
        self.exp.stats() + self.code.stats()
    }

    /// Listing of the evaluation stream followed by the expansion
    /// subprograms it uses.
    pub fn dump(&self, cx: &CompilerContext) -> String {
        let names = cx.interner();
        let text = |id: TextId| self.exp.text(id);
        let operand = |op: &Operand| match op {
            Operand::Plain(t) => format!("{:?}", text(*t)),
            Operand::Sub(s) => format!("sub{}", s.entry),
        };
        let list = |ops: &[Operand]| ops.iter().map(operand).collect::<Vec<_>>().join(", ");

        let mut out = format!("; {}", self.file);
        if let Some(var) = self.variable {
            out.push_str(&format!(" (variable {})", names.lookup(var)));
        }
        out.push('\n');
        for (addr, instr) in self.code.iter() {
            let line = match instr {
                EvalInstr::Conditional {
                    test, false_target, ..
                } => {
                    let operands = match test {
                        CondTest::Defined(a) | CondTest::NotDefined(a) | CondTest::Expr(a) => operand(a),
                        CondTest::Equal(a, b)
                        | CondTest::NotEqual(a, b)
                        | CondTest::OneOf(a, b)
                        | CondTest::NotOneOf(a, b) => format!("{}, {}", operand(a), operand(b)),
                    };
                    format!("{} {operands} else {false_target}", test.keyword())
                }
                EvalInstr::Jump(target) => format!("jump {target}"),
                EvalInstr::Assign(a) => {
                    let mut flags = String::new();
                    for (name, _) in a.flags.iter_names() {
                        flags.push_str(&name.to_ascii_lowercase());
                        flags.push(' ');
                    }
                    let value = match a.value_sub {
                        Some(sub) => format!("sub{}", sub.entry),
                        None => format!("{:?}", text(a.value)),
                    };
                    format!("assign {flags}{} {} {value}", operand(&a.name), a.op)
                }
                EvalInstr::Export(ops) => format!("export [{}]", list(ops)),
                EvalInstr::Unexport(ops) => format!("unexport [{}]", list(ops)),
                EvalInstr::ExportAll => "export-all".to_owned(),
                EvalInstr::UnexportAll => "unexport-all".to_owned(),
                EvalInstr::Undefine { names, origin } => match origin {
                    Origin::Override => format!("override undefine [{}]", list(names)),
                    _ => format!("undefine [{}]", list(names)),
                },
                EvalInstr::Include { kind, files, .. } => format!("{} [{}]", kind.as_str(), list(files)),
                EvalInstr::RecipeStart(rule) => format!(
                    "rule {}{} {} | {}",
                    operand(&rule.targets),
                    if rule.double_colon { " ::" } else { " :" },
                    operand(&rule.prereqs),
                    operand(&rule.order_only),
                ),
                EvalInstr::RecipeCommands(lines) => {
                    let lines: Vec<_> = lines.iter().map(|t| format!("{:?}", text(*t))).collect();
                    format!("commands [{}]", lines.join(", "))
                }
                EvalInstr::ExpandLine { text, .. } => format!("expand sub{}", text.entry),
                EvalInstr::Return => "return".to_owned(),
            };
            let marker = if addr == self.entry { ">" } else { " " };
            out.push_str(&format!("{marker}{:<8} {line}\n", addr.to_string()));
        }
        if !self.exp.code().is_empty() {
            out.push_str("; subprograms\n");
            for (addr, instr) in self.exp.code().iter() {
                out.push_str(&format!(" {:<8} ", addr.to_string()));
                write_exp_instr(&mut out, instr, &self.exp, cx);
                out.push('\n');
            }
        }
        out
    }
}

/// Compile makefile text into an evaluation program.
///
/// `file` and `first_line` locate the text for diagnostics; `variable`
/// names the variable the text came from, if any.
#[tracing::instrument(level = "debug", skip(cx, text), fields(len = text.len()))]
pub fn compile_evaluation(
    cx: &CompilerContext,
    text: &str,
    file: &str,
    first_line: u32,
    variable: Option<Name>,
) -> Result<EvaluationProgram, CompileError> {
    let file: Arc<str> = Arc::from(file);
    let result = compile::EvalCompiler::new(cx, text, Arc::clone(&file), first_line).run();
    let compiled = result.inspect_err(|_| cx.stats().record_compile_error())?;
    let program = EvaluationProgram {
        header: ProgramHeader::new(),
        exp: compiled.exp,
        code: compiled.code,
        entry: compiled.entry,
        file,
        variable,
        warnings: compiled.warnings,
    };
    cx.stats().record_evaluation_program(program.stats());
    tracing::debug!(instructions = program.code.len(), "compiled evaluation program");
    Ok(program)
}

#[cfg(test)]
mod tests;
