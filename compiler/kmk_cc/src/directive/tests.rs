use kmk_diagnostic::ErrorCode;
use pretty_assertions::assert_eq;

use super::*;

fn compile(cx: &CompilerContext, text: &str) -> Result<EvaluationProgram, CompileError> {
    compile_evaluation(cx, text, "Makefile", 1, None)
}

fn program(cx: &CompilerContext, text: &str) -> EvaluationProgram {
    compile(cx, text).unwrap_or_else(|e| panic!("{text:?}: {e}"))
}

fn error(text: &str) -> (ErrorCode, u32) {
    let cx = CompilerContext::default();
    let err = compile(&cx, text)
        .err()
        .unwrap_or_else(|| panic!("{text:?} should not compile"));
    (err.code, err.location.map_or(0, |l| l.line))
}

fn instrs(program: &EvaluationProgram) -> Vec<(Addr, &EvalInstr)> {
    program.code().iter().collect()
}

fn plain<'p>(program: &'p EvaluationProgram, op: &Operand) -> &'p str {
    match op {
        Operand::Plain(id) => program.expansions().text(*id),
        Operand::Sub(_) => panic!("expected a literal operand"),
    }
}

#[test]
fn if_else_patching() {
    let cx = CompilerContext::default();
    let p = program(&cx, "ifeq (a,a)\nA = 1\nelse\nA = 2\nendif\n");
    let code = instrs(&p);
    assert_eq!(code.len(), 5);
    let (else_assign, _) = code[3];
    let (ret, _) = code[4];
    match code[0].1 {
        EvalInstr::Conditional { test, false_target, location } => {
            assert!(matches!(test, CondTest::Equal(..)));
            assert_eq!(*false_target, else_assign);
            assert_eq!(location.line, 1);
        }
        other => panic!("expected a conditional, got {other:?}"),
    }
    assert!(matches!(code[1].1, EvalInstr::Assign(_)));
    assert_eq!(code[2].1, &EvalInstr::Jump(ret));
    assert_eq!(code[4].1, &EvalInstr::Return);
    assert_eq!(p.entry(), code[0].0);
}

#[test]
fn else_if_chains_share_the_exit() {
    let cx = CompilerContext::default();
    let p = program(&cx, "ifdef A\nX = 1\nelse ifdef B\nX = 2\nelse\nX = 3\nendif\n");
    let code = instrs(&p);
    let end = code.last().map(|(a, _)| *a);
    let jumps: Vec<Addr> = code
        .iter()
        .filter_map(|(_, i)| match i {
            EvalInstr::Jump(to) => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(jumps.len(), 2);
    assert!(jumps.iter().all(|to| Some(*to) == end));
    assert!(code.iter().all(|(_, i)| match i {
        EvalInstr::Conditional { false_target, .. } => !false_target.is_pending(),
        _ => true,
    }));
}

#[test]
fn conditional_errors() {
    assert_eq!(error("ifdef A\nX = 1\n"), (ErrorCode::K2002, 1));
    assert_eq!(error("X = 1\nelse\n"), (ErrorCode::K2003, 2));
    assert_eq!(error("ifdef A\nelse\nelse\nendif\n"), (ErrorCode::K2004, 3));
    assert_eq!(error("endif\n"), (ErrorCode::K2005, 1));
    assert_eq!(error("ifdef A\nendif junk\n"), (ErrorCode::K2007, 2));
    assert_eq!(error("ifdef A B\nendif\n"), (ErrorCode::K2007, 1));
    assert_eq!(error("ifdef A\nelse junk\nendif\n"), (ErrorCode::K2007, 2));
    assert_eq!(error("ifeq a\nendif\n"), (ErrorCode::K2008, 1));
    assert_eq!(error("ifdef\nendif\n"), (ErrorCode::K2008, 1));
}

#[test]
fn conditional_depth_limit() {
    let deep = |n: usize| "ifdef A\n".repeat(n) + &"endif\n".repeat(n);
    let cx = CompilerContext::default();
    assert!(compile(&cx, &deep(MAX_CONDITIONAL_DEPTH)).is_ok());
    let (code, line) = error(&deep(MAX_CONDITIONAL_DEPTH + 1));
    assert_eq!(code, ErrorCode::K2006);
    assert_eq!(line, u32::try_from(MAX_CONDITIONAL_DEPTH + 1).unwrap_or(0));
}

#[test]
fn continued_value_is_normalized() {
    let cx = CompilerContext::default();
    let p = program(&cx, "FOO = a \\\n    b\nBAR := $(FOO) c\n");
    let code = instrs(&p);
    let EvalInstr::Assign(foo) = code[0].1 else {
        panic!("expected an assignment");
    };
    assert_eq!(plain(&p, &foo.name), "FOO");
    assert_eq!(foo.op, AssignOp::Recursive);
    assert_eq!(p.expansions().text(foo.value), "a b");
    assert!(foo.value_sub.is_none());

    let EvalInstr::Assign(bar) = code[1].1 else {
        panic!("expected an assignment");
    };
    assert_eq!(bar.op, AssignOp::Simple);
    assert!(bar.value_sub.is_some());
    // The second assignment starts on physical line 3.
    assert_eq!(bar.location.line, 3);
}

#[test]
fn define_keeps_body_verbatim() {
    let cx = CompilerContext::default();
    let p = program(&cx, "define SCRIPT :=\necho $(A)\n  define inner\n  endef\nendef # done\n");
    let EvalInstr::Assign(script) = instrs(&p)[0].1 else {
        panic!("expected an assignment");
    };
    assert_eq!(plain(&p, &script.name), "SCRIPT");
    assert_eq!(script.op, AssignOp::Simple);
    assert_eq!(
        p.expansions().text(script.value),
        "echo $(A)\n  define inner\n  endef"
    );

    assert_eq!(error("define X\nbody\n"), (ErrorCode::K2009, 1));
    assert_eq!(error("endef\n"), (ErrorCode::K2010, 1));
    assert_eq!(error("define X\nendef extra\n"), (ErrorCode::K2007, 2));
    assert_eq!(error("define\nendef\n"), (ErrorCode::K2011, 1));
}

#[test]
fn qualifiers() {
    let cx = CompilerContext::default();
    let p = program(&cx, "export override A = 1\nexport export B := 2\nprivate define C\nx\nendef\n");
    let flags: Vec<AssignFlags> = instrs(&p)
        .iter()
        .filter_map(|(_, i)| match i {
            EvalInstr::Assign(a) => Some(a.flags),
            _ => None,
        })
        .collect();
    assert_eq!(
        flags,
        vec![
            AssignFlags::EXPORT | AssignFlags::OVERRIDE,
            AssignFlags::EXPORT,
            AssignFlags::PRIVATE,
        ]
    );
    let warnings: Vec<_> = p.warnings().iter().map(|d| (d.code, d.location.as_ref().map(|l| l.line))).collect();
    assert_eq!(warnings, vec![(ErrorCode::W2001, Some(2))]);

    assert_eq!(error("override\n"), (ErrorCode::K2013, 1));
    assert_eq!(error("local A\n"), (ErrorCode::K2013, 1));
}

#[test]
fn export_directives() {
    let cx = CompilerContext::default();
    let p = program(&cx, "export A $(B)\nexport\nunexport C\nunexport\nundefine D E\n");
    let code = instrs(&p);
    match code[0].1 {
        EvalInstr::Export(names) => {
            assert_eq!(names.len(), 2);
            assert_eq!(plain(&p, &names[0]), "A");
            assert!(matches!(names[1], Operand::Sub(_)));
        }
        other => panic!("expected export, got {other:?}"),
    }
    assert_eq!(code[1].1, &EvalInstr::ExportAll);
    assert!(matches!(code[2].1, EvalInstr::Unexport(n) if n.len() == 1));
    assert_eq!(code[3].1, &EvalInstr::UnexportAll);
    assert!(matches!(code[4].1, EvalInstr::Undefine { names, origin: Origin::File } if names.len() == 2));

    assert_eq!(error("undefine\n"), (ErrorCode::K2011, 1));

    let p = program(&cx, "override undefine F\n");
    assert!(matches!(
        instrs(&p)[0].1,
        EvalInstr::Undefine { names, origin: Origin::Override } if names.len() == 1
    ));
    assert_eq!(error("private undefine F\n"), (ErrorCode::K2013, 1));
}

#[test]
fn includes() {
    let cx = CompilerContext::default();
    let p = program(&cx, "include a.mk b.mk\n-include c.mk\nsinclude d.mk\nincludedep-queue e.d\nincludedep-flush\ninclude\n");
    let kinds: Vec<(IncludeKind, usize)> = instrs(&p)
        .iter()
        .filter_map(|(_, i)| match i {
            EvalInstr::Include { kind, files, .. } => Some((*kind, files.len())),
            _ => None,
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            (IncludeKind::Normal, 2),
            (IncludeKind::Silent, 1),
            (IncludeKind::Silent, 1),
            (IncludeKind::DepQueue, 1),
            (IncludeKind::DepFlush, 0),
        ]
    );
}

#[test]
fn rules_and_recipes() {
    let cx = CompilerContext::default();
    let text = "all: a b | dir ; echo one\n\techo two\n\n\t@echo three\nclean::\n\trm -f *.o\nX = 1\n";
    let p = program(&cx, text);
    let code = instrs(&p);

    let EvalInstr::RecipeStart(all) = code[0].1 else {
        panic!("expected a rule");
    };
    assert_eq!(plain(&p, &all.targets), "all");
    assert_eq!(plain(&p, &all.prereqs), "a b");
    assert_eq!(plain(&p, &all.order_only), "dir");
    assert!(!all.double_colon);

    let EvalInstr::RecipeCommands(lines) = code[1].1 else {
        panic!("expected recipe lines");
    };
    let lines: Vec<_> = lines.iter().map(|t| p.expansions().text(*t)).collect();
    assert_eq!(lines, vec!["echo one", "echo two", "@echo three"]);

    assert!(matches!(code[2].1, EvalInstr::RecipeStart(r) if r.double_colon));
    assert!(matches!(code[3].1, EvalInstr::RecipeCommands(l) if l.len() == 1));
    assert!(matches!(code[4].1, EvalInstr::Assign(_)));
}

#[test]
fn conditional_inside_recipe() {
    let cx = CompilerContext::default();
    let p = program(&cx, "all:\n\techo a\nifdef V\n\techo v\nendif\n\techo b\n");
    let shapes: Vec<&str> = instrs(&p)
        .iter()
        .map(|(_, i)| match i {
            EvalInstr::RecipeStart(_) => "rule",
            EvalInstr::RecipeCommands(_) => "commands",
            EvalInstr::Conditional { .. } => "if",
            EvalInstr::Return => "return",
            _ => "other",
        })
        .collect();
    assert_eq!(shapes, vec!["rule", "commands", "if", "commands", "commands", "return"]);
}

#[test]
fn statement_errors() {
    assert_eq!(error("hello world\n"), (ErrorCode::K2001, 1));
    assert_eq!(error("A = 1\n: b\n"), (ErrorCode::K2001, 2));
    assert_eq!(error("A != date\n"), (ErrorCode::K2012, 1));
    assert_eq!(error("t: V = 1\n"), (ErrorCode::K2012, 1));
    assert_eq!(error("%.o: %.c: x\n"), (ErrorCode::K2012, 1));
    assert_eq!(error(" = 1\n"), (ErrorCode::K2011, 1));
    assert_eq!(error("A := $(X\n"), (ErrorCode::K1001, 1));
}

#[test]
fn reference_lines_and_comments() {
    let cx = CompilerContext::default();
    let p = program(&cx, "# comment\n$(info hi) # trailing\n\n");
    let code = instrs(&p);
    assert_eq!(code.len(), 2);
    assert!(matches!(code[0].1, EvalInstr::ExpandLine { location, .. } if location.line == 2));
}

#[test]
fn first_line_offsets_locations() {
    let cx = CompilerContext::default();
    let err = compile_evaluation(&cx, "A = 1\nbogus\n", "vars.mk", 10, None).err();
    let location = err.and_then(|e| e.location);
    assert_eq!(location.as_ref().map(|l| (&*l.file, l.line)), Some(("vars.mk", 11)));
}

#[test]
fn statistics_and_dump() {
    let cx = CompilerContext::default();
    let p = program(&cx, "ifeq ($(A),1)\nB := $(A)\nendif\n");
    let snapshot = cx.stats().snapshot();
    assert_eq!(snapshot.evaluation_programs, 1);
    assert_eq!(snapshot.compile_errors, 0);
    let dump = p.dump(&cx);
    assert!(dump.starts_with("; Makefile\n"));
    assert!(dump.contains("ifeq sub"));
    assert!(dump.contains("assign"));
    assert!(dump.contains("; subprograms"));
    assert!(dump.contains("var A"));
}

#[test]
fn plain_words_need_no_subprogram() {
    let cx = CompilerContext::default();
    let p = program(&cx, "ifdef FOO\nexport A B\nendif\ninclude a.mk b\\#c.mk\nundefine C\n");
    assert!(p.expansions().code().is_empty(), "{}", p.dump(&cx));
    let code = instrs(&p);
    let EvalInstr::Include { files, .. } = code[2].1 else {
        panic!("expected an include, got {:?}", code[2].1);
    };
    let names: Vec<_> = files.iter().map(|f| plain(&p, f)).collect();
    assert_eq!(names, ["a.mk", "b#c.mk"]);

    let p = program(&cx, "include $(DIR)/a.mk plain.mk\n");
    let code = instrs(&p);
    let EvalInstr::Include { files, .. } = code[0].1 else {
        panic!("expected an include, got {:?}", code[0].1);
    };
    assert!(matches!(files[0], Operand::Sub(_)));
    assert_eq!(plain(&p, &files[1]), "plain.mk");
}
