use std::borrow::Cow;

use kmk_diagnostic::{DiagnosticQueue, ErrorCode};
use kmk_ir::{Flavor, Origin};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;
use crate::errors::EvalError;
use crate::functions::FunctionDef;
use crate::vars::{Definition, VariableSet, VariableTable};
use crate::{CompilerConfig, CompilerContext};

struct Harness {
    cx: CompilerContext,
}

impl Harness {
    fn new() -> Self {
        Harness {
            cx: CompilerContext::default(),
        }
    }

    fn with_config(config: CompilerConfig) -> Self {
        Harness {
            cx: CompilerContext::new(config),
        }
    }

    fn vars(&self, defs: &[(&str, &str, Flavor)]) -> VariableSet {
        let mut vars = VariableSet::for_context(&self.cx);
        for &(name, value, flavor) in defs {
            let name = self.cx.interner().intern(name);
            vars.define(Definition::new(name, value, flavor, Origin::File))
                .unwrap_or_else(|e| panic!("define failed: {e}"));
        }
        vars
    }

    fn run(&self, vars: &mut VariableSet, diags: &mut DiagnosticQueue, text: &str) -> Result<String, EvalError> {
        let program = compile_expansion(&self.cx, text)?;
        let mut out = String::new();
        Expander::new(vars, &self.cx, diags).run(&program, &mut out)?;
        Ok(out)
    }

    fn expand(&self, vars: &mut VariableSet, text: &str) -> Result<String, EvalError> {
        self.run(vars, &mut DiagnosticQueue::new(), text)
    }
}

fn nested(levels: usize) -> String {
    let mut text = "x".to_owned();
    for _ in 0..levels {
        text = format!("$(v{text})");
    }
    text
}

#[test]
fn plain_variable_reference() {
    let h = Harness::new();
    let mut vars = h.vars(&[("X", "hello", Flavor::Recursive)]);
    let program = compile_expansion(&h.cx, "$(X) world").unwrap_or_else(|e| panic!("{e}"));
    let instrs = program.instructions();
    assert_eq!(instrs.len(), 3);
    assert!(matches!(instrs[0], ExpInstr::PlainVariable(_)));
    assert!(matches!(instrs[1], ExpInstr::CopyString(t) if program.arena().text(*t) == " world"));
    assert!(matches!(instrs[2], ExpInstr::Return));
    assert_eq!(h.expand(&mut vars, "$(X) world").ok().as_deref(), Some("hello world"));
}

#[test]
fn single_character_names_and_dollars() {
    let h = Harness::new();
    let mut vars = h.vars(&[("X", "1", Flavor::Simple), ("@", "target", Flavor::Simple)]);
    assert_eq!(h.expand(&mut vars, "$X$$").ok().as_deref(), Some("1$"));
    assert_eq!(h.expand(&mut vars, "${X}-$@").ok().as_deref(), Some("1-target"));
    // A trailing lone `$` expands to nothing.
    assert_eq!(h.expand(&mut vars, "a$").ok().as_deref(), Some("a"));
}

#[test]
fn search_and_replace_reference() {
    let h = Harness::new();
    let mut vars = h.vars(&[("SRCS", "a.c  b.c x.h", Flavor::Simple)]);
    let program = compile_expansion(&h.cx, "$(SRCS:.c=.o)").unwrap_or_else(|e| panic!("{e}"));
    assert!(matches!(
        program.instructions()[0],
        ExpInstr::SearchAndReplacePlainVariable(_)
    ));
    assert_eq!(h.expand(&mut vars, "$(SRCS:.c=.o)").ok().as_deref(), Some("a.o b.o x.h"));
    assert_eq!(
        h.expand(&mut vars, "$(SRCS:%.c=obj/%.o)").ok().as_deref(),
        Some("obj/a.o obj/b.o x.h")
    );
}

#[test]
fn computed_names() {
    let h = Harness::new();
    let mut vars = h.vars(&[
        ("WHICH", "X", Flavor::Simple),
        ("X", "val", Flavor::Simple),
        ("X_debug", "dbg", Flavor::Simple),
    ]);
    assert_eq!(h.expand(&mut vars, "$($(WHICH))").ok().as_deref(), Some("val"));
    assert_eq!(h.expand(&mut vars, "$($(WHICH)_debug)").ok().as_deref(), Some("dbg"));
    assert_eq!(h.expand(&mut vars, "$($(WHICH):l=L)").ok().as_deref(), Some("vaL"));
    assert_eq!(h.expand(&mut vars, "[$(NOPE$(WHICH))]").ok().as_deref(), Some("[]"));
}

#[test]
fn recursive_variables_expand_lazily() {
    let h = Harness::new();
    let mut vars = h.vars(&[
        ("CFLAGS", "$(OPT) -g", Flavor::Recursive),
        ("OPT", "-O2", Flavor::Recursive),
    ]);
    assert_eq!(h.expand(&mut vars, "cc $(CFLAGS)").ok().as_deref(), Some("cc -O2 -g"));

    let opt = h.cx.interner().intern("OPT");
    vars.define(Definition::new(opt, "-O0", Flavor::Recursive, Origin::File))
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(h.expand(&mut vars, "cc $(CFLAGS)").ok().as_deref(), Some("cc -O0 -g"));
}

#[test]
fn function_calls() {
    let h = Harness::new();
    let mut vars = h.vars(&[("OBJS", "a b", Flavor::Simple)]);
    let program = compile_expansion(&h.cx, "$(subst a,b,aaa)").unwrap_or_else(|e| panic!("{e}"));
    assert!(matches!(program.instructions()[0], ExpInstr::PlainFunction { .. }));
    assert_eq!(h.expand(&mut vars, "$(subst a,b,aaa)").ok().as_deref(), Some("bbb"));

    let program = compile_expansion(&h.cx, "$(addsuffix .o,$(OBJS))").unwrap_or_else(|e| panic!("{e}"));
    assert!(matches!(program.instructions()[0], ExpInstr::DynamicFunction { .. }));
    assert_eq!(h.expand(&mut vars, "$(addsuffix .o,$(OBJS))").ok().as_deref(), Some("a.o b.o"));

    // Too short or too long to be a function name: a variable reference.
    assert_eq!(h.expand(&mut vars, "$(x y)").ok().as_deref(), Some(""));
}

#[test]
fn unterminated_references() {
    let h = Harness::new();
    for text in ["$(X", "${X", "a $(subst a,b,$(X)"] {
        let err = compile_expansion(&h.cx, text).err();
        assert_eq!(err.map(|e| e.code), Some(ErrorCode::K1001), "{text}");
    }
    // `)` does not close `${`.
    assert!(compile_expansion(&h.cx, "${X)").is_err());
    assert!(compile_expansion(&h.cx, "${X)}").is_ok());
}

#[test]
fn too_few_arguments() {
    let h = Harness::new();
    let err = compile_expansion(&h.cx, "$(subst a,b)").err();
    assert_eq!(err.map(|e| e.code), Some(ErrorCode::K1002));
    assert_eq!(h.cx.stats().snapshot().compile_errors, 1);
}

#[test]
fn nesting_limit() {
    let h = Harness::new();
    assert!(compile_expansion(&h.cx, &nested(15)).is_ok());
    assert!(compile_expansion(&h.cx, &nested(16)).is_ok());
    let err = compile_expansion(&h.cx, &nested(17)).err();
    assert_eq!(err.map(|e| e.code), Some(ErrorCode::K1003));
}

#[test]
fn self_reference_is_an_error() {
    let h = Harness::new();
    let mut vars = h.vars(&[("A", "x $(B)", Flavor::Recursive), ("B", "$(A)", Flavor::Recursive)]);
    let err = h.expand(&mut vars, "$(A)").err();
    assert_eq!(err.map(|e| e.code()), Some(ErrorCode::K3002));
}

#[test]
fn undefined_variable_warning() {
    let h = Harness::with_config(CompilerConfig::default().with_warn_undefined(true));
    let mut vars = h.vars(&[]);
    let mut diags = DiagnosticQueue::new();
    assert_eq!(h.run(&mut vars, &mut diags, "<$(NOPE)>").ok().as_deref(), Some("<>"));
    let codes: Vec<_> = diags.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![ErrorCode::K3001]);

    let quiet = Harness::new();
    let mut vars = quiet.vars(&[]);
    let mut diags = DiagnosticQueue::new();
    assert!(quiet.run(&mut vars, &mut diags, "$(NOPE)").is_ok());
    assert!(diags.is_empty());
}

#[test]
fn dirty_function_gets_private_copy() {
    let h = Harness::new();
    let mut vars = h.vars(&[]);
    let program = compile_expansion(&h.cx, "$(sort b a c b)").unwrap_or_else(|e| panic!("{e}"));
    let mut diags = DiagnosticQueue::new();
    for _ in 0..2 {
        let mut out = String::new();
        Expander::new(&mut vars, &h.cx, &mut diags)
            .run(&program, &mut out)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(out, "a b c");
    }
    let instrs = program.instructions();
    let ExpInstr::PlainFunction { args, .. } = instrs[0] else {
        panic!("expected a plain call");
    };
    assert_eq!(program.arena().text(args[0]), "b a c b");
}

fn redefine_x(exp: &mut Expander<'_>, _: &mut [Cow<'_, str>], _: &mut String) -> Result<(), EvalError> {
    let name = exp.context().interner().intern("X");
    exp.vars_mut()
        .replace(Definition::new(name, "changed", Flavor::Simple, Origin::File))
}

#[test]
fn redefining_a_running_variable_is_refused() {
    let mut h = Harness::new();
    h.cx.functions_mut().register(FunctionDef::new("redefine", 0, 0, redefine_x));
    let mut vars = h.vars(&[("X", "before $(redefine) after", Flavor::Recursive)]);
    let err = h.expand(&mut vars, "$(X)").err();
    assert_eq!(err.map(|e| e.code()), Some(ErrorCode::K3003));
    assert_eq!(vars.get("X").map(|v| v.value().to_owned()).as_deref(), Some("before $(redefine) after"));
}

#[test]
fn redefinition_invalidates_cached_program() {
    let h = Harness::new();
    let mut vars = h.vars(&[("X", "$(Y)", Flavor::Recursive), ("Y", "y", Flavor::Simple)]);
    assert_eq!(h.expand(&mut vars, "$(X)").ok().as_deref(), Some("y"));
    let cached = vars.get("X").and_then(|v| v.compiled_program().cloned());
    assert!(cached.is_some());

    let x = h.cx.interner().intern("X");
    vars.define(Definition::new(x, "$(Y)$(Y)", Flavor::Recursive, Origin::File))
        .unwrap_or_else(|e| panic!("{e}"));
    assert!(cached.is_some_and(|p| p.header().is_invalidated()));
    assert_eq!(h.cx.stats().snapshot().invalidated, 1);
    assert_eq!(h.expand(&mut vars, "$(X)").ok().as_deref(), Some("yy"));
}

#[test]
fn invalidated_program_does_not_run() {
    let h = Harness::new();
    let mut vars = h.vars(&[]);
    let program = compile_expansion(&h.cx, "text").unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(program.header().invalidate(), crate::program::Invalidation::Done);
    let mut diags = DiagnosticQueue::new();
    let err = Expander::new(&mut vars, &h.cx, &mut diags)
        .run(&program, &mut String::new())
        .err();
    assert_eq!(err.map(|e| e.code()), Some(ErrorCode::K9002));
}

#[test]
fn output_size_feeds_back() {
    let h = Harness::new();
    let mut vars = h.vars(&[("X", "0123456789", Flavor::Simple)]);
    let program = compile_expansion(&h.cx, "$(X)$(X)$(X)").unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(program.header().size_hint(), 0);
    let mut diags = DiagnosticQueue::new();
    for _ in 0..8 {
        let mut out = String::new();
        Expander::new(&mut vars, &h.cx, &mut diags)
            .run(&program, &mut out)
            .unwrap_or_else(|e| panic!("{e}"));
    }
    assert!(program.header().size_hint() > 0);
    assert!(program.header().size_hint() <= 30);
}

#[cfg(debug_assertions)]
fn scribble(_: &mut Expander<'_>, args: &mut [Cow<'_, str>], _: &mut String) -> Result<(), EvalError> {
    if let Some(first) = args.first_mut() {
        first.to_mut().push('!');
    }
    Ok(())
}

#[cfg(debug_assertions)]
#[test]
fn clean_function_must_not_modify_arguments() {
    let mut h = Harness::new();
    h.cx.functions_mut().register(FunctionDef::new("scribble", 1, 1, scribble));
    let mut vars = h.vars(&[]);
    let err = h.expand(&mut vars, "$(scribble text)").err();
    assert_eq!(err.map(|e| e.code()), Some(ErrorCode::K9001));
}

proptest! {
    #[test]
    fn text_without_dollars_is_copied(text in "[^$]{0,64}") {
        let h = Harness::new();
        let program = compile_expansion(&h.cx, &text).unwrap_or_else(|e| panic!("{e}"));
        let instrs = program.instructions();
        if text.is_empty() {
            prop_assert!(matches!(instrs.as_slice(), [ExpInstr::Return]));
        } else {
            prop_assert!(
                matches!(instrs.as_slice(), [ExpInstr::CopyString(t), ExpInstr::Return] if program.arena().text(*t) == text)
            );
        }
        prop_assert_eq!(program.arena().code().len(), instrs.len());

        let mut vars = h.vars(&[]);
        prop_assert_eq!(h.expand(&mut vars, &text).ok(), Some(text.clone()));
    }

    #[test]
    fn doubled_dollars_collapse(n in 0usize..8) {
        let h = Harness::new();
        let mut vars = h.vars(&[("X", "v", Flavor::Simple)]);
        let even = format!("{}X", "$".repeat(2 * n));
        prop_assert_eq!(h.expand(&mut vars, &even).ok(), Some(format!("{}X", "$".repeat(n))));
        let odd = format!("{}X", "$".repeat(2 * n + 1));
        prop_assert_eq!(h.expand(&mut vars, &odd).ok(), Some(format!("{}v", "$".repeat(n))));
    }
}
