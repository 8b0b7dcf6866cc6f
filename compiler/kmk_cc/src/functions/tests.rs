use kmk_diagnostic::{DiagnosticQueue, ErrorCode};
use kmk_ir::{Flavor, Origin};
use pretty_assertions::assert_eq;

use super::*;
use crate::expand::compile_expansion;
use crate::vars::{Definition, Variable, VariableSet, VariableTable};
use crate::{buffer_handler, CompilerContext};

fn expand_with(cx: &CompilerContext, vars: &mut VariableSet, text: &str) -> Result<String, EvalError> {
    let program = compile_expansion(cx, text)?;
    let mut diags = DiagnosticQueue::new();
    let mut out = String::new();
    Expander::new(vars, cx, &mut diags).run(&program, &mut out)?;
    Ok(out)
}

fn expand(text: &str) -> String {
    let cx = CompilerContext::default();
    let mut vars = VariableSet::for_context(&cx);
    expand_with(&cx, &mut vars, text).unwrap_or_else(|e| panic!("{text}: {e}"))
}

#[test]
fn registry_resolves_builtins() {
    let registry = FunctionRegistry::with_builtins();
    assert!(registry.resolve("patsubst").is_some());
    assert!(registry.resolve("nonesuch").is_none());
    let names = registry.names();
    assert!(names.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(names.len(), registry.len());
    let foreach = registry.resolve("foreach").map(|id| *registry.get(id));
    assert!(foreach.is_some_and(|d| !d.expands_args() && d.min_args == 3));
    let sort = registry.resolve("sort").map(|id| *registry.get(id));
    assert!(sort.is_some_and(|d| d.dirty));
}

#[test]
fn later_registration_shadows() {
    fn nothing(_: &mut Expander<'_>, _: &mut [Cow<'_, str>], _: &mut String) -> Result<(), EvalError> {
        Ok(())
    }
    let mut registry = FunctionRegistry::with_builtins();
    let before = registry.len();
    let old = registry.resolve("strip");
    let new = registry.register(FunctionDef::new("strip", 1, 1, nothing));
    assert_eq!(registry.len(), before);
    assert_eq!(registry.resolve("strip"), Some(new));
    assert_ne!(old, Some(new));
}

#[test]
fn text_functions() {
    assert_eq!(expand("$(subst ee,EE,feet on the street)"), "fEEt on the strEEt");
    assert_eq!(expand("$(patsubst %.c,%.o,x.c.c bar.c)"), "x.c.o bar.o");
    assert_eq!(expand("[$(strip   a   b  c )]"), "[a b c]");
    assert_eq!(expand("$(findstring a,a b c)|$(findstring a,b c)"), "a|");
    assert_eq!(expand("$(filter %.c %.s,foo.c bar.c baz.s ugh.h)"), "foo.c bar.c baz.s");
    assert_eq!(expand("$(filter-out %.h,foo.c ugh.h)"), "foo.c");
    assert_eq!(expand("$(sort foo bar lose foo)"), "bar foo lose");
    assert_eq!(expand("$(word 2,foo bar baz)|$(word 9,foo)"), "bar|");
    assert_eq!(expand("$(words foo bar baz)"), "3");
    assert_eq!(expand("$(wordlist 2,3,foo bar baz)|$(wordlist 3,2,a b c)"), "bar baz|");
    assert_eq!(expand("$(firstword foo bar)-$(lastword foo bar)"), "foo-bar");
}

#[test]
fn file_name_functions() {
    assert_eq!(expand("$(dir src/foo.c hacks)"), "src/ ./");
    assert_eq!(expand("$(notdir src/foo.c hacks)"), "foo.c hacks");
    assert_eq!(expand("$(suffix src/foo.c src-1.0/bar hacks.x.y)"), ".c .y");
    assert_eq!(expand("$(basename src/foo.c src-1.0/bar hacks)"), "src/foo src-1.0/bar hacks");
    assert_eq!(expand("$(addsuffix .c,foo bar)"), "foo.c bar.c");
    assert_eq!(expand("$(addprefix src/,foo bar)"), "src/foo src/bar");
    assert_eq!(expand("$(join a b c,.c .o)"), "a.c b.o c");
}

#[test]
fn bad_numeric_arguments() {
    let cx = CompilerContext::default();
    let mut vars = VariableSet::for_context(&cx);
    for text in ["$(word x,a b)", "$(word 0,a b)", "$(wordlist 1,y,a b)", "$(wordlist 0,1,a)"] {
        let err = expand_with(&cx, &mut vars, text).err();
        assert_eq!(err.map(|e| e.code()), Some(ErrorCode::K3010), "{text}");
    }
}

#[test]
fn conditional_functions_expand_lazily() {
    let cx = CompilerContext::default();
    let mut vars = VariableSet::for_context(&cx);
    // The untaken branch would fail if it were expanded.
    assert_eq!(expand_with(&cx, &mut vars, "$(if x,yes,$(error no))").ok().as_deref(), Some("yes"));
    assert_eq!(expand_with(&cx, &mut vars, "$(if ,$(error no),no)").ok().as_deref(), Some("no"));
    assert_eq!(expand_with(&cx, &mut vars, "[$(if ,yes)]").ok().as_deref(), Some("[]"));
    assert_eq!(expand_with(&cx, &mut vars, "$(or ,,b,$(error no))").ok().as_deref(), Some("b"));
    assert_eq!(expand_with(&cx, &mut vars, "[$(and a,,$(error no))]").ok().as_deref(), Some("[]"));
    assert_eq!(expand_with(&cx, &mut vars, "$(and a,b,c)").ok().as_deref(), Some("c"));
}

#[test]
fn foreach_restores_loop_variable() {
    let cx = CompilerContext::default();
    let mut vars = VariableSet::for_context(&cx);
    let d = cx.interner().intern("d");
    vars.define(Definition::new(d, "kept", Flavor::Recursive, Origin::File)).ok();
    assert_eq!(
        expand_with(&cx, &mut vars, "$(foreach d,a b c,$(d).o)").ok().as_deref(),
        Some("a.o b.o c.o")
    );
    assert_eq!(vars.get("d").map(|v| (v.value().to_owned(), v.origin())), Some(("kept".to_owned(), Origin::File)));

    assert_eq!(expand_with(&cx, &mut vars, "$(foreach tmp,x,<$(tmp)>)").ok().as_deref(), Some("<x>"));
    assert!(vars.get("tmp").is_none());
}

#[test]
fn foreach_inside_the_variable_it_shadows() {
    let cx = CompilerContext::default();
    let mut vars = VariableSet::for_context(&cx);
    let x = cx.interner().intern("x");
    vars.define(Definition::new(x, "$(foreach x,a b,<$(x)>)", Flavor::Recursive, Origin::File))
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(expand_with(&cx, &mut vars, "$(x)").ok().as_deref(), Some("<a> <b>"));

    // The shadowed definition and its cached program are untouched.
    let var = vars.get("x");
    assert_eq!(var.map(Variable::flavor), Some(Flavor::Recursive));
    let program = var.and_then(Variable::compiled_program);
    assert!(program.is_some_and(|p| !p.header().is_invalidated()));
    assert_eq!(cx.stats().snapshot().invalidated, 0);
}

#[test]
fn lazy_arguments_are_compiled_with_the_call() {
    let cx = CompilerContext::default();
    let mut vars = VariableSet::for_context(&cx);
    let x = cx.interner().intern("X");
    vars.define(Definition::new(x, "on", Flavor::Simple, Origin::File))
        .unwrap_or_else(|e| panic!("{e}"));
    let text = "$(if $(X),$(X)-yes,no) $(foreach i,1 2,$(i)$(X)) $(or ,$(X)) $(and $(X),$(X))";
    let program = compile_expansion(&cx, text).unwrap_or_else(|e| panic!("{e}"));
    let compiled = cx.stats().snapshot().expansion_programs;
    let mut diags = DiagnosticQueue::new();
    for _ in 0..3 {
        let mut out = String::new();
        Expander::new(&mut vars, &cx, &mut diags)
            .run(&program, &mut out)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(out, "on-yes 1on 2on on on");
    }
    assert_eq!(cx.stats().snapshot().expansion_programs, compiled);
}

#[test]
fn variable_functions() {
    let cx = CompilerContext::default();
    let mut vars = VariableSet::for_context(&cx);
    let r = cx.interner().intern("R");
    vars.define(Definition::new(r, "$(HOME)/x", Flavor::Recursive, Origin::CommandLine)).ok();
    assert_eq!(expand_with(&cx, &mut vars, "$(value R)").ok().as_deref(), Some("$(HOME)/x"));
    assert_eq!(expand_with(&cx, &mut vars, "$(origin R)").ok().as_deref(), Some("command line"));
    assert_eq!(expand_with(&cx, &mut vars, "$(flavor R)").ok().as_deref(), Some("recursive"));
    assert_eq!(expand_with(&cx, &mut vars, "$(origin NOPE)").ok().as_deref(), Some("undefined"));
    assert_eq!(expand_with(&cx, &mut vars, "$(flavor NOPE)").ok().as_deref(), Some("undefined"));
}

#[test]
fn output_functions() {
    let print = buffer_handler();
    let cx = CompilerContext::default().with_print_handler(print.clone());
    let mut vars = VariableSet::for_context(&cx);
    let program = compile_expansion(&cx, "$(info hello, world)$(warning careful)").unwrap_or_else(|e| panic!("{e}"));
    let mut diags = DiagnosticQueue::new();
    let mut out = String::new();
    let result = Expander::new(&mut vars, &cx, &mut diags).run(&program, &mut out);
    assert!(result.is_ok());
    assert_eq!(out, "");
    assert_eq!(print.output(), "hello, world\n");
    let warnings: Vec<_> = diags.iter().map(|d| (d.code, d.message.clone())).collect();
    assert_eq!(warnings, vec![(ErrorCode::K3009, "careful".to_owned())]);

    let err = expand_with(&cx, &mut vars, "$(error stop here)").err();
    assert_eq!(err.as_ref().map(EvalError::code), Some(ErrorCode::K3004));
    assert_eq!(err.map(|e| e.message()).as_deref(), Some("stop here"));
}
