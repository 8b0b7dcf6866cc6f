use kmk_cc::{compile_expansion, CompilerConfig, CompilerContext};
use kmk_diagnostic::ErrorCode;
use pretty_assertions::assert_eq;

use crate::common::Fixture;

fn listing(text: &str) -> String {
    let cx = CompilerContext::default();
    compile_expansion(&cx, text).unwrap().dump(&cx)
}

#[test]
fn reference_forms_compile_to_dedicated_instructions() {
    assert!(listing("$(CC)").contains("var CC"));
    assert!(listing("${CC}").contains("var CC"));
    assert!(listing("$(SRCS:.c=.o)").contains("subst SRCS"));
    assert!(listing("$(FLAGS_$(ARCH))").contains("dynvar"));
    assert!(listing("$(addprefix -I,inc lib)").contains("call addprefix"));
    assert!(listing("$$HOME").contains("copy \"$HOME\""));
}

#[test]
fn escapes_and_literals() {
    let mut f = Fixture::new();
    f.run("HOME = /home/me\n");
    assert_eq!(f.expand("echo $$HOME is $(HOME)"), "echo $HOME is /home/me");
    assert_eq!(f.expand("no references at all"), "no references at all");
    assert_eq!(f.expand("$$$$"), "$$");
}

#[test]
fn nesting_is_limited() {
    let nested = |levels: usize| {
        let mut text = String::from("x");
        for _ in 0..levels {
            text = format!("$(v{text})");
        }
        text
    };
    let mut f = Fixture::new();
    assert!(f.engine.expand(&nested(15)).is_ok());
    assert!(f.engine.expand(&nested(16)).is_ok());
    let err = f.engine.expand(&nested(17)).err();
    assert_eq!(err.map(|e| e.code()), Some(ErrorCode::K1003));
}

#[test]
fn recursive_programs_are_cached_until_redefined() {
    let mut f = Fixture::new();
    f.run("A = first\nR = <$(A)>\n");
    let before = f.engine.stats();
    assert_eq!(f.expand("$(R)"), "<first>");
    assert_eq!(f.expand("$(R)"), "<first>");
    let after = f.engine.stats();
    // Two top-level programs plus one cached program for R.
    assert_eq!(after.expansion_programs - before.expansion_programs, 3);
    assert_eq!(after.expansion_runs - before.expansion_runs, 4);

    f.run("R = [$(A)]\n");
    assert_eq!(f.engine.stats().invalidated - after.invalidated, 1);
    assert_eq!(f.expand("$(R)"), "[first]");
}

#[test]
fn simple_values_are_not_reexpanded() {
    let mut f = Fixture::new();
    f.run("A = 1\nS := $(A) $$(A)\nA = 2\n");
    assert_eq!(f.value("S"), "1 $(A)");
    assert_eq!(f.expand("$(S)"), "1 $(A)");
}

#[test]
fn self_reference_is_fatal() {
    let mut f = Fixture::new();
    f.run("CFLAGS = $(CFLAGS) -O2\n");
    let err = f.engine.expand("$(CFLAGS)").err();
    assert_eq!(err.map(|e| e.code()), Some(ErrorCode::K3002));
}

#[test]
fn undefined_references_warn_when_asked() {
    let mut quiet = Fixture::new();
    assert_eq!(quiet.expand("[$(NOPE)]"), "[]");
    assert!(quiet.warnings().is_empty());

    let mut f = Fixture::with_config(CompilerConfig::default().with_warn_undefined(true));
    assert_eq!(f.expand("[$(NOPE)]"), "[]");
    let warnings = f.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].0, ErrorCode::K3001);
    assert!(warnings[0].1.contains("NOPE"), "{}", warnings[0].1);
}
