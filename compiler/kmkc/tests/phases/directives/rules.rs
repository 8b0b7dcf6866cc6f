use kmk_diagnostic::ErrorCode;
use pretty_assertions::assert_eq;

use crate::common::Fixture;

const MAKEFILE: &str = "\
OUT = out
OBJS = $(OUT)/main.o $(OUT)/util.o

all: $(OUT)/prog

$(OUT)/prog: $(OBJS) | $(OUT)
\t$(CC) -o $@ $^
ifdef STRIP
\tstrip $@
endif

clean::
\trm -rf $(OUT)
";

#[test]
fn rules_are_collected_with_expanded_headers() {
    let mut f = Fixture::new();
    f.run(MAKEFILE);
    let rules = f.engine.rules();
    assert_eq!(rules.len(), 3);
    let prog = rules.find("out/prog").unwrap();
    assert_eq!(prog.prereqs, vec!["out/main.o", "out/util.o"]);
    assert_eq!(prog.order_only, vec!["out"]);
    assert_eq!(prog.commands, vec!["$(CC) -o $@ $^"]);
    assert_eq!(prog.location.line, 6);
    assert!(rules.find("clean").unwrap().double_colon);
}

#[test]
fn recipe_lines_inside_conditionals() {
    let mut f = Fixture::new();
    f.run("STRIP = 1\n").run(MAKEFILE);
    let prog = f.engine.rules().find("out/prog").unwrap();
    assert_eq!(prog.commands, vec!["$(CC) -o $@ $^", "strip $@"]);
}

#[test]
fn continued_prerequisites() {
    let mut f = Fixture::new();
    f.run("all: one \\\n     two \\\n     three\n");
    let all = f.engine.rules().find("all").unwrap();
    assert_eq!(all.prereqs, vec!["one", "two", "three"]);
}

#[test]
fn rendering_matches_the_input_shape() {
    let mut f = Fixture::new();
    f.run("CC = cc\nlib.a: a.o b.o\n\tar rcs $@ $^\n");
    let rendered = f.engine.render_rules();
    assert!(rendered.contains("lib.a: a.o b.o\n\tar rcs $@ $^\n"), "{rendered}");
    assert_eq!(f.engine.render_variables(), "# file\nCC = cc\n");
}

#[test]
fn statement_errors() {
    let mut f = Fixture::new();
    assert_eq!(f.failure("\nhello world\n"), (ErrorCode::K2001, Some("Makefile:2".to_owned())));
    assert_eq!(f.failure("define X\nbody\n").0, ErrorCode::K2009);
    assert_eq!(f.failure("$(EMPTY) = 1\n").0, ErrorCode::K3011);
    assert_eq!(f.failure("OUT = x\n$(OUT)\n"), (ErrorCode::K3007, Some("Makefile:2".to_owned())));
}
