use std::fs;

use kmk_cc::CompilerConfig;
use kmk_diagnostic::ErrorCode;
use kmkc::Engine;
use pretty_assertions::assert_eq;

use crate::common::Fixture;

#[test]
fn include_guards() {
    let mut f = Fixture::new().file("config.mk", "ifndef CONFIG_MK\nCONFIG_MK := 1\nCOUNT += x\nendif\n");
    f.run("include config.mk\ninclude config.mk\n");
    assert_eq!(f.value("COUNT"), "x");
}

#[test]
fn computed_include_lists_run_in_order() {
    let mut f = Fixture::new()
        .file("a.mk", "ORDER += a\n")
        .file("b.mk", "ORDER += b\n");
    f.run("PARTS = a b\ninclude $(PARTS:%=%.mk)\nORDER += main\n");
    assert_eq!(f.value("ORDER"), "a b main");
}

#[test]
fn optional_and_required_includes() {
    let mut f = Fixture::new();
    f.run("-include local.mk\nsinclude site.mk\nincludedep obj/main.d\n");
    assert_eq!(
        f.failure("X = 1\ninclude required.mk\n"),
        (ErrorCode::K3005, Some("Makefile:2".to_owned()))
    );
}

#[test]
fn dependency_queue_is_read_after_the_makefile() {
    let mut f = Fixture::new().file("main.d", "main.o: main.c main.h\nSEEN = dep\n");
    f.run("includedep-queue main.d\nSEEN = makefile\n");
    assert_eq!(f.value("SEEN"), "dep");
    let deps = f.engine.rules().find("main.o").map(|r| r.prereqs.clone());
    assert_eq!(deps, Some(vec!["main.c".to_owned(), "main.h".to_owned()]));
}

#[test]
fn runaway_recursion_is_stopped() {
    let mut f = Fixture::with_config(CompilerConfig::default().with_max_include_depth(8))
        .file("self.mk", "N += x\ninclude self.mk\n");
    assert_eq!(f.failure("include self.mk\n").0, ErrorCode::K3006);
}

#[test]
fn errors_point_into_the_included_file() {
    let mut f = Fixture::new().file("sub.mk", "A = 1\n\nendef\n");
    assert_eq!(f.failure("include sub.mk\n"), (ErrorCode::K2010, Some("sub.mk:3".to_owned())));
}

#[test]
fn files_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("conf")).unwrap();
    fs::write(dir.path().join("conf/tools.mk"), "CC = cc\nLD = $(CC)\n").unwrap();
    fs::write(
        dir.path().join("Makefile"),
        "include conf/tools.mk\n-include conf/local.mk\nall: prog\nprog: main.o\n\t$(LD) -o $@ $^\n",
    )
    .unwrap();

    let mut engine = Engine::default();
    engine.eval_file(&dir.path().join("Makefile")).unwrap();
    assert_eq!(engine.expand("$(LD)").unwrap(), "cc");
    assert_eq!(engine.rules().len(), 2);
    let prog = engine.rules().find("prog").unwrap();
    assert_eq!(prog.commands, vec!["$(LD) -o $@ $^"]);
}
