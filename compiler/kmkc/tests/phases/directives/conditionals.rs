use kmk_diagnostic::ErrorCode;
use pretty_assertions::assert_eq;

use crate::common::Fixture;

const PLATFORM: &str = "\
ifeq ($(KBUILD_TARGET),win)
EXE = .exe
DEFS += WINDOWS
else ifeq ($(KBUILD_TARGET),linux)
EXE =
DEFS += LINUX
else ifdef KBUILD_TARGET
$(error unsupported target $(KBUILD_TARGET))
else
DEFS += NO_TARGET
endif
";

#[test]
fn platform_selection_chain() {
    let mut linux = Fixture::new();
    linux.run("KBUILD_TARGET = linux\n").run(PLATFORM);
    assert_eq!(linux.value("DEFS"), "LINUX");
    assert_eq!(linux.value("EXE"), "");

    let mut win = Fixture::new();
    win.run("KBUILD_TARGET := win\n").run(PLATFORM);
    assert_eq!(win.value("DEFS"), "WINDOWS");
    assert_eq!(win.value("EXE"), ".exe");

    let mut none = Fixture::new();
    none.run(PLATFORM);
    assert_eq!(none.value("DEFS"), "NO_TARGET");

    let mut os2 = Fixture::new();
    os2.run("KBUILD_TARGET = os2\n");
    let (code, at) = os2.failure(PLATFORM);
    assert_eq!(code, ErrorCode::K3004);
    assert_eq!(at.as_deref(), Some("Makefile:8"));
}

#[test]
fn trivially_true_conditional() {
    let mut f = Fixture::new();
    f.run("ifeq (a,a)\nR = taken\nelse\nR = skipped\nendif\n");
    assert_eq!(f.value("R"), "taken");
}

#[test]
fn nested_conditionals() {
    let text = "\
ifdef DEBUG
 ifeq ($(DEBUG),full)
OPT = -O0 -g3
 else
OPT = -O1 -g
 endif
else
OPT = -O2
endif
";
    let mut release = Fixture::new();
    release.run(text);
    assert_eq!(release.value("OPT"), "-O2");

    let mut full = Fixture::new();
    full.run("DEBUG = full\n").run(text);
    assert_eq!(full.value("OPT"), "-O0 -g3");

    let mut light = Fixture::new();
    light.run("DEBUG = yes\n").run(text);
    assert_eq!(light.value("OPT"), "-O1 -g");
}

#[test]
fn membership_and_expression_conditionals() {
    let mut f = Fixture::new();
    f.run("ARCH = amd64\nVER = 12\n");
    f.run("if1of ($(ARCH), amd64 arm64)\nBITS = 64\nendif\n");
    f.run("if $(VER) >= 10 && defined(ARCH)\nNEW = 1\nelse\nNEW = 0\nendif\n");
    assert_eq!(f.value("BITS"), "64");
    assert_eq!(f.value("NEW"), "1");
}

#[test]
fn unbalanced_conditionals() {
    let mut f = Fixture::new();
    assert_eq!(f.failure("ifdef A\nX = 1\n").0, ErrorCode::K2002);
    assert_eq!(f.failure("X = 1\nendif\n"), (ErrorCode::K2005, Some("Makefile:2".to_owned())));
    assert_eq!(f.failure("else\n").0, ErrorCode::K2003);
    assert_eq!(
        f.failure("ifdef A\nelse\nelse\nendif\n"),
        (ErrorCode::K2004, Some("Makefile:3".to_owned()))
    );
}

#[test]
fn failed_compilation_changes_nothing() {
    let mut f = Fixture::new();
    f.run("X = before\n");
    assert_eq!(f.failure("X = after\nifdef Y\n").0, ErrorCode::K2002);
    assert_eq!(f.value("X"), "before");
}
