use pretty_assertions::assert_eq;

use crate::common::Fixture;

#[test]
fn object_lists_from_sources() {
    let mut f = Fixture::new();
    f.run("SOURCES = src/main.c src/util.c lib/io.c\nOBJS = $(addprefix out/,$(notdir $(SOURCES:.c=.o)))\n");
    assert_eq!(f.expand("$(OBJS)"), "out/main.o out/util.o out/io.o");
    assert_eq!(f.expand("$(sort $(dir $(SOURCES)))"), "lib/ src/");
    assert_eq!(f.expand("$(patsubst src/%,%,$(filter src/%,$(SOURCES)))"), "main.c util.c");
}

#[test]
fn per_architecture_variables() {
    let mut f = Fixture::new();
    f.run("ARCH = amd64\nDEFS_x86 = X86\nDEFS_amd64 = AMD64 LP64\nDEFS = $(DEFS_$(ARCH))\n");
    assert_eq!(f.expand("$(addprefix -D,$(DEFS))"), "-DAMD64 -DLP64");
    assert_eq!(f.expand("$(words $(DEFS_$(ARCH)))"), "2");
    f.run("ARCH = x86\n");
    assert_eq!(f.expand("$(DEFS)"), "X86");
}

#[test]
fn module_selection_with_foreach_and_filter() {
    let mut f = Fixture::new();
    f.run("MODULES = net fs gui\nDISABLED = gui\n");
    let enabled = "$(strip $(foreach m,$(MODULES),$(if $(filter $(m),$(DISABLED)),,$(m))))";
    assert_eq!(f.expand(enabled), "net fs");
    assert_eq!(f.expand("$(filter-out $(DISABLED),$(MODULES))"), "net fs");
    // The loop variable does not leak.
    assert_eq!(f.engine.value("m"), None);
}

#[test]
fn sort_works_on_a_private_copy() {
    let mut f = Fixture::new();
    f.run("X = b a\nY = a c\n");
    assert_eq!(f.expand("$(sort $(X) $(Y))"), "a b c");
    assert_eq!(f.expand("$(sort $(X) $(Y))"), "a b c");
    assert_eq!(f.value("X"), "b a");
    assert_eq!(f.expand("$(X)|$(Y)"), "b a|a c");
}

#[test]
fn introspection_of_definitions() {
    let mut f = Fixture::new();
    f.run("override O = 1\nS := 2\nR = $(S)\n");
    assert_eq!(f.expand("$(origin O) $(origin S) $(origin X)"), "override file undefined");
    assert_eq!(f.expand("$(flavor S) $(flavor R)"), "simple recursive");
    assert_eq!(f.expand("$(value R)"), "$(S)");
}

#[test]
fn lazy_conditionals_guard_errors() {
    let mut f = Fixture::new();
    f.run("TOOL = gcc\n");
    assert_eq!(f.expand("$(if $(TOOL),$(TOOL),$(error no tool))"), "gcc");
    assert_eq!(f.expand("$(or $(CC),$(TOOL))"), "gcc");
    assert_eq!(f.expand("[$(and $(CC),$(error unreachable))]"), "[]");
}

#[test]
fn loop_variable_may_share_the_expanding_variable_name() {
    let mut f = Fixture::new();
    f.run("x = $(foreach x,a b,<$(x)>)\ni = outer\nL = $(foreach i,a b,$(i)) $(i)\n");
    assert_eq!(f.expand("$(x)"), "<a> <b>");
    assert_eq!(f.expand("$(x)"), "<a> <b>");
    assert_eq!(f.expand("$(L)"), "a b outer");
    assert_eq!(f.value("x"), "$(foreach x,a b,<$(x)>)");
}
