//! Builtin functions.
//!
//! Text functions treat their input as blank-separated words and join
//! results with single spaces.

use std::borrow::Cow;

use kmk_diagnostic::ErrorCode;
use kmk_ir::{Flavor, Origin};

use super::{FunctionDef, LazyArgs};
use crate::errors::{bad_argument, error_function, EvalError};
use crate::expand::subst::{substitute_words, Pattern};
use crate::expand::Expander;
use crate::vars::Definition;

type Args<'x, 'y> = &'x mut [Cow<'y, str>];
type FnResult = Result<(), EvalError>;

/// Every builtin, in registration order.
pub(super) static BUILTINS: &[FunctionDef] = &[
    // Text
    FunctionDef::new("subst", 3, 3, subst),
    FunctionDef::new("patsubst", 3, 3, patsubst),
    FunctionDef::new("strip", 1, 1, strip),
    FunctionDef::new("findstring", 2, 2, findstring),
    FunctionDef::new("filter", 2, 2, filter),
    FunctionDef::new("filter-out", 2, 2, filter_out),
    FunctionDef::new("sort", 1, 1, sort).dirty(),
    FunctionDef::new("word", 2, 2, word),
    FunctionDef::new("words", 1, 1, words),
    FunctionDef::new("wordlist", 3, 3, wordlist),
    FunctionDef::new("firstword", 1, 1, firstword),
    FunctionDef::new("lastword", 1, 1, lastword),
    // File names
    FunctionDef::new("dir", 1, 1, dir),
    FunctionDef::new("notdir", 1, 1, notdir),
    FunctionDef::new("suffix", 1, 1, suffix),
    FunctionDef::new("basename", 1, 1, basename),
    FunctionDef::new("addsuffix", 2, 2, addsuffix),
    FunctionDef::new("addprefix", 2, 2, addprefix),
    FunctionDef::new("join", 2, 2, join),
    // Control
    FunctionDef::lazy("if", 2, 3, if_),
    FunctionDef::lazy("or", 1, 0, or),
    FunctionDef::lazy("and", 1, 0, and),
    FunctionDef::lazy("foreach", 3, 3, foreach),
    // Variables
    FunctionDef::new("value", 1, 1, value),
    FunctionDef::new("origin", 1, 1, origin),
    FunctionDef::new("flavor", 1, 1, flavor),
    // Diagnostics
    FunctionDef::new("info", 0, 1, info),
    FunctionDef::new("warning", 0, 1, warning),
    FunctionDef::new("error", 0, 1, error),
];

fn arg<'a>(args: &'a [Cow<'_, str>], index: usize) -> &'a str {
    args.get(index).map_or("", AsRef::as_ref)
}

/// Append `items` separated by single spaces.
fn push_words<'w>(out: &mut String, items: impl IntoIterator<Item = &'w str>) {
    let mut first = true;
    for item in items {
        if !first {
            out.push(' ');
        }
        out.push_str(item);
        first = false;
    }
}

/// Positive word index, 1-based.
fn parse_count(function: &'static str, text: &str, which: &str) -> Result<usize, EvalError> {
    let text = text.trim();
    text.parse::<usize>()
        .map_err(|_| bad_argument(function, format!("non-numeric {which} argument '{text}'")))
}

fn file_part(word: &str) -> &str {
    word.rfind('/').map_or(word, |slash| &word[slash + 1..])
}

/// Offset of the suffix dot of `word`, if its file part has one.
fn suffix_start(word: &str) -> Option<usize> {
    let dot = word.rfind('.')?;
    match word.rfind('/') {
        Some(slash) if slash > dot => None,
        _ => Some(dot),
    }
}

// Text

fn subst(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    let (from, to, text) = (arg(args, 0), arg(args, 1), arg(args, 2));
    if from.is_empty() {
        out.push_str(text);
        out.push_str(to);
    } else {
        out.push_str(&text.replace(from, to));
    }
    Ok(())
}

fn patsubst(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    let search = Pattern::parse(arg(args, 0));
    let replace = Pattern::parse(arg(args, 1));
    substitute_words(arg(args, 2), &search, &replace, out);
    Ok(())
}

fn strip(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    push_words(out, arg(args, 0).split_ascii_whitespace());
    Ok(())
}

fn findstring(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    let find = arg(args, 0);
    if arg(args, 1).contains(find) {
        out.push_str(find);
    }
    Ok(())
}

fn filter_words(args: &[Cow<'_, str>], keep_matching: bool, out: &mut String) {
    let patterns: Vec<Pattern<'_>> = arg(args, 0).split_ascii_whitespace().map(Pattern::parse).collect();
    push_words(
        out,
        arg(args, 1)
            .split_ascii_whitespace()
            .filter(|w| patterns.iter().any(|p| p.matches(w).is_some()) == keep_matching),
    );
}

fn filter(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    filter_words(args, true, out);
    Ok(())
}

fn filter_out(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    filter_words(args, false, out);
    Ok(())
}

/// Sorts in place: the list argument is a private copy.
fn sort(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    let Some(list) = args.first_mut() else {
        return Ok(());
    };
    let list = list.to_mut();
    let mut words: Vec<&str> = list.split_ascii_whitespace().collect();
    words.sort_unstable();
    words.dedup();
    push_words(out, words);
    Ok(())
}

fn word(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    let n = parse_count("word", arg(args, 0), "first")?;
    if n == 0 {
        return Err(bad_argument("word", "first argument must be greater than 0"));
    }
    if let Some(w) = arg(args, 1).split_ascii_whitespace().nth(n - 1) {
        out.push_str(w);
    }
    Ok(())
}

fn words(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    out.push_str(&arg(args, 0).split_ascii_whitespace().count().to_string());
    Ok(())
}

fn wordlist(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    let start = parse_count("wordlist", arg(args, 0), "first")?;
    let end = parse_count("wordlist", arg(args, 1), "second")?;
    if start == 0 {
        return Err(bad_argument("wordlist", "first argument must be greater than 0"));
    }
    if end >= start {
        push_words(
            out,
            arg(args, 2).split_ascii_whitespace().skip(start - 1).take(end - start + 1),
        );
    }
    Ok(())
}

fn firstword(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    if let Some(w) = arg(args, 0).split_ascii_whitespace().next() {
        out.push_str(w);
    }
    Ok(())
}

fn lastword(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    if let Some(w) = arg(args, 0).split_ascii_whitespace().next_back() {
        out.push_str(w);
    }
    Ok(())
}

// File names

fn dir(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    push_words(
        out,
        arg(args, 0)
            .split_ascii_whitespace()
            .map(|w| w.rfind('/').map_or("./", |slash| &w[..=slash])),
    );
    Ok(())
}

fn notdir(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    push_words(out, arg(args, 0).split_ascii_whitespace().map(file_part));
    Ok(())
}

fn suffix(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    push_words(
        out,
        arg(args, 0)
            .split_ascii_whitespace()
            .filter_map(|w| suffix_start(w).map(|dot| &w[dot..])),
    );
    Ok(())
}

fn basename(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    push_words(
        out,
        arg(args, 0)
            .split_ascii_whitespace()
            .map(|w| suffix_start(w).map_or(w, |dot| &w[..dot])),
    );
    Ok(())
}

fn addsuffix(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    let suffix = arg(args, 0);
    for (i, w) in arg(args, 1).split_ascii_whitespace().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(w);
        out.push_str(suffix);
    }
    Ok(())
}

fn addprefix(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    let prefix = arg(args, 0);
    for (i, w) in arg(args, 1).split_ascii_whitespace().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(prefix);
        out.push_str(w);
    }
    Ok(())
}

fn join(_: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    let mut left = arg(args, 0).split_ascii_whitespace();
    let mut right = arg(args, 1).split_ascii_whitespace();
    let mut first = true;
    loop {
        let (l, r) = (left.next(), right.next());
        if l.is_none() && r.is_none() {
            return Ok(());
        }
        if !first {
            out.push(' ');
        }
        out.push_str(l.unwrap_or(""));
        out.push_str(r.unwrap_or(""));
        first = false;
    }
}

// Control. Arguments are expanded on demand.

fn if_(exp: &mut Expander<'_>, args: &LazyArgs<'_>, out: &mut String) -> FnResult {
    let condition = args.expand(exp, 0)?;
    let branch = if condition.trim().is_empty() { 2 } else { 1 };
    args.expand_into(exp, branch, out)
}

fn or(exp: &mut Expander<'_>, args: &LazyArgs<'_>, out: &mut String) -> FnResult {
    for i in 0..args.len() {
        let value = args.expand(exp, i)?;
        if !value.trim().is_empty() {
            out.push_str(&value);
            return Ok(());
        }
    }
    Ok(())
}

fn and(exp: &mut Expander<'_>, args: &LazyArgs<'_>, out: &mut String) -> FnResult {
    let mut last = String::new();
    for i in 0..args.len() {
        last = args.expand(exp, i)?;
        if last.trim().is_empty() {
            return Ok(());
        }
    }
    out.push_str(&last);
    Ok(())
}

/// The loop variable is a simple variable of automatic origin, bound over
/// any existing definition for one item at a time. The shadowed definition
/// is never touched, so it may be the variable being expanded.
fn foreach(exp: &mut Expander<'_>, args: &LazyArgs<'_>, out: &mut String) -> FnResult {
    let var = args.expand(exp, 0)?;
    let name = exp.context().interner().intern(var.trim());
    let list = args.expand(exp, 1)?;

    for (i, item) in list.split_ascii_whitespace().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        exp.vars_mut()
            .push_local(Definition::new(name, item, Flavor::Simple, Origin::Automatic));
        let result = args.expand_into(exp, 2, out);
        exp.vars_mut().pop_local();
        result?;
    }
    Ok(())
}

// Variables. The argument is a variable name.

fn value(exp: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    if let Some(var) = exp.lookup(arg(args, 0).trim()) {
        out.push_str(var.value());
    }
    Ok(())
}

fn origin(exp: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    let origin = exp.lookup(arg(args, 0).trim()).map(crate::vars::Variable::origin);
    out.push_str(origin.map_or("undefined", Origin::as_str));
    Ok(())
}

fn flavor(exp: &mut Expander<'_>, args: Args<'_, '_>, out: &mut String) -> FnResult {
    let flavor = exp.lookup(arg(args, 0).trim()).map(crate::vars::Variable::flavor);
    out.push_str(flavor.map_or("undefined", Flavor::as_str));
    Ok(())
}

// Diagnostics

fn info(exp: &mut Expander<'_>, args: Args<'_, '_>, _: &mut String) -> FnResult {
    exp.context().print().println(arg(args, 0));
    Ok(())
}

fn warning(exp: &mut Expander<'_>, args: Args<'_, '_>, _: &mut String) -> FnResult {
    let message = arg(args, 0);
    tracing::warn!(text = message, "$(warning)");
    exp.warn(ErrorCode::K3009, message);
    Ok(())
}

fn error(exp: &mut Expander<'_>, args: Args<'_, '_>, _: &mut String) -> FnResult {
    Err(error_function(arg(args, 0)).at_opt(exp.location()))
}
