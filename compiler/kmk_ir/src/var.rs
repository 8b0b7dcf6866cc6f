//! Variable vocabulary shared by the compiler, interpreter and variable table.

use std::fmt;

/// Where a variable definition came from.
///
/// Ordered by precedence: a definition may only replace one of equal or lower
/// precedence unless it is an `override`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Origin {
    Default,
    Environment,
    File,
    Local,
    EnvironmentOverride,
    CommandLine,
    Override,
    Automatic,
}

impl Origin {
    /// The word `$(origin NAME)` reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Default => "default",
            Origin::Environment => "environment",
            Origin::File => "file",
            Origin::Local => "local",
            Origin::EnvironmentOverride => "environment override",
            Origin::CommandLine => "command line",
            Origin::Override => "override",
            Origin::Automatic => "automatic",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a variable's value is treated when referenced.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Flavor {
    /// Value is expanded every time it is referenced (`=`).
    Recursive,
    /// Value was expanded once at definition time (`:=`).
    Simple,
}

impl Flavor {
    pub fn as_str(self) -> &'static str {
        match self {
            Flavor::Recursive => "recursive",
            Flavor::Simple => "simple",
        }
    }
}

/// Assignment operator of a makefile assignment or `define`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AssignOp {
    /// `=`
    Recursive,
    /// `:=` or `::=`
    Simple,
    /// `+=`
    Append,
    /// `<=`
    Prepend,
    /// `?=`
    Conditional,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Recursive => "=",
            AssignOp::Simple => ":=",
            AssignOp::Append => "+=",
            AssignOp::Prepend => "<=",
            AssignOp::Conditional => "?=",
        }
    }

    /// Parse an operator spelled at the start of `text`, returning it and its
    /// byte length.
    pub fn parse_prefix(text: &[u8]) -> Option<(AssignOp, usize)> {
        match text {
            [b'=', ..] => Some((AssignOp::Recursive, 1)),
            [b':', b':', b'=', ..] => Some((AssignOp::Simple, 3)),
            [b':', b'=', ..] => Some((AssignOp::Simple, 2)),
            [b'+', b'=', ..] => Some((AssignOp::Append, 2)),
            [b'<', b'=', ..] => Some((AssignOp::Prepend, 2)),
            [b'?', b'=', ..] => Some((AssignOp::Conditional, 2)),
            _ => None,
        }
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
