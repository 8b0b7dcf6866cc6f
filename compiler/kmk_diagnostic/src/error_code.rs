//! Error codes for all kmk diagnostics.
//!
//! The first digit names the phase:
//! - K1xxx: expansion compiler
//! - K2xxx: directive lexer and compiler
//! - K3xxx: run time (expansion interpreter, evaluation executor)
//! - K9xxx: internal consistency failures
//! - W2xxx: directive compiler warnings

use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Expansion compiler (K1xxx)
    /// Unterminated variable reference or function call
    K1001,
    /// Too few arguments to a function
    K1002,
    /// Too many levels of nested references
    K1003,

    // Directive compiler (K2xxx)
    /// Missing separator
    K2001,
    /// Missing `endif`
    K2002,
    /// `else` without a matching `if`
    K2003,
    /// Only one `else` per conditional
    K2004,
    /// `endif` without a matching `if`
    K2005,
    /// Conditional nesting too deep
    K2006,
    /// Extraneous text after a directive
    K2007,
    /// Malformed conditional operands
    K2008,
    /// Missing `endef`
    K2009,
    /// `endef` without a matching `define`
    K2010,
    /// Empty variable name
    K2011,
    /// Construct not supported by the compiler
    K2012,
    /// Qualifier not followed by an assignment
    K2013,

    // Run time (K3xxx)
    /// Reference to an undefined variable
    K3001,
    /// Recursive variable references itself
    K3002,
    /// Variable modified while its program is executing
    K3003,
    /// `$(error ...)` called
    K3004,
    /// Include file not found
    K3005,
    /// Include nesting too deep
    K3006,
    /// Expanded line is not blank (missing separator)
    K3007,
    /// Malformed `if` expression
    K3008,
    /// `$(warning ...)` called
    K3009,
    /// Invalid function argument
    K3010,
    /// Variable name expanded to nothing
    K3011,

    // Internal (K9xxx)
    /// A function mutated an argument it only borrowed
    K9001,
    /// Internal compiler error
    K9002,

    // Directive compiler warnings (W2xxx)
    /// Qualifier repeated in one assignment
    W2001,
}

impl ErrorCode {
    pub const ALL: &[ErrorCode] = &[
        ErrorCode::K1001,
        ErrorCode::K1002,
        ErrorCode::K1003,
        ErrorCode::K2001,
        ErrorCode::K2002,
        ErrorCode::K2003,
        ErrorCode::K2004,
        ErrorCode::K2005,
        ErrorCode::K2006,
        ErrorCode::K2007,
        ErrorCode::K2008,
        ErrorCode::K2009,
        ErrorCode::K2010,
        ErrorCode::K2011,
        ErrorCode::K2012,
        ErrorCode::K2013,
        ErrorCode::K3001,
        ErrorCode::K3002,
        ErrorCode::K3003,
        ErrorCode::K3004,
        ErrorCode::K3005,
        ErrorCode::K3006,
        ErrorCode::K3007,
        ErrorCode::K3008,
        ErrorCode::K3009,
        ErrorCode::K3010,
        ErrorCode::K3011,
        ErrorCode::K9001,
        ErrorCode::K9002,
        ErrorCode::W2001,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::K1001 => "K1001",
            ErrorCode::K1002 => "K1002",
            ErrorCode::K1003 => "K1003",
            ErrorCode::K2001 => "K2001",
            ErrorCode::K2002 => "K2002",
            ErrorCode::K2003 => "K2003",
            ErrorCode::K2004 => "K2004",
            ErrorCode::K2005 => "K2005",
            ErrorCode::K2006 => "K2006",
            ErrorCode::K2007 => "K2007",
            ErrorCode::K2008 => "K2008",
            ErrorCode::K2009 => "K2009",
            ErrorCode::K2010 => "K2010",
            ErrorCode::K2011 => "K2011",
            ErrorCode::K2012 => "K2012",
            ErrorCode::K2013 => "K2013",
            ErrorCode::K3001 => "K3001",
            ErrorCode::K3002 => "K3002",
            ErrorCode::K3003 => "K3003",
            ErrorCode::K3004 => "K3004",
            ErrorCode::K3005 => "K3005",
            ErrorCode::K3006 => "K3006",
            ErrorCode::K3007 => "K3007",
            ErrorCode::K3008 => "K3008",
            ErrorCode::K3009 => "K3009",
            ErrorCode::K3010 => "K3010",
            ErrorCode::K3011 => "K3011",
            ErrorCode::K9001 => "K9001",
            ErrorCode::K9002 => "K9002",
            ErrorCode::W2001 => "W2001",
        }
    }

    /// One-line summary, used by `--explain` style listings.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::K1001 => "unterminated variable reference",
            ErrorCode::K1002 => "insufficient number of arguments to function",
            ErrorCode::K1003 => "too many levels of nested references",
            ErrorCode::K2001 => "missing separator",
            ErrorCode::K2002 => "missing 'endif'",
            ErrorCode::K2003 => "'else' without 'if'",
            ErrorCode::K2004 => "only one 'else' per conditional",
            ErrorCode::K2005 => "'endif' without 'if'",
            ErrorCode::K2006 => "too deep if nesting",
            ErrorCode::K2007 => "extraneous text after directive",
            ErrorCode::K2008 => "malformed conditional",
            ErrorCode::K2009 => "missing 'endef'",
            ErrorCode::K2010 => "extraneous 'endef'",
            ErrorCode::K2011 => "empty variable name",
            ErrorCode::K2012 => "unsupported construct",
            ErrorCode::K2013 => "qualifier without assignment",
            ErrorCode::K3001 => "undefined variable",
            ErrorCode::K3002 => "recursive variable references itself",
            ErrorCode::K3003 => "variable modified while its program is executing",
            ErrorCode::K3004 => "error function called",
            ErrorCode::K3005 => "include file not found",
            ErrorCode::K3006 => "include nesting too deep",
            ErrorCode::K3007 => "expanded line is not blank",
            ErrorCode::K3008 => "malformed if expression",
            ErrorCode::K3009 => "warning function called",
            ErrorCode::K3010 => "invalid function argument",
            ErrorCode::K3011 => "empty variable name",
            ErrorCode::K9001 => "function mutated a borrowed argument",
            ErrorCode::K9002 => "internal compiler error",
            ErrorCode::W2001 => "repeated qualifier",
        }
    }

    pub fn is_warning(self) -> bool {
        matches!(
            self,
            ErrorCode::W2001 | ErrorCode::K3001 | ErrorCode::K3009
        )
    }

    /// Internal consistency failures indicate a defect in kmk itself.
    pub fn is_internal(self) -> bool {
        self.as_str().starts_with("K9")
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
