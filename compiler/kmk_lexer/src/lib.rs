//! Directive lexer for kmk makefiles.
//!
//! Splits raw makefile text into *logical lines*: physical lines joined by
//! escaped end-of-lines (an odd run of backslashes right before the line
//! terminator). Nothing is copied while splitting; a [`LogicalLine`] is a byte
//! range plus the list of its escape points, which later stages use to
//!
//! - map any byte offset back to a physical line and column
//!   ([`LogicalLine::line_col`]), and
//! - copy text with each continuation collapsed to a single space
//!   ([`LogicalLine::copy_normalized`]).
//!
//! On top of lines sit the word splitter ([`split_words`]), which classifies
//! each word as plain or needing expansion, and keyword classification
//! ([`classify_keyword`]) for the directive compiler.

mod eol;
mod keyword;
mod line;
mod words;

pub use eol::EolStyle;
pub use keyword::{classify_keyword, Keyword};
pub use line::{EscapedEol, LineReader, LogicalLine};
pub use words::{split_words, Word, WordKind};

/// Space or tab.
#[inline]
pub fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}
