//! Word splitter.

use std::borrow::Cow;

use smallvec::SmallVec;

use crate::{is_blank, LogicalLine};

/// Whether a word must go through the expansion compiler.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum WordKind {
    Plain,
    NeedsExpansion,
}

/// One blank-separated word of a logical line, as a byte range.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Word {
    pub start: u32,
    pub end: u32,
    pub kind: WordKind,
}

impl Word {
    pub fn needs_expansion(&self) -> bool {
        self.kind == WordKind::NeedsExpansion
    }

    /// The word's text. Borrowed unless it spans an escaped EOL or holds a
    /// `#` that may need unescaping.
    pub fn text<'s>(&self, line: &LogicalLine, src: &'s str) -> Cow<'s, str> {
        let raw = &src[self.start as usize..self.end as usize];
        if line.has_escape_in(self.start, self.end) || raw.contains('#') {
            Cow::Owned(line.normalized(src, self.start, self.end))
        } else {
            Cow::Borrowed(raw)
        }
    }
}

/// Split `from..to` of `line` into words.
///
/// Blanks and escaped EOLs separate words, except inside `$(...)` or
/// `${...}`, where they belong to the reference.
pub fn split_words(line: &LogicalLine, src: &str, from: u32, to: u32) -> SmallVec<[Word; 4]> {
    let bytes = src.as_bytes();
    let mut words = SmallVec::new();
    let mut pos = line.skip_blanks(src, from, to);
    while pos < to {
        let start = pos;
        let mut closers: SmallVec<[u8; 8]> = SmallVec::new();
        let mut kind = WordKind::Plain;
        while pos < to {
            let b = bytes[pos as usize];
            if closers.is_empty() && (is_blank(b) || line.is_escape(pos)) {
                break;
            }
            match b {
                b'$' => {
                    kind = WordKind::NeedsExpansion;
                    if pos + 1 < to {
                        match bytes[pos as usize + 1] {
                            b'(' => {
                                closers.push(b')');
                                pos += 2;
                                continue;
                            }
                            b'{' => {
                                closers.push(b'}');
                                pos += 2;
                                continue;
                            }
                            // `$$` is a literal dollar; keep it from opening a reference.
                            b'$' => {
                                pos += 2;
                                continue;
                            }
                            _ => {}
                        }
                    }
                }
                b'(' if !closers.is_empty() => closers.push(b')'),
                b'{' if !closers.is_empty() => closers.push(b'}'),
                b')' | b'}' => {
                    if closers.last() == Some(&b) {
                        closers.pop();
                    }
                }
                _ => {}
            }
            pos += 1;
        }
        words.push(Word { start, end: pos, kind });
        pos = line.skip_blanks(src, pos, to);
    }
    words
}
