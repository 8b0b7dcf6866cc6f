//! Logical lines and escaped end-of-line tracking.

use std::sync::Arc;

use kmk_ir::Location;
use smallvec::SmallVec;

use crate::{is_blank, EolStyle};

/// Saturating `usize` to `u32` offset conversion; texts over 4 GiB are
/// rejected by the driver before they reach the lexer.
#[inline]
pub(crate) fn offset(v: usize) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

/// One escaped end-of-line inside a logical line.
///
/// `backslash` is the offset of the escaping backslash; `resume` is the
/// offset of the first byte of the following physical line. The bytes in
/// `backslash..resume` are the escape sequence itself.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct EscapedEol {
    pub backslash: u32,
    pub resume: u32,
}

/// A logical line: one or more physical lines joined by escaped EOLs.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct LogicalLine {
    /// Offset of the first byte.
    pub start: u32,
    /// Offset one past the last content byte (the terminator is excluded).
    pub end: u32,
    /// Offset where the following logical line begins.
    pub next: u32,
    /// Physical line number of `start`.
    pub line: u32,
    /// Escape points, in source order.
    pub escapes: SmallVec<[EscapedEol; 2]>,
}

impl LogicalLine {
    /// Number of physical lines this logical line spans.
    pub fn physical_lines(&self) -> u32 {
        offset(self.escapes.len()) + 1
    }

    /// The raw text, escapes included.
    pub fn raw<'s>(&self, src: &'s str) -> &'s str {
        &src[self.start as usize..self.end as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if the first byte is a tab, the recipe prefix.
    pub fn starts_with_tab(&self, src: &str) -> bool {
        !self.is_empty() && src.as_bytes()[self.start as usize] == b'\t'
    }

    /// Map an offset inside the line to a (physical line, 1-based column).
    pub fn line_col(&self, at: u32) -> (u32, u32) {
        let mut line = self.line;
        let mut line_start = self.start;
        for esc in &self.escapes {
            if esc.resume > at {
                break;
            }
            line += 1;
            line_start = esc.resume;
        }
        (line, at.saturating_sub(line_start) + 1)
    }

    pub fn location(&self, file: &Arc<str>, at: u32) -> Location {
        let (line, column) = self.line_col(at);
        Location::new(Arc::clone(file), line).with_column(column)
    }

    /// True if an escape sequence starts at `pos`.
    pub fn is_escape(&self, pos: u32) -> bool {
        self.escape_at(pos).is_some()
    }

    /// True if any escape sequence starts inside `from..to`.
    pub fn has_escape_in(&self, from: u32, to: u32) -> bool {
        self.escapes.iter().any(|e| e.backslash >= from && e.backslash < to)
    }

    fn escape_at(&self, pos: u32) -> Option<&EscapedEol> {
        self.escapes.iter().find(|e| e.backslash == pos)
    }

    fn escape_ending_at(&self, pos: u32) -> Option<&EscapedEol> {
        self.escapes.iter().find(|e| e.resume == pos)
    }

    /// Advance `pos` over blanks and escape sequences, stopping at `to`.
    pub fn skip_blanks(&self, src: &str, mut pos: u32, to: u32) -> u32 {
        let bytes = src.as_bytes();
        while pos < to {
            if let Some(esc) = self.escape_at(pos) {
                pos = esc.resume;
            } else if is_blank(bytes[pos as usize]) {
                pos += 1;
            } else {
                return pos;
            }
        }
        to
    }

    /// Move `to` back over trailing blanks and escape sequences, not past
    /// `from`.
    pub fn trim_end(&self, src: &str, from: u32, mut to: u32) -> u32 {
        let bytes = src.as_bytes();
        while to > from {
            if let Some(esc) = self.escape_ending_at(to) {
                to = esc.backslash;
            } else if is_blank(bytes[to as usize - 1]) {
                to -= 1;
            } else {
                break;
            }
        }
        to.max(from)
    }

    /// True if the line holds nothing but blanks and escapes.
    pub fn is_blank(&self, src: &str) -> bool {
        self.skip_blanks(src, self.start, self.end) == self.end
    }

    /// Cut the line at the first `#` that is not escaped by an odd run of
    /// backslashes. Returns `true` if a comment was removed.
    pub fn strip_comment(&mut self, src: &str) -> bool {
        let bytes = src.as_bytes();
        let mut pos = self.start as usize;
        let end = self.end as usize;
        while let Some(off) = memchr::memchr(b'#', &bytes[pos..end]) {
            let hash = pos + off;
            let backslashes = count_backslashes_before(bytes, self.start as usize, hash);
            if backslashes % 2 == 0 {
                let cut = offset(hash);
                self.end = cut;
                self.escapes.retain(|e| e.backslash < cut);
                return true;
            }
            pos = hash + 1;
        }
        false
    }

    /// Append `from..to` to `out`, collapsing every escaped EOL (and the
    /// blanks on both sides of it) to one space and turning `\#` into `#`.
    pub fn copy_normalized(&self, src: &str, from: u32, to: u32, out: &mut String) {
        let base = out.len();
        let mut pos = from;
        for esc in &self.escapes {
            if esc.backslash < pos || esc.backslash >= to {
                continue;
            }
            copy_unescaping_hash(src, pos, esc.backslash, out);
            let kept = out[base..].trim_end_matches([' ', '\t']).len();
            out.truncate(base + kept);
            out.push(' ');
            pos = self.skip_blanks(src, esc.resume.min(to), to);
        }
        if pos < to {
            copy_unescaping_hash(src, pos, to, out);
        }
    }

    /// [`copy_normalized`](Self::copy_normalized) into a fresh string.
    pub fn normalized(&self, src: &str, from: u32, to: u32) -> String {
        let mut out = String::with_capacity((to - from) as usize);
        self.copy_normalized(src, from, to, &mut out);
        out
    }
}

fn count_backslashes_before(bytes: &[u8], floor: usize, at: usize) -> usize {
    let mut n = 0;
    while at > floor + n && bytes[at - 1 - n] == b'\\' {
        n += 1;
    }
    n
}

fn copy_unescaping_hash(src: &str, from: u32, to: u32, out: &mut String) {
    let bytes = src.as_bytes();
    let (from, to) = (from as usize, to as usize);
    let mut seg = from;
    let mut pos = from;
    while let Some(off) = memchr::memchr(b'#', &bytes[pos..to]) {
        let hash = pos + off;
        let n = count_backslashes_before(bytes, seg, hash);
        if n % 2 == 1 {
            out.push_str(&src[seg..hash - n]);
            for _ in 0..n / 2 {
                out.push('\\');
            }
            out.push('#');
            seg = hash + 1;
        }
        pos = hash + 1;
    }
    out.push_str(&src[seg..to]);
}

/// Iterator over the logical lines of a makefile text.
#[derive(Clone, Debug)]
pub struct LineReader<'src> {
    src: &'src str,
    pos: usize,
    line: u32,
    eol: EolStyle,
}

impl<'src> LineReader<'src> {
    /// `first_line` is the physical line number of the first byte, which is
    /// not 1 when the text is a fragment of a larger file.
    pub fn new(src: &'src str, first_line: u32) -> Self {
        LineReader {
            src,
            pos: 0,
            line: first_line,
            eol: EolStyle::detect(src.as_bytes()),
        }
    }

    pub fn src(&self) -> &'src str {
        self.src
    }

    pub fn eol_style(&self) -> EolStyle {
        self.eol
    }

    /// Physical line number of the next logical line.
    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.src.len()
    }
}

impl Iterator for LineReader<'_> {
    type Item = LogicalLine;

    fn next(&mut self) -> Option<LogicalLine> {
        let bytes = self.src.as_bytes();
        if self.pos >= bytes.len() {
            return None;
        }
        let start = self.pos;
        let mut escapes = SmallVec::new();
        let mut physical_start = start;
        let (end, next) = loop {
            match self.eol.find(bytes, physical_start) {
                None => break (bytes.len(), bytes.len()),
                Some((eol_at, eol_len)) => {
                    let n = count_backslashes_before(bytes, physical_start, eol_at);
                    if n % 2 == 1 {
                        escapes.push(EscapedEol {
                            backslash: offset(eol_at - 1),
                            resume: offset(eol_at + eol_len),
                        });
                        physical_start = eol_at + eol_len;
                        continue;
                    }
                    break (eol_at, eol_at + eol_len);
                }
            }
        };

        let line = LogicalLine {
            start: offset(start),
            end: offset(end),
            next: offset(next),
            line: self.line,
            escapes,
        };
        self.line += line.physical_lines();
        self.pos = next;
        Some(line)
    }
}
