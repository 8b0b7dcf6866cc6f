//! End-of-line style detection.

/// Line terminator convention of one makefile text.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum EolStyle {
    #[default]
    Lf,
    CrLf,
    Cr,
}

impl EolStyle {
    /// The first terminator in the text decides. Text with no terminator is
    /// treated as LF.
    pub fn detect(src: &[u8]) -> EolStyle {
        match memchr::memchr2(b'\n', b'\r', src) {
            Some(pos) if src[pos] == b'\r' => {
                if src.get(pos + 1) == Some(&b'\n') {
                    EolStyle::CrLf
                } else {
                    EolStyle::Cr
                }
            }
            _ => EolStyle::Lf,
        }
    }

    /// Find the next terminator at or after `from`, returning its offset and
    /// byte length.
    ///
    /// In CRLF text a bare `\n` is still accepted as a terminator (length 1)
    /// so that files with mixed endings do not produce giant lines.
    pub fn find(self, src: &[u8], from: usize) -> Option<(usize, usize)> {
        let rest = &src[from..];
        match self {
            EolStyle::Lf => memchr::memchr(b'\n', rest).map(|p| (from + p, 1)),
            EolStyle::Cr => memchr::memchr(b'\r', rest).map(|p| (from + p, 1)),
            EolStyle::CrLf => memchr::memchr(b'\n', rest).map(|p| {
                let nl = from + p;
                if nl > from && src[nl - 1] == b'\r' {
                    (nl - 1, 2)
                } else {
                    (nl, 1)
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_styles() {
        assert_eq!(EolStyle::detect(b"a\nb\r\n"), EolStyle::Lf);
        assert_eq!(EolStyle::detect(b"a\r\nb\n"), EolStyle::CrLf);
        assert_eq!(EolStyle::detect(b"a\rb"), EolStyle::Cr);
        assert_eq!(EolStyle::detect(b"no terminator"), EolStyle::Lf);
    }

    #[test]
    fn finds_terminators() {
        assert_eq!(EolStyle::Lf.find(b"ab\ncd", 0), Some((2, 1)));
        assert_eq!(EolStyle::CrLf.find(b"ab\r\ncd", 0), Some((2, 2)));
        assert_eq!(EolStyle::CrLf.find(b"ab\ncd", 0), Some((2, 1)));
        assert_eq!(EolStyle::Cr.find(b"ab\rcd", 3), None);
    }
}
