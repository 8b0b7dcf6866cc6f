//! `%` patterns shared by `$(VAR:a=b)`, `patsubst` and `filter`.

use std::borrow::Cow;

/// A pattern split at its first unescaped `%`.
///
/// Without a `%` the whole text is in `prefix` and the pattern only matches
/// itself.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pattern<'a> {
    pub prefix: Cow<'a, str>,
    pub suffix: &'a str,
    pub percent: bool,
}

impl<'a> Pattern<'a> {
    /// Split `text` at its first `%` not escaped by an odd run of
    /// backslashes. Backslashes in front of a `%` are halved; other
    /// backslashes are kept.
    pub fn parse(text: &'a str) -> Pattern<'a> {
        let bytes = text.as_bytes();
        let mut owned: Option<String> = None;
        let mut seg = 0;
        let mut pos = 0;
        while let Some(off) = memchr::memchr(b'%', &bytes[pos..]) {
            let at = pos + off;
            let run = bytes[seg..at].iter().rev().take_while(|&&b| b == b'\\').count();
            if run == 0 {
                let prefix = match owned {
                    Some(mut s) => {
                        s.push_str(&text[seg..at]);
                        Cow::Owned(s)
                    }
                    None => Cow::Borrowed(&text[..at]),
                };
                return Pattern {
                    prefix,
                    suffix: &text[at + 1..],
                    percent: true,
                };
            }
            let buf = owned.get_or_insert_with(String::new);
            buf.push_str(&text[seg..at - run]);
            for _ in 0..run / 2 {
                buf.push('\\');
            }
            if run % 2 == 0 {
                return Pattern {
                    prefix: Cow::Owned(std::mem::take(buf)),
                    suffix: &text[at + 1..],
                    percent: true,
                };
            }
            buf.push('%');
            seg = at + 1;
            pos = at + 1;
        }
        let prefix = match owned {
            Some(mut s) => {
                s.push_str(&text[seg..]);
                Cow::Owned(s)
            }
            None => Cow::Borrowed(text),
        };
        Pattern {
            prefix,
            suffix: "",
            percent: false,
        }
    }

    /// `%text`: the implicit pattern of the `$(VAR:.c=.o)` shorthand.
    pub fn suffix_only(text: &'a str) -> Pattern<'a> {
        Pattern {
            prefix: Cow::Borrowed(""),
            suffix: text,
            percent: true,
        }
    }

    /// The stem matched by `%`, or `""` for an exact literal match.
    pub fn matches<'w>(&self, word: &'w str) -> Option<&'w str> {
        if !self.percent {
            return (word == self.prefix.as_ref()).then_some("");
        }
        let fixed = self.prefix.len() + self.suffix.len();
        if word.len() >= fixed && word.starts_with(self.prefix.as_ref()) && word.ends_with(self.suffix) {
            Some(&word[self.prefix.len()..word.len() - self.suffix.len()])
        } else {
            None
        }
    }
}

/// Search and replace patterns of a `NAME:search=replace` reference.
///
/// Without a `%` in `search` both sides are treated as suffixes.
pub fn reference_patterns<'a>(search: &'a str, replace: &'a str) -> (Pattern<'a>, Pattern<'a>) {
    let search_pattern = Pattern::parse(search);
    if search_pattern.percent {
        (search_pattern, Pattern::parse(replace))
    } else {
        (Pattern::suffix_only(search), Pattern::suffix_only(replace))
    }
}

/// Split `NAME:search=replace`. Returns `None` for a plain name.
pub fn split_subst_ref(text: &str) -> Option<(&str, &str, &str)> {
    let colon = text.find(':')?;
    let eq = colon + 1 + text[colon + 1..].find('=')?;
    Some((&text[..colon], &text[colon + 1..eq], &text[eq + 1..]))
}

/// Replace one word.
pub fn substitute_word(word: &str, search: &Pattern<'_>, replace: &Pattern<'_>, out: &mut String) {
    match search.matches(word) {
        Some(stem) => {
            out.push_str(&replace.prefix);
            if replace.percent {
                out.push_str(stem);
                out.push_str(replace.suffix);
            }
        }
        None => out.push_str(word),
    }
}

/// Replace every blank-separated word of `text`, joining results with one
/// space.
pub fn substitute_words(text: &str, search: &Pattern<'_>, replace: &Pattern<'_>, out: &mut String) {
    for (i, word) in text.split_ascii_whitespace().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        substitute_word(word, search, replace, out);
    }
}
