//! Directive keyword classification.

use kmk_ir::AssignOp;

use crate::is_blank;

/// Directive keywords recognized at the start of a line.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Keyword {
    Ifdef,
    Ifndef,
    Ifeq,
    Ifneq,
    If1of,
    Ifn1of,
    If,
    Else,
    Endif,
    Define,
    Endef,
    Export,
    Unexport,
    Undefine,
    Include,
    IncludeSilent,
    Sinclude,
    IncludeDep,
    IncludeDepQueue,
    IncludeDepFlush,
    Local,
    Override,
    Private,
}

impl Keyword {
    pub const ALL: &[Keyword] = &[
        Keyword::Ifdef,
        Keyword::Ifndef,
        Keyword::Ifeq,
        Keyword::Ifneq,
        Keyword::If1of,
        Keyword::Ifn1of,
        Keyword::If,
        Keyword::Else,
        Keyword::Endif,
        Keyword::Define,
        Keyword::Endef,
        Keyword::Export,
        Keyword::Unexport,
        Keyword::Undefine,
        Keyword::Include,
        Keyword::IncludeSilent,
        Keyword::Sinclude,
        Keyword::IncludeDep,
        Keyword::IncludeDepQueue,
        Keyword::IncludeDepFlush,
        Keyword::Local,
        Keyword::Override,
        Keyword::Private,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Ifdef => "ifdef",
            Keyword::Ifndef => "ifndef",
            Keyword::Ifeq => "ifeq",
            Keyword::Ifneq => "ifneq",
            Keyword::If1of => "if1of",
            Keyword::Ifn1of => "ifn1of",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::Endif => "endif",
            Keyword::Define => "define",
            Keyword::Endef => "endef",
            Keyword::Export => "export",
            Keyword::Unexport => "unexport",
            Keyword::Undefine => "undefine",
            Keyword::Include => "include",
            Keyword::IncludeSilent => "-include",
            Keyword::Sinclude => "sinclude",
            Keyword::IncludeDep => "includedep",
            Keyword::IncludeDepQueue => "includedep-queue",
            Keyword::IncludeDepFlush => "includedep-flush",
            Keyword::Local => "local",
            Keyword::Override => "override",
            Keyword::Private => "private",
        }
    }

    /// Opens a conditional.
    pub fn is_conditional(self) -> bool {
        matches!(
            self,
            Keyword::Ifdef
                | Keyword::Ifndef
                | Keyword::Ifeq
                | Keyword::Ifneq
                | Keyword::If1of
                | Keyword::Ifn1of
                | Keyword::If
        )
    }

    /// Conditional whose operands may start right after the keyword.
    pub fn takes_delimited_operands(self) -> bool {
        matches!(
            self,
            Keyword::Ifeq | Keyword::Ifneq | Keyword::If1of | Keyword::Ifn1of | Keyword::If
        )
    }

    /// Assignment qualifier (`export` doubles as a directive).
    pub fn is_qualifier(self) -> bool {
        matches!(
            self,
            Keyword::Local | Keyword::Override | Keyword::Private | Keyword::Export
        )
    }

    fn from_word(word: &str) -> Option<Keyword> {
        Some(match word {
            "ifdef" => Keyword::Ifdef,
            "ifndef" => Keyword::Ifndef,
            "ifeq" => Keyword::Ifeq,
            "ifneq" => Keyword::Ifneq,
            "if1of" => Keyword::If1of,
            "ifn1of" => Keyword::Ifn1of,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "endif" => Keyword::Endif,
            "define" => Keyword::Define,
            "endef" => Keyword::Endef,
            "export" => Keyword::Export,
            "unexport" => Keyword::Unexport,
            "undefine" => Keyword::Undefine,
            "include" => Keyword::Include,
            "-include" => Keyword::IncludeSilent,
            "sinclude" => Keyword::Sinclude,
            "includedep" => Keyword::IncludeDep,
            "includedep-queue" => Keyword::IncludeDepQueue,
            "includedep-flush" => Keyword::IncludeDepFlush,
            "local" => Keyword::Local,
            "override" => Keyword::Override,
            "private" => Keyword::Private,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every keyword starts with one of these two-byte prefixes.
fn may_start_keyword(text: &[u8]) -> bool {
    matches!(
        text,
        [b'i', b'f' | b'n', ..]
            | [b'e', b'l' | b'n' | b'x', ..]
            | [b'd', b'e', ..]
            | [b'u', b'n', ..]
            | [b'-', b'i', ..]
            | [b's', b'i', ..]
            | [b'l', b'o', ..]
            | [b'o', b'v', ..]
            | [b'p', b'r', ..]
    )
}

/// Classify the word at the start of `text`.
///
/// Returns the keyword and its byte length. A keyword must be followed by
/// end of text, a blank or a backslash (escaped EOL); the comparison
/// conditionals and `if` also accept `(`, `"` or `'`. A keyword that is
/// followed (after blanks) by an assignment operator or `:` is the name of
/// a variable or target instead, e.g. `export := 1` or `include: all`.
pub fn classify_keyword(text: &str) -> Option<(Keyword, usize)> {
    let bytes = text.as_bytes();
    if !may_start_keyword(bytes) {
        return None;
    }
    let len = bytes
        .iter()
        .take_while(|&&b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        .count();
    let keyword = Keyword::from_word(&text[..len])?;

    match bytes.get(len) {
        None => return Some((keyword, len)),
        Some(&b) if is_blank(b) || b == b'\\' => {}
        Some(b'(' | b'"' | b'\'') if keyword.takes_delimited_operands() => {
            return Some((keyword, len));
        }
        Some(_) => return None,
    }

    let rest = &bytes[len..];
    let after = rest.iter().position(|&b| !is_blank(b)).map_or(&[][..], |p| &rest[p..]);
    if starts_assignment_or_rule(after) {
        return None;
    }
    Some((keyword, len))
}

fn starts_assignment_or_rule(text: &[u8]) -> bool {
    AssignOp::parse_prefix(text).is_some() || text.starts_with(b"!=") || text.first() == Some(&b':')
}
