// SPDX: CC0-1.0

use core::{fmt, iter::Peekable, str::CharIndices};
use std::sync::Arc;

/// Span of the source text, shared by tokens, expressions and errors so that
/// any failure can point at the text it came from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubStr {
    src: Arc<String>,
    start: usize,
    len: usize,
}

impl SubStr {
    #[inline]
    pub const fn new(src: Arc<String>, start: usize, len: usize) -> Self {
        Self { src, start, len }
    }

    #[inline]
    pub fn all(src: Arc<String>) -> Self {
        let len = src.len();
        Self::new(src, 0, len)
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(&self.src)
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self) -> &str {
        &self.src[self.start..self.start + self.len]
    }

    pub fn extend_to(&mut self, other: &SubStr) {
        let end = other.start + other.len;
        if end > self.start + self.len {
            self.len = end - self.start;
        }
    }

    fn grow(&mut self, by: usize) {
        self.len += by;
    }
}

impl fmt::Display for SubStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokTyp {
    OpenParen,
    CloseParen,
    Number,
    Bool(bool),
    Symbol,

    // unsupported tokens
    XQuote,
    XQuasiQuote,
    XUnquote,
    XString,
    XOpenSquareBracket,
    XCloseSquareBracket,
    XOpenCurly,
    XCloseCurly,
}

impl TokTyp {
    pub const fn is_unsupported(&self) -> bool {
        match self {
            Self::OpenParen | Self::CloseParen | Self::Number | Self::Bool(_) | Self::Symbol => {
                false
            }

            Self::XQuote
            | Self::XQuasiQuote
            | Self::XUnquote
            | Self::XString
            | Self::XOpenSquareBracket
            | Self::XCloseSquareBracket
            | Self::XOpenCurly
            | Self::XCloseCurly => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tok {
    pub typ: TokTyp,
    pub loc: SubStr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LexErrTyp {
    InvalidChar,
    Unsupported(TokTyp),
}

impl fmt::Display for LexErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChar => write!(f, "invalid character"),
            Self::Unsupported(_) => write!(f, "unsupported character"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LexErr {
    pub typ: LexErrTyp,
    pub loc: SubStr,
}

fn is_delimiter(chr: char) -> bool {
    chr.is_whitespace()
        || matches!(
            chr,
            '(' | ')' | '\'' | '`' | ',' | '"' | '[' | ']' | '{' | '}' | ';'
        )
}

/// Whether an atom should be read as a number rather than a symbol, so that
/// `-` and `+` stay symbols while `-1.5` and `.5` are numbers.
fn looks_numeric(atom: &str) -> bool {
    let mut chars = atom.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('.') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some('+' | '-') => match chars.next() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => chars.next().is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        },
        _ => false,
    }
}

#[derive(Debug)]
pub struct Lexer<'src> {
    src: &'src Arc<String>,
    cur: Peekable<CharIndices<'src>>,
    has_errored: bool, // tells iter to yield None after error
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src Arc<String>) -> Self {
        Self {
            src,
            cur: src.char_indices().peekable(),
            has_errored: false,
        }
    }

    pub fn src(&self) -> &'src Arc<String> {
        self.src
    }

    /// Skips whitespace and `;` line comments.
    pub fn trim_whitespace(&mut self) {
        while let Some((_, chr)) = self.cur.peek().copied() {
            if chr.is_whitespace() {
                self.cur.next();
            } else if chr == ';' {
                for (_, chr) in self.cur.by_ref() {
                    if chr == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn consume_unambiguous(&mut self) -> Option<Tok> {
        let (idx, chr) = self.cur.peek().copied()?;
        let typ = match chr {
            '(' => TokTyp::OpenParen,
            ')' => TokTyp::CloseParen,

            '\'' => TokTyp::XQuote,
            '`' => TokTyp::XQuasiQuote,
            ',' => TokTyp::XUnquote,
            '"' => TokTyp::XString,
            '[' => TokTyp::XOpenSquareBracket,
            ']' => TokTyp::XCloseSquareBracket,
            '{' => TokTyp::XOpenCurly,
            '}' => TokTyp::XCloseCurly,
            _ => return None,
        };
        self.cur.next();
        Some(Tok {
            typ,
            loc: SubStr::new(Arc::clone(self.src), idx, chr.len_utf8()),
        })
    }

    fn consume_atom(&mut self, start: usize) -> Tok {
        let mut loc = SubStr::new(Arc::clone(self.src), start, 0);
        while let Some((_, chr)) = self.cur.peek().copied() {
            if is_delimiter(chr) {
                break;
            }
            loc.grow(chr.len_utf8());
            self.cur.next();
        }
        let typ = match loc.get() {
            "#t" => TokTyp::Bool(true),
            "#f" => TokTyp::Bool(false),
            atom if looks_numeric(atom) => TokTyp::Number,
            _ => TokTyp::Symbol,
        };
        Tok { typ, loc }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Tok, LexErr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_errored {
            return None;
        }

        self.trim_whitespace();

        let (next_idx, next_chr) = self.cur.peek().copied()?;
        let is_bool = matches!(self.src.get(next_idx..next_idx + 2), Some("#t" | "#f"));
        let tok = if let Some(tok) = self.consume_unambiguous() {
            tok
        } else if next_chr == '#' && !is_bool {
            self.has_errored = true;
            return Some(Err(LexErr {
                typ: LexErrTyp::InvalidChar,
                loc: SubStr::new(Arc::clone(self.src), next_idx, 1),
            }));
        } else {
            self.consume_atom(next_idx)
        };

        if tok.typ.is_unsupported() {
            self.has_errored = true;
            return Some(Err(LexErr {
                typ: LexErrTyp::Unsupported(tok.typ),
                loc: tok.loc,
            }));
        }
        Some(Ok(tok))
    }
}
