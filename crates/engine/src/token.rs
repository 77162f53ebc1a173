// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generic curly-brace tokenizer.
//!
//! Both search patterns and target sources are token streams to the matcher,
//! and both sides are produced by this lexer (front-ends may lex themselves
//! as long as they emit the same stream shape). Whitespace and comments are
//! not part of the stream; that is what makes runs of whitespace compare
//! equal to a single space. String literals keep their raw text, quotes and
//! escapes included, so comparison inside them is byte-for-byte.

use std::ops::Range;

use serde::Serialize;

/// Coarse lexical class of a token.
///
/// The matcher compares token *text*; the kind only matters where the rules
/// differ for strings (byte-for-byte comparison) and punctuation (statement
/// terminators, bracket depth).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    /// Identifier or keyword. The engine does not distinguish the two;
    /// front-ends and oracles do.
    Word,
    /// Integer or decimal literal.
    Number,
    /// String or character literal, raw text with delimiters.
    Str,
    /// Operator or delimiter, longest-munch.
    Punct,
}

/// One lexed token. `span` indexes the original source in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Range<usize>,
}

impl Token {
    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }
}

/// Multi-character operators, longest first within a leading byte.
const COMPOUND_PUNCT: &[&str] = &[
    "<<=", ">>=", "&&", "||", "==", "!=", "<=", ">=", "=>", "->", "++", "--", "+=", "-=", "*=",
    "/=", "%=", "::", "<<", ">>", "??",
];

/// Lex `src` into a token stream, skipping whitespace and `//`/`/* */`
/// comments. Unterminated strings and block comments run to end of input
/// rather than failing; pattern fragments are routinely mid-expression.
pub fn tokenize(src: &str) -> Vec<Token> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if b == b'/' && i + 1 < bytes.len() {
            match bytes[i + 1] {
                b'/' => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                    continue;
                }
                b'*' => {
                    let close = src[i + 2..].find("*/").map_or(bytes.len(), |p| i + 4 + p);
                    i = close;
                    continue;
                }
                _ => {}
            }
        }
        let start = i;
        if b == b'"' || b == b'\'' {
            i += 1;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => i = (i + 2).min(bytes.len()),
                    c if c == b => {
                        i += 1;
                        break;
                    }
                    _ => i += 1,
                }
            }
            push(&mut tokens, TokenKind::Str, src, start..i);
        } else if b.is_ascii_digit() {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
                i += 1;
            }
            if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
            }
            push(&mut tokens, TokenKind::Number, src, start..i);
        } else if b.is_ascii_alphabetic() || b == b'_' || b >= 0x80 {
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] >= 0x80)
            {
                i += 1;
            }
            push(&mut tokens, TokenKind::Word, src, start..i);
        } else {
            let rest = &src[i..];
            let munched = COMPOUND_PUNCT
                .iter()
                .find(|op| rest.starts_with(**op))
                .map_or(1, |op| op.len());
            i += munched;
            push(&mut tokens, TokenKind::Punct, src, start..i);
        }
    }
    tokens
}

fn push(tokens: &mut Vec<Token>, kind: TokenKind, src: &str, span: Range<usize>) {
    tokens.push(Token {
        kind,
        text: src[span.clone()].to_string(),
        span,
    });
}

/// Join token texts with single spaces. This is the canonical form used for
/// binding equality and constraint checks: any run of whitespace outside a
/// string literal compares equal to a single space.
pub fn canonical_text(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (i, tok) in tokens.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&tok.text);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn texts(src: &str) -> Vec<String> {
        tokenize(src).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_whitespace_collapses() {
        assert_eq!(texts("a   +\n\tb"), texts("a + b"));
    }

    #[test]
    fn test_string_literal_raw() {
        let toks = tokenize(r#"f("a  b")"#);
        assert_eq!(toks[2].kind, TokenKind::Str);
        assert_eq!(toks[2].text, r#""a  b""#);
    }

    #[test]
    fn test_string_escapes() {
        let toks = tokenize(r#""he \"said\"" x"#);
        assert_eq!(toks[0].text, r#""he \"said\"""#);
        assert_eq!(toks[1].text, "x");
    }

    #[test]
    fn test_compound_punct() {
        assert_eq!(texts("a==b"), vec!["a", "==", "b"]);
        assert_eq!(texts("x <= y"), vec!["x", "<=", "y"]);
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(texts("a // c\n + /* d */ b"), vec!["a", "+", "b"]);
    }

    #[test]
    fn test_spans_index_source() {
        let src = "foo( 12 )";
        for tok in tokenize(src) {
            assert_eq!(&src[tok.span.clone()], tok.text);
        }
    }

    #[test]
    fn test_canonical_text() {
        let toks = tokenize("f( a,\n   b )");
        assert_eq!(canonical_text(&toks), "f ( a , b )");
    }
}
