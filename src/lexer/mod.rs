use std::fmt;
use std::num::ParseIntError;

use miette::Result;

use crate::error;
use crate::lexer::cursor::Cursor;
use crate::symbol::{Span, SrcOffset};

pub mod cursor;

/// A 'light' token that only carries basic and easily derivable info
#[derive(Debug)]
pub struct LToken {
    pub kind: LTokenKind,
    pub len: usize,
}

impl LToken {
    pub fn new(kind: LTokenKind, len: usize) -> Self {
        LToken { kind, len }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LTokenKind {
    Ident,
    /// Decimal or hex integer, possibly negative
    Lit,
    Colon,
    Comment,
    /// Also includes commas
    Whitespace,
    Newline,
    Unknown,
    Eof,
}

/// Token with its value resolved, as consumed by the parser.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TokenKind {
    Ident(String),
    Lit(i64),
    Colon,
    Newline,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier `{name}`"),
            TokenKind::Lit(value) => write!(f, "literal `{value}`"),
            TokenKind::Colon => write!(f, "`:`"),
            TokenKind::Newline => write!(f, "end of line"),
        }
    }
}

/// Split source into parser tokens, dropping whitespace and comments.
pub fn lex(src: &str) -> Result<Vec<Token>> {
    let mut cursor = Cursor::new(src);
    let mut toks = Vec::new();
    loop {
        let start = cursor.token_start();
        let ltok = cursor.advance_token();
        let span = Span::new(SrcOffset(start), ltok.len);
        let kind = match ltok.kind {
            LTokenKind::Eof => break,
            LTokenKind::Whitespace | LTokenKind::Comment => continue,
            LTokenKind::Newline => TokenKind::Newline,
            LTokenKind::Colon => TokenKind::Colon,
            LTokenKind::Ident => TokenKind::Ident(src[span.range()].to_string()),
            LTokenKind::Lit => match parse_literal(&src[span.range()]) {
                Ok(value) => TokenKind::Lit(value),
                Err(e) => return Err(error::lex_invalid_lit(span, src, e)),
            },
            LTokenKind::Unknown => return Err(error::lex_unknown(span, src)),
        };
        toks.push(Token { kind, span });
    }
    Ok(toks)
}

fn parse_literal(text: &str) -> Result<i64, ParseIntError> {
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(&format!("{sign}{hex}"), 16),
        None => text.parse(),
    }
}

/// Test if a character is considered to be whitespace.
pub(crate) fn is_whitespace(c: char) -> bool {
    // Commas only separate operands
    matches!(c, ' ' | '\t' | '\r' | ',')
}

/// Test if a character can start an identifier.
pub(crate) fn is_id_start(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '_')
}

/// Test if a character can continue an identifier.
pub(crate) fn is_id(c: char) -> bool {
    // `-` for `allocate-registers`
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-')
}

impl Cursor<'_> {
    pub fn advance_token(&mut self) -> LToken {
        let first_char = match self.bump() {
            Some(c) => c,
            None => return LToken::new(LTokenKind::Eof, 0),
        };
        let token_kind = match first_char {
            ';' => {
                self.take_while(|c| c != '\n');
                LTokenKind::Comment
            }
            '\n' => LTokenKind::Newline,
            c if is_whitespace(c) => {
                self.take_while(is_whitespace);
                LTokenKind::Whitespace
            }
            ':' => LTokenKind::Colon,
            '-' if self.first().is_ascii_digit() => {
                // Trailing letters are kept so the literal fails to parse as a whole
                self.take_while(|c| c.is_ascii_alphanumeric());
                LTokenKind::Lit
            }
            c if c.is_ascii_digit() => {
                self.take_while(|c| c.is_ascii_alphanumeric());
                LTokenKind::Lit
            }
            c if is_id_start(c) => {
                self.take_while(is_id);
                LTokenKind::Ident
            }
            _ => LTokenKind::Unknown,
        };
        let res = LToken::new(token_kind, self.pos_in_token());
        self.reset_pos();
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().map(|tok| tok.kind).collect()
    }

    #[test]
    fn lexes_instruction_line() {
        assert_eq!(
            kinds("loop: add sum, sum, -12 ; running total\n"),
            vec![
                TokenKind::Ident("loop".into()),
                TokenKind::Colon,
                TokenKind::Ident("add".into()),
                TokenKind::Ident("sum".into()),
                TokenKind::Ident("sum".into()),
                TokenKind::Lit(-12),
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn lexes_hex_and_hyphenated_idents() {
        assert_eq!(
            kinds("allocate-registers a_1\nli a_1, 0x1F\nli a_1, -0x10"),
            vec![
                TokenKind::Ident("allocate-registers".into()),
                TokenKind::Ident("a_1".into()),
                TokenKind::Newline,
                TokenKind::Ident("li".into()),
                TokenKind::Ident("a_1".into()),
                TokenKind::Lit(31),
                TokenKind::Newline,
                TokenKind::Ident("li".into()),
                TokenKind::Ident("a_1".into()),
                TokenKind::Lit(-16),
            ]
        );
    }

    #[test]
    fn spans_point_into_source() {
        let src = "  write  total";
        let toks = lex(src).unwrap();
        assert_eq!(&src[toks[0].span.range()], "write");
        assert_eq!(&src[toks[1].span.range()], "total");
    }

    #[test]
    fn rejects_bad_literals_and_chars() {
        assert!(lex("li a, 12ab").is_err());
        assert!(lex("li a, 99999999999999999999").is_err());
        assert!(lex("li a, $3").is_err());
    }

    #[test]
    fn extreme_literals() {
        assert_eq!(
            kinds("-9223372036854775808 9223372036854775807"),
            vec![TokenKind::Lit(i64::MIN), TokenKind::Lit(i64::MAX)]
        );
    }

    #[test]
    fn light_tokens_cover_input() {
        let src = "a: halt ; done\n";
        let mut cursor = Cursor::new(src);
        let mut total = 0;
        loop {
            let tok = cursor.advance_token();
            if tok.kind == LTokenKind::Eof {
                break;
            }
            total += tok.len;
        }
        assert_eq!(total, src.len());
    }
}
