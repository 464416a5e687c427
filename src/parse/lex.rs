//! Tokenizing assembly source.
//!
//! This module holds the tokens that characterize assembly source ([`Token`]).
//! The parser uses it to split each source line into a label and
//! whitespace-separated instruction parts.
//!
//! Source is intentionally loosely tokenized: anything that isn't whitespace, a colon,
//! or a comment forms a [`Token::Word`], unless it exactly matches one of the
//! more specific operand shapes (register, counter, integer).
//! Whether a word is a valid mnemonic or label is decided by the assembler,
//! and whether a colon ends a label declaration is decided by the parser.

use logos::{Lexer, Logos};

/// A unit of information in assembly source.
#[derive(Debug, Logos, PartialEq, Eq, Clone)]
#[logos(skip r"[ \t\r\x0B\x0C]+", error = LexErr)]
pub enum Token {
    /// A colon, which ends a label declaration (e.g., `LOOP:`).
    #[token(":")]
    Colon,

    /// The counter register operand (`COUNTER`).
    #[token("COUNTER", priority = 5)]
    Counter,

    /// A register operand (e.g., `R0`, `R7`).
    ///
    /// The register number is truncated to a byte, and is not range checked here.
    #[regex(r"R[+-]?[0-9]+", lex_reg, priority = 5)]
    Reg(u8),

    /// A base-10 integer operand (e.g., `10`, `-1`), truncated to a byte.
    #[regex(r"[+-]?[0-9]+", lex_int, priority = 5)]
    Int(u8),

    /// Any other whitespace-delimited text (mnemonics and label references).
    #[regex(r"[^ \t\r\n\x0B\x0C;:]+", |lx| lx.slice().to_string(), priority = 1)]
    Word(String),

    /// A comment, which starts with a semicolon and spans the remaining part of the line.
    #[regex(r";[^\n]*")]
    Comment,

    /// A new line
    #[regex(r"\n")]
    NewLine
}
impl Token {
    pub(crate) fn is_trivia(&self) -> bool {
        matches!(self, Token::Comment)
    }
}

/// Any errors raised in attempting to tokenize an input stream.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum LexErr {
    /// A symbol was used which is not allowed in assembly source
    #[default]
    InvalidSymbol
}
impl std::fmt::Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErr::InvalidSymbol => f.write_str("unrecognized symbol"),
        }
    }
}
impl std::error::Error for LexErr {}
impl crate::err::Error for LexErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            LexErr::InvalidSymbol => Some("this char does not occur in any token".into()),
        }
    }
}

/// Parses a signed base-10 literal, truncating it to its low byte.
///
/// This never overflows: the value is accumulated modulo 256,
/// which is the same as parsing it fully and then truncating.
fn truncate_dec(s: &str) -> u8 {
    let (neg, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let magnitude = digits.bytes()
        .fold(0u8, |acc, d| acc.wrapping_mul(10).wrapping_add(d - b'0'));

    match neg {
        true  => magnitude.wrapping_neg(),
        false => magnitude,
    }
}
fn lex_reg(lx: &Lexer<'_, Token>) -> u8 {
    truncate_dec(&lx.slice()[1..])
}
fn lex_int(lx: &Lexer<'_, Token>) -> u8 {
    truncate_dec(lx.slice())
}
