//! Parsing assembly source into statements.
//!
//! Assembly source is line-oriented. Each non-empty line becomes a [`Stmt`], which is
//! an optional label declaration followed by the whitespace-separated parts of an instruction:
//!
//! ```text
//! LOOP: CMP COUNTER R0   ; comment
//! ~~~~~ ~~~ ~~~~~~~ ~~
//! label  parts...
//! ```
//!
//! Only a name at the very start of a line followed by a colon is a declaration
//! (`LOOP:DECR` and `LOOP : DECR` both declare `LOOP`).
//! The parts of a statement are left uninterpreted; the assembler
//! decides which part is a mnemonic, register, integer, or label reference.
pub mod lex;

use logos::{Logos, Span};

use self::lex::{LexErr, Token};

/// A label declaration (e.g., `LOOP:`).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Label {
    /// The name of the label (without the colon).
    pub name: String,
    /// The span of the declaration in source.
    pub span: Span,
}

/// One whitespace-separated part of an instruction.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Part {
    /// How this part was tokenized.
    pub token: Token,
    /// The source text of this part.
    pub text: String,
    /// The span of this part in source.
    pub span: Span,
}

/// A non-empty line of assembly source.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Stmt {
    /// The label declared at the start of this line, if any.
    pub label: Option<Label>,
    /// The instruction parts on this line (the first part is the mnemonic).
    ///
    /// This is empty if the line only declares a label.
    pub parts: Vec<Part>,
    /// The 0-based source line this statement is on.
    pub line: usize,
}
impl Stmt {
    /// Whether this statement holds an instruction (rather than just a label).
    pub fn has_instr(&self) -> bool {
        !self.parts.is_empty()
    }
}

/// An error raised while parsing assembly source.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseErr {
    /// The reason for the error.
    pub kind: LexErr,
    /// The span of the offending text.
    pub span: Span,
}
impl std::fmt::Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for ParseErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
impl crate::err::Error for ParseErr {
    fn span(&self) -> Option<crate::err::ErrSpan> {
        Some(self.span.clone().into())
    }

    fn help(&self) -> Option<std::borrow::Cow<str>> {
        crate::err::Error::help(&self.kind)
    }
}

/// Parses assembly source into a list of statements, one per non-empty line.
///
/// Blank lines and comment-only lines produce no statement.
///
/// # Example
/// ```
/// use bytevm::parse::parse_ast;
///
/// let src = "
///     START: PUSH 10 ; comment
///     ; just a comment
///     END:
/// ";
/// let ast = parse_ast(src).unwrap();
/// assert_eq!(ast.len(), 2);
/// assert_eq!(ast[0].label.as_ref().unwrap().name, "START");
/// assert_eq!(ast[0].parts.len(), 2);
/// assert!(!ast[1].has_instr());
/// ```
pub fn parse_ast(src: &str) -> Result<Vec<Stmt>, ParseErr> {
    let mut stmts = vec![];
    let mut line = 0;
    let mut current: Vec<Part> = vec![];

    let mut lexer = Token::lexer(src);
    while let Some(result) = lexer.next() {
        let token = result.map_err(|kind| ParseErr { kind, span: lexer.span() })?;
        match token {
            Token::NewLine => {
                stmts.extend(group_line(std::mem::take(&mut current), line));
                line += 1;
            },
            t if t.is_trivia() => {},
            token => current.push(Part { token, text: lexer.slice().to_string(), span: lexer.span() }),
        }
    }
    stmts.extend(group_line(current, line));

    Ok(stmts)
}

/// Groups the tokens of one line into a statement.
fn group_line(mut parts: Vec<Part>, line: usize) -> Option<Stmt> {
    let label = match &parts[..] {
        [name, Part { token: Token::Colon, span: colon, .. }, ..] if is_label_name(&name.text) => {
            Some(Label { name: name.text.clone(), span: name.span.start..colon.end })
        },
        _ => None,
    };
    if label.is_some() {
        parts.drain(..2);
    }

    match label.is_some() || !parts.is_empty() {
        true  => Some(Stmt { label, parts, line }),
        false => None,
    }
}

/// Whether some text can name a label (`[A-Za-z_.][A-Za-z0-9_.]*`).
fn is_label_name(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '.')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}
