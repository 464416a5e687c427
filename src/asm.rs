//! Assembling assembly source ASTs into programs.
//!
//! This module is used to convert source ASTs (`Vec<`[`Stmt`]`>`) into [`Program`]s
//! that can be executed by the simulator.
//!
//! Assembly happens in two passes:
//! 1. [`SymbolTable::new`] walks the statements, assigning each label the 1-based
//!    index of the instruction that follows it.
//! 2. [`assemble`] encodes each instruction, resolving label operands through the symbol table.
//!
//! Two passes are needed so that a jump can refer to a label declared further down.
//!
//! Not all errors stop assembly. An unrecognized mnemonic only drops its own line,
//! and is reported in [`Assembly::diagnostics`]. An operand that can't be resolved
//! (see [`assemble`]) is fatal.

pub mod encoding;

use std::collections::HashMap;

use logos::Span;

use crate::ast::{Instr, Opcode, COUNTER};
use crate::err::ErrSpan;
use crate::parse::lex::Token;
use crate::parse::{Part, Stmt};

/// Kinds of errors that can occur from assembling given assembly code.
///
/// See [`AsmErr`] for this error type with span information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum AsmErrKind {
    /// Operand is not a register, integer, `COUNTER`, or known label (pass 2, fatal).
    UnknownOperand(String),
    /// Mnemonic is not in the opcode table (pass 2, line is dropped).
    UnknownMnemonic(String),
    /// Label was declared more than once (pass 1, last declaration wins).
    RedefinedLabel(String),
}
impl AsmErrKind {
    /// Whether this error stops assembly.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AsmErrKind::UnknownOperand(_))
    }
}
impl std::fmt::Display for AsmErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownOperand(t)  => write!(f, "Unknown operand '{t}' (not int/reg/label)"),
            Self::UnknownMnemonic(m) => write!(f, "Unknown instruction: {m}"),
            Self::RedefinedLabel(l)  => write!(f, "Label '{l}' was defined multiple times"),
        }
    }
}

/// Error from assembling given assembly code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AsmErr {
    /// The value with a span.
    pub kind: AsmErrKind,
    /// The span in the source associated with this value.
    pub span: ErrSpan
}
impl AsmErr {
    /// Creates a new [`AsmErr`].
    pub fn new<E: Into<ErrSpan>>(kind: AsmErrKind, span: E) -> Self {
        AsmErr { kind, span: span.into() }
    }
}
impl std::fmt::Display for AsmErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for AsmErr {}
impl crate::err::Error for AsmErr {
    fn span(&self) -> Option<ErrSpan> {
        Some(self.span.clone())
    }

    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match &self.kind {
            AsmErrKind::UnknownOperand(_)  => Some("operands are registers (R0-R7), COUNTER, base-10 integers, or declared labels".into()),
            AsmErrKind::UnknownMnemonic(_) => Some("mnemonics are case-sensitive; see the opcode table for valid instructions".into()),
            AsmErrKind::RedefinedLabel(_)  => Some("jumps to this label use its last declaration; try renaming one of the labels".into()),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
struct SymbolData {
    /// 1-based index of the instruction this label points to.
    target: usize,
    span: Span,
}

/// The symbol table created in the first assembler pass.
///
/// This maps each label to the 1-based index of the instruction it precedes,
/// which is exactly the value a jump instruction expects as its target.
/// The symbol table is only needed during assembly and is not part of the [`Program`].
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct SymbolTable {
    label_map: HashMap<String, SymbolData>,
    /// Number of instruction lines seen in the pass.
    instr_count: usize,
}

impl SymbolTable {
    /// Creates a new symbol table.
    ///
    /// This performs the first assembler pass, calculating the target index of
    /// each label in the provided statements. A label points to the next line with
    /// an instruction on it (or on the same line as it); lines which only declare labels
    /// do not count as instructions.
    ///
    /// Redefining a label is not fatal: the last declaration is kept and
    /// the redefinition is pushed to `diagnostics`.
    ///
    /// ## Example
    /// ```
    /// use bytevm::parse::parse_ast;
    /// use bytevm::asm::SymbolTable;
    ///
    /// let src = "
    ///     START: PUSH 1
    ///     LOOP:
    ///         DECR
    ///         JNE LOOP
    ///     END: CEASE
    /// ";
    /// let ast = parse_ast(src).unwrap();
    ///
    /// let sym = SymbolTable::new(&ast, &mut vec![]);
    /// assert_eq!(sym.lookup_label("START"), Some(1));
    /// assert_eq!(sym.lookup_label("LOOP"), Some(2));
    /// assert_eq!(sym.lookup_label("END"), Some(4));
    /// assert_eq!(sym.lookup_label("start"), None);
    /// ```
    pub fn new(stmts: &[Stmt], diagnostics: &mut Vec<AsmErr>) -> Self {
        let mut label_map: HashMap<String, SymbolData> = HashMap::new();
        let mut instr_count = 0;

        for stmt in stmts {
            if let Some(label) = &stmt.label {
                let data = SymbolData { target: instr_count + 1, span: label.span.clone() };
                if let Some(old) = label_map.insert(label.name.clone(), data) {
                    diagnostics.push(AsmErr::new(
                        AsmErrKind::RedefinedLabel(label.name.clone()),
                        [old.span, label.span.clone()]
                    ));
                }
            }

            if stmt.has_instr() {
                instr_count += 1;
            }
        }

        log::debug!("pass 1: {} label(s), {} instruction line(s)", label_map.len(), instr_count);
        SymbolTable { label_map, instr_count }
    }

    /// Gets the 1-based target of a given label (if it exists).
    ///
    /// Labels are case-sensitive.
    pub fn lookup_label(&self, label: &str) -> Option<usize> {
        self.label_map.get(label).map(|data| data.target)
    }

    /// Gets the label(s) pointing at a given 1-based target.
    pub fn rev_lookup_label(&self, target: usize) -> impl Iterator<Item=&str> + '_ {
        self.label_map.iter()
            .filter(move |(_, data)| data.target == target)
            .map(|(label, _)| &**label)
    }

    /// Number of instruction lines found in the first pass.
    ///
    /// This counts lines with unrecognized mnemonics, which are dropped in the second pass.
    pub fn instr_count(&self) -> usize {
        self.instr_count
    }
}

/// An assembled program: the ordered list of encoded instructions.
///
/// A program is addressed by a 0-based program counter.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Program(Vec<Instr>);
impl Program {
    /// Creates an empty program.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The instructions of this program.
    pub fn instrs(&self) -> &[Instr] {
        &self.0
    }

    /// The number of instructions in this program.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets the instruction at a 0-based index.
    pub fn get(&self, index: usize) -> Option<Instr> {
        self.0.get(index).copied()
    }
}
impl From<Vec<Instr>> for Program {
    fn from(value: Vec<Instr>) -> Self {
        Self(value)
    }
}
impl FromIterator<Instr> for Program {
    fn from_iter<T: IntoIterator<Item = Instr>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The result of a successful assembly.
#[derive(Debug)]
pub struct Assembly {
    /// The assembled program.
    pub program: Program,
    /// Non-fatal errors found during assembly.
    pub diagnostics: Vec<AsmErr>,
}

/// Encodes one operand part into its byte.
fn encode_operand(part: &Part, sym: &SymbolTable) -> Result<u8, AsmErr> {
    match &part.token {
        Token::Counter => Ok(COUNTER),
        Token::Reg(r)  => Ok(*r),
        Token::Int(n)  => Ok(*n),
        Token::Word(name) => match sym.lookup_label(name) {
            Some(target) => Ok((target & 0xFF) as u8),
            None => Err(AsmErr::new(AsmErrKind::UnknownOperand(part.text.clone()), part.span.clone())),
        },
        _ => Err(AsmErr::new(AsmErrKind::UnknownOperand(part.text.clone()), part.span.clone())),
    }
}

/// Assembles an assembly source AST into a program.
///
/// Each instruction line is encoded in source order:
/// - The first part is the mnemonic, which must be in the opcode table ([`Opcode`]).
///   If it is not, the line is dropped and an [`AsmErrKind::UnknownMnemonic`] diagnostic is recorded.
/// - The next (up to) three parts are the operands. Missing operands encode as 0,
///   and any parts after the third are ignored.
///
/// An operand encodes as:
/// - `COUNTER` → `0xFF`
/// - `R<n>` → `n`
/// - a base-10 integer → the integer truncated to a byte
/// - a label → the label's 1-based target truncated to a byte
///
/// Anything else is fatal and stops assembly with [`AsmErrKind::UnknownOperand`].
///
/// # Example
/// ```
/// use bytevm::parse::parse_ast;
/// use bytevm::asm::assemble;
/// use bytevm::ast::{Instr, Opcode};
///
/// let src = "
///     LOOP: DECR
///     CMP COUNTER R0
///     JNE LOOP
/// ";
/// let ast = parse_ast(src).unwrap();
///
/// let asm = assemble(ast).unwrap();
/// assert_eq!(asm.program.instrs(), [
///     Instr::new(Opcode::DECR, [0, 0, 0]),
///     Instr::new(Opcode::CMP, [0xFF, 0, 0]),
///     Instr::new(Opcode::JNE, [1, 0, 0]),
/// ]);
/// assert!(asm.diagnostics.is_empty());
/// ```
pub fn assemble(ast: Vec<Stmt>) -> Result<Assembly, AsmErr> {
    let mut diagnostics = vec![];
    let sym = SymbolTable::new(&ast, &mut diagnostics);

    let mut instrs = Vec::with_capacity(sym.instr_count());
    for stmt in ast.iter().filter(|s| s.has_instr()) {
        let Some((mnemonic, operands)) = stmt.parts.split_first() else { continue };

        let Ok(opcode) = mnemonic.text.parse::<Opcode>() else {
            log::warn!("line {}: dropping unknown instruction {}", stmt.line + 1, mnemonic.text);
            diagnostics.push(AsmErr::new(AsmErrKind::UnknownMnemonic(mnemonic.text.clone()), mnemonic.span.clone()));
            continue;
        };

        let mut bytes = [0u8; 3];
        for (byte, part) in bytes.iter_mut().zip(operands) {
            *byte = encode_operand(part, &sym)?;
        }
        instrs.push(Instr::new(opcode, bytes));
    }

    log::debug!("pass 2: {} instruction(s) encoded, {} diagnostic(s)", instrs.len(), diagnostics.len());
    Ok(Assembly { program: Program(instrs), diagnostics })
}
