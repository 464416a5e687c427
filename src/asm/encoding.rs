//! Formatters which can read and write programs to disk.
//!
//! The [`ProgramFormat`] trait describes an implementation of reading/writing programs.
//! This module provides one implementation of the trait:
//! - [`BinaryFormat`]: the flat binary program file

use crate::ast::Instr;

use super::Program;

/// A trait defining program file formats.
pub trait ProgramFormat {
    /// Representation of the serialized format.
    type Stream: ToOwned + ?Sized;
    /// Serializes into the stream format.
    fn serialize(p: &Program) -> <Self::Stream as ToOwned>::Owned;
    /// Deserializes from the stream format, returning `None`
    /// if an error occurred during deserialization.
    fn deserialize(i: &Self::Stream) -> Option<Program>;
}

/// The binary program format.
///
/// A program file is the instruction records laid end to end,
/// each exactly [`Instr::SIZE`] bytes (`opcode, a, b, c`).
/// There is no header, length prefix, or padding.
///
/// Reading is length-bounded: a trailing partial record is dropped,
/// so deserializing this format never fails.
///
/// ```
/// use bytevm::asm::encoding::{BinaryFormat, ProgramFormat};
/// use bytevm::asm::Program;
/// use bytevm::ast::{Instr, Opcode};
///
/// let program = Program::from(vec![
///     Instr::new(Opcode::PUSH, [10, 0, 0]),
///     Instr::new(Opcode::CEASE, [0, 0, 0]),
/// ]);
/// let bytes = BinaryFormat::serialize(&program);
/// assert_eq!(bytes, [0x01, 10, 0, 0, 0x14, 0, 0, 0]);
/// assert_eq!(BinaryFormat::deserialize(&bytes), Some(program));
/// ```
pub struct BinaryFormat;

impl ProgramFormat for BinaryFormat {
    type Stream = [u8];

    fn serialize(p: &Program) -> <Self::Stream as ToOwned>::Owned {
        p.instrs().iter()
            .flat_map(|instr| instr.encode())
            .collect()
    }

    fn deserialize(bytes: &Self::Stream) -> Option<Program> {
        let chunks = bytes.chunks_exact(Instr::SIZE);
        if !chunks.remainder().is_empty() {
            log::warn!("dropping {} trailing byte(s) of partial instruction", chunks.remainder().len());
        }

        chunks
            .map(|c| <[u8; Instr::SIZE]>::try_from(c).ok().map(Instr::decode))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::asm::Program;
    use crate::ast::{Instr, Opcode};
    use crate::sim::io::BufferedConsole;
    use crate::sim::Simulator;

    use super::{BinaryFormat, ProgramFormat};

    #[test]
    fn test_empty() {
        assert_eq!(BinaryFormat::serialize(&Program::empty()), Vec::<u8>::new());
        assert_eq!(BinaryFormat::deserialize(&[]), Some(Program::empty()));
    }

    #[test]
    fn test_partial_record_dropped() {
        let bytes = [0x13, 0, 0, 0, 0x14, 0, 0];
        let program = BinaryFormat::deserialize(&bytes).unwrap();
        assert_eq!(program.instrs(), [Instr::new(Opcode::CPRINT, [0, 0, 0])]);

        assert_eq!(BinaryFormat::deserialize(&[0x01, 2, 3]), Some(Program::empty()));
    }

    #[test]
    fn test_unknown_opcodes_kept() {
        // Unknown opcodes are only a problem once executed.
        let bytes = [0x00, 1, 2, 3, 0xEE, 4, 5, 6];
        let program = BinaryFormat::deserialize(&bytes).unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(program.get(1), Some(Instr::decode([0xEE, 4, 5, 6])));
        assert_eq!(BinaryFormat::serialize(&program), bytes);
    }

    #[test]
    fn test_source_to_file_to_run() {
        let src = "
            START: PUSH 10
                   PUSH 20
                   STORER R1
                   STORER R0
                   ADDR R2 R0 R1
                   PRINTR R2
                   MOV R6 1
                   MOV R5 3
            LOOP:ADDR R4 R4 R6
                   PRINTR R4
                   CMP R4 R5
                   JLT LOOP
                   CEASE
                   PRINTR R6
        ";
        let asm = crate::asm::assemble(crate::parse::parse_ast(src).unwrap()).unwrap();
        assert!(asm.diagnostics.is_empty());

        let bytes = BinaryFormat::serialize(&asm.program);
        assert_eq!(bytes.len(), 14 * Instr::SIZE);
        assert_eq!(bytes[..4], [0x01, 10, 0, 0]);

        let program = BinaryFormat::deserialize(&bytes).unwrap();
        assert_eq!(program, asm.program);
        assert_eq!(program.get(11), Some(Instr::new(Opcode::JLT, [9, 0, 0])));

        let console = BufferedConsole::new();
        let mut sim = Simulator::default();
        sim.console = Box::new(console.clone());
        sim.load_program(program);
        sim.run_with_limit(1000);

        assert!(sim.halted());
        let printed: Vec<_> = console.output()
            .into_iter()
            .filter(|l| l.starts_with("[PRINTR]"))
            .collect();
        assert_eq!(printed, [
            "[PRINTR] R2 = 30",
            "[PRINTR] R4 = 1",
            "[PRINTR] R4 = 2",
            "[PRINTR] R4 = 3",
        ]);
        assert!(console.errors().is_empty());
    }
}
