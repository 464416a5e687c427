//! The instruction encoding.
//!
//! Every instruction is a fixed 4-byte record ([`Instr`]): an opcode byte
//! followed by three operand bytes. What an operand byte means depends on the opcode:
//! - a register index (`R0`-`R7`),
//! - an immediate literal or memory address (`0`-`255`),
//! - a 1-based jump target (see [`Instr::jump_target`]),
//! - or the [`COUNTER`] sentinel, which names the counter register in `CMP`.
//!
//! The mapping between mnemonics and opcode bytes is [`Opcode`].

use std::num::TryFromIntError;

/// The operand byte which refers to the counter register (in `CMP`).
pub const COUNTER: u8 = 0xFF;

/// The number of general purpose registers.
pub const NUM_REGS: usize = 8;

/// A register. Must be between 0 and 7.
///
/// This `Reg` struct can either be constructed by selecting a register from [`reg_consts`],
/// or by using [`Reg::try_from`].
///
/// ```
/// use bytevm::ast::Reg;
///
/// assert!(Reg::try_from(7).is_ok());
/// assert!(Reg::try_from(8).is_err());
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Reg(pub(crate) u8);

/// Register constants!
pub mod reg_consts {
    use super::Reg;

    /// The 0th register in the register file.
    pub const R0: Reg = Reg(0);
    /// The 1st register in the register file.
    pub const R1: Reg = Reg(1);
    /// The 2nd register in the register file.
    pub const R2: Reg = Reg(2);
    /// The 3rd register in the register file.
    pub const R3: Reg = Reg(3);
    /// The 4th register in the register file.
    pub const R4: Reg = Reg(4);
    /// The 5th register in the register file.
    pub const R5: Reg = Reg(5);
    /// The 6th register in the register file.
    pub const R6: Reg = Reg(6);
    /// The 7th register in the register file.
    pub const R7: Reg = Reg(7);
}
impl Reg {
    /// Gets the register number of this [`Reg`]. This is always between 0 and 7.
    pub fn reg_no(self) -> u8 {
        self.0
    }
}
impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}
impl From<Reg> for usize {
    fn from(value: Reg) -> Self {
        usize::from(value.0)
    }
}
impl TryFrom<u8> for Reg {
    type Error = TryFromIntError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0..=7 => Ok(Reg(value)),
            // HACKy, but there's no other way to create this error
            _     => u8::try_from(256).map(|_| unreachable!("should've been TryFromIntError")),
        }
    }
}

macro_rules! opcode_enum {
    ($($name:ident = $value:literal),+ $(,)?) => {
        /// An operation selector.
        ///
        /// This is a closed set; each variant's discriminant is its encoded byte.
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        #[repr(u8)]
        pub enum Opcode {
            $(
                #[allow(missing_docs)]
                $name = $value
            ),+
        }

        impl Opcode {
            /// Every opcode, in encoding order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$name),+];

            /// The mnemonic of this opcode.
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$name => stringify!($name)),+
                }
            }
        }

        impl TryFrom<u8> for Opcode {
            type Error = u8;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Opcode::$name)),+,
                    unk => Err(unk)
                }
            }
        }

        impl std::str::FromStr for Opcode {
            type Err = ();

            /// Mnemonics are case-sensitive.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($name) => Ok(Opcode::$name)),+,
                    _ => Err(())
                }
            }
        }
    };
}
opcode_enum! {
    PUSH    = 0x01,
    MOV     = 0x02,
    ADDR    = 0x03,
    SUBR    = 0x04,
    LOADR   = 0x05,
    STORER  = 0x06,
    PRINT   = 0x07,
    PRINTR  = 0x08,
    CMP     = 0x09,
    JEQ     = 0x0A,
    JNE     = 0x0B,
    JGT     = 0x0C,
    JLT     = 0x0D,
    LOADM   = 0x0E,
    STOREM  = 0x0F,
    LOADMR  = 0x10,
    STOREMR = 0x11,
    DECR    = 0x12,
    CPRINT  = 0x13,
    CEASE   = 0x14,
}
impl Opcode {
    /// The encoded byte of this opcode.
    pub fn byte(self) -> u8 {
        self as u8
    }
}
impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Gets the mnemonic for an opcode byte, or `???` if the byte isn't a known opcode.
pub fn mnemonic_of(op: u8) -> &'static str {
    Opcode::try_from(op).map_or("???", Opcode::mnemonic)
}

/// A single encoded instruction.
///
/// This is always exactly 4 bytes: `{opcode, a, b, c}`.
/// The opcode byte is kept raw so that any 4 bytes decode into an `Instr`;
/// use [`Instr::opcode`] to interpret it.
///
/// ```
/// use bytevm::ast::{Instr, Opcode};
///
/// let instr = Instr::new(Opcode::MOV, [1, 42, 0]);
/// assert_eq!(instr.encode(), [0x02, 1, 42, 0]);
/// assert_eq!(Instr::decode([0x02, 1, 42, 0]), instr);
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub struct Instr {
    /// The raw opcode byte.
    pub op: u8,
    /// The first operand byte.
    pub a: u8,
    /// The second operand byte.
    pub b: u8,
    /// The third operand byte.
    pub c: u8,
}
impl Instr {
    /// The size of one encoded instruction in bytes.
    pub const SIZE: usize = 4;

    /// Creates an instruction from an opcode and its operand bytes.
    pub fn new(op: Opcode, [a, b, c]: [u8; 3]) -> Self {
        Self { op: op.byte(), a, b, c }
    }

    /// Decodes an instruction from its 4 bytes. This never fails.
    pub fn decode([op, a, b, c]: [u8; 4]) -> Self {
        Self { op, a, b, c }
    }

    /// Encodes this instruction into its 4 bytes.
    pub fn encode(self) -> [u8; 4] {
        [self.op, self.a, self.b, self.c]
    }

    /// Interprets the opcode byte, returning the raw byte if it is not recognized.
    pub fn opcode(self) -> Result<Opcode, u8> {
        Opcode::try_from(self.op)
    }

    /// The three operand bytes.
    pub fn operands(self) -> [u8; 3] {
        [self.a, self.b, self.c]
    }

    /// The 0-based program index a jump to operand `a` lands on.
    ///
    /// Jump targets are stored 1-based, so `a = N` lands on index `N - 1`.
    /// A target of 0 is not representable as an index and returns `None`.
    pub fn jump_target(self) -> Option<usize> {
        usize::from(self.a).checked_sub(1)
    }
}
impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} {}", mnemonic_of(self.op), self.a, self.b, self.c)
    }
}
