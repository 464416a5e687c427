//! Machine state storage for the simulator.
//!
//! This module consists of:
//! - [`RegFile`]: The 8 general purpose registers.
//! - [`MemArray`]: The 256-cell data memory.
//! - [`Flags`]: The comparison flags set by `CMP`.
//!
//! Both [`RegFile`] and [`MemArray`] expose checked access by raw operand byte
//! (`get`/`get_mut`), which return `None` for out-of-range indices.
//! Instructions with an out-of-range operand use this to degrade into no-ops.

use crate::ast::{Reg, NUM_REGS};

/// The number of cells in data memory.
pub const MEM_SIZE: usize = 256;

/// The register file.
///
/// It can be indexed with a [`Reg`], or accessed fallibly with a raw operand byte:
/// ```
/// use bytevm::sim::mem::RegFile;
/// use bytevm::ast::reg_consts::R0;
///
/// let mut reg = RegFile::new();
/// reg[R0] = 11;
/// assert_eq!(reg[R0], 11);
/// assert_eq!(reg.get(0), Some(11));
/// assert_eq!(reg.get(8), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegFile([i32; NUM_REGS]);
impl RegFile {
    /// Creates a register file with every register set to 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the value of a register by its operand byte, if it is a valid register.
    pub fn get(&self, index: u8) -> Option<i32> {
        self.0.get(usize::from(index)).copied()
    }

    /// Gets a mutable reference to a register by its operand byte, if it is a valid register.
    pub fn get_mut(&mut self, index: u8) -> Option<&mut i32> {
        self.0.get_mut(usize::from(index))
    }

    /// The values of all registers, in order.
    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }
}
impl std::ops::Index<Reg> for RegFile {
    type Output = i32;

    fn index(&self, index: Reg) -> &Self::Output {
        &self.0[usize::from(index)]
    }
}
impl std::ops::IndexMut<Reg> for RegFile {
    fn index_mut(&mut self, index: Reg) -> &mut Self::Output {
        &mut self.0[usize::from(index)]
    }
}

/// Data memory, [`MEM_SIZE`] signed cells.
///
/// Note that this is held in the heap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemArray(Box<[i32; MEM_SIZE]>);
impl MemArray {
    /// Creates a new memory with every cell set to 0.
    pub fn new() -> Self {
        Self(Box::new([0; MEM_SIZE]))
    }

    /// Gets the value at an address, if the address is in range.
    pub fn get(&self, addr: usize) -> Option<i32> {
        self.0.get(addr).copied()
    }

    /// Gets a mutable reference to the cell at an address, if the address is in range.
    pub fn get_mut(&mut self, addr: usize) -> Option<&mut i32> {
        self.0.get_mut(addr)
    }

    /// All cells of memory.
    pub fn as_slice(&self) -> &[i32] {
        &*self.0
    }

    /// Iterates over the (address, value) pairs of every non-zero cell.
    pub fn non_zero(&self) -> impl Iterator<Item=(usize, i32)> + '_ {
        self.0.iter()
            .copied()
            .enumerate()
            .filter(|&(_, v)| v != 0)
    }
}
impl Default for MemArray {
    fn default() -> Self {
        Self::new()
    }
}

/// The comparison flags.
///
/// After a `CMP`, exactly one of these is set.
/// Before the first `CMP`, all are unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags {
    /// The left operand equaled the right operand.
    pub eq: bool,
    /// The left operand was greater than the right operand.
    pub gt: bool,
    /// The left operand was less than the right operand.
    pub lt: bool,
}
impl Flags {
    /// Computes the flags from comparing two values.
    pub fn compare(a: i32, b: i32) -> Self {
        Self { eq: a == b, gt: a > b, lt: a < b }
    }
}
impl std::fmt::Display for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FLAGS[EQ={} GT={} LT={}]", u8::from(self.eq), u8::from(self.gt), u8::from(self.lt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_bounds() {
        let mut mem = MemArray::new();
        assert_eq!(mem.get(0), Some(0));
        assert_eq!(mem.get(255), Some(0));
        assert_eq!(mem.get(256), None);
        assert_eq!(mem.get(300), None);
        assert!(mem.get_mut(256).is_none());

        if let Some(cell) = mem.get_mut(17) {
            *cell = -4;
        }
        assert_eq!(mem.non_zero().collect::<Vec<_>>(), [(17, -4)]);
    }

    #[test]
    fn test_flags() {
        assert_eq!(Flags::compare(5, 5), Flags { eq: true, gt: false, lt: false });
        assert_eq!(Flags::compare(6, 5), Flags { eq: false, gt: true, lt: false });
        assert_eq!(Flags::compare(-1, 5), Flags { eq: false, gt: false, lt: true });
        assert_eq!(Flags::default().to_string(), "FLAGS[EQ=0 GT=0 LT=0]");
        assert_eq!(Flags::compare(1, 0).to_string(), "FLAGS[EQ=0 GT=1 LT=0]");
    }
}
