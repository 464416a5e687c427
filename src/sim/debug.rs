//! Utilities to debug simulation.
//!
//! This module holds:
//! - [`Breakpoints`]: the set of 1-based lines the stepper pauses at.
//! - [`Command`]: the stepper's command grammar.
//! - Formatting for trace, explain, disassembly, and state dump lines.
use std::collections::BTreeSet;
use std::fmt::Write;

use crate::ast::{Instr, Opcode, COUNTER};

use super::Simulator;

/// A set of breakpoints, each a 1-based program line.
///
/// A breakpoint at line `n` pauses before the instruction at index `n - 1` is executed.
///
/// ```
/// use bytevm::sim::debug::Breakpoints;
///
/// let mut bps = Breakpoints::new();
/// assert!(bps.insert(3));
/// assert!(!bps.insert(0)); // lines start at 1
/// assert!(bps.contains_pc(2));
/// assert!(!bps.contains_pc(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Breakpoints(BTreeSet<usize>);

impl Breakpoints {
    /// Creates an empty breakpoint set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a breakpoint at a 1-based line.
    ///
    /// Lines less than 1 are ignored.
    /// This returns whether the breakpoint was newly added.
    pub fn insert(&mut self, line: i64) -> bool {
        match usize::try_from(line) {
            Ok(line) if line > 0 => self.0.insert(line),
            _ => false,
        }
    }

    /// Removes the breakpoint at a 1-based line, returning whether it existed.
    pub fn remove(&mut self, line: i64) -> bool {
        usize::try_from(line).is_ok_and(|line| self.0.remove(&line))
    }

    /// Removes all breakpoints.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Whether there is a breakpoint at the 1-based line.
    pub fn contains(&self, line: usize) -> bool {
        self.0.contains(&line)
    }

    /// Whether there is a breakpoint before the instruction at a 0-based PC.
    pub fn contains_pc(&self, pc: usize) -> bool {
        pc.checked_add(1).is_some_and(|line| self.contains(line))
    }

    /// Iterates over the breakpoint lines in ascending order.
    pub fn iter(&self) -> impl Iterator<Item=usize> + '_ {
        self.0.iter().copied()
    }

    /// Whether there are no breakpoints.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl Extend<i64> for Breakpoints {
    fn extend<T: IntoIterator<Item = i64>>(&mut self, iter: T) {
        for line in iter {
            self.insert(line);
        }
    }
}
impl FromIterator<i64> for Breakpoints {
    fn from_iter<T: IntoIterator<Item = i64>>(iter: T) -> Self {
        let mut bps = Self::new();
        bps.extend(iter);
        bps
    }
}

/// A command in the stepper's REPL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `step` / `s`: execute the next instruction.
    Step,
    /// `cont` / `c`: run until a breakpoint or the end.
    Cont,
    /// `quit` / `q`: end the stepper.
    Quit,
    /// `help`: list commands.
    Help,
    /// `regs`: show registers, counter, and flags.
    Regs,
    /// `stack`: show the stack.
    Stack,
    /// `mem <start> <n>`: show `n` memory cells from `start`.
    Mem {
        /// First address to show (negative clamps to 0).
        start: i64,
        /// Number of cells to show.
        len: i64
    },
    /// `bp add <n>`
    BpAdd(i64),
    /// `bp del <n>`
    BpDel(i64),
    /// `bp list`
    BpList,
    /// `bp clear`
    BpClear,
    /// `trace on|off`
    Trace(bool),
    /// `explain on|off`
    Explain(bool),
    /// `disasm`: disassemble the loaded program.
    Disasm,
}

/// An error from parsing a stepper command.
///
/// Its [`Display`](std::fmt::Display) is the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandErr {
    /// The command was recognized but its arguments were malformed.
    Usage(&'static str),
    /// The command was not recognized.
    Unknown,
}
impl std::fmt::Display for CommandErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandErr::Usage(usage) => write!(f, "usage: {usage}"),
            CommandErr::Unknown => f.write_str("Unknown command. Type 'help'."),
        }
    }
}
impl std::error::Error for CommandErr {}
impl crate::err::Error for CommandErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            CommandErr::Usage(_) => None,
            CommandErr::Unknown => Some("type 'help' for a list of commands".into()),
        }
    }
}

impl std::str::FromStr for Command {
    type Err = CommandErr;

    /// Parses one line of stepper input.
    ///
    /// Only the first word selects the command, and
    /// unused trailing words are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let Some(head) = words.next() else { return Err(CommandErr::Unknown) };

        let cmd = match head {
            "step" | "s" => Command::Step,
            "cont" | "c" => Command::Cont,
            "quit" | "q" => Command::Quit,
            "help"   => Command::Help,
            "regs"   => Command::Regs,
            "stack"  => Command::Stack,
            "disasm" => Command::Disasm,
            "mem" => {
                let start = parse_int(words.next(), "mem <start> <n>")?;
                let len = parse_int(words.next(), "mem <start> <n>")?;
                Command::Mem { start, len }
            },
            "bp" => match words.next() {
                Some("add")   => Command::BpAdd(parse_int(words.next(), "bp add <n>")?),
                Some("del")   => Command::BpDel(parse_int(words.next(), "bp del <n>")?),
                Some("list")  => Command::BpList,
                Some("clear") => Command::BpClear,
                _ => return Err(CommandErr::Usage("bp [add|del|list|clear] ...")),
            },
            "trace"   => Command::Trace(parse_switch(words.next(), "trace on|off")?),
            "explain" => Command::Explain(parse_switch(words.next(), "explain on|off")?),
            _ => return Err(CommandErr::Unknown),
        };

        Ok(cmd)
    }
}
fn parse_int(word: Option<&str>, usage: &'static str) -> Result<i64, CommandErr> {
    word.and_then(|w| w.parse().ok())
        .ok_or(CommandErr::Usage(usage))
}
fn parse_switch(word: Option<&str>, usage: &'static str) -> Result<bool, CommandErr> {
    match word {
        Some("on")  => Ok(true),
        Some("off") => Ok(false),
        _ => Err(CommandErr::Usage(usage)),
    }
}

/// The stepper's help text.
pub const HELP: &str = "\
Commands:
  step / s         Execute next instruction
  cont / c         Continue running until CEASE or breakpoint
  regs             Show registers, counter, flags
  stack            Show stack
  mem <start> <n>  Show n memory cells starting at start
  bp add <n>       Add breakpoint at line n (1-based)
  bp del <n>       Remove breakpoint
  bp list          List breakpoints
  bp clear         Remove all breakpoints
  trace on|off     Toggle raw instruction trace
  explain on|off   Toggle human explanations
  disasm           Disassemble loaded bytecode
  help             Show this help
  quit / q         Exit stepper";

/// The trace line for an instruction about to execute at a 0-based PC.
///
/// ```
/// use bytevm::ast::{Instr, Opcode};
/// use bytevm::sim::debug::trace_line;
///
/// let instr = Instr::new(Opcode::MOV, [1, 42, 0]);
/// assert_eq!(trace_line(0, instr), "PC 1: MOV 1 42 0");
/// ```
pub fn trace_line(pc: usize, instr: Instr) -> String {
    format!("PC {}: {instr}", pc.wrapping_add(1))
}

/// The disassembly line for an instruction at a 0-based index.
pub fn disasm_line(index: usize, instr: Instr) -> String {
    format!("{}: {instr}", index + 1)
}

/// A one-line gloss of what an instruction does, if it has one.
///
/// ```
/// use bytevm::ast::{Instr, Opcode, COUNTER};
/// use bytevm::sim::debug::explain_line;
///
/// let instr = Instr::new(Opcode::CMP, [COUNTER, 2, 0]);
/// assert_eq!(explain_line(instr).as_deref(), Some("  -> set flags by comparing COUNTER vs R2"));
/// assert_eq!(explain_line(Instr::new(Opcode::DECR, [0, 0, 0])), None);
/// ```
pub fn explain_line(instr: Instr) -> Option<String> {
    let Instr { a, b, c, .. } = instr;
    let line = match instr.opcode().ok()? {
        Opcode::MOV     => format!("  -> R{a} = {b}"),
        Opcode::ADDR    => format!("  -> R{a} = R{b} + R{c}"),
        Opcode::LOADMR  => format!("  -> R{a} = MEM[{b}]"),
        Opcode::STOREMR => format!("  -> MEM[{a}] = R{b}"),
        Opcode::CMP     => format!("  -> set flags by comparing {} vs {}", cmp_operand(a), cmp_operand(b)),
        Opcode::JEQ     => format!("  -> jump if EQ to line {a}"),
        Opcode::JGT     => format!("  -> jump if GT to line {a}"),
        Opcode::JLT     => format!("  -> jump if LT to line {a}"),
        _ => return None,
    };
    Some(line)
}
fn cmp_operand(byte: u8) -> String {
    match byte {
        COUNTER => String::from("COUNTER"),
        r => format!("R{r}"),
    }
}

/// `REGS: R0=.. R7=..   COUNTER=..   FLAGS[..]`, as shown when the stepper pauses.
fn state_regs_line(sim: &Simulator) -> String {
    let regs = sim.reg_file.as_slice().iter()
        .enumerate()
        .map(|(i, v)| format!("R{i}={v}"))
        .collect::<Vec<_>>()
        .join(" ");

    format!("REGS: {regs}   COUNTER={}   {}", sim.counter, sim.cc)
}

/// The output of the `regs` command.
pub fn regs_line(sim: &Simulator) -> String {
    let mut line = String::from("REGS:");
    for (i, v) in sim.reg_file.as_slice().iter().enumerate() {
        // writing to a String is infallible
        let _ = write!(line, " R{i}={v}");
    }
    let _ = write!(line, "  COUNTER={}  {}", sim.counter, sim.cc);
    line
}

/// The output of the `stack` command (bottom of the stack first).
pub fn stack_line(sim: &Simulator) -> String {
    let items = sim.stack.iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    format!("STACK: [{items}]")
}

/// The output of the `mem <start> <n>` command.
///
/// A negative start is clamped to 0, and the window is clamped to the end of memory.
/// If the window is empty, this returns `None`.
pub fn mem_line(sim: &Simulator, start: i64, len: i64) -> Option<String> {
    let size = sim.mem.as_slice().len() as i64;
    let start = start.max(0);
    let end = start.saturating_add(len).min(size);
    if start >= end {
        return None;
    }

    let cells = (start..end)
        .map(|i| format!("[{i}]={}", sim.mem.as_slice()[i as usize]))
        .collect::<Vec<_>>()
        .join("  ");
    Some(cells)
}

/// The full state dump shown when the stepper pauses.
///
/// The memory line is only present if some cell is non-zero.
pub fn state_dump(sim: &Simulator) -> Vec<String> {
    let mut lines = vec![state_regs_line(sim), stack_line(sim)];

    let cells: Vec<_> = sim.mem.non_zero()
        .map(|(i, v)| format!("[{i}]={v}"))
        .collect();
    if !cells.is_empty() {
        lines.push(format!("MEM (non-zero): {}", cells.join(" | ")));
    }

    lines
}

#[cfg(test)]
mod tests {
    use crate::ast::{Instr, Opcode, COUNTER};
    use crate::sim::Simulator;

    use super::*;

    #[test]
    fn test_breakpoints() {
        let mut bps: Breakpoints = [3, 1, -2, 0, 3].into_iter().collect();
        assert_eq!(bps.iter().collect::<Vec<_>>(), [1, 3]);

        assert!(bps.contains_pc(0));
        assert!(bps.contains_pc(2));
        assert!(!bps.contains_pc(1));
        assert!(!bps.contains_pc(usize::MAX));

        assert!(bps.remove(3));
        assert!(!bps.remove(3));
        assert!(!bps.remove(-1));

        bps.clear();
        assert!(bps.is_empty());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("step".parse(), Ok(Command::Step));
        assert_eq!("s".parse(), Ok(Command::Step));
        assert_eq!("  c  ".parse(), Ok(Command::Cont));
        assert_eq!("q".parse(), Ok(Command::Quit));
        assert_eq!("mem 4 2".parse(), Ok(Command::Mem { start: 4, len: 2 }));
        assert_eq!("mem -3 10".parse(), Ok(Command::Mem { start: -3, len: 10 }));
        assert_eq!("bp add 3".parse(), Ok(Command::BpAdd(3)));
        assert_eq!("bp del 3".parse(), Ok(Command::BpDel(3)));
        assert_eq!("bp list".parse(), Ok(Command::BpList));
        assert_eq!("bp clear".parse(), Ok(Command::BpClear));
        assert_eq!("trace on".parse(), Ok(Command::Trace(true)));
        assert_eq!("explain off".parse(), Ok(Command::Explain(false)));
        assert_eq!("disasm extra words".parse(), Ok(Command::Disasm));
    }

    #[test]
    fn test_parse_command_errors() {
        fn err(s: &str) -> String {
            s.parse::<Command>().unwrap_err().to_string()
        }

        assert_eq!(err("mem"), "usage: mem <start> <n>");
        assert_eq!(err("mem 1"), "usage: mem <start> <n>");
        assert_eq!(err("mem a b"), "usage: mem <start> <n>");
        assert_eq!(err("bp add"), "usage: bp add <n>");
        assert_eq!(err("bp del x"), "usage: bp del <n>");
        assert_eq!(err("bp"), "usage: bp [add|del|list|clear] ...");
        assert_eq!(err("bp nuke"), "usage: bp [add|del|list|clear] ...");
        assert_eq!(err("trace"), "usage: trace on|off");
        assert_eq!(err("explain maybe"), "usage: explain on|off");
        assert_eq!(err("jump"), "Unknown command. Type 'help'.");
        assert_eq!(err("STEP"), "Unknown command. Type 'help'.");
    }

    #[test]
    fn test_explain_lines() {
        let explain = |op, operands| explain_line(Instr::new(op, operands));

        assert_eq!(explain(Opcode::MOV, [1, 42, 0]).as_deref(), Some("  -> R1 = 42"));
        assert_eq!(explain(Opcode::ADDR, [0, 1, 2]).as_deref(), Some("  -> R0 = R1 + R2"));
        assert_eq!(explain(Opcode::LOADMR, [3, 9, 0]).as_deref(), Some("  -> R3 = MEM[9]"));
        assert_eq!(explain(Opcode::STOREMR, [9, 3, 0]).as_deref(), Some("  -> MEM[9] = R3"));
        assert_eq!(explain(Opcode::CMP, [0, COUNTER, 0]).as_deref(), Some("  -> set flags by comparing R0 vs COUNTER"));
        assert_eq!(explain(Opcode::JEQ, [4, 0, 0]).as_deref(), Some("  -> jump if EQ to line 4"));
        assert_eq!(explain(Opcode::JGT, [4, 0, 0]).as_deref(), Some("  -> jump if GT to line 4"));
        assert_eq!(explain(Opcode::JLT, [4, 0, 0]).as_deref(), Some("  -> jump if LT to line 4"));

        assert_eq!(explain(Opcode::JNE, [4, 0, 0]), None);
        assert_eq!(explain(Opcode::PUSH, [4, 0, 0]), None);
        assert_eq!(explain_line(Instr::decode([0x99, 0, 0, 0])), None);
    }

    #[test]
    fn test_trace_and_disasm_lines() {
        let instr = Instr::new(Opcode::CMP, [COUNTER, 0, 0]);
        assert_eq!(trace_line(4, instr), "PC 5: CMP 255 0 0");
        assert_eq!(disasm_line(4, instr), "5: CMP 255 0 0");
        assert_eq!(disasm_line(0, Instr::decode([0x42, 1, 2, 3])), "1: ??? 1 2 3");
    }

    #[test]
    fn test_state_lines() {
        let mut sim = Simulator::default();
        assert_eq!(
            state_dump(&sim),
            [
                "REGS: R0=0 R1=0 R2=0 R3=0 R4=0 R5=0 R6=0 R7=0   COUNTER=0   FLAGS[EQ=0 GT=0 LT=0]",
                "STACK: []",
            ]
        );

        sim.stack.extend([1, -2]);
        sim.counter = -3;
        sim.cc.lt = true;
        if let Some(cell) = sim.mem.get_mut(5) { *cell = 7; }
        if let Some(cell) = sim.mem.get_mut(200) { *cell = -1; }
        if let Some(r) = sim.reg_file.get_mut(7) { *r = 9; }

        assert_eq!(
            state_dump(&sim),
            [
                "REGS: R0=0 R1=0 R2=0 R3=0 R4=0 R5=0 R6=0 R7=9   COUNTER=-3   FLAGS[EQ=0 GT=0 LT=1]",
                "STACK: [1, -2]",
                "MEM (non-zero): [5]=7 | [200]=-1",
            ]
        );
        assert_eq!(regs_line(&sim), "REGS: R0=0 R1=0 R2=0 R3=0 R4=0 R5=0 R6=0 R7=9  COUNTER=-3  FLAGS[EQ=0 GT=0 LT=1]");
        assert_eq!(stack_line(&sim), "STACK: [1, -2]");
    }

    #[test]
    fn test_mem_line() {
        let mut sim = Simulator::default();
        if let Some(cell) = sim.mem.get_mut(1) { *cell = 4; }

        assert_eq!(mem_line(&sim, 0, 3).as_deref(), Some("[0]=0  [1]=4  [2]=0"));
        assert_eq!(mem_line(&sim, -5, 2).as_deref(), Some("[0]=0  [1]=4"));
        assert_eq!(mem_line(&sim, 254, 10).as_deref(), Some("[254]=0  [255]=0"));
        assert_eq!(mem_line(&sim, 256, 1), None);
        assert_eq!(mem_line(&sim, 3, 0), None);
        assert_eq!(mem_line(&sim, 3, -1), None);
    }
}
