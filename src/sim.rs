//! Simulating and execution for assembled programs.
//!
//! This module is focused on executing fully assembled code (i.e., [`Program`]).
//!
//! This module consists of:
//! - [`Simulator`]: The struct that simulates assembled code.
//! - [`mem`]: The module handling registers, memory, and flags.
//! - [`io`]: The module handling where output goes and where stepper commands come from.
//! - [`debug`]: The module handling breakpoints, stepper commands, and debug output.
//! - [`stepper`]: The interactive stepper.
//!
//! # Usage
//!
//! To simulate some code, you need to instantiate a Simulator and load a program to it:
//!
//! ```
//! use bytevm::parse::parse_ast;
//! use bytevm::asm::assemble;
//! use bytevm::sim::Simulator;
//! use bytevm::sim::io::BufferedConsole;
//!
//! let src = "
//!     PUSH 10
//!     PUSH 20
//!     STORER R1
//!     STORER R0
//!     ADDR R2 R0 R1
//!     PRINTR R2
//!     CEASE
//! ";
//! let ast = parse_ast(src).unwrap();
//! let asm = assemble(ast).unwrap();
//!
//! let console = BufferedConsole::new();
//! let mut sim = Simulator::new(Default::default());
//! sim.console = Box::new(console.clone());
//! sim.load_program(asm.program);
//! sim.run();
//!
//! assert_eq!(console.output(), ["[PRINTR] R2 = 30"]);
//! assert!(sim.halted());
//! ```
//!
//! ## Flags
//!
//! Here, we define `sim` to have the default flags.
//! We could also configure the simulator by editing the flags. For example,
//! if we wish to print each instruction before it executes, we can edit the flags like so:
//!
//! ```
//! # use bytevm::sim::{Simulator, SimFlags};
//! let mut sim = Simulator::new(SimFlags { trace: true, ..Default::default() });
//! ```
//!
//! All of the available flags can be found in [`SimFlags`].
//!
//! ## Execution
//!
//! Beyond the basic [`Simulator::run`] (which runs until the program ends),
//! there are also:
//! - [`Simulator::step_in`]: manual step-by-step simulation
//! - [`Simulator::run_while`], [`Simulator::run_with_limit`]: more advanced programmatic execution
//!
//! ```
//! use bytevm::parse::parse_ast;
//! use bytevm::asm::assemble;
//! use bytevm::sim::Simulator;
//! use bytevm::sim::io::BufferedConsole;
//! use bytevm::ast::reg_consts::R0;
//!
//! let src = "
//!     MOV R0 1
//!     MOV R0 2
//!     MOV R0 3
//! ";
//! let asm = assemble(parse_ast(src).unwrap()).unwrap();
//!
//! let mut sim = Simulator::new(Default::default());
//! sim.console = Box::new(BufferedConsole::new());
//! sim.load_program(asm.program);
//!
//! // Running step by step:
//! sim.step_in().unwrap();
//! assert_eq!(sim.reg_file[R0], 1);
//! sim.step_in().unwrap();
//! assert_eq!(sim.reg_file[R0], 2);
//! sim.step_in().unwrap();
//! assert_eq!(sim.reg_file[R0], 3);
//! assert!(sim.halted());
//! ```
//!
//! ## Errors
//!
//! Executing an instruction never stops the simulator.
//! If an instruction's opcode is unknown (or has no handler), the instruction has no effect,
//! a diagnostic is written to the console's diagnostic stream, and execution carries on
//! with the next instruction. [`Simulator::step_in`] still returns the error, so that
//! callers stepping manually can see it.
//!
//! Operands which are not a valid register or memory address are not errors:
//! the instruction is simply skipped.
pub mod mem;
pub mod io;
pub mod debug;
pub mod stepper;

use crate::asm::Program;
use crate::ast::{Instr, Opcode, COUNTER};

use self::debug::Breakpoints;
use self::io::{Console, StdConsole};
use self::mem::{Flags, MemArray, RegFile};

/// Errors that can occur during simulation.
///
/// These are reported and skipped, rather than stopping execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimErr {
    /// Instruction was decoded, but the opcode byte was not recognized.
    IllegalOpcode(u8),
    /// Opcode is recognized, but has no execution semantics.
    ///
    /// This is only `SUBR`, which is reserved in the opcode table.
    UnhandledOpcode(Opcode),
}
impl std::fmt::Display for SimErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimErr::IllegalOpcode(op)   => write!(f, "Unknown opcode: 0x{op:x}"),
            SimErr::UnhandledOpcode(op) => write!(f, "Unknown opcode: 0x{:x} ({op} is reserved)", op.byte()),
        }
    }
}
impl std::error::Error for SimErr {}
impl crate::err::Error for SimErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            SimErr::IllegalOpcode(_)   => Some("this program may be corrupt or was not produced by this assembler".into()),
            SimErr::UnhandledOpcode(_) => Some("use DECR, or ADDR with a negated register, to subtract".into()),
        }
    }
}

/// Configuration flags for [`Simulator`].
///
/// These can be modified after the `Simulator` is created with [`Simulator::new`]
/// and their effects should still apply.
///
/// Read the field descriptions for more details.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct SimFlags {
    /// Whether to print each instruction right before it executes.
    ///
    /// The line printed is `PC <line>: <MNEMONIC> <a> <b> <c>`, using the 1-based line.
    ///
    /// By default, this flag is `false`.
    pub trace: bool,

    /// Whether to follow a traced instruction with a short explanation of what it does.
    ///
    /// Only some instructions have an explanation (see [`debug::explain_line`]).
    /// This has no effect unless the instruction is traced.
    ///
    /// By default, this flag is `false`.
    pub explain: bool,
}

/// Executes assembled code.
pub struct Simulator {
    // ------------------ SIMULATION STATE ------------------
    // Calling [`Simulator::reset`] resets these values.

    /// The simulator's memory.
    pub mem: MemArray,

    /// The simulator's register file.
    pub reg_file: RegFile,

    /// The value stack. The top of the stack is the last element.
    pub stack: Vec<i32>,

    /// The counter register, which is separate from the register file.
    pub counter: i32,

    /// The comparison flags, set by `CMP`.
    pub cc: Flags,

    /// The program counter, the 0-based index of the next instruction to execute.
    pub pc: usize,

    /// The number of instructions run since this `Simulator` was initialized.
    ///
    /// This can be set to 0 to reset the counter.
    pub instructions_run: u64,

    // ------------------ CONFIG/DEBUG STATE ------------------
    // Calling [`Simulator::reset`] does not reset these values.

    /// The loaded program.
    program: Program,

    /// Configuration settings for the simulator.
    ///
    /// These are preserved between resets.
    ///
    /// See [`SimFlags`] for more details on what configuration
    /// settings are available.
    pub flags: SimFlags,

    /// Breakpoints for the simulator.
    ///
    /// These only pause execution in the [`stepper`].
    pub breakpoints: Breakpoints,

    /// Where program output, trace output, and diagnostics are written.
    pub console: Box<dyn Console>,
}

impl Simulator {
    /// Creates a new simulator with the provided flags,
    /// writing to the standard streams, but without a loaded program.
    pub fn new(flags: SimFlags) -> Self {
        Self {
            mem: MemArray::new(),
            reg_file: RegFile::new(),
            stack: vec![],
            counter: 0,
            cc: Flags::default(),
            pc: 0,
            instructions_run: 0,

            program: Program::empty(),
            flags,
            breakpoints: Breakpoints::new(),
            console: Box::new(StdConsole),
        }
    }

    /// Resets the simulator.
    ///
    /// This resets the machine state back to before any execution calls
    /// (and rewinds the PC to the first instruction),
    /// while preserving configuration and debug state.
    ///
    /// Note that this function preserves:
    /// - the loaded program
    /// - flags
    /// - breakpoints
    /// - the console
    pub fn reset(&mut self) {
        self.mem = MemArray::new();
        self.reg_file = RegFile::new();
        self.stack.clear();
        self.counter = 0;
        self.cc = Flags::default();
        self.pc = 0;
        self.instructions_run = 0;
    }

    /// Loads a program into the simulator, and rewinds the PC to its first instruction.
    ///
    /// This does not reset any other machine state.
    pub fn load_program(&mut self, program: Program) {
        log::debug!("loaded program with {} instruction(s)", program.len());
        self.program = program;
        self.pc = 0;
    }

    /// The loaded program.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Whether the program has finished (the PC is at or past the end of the program).
    ///
    /// This is also true if no program is loaded.
    pub fn halted(&self) -> bool {
        self.pc >= self.program.len()
    }

    /// Whether there is a breakpoint right before the current instruction.
    pub fn at_breakpoint(&self) -> bool {
        self.breakpoints.contains_pc(self.pc)
    }

    /// The instruction the PC is pointing to, if the program hasn't ended.
    pub fn current_instr(&self) -> Option<Instr> {
        self.program.get(self.pc)
    }

    /// Writes the trace line of an instruction at the current PC to the console
    /// (plus the explanation line, if the `explain` flag is set).
    pub fn print_instr(&self, instr: Instr) {
        self.console.out(&debug::trace_line(self.pc, instr));
        if self.flags.explain {
            if let Some(line) = debug::explain_line(instr) {
                self.console.out(&line);
            }
        }
    }

    /// Writes the disassembly of the whole program to the console.
    pub fn disassemble(&self) {
        for (i, &instr) in self.program.instrs().iter().enumerate() {
            self.console.out(&debug::disasm_line(i, instr));
        }
    }

    /// Resolves a `CMP` operand: the counter sentinel or a register.
    fn cmp_operand(&self, operand: u8) -> Option<i32> {
        match operand {
            COUNTER => Some(self.counter),
            r => self.reg_file.get(r),
        }
    }

    /// Jumps to the instruction's 1-based target if the condition holds.
    ///
    /// A target of 0 restarts the program from its first instruction.
    fn jump_if(&mut self, cond: bool, instr: Instr) {
        if cond {
            self.pc = instr.jump_target().unwrap_or(0);
        }
    }

    /// Executes one instruction. The PC should already point past it.
    fn execute(&mut self, instr: Instr) -> Result<(), SimErr> {
        let op = instr.opcode().map_err(SimErr::IllegalOpcode)?;
        let Instr { a, b, c, .. } = instr;

        match op {
            Opcode::PUSH => self.stack.push(i32::from(a)),
            Opcode::MOV => if let Some(r) = self.reg_file.get_mut(a) {
                *r = i32::from(b);
            },
            Opcode::ADDR => if let (Some(vb), Some(vc)) = (self.reg_file.get(b), self.reg_file.get(c)) {
                if let Some(r) = self.reg_file.get_mut(a) {
                    *r = vb.wrapping_add(vc);
                }
            },
            Opcode::SUBR => return Err(SimErr::UnhandledOpcode(op)),
            Opcode::LOADR => if let Some(v) = self.reg_file.get(a) {
                self.stack.push(v);
            },
            Opcode::STORER => if let Some(r) = self.reg_file.get_mut(a) {
                if let Some(v) = self.stack.pop() {
                    *r = v;
                }
            },
            // The top of the stack is printed, but not popped.
            Opcode::PRINT => if let Some(v) = self.stack.last() {
                self.console.out(&v.to_string());
            },
            Opcode::PRINTR => if let Some(v) = self.reg_file.get(a) {
                self.console.out(&format!("[PRINTR] R{a} = {v}"));
            },
            Opcode::CMP => if let (Some(va), Some(vb)) = (self.cmp_operand(a), self.cmp_operand(b)) {
                self.cc = Flags::compare(va, vb);
                let Flags { eq, gt, lt } = self.cc;
                self.console.out(&format!(
                    "[CMP] {va} vs {vb} => EQ: {}, GT: {}, LT: {}",
                    u8::from(eq), u8::from(gt), u8::from(lt)
                ));
            },
            Opcode::JEQ => self.jump_if(self.cc.eq, instr),
            Opcode::JNE => self.jump_if(!self.cc.eq, instr),
            Opcode::JGT => self.jump_if(self.cc.gt, instr),
            Opcode::JLT => self.jump_if(self.cc.lt, instr),
            Opcode::LOADM => if let Some(v) = self.mem.get(usize::from(a)) {
                self.stack.push(v);
                self.console.out(&format!("[LOADM] memory[{a}] => {v}"));
            },
            Opcode::STOREM => if let Some(cell) = self.mem.get_mut(usize::from(a)) {
                if let Some(v) = self.stack.pop() {
                    *cell = v;
                    self.console.out(&format!("[STOREM] memory[{a}] = {v}"));
                }
            },
            Opcode::LOADMR => if let (Some(v), Some(r)) = (self.mem.get(usize::from(b)), self.reg_file.get_mut(a)) {
                *r = v;
                self.console.out(&format!("[LOADMR] R{a} = memory[{b}] = {v}"));
            },
            Opcode::STOREMR => if let (Some(v), Some(cell)) = (self.reg_file.get(b), self.mem.get_mut(usize::from(a))) {
                *cell = v;
                self.console.out(&format!("[STOREMR] memory[{a}] = {v}"));
            },
            Opcode::DECR => self.counter = self.counter.wrapping_sub(1),
            Opcode::CPRINT => self.console.out(&format!("[CPRINT] counter = {}", self.counter)),
            Opcode::CEASE => self.pc = self.program.len(),
        }

        Ok(())
    }

    /// Simulate one step, executing one instruction.
    ///
    /// The PC advances past the instruction before it executes,
    /// so a jump (or `CEASE`) replaces the next PC outright.
    ///
    /// If the program has already ended, this does nothing.
    ///
    /// If the instruction could not be executed, the error is written to the console's
    /// diagnostic stream and returned, but the PC still advances past the instruction.
    pub fn step_in(&mut self) -> Result<(), SimErr> {
        let Some(instr) = self.current_instr() else { return Ok(()) };
        if self.flags.trace {
            self.print_instr(instr);
        }

        let line = self.pc + 1;
        self.pc = line;
        self.instructions_run += 1;

        let result = self.execute(instr);
        if let Err(e) = result {
            log::warn!("line {line}: {e}");
            self.console.err(&e.to_string());
        }
        result
    }

    /// Runs until the tripwire condition returns false or the program ends.
    ///
    /// The tripwire is checked before each instruction.
    /// Errors from executing instructions are reported (see [`Simulator::step_in`]) and do not stop the run.
    pub fn run_while(&mut self, mut tripwire: impl FnMut(&mut Simulator) -> bool) {
        let start = self.instructions_run;
        while !self.halted() && tripwire(self) {
            // already reported by step_in
            let _ = self.step_in();
        }

        log::debug!(
            "{} after {} instruction(s)",
            if self.halted() { "program ended" } else { "paused" },
            self.instructions_run.wrapping_sub(start)
        );
    }

    /// Execute the program.
    ///
    /// This blocks until the program ends.
    /// If you would like to limit the maximum number of steps to execute, consider [`Simulator::run_with_limit`].
    ///
    /// Breakpoints do not affect this function.
    pub fn run(&mut self) {
        self.run_while(|_| true)
    }

    /// Execute the program with a limit on how many steps to execute.
    ///
    /// This blocks until the program ends or until the number of steps to execute has been hit.
    pub fn run_with_limit(&mut self, max_steps: u64) {
        let i = self.instructions_run;
        self.run_while(|sim| sim.instructions_run.wrapping_sub(i) < max_steps)
    }
}
impl Default for Simulator {
    fn default() -> Self {
        Self::new(Default::default())
    }
}
impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("mem", &self.mem)
            .field("reg_file", &self.reg_file)
            .field("stack", &self.stack)
            .field("counter", &self.counter)
            .field("cc", &self.cc)
            .field("pc", &self.pc)
            .field("instructions_run", &self.instructions_run)
            .field("program", &self.program)
            .field("flags", &self.flags)
            .field("breakpoints", &self.breakpoints)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::asm::{assemble, Program};
    use crate::ast::reg_consts::{R0, R1, R2};
    use crate::ast::{Instr, Opcode};
    use crate::parse::parse_ast;

    use super::io::BufferedConsole;
    use super::mem::Flags;
    use super::*;

    fn load(src: &str) -> (Simulator, BufferedConsole) {
        let asm = assemble(parse_ast(src).unwrap()).unwrap();
        assert!(asm.diagnostics.is_empty(), "unexpected diagnostics: {:?}", asm.diagnostics);
        load_program(asm.program)
    }
    fn load_program(program: Program) -> (Simulator, BufferedConsole) {
        let console = BufferedConsole::new();
        let mut sim = Simulator::default();
        sim.console = Box::new(console.clone());
        sim.load_program(program);
        (sim, console)
    }

    #[test]
    fn test_sum_printed_once() {
        let (mut sim, console) = load("
            START: PUSH 10
            PUSH 20
            STORER R1
            STORER R0
            ADDR R2 R0 R1
            PRINTR R2
            CEASE
            PRINTR R2
        ");
        sim.run();

        assert_eq!(console.output(), ["[PRINTR] R2 = 30"]);
        assert!(console.errors().is_empty());
        assert!(sim.halted());
        assert_eq!(sim.instructions_run, 7);
    }

    #[test]
    fn test_jumps_land_on_target() {
        // T is line 3 (index 2)
        let cases = [
            (Opcode::JEQ, Flags { eq: true, ..Default::default() }),
            (Opcode::JNE, Flags::default()),
            (Opcode::JGT, Flags { gt: true, ..Default::default() }),
            (Opcode::JLT, Flags { lt: true, ..Default::default() }),
        ];

        for (op, cc) in cases {
            let src = format!("{op} T\nDECR\nT: CEASE");
            let (mut sim, _) = load(&src);

            // taken
            sim.cc = cc;
            sim.step_in().unwrap();
            assert_eq!(sim.pc, 2, "{op} should land on the target");
            assert_eq!(sim.current_instr(), Some(Instr::new(Opcode::CEASE, [0, 0, 0])));

            // not taken
            sim.reset();
            sim.cc = Flags { eq: !cc.eq, gt: false, lt: false };
            sim.step_in().unwrap();
            assert_eq!(sim.pc, 1, "{op} should fall through");
        }
    }

    #[test]
    fn test_jump_backwards_loop() {
        let (mut sim, console) = load("
            MOV R1 3
            LOOP: DECR
            CPRINT
            CMP COUNTER R1
            JNE LOOP
        ");
        // the counter moves away from R1, so this never ends on its own
        sim.run_with_limit(1 + 4 * 3);
        assert_eq!(sim.counter, -3);
        assert_eq!(sim.pc, 1);
        assert_eq!(console.output().iter().filter(|l| l.starts_with("[CPRINT]")).count(), 3);
        assert!(!sim.halted());
    }

    #[test]
    fn test_jump_to_line_zero_and_past_end() {
        let (mut sim, _) = load("DECR\nJNE 0\nCEASE");
        sim.run_with_limit(2);
        assert_eq!(sim.pc, 0);
        assert!(!sim.halted());
        sim.run_with_limit(2);
        assert_eq!(sim.counter, -2);

        let (mut sim, _) = load("JNE 200\nCEASE");
        sim.step_in().unwrap();
        assert!(sim.halted());
    }

    #[test]
    fn test_cmp_counter_sentinel() {
        let (mut sim, console) = load("CMP COUNTER R0");
        sim.counter = 5;
        sim.reg_file[R0] = 5;
        sim.run();
        assert_eq!(sim.cc, Flags { eq: true, gt: false, lt: false });

        sim.reset();
        sim.counter = 3;
        sim.reg_file[R0] = 5;
        sim.run();
        assert_eq!(sim.cc, Flags { eq: false, gt: false, lt: true });

        assert_eq!(console.output(), [
            "[CMP] 5 vs 5 => EQ: 1, GT: 0, LT: 0",
            "[CMP] 3 vs 5 => EQ: 0, GT: 0, LT: 1",
        ]);
    }

    #[test]
    fn test_cmp_invalid_register() {
        let (mut sim, console) = load("CMP R9 R0");
        sim.cc.gt = true;
        sim.run();
        assert_eq!(sim.cc, Flags { eq: false, gt: true, lt: false });
        assert!(console.output().is_empty());
    }

    #[test]
    fn test_stack_discipline() {
        let (mut sim, _) = load("
            PUSH 1
            PUSH 2
            STORER R0
            STORER R1
            STORER R2
        ");
        sim.reg_file[R2] = 99;
        sim.run();

        assert_eq!(sim.reg_file[R0], 2);
        assert_eq!(sim.reg_file[R1], 1);
        assert_eq!(sim.reg_file[R2], 99);
        assert!(sim.stack.is_empty());
    }

    #[test]
    fn test_print_peeks() {
        let (mut sim, console) = load("PUSH 7\nPRINT\nPRINT\nLOADR R0\nPRINT");
        sim.run();
        assert_eq!(console.output(), ["7", "7", "0"]);
        assert_eq!(sim.stack, [7, 0]);

        // nothing to print
        let (mut sim, console) = load("PRINT");
        sim.run();
        assert!(console.output().is_empty());
    }

    #[test]
    fn test_invalid_operands_are_noops() {
        let (mut sim, console) = load("
            MOV R8 5
            ADDR R0 R1 R9
            ADDR R9 R1 R2
            LOADR R8
            STORER R8
            PRINTR R8
            STOREMR 3 R8
            LOADMR R8 3
        ");
        sim.reg_file[R1] = 4;
        sim.stack.push(1);
        sim.run();

        assert_eq!(sim.reg_file.as_slice(), [0, 4, 0, 0, 0, 0, 0, 0]);
        assert_eq!(sim.stack, [1]);
        assert_eq!(sim.mem.non_zero().count(), 0);
        assert!(console.output().is_empty());
        assert!(console.errors().is_empty());
    }

    #[test]
    fn test_memory_ops() {
        let (mut sim, console) = load("
            PUSH 42
            STOREM 10
            LOADM 10
            LOADMR R1 10
            MOV R2 7
            STOREMR 11 R2
            STOREM 12
        ");
        sim.run();

        assert_eq!(sim.mem.get(10), Some(42));
        assert_eq!(sim.mem.get(11), Some(7));
        assert_eq!(sim.mem.get(12), Some(42));
        assert_eq!(sim.reg_file[R1], 42);
        assert!(sim.stack.is_empty());
        assert_eq!(console.output(), [
            "[STOREM] memory[10] = 42",
            "[LOADM] memory[10] => 42",
            "[LOADMR] R1 = memory[10] = 42",
            "[STOREMR] memory[11] = 7",
            "[STOREM] memory[12] = 42",
        ]);
    }

    #[test]
    fn test_memory_address_edges() {
        // Address operands are bytes, so 300 wraps around to 44.
        let (mut sim, console) = load("LOADM 255\nLOADM 300\nLOADMR R0 255");
        if let Some(cell) = sim.mem.get_mut(255) {
            *cell = 9;
        }
        if let Some(cell) = sim.mem.get_mut(44) {
            *cell = 4;
        }
        sim.run();

        assert_eq!(sim.stack, [9, 4]);
        assert_eq!(sim.reg_file[R0], 9);
        assert_eq!(console.output(), [
            "[LOADM] memory[255] => 9",
            "[LOADM] memory[44] => 4",
            "[LOADMR] R0 = memory[255] = 9",
        ]);
    }

    #[test]
    fn test_storem_empty_stack() {
        let (mut sim, console) = load("STOREM 3");
        sim.run();
        assert_eq!(sim.mem.non_zero().count(), 0);
        assert!(console.output().is_empty());
    }

    #[test]
    fn test_counter() {
        let (mut sim, console) = load("DECR\nDECR\nCPRINT");
        sim.run();
        assert_eq!(sim.counter, -2);
        assert_eq!(console.output(), ["[CPRINT] counter = -2"]);

        let (mut sim, _) = load("DECR");
        sim.counter = i32::MIN;
        sim.run();
        assert_eq!(sim.counter, i32::MAX);
    }

    #[test]
    fn test_addr_wraps() {
        let (mut sim, _) = load("ADDR R0 R1 R2");
        sim.reg_file[R1] = i32::MAX;
        sim.reg_file[R2] = 1;
        sim.run();
        assert_eq!(sim.reg_file[R0], i32::MIN);
    }

    #[test]
    fn test_cease() {
        let (mut sim, console) = load("CPRINT\nCEASE\nCPRINT");
        sim.run();
        assert_eq!(console.output(), ["[CPRINT] counter = 0"]);
        assert_eq!(sim.instructions_run, 2);
        assert!(sim.halted());
    }

    #[test]
    fn test_unknown_opcode_reported() {
        let (mut sim, console) = load_program(Program::from(vec![
            Instr::decode([0x99, 0, 0, 0]),
            Instr::new(Opcode::CPRINT, [0, 0, 0]),
        ]));

        assert_eq!(sim.step_in(), Err(SimErr::IllegalOpcode(0x99)));
        assert_eq!(sim.pc, 1);
        sim.run();

        assert_eq!(console.errors(), ["Unknown opcode: 0x99"]);
        assert_eq!(console.output(), ["[CPRINT] counter = 0"]);
    }

    #[test]
    fn test_subr_unhandled() {
        let (mut sim, console) = load("MOV R0 5\nSUBR R0 R0 R0\nPRINTR R0");
        sim.run();

        assert_eq!(sim.reg_file[R0], 5);
        assert_eq!(console.output(), ["[PRINTR] R0 = 5"]);
        let errors = console.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Unknown opcode: 0x4"));
    }

    #[test]
    fn test_trace_and_explain() {
        let (mut sim, console) = load("MOV R1 3\nCMP COUNTER R1\nJLT 1");
        sim.flags.trace = true;
        sim.step_in().unwrap();
        sim.flags.explain = true;
        sim.step_in().unwrap();
        sim.step_in().unwrap();

        assert_eq!(console.output(), [
            "PC 1: MOV 1 3 0",
            "PC 2: CMP 255 1 0",
            "  -> set flags by comparing COUNTER vs R1",
            "[CMP] 0 vs 3 => EQ: 0, GT: 0, LT: 1",
            "PC 3: JLT 1 0 0",
            "  -> jump if LT to line 1",
        ]);
        assert_eq!(sim.pc, 0);
    }

    #[test]
    fn test_explain_needs_trace() {
        let (mut sim, console) = load("MOV R1 3");
        sim.flags.explain = true;
        sim.run();
        assert!(console.output().is_empty());
    }

    #[test]
    fn test_run_with_limit() {
        let (mut sim, _) = load("L: JNE L");
        sim.run_with_limit(100);
        assert_eq!(sim.instructions_run, 100);
        assert_eq!(sim.pc, 0);

        sim.run_with_limit(5);
        assert_eq!(sim.instructions_run, 105);
    }

    #[test]
    fn test_reset_preserves_config() {
        let (mut sim, console) = load("PUSH 3\nDECR\nMOV R0 1");
        sim.flags.trace = true;
        sim.breakpoints.insert(2);
        sim.run();
        assert_eq!(sim.stack, [3]);

        sim.reset();
        assert!(sim.stack.is_empty());
        assert_eq!(sim.counter, 0);
        assert_eq!(sim.reg_file[R0], 0);
        assert_eq!(sim.pc, 0);
        assert_eq!(sim.instructions_run, 0);
        assert!(sim.flags.trace);
        assert!(sim.breakpoints.contains(2));
        assert_eq!(sim.program().len(), 3);

        // console is still attached
        console.clear();
        sim.run();
        assert_eq!(console.output().len(), 3);
    }

    #[test]
    fn test_run_ignores_breakpoints() {
        let (mut sim, _) = load("DECR\nDECR\nDECR");
        sim.breakpoints.insert(2);
        sim.run();
        assert!(sim.halted());
        assert_eq!(sim.counter, -3);
    }

    #[test]
    fn test_disassemble() {
        let (sim, console) = load_program(Program::from(vec![
            Instr::new(Opcode::PUSH, [10, 0, 0]),
            Instr::decode([0x00, 1, 2, 3]),
            Instr::new(Opcode::CEASE, [0, 0, 0]),
        ]));
        sim.disassemble();
        assert_eq!(console.output(), ["1: PUSH 10 0 0", "2: ??? 1 2 3", "3: CEASE 0 0 0"]);
    }

    #[test]
    fn test_empty_program() {
        let (mut sim, console) = load_program(Program::empty());
        assert!(sim.halted());
        assert_eq!(sim.step_in(), Ok(()));
        sim.run();
        assert_eq!(sim.instructions_run, 0);
        assert!(console.output().is_empty());
    }
}
