//! The interactive stepper.
//!
//! The stepper runs a [`Simulator`] under supervision. It switches between two modes:
//! - **running**: instructions execute one after another, without any input.
//! - **paused**: the stepper shows the next instruction and the machine state,
//!   then reads commands from a [`CommandSource`] until one resumes execution.
//!
//! The stepper pauses before the first instruction (whenever the PC is 0)
//! and before any instruction with a breakpoint.
//! The commands it accepts are listed in [`Command`].
//!
//! ```
//! use bytevm::parse::parse_ast;
//! use bytevm::asm::assemble;
//! use bytevm::sim::Simulator;
//! use bytevm::sim::io::{BufferedConsole, BufferedSource};
//! use bytevm::sim::stepper::{Stepper, StepperExit};
//!
//! let src = "
//!     MOV R0 5
//!     PRINTR R0
//!     CEASE
//! ";
//! let asm = assemble(parse_ast(src).unwrap()).unwrap();
//!
//! let console = BufferedConsole::new();
//! let mut sim = Simulator::new(Default::default());
//! sim.console = Box::new(console.clone());
//! sim.load_program(asm.program);
//!
//! let commands = BufferedSource::from_iter(["cont"]);
//! let exit = Stepper::new(&mut sim, commands).run();
//!
//! assert_eq!(exit, StepperExit::Finished);
//! assert!(console.output().contains(&"[PRINTR] R0 = 5".to_string()));
//! ```

use super::debug::{self, Command};
use super::io::CommandSource;
use super::Simulator;

/// The banner shown when the stepper starts.
pub const BANNER: &str = "Stepper started. Type 'help' for commands.";

/// The prompt shown before each command is read.
pub const PROMPT: &str = "(vm) ";

/// How a stepper session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepperExit {
    /// The program ran to its end.
    Finished,
    /// The user quit.
    Quit,
    /// The command source ran out of input while paused.
    EndOfInput,
}

/// What the stepper does after a command.
enum Flow {
    /// Read another command.
    Prompt,
    /// Leave the paused mode.
    Resume,
    /// End the session.
    Exit(StepperExit),
}

/// A stepper session over a simulator.
pub struct Stepper<'s, S> {
    sim: &'s mut Simulator,
    source: S,
}

impl<'s, S: CommandSource> Stepper<'s, S> {
    /// Creates a stepper session which reads commands from `source`.
    ///
    /// The stepper starts from the simulator's current PC,
    /// which is the first instruction after [`Simulator::load_program`].
    pub fn new(sim: &'s mut Simulator, source: S) -> Self {
        Self { sim, source }
    }

    /// Gives back the command source.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Runs the session until the program ends, the user quits, or input runs out.
    pub fn run(&mut self) -> StepperExit {
        self.sim.console.out(BANNER);

        while !self.sim.halted() {
            if self.sim.pc == 0 || self.sim.at_breakpoint() {
                if let Some(exit) = self.pause() {
                    log::debug!("stepper ended ({exit:?}) at line {}", self.sim.pc.wrapping_add(1));
                    return exit;
                }
            } else {
                // errors are reported by step_in
                let _ = self.sim.step_in();
            }
        }

        log::debug!("stepper ended (program finished)");
        StepperExit::Finished
    }

    /// Shows the paused state and handles commands until execution resumes.
    ///
    /// Returns `Some` if the session should end.
    fn pause(&mut self) -> Option<StepperExit> {
        if let Some(instr) = self.sim.current_instr() {
            self.sim.print_instr(instr);
        }
        for line in debug::state_dump(self.sim) {
            self.sim.console.out(&line);
        }

        loop {
            self.sim.console.prompt(PROMPT);
            let Some(line) = self.source.read_command() else {
                return Some(StepperExit::EndOfInput);
            };
            if line.trim().is_empty() {
                continue;
            }

            let flow = match line.parse::<Command>() {
                Ok(cmd) => self.exec_command(cmd),
                Err(e) => {
                    self.sim.console.out(&e.to_string());
                    Flow::Prompt
                }
            };

            match flow {
                Flow::Prompt => {},
                Flow::Resume => return None,
                Flow::Exit(exit) => return Some(exit),
            }
        }
    }

    fn exec_command(&mut self, cmd: Command) -> Flow {
        let sim = &mut *self.sim;

        match cmd {
            Command::Step => {
                let _ = sim.step_in();
                return Flow::Resume;
            },
            Command::Cont => {
                // At least one instruction runs, so continuing from a breakpoint makes progress.
                let mut first = Some(());
                sim.run_while(|sim| first.take().is_some() || !sim.at_breakpoint());
                return Flow::Resume;
            },
            Command::Quit => return Flow::Exit(StepperExit::Quit),
            Command::Help => {
                for line in debug::HELP.lines() {
                    sim.console.out(line);
                }
            },
            Command::Regs  => sim.console.out(&debug::regs_line(sim)),
            Command::Stack => sim.console.out(&debug::stack_line(sim)),
            Command::Mem { start, len } => {
                if let Some(line) = debug::mem_line(sim, start, len) {
                    sim.console.out(&line);
                }
            },
            Command::BpAdd(n) => {
                sim.breakpoints.insert(n);
                sim.console.out(&format!("added bp at {n}"));
            },
            Command::BpDel(n) => {
                sim.breakpoints.remove(n);
                sim.console.out(&format!("removed bp {n}"));
            },
            Command::BpList => match sim.breakpoints.is_empty() {
                true  => sim.console.out("(none)"),
                false => {
                    let lines: Vec<_> = sim.breakpoints.iter().map(|bp| bp.to_string()).collect();
                    sim.console.out(&lines.join(" "));
                }
            },
            Command::BpClear => {
                sim.breakpoints.clear();
                sim.console.out("All breakpoints cleared.");
            },
            Command::Trace(on)   => sim.flags.trace = on,
            Command::Explain(on) => sim.flags.explain = on,
            Command::Disasm      => sim.disassemble(),
        }

        Flow::Prompt
    }
}
