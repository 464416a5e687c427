//! A small byte-code virtual machine, with its assembler and an interactive stepper.
//!
//! Programs are written in a line-oriented assembly language,
//! assembled into fixed-size 4-byte instructions,
//! and then executed by the simulator (or stepped through interactively).
//!
//! # Usage
//!
//! To convert source code into a program, it must be parsed and assembled:
//! ```
//! use bytevm::parse::parse_ast;
//! use bytevm::asm::assemble;
//!
//! let code = "
//!     MOV R0 5
//!     MOV R1 7
//!     ADDR R2 R0 R1
//!     PRINTR R2
//!     CEASE
//! ";
//! let ast = parse_ast(code).unwrap();
//! let asm = assemble(ast).unwrap();
//! assert!(asm.diagnostics.is_empty());
//! assert_eq!(asm.program.len(), 5);
//! ```
//!
//! Once a program has been assembled, it can be executed with the simulator:
//! ```
//! # use bytevm::parse::parse_ast;
//! # use bytevm::asm::assemble;
//! # let asm = assemble(parse_ast("MOV R0 5\nCEASE").unwrap()).unwrap();
//! use bytevm::sim::Simulator;
//!
//! let mut simulator = Simulator::new(Default::default());
//! simulator.load_program(asm.program);
//! simulator.run();
//! assert!(simulator.halted());
//! ```
//!
//! Programs can also be saved to and loaded from disk with [`asm::encoding`].
//! For step-by-step execution and the debugger, see the [`sim`] module.
#![warn(missing_docs)]

pub mod parse;
pub mod ast;
pub mod asm;
pub mod sim;
pub mod err;
