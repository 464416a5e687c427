use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bytevm::asm::encoding::{BinaryFormat, ProgramFormat};
use bytevm::asm::{assemble, AsmErr, Program};
use bytevm::err::Error as _;
use bytevm::parse::parse_ast;
use bytevm::sim::io::StdinSource;
use bytevm::sim::stepper::Stepper;
use bytevm::sim::{SimFlags, Simulator};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

#[derive(Parser, Debug)]
#[command(author, version, about = "Assembler, runner, and stepper for the byte VM")]
struct Cli {
    /// Log level for diagnostics on stderr (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value_t = LevelFilter::Warn)]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Assemble a source file into a program binary
    Asm {
        /// Assembly source file
        source: PathBuf,
        /// Output program binary
        #[arg(short, long, default_value = "program.bin")]
        output: PathBuf,
    },
    /// Run a program binary to completion
    Run(ExecArgs),
    /// Step through a program binary interactively
    Step(ExecArgs),
    /// Print the listing of a program binary (execution flags are accepted and ignored)
    Disasm(ExecArgs),
}

#[derive(Args, Debug)]
struct ExecArgs {
    /// Program binary
    binary: PathBuf,
    /// Print each instruction before it executes
    #[arg(long)]
    trace: bool,
    /// Print a description of each traced instruction
    #[arg(long)]
    explain: bool,
    /// Pause before this 1-based line (stepper only, repeatable)
    #[arg(long = "bp", value_name = "N", allow_negative_numbers = true)]
    breakpoints: Vec<i64>,
}
impl ExecArgs {
    fn simulator(&self) -> Result<Simulator> {
        let program = load_program(&self.binary)?;

        let mut sim = Simulator::new(SimFlags { trace: self.trace, explain: self.explain });
        sim.breakpoints.extend(self.breakpoints.iter().copied());
        sim.load_program(program);
        Ok(sim)
    }
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::MissingRequiredArgument
            | ErrorKind::MissingSubcommand
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                e.print()?;
                return Ok(());
            },
            _ => e.exit(),
        },
    };

    SimpleLogger::new()
        .with_level(cli.log_level)
        .init()?;

    match cli.command {
        Cmd::Asm { source, output } => assemble_file(&source, &output),
        Cmd::Run(args) => {
            let mut sim = args.simulator()?;
            sim.run();
            log::info!("ran {} instruction(s)", sim.instructions_run);
            Ok(())
        },
        Cmd::Step(args) => {
            let mut sim = args.simulator()?;
            let exit = Stepper::new(&mut sim, StdinSource).run();
            log::info!("stepper exited: {exit:?}");
            Ok(())
        },
        Cmd::Disasm(args) => {
            let mut sim = Simulator::new(SimFlags::default());
            sim.load_program(load_program(&args.binary)?);
            sim.disassemble();
            Ok(())
        },
    }
}

fn load_program(path: &Path) -> Result<Program> {
    let bytes = fs::read(path)
        .with_context(|| format!("cannot open program binary {}", path.display()))?;

    BinaryFormat::deserialize(&bytes)
        .with_context(|| format!("cannot read program binary {}", path.display()))
}

fn assemble_file(source: &Path, output: &Path) -> Result<()> {
    let src = fs::read_to_string(source)
        .with_context(|| format!("cannot open source file {}", source.display()))?;

    let ast = match parse_ast(&src) {
        Ok(ast) => ast,
        Err(e) => bail!("{}: {}", location(&src, e.span.start), e),
    };
    let asm = match assemble(ast) {
        Ok(asm) => asm,
        Err(e) => {
            report(&src, &e);
            bail!("assembly of {} failed", source.display());
        }
    };
    for diag in &asm.diagnostics {
        report(&src, diag);
    }

    fs::write(output, BinaryFormat::serialize(&asm.program))
        .with_context(|| format!("cannot write program binary {}", output.display()))?;
    println!("Assembled to {}", output.display());
    Ok(())
}

fn report(src: &str, err: &AsmErr) {
    eprintln!("{}: {err}", location(src, err.span.first().start));
    if let Some(help) = err.help() {
        eprintln!("  help: {help}");
    }
}

/// The 1-based line of a byte offset in source.
fn location(src: &str, offset: usize) -> String {
    let line = src.as_bytes()
        .iter()
        .take(offset)
        .filter(|&&b| b == b'\n')
        .count();
    format!("line {}", line + 1)
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;
    use clap::Parser;

    use super::{Cli, Cmd};

    #[test]
    fn test_exec_flags_on_every_mode() {
        for mode in ["run", "step", "disasm"] {
            let cli = Cli::try_parse_from(["bytevm", mode, "x.bin", "--trace", "--explain", "--bp", "3", "--bp", "-1"]).unwrap();
            let args = match cli.command {
                Cmd::Run(args) | Cmd::Step(args) | Cmd::Disasm(args) => args,
                Cmd::Asm { .. } => panic!("{mode} parsed as asm"),
            };
            assert!(args.trace && args.explain, "{mode}");
            assert_eq!(args.breakpoints, [3, -1], "{mode}");
        }
    }

    #[test]
    fn test_missing_arguments() {
        let err = Cli::try_parse_from(["bytevm", "run"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from(["bytevm", "asm", "prog.asm"]).unwrap();
        match cli.command {
            Cmd::Asm { output, .. } => assert_eq!(output, std::path::Path::new("program.bin")),
            _ => panic!("expected asm"),
        }
    }
}
