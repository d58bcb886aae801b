use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args as ClapArgs, Parser, Subcommand};
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

use slim::output::Output;
use slim::{tprint, tprintln};
use slim::{ConsoleIo, Machine, MachineConfig, Program, Step, MAX_REGISTERS, MAX_STACK};

/// Slim runs programs for SLIM, a small register machine used for teaching.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.slim` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a `.slim` file, reading input from and writing output to the terminal
    Run {
        /// `.slim` file to run
        name: PathBuf,
        #[command(flatten)]
        opts: RunOptions,
    },
    /// Check a `.slim` file without running it
    Check {
        /// File to check
        name: PathBuf,
    },
}

#[derive(ClapArgs, Default)]
struct RunOptions {
    /// Produce minimal output, suited for blackbox tests
    #[arg(short, long)]
    minimal: bool,
    /// Print every executed line and the final machine state to stderr
    #[arg(short, long)]
    trace: bool,
    /// Number of registers, at most 65536 [default: $SLIM_REGISTERS or 32]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_REGISTERS as i64))]
    registers: Option<u32>,
    /// Number of stack cells, at most 16777216 [default: $SLIM_STACK or 1024]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_STACK as i64))]
    stack: Option<u32>,
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    slim::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(slim::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    if let Some(command) = args.command {
        match command {
            Command::Run { name, opts } => run(&name, opts),
            Command::Check { name } => {
                file_message(Green, "Checking", &name);
                let contents = fs::read_to_string(&name).into_diagnostic()?;
                let _ = slim::parse(&contents)?;
                message(Green, "Success", "no errors found!");
                Ok(())
            }
        }
    } else if let Some(path) = args.path {
        run(&path, RunOptions::default())
    } else {
        println!("\n~ slim v{VERSION} ~");
        println!("{}", LOGO.truecolor(255, 183, 197).bold());
        println!("{SHORT_INFO}");
        Ok(())
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, right.as_str());
}

fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    if Output::is_minimal() {
        return;
    }
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    // Status goes to stderr so program output stays clean
    Output::Trace.start_new_line();
    eprintln!("{left:>12} {right}");
}

fn run(name: &Path, opts: RunOptions) -> Result<()> {
    Output::set_minimal(opts.minimal);
    let trace = opts.trace || slim::env::is_trace_enabled();
    let env_config = slim::env::machine_config();
    let config = MachineConfig {
        registers: opts.registers.map_or(env_config.registers, |n| n as usize),
        stack: opts.stack.map_or(env_config.stack, |n| n as usize),
    };

    file_message(MsgColor::Green, "Parsing", name);
    let contents = fs::read_to_string(name).into_diagnostic()?;
    let program = slim::parse(&contents)?;

    message(MsgColor::Green, "Running", "program");
    let mut machine = Machine::with_config(program, ConsoleIo, config);
    let res = if trace {
        run_traced(&mut machine)
    } else {
        machine.run()
    };

    if trace {
        Output::Trace.start_new_line();
        Output::Trace.print_state(&machine);
    }

    match res {
        Ok(()) => {
            message(MsgColor::Cyan, "Halted", "");
            file_message(MsgColor::Green, "Completed", name);
            Ok(())
        }
        Err(err) => {
            let at = format!("at pc {}", machine.pc());
            message(MsgColor::Red, "Faulted", at.as_str());
            Err(fault_report(err, machine.program(), machine.pc(), &contents))
        }
    }
}

/// Step the machine, echoing each line before it executes.
fn run_traced(machine: &mut Machine<ConsoleIo>) -> Result<(), slim::RuntimeError> {
    loop {
        let pc = machine.pc();
        let line = usize::try_from(pc)
            .ok()
            .and_then(|idx| machine.program().get(idx));
        if let Some(line) = line {
            Output::Trace.start_new_line();
            tprint!("{pc:>5} ");
            tprintln!("{}", line);
        }
        if let Step::Halt = machine.step()? {
            return Ok(());
        }
    }
}

/// Point the fault at its source line when there is one.
fn fault_report(
    err: slim::RuntimeError,
    program: &Program,
    pc: i64,
    src: &str,
) -> miette::Report {
    let span = usize::try_from(pc).ok().and_then(|idx| program.span(idx));
    match span {
        Some(span) => slim::runtime_fault(err, span, src),
        None => miette::Report::new(err),
    }
}

const LOGO: &str = r#"
     _ _
 ___| (_)_ __ ___
/ __| | | '_ ` _ \
\__ \ | | | | | | |
|___/_|_|_| |_| |_|"#;

const SHORT_INFO: &str = r"
Welcome to slim, an interpreter for the SLIM register machine.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
