//! SLIM: a small register machine that runs label-addressed assembly programs.
//!
//! A [`Program`] is a list of [`Line`]s, either built directly or parsed from text with
//! [`parse`]. A [`Machine`] executes it against a fixed register file and a flat stack, talking to
//! the outside world through [`MachineIo`].

// Parsing
mod lexer;
mod parser;
pub use parser::{parse, AsmParser};
mod program;
pub use program::{Arg, Command, Line, Program};

// Running
mod io;
pub use io::{BufferIo, ConsoleIo, MachineIo};
mod runtime;
pub use runtime::{
    Machine, MachineConfig, Step, DEFAULT_REGISTERS, DEFAULT_STACK, MAX_REGISTERS, MAX_STACK,
};
#[macro_use]
pub mod output;

mod error;
pub use error::{runtime_fault, RuntimeError};
mod symbol;
pub use symbol::{LabelIndex, RegisterTable, Span, SrcOffset};

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;
