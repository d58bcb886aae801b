use std::num::ParseIntError;

use miette::{miette, Diagnostic, LabeledSpan, Report, Severity};
use thiserror::Error;

use crate::symbol::Span;

/// Fatal fault raised while executing a program. Ends the run.
#[derive(Error, Diagnostic, Clone, PartialEq, Eq, Debug)]
pub enum RuntimeError {
    #[error("unknown register `{0}`")]
    #[diagnostic(
        code(runtime::unknown_register),
        help("declare registers with `allocate-registers` and stay within the register capacity")
    )]
    UnknownRegister(String),
    #[error("unknown label `{0}`")]
    #[diagnostic(code(runtime::unknown_label), help("labels are defined with `name:`"))]
    UnknownLabel(String),
    #[error("input failed: {0}")]
    #[diagnostic(code(runtime::io), help("`read` expects one decimal integer per line"))]
    IoError(String),
    #[error("stack overflow at address {0}")]
    #[diagnostic(
        code(runtime::stack_overflow),
        help("addresses must be below the stack capacity")
    )]
    StackOverflow(i64),
    #[error("stack underflow at address {0}")]
    #[diagnostic(code(runtime::stack_underflow), help("addresses must not be negative"))]
    StackUnderflow(i64),
    #[error("program counter {0} is outside the program")]
    #[diagnostic(
        code(runtime::out_of_program),
        help("execution ran off the end of the program or jumped to a bad line; did you forget `halt`?")
    )]
    OutOfProgram(i64),
    #[error("division by zero")]
    #[diagnostic(code(runtime::division_by_zero))]
    DivisionByZero,
}

// Runtime errors

/// Report a runtime fault against the source line that raised it.
pub fn runtime_fault(err: RuntimeError, span: Span, src: &str) -> Report {
    let code = err
        .code()
        .map(|code| code.to_string())
        .unwrap_or_else(|| "runtime".to_string());
    let help = err.help().map(|help| help.to_string()).unwrap_or_default();
    miette!(
        severity = Severity::Error,
        code = code,
        help = help,
        labels = vec![LabeledSpan::at(span, "faulted here")],
        "{err}",
    )
    .with_source_code(src.to_string())
}

// Lexer errors

pub fn lex_invalid_lit(span: Span, src: &str, e: ParseIntError) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::bad_lit",
        help = "literals must fit in a signed 64-bit integer",
        labels = vec![LabeledSpan::at(span, "incorrect literal")],
        "Encountered an invalid literal: {e}",
    )
    .with_source_code(src.to_string())
}

pub fn lex_unknown(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::unknown",
        help = "operands are register names, labels, or integer literals like -5 or 0x1f",
        labels = vec![LabeledSpan::at(span, "unknown token")],
        "Encountered an unknown token",
    )
    .with_source_code(src.to_string())
}

// Parser errors

pub fn parse_unknown_mnemonic(span: Span, src: &str, found: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::mnemonic",
        help = "check the list of instructions in the documentation",
        labels = vec![LabeledSpan::at(span, "unknown instruction")],
        "Unknown instruction `{found}`",
    )
    .with_source_code(src.to_string())
}

pub fn parse_arity(span: Span, src: &str, mnemonic: &str, expected: usize, found: usize) -> Report {
    let plural = if expected == 1 { "" } else { "s" };
    miette!(
        severity = Severity::Error,
        code = "parse::arity",
        help = format!("`{mnemonic}` takes {expected} operand{plural}"),
        labels = vec![LabeledSpan::at(span, "wrong number of operands")],
        "Expected {expected} operand{plural}, found {found}",
    )
    .with_source_code(src.to_string())
}

pub fn parse_duplicate_label(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::duplicate_label",
        help = "labels are only allowed once per file",
        labels = vec![LabeledSpan::at(span, "duplicate label")],
        "Duplicate label"
    )
    .with_source_code(src.to_string())
}

pub fn parse_generic_unexpected(span: Span, src: &str, expected: &str, found: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::unexpected_token",
        help = "lines hold a label, a directive, or an instruction followed by its operands",
        labels = vec![LabeledSpan::at(span, "unexpected token")],
        "Expected {expected}, found {found}",
    )
    .with_source_code(src.to_string())
}

pub fn parse_empty_alloc(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::alloc",
        help = "list the register names to declare, like `allocate-registers n, total`",
        labels = vec![LabeledSpan::at(span, "no register names")],
        "Expected at least one register name",
    )
    .with_source_code(src.to_string())
}
