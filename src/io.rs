use std::collections::VecDeque;
use std::io::{stdin, BufRead, IsTerminal};

use console::Term;

use crate::output::Output;

/// Integer input and output available to a running program.
pub trait MachineIo {
    /// Emit one value. Never fails.
    fn write(&mut self, value: i64);
    /// Block for one value. The error is a message for the user.
    fn read(&mut self) -> Result<i64, String>;
}

impl<T: MachineIo + ?Sized> MachineIo for &mut T {
    fn write(&mut self, value: i64) {
        (**self).write(value)
    }

    fn read(&mut self) -> Result<i64, String> {
        (**self).read()
    }
}

/// Reads decimal integers line by line from the terminal or piped stdin, and prints one value per
/// line.
#[derive(Debug, Default)]
pub struct ConsoleIo;

impl MachineIo for ConsoleIo {
    fn write(&mut self, value: i64) {
        Output::Normal.print_str(&format!("{value}\n"));
    }

    fn read(&mut self) -> Result<i64, String> {
        let line = read_line()?;
        let line = line.trim();
        line.parse()
            .map_err(|e| format!("`{line}` is not an integer ({e})"))
    }
}

// Read one line from stdin or the interactive terminal
fn read_line() -> Result<String, String> {
    // Stdout may be redirected while the user still types at the terminal
    let term = Term::stderr();
    if is_interactive(stdin().is_terminal(), term.is_term()) {
        let line = term.read_line().map_err(|e| e.to_string())?;
        // Echoed input ends the line
        Output::set_line_start(true);
        Ok(line)
    } else {
        read_buffered(&mut stdin().lock())
    }
}

/// Line editing needs both a terminal on stdin and one to echo to.
fn is_interactive(stdin_is_term: bool, echo_is_term: bool) -> bool {
    stdin_is_term && echo_is_term
}

fn read_buffered(reader: &mut impl BufRead) -> Result<String, String> {
    let mut buf = String::new();
    let read = reader.read_line(&mut buf).map_err(|e| e.to_string())?;
    if read == 0 {
        return Err("reached end of input".to_string());
    }
    Ok(buf)
}

/// In-memory input queue and output log.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BufferIo {
    input: VecDeque<i64>,
    output: Vec<i64>,
}

impl BufferIo {
    pub fn new(input: impl IntoIterator<Item = i64>) -> Self {
        BufferIo {
            input: input.into_iter().collect(),
            output: Vec::new(),
        }
    }

    /// Everything written so far, oldest first.
    pub fn output(&self) -> &[i64] {
        &self.output
    }

    /// Inputs not yet read.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }
}

impl MachineIo for BufferIo {
    fn write(&mut self, value: i64) {
        self.output.push(value);
    }

    fn read(&mut self) -> Result<i64, String> {
        self.input
            .pop_front()
            .ok_or_else(|| "no input left".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_reads_in_order_then_fails() {
        let mut io = BufferIo::new([3, -1]);
        assert_eq!(io.read(), Ok(3));
        assert_eq!(io.remaining(), 1);
        assert_eq!(io.read(), Ok(-1));
        assert!(io.read().is_err());
    }

    #[test]
    fn buffer_through_reference() {
        let mut io = BufferIo::default();
        {
            let mut borrowed = &mut io;
            borrowed.write(7);
            MachineIo::write(&mut borrowed, 8);
        }
        assert_eq!(io.output(), &[7, 8]);
    }

    #[test]
    fn falls_back_to_buffered_reads() {
        assert!(is_interactive(true, true));
        assert!(!is_interactive(true, false));
        assert!(!is_interactive(false, true));

        let mut input = std::io::Cursor::new("12\n-3");
        assert_eq!(read_buffered(&mut input).as_deref(), Ok("12\n"));
        assert_eq!(read_buffered(&mut input).as_deref(), Ok("-3"));
        assert_eq!(
            read_buffered(&mut input),
            Err("reached end of input".to_string())
        );
    }
}
