use std::cell::RefCell;
use std::str::Chars;

use colored::{ColoredString, Colorize};

use crate::io::MachineIo;
use crate::runtime::Machine;

#[macro_export]
macro_rules! tprint {
    ( $fmt:literal $($tt:tt)* ) => {{
        let s = format!(
            $fmt
            $($tt)*
        );
        $crate::output::Output::Trace.print_str(&s);
    }};
}

#[macro_export]
macro_rules! tprintln {
    () => {{
        $crate::output::Output::Trace.print_str("\n");
    }};
    ( $fmt:literal $($tt:tt)* ) => {{
        let s = format!(
            concat!($fmt, "\n")
            $($tt)*
        );
        $crate::output::Output::Trace.print_str(&s);
    }};
}

/// Where a piece of text goes: program output on stdout, or trace output on stderr.
#[derive(Clone, Copy, Debug)]
pub enum Output {
    Normal,
    Trace,
}

struct Decolored<'a> {
    chars: Chars<'a>,
}

/// Stack cells shown by [`Output::print_state`].
const STACK_PREVIEW: usize = 8;

impl Output {
    thread_local! {
        static IS_LINE_START: RefCell<bool> = const { RefCell::new(true) };
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    }

    pub fn set_line_start(new_value: bool) -> bool {
        Self::IS_LINE_START.with(|value| value.replace(new_value))
    }
    /// Private. Use [`Output::start_new_line`].
    fn is_line_start() -> bool {
        Self::IS_LINE_START.with(|value| *value.borrow())
    }
    pub fn set_minimal(new_value: bool) -> bool {
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }
    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }

    fn set_line_start_from_str(string: &str) {
        let last = Decolored::new(string).last();
        if let Some(ch) = last {
            Output::set_line_start(ch == '\n');
        }
    }

    pub fn print_str(&self, string: &str) {
        match self {
            Self::Normal => {
                // Program output is never colored
                print!("{}", string);
            }
            Self::Trace => {
                if Self::is_minimal() {
                    eprint_colorless(string);
                } else {
                    eprint!("{}", ColoredString::from(string).blue());
                }
            }
        }
        Self::set_line_start_from_str(string);
    }

    pub fn start_new_line(&self) {
        if !Self::is_line_start() {
            self.print_str("\n");
        }
    }

    /// Show registers that are named or hold a value, the program counter and the start of the
    /// stack.
    pub fn print_state<I: MachineIo>(&self, machine: &Machine<I>) {
        let mut names = vec![None; machine.registers().len()];
        for (name, slot) in machine.register_names() {
            if let Some(entry) = names.get_mut(slot) {
                *entry = Some(name);
            }
        }
        let shown: Vec<_> = machine
            .registers()
            .iter()
            .zip(names)
            .enumerate()
            .filter(|(_, (value, name))| name.is_some() || **value != 0)
            .map(|(slot, (value, name))| (slot, name.unwrap_or(""), *value))
            .collect();
        let stack: Vec<String> = machine
            .stack()
            .iter()
            .take(STACK_PREVIEW)
            .map(|value| value.to_string())
            .collect();

        if Self::is_minimal() {
            for (slot, name, value) in shown {
                self.print_str(&format!("R{slot} {name} {value}\n"));
            }
            self.print_str(&format!("PC {}\n", machine.pc()));
            self.print_str(&format!("SP {}\n", stack.join(" ")));
            return;
        }

        self.print_str("\x1b[2m┌──────────────────────────────────────────┐\x1b[0m\n");
        self.print_str(
            "\x1b[2m│ \x1b[3mslot  name                          value\x1b[0m\x1b[2m │\x1b[0m\n",
        );
        for (slot, name, value) in shown {
            self.print_str("\x1b[2m│\x1b[0m");
            self.print_str(&format!(" \x1b[1mR{slot:<4}\x1b[0m {name:<12} {value:>20}"));
            self.print_str(" \x1b[2m│\x1b[0m\n");
        }
        self.print_str("\x1b[2m│\x1b[0m");
        self.print_str(&format!(" \x1b[1mPC\x1b[0m    {:<33}", machine.pc()));
        self.print_str(" \x1b[2m│\x1b[0m\n");
        self.print_str("\x1b[2m└──────────────────────────────────────────┘\x1b[0m\n");
        self.print_str(&format!("\x1b[2mstack:\x1b[0m {} ..\n", stack.join(" ")));
    }
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl<'a> Iterator for Decolored<'a> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}

fn eprint_colorless(string: &str) {
    for ch in Decolored::new(string) {
        eprint!("{}", ch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decolored() {
        assert_eq!(Decolored::new("abcdef").collect::<String>(), "abcdef");
        assert_eq!(
            Decolored::new("abc\x1b[0;2mdef\x1b[0m").collect::<String>(),
            "abcdef"
        );
        assert_eq!(Decolored::new("abc\x1b[0xyz").collect::<String>(), "abc");
        assert_eq!(
            Decolored::new("abc\x1bw[0bxyzmdef").collect::<String>(),
            "abcdef"
        );
    }

    #[test]
    fn tracks_line_start() {
        Output::set_line_start(true);
        Output::Normal.print_str("12");
        assert!(!Output::is_line_start());
        Output::Normal.print_str("\x1b[1m\n\x1b[0m");
        assert!(Output::is_line_start());
    }
}
