use std::fmt;

use crate::symbol::Span;

/// A parsed program: the ordered lines the machine counts its `pc` over.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Program {
    lines: Vec<Line>,
    /// Source location of each line, parallel to `lines`. Empty when the program was not parsed
    /// from text.
    spans: Vec<Span>,
}

impl Program {
    pub fn new(lines: Vec<Line>) -> Self {
        Program {
            lines,
            spans: Vec::new(),
        }
    }

    pub(crate) fn with_spans(lines: Vec<Line>, spans: Vec<Span>) -> Self {
        debug_assert_eq!(lines.len(), spans.len());
        Program { lines, spans }
    }

    pub fn get(&self, idx: usize) -> Option<&Line> {
        self.lines.get(idx)
    }

    /// Where line `idx` came from, if the program was parsed from source.
    pub fn span(&self, idx: usize) -> Option<Span> {
        self.spans.get(idx).copied()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl From<Vec<Line>> for Program {
    fn from(lines: Vec<Line>) -> Self {
        Program::new(lines)
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Line;
    type IntoIter = std::slice::Iter<'a, Line>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// One slot of a program.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Line {
    /// Declare new symbolic registers, in order.
    Alloc(Vec<String>),
    Blank,
    Cmd(Command),
    /// Label definition, resolves to the index of this line.
    Lab(String),
}

/// Instruction operand.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Arg {
    /// Literal value, or a register slot when used as a register.
    Num(i64),
    /// Symbolic register or label.
    Name(String),
}

impl Arg {
    pub fn name(name: impl Into<String>) -> Self {
        Arg::Name(name.into())
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Num(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Name(value.to_string())
    }
}

/// Executable SLIM instruction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Command {
    Add { dst: Arg, src1: Arg, src2: Arg },
    Sub { dst: Arg, src1: Arg, src2: Arg },
    Mul { dst: Arg, src1: Arg, src2: Arg },
    /// Truncating division. Same operation as `Quo`.
    Div { dst: Arg, src1: Arg, src2: Arg },
    Quo { dst: Arg, src1: Arg, src2: Arg },
    /// Remainder of truncating division.
    Rem { dst: Arg, src1: Arg, src2: Arg },
    Seq { dst: Arg, src1: Arg, src2: Arg },
    Sne { dst: Arg, src1: Arg, src2: Arg },
    Slt { dst: Arg, src1: Arg, src2: Arg },
    Sgt { dst: Arg, src1: Arg, src2: Arg },
    Sle { dst: Arg, src1: Arg, src2: Arg },
    Sge { dst: Arg, src1: Arg, src2: Arg },
    /// Load from the stack at the address held in `addr_reg`.
    Ld { dst: Arg, addr_reg: Arg },
    /// Store to the stack at the address held in `addr_reg`.
    St { src: Arg, addr_reg: Arg },
    /// Load an immediate, or the line index of a label.
    Li { dst: Arg, val: Arg },
    Read { dst: Arg },
    Write { src: Arg },
    /// Jump to the line held in `line_reg` if `src` is zero.
    Jeqz { src: Arg, line_reg: Arg },
    J { line_reg: Arg },
    Halt,
}

impl Command {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Command::Add { .. } => "add",
            Command::Sub { .. } => "sub",
            Command::Mul { .. } => "mul",
            Command::Div { .. } => "div",
            Command::Quo { .. } => "quo",
            Command::Rem { .. } => "rem",
            Command::Seq { .. } => "seq",
            Command::Sne { .. } => "sne",
            Command::Slt { .. } => "slt",
            Command::Sgt { .. } => "sgt",
            Command::Sle { .. } => "sle",
            Command::Sge { .. } => "sge",
            Command::Ld { .. } => "ld",
            Command::St { .. } => "st",
            Command::Li { .. } => "li",
            Command::Read { .. } => "read",
            Command::Write { .. } => "write",
            Command::Jeqz { .. } => "jeqz",
            Command::J { .. } => "j",
            Command::Halt => "halt",
        }
    }

    fn args(&self) -> Vec<&Arg> {
        match self {
            Command::Add { dst, src1, src2 }
            | Command::Sub { dst, src1, src2 }
            | Command::Mul { dst, src1, src2 }
            | Command::Div { dst, src1, src2 }
            | Command::Quo { dst, src1, src2 }
            | Command::Rem { dst, src1, src2 }
            | Command::Seq { dst, src1, src2 }
            | Command::Sne { dst, src1, src2 }
            | Command::Slt { dst, src1, src2 }
            | Command::Sgt { dst, src1, src2 }
            | Command::Sle { dst, src1, src2 }
            | Command::Sge { dst, src1, src2 } => vec![dst, src1, src2],
            Command::Ld { dst, addr_reg } => vec![dst, addr_reg],
            Command::St { src, addr_reg } => vec![src, addr_reg],
            Command::Li { dst, val } => vec![dst, val],
            Command::Read { dst } => vec![dst],
            Command::Write { src } => vec![src],
            Command::Jeqz { src, line_reg } => vec![src, line_reg],
            Command::J { line_reg } => vec![line_reg],
            Command::Halt => vec![],
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Num(value) => write!(f, "{value}"),
            Arg::Name(name) => write!(f, "{name}"),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())?;
        for (i, arg) in self.args().into_iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{arg}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Alloc(names) => write!(f, "allocate-registers {}", names.join(", ")),
            Line::Blank => Ok(()),
            Line::Cmd(command) => write!(f, "    {command}"),
            Line::Lab(name) => write!(f, "{name}:"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_source_syntax() {
        let add = Command::Add {
            dst: "sum".into(),
            src1: "sum".into(),
            src2: Arg::Num(-3),
        };
        assert_eq!(add.to_string(), "add sum, sum, -3");
        assert_eq!(Command::Halt.to_string(), "halt");
        assert_eq!(
            Line::Alloc(vec!["a".into(), "b".into()]).to_string(),
            "allocate-registers a, b"
        );
        assert_eq!(Line::Lab("loop".into()).to_string(), "loop:");
        assert_eq!(Line::Blank.to_string(), "");
    }
}
