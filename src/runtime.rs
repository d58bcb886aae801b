use crate::error::RuntimeError;
use crate::io::MachineIo;
use crate::program::{Arg, Command, Line, Program};
use crate::symbol::{LabelIndex, RegisterTable};

pub const DEFAULT_REGISTERS: usize = 32;
pub const DEFAULT_STACK: usize = 1024;
/// Largest register file the CLI and environment accept.
pub const MAX_REGISTERS: usize = 1 << 16;
/// Largest stack the CLI and environment accept.
pub const MAX_STACK: usize = 1 << 24;

/// Fixed capacities for one run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MachineConfig {
    pub registers: usize,
    pub stack: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            registers: DEFAULT_REGISTERS,
            stack: DEFAULT_STACK,
        }
    }
}

/// Outcome of a single successful step.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Step {
    Continue,
    Halt,
}

/// Register file, addressed by slot number or by allocated name.
struct Registers {
    names: RegisterTable,
    slots: Box<[i64]>,
}

impl Registers {
    fn new(count: usize) -> Self {
        Registers {
            names: RegisterTable::new(),
            slots: vec![0; count].into_boxed_slice(),
        }
    }

    /// Resolve `arg` to a slot inside the register file.
    fn slot(&self, arg: &Arg) -> Result<usize, RuntimeError> {
        let idx = match arg {
            Arg::Num(idx) => *idx,
            Arg::Name(name) => match self.names.get(name) {
                Some(slot) => slot as i64,
                None => return Err(RuntimeError::UnknownRegister(name.clone())),
            },
        };
        usize::try_from(idx)
            .ok()
            .filter(|&slot| slot < self.slots.len())
            .ok_or_else(|| RuntimeError::UnknownRegister(idx.to_string()))
    }

    fn get(&self, arg: &Arg) -> Result<i64, RuntimeError> {
        Ok(self.slots[self.slot(arg)?])
    }

    fn set(&mut self, arg: &Arg, value: i64) -> Result<(), RuntimeError> {
        let slot = self.slot(arg)?;
        self.slots[slot] = value;
        Ok(())
    }
}

/// Flat memory. Addresses come from register contents.
struct Stack {
    slots: Box<[i64]>,
}

impl Stack {
    fn new(size: usize) -> Self {
        Stack {
            slots: vec![0; size].into_boxed_slice(),
        }
    }

    fn slot(&self, addr: i64) -> Result<usize, RuntimeError> {
        if addr < 0 {
            return Err(RuntimeError::StackUnderflow(addr));
        }
        usize::try_from(addr)
            .ok()
            .filter(|&slot| slot < self.slots.len())
            .ok_or(RuntimeError::StackOverflow(addr))
    }

    fn load(&self, addr: i64) -> Result<i64, RuntimeError> {
        Ok(self.slots[self.slot(addr)?])
    }

    fn store(&mut self, addr: i64, value: i64) -> Result<(), RuntimeError> {
        let slot = self.slot(addr)?;
        self.slots[slot] = value;
        Ok(())
    }
}

/// Represents complete program state during runtime.
pub struct Machine<I> {
    registers: Registers,
    stack: Stack,
    /// Program counter, index into `code`
    pc: i64,
    code: Program,
    /// Must not be mutated after construction.
    labels: LabelIndex,
    io: I,
}

impl<I: MachineIo> Machine<I> {
    pub fn new(code: Program, io: I) -> Self {
        Self::with_config(code, io, MachineConfig::default())
    }

    pub fn with_config(code: Program, io: I, config: MachineConfig) -> Self {
        let labels = LabelIndex::build(&code);
        Machine {
            registers: Registers::new(config.registers),
            stack: Stack::new(config.stack),
            pc: 0,
            code,
            labels,
            io,
        }
    }

    /// Run until `halt` or the first fault.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            if let Step::Halt = self.step()? {
                return Ok(());
            }
        }
    }

    /// Fetch, decode and execute the line at `pc`.
    pub fn step(&mut self) -> Result<Step, RuntimeError> {
        let line = usize::try_from(self.pc)
            .ok()
            .and_then(|idx| self.code.get(idx))
            .ok_or(RuntimeError::OutOfProgram(self.pc))?;

        let command = match line {
            Line::Blank | Line::Lab(_) => {
                self.pc += 1;
                return Ok(Step::Continue);
            }
            Line::Alloc(names) => {
                self.registers.names.allocate(names);
                self.pc += 1;
                return Ok(Step::Continue);
            }
            Line::Cmd(command) => command,
        };

        let regs = &mut self.registers;
        match command {
            Command::Add { dst, src1, src2 } => {
                binary(regs, dst, src1, src2, |a, b| Ok(a.wrapping_add(b)))?
            }
            Command::Sub { dst, src1, src2 } => {
                binary(regs, dst, src1, src2, |a, b| Ok(a.wrapping_sub(b)))?
            }
            Command::Mul { dst, src1, src2 } => {
                binary(regs, dst, src1, src2, |a, b| Ok(a.wrapping_mul(b)))?
            }
            Command::Div { dst, src1, src2 } | Command::Quo { dst, src1, src2 } => {
                binary(regs, dst, src1, src2, quotient)?
            }
            Command::Rem { dst, src1, src2 } => binary(regs, dst, src1, src2, remainder)?,
            Command::Seq { dst, src1, src2 } => compare(regs, dst, src1, src2, |a, b| a == b)?,
            Command::Sne { dst, src1, src2 } => compare(regs, dst, src1, src2, |a, b| a != b)?,
            Command::Slt { dst, src1, src2 } => compare(regs, dst, src1, src2, |a, b| a < b)?,
            Command::Sgt { dst, src1, src2 } => compare(regs, dst, src1, src2, |a, b| a > b)?,
            Command::Sle { dst, src1, src2 } => compare(regs, dst, src1, src2, |a, b| a <= b)?,
            Command::Sge { dst, src1, src2 } => compare(regs, dst, src1, src2, |a, b| a >= b)?,
            Command::Ld { dst, addr_reg } => {
                let addr = regs.get(addr_reg)?;
                let value = self.stack.load(addr)?;
                regs.set(dst, value)?;
            }
            Command::St { src, addr_reg } => {
                let addr = regs.get(addr_reg)?;
                let value = regs.get(src)?;
                self.stack.store(addr, value)?;
            }
            Command::Li { dst, val } => {
                let value = match val {
                    Arg::Num(value) => *value,
                    Arg::Name(label) => self
                        .labels
                        .get(label)
                        .ok_or_else(|| RuntimeError::UnknownLabel(label.clone()))?
                        as i64,
                };
                regs.set(dst, value)?;
            }
            Command::Read { dst } => {
                let value = self.io.read().map_err(RuntimeError::IoError)?;
                regs.set(dst, value)?;
            }
            Command::Write { src } => {
                let value = regs.get(src)?;
                self.io.write(value);
            }
            Command::Jeqz { src, line_reg } => {
                if regs.get(src)? == 0 {
                    self.pc = regs.get(line_reg)?;
                    return Ok(Step::Continue);
                }
            }
            Command::J { line_reg } => {
                self.pc = regs.get(line_reg)?;
                return Ok(Step::Continue);
            }
            Command::Halt => return Ok(Step::Halt),
        }
        self.pc += 1;
        Ok(Step::Continue)
    }

    pub fn pc(&self) -> i64 {
        self.pc
    }

    pub fn program(&self) -> &Program {
        &self.code
    }

    pub fn registers(&self) -> &[i64] {
        &self.registers.slots
    }

    pub fn stack(&self) -> &[i64] {
        &self.stack.slots
    }

    /// Symbolic register names and their slots, in allocation order.
    pub fn register_names(&self) -> impl Iterator<Item = (&str, usize)> {
        self.registers.names.names()
    }

    /// Line index of label `name`.
    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name)
    }

    pub fn io(&self) -> &I {
        &self.io
    }

    pub fn into_io(self) -> I {
        self.io
    }
}

/// Read both sources, then write `op(src1, src2)` to `dst`.
fn binary(
    regs: &mut Registers,
    dst: &Arg,
    src1: &Arg,
    src2: &Arg,
    op: impl FnOnce(i64, i64) -> Result<i64, RuntimeError>,
) -> Result<(), RuntimeError> {
    let a = regs.get(src1)?;
    let b = regs.get(src2)?;
    regs.set(dst, op(a, b)?)
}

fn compare(
    regs: &mut Registers,
    dst: &Arg,
    src1: &Arg,
    src2: &Arg,
    test: impl FnOnce(i64, i64) -> bool,
) -> Result<(), RuntimeError> {
    binary(regs, dst, src1, src2, |a, b| Ok(test(a, b) as i64))
}

/// Truncating division. `i64::MIN / -1` wraps to `i64::MIN`.
fn quotient(a: i64, b: i64) -> Result<i64, RuntimeError> {
    if b == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    Ok(a.wrapping_div(b))
}

/// Remainder of truncating division, sign follows the dividend.
fn remainder(a: i64, b: i64) -> Result<i64, RuntimeError> {
    if b == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    Ok(a.wrapping_rem(b))
}
