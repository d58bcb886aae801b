use std::{cell::RefCell, ffi::OsStr};

use crate::runtime::{MachineConfig, MAX_REGISTERS, MAX_STACK};

#[derive(Clone, Copy, Debug)]
struct Env {
    registers: Option<usize>,
    stack: Option<usize>,
    trace: bool,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

/// Read `SLIM_REGISTERS`, `SLIM_STACK` and `SLIM_TRACE` once for this process.
pub fn init() {
    let value = Env {
        registers: var_size("SLIM_REGISTERS", MAX_REGISTERS),
        stack: var_size("SLIM_STACK", MAX_STACK),
        trace: var_is("SLIM_TRACE", "1"),
    };
    set_env(value);
}

/// Machine capacities from the environment, falling back to the defaults.
pub fn machine_config() -> MachineConfig {
    with_env(|env| {
        let default = MachineConfig::default();
        MachineConfig {
            registers: env.registers.unwrap_or(default.registers),
            stack: env.stack.unwrap_or(default.stack),
        }
    })
}

pub fn is_trace_enabled() -> bool {
    with_env(|env| env.trace)
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}

/// Integer in `1..=max` from the environment. Anything else is ignored.
fn var_size(name: impl AsRef<OsStr>, max: usize) -> Option<usize> {
    parse_size(&std::env::var(name.as_ref()).ok()?, max)
}

fn parse_size(value: &str, max: usize) -> Option<usize> {
    value
        .trim()
        .parse()
        .ok()
        .filter(|&size| size > 0 && size <= max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_must_be_positive_and_capped() {
        assert_eq!(parse_size("64", 64), Some(64));
        assert_eq!(parse_size(" 8 ", 64), Some(8));
        assert_eq!(parse_size("65", 64), None);
        assert_eq!(parse_size("18446744073709551615", MAX_STACK), None);
        assert_eq!(parse_size("0", 64), None);
        assert_eq!(parse_size("-3", 64), None);
        assert_eq!(parse_size("lots", 64), None);
    }

    #[test]
    fn unset_values_use_defaults() {
        // Thread-local, only this test sets it
        set_env(Env {
            registers: None,
            stack: Some(16),
            trace: false,
        });
        assert_eq!(
            machine_config(),
            MachineConfig {
                registers: 32,
                stack: 16
            }
        );
        assert!(!is_trace_enabled());
    }
}
