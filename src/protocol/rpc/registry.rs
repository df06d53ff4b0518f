//! Program registry: the first level of call dispatch.

use std::io::Cursor;
use std::ops::RangeInclusive;

use thiserror::Error;

use super::Context;
use crate::protocol::xdr::XdrBuffer;

/// Lowest program number the registry can hold.
pub const PROGRAM_BASE: u32 = 100000;
/// Number of program slots, covering `PROGRAM_BASE..PROGRAM_BASE + 64`.
pub const MAX_PROGRAMS: usize = 64;

/// Failure of a procedure handler that the dispatcher reports in the reply
/// header instead of a result body.
#[derive(Debug, Error)]
pub enum ProcError {
    /// Answered as `PROC_UNAVAIL`.
    #[error("procedure not implemented")]
    NotImplemented,
    /// Answered as `GARBAGE_ARGS`.
    #[error("cannot decode arguments: {0}")]
    GarbageArgs(#[from] std::io::Error),
}

pub type ProcResult = Result<(), ProcError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("program {0} is outside the registrable range")]
    OutOfRange(u32),
    #[error("program {0} is already registered")]
    Duplicate(u32),
}

/// One ONC RPC program.
///
/// `call` decodes its arguments from `input` and writes only the result body
/// to `output`; the reply header is already in place. Procedure 0 is the
/// NULL ping in every program.
pub trait RpcProgram: Send + Sync {
    fn program(&self) -> u32;

    fn name(&self) -> &'static str;

    /// Supported versions, lowest to highest.
    fn versions(&self) -> RangeInclusive<u32>;

    fn call(
        &self,
        proc: u32,
        input: &mut Cursor<&[u8]>,
        output: &mut XdrBuffer,
        context: &mut Context<'_>,
    ) -> ProcResult;
}

/// Fixed table of programs indexed by `program - PROGRAM_BASE`.
pub struct ServerRegistry {
    slots: [Option<Box<dyn RpcProgram>>; MAX_PROGRAMS],
}

fn slot_index(program: u32) -> Option<usize> {
    let index = program.checked_sub(PROGRAM_BASE)? as usize;
    (index < MAX_PROGRAMS).then_some(index)
}

impl ServerRegistry {
    pub fn new() -> Self {
        ServerRegistry { slots: std::array::from_fn(|_| None) }
    }

    pub fn register(&mut self, program: Box<dyn RpcProgram>) -> Result<(), RegistryError> {
        let number = program.program();
        let index = slot_index(number).ok_or(RegistryError::OutOfRange(number))?;
        if self.slots[index].is_some() {
            return Err(RegistryError::Duplicate(number));
        }
        self.slots[index] = Some(program);
        Ok(())
    }

    pub fn lookup(&self, program: u32) -> Option<&dyn RpcProgram> {
        self.slots.get(slot_index(program)?)?.as_deref()
    }

    /// Registered programs in program-number order.
    pub fn programs(&self) -> impl Iterator<Item = &dyn RpcProgram> {
        self.slots.iter().filter_map(|slot| slot.as_deref())
    }
}

impl Default for ServerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy(u32);

    impl RpcProgram for Dummy {
        fn program(&self) -> u32 {
            self.0
        }

        fn name(&self) -> &'static str {
            "dummy"
        }

        fn versions(&self) -> RangeInclusive<u32> {
            1..=1
        }

        fn call(
            &self,
            _proc: u32,
            _input: &mut Cursor<&[u8]>,
            _output: &mut XdrBuffer,
            _context: &mut Context<'_>,
        ) -> ProcResult {
            Ok(())
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = ServerRegistry::new();
        registry.register(Box::new(Dummy(100003))).expect("register");
        assert_eq!(registry.lookup(100003).map(|p| p.program()), Some(100003));
        assert!(registry.lookup(100005).is_none());
        assert!(registry.lookup(7).is_none());
        assert!(registry.lookup(u32::MAX).is_none());
    }

    #[test]
    fn rejects_duplicates_and_out_of_range() {
        let mut registry = ServerRegistry::new();
        registry.register(Box::new(Dummy(100000))).expect("register");
        assert_eq!(
            registry.register(Box::new(Dummy(100000))),
            Err(RegistryError::Duplicate(100000))
        );
        assert_eq!(
            registry.register(Box::new(Dummy(100000 + 64))),
            Err(RegistryError::OutOfRange(100064))
        );
        assert_eq!(registry.register(Box::new(Dummy(99))), Err(RegistryError::OutOfRange(99)));
    }
}
