//! Result and errors.
use std::fmt::{self, Display, Formatter};
use std::io;

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug)]
pub enum Chip8Error {
    /// Attempt to load a program that can't fit in memory.
    LargeProgram,
    /// Instruction word that matches none of the known variants.
    ///
    /// The machine state is left untouched, with the program counter
    /// still pointing at the offending word.
    UnknownOpcode { opcode: u16, pc: u16 },
    /// An operation relative to the address register would touch
    /// memory beyond 0xFFF.
    AddressOutOfRange { address: usize, pc: u16 },
    /// More than `STACK_SIZE - 1` nested subroutine calls.
    StackOverflow { pc: u16 },
    /// Return without a matching call.
    StackUnderflow { pc: u16 },
    /// ROM file could not be read.
    Io(io::Error),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::LargeProgram => write!(f, "program too large for VM memory"),
            Self::UnknownOpcode { opcode, pc } => {
                write!(f, "unknown opcode {opcode:04X} at {pc:04X}")
            }
            Self::AddressOutOfRange { address, pc } => {
                write!(f, "memory access out of range at {pc:04X}: {address:#05X}")
            }
            Self::StackOverflow { pc } => write!(f, "call stack overflow at {pc:04X}"),
            Self::StackUnderflow { pc } => write!(f, "call stack underflow at {pc:04X}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Chip8Error {}

impl From<io::Error> for Chip8Error {
    fn from(err: io::Error) -> Self {
        Chip8Error::Io(err)
    }
}
