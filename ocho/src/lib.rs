mod clock;
pub mod constants;
mod cpu;
mod devices;
mod display;
mod error;
mod instr;
mod keypad;
mod vm;

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub use self::{
    devices::{Devices, InvalidKeyCode, KeyCode},
    display::DisplayBuffer,
    instr::Instr,
    keypad::Keypad,
};

pub mod prelude {
    pub use super::{
        devices::{Devices, KeyCode},
        error::{Chip8Error, Chip8Result},
        vm::{Chip8Conf, Chip8Vm, Flow, Frame},
    };
}
