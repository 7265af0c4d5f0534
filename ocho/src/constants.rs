//! Constant values of the Chip-8 architecture.

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 0x10; // 16

/// The lower memory space was historically used for the interpreter itself,
/// and now holds the builtin fontset.
pub const MEM_START: usize = 0x200; // 512
pub const MEM_SIZE: usize = 0x1000; // 4096

/// Largest program that fits between the interpreter area and the
/// end of memory.
pub const MAX_PROGRAM_SIZE: usize = MEM_SIZE - MEM_START; // 3584

/// Levels of nesting allowed in the call stack.
///
/// The first slot is never written. A program can nest 15 calls deep
/// before the stack pointer would run off the end.
pub const STACK_SIZE: usize = 16;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const DISPLAY_BUFFER_SIZE: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT;
pub const DISPLAY_WIDTH_MASK: usize = DISPLAY_WIDTH - 1;
pub const DISPLAY_HEIGHT_MASK: usize = DISPLAY_HEIGHT - 1;

/// Number of frame ticks in a second at which the delay and sound
/// timers count down.
pub const FRAME_FREQUENCY: u64 = 60;

/// Number of nanoseconds in a second
#[doc(hidden)]
pub const NANOS_IN_SECOND: u64 = 1_000_000_000;

/// Time in nanoseconds a single frame takes, precalculated.
pub const FRAME_TIME: u64 = NANOS_IN_SECOND / FRAME_FREQUENCY;

/// Instructions executed per frame when no budget is configured.
///
/// Values around 9 to 11 approximate the pace of the original hardware.
pub const DEFAULT_INSTRUCTIONS_PER_FRAME: u32 = 10;

/// Number of keys on the keypad (0x0-0xF)
pub const KEY_COUNT: u8 = 16;

/// Offset of the builtin fontset in memory.
pub const FONTSET_START: usize = 0x000;

/// Height in bytes of a single fontset glyph.
pub const FONTSET_HEIGHT: usize = 5;

/// Builtin glyph bitmaps for the hexadecimal digits 0-F.
///
/// Glyph `d` is the 5 bytes starting at `FONTSET_START + d * FONTSET_HEIGHT`.
/// Each byte is one row of 8 pixels, like the `D` glyph:
///
/// ```text
/// 0xE0 = 11100000
/// 0x90 = 10010000
/// 0x90 = 10010000
/// 0x90 = 10010000
/// 0xE0 = 11100000
/// ```
#[rustfmt::skip]
pub const FONTSET: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Type for storing the 12-bit memory addresses.
pub type Address = u16;
