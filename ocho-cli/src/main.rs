//! Entrypoint for CLI
use std::{env, error::Error, fs, time::Instant};

use log::{debug, info, warn};
use ocho::{prelude::*, DisplayBuffer, Keypad, IMPL_VERSION};

static USAGE: &str = r#"
usage: ocho run FILE [FRAMES]

commands:
    run     Run the target ROM file for the given number of
            frame ticks (default 600), then print the final
            display to the terminal.

examples:
    ocho run breakout.ch8
    ocho run breakout.ch8 120
"#;

/// Frame ticks to run when no budget is given on the command line.
const DEFAULT_FRAMES: usize = 600;

/// Headless devices.
///
/// There is no key source, no window and no speaker. The display is
/// presented once, after the run, by the caller.
struct TermDevices {
    frames_left: usize,
    draw_count: usize,
}

impl Devices for TermDevices {
    fn poll_input(&mut self, _keypad: &mut Keypad) -> bool {
        if self.frames_left == 0 {
            return false;
        }
        self.frames_left -= 1;
        true
    }

    fn draw(&mut self, _display: &DisplayBuffer) {
        self.draw_count += 1;
    }

    fn buzz(&mut self, state: bool) {
        debug!("buzzer {}", if state { "on" } else { "off" });
    }
}

fn run_rom(filepath: &str, frames: usize) -> Chip8Result<()> {
    let rom = fs::read(filepath)?;
    info!("loaded rom: {filepath} ({} bytes)", rom.len());

    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_program(&rom)?;

    if log::max_level() >= log::Level::Debug {
        debug!("program head:\n{}", vm.dump_ram(8).unwrap_or_default());
    }

    let mut devices = TermDevices {
        frames_left: frames,
        draw_count: 0,
    };

    let start = Instant::now();
    let result = vm.run(&mut devices);
    let end = Instant::now();

    if vm.is_waiting() {
        warn!("machine is waiting for a key press, but there is no key source");
    }

    info!(
        "ran {} frames with {} presents in {}ms",
        frames - devices.frames_left,
        devices.draw_count,
        end.duration_since(start).as_nanos() as f64 / 1_000_000.0
    );
    println!("{}", vm.display_buffer());

    result
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    match parse_args() {
        Some(Cmd::Run { filepath, frames }) => run_rom(&filepath, frames)?,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    }

    Ok(())
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next()?.as_str() {
        "run" => {
            let filepath = args.next()?;
            let frames = match args.next() {
                Some(arg) => arg.parse().ok()?,
                None => DEFAULT_FRAMES,
            };
            Some(Cmd::Run { filepath, frames })
        }
        _ => None,
    }
}

fn print_usage() {
    println!("ocho v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run { filepath: String, frames: usize },
}
