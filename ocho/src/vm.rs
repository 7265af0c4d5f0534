//! Virtual machine.
use std::fmt::{self, Write as FmtWrite};

use log::warn;
use rand::prelude::*;

use crate::{
    clock::Clock,
    constants::*,
    cpu::Chip8Cpu,
    devices::{Devices, KeyCode},
    display::DisplayBuffer,
    error::{Chip8Error, Chip8Result},
    instr::Instr,
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    clock: Clock,
    conf: Chip8Conf,
}

/// VM Configuration Parameters.
#[derive(Debug, Default, Clone)]
pub struct Chip8Conf {
    /// Instruction budget per frame tick.
    ///
    /// `None` picks the default budget, which approximates the pace
    /// of the original hardware.
    pub instructions_per_frame: Option<u32>,
}

/// Signal from a single executed instruction to the control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - Bnnn (`JP V0, addr`)
    /// - 00EE (`RET`)
    Jump,
    /// Display buffer changed and a frame is ready to present.
    Draw,
    /// Sound timer was written.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
    /// Interrupt flag was raised; the control loop should stop.
    Interrupt,
}

/// Outcome of a single frame tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Display buffer changed and should be presented.
    pub redraw: bool,
    /// Tone signal for the audio collaborator.
    pub buzzer: bool,
    /// Machine is suspended waiting for a fresh key press.
    pub waiting: bool,
    /// The interrupt flag stopped execution.
    pub interrupted: bool,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        Chip8Vm {
            cpu: Chip8Cpu::new(),
            clock: Clock::from_nanos(FRAME_TIME),
            conf,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Copy a program into memory and prepare it for execution.
    ///
    /// Fails when the program does not fit into the memory above the
    /// reserved interpreter area.
    pub fn load_program(&mut self, bytes: &[u8]) -> Chip8Result<()> {
        self.cpu.load_program(bytes)?;
        self.clock.reset();
        Ok(())
    }

    /// Clear internal state in preparation for a fresh startup.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.clock.reset();
    }

    /// Raise the interrupt flag, stopping the control loop at the next
    /// instruction boundary.
    pub fn interrupt(&mut self) {
        self.cpu.interrupt();
    }

    /// Set the pressed state of a keypad key.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.keypad.set_key(key.as_u8(), pressed);
    }

    pub fn display_buffer(&self) -> &DisplayBuffer {
        &self.cpu.display
    }

    /// Whether the tone signal for the audio collaborator is on.
    pub fn buzzer(&self) -> bool {
        self.cpu.buzzer_state
    }

    /// Whether the machine is suspended waiting for a key press.
    pub fn is_waiting(&self) -> bool {
        self.cpu.key_wait
    }

    /// Value of a general purpose register, index masked to 4 bits.
    pub fn register(&self, index: u8) -> u8 {
        self.cpu.register(index)
    }

    pub fn delay_timer(&self) -> u8 {
        self.cpu.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.cpu.sound_timer
    }
}

/// Interpreter
impl Chip8Vm {
    /// Fetch, decode and execute a single instruction.
    ///
    /// A decode miss fails with [`Chip8Error::UnknownOpcode`] and
    /// mutates nothing; the program counter is left pointing at the
    /// offending word so the caller decides whether to skip it.
    /// Runtime failures rewind the program counter to the faulting
    /// instruction before reporting.
    pub fn step(&mut self) -> Chip8Result<Flow> {
        if self.cpu.trap {
            return Ok(Flow::Interrupt);
        }

        let pc = self.cpu.pc;
        let word = self.cpu.fetch();
        let instr = Instr::decode(word).ok_or(Chip8Error::UnknownOpcode {
            opcode: word,
            pc: pc as u16,
        })?;

        op_trace(pc, &instr);

        self.cpu.pc += 2;

        match self.exec(instr, pc as u16) {
            Err(err) => {
                self.cpu.pc = pc;
                Err(err)
            }
            flow => flow,
        }
    }

    /// Advance the machine by a single frame tick.
    ///
    /// The delay and sound timers count down exactly once, then
    /// instructions execute up to the configured per-frame budget.
    /// The machine keeps ticking its timers while it is suspended
    /// waiting for a key, but executes nothing.
    ///
    /// Unknown opcodes are reported to the log and skipped; all other
    /// errors abort the frame.
    pub fn run_frame(&mut self) -> Chip8Result<Frame> {
        self.cpu.tick_delay();
        self.cpu.tick_sound();

        // Buzzer should be on while the sound timer counts down,
        // then turned off when the timer reaches zero.
        self.cpu.buzzer_state = self.cpu.sound_timer > 0;

        let budget = self
            .conf
            .instructions_per_frame
            .unwrap_or(DEFAULT_INSTRUCTIONS_PER_FRAME);

        let mut frame = Frame::default();

        for _ in 0..budget {
            match self.step() {
                Ok(Flow::Draw) => frame.redraw = true,
                Ok(Flow::KeyWait) => {
                    frame.waiting = true;
                    break;
                }
                Ok(Flow::Interrupt) => {
                    frame.interrupted = true;
                    break;
                }
                Ok(_) => {}
                Err(Chip8Error::UnknownOpcode { opcode, pc }) => {
                    warn!("unknown opcode {opcode:04X} at {pc:04X}, skipping");
                    self.cpu.pc += 2;
                }
                Err(err) => return Err(err),
            }
        }

        frame.buzzer = self.cpu.buzzer_state;
        Ok(frame)
    }

    /// Run a bounded number of frame ticks back to back.
    ///
    /// Returns the last frame outcome. Stops early when the machine
    /// is interrupted.
    pub fn run_frames(&mut self, frames: usize) -> Chip8Result<Frame> {
        let mut last = Frame::default();

        for _ in 0..frames {
            last = self.run_frame()?;
            if last.interrupted {
                break;
            }
        }

        Ok(last)
    }

    /// Cooperative driver loop.
    ///
    /// Gates frames on the 60 Hz wall clock, polls the input
    /// collaborator, and forwards display and buzzer changes to the
    /// devices. Returns when the devices request shutdown, the
    /// interrupt flag is raised, or execution fails.
    pub fn run(&mut self, devices: &mut dyn Devices) -> Chip8Result<()> {
        self.clock.reset();
        let mut buzzer = false;

        loop {
            self.clock.wait();

            if !devices.poll_input(&mut self.cpu.keypad) {
                return Ok(());
            }

            let frame = self.run_frame()?;

            if frame.redraw {
                devices.draw(&self.cpu.display);
            }
            if frame.buzzer != buzzer {
                buzzer = frame.buzzer;
                devices.buzz(buzzer);
            }
            if frame.interrupted {
                return Ok(());
            }
        }
    }

    /// Execute a single decoded instruction.
    ///
    /// `pc` is the address the instruction was fetched from; the
    /// program counter has already advanced past it.
    fn exec(&mut self, instr: Instr, pc: u16) -> Chip8Result<Flow> {
        use Instr::*;

        let cpu = &mut self.cpu;
        let mut flow = Flow::Ok;

        match instr {
            // 0nnn (SYS addr)
            //
            // Jump to a machine code routine on the original hardware.
            // Ignored.
            Sys { .. } => {}
            // 00E0 (CLS)
            //
            // Clear display.
            Cls => {
                cpu.display.clear();
                flow = Flow::Draw;
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // Set the program counter to the value at the top of the stack.
            // Subtract 1 from the stack pointer.
            Ret => {
                if cpu.sp == 0 {
                    return Err(Chip8Error::StackUnderflow { pc });
                }

                cpu.pc = cpu.stack[cpu.sp] as usize + 2;
                cpu.sp -= 1;
                flow = Flow::Jump;
            }
            // 1nnn (JP addr)
            //
            // Jump to address.
            Jp { nnn } => {
                cpu.pc = nnn as usize;
                flow = Flow::Jump;
            }
            // 2nnn (CALL addr)
            //
            // Call subroutine at NNN. The address of the call
            // instruction itself is pushed, so the matching return
            // lands on the instruction after it.
            Call { nnn } => {
                if cpu.sp + 1 >= STACK_SIZE {
                    return Err(Chip8Error::StackOverflow { pc });
                }

                cpu.sp += 1;
                cpu.stack[cpu.sp] = pc;
                cpu.pc = nnn as usize;
                flow = Flow::Jump;
            }
            // 3xkk (SE Vx, byte)
            //
            // Skip the next instruction if register VX equals value KK.
            SeByte { x, kk } => {
                if cpu.registers[x as usize] == kk {
                    cpu.pc += 2;
                }
            }
            // 4xkk (SNE Vx, byte)
            //
            // Skip the next instruction if register VX does not equal value KK.
            SneByte { x, kk } => {
                if cpu.registers[x as usize] != kk {
                    cpu.pc += 2;
                }
            }
            // 5xy0 (SE Vx, Vy)
            //
            // Skip the next instruction if register VX equals VY.
            SeReg { x, y } => {
                if cpu.registers[x as usize] == cpu.registers[y as usize] {
                    cpu.pc += 2;
                }
            }
            // 6xkk (LD Vx, byte)
            //
            // Set register VX to value KK.
            LdByte { x, kk } => {
                cpu.registers[x as usize] = kk;
            }
            // 7xkk (ADD Vx, byte)
            //
            // Add value KK to register VX. Carry flag is not set.
            AddByte { x, kk } => {
                let value = cpu.registers[x as usize];
                cpu.registers[x as usize] = value.wrapping_add(kk);
            }
            // 8xy0 (LD Vx, Vy)
            //
            // Store the value of register VY in register VX.
            LdReg { x, y } => {
                cpu.registers[x as usize] = cpu.registers[y as usize];
            }
            // 8xy1 (OR Vx, Vy)
            //
            // Performs bitwise OR on VX and VY, and stores the result in VX.
            Or { x, y } => {
                cpu.registers[x as usize] |= cpu.registers[y as usize];
            }
            // 8xy2 (AND Vx, Vy)
            //
            // Performs bitwise AND on VX and VY, and stores the result in VX.
            And { x, y } => {
                cpu.registers[x as usize] &= cpu.registers[y as usize];
            }
            // 8xy3 (XOR Vx, Vy)
            //
            // Performs bitwise XOR on VX and VY, and stores the result in VX.
            Xor { x, y } => {
                cpu.registers[x as usize] ^= cpu.registers[y as usize];
            }
            // 8xy4 (ADD Vx, Vy)
            //
            // Adds VY to VX, and stores the result in VX.
            // Overflow is wrapped.
            // If overflow, set VF to 1, else 0.
            AddReg { x, y } => {
                let sum = cpu.registers[x as usize] as u16 + cpu.registers[y as usize] as u16;
                cpu.registers[0xF] = (sum > 0xFF) as u8;
                cpu.registers[x as usize] = sum as u8;
            }
            // 8xy5 (SUB Vx, Vy)
            //
            // Subtracts VY from VX, and stores the result in VX.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Sub { x, y } => {
                let (vx, vy) = (cpu.registers[x as usize], cpu.registers[y as usize]);
                cpu.registers[0xF] = (vx > vy) as u8;
                cpu.registers[x as usize] = vx.wrapping_sub(vy);
            }
            // 8xy6 (SHR Vx)
            //
            // Set VF to the least-significant bit of VX, then shift VX
            // right by 1.
            Shr { x } => {
                let value = cpu.registers[x as usize];
                cpu.registers[0xF] = value & 1;
                cpu.registers[x as usize] = value >> 1;
            }
            // 8xy7 (SUBN Vx, Vy)
            //
            // Subtracts VX from VY, and stores the result in VX.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Subn { x, y } => {
                let (vx, vy) = (cpu.registers[x as usize], cpu.registers[y as usize]);
                cpu.registers[0xF] = (vy > vx) as u8;
                cpu.registers[x as usize] = vy.wrapping_sub(vx);
            }
            // 8xyE (SHL Vx)
            //
            // Set VF to the most-significant bit of VX, then shift VX
            // left by 1.
            Shl { x } => {
                let value = cpu.registers[x as usize];
                cpu.registers[0xF] = (value & 0x80 != 0) as u8;
                cpu.registers[x as usize] = value << 1;
            }
            // 9xy0 (SNE Vx, Vy)
            //
            // Skip the next instruction if register VX does not equal VY.
            SneReg { x, y } => {
                if cpu.registers[x as usize] != cpu.registers[y as usize] {
                    cpu.pc += 2;
                }
            }
            // Annn (LD I, addr)
            //
            // Set address register I to value NNN.
            LdI { nnn } => {
                cpu.address = nnn;
            }
            // Bnnn (JP V0, addr)
            //
            // Jump to address NNN plus the value of register V0.
            JpV0 { nnn } => {
                cpu.pc = nnn as usize + cpu.registers[0] as usize;
                flow = Flow::Jump;
            }
            // Cxkk (RND Vx, byte)
            //
            // Set register VX to the result of bitwise AND between a
            // random number and KK.
            Rnd { x, kk } => {
                cpu.registers[x as usize] = kk & thread_rng().gen::<u8>();
            }
            // Dxyn (DRW Vx, Vy, nibble)
            //
            // Draw sprite to the display buffer, at coordinate as per
            // registers VX and VY. Sprite is encoded as 8 pixels wide,
            // N pixels high, stored in bits located in memory pointed
            // to by address register I.
            //
            // If the sprite is drawn outside of the display area, it is
            // wrapped around to the other side.
            //
            // If the drawing operation erases existing pixels in the
            // display buffer, register VF is set to 1, and set to 0 if
            // no display bits are unset. This is used for collision
            // detection.
            Drw { x, y, n } => {
                let addr = cpu.address as usize;
                let end = addr + n as usize;
                if end > MEM_SIZE {
                    return Err(Chip8Error::AddressOutOfRange {
                        address: end - 1,
                        pc,
                    });
                }

                let origin_x = cpu.registers[x as usize] as usize;
                let origin_y = cpu.registers[y as usize] as usize;
                let mut erased = false;

                for row in 0..n as usize {
                    // Each sprite byte is one row of 8 pixels, most
                    // significant bit leftmost.
                    let sprite_byte = cpu.ram[addr + row];

                    for col in 0..8 {
                        if sprite_byte & (0x80 >> col) != 0 {
                            erased |= cpu.display.flip(origin_x + col, origin_y + row);
                        }
                    }
                }

                // If a pixel was erased, then a collision occurred.
                cpu.registers[0xF] = erased as u8;
                flow = Flow::Draw;
            }
            // Ex9E (SKP Vx)
            //
            // Skip the next instruction if the key with the value of
            // VX is pressed.
            Skp { x } => {
                if cpu.keypad.is_pressed(cpu.registers[x as usize]) {
                    cpu.pc += 2;
                }
            }
            // ExA1 (SKNP Vx)
            //
            // Skip the next instruction if the key with the value of
            // VX is not pressed.
            Sknp { x } => {
                if !cpu.keypad.is_pressed(cpu.registers[x as usize]) {
                    cpu.pc += 2;
                }
            }
            // Fx07 (LD Vx, DT)
            //
            // Set Vx = delay timer value.
            LdDelay { x } => {
                cpu.registers[x as usize] = cpu.delay_timer;
            }
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            // Instruction execution stops until a fresh press edge is
            // observed; the frame timers keep counting down.
            LdKey { x } => match cpu.keypad.take_edge() {
                Some(key) => {
                    cpu.registers[x as usize] = key;
                    cpu.key_wait = false;
                }
                None => {
                    // Rewind the program counter to stall the machine.
                    cpu.pc -= 2;
                    cpu.key_wait = true;
                    flow = Flow::KeyWait;
                }
            },
            // Fx15 (LD DT, Vx)
            //
            // Set delay timer = Vx.
            SetDelay { x } => {
                cpu.delay_timer = cpu.registers[x as usize];
            }
            // Fx18 (LD ST, Vx)
            //
            // Set sound timer = Vx.
            SetSound { x } => {
                cpu.sound_timer = cpu.registers[x as usize];
                cpu.buzzer_state = cpu.sound_timer > 0;
                flow = Flow::Sound;
            }
            // Fx1E (ADD I, Vx)
            //
            // Add Vx to I.
            AddI { x } => {
                let value = cpu.registers[x as usize] as u16;
                cpu.address = cpu.address.wrapping_add(value);
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of the fontset sprite for digit Vx.
            LdFont { x } => {
                let digit = cpu.registers[x as usize] as usize;
                cpu.address = (FONTSET_START + digit * FONTSET_HEIGHT) as Address;
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            Bcd { x } => {
                let addr = cpu.address as usize;
                if addr + 3 > MEM_SIZE {
                    return Err(Chip8Error::AddressOutOfRange {
                        address: addr + 2,
                        pc,
                    });
                }

                let value = cpu.registers[x as usize];
                cpu.ram[addr] = value / 100 % 10;
                cpu.ram[addr + 1] = value / 10 % 10;
                cpu.ram[addr + 2] = value % 10;
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            Store { x } => {
                let addr = cpu.address as usize;
                let count = x as usize + 1;
                if addr + count > MEM_SIZE {
                    return Err(Chip8Error::AddressOutOfRange {
                        address: addr + count - 1,
                        pc,
                    });
                }

                cpu.ram[addr..addr + count].copy_from_slice(&cpu.registers[..count]);
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            Load { x } => {
                let addr = cpu.address as usize;
                let count = x as usize + 1;
                if addr + count > MEM_SIZE {
                    return Err(Chip8Error::AddressOutOfRange {
                        address: addr + count - 1,
                        pc,
                    });
                }

                cpu.registers[..count].copy_from_slice(&cpu.ram[addr..addr + count]);
            }
        }

        Ok(flow)
    }
}

/// Troubleshooting
impl Chip8Vm {
    /// Returns the program area of memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let iter = self
            .cpu
            .ram
            .iter()
            .enumerate()
            .skip(MEM_START)
            .take(count)
            .step_by(2);
        let mut buf = String::new();

        for (i, op) in iter {
            writeln!(buf, "{:04X}: {:02X}{:02X}", i, op, self.cpu.ram[i + 1])?;
        }

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(pc: usize, instr: &Instr) {
    log::trace!("{pc:04X}: {instr}");
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: usize, _: &Instr) {}
