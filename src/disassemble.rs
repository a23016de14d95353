use crate::command::{BackReference, Command, FormatError};
use serde::Deserialize;
use std::{fmt, io::Write};
use thiserror::Error;

pub const NTSC_CLOCK: u32 = 3_579_545;
pub const PAL_CLOCK: u32 = 3_546_893;

const REGISTER_COUNT: usize = 8;
const NOISE_REGISTER: u8 = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clock {
    #[default]
    Ntsc,
    Pal,
}

impl Clock {
    pub const fn hz(self) -> u32 {
        match self {
            Clock::Ntsc => NTSC_CLOCK,
            Clock::Pal => PAL_CLOCK,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisassembleOptions {
    /// Prefix every line with the offset of its first byte
    pub show_offset: bool,
    /// Print the raw bytes of every command
    pub show_bytes: bool,
    /// Replace wait lines with one ruler per frame
    pub show_frame_markers: bool,
    pub clock: Clock,
}

impl DisassembleOptions {
    pub fn parse(src: &str) -> Result<Self, toml::de::Error> {
        toml::de::from_str(src)
    }
}

#[derive(Error, Debug)]
pub enum DisassembleError {
    #[error("Invalid command stream")]
    Format(#[from] FormatError),
    #[error("Failed to write disassembly")]
    Io(#[from] std::io::Error),
}

/// Register file as seen by the chip: one latched register, eight values.
#[derive(Debug, Clone, Default)]
struct Registers {
    latched: u8,
    values: [u16; REGISTER_COUNT],
}

impl Registers {
    fn latch(&mut self, register: u8, data: u8) -> u16 {
        self.latched = register;

        let value = &mut self.values[usize::from(register)];
        *value = (*value & !0x00f) | u16::from(data & 0x0f);
        *value
    }

    fn data(&mut self, data: u8) -> u16 {
        let value = &mut self.values[usize::from(self.latched)];
        *value = (*value & 0x00f) | (u16::from(data) << 4);
        *value
    }
}

/// What a register write does to the sound.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Effect {
    Tone { channel: u8, period: u16, clock: Clock },
    Attenuation { channel: u8, level: u16 },
    Noise { white: bool, rate: u16 },
}

impl Effect {
    fn new(register: u8, value: u16, clock: Clock) -> Self {
        let channel = register >> 1;

        if register & 1 != 0 {
            Self::Attenuation {
                channel,
                level: value & 0x0f,
            }
        } else if register == NOISE_REGISTER {
            Self::Noise {
                white: value & 0x04 != 0,
                rate: value & 0x03,
            }
        } else {
            Self::Tone {
                channel,
                period: value & 0x3ff,
                clock,
            }
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Effect::Tone {
                channel,
                period,
                clock,
            } => {
                let mut hz = clock.hz() as f32 / (32.0 * f32::from(period));
                let mut unit = " ";
                if hz >= 1000.0 {
                    hz /= 1000.0;
                    unit = "k";
                }

                write!(
                    f,
                    "channel {channel} tone        => {period:5} ({hz:6.2} {unit}Hz)"
                )
            }
            Effect::Attenuation {
                channel,
                level: level @ 15,
            } => write!(f, "channel {channel} attenuation => {level:5} (silent)"),
            Effect::Attenuation { channel, level } => write!(
                f,
                "channel {channel} attenuation => {level:5} ({:3} dB)",
                level * 2
            ),
            Effect::Noise { white, rate } => {
                let feedback = if white { "white   " } else { "periodic" };
                let rate = match rate {
                    0 => "ϕ/2",
                    1 => "ϕ/4",
                    2 => "ϕ/8",
                    _ => "ch 2 freq",
                };

                write!(f, "noise                 => {feedback} @ {rate}")
            }
        }
    }
}

/// Renders a command stream, compressed or not, one command at a time.
///
/// Iterating yields the text for each command (without a trailing newline). The first
/// format error ends the iteration.
#[derive(Debug, Clone)]
pub struct Disassembler<'a> {
    src: &'a [u8],
    options: DisassembleOptions,
    registers: Registers,

    read_index: usize,
    failed: bool,
}

impl<'a> Disassembler<'a> {
    pub fn new(src: &'a [u8], options: DisassembleOptions) -> Self {
        Self {
            src,
            options,
            registers: Registers::default(),
            read_index: 0,
            failed: false,
        }
    }

    pub fn disassemble(self) -> Result<String, FormatError> {
        let mut out = String::new();
        for line in self {
            out.push_str(&line?);
            out.push('\n');
        }

        Ok(out)
    }

    /// Writes lines as they are decoded. Lines before a format error are kept.
    pub fn write_to<W: Write>(self, dst: &mut W) -> Result<(), DisassembleError> {
        for line in self {
            writeln!(dst, "{}", line?)?;
        }

        Ok(())
    }

    fn render(&mut self, offset: usize, command: Command, bytes: &[u8]) -> String {
        match command {
            Command::Latch { register, data } => {
                let value = self.registers.latch(register, data);
                let effect = Effect::new(register, value, self.options.clock);
                self.line(offset, bytes, true, &effect.to_string())
            }
            Command::Data(data) => {
                let register = self.registers.latched;
                let value = self.registers.data(data);
                let effect = Effect::new(register, value, self.options.clock);
                self.line(offset, bytes, false, &effect.to_string())
            }
            Command::Wait(frames) => {
                // padded so singular and plural lines line up
                let plural = if frames == 1 { " " } else { "s" };

                if self.options.show_frame_markers {
                    let ruler = "-".repeat(25);
                    (0..=frames)
                        .map(|frame| {
                            format!(
                                "{ruler} wait for {frames:2} frame{plural} ({frame} of {frames}) {ruler}"
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                } else {
                    self.line(
                        offset,
                        bytes,
                        false,
                        &format!("wait for {frames} frame{plural}"),
                    )
                }
            }
            Command::End => self.line(offset, bytes, false, "end of file"),
            Command::Loop => self.line(offset, bytes, false, "loop marker"),
            Command::BackReference(token) => self.line(offset, bytes, false, &describe(token)),
        }
    }

    fn line(&self, offset: usize, bytes: &[u8], latch: bool, message: &str) -> String {
        let mut line = String::new();

        if self.options.show_offset {
            line.push_str(&format!("{offset:04x}:    "));
        }

        line.push_str(if latch { "* " } else { "  " });

        if self.options.show_bytes {
            let hex = bytes
                .iter()
                .map(|byte| format!("{byte:#04x}"))
                .collect::<Vec<_>>()
                .join(" ");
            line.push_str(&format!("{hex:<15}"));
        }

        line.push_str(message);
        line
    }
}

fn describe(token: BackReference) -> String {
    let source = token.source();
    format!(
        "repeat block from {:04x}:{:04x} ({} bytes)",
        source.start,
        source.end,
        token.length
    )
}

impl Iterator for Disassembler<'_> {
    type Item = Result<String, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.read_index >= self.src.len() {
            return None;
        }

        let offset = self.read_index;
        match Command::read(self.src, offset) {
            Ok((command, len)) => {
                self.read_index += len;
                let src = self.src;
                Some(Ok(self.render(offset, command, &src[offset..offset + len])))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
