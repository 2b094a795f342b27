//! Channel command stream: opcodes, delay operands and a decoder

use crate::effects::EffectKind;
use crate::error::{Error, Result};
use serde::Serialize;

/// Channel command opcodes
pub mod opcode {
    /// Note with a length operand, 0x00-0x0B
    pub const NOTE: u8 = 0x00;
    /// Rest (key off)
    pub const REST: u8 = 0x0C;
    /// Rest without key off
    pub const REST2: u8 = 0x0D;
    /// Absolute octave, low nibble is the octave
    pub const OCTAVE: u8 = 0x10;
    /// Flag: octave up, then play with the current length
    pub const OCTUP: u8 = 0x20;
    /// Set volume, one operand
    pub const VOLUME: u8 = 0x30;
    /// Flag: octave down, then play with the current length
    pub const OCTDN: u8 = 0x40;
    /// Flag: play with the current length
    pub const NOTE2: u8 = 0x80;
    /// Enable a macro; kind is added to the opcode, key is the operand
    pub const EFFECT_ON: u8 = 0xE0;
    /// Disable a macro, operand is the kind
    pub const EFFECT_OFF: u8 = 0xF0;
    /// Jump to a byte offset in the channel, little-endian operand
    pub const JMP: u8 = 0xF9;
    pub const END: u8 = 0xFF;
}

/// Encode a (scaled) delay as a 2- or 3-byte operand.
///
/// The top bit of the first byte marks the 3-byte form.
pub fn split_length(n: i64, scale: i64) -> Vec<u8> {
    if n <= 127 * scale {
        vec![(n / 0x100) as u8, (n & 0xFF) as u8]
    } else {
        vec![
            ((n / 0x8000) as u8) | 0x80,
            ((n / 0x100) & 0x7F) as u8,
            (n & 0xFF) as u8,
        ]
    }
}

/// Decode a delay operand, returning the value and the bytes consumed
pub fn decode_length(bytes: &[u8]) -> Option<(i64, usize)> {
    let first = i64::from(*bytes.first()?);
    if first & 0x80 != 0 {
        let mid = i64::from(*bytes.get(1)?);
        let low = i64::from(*bytes.get(2)?);
        Some((((first & 0x7F) << 15) | ((mid & 0x7F) << 8) | low, 3))
    } else {
        let low = i64::from(*bytes.get(1)?);
        Some(((first << 8) | low, 2))
    }
}

/// A decoded channel command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Note { pitch: u8, length: i64 },
    NoteShort { pitch: u8 },
    NoteOctaveUp { pitch: u8 },
    NoteOctaveDown { pitch: u8 },
    Rest { length: i64 },
    RestShort,
    Wait { length: i64 },
    WaitShort,
    Octave { octave: u8 },
    Volume { volume: u8 },
    EffectOn { kind: EffectKind, key: u8 },
    EffectOff { kind: EffectKind },
    Jump { offset: u16 },
    End,
}

/// Command stream reader
pub struct CommandReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> CommandReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Stream {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| self.error("Unexpected end of data"))?;
        self.pos += 1;
        Ok(b)
    }

    fn read_length(&mut self) -> Result<i64> {
        let (value, used) = decode_length(&self.data[self.pos.min(self.data.len())..])
            .ok_or_else(|| self.error("Truncated length operand"))?;
        self.pos += used;
        Ok(value)
    }

    /// Decode every command up to and including the first END or JMP
    pub fn read_all(&mut self) -> Result<Vec<Command>> {
        let mut commands = Vec::new();
        while !self.is_eof() {
            let cmd = self.read_command()?;
            commands.push(cmd);
            if matches!(cmd, Command::End | Command::Jump { .. }) {
                break;
            }
        }
        Ok(commands)
    }

    pub fn read_command(&mut self) -> Result<Command> {
        let op = self.read_u8()?;

        let cmd = match op {
            opcode::END => Command::End,
            opcode::JMP => {
                let lo = self.read_u8()?;
                let hi = self.read_u8()?;
                Command::Jump {
                    offset: u16::from_le_bytes([lo, hi]),
                }
            }
            opcode::EFFECT_OFF => {
                let index = self.read_u8()?;
                let kind = EffectKind::from_index(usize::from(index))
                    .ok_or_else(|| self.error(format!("Unknown effect kind {}", index)))?;
                Command::EffectOff { kind }
            }
            opcode::EFFECT_ON..=0xEF => {
                let kind = EffectKind::from_index(usize::from(op - opcode::EFFECT_ON))
                    .ok_or_else(|| self.error(format!("Unknown opcode ${:02X}", op)))?;
                let key = self.read_u8()?;
                Command::EffectOn { kind, key }
            }
            opcode::VOLUME => Command::Volume {
                volume: self.read_u8()?,
            },
            0x10..=0x1F => Command::Octave { octave: op & 0x0F },
            _ => self.read_note(op)?,
        };

        Ok(cmd)
    }

    fn read_note(&mut self, op: u8) -> Result<Command> {
        let pitch = op & 0x0F;
        let flags = op & 0xF0;
        let cmd = match (pitch, flags) {
            (0..=11, 0) => Command::Note {
                pitch,
                length: self.read_length()?,
            },
            (0..=11, opcode::NOTE2) => Command::NoteShort { pitch },
            (0..=11, opcode::OCTUP) => Command::NoteOctaveUp { pitch },
            (0..=11, opcode::OCTDN) => Command::NoteOctaveDown { pitch },
            (opcode::REST, 0) => Command::Rest {
                length: self.read_length()?,
            },
            (opcode::REST, opcode::NOTE2) => Command::RestShort,
            (opcode::REST2, 0) => Command::Wait {
                length: self.read_length()?,
            },
            (opcode::REST2, opcode::NOTE2) => Command::WaitShort,
            _ => {
                self.pos -= 1;
                return Err(self.error(format!("Unknown opcode ${:02X}", op)));
            }
        };
        Ok(cmd)
    }
}
