//! Note length calculation: ticks and tempo to frame counts

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Fixed-point multiplier for fractional delays
pub const FRACTIONAL_SCALE: i64 = 256;

/// Largest whole-frame delay a 3-byte operand carries
pub const MAX_DELAY: i64 = 0x3FFF;

/// Ticks (32nd notes) per quarter note
pub const TICKS_PER_QUARTER: i64 = 8;

/// Where the silent tail of a note goes and how long it is
///
/// `Normal`/`Negated` hold a fraction of the note length in eighths (8 means
/// the note sounds for its whole length). `Frames`/`NegatedFrames` hold an
/// absolute frame count. Negated policies place the rest before the note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "value", rename_all = "snake_case")]
pub enum Cutoff {
    Normal(i32),
    Frames(i32),
    Negated(i32),
    NegatedFrames(i32),
}

impl Cutoff {
    pub fn value(self) -> i32 {
        match self {
            Self::Normal(v) | Self::Frames(v) | Self::Negated(v) | Self::NegatedFrames(v) => v,
        }
    }

    pub fn is_negated(self) -> bool {
        matches!(self, Self::Negated(_) | Self::NegatedFrames(_))
    }

    pub fn is_absolute(self) -> bool {
        matches!(self, Self::Frames(_) | Self::NegatedFrames(_))
    }
}

impl Default for Cutoff {
    fn default() -> Self {
        Self::Normal(8)
    }
}

/// Frame rate of the playback driver and its delay precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameClock {
    pub refresh_hz: u32,
    pub fractional: bool,
}

impl FrameClock {
    pub fn new(refresh_hz: u32, fractional: bool) -> Self {
        Self {
            refresh_hz,
            fractional,
        }
    }

    pub fn scale(&self) -> i64 {
        if self.fractional {
            FRACTIONAL_SCALE
        } else {
            1
        }
    }

    /// Largest active length in scaled units
    pub fn max_length(&self) -> i64 {
        max_length(self.scale())
    }
}

pub fn max_length(scale: i64) -> i64 {
    MAX_DELAY * scale + (scale - 1)
}

/// Something about a computed length the caller should report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthWarning {
    TooShort,
    Clamped { requested: i64 },
}

/// A note length split into its sounding part and its cutoff rest
///
/// All values are in scaled units (frames times `scale`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteLength {
    pub active: i64,
    pub cutoff: i64,
    /// Length before the cutoff split
    pub total: i64,
    pub scale: i64,
    pub warning: Option<LengthWarning>,
}

/// Frames (scaled) per 32nd note at a tempo
pub fn frames_per_tick(tempo: u32, clock: FrameClock) -> Result<i64> {
    if tempo == 0 {
        return Err(Error::InvalidTempo(tempo));
    }
    let per_minute = i64::from(clock.refresh_hz) * 60 * clock.scale();
    Ok(per_minute / (i64::from(tempo) * TICKS_PER_QUARTER))
}

/// Convert a length in ticks into active and cutoff frames.
///
/// A negative active or cutoff part is returned as an error with an empty
/// channel name; callers fill in the channel they were encoding.
pub fn note_length(ticks: u32, tempo: u32, clock: FrameClock, cutoff: Cutoff) -> Result<NoteLength> {
    let scale = clock.scale();
    let total = frames_per_tick(tempo, clock)? * i64::from(ticks);
    let value = i64::from(cutoff.value());

    let cut = if cutoff.is_absolute() {
        (value * scale).min(total)
    } else {
        (total * (8 - value)).div_euclid(8)
    };
    let mut active = total - cut;

    if active < 0 || cut < 0 {
        return Err(Error::NegativeLength {
            channel: String::new(),
            active,
            cutoff: cut,
        });
    }

    let mut warning = None;
    let max = max_length(scale);
    if active > max {
        warning = Some(LengthWarning::Clamped { requested: active });
        active = max;
    } else if active < scale {
        warning = Some(LengthWarning::TooShort);
    }

    Ok(NoteLength {
        active,
        cutoff: cut,
        total,
        scale,
        warning,
    })
}
