//! Channel events produced by the MML front end

use super::channel::{Channel, Pitch};
use super::context::CompilationContext;
use super::timing::Cutoff;
use crate::effects::EffectKind;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One parsed MML token for a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Event {
    /// Semitone number, reduced modulo 12
    Note { pitch: i32, ticks: u32 },
    Rest { ticks: u32 },
    Wait { ticks: u32 },
    Tie { ticks: u32 },
    Octave { octave: i32 },
    OctaveUp,
    OctaveDown,
    Tempo { bpm: u32 },
    Volume { volume: i32 },
    Cutoff { cutoff: Cutoff },
    TupletStart,
    TupletEnd { ticks: u32 },
    LoopPoint,
    /// End of a musical block; forces a pending octave change out
    BlockEnd,
    Effect {
        kind: EffectKind,
        key: u32,
        #[serde(default)]
        every_note: bool,
    },
    EffectOff { kind: EffectKind },
}

impl Event {
    pub fn apply(&self, channel: &mut Channel, ctx: &mut CompilationContext) -> Result<()> {
        match *self {
            Event::Note { pitch, ticks } => channel.add_note(Pitch::from_class(pitch), ticks, ctx),
            Event::Rest { ticks } => channel.add_note(Pitch::Rest, ticks, ctx),
            Event::Wait { ticks } => channel.add_note(Pitch::Wait, ticks, ctx),
            Event::Tie { ticks } => channel.tie(ticks, ctx),
            Event::Octave { octave } => channel.set_octave(octave),
            Event::OctaveUp => channel.octave_up(),
            Event::OctaveDown => channel.octave_down(),
            Event::Tempo { bpm } => channel.set_tempo(bpm, ctx),
            Event::Volume { volume } => channel.set_volume(volume, ctx),
            Event::Cutoff { cutoff } => channel.set_cutoff(cutoff, ctx),
            Event::TupletStart => channel.begin_tuplet(ctx),
            Event::TupletEnd { ticks } => channel.end_tuplet(ticks, ctx),
            Event::LoopPoint => channel.set_loop_point(ctx),
            Event::BlockEnd => channel.flush_octave_change(ctx),
            Event::Effect {
                kind,
                key,
                every_note,
            } => channel.use_effect(kind, key, every_note, ctx),
            Event::EffectOff { kind } => channel.disable_effect(kind, ctx),
        }
    }
}
