//! Playback-side macro stepping
//!
//! This is the model of what a driver does with the macros referenced by a
//! command stream. It is not emitted; it fixes the stepping contract the
//! encoder has to stay compatible with.

use super::{EffectKind, ParamList, ParamValue};
use crate::compiler::context::CompilationContext;
use crate::compiler::stream::Command;
use crate::error::Result;

/// Flag in a macro id selecting per-note stepping
pub const EVERY_NOTE: u8 = 0x80;

/// Number of FM operators with their own volume slot
pub const OPERATORS: usize = 4;

/// What caused a macro step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    EveryFrame,
    EveryNote,
}

impl Trigger {
    /// Stepping granularity encoded in a macro id
    pub fn from_id(id: u8) -> Self {
        if id & EVERY_NOTE != 0 {
            Self::EveryNote
        } else {
            Self::EveryFrame
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpeggioMode {
    /// Each value replaces the note offset
    Absolute,
    /// Each value is added to the running note offset
    Cumulative,
}

/// Channel value a macro drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroTarget {
    Arpeggio(ArpeggioMode),
    Vibrato,
    FreqSlide,
    VolumeSlide,
    VolumeMacro,
    DutyMacro,
}

/// Decoded channel state a driver keeps between frames
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelState {
    pub note: i32,
    pub octave: i32,
    pub duty: i32,
    pub volume: i32,
    pub note_offset: i32,
    pub vibrato_offset: i32,
    pub freq_offset: i32,
    pub operator_volume: [i32; OPERATORS],
    /// Operator targeted by volume slides; `None` broadcasts to all
    pub selected_operator: Option<usize>,
    /// A new note starts on this update
    pub note_on: bool,
    /// Only an effect value changed; the chip needs a value re-trigger
    pub value_changed: bool,
}

impl ChannelState {
    /// Note number including octave and arpeggio offset
    pub fn effective_note(&self) -> i32 {
        self.octave * 12 + self.note + self.note_offset
    }

    fn mark_changed(&mut self) {
        if !self.note_on {
            self.value_changed = true;
        }
    }
}

/// A parameter list bound to a channel value
#[derive(Debug, Clone)]
pub struct EffectMacro {
    pub target: MacroTarget,
    pub id: u8,
    pub enabled: bool,
    params: ParamList,
}

impl EffectMacro {
    pub fn new(target: MacroTarget, id: u8, mut params: ParamList) -> Self {
        params.rewind();
        Self {
            target,
            id,
            enabled: true,
            params,
        }
    }

    pub fn granularity(&self) -> Trigger {
        Trigger::from_id(self.id)
    }

    pub fn step(&mut self, trigger: Trigger, chn: &mut ChannelState) {
        if !self.enabled {
            return;
        }
        let granularity = self.granularity();
        if trigger == Trigger::EveryNote && granularity == Trigger::EveryFrame {
            self.params.rewind();
        }
        if trigger == Trigger::EveryNote || granularity == Trigger::EveryFrame {
            // text parameters never drive a channel value
            if let Some(ParamValue::Int(value)) = self.params.next_value() {
                self.apply(value as i32, trigger, chn);
            }
        }
    }

    fn apply(&self, value: i32, trigger: Trigger, chn: &mut ChannelState) {
        let resync = self.granularity() != trigger;
        match self.target {
            MacroTarget::Arpeggio(mode) => {
                let before = chn.note_offset;
                chn.note_offset = match mode {
                    ArpeggioMode::Cumulative if !resync => before + value,
                    _ => value,
                };
                if chn.note_offset != before {
                    chn.mark_changed();
                }
            }
            MacroTarget::FreqSlide => {
                let before = chn.freq_offset;
                chn.freq_offset = if resync { value } else { before + value };
                if chn.freq_offset != before {
                    chn.mark_changed();
                }
            }
            MacroTarget::Vibrato => {
                if chn.vibrato_offset != value {
                    chn.vibrato_offset = value;
                    chn.mark_changed();
                }
            }
            MacroTarget::VolumeSlide => {
                match chn.selected_operator {
                    Some(op) if op < OPERATORS => chn.operator_volume[op] = value,
                    _ => chn.operator_volume = [value; OPERATORS],
                }
                chn.mark_changed();
            }
            MacroTarget::VolumeMacro => {
                if chn.volume != value {
                    chn.volume = value;
                    chn.mark_changed();
                }
            }
            MacroTarget::DutyMacro => {
                if chn.duty != value {
                    chn.duty = value;
                    chn.mark_changed();
                }
            }
        }
    }
}

/// Channel state plus the macros attached to it
#[derive(Debug, Clone, Default)]
pub struct PlaybackChannel {
    pub state: ChannelState,
    macros: Vec<EffectMacro>,
}

impl PlaybackChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a macro, replacing one that drives the same value
    pub fn attach(&mut self, m: EffectMacro) {
        let same = |a: MacroTarget, b: MacroTarget| {
            std::mem::discriminant(&a) == std::mem::discriminant(&b)
        };
        self.macros.retain(|old| !same(old.target, m.target));
        self.macros.push(m);
    }

    pub fn detach(&mut self, target: MacroTarget) {
        self.macros
            .retain(|m| std::mem::discriminant(&m.target) != std::mem::discriminant(&target));
    }

    pub fn start_note(&mut self, note: i32, octave: i32) {
        self.state.note = note;
        self.state.octave = octave;
        self.state.note_on = true;
        self.state.value_changed = false;
        self.step_all(Trigger::EveryNote);
    }

    pub fn update_frame(&mut self) {
        self.state.note_on = false;
        self.state.value_changed = false;
        self.step_all(Trigger::EveryFrame);
    }

    fn step_all(&mut self, trigger: Trigger) {
        for m in &mut self.macros {
            m.step(trigger, &mut self.state);
        }
    }
}

/// A note as a driver would start it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayedNote {
    pub start_frame: i64,
    pub pitch: u8,
    pub octave: u8,
    pub frames: i64,
}

/// Result of playing a channel through to its end or loop jump
#[derive(Debug, Clone, Default)]
pub struct PlaybackLog {
    pub notes: Vec<PlayedNote>,
    /// Effective note number for every frame a note sounds
    pub pitch_trace: Vec<i32>,
    pub total_frames: i64,
    /// Channel state after the last command
    pub state: ChannelState,
}

/// Walks decoded channel commands the way a driver does
pub struct StreamPlayer<'a> {
    ctx: &'a CompilationContext,
    scale: i64,
    octave: u8,
    length: i64,
    /// Elapsed time in scaled units
    elapsed: i64,
    channel: PlaybackChannel,
    log: PlaybackLog,
}

impl<'a> StreamPlayer<'a> {
    pub fn new(ctx: &'a CompilationContext, scale: i64, octave: u8) -> Self {
        Self {
            ctx,
            scale: scale.max(1),
            octave,
            length: 0,
            elapsed: 0,
            channel: PlaybackChannel::new(),
            log: PlaybackLog::default(),
        }
    }

    pub fn play(mut self, commands: &[Command]) -> Result<PlaybackLog> {
        for command in commands {
            match *command {
                Command::Note { pitch, length } => {
                    self.length = length;
                    self.note(pitch);
                }
                Command::NoteShort { pitch } => self.note(pitch),
                Command::NoteOctaveUp { pitch } => {
                    self.octave = self.octave.saturating_add(1);
                    self.note(pitch);
                }
                Command::NoteOctaveDown { pitch } => {
                    self.octave = self.octave.saturating_sub(1);
                    self.note(pitch);
                }
                Command::Rest { length } | Command::Wait { length } => {
                    self.length = length;
                    self.advance(length, false);
                }
                Command::RestShort | Command::WaitShort => {
                    self.advance(self.length, false);
                }
                Command::Octave { octave } => self.octave = octave,
                Command::Volume { volume } => self.channel.state.volume = i32::from(volume),
                Command::EffectOn { kind, key } => self.enable(kind, key)?,
                Command::EffectOff { kind } => {
                    if let Some(target) = macro_target(kind, false) {
                        self.channel.detach(target);
                    }
                    if kind == EffectKind::VolumeMacro {
                        self.channel.detach(MacroTarget::VolumeSlide);
                    }
                }
                Command::Jump { .. } | Command::End => break,
            }
        }
        self.log.total_frames = self.elapsed / self.scale;
        self.log.state = self.channel.state.clone();
        Ok(self.log)
    }

    fn enable(&mut self, kind: EffectKind, id: u8) -> Result<()> {
        let registry = self.ctx.registry(kind);
        let key = u32::from(id & !EVERY_NOTE);
        let entry = registry
            .get(key)
            .ok_or(crate::error::Error::UndefinedEffect { kind, key })?;
        let flag = |name: &str| matches!(entry.extra.get(name), Some(ParamValue::Int(v)) if *v != 0);
        let target = match kind {
            // a volume macro marked `slide` drives operator volumes instead
            EffectKind::VolumeMacro if flag("slide") => {
                self.channel.state.selected_operator = match entry.extra.get("operator") {
                    Some(ParamValue::Int(op)) => usize::try_from(*op).ok(),
                    _ => None,
                };
                Some(MacroTarget::VolumeSlide)
            }
            _ => macro_target(kind, flag("cumulative")),
        };
        if let Some(target) = target {
            self.channel
                .attach(EffectMacro::new(target, id, entry.params.clone()));
        }
        Ok(())
    }

    fn note(&mut self, pitch: u8) {
        let start = self.elapsed / self.scale;
        self.channel
            .start_note(i32::from(pitch), i32::from(self.octave));
        let frames = self.advance(self.length, true);
        self.log.notes.push(PlayedNote {
            start_frame: start,
            pitch,
            octave: self.octave,
            frames,
        });
    }

    /// Advance by a scaled delay, stepping macros on each whole frame
    fn advance(&mut self, length: i64, sounding: bool) -> i64 {
        let before = self.elapsed / self.scale;
        self.elapsed += length;
        let frames = self.elapsed / self.scale - before;
        for i in 0..frames {
            if sounding {
                if i > 0 {
                    self.channel.update_frame();
                }
                self.log.pitch_trace.push(self.channel.state.effective_note());
            }
        }
        frames
    }
}

fn macro_target(kind: EffectKind, cumulative: bool) -> Option<MacroTarget> {
    match kind {
        EffectKind::Arpeggio => Some(MacroTarget::Arpeggio(if cumulative {
            ArpeggioMode::Cumulative
        } else {
            ArpeggioMode::Absolute
        })),
        EffectKind::Vibrato => Some(MacroTarget::Vibrato),
        EffectKind::PitchMacro => Some(MacroTarget::FreqSlide),
        EffectKind::VolumeMacro => Some(MacroTarget::VolumeMacro),
        EffectKind::DutyMacro => Some(MacroTarget::DutyMacro),
        _ => None,
    }
}
