//! Channel state management and command stream encoding

use super::context::CompilationContext;
use super::stream::{opcode, split_length};
use super::timing::{
    frames_per_tick, max_length, note_length, Cutoff, FrameClock, LengthWarning, NoteLength,
};
use crate::chips::ChannelCaps;
use crate::diagnostics::Warning;
use crate::effects::runtime::EVERY_NOTE;
use crate::effects::{EffectKind, EffectSet};
use crate::error::{Error, Result};

/// Octave the driver assumes when a channel starts
pub const DEFAULT_OCTAVE: u8 = 4;

/// Highest octave the OCTAVE opcode can carry
const OCTAVE_LIMIT: u8 = 0x0F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pitch {
    /// Pitch class 0..=11
    Note(u8),
    Rest,
    /// Rest that keeps the previous note sounding (REST2)
    Wait,
}

impl Pitch {
    /// Reduce any semitone number to its pitch class
    pub fn from_class(class: i32) -> Self {
        Self::Note(class.rem_euclid(12) as u8)
    }

    fn opcode(self) -> u8 {
        match self {
            Self::Note(p) => opcode::NOTE + p,
            Self::Rest => opcode::REST,
            Self::Wait => opcode::REST2,
        }
    }
}

/// A parsed note not yet written to the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub pitch: Pitch,
    pub ticks: u32,
    /// Octave selected when the note was parsed
    pub octave: u8,
}

/// How the driver's octave must change before the next note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OctaveChange {
    None,
    Up,
    Down,
    Absolute(u8),
}

/// Buffered element of an open tuplet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TupletEntry {
    Note(Pitch),
    /// Raw command bytes that take no time
    Marker(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Normal,
    Tuplet(Vec<TupletEntry>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Physical(ChannelCaps),
    /// Shared subsequences; no tempo or cutoff of its own
    Pattern,
}

/// One channel's encoder state and output buffer
#[derive(Debug, Clone)]
pub struct Channel {
    name: String,
    kind: ChannelKind,
    clock: FrameClock,
    tempo: u32,
    cutoff: Cutoff,
    octave: u8,
    /// Octave the driver will be in after the bytes written so far
    driver_octave: Option<u8>,
    volume: Option<u8>,
    pending: Option<Note>,
    mode: Mode,
    /// Delay operand the driver will reuse for short-form commands
    current_length: Option<i64>,
    data: Vec<u8>,
    ticks: u64,
    /// Elapsed time in scaled units
    elapsed: i64,
    loop_offset: Option<usize>,
    loop_ticks: Option<u64>,
    has_notes: bool,
    effects_used: EffectSet,
    finished: bool,
}

impl Channel {
    pub fn new(name: impl Into<String>, caps: ChannelCaps, clock: FrameClock, tempo: u32) -> Self {
        Self::with_kind(name.into(), ChannelKind::Physical(caps), clock, tempo)
    }

    /// The virtual channel holding shared patterns
    pub fn pattern(name: impl Into<String>, clock: FrameClock, tempo: u32) -> Self {
        Self::with_kind(name.into(), ChannelKind::Pattern, clock, tempo)
    }

    fn with_kind(name: String, kind: ChannelKind, clock: FrameClock, tempo: u32) -> Self {
        Self {
            name,
            kind,
            clock,
            tempo,
            cutoff: Cutoff::default(),
            octave: DEFAULT_OCTAVE,
            driver_octave: Some(DEFAULT_OCTAVE),
            volume: None,
            pending: None,
            mode: Mode::Normal,
            current_length: None,
            data: Vec::new(),
            ticks: 0,
            elapsed: 0,
            loop_offset: None,
            loop_ticks: None,
            has_notes: false,
            effects_used: EffectSet::NONE,
            finished: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn is_virtual(&self) -> bool {
        self.kind == ChannelKind::Pattern
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn scale(&self) -> i64 {
        self.clock.scale()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Whole frames written so far
    pub fn frames(&self) -> i64 {
        self.elapsed / self.scale()
    }

    pub fn loop_offset(&self) -> Option<usize> {
        self.loop_offset
    }

    pub fn loop_ticks(&self) -> Option<u64> {
        self.loop_ticks
    }

    pub fn has_notes(&self) -> bool {
        self.has_notes
    }

    pub fn effects_used(&self) -> EffectSet {
        self.effects_used
    }

    pub fn octave(&self) -> u8 {
        self.octave
    }

    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    pub fn cutoff(&self) -> Cutoff {
        self.cutoff
    }

    pub fn volume(&self) -> Option<u8> {
        self.volume
    }

    pub fn in_tuplet(&self) -> bool {
        matches!(self.mode, Mode::Tuplet(_))
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn octave_range(&self) -> (u8, u8) {
        match self.kind {
            ChannelKind::Physical(caps) => (caps.min_octave, caps.max_octave),
            ChannelKind::Pattern => (0, OCTAVE_LIMIT),
        }
    }

    fn out_of_range(&self, what: &'static str, value: i64, min: i64, max: i64) -> Error {
        Error::OutOfRange {
            channel: self.name.clone(),
            what,
            value,
            min,
            max,
        }
    }

    pub fn set_tempo(&mut self, bpm: u32, ctx: &mut CompilationContext) -> Result<()> {
        if self.is_virtual() {
            log::debug!("{}: tempo change ignored on pattern channel", self.name);
            return Ok(());
        }
        if bpm == 0 {
            return Err(Error::InvalidTempo(bpm));
        }
        self.flush(ctx)?;
        self.tempo = bpm;
        Ok(())
    }

    pub fn set_cutoff(&mut self, cutoff: Cutoff, ctx: &mut CompilationContext) -> Result<()> {
        if self.is_virtual() {
            log::debug!("{}: cutoff change ignored on pattern channel", self.name);
            return Ok(());
        }
        self.flush(ctx)?;
        self.cutoff = cutoff;
        Ok(())
    }

    pub fn set_octave(&mut self, octave: i32) -> Result<()> {
        let (min, max) = self.octave_range();
        if octave < i32::from(min) || octave > i32::from(max) {
            return Err(self.out_of_range("octave", i64::from(octave), i64::from(min), i64::from(max)));
        }
        self.octave = octave as u8;
        Ok(())
    }

    pub fn octave_up(&mut self) -> Result<()> {
        self.set_octave(i32::from(self.octave) + 1)
    }

    pub fn octave_down(&mut self) -> Result<()> {
        self.set_octave(i32::from(self.octave) - 1)
    }

    pub fn set_volume(&mut self, volume: i32, ctx: &mut CompilationContext) -> Result<()> {
        let max = match self.kind {
            ChannelKind::Physical(caps) => caps.max_volume,
            ChannelKind::Pattern => u8::MAX,
        };
        if volume < 0 || volume > i32::from(max) {
            return Err(self.out_of_range("volume", i64::from(volume), 0, i64::from(max)));
        }
        self.flush(ctx)?;
        self.emit(&[opcode::VOLUME, volume as u8]);
        self.volume = Some(volume as u8);
        Ok(())
    }

    /// Queue a note or rest. The previously queued one is written first.
    pub fn add_note(&mut self, pitch: Pitch, ticks: u32, ctx: &mut CompilationContext) -> Result<()> {
        if matches!(pitch, Pitch::Note(_)) {
            self.has_notes = true;
        }
        let note = Note {
            pitch,
            ticks,
            octave: self.octave,
        };

        if self.in_tuplet() {
            if matches!(pitch, Pitch::Note(_)) {
                self.mark_octave_in_tuplet(note.octave);
            }
            if let Mode::Tuplet(entries) = &mut self.mode {
                entries.push(TupletEntry::Note(pitch));
            }
            return Ok(());
        }

        self.flush(ctx)?;
        self.pending = Some(note);
        Ok(())
    }

    /// Extend the queued note. Without one, the time is a wait.
    pub fn tie(&mut self, ticks: u32, ctx: &mut CompilationContext) -> Result<()> {
        if self.in_tuplet() {
            return ctx.warn(Warning::TieInTuplet {
                channel: self.name.clone(),
            });
        }
        match &mut self.pending {
            Some(note) => note.ticks = note.ticks.saturating_add(ticks),
            None => self.add_note(Pitch::Wait, ticks, ctx)?,
        }
        Ok(())
    }

    /// Write the queued note, if any
    pub fn flush(&mut self, ctx: &mut CompilationContext) -> Result<()> {
        let Some(note) = self.pending.take() else {
            return Ok(());
        };
        self.ticks += u64::from(note.ticks);

        match note.pitch {
            Pitch::Note(pitch) => {
                let len = self.timed_length(note.ticks, ctx)?;
                if self.cutoff.is_negated() {
                    self.write_rest(opcode::REST, len.cutoff);
                    self.write_note(pitch, note.octave, len.active);
                } else {
                    self.write_note(pitch, note.octave, len.active);
                    self.write_rest(opcode::REST, len.cutoff);
                }
            }
            Pitch::Rest | Pitch::Wait => {
                let total = self.rest_length(note.ticks)?;
                self.write_rest(note.pitch.opcode(), total);
            }
        }
        Ok(())
    }

    /// Write a pending octave change on its own, at the end of a block
    pub fn flush_octave_change(&mut self, ctx: &mut CompilationContext) -> Result<()> {
        self.flush(ctx)?;
        if self.in_tuplet() {
            self.mark_octave_in_tuplet(self.octave);
        } else if self.octave_change(self.octave) != OctaveChange::None {
            self.emit(&[opcode::OCTAVE | self.octave]);
            self.driver_octave = Some(self.octave);
        }
        Ok(())
    }

    pub fn begin_tuplet(&mut self, ctx: &mut CompilationContext) -> Result<()> {
        if self.in_tuplet() {
            return Err(Error::TupletAlreadyOpen(self.name.clone()));
        }
        self.flush(ctx)?;
        self.mode = Mode::Tuplet(Vec::new());
        Ok(())
    }

    /// Close the open tuplet, spreading `ticks` over its notes
    pub fn end_tuplet(&mut self, ticks: u32, ctx: &mut CompilationContext) -> Result<()> {
        let entries = match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Tuplet(entries) => entries,
            Mode::Normal => return Err(Error::TupletNotOpen(self.name.clone())),
        };
        self.write_tuple(entries, ticks, ctx)
    }

    fn write_tuple(&mut self, entries: Vec<TupletEntry>, ticks: u32, ctx: &mut CompilationContext) -> Result<()> {
        self.ticks += u64::from(ticks);
        let timed: Vec<bool> = entries
            .iter()
            .map(|e| matches!(e, TupletEntry::Note(_)))
            .collect();

        if !timed.contains(&true) {
            for entry in &entries {
                if let TupletEntry::Marker(bytes) = entry {
                    self.data.extend_from_slice(bytes);
                }
            }
            let total = self.rest_length(ticks)?;
            self.write_rest(opcode::REST, total);
            return Ok(());
        }

        let len = self.timed_length(ticks, ctx)?;
        let frames = distribute_frames(len.active, &timed);

        if self.cutoff.is_negated() {
            self.write_rest(opcode::REST, len.cutoff);
        }
        for (entry, length) in entries.into_iter().zip(frames) {
            match entry {
                TupletEntry::Marker(bytes) => self.data.extend_from_slice(&bytes),
                TupletEntry::Note(Pitch::Note(pitch)) => {
                    self.write_with_length(opcode::NOTE + pitch, length, 0)
                }
                TupletEntry::Note(rest) => self.write_rest(rest.opcode(), length),
            }
        }
        if !self.cutoff.is_negated() {
            self.write_rest(opcode::REST, len.cutoff);
        }
        Ok(())
    }

    pub fn set_loop_point(&mut self, ctx: &mut CompilationContext) -> Result<()> {
        if self.in_tuplet() {
            return Err(Error::TupletAlreadyOpen(self.name.clone()));
        }
        self.flush(ctx)?;
        self.loop_offset = Some(self.data.len());
        self.loop_ticks = Some(self.ticks);
        // a jump back here arrives with whatever state the end left behind
        self.current_length = None;
        self.driver_octave = None;
        Ok(())
    }

    /// Switch an effect macro on. Channels without support ignore it.
    pub fn use_effect(
        &mut self,
        kind: EffectKind,
        key: u32,
        every_note: bool,
        ctx: &mut CompilationContext,
    ) -> Result<()> {
        if let ChannelKind::Physical(caps) = self.kind {
            if !caps.supports(kind) {
                return ctx.warn(Warning::UnsupportedEffect {
                    channel: self.name.clone(),
                    kind,
                });
            }
        }
        ctx.registry_mut(kind).add_ref(key)?;
        self.flush(ctx)?;
        let id = (key as u8) | if every_note { EVERY_NOTE } else { 0 };
        self.emit(&[opcode::EFFECT_ON + kind as u8, id]);
        self.effects_used.insert(kind);
        Ok(())
    }

    pub fn disable_effect(&mut self, kind: EffectKind, ctx: &mut CompilationContext) -> Result<()> {
        self.flush(ctx)?;
        self.emit(&[opcode::EFFECT_OFF, kind as u8]);
        Ok(())
    }

    /// Terminate the stream with a loop jump or END
    pub fn finish(&mut self, ctx: &mut CompilationContext) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.flush(ctx)?;
        if self.in_tuplet() {
            return Err(Error::UnterminatedTuplet(self.name.clone()));
        }
        match self.loop_offset {
            Some(offset) => {
                let [lo, hi] = u16::try_from(offset)
                    .map_err(|_| Error::LoopTooFar {
                        channel: self.name.clone(),
                        offset,
                    })?
                    .to_le_bytes();
                self.data.extend_from_slice(&[opcode::JMP, lo, hi]);
            }
            None => self.data.push(opcode::END),
        }
        self.finished = true;
        Ok(())
    }

    fn emit(&mut self, bytes: &[u8]) {
        match &mut self.mode {
            Mode::Normal => self.data.extend_from_slice(bytes),
            Mode::Tuplet(entries) => entries.push(TupletEntry::Marker(bytes.to_vec())),
        }
    }

    fn mark_octave_in_tuplet(&mut self, octave: u8) {
        if self.octave_change(octave) != OctaveChange::None {
            self.emit(&[opcode::OCTAVE | octave]);
            self.driver_octave = Some(octave);
        }
    }

    pub fn octave_change(&self, target: u8) -> OctaveChange {
        match self.driver_octave {
            Some(d) if d == target => OctaveChange::None,
            Some(d) if target == d + 1 => OctaveChange::Up,
            Some(d) if d == target + 1 => OctaveChange::Down,
            _ => OctaveChange::Absolute(target),
        }
    }

    fn timed_length(&self, ticks: u32, ctx: &mut CompilationContext) -> Result<NoteLength> {
        let len = note_length(ticks, self.tempo, self.clock, self.cutoff).map_err(|e| match e {
            Error::NegativeLength { active, cutoff, .. } => Error::NegativeLength {
                channel: self.name.clone(),
                active,
                cutoff,
            },
            other => other,
        })?;
        match len.warning {
            Some(LengthWarning::TooShort) => ctx.warn(Warning::NoteTooShort {
                channel: self.name.clone(),
                frames: len.active,
                scale: len.scale,
            })?,
            Some(LengthWarning::Clamped { requested }) => ctx.warn(Warning::NoteTooLong {
                channel: self.name.clone(),
                frames: requested,
                max: max_length(len.scale),
            })?,
            None => {}
        }
        Ok(len)
    }

    fn rest_length(&self, ticks: u32) -> Result<i64> {
        Ok(frames_per_tick(self.tempo, self.clock)? * i64::from(ticks))
    }

    fn write_note(&mut self, pitch: u8, octave: u8, length: i64) {
        let change = self.octave_change(octave);
        let op = opcode::NOTE + pitch;

        if self.current_length == Some(length) {
            match change {
                OctaveChange::None => self.data.push(op | opcode::NOTE2),
                OctaveChange::Up => self.data.push(op | opcode::OCTUP),
                OctaveChange::Down => self.data.push(op | opcode::OCTDN),
                OctaveChange::Absolute(o) => {
                    self.data.extend_from_slice(&[opcode::OCTAVE | o, op | opcode::NOTE2])
                }
            }
            self.elapsed += length;
        } else {
            if change != OctaveChange::None {
                self.data.push(opcode::OCTAVE | octave);
            }
            self.write_with_length(op, length, 0);
        }
        self.driver_octave = Some(octave);
    }

    /// Write a rest, split into several when longer than one operand holds
    fn write_rest(&mut self, op: u8, length: i64) {
        let max = max_length(self.scale());
        let mut remaining = length;
        while remaining > 0 {
            let chunk = remaining.min(max);
            self.write_with_length(op, chunk, 1);
            remaining -= chunk;
        }
    }

    fn write_with_length(&mut self, op: u8, length: i64, threshold: i64) {
        if length < threshold {
            return;
        }
        if self.current_length == Some(length) {
            self.data.push(op | opcode::NOTE2);
        } else {
            self.data.push(op);
            self.data.extend(split_length(length, self.scale()));
            self.current_length = Some(length);
        }
        self.elapsed += length;
    }
}

/// Spread `total` frames over the timed entries of a tuplet.
///
/// Every timed entry gets `total / k`; the first `total % k` of them, in
/// order, get one more. Untimed entries get zero.
pub fn distribute_frames(total: i64, timed: &[bool]) -> Vec<i64> {
    let k = timed.iter().filter(|t| **t).count() as i64;
    if k == 0 {
        return vec![0; timed.len()];
    }
    let base = total / k;
    let mut remainder = total - base * k;
    let mut frames: Vec<i64> = timed.iter().map(|t| if *t { base } else { 0 }).collect();
    while remainder > 0 {
        for (slot, t) in frames.iter_mut().zip(timed) {
            if remainder == 0 {
                break;
            }
            if *t {
                *slot += 1;
                remainder -= 1;
            }
        }
    }
    frames
}
