use crate::chips::ChipId;
use crate::diagnostics::Warning;
use crate::effects::EffectKind;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Negative note length on channel {channel}: {active} active / {cutoff} cutoff frames")]
    NegativeLength {
        channel: String,
        active: i64,
        cutoff: i64,
    },

    #[error("Invalid tempo: {0}")]
    InvalidTempo(u32),

    #[error("{chip:?} {what} expects {expected} parameters, got {found}")]
    ParamArity {
        chip: ChipId,
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{chip:?} {what} parameter {index} out of range: {value} (max {max})")]
    ParamRange {
        chip: ChipId,
        what: &'static str,
        index: usize,
        value: i64,
        max: i64,
    },

    #[error("{what} parameter {index} is not a number: {text:?}")]
    ParamType {
        what: &'static str,
        index: usize,
        text: String,
    },

    #[error("{chip:?} has no {what} record format")]
    UnsupportedChip { chip: ChipId, what: &'static str },

    #[error("Undefined {kind} macro {key}")]
    UndefinedEffect { kind: EffectKind, key: u32 },

    #[error("Too many {0} macros (keys must be below 128)")]
    RegistryFull(EffectKind),

    #[error("{kind} macro tables were already packed for output")]
    AlreadyPacked { kind: EffectKind },

    #[error("Channel {channel}: {what} {value} out of range ({min}..={max})")]
    OutOfRange {
        channel: String,
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Channel {0}: tuplet is already open")]
    TupletAlreadyOpen(String),

    #[error("Channel {0}: tuplet end without a matching start")]
    TupletNotOpen(String),

    #[error("Channel {0}: tuplet left open at end of channel")]
    UnterminatedTuplet(String),

    #[error("{kind} macro {key}: value {value} does not fit a table byte")]
    TableValue {
        kind: EffectKind,
        key: u32,
        value: i64,
    },

    #[error("{kind} macro {key}: {len} values do not fit one table part (max 255)")]
    TableTooLong {
        kind: EffectKind,
        key: u32,
        len: usize,
    },

    #[error("Channel {channel}: loop point at offset {offset} is beyond a 16-bit jump")]
    LoopTooFar { channel: String, offset: usize },

    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("Unknown channel '{channel}' for target {target}")]
    UnknownChannel { channel: String, target: String },

    #[error("Command stream error at offset {offset}: {message}")]
    Stream { offset: usize, message: String },

    #[error("{0} (warnings are treated as errors)")]
    Promoted(Warning),

    #[error("Song script error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
