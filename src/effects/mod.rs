//! Effect macros: parameter lists, the per-kind registries and the
//! playback-side stepping model.

pub mod params;
pub mod registry;
pub mod runtime;

pub use params::{ParamList, ParamValue};
pub use registry::{EffectEntry, EffectRegistry};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of effect macro, one registry each
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EffectKind {
    Arpeggio = 0,
    Vibrato = 1,
    VolumeMacro = 2,
    DutyMacro = 3,
    PanMacro = 4,
    PitchMacro = 5,
    Feedback = 6,
    Modulation = 7,
    Adsr = 8,
    Filter = 9,
    Portamento = 10,
    Waveform = 11,
    WaveformMacro = 12,
    PcmSample = 13,
}

impl EffectKind {
    pub const COUNT: usize = 14;

    pub const ALL: [EffectKind; Self::COUNT] = [
        Self::Arpeggio,
        Self::Vibrato,
        Self::VolumeMacro,
        Self::DutyMacro,
        Self::PanMacro,
        Self::PitchMacro,
        Self::Feedback,
        Self::Modulation,
        Self::Adsr,
        Self::Filter,
        Self::Portamento,
        Self::Waveform,
        Self::WaveformMacro,
        Self::PcmSample,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Short label used for table symbols
    pub fn label(self) -> &'static str {
        match self {
            Self::Arpeggio => "EN",
            Self::Vibrato => "MP",
            Self::VolumeMacro => "v",
            Self::DutyMacro => "DT",
            Self::PanMacro => "CS",
            Self::PitchMacro => "EP",
            Self::Feedback => "FB",
            Self::Modulation => "MOD",
            Self::Adsr => "ADSR",
            Self::Filter => "FT",
            Self::Portamento => "PO",
            Self::Waveform => "WT",
            Self::WaveformMacro => "WTM",
            Self::PcmSample => "XPCM",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Arpeggio => "arpeggio",
            Self::Vibrato => "vibrato",
            Self::VolumeMacro => "volume",
            Self::DutyMacro => "duty",
            Self::PanMacro => "pan",
            Self::PitchMacro => "pitch",
            Self::Feedback => "feedback",
            Self::Modulation => "modulation",
            Self::Adsr => "ADSR",
            Self::Filter => "filter",
            Self::Portamento => "portamento",
            Self::Waveform => "waveform",
            Self::WaveformMacro => "waveform macro",
            Self::PcmSample => "PCM sample",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of effect kinds a channel accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EffectSet(u16);

impl EffectSet {
    pub const NONE: EffectSet = EffectSet(0);

    pub const fn of(kinds: &[EffectKind]) -> Self {
        let mut bits = 0u16;
        let mut i = 0;
        while i < kinds.len() {
            bits |= 1 << kinds[i] as u16;
            i += 1;
        }
        EffectSet(bits)
    }

    pub fn contains(self, kind: EffectKind) -> bool {
        self.0 & (1 << kind as u16) != 0
    }

    pub fn insert(&mut self, kind: EffectKind) {
        self.0 |= 1 << kind as u16;
    }

    pub fn iter(self) -> impl Iterator<Item = EffectKind> {
        EffectKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}
