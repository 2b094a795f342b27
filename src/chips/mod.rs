//! Sound chips: identities, per-channel capabilities and parameter packing

pub mod packer;

pub use packer::{pack_adsr, pack_mod, Record};

use crate::effects::{EffectKind, EffectSet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChipId {
    Sn76489,
    Ym2413,
    Ym2612,
    Ym2151,
    Sid,
    HuC6280,
    #[serde(rename = "2a03")]
    Apu2A03,
    Ay8910,
}

impl ChipId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sn76489 => "SN76489",
            Self::Ym2413 => "YM2413",
            Self::Ym2612 => "YM2612",
            Self::Ym2151 => "YM2151",
            Self::Sid => "SID",
            Self::HuC6280 => "HuC6280",
            Self::Apu2A03 => "2A03",
            Self::Ay8910 => "AY-3-8910",
        }
    }

    /// Capabilities shared by every channel of this chip
    pub fn channel_caps(self) -> ChannelCaps {
        use EffectKind::*;
        let (min_octave, max_octave, max_volume, effects) = match self {
            Self::Sn76489 => (
                1,
                7,
                15,
                EffectSet::of(&[Arpeggio, Vibrato, VolumeMacro, DutyMacro, PitchMacro, Portamento]),
            ),
            Self::Ym2413 => (
                0,
                7,
                15,
                EffectSet::of(&[Arpeggio, Vibrato, VolumeMacro, PitchMacro, Adsr, Portamento]),
            ),
            Self::Ym2612 => (
                0,
                7,
                127,
                EffectSet::of(&[
                    Arpeggio, Vibrato, VolumeMacro, PitchMacro, PanMacro, Feedback, Modulation,
                    Adsr, Portamento, PcmSample,
                ]),
            ),
            Self::Ym2151 => (
                0,
                7,
                127,
                EffectSet::of(&[
                    Arpeggio, Vibrato, VolumeMacro, PitchMacro, PanMacro, Feedback, Modulation,
                    Adsr, Portamento,
                ]),
            ),
            Self::Sid => (
                0,
                7,
                15,
                EffectSet::of(&[
                    Arpeggio, Vibrato, VolumeMacro, DutyMacro, PitchMacro, Adsr, Filter, Portamento,
                ]),
            ),
            Self::HuC6280 => (
                1,
                7,
                31,
                EffectSet::of(&[
                    Arpeggio, Vibrato, VolumeMacro, PitchMacro, PanMacro, Waveform, WaveformMacro,
                    PcmSample, Portamento,
                ]),
            ),
            Self::Apu2A03 => (
                1,
                7,
                15,
                EffectSet::of(&[
                    Arpeggio, Vibrato, VolumeMacro, DutyMacro, PitchMacro, Portamento, PcmSample,
                ]),
            ),
            Self::Ay8910 => (
                1,
                7,
                15,
                EffectSet::of(&[Arpeggio, Vibrato, VolumeMacro, DutyMacro, PitchMacro, Portamento]),
            ),
        };
        ChannelCaps {
            chip: self,
            min_octave,
            max_octave,
            max_volume,
            effects,
        }
    }
}

/// What one physical channel accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCaps {
    pub chip: ChipId,
    pub min_octave: u8,
    pub max_octave: u8,
    pub max_volume: u8,
    pub effects: EffectSet,
}

impl ChannelCaps {
    pub fn supports(&self, kind: EffectKind) -> bool {
        self.effects.contains(kind)
    }

    /// Same capabilities without one effect kind
    pub fn without(mut self, kind: EffectKind) -> Self {
        self.effects = EffectSet::of(
            &self
                .effects
                .iter()
                .filter(|k| *k != kind)
                .collect::<Vec<_>>(),
        );
        self
    }
}
