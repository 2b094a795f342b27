//! Concrete target platforms

use super::{AsmSyntax, ChannelSpec, Target, TargetDescriptor, TargetId};
use crate::chips::packer::{pack_list, Record};
use crate::chips::{ChannelCaps, ChipId};
use crate::compiler::context::CompilationContext;
use crate::effects::{EffectKind, ParamValue};
use crate::error::{Error, Result};

/// Samples in a HuC6280 wavetable
pub const WAVE_LENGTH: usize = 32;

/// Largest HuC6280 wavetable sample
pub const WAVE_MAX: i64 = 31;

/// Channels named A, B, C... continuing from `first`
fn lettered(first: usize, count: usize, caps: ChannelCaps) -> impl Iterator<Item = ChannelSpec> {
    (first..first + count).map(move |i| ChannelSpec {
        name: char::from(b'A' + i as u8),
        caps,
    })
}

fn pack_records(ctx: &mut CompilationContext, kind: EffectKind, chip: ChipId, record: Record) -> Result<()> {
    let registry = ctx.registry_mut(kind);
    log::debug!("Packing {} {} macros for {}", registry.len(), kind, chip.name());
    registry.pack_with(|list| pack_list(list, chip, record))
}

pub struct Sms;

impl Target for Sms {
    fn id(&self) -> TargetId {
        TargetId::Sms
    }

    fn descriptor(&self) -> TargetDescriptor {
        TargetDescriptor {
            name: "sms",
            description: "Sega Master System (SN76489 + YM2413)",
            refresh_hz: 60,
            fractional: true,
            syntax: AsmSyntax::WlaDx,
        }
    }

    fn capabilities(&self) -> Vec<ChannelSpec> {
        lettered(0, 4, ChipId::Sn76489.channel_caps())
            .chain(lettered(4, 9, ChipId::Ym2413.channel_caps()))
            .collect()
    }

    fn pack_effects(&self, ctx: &mut CompilationContext) -> Result<()> {
        pack_records(ctx, EffectKind::Adsr, ChipId::Ym2413, Record::Adsr)
    }
}

pub struct Genesis;

impl Target for Genesis {
    fn id(&self) -> TargetId {
        TargetId::Genesis
    }

    fn descriptor(&self) -> TargetDescriptor {
        TargetDescriptor {
            name: "genesis",
            description: "Sega Genesis (YM2612 + SN76489)",
            refresh_hz: 60,
            fractional: true,
            syntax: AsmSyntax::GnuAs,
        }
    }

    fn capabilities(&self) -> Vec<ChannelSpec> {
        let fm = ChipId::Ym2612.channel_caps();
        // only the sixth FM channel can play samples
        lettered(0, 5, fm.without(EffectKind::PcmSample))
            .chain(lettered(5, 1, fm))
            .chain(lettered(6, 4, ChipId::Sn76489.channel_caps()))
            .collect()
    }

    fn pack_effects(&self, ctx: &mut CompilationContext) -> Result<()> {
        pack_records(ctx, EffectKind::Adsr, ChipId::Ym2612, Record::Adsr)?;
        pack_records(ctx, EffectKind::Modulation, ChipId::Ym2612, Record::Modulation)
    }
}

pub struct X68000;

impl Target for X68000 {
    fn id(&self) -> TargetId {
        TargetId::X68000
    }

    fn descriptor(&self) -> TargetDescriptor {
        TargetDescriptor {
            name: "x68000",
            description: "Sharp X68000 (YM2151)",
            refresh_hz: 60,
            fractional: false,
            syntax: AsmSyntax::GnuAs,
        }
    }

    fn capabilities(&self) -> Vec<ChannelSpec> {
        lettered(0, 8, ChipId::Ym2151.channel_caps()).collect()
    }

    fn pack_effects(&self, ctx: &mut CompilationContext) -> Result<()> {
        pack_records(ctx, EffectKind::Adsr, ChipId::Ym2151, Record::Adsr)?;
        pack_records(ctx, EffectKind::Modulation, ChipId::Ym2151, Record::Modulation)
    }
}

pub struct C64;

impl Target for C64 {
    fn id(&self) -> TargetId {
        TargetId::C64
    }

    fn descriptor(&self) -> TargetDescriptor {
        TargetDescriptor {
            name: "c64",
            description: "Commodore 64 (SID)",
            refresh_hz: 50,
            fractional: false,
            syntax: AsmSyntax::WlaDx,
        }
    }

    fn capabilities(&self) -> Vec<ChannelSpec> {
        lettered(0, 3, ChipId::Sid.channel_caps()).collect()
    }

    fn pack_effects(&self, ctx: &mut CompilationContext) -> Result<()> {
        pack_records(ctx, EffectKind::Adsr, ChipId::Sid, Record::Adsr)
    }
}

pub struct Pce;

impl Target for Pce {
    fn id(&self) -> TargetId {
        TargetId::Pce
    }

    fn descriptor(&self) -> TargetDescriptor {
        TargetDescriptor {
            name: "pce",
            description: "PC Engine (HuC6280)",
            refresh_hz: 60,
            fractional: false,
            syntax: AsmSyntax::WlaDx,
        }
    }

    fn capabilities(&self) -> Vec<ChannelSpec> {
        lettered(0, 6, ChipId::HuC6280.channel_caps()).collect()
    }

    fn pack_effects(&self, ctx: &mut CompilationContext) -> Result<()> {
        let chip = ChipId::HuC6280;
        ctx.registry_mut(EffectKind::Waveform).pack_with(|list| {
            if list.len() != WAVE_LENGTH || !list.looped().is_empty() {
                return Err(Error::ParamArity {
                    chip,
                    what: "waveform",
                    expected: WAVE_LENGTH,
                    found: list.len(),
                });
            }
            for (index, value) in list.main().iter().enumerate() {
                match value {
                    ParamValue::Int(v) if (0..=WAVE_MAX).contains(v) => {}
                    ParamValue::Int(v) => {
                        return Err(Error::ParamRange {
                            chip,
                            what: "waveform",
                            index,
                            value: *v,
                            max: WAVE_MAX,
                        })
                    }
                    ParamValue::Text(text) => {
                        return Err(Error::ParamType {
                            what: "waveform",
                            index,
                            text: text.clone(),
                        })
                    }
                }
            }
            Ok(list.clone())
        })
    }
}

pub struct Nes;

impl Target for Nes {
    fn id(&self) -> TargetId {
        TargetId::Nes
    }

    fn descriptor(&self) -> TargetDescriptor {
        TargetDescriptor {
            name: "nes",
            description: "Famicom / NES (2A03)",
            refresh_hz: 60,
            fractional: false,
            syntax: AsmSyntax::WlaDx,
        }
    }

    fn capabilities(&self) -> Vec<ChannelSpec> {
        let apu = ChipId::Apu2A03.channel_caps();
        // pulse 1, pulse 2, triangle, noise, DPCM
        lettered(0, 2, apu.without(EffectKind::PcmSample))
            .chain(lettered(
                2,
                1,
                apu.without(EffectKind::DutyMacro)
                    .without(EffectKind::PcmSample),
            ))
            .chain(lettered(3, 1, apu.without(EffectKind::PcmSample)))
            .chain(lettered(4, 1, apu))
            .collect()
    }
}

pub struct Cpc;

impl Target for Cpc {
    fn id(&self) -> TargetId {
        TargetId::Cpc
    }

    fn descriptor(&self) -> TargetDescriptor {
        TargetDescriptor {
            name: "cpc",
            description: "Amstrad CPC (AY-3-8910)",
            refresh_hz: 50,
            fractional: false,
            syntax: AsmSyntax::WlaDx,
        }
    }

    fn capabilities(&self) -> Vec<ChannelSpec> {
        lettered(0, 3, ChipId::Ay8910.channel_caps()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::ParamList;

    #[test]
    fn test_channel_counts() {
        assert_eq!(Sms.capabilities().len(), 13);
        assert_eq!(Genesis.capabilities().len(), 10);
        assert_eq!(X68000.capabilities().len(), 8);
        assert_eq!(C64.capabilities().len(), 3);
        assert_eq!(Pce.capabilities().len(), 6);
        assert_eq!(Nes.capabilities().len(), 5);
        assert_eq!(Cpc.capabilities().len(), 3);
    }

    #[test]
    fn test_genesis_pcm_channel() {
        let caps = Genesis.capabilities();
        assert!(!caps[4].caps.supports(EffectKind::PcmSample));
        assert!(caps[5].caps.supports(EffectKind::PcmSample));
        assert_eq!(caps[6].caps.chip, ChipId::Sn76489);
        assert_eq!(caps[9].name, 'J');
    }

    #[test]
    fn test_sms_packs_ym2413_adsr() {
        let mut ctx = CompilationContext::default();
        ctx.registry_mut(EffectKind::Adsr)
            .define(0, ParamList::from_ints(&[15, 2, 3, 4], &[]))
            .unwrap();
        Sms.pack_effects(&mut ctx).unwrap();
        let entry = ctx.registry(EffectKind::Adsr).get(0).unwrap();
        assert_eq!(entry.params, ParamList::from_ints(&[0xF2, 0xC4], &[]));
        assert!(matches!(
            Sms.pack_effects(&mut ctx),
            Err(Error::AlreadyPacked { .. })
        ));
    }

    #[test]
    fn test_pce_waveform_validation() {
        let mut ctx = CompilationContext::default();
        let wave: Vec<i64> = (0..32).collect();
        ctx.registry_mut(EffectKind::Waveform)
            .define(0, ParamList::from_ints(&wave, &[]))
            .unwrap();
        Pce.pack_effects(&mut ctx).unwrap();

        let mut ctx = CompilationContext::default();
        let mut loud = wave.clone();
        loud[5] = 32;
        ctx.registry_mut(EffectKind::Waveform)
            .define(0, ParamList::from_ints(&loud, &[]))
            .unwrap();
        assert!(matches!(
            Pce.pack_effects(&mut ctx),
            Err(Error::ParamRange { index: 5, value: 32, .. })
        ));

        let mut ctx = CompilationContext::default();
        ctx.registry_mut(EffectKind::Waveform)
            .define(0, ParamList::from_ints(&[1, 2, 3], &[]))
            .unwrap();
        assert!(matches!(
            Pce.pack_effects(&mut ctx),
            Err(Error::ParamArity { expected: 32, found: 3, .. })
        ));
    }
}
