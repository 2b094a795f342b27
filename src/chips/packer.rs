//! Chip-specific packing of ADSR and modulation records
//!
//! Every layout is a row in a table keyed by chip: input arity, the bit
//! width of each input field, and the function producing the output bytes.

use super::ChipId;
use crate::effects::{ParamList, ParamValue};
use crate::error::{Error, Result};

/// Kind of record being packed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Adsr,
    Modulation,
}

impl Record {
    fn name(self) -> &'static str {
        match self {
            Self::Adsr => "ADSR",
            Self::Modulation => "modulation",
        }
    }
}

struct Layout {
    chip: ChipId,
    record: Record,
    field_bits: &'static [u32],
    pack: fn(&[u8]) -> Vec<u8>,
}

// AR, DR, SR, RR -> AR<<4|DR, (SR^15)<<4|RR
fn opll_adsr(p: &[u8]) -> Vec<u8> {
    vec![(p[0] << 4) | p[1], ((p[2] ^ 15) << 4) | p[3]]
}

// DR, SR, RR. Attack comes from the FM patch on these chips.
fn opn_adsr(p: &[u8]) -> Vec<u8> {
    vec![p[0], p[1], p[2], (p[2] / 2) | (((p[1] ^ 31) / 2) << 4)]
}

// A, D, S, R -> A<<4|D, S<<4|R
fn sid_adsr(p: &[u8]) -> Vec<u8> {
    vec![(p[0] << 4) | p[1], (p[2] << 4) | p[3]]
}

// LFO frequency, AM depth, PM depth, waveform, sensitivity
fn opm_mod(p: &[u8]) -> Vec<u8> {
    vec![p[0], p[1], p[2] | 0x80, p[3], p[4].wrapping_add(0xC0)]
}

// feedback, algorithm, connection
fn opn_mod(p: &[u8]) -> Vec<u8> {
    vec![p[0], (p[1] * 8) | p[2]]
}

static LAYOUTS: &[Layout] = &[
    Layout {
        chip: ChipId::Ym2413,
        record: Record::Adsr,
        field_bits: &[4, 4, 4, 4],
        pack: opll_adsr,
    },
    Layout {
        chip: ChipId::Ym2612,
        record: Record::Adsr,
        field_bits: &[5, 5, 5],
        pack: opn_adsr,
    },
    Layout {
        chip: ChipId::Ym2151,
        record: Record::Adsr,
        field_bits: &[5, 5, 5],
        pack: opn_adsr,
    },
    Layout {
        chip: ChipId::Sid,
        record: Record::Adsr,
        field_bits: &[4, 4, 4, 4],
        pack: sid_adsr,
    },
    Layout {
        chip: ChipId::Ym2151,
        record: Record::Modulation,
        field_bits: &[8, 7, 7, 2, 6],
        pack: opm_mod,
    },
    Layout {
        chip: ChipId::Ym2612,
        record: Record::Modulation,
        field_bits: &[3, 3, 3],
        pack: opn_mod,
    },
];

fn layout(chip: ChipId, record: Record) -> Result<&'static Layout> {
    LAYOUTS
        .iter()
        .find(|l| l.chip == chip && l.record == record)
        .ok_or(Error::UnsupportedChip {
            chip,
            what: record.name(),
        })
}

/// Input arity of a record on a chip
pub fn arity(chip: ChipId, record: Record) -> Result<usize> {
    Ok(layout(chip, record)?.field_bits.len())
}

/// Pack raw parameters into the record layout a chip's driver expects
pub fn pack(params: &[ParamValue], chip: ChipId, record: Record) -> Result<Vec<u8>> {
    let layout = layout(chip, record)?;
    let what = record.name();
    if params.len() != layout.field_bits.len() {
        return Err(Error::ParamArity {
            chip,
            what,
            expected: layout.field_bits.len(),
            found: params.len(),
        });
    }

    let mut fields = Vec::with_capacity(params.len());
    for (index, (param, bits)) in params.iter().zip(layout.field_bits).enumerate() {
        let value = match param {
            ParamValue::Int(v) => *v,
            ParamValue::Text(text) => {
                return Err(Error::ParamType {
                    what,
                    index,
                    text: text.clone(),
                })
            }
        };
        let max = (1i64 << bits) - 1;
        if !(0..=max).contains(&value) {
            return Err(Error::ParamRange {
                chip,
                what,
                index,
                value,
                max,
            });
        }
        fields.push(value as u8);
    }

    Ok((layout.pack)(&fields))
}

pub fn pack_adsr(params: &[ParamValue], chip: ChipId) -> Result<Vec<u8>> {
    pack(params, chip, Record::Adsr)
}

pub fn pack_mod(params: &[ParamValue], chip: ChipId) -> Result<Vec<u8>> {
    pack(params, chip, Record::Modulation)
}

/// Pack a whole macro. Records have no looped part.
pub fn pack_list(list: &ParamList, chip: ChipId, record: Record) -> Result<ParamList> {
    if !list.looped().is_empty() {
        return Err(Error::ParamArity {
            chip,
            what: record.name(),
            expected: arity(chip, record)?,
            found: list.len(),
        });
    }
    let bytes = pack(list.main(), chip, record)?;
    Ok(ParamList::new(
        bytes.into_iter().map(|b| ParamValue::Int(i64::from(b))).collect(),
        Vec::new(),
    ))
}
