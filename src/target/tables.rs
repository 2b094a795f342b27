//! Raw output: encoded channel streams and macro tables, before any syntax

use super::{AsmSyntax, TargetId};
use crate::compiler::channel::Channel;
use crate::compiler::context::CompilationContext;
use crate::compiler::song::Song;
use crate::compiler::stream::{opcode, Command, CommandReader};
use crate::effects::{EffectKind, EffectRegistry, ParamValue};
use crate::error::{Error, Result};
use serde::Serialize;

/// One table cell: a byte or a symbol the assembler resolves
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TableValue {
    Byte(u8),
    Symbol(String),
}

impl TableValue {
    fn from_param(value: &ParamValue, kind: EffectKind, key: u32) -> Result<Self> {
        match value {
            // negative values are stored as two's complement
            ParamValue::Int(v) if (-128..=255).contains(v) => Ok(Self::Byte(*v as u8)),
            ParamValue::Int(v) => Err(Error::TableValue {
                kind,
                key,
                value: *v,
            }),
            ParamValue::Text(s) => Ok(Self::Symbol(s.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStream {
    pub name: String,
    pub data: Vec<u8>,
    pub loop_offset: Option<usize>,
    pub ticks: u64,
    pub frames: i64,
    pub is_virtual: bool,
    /// `data` decoded back into commands
    pub commands: Vec<Command>,
}

impl ChannelStream {
    fn from_channel(channel: &Channel) -> Result<Self> {
        let commands = CommandReader::new(channel.data()).read_all()?;
        Ok(Self {
            name: channel.name().to_string(),
            data: channel.data().to_vec(),
            loop_offset: channel.loop_offset(),
            ticks: channel.ticks(),
            frames: channel.frames(),
            is_virtual: channel.is_virtual(),
            commands,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MacroTableEntry {
    pub key: u32,
    pub main: Vec<TableValue>,
    #[serde(rename = "loop")]
    pub looped: Vec<TableValue>,
    pub ref_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MacroTable {
    pub kind: EffectKind,
    pub label: &'static str,
    pub entries: Vec<MacroTableEntry>,
}

/// Everything a target writes for one song
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetOutput {
    pub target: TargetId,
    pub syntax: AsmSyntax,
    pub channels: Vec<ChannelStream>,
    pub tables: Vec<MacroTable>,
    /// Channel data bytes, pattern channel excluded
    pub binary_size: usize,
}

pub fn build(
    target: TargetId,
    syntax: AsmSyntax,
    song: &Song,
    ctx: &CompilationContext,
) -> Result<TargetOutput> {
    let mut channels = song
        .channels
        .iter()
        .map(ChannelStream::from_channel)
        .collect::<Result<Vec<_>>>()?;
    if song.pattern.data() != [opcode::END] {
        channels.push(ChannelStream::from_channel(&song.pattern)?);
    }

    let skip = ctx.options.skip_unreferenced_tables;
    let tables = ctx
        .registries()
        .filter(|r| !r.is_empty())
        .map(|r| macro_table(r, skip))
        .collect::<Result<Vec<_>>>()?;

    Ok(TargetOutput {
        target,
        syntax,
        channels,
        tables,
        binary_size: song.binary_size(),
    })
}

fn macro_table(registry: &EffectRegistry, skip_unreferenced: bool) -> Result<MacroTable> {
    let kind = registry.kind();
    let mut entries = Vec::with_capacity(registry.len());
    for entry in registry.iter() {
        if skip_unreferenced && entry.ref_count == 0 {
            log::debug!("Skipping unreferenced {} macro {}", kind, entry.key);
            continue;
        }
        let convert = |values: &[ParamValue]| {
            if values.len() > usize::from(u8::MAX) {
                return Err(Error::TableTooLong {
                    kind,
                    key: entry.key,
                    len: values.len(),
                });
            }
            values
                .iter()
                .map(|v| TableValue::from_param(v, kind, entry.key))
                .collect::<Result<Vec<_>>>()
        };
        entries.push(MacroTableEntry {
            key: entry.key,
            main: convert(entry.params.main())?,
            looped: convert(entry.params.looped())?,
            ref_count: entry.ref_count,
        });
    }
    Ok(MacroTable {
        kind,
        label: kind.label(),
        entries,
    })
}
