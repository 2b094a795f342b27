//! Output targets: platform descriptors, channel layouts and table output

pub mod platforms;
pub mod render;
pub mod tables;

pub use render::AsmSyntax;
pub use tables::{ChannelStream, MacroTable, MacroTableEntry, TableValue, TargetOutput};

use crate::chips::ChannelCaps;
use crate::compiler::channel::Channel;
use crate::compiler::context::CompilationContext;
use crate::compiler::song::Song;
use crate::compiler::timing::FrameClock;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the virtual pattern channel
pub const PATTERN_CHANNEL: &str = "pattern";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetId {
    /// Sega Master System
    #[default]
    Sms,
    /// Sega Genesis / Mega Drive
    Genesis,
    X68000,
    /// Commodore 64
    C64,
    /// PC Engine
    Pce,
    /// Famicom / NES
    Nes,
    /// Amstrad CPC
    Cpc,
}

impl TargetId {
    pub const ALL: [TargetId; 7] = [
        Self::Sms,
        Self::Genesis,
        Self::X68000,
        Self::C64,
        Self::Pce,
        Self::Nes,
        Self::Cpc,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Genesis => "genesis",
            Self::X68000 => "x68000",
            Self::C64 => "c64",
            Self::Pce => "pce",
            Self::Nes => "nes",
            Self::Cpc => "cpc",
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownTarget(s.to_string()))
    }
}

/// Fixed facts about a target platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub refresh_hz: u32,
    pub fractional: bool,
    pub syntax: AsmSyntax,
}

/// A named physical channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpec {
    pub name: char,
    pub caps: ChannelCaps,
}

/// Target platform trait
pub trait Target {
    fn id(&self) -> TargetId;

    fn descriptor(&self) -> TargetDescriptor;

    /// Physical channels in output order
    fn capabilities(&self) -> Vec<ChannelSpec>;

    /// Fresh channels for one song
    fn init(&self, clock: FrameClock, tempo: u32) -> Song {
        let channels = self
            .capabilities()
            .into_iter()
            .map(|spec| Channel::new(spec.name.to_string(), spec.caps, clock, tempo))
            .collect();
        Song::new(channels, Channel::pattern(PATTERN_CHANNEL, clock, tempo))
    }

    /// Rewrite macro registries into the record formats the driver reads
    fn pack_effects(&self, _ctx: &mut CompilationContext) -> Result<()> {
        Ok(())
    }

    fn serialize(&self, song: &Song, ctx: &CompilationContext) -> Result<TargetOutput> {
        let descriptor = self.descriptor();
        let syntax = ctx.options.syntax.unwrap_or(descriptor.syntax);
        tables::build(self.id(), syntax, song, ctx)
    }
}

/// Create a target by id
pub fn create_target(id: TargetId) -> Box<dyn Target> {
    match id {
        TargetId::Sms => Box::new(platforms::Sms),
        TargetId::Genesis => Box::new(platforms::Genesis),
        TargetId::X68000 => Box::new(platforms::X68000),
        TargetId::C64 => Box::new(platforms::C64),
        TargetId::Pce => Box::new(platforms::Pce),
        TargetId::Nes => Box::new(platforms::Nes),
        TargetId::Cpc => Box::new(platforms::Cpc),
    }
}

/// List all available targets with a short description
pub fn list_targets() -> Vec<(&'static str, &'static str)> {
    TargetId::ALL
        .into_iter()
        .map(|id| {
            let d = create_target(id).descriptor();
            (d.name, d.description)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_names_round_trip() {
        for id in TargetId::ALL {
            assert_eq!(id.name().parse::<TargetId>().unwrap(), id);
            assert_eq!(create_target(id).id(), id);
            assert_eq!(create_target(id).descriptor().name, id.name());
        }
        assert!(matches!(
            "amiga".parse::<TargetId>(),
            Err(Error::UnknownTarget(_))
        ));
    }

    #[test]
    fn test_init_creates_named_channels() {
        let target = create_target(TargetId::Sms);
        let song = target.init(FrameClock::new(60, true), 120);
        let names: Vec<&str> = song.channels.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M"]);
        assert!(song.pattern.is_virtual());
    }
}
