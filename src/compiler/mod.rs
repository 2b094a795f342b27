//! MML compiler - turns channel event streams into driver command data

pub mod channel;
pub mod context;
pub mod event;
pub mod options;
pub mod song;
pub mod stream;
pub mod timing;

use crate::diagnostics::Warning;
use crate::effects::{EffectKind, ParamList, ParamValue};
use crate::error::{Error, Result};
use crate::target::{self, render, TargetId, TargetOutput};
use context::CompilationContext;
use event::Event;
use flate2::read::GzDecoder;
use options::CompileOptions;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use timing::FrameClock;

/// Tempo used when a script sets none
pub const DEFAULT_TEMPO: u32 = 120;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// A macro definition in a song script
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MacroDef {
    pub kind: EffectKind,
    /// Explicit key; omitted keys are assigned in order, reusing equal macros
    #[serde(default)]
    pub key: Option<u32>,
    #[serde(default)]
    pub main: Vec<ParamValue>,
    #[serde(default, rename = "loop")]
    pub looped: Vec<ParamValue>,
    /// Side values such as `cumulative` for arpeggios
    #[serde(default)]
    pub extra: BTreeMap<String, ParamValue>,
}

/// Parsed song: macros plus the event stream of each channel
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SongScript {
    pub target: Option<TargetId>,
    pub tempo: u32,
    pub options: CompileOptions,
    pub effects: Vec<MacroDef>,
    pub channels: BTreeMap<String, Vec<Event>>,
    pub pattern: Vec<Event>,
}

impl Default for SongScript {
    fn default() -> Self {
        Self {
            target: None,
            tempo: DEFAULT_TEMPO,
            options: CompileOptions::default(),
            effects: Vec::new(),
            channels: BTreeMap::new(),
            pattern: Vec::new(),
        }
    }
}

impl SongScript {
    /// Read a JSON script, gzip-compressed or not
    pub fn read<R: Read>(mut input: R) -> Result<Self> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;

        if data.starts_with(&GZIP_MAGIC) {
            let mut decoder = GzDecoder::new(data.as_slice());
            let mut text = Vec::new();
            decoder.read_to_end(&mut text)?;
            data = text;
        }

        Ok(serde_json::from_slice(&data)?)
    }
}

/// Result of compiling one song
#[derive(Debug)]
pub struct Compilation {
    pub output: TargetOutput,
    pub warnings: Vec<Warning>,
}

/// Main compiler entry point
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    /// Options that win over the script's own
    pub options: CompileOptions,
    /// Write JSON instead of assembly
    pub json: bool,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            options,
            json: false,
        }
    }

    /// Compile a script read from `input` and write the result to `output`
    pub fn compile<R: Read>(&self, input: R, output: &Path) -> Result<Compilation> {
        let script = SongScript::read(input)?;
        let compilation = self.compile_script(&script)?;
        self.write_output(&compilation.output, output)?;
        Ok(compilation)
    }

    pub fn compile_file(&self, input: &Path, output: &Path) -> Result<Compilation> {
        let file = File::open(input)?;
        self.compile(file, output)
    }

    pub fn compile_script(&self, script: &SongScript) -> Result<Compilation> {
        let mut options = script.options.clone();
        options.merge(&self.options);

        let id = options.target.or(script.target).unwrap_or_default();
        let target = target::create_target(id);
        let descriptor = target.descriptor();
        let clock = FrameClock::new(
            options.refresh_hz.unwrap_or(descriptor.refresh_hz),
            options.fractional_delays.unwrap_or(descriptor.fractional),
        );
        if script.tempo == 0 {
            return Err(Error::InvalidTempo(script.tempo));
        }
        log::debug!(
            "Compiling for {} at {} Hz (scale {})",
            descriptor.name,
            clock.refresh_hz,
            clock.scale()
        );

        let mut ctx = CompilationContext::new(options);
        define_macros(&mut ctx, &script.effects)?;

        let mut song = target.init(clock, script.tempo);
        for (name, events) in &script.channels {
            let channel = song
                .channel_mut(name)
                .ok_or_else(|| Error::UnknownChannel {
                    channel: name.clone(),
                    target: descriptor.name.to_string(),
                })?;
            for event in events {
                event.apply(channel, &mut ctx)?;
            }
        }
        for event in &script.pattern {
            event.apply(&mut song.pattern, &mut ctx)?;
        }
        song.finish(&mut ctx)?;

        target.pack_effects(&mut ctx)?;
        let output = target.serialize(&song, &ctx)?;
        log::debug!("{} bytes of channel data", output.binary_size);

        Ok(Compilation {
            output,
            warnings: ctx.diagnostics.take(),
        })
    }

    fn write_output(&self, output: &TargetOutput, path: &Path) -> Result<()> {
        if self.json {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, output)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        } else {
            fs::write(path, render::render(output))?;
        }
        Ok(())
    }
}

fn define_macros(ctx: &mut CompilationContext, defs: &[MacroDef]) -> Result<()> {
    for def in defs {
        let registry = ctx.registry_mut(def.kind);
        let params = ParamList::new(def.main.clone(), def.looped.clone());
        let key = match def.key {
            Some(key) => registry.define(key, params)?,
            None => registry.register(params)?,
        };
        for (name, value) in &def.extra {
            registry.set_extra(key, name, value.clone())?;
        }
        log::debug!("{} macro {} defined", def.kind, key);
    }
    Ok(())
}
