//! A target's full set of channels for one song

use super::channel::Channel;
use super::context::CompilationContext;
use crate::diagnostics::Warning;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Song {
    pub channels: Vec<Channel>,
    /// Virtual channel for shared patterns
    pub pattern: Channel,
}

impl Song {
    pub fn new(channels: Vec<Channel>, pattern: Channel) -> Self {
        Self { channels, pattern }
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name() == name)
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        if self.pattern.name() == name {
            return Some(&mut self.pattern);
        }
        self.channels.iter_mut().find(|c| c.name() == name)
    }

    /// Terminate every channel and report channels shorter than the song
    pub fn finish(&mut self, ctx: &mut CompilationContext) -> Result<()> {
        for channel in &mut self.channels {
            channel.finish(ctx)?;
        }
        self.pattern.finish(ctx)?;

        let expected = self
            .channels
            .iter()
            .filter(|c| c.has_notes())
            .map(|c| c.ticks())
            .max()
            .unwrap_or(0);
        for channel in self.channels.iter().filter(|c| c.has_notes()) {
            if channel.ticks() != expected {
                ctx.warn(Warning::LengthMismatch {
                    channel: channel.name().to_string(),
                    ticks: channel.ticks(),
                    expected,
                })?;
            }
        }
        Ok(())
    }

    /// Bytes of channel data, not counting the pattern channel
    pub fn binary_size(&self) -> usize {
        self.channels
            .iter()
            .filter(|c| !c.is_virtual())
            .map(|c| c.data().len())
            .sum()
    }
}
