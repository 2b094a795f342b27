//! Non-fatal compiler diagnostics

use crate::effects::EffectKind;
use crate::error::{Error, Result};

/// A problem that is reported but does not stop compilation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    #[error("Channel {channel}: note too short to be heard ({frames} frames at scale {scale})")]
    NoteTooShort {
        channel: String,
        frames: i64,
        scale: i64,
    },

    #[error("Channel {channel}: note too long ({frames} frames), clamped to {max}")]
    NoteTooLong {
        channel: String,
        frames: i64,
        max: i64,
    },

    #[error("Channel {channel} is {ticks} ticks long, expected {expected}")]
    LengthMismatch {
        channel: String,
        ticks: u64,
        expected: u64,
    },

    #[error("Channel {channel} does not support {kind} macros, ignored")]
    UnsupportedEffect { channel: String, kind: EffectKind },

    #[error("Channel {channel}: tie inside a tuplet, ignored")]
    TieInTuplet { channel: String },
}

/// Collects warnings, optionally promoting them to errors
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
    warnings_as_errors: bool,
}

impl Diagnostics {
    pub fn new(warnings_as_errors: bool) -> Self {
        Self {
            warnings: Vec::new(),
            warnings_as_errors,
        }
    }

    /// Record a warning. Fails when warnings are treated as errors.
    pub fn warn(&mut self, warning: Warning) -> Result<()> {
        if self.warnings_as_errors {
            return Err(Error::Promoted(warning));
        }
        log::warn!("{}", warning);
        self.warnings.push(warning);
        Ok(())
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn take(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}
