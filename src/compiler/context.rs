//! Compilation-wide state shared by every channel of a song

use super::options::CompileOptions;
use crate::diagnostics::{Diagnostics, Warning};
use crate::effects::{EffectKind, EffectRegistry};
use crate::error::Result;

/// Owns one effect registry per kind plus the diagnostics sink.
///
/// Keys are assigned in registration order, so feeding the same script
/// through a fresh context always yields the same bytes.
#[derive(Debug)]
pub struct CompilationContext {
    registries: [EffectRegistry; EffectKind::COUNT],
    pub diagnostics: Diagnostics,
    pub options: CompileOptions,
}

impl CompilationContext {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            registries: std::array::from_fn(|i| {
                EffectRegistry::new(EffectKind::ALL[i])
            }),
            diagnostics: Diagnostics::new(options.warnings_as_errors),
            options,
        }
    }

    pub fn registry(&self, kind: EffectKind) -> &EffectRegistry {
        &self.registries[kind.index()]
    }

    pub fn registry_mut(&mut self, kind: EffectKind) -> &mut EffectRegistry {
        &mut self.registries[kind.index()]
    }

    pub fn registries(&self) -> impl Iterator<Item = &EffectRegistry> {
        self.registries.iter()
    }

    pub fn warn(&mut self, warning: Warning) -> Result<()> {
        self.diagnostics.warn(warning)
    }
}

impl Default for CompilationContext {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}
