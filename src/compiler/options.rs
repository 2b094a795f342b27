//! Compiler options

use crate::target::{AsmSyntax, TargetId};
use serde::Deserialize;

/// Options read from a song script and overridden from the command line
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CompileOptions {
    /// Promote every warning to a fatal error
    pub warnings_as_errors: bool,
    /// Leave macro tables no note refers to out of the output
    pub skip_unreferenced_tables: bool,
    pub target: Option<TargetId>,
    /// Override the target's assembler syntax
    pub syntax: Option<AsmSyntax>,
    /// Override the target's refresh rate
    pub refresh_hz: Option<u32>,
    /// Override the target's delay precision
    pub fractional_delays: Option<bool>,
}

impl CompileOptions {
    /// Apply every option set in `other` on top of these
    pub fn merge(&mut self, other: &CompileOptions) {
        self.warnings_as_errors |= other.warnings_as_errors;
        self.skip_unreferenced_tables |= other.skip_unreferenced_tables;
        if other.target.is_some() {
            self.target = other.target;
        }
        if other.syntax.is_some() {
            self.syntax = other.syntax;
        }
        if other.refresh_hz.is_some() {
            self.refresh_hz = other.refresh_hz;
        }
        if other.fractional_delays.is_some() {
            self.fractional_delays = other.fractional_delays;
        }
    }
}
