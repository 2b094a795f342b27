//! Assembly text for a target's output

use super::tables::{MacroTable, TableValue, TargetOutput};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Bytes per data line
const BYTES_PER_LINE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AsmSyntax {
    /// WLA-DX (Z80 / 6502 / HuC6280 targets)
    WlaDx,
    /// GNU as (68000 targets)
    GnuAs,
}

impl AsmSyntax {
    pub fn byte_directive(self) -> &'static str {
        match self {
            Self::WlaDx => ".db",
            Self::GnuAs => ".byte",
        }
    }

    pub fn word_directive(self) -> &'static str {
        match self {
            Self::WlaDx => ".dw",
            Self::GnuAs => ".word",
        }
    }

    pub fn comment(self) -> &'static str {
        match self {
            Self::WlaDx => ";",
            Self::GnuAs => "|",
        }
    }

    pub fn hex(self, value: u8) -> String {
        match self {
            Self::WlaDx => format!("${:02X}", value),
            Self::GnuAs => format!("0x{:02X}", value),
        }
    }

    /// Alignment needed before word data, if any
    fn word_align(self) -> Option<&'static str> {
        match self {
            Self::WlaDx => None,
            Self::GnuAs => Some(".even"),
        }
    }
}

pub fn channel_label(name: &str) -> String {
    format!("mml_channel_{}", name)
}

pub fn macro_label(table: &MacroTable, key: u32) -> String {
    format!("mml_{}{}", table.label, key)
}

/// Render a whole output file
pub fn render(output: &TargetOutput) -> String {
    let syntax = output.syntax;
    let c = syntax.comment();
    let mut out = String::new();

    let _ = writeln!(out, "{} chipmml output for {}", c, output.target);
    let _ = writeln!(out, "{} {} bytes of channel data", c, output.binary_size);
    out.push('\n');

    let labels: Vec<String> = output.channels.iter().map(|ch| channel_label(&ch.name)).collect();
    write_words(&mut out, syntax, "mml_channel_table", &labels);

    for ch in &output.channels {
        let label = channel_label(&ch.name);
        out.push('\n');
        let _ = writeln!(
            out,
            "{} channel {}: {} ticks, {} frames{}",
            c,
            ch.name,
            ch.ticks,
            ch.frames,
            if ch.is_virtual { " (virtual)" } else { "" }
        );
        let _ = writeln!(out, "{}:", label);
        match ch.loop_offset {
            Some(offset) => {
                write_bytes(&mut out, syntax, &ch.data[..offset]);
                let _ = writeln!(out, "{}_loop:", label);
                write_bytes(&mut out, syntax, &ch.data[offset..]);
            }
            None => write_bytes(&mut out, syntax, &ch.data),
        }
    }

    for table in &output.tables {
        out.push('\n');
        render_table(&mut out, syntax, table);
    }

    out
}

/// Pointer table, then per macro: main count, main values, loop count, loop values
fn render_table(out: &mut String, syntax: AsmSyntax, table: &MacroTable) {
    let c = syntax.comment();
    let _ = writeln!(out, "{} {} macros", c, table.kind);
    let pointers: Vec<String> = table
        .entries
        .iter()
        .flat_map(|e| {
            let label = macro_label(table, e.key);
            [label.clone(), format!("{}_loop", label)]
        })
        .collect();
    write_words(out, syntax, &format!("mml_{}_table", table.label), &pointers);

    for entry in &table.entries {
        let label = macro_label(table, entry.key);
        let _ = writeln!(out, "{}:", label);
        write_values(out, syntax, &entry.main);
        let _ = writeln!(out, "{}_loop:", label);
        write_values(out, syntax, &entry.looped);
    }
}

fn write_words(out: &mut String, syntax: AsmSyntax, label: &str, words: &[String]) {
    if let Some(align) = syntax.word_align() {
        let _ = writeln!(out, "\t{}", align);
    }
    let _ = writeln!(out, "{}:", label);
    for chunk in words.chunks(BYTES_PER_LINE / 2) {
        let _ = writeln!(out, "\t{} {}", syntax.word_directive(), chunk.join(", "));
    }
}

fn write_bytes(out: &mut String, syntax: AsmSyntax, data: &[u8]) {
    for chunk in data.chunks(BYTES_PER_LINE) {
        let line: Vec<String> = chunk.iter().map(|b| syntax.hex(*b)).collect();
        let _ = writeln!(out, "\t{} {}", syntax.byte_directive(), line.join(","));
    }
}

/// Count byte followed by the values; symbols become words
fn write_values(out: &mut String, syntax: AsmSyntax, values: &[TableValue]) {
    let mut bytes = vec![values.len().min(usize::from(u8::MAX)) as u8];
    for value in values {
        match value {
            TableValue::Byte(b) => bytes.push(*b),
            TableValue::Symbol(name) => {
                write_bytes(out, syntax, &bytes);
                bytes.clear();
                let _ = writeln!(out, "\t{} {}", syntax.word_directive(), name);
            }
        }
    }
    write_bytes(out, syntax, &bytes);
}
